use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::schemars;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt};
use serde::Deserialize;

use crate::baseline::{RouteKey, StopsBucket};
use crate::config::DEFAULT_HISTORY_DAYS;
use crate::error::FareError;
use crate::normalize::{is_airport_query, normalize_airports, normalize_destinations};
use crate::query::{validate_airport, Cabin, SearchParams, SortBy};
use crate::search::FareEngine;
use crate::source::{read_payload, FileSource, OfferSource, StaticSource};

const DEFAULT_CLIENT: &str = "mcp";

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct RankArgs {
    #[schemars(description = "Departure airport IATA code, exactly 3 uppercase letters. Example: LAX")]
    from: String,
    #[schemars(description = "Arrival airport IATA code, exactly 3 uppercase letters. Example: NRT")]
    to: String,
    #[schemars(description = "Departure date in YYYY-MM-DD format. Example: 2026-03-01")]
    depart_date: String,
    #[schemars(description = "Return date in YYYY-MM-DD. Makes the search round-trip")]
    return_date: Option<String>,
    #[schemars(description = "Adult travelers, 1-9. Default: 1")]
    travelers: Option<u32>,
    #[schemars(description = "One of: economy, premium_economy, business, first. Default: economy")]
    cabin: Option<String>,
    #[schemars(description = "One of: direct, one, any. Default: any")]
    max_stops: Option<String>,
    #[schemars(description = "One of: score, price, duration. Default: score")]
    sort_by: Option<String>,
    #[schemars(description = "Trip length range in days as [min, max], min >= 1, max <= 30")]
    duration_days: Option<(u32, u32)>,
    #[schemars(description = "Page number, starting at 1. Default: 1")]
    page: Option<u32>,
    #[schemars(description = "Results per page, 10-50. Default: 20")]
    per_page: Option<u32>,
    #[schemars(description = "Raw flight-offers response body as a JSON string")]
    payload: Option<String>,
    #[schemars(description = "Path to a file holding the raw flight-offers response body")]
    payload_path: Option<String>,
    #[schemars(description = "Caller identity used for rate limiting. Default: mcp")]
    client: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct HistoryArgs {
    #[schemars(description = "Departure airport IATA code. Example: LAX")]
    from: String,
    #[schemars(description = "Arrival airport IATA code. Example: NRT")]
    to: String,
    #[schemars(description = "One of: economy, premium_economy, business, first. Default: economy")]
    cabin: Option<String>,
    #[schemars(description = "Stops bucket, one of: direct, one, any. Default: any")]
    stops: Option<String>,
    #[schemars(description = "How many days back to read. Default: 60")]
    days: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AnywhereArgs {
    #[schemars(description = "Origin airport IATA code. Example: LAX")]
    from: String,
    #[schemars(description = "Raw inspiration-search response body as a JSON string")]
    payload: Option<String>,
    #[schemars(description = "Path to a file holding the raw inspiration-search response body")]
    payload_path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AirportsArgs {
    #[schemars(description = "Search text, at least 2 characters. Example: lon")]
    query: String,
    #[schemars(description = "Raw location-lookup response body as a JSON string")]
    payload: Option<String>,
    #[schemars(description = "Path to a file holding the raw location-lookup response body")]
    payload_path: Option<String>,
}

fn tool_error(msg: impl Into<String>) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg.into())]))
}

fn build_params(args: &RankArgs) -> Result<SearchParams, FareError> {
    let cabin = args
        .cabin
        .as_deref()
        .map(Cabin::from_str_loose)
        .transpose()?
        .unwrap_or_default();
    let max_stops = args
        .max_stops
        .as_deref()
        .map(StopsBucket::from_str_loose)
        .transpose()?
        .unwrap_or_default();
    let sort_by = args
        .sort_by
        .as_deref()
        .map(SortBy::from_str_loose)
        .transpose()?
        .unwrap_or_default();

    let defaults = SearchParams::default();
    Ok(SearchParams {
        round_trip: args.return_date.is_some(),
        from: args.from.trim().to_uppercase(),
        to: args.to.trim().to_uppercase(),
        depart_date: args.depart_date.clone(),
        return_date: args.return_date.clone(),
        travelers: args.travelers.unwrap_or(defaults.travelers),
        cabin,
        max_stops,
        duration_days: args.duration_days,
        page: args.page.unwrap_or(defaults.page),
        per_page: args.per_page.unwrap_or(defaults.per_page),
        sort_by,
    })
}

fn build_source(args: &RankArgs) -> Result<Box<dyn OfferSource>, FareError> {
    match (&args.payload, &args.payload_path) {
        (Some(body), _) => Ok(Box::new(StaticSource::new(serde_json::from_str(body)?))),
        (None, Some(path)) => Ok(Box::new(FileSource::new(path))),
        (None, None) => Err(FareError::Validation(
            "either payload or payload_path is required".into(),
        )),
    }
}

async fn load_payload(payload: Option<&str>, payload_path: Option<&str>) -> Result<serde_json::Value, FareError> {
    match (payload, payload_path) {
        (Some(body), _) => Ok(serde_json::from_str(body)?),
        (None, Some(path)) => read_payload(std::path::Path::new(path)).await,
        (None, None) => Err(FareError::Validation(
            "either payload or payload_path is required".into(),
        )),
    }
}

fn history_route_key(args: &HistoryArgs) -> Result<RouteKey, FareError> {
    let from = args.from.trim().to_uppercase();
    let to = args.to.trim().to_uppercase();
    validate_airport(&from)?;
    validate_airport(&to)?;
    let cabin = args
        .cabin
        .as_deref()
        .map(Cabin::from_str_loose)
        .transpose()?
        .unwrap_or_default();
    let bucket = args
        .stops
        .as_deref()
        .map(StopsBucket::from_str_loose)
        .transpose()?
        .unwrap_or_default();
    Ok(RouteKey::new(&from, &to, cabin.provider_code(), bucket))
}

fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => Ok(CallToolResult::success(vec![Content::text(json)])),
        Err(e) => tool_error(e.to_string()),
    }
}

#[derive(Debug, Clone)]
struct FareMcp {
    engine: Arc<FareEngine>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl FareMcp {
    fn new(engine: Arc<FareEngine>) -> Self {
        Self {
            engine,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Rank raw flight offers. Normalizes a flight-offers response body, records its prices into the route's rolling history, scores every offer (0-100) against the route's median price and returns a sorted page with score breakdowns and badges such as 'amazing deal' or 'tight connection'. Pass the body inline as 'payload' or as a file via 'payload_path'. Identical searches within 10 minutes reuse the cached body."
    )]
    async fn rank_offers(
        &self,
        Parameters(args): Parameters<RankArgs>,
    ) -> Result<CallToolResult, McpError> {
        let params = match build_params(&args) {
            Ok(p) => p,
            Err(e) => return tool_error(e.to_string()),
        };
        let source = match build_source(&args) {
            Ok(s) => s,
            Err(e) => return tool_error(e.to_string()),
        };
        let client = args.client.as_deref().unwrap_or(DEFAULT_CLIENT);

        match self.engine.search(client, &params, source.as_ref()).await {
            Ok(page) => json_result(&page),
            Err(e) => tool_error(e.to_string()),
        }
    }

    #[tool(
        description = "Read the recorded price history for a route, oldest first. A route is origin, destination, cabin and stops bucket (direct, one, any)."
    )]
    async fn price_history(
        &self,
        Parameters(args): Parameters<HistoryArgs>,
    ) -> Result<CallToolResult, McpError> {
        let route_key = match history_route_key(&args) {
            Ok(k) => k,
            Err(e) => return tool_error(e.to_string()),
        };
        let rows = self
            .engine
            .price_history(&route_key, args.days.unwrap_or(DEFAULT_HISTORY_DAYS))
            .await;

        json_result(&serde_json::json!({
            "routeKey": route_key,
            "items": rows,
        }))
    }

    #[tool(
        description = "List the cheapest destinations from an origin. Normalizes a raw inspiration-search response body into {destination, departureDate, returnDate, price, currency} rows. Pass the body inline as 'payload' or as a file via 'payload_path'."
    )]
    async fn anywhere_destinations(
        &self,
        Parameters(args): Parameters<AnywhereArgs>,
    ) -> Result<CallToolResult, McpError> {
        let from = args.from.trim().to_uppercase();
        if let Err(e) = validate_airport(&from) {
            return tool_error(e.to_string());
        }
        let raw = match load_payload(args.payload.as_deref(), args.payload_path.as_deref()).await {
            Ok(v) => v,
            Err(e) => return tool_error(e.to_string()),
        };
        json_result(&serde_json::json!({
            "from": from,
            "items": normalize_destinations(&raw),
        }))
    }

    #[tool(
        description = "Suggest airports and cities. Normalizes a raw location-lookup response body into {id, iata, name, city, country, type} rows. A query shorter than 2 characters returns no rows."
    )]
    async fn airport_suggestions(
        &self,
        Parameters(args): Parameters<AirportsArgs>,
    ) -> Result<CallToolResult, McpError> {
        if !is_airport_query(&args.query) {
            return json_result(&serde_json::json!({ "items": [] }));
        }
        let raw = match load_payload(args.payload.as_deref(), args.payload_path.as_deref()).await {
            Ok(v) => v,
            Err(e) => return tool_error(e.to_string()),
        };
        json_result(&serde_json::json!({
            "items": normalize_airports(&args.query, &raw),
        }))
    }
}

#[tool_handler]
impl ServerHandler for FareMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "farescore".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Flight offer ranking. Call rank_offers with a raw flight-offers body to get scored, sorted offers. Prices seen by rank_offers build each route's baseline; read it back with price_history. anywhere_destinations and airport_suggestions normalize inspiration and location-lookup bodies.".into(),
            ),
        }
    }
}

pub async fn run(engine: Arc<FareEngine>) -> Result<(), FareError> {
    let service = FareMcp::new(engine)
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| FareError::Mcp(e.to_string()))?;
    service
        .waiting()
        .await
        .map_err(|e| FareError::Mcp(e.to_string()))?;
    Ok(())
}
