use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use farescore::baseline::{RouteKey, StopsBucket};
use farescore::config::{DEFAULT_CACHE_TTL, DEFAULT_HISTORY_DAYS};
use farescore::error::FareError;
use farescore::model::SearchPage;
use farescore::normalize::{is_airport_query, normalize_airports, normalize_destinations};
use farescore::query::{parse_duration_days, validate_airport, Cabin, SearchParams, SortBy};
use farescore::source::{read_payload, DirectorySource, FileSource};
use farescore::{logging, table, EngineConfig, FareEngine};

#[derive(Parser)]
#[command(
    name = "farescore",
    about = "Normalize, baseline and rank flight offers from the terminal",
    version,
    after_help = "\
Examples:
  farescore rank -f LAX -t NRT -d 2026-05-01 -i offers.json
  curl ... | farescore rank -f LAX -t NRT -d 2026-05-01 --return-date 2026-05-15 --json
  farescore history -f LAX -t NRT --stops one --days 30 --history-file prices.jsonl
  farescore prewarm -f LAX -t NRT,JFK,LHR --dir payloads/ --history-file prices.jsonl
  farescore anywhere -f LAX -i destinations.json
  farescore airports -q lon -i locations.json"
)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "More log output (-v info, -vv debug)")]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct EngineArgs {
    #[arg(
        long,
        global = true,
        env = "FARESCORE_HISTORY_FILE",
        value_name = "PATH",
        help = "JSON-lines file that keeps recorded price snapshots"
    )]
    history_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "FARESCORE_CACHE_TTL_SECS",
        value_name = "SECS",
        default_value_t = DEFAULT_CACHE_TTL.as_secs(),
        help = "Lifetime of a cached provider response"
    )]
    cache_ttl_secs: u64,

    #[arg(
        long,
        global = true,
        env = "FARESCORE_RATE_LIMIT",
        value_name = "N",
        default_value = "20",
        help = "Searches allowed per client per window"
    )]
    rate_limit: usize,

    #[arg(
        long,
        global = true,
        env = "FARESCORE_RATE_WINDOW_SECS",
        value_name = "SECS",
        default_value = "60",
        help = "Rate limit window"
    )]
    rate_window_secs: u64,

    #[arg(
        long,
        global = true,
        env = "FARESCORE_HISTORY_WINDOW",
        value_name = "N",
        default_value = "200",
        help = "Price snapshots kept in memory per route"
    )]
    history_window: usize,
}

impl EngineArgs {
    fn to_config(&self) -> EngineConfig {
        EngineConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            rate_limit: self.rate_limit,
            rate_window: Duration::from_secs(self.rate_window_secs),
            history_window: self.history_window,
            history_file: self.history_file.clone(),
        }
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    #[command(
        about = "Score and rank a raw flight-offers response",
        long_about = "Normalize a raw flight-offers response body, record its prices, \
            score every offer against the route's median price and print a ranked page.\n\
            Reads the body from --input, or from stdin when --input is - (the default).",
        after_help = "\
Examples:
  One-way:      farescore rank -f JFK -t LHR -d 2026-04-01 -i offers.json
  Round-trip:   farescore rank -f LAX -t NRT -d 2026-05-01 --return-date 2026-05-15 -i rt.json
  By price:     farescore rank -f HEL -t BCN -d 2026-03-01 --sort price -i offers.json
  JSON output:  farescore rank -f HEL -t BCN -d 2026-03-01 --json --pretty < offers.json"
    )]
    Rank(RankArgs),
    #[command(about = "Show recorded price history for a route")]
    History(HistoryArgs),
    #[command(about = "Seed price history from a directory of FROM-TO.json payloads")]
    Prewarm(PrewarmArgs),
    #[command(about = "List cheapest destinations from an origin (inspiration results)")]
    Anywhere(AnywhereArgs),
    #[command(about = "List airport and city suggestions from a location lookup")]
    Airports(AirportsArgs),
    #[command(about = "Start MCP server for AI agents (stdio transport)")]
    Mcp,
}

#[derive(clap::Args)]
struct OutputArgs {
    #[arg(long, help = "Output as JSON")]
    json: bool,

    #[arg(long, help = "Output as pretty-printed JSON")]
    pretty: bool,
}

impl OutputArgs {
    fn is_json(&self) -> bool {
        self.json || self.pretty
    }
}

#[derive(clap::Args)]
struct RankArgs {
    #[arg(short, long, value_name = "IATA", help = "Departure airport code")]
    from: String,

    #[arg(short, long, value_name = "IATA", help = "Arrival airport code")]
    to: String,

    #[arg(short, long = "depart", value_name = "YYYY-MM-DD", help = "Departure date")]
    depart_date: String,

    #[arg(long, value_name = "YYYY-MM-DD", help = "Return date (makes the search round-trip)")]
    return_date: Option<String>,

    #[arg(long, default_value = "1", value_name = "N", help = "Number of adult travelers")]
    travelers: u32,

    #[arg(
        long,
        default_value = "economy",
        value_name = "CLASS",
        help = "Cabin [economy, premium_economy, business, first]"
    )]
    cabin: String,

    #[arg(long, default_value = "any", value_name = "BUCKET", help = "Stops [direct, one, any]")]
    max_stops: String,

    #[arg(long, default_value = "score", value_name = "ORDER", help = "Sort [score, price, duration]")]
    sort: String,

    #[arg(long, value_name = "MIN,MAX", help = "Trip length range in days (e.g. 3,10)")]
    duration_days: Option<String>,

    #[arg(long, default_value = "1", value_name = "N", help = "Page number")]
    page: u32,

    #[arg(long, default_value = "20", value_name = "N", help = "Results per page (10-50)")]
    per_page: u32,

    #[arg(short, long, default_value = "-", value_name = "PATH", help = "Raw response file, - for stdin")]
    input: PathBuf,

    #[arg(long, default_value = "cli", value_name = "ID", help = "Client identity for rate limiting")]
    client: String,

    #[arg(long, help = "One-line-per-offer output")]
    compact: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
struct HistoryArgs {
    #[arg(short, long, value_name = "IATA", help = "Departure airport code")]
    from: String,

    #[arg(short, long, value_name = "IATA", help = "Arrival airport code")]
    to: String,

    #[arg(long, default_value = "economy", value_name = "CLASS", help = "Cabin class")]
    cabin: String,

    #[arg(long, default_value = "any", value_name = "BUCKET", help = "Stops bucket [direct, one, any]")]
    stops: String,

    #[arg(long, default_value_t = DEFAULT_HISTORY_DAYS, value_name = "N", help = "Days of history")]
    days: u32,

    #[arg(long, default_value = "USD", value_name = "CODE", help = "Currency label for prices")]
    currency: String,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
struct AnywhereArgs {
    #[arg(short, long, value_name = "IATA", help = "Departure airport code")]
    from: String,

    #[arg(short, long, default_value = "-", value_name = "PATH", help = "Raw response file, - for stdin")]
    input: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
struct AirportsArgs {
    #[arg(short, long, value_name = "TEXT", help = "Search text, at least 2 characters")]
    query: String,

    #[arg(short, long, default_value = "-", value_name = "PATH", help = "Raw response file, - for stdin")]
    input: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
struct PrewarmArgs {
    #[arg(short, long, value_name = "IATA", help = "Departure airport code")]
    from: String,

    #[arg(short, long, value_name = "IATA,...", help = "Destinations, comma-separated")]
    to: String,

    #[arg(long, value_name = "DIR", help = "Directory holding FROM-TO.json payloads")]
    dir: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

fn die(err: &FareError, json_mode: bool) -> ! {
    if json_mode {
        let mut body = serde_json::json!({
            "error": {
                "kind": err.kind(),
                "message": err.to_string(),
            }
        });
        if let FareError::RateLimited { retry_after_secs } = err {
            body["error"]["retryAfter"] = serde_json::json!(retry_after_secs);
        }
        println!("{body}");
    } else {
        eprintln!("error: {err}");
    }
    process::exit(err.exit_code());
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), FareError> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}

fn build_params(args: &RankArgs) -> Result<SearchParams, FareError> {
    Ok(SearchParams {
        round_trip: args.return_date.is_some(),
        from: args.from.to_uppercase(),
        to: args.to.to_uppercase(),
        depart_date: args.depart_date.clone(),
        return_date: args.return_date.clone(),
        travelers: args.travelers,
        cabin: Cabin::from_str_loose(&args.cabin)?,
        max_stops: StopsBucket::from_str_loose(&args.max_stops)?,
        duration_days: args.duration_days.as_deref().map(parse_duration_days).transpose()?,
        page: args.page,
        per_page: args.per_page,
        sort_by: SortBy::from_str_loose(&args.sort)?,
    })
}

fn print_page(page: &SearchPage, args: &RankArgs) -> Result<(), FareError> {
    if args.output.is_json() {
        return print_json(page, args.output.pretty);
    }
    if page.items.is_empty() {
        println!("No offers found.");
        return Ok(());
    }
    if args.compact {
        println!("{}", table::render_compact(page));
    } else {
        println!("{}", table::render(page));
        match page.baseline {
            Some(b) => println!("{} offers, route {}, baseline {b:.2}", page.total, page.route_key),
            None => println!("{} offers, route {}", page.total, page.route_key),
        }
    }
    Ok(())
}

async fn run_rank(engine: &FareEngine, args: &RankArgs) -> Result<(), FareError> {
    let params = build_params(args)?;
    let source = FileSource::new(&args.input);
    let page = engine.search(&args.client, &params, &source).await?;
    print_page(&page, args)
}

fn require_history_file(engine: &FareEngine) -> Result<(), FareError> {
    if engine.config().history_file.is_none() {
        return Err(FareError::Validation(
            "--history-file (or FARESCORE_HISTORY_FILE) is required for this command".into(),
        ));
    }
    Ok(())
}

async fn run_history(engine: &FareEngine, args: &HistoryArgs) -> Result<(), FareError> {
    let from = args.from.trim().to_uppercase();
    let to = args.to.trim().to_uppercase();
    validate_airport(&from)?;
    validate_airport(&to)?;
    require_history_file(engine)?;
    let cabin = Cabin::from_str_loose(&args.cabin)?;
    let bucket = StopsBucket::from_str_loose(&args.stops)?;
    let route_key = RouteKey::new(&from, &to, cabin.provider_code(), bucket);
    let rows = engine.price_history(&route_key, args.days).await;

    if args.output.is_json() {
        let body = serde_json::json!({ "routeKey": route_key, "items": rows });
        return print_json(&body, args.output.pretty);
    }
    if rows.is_empty() {
        println!("No price history for {route_key}.");
        return Ok(());
    }
    println!("{}", table::render_history(&rows, &args.currency));
    Ok(())
}

async fn run_prewarm(engine: &FareEngine, args: &PrewarmArgs) -> Result<(), FareError> {
    require_history_file(engine)?;
    let destinations: Vec<String> = args
        .to
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if destinations.is_empty() {
        return Err(FareError::Validation("--to needs at least one destination".into()));
    }

    let source = DirectorySource::new(&args.dir);
    let outcomes = engine.prewarm(&args.from, &destinations, &source).await;

    if args.output.is_json() {
        let body = serde_json::json!({
            "ok": true,
            "from": args.from.to_uppercase(),
            "results": outcomes,
        });
        return print_json(&body, args.output.pretty);
    }
    for outcome in &outcomes {
        println!("{} -> {}: {} offers recorded", args.from.to_uppercase(), outcome.to, outcome.count);
    }
    Ok(())
}

async fn run_anywhere(args: &AnywhereArgs) -> Result<(), FareError> {
    let from = args.from.trim().to_uppercase();
    validate_airport(&from)?;
    let raw = read_payload(&args.input).await?;
    let items = normalize_destinations(&raw);

    if args.output.is_json() {
        let body = serde_json::json!({ "from": from, "items": items });
        return print_json(&body, args.output.pretty);
    }
    if items.is_empty() {
        println!("No destinations found from {from}.");
        return Ok(());
    }
    println!("{}", table::render_destinations(&items));
    Ok(())
}

async fn run_airports(args: &AirportsArgs) -> Result<(), FareError> {
    let items = if is_airport_query(&args.query) {
        normalize_airports(&args.query, &read_payload(&args.input).await?)
    } else {
        Vec::new()
    };

    if args.output.is_json() {
        let body = serde_json::json!({ "items": items });
        return print_json(&body, args.output.pretty);
    }
    if items.is_empty() {
        println!("No airports found.");
        return Ok(());
    }
    println!("{}", table::render_airports(&items));
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let engine = FareEngine::from_config(cli.engine.to_config());

    let (result, json_mode) = match &cli.command {
        Commands::Mcp => {
            let engine = Arc::new(engine);
            if let Err(e) = farescore::mcp::run(Arc::clone(&engine)).await {
                die(&e, false);
            }
            if let Ok(engine) = Arc::try_unwrap(engine) {
                engine.shutdown().await;
            }
            return;
        }
        Commands::Rank(args) => (run_rank(&engine, args).await, args.output.is_json()),
        Commands::History(args) => (run_history(&engine, args).await, args.output.is_json()),
        Commands::Prewarm(args) => (run_prewarm(&engine, args).await, args.output.is_json()),
        Commands::Anywhere(args) => (run_anywhere(args).await, args.output.is_json()),
        Commands::Airports(args) => (run_airports(args).await, args.output.is_json()),
    };

    engine.shutdown().await;
    if let Err(e) = result {
        die(&e, json_mode);
    }
}
