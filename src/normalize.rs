use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;

use crate::model::{AirportSuggestion, Destination, Offer, Segment};

static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?$").expect("valid duration pattern")
});

const DEFAULT_CABIN: &str = "ECONOMY";
const DEFAULT_CURRENCY: &str = "USD";

/// Airport lookups shorter than this return nothing.
pub const MIN_AIRPORT_QUERY_LEN: usize = 2;

fn get<'a>(val: &'a Value, key: &str) -> Option<&'a Value> {
    val.get(key).filter(|v| !v.is_null())
}

fn get_str(val: &Value, key: &str) -> Option<String> {
    match get(val, key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn get_array<'a>(val: &'a Value, key: &str) -> &'a [Value] {
    get(val, key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

pub fn parse_duration_minutes(iso: Option<&str>) -> u32 {
    let Some(caps) = iso.and_then(|s| ISO_DURATION.captures(s)) else {
        return 0;
    };
    let part = |idx: usize| -> u32 {
        caps.get(idx)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    };
    part(1).saturating_mul(60).saturating_add(part(2))
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .map(|naive| naive.and_utc())
}

/// Numeric or numeric-string amount; anything else, negative or non-finite is 0.
fn parse_amount(val: Option<&Value>) -> f64 {
    let amount = match val {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

fn parse_price(price: Option<&Value>) -> f64 {
    parse_amount(price.and_then(|p| get(p, "grandTotal").or_else(|| get(p, "total"))))
}

fn parse_cabin(item: &Value) -> String {
    get_array(item, "travelerPricings")
        .first()
        .and_then(|tp| get_array(tp, "fareDetailsBySegment").first())
        .and_then(|fd| get_str(fd, "cabin"))
        .unwrap_or_else(|| DEFAULT_CABIN.to_string())
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

pub fn generate_offer_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    format!(
        "{}{}",
        to_base36(rand::random::<u64>() >> 16),
        to_base36(millis)
    )
}

fn parse_segment(seg: &Value, duration_minutes: u32) -> Option<Segment> {
    let departure = get(seg, "departure");
    let arrival = get(seg, "arrival");

    let departure_at = departure
        .and_then(|d| get_str(d, "at"))
        .and_then(|s| parse_timestamp(&s))?;
    let arrival_at = arrival
        .and_then(|a| get_str(a, "at"))
        .and_then(|s| parse_timestamp(&s))?;
    let carrier = get_str(seg, "carrierCode")?;

    Some(Segment {
        from: departure
            .and_then(|d| get_str(d, "iataCode"))
            .unwrap_or_default(),
        to: arrival.and_then(|a| get_str(a, "iataCode")).unwrap_or_default(),
        departure_at,
        arrival_at,
        carrier,
        flight_number: get_str(seg, "number"),
        duration_minutes,
    })
}

fn normalize_offer(item: &Value) -> Offer {
    let mut segments = Vec::new();
    let mut total_duration_minutes: u32 = 0;
    let mut stops: u32 = 0;

    for itinerary in get_array(item, "itineraries") {
        let mut kept: u32 = 0;
        for seg in get_array(itinerary, "segments") {
            let duration = parse_duration_minutes(get(seg, "duration").and_then(Value::as_str));
            total_duration_minutes = total_duration_minutes.saturating_add(duration);
            if let Some(segment) = parse_segment(seg, duration) {
                segments.push(segment);
                kept += 1;
            }
        }
        stops = stops.max(kept.saturating_sub(1));
    }
    segments.sort_by_key(|s| s.departure_at);

    let mut airlines: Vec<String> = Vec::new();
    for seg in &segments {
        if !airlines.contains(&seg.carrier) {
            airlines.push(seg.carrier.clone());
        }
    }

    let price = get(item, "price");

    Offer {
        id: get_str(item, "id").unwrap_or_else(generate_offer_id),
        price: parse_price(price),
        currency: price
            .and_then(|p| get_str(p, "currency"))
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        segments,
        total_duration_minutes,
        stops,
        cabin: parse_cabin(item),
        airlines,
        deep_link: None,
    }
}

/// Converts a raw flight-offers response body into canonical offers, one per
/// input offer and in input order. A body whose `data` field is not an array
/// yields no offers.
pub fn normalize_offers(body: &Value) -> Vec<Offer> {
    let Some(data) = body.get("data").and_then(Value::as_array) else {
        tracing::debug!("provider payload has no data array");
        return Vec::new();
    };
    data.iter().map(normalize_offer).collect()
}

fn data_array(body: &Value) -> &[Value] {
    body.get("data")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn normalize_destination(item: &Value) -> Destination {
    let price = get(item, "price");
    // inspiration prices come either as a block with `total` or as a bare amount
    let amount = match price {
        Some(Value::Object(_)) => price.and_then(|p| get(p, "total")),
        other => other,
    };

    Destination {
        destination: get_str(item, "destination"),
        departure_date: get_str(item, "departureDate"),
        return_date: get_str(item, "returnDate"),
        price: parse_amount(amount),
        currency: price
            .and_then(|p| get_str(p, "currency"))
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
    }
}

/// Cheapest-destination ("anywhere") results, one per input row and in input
/// order. A body whose `data` field is not an array yields nothing.
pub fn normalize_destinations(body: &Value) -> Vec<Destination> {
    data_array(body).iter().map(normalize_destination).collect()
}

pub fn is_airport_query(query: &str) -> bool {
    query.trim().chars().count() >= MIN_AIRPORT_QUERY_LEN
}

fn normalize_airport(item: &Value) -> AirportSuggestion {
    let address = get(item, "address");
    AirportSuggestion {
        id: get_str(item, "id"),
        iata: get_str(item, "iataCode"),
        name: get_str(item, "name").or_else(|| get_str(item, "detailedName")),
        city: address.and_then(|a| get_str(a, "cityName")),
        country: address.and_then(|a| get_str(a, "countryCode")),
        kind: get_str(item, "subType"),
    }
}

/// Location-lookup results for `query`. Too short a query yields nothing, as
/// does a body whose `data` field is not an array.
pub fn normalize_airports(query: &str, body: &Value) -> Vec<AirportSuggestion> {
    if !is_airport_query(query) {
        return Vec::new();
    }
    data_array(body).iter().map(normalize_airport).collect()
}
