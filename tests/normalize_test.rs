use farescore::normalize::{
    generate_offer_id, is_airport_query, normalize_airports, normalize_destinations,
    normalize_offers, parse_duration_minutes, parse_timestamp,
};
use serde_json::{json, Value};

fn seg(from: &str, to: &str, dep: &str, arr: &str, carrier: &str, duration: &str) -> Value {
    json!({
        "departure": { "iataCode": from, "at": dep },
        "arrival": { "iataCode": to, "at": arr },
        "carrierCode": carrier,
        "number": "100",
        "duration": duration
    })
}

fn offer(id: &str, total: &str, itineraries: Vec<Vec<Value>>) -> Value {
    json!({
        "id": id,
        "price": { "total": total, "currency": "EUR" },
        "itineraries": itineraries
            .into_iter()
            .map(|segments| json!({ "segments": segments }))
            .collect::<Vec<_>>(),
        "travelerPricings": [
            { "fareDetailsBySegment": [ { "cabin": "BUSINESS" } ] }
        ]
    })
}

#[test]
fn normalizes_a_direct_offer() {
    let body = json!({
        "data": [offer(
            "1",
            "512.40",
            vec![vec![seg("LAX", "NRT", "2026-05-01T10:00:00", "2026-05-02T14:30:00", "JL", "PT11H30M")]],
        )]
    });

    let offers = normalize_offers(&body);
    assert_eq!(offers.len(), 1);
    let o = &offers[0];
    assert_eq!(o.id, "1");
    assert!((o.price - 512.40).abs() < 1e-9);
    assert_eq!(o.currency, "EUR");
    assert_eq!(o.cabin, "BUSINESS");
    assert_eq!(o.stops, 0);
    assert_eq!(o.total_duration_minutes, 690);
    assert_eq!(o.airlines, vec!["JL"]);
    assert_eq!(o.segments[0].from, "LAX");
    assert_eq!(o.segments[0].to, "NRT");
    assert_eq!(o.segments[0].flight_number.as_deref(), Some("100"));
    assert!(o.deep_link.is_none());
}

#[test]
fn segment_without_carrier_is_dropped_alone() {
    let mut broken = seg("ORD", "NRT", "2026-05-01T14:00:00", "2026-05-02T17:00:00", "UA", "PT13H");
    broken.as_object_mut().unwrap().remove("carrierCode");

    let body = json!({
        "data": [offer(
            "a",
            "700",
            vec![vec![
                seg("LAX", "ORD", "2026-05-01T08:00:00", "2026-05-01T12:00:00", "AA", "PT4H"),
                broken,
            ]],
        )]
    });

    let offers = normalize_offers(&body);
    assert_eq!(offers.len(), 1);
    let o = &offers[0];
    assert_eq!(o.segments.len(), 1);
    assert_eq!(o.segments[0].carrier, "AA");
    assert_eq!(o.stops, 0);
    assert_eq!(o.airlines, vec!["AA"]);
    // dropped segments still count toward the total
    assert_eq!(o.total_duration_minutes, 4 * 60 + 13 * 60);
}

#[test]
fn stops_is_max_across_itineraries() {
    let outbound = vec![
        seg("LAX", "SFO", "2026-05-01T06:00:00", "2026-05-01T07:30:00", "UA", "PT1H30M"),
        seg("SFO", "NRT", "2026-05-01T09:00:00", "2026-05-02T13:00:00", "UA", "PT11H"),
    ];
    let inbound = vec![seg("NRT", "LAX", "2026-05-15T17:00:00", "2026-05-15T10:00:00", "NH", "PT10H")];

    let offers = normalize_offers(&json!({ "data": [offer("rt", "900", vec![outbound, inbound])] }));
    let o = &offers[0];
    assert_eq!(o.stops, 1);
    assert_eq!(o.segments.len(), 3);
    assert_eq!(o.airlines, vec!["UA", "NH"]);
    assert_eq!(o.total_duration_minutes, 90 + 660 + 600);
}

#[test]
fn segments_are_ordered_by_departure() {
    let body = json!({
        "data": [offer(
            "x",
            "300",
            vec![vec![
                seg("SFO", "NRT", "2026-05-01T09:00:00", "2026-05-02T13:00:00", "UA", "PT11H"),
                seg("LAX", "SFO", "2026-05-01T06:00:00", "2026-05-01T07:30:00", "AS", "PT1H30M"),
            ]],
        )]
    });
    let o = &normalize_offers(&body)[0];
    assert_eq!(o.segments[0].from, "LAX");
    assert_eq!(o.segments[1].from, "SFO");
    assert_eq!(o.airlines, vec!["AS", "UA"]);
}

#[test]
fn grand_total_wins_over_total() {
    let body = json!({
        "data": [{
            "id": "g",
            "price": { "total": "100.00", "grandTotal": "123.45", "currency": "USD" },
            "itineraries": []
        }]
    });
    let o = &normalize_offers(&body)[0];
    assert!((o.price - 123.45).abs() < 1e-9);
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    let body = json!({ "data": [{ "itineraries": [] }] });
    let o = &normalize_offers(&body)[0];
    assert_eq!(o.price, 0.0);
    assert_eq!(o.currency, "USD");
    assert_eq!(o.cabin, "ECONOMY");
    assert_eq!(o.stops, 0);
    assert!(o.segments.is_empty());
    assert!(o.airlines.is_empty());
    assert!(!o.id.is_empty());
}

#[test]
fn unparseable_or_negative_price_is_zero() {
    let body = json!({
        "data": [
            { "id": "a", "price": { "total": "abc" } },
            { "id": "b", "price": { "total": "-40" } },
            { "id": "c", "price": { "total": 88.5 } }
        ]
    });
    let offers = normalize_offers(&body);
    assert_eq!(offers[0].price, 0.0);
    assert_eq!(offers[1].price, 0.0);
    assert!((offers[2].price - 88.5).abs() < 1e-9);
}

#[test]
fn non_array_data_yields_nothing() {
    assert!(normalize_offers(&json!({})).is_empty());
    assert!(normalize_offers(&json!({ "data": null })).is_empty());
    assert!(normalize_offers(&json!({ "data": { "id": "1" } })).is_empty());
    assert!(normalize_offers(&json!("oops")).is_empty());
}

#[test]
fn offer_order_is_preserved() {
    let body = json!({
        "data": [
            { "id": "third", "price": { "total": "3" } },
            { "id": "first", "price": { "total": "1" } },
            { "id": "second", "price": { "total": "2" } }
        ]
    });
    let ids: Vec<String> = normalize_offers(&body).into_iter().map(|o| o.id).collect();
    assert_eq!(ids, vec!["third", "first", "second"]);
}

#[test]
fn parses_iso_durations() {
    assert_eq!(parse_duration_minutes(Some("PT2H15M")), 135);
    assert_eq!(parse_duration_minutes(Some("PT45M")), 45);
    assert_eq!(parse_duration_minutes(Some("PT11H")), 660);
    assert_eq!(parse_duration_minutes(Some("P1D")), 0);
    assert_eq!(parse_duration_minutes(Some("garbage")), 0);
    assert_eq!(parse_duration_minutes(None), 0);
}

#[test]
fn parses_local_and_offset_timestamps() {
    let naive = parse_timestamp("2026-05-01T10:00:00").unwrap();
    assert_eq!(naive.to_rfc3339(), "2026-05-01T10:00:00+00:00");

    let short = parse_timestamp("2026-05-01T10:00").unwrap();
    assert_eq!(short, naive);

    let offset = parse_timestamp("2026-05-01T12:00:00+02:00").unwrap();
    assert_eq!(offset, naive);

    assert!(parse_timestamp("yesterday").is_none());
}

#[test]
fn parses_fractional_and_space_separated_timestamps() {
    let whole = parse_timestamp("2026-05-01T06:00:00").unwrap();
    assert_eq!(parse_timestamp("2026-05-01T06:00:00.000"), Some(whole));
    assert_eq!(parse_timestamp("2026-05-01 06:00:00"), Some(whole));
    assert_eq!(parse_timestamp("2026-05-01 06:00"), Some(whole));

    let millis = parse_timestamp("2026-05-01T06:00:00.250").unwrap();
    assert_eq!((millis - whole).num_milliseconds(), 250);
}

#[test]
fn millisecond_timestamps_keep_every_segment() {
    let body = json!({
        "data": [offer(
            "ms",
            "640",
            vec![vec![
                seg("LAX", "SFO", "2026-05-01T06:00:00.000", "2026-05-01T07:30:00.000", "UA", "PT1H30M"),
                seg("SFO", "NRT", "2026-05-01T09:00:00.000", "2026-05-02T13:00:00.000", "UA", "PT11H"),
            ]],
        )]
    });

    let o = &normalize_offers(&body)[0];
    assert_eq!(o.segments.len(), 2);
    assert_eq!(o.stops, 1);
    assert_eq!(o.airlines, vec!["UA"]);
    assert_eq!(o.total_duration_minutes, 750);
}

#[test]
fn normalizes_destinations() {
    let body = json!({
        "data": [
            {
                "destination": "NRT",
                "departureDate": "2026-05-01",
                "returnDate": "2026-05-08",
                "price": { "total": "612.30", "currency": "EUR" }
            },
            { "destination": "JFK", "departureDate": "2026-05-03", "price": 199 },
            { "destination": "LHR", "price": { "currency": "GBP" } },
            {}
        ]
    });

    let rows = normalize_destinations(&body);
    assert_eq!(rows.len(), 4);

    assert_eq!(rows[0].destination.as_deref(), Some("NRT"));
    assert_eq!(rows[0].return_date.as_deref(), Some("2026-05-08"));
    assert!((rows[0].price - 612.30).abs() < 1e-9);
    assert_eq!(rows[0].currency, "EUR");

    // bare amount, no return date, default currency
    assert_eq!(rows[1].price, 199.0);
    assert_eq!(rows[1].return_date, None);
    assert_eq!(rows[1].currency, "USD");

    assert_eq!(rows[2].price, 0.0);
    assert_eq!(rows[2].currency, "GBP");

    assert_eq!(rows[3].destination, None);
    assert_eq!(rows[3].price, 0.0);
}

#[test]
fn destinations_need_a_data_array() {
    assert!(normalize_destinations(&json!({})).is_empty());
    assert!(normalize_destinations(&json!({ "data": "NRT" })).is_empty());
}

#[test]
fn destinations_serialize_return_date_as_null() {
    let rows = normalize_destinations(&json!({ "data": [{ "destination": "JFK", "price": 1 }] }));
    let json = serde_json::to_value(&rows[0]).unwrap();
    assert!(json["returnDate"].is_null());
    assert_eq!(json["departureDate"], Value::Null);
}

#[test]
fn normalizes_airport_suggestions() {
    let body = json!({
        "data": [
            {
                "id": "CLON",
                "iataCode": "LON",
                "name": "LONDON",
                "subType": "CITY",
                "address": { "cityName": "LONDON", "countryCode": "GB" }
            },
            {
                "id": "ALHR",
                "iataCode": "LHR",
                "detailedName": "LONDON/GB:HEATHROW",
                "subType": "AIRPORT"
            }
        ]
    });

    let rows = normalize_airports("lon", &body);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].iata.as_deref(), Some("LON"));
    assert_eq!(rows[0].city.as_deref(), Some("LONDON"));
    assert_eq!(rows[0].country.as_deref(), Some("GB"));
    assert_eq!(rows[0].kind.as_deref(), Some("CITY"));

    // falls back to the detailed name; no address
    assert_eq!(rows[1].name.as_deref(), Some("LONDON/GB:HEATHROW"));
    assert_eq!(rows[1].city, None);

    let json = serde_json::to_value(&rows[1]).unwrap();
    assert_eq!(json["type"], "AIRPORT");
}

#[test]
fn short_airport_query_yields_nothing() {
    let body = json!({ "data": [{ "iataCode": "LHR" }] });
    assert!(!is_airport_query("l"));
    assert!(!is_airport_query(" l "));
    assert!(is_airport_query("lo"));
    assert!(normalize_airports("l", &body).is_empty());
    assert!(normalize_airports("", &body).is_empty());
    assert_eq!(normalize_airports("lh", &body).len(), 1);
    assert!(normalize_airports("lhr", &json!({ "data": null })).is_empty());
}

#[test]
fn generated_ids_are_distinct() {
    let a = generate_offer_id();
    let b = generate_offer_id();
    assert!(!a.is_empty());
    assert_ne!(a, b);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
}
