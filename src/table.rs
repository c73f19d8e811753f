use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::model::{AirportSuggestion, Destination, PriceSnapshot, ScoredOffer, SearchPage};

pub fn format_price(price: f64, currency: &str) -> String {
    let p = format!("{price:.2}");
    match currency {
        "USD" => format!("${p}"),
        "EUR" => format!("€{p}"),
        "GBP" => format!("£{p}"),
        "JPY" | "CNY" => format!("¥{p}"),
        "KRW" => format!("₩{p}"),
        "INR" => format!("₹{p}"),
        "THB" => format!("฿{p}"),
        _ => format!("{p} {currency}"),
    }
}

pub fn format_duration(minutes: u32) -> String {
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

fn format_stops(stops: u32) -> String {
    match stops {
        0 => "Nonstop".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{n} stops"),
    }
}

fn route_of(item: &ScoredOffer) -> String {
    item.offer
        .segments
        .iter()
        .map(|s| format!("{} → {}", s.from, s.to))
        .collect::<Vec<_>>()
        .join("\n")
}

fn badges_of(item: &ScoredOffer) -> String {
    item.badges
        .iter()
        .map(|b| b.label())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn render(page: &SearchPage) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Score", "Price", "Airlines", "Route", "Depart", "Arrive", "Duration", "Stops",
            "Badges",
        ]);

    for item in &page.items {
        let offer = &item.offer;
        let depart = offer
            .segments
            .first()
            .map(|s| s.departure_at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let arrive = offer
            .segments
            .last()
            .map(|s| s.arrival_at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            format!("{:.1}", item.score),
            format_price(offer.price, &offer.currency),
            offer.airlines.join(", "),
            route_of(item),
            depart,
            arrive,
            format_duration(offer.total_duration_minutes),
            format_stops(offer.stops),
            badges_of(item),
        ]);
    }

    table.to_string()
}

/// One line per offer, for scripts and agents.
pub fn render_compact(page: &SearchPage) -> String {
    page.items
        .iter()
        .map(|item| {
            let offer = &item.offer;
            let mut route: Vec<&str> = offer
                .segments
                .first()
                .map(|s| vec![s.from.as_str()])
                .unwrap_or_default();
            route.extend(offer.segments.iter().map(|s| s.to.as_str()));

            let mut line = format!(
                "{:.1} | {} | {} | {} | {} | {}",
                item.score,
                format_price(offer.price, &offer.currency),
                route.join(">"),
                format_duration(offer.total_duration_minutes),
                format_stops(offer.stops),
                offer.airlines.join(","),
            );
            let badges = badges_of(item);
            if !badges.is_empty() {
                line.push_str(" | ");
                line.push_str(&badges);
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_history(rows: &[PriceSnapshot], currency: &str) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Collected", "Price"]);

    for row in rows {
        table.add_row(vec![
            row.collected_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            format_price(row.price, currency),
        ]);
    }

    table.to_string()
}

pub fn render_destinations(rows: &[Destination]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Destination", "Depart", "Return", "Price"]);

    for row in rows {
        table.add_row(vec![
            row.destination.clone().unwrap_or_else(|| "-".to_string()),
            row.departure_date.clone().unwrap_or_else(|| "-".to_string()),
            row.return_date.clone().unwrap_or_else(|| "-".to_string()),
            format_price(row.price, &row.currency),
        ]);
    }

    table.to_string()
}

pub fn render_airports(rows: &[AirportSuggestion]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["IATA", "Name", "City", "Country", "Type"]);

    let cell = |v: &Option<String>| v.clone().unwrap_or_default();
    for row in rows {
        table.add_row(vec![
            cell(&row.iata),
            cell(&row.name),
            cell(&row.city),
            cell(&row.country),
            cell(&row.kind),
        ]);
    }

    table.to_string()
}
