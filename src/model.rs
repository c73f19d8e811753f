use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub from: String,
    pub to: String,
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
    pub carrier: String,
    pub flight_number: Option<String>,
    pub duration_minutes: u32,
}

/// One purchasable itinerary. `stops` and `airlines` are derived from
/// `segments` when the offer is built and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: String,
    pub price: f64,
    pub currency: String,
    pub segments: Vec<Segment>,
    pub total_duration_minutes: u32,
    pub stops: u32,
    pub cabin: String,
    pub airlines: Vec<String>,
    pub deep_link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Badge {
    #[serde(rename = "amazing deal")]
    AmazingDeal,
    #[serde(rename = "bad airline")]
    BadAirline,
    #[serde(rename = "tight connection")]
    TightConnection,
    #[serde(rename = "long layover")]
    LongLayover,
}

impl Badge {
    pub fn label(self) -> &'static str {
        match self {
            Self::AmazingDeal => "amazing deal",
            Self::BadAirline => "bad airline",
            Self::TightConnection => "tight connection",
            Self::LongLayover => "long layover",
        }
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-component contribution to a score. `layovers` holds the penalty as a
/// negative number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub price: f64,
    pub stops: f64,
    pub airline: f64,
    pub duration: f64,
    pub time: f64,
    pub trip_length: f64,
    pub layovers: f64,
}

impl ScoreBreakdown {
    pub fn sum(&self) -> f64 {
        self.price
            + self.stops
            + self.airline
            + self.duration
            + self.time
            + self.trip_length
            + self.layovers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredOffer {
    #[serde(flatten)]
    pub offer: Offer,
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub price: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub items: Vec<ScoredOffer>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
    pub route_key: String,
    pub baseline: Option<f64>,
}

/// One row of a cheapest-destination search from a fixed origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub destination: Option<String>,
    pub departure_date: Option<String>,
    pub return_date: Option<String>,
    pub price: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AirportSuggestion {
    pub id: Option<String>,
    pub iata: Option<String>,
    pub name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
