use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::baseline::StopsBucket;
use crate::error::FareError;

pub const MAX_DAYS_AHEAD: u64 = 330;
pub const MAX_TRAVELERS: u32 = 9;
pub const MAX_TRIP_DURATION_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cabin {
    #[default]
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl Cabin {
    pub fn from_str_loose(s: &str) -> Result<Self, FareError> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "economy" => Ok(Self::Economy),
            "premium_economy" => Ok(Self::PremiumEconomy),
            "business" => Ok(Self::Business),
            "first" => Ok(Self::First),
            _ => Err(FareError::Validation(format!("invalid cabin class: {s}"))),
        }
    }

    pub fn provider_code(self) -> &'static str {
        match self {
            Self::Economy => "ECONOMY",
            Self::PremiumEconomy => "PREMIUM_ECONOMY",
            Self::Business => "BUSINESS",
            Self::First => "FIRST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Score,
    Price,
    Duration,
}

impl SortBy {
    pub fn from_str_loose(s: &str) -> Result<Self, FareError> {
        match s.to_ascii_lowercase().as_str() {
            "score" => Ok(Self::Score),
            "price" => Ok(Self::Price),
            "duration" => Ok(Self::Duration),
            _ => Err(FareError::Validation(format!(
                "invalid sort order: {s} (expected score, price or duration)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub round_trip: bool,
    pub from: String,
    pub to: String,
    pub depart_date: String,
    pub return_date: Option<String>,
    pub travelers: u32,
    pub cabin: Cabin,
    pub max_stops: StopsBucket,
    /// Trip length range in days, `(min, max)`.
    pub duration_days: Option<(u32, u32)>,
    pub page: u32,
    pub per_page: u32,
    pub sort_by: SortBy,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            round_trip: false,
            from: String::new(),
            to: String::new(),
            depart_date: String::new(),
            return_date: None,
            travelers: 1,
            cabin: Cabin::Economy,
            max_stops: StopsBucket::Any,
            duration_days: None,
            page: 1,
            per_page: 20,
            sort_by: SortBy::Score,
        }
    }
}

pub fn validate_airport(code: &str) -> Result<(), FareError> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(FareError::InvalidAirport(code.to_string()));
    }
    Ok(())
}

/// Parses a `MIN,MAX` trip length range such as `3,10`.
pub fn parse_duration_days(s: &str) -> Result<(u32, u32), FareError> {
    let invalid = || FareError::Validation(format!("invalid duration days: {s} (expected MIN,MAX)"));
    let (min, max) = s.split_once(',').ok_or_else(invalid)?;
    let min = min.trim().parse::<u32>().map_err(|_| invalid())?;
    let max = max.trim().parse::<u32>().map_err(|_| invalid())?;
    Ok((min, max))
}

fn validate_date(date: &str, today: NaiveDate) -> Result<(), FareError> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| FareError::InvalidDate(date.to_string()))?;
    let latest = today
        .checked_add_days(Days::new(MAX_DAYS_AHEAD))
        .unwrap_or(NaiveDate::MAX);

    if parsed < today || parsed > latest {
        return Err(FareError::InvalidDate(date.to_string()));
    }
    Ok(())
}

/// The part of a search the provider sees. Pagination and ordering are
/// applied after scoring, so they stay out of the cache key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderQuery<'a> {
    pub round_trip: bool,
    pub from: &'a str,
    pub to: &'a str,
    pub depart_date: &'a str,
    pub return_date: Option<&'a str>,
    pub travelers: u32,
    pub cabin: Cabin,
    pub max_stops: StopsBucket,
    pub duration_days: Option<(u32, u32)>,
}

impl SearchParams {
    pub fn provider_query(&self) -> ProviderQuery<'_> {
        ProviderQuery {
            round_trip: self.round_trip,
            from: &self.from,
            to: &self.to,
            depart_date: &self.depart_date,
            return_date: self.return_date.as_deref(),
            travelers: self.travelers,
            cabin: self.cabin,
            max_stops: self.max_stops,
            duration_days: self.duration_days,
        }
    }

    pub fn validate(&self) -> Result<(), FareError> {
        self.validate_at(Utc::now().date_naive())
    }

    pub fn validate_at(&self, today: NaiveDate) -> Result<(), FareError> {
        validate_airport(&self.from)?;
        validate_airport(&self.to)?;
        validate_date(&self.depart_date, today)?;

        match (&self.return_date, self.round_trip) {
            (Some(ret), _) => validate_date(ret, today)?,
            (None, true) => {
                return Err(FareError::Validation(
                    "a return date is required for round-trip searches".into(),
                ))
            }
            (None, false) => {}
        }

        if self.travelers == 0 || self.travelers > MAX_TRAVELERS {
            return Err(FareError::Validation(format!(
                "travelers ({}) must be between 1 and {MAX_TRAVELERS}",
                self.travelers
            )));
        }

        if let Some((min, max)) = self.duration_days {
            if min < 1 || max > MAX_TRIP_DURATION_DAYS {
                return Err(FareError::Validation(format!(
                    "duration days ({min},{max}) must start at 1 or more and end at \
                     {MAX_TRIP_DURATION_DAYS} or less"
                )));
            }
        }

        if self.page == 0 {
            return Err(FareError::Validation("page starts at 1".into()));
        }

        if !(10..=50).contains(&self.per_page) {
            return Err(FareError::Validation(format!(
                "per page ({}) must be between 10 and 50",
                self.per_page
            )));
        }

        Ok(())
    }
}
