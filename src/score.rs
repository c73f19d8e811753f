use crate::model::{Badge, Offer, ScoreBreakdown, ScoredOffer};

pub const LOW_TIER_CARRIERS: [&str; 4] = ["F9", "G4", "NK", "W6"];

const PRICE_MAX: f64 = 40.0;
const PRICE_NEUTRAL: f64 = 20.0;
const SAVINGS_FOR_MAX: f64 = 0.4;
const AIRLINE_NEUTRAL: f64 = 6.0;
const TIME_OF_DAY_NEUTRAL: f64 = 7.0;
const TRIP_LENGTH_NEUTRAL: f64 = 7.0;
const TIGHT_CONNECTION_MINUTES: i64 = 45;
const LONG_LAYOVER_MINUTES: i64 = 240;
const LAYOVER_PENALTY_CAP: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub badges: Vec<Badge>,
}

impl ScoreResult {
    pub fn apply(self, offer: Offer) -> ScoredOffer {
        ScoredOffer {
            offer,
            score: self.score,
            score_breakdown: self.breakdown,
            badges: self.badges,
        }
    }
}

/// Rounds to one decimal place, halves going up.
pub fn round1(n: f64) -> f64 {
    (n * 10.0 + 0.5).floor() / 10.0
}

fn push_badge(badges: &mut Vec<Badge>, badge: Badge) {
    if !badges.contains(&badge) {
        badges.push(badge);
    }
}

fn price_points(price: f64, baseline: Option<f64>, badges: &mut Vec<Badge>) -> f64 {
    match baseline {
        Some(base) if base > 0.0 => {
            let savings = ((base - price) / base).max(0.0);
            if savings >= SAVINGS_FOR_MAX {
                push_badge(badges, Badge::AmazingDeal);
            }
            (PRICE_MAX * savings / SAVINGS_FOR_MAX).min(PRICE_MAX)
        }
        _ => PRICE_NEUTRAL,
    }
}

fn stops_points(stops: u32) -> f64 {
    match stops {
        0 => 15.0,
        1 => 7.0,
        _ => 0.0,
    }
}

fn duration_points(total_minutes: u32) -> f64 {
    if total_minutes < 8 * 60 {
        10.0
    } else if total_minutes < 12 * 60 {
        6.0
    } else {
        3.0
    }
}

fn layover_penalty(offer: &Offer, badges: &mut Vec<Badge>) -> f64 {
    let mut segments: Vec<_> = offer.segments.iter().collect();
    segments.sort_by_key(|s| s.departure_at);

    let mut penalty = 0.0;
    for pair in segments.windows(2) {
        let gap_ms = (pair[1].departure_at - pair[0].arrival_at).num_milliseconds();
        let gap_minutes = ((gap_ms as f64 / 60_000.0) + 0.5).floor().max(0.0) as i64;

        if gap_minutes > 0 && gap_minutes < TIGHT_CONNECTION_MINUTES {
            push_badge(badges, Badge::TightConnection);
            penalty += 3.0;
        } else if gap_minutes >= LONG_LAYOVER_MINUTES {
            push_badge(badges, Badge::LongLayover);
            penalty += 2.0;
        }
    }
    f64::min(penalty, LAYOVER_PENALTY_CAP)
}

/// Scores an offer against an optional baseline price. Pure: the same offer
/// and baseline always produce the same result.
pub fn score_offer(offer: &Offer, baseline: Option<f64>) -> ScoreResult {
    let mut badges = Vec::new();

    let price = round1(price_points(offer.price, baseline, &mut badges));

    if offer
        .airlines
        .iter()
        .any(|a| LOW_TIER_CARRIERS.contains(&a.as_str()))
    {
        push_badge(&mut badges, Badge::BadAirline);
    }

    let layovers = 0.0 - round1(layover_penalty(offer, &mut badges));

    let breakdown = ScoreBreakdown {
        price,
        stops: stops_points(offer.stops),
        airline: AIRLINE_NEUTRAL,
        duration: duration_points(offer.total_duration_minutes),
        // no schedule-quality signal yet; both stay neutral
        time: TIME_OF_DAY_NEUTRAL,
        trip_length: TRIP_LENGTH_NEUTRAL,
        layovers,
    };

    ScoreResult {
        score: round1(breakdown.sum().clamp(0.0, 100.0)),
        breakdown,
        badges,
    }
}
