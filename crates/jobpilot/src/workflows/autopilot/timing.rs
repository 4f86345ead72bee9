use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::domain::JobPosting;
use super::risk::CompanySnapshot;

/// Favorability blend for submitting right now.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingAnalysis {
    pub overall: f64,
    pub posting_freshness: f64,
    pub day_of_week: f64,
    pub hour_of_day: f64,
    pub company_responsiveness: f64,
}

const FRESHNESS_WEIGHT: f64 = 0.4;
const DAY_WEIGHT: f64 = 0.2;
const HOUR_WEIGHT: f64 = 0.2;
const RESPONSIVENESS_WEIGHT: f64 = 0.2;

pub fn analyze_timing(
    job: &JobPosting,
    company: &CompanySnapshot,
    now: DateTime<Utc>,
) -> TimingAnalysis {
    let age_hours = (now - job.posted_at).num_hours();
    let posting_freshness = if age_hours <= 24 {
        95.0
    } else if age_hours <= 72 {
        85.0
    } else if age_hours <= 168 {
        70.0
    } else {
        50.0
    };

    let day_of_week = match now.weekday() {
        Weekday::Mon | Weekday::Tue | Weekday::Wed => 90.0,
        Weekday::Thu | Weekday::Fri => 80.0,
        Weekday::Sat | Weekday::Sun => 60.0,
    };

    let hour = now.hour();
    let hour_of_day = if (9..=11).contains(&hour) || (14..=16).contains(&hour) {
        90.0
    } else if (8..=17).contains(&hour) {
        80.0
    } else {
        60.0
    };

    let company_responsiveness =
        (90.0 - (company.avg_response_hours - 48.0) / 24.0 * 10.0).clamp(50.0, 90.0);

    let overall = posting_freshness * FRESHNESS_WEIGHT
        + day_of_week * DAY_WEIGHT
        + hour_of_day * HOUR_WEIGHT
        + company_responsiveness * RESPONSIVENESS_WEIGHT;

    TimingAnalysis {
        overall,
        posting_freshness,
        day_of_week,
        hour_of_day,
        company_responsiveness,
    }
}

/// Deterministic next favorable submission slot after `now`.
pub fn next_optimal_slot(now: DateTime<Utc>) -> DateTime<Utc> {
    let at_ten = |date: chrono::NaiveDate| -> DateTime<Utc> {
        Utc.with_ymd_and_hms(date.year(), date.month(), date.day(), 10, 0, 0)
            .single()
            .unwrap_or(now)
    };

    match now.weekday() {
        Weekday::Sat => at_ten(now.date_naive() + Duration::days(2)),
        Weekday::Sun => at_ten(now.date_naive() + Duration::days(1)),
        Weekday::Fri if now.hour() >= 16 => at_ten(now.date_naive() + Duration::days(3)),
        _ if now.hour() < 9 => at_ten(now.date_naive()),
        _ if now.hour() >= 16 => at_ten(now.date_naive() + Duration::days(1)),
        _ => now + Duration::hours(2),
    }
}
