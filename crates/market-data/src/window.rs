use crate::error::MarketDataError;
use chrono::{DateTime, NaiveDate, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive `[start, end]` bounds of a series, both at midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// Parses two `YYYY-MM-DD` dates. `start_key` and `end_key` only label errors.
    pub fn parse(
        start_key: &str,
        start: &str,
        end_key: &str,
        end: &str,
    ) -> Result<Self, MarketDataError> {
        let window = Self {
            start: parse_date(start_key, start)?,
            end: parse_date(end_key, end)?,
        };
        if window.start > window.end {
            return Err(MarketDataError::InvalidWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(window)
    }
}

fn parse_date(key: &str, value: &str) -> Result<DateTime<Utc>, MarketDataError> {
    let date = NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|source| {
        MarketDataError::InvalidDate {
            key: key.to_string(),
            value: value.to_string(),
            source,
        }
    })?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}
