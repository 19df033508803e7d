use crate::error::MarketDataError;
use chrono::{DateTime, Utc};
use core_types::Candle;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of fields of every archive row: `epochMillis,open,close,high,low,volume`.
const ROW_FIELDS: usize = 6;

/// Loads the candle sequence of the archive at `path` bounded by `[start, end]`.
///
/// The archive holds a header row followed by rows pre-sorted by ascending
/// timestamp. Every row up to the end of the window is validated, so a corrupt
/// file fails even when the damage lies before the window. Reading stops at
/// the first row after `end`.
pub fn load_candles(
    path: &Path,
    period_seconds: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Candle>, MarketDataError> {
    let file = File::open(path).map_err(|source| MarketDataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let candles = read_candles(file, period_seconds, start, end)?;
    tracing::debug!(
        path = %path.display(),
        period_seconds,
        candles = candles.len(),
        "Tick archive loaded."
    );
    Ok(candles)
}

/// Same as [`load_candles`] over any reader.
pub fn read_candles<R: Read>(
    reader: R,
    period_seconds: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Candle>, MarketDataError> {
    if period_seconds < 1 {
        return Err(MarketDataError::InvalidPeriod(period_seconds));
    }
    // Fields are taken verbatim: no trimming, no quoting. Rows are read as
    // bytes so invalid UTF-8 is reported against its line.
    let mut rows = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut record = csv::ByteRecord::new();
    if !rows.read_byte_record(&mut record)? {
        return Ok(Vec::new());
    }
    let mut previous_line = record_line(&record);

    let mut sampler = PeriodSampler::new(period_seconds);
    while rows.read_byte_record(&mut record)? {
        let line = record_line(&record);
        // Empty lines are skipped by the reader and show up as a gap.
        if line != previous_line + 1 {
            return Err(MarketDataError::Parse {
                line: previous_line + 1,
                message: "empty line".to_string(),
            });
        }
        previous_line = line;

        let tick = TickRow::parse(&record, line)?;
        let time = tick.time(line)?;
        if time < start {
            continue;
        }
        if time > end {
            break;
        }
        sampler.push(&tick);
    }
    Ok(sampler.finish())
}

fn record_line(record: &csv::ByteRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

/// One validated archive row.
#[derive(Debug, Clone, Copy)]
struct TickRow {
    epoch_millis: i64,
    open: f64,
    close: f64,
    high: f64,
    low: f64,
}

impl TickRow {
    fn parse(record: &csv::ByteRecord, line: u64) -> Result<Self, MarketDataError> {
        if record.len() != ROW_FIELDS {
            return Err(MarketDataError::Parse {
                line,
                message: format!("invalid line fields: {} (expected {ROW_FIELDS})", record.len()),
            });
        }
        let fields = record
            .iter()
            .map(|field| {
                std::str::from_utf8(field).map_err(|e| MarketDataError::Parse {
                    line,
                    message: format!("field is not valid UTF-8: {e}"),
                })
            })
            .collect::<Result<Vec<&str>, _>>()?;

        let epoch_millis = fields[0].parse::<i64>().map_err(|e| MarketDataError::Parse {
            line,
            message: format!("timestamp '{}': {e}", fields[0]),
        })?;
        let mut prices = [0.0_f64; ROW_FIELDS - 1];
        for (slot, field) in prices.iter_mut().zip(&fields[1..]) {
            *slot = parse_number(field, line)?;
        }
        // The volume is validated but not carried.
        let [open, close, high, low, _volume] = prices;
        Ok(Self {
            epoch_millis,
            open,
            close,
            high,
            low,
        })
    }

    /// Row time truncated to whole seconds.
    fn time(&self, line: u64) -> Result<DateTime<Utc>, MarketDataError> {
        DateTime::from_timestamp(self.epoch_seconds(), 0).ok_or_else(|| MarketDataError::Parse {
            line,
            message: format!("timestamp {} is out of range", self.epoch_millis),
        })
    }

    fn epoch_seconds(&self) -> i64 {
        self.epoch_millis.div_euclid(1000)
    }
}

fn parse_number(field: &str, line: u64) -> Result<f64, MarketDataError> {
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(MarketDataError::Parse {
            line,
            message: format!("'{field}' is not a finite number"),
        }),
        Err(e) => Err(MarketDataError::Parse {
            line,
            message: format!("'{field}': {e}"),
        }),
    }
}

/// Folds rows into one candle per sampling period. A period opens at the
/// first row not covered by the previous candle; later rows inside it update
/// close, high and low.
struct PeriodSampler {
    period_seconds: i64,
    current: Option<Candle>,
    candles: Vec<Candle>,
}

impl PeriodSampler {
    fn new(period_seconds: i64) -> Self {
        Self {
            period_seconds,
            current: None,
            candles: Vec::new(),
        }
    }

    fn push(&mut self, tick: &TickRow) {
        let timestamp = tick.epoch_seconds();
        if let Some(candle) = self.current.as_mut() {
            if timestamp.saturating_sub(candle.timestamp) < self.period_seconds {
                candle.close = tick.close;
                candle.high = candle.high.max(tick.high);
                candle.low = candle.low.min(tick.low);
                return;
            }
        }
        if let Some(done) = self.current.take() {
            self.candles.push(done);
        }
        self.current = Some(Candle {
            timestamp,
            open: tick.open,
            close: tick.close,
            high: tick.high,
            low: tick.low,
        });
    }

    fn finish(mut self) -> Vec<Candle> {
        if let Some(done) = self.current.take() {
            self.candles.push(done);
        }
        self.candles
    }
}
