use crate::error::MarketDataError;
use crate::loader::load_candles;
use crate::window::DateWindow;
use core_types::{Candle, InputMap};
use std::path::PathBuf;

pub const FILE_KEY: &str = "ticks.csv.file";
pub const START_DATE_KEY: &str = "ticks.csv.startDate";
pub const END_DATE_KEY: &str = "ticks.csv.endDate";

/// Input keys (and their defaults) that select the tick archive of an instance.
pub const TICK_SOURCE_INPUT: [(&str, &str); 3] = [
    (
        FILE_KEY,
        "../Bitfinex-historical-data/ETHUSD/Candles_1m/2019/merged.csv",
    ),
    (START_DATE_KEY, "2019-01-01"),
    (END_DATE_KEY, "2019-01-04"),
];

/// A tick archive plus the window to read from it, as configured by an
/// instance's input map.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTickSource {
    pub path: PathBuf,
    pub window: DateWindow,
}

impl CsvTickSource {
    pub fn from_input(input: &InputMap) -> Result<Self, MarketDataError> {
        let get = |key: &str| {
            input
                .get(key)
                .map(String::as_str)
                .ok_or_else(|| MarketDataError::MissingInput(key.to_string()))
        };
        let path = PathBuf::from(get(FILE_KEY)?);
        let window = DateWindow::parse(
            START_DATE_KEY,
            get(START_DATE_KEY)?,
            END_DATE_KEY,
            get(END_DATE_KEY)?,
        )?;
        Ok(Self { path, window })
    }

    pub fn load(&self, period_seconds: i64) -> Result<Vec<Candle>, MarketDataError> {
        load_candles(&self.path, period_seconds, self.window.start, self.window.end)
    }
}
