//! Reads tick archives into candle sequences.
//!
//! An archive is a CSV file with a header row and rows of
//! `epochMillis,open,close,high,low,volume`, sorted by time. Rows are folded
//! into one candle per sampling period and bounded by an inclusive date window.

pub mod error;
pub mod loader;
pub mod source;
pub mod window;

pub use error::MarketDataError;
pub use loader::{load_candles, read_candles};
pub use source::{CsvTickSource, TICK_SOURCE_INPUT};
pub use window::DateWindow;
