use crate::enums::{InstanceKind, OperationKind, Positiveness};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User input of an instance: input key to raw string value.
pub type InputMap = BTreeMap<String, String>;

/// A sparse indicator series: epoch seconds to value.
pub type SeriesData = BTreeMap<i64, f64>;

/// One sampled period of price data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Start of the period, in epoch seconds.
    pub timestamp: i64,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
}

/// A buy or sell executed during a run, drawn as a marker on the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub price: f64,
    pub description: String,
    /// Identifies the trade the operation belongs to.
    pub code: i32,
}

/// A closed round trip: bought at `buy`, sold at `sell`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEntry {
    pub id: i32,
    pub buy: f64,
    pub sell: f64,
    pub amount: f64,
}

impl TradeEntry {
    pub fn profit(&self) -> f64 {
        (self.sell - self.buy) * self.amount
    }
}

/// Sum of the profit of every trade.
pub fn trades_profit(trades: &[TradeEntry]) -> f64 {
    trades.iter().map(TradeEntry::profit).sum()
}

/// The mutable state of an instance, polled by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceState {
    #[serde(rename = "type")]
    pub kind: InstanceKind,
    #[serde(default)]
    pub input: InputMap,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub trades: Vec<TradeEntry>,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub status_positiveness: Positiveness,
    #[serde(default)]
    pub state_version: u64,
    #[serde(default)]
    pub chart_version: u64,
    #[serde(default)]
    pub action1: String,
    #[serde(default)]
    pub action2: String,
}

impl InstanceState {
    /// An empty state of the given kind, as written at creation.
    pub fn new(kind: InstanceKind) -> Self {
        Self {
            kind,
            input: InputMap::new(),
            output: String::new(),
            trades: Vec::new(),
            status_text: String::new(),
            status_positiveness: Positiveness::Neutral,
            state_version: 0,
            chart_version: 0,
            action1: String::new(),
            action2: String::new(),
        }
    }

    /// Registers an input key with its default value unless the key is
    /// already present. Returns whether the input changed.
    pub fn add_input_key(&mut self, key: &str, default: &str) -> bool {
        if self.input.contains_key(key) {
            return false;
        }
        self.input.insert(key.to_string(), default.to_string());
        true
    }

    pub fn append_output(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }

    /// Sets the action labels the client renders as buttons. Returns whether
    /// anything changed.
    pub fn set_actions(&mut self, action1: &str, action2: &str) -> bool {
        if self.action1 == action1 && self.action2 == action2 {
            return false;
        }
        self.action1 = action1.to_string();
        self.action2 = action2.to_string();
        true
    }

    /// The label of a 1-based button, if that button is enabled.
    pub fn action(&self, button: u32) -> Option<&str> {
        let label = match button {
            1 => &self.action1,
            2 => &self.action2,
            _ => return None,
        };
        if label.is_empty() { None } else { Some(label.as_str()) }
    }

    pub fn set_status(&mut self, text: String, positiveness: Positiveness) {
        self.status_text = text;
        self.status_positiveness = positiveness;
    }
}

/// Chart data of an instance. Always loaded and saved together with its
/// [`InstanceState`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceChartData {
    #[serde(default)]
    pub candles: Vec<Candle>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub price_indicators: BTreeMap<String, SeriesData>,
    #[serde(default)]
    pub extra_indicators: BTreeMap<String, BTreeMap<String, SeriesData>>,
}
