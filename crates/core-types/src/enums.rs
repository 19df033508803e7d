use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of work an instance performs. Fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceKind {
    Train,
    Backtest,
    Live,
}

impl InstanceKind {
    pub const ALL: [InstanceKind; 3] = [InstanceKind::Train, InstanceKind::Backtest, InstanceKind::Live];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceKind::Train => "train",
            InstanceKind::Backtest => "backtest",
            InstanceKind::Live => "live",
        }
    }
}

impl fmt::Display for InstanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceKind {
    type Err = CoreError;

    /// Accepts the lower-case names used on the wire as well as the upper-case
    /// spelling older documents were written with.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" | "TRAIN" => Ok(InstanceKind::Train),
            "backtest" | "BACKTEST" => Ok(InstanceKind::Backtest),
            "live" | "LIVE" => Ok(InstanceKind::Live),
            other => Err(CoreError::InvalidKind(other.to_string())),
        }
    }
}

/// Direction of an executed operation drawn on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Buy,
    Sell,
}

/// Colour hint for the status line: negative, neutral or positive.
///
/// Serialized as the integers `-1`, `0` and `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Positiveness {
    Negative,
    #[default]
    Neutral,
    Positive,
}

impl Positiveness {
    /// Maps the sign of a result onto the tri-state indicator.
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Positiveness::Positive
        } else if value < 0.0 {
            Positiveness::Negative
        } else {
            Positiveness::Neutral
        }
    }
}

impl From<Positiveness> for i8 {
    fn from(value: Positiveness) -> Self {
        match value {
            Positiveness::Negative => -1,
            Positiveness::Neutral => 0,
            Positiveness::Positive => 1,
        }
    }
}

impl TryFrom<i8> for Positiveness {
    type Error = CoreError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Positiveness::Negative),
            0 => Ok(Positiveness::Neutral),
            1 => Ok(Positiveness::Positive),
            other => Err(CoreError::InvalidPositiveness(other)),
        }
    }
}
