pub mod enums;
pub mod error;
pub mod name;
pub mod sink;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{InstanceKind, OperationKind, Positiveness};
pub use error::CoreError;
pub use name::InstanceName;
pub use sink::{ChartSink, ChartWriter, OutputSink};
pub use structs::{
    trades_profit, Candle, InputMap, InstanceChartData, InstanceState, Operation, SeriesData,
    TradeEntry,
};
