use crate::structs::SeriesData;
use std::collections::BTreeMap;

/// Receives human-readable progress lines for an instance's output log.
pub trait OutputSink: Send + Sync {
    fn write(&self, line: &str);
}

/// Receives indicator points drawn by a strategy.
pub trait ChartSink {
    /// A point of a series drawn over the price axis.
    fn price_indicator(&mut self, series: &str, epoch: i64, value: f64);
    /// A point of a series drawn on the auxiliary chart `chart`.
    fn extra_indicator(&mut self, chart: &str, series: &str, epoch: i64, value: f64);
}

/// A [`ChartSink`] that accumulates every point it is given, gated by the
/// `plotChart` level: price indicators need level 2, extra indicators level 3.
#[derive(Debug, Clone, Default)]
pub struct ChartWriter {
    plot_level: u8,
    price_indicators: BTreeMap<String, SeriesData>,
    extra_indicators: BTreeMap<String, BTreeMap<String, SeriesData>>,
}

impl ChartWriter {
    pub fn new(plot_level: u8) -> Self {
        Self {
            plot_level,
            ..Self::default()
        }
    }

    pub fn plot_level(&self) -> u8 {
        self.plot_level
    }

    pub fn into_parts(
        self,
    ) -> (
        BTreeMap<String, SeriesData>,
        BTreeMap<String, BTreeMap<String, SeriesData>>,
    ) {
        (self.price_indicators, self.extra_indicators)
    }
}

impl ChartSink for ChartWriter {
    fn price_indicator(&mut self, series: &str, epoch: i64, value: f64) {
        if self.plot_level < 2 {
            return;
        }
        self.price_indicators
            .entry(series.to_string())
            .or_default()
            .insert(epoch, value);
    }

    fn extra_indicator(&mut self, chart: &str, series: &str, epoch: i64, value: f64) {
        if self.plot_level < 3 {
            return;
        }
        self.extra_indicators
            .entry(chart.to_string())
            .or_default()
            .entry(series.to_string())
            .or_default()
            .insert(epoch, value);
    }
}
