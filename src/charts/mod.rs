//! Charts module - Chart series and sinks

mod series;
mod summary;

pub use series::{
    research_charts, BarSeries, Chart, ChartLabels, ChartSink, LineSeries, ScatterSeries,
};
pub use summary::TextSummary;
