//! Text Summary Sink
//! Prints each chart series as an aligned table instead of drawing it.

use super::series::{BarSeries, ChartLabels, ChartSink, LineSeries, ScatterSeries};
use std::io::{self, Write};

const RULE_WIDTH: usize = 72;

/// Writes chart series as plain text tables.
pub struct TextSummary<W: Write> {
    out: W,
}

impl<W: Write> TextSummary<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn header(&mut self, labels: &ChartLabels) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", labels.title)?;
        writeln!(self.out, "{}", "-".repeat(RULE_WIDTH))?;
        writeln!(self.out, "{:<40} {:>20}", labels.x_label, labels.y_label)?;
        Ok(())
    }

    fn pairs(&mut self, labels: &ChartLabels, x: &[f64], y: &[f64]) -> io::Result<()> {
        self.header(labels)?;
        for (x, y) in x.iter().zip(y) {
            writeln!(self.out, "{:<40.2} {:>20.2}", x, y)?;
        }
        Ok(())
    }
}

impl<W: Write> ChartSink for TextSummary<W> {
    type Error = io::Error;

    fn bar(&mut self, series: &BarSeries) -> io::Result<()> {
        self.header(&series.labels)?;
        for (category, height) in series.categories.iter().zip(&series.heights) {
            writeln!(self.out, "{:<40} {:>20.2}", category, height)?;
        }
        Ok(())
    }

    fn scatter(&mut self, series: &ScatterSeries) -> io::Result<()> {
        self.pairs(&series.labels, &series.x, &series.y)
    }

    fn line(&mut self, series: &LineSeries) -> io::Result<()> {
        self.header(&series.labels)?;
        for (x, y) in series.x.iter().zip(&series.y) {
            writeln!(self.out, "{:<40} {:>20.0}", x, y)?;
        }
        Ok(())
    }
}
