//! Chart Series Module
//! Typed label/value sequences handed to a chart sink.

use crate::stats::ResearchReport;
use serde::Serialize;

/// Axis titles shared by every chart kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLabels {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

/// Categorical labels with one bar height each.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub labels: ChartLabels,
    pub categories: Vec<String>,
    pub heights: Vec<f64>,
}

/// Paired numeric sequences drawn as points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSeries {
    pub labels: ChartLabels,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Paired numeric sequences drawn as a connected line, x ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub labels: ChartLabels,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Chart {
    Bar(BarSeries),
    Scatter(ScatterSeries),
    Line(LineSeries),
}

/// Consumer of computed chart series.
pub trait ChartSink {
    type Error;

    fn bar(&mut self, series: &BarSeries) -> Result<(), Self::Error>;
    fn scatter(&mut self, series: &ScatterSeries) -> Result<(), Self::Error>;
    fn line(&mut self, series: &LineSeries) -> Result<(), Self::Error>;

    fn chart(&mut self, chart: &Chart) -> Result<(), Self::Error> {
        match chart {
            Chart::Bar(series) => self.bar(series),
            Chart::Scatter(series) => self.scatter(series),
            Chart::Line(series) => self.line(series),
        }
    }
}

const CHECKS_AXIS: &str = "Background Checks";

fn labels(title: impl Into<String>, x_label: &str) -> ChartLabels {
    ChartLabels {
        title: title.into(),
        x_label: x_label.to_string(),
        y_label: CHECKS_AXIS.to_string(),
    }
}

/// Build the five research charts, in question order.
pub fn research_charts(report: &ResearchReport) -> Vec<Chart> {
    let ethnicity = BarSeries {
        labels: labels(
            "Average Monthly Firearm Background Checks per Ethnicity per U.S. State",
            "Ethnicity",
        ),
        categories: report.ethnicity.iter().map(|e| e.label.clone()).collect(),
        heights: report.ethnicity.iter().map(|e| e.estimated_checks).collect(),
    };

    let education = BarSeries {
        labels: labels(
            "Average Monthly Firearm Background Checks per Degree per U.S. State",
            "Education Level",
        ),
        categories: report.education.iter().map(|e| e.label.clone()).collect(),
        heights: report.education.iter().map(|e| e.estimated_checks).collect(),
    };

    let poverty = ScatterSeries {
        labels: labels(
            "Average Monthly Firearm Background Checks per Proportion of Poverty in each U.S. State",
            "Percent Poverty",
        ),
        x: report.poverty.points.iter().map(|p| p.poverty_percent).collect(),
        y: report
            .poverty
            .points
            .iter()
            .map(|p| p.poverty_weighted_checks)
            .collect(),
    };

    let growth = BarSeries {
        labels: labels(
            format!(
                "States with the Highest Growth of Yearly Firearm Background Checks Between {} and {}",
                report.growth.early_year, report.growth.late_year
            ),
            "State",
        ),
        categories: report.growth.top.iter().map(|g| g.state.clone()).collect(),
        heights: report.growth.top.iter().map(|g| g.difference as f64).collect(),
    };

    let span = match (report.trend.first(), report.trend.last()) {
        (Some(first), Some(last)) => format!(" Between {}-{}", first.year, last.year),
        _ => String::new(),
    };
    let trend = LineSeries {
        labels: labels(
            format!("Number of Firearm Background Checks Per Year{span} in the U.S."),
            "Year",
        ),
        x: report.trend.iter().map(|t| t.year as f64).collect(),
        y: report.trend.iter().map(|t| t.total as f64).collect(),
    };

    vec![
        Chart::Bar(ethnicity),
        Chart::Bar(education),
        Chart::Scatter(poverty),
        Chart::Bar(growth),
        Chart::Line(trend),
    ]
}
