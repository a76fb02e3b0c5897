// Plot payload - a rendered histogram in the shape the charting library consumes
use crate::domain::auto_interval::time_format;
use crate::domain::histogram::{RenderedHistogram, RenderedSeries};
use crate::domain::stack::Datapoint;
use crate::infrastructure::config::{PanelConfig, TooltipValueType};
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
pub struct PlotSeries {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub hits: u64,
    /// `[x, y]` or `[x, y, bottom]` per point; `null` for gaps.
    pub data: Vec<Option<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percents: Option<Vec<Option<f64>>>,
}

impl PlotSeries {
    fn from_rendered(series: &RenderedSeries) -> Self {
        let data = series
            .points
            .iter()
            .map(|point| {
                point.map(|p| {
                    if series.with_bottom {
                        vec![p.x, p.y, p.bottom]
                    } else {
                        vec![p.x, p.y]
                    }
                })
            })
            .collect();

        Self {
            label: series.info.label().to_string(),
            color: series.info.color.clone(),
            hits: series.hits,
            data,
            percents: series.shares.clone(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AxisOptions {
    pub x_min: Option<i64>,
    pub x_max: Option<i64>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    pub time_format: String,
    pub bar_width: f64,
}

/// How every series is drawn.
#[derive(Debug, Serialize, PartialEq)]
pub struct DrawOptions {
    pub bars: bool,
    pub lines: bool,
    pub steps: bool,
    pub points: bool,
    /// Area opacity under lines, `0.0..=1.0`.
    pub line_fill: f64,
}

impl DrawOptions {
    fn from_config(config: &PanelConfig) -> Self {
        // A zero fill still needs a sliver of area for percent-stacked lines.
        let line_fill = if config.fill == 0 {
            0.001
        } else {
            f64::from(config.fill) / 10.0
        };
        Self {
            bars: config.bars,
            lines: config.lines,
            steps: config.steps,
            points: config.points,
            line_fill,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PlotPayload {
    pub series: Vec<PlotSeries>,
    pub axes: AxisOptions,
    pub draw: DrawOptions,
    pub hits: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlotPayload {
    pub fn from_rendered(rendered: &RenderedHistogram, config: &PanelConfig) -> Self {
        let (time_format, bar_width) = match &rendered.interval {
            Some(interval) => (
                time_format(interval).to_string(),
                interval.milliseconds() as f64 / 1.5,
            ),
            None => ("%H:%M:%S".to_string(), 0.0),
        };

        // Percentages always span the full axis.
        let y_max = if rendered.percentage {
            Some(100.0)
        } else {
            config.grid.max
        };

        Self {
            series: rendered.series.iter().map(PlotSeries::from_rendered).collect(),
            axes: AxisOptions {
                x_min: rendered.range.map(|r| r.from.timestamp_millis()),
                x_max: rendered.range.map(|r| r.to.timestamp_millis()),
                y_min: config.grid.min,
                y_max,
                time_format,
                bar_width,
            },
            draw: DrawOptions::from_config(config),
            hits: rendered.hits,
            error: rendered.error.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Value shown when hovering a point: the stacked total, or the point's own
/// contribution when the tooltip is set to individual values.
pub fn tooltip_value(point: &Datapoint, stacked: bool, value_type: TooltipValueType) -> f64 {
    if stacked && value_type == TooltipValueType::Individual {
        point.y - point.bottom
    } else {
        point.y
    }
}
