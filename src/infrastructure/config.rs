use crate::domain::aggregation::ValueMode;
use crate::domain::histogram::HistogramError;
use crate::domain::interval::Interval;
use crate::domain::time_series::FillStyle;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TooltipValueType {
    #[default]
    Cumulative,
    Individual,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct TooltipConfig {
    #[serde(default)]
    pub value_type: TooltipValueType,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GridConfig {
    #[serde(default = "default_grid_min")]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min: default_grid_min(),
            max: None,
        }
    }
}

/// Histogram panel options. Every field has the panel's default.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
    pub mode: ValueMode,
    pub value_field: Option<String>,
    pub interval: String,
    pub auto_int: bool,
    pub resolution: u32,
    pub zerofill: bool,
    pub derivative: bool,
    /// Overrides the fill style derived from `zerofill`/`derivative`.
    pub fill_style: Option<FillStyle>,
    pub stack: bool,
    pub percentage: bool,
    pub lines: bool,
    pub steps: bool,
    pub fill: u8,
    pub bars: bool,
    pub points: bool,
    pub scale: f64,
    pub scale_seconds: bool,
    pub grid: GridConfig,
    pub tooltip: TooltipConfig,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            mode: ValueMode::Count,
            value_field: None,
            interval: "5m".to_string(),
            auto_int: true,
            resolution: 100,
            zerofill: true,
            derivative: false,
            fill_style: None,
            stack: true,
            percentage: false,
            lines: false,
            steps: false,
            fill: 0,
            bars: true,
            points: false,
            scale: 1.0,
            scale_seconds: false,
            grid: GridConfig::default(),
            tooltip: TooltipConfig::default(),
        }
    }
}

fn default_grid_min() -> Option<f64> {
    Some(0.0)
}

impl PanelConfig {
    /// Derivatives need gaps rather than false zeros; without zero-filling
    /// only non-zero buckets are plotted.
    pub fn fill_style(&self) -> FillStyle {
        if let Some(style) = self.fill_style {
            style
        } else if self.derivative {
            FillStyle::Null
        } else if self.zerofill {
            FillStyle::Minimal
        } else {
            FillStyle::No
        }
    }

    pub fn validate(&self) -> Result<(), HistogramError> {
        if self.mode.needs_value_field() && self.value_field.is_none() {
            return Err(HistogramError::MissingValueField { mode: self.mode });
        }
        Interval::parse(&self.interval)?;
        Ok(())
    }

    /// The bucket width for a render pass: derived from the range when
    /// `auto_int` is on, otherwise the configured interval.
    pub fn effective_interval(&self, range: Option<(i64, i64)>) -> Result<Interval, HistogramError> {
        match range {
            Some((from, to)) if self.auto_int => Ok(Interval::auto(from, to, self.resolution)?),
            _ => Ok(Interval::parse(&self.interval)?),
        }
    }

    pub fn percent_stacked(&self) -> bool {
        self.stack && self.percentage
    }
}

/// Loads panel options from a config file (any format the `config` crate
/// reads), overridden by `HISTOGRAM_*` environment variables.
pub fn load_panel_config(path: impl AsRef<Path>) -> anyhow::Result<PanelConfig> {
    load_with_environment(path.as_ref(), panel_environment())
}

// `HISTOGRAM_STACK=false`, `HISTOGRAM_GRID__MAX=50`
fn panel_environment() -> config::Environment {
    config::Environment::with_prefix("HISTOGRAM")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn load_with_environment(path: &Path, environment: config::Environment) -> anyhow::Result<PanelConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(environment)
        .build()?;

    let panel: PanelConfig = settings.try_deserialize()?;
    if let Err(e) = panel.validate() {
        tracing::warn!("Rejecting panel config {}: {}", path.display(), e);
        return Err(e.into());
    }
    Ok(panel)
}
