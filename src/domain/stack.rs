// Stacking transform - cumulative offsets for series sharing a stack group
use super::time_series::FlotPair;

/// A plotted point. `bottom` is the baseline the point is drawn from; after
/// stacking it holds the cumulative value of the series below, so the point's
/// own value is `y - bottom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datapoint {
    pub x: f64,
    pub y: f64,
    pub bottom: f64,
}

impl Datapoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, bottom: 0.0 }
    }
}

/// Which coordinate values accumulate along. Horizontal bars stack on x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

impl Orientation {
    pub(crate) fn key(self, p: &Datapoint) -> f64 {
        match self {
            Self::Vertical => p.x,
            Self::Horizontal => p.y,
        }
    }

    pub(crate) fn value(self, p: &Datapoint) -> f64 {
        match self {
            Self::Vertical => p.y,
            Self::Horizontal => p.x,
        }
    }

    pub(crate) fn value_mut(self, p: &mut Datapoint) -> &mut f64 {
        match self {
            Self::Vertical => &mut p.y,
            Self::Horizontal => &mut p.x,
        }
    }

    pub(crate) fn point(self, key: f64, value: f64, bottom: f64) -> Datapoint {
        match self {
            Self::Vertical => Datapoint { x: key, y: value, bottom },
            Self::Horizontal => Datapoint { x: value, y: key, bottom },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineOptions {
    pub show: bool,
    pub steps: bool,
}

/// One series as seen by the stacking transforms. `None` points are gaps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackSeries {
    pub points: Vec<Option<Datapoint>>,
    /// Series with the same group are stacked on each other, in input order.
    pub stack: Option<String>,
    /// Normalize to a percentage of the per-coordinate total instead.
    pub percent: bool,
    pub lines: LineOptions,
    pub orientation: Orientation,
    /// Whether the renderer reads the baseline (bars, filled areas).
    pub with_bottom: bool,
}

impl StackSeries {
    /// Builds a series from plot pairs; null values become gaps.
    pub fn from_pairs(pairs: &[FlotPair]) -> Self {
        let points = pairs
            .iter()
            .map(|(t, v)| v.map(|v| Datapoint::new(*t as f64, v)))
            .collect();
        Self {
            points,
            ..Self::default()
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.stack = Some(group.into());
        self
    }

    pub fn as_percent(mut self) -> Self {
        self.percent = true;
        self.with_bottom = true;
        self
    }

    pub fn with_lines(mut self, lines: LineOptions) -> Self {
        self.lines = lines;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_bottom(mut self) -> Self {
        self.with_bottom = true;
        self
    }
}

/// Stacks every grouped series on the nearest earlier series of the same
/// group. Series are processed in order, so each one lands on the already
/// stacked values below it.
pub fn stack_all(series: &mut [StackSeries]) {
    for idx in 0..series.len() {
        let Some(group) = series[idx].stack.as_deref() else {
            continue;
        };
        let Some(below) = series[..idx]
            .iter()
            .rposition(|s| s.stack.as_deref() == Some(group))
        else {
            continue;
        };
        let stacked = stack_onto(&series[idx], &series[below].points);
        series[idx].points = stacked;
    }
}

/// Merges `current` with the series below it by key, adding the lower value to
/// each point. For line series, missing keys on either side are interpolated
/// and points after a gap are skipped so no line is drawn across it.
pub fn stack_onto(current: &StackSeries, below: &[Option<Datapoint>]) -> Vec<Option<Datapoint>> {
    let o = current.orientation;
    let with_lines = current.lines.show;
    let with_steps = with_lines && current.lines.steps;
    let points = &current.points;

    let mut out: Vec<Option<Datapoint>> = Vec::with_capacity(points.len());
    let (mut i, mut j) = (0, 0);
    let mut from_gap = true;

    while i < points.len() {
        let l = out.len();

        match (points[i], below.get(j).copied()) {
            (None, _) => {
                out.push(None);
                i += 1;
            }
            (Some(p), None) => {
                // Past the end of the lower series; a line would drop to nothing.
                if !with_lines {
                    out.push(Some(p));
                }
                i += 1;
            }
            (Some(_), Some(None)) => {
                out.push(None);
                from_gap = true;
                j += 1;
            }
            (Some(p), Some(Some(q))) => {
                let (px, py) = (o.key(&p), o.value(&p));
                let (qx, qy) = (o.key(&q), o.value(&q));
                let mut bottom = 0.0;

                if px == qx {
                    let mut np = p;
                    *o.value_mut(&mut np) += qy;
                    out.push(Some(np));
                    bottom = qy;
                    i += 1;
                    j += 1;
                } else if px > qx {
                    // Passed a lower point; add an interpolated one on our line.
                    if with_lines && i > 0 {
                        if let Some(prev) = points[i - 1] {
                            let inter = py + (o.value(&prev) - py) * (qx - px) / (o.key(&prev) - px);
                            out.push(Some(o.point(qx, inter + qy, p.bottom)));
                            bottom = qy;
                        }
                    }
                    j += 1;
                } else {
                    if from_gap && with_lines {
                        i += 1;
                        continue;
                    }
                    let mut np = p;
                    if with_lines && j > 0 {
                        if let Some(prev_q) = below[j - 1] {
                            bottom = qy + (o.value(&prev_q) - qy) * (px - qx) / (o.key(&prev_q) - qx);
                        }
                    }
                    *o.value_mut(&mut np) += bottom;
                    out.push(Some(np));
                    i += 1;
                }

                from_gap = false;

                if out.len() != l && current.with_bottom {
                    if let Some(Some(np)) = out.last_mut() {
                        np.bottom += bottom;
                    }
                }
            }
        }

        // Keep the step shape: flat to the new key, then vertical.
        if with_steps && out.len() != l && l > 0 {
            if let (Some(prev), Some(cur)) = (out[l - 1], out[l]) {
                if o.key(&cur) != o.key(&prev) && o.value(&cur) != o.value(&prev) {
                    let mut flat = cur;
                    *o.value_mut(&mut flat) = o.value(&prev);
                    out[l] = Some(flat);
                    out.push(Some(cur));
                }
            }
        }
    }

    out
}
