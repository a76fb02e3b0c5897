// Histogram service - folds result segments into series and renders them for plotting
use crate::application::aggregation_source::AggregationSource;
use crate::application::series_transforms::{derivative, scale, scale_seconds};
use crate::domain::aggregation::{Segment, SeriesAccumulator};
use crate::domain::histogram::{
    HistogramError, QueryInfo, RenderedHistogram, RenderedSeries, TimeRange,
};
use crate::domain::interval::Interval;
use crate::domain::percent_stack::percent_stack_all;
use crate::domain::stack::{stack_all, LineOptions, StackSeries};
use crate::domain::time_series::{FlotPair, ZeroFilled};
use crate::infrastructure::config::PanelConfig;

const STACK_GROUP: &str = "histogram";

#[derive(Debug)]
struct RenderPass {
    id: u64,
    interval: Interval,
    range: Option<TimeRange>,
    accumulators: Vec<SeriesAccumulator>,
    error: Option<String>,
}

/// Owns the series of the current render pass. A new pass discards the
/// previous one; segments tagged with an older pass id are ignored.
#[derive(Debug)]
pub struct HistogramService {
    config: PanelConfig,
    queries: Vec<QueryInfo>,
    pass: Option<RenderPass>,
    next_pass_id: u64,
}

impl HistogramService {
    pub fn new(config: PanelConfig, queries: Vec<QueryInfo>) -> Self {
        Self {
            config,
            queries,
            pass: None,
            next_pass_id: 0,
        }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn queries(&self) -> &[QueryInfo] {
        &self.queries
    }

    /// Starts a new render pass with one empty series per query.
    pub fn begin_pass(&mut self, range: Option<TimeRange>) -> Result<u64, HistogramError> {
        self.config.validate()?;

        let bounds = range.map(|r| (r.from.timestamp_millis(), r.to.timestamp_millis()));
        let interval = self.config.effective_interval(bounds)?;
        let fill_style = self.config.fill_style();

        let accumulators = self
            .queries
            .iter()
            .map(|_| {
                let series = ZeroFilled::new(interval.clone(), fill_style)
                    .with_range(range.map(|r| r.from), range.map(|r| r.to));
                SeriesAccumulator::new(series, self.config.mode)
            })
            .collect();

        self.next_pass_id += 1;
        let id = self.next_pass_id;
        tracing::debug!(
            "Starting render pass {} with interval {} ({:?} fill)",
            id,
            interval,
            fill_style
        );

        self.pass = Some(RenderPass {
            id,
            interval,
            range,
            accumulators,
            error: None,
        });
        Ok(id)
    }

    /// Folds one segment into the series of pass `pass_id`. Returns `false`
    /// when that pass is no longer current.
    pub fn apply_segment(&mut self, pass_id: u64, segment: &Segment) -> bool {
        let Some(pass) = self.pass.as_mut().filter(|p| p.id == pass_id) else {
            tracing::debug!("Ignoring segment for stale render pass {}", pass_id);
            return false;
        };

        for (query, accumulator) in self.queries.iter().zip(pass.accumulators.iter_mut()) {
            match segment.entries_for(&query.id) {
                Some(entries) => accumulator.fold_all(entries),
                None => tracing::debug!("Segment has no results for query {}", query.id),
            }
        }
        true
    }

    /// Runs a full pass over `source`, segment by segment. A failing segment is
    /// recorded on the result and the remaining segments are still read.
    pub fn refresh(
        &mut self,
        source: &dyn AggregationSource,
        range: Option<TimeRange>,
    ) -> Result<RenderedHistogram, HistogramError> {
        let pass_id = self.begin_pass(range)?;

        for index in 0..source.segment_count() {
            match source.fetch_segment(index) {
                Ok(segment) => {
                    self.apply_segment(pass_id, &segment);
                }
                Err(e) => {
                    let err = HistogramError::Segment {
                        index,
                        message: e.to_string(),
                    };
                    tracing::warn!("{}", err);
                    if let Some(pass) = self.pass.as_mut() {
                        pass.error = Some(err.to_string());
                    }
                }
            }
        }

        Ok(self.render())
    }

    /// Produces the plot-ready series of the current pass.
    pub fn render(&self) -> RenderedHistogram {
        let Some(pass) = &self.pass else {
            return RenderedHistogram::empty();
        };

        // Several series must share their x values to stack in the right order.
        let required_times = (pass.accumulators.len() > 1).then(|| {
            let mut times: Vec<i64> = pass
                .accumulators
                .iter()
                .flat_map(|a| a.series().get_ordered_times(None))
                .collect();
            times.sort_unstable();
            times.dedup();
            times
        });

        let stacked = self.config.stack;
        let percentage = self.config.percent_stacked();
        let lines = LineOptions {
            show: self.config.lines,
            steps: self.config.steps,
        };
        let with_bottom = self.config.bars || self.config.lines;

        let mut stack_series: Vec<StackSeries> = pass
            .accumulators
            .iter()
            .map(|acc| {
                let pairs = self.series_pairs(acc.series(), required_times.as_deref(), &pass.interval);
                let mut series = StackSeries::from_pairs(&pairs).with_lines(lines);
                if with_bottom {
                    series = series.with_bottom();
                }
                if percentage {
                    series.as_percent()
                } else if stacked {
                    series.in_group(STACK_GROUP)
                } else {
                    series
                }
            })
            .collect();

        let shares: Vec<Option<Vec<Option<f64>>>> = if percentage {
            percent_stack_all(&mut stack_series)
                .into_iter()
                .map(Some)
                .collect()
        } else {
            if stacked {
                stack_all(&mut stack_series);
            }
            vec![None; stack_series.len()]
        };

        let series: Vec<RenderedSeries> = self
            .queries
            .iter()
            .zip(&pass.accumulators)
            .zip(stack_series)
            .zip(shares)
            .map(|(((info, acc), s), shares)| RenderedSeries {
                info: info.clone(),
                hits: acc.hits(),
                points: s.points,
                with_bottom: s.with_bottom,
                shares,
                dropped_entries: acc.series().dropped_entries(),
            })
            .collect();

        let hits = series.iter().map(|s| s.hits).sum();
        tracing::debug!(
            "Rendered pass {}: {} series, {} points, {} hits",
            pass.id,
            series.len(),
            series.iter().map(|s| s.points.len()).sum::<usize>(),
            hits
        );

        RenderedHistogram {
            interval: Some(pass.interval.clone()),
            range: pass.range,
            series,
            hits,
            stacked,
            percentage,
            error: pass.error.clone(),
        }
    }

    fn series_pairs(
        &self,
        series: &ZeroFilled,
        required_times: Option<&[i64]>,
        interval: &Interval,
    ) -> Vec<FlotPair> {
        let mut pairs = series.get_flot_pairs(required_times);
        if self.config.derivative {
            pairs = derivative(&pairs);
        }
        if self.config.scale != 1.0 {
            pairs = scale(&pairs, self.config.scale);
        }
        if self.config.scale_seconds {
            pairs = scale_seconds(&pairs, interval);
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregation::{AggregationEntry, ValueMode};
    use crate::domain::stack::Datapoint;
    use chrono::{TimeZone, Utc};

    struct FakeSource {
        segments: Vec<Option<Segment>>,
    }

    impl AggregationSource for FakeSource {
        fn segment_count(&self) -> usize {
            self.segments.len()
        }

        fn fetch_segment(&self, index: usize) -> anyhow::Result<Segment> {
            self.segments[index]
                .clone()
                .ok_or_else(|| anyhow::anyhow!("index unavailable"))
        }
    }

    fn counts(entries: &[(i64, u64)]) -> Vec<AggregationEntry> {
        entries
            .iter()
            .map(|&(t, c)| AggregationEntry::count(t, c))
            .collect()
    }

    fn service(config: PanelConfig) -> HistogramService {
        let config = PanelConfig {
            interval: "1m".to_string(),
            auto_int: false,
            ..config
        };
        HistogramService::new(
            config,
            vec![QueryInfo::new("q1", "status:200"), QueryInfo::new("q2", "status:500")],
        )
    }

    fn two_segments() -> Vec<Segment> {
        vec![
            Segment::default()
                .with_entries("q1", counts(&[(0, 2), (60_000, 3)]))
                .with_entries("q2", counts(&[(60_000, 1), (300_000, 4)])),
            Segment::default().with_entries("q1", counts(&[(300_000, 1)])),
        ]
    }

    fn pt(x: f64, y: f64, bottom: f64) -> Option<Datapoint> {
        Some(Datapoint { x, y, bottom })
    }

    #[test]
    fn test_segments_fold_and_stack() {
        let mut svc = service(PanelConfig::default());
        let pass = svc.begin_pass(None).unwrap();
        for segment in two_segments() {
            assert!(svc.apply_segment(pass, &segment));
        }

        let rendered = svc.render();
        assert_eq!(rendered.hits, 11);
        assert_eq!(rendered.series[0].hits, 6);
        assert_eq!(rendered.series[1].hits, 5);
        assert_eq!(
            rendered.series[0].points,
            vec![
                pt(0.0, 2.0, 0.0),
                pt(60_000.0, 3.0, 0.0),
                pt(120_000.0, 0.0, 0.0),
                pt(240_000.0, 0.0, 0.0),
                pt(300_000.0, 1.0, 0.0),
            ]
        );
        assert_eq!(
            rendered.series[1].points,
            vec![
                pt(0.0, 2.0, 2.0),
                pt(60_000.0, 4.0, 3.0),
                pt(120_000.0, 0.0, 0.0),
                pt(240_000.0, 0.0, 0.0),
                pt(300_000.0, 5.0, 1.0),
            ]
        );
        assert!(rendered.series.iter().all(|s| s.shares.is_none()));
    }

    #[test]
    fn test_percentage_mode() {
        let mut svc = service(PanelConfig {
            percentage: true,
            ..PanelConfig::default()
        });
        let pass = svc.begin_pass(None).unwrap();
        for segment in two_segments() {
            svc.apply_segment(pass, &segment);
        }

        let rendered = svc.render();
        assert!(rendered.percentage);
        assert_eq!(
            rendered.series[0].points,
            vec![
                pt(0.0, 100.0, 0.0),
                pt(60_000.0, 75.0, 0.0),
                pt(120_000.0, 0.0, 0.0),
                pt(240_000.0, 0.0, 0.0),
                pt(300_000.0, 20.0, 0.0),
            ]
        );
        assert_eq!(
            rendered.series[1].points,
            vec![
                pt(0.0, 100.0, 100.0),
                pt(60_000.0, 100.0, 75.0),
                pt(120_000.0, 0.0, 0.0),
                pt(240_000.0, 0.0, 0.0),
                pt(300_000.0, 100.0, 20.0),
            ]
        );
        assert_eq!(
            rendered.series[1].shares.as_ref().unwrap()[4],
            Some(80.0)
        );
    }

    #[test]
    fn test_unstacked_series_are_overlaid() {
        let mut svc = service(PanelConfig {
            stack: false,
            ..PanelConfig::default()
        });
        let pass = svc.begin_pass(None).unwrap();
        for segment in two_segments() {
            svc.apply_segment(pass, &segment);
        }
        let rendered = svc.render();
        assert_eq!(rendered.series[1].points[4], pt(300_000.0, 4.0, 0.0));
    }

    #[test]
    fn test_stale_segments_are_ignored() {
        let mut svc = service(PanelConfig::default());
        let old = svc.begin_pass(None).unwrap();
        let current = svc.begin_pass(None).unwrap();
        assert_ne!(old, current);

        let segment = Segment::default().with_entries("q1", counts(&[(0, 9)]));
        assert!(!svc.apply_segment(old, &segment));
        assert_eq!(svc.render().hits, 0);
    }

    #[test]
    fn test_refresh_records_failed_segment_and_continues() {
        let segments = two_segments();
        let source = FakeSource {
            segments: vec![Some(segments[0].clone()), None, Some(segments[1].clone())],
        };
        let mut svc = service(PanelConfig::default());
        let rendered = svc.refresh(&source, None).unwrap();
        assert_eq!(rendered.hits, 11);
        let error = rendered.error.unwrap();
        assert!(error.contains("segment 1"), "unexpected error: {}", error);
    }

    #[test]
    fn test_derivative_uses_null_fill() {
        let mut svc = HistogramService::new(
            PanelConfig {
                derivative: true,
                interval: "1m".to_string(),
                auto_int: false,
                ..PanelConfig::default()
            },
            vec![QueryInfo::new("q1", "*")],
        );
        let pass = svc.begin_pass(None).unwrap();
        svc.apply_segment(
            pass,
            &Segment::default().with_entries("q1", counts(&[(0, 1), (60_000, 4), (300_000, 2)])),
        );

        let rendered = svc.render();
        assert_eq!(
            rendered.series[0].points,
            vec![None, pt(60_000.0, 3.0, 0.0), None, None, None]
        );
    }

    #[test]
    fn test_scale_and_per_second_rates() {
        let mut svc = HistogramService::new(
            PanelConfig {
                scale: 2.0,
                scale_seconds: true,
                interval: "1m".to_string(),
                auto_int: false,
                ..PanelConfig::default()
            },
            vec![QueryInfo::new("q1", "*")],
        );
        let pass = svc.begin_pass(None).unwrap();
        svc.apply_segment(pass, &Segment::default().with_entries("q1", counts(&[(0, 30)])));
        assert_eq!(svc.render().series[0].points, vec![pt(0.0, 1.0, 0.0)]);
    }

    #[test]
    fn test_auto_interval_from_range() {
        let mut svc = HistogramService::new(PanelConfig::default(), vec![QueryInfo::new("q1", "*")]);
        let from = Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2014, 1, 2, 0, 0, 0).unwrap();
        let source = FakeSource { segments: vec![] };
        let rendered = svc.refresh(&source, Some(TimeRange::new(from, to))).unwrap();
        assert_eq!(rendered.interval.unwrap().as_str(), "10m");
        assert_eq!(rendered.range.unwrap().from, from);
    }

    #[test]
    fn test_value_mode_without_field_fails() {
        let mut svc = service(PanelConfig {
            mode: ValueMode::Max,
            ..PanelConfig::default()
        });
        assert!(matches!(
            svc.begin_pass(None),
            Err(HistogramError::MissingValueField { .. })
        ));
        assert_eq!(svc.render(), RenderedHistogram::empty());
    }
}
