//! Per-run coverage time series.
//!
//! A run's log is walked in order. Every interaction marker samples the
//! graph *before* the interaction it announces takes effect; every
//! method/control line is applied to the graph in observe-only mode. One
//! terminal sample is always appended when the log ends.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use droidscope_graph::{CoverageSnapshot, GraphPort};
use droidscope_trace::format::is_tagged;
use droidscope_trace::lines::open_log;
use droidscope_trace::update::observe;
use droidscope_trace::{Classified, LineClassifier};
use serde::{Deserialize, Serialize};

use crate::aggregate::{self, Statistic};

#[derive(Debug, thiserror::Error)]
pub enum CoverageError {
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No results recorded for test {0}")]
    UnknownTest(u32),

    #[error("No test results recorded")]
    Empty,
}

impl CoverageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// When a run is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// One sample per interaction marker plus the terminal sample.
    #[default]
    PerInteraction,
    /// Only the terminal sample; for logs without reliable markers.
    TerminalOnly,
}

/// Coverage samples of one run, keyed by contiguous sequence index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageSeries {
    points: BTreeMap<u32, CoverageSnapshot>,
}

impl CoverageSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: u32, snapshot: CoverageSnapshot) {
        self.points.insert(index, snapshot);
    }

    pub fn get(&self, index: u32) -> Option<CoverageSnapshot> {
        self.points.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Entry with the largest index.
    pub fn last(&self) -> Option<(u32, CoverageSnapshot)> {
        self.points.last_key_value().map(|(k, v)| (*k, *v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, CoverageSnapshot)> + '_ {
        self.points.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(u32, CoverageSnapshot)> for CoverageSeries {
    fn from_iter<T: IntoIterator<Item = (u32, CoverageSnapshot)>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Incremental recording of a single run.
///
/// Lines are fed one at a time, so the same session serves both log
/// replay and the live feed of an exploration.
#[derive(Debug, Clone)]
pub struct RunSession {
    test_id: u32,
    mode: SamplingMode,
    series: CoverageSeries,
    next_index: u32,
    skipped: usize,
}

impl RunSession {
    pub fn new(test_id: u32, mode: SamplingMode) -> Self {
        Self {
            test_id,
            mode,
            series: CoverageSeries::new(),
            next_index: 0,
            skipped: 0,
        }
    }

    pub fn test_id(&self) -> u32 {
        self.test_id
    }

    /// Lines dropped because they could not be classified.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Samples recorded so far, excluding the terminal one.
    pub fn series(&self) -> &CoverageSeries {
        &self.series
    }

    /// Process one log line. Untagged lines are ignored.
    pub fn feed<G: GraphPort + ?Sized>(
        &mut self,
        graph: &mut G,
        classifier: &LineClassifier,
        line: &str,
    ) {
        if !is_tagged(line) {
            return;
        }

        match classifier.classify(line) {
            Classified::Marker(_) => {
                if self.mode == SamplingMode::PerInteraction {
                    self.series.insert(self.next_index, graph.compute_coverage());
                    self.next_index += 1;
                }
            }
            Classified::Event(event) => {
                tracing::debug!("Interaction/Method: {line}");
                observe(graph, &event);
            }
            Classified::Unrecognized(_) => self.skipped += 1,
        }
    }

    /// Append the terminal sample and return the finished series.
    pub fn finish<G: GraphPort + ?Sized>(mut self, graph: &G) -> CoverageSeries {
        self.series.insert(self.next_index, graph.compute_coverage());
        if self.skipped > 0 {
            tracing::warn!(
                "Test {} skipped {} unreadable log line(s).",
                self.test_id,
                self.skipped
            );
        }
        self.series
    }
}

/// Owns the coverage series of every recorded run.
#[derive(Debug, Clone, Default)]
pub struct CoverageRecorder {
    mode: SamplingMode,
    results: BTreeMap<u32, CoverageSeries>,
}

impl CoverageRecorder {
    pub fn new(mode: SamplingMode) -> Self {
        Self {
            mode,
            results: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    pub fn begin(&self, test_id: u32) -> RunSession {
        RunSession::new(test_id, self.mode)
    }

    /// Store a finished series, replacing any earlier run with the same id.
    pub fn insert(&mut self, test_id: u32, series: CoverageSeries) -> &CoverageSeries {
        self.results.insert(test_id, series);
        &self.results[&test_id]
    }

    /// Record a run from lines already in memory.
    pub fn record_run<G, I, S>(
        &mut self,
        test_id: u32,
        graph: &mut G,
        classifier: &LineClassifier,
        lines: I,
    ) -> &CoverageSeries
    where
        G: GraphPort + ?Sized,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut session = self.begin(test_id);
        for line in lines {
            session.feed(graph, classifier, line.as_ref());
        }
        let series = session.finish(&*graph);
        self.insert(test_id, series)
    }

    /// Record a run from a log file. Read failures are fatal for the run
    /// and leave the recorder unchanged; undecodable bytes are not.
    pub fn record_log_file<G: GraphPort + ?Sized>(
        &mut self,
        test_id: u32,
        path: &Path,
        graph: &mut G,
        classifier: &LineClassifier,
    ) -> Result<&CoverageSeries, CoverageError> {
        let lines = open_log(path).map_err(|e| CoverageError::io(path, e))?;
        let mut session = self.begin(test_id);
        for line in lines {
            let line = line.map_err(|e| CoverageError::io(path, e))?;
            session.feed(graph, classifier, &line);
        }
        let series = session.finish(&*graph);
        Ok(self.insert(test_id, series))
    }

    pub fn series(&self, test_id: u32) -> Result<&CoverageSeries, CoverageError> {
        self.results
            .get(&test_id)
            .ok_or(CoverageError::UnknownTest(test_id))
    }

    pub fn results(&self) -> &BTreeMap<u32, CoverageSeries> {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn statistic(&self, statistic: Statistic) -> CoverageSeries {
        match statistic {
            Statistic::Average => aggregate::average(&self.results),
            Statistic::Minimum => aggregate::minimum(&self.results),
            Statistic::Maximum => aggregate::maximum(&self.results),
        }
    }

    /// `Interface X%, Method Y%` for the final averaged sample.
    pub fn overview(&self) -> Result<String, CoverageError> {
        aggregate::overview(&self.results).ok_or(CoverageError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use droidscope_graph::{ClassIndex, InteractionGraph, Vertex};

    use super::*;

    fn setup() -> (InteractionGraph, LineClassifier) {
        let mut g = InteractionGraph::new();
        g.add_vertex(Vertex::method("<A: foo>"));
        g.add_vertex(Vertex::method("<A: bar>"));
        let mut index = ClassIndex::new();
        index.add_class("A", ["foo", "bar"]);
        (g, LineClassifier::new(Arc::new(index)))
    }

    #[test]
    fn test_three_line_scenario() {
        let (mut g, c) = setup();
        let mut recorder = CoverageRecorder::new(SamplingMode::PerInteraction);
        let lines = [
            "<METHOD> ... Method: <A: foo>",
            "<INTERACTION> Count: 1, Info: tap.",
            "<METHOD> ... Method: <A: bar>",
        ];
        let series = recorder.record_run(1, &mut g, &c, lines).clone();

        assert_eq!(series.len(), 2);
        assert_eq!(series.get(0), Some(CoverageSnapshot::new(0.0, 50.0)));
        assert_eq!(series.get(1), Some(CoverageSnapshot::new(0.0, 100.0)));
    }

    #[test]
    fn test_terminal_only_records_single_sample() {
        let (mut g, c) = setup();
        let mut recorder = CoverageRecorder::new(SamplingMode::TerminalOnly);
        let lines = [
            "<INTERACTION> Count: 0, Info: Monkey  : :Switch.",
            "<METHOD> Method: <A: foo>",
            "<INTERACTION> Count: 1, Info: Monkey  : :Sending Touch.",
        ];
        let series = recorder.record_run(3, &mut g, &c, lines);
        assert_eq!(series.len(), 1);
        assert_eq!(series.get(0), Some(CoverageSnapshot::new(0.0, 50.0)));
    }

    #[test]
    fn test_rerecording_same_id_overwrites() {
        let (mut g, c) = setup();
        let mut recorder = CoverageRecorder::default();
        recorder.record_run(1, &mut g, &c, ["<INTERACTION> Count: 1, Info: a."]);
        g.reset_visits();
        recorder.record_run(1, &mut g, &c, Vec::<&str>::new());
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.series(1).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_test_and_empty_overview() {
        let recorder = CoverageRecorder::default();
        assert!(matches!(recorder.series(9), Err(CoverageError::UnknownTest(9))));
        assert!(matches!(recorder.overview(), Err(CoverageError::Empty)));
    }
}
