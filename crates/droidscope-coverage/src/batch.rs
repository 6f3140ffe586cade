//! Batch runs over a directory of `Test_<n>` subdirectories.
//!
//! Each test directory holds the raw `logcat_<n>.log` and `monkey_<n>.log`
//! captured by a monkey run. Preparation writes `traversal_<n>.log` next
//! to them; every traversal log is then merged into the graph and
//! recorded as its own run.

use std::fs;
use std::path::{Path, PathBuf};

use droidscope_graph::{GraphPort, InteractionGraph};
use droidscope_trace::monkey::{convert_monkey_log, monkey_run_completed};
use droidscope_trace::update::{merge_lines, MergeSummary};
use droidscope_trace::lines::read_log_lines;
use droidscope_trace::LineClassifier;
use serde::{Deserialize, Serialize};

use crate::aggregate::Statistic;
use crate::recorder::{CoverageError, CoverageRecorder, CoverageSeries, SamplingMode};
use crate::report::ReportWriter;

const TEST_PREFIX: &str = "Test_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// `Test_1..=Test_n` must all be present.
    pub expected_tests: u32,
    pub sampling: SamplingMode,
    /// Rewrite raw monkey logcats into traversal logs before merging.
    pub convert_monkey_logs: bool,
    pub monkey_event_count: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            expected_tests: 10,
            sampling: SamplingMode::PerInteraction,
            convert_monkey_logs: true,
            monkey_event_count: 500,
        }
    }
}

/// One `Test_<n>` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDir {
    pub number: u32,
    pub path: PathBuf,
}

impl TestDir {
    pub fn logcat_log(&self) -> PathBuf {
        self.path.join(format!("logcat_{}.log", self.number))
    }

    pub fn monkey_log(&self) -> PathBuf {
        self.path.join(format!("monkey_{}.log", self.number))
    }

    pub fn traversal_log(&self) -> PathBuf {
        self.path.join(format!("traversal_{}.log", self.number))
    }
}

/// Trailing decimal digits of a file or directory name.
pub fn test_number(name: &str) -> Option<u32> {
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    name[stem.len()..].parse().ok()
}

/// Numbered test directories under `dir`, ordered by number.
pub fn discover_tests(dir: &Path) -> Result<Vec<TestDir>, CoverageError> {
    let mut tests = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CoverageError::io(dir, e))? {
        let entry = entry.map_err(|e| CoverageError::io(dir, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(TEST_PREFIX) {
            continue;
        }
        match test_number(name) {
            Some(number) => tests.push(TestDir { number, path }),
            None => tracing::warn!("Skipping unnumbered test directory {}", path.display()),
        }
    }
    tests.sort_by_key(|t| t.number);
    Ok(tests)
}

/// Whether `Test_1..=Test_expected` exist and every test directory holds
/// both raw logs.
pub fn verify_tests_exist(dir: &Path, expected: u32) -> Result<bool, CoverageError> {
    if !dir.is_dir() {
        return Err(CoverageError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let tests = discover_tests(dir)?;
    for n in 1..=expected {
        if !tests.iter().any(|t| t.number == n) {
            tracing::warn!("Missing test directory {TEST_PREFIX}{n} in {}", dir.display());
            return Ok(false);
        }
    }

    for test in &tests {
        if !test.logcat_log().is_file() || !test.monkey_log().is_file() {
            tracing::warn!("Incomplete test directory {}", test.path.display());
            return Ok(false);
        }
    }

    Ok(true)
}

fn read_lines(path: &Path) -> Result<Vec<String>, CoverageError> {
    read_log_lines(path).map_err(|e| CoverageError::io(path, e))
}

/// Write `traversal_<n>.log` from the raw logcat. Returns whether the
/// monkey run injected all of its events.
pub fn prepare_monkey_log(test: &TestDir, events: u32) -> Result<bool, CoverageError> {
    let completed = match read_lines(&test.monkey_log()) {
        Ok(lines) => monkey_run_completed(&lines, events),
        Err(err) => {
            tracing::error!("Failed to verify interaction count: {err}");
            false
        }
    };
    if !completed {
        tracing::warn!(
            "Monkey test did not complete all interactions: {}",
            test.logcat_log().display()
        );
    }

    let converted = convert_monkey_log(read_lines(&test.logcat_log())?);
    let mut contents = converted.join("\n");
    contents.push('\n');
    let out = test.traversal_log();
    fs::write(&out, contents).map_err(|e| CoverageError::io(&out, e))?;
    Ok(completed)
}

/// Prepare every test, logging failures. Returns the tests prepared.
pub fn prepare_monkey_logs(tests: &[TestDir], events: u32) -> usize {
    tests
        .iter()
        .filter(|test| match prepare_monkey_log(test, events) {
            Ok(_) => true,
            Err(err) => {
                tracing::error!("Failed to prepare test {}: {err}", test.number);
                false
            }
        })
        .count()
}

/// Merge every traversal log into `graph`. Unreadable logs are skipped.
pub fn merge_test_logs<G: GraphPort + ?Sized>(
    tests: &[TestDir],
    graph: &mut G,
    classifier: &LineClassifier,
) -> MergeSummary {
    let mut total = MergeSummary::default();
    for test in tests {
        let log = test.traversal_log();
        tracing::info!("Updating graph with monkey log: {}", log.display());
        match read_lines(&log) {
            Ok(lines) => total += merge_lines(graph, classifier, &lines),
            Err(err) => tracing::error!("Failed to read traversal log: {err}"),
        }
    }
    total
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub recorded: Vec<u32>,
    pub failed: Vec<(u32, CoverageError)>,
}

/// Record every test's traversal log as its own run.
///
/// `on_run` sees the graph before its visits are reset, so per-run
/// reports can include visitation. A failing run is logged and the batch
/// continues.
pub fn run_batch<G, F>(
    tests: &[TestDir],
    graph: &mut G,
    classifier: &LineClassifier,
    recorder: &mut CoverageRecorder,
    mut on_run: F,
) -> BatchOutcome
where
    G: GraphPort,
    F: FnMut(&TestDir, &CoverageSeries, &G) -> Result<(), CoverageError>,
{
    let mut outcome = BatchOutcome::default();

    for test in tests {
        let result = recorder
            .record_log_file(test.number, &test.traversal_log(), graph, classifier)
            .and_then(|series| on_run(test, series, graph));
        graph.reset_visits();

        match result {
            Ok(()) => outcome.recorded.push(test.number),
            Err(err) => {
                tracing::error!(
                    "Problem adding test coverage from log file {}: {err}",
                    test.traversal_log().display()
                );
                outcome.failed.push((test.number, err));
            }
        }
    }

    outcome
}

/// Everything a directory batch produced.
#[derive(Debug)]
pub struct BatchReport {
    pub tests: Vec<TestDir>,
    pub merge: MergeSummary,
    pub outcome: BatchOutcome,
    pub recorder: CoverageRecorder,
}

impl BatchReport {
    pub fn overview(&self) -> Option<String> {
        self.recorder.overview().ok()
    }
}

/// Full batch over `dir`: optional monkey conversion, graph merge,
/// per-run recording with reports in each test directory, and aggregate
/// reports in `dir`.
pub fn run_batch_directory(
    dir: &Path,
    config: &BatchConfig,
    graph: &mut InteractionGraph,
    classifier: &LineClassifier,
) -> Result<BatchReport, CoverageError> {
    if !verify_tests_exist(dir, config.expected_tests)? {
        tracing::warn!(
            "{} does not hold the expected {} tests",
            dir.display(),
            config.expected_tests
        );
    }
    let tests = discover_tests(dir)?;

    if config.convert_monkey_logs {
        let prepared = prepare_monkey_logs(&tests, config.monkey_event_count);
        tracing::info!("Prepared {prepared} of {} monkey logs", tests.len());
    }

    let before = graph.composition();
    let merge = merge_test_logs(&tests, graph, classifier);
    let after = graph.composition();
    tracing::info!(
        "Graph grew by {} vertices and {} edges",
        after.vertices - before.vertices,
        after.edges - before.edges
    );

    let mut recorder = CoverageRecorder::new(config.sampling);
    let outcome = run_batch(&tests, graph, classifier, &mut recorder, |test, series, g| {
        ReportWriter::new(&test.path)
            .write_run(Some(test.number), series, &g.visit_status())
            .map(|_| ())
    });

    let writer = ReportWriter::new(dir);
    for statistic in Statistic::ALL {
        if let Err(err) = writer.write_statistic(statistic, &recorder.statistic(statistic)) {
            tracing::error!("Failed to output {statistic} coverage results: {err}");
        }
    }

    let report = BatchReport {
        tests,
        merge,
        outcome,
        recorder,
    };
    match report.overview() {
        Some(overview) => tracing::info!("Coverage Results: {overview}"),
        None => tracing::warn!("No coverage results recorded for {}", dir.display()),
    }
    Ok(report)
}
