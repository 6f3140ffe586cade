use std::fs;
use std::path::Path;
use std::sync::Arc;

use droidscope_coverage::batch::{run_batch_directory, verify_tests_exist};
use droidscope_coverage::{
    BatchConfig, CoverageError, CoverageRecorder, SamplingMode, Statistic,
};
use droidscope_graph::{ClassIndex, ControlMeta, CoverageSnapshot, GraphPort, InteractionGraph, Vertex};
use droidscope_trace::LineClassifier;

fn graph() -> InteractionGraph {
    let mut g = InteractionGraph::new();
    g.add_vertex(Vertex::method("<A: foo>"));
    g.add_vertex(Vertex::method("<A: bar>"));
    g.add_vertex(Vertex::control(ControlMeta::placeholder("A", 1)));
    g
}

fn classifier() -> LineClassifier {
    let mut index = ClassIndex::new();
    index.add_class("A", ["foo", "bar"]);
    LineClassifier::new(Arc::new(index))
}

fn write_test(root: &Path, n: u32, logcat: &[&str]) {
    let dir = root.join(format!("Test_{n}"));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("logcat_{n}.log")), logcat.join("\n")).unwrap();
    fs::write(
        dir.join(format!("monkey_{n}.log")),
        "Events injected: 500\n// Monkey finished\n",
    )
    .unwrap();
}

fn monkey_dir() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    write_test(
        tmp.path(),
        1,
        &[
            "I/Monkey  : :Switch: #Intent;action=android.intent.action.MAIN;end",
            "I/Trace: <METHOD> Method: <A: foo>",
            "I/Monkey  : :Sending Touch (ACTION_DOWN): 0:(1.0,2.0)",
            "I/Trace: <CONTROL> Method: <A: bar> View: 1",
        ],
    );
    write_test(
        tmp.path(),
        2,
        &[
            "I/Monkey  : :Switch: #Intent;action=android.intent.action.MAIN;end",
            "I/Trace: <METHOD> Method: <A: foo>",
            "D/Other: unrelated",
        ],
    );
    tmp
}

#[test]
fn test_record_log_file_matches_in_memory_run() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("traversal.log");
    fs::write(
        &log,
        "<METHOD> ... Method: <A: foo>\n<INTERACTION> Count: 1, Info: tap.\n<METHOD> ... Method: <A: bar>\n",
    )
    .unwrap();

    let mut g = graph();
    let mut recorder = CoverageRecorder::new(SamplingMode::PerInteraction);
    let series = recorder
        .record_log_file(0, &log, &mut g, &classifier())
        .unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series.get(0), Some(CoverageSnapshot::new(0.0, 50.0)));
    assert_eq!(series.get(1), Some(CoverageSnapshot::new(0.0, 100.0)));
}

#[test]
fn test_non_utf8_line_does_not_fail_run() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("traversal.log");
    fs::write(
        &log,
        b"<METHOD> Method: <A: foo>\nD/Noise: \xff\xfe\n<INTERACTION> Count: 1, Info: tap.\n<METHOD> Method: <A: bar>\n",
    )
    .unwrap();

    let mut g = graph();
    let mut recorder = CoverageRecorder::new(SamplingMode::PerInteraction);
    let series = recorder
        .record_log_file(0, &log, &mut g, &classifier())
        .unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series.get(0), Some(CoverageSnapshot::new(0.0, 50.0)));
    assert_eq!(series.get(1), Some(CoverageSnapshot::new(0.0, 100.0)));
}

#[test]
fn test_missing_log_is_fatal_and_records_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let mut g = graph();
    let mut recorder = CoverageRecorder::default();
    let err = recorder
        .record_log_file(4, &tmp.path().join("absent.log"), &mut g, &classifier())
        .unwrap_err();

    assert!(matches!(err, CoverageError::Io { .. }));
    assert!(recorder.is_empty());
}

#[test]
fn test_verify_tests_exist() {
    let tmp = monkey_dir();
    assert!(verify_tests_exist(tmp.path(), 2).unwrap());
    assert!(!verify_tests_exist(tmp.path(), 3).unwrap());

    fs::remove_file(tmp.path().join("Test_2").join("monkey_2.log")).unwrap();
    assert!(!verify_tests_exist(tmp.path(), 2).unwrap());
}

#[test]
fn test_batch_directory_end_to_end() {
    let tmp = monkey_dir();
    let mut g = graph();
    let config = BatchConfig {
        expected_tests: 2,
        ..BatchConfig::default()
    };

    let report = run_batch_directory(tmp.path(), &config, &mut g, &classifier()).unwrap();

    assert_eq!(report.tests.len(), 2);
    assert_eq!(report.outcome.recorded, vec![1, 2]);
    assert!(report.outcome.failed.is_empty());
    assert_eq!(report.merge.edges_added, 1);

    let avg = report.recorder.statistic(Statistic::Average);
    assert_eq!(avg.get(0), Some(CoverageSnapshot::new(0.0, 0.0)));
    assert_eq!(avg.get(1), Some(CoverageSnapshot::new(0.0, 50.0)));
    assert_eq!(avg.get(2), Some(CoverageSnapshot::new(50.0, 50.0)));
    assert_eq!(
        report.overview().as_deref(),
        Some("Interface 50.00%, Method 50.00%")
    );

    let min = report.recorder.statistic(Statistic::Minimum);
    assert_eq!(min.get(2), Some(CoverageSnapshot::new(100.0, 100.0)));

    // Visits never leak from one run into the next.
    assert_eq!(g.compute_coverage(), CoverageSnapshot::default());

    let test_1 = tmp.path().join("Test_1");
    assert!(test_1.join("traversal_1.log").is_file());
    assert!(test_1.join("results_readable_1.txt").is_file());
    assert_eq!(
        fs::read_to_string(test_1.join("vertex_visit_status_1.txt")).unwrap(),
        "<A: foo>: 1\n<A: bar>: 1\nA#1: 1\n"
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("average_results_raw.csv")).unwrap(),
        "interaction,control,method\n0,0.00,0.00\n1,0.00,50.00\n2,50.00,50.00\n"
    );
    for name in ["minimum", "maximum"] {
        assert!(tmp.path().join(format!("{name}_results_readable.txt")).is_file());
    }
}

#[test]
fn test_failed_run_does_not_stop_batch() {
    let tmp = monkey_dir();
    let config = BatchConfig {
        expected_tests: 2,
        convert_monkey_logs: false,
        ..BatchConfig::default()
    };
    // Only Test_2 gets a traversal log.
    fs::write(
        tmp.path().join("Test_2").join("traversal_2.log"),
        "<INTERACTION> Count: 0, Info: Monkey  : :Switch.\n",
    )
    .unwrap();

    let mut g = graph();
    let report = run_batch_directory(tmp.path(), &config, &mut g, &classifier()).unwrap();

    assert_eq!(report.outcome.recorded, vec![2]);
    assert_eq!(report.outcome.failed.len(), 1);
    assert_eq!(report.outcome.failed[0].0, 1);
}
