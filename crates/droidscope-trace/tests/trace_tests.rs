use std::sync::Arc;

use droidscope_graph::{ClassIndex, ControlMeta, GraphPort, InteractionGraph, Vertex};
use droidscope_trace::format::{format_control_line, format_method_line};
use droidscope_trace::parse::{parse_line, LogRecord};
use droidscope_trace::update::{merge_lines, observe};
use droidscope_trace::{Classified, LineClassifier, LogEvent};

const MAIN: &str = "com.example.notes.MainActivity";
const LISTENER: &str = "com.example.notes.MainActivity$2";
const ON_CLICK: &str = "void onClick(android.view.View)";
const ON_CREATE: &str = "void onCreate(android.os.Bundle)";

fn classifier() -> LineClassifier {
    let mut index = ClassIndex::new();
    index
        .add_class(MAIN, [ON_CREATE])
        .add_class(LISTENER, [ON_CLICK])
        .set_outer(LISTENER, MAIN);
    LineClassifier::new(Arc::new(index))
}

fn graph() -> InteractionGraph {
    let mut g = InteractionGraph::new();
    g.add_vertex(Vertex::method(format!("<{MAIN}: {ON_CREATE}>")));
    g.add_vertex(Vertex::method(format!("<{LISTENER}: {ON_CLICK}>")));
    for id in [10, 11, 12] {
        g.add_vertex(Vertex::control(ControlMeta::placeholder(MAIN, id)));
    }
    g
}

#[test]
fn test_control_line_round_trip_resolves_to_direct_lookup() {
    let c = classifier();
    let g = graph();

    for id in [10, 11, 12] {
        let line = format_control_line(LISTENER, ON_CLICK, id);
        let LogRecord::Control {
            class,
            sub_signature,
            control_id,
        } = parse_line(&line).unwrap()
        else {
            panic!("expected control record");
        };

        let reparsed = format_control_line(&class, &sub_signature, control_id);
        let Classified::Event(LogEvent::Control {
            signature,
            owner,
            control_id,
        }) = c.classify(&reparsed)
        else {
            panic!("expected control event");
        };

        assert_eq!(
            g.find_control_vertex(&owner, control_id),
            g.find_control_vertex(MAIN, id)
        );
        assert_eq!(
            g.find_method_vertex(&signature),
            g.find_method_vertex(&format!("<{LISTENER}: {ON_CLICK}>"))
        );
    }
}

#[test]
fn test_observe_marks_method_and_control() {
    let c = classifier();
    let mut g = graph();
    let Classified::Event(event) = c.classify(&format_control_line(LISTENER, ON_CLICK, 11)) else {
        panic!("expected event");
    };

    let report = observe(&mut g, &event);
    assert!(!report.method_missed);
    assert!(!report.control_missed);

    let cov = g.compute_coverage();
    assert!((cov.interaction - 100.0 / 3.0).abs() < 1e-9);
    assert!((cov.method - 50.0).abs() < 1e-9);
}

#[test]
fn test_merge_log_adds_runtime_vertices_and_edges() {
    let c = classifier();
    let mut g = graph();
    let before = g.composition();

    let log = vec![
        format_method_line(MAIN, ON_CREATE),
        "<INTERACTION> Count: 1, Info: clicking.".to_string(),
        format_control_line(LISTENER, ON_CLICK, 99),
        format_control_line(LISTENER, ON_CLICK, 10),
        "<METHOD> Method: <com.unknown.Thing: void run()>".to_string(),
        format_control_line(LISTENER, ON_CLICK, -1),
    ];
    let summary = merge_lines(&mut g, &c, &log);

    assert_eq!(summary.lines, 6);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.methods_added, 0);
    assert_eq!(summary.controls_added, 1);
    assert_eq!(summary.edges_added, 2);

    let after = g.composition();
    assert_eq!(after.controls, before.controls + 1);
    assert_eq!(after.edges, before.edges + 2);

    let placeholder = g.find_control_vertex(MAIN, 99).unwrap();
    let on_click = g.find_method_vertex(&format!("<{LISTENER}: {ON_CLICK}>")).unwrap();
    assert!(g.has_edge(placeholder, on_click));
}

#[test]
fn test_merge_synthesises_missing_method_vertex() {
    let c = classifier();
    let mut g = InteractionGraph::new();
    let summary = merge_lines(&mut g, &c, [format_method_line(MAIN, ON_CREATE)]);
    assert_eq!(summary.methods_added, 1);
    assert!(g.find_method_vertex(&format!("<{MAIN}: {ON_CREATE}>")).is_some());
}
