//! Applying resolved log events to an interaction graph.
//!
//! Two modes: `observe` marks existing vertices visited and reports
//! misses; `augment` and `augment_edges` grow the graph with what the
//! trace discovered at runtime.

use droidscope_graph::{ControlMeta, GraphPort, Vertex};

use crate::classify::{Classified, LineClassifier, LogEvent};
use crate::format::{CONTROL_TAG, METHOD_TAG};

/// Outcome of an observe-only update. Misses are non-fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub method_missed: bool,
    pub control_missed: bool,
}

/// Mark the vertices named by `event` visited.
pub fn observe<G: GraphPort + ?Sized>(graph: &mut G, event: &LogEvent) -> UpdateReport {
    let mut report = UpdateReport::default();

    match graph.find_method_vertex(event.signature()) {
        Some(id) => {
            if let Err(err) = graph.visit(id) {
                tracing::error!("Failed to visit method {}: {err}", event.signature());
                report.method_missed = true;
            }
        }
        None => {
            tracing::error!("Failed to visit method: {}", event.signature());
            report.method_missed = true;
        }
    }

    if let LogEvent::Control {
        owner, control_id, ..
    } = event
    {
        match graph.find_control_vertex(owner, *control_id) {
            Some(id) if graph.visit(id).is_ok() => {}
            _ => {
                tracing::warn!("Failed to visit control vertex: {owner}#{control_id}");
                report.control_missed = true;
            }
        }
    }

    report
}

/// Vertices synthesised by [`augment`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AugmentReport {
    pub added_method: bool,
    pub added_control: bool,
}

/// Insert vertices for anything `event` names that the graph lacks.
pub fn augment<G: GraphPort + ?Sized>(graph: &mut G, event: &LogEvent) -> AugmentReport {
    let mut report = AugmentReport::default();

    if graph.find_method_vertex(event.signature()).is_none() {
        tracing::info!("Adding method vertex with signature: {}", event.signature());
        graph.add_vertex(Vertex::method(event.signature()));
        report.added_method = true;
    }

    if let LogEvent::Control {
        owner, control_id, ..
    } = event
    {
        if graph.find_control_vertex(owner, *control_id).is_none() {
            tracing::info!("Adding control vertex with id: {owner}#{control_id}");
            graph.add_vertex(Vertex::control(ControlMeta::placeholder(owner, *control_id)));
            report.added_control = true;
        }
    }

    report
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    Added,
    /// Method events carry no control to connect.
    NotApplicable,
    /// An endpoint was missing; the edge is lost.
    Dropped,
}

/// Connect a control vertex to the method it triggered.
pub fn augment_edges<G: GraphPort + ?Sized>(graph: &mut G, event: &LogEvent) -> EdgeOutcome {
    let LogEvent::Control {
        signature,
        owner,
        control_id,
    } = event
    else {
        return EdgeOutcome::NotApplicable;
    };

    let Some(method) = graph.find_method_vertex(signature) else {
        tracing::error!("Failed to add edge to method vertex: {signature}");
        return EdgeOutcome::Dropped;
    };
    let Some(control) = graph.find_control_vertex(owner, *control_id) else {
        tracing::error!("Failed to add edge from control vertex: {owner}#{control_id}");
        return EdgeOutcome::Dropped;
    };

    match graph.add_edge(control, method) {
        Ok(()) => EdgeOutcome::Added,
        Err(err) => {
            tracing::error!("Failed to add edge {control} -> {method}: {err}");
            EdgeOutcome::Dropped
        }
    }
}

/// Totals from merging a whole log into a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub lines: usize,
    pub skipped: usize,
    pub methods_added: usize,
    pub controls_added: usize,
    pub edges_added: usize,
    pub edges_dropped: usize,
}

impl std::ops::AddAssign for MergeSummary {
    fn add_assign(&mut self, other: Self) {
        self.lines += other.lines;
        self.skipped += other.skipped;
        self.methods_added += other.methods_added;
        self.controls_added += other.controls_added;
        self.edges_added += other.edges_added;
        self.edges_dropped += other.edges_dropped;
    }
}

/// Merge a captured log into `graph`: augment for every method or
/// control line, then connect edges for every control line.
pub fn merge_lines<G, I, S>(graph: &mut G, classifier: &LineClassifier, lines: I) -> MergeSummary
where
    G: GraphPort + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut summary = MergeSummary::default();

    for line in lines {
        let line = line.as_ref();
        summary.lines += 1;
        if !line.contains(METHOD_TAG) && !line.contains(CONTROL_TAG) {
            continue;
        }

        let event = match classifier.classify(line) {
            Classified::Event(event) => event,
            _ => {
                summary.skipped += 1;
                continue;
            }
        };
        tracing::debug!("Interaction/Method: {line}");

        let added = augment(graph, &event);
        summary.methods_added += added.added_method as usize;
        summary.controls_added += added.added_control as usize;

        if line.contains(CONTROL_TAG) {
            match augment_edges(graph, &event) {
                EdgeOutcome::Added => summary.edges_added += 1,
                EdgeOutcome::Dropped => summary.edges_dropped += 1,
                EdgeOutcome::NotApplicable => {}
            }
        }
    }

    summary
}
