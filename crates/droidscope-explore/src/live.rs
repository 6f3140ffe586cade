//! Live coverage while exploring.
//!
//! Device log lines arrive on the automation collaborator's thread and
//! the explorer writes its own interaction markers from the exploration
//! thread. Both go through one channel so a single consumer applies them
//! to the shared graph in arrival order.

use std::thread::{self, JoinHandle};

use crossbeam::channel::{unbounded, Receiver, Sender};
use droidscope_coverage::{CoverageSeries, RunSession};
use droidscope_graph::{CoverageSnapshot, GraphPort, SharedGraph};
use droidscope_trace::format::is_tagged;
use droidscope_trace::LineClassifier;

use crate::automation::LogSink;
use crate::traversal::controller::ExploreError;

/// A recording session over a shared graph.
///
/// Each line is applied, and any snapshot it triggers is taken, while
/// holding the graph lock.
pub struct LiveCoverage<G> {
    graph: SharedGraph<G>,
    classifier: LineClassifier,
    session: RunSession,
}

impl<G: GraphPort> LiveCoverage<G> {
    pub fn new(graph: SharedGraph<G>, classifier: LineClassifier, session: RunSession) -> Self {
        Self {
            graph,
            classifier,
            session,
        }
    }

    pub fn feed(&mut self, line: &str) {
        let Self {
            graph,
            classifier,
            session,
        } = self;
        graph.with_lock(|g| session.feed(g, classifier, line));
    }

    pub fn snapshot(&self) -> CoverageSnapshot {
        self.graph.with_lock(|g| g.compute_coverage())
    }

    pub fn session(&self) -> &RunSession {
        &self.session
    }

    pub fn finish(self) -> CoverageSeries {
        let Self { graph, session, .. } = self;
        graph.with_lock(|g| session.finish(&*g))
    }
}

enum PumpMessage {
    Line(String),
    Stop,
}

/// Producer side of a [`LogPump`]. Untagged lines are dropped here.
#[derive(Clone)]
pub struct LineSender {
    tx: Sender<PumpMessage>,
}

impl std::fmt::Debug for LineSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSender").finish_non_exhaustive()
    }
}

impl LineSender {
    /// Queue a line. Returns false when it was dropped.
    pub fn send(&self, line: impl Into<String>) -> bool {
        let line = line.into();
        if !is_tagged(&line) {
            return false;
        }
        self.tx.send(PumpMessage::Line(line)).is_ok()
    }

    /// Callback form for [`AutomationPort::subscribe_logs`].
    ///
    /// [`AutomationPort::subscribe_logs`]: crate::automation::AutomationPort::subscribe_logs
    pub fn into_sink(self) -> LogSink {
        Box::new(move |line| {
            self.send(line);
        })
    }
}

/// Single consumer thread feeding a [`LiveCoverage`] session.
pub struct LogPump {
    tx: LineSender,
    worker: Option<JoinHandle<CoverageSeries>>,
}

impl LogPump {
    pub fn start<G>(graph: SharedGraph<G>, classifier: LineClassifier, session: RunSession) -> Self
    where
        G: GraphPort + Send + 'static,
    {
        let (tx, rx) = unbounded();
        let live = LiveCoverage::new(graph, classifier, session);
        let worker = thread::spawn(move || pump(live, rx));
        Self {
            tx: LineSender { tx },
            worker: Some(worker),
        }
    }

    pub fn sender(&self) -> LineSender {
        self.tx.clone()
    }

    /// Drain everything queued so far, then close the session.
    pub fn finish(mut self) -> Result<CoverageSeries, ExploreError> {
        let worker = self.worker.take().ok_or(ExploreError::PumpStopped)?;
        let _ = self.tx.tx.send(PumpMessage::Stop);
        worker.join().map_err(|_| ExploreError::PumpStopped)
    }
}

impl Drop for LogPump {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.tx.tx.send(PumpMessage::Stop);
            let _ = worker.join();
        }
    }
}

fn pump<G: GraphPort>(mut live: LiveCoverage<G>, rx: Receiver<PumpMessage>) -> CoverageSeries {
    for message in rx.iter() {
        match message {
            PumpMessage::Line(line) => live.feed(&line),
            PumpMessage::Stop => break,
        }
    }
    live.finish()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use droidscope_coverage::SamplingMode;
    use droidscope_graph::{ClassIndex, InteractionGraph, Vertex};

    use super::*;

    fn setup() -> (SharedGraph<InteractionGraph>, LineClassifier) {
        let mut g = InteractionGraph::new();
        g.add_vertex(Vertex::method("<A: foo>"));
        g.add_vertex(Vertex::method("<A: bar>"));
        let mut index = ClassIndex::new();
        index.add_class("A", ["foo", "bar"]);
        (SharedGraph::new(g), LineClassifier::new(Arc::new(index)))
    }

    #[test]
    fn test_pump_preserves_order_across_senders() {
        let (graph, classifier) = setup();
        let pump = LogPump::start(
            graph.clone(),
            classifier,
            RunSession::new(0, SamplingMode::PerInteraction),
        );

        let device = pump.sender();
        let explorer = pump.sender();
        let sink = device.into_sink();
        sink("I/Trace: <METHOD> Method: <A: foo>".to_string());
        sink("D/Other: ignored".to_string());
        assert!(explorer.send("<INTERACTION> Count: 1, Info: tap."));
        assert!(!explorer.send("untagged"));
        sink("I/Trace: <METHOD> Method: <A: bar>".to_string());

        let series = pump.finish().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(0), Some(CoverageSnapshot::new(0.0, 50.0)));
        assert_eq!(series.get(1), Some(CoverageSnapshot::new(0.0, 100.0)));
        assert_eq!(graph.compute_coverage(), CoverageSnapshot::new(0.0, 100.0));
    }

    #[test]
    fn test_live_coverage_feed() {
        let (graph, classifier) = setup();
        let mut live = LiveCoverage::new(
            graph,
            classifier,
            RunSession::new(0, SamplingMode::PerInteraction),
        );
        live.feed("<METHOD> Method: <A: foo>");
        assert_eq!(live.snapshot(), CoverageSnapshot::new(0.0, 50.0));
        assert!(live.session().series().is_empty());
        assert_eq!(live.finish().len(), 1);
    }
}
