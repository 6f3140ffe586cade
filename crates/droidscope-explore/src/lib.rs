pub mod automation;
pub mod config;
pub mod launch;
pub mod live;
pub mod traversal;

pub use automation::{AutomationError, AutomationPort, Element, LogSink, Point};
pub use config::ExplorationConfig;
pub use launch::{LaunchHook, LaunchHooks, LaunchStep, ScriptedLaunch};
pub use live::{LineSender, LiveCoverage, LogPump};
pub use traversal::controller::{ExplorationReport, ExploreError, Explorer, ExplorerState, Home};
pub use traversal::controls::{ActivityControlMap, ControlStats, Selection};
pub use traversal::progress::{ProgressTracker, StopReason};
pub use traversal::trace::{ExplorationTrace, TraceStep, TraceStepKind};
