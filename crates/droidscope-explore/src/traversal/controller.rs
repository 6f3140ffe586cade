//! The exploration loop.
//!
//! Launch the app, then repeatedly settle, select a control on the
//! current screen and act on it until the interaction budget is spent or
//! the loop stops making progress. Every action is announced with an
//! interaction marker before it is performed.

use std::thread;

use droidscope_trace::format::format_interaction_line;

use super::controls::{ActivityControlMap, Selection};
use super::progress::{ProgressTracker, StopReason};
use super::trace::{ExplorationTrace, TraceStepKind};
use crate::automation::{AutomationError, AutomationPort, Element};
use crate::config::ExplorationConfig;
use crate::launch::LaunchHooks;
use crate::live::LineSender;

/// Screen name used when the foreground screen could not be read.
const UNKNOWN_SCREEN: &str = "<unknown>";

#[derive(Debug, thiserror::Error)]
pub enum ExploreError {
    #[error(transparent)]
    Automation(#[from] AutomationError),

    #[error("Exploration already finished")]
    Finished,

    #[error("Log pump stopped unexpectedly")]
    PumpStopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerState {
    Launching,
    Selecting,
    Acting,
    Stopped,
}

/// Screen and package recorded at first launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Home {
    pub screen: String,
    pub package: String,
}

#[derive(Debug, Clone)]
pub struct ExplorationReport {
    pub interactions: u64,
    pub stop_reason: StopReason,
    pub cycles: u64,
    /// Distinct screens a control was selected on.
    pub screens: usize,
    pub trace: ExplorationTrace,
}

impl ExplorationReport {
    pub fn budget_reached(&self) -> bool {
        self.stop_reason == StopReason::BudgetReached
    }
}

/// Drives one exploration run over an automation session it owns.
///
/// The session is released when [`run`](Explorer::run) returns, on every
/// path, or when the explorer is dropped without running.
pub struct Explorer<A: AutomationPort> {
    port: A,
    config: ExplorationConfig,
    hooks: LaunchHooks,
    controls: ActivityControlMap,
    progress: ProgressTracker,
    trace: ExplorationTrace,
    markers: Option<LineSender>,
    home: Option<Home>,
    state: ExplorerState,
    cycles: u64,
    stop_reason: Option<StopReason>,
    released: bool,
}

impl<A: AutomationPort> Explorer<A> {
    pub fn new(port: A, config: ExplorationConfig) -> Self {
        let progress = ProgressTracker::new(config.max_interactions, config.max_no_progress);
        Self {
            port,
            config,
            hooks: LaunchHooks::new(),
            controls: ActivityControlMap::new(),
            progress,
            trace: ExplorationTrace::new(),
            markers: None,
            home: None,
            state: ExplorerState::Launching,
            cycles: 0,
            stop_reason: None,
            released: false,
        }
    }

    pub fn with_launch_hooks(mut self, hooks: LaunchHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Feed device logs and interaction markers into a live pipeline.
    pub fn with_live_logs(mut self, sender: LineSender) -> Self {
        self.markers = Some(sender);
        self
    }

    pub fn state(&self) -> ExplorerState {
        self.state
    }

    pub fn home(&self) -> Option<&Home> {
        self.home.as_ref()
    }

    pub fn trace(&self) -> &ExplorationTrace {
        &self.trace
    }

    pub fn controls(&self) -> &ActivityControlMap {
        &self.controls
    }

    pub fn port(&self) -> &A {
        &self.port
    }

    pub fn interactions(&self) -> u64 {
        self.progress.count()
    }

    /// Why the last run stopped, once it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Explore until a stopping condition holds, then release the session.
    pub fn run(&mut self) -> Result<ExplorationReport, ExploreError> {
        if self.state == ExplorerState::Stopped {
            return Err(ExploreError::Finished);
        }
        tracing::info!("Running Traversal...");

        let result = self.explore();
        self.state = ExplorerState::Stopped;
        self.stop_reason = Some(match &result {
            Ok(reason) => *reason,
            Err(_) => StopReason::AutomationFailure,
        });
        self.release();

        if !self.progress.budget_reached() {
            tracing::error!(
                "Traversal only completed {} interactions.",
                self.progress.count()
            );
        }

        let stop_reason = result.map_err(|err| {
            tracing::error!("Exploration stopped: {err}");
            err
        })?;

        Ok(ExplorationReport {
            interactions: self.progress.count(),
            stop_reason,
            cycles: self.cycles,
            screens: self.controls.len(),
            trace: self.trace.clone(),
        })
    }

    fn explore(&mut self) -> Result<StopReason, AutomationError> {
        if let Some(sender) = &self.markers {
            tracing::info!("Starting log broadcast.");
            self.port.subscribe_logs(sender.clone().into_sink())?;
        }

        self.launch()?;
        self.progress.mark_seen();

        loop {
            self.state = ExplorerState::Selecting;
            self.cycles += 1;
            self.settle();
            self.step()?;

            if let Some(reason) = self.progress.check() {
                return Ok(reason);
            }
        }
    }

    /// One Selecting/Acting cycle.
    fn step(&mut self) -> Result<(), AutomationError> {
        if !self.in_app()? {
            self.launch()?;
        }
        let screen = match self.port.current_screen_id() {
            Ok(screen) => screen,
            Err(err) => return self.recover(UNKNOWN_SCREEN, err),
        };
        tracing::info!("Current Activity: {screen}");

        let elements = match self.port.clickable_elements() {
            Ok(elements) => elements,
            Err(err) => return self.recover(&screen, err),
        };
        let selection = self.controls.select(&screen, &elements);

        self.state = ExplorerState::Acting;
        match selection {
            Selection::Back => self.back_or_idle(&screen),
            Selection::Control(index) => self.click(&screen, &elements[index]),
        }
    }

    fn settle(&self) {
        let delay = self.config.settle_delay();
        if !delay.is_zero() {
            tracing::debug!("Waiting {delay:?} for UI.");
            thread::sleep(delay);
        }
    }

    fn launch(&mut self) -> Result<(), AutomationError> {
        self.state = ExplorerState::Launching;
        let relaunch = self.home.is_some();
        self.interaction(None, if relaunch { "relaunching app" } else { "launching app" });
        self.port.launch_app()?;

        let screen = self.port.current_screen_id()?;
        let package = match &self.home {
            Some(home) => home.package.clone(),
            None => {
                let package = self.port.current_package()?;
                self.home = Some(Home {
                    screen: screen.clone(),
                    package: package.clone(),
                });
                package
            }
        };
        self.trace.record(screen, TraceStepKind::Launch { relaunch });

        self.hooks.run(&package, &mut self.port)
    }

    fn in_app(&mut self) -> Result<bool, AutomationError> {
        let Some(home) = &self.home else {
            return Ok(true);
        };
        let package = home.package.clone();
        Ok(self.port.current_package()?.starts_with(&package))
    }

    fn is_home_screen(&self, screen: &str) -> bool {
        self.home.as_ref().is_some_and(|h| h.screen == screen)
    }

    /// Emit the marker for the next interaction and return its number.
    fn interaction(&mut self, id: Option<&str>, info: &str) -> u64 {
        let count = self.progress.record();
        tracing::info!("Interaction {count} {info}.");

        let line = format_interaction_line(count, id, info);
        tracing::debug!("{line}");
        if let Some(sender) = &self.markers {
            sender.send(line);
        }
        count
    }

    fn back_or_idle(&mut self, screen: &str) -> Result<(), AutomationError> {
        if self.is_home_screen(screen) {
            tracing::warn!("No control elements on the launch activity.");
            self.trace.record(screen, TraceStepKind::Idle);
            return Ok(());
        }

        self.back()?;
        self.trace.record(screen, TraceStepKind::Back { forced: false });
        Ok(())
    }

    /// Counted back navigation.
    fn back(&mut self) -> Result<(), AutomationError> {
        self.interaction(None, "pressing back");
        self.port.navigate_back()
    }

    /// Replace a failed command with a forced back. Fatal errors stop the
    /// run.
    fn recover(&mut self, screen: &str, err: AutomationError) -> Result<(), AutomationError> {
        if err.is_fatal() {
            return Err(err);
        }
        self.state = ExplorerState::Acting;
        tracing::warn!("Automation command failed on {screen}, navigating back: {err}");
        self.back()?;
        self.trace.record(screen, TraceStepKind::Back { forced: true });
        Ok(())
    }

    fn hide_keyboard(&mut self) -> Result<TraceStepKind, AutomationError> {
        self.interaction(None, "hiding keyboard");
        match self.port.hide_keyboard() {
            Ok(()) => Ok(TraceStepKind::HideKeyboard),
            Err(err) if !err.is_fatal() => {
                tracing::warn!("Failed to hide keyboard, navigating back: {err}");
                self.back()?;
                Ok(TraceStepKind::Back { forced: true })
            }
            Err(err) => Err(err),
        }
    }

    fn click(&mut self, screen: &str, element: &Element) -> Result<(), AutomationError> {
        let (id, resolved) = element.marker_id();
        if !resolved {
            tracing::error!("Control element has no resource id, using {id} instead.");
        }

        let before = self.port.current_screen_id()?;
        self.interaction(Some(&id), &format!("clicking {}", element.describe()));

        if let Err(err) = self.port.click(element) {
            if err.is_fatal() {
                return Err(err);
            }
            self.trace.record(screen, TraceStepKind::ClickFailed { id });
            self.controls.record_click(screen, element.center, true);
            return self.recover(screen, err);
        }

        let keyboard = element
            .class_name
            .contains(self.config.keyboard_class_marker.as_str());
        let keyboard_step = if keyboard {
            Some(self.hide_keyboard()?)
        } else {
            None
        };

        let mut leaf = self.port.current_screen_id()? == before;
        let left_app = !self.in_app()?;
        if left_app {
            tracing::info!("No longer in the test app... should press back to return.");
            self.back()?;
            leaf = true;
        }

        self.trace.record(
            screen,
            TraceStepKind::Click {
                id,
                center: element.center,
                leaf,
            },
        );
        if let Some(kind) = keyboard_step {
            self.trace.record(screen, kind);
        }
        if left_app {
            self.trace.record(screen, TraceStepKind::Back { forced: true });
        }

        self.controls.record_click(screen, element.center, leaf);
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        tracing::info!("Releasing automation session.");
        if let Err(err) = self.port.release() {
            tracing::error!("Failed to release automation session: {err}");
        }
    }
}

impl<A: AutomationPort> Drop for Explorer<A> {
    fn drop(&mut self) {
        self.release();
    }
}
