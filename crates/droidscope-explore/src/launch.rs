//! Per-package steps run after every launch, for apps that open behind
//! permission prompts or first-run dialogs.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::automation::{AutomationError, AutomationPort};

pub trait LaunchHook: Send {
    fn run(&self, port: &mut dyn AutomationPort) -> Result<(), AutomationError>;
}

/// One scripted launch step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LaunchStep {
    Wait { ms: u64 },
    /// Click the element with this fully qualified resource id.
    ClickId { resource_id: String },
    /// Click the first element whose text contains this.
    ClickText { contains: String },
    Back,
}

/// A launch hook made of fixed steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedLaunch {
    pub steps: Vec<LaunchStep>,
}

impl ScriptedLaunch {
    pub fn new(steps: Vec<LaunchStep>) -> Self {
        Self { steps }
    }
}

impl LaunchHook for ScriptedLaunch {
    fn run(&self, port: &mut dyn AutomationPort) -> Result<(), AutomationError> {
        for step in &self.steps {
            match step {
                LaunchStep::Wait { ms } => thread::sleep(Duration::from_millis(*ms)),
                LaunchStep::ClickId { resource_id } => {
                    tracing::info!("Pressing {resource_id}.");
                    let elements = port.clickable_elements()?;
                    let element = elements
                        .iter()
                        .find(|e| e.resource_id.as_deref() == Some(resource_id.as_str()))
                        .ok_or_else(|| AutomationError::ElementNotFound(resource_id.clone()))?;
                    port.click(element)?;
                }
                LaunchStep::ClickText { contains } => {
                    tracing::info!("Pressing element with text {contains}.");
                    let elements = port.clickable_elements()?;
                    let element = elements
                        .iter()
                        .find(|e| e.text.as_deref().is_some_and(|t| t.contains(contains.as_str())))
                        .ok_or_else(|| AutomationError::ElementNotFound(contains.clone()))?;
                    port.click(element)?;
                }
                LaunchStep::Back => {
                    tracing::info!("Pressing Back Button.");
                    port.navigate_back()?;
                }
            }
        }
        Ok(())
    }
}

/// Launch hooks registered by package name.
#[derive(Default)]
pub struct LaunchHooks {
    hooks: HashMap<String, Box<dyn LaunchHook>>,
}

impl std::fmt::Debug for LaunchHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchHooks")
            .field("packages", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl LaunchHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, package: impl Into<String>, hook: impl LaunchHook + 'static) -> &mut Self {
        self.hooks.insert(package.into(), Box::new(hook));
        self
    }

    pub fn get(&self, package: &str) -> Option<&dyn LaunchHook> {
        self.hooks.get(package).map(|h| h.as_ref())
    }

    /// Run the hook for `package`, if any.
    pub fn run(&self, package: &str, port: &mut dyn AutomationPort) -> Result<(), AutomationError> {
        tracing::info!("Package: {package}");
        match self.get(package) {
            Some(hook) => {
                tracing::info!("Running launch commands for package {package}");
                hook.run(port)
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_from_json() {
        let script: ScriptedLaunch = serde_json::from_str(
            r#"{"steps": [
                {"action": "wait", "ms": 0},
                {"action": "click_id", "resource_id": "android:id/button1"},
                {"action": "back"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(script.steps.len(), 3);
        assert_eq!(
            script.steps[1],
            LaunchStep::ClickId {
                resource_id: "android:id/button1".to_string()
            }
        );
    }
}
