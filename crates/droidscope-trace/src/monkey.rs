//! Conversion of raw monkey logcat output into traversal logs.
//!
//! Monkey runs carry no explorer markers; activity switches and touch
//! events stand in for interaction boundaries.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::format::{format_interaction_line, CONTROL_TAG, METHOD_TAG};

static INJECTED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Events injected:\s*(\d+)").expect("injected pattern must compile")
});

pub const MONKEY_SWITCH: &str = "Monkey  : :Switch";
pub const MONKEY_TOUCH: &str = "Monkey  : :Sending Touch";
pub const MONKEY_FINISHED: &str = "// Monkey finished";

/// Rewrite a monkey logcat into a traversal log. Markers are counted from
/// zero; instrumentation lines are kept verbatim and everything else is
/// dropped.
pub fn convert_monkey_log<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    let mut count = 0u64;

    for line in lines {
        let line = line.as_ref();
        if line.contains(MONKEY_SWITCH) {
            out.push(format_interaction_line(count, None, MONKEY_SWITCH));
            count += 1;
        } else if line.contains(MONKEY_TOUCH) {
            out.push(format_interaction_line(count, None, MONKEY_TOUCH));
            count += 1;
        } else if line.contains(METHOD_TAG) || line.contains(CONTROL_TAG) {
            out.push(line.to_string());
        }
    }

    out
}

/// Whether a monkey run injected `events` events and finished cleanly.
pub fn monkey_run_completed<I, S>(lines: I, events: u32) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut saw_count = false;
    let mut saw_finish = false;

    for line in lines {
        let line = line.as_ref();
        if let Some(caps) = INJECTED_PATTERN.captures(line) {
            if caps[1].parse::<u32>().ok() == Some(events) {
                saw_count = true;
            }
        } else if line.contains(MONKEY_FINISHED) {
            saw_finish = true;
        }
        if saw_count && saw_finish {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_keeps_instrumentation_and_numbers_markers() {
        let raw = [
            "I/Monkey  : :Switch: #Intent;action=android.intent.action.MAIN;end",
            "I/Trace: <METHOD> Method: <A: void onCreate(android.os.Bundle)>",
            "D/Unrelated: noise",
            "I/Monkey  : :Sending Touch (ACTION_DOWN): 0:(540.0,960.0)",
            "I/Trace: <CONTROL> Method: <A: void onClick(android.view.View)> View: 3",
        ];
        let out = convert_monkey_log(raw);
        assert_eq!(
            out,
            vec![
                "<INTERACTION> Count: 0, Info: Monkey  : :Switch.".to_string(),
                raw[1].to_string(),
                "<INTERACTION> Count: 1, Info: Monkey  : :Sending Touch.".to_string(),
                raw[4].to_string(),
            ]
        );
    }

    #[test]
    fn test_completion_requires_both_lines() {
        let done = ["Events injected: 500", ":Dropped: keys=0", "// Monkey finished"];
        assert!(monkey_run_completed(done, 500));
        assert!(!monkey_run_completed(done, 100));
        assert!(!monkey_run_completed(["Events injected: 500"], 500));
    }

    #[test]
    fn test_completion_compares_whole_event_count() {
        let done = [":Monkey: seed=1 count=500", "Events injected: 500", "// Monkey finished"];
        assert!(!monkey_run_completed(done, 50));
        assert!(!monkey_run_completed(done, 5));
        assert!(!monkey_run_completed(["Events injected: 50", "// Monkey finished"], 500));
        assert!(monkey_run_completed(["Events injected: 50", "// Monkey finished"], 50));
    }
}
