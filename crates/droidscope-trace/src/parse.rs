//! Syntactic parsing of instrumentation log lines.
//!
//! This stage only looks at tags and patterns. Symbol resolution happens
//! in [`crate::classify`].

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::format::{CONTROL_TAG, INTERACTION_TAG, METHOD_TAG};

static CONTROL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Method:\s<(.+):\s(.+)>\sView:\s(-?\d+)").expect("control pattern must compile")
});

static METHOD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Method:\s<(.+):\s(.+)>").expect("method pattern must compile"));

static INTERACTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Count:\s*(\d+),(?:\s*Id:\s*([^,]*),)?\s*Info:\s*(.*?)\.?\s*$")
        .expect("interaction pattern must compile")
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("No recognisable tag in log message: {0}")]
    NoTag(String),

    #[error("Malformed {tag} log message: {line}")]
    Malformed { tag: &'static str, line: String },

    #[error("Control id out of range in log message: {0}")]
    BadControlId(String),
}

/// An interaction boundary written by the explorer (or synthesised from a
/// monkey log).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionMarker {
    /// Sequence count, `None` when the body did not follow the
    /// `Count: n, Info: text.` layout.
    pub count: Option<u64>,
    /// Resource id of the clicked control, when the explorer knew it.
    pub id: Option<String>,
    pub info: String,
}

/// A tagged log line before symbol resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    Method {
        class: String,
        sub_signature: String,
    },
    Control {
        class: String,
        sub_signature: String,
        control_id: i32,
    },
    Interaction(InteractionMarker),
}

/// Remove single quotes, which some loggers wrap identifiers in.
fn strip_quotes(line: &str) -> Cow<'_, str> {
    if line.contains('\'') {
        tracing::warn!("Removed single quotation from log message.");
        Cow::Owned(line.replace('\'', ""))
    } else {
        Cow::Borrowed(line)
    }
}

/// Parse one raw log line into a [`LogRecord`].
pub fn parse_line(line: &str) -> Result<LogRecord, ParseError> {
    if line.contains(INTERACTION_TAG) {
        return Ok(LogRecord::Interaction(parse_marker(line)));
    }

    let is_control = line.contains(CONTROL_TAG);
    if !is_control && !line.contains(METHOD_TAG) {
        return Err(ParseError::NoTag(line.to_string()));
    }

    let cleaned = strip_quotes(line);
    if is_control {
        let caps = CONTROL_PATTERN
            .captures(&cleaned)
            .ok_or_else(|| ParseError::Malformed {
                tag: CONTROL_TAG,
                line: line.to_string(),
            })?;
        let control_id = caps[3]
            .parse::<i32>()
            .map_err(|_| ParseError::BadControlId(line.to_string()))?;
        Ok(LogRecord::Control {
            class: caps[1].to_string(),
            sub_signature: caps[2].to_string(),
            control_id,
        })
    } else {
        let caps = METHOD_PATTERN
            .captures(&cleaned)
            .ok_or_else(|| ParseError::Malformed {
                tag: METHOD_TAG,
                line: line.to_string(),
            })?;
        Ok(LogRecord::Method {
            class: caps[1].to_string(),
            sub_signature: caps[2].to_string(),
        })
    }
}

fn parse_marker(line: &str) -> InteractionMarker {
    let body = line
        .split_once(INTERACTION_TAG)
        .map(|(_, rest)| rest.trim())
        .unwrap_or_default();

    match INTERACTION_PATTERN.captures(body) {
        Some(caps) => InteractionMarker {
            count: caps[1].parse().ok(),
            id: caps.get(2).map(|m| m.as_str().trim().to_string()),
            info: caps[3].to_string(),
        },
        None => InteractionMarker {
            count: None,
            id: None,
            info: body.to_string(),
        },
    }
}
