use std::sync::Arc;

use droidscope_graph::SymbolTable;

use crate::parse::{parse_line, InteractionMarker, LogRecord, ParseError};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Failed to retrieve class {0} found in log message")]
    UnknownClass(String),

    #[error("Failed to retrieve method {method} on class {class}")]
    UnknownMethod { class: String, method: String },

    #[error("Interaction markers carry no method to resolve")]
    NotAnEvent,
}

/// A resolved instrumentation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Method {
        signature: String,
    },
    Control {
        signature: String,
        owner: String,
        control_id: i32,
    },
}

impl LogEvent {
    pub fn signature(&self) -> &str {
        match self {
            LogEvent::Method { signature } | LogEvent::Control { signature, .. } => signature,
        }
    }
}

/// Classification of one raw log line.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Event(LogEvent),
    Marker(InteractionMarker),
    /// Dropped with a diagnostic; the caller skips the line.
    Unrecognized(String),
}

/// Turns raw lines into typed events, resolving class and method names
/// against the application's symbol table.
#[derive(Clone)]
pub struct LineClassifier {
    symbols: Arc<dyn SymbolTable + Send + Sync>,
}

impl std::fmt::Debug for LineClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineClassifier").finish_non_exhaustive()
    }
}

impl LineClassifier {
    pub fn new(symbols: Arc<dyn SymbolTable + Send + Sync>) -> Self {
        Self { symbols }
    }

    pub fn classify(&self, line: &str) -> Classified {
        match parse_line(line) {
            Ok(LogRecord::Interaction(marker)) => Classified::Marker(marker),
            Ok(record) => match self.resolve(&record) {
                Ok(event) => Classified::Event(event),
                Err(err) => {
                    tracing::error!("{err}");
                    tracing::error!("Failure while reading log message: {line}");
                    Classified::Unrecognized(err.to_string())
                }
            },
            Err(err) => {
                match &err {
                    ParseError::NoTag(_) => tracing::error!("{err}"),
                    _ => tracing::error!("Failure while reading log message: {err}"),
                }
                Classified::Unrecognized(err.to_string())
            }
        }
    }

    /// Resolve a method or control record. Markers are not resolvable.
    ///
    /// The method is looked up on the named class first and on its outer
    /// class second. When the class is nested, the event is attributed to
    /// the outer class, which is where the static graph keys its controls.
    pub fn resolve(&self, record: &LogRecord) -> Result<LogEvent, ResolveError> {
        let (class, sub_signature, control_id) = match record {
            LogRecord::Method {
                class,
                sub_signature,
            } => (class, sub_signature, None),
            LogRecord::Control {
                class,
                sub_signature,
                control_id,
            } => (class, sub_signature, Some(*control_id)),
            LogRecord::Interaction(_) => return Err(ResolveError::NotAnEvent),
        };

        if !self.symbols.has_class(class) {
            return Err(ResolveError::UnknownClass(class.clone()));
        }

        let mut owner = class.clone();
        let mut declaring = self
            .symbols
            .declares_method(class, sub_signature)
            .then(|| class.clone());
        if let Some(outer) = self.symbols.outer_class(class) {
            if declaring.is_none() && self.symbols.declares_method(&outer, sub_signature) {
                declaring = Some(outer.clone());
            }
            owner = outer;
        }

        let declaring = declaring.ok_or_else(|| ResolveError::UnknownMethod {
            class: class.clone(),
            method: sub_signature.clone(),
        })?;
        let signature = format!("<{declaring}: {sub_signature}>");

        Ok(match control_id {
            Some(control_id) if control_id >= 0 => LogEvent::Control {
                signature,
                owner,
                control_id,
            },
            _ => LogEvent::Method { signature },
        })
    }
}
