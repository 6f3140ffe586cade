pub mod classify;
pub mod format;
pub mod lines;
pub mod monkey;
pub mod parse;
pub mod update;

pub use classify::{Classified, LineClassifier, LogEvent, ResolveError};
pub use format::{CONTROL_TAG, INTERACTION_TAG, METHOD_TAG};
pub use lines::{open_log, read_log_lines, LogLines};
pub use parse::{parse_line, InteractionMarker, LogRecord, ParseError};
