//! Tags and line formats written by the instrumented app and by the
//! explorer.

pub const METHOD_TAG: &str = "<METHOD>";
pub const CONTROL_TAG: &str = "<CONTROL>";
pub const INTERACTION_TAG: &str = "<INTERACTION>";

/// Whether a line carries any of the three instrumentation tags.
pub fn is_tagged(line: &str) -> bool {
    line.contains(METHOD_TAG) || line.contains(CONTROL_TAG) || line.contains(INTERACTION_TAG)
}

pub fn format_method_line(class: &str, sub_signature: &str) -> String {
    format!("{METHOD_TAG} Method: <{class}: {sub_signature}>")
}

pub fn format_control_line(class: &str, sub_signature: &str, control_id: i32) -> String {
    format!("{CONTROL_TAG} Method: <{class}: {sub_signature}> View: {control_id}")
}

pub fn format_interaction_line(count: u64, id: Option<&str>, info: &str) -> String {
    match id {
        Some(id) => format!("{INTERACTION_TAG} Count: {count}, Id: {id}, Info: {info}."),
        None => format!("{INTERACTION_TAG} Count: {count}, Info: {info}."),
    }
}
