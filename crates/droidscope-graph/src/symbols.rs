//! Class and method symbols of the application under test.
//!
//! Log lines name a class and a method sub-signature; they only count as
//! coverage once both resolve against the application's symbol table.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::port::GraphError;

/// Read-only view of the application's classes.
pub trait SymbolTable {
    fn has_class(&self, class: &str) -> bool;

    /// Enclosing class of `class`, if it is an inner class.
    fn outer_class(&self, class: &str) -> Option<String>;

    /// Whether `class` declares a method with the given sub-signature,
    /// e.g. `void onClick(android.view.View)`.
    fn declares_method(&self, class: &str, sub_signature: &str) -> bool;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    #[serde(default)]
    pub outer: Option<String>,
    #[serde(default)]
    pub methods: BTreeSet<String>,
}

/// In-memory symbol table, loadable from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassIndex {
    classes: HashMap<String, ClassEntry>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Register a class with its declared method sub-signatures.
    pub fn add_class<I, S>(&mut self, class: &str, methods: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.classes.entry(class.to_string()).or_default();
        entry.methods.extend(methods.into_iter().map(Into::into));
        self
    }

    /// Register `inner` as nested in `outer`.
    pub fn set_outer(&mut self, inner: &str, outer: &str) -> &mut Self {
        self.classes.entry(inner.to_string()).or_default().outer = Some(outer.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl SymbolTable for ClassIndex {
    fn has_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    fn outer_class(&self, class: &str) -> Option<String> {
        self.classes.get(class).and_then(|c| c.outer.clone())
    }

    fn declares_method(&self, class: &str, sub_signature: &str) -> bool {
        self.classes
            .get(class)
            .is_some_and(|c| c.methods.contains(sub_signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let mut index = ClassIndex::new();
        index
            .add_class("com.a.Main", ["void onCreate(android.os.Bundle)"])
            .add_class("com.a.Main$1", ["void onClick(android.view.View)"])
            .set_outer("com.a.Main$1", "com.a.Main");

        assert!(index.has_class("com.a.Main$1"));
        assert_eq!(index.outer_class("com.a.Main$1").as_deref(), Some("com.a.Main"));
        assert_eq!(index.outer_class("com.a.Main"), None);
        assert!(index.declares_method("com.a.Main", "void onCreate(android.os.Bundle)"));
        assert!(!index.declares_method("com.a.Main", "void onClick(android.view.View)"));
    }

    #[test]
    fn test_from_json() {
        let index = ClassIndex::from_json(
            r#"{ "classes": {
                "com.a.Main": { "methods": ["void foo()"] },
                "com.a.Main$Inner": { "outer": "com.a.Main" }
            } }"#,
        )
        .unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.declares_method("com.a.Main", "void foo()"));
        assert_eq!(
            index.outer_class("com.a.Main$Inner").as_deref(),
            Some("com.a.Main")
        );
    }
}
