//! Hierarchical configuration tree.
//!
//! A [`ConfigNode`] maps key segments to either a scalar string or another
//! node. Values are never coerced; numeric or boolean interpretation is left
//! to whoever reads them. Keys keep the order they were first inserted in,
//! which is the order of the description file.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single value in a configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// A raw string value.
    Scalar(String),
    /// A nested node.
    Node(ConfigNode),
}

impl ConfigValue {
    /// The scalar string, if this value is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Scalar(s) => Some(s),
            ConfigValue::Node(_) => None,
        }
    }

    /// The nested node, if this value is one.
    pub fn as_node(&self) -> Option<&ConfigNode> {
        match self {
            ConfigValue::Node(n) => Some(n),
            ConfigValue::Scalar(_) => None,
        }
    }

    /// Turn a scalar into a node labelled with the old value, then return the node.
    fn promote(&mut self) -> &mut ConfigNode {
        if let ConfigValue::Scalar(label) = self {
            let label = std::mem::take(label);
            *self = ConfigValue::Node(ConfigNode::labelled(label));
        }
        match self {
            ConfigValue::Node(node) => node,
            ConfigValue::Scalar(_) => unreachable!("scalar was promoted above"),
        }
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Scalar(s)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Scalar(s.to_string())
    }
}

impl From<ConfigNode> for ConfigValue {
    fn from(node: ConfigNode) -> Self {
        ConfigValue::Node(node)
    }
}

/// A node of the configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigNode {
    entries: IndexMap<String, ConfigValue>,
}

impl ConfigNode {
    /// An empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// A node carrying only a `name` label.
    pub fn labelled(name: impl Into<String>) -> Self {
        let mut node = Self::new();
        node.insert("name", name.into());
        node
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ConfigValue> {
        self.entries.get_mut(key)
    }

    /// Scalar value directly under `key`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_str)
    }

    /// Nested node directly under `key`.
    pub fn node(&self, key: &str) -> Option<&ConfigNode> {
        self.get(key).and_then(ConfigValue::as_node)
    }

    /// Insert a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Option<ConfigValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.entries.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut ConfigValue)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Walk a dotted path (`build.variant.path`).
    ///
    /// Returns `None` as soon as a segment is missing or the walk runs into a
    /// scalar before the path is exhausted.
    pub fn lookup(&self, dotted: &str) -> Option<&ConfigValue> {
        let mut segments = dotted.split('.');
        let first = segments.next()?;
        let mut current = self.get(first)?;
        for segment in segments {
            current = current.as_node()?.get(segment)?;
        }
        Some(current)
    }

    /// Scalar value at a dotted path.
    pub fn lookup_str(&self, dotted: &str) -> Option<&str> {
        self.lookup(dotted).and_then(ConfigValue::as_str)
    }

    /// Set the value at a key path, creating intermediate nodes.
    ///
    /// An intermediate segment that currently holds a scalar is promoted to a
    /// node whose `name` is the old scalar, so `foo=bar` followed by
    /// `foo.baz=qux` yields `foo = {name: bar, baz: qux}`. The final segment
    /// is overwritten unconditionally.
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: impl Into<ConfigValue>) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let mut node = self;
        for segment in parents {
            node = node
                .entries
                .entry(segment.as_ref().to_string())
                .or_insert_with(|| ConfigValue::Node(ConfigNode::new()))
                .promote();
        }
        node.entries.insert(last.as_ref().to_string(), value.into());
    }

    /// Same as [`set_path`](Self::set_path) with a dotted key.
    pub fn set_dotted(&mut self, dotted: &str, value: impl Into<ConfigValue>) {
        let path: Vec<&str> = dotted.split('.').collect();
        self.set_path(&path, value);
    }

    /// Copy in every key of `other` that this node lacks, recursing where
    /// both sides hold nodes. Existing values always win.
    pub fn merge_missing(&mut self, other: &ConfigNode) {
        for (key, theirs) in &other.entries {
            match (self.entries.get_mut(key), theirs) {
                (None, _) => {
                    self.entries.insert(key.clone(), theirs.clone());
                }
                (Some(ConfigValue::Node(ours)), ConfigValue::Node(theirs)) => {
                    ours.merge_missing(theirs);
                }
                (Some(_), _) => {}
            }
        }
    }

    /// Lay `other` over this node: its scalars replace ours, nested nodes
    /// merge recursively.
    pub fn overlay(&mut self, other: &ConfigNode) {
        for (key, theirs) in &other.entries {
            match (self.entries.get_mut(key), theirs) {
                (Some(ConfigValue::Node(ours)), ConfigValue::Node(theirs)) => ours.overlay(theirs),
                _ => {
                    self.entries.insert(key.clone(), theirs.clone());
                }
            }
        }
    }

    /// Every scalar leaf as `(dotted.key, value)`, depth-first in insertion order.
    pub fn leaves(&self) -> Vec<(String, &str)> {
        let mut out = Vec::new();
        self.collect_leaves("", &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a str)>) {
        for (key, value) in &self.entries {
            let dotted = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                ConfigValue::Scalar(s) => out.push((dotted, s)),
                ConfigValue::Node(n) => n.collect_leaves(&dotted, out),
            }
        }
    }
}
