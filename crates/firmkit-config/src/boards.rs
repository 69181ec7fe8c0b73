//! Board catalogue with CPU variant expansion.
//!
//! Board description files may carry a `menu.cpu.<board>.<variant>.*`
//! section. Each `(board, variant)` pair found there becomes a standalone
//! board keyed `<board>_<variant>`; the base board it was derived from is
//! dropped from the catalogue.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::node::{ConfigNode, ConfigValue};
use crate::parse::{for_each_entry, read_description};

/// Board model selected when none is given.
pub const DEFAULT_BOARD_MODEL: &str = "uno";

/// Variants recorded during one parse: board -> variant -> attributes.
type VariantTable = IndexMap<String, IndexMap<String, ConfigNode>>;

/// All known board models, keyed by model id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardModels {
    models: ConfigNode,
    default: String,
}

impl Default for BoardModels {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardModels {
    /// An empty catalogue defaulting to [`DEFAULT_BOARD_MODEL`].
    pub fn new() -> Self {
        BoardModels {
            models: ConfigNode::new(),
            default: DEFAULT_BOARD_MODEL.to_string(),
        }
    }

    /// Parse a `boards.txt` and add its boards, tagging them with `arch`.
    pub fn parse(&mut self, path: &Path, arch: &str) -> Result<()> {
        let content = read_description(path)?;
        self.parse_str(&content, path, arch)
    }

    /// Parse board description text. `origin` is only used in error messages.
    pub fn parse_str(&mut self, content: &str, origin: &Path, arch: &str) -> Result<()> {
        let mut boards = ConfigNode::new();
        let mut variants = VariantTable::new();

        for_each_entry(content, origin, |key, value| {
            if key[0] == "menu" {
                record_menu(&mut variants, &key[1..], value);
            } else {
                boards.set_path(&key, value);
            }
        })?;

        expand_variants(&mut boards, variants);

        for (model, entry) in boards.iter_mut() {
            match entry {
                ConfigValue::Node(board) => {
                    if !board.contains_key("arch") {
                        board.insert("arch", arch);
                    }
                }
                ConfigValue::Scalar(_) => {
                    log::debug!("{}: top-level scalar `{model}` is not a board", origin.display());
                }
            }
        }

        for (model, entry) in boards.iter() {
            self.models.insert(model, entry.clone());
        }
        Ok(())
    }

    /// Look up a board by model id.
    pub fn get(&self, model: &str) -> Option<&ConfigNode> {
        self.models.node(model)
    }

    pub fn contains(&self, model: &str) -> bool {
        self.get(model).is_some()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn default_model(&self) -> &str {
        &self.default
    }

    pub fn set_default_model(&mut self, model: impl Into<String>) {
        self.default = model.into();
    }

    /// `(model id, human-readable name)` for every board.
    pub fn names(&self) -> Vec<(&str, &str)> {
        self.models
            .iter()
            .filter_map(|(model, entry)| {
                let board = entry.as_node()?;
                Some((model, board.get_str("name").unwrap_or(model)))
            })
            .collect()
    }

    /// Render the catalogue as an aligned `model: name` listing.
    pub fn format(&self) -> String {
        let names = self.names();
        let width = names.iter().map(|(model, _)| model.len()).max().unwrap_or(0);
        let mut out = String::new();
        for (model, name) in names {
            let marker = if model == self.default { " (default)" } else { "" };
            out.push_str(&format!("  {model:>width$}: {name}{marker}\n"));
        }
        out
    }
}

/// Record one `menu.*` entry. Only the `cpu` menu is understood.
fn record_menu(variants: &mut VariantTable, menu_key: &[&str], value: &str) {
    let [menu, board, variant, rest @ ..] = menu_key else {
        // `menu.cpu=Processor` and friends only label the menu.
        return;
    };
    if *menu != "cpu" {
        log::debug!("ignoring menu.{}", menu_key.join("."));
        return;
    }

    let entry = variants
        .entry(board.to_string())
        .or_default()
        .entry(variant.to_string())
        .or_default();
    if rest.is_empty() {
        entry.insert("name", value);
    } else {
        entry.set_path(rest, value);
    }
}

/// Replace each board that has recorded variants by one entry per variant.
fn expand_variants(boards: &mut ConfigNode, variants: VariantTable) {
    for (board, cpus) in variants {
        let base = match boards.remove(&board) {
            Some(ConfigValue::Node(node)) => node,
            Some(ConfigValue::Scalar(label)) => ConfigNode::labelled(label),
            None => {
                log::warn!("cpu menu refers to unknown board `{board}`, skipping its variants");
                continue;
            }
        };
        let base_name = base.get_str("name").unwrap_or(&board).to_string();
        let mut inherited = base.clone();
        inherited.remove("name");

        for (cpu, mut entry) in cpus {
            let variant_name = entry.get_str("name").unwrap_or(&cpu).to_string();
            entry.insert("name", format!("{base_name} w/ {variant_name}"));
            entry.merge_missing(&inherited);
            boards.insert(format!("{board}_{cpu}"), entry);
        }
    }
}
