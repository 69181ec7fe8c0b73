//! Recipe placeholder substitution.
//!
//! Recipes are command templates containing `{dotted.path}` placeholders.
//! Each placeholder is looked up in a variable tree; when found, the value is
//! itself expanded against the same tree before being spliced in. Placeholders
//! that do not resolve are left verbatim so a later pass can fill them.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ConfigError, Result};
use crate::node::{ConfigNode, ConfigValue};

/// Nesting limit for placeholder chains. Hitting it almost always means a
/// variable refers back to itself.
pub const MAX_EXPANSION_DEPTH: usize = 64;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder regex is valid"))
}

/// Expand every placeholder in `value` against `variables`.
///
/// A placeholder whose path ends on a nested node rather than a string is a
/// caller error and reported as [`ConfigError::NonScalarPlaceholder`].
pub fn expand(value: &str, variables: &ConfigNode) -> Result<String> {
    expand_at(value, variables, 0)
}

fn expand_at(value: &str, variables: &ConfigNode, depth: usize) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    let mut tail = 0;
    for caps in placeholder().captures_iter(value) {
        let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&value[tail..whole.start()]);
        tail = whole.end();

        match variables.lookup(path.as_str()) {
            None => out.push_str(whole.as_str()),
            Some(ConfigValue::Scalar(resolved)) => {
                if depth >= MAX_EXPANSION_DEPTH {
                    return Err(ConfigError::ExpansionTooDeep {
                        placeholder: path.as_str().to_string(),
                    });
                }
                out.push_str(&expand_at(resolved, variables, depth + 1)?);
            }
            Some(ConfigValue::Node(_)) => {
                return Err(ConfigError::NonScalarPlaceholder {
                    path: path.as_str().to_string(),
                });
            }
        }
    }
    out.push_str(&value[tail..]);
    Ok(out)
}

/// Expand every scalar leaf of `templates`, keyed by dotted path.
pub fn expand_all(templates: &ConfigNode, variables: &ConfigNode) -> Result<BTreeMap<String, String>> {
    templates
        .leaves()
        .into_iter()
        .map(|(key, template)| Ok((key, expand(template, variables)?)))
        .collect()
}
