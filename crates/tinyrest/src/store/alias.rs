//! Bidirectional field-name aliasing.
//!
//! External API field names (aliases) map one-to-one onto internal field
//! names. Requests are normalized alias → internal before decoding, and
//! responses are rendered internal → alias.

use super::types::Fields;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    to_internal: HashMap<String, String>,
    to_alias: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `alias` for `internal`. The last registration wins in both
    /// directions; pairs displaced by it are dropped so the table stays one-to-one.
    pub fn add(&mut self, alias: impl Into<String>, internal: impl Into<String>) {
        let alias = alias.into();
        let internal = internal.into();

        if let Some(previous_internal) = self.to_internal.remove(&alias) {
            self.to_alias.remove(&previous_internal);
        }
        if let Some(previous_alias) = self.to_alias.remove(&internal) {
            self.to_internal.remove(&previous_alias);
        }

        self.to_internal.insert(alias.clone(), internal.clone());
        self.to_alias.insert(internal, alias);
    }

    pub fn internal_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.to_internal.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn alias_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.to_alias.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.to_internal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_internal.is_empty()
    }

    /// Rename alias keys to internal keys. Unrecognized keys pass through.
    ///
    /// When a payload carries both an alias and the internal name it stands
    /// for, the aliased value wins.
    pub fn normalize(&self, input: Fields) -> Fields {
        if self.is_empty() {
            return input;
        }

        let mut normalized = Fields::new();
        let mut aliased = Vec::new();
        for (key, value) in input {
            match self.to_internal.get(&key) {
                Some(internal) => aliased.push((internal.clone(), value)),
                None => {
                    normalized.insert(key, value);
                }
            }
        }
        normalized.extend(aliased);
        normalized
    }

    /// Rename internal keys to their registered aliases.
    pub fn alias(&self, input: Fields) -> Fields {
        if self.is_empty() {
            return input;
        }

        input
            .into_iter()
            .map(|(key, value)| match self.to_alias.get(&key) {
                Some(alias) => (alias.clone(), value),
                None => (key, value),
            })
            .collect()
    }
}
