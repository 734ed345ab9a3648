//! Per-endpoint configuration sections.

use crate::endpoint::Endpoint;
use crate::store::{FieldDef, RecordStore, Schema};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One virtual endpoint
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Section name, used in log messages
    pub name: String,
    /// Resource base names; each expands to `/name` and `/name/:id`
    #[serde(default)]
    pub paths: Vec<String>,
    /// Enabled HTTP methods; everything else stays disabled
    #[serde(default)]
    pub methods: Vec<String>,
    /// Read-only mode: reject POST/PUT/PATCH/DELETE with 405
    #[serde(default, alias = "read_only")]
    pub safe_mode: bool,
    /// `"alias,internal"` pairs
    #[serde(default)]
    pub field_aliases: Vec<String>,
    /// Seed file overriding the top-level `data`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PathBuf>,
    /// Record attributes; the stock contact/product schema when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<FieldDef>>,
}

impl EndpointConfig {
    /// Build the endpoint and seed its store from `data`.
    ///
    /// Bad paths, methods and alias pairs are logged and skipped. A bad
    /// schema or seed file fails the whole section.
    pub fn build(&self, data: &Path) -> Result<Endpoint, anyhow::Error> {
        let schema = match &self.schema {
            Some(fields) => Schema::new(fields.clone()).context("invalid schema")?,
            None => Schema::default(),
        };

        let mut endpoint = Endpoint::new(self.name.clone(), RecordStore::new(schema));
        endpoint.set_read_only(self.safe_mode);

        for path in &self.paths {
            if let Err(e) = endpoint.add_path(path) {
                warn!("[{}] {} ({:?})", self.name, e, path);
            }
        }
        if endpoint.paths().is_empty() {
            warn!("[{}] No paths", self.name);
        }

        for method in &self.methods {
            match endpoint.enable_method(method) {
                Ok(m) => debug!("[{}] adding method {}", self.name, m),
                Err(e) => warn!("[{}] {}", self.name, e),
            }
        }

        for pair in &self.field_aliases {
            match parse_alias(pair) {
                Some((alias, internal)) => {
                    if shadows_field(endpoint.store().schema(), alias, internal) {
                        warn!(
                            "[{}] Field alias {} shadows field {}; its value will be hidden",
                            self.name, pair, alias
                        );
                    }
                    endpoint.add_alias(alias, internal)
                }
                None => warn!("[{}] Malformed field alias ({})", self.name, pair),
            }
        }

        let bytes = std::fs::read(data)
            .with_context(|| format!("unable to load JSON file ({})", data.display()))?;
        let count = endpoint
            .store()
            .load(&bytes)
            .with_context(|| format!("unable to set JSON data from {}", data.display()))?;
        info!(
            "[{}] loaded {} records from {}",
            self.name,
            count,
            data.display()
        );

        Ok(endpoint)
    }
}

/// Split an `"alias,internal"` pair. Both halves must be non-empty.
pub fn parse_alias(pair: &str) -> Option<(&str, &str)> {
    let mut parts = pair.split(',');
    let alias = parts.next()?.trim();
    let internal = parts.next()?.trim();
    if parts.next().is_some() || alias.is_empty() || internal.is_empty() {
        return None;
    }
    Some((alias, internal))
}

/// An alias naming another existing field hides that field in responses.
fn shadows_field(schema: &Schema, alias: &str, internal: &str) -> bool {
    alias != internal && schema.contains(alias)
}
