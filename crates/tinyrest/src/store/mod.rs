//! In-memory record store with ID assignment and field aliasing.
//!
//! Each endpoint owns one [`RecordStore`]. Records live in creation order
//! behind a single mutex; the mutex also guards the ID counter so that the
//! sequence and the counter always change together. Payload parsing, alias
//! translation and schema decoding happen before the lock is taken.
//!
//! ## Module Structure
//!
//! - `types`: error types and the `Fields` alias
//! - `record`: `Schema`, `FieldDef`, `FieldKind`, `Record`
//! - `alias`: `AliasTable`

mod alias;
mod record;
mod types;


pub use alias::AliasTable;
pub use record::{FieldDef, FieldKind, Record, Schema, ID_FIELD};
pub use types::{Fields, SchemaError, StoreError};

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

struct StoreState {
    records: Vec<Record>,
    /// Last assigned identifier; never decremented
    id_count: i64,
}

/// Ordered collection of records for one endpoint
pub struct RecordStore {
    schema: Schema,
    aliases: AliasTable,
    state: Mutex<StoreState>,
}

impl RecordStore {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            aliases: AliasTable::new(),
            state: Mutex::new(StoreState {
                records: Vec::new(),
                id_count: 0,
            }),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Register an alias → internal field-name pair. Last write wins.
    pub fn add_alias(&mut self, alias: impl Into<String>, internal: impl Into<String>) {
        self.aliases.add(alias, internal);
    }

    /// Replace the store contents with a JSON array of records keyed by internal names.
    ///
    /// Returns the number of records loaded. Records without an `id` are
    /// numbered after the highest seeded id, in seed order; duplicate ids are
    /// rejected. The ID counter continues from the larger of the record count
    /// and the highest id.
    pub fn load(&self, data: &[u8]) -> Result<usize, StoreError> {
        let objects: Vec<Fields> = serde_json::from_slice(data).map_err(StoreError::decode)?;
        let mut records = objects
            .iter()
            .map(|object| Ok((object.contains_key(ID_FIELD), self.schema.decode(object)?)))
            .collect::<Result<Vec<_>, StoreError>>()?;

        let mut seen = HashSet::new();
        for (_, record) in records.iter().filter(|(has_id, _)| *has_id) {
            if !seen.insert(record.id) {
                return Err(StoreError::Decode(format!(
                    "duplicate id {} in seed data",
                    record.id
                )));
            }
        }

        let mut highest = seen.iter().copied().max().unwrap_or(0);
        for (_, record) in records.iter_mut().filter(|(has_id, _)| !*has_id) {
            highest = highest.checked_add(1).ok_or(StoreError::IdExhausted)?;
            record.id = highest;
        }

        let records: Vec<Record> = records.into_iter().map(|(_, record)| record).collect();
        let count = records.len();

        let mut state = self.state.lock();
        state.id_count = highest.max(count as i64);
        state.records = records;
        debug!(records = count, last_id = state.id_count, "Store loaded");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records in creation order, rendered with alias names.
    pub fn list(&self) -> Vec<Fields> {
        let state = self.state.lock();
        state.records.iter().map(|r| self.render(r)).collect()
    }

    pub fn get(&self, id: i64) -> Result<Fields, StoreError> {
        let state = self.state.lock();
        state
            .records
            .iter()
            .find(|r| r.id == id)
            .map(|r| self.render(r))
            .ok_or(StoreError::NotFound(id))
    }

    /// Insert a new record and assign it the next identifier.
    pub fn create(&self, raw: &[u8]) -> Result<Fields, StoreError> {
        let mut record = self.decode_payload(raw)?;

        let mut state = self.state.lock();
        state.id_count = state
            .id_count
            .checked_add(1)
            .ok_or(StoreError::IdExhausted)?;
        record.id = state.id_count;
        let rendered = self.render(&record);
        state.records.push(record);
        Ok(rendered)
    }

    /// Replace the whole record at `id`. Fields missing from the payload reset
    /// to their zero value; any `id` in the payload is ignored.
    pub fn update(&self, id: i64, raw: &[u8]) -> Result<Fields, StoreError> {
        let mut record = self.decode_payload(raw)?;
        record.id = id;

        let mut state = self.state.lock();
        let slot = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        *slot = record;
        Ok(self.render(slot))
    }

    /// Merge the supplied fields into the record at `id` and persist the result.
    ///
    /// Fields not present in the payload keep their stored values. The merged
    /// record is re-validated against the schema; on failure nothing changes.
    pub fn patch(&self, id: i64, raw: &[u8]) -> Result<Fields, StoreError> {
        let updates = self.parse_payload(raw)?;

        let mut state = self.state.lock();
        let slot = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let mut merged = slot.to_fields();
        merged.extend(updates);
        merged.insert(ID_FIELD.to_string(), Value::from(id));

        *slot = self.schema.decode(&merged)?;
        Ok(self.render(slot))
    }

    /// Remove the record at `id`, keeping the order of the rest.
    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let index = state
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        state.records.remove(index);
        Ok(())
    }

    /// Parse a request body as a JSON object and translate alias keys.
    fn parse_payload(&self, raw: &[u8]) -> Result<Fields, StoreError> {
        let value: Value = serde_json::from_slice(raw).map_err(StoreError::decode)?;
        match value {
            Value::Object(object) => Ok(self.aliases.normalize(object)),
            _ => Err(StoreError::Decode(
                "cannot normalize JSON: expected an object".to_string(),
            )),
        }
    }

    fn decode_payload(&self, raw: &[u8]) -> Result<Record, StoreError> {
        let object = self.parse_payload(raw)?;
        self.schema.decode(&object)
    }

    fn render(&self, record: &Record) -> Fields {
        self.aliases.alias(record.to_fields())
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(Schema::default())
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("fields", &self.schema.fields().len())
            .field("aliases", &self.aliases.len())
            .field("records", &self.len())
            .finish()
    }
}
