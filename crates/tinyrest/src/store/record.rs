//! Record schema and typed records.
//!
//! A [`Schema`] is an explicit, ordered list of `(name, kind)` pairs. It drives
//! decoding of incoming JSON objects into [`Record`]s: known fields are
//! type-checked, missing or `null` fields take the zero value of their kind,
//! and unknown fields are dropped.

use super::types::{Fields, SchemaError, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Internal name of the identifier field present on every record.
pub const ID_FIELD: &str = "id";

/// Value type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
}

impl FieldKind {
    /// Value stored when the field is absent from a payload.
    pub fn zero_value(self) -> Value {
        match self {
            FieldKind::String => Value::String(String::new()),
            FieldKind::Integer => Value::from(0i64),
            FieldKind::Float => Value::from(0.0f64),
            FieldKind::Boolean => Value::Bool(false),
        }
    }

    fn coerce(self, field: &str, value: &Value) -> Result<Value, StoreError> {
        let coerced = match (self, value) {
            (_, Value::Null) => Some(self.zero_value()),
            (FieldKind::String, Value::String(_)) | (FieldKind::Boolean, Value::Bool(_)) => {
                Some(value.clone())
            }
            (FieldKind::Integer, Value::Number(n)) => n.as_i64().map(Value::from),
            (FieldKind::Float, Value::Number(n)) => n.as_f64().map(Value::from),
            _ => None,
        };
        coerced.ok_or_else(|| {
            StoreError::Decode(format!(
                "cannot decode {} into field '{}' of type {}",
                describe(value),
                field,
                self.as_str()
            ))
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One attribute of the record schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered attribute list shared by every record of a store.
///
/// The `id` field is implicit and always an integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDef>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if field.name == ID_FIELD {
                return Err(SchemaError::Reserved(field.name.clone()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::Duplicate(field.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Whether `name` is `id` or one of the declared attributes.
    pub fn contains(&self, name: &str) -> bool {
        name == ID_FIELD || self.fields.iter().any(|f| f.name == name)
    }

    /// Decode an object keyed by internal names into a record.
    pub fn decode(&self, object: &Fields) -> Result<Record, StoreError> {
        let id = match object.get(ID_FIELD) {
            None => 0,
            Some(value) => FieldKind::Integer
                .coerce(ID_FIELD, value)?
                .as_i64()
                .unwrap_or_default(),
        };

        let mut fields = Fields::new();
        for def in &self.fields {
            let value = match object.get(&def.name) {
                Some(value) => def.kind.coerce(&def.name, value)?,
                None => def.kind.zero_value(),
            };
            fields.insert(def.name.clone(), value);
        }

        Ok(Record { id, fields })
    }
}

impl Default for Schema {
    /// The stock contact/product record every endpoint uses unless configured otherwise.
    fn default() -> Self {
        use FieldKind::*;
        let fields = [
            ("name", String),
            ("surname", String),
            ("age", Integer),
            ("phone", String),
            ("country_code_2", String),
            ("country_code_3", String),
            ("country_name", String),
            ("address", String),
            ("zipcode4", Integer),
            ("zipcode5", Integer),
            ("city", String),
            ("province", String),
            ("email", String),
            ("url", String),
            ("check1", Boolean),
            ("check2", Boolean),
            ("ean", String),
            ("isnb", String),
            ("price99", Float),
            ("price999", Float),
            ("text60", String),
            ("text256", String),
            ("comment", String),
        ]
        .into_iter()
        .map(|(name, kind)| FieldDef::new(name, kind))
        .collect();
        Self { fields }
    }
}

/// A decoded record. `fields` holds exactly the schema attributes, keyed by internal name.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: i64,
    fields: Fields,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        if field == ID_FIELD {
            return None;
        }
        self.fields.get(field)
    }

    /// Full internal representation, including `id`.
    pub fn to_fields(&self) -> Fields {
        let mut map = self.fields.clone();
        map.insert(ID_FIELD.to_string(), Value::from(self.id));
        map
    }
}
