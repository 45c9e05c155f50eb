//! Records delivered to sync callers
//!
//! A record is a plain key-value document tagged with the identifier the
//! store assigned to it. When serialized, the identifier appears under the
//! reserved `id` key alongside the document fields.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Reserved key carrying the store-assigned identifier
pub const ID_FIELD: &str = "id";

/// A document from a collection, annotated with its identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Store-assigned identifier
    pub id: String,
    /// Document fields (never contains the reserved `id` key)
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a record, dropping any `id` key from the fields
    pub fn new(id: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        fields.remove(ID_FIELD);
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build a record from a JSON object
    ///
    /// Returns `None` if the value is not an object.
    pub fn from_value(id: impl Into<String>, value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::new(id, fields)),
            _ => None,
        }
    }

    /// Look up a field, resolving `id` to the record identifier
    pub fn get(&self, field: &str) -> Option<Value> {
        if field == ID_FIELD {
            return Some(Value::String(self.id.clone()));
        }
        self.fields.get(field).cloned()
    }

    /// Borrow a data field (the identifier is not a data field)
    pub fn field(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Flatten into a JSON object with the identifier under `id`
    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        object.insert(ID_FIELD.to_string(), Value::String(self.id.clone()));
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = Map::deserialize(deserializer)?;
        let id = match fields.remove(ID_FIELD) {
            Some(Value::String(id)) => id,
            Some(other) => other.to_string(),
            None => return Err(serde::de::Error::missing_field(ID_FIELD)),
        };
        Ok(Self { id, fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_new_drops_reserved_id() {
        let record = Record::new("doc-1", fields(json!({"id": "spoofed", "amount": 12})));
        assert_eq!(record.id, "doc-1");
        assert!(record.field("id").is_none());
        assert_eq!(record.get("id"), Some(json!("doc-1")));
        assert_eq!(record.get("amount"), Some(json!(12)));
    }

    #[test]
    fn test_serializes_flat_with_id() {
        let record = Record::new("e1", fields(json!({"vendor": "Shell", "amount": 40.5})));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value, json!({"id": "e1", "vendor": "Shell", "amount": 40.5}));
        assert_eq!(value, record.to_value());
    }

    #[test]
    fn test_deserialize_requires_id() {
        let parsed: Record = serde_json::from_value(json!({"id": "s1", "litres": 300})).unwrap();
        assert_eq!(parsed.id, "s1");
        assert_eq!(parsed.field("litres"), Some(&json!(300)));

        let missing = serde_json::from_value::<Record>(json!({"litres": 300}));
        assert!(missing.is_err());
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Record::from_value("x", json!([1, 2])).is_none());
        assert!(Record::from_value("x", json!({"a": 1})).is_some());
    }
}
