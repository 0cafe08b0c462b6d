//! Structured patient lookup over a static JSON file.
//!
//! The file is a JSON array of objects, each carrying a `patient_id`. It is
//! read once into a [`PatientRegistry`] that callers own and pass around.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct PatientRegistry {
    records: Vec<Value>,
}

impl PatientRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read patient file: {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse patient file: {}", path.display()))?;
        match value {
            Value::Array(records) => Ok(Self::from_records(records)),
            _ => bail!("Patient file must contain a JSON array: {}", path.display()),
        }
    }

    pub fn from_records(records: Vec<Value>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The record whose `patient_id` equals `patient_id`, or
    /// `{"patient_id": .., "found": false}`.
    pub fn lookup(&self, patient_id: &str) -> Value {
        self.records
            .iter()
            .find(|r| r.get("patient_id").and_then(Value::as_str) == Some(patient_id))
            .cloned()
            .unwrap_or_else(|| json!({ "patient_id": patient_id, "found": false }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn registry() -> PatientRegistry {
        PatientRegistry::from_records(vec![
            json!({"patient_id": "PT-101", "age": 55, "smoking_history": "Current Smoker"}),
            json!({"patient_id": "PT-102", "age": 24}),
            json!("not an object"),
        ])
    }

    #[test]
    fn test_lookup_found() {
        let record = registry().lookup("PT-101");
        assert_eq!(record["age"], 55);
        assert!(record.get("found").is_none());
    }

    #[test]
    fn test_lookup_missing() {
        assert_eq!(
            registry().lookup("PT-999"),
            json!({"patient_id": "PT-999", "found": false})
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"patient_id": "PT-110", "age": 67}}]"#).unwrap();
        let registry = PatientRegistry::load(file.path()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("PT-110")["age"], 67);
    }

    #[test]
    fn test_load_rejects_non_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"patient_id": "PT-110"}}"#).unwrap();
        assert!(PatientRegistry::load(file.path()).is_err());
    }
}
