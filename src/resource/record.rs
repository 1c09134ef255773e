//! Typed access to loosely-shaped API records
//!
//! Records stay `serde_json::Value`; these helpers read dot-notation paths and
//! turn a missing or mistyped required field into a `ParameterError` naming it.

use super::registry::ResourceType;
use crate::error::CliError;
use serde_json::Value;

/// Follow a dot-notation path; `null` counts as absent
pub fn lookup<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = item;
    for part in path.split('.') {
        current = match part.parse::<usize>() {
            Ok(idx) => current.get(idx)?,
            Err(_) => current.get(part)?,
        };
    }
    (!current.is_null()).then_some(current)
}

/// A borrowed record of a known resource type
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    kind: ResourceType,
    value: &'a Value,
}

impl<'a> Record<'a> {
    pub fn new(kind: ResourceType, value: &'a Value) -> Self {
        Self { kind, value }
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    fn missing(&self, path: &str) -> CliError {
        CliError::parameter(format!("{} record missing field {}", self.kind, path))
    }

    fn mistyped(&self, path: &str, expected: &str) -> CliError {
        CliError::parameter(format!(
            "{} record field {} is not {}",
            self.kind, path, expected
        ))
    }

    pub fn get(&self, path: &str) -> Option<&'a Value> {
        lookup(self.value, path)
    }

    /// The record's uuid
    pub fn uuid(&self) -> Result<&'a str, CliError> {
        self.str_field("uuid")
    }

    /// Display name, if the type has one and it is non-empty
    pub fn name(&self) -> Option<&'a str> {
        self.kind
            .name_path()
            .and_then(|path| self.opt_str(path))
            .filter(|name| !name.is_empty())
    }

    pub fn str_field(&self, path: &str) -> Result<&'a str, CliError> {
        self.get(path)
            .ok_or_else(|| self.missing(path))?
            .as_str()
            .ok_or_else(|| self.mistyped(path, "a string"))
    }

    pub fn opt_str(&self, path: &str) -> Option<&'a str> {
        self.get(path).and_then(|v| v.as_str())
    }

    /// Numeric field; numeric strings are accepted
    pub fn f64_field(&self, path: &str) -> Result<f64, CliError> {
        let value = self.get(path).ok_or_else(|| self.missing(path))?;
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| self.mistyped(path, "a number"))
    }

    pub fn u64_field(&self, path: &str) -> Result<u64, CliError> {
        let value = self.f64_field(path)?;
        if value < 0.0 || value.fract() != 0.0 {
            return Err(self.mistyped(path, "a whole number"));
        }
        Ok(value as u64)
    }

    /// Boolean field; absent means false
    pub fn flag(&self, path: &str) -> Result<bool, CliError> {
        match self.get(path) {
            None => Ok(false),
            Some(v) => v.as_bool().ok_or_else(|| self.mistyped(path, "a boolean")),
        }
    }

    /// List field; absent means empty
    pub fn list(&self, path: &str) -> Result<&'a [Value], CliError> {
        match self.get(path) {
            None => Ok(&[]),
            Some(v) => v
                .as_array()
                .map(|items| items.as_slice())
                .ok_or_else(|| self.mistyped(path, "a list")),
        }
    }

    /// Whether a lookup query names this record
    pub fn matches(&self, query: &str) -> bool {
        self.opt_str("uuid") == Some(query)
            || self.opt_str("name") == Some(query)
            || self.name() == Some(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_paths() {
        let item = json!({
            "meta": {"name": "office", "description": null},
            "nics": [{"mac": "22:aa"}]
        });
        assert_eq!(lookup(&item, "meta.name"), Some(&json!("office")));
        assert_eq!(lookup(&item, "nics.0.mac"), Some(&json!("22:aa")));
        assert_eq!(lookup(&item, "meta.description"), None);
        assert_eq!(lookup(&item, "meta.missing.deeper"), None);
    }

    #[test]
    fn test_missing_field_names_the_path() {
        let item = json!({"name": "web"});
        let record = Record::new(ResourceType::Server, &item);
        let err = record.uuid().unwrap_err();
        assert_eq!(err.to_string(), "server record missing field uuid");
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let item = json!({"cpu": "2000", "smp": 2, "mem": 1.5});
        let record = Record::new(ResourceType::Server, &item);
        assert_eq!(record.f64_field("cpu").unwrap(), 2000.0);
        assert_eq!(record.u64_field("smp").unwrap(), 2);
        assert!(record.u64_field("mem").is_err());
    }

    #[test]
    fn test_name_uses_type_path() {
        let vlan = json!({"uuid": "v-1", "meta": {"name": "backplane"}});
        assert_eq!(Record::new(ResourceType::Vlan, &vlan).name(), Some("backplane"));

        let unnamed = json!({"uuid": "d-1", "name": ""});
        assert_eq!(Record::new(ResourceType::Drive, &unnamed).name(), None);
    }

    #[test]
    fn test_matches_uuid_or_name() {
        let ip = json!({"uuid": "185.12.5.1", "meta": {"name": "front"}});
        let record = Record::new(ResourceType::Ip, &ip);
        assert!(record.matches("185.12.5.1"));
        assert!(record.matches("front"));
        assert!(!record.matches("back"));
    }
}
