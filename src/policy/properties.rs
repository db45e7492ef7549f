// ABOUTME: Read-only access to system properties such as the emergency number list
// ABOUTME: Values are looked up on every use so a changed property takes effect on the next send

use std::collections::HashMap;
use std::sync::RwLock;

/// Property naming the comma separated emergency number list
pub const ECC_LIST_PROPERTY: &str = "ril.ecclist";

/// Source of system properties
pub trait PropertySource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// In-memory properties that can be changed at runtime
#[derive(Debug, Default)]
pub struct MapProperties {
    values: RwLock<HashMap<String, String>>,
}

impl MapProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
    }
}

impl PropertySource for MapProperties {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }
}

/// Properties read from the process environment
///
/// Dots become underscores and letters are upper-cased, so `ril.ecclist`
/// is read from `RIL_ECCLIST`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvProperties;

impl EnvProperties {
    pub fn variable_name(key: &str) -> String {
        key.replace('.', "_").to_ascii_uppercase()
    }
}

impl PropertySource for EnvProperties {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(Self::variable_name(key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_properties_update_in_place() {
        let props = MapProperties::new().with(ECC_LIST_PROPERTY, "112");
        assert_eq!(props.get(ECC_LIST_PROPERTY).as_deref(), Some("112"));

        props.set(ECC_LIST_PROPERTY, "112,999");
        assert_eq!(props.get(ECC_LIST_PROPERTY).as_deref(), Some("112,999"));

        props.remove(ECC_LIST_PROPERTY);
        assert_eq!(props.get(ECC_LIST_PROPERTY), None);
    }

    #[test]
    fn env_variable_names() {
        assert_eq!(EnvProperties::variable_name(ECC_LIST_PROPERTY), "RIL_ECCLIST");
    }
}
