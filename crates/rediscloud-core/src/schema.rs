//! Schema value layer
//!
//! The host runtime hands resource attributes around dynamically typed. This
//! module models them as a tagged variant with typed accessors, so "absent"
//! and "explicitly zero" stay distinguishable, and wraps desired
//! configuration plus stored state in a [`ResourceData`] handle with change
//! tracking.

use std::collections::BTreeMap;

/// One attribute value
#[derive(Debug, Clone)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Ordered collection; API order is preserved on read.
    List(Vec<AttrValue>),
    /// Unordered collection; compared order-insensitively.
    Set(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
    Null,
}

impl AttrValue {
    pub fn str(value: impl Into<String>) -> Self {
        AttrValue::Str(value.into())
    }

    pub fn str_list(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        AttrValue::List(values.into_iter().map(AttrValue::str).collect())
    }

    pub fn str_set(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        AttrValue::Set(values.into_iter().map(AttrValue::str).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// "Zero" in the host's sense: empty string, 0, false, empty collection.
    pub fn is_zero(&self) -> bool {
        match self {
            AttrValue::Str(s) => s.is_empty(),
            AttrValue::Int(n) => *n == 0,
            AttrValue::Float(f) => *f == 0.0,
            AttrValue::Bool(b) => !*b,
            AttrValue::List(items) | AttrValue::Set(items) => items.is_empty(),
            AttrValue::Map(map) => map.is_empty(),
            AttrValue::Null => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(f) => Some(*f),
            AttrValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_items(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) | AttrValue::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            AttrValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Collection of strings, for list/set attributes of plain strings.
    pub fn as_str_items(&self) -> Option<Vec<String>> {
        self.as_items().map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
    }
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Str(a), AttrValue::Str(b)) => a == b,
            (AttrValue::Int(a), AttrValue::Int(b)) => a == b,
            (AttrValue::Float(a), AttrValue::Float(b)) => a == b,
            (AttrValue::Bool(a), AttrValue::Bool(b)) => a == b,
            (AttrValue::List(a), AttrValue::List(b)) => a == b,
            // Sets compare as multisets.
            (AttrValue::Set(a), AttrValue::Set(b)) => {
                a.len() == b.len() && {
                    let mut unmatched: Vec<&AttrValue> = b.iter().collect();
                    a.iter().all(|item| {
                        match unmatched.iter().position(|candidate| *candidate == item) {
                            Some(index) => {
                                unmatched.swap_remove(index);
                                true
                            }
                            None => false,
                        }
                    })
                }
            }
            (AttrValue::Map(a), AttrValue::Map(b)) => a == b,
            (AttrValue::Null, AttrValue::Null) => true,
            _ => false,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

/// Attribute map alias used throughout the controllers
pub type AttrMap = BTreeMap<String, AttrValue>;

/// Handle over one resource instance's desired configuration and stored state
///
/// Controllers read desired values through the typed getters, write observed
/// and computed values back with [`set`](Self::set), and consult
/// [`has_change`](Self::has_change) to decide which attribute groups an
/// Update must push.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: String,
    config: AttrMap,
    state: AttrMap,
}

impl ResourceData {
    /// A fresh instance about to be created: desired config, no state.
    pub fn new(config: AttrMap) -> Self {
        Self {
            id: String::new(),
            config,
            state: AttrMap::new(),
        }
    }

    /// An existing instance: desired config diffed against stored state.
    pub fn with_state(id: impl Into<String>, config: AttrMap, state: AttrMap) -> Self {
        Self {
            id: id.into(),
            config,
            state,
        }
    }

    /// Import shape: an id and nothing else; Read fills the rest.
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            config: AttrMap::new(),
            state: AttrMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Clear the id, signalling the host to drop the resource from state.
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    /// Desired value if configured, else the stored value.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.config
            .get(key)
            .or_else(|| self.state.get(key))
            .filter(|v| !v.is_null())
    }

    /// Present and non-zero, mirroring the host's GetOk contract.
    pub fn get_ok(&self, key: &str) -> Option<&AttrValue> {
        self.get(key).filter(|v| !v.is_zero())
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str()).map(str::to_string)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(AttrValue::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(AttrValue::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(AttrValue::as_bool)
    }

    pub fn get_items(&self, key: &str) -> Option<Vec<AttrValue>> {
        self.get(key).and_then(|v| v.as_items().map(|items| items.to_vec()))
    }

    pub fn get_str_items(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).and_then(AttrValue::as_str_items)
    }

    pub fn get_str_map(&self, key: &str) -> Option<BTreeMap<String, String>> {
        self.get(key).and_then(AttrValue::as_map).map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
    }

    /// Stored (pre-change) value, ignoring desired configuration.
    pub fn get_stored(&self, key: &str) -> Option<&AttrValue> {
        self.state.get(key).filter(|v| !v.is_null())
    }

    /// Whether the desired value differs from the stored one.
    ///
    /// An attribute absent from config is unmanaged and never counts as
    /// changed.
    pub fn has_change(&self, key: &str) -> bool {
        match self.config.get(key) {
            None => false,
            Some(desired) => match self.state.get(key) {
                None => !desired.is_null(),
                Some(stored) => desired != stored,
            },
        }
    }

    /// Old and new values of a changed attribute.
    pub fn get_change(&self, key: &str) -> (Option<&AttrValue>, Option<&AttrValue>) {
        (self.state.get(key), self.config.get(key))
    }

    /// Record an observed or computed value into state.
    pub fn set(&mut self, key: impl Into<String>, value: AttrValue) {
        self.state.insert(key.into(), value);
    }

    /// Explicitly null an attribute so it cannot produce spurious drift.
    pub fn set_null(&mut self, key: impl Into<String>) {
        self.state.insert(key.into(), AttrValue::Null);
    }

    /// Final state handed back to the host after an operation.
    pub fn state(&self) -> &AttrMap {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> ResourceData {
        let mut config = AttrMap::new();
        config.insert("name".to_string(), AttrValue::str("db1"));
        config.insert("memory_limit_in_gb".to_string(), AttrValue::Float(3.0));
        config.insert("replication".to_string(), AttrValue::Bool(false));
        let mut state = AttrMap::new();
        state.insert("name".to_string(), AttrValue::str("db1"));
        state.insert("memory_limit_in_gb".to_string(), AttrValue::Float(1.0));
        state.insert("password".to_string(), AttrValue::str("stored-pw"));
        ResourceData::with_state("1/2", config, state)
    }

    #[test]
    fn get_prefers_config_and_falls_back_to_state() {
        let data = data();
        assert_eq!(data.get_f64("memory_limit_in_gb"), Some(3.0));
        assert_eq!(data.get_str("password").as_deref(), Some("stored-pw"));
        assert_eq!(data.get("missing"), None);
    }

    #[test]
    fn has_change_tracks_config_against_state() {
        let data = data();
        assert!(data.has_change("memory_limit_in_gb"));
        assert!(!data.has_change("name"));
        // unmanaged attribute never changes
        assert!(!data.has_change("password"));
    }

    #[test]
    fn get_ok_filters_zero_values() {
        let data = data();
        assert!(data.get_ok("replication").is_none());
        assert!(data.get_ok("name").is_some());
    }

    #[test]
    fn set_eq_is_order_insensitive() {
        let a = AttrValue::str_set(["10.0.0.0/8", "192.168.0.0/16"]);
        let b = AttrValue::str_set(["192.168.0.0/16", "10.0.0.0/8"]);
        assert_eq!(a, b);

        let c = AttrValue::str_set(["10.0.0.0/8", "10.0.0.0/8"]);
        let d = AttrValue::str_set(["10.0.0.0/8", "192.168.0.0/16"]);
        assert_ne!(c, d);
    }

    #[test]
    fn list_eq_is_order_sensitive() {
        let a = AttrValue::str_list(["a", "b"]);
        let b = AttrValue::str_list(["b", "a"]);
        assert_ne!(a, b);
    }

    #[test]
    fn null_state_hides_attribute() {
        let mut data = data();
        data.set_null("password");
        assert_eq!(data.get("password"), None);
    }
}
