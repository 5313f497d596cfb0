//! Per-filter mutable state.
//!
//! Each filter owns one `FilterState`. Payload generators use it to keep
//! counters, session tokens or sequencing cursors across invocations, and the
//! test that registered the filter can read or seed it.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// String-keyed store of opaque values owned by a single filter.
///
/// Every operation takes the internal lock once, so `increment` is atomic
/// with respect to concurrent invocations of the same filter. Sequences of
/// separate calls are not.
#[derive(Debug, Default)]
pub struct FilterState {
    data: Mutex<HashMap<String, Value>>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the value stored under `key`
    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.lock().get(key).cloned()
    }

    /// Store `value` under `key`, returning the previous value
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.lock().insert(key.into(), value.into())
    }

    pub fn exists(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Remove `key`, returning the value it held
    pub fn delete(&self, key: &str) -> Option<Value> {
        self.data.lock().remove(key)
    }

    /// Increment an integer value and return the new value.
    ///
    /// A missing or non-integer value is treated as 0.
    pub fn increment(&self, key: &str) -> i64 {
        let mut data = self.data.lock();

        let new_value = match data.get(key).and_then(Value::as_i64) {
            Some(n) => n.saturating_add(1),
            None => 1,
        };

        data.insert(key.to_string(), Value::from(new_value));
        new_value
    }

    /// Run `f` with exclusive access to the whole map.
    ///
    /// For read-modify-write sequences spanning several keys.
    pub fn update<R>(&self, f: impl FnOnce(&mut HashMap<String, Value>) -> R) -> R {
        let mut data = self.data.lock();
        f(&mut data)
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    pub fn clear(&self) {
        self.data.lock().clear();
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.data.lock().clone()
    }
}
