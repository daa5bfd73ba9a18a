//! Synthetic parameter object
//!
//! Mapper expressions are written against a real application object that
//! does not exist at validation time. [`SampleParams`] stands in for it: any
//! key that is looked up and not present is inserted as the integer
//! sentinel `1`, so conditions like `x != null` hold and the guarded
//! fragment is included.

use indexmap::IndexMap;
use minijinja::Value;
use minijinja::value::{Enumerator, Object, ObjectRepr};
use parking_lot::Mutex;
use std::sync::Arc;

/// Value every unknown leaf resolves to
pub const SENTINEL: i64 = 1;

/// An entry in the synthetic parameter map
#[derive(Debug, Clone)]
pub enum SampleValue {
    Sentinel,
    Nested(Arc<SampleParams>),
}

impl SampleValue {
    pub fn to_value(&self) -> Value {
        match self {
            SampleValue::Sentinel => Value::from(SENTINEL),
            SampleValue::Nested(inner) => Value::from_dyn_object(inner.clone()),
        }
    }
}

/// Map that never reports a missing key
#[derive(Debug, Default)]
pub struct SampleParams {
    entries: Mutex<IndexMap<String, SampleValue>>,
}

impl SampleParams {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Build nested maps from dotted paths. `a.b.c` yields `a -> b -> c`,
    /// with `c` a sentinel leaf.
    pub fn from_paths<I, S>(paths: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let params = Self::new();
        for path in paths {
            params.insert_path(path.as_ref());
        }
        params
    }

    fn insert_path(&self, path: &str) {
        let mut segments = path.split('.').filter(|s| !s.is_empty());
        let Some(first) = segments.next() else {
            return;
        };
        let rest: Vec<&str> = segments.collect();

        if rest.is_empty() {
            self.entries
                .lock()
                .entry(first.to_string())
                .or_insert(SampleValue::Sentinel);
            return;
        }

        let child = {
            let mut entries = self.entries.lock();
            let slot = entries
                .entry(first.to_string())
                .or_insert(SampleValue::Sentinel);
            match slot {
                SampleValue::Nested(child) => child.clone(),
                SampleValue::Sentinel => {
                    let child = Self::new();
                    *slot = SampleValue::Nested(child.clone());
                    child
                }
            }
        };
        child.insert_path(&rest.join("."));
    }

    /// Look up a key, inserting the sentinel when it is missing.
    pub fn get(&self, key: &str) -> SampleValue {
        self.entries
            .lock()
            .entry(key.to_string())
            .or_insert(SampleValue::Sentinel)
            .clone()
    }

    pub fn put(&self, key: impl Into<String>, value: SampleValue) {
        self.entries.lock().insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Number of entries, never less than one
    pub fn len(&self) -> usize {
        self.entries.lock().len().max(1)
    }

    /// Always false; the object must look populated to size and emptiness checks.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

impl Object for SampleParams {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Map
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str() {
            Some(name) => Some(self.get(name).to_value()),
            None => Some(Value::from(SENTINEL)),
        }
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Values(self.keys().into_iter().map(Value::from).collect())
    }

    fn enumerator_len(self: &Arc<Self>) -> Option<usize> {
        Some(self.len())
    }

    fn is_true(self: &Arc<Self>) -> bool {
        true
    }
}
