//! Bidirectional string keys for model objects.

use std::collections::HashMap;
use std::hash::Hash;

/// Maps objects to unique string keys and back.
///
/// A key is derived from a label; when the label is already taken by another
/// object the key becomes `label_2`, `label_3`, and so on.
#[derive(Debug, Clone)]
pub struct Mapper<T> {
    key_to_object: HashMap<String, T>,
    object_to_key: HashMap<T, String>,
    keys: Vec<String>,
}

impl<T> Default for Mapper<T> {
    fn default() -> Self {
        Self {
            key_to_object: HashMap::new(),
            object_to_key: HashMap::new(),
            keys: Vec::new(),
        }
    }
}

impl<T: Copy + Eq + Hash> Mapper<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The key for `object`, registering it under `label` if it is new.
    pub fn key(&mut self, object: T, label: &str) -> String {
        if let Some(key) = self.object_to_key.get(&object) {
            return key.clone();
        }

        let mut key = label.to_string();
        if self.key_to_object.contains_key(&key) {
            let mut suffix = 2;
            while self.key_to_object.contains_key(&format!("{}_{}", label, suffix)) {
                suffix += 1;
            }
            key = format!("{}_{}", label, suffix);
        }

        self.key_to_object.insert(key.clone(), object);
        self.object_to_key.insert(object, key.clone());
        self.keys.push(key.clone());
        key
    }

    pub fn obj(&self, key: &str) -> Option<T> {
        self.key_to_object.get(key).copied()
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
