//! The hash value type.
//!
//! Buckets are keyed by the 64-bit hash of the key and hold a small vector of
//! (key, value) pairs to absorb collisions; lookup compares keys structurally
//! within the bucket. The outer map preserves insertion order, which makes
//! printing deterministic within a run — iteration order is otherwise not
//! part of the language.

use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::heap::Heap;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct MonkeyHash {
    map: IndexMap<u64, Vec<(Value, Value)>>,
}

impl MonkeyHash {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Inserts a pair, taking ownership of both values. A duplicate key
    /// replaces the existing pair, releasing the old one. On an unhashable
    /// key both arguments are released before the error is returned, so the
    /// caller never holds dangling ownership.
    pub fn insert(&mut self, key: Value, value: Value, heap: &mut Heap) -> Result<(), RuntimeError> {
        let Some(hash) = heap.hash_key(&key) else {
            let err = RuntimeError::UnhashableKey(key.type_name(heap));
            key.drop_with_heap(heap);
            value.drop_with_heap(heap);
            return Err(err);
        };

        let bucket = self.map.entry(hash).or_default();
        for pair in bucket.iter_mut() {
            if pair.0.equals(&key, heap) {
                let (old_key, old_value) = std::mem::replace(pair, (key, value));
                old_key.drop_with_heap(heap);
                old_value.drop_with_heap(heap);
                return Ok(());
            }
        }
        bucket.push((key, value));
        Ok(())
    }

    /// Looks up `key`, comparing structurally. Absence is `Ok(None)`; an
    /// unhashable key is an error.
    pub fn get(&self, key: &Value, heap: &Heap) -> Result<Option<&Value>, RuntimeError> {
        let hash = heap
            .hash_key(key)
            .ok_or_else(|| RuntimeError::UnhashableKey(key.type_name(heap)))?;
        if let Some(bucket) = self.map.get(&hash) {
            for (k, v) in bucket {
                if k.equals(key, heap) {
                    return Ok(Some(v));
                }
            }
        }
        Ok(None)
    }

    /// Iterates pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.map.values().flatten()
    }

    /// Consumes the hash, releasing every pair it owns. Used when hash
    /// construction fails partway and the pairs must be handed back to the
    /// heap instead of becoming a live value.
    pub fn release(self, heap: &mut Heap) {
        for (key, value) in self.map.into_values().flatten() {
            key.drop_with_heap(heap);
            value.drop_with_heap(heap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapData;

    fn str_value(heap: &mut Heap, s: &str) -> Value {
        Value::Ref(heap.alloc(HeapData::Str(s.into())))
    }

    #[test]
    fn insert_and_get_by_structural_equality() {
        let mut heap = Heap::new();
        let mut hash = MonkeyHash::new();

        let key = str_value(&mut heap, "one");
        hash.insert(key, Value::Int(1), &mut heap).unwrap();
        hash.insert(Value::Int(2), Value::Int(4), &mut heap).unwrap();
        hash.insert(Value::Bool(true), Value::Int(5), &mut heap).unwrap();
        assert_eq!(hash.len(), 3);

        // a distinct but equal string finds the entry
        let probe = str_value(&mut heap, "one");
        assert!(matches!(hash.get(&probe, &heap).unwrap(), Some(Value::Int(1))));
        probe.drop_with_heap(&mut heap);

        let missing = str_value(&mut heap, "two");
        assert!(hash.get(&missing, &heap).unwrap().is_none());
        missing.drop_with_heap(&mut heap);

        assert!(matches!(hash.get(&Value::Int(2), &heap).unwrap(), Some(Value::Int(4))));
        assert!(matches!(hash.get(&Value::Bool(true), &heap).unwrap(), Some(Value::Int(5))));
    }

    #[test]
    fn duplicate_key_replaces_and_releases_old_pair() {
        let mut heap = Heap::new();
        let mut hash = MonkeyHash::new();

        let k1 = str_value(&mut heap, "key");
        let v1 = str_value(&mut heap, "old");
        hash.insert(k1, v1, &mut heap).unwrap();

        let k2 = str_value(&mut heap, "key");
        let v2 = str_value(&mut heap, "new");
        hash.insert(k2, v2, &mut heap).unwrap();

        assert_eq!(hash.len(), 1);
        // old key and value slots released; k2, v2 still live in the hash
        assert_eq!(heap.entry_count(), 2);

        let probe = str_value(&mut heap, "key");
        let got = hash.get(&probe, &heap).unwrap().cloned().unwrap();
        match got {
            Value::Ref(id) => assert_eq!(heap.str_value(id), "new"),
            other => panic!("expected string, got {other:?}"),
        }
        probe.drop_with_heap(&mut heap);
    }

    #[test]
    fn unhashable_key_is_rejected_and_released() {
        let mut heap = Heap::new();
        let mut hash = MonkeyHash::new();

        let key = Value::Ref(heap.alloc(HeapData::Array(Vec::new())));
        let value = str_value(&mut heap, "v");
        let err = hash.insert(key, value, &mut heap).unwrap_err();
        assert_eq!(err, RuntimeError::UnhashableKey("ARRAY"));
        assert_eq!(heap.entry_count(), 0);
    }
}
