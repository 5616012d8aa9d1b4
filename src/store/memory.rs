use std::cmp::Ordering;
use std::collections::HashMap;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;

use super::{Direction, IndexSpec, PutOutcome, StoreError, StreamEventKind, StreamRecord, UpdateFn};

struct Table {
    rows: DashMap<String, Value>,
    indexes: Vec<IndexSpec>,
    stream: broadcast::Sender<StreamRecord>,
}

/// In-process Store implementation backed by `dashmap` + a broadcast channel
/// per table for the change-stream contract. An in-process stand-in for
/// whatever networked KV store a deployed instance would use.
pub struct MemoryStore {
    tables: HashMap<String, Table>,
    // atomic_update is the only operation needing cross-row exclusivity
    // beyond what DashMap's per-key locking gives us (the update closure
    // reads-then-writes); one mutex per table keeps that window safe.
    update_locks: HashMap<String, Mutex<()>>,
}

impl MemoryStore {
    pub fn new(tables: impl IntoIterator<Item = (&'static str, Vec<IndexSpec>)>) -> Self {
        let mut map = HashMap::new();
        let mut locks = HashMap::new();
        for (name, indexes) in tables {
            let (tx, _rx) = broadcast::channel(1024);
            map.insert(
                name.to_string(),
                Table {
                    rows: DashMap::new(),
                    indexes,
                    stream: tx,
                },
            );
            locks.insert(name.to_string(), Mutex::new(()));
        }
        Self {
            tables: map,
            update_locks: locks,
        }
    }

    fn table(&self, name: &str) -> Result<&Table, StoreError> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }

    fn publish(&self, table: &str, t: &Table, kind: StreamEventKind, new: Option<Value>, old: Option<Value>) {
        // A stream with no subscribers yet returns Err(SendError); that's
        // fine, at-least-once delivery only promises delivery to whoever is
        // listening when the record is emitted.
        let _ = t.stream.send(StreamRecord {
            table: table.to_string(),
            kind,
            new_image: new,
            old_image: old,
        });
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

impl super::Store for MemoryStore {
    fn put_if_absent(&self, table: &str, key: &str, item: Value) -> Result<PutOutcome, StoreError> {
        let t = self.table(table)?;
        match t.rows.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(PutOutcome::Conflict),
            dashmap::mapref::entry::Entry::Vacant(v) => {
                v.insert(item.clone());
                self.publish(table, t, StreamEventKind::Insert, Some(item), None);
                Ok(PutOutcome::Inserted)
            }
        }
    }

    fn get(&self, table: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let t = self.table(table)?;
        Ok(t.rows.get(key).map(|r| r.value().clone()))
    }

    fn delete_returning_old(&self, table: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let t = self.table(table)?;
        let old = t.rows.remove(key).map(|(_, v)| v);
        if let Some(old) = &old {
            self.publish(table, t, StreamEventKind::Remove, None, Some(old.clone()));
        }
        Ok(old)
    }

    fn atomic_update(&self, table: &str, key: &str, update: UpdateFn) -> Result<Value, StoreError> {
        let t = self.table(table)?;
        let lock = self
            .update_locks
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        let _guard = lock.lock();
        let old = t.rows.get(key).map(|r| r.value().clone());
        let new = update(old.clone());
        t.rows.insert(key.to_string(), new.clone());
        let kind = if old.is_some() {
            StreamEventKind::Modify
        } else {
            StreamEventKind::Insert
        };
        self.publish(table, t, kind, Some(new.clone()), old);
        Ok(new)
    }

    fn query_index(
        &self,
        table: &str,
        index: &str,
        partition_value: &str,
        limit: usize,
        direction: Direction,
    ) -> Result<Vec<Value>, StoreError> {
        let t = self.table(table)?;
        let spec = t
            .indexes
            .iter()
            .find(|i| i.name == index)
            .ok_or_else(|| StoreError::UnknownIndex(index.to_string(), table.to_string()))?;

        let mut matched: Vec<Value> = t
            .rows
            .iter()
            .filter(|r| {
                r.value()
                    .get(spec.partition_field)
                    .and_then(Value::as_str)
                    .map(|v| v == partition_value)
                    .unwrap_or(false)
            })
            .map(|r| r.value().clone())
            .collect();

        matched.sort_by(|a, b| {
            let ord = compare_values(
                a.get(spec.sort_field).unwrap_or(&Value::Null),
                b.get(spec.sort_field).unwrap_or(&Value::Null),
            );
            match direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        });
        matched.truncate(limit);
        Ok(matched)
    }

    fn subscribe(&self, table: &str) -> Result<broadcast::Receiver<StreamRecord>, StoreError> {
        let t = self.table(table)?;
        Ok(t.stream.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store as _;

    fn store() -> MemoryStore {
        MemoryStore::new(vec![(
            "widgets",
            vec![IndexSpec {
                name: "ByOwner",
                partition_field: "owner",
                sort_field: "rank",
            }],
        )])
    }

    #[test]
    fn put_if_absent_rejects_duplicate_key() {
        let s = store();
        let item = serde_json::json!({"owner": "a", "rank": 1});
        assert_eq!(s.put_if_absent("widgets", "k1", item.clone()).unwrap(), PutOutcome::Inserted);
        assert_eq!(s.put_if_absent("widgets", "k1", item).unwrap(), PutOutcome::Conflict);
    }

    #[test]
    fn query_index_orders_by_sort_field() {
        let s = store();
        for (k, rank) in [("k1", 3), ("k2", 1), ("k3", 2)] {
            s.put_if_absent("widgets", k, serde_json::json!({"owner": "a", "rank": rank}))
                .unwrap();
        }
        let asc = s
            .query_index("widgets", "ByOwner", "a", 10, Direction::Ascending)
            .unwrap();
        let ranks: Vec<i64> = asc.iter().map(|v| v["rank"].as_i64().unwrap()).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn atomic_update_is_visible_immediately() {
        let s = store();
        s.atomic_update(
            "widgets",
            "k1",
            Box::new(|_old| serde_json::json!({"owner": "a", "rank": 5})),
        )
        .unwrap();
        let got = s.get("widgets", "k1").unwrap().unwrap();
        assert_eq!(got["rank"], 5);
    }

    #[test]
    fn delete_returning_old_gives_back_the_removed_item() {
        let s = store();
        s.put_if_absent("widgets", "k1", serde_json::json!({"owner": "a", "rank": 1}))
            .unwrap();
        let old = s.delete_returning_old("widgets", "k1").unwrap().unwrap();
        assert_eq!(old["rank"], 1);
        assert!(s.get("widgets", "k1").unwrap().is_none());
    }
}
