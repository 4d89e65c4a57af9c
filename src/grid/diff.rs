//! Reconciles an in-memory record set against its last-persisted snapshot.

use rusqlite::types::Value;
use std::collections::{HashMap, HashSet};

use super::Record;

#[derive(Debug, Clone)]
pub enum Change<R> {
    /// `index` is the row's position in the current set.
    Insert { index: usize, row: R },
    /// `columns` indexes into `R::COLUMNS`; only those are written.
    Update { row: R, columns: Vec<usize> },
    Delete { id: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Changes needed to turn `snapshot` into `current`, ordered deletes,
/// updates, inserts. Rows equal to their snapshot emit nothing.
pub fn diff<R: Record>(snapshot: &[R], current: &[R]) -> Vec<Change<R>> {
    let before: HashMap<i64, Vec<Value>> = snapshot
        .iter()
        .filter_map(|r| r.identity().map(|id| (id, r.values())))
        .collect();

    let mut kept: HashSet<i64> = HashSet::new();
    let mut updates = Vec::new();
    let mut inserts = Vec::new();

    for (index, row) in current.iter().enumerate() {
        let Some(id) = row.identity() else {
            inserts.push(Change::Insert {
                index,
                row: row.clone(),
            });
            continue;
        };
        kept.insert(id);

        let now = row.values();
        let columns: Vec<usize> = match before.get(&id) {
            Some(old) => (0..now.len()).filter(|&i| old.get(i) != now.get(i)).collect(),
            // Persisted but absent from the snapshot: write every column.
            None => (0..now.len()).collect(),
        };
        if !columns.is_empty() {
            updates.push(Change::Update {
                row: row.clone(),
                columns,
            });
        }
    }

    let mut changes: Vec<Change<R>> = snapshot
        .iter()
        .filter_map(|r| r.identity())
        .filter(|id| !kept.contains(id))
        .map(|id| Change::Delete { id })
        .collect();
    changes.extend(updates);
    changes.extend(inserts);
    changes
}

impl<R: Record> Change<R> {
    pub fn statement(&self) -> Statement {
        match self {
            Change::Insert { row, .. } => {
                let cols = R::COLUMNS.iter().map(|c| c.sql).collect::<Vec<_>>();
                let placeholders = std::iter::repeat("?")
                    .take(cols.len())
                    .collect::<Vec<_>>()
                    .join(", ");
                Statement {
                    sql: format!(
                        "INSERT INTO {}({}) VALUES({})",
                        R::TABLE,
                        cols.join(", "),
                        placeholders
                    ),
                    params: row.values(),
                }
            }
            Change::Update { row, columns } => {
                let values = row.values();
                let set_parts = columns
                    .iter()
                    .map(|&i| format!("{} = ?", R::COLUMNS[i].sql))
                    .collect::<Vec<_>>();
                let mut params: Vec<Value> = columns.iter().map(|&i| values[i].clone()).collect();
                params.push(Value::Integer(row.identity().unwrap_or_default()));
                Statement {
                    sql: format!(
                        "UPDATE {} SET {} WHERE {} = ?",
                        R::TABLE,
                        set_parts.join(", "),
                        R::IDENTITY
                    ),
                    params,
                }
            }
            Change::Delete { id } => Statement {
                sql: format!("DELETE FROM {} WHERE {} = ?", R::TABLE, R::IDENTITY),
                params: vec![Value::Integer(*id)],
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Change::Insert { .. } => "insert",
            Change::Update { .. } => "update",
            Change::Delete { .. } => "delete",
        }
    }
}
