//! Single-table record grid: load a whole table, mutate the in-memory copy,
//! flush the difference back.

pub mod diff;
pub mod fields;

use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use diff::Change;
use fields::{Column, FieldReader, FieldValues};

/// A table row with a storage-assigned identity and a fixed column list.
pub trait Record: Clone + std::fmt::Debug + Serialize {
    const TABLE: &'static str;
    const IDENTITY: &'static str;
    const COLUMNS: &'static [Column];

    /// `None` until the row has been inserted.
    fn identity(&self) -> Option<i64>;
    fn set_identity(&mut self, id: i64);
    /// Builds an unsaved row from text fields.
    fn from_fields(fields: &FieldReader<'_>) -> AppResult<Self>;
    fn to_fields(&self) -> FieldValues;
    /// Column values in `COLUMNS` order.
    fn values(&self) -> Vec<rusqlite::types::Value>;
    /// Decodes `identity, COLUMNS...`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

pub struct RecordGrid<R: Record> {
    /// State as of the last successful flush or load.
    snapshot: Vec<R>,
    rows: Vec<R>,
}

impl<R: Record> RecordGrid<R> {
    pub fn empty() -> Self {
        RecordGrid {
            snapshot: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn load(conn: &Connection) -> AppResult<Self> {
        let cols = R::COLUMNS.iter().map(|c| c.sql).collect::<Vec<_>>();
        let sql = format!(
            "SELECT {}, {} FROM {} ORDER BY {}",
            R::IDENTITY,
            cols.join(", "),
            R::TABLE,
            R::IDENTITY
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| R::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(table = R::TABLE, rows = rows.len(), "record set loaded");
        Ok(RecordGrid {
            snapshot: rows.clone(),
            rows,
        })
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Changes the next flush would write.
    pub fn pending(&self) -> Vec<Change<R>> {
        diff::diff(&self.snapshot, &self.rows)
    }

    pub fn add(&mut self, conn: &Connection, fields: &FieldReader<'_>) -> AppResult<FlushSummary> {
        let row = R::from_fields(fields)?;
        self.rows.push(row);
        self.flush(conn)
    }

    pub fn edit(
        &mut self,
        conn: &Connection,
        selected: Option<usize>,
        fields: &FieldReader<'_>,
    ) -> AppResult<FlushSummary> {
        let index = self.check_selection(selected)?;
        let mut row = R::from_fields(fields)?;
        if let Some(id) = self.rows[index].identity() {
            row.set_identity(id);
        }
        self.rows[index] = row;
        self.flush(conn)
    }

    pub fn delete(&mut self, conn: &Connection, selected: Option<usize>) -> AppResult<FlushSummary> {
        let index = self.check_selection(selected)?;
        self.rows.remove(index);
        self.flush(conn)
    }

    /// Field values for the highlighted row.
    pub fn selection_fields(&self, selected: Option<usize>) -> AppResult<FieldValues> {
        let index = self.check_selection(selected)?;
        Ok(self.rows[index].to_fields())
    }

    /// Writes the pending changes in one transaction. On failure the
    /// in-memory rows stay ahead of storage and the next flush retries the
    /// whole delta.
    pub fn flush(&mut self, conn: &Connection) -> AppResult<FlushSummary> {
        let changes = self.pending();
        if changes.is_empty() {
            return Ok(FlushSummary::default());
        }

        let tx = conn.unchecked_transaction()?;
        let mut summary = FlushSummary::default();
        let mut assigned: Vec<(usize, i64)> = Vec::new();

        for change in &changes {
            let st = change.statement();
            let affected = tx.execute(&st.sql, params_from_iter(st.params.iter()))?;
            match change {
                Change::Insert { index, .. } => {
                    assigned.push((*index, tx.last_insert_rowid()));
                    summary.inserted += 1;
                }
                Change::Update { .. } => summary.updated += affected,
                Change::Delete { .. } => summary.deleted += affected,
            }
        }
        tx.commit()?;

        for (index, id) in assigned {
            self.rows[index].set_identity(id);
        }
        self.snapshot = self.rows.clone();

        info!(
            table = R::TABLE,
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            "record set flushed"
        );
        Ok(summary)
    }

    fn check_selection(&self, selected: Option<usize>) -> AppResult<usize> {
        let Some(index) = selected else {
            return Err(AppError::NoSelection);
        };
        if index >= self.rows.len() {
            return Err(AppError::IndexOutOfRange {
                index,
                len: self.rows.len(),
            });
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::records::{FacultyMember, Fee, Student};

    fn mem_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        db::init_schema(&conn).expect("schema");
        conn
    }

    fn fields(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn student_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))
            .expect("count")
    }

    #[test]
    fn add_to_empty_students_then_reload() {
        let conn = mem_db();
        let mut grid = RecordGrid::<Student>::load(&conn).expect("load");
        assert!(grid.rows().is_empty());

        let f = fields(&[("name", "Sam"), ("rollNumber", "R1")]);
        let summary = grid.add(&conn, &FieldReader::new(&f, 64)).expect("add");
        assert_eq!(summary.inserted, 1);
        assert!(grid.rows()[0].id.is_some());

        let reloaded = RecordGrid::<Student>::load(&conn).expect("reload");
        assert_eq!(reloaded.rows().len(), 1);
        assert_eq!(reloaded.rows()[0].roll_number, "R1");
        assert_eq!(reloaded.rows()[0].id, grid.rows()[0].id);
    }

    #[test]
    fn add_with_blank_required_column_touches_nothing() {
        let conn = mem_db();
        let mut grid = RecordGrid::<Student>::load(&conn).expect("load");
        let f = fields(&[("name", "Sam"), ("rollNumber", "")]);
        let e = grid.add(&conn, &FieldReader::new(&f, 64)).expect_err("blank roll");
        assert!(matches!(
            e,
            AppError::Validation {
                column: "rollNumber",
                ..
            }
        ));
        assert!(grid.rows().is_empty());
        assert_eq!(student_count(&conn), 0);
    }

    #[test]
    fn edit_without_selection_leaves_storage_unchanged() {
        let conn = mem_db();
        conn.execute(
            "INSERT INTO students(roll_number, name) VALUES('R1', 'Sam')",
            [],
        )
        .expect("seed");
        let mut grid = RecordGrid::<Student>::load(&conn).expect("load");
        let f = fields(&[("name", "Changed"), ("rollNumber", "R1")]);

        let e = grid
            .edit(&conn, None, &FieldReader::new(&f, 64))
            .expect_err("no selection");
        assert!(matches!(e, AppError::NoSelection));

        let e = grid
            .edit(&conn, Some(5), &FieldReader::new(&f, 64))
            .expect_err("out of range");
        assert!(matches!(e, AppError::IndexOutOfRange { index: 5, len: 1 }));

        let name: String = conn
            .query_row("SELECT name FROM students", [], |r| r.get(0))
            .expect("name");
        assert_eq!(name, "Sam");
    }

    #[test]
    fn edit_keeps_identity_and_updates_in_place() {
        let conn = mem_db();
        conn.execute(
            "INSERT INTO students(roll_number, name) VALUES('R1', 'Sam')",
            [],
        )
        .expect("seed");
        let mut grid = RecordGrid::<Student>::load(&conn).expect("load");
        let id = grid.rows()[0].id;

        let f = fields(&[("name", "Samuel"), ("rollNumber", "R1")]);
        let summary = grid
            .edit(&conn, Some(0), &FieldReader::new(&f, 64))
            .expect("edit");
        assert_eq!(
            summary,
            FlushSummary {
                inserted: 0,
                updated: 1,
                deleted: 0
            }
        );

        let reloaded = RecordGrid::<Student>::load(&conn).expect("reload");
        assert_eq!(reloaded.rows()[0].id, id);
        assert_eq!(reloaded.rows()[0].name, "Samuel");
        assert_eq!(student_count(&conn), 1);
    }

    #[test]
    fn delete_removes_identity_from_storage() {
        let conn = mem_db();
        for (roll, name) in [("R1", "Sam"), ("R2", "Ada")] {
            conn.execute(
                "INSERT INTO students(roll_number, name) VALUES(?, ?)",
                (roll, name),
            )
            .expect("seed");
        }
        let mut grid = RecordGrid::<Student>::load(&conn).expect("load");
        let gone = grid.rows()[0].id;

        assert!(matches!(grid.delete(&conn, None), Err(AppError::NoSelection)));
        let summary = grid.delete(&conn, Some(0)).expect("delete");
        assert_eq!(summary.deleted, 1);

        let reloaded = RecordGrid::<Student>::load(&conn).expect("reload");
        assert!(reloaded.rows().iter().all(|r| r.id != gone));
        assert_eq!(reloaded.rows().len(), 1);
    }

    #[test]
    fn failed_flush_keeps_rows_ahead_and_retries() {
        let conn = mem_db();
        let mut grid = RecordGrid::<Fee>::load(&conn).expect("load");
        conn.execute("DROP TABLE fees", []).expect("drop");

        let f = fields(&[("studentId", "1"), ("amount", "250")]);
        let e = grid.add(&conn, &FieldReader::new(&f, 64)).expect_err("no table");
        assert!(matches!(e, AppError::Storage(_)));
        assert_eq!(grid.rows().len(), 1);
        assert_eq!(grid.pending().len(), 1);

        db::init_schema(&conn).expect("restore schema");
        let summary = grid.flush(&conn).expect("retry");
        assert_eq!(summary.inserted, 1);
        assert!(grid.pending().is_empty());
    }

    #[test]
    fn selection_projection_is_pure() {
        let conn = mem_db();
        let mut grid = RecordGrid::<FacultyMember>::load(&conn).expect("load");
        let f = fields(&[("name", "Ada"), ("department", "Math")]);
        grid.add(&conn, &FieldReader::new(&f, 64)).expect("add");

        let projected = grid.selection_fields(Some(0)).expect("fields");
        assert_eq!(projected.get("department").map(String::as_str), Some("Math"));
        assert!(grid.pending().is_empty());
        assert!(matches!(
            grid.selection_fields(None),
            Err(AppError::NoSelection)
        ));
    }

    #[test]
    fn faculty_grid_never_touches_credentials() {
        let conn = mem_db();
        conn.execute(
            "INSERT INTO faculty(username, name, password_hash) VALUES('alice1', 'Alice', 'h')",
            [],
        )
        .expect("seed credential");
        let mut grid = RecordGrid::<FacultyMember>::load(&conn).expect("load");
        let f = fields(&[("name", "Alice B"), ("department", "Science")]);
        grid.edit(&conn, Some(0), &FieldReader::new(&f, 64))
            .expect("edit");

        let (username, hash): (String, String) = conn
            .query_row(
                "SELECT username, password_hash FROM faculty WHERE faculty_id = ?",
                [grid.rows()[0].id.expect("id")],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .expect("row");
        assert_eq!(username, "alice1");
        assert_eq!(hash, "h");
    }
}
