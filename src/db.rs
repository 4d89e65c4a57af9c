//! Workspace database: schema, migrations and per-operation connections.

use anyhow::Context;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DB_FILE: &str = "students.sqlite3";

pub fn db_path(workspace: &Path) -> PathBuf {
    workspace.join(DB_FILE)
}

/// Creates the workspace if needed and brings its schema up to date.
pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let conn = Connection::open(db_path(workspace))?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Opens a connection for one operation. The schema must already exist.
pub fn connect(workspace: &Path, busy_timeout_ms: u64) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path(workspace))?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    // Faculty rows created from the grid carry no credential, so username and
    // password_hash stay nullable. UNIQUE still allows many NULL usernames.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS faculty(
            faculty_id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE,
            name TEXT NOT NULL,
            password_hash TEXT,
            department TEXT,
            created_at TEXT
        )",
        [],
    )?;
    ensure_faculty_department(conn)?;
    ensure_faculty_created_at(conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            student_id INTEGER PRIMARY KEY AUTOINCREMENT,
            roll_number TEXT NOT NULL,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            subject_id INTEGER PRIMARY KEY AUTOINCREMENT,
            subject_name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS marks(
            mark_id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            subject_id INTEGER NOT NULL,
            marks_obtained REAL NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_marks_student ON marks(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS fees(
            fee_id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            amount REAL NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fees_student ON fees(student_id)",
        [],
    )?;

    Ok(())
}

// Credential-only workspaces predate the faculty screen and have no department.
fn ensure_faculty_department(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "faculty", "department")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE faculty ADD COLUMN department TEXT", [])?;
    Ok(())
}

fn ensure_faculty_created_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "faculty", "created_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE faculty ADD COLUMN created_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open");
        init_schema(&conn).expect("first init");
        init_schema(&conn).expect("second init");
        for t in ["faculty", "students", "subjects", "marks", "fees"] {
            let n: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                    [t],
                    |r| r.get(0),
                )
                .expect("count");
            assert_eq!(n, 1, "table {}", t);
        }
    }

    #[test]
    fn credential_only_faculty_table_gains_department() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute(
            "CREATE TABLE faculty(
                faculty_id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE,
                name TEXT NOT NULL,
                password_hash TEXT
            )",
            [],
        )
        .expect("legacy table");
        conn.execute(
            "INSERT INTO faculty(username, name, password_hash) VALUES('old', 'Old', 'x')",
            [],
        )
        .expect("legacy row");

        init_schema(&conn).expect("migrate");
        assert!(table_has_column(&conn, "faculty", "department").expect("pragma"));
        assert!(table_has_column(&conn, "faculty", "created_at").expect("pragma"));
        let dept: Option<String> = conn
            .query_row(
                "SELECT department FROM faculty WHERE username = 'old'",
                [],
                |r| r.get(0),
            )
            .expect("row survives");
        assert!(dept.is_none());
    }
}
