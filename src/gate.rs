//! Credential gate: faculty registration and login against the `faculty` table.

use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::password::{self, PasswordScheme};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub faculty_id: i64,
    pub username: String,
    pub name: String,
}

pub struct CredentialGate<'a> {
    conn: &'a Connection,
    scheme: PasswordScheme,
    max_field_length: usize,
}

impl<'a> CredentialGate<'a> {
    pub fn new(conn: &'a Connection, scheme: PasswordScheme, max_field_length: usize) -> Self {
        CredentialGate {
            conn,
            scheme,
            max_field_length,
        }
    }

    /// Inserts a new credential. Leaves the table untouched on any error.
    pub fn register(&self, name: &str, username: &str, password: &str) -> AppResult<i64> {
        let name = name.trim();
        let username = username.trim();
        self.check_input("name", name)?;
        self.check_input("username", username)?;
        if password.is_empty() {
            return Err(AppError::validation("password", "must not be empty"));
        }
        if password.chars().count() > self.max_field_length {
            return Err(AppError::validation("password", "is too long"));
        }

        if self.username_exists(username)? {
            debug!(username, "registration rejected: username taken");
            return Err(AppError::DuplicateUsername);
        }

        let hash = password::hash_password(password, self.scheme)?;
        let inserted = self.conn.execute(
            "INSERT INTO faculty(name, username, password_hash, created_at) VALUES(?, ?, ?, ?)",
            (name, username, &hash, Utc::now().to_rfc3339()),
        );
        match inserted {
            Ok(_) => {}
            // Another writer took the name between the check and the insert.
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(AppError::DuplicateUsername)
            }
            Err(e) => return Err(e.into()),
        }

        let faculty_id = self.conn.last_insert_rowid();
        info!(username, faculty_id, "faculty registered");
        Ok(faculty_id)
    }

    /// Returns the matching credential, or `None` for an unknown user or a
    /// wrong password alike. Both rejections run one password verification.
    pub fn authenticate(&self, username: &str, password: &str) -> AppResult<Option<Credential>> {
        let row: Option<(i64, String, String, String)> = self
            .conn
            .query_row(
                "SELECT faculty_id, username, name, password_hash
                 FROM faculty
                 WHERE username = ? AND password_hash IS NOT NULL",
                [username.trim()],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()?;

        let Some((faculty_id, username, name, stored)) = row else {
            debug!(username = username.trim(), "unknown username");
            password::verify_password(password, password::dummy_hash(self.scheme));
            return Ok(None);
        };

        if !password::verify_password(password, &stored) {
            return Ok(None);
        }
        Ok(Some(Credential {
            faculty_id,
            username,
            name,
        }))
    }

    fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM faculty WHERE username = ?",
                [username],
                |r| r.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    fn check_input(&self, column: &'static str, value: &str) -> AppResult<()> {
        if value.is_empty() {
            return Err(AppError::validation(column, "must not be empty"));
        }
        if value.chars().count() > self.max_field_length {
            return Err(AppError::validation(column, "is too long"));
        }
        if value.contains(['\r', '\n', '\0']) {
            return Err(AppError::validation(column, "contains control characters"));
        }
        Ok(())
    }
}
