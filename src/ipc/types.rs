//! Request framing and the state held between requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::Config;
use crate::grid::RecordGrid;
use crate::records::{FacultyMember, Fee, Mark, Student, Subject};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: Uuid,
    pub faculty_id: i64,
    pub username: String,
    pub name: String,
    pub started_at: DateTime<Utc>,
}

/// Open record screens. A screen is `None` until opened and again after close.
#[derive(Default)]
pub struct Screens {
    pub students: Option<RecordGrid<Student>>,
    pub marks: Option<RecordGrid<Mark>>,
    pub subjects: Option<RecordGrid<Subject>>,
    pub fees: Option<RecordGrid<Fee>>,
    pub faculty: Option<RecordGrid<FacultyMember>>,
}

impl Screens {
    pub fn close_all(&mut self) {
        *self = Screens::default();
    }

    pub fn open_names(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.students.is_some() {
            out.push("students");
        }
        if self.marks.is_some() {
            out.push("marks");
        }
        if self.subjects.is_some() {
            out.push("subjects");
        }
        if self.fees.is_some() {
            out.push("fees");
        }
        if self.faculty.is_some() {
            out.push("faculty");
        }
        out
    }
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub session: Option<Session>,
    pub screens: Screens,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            config,
            workspace: None,
            session: None,
            screens: Screens::default(),
        }
    }
}
