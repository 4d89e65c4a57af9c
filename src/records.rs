//! The five tables behind the record screens.

use rusqlite::types::Value;
use rusqlite::Row;
use serde::Serialize;

use crate::error::AppResult;
use crate::grid::fields::{Column, ColumnKind, FieldReader, FieldValues};
use crate::grid::Record;

const fn text(key: &'static str, sql: &'static str, label: &'static str) -> Column {
    Column {
        key,
        sql,
        label,
        kind: ColumnKind::Text,
        required: true,
    }
}

const fn integer(key: &'static str, sql: &'static str, label: &'static str) -> Column {
    Column {
        key,
        sql,
        label,
        kind: ColumnKind::Integer,
        required: true,
    }
}

const fn number(key: &'static str, sql: &'static str, label: &'static str) -> Column {
    Column {
        key,
        sql,
        label,
        kind: ColumnKind::Number,
        required: true,
    }
}

fn opt_text(v: &Option<String>) -> Value {
    match v {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Option<i64>,
    pub roll_number: String,
    pub name: String,
}

const STUDENT_COLUMNS: [Column; 2] = [
    text("rollNumber", "roll_number", "Roll Number"),
    text("name", "name", "Name"),
];

impl Record for Student {
    const TABLE: &'static str = "students";
    const IDENTITY: &'static str = "student_id";
    const COLUMNS: &'static [Column] = &STUDENT_COLUMNS;

    fn identity(&self) -> Option<i64> {
        self.id
    }

    fn set_identity(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn from_fields(f: &FieldReader<'_>) -> AppResult<Self> {
        Ok(Student {
            id: None,
            roll_number: f.required_text(&STUDENT_COLUMNS[0])?,
            name: f.required_text(&STUDENT_COLUMNS[1])?,
        })
    }

    fn to_fields(&self) -> FieldValues {
        FieldValues::from([
            ("rollNumber".to_string(), self.roll_number.clone()),
            ("name".to_string(), self.name.clone()),
        ])
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.roll_number.clone()),
            Value::Text(self.name.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Student {
            id: Some(row.get(0)?),
            roll_number: row.get(1)?,
            name: row.get(2)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    pub id: Option<i64>,
    pub student_id: i64,
    pub subject_id: i64,
    pub marks_obtained: f64,
}

const MARK_COLUMNS: [Column; 3] = [
    integer("studentId", "student_id", "Student ID"),
    integer("subjectId", "subject_id", "Subject ID"),
    number("marksObtained", "marks_obtained", "Marks Obtained"),
];

impl Record for Mark {
    const TABLE: &'static str = "marks";
    const IDENTITY: &'static str = "mark_id";
    const COLUMNS: &'static [Column] = &MARK_COLUMNS;

    fn identity(&self) -> Option<i64> {
        self.id
    }

    fn set_identity(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn from_fields(f: &FieldReader<'_>) -> AppResult<Self> {
        Ok(Mark {
            id: None,
            student_id: f.integer(&MARK_COLUMNS[0])?,
            subject_id: f.integer(&MARK_COLUMNS[1])?,
            marks_obtained: f.number(&MARK_COLUMNS[2])?,
        })
    }

    fn to_fields(&self) -> FieldValues {
        FieldValues::from([
            ("studentId".to_string(), self.student_id.to_string()),
            ("subjectId".to_string(), self.subject_id.to_string()),
            ("marksObtained".to_string(), self.marks_obtained.to_string()),
        ])
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.student_id),
            Value::Integer(self.subject_id),
            Value::Real(self.marks_obtained),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Mark {
            id: Some(row.get(0)?),
            student_id: row.get(1)?,
            subject_id: row.get(2)?,
            marks_obtained: row.get(3)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Option<i64>,
    pub subject_name: String,
}

const SUBJECT_COLUMNS: [Column; 1] = [text("subjectName", "subject_name", "Subject Name")];

impl Record for Subject {
    const TABLE: &'static str = "subjects";
    const IDENTITY: &'static str = "subject_id";
    const COLUMNS: &'static [Column] = &SUBJECT_COLUMNS;

    fn identity(&self) -> Option<i64> {
        self.id
    }

    fn set_identity(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn from_fields(f: &FieldReader<'_>) -> AppResult<Self> {
        Ok(Subject {
            id: None,
            subject_name: f.required_text(&SUBJECT_COLUMNS[0])?,
        })
    }

    fn to_fields(&self) -> FieldValues {
        FieldValues::from([("subjectName".to_string(), self.subject_name.clone())])
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Text(self.subject_name.clone())]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Subject {
            id: Some(row.get(0)?),
            subject_name: row.get(1)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    pub id: Option<i64>,
    pub student_id: i64,
    pub amount: f64,
}

const FEE_COLUMNS: [Column; 2] = [
    integer("studentId", "student_id", "Student ID"),
    number("amount", "amount", "Amount"),
];

impl Record for Fee {
    const TABLE: &'static str = "fees";
    const IDENTITY: &'static str = "fee_id";
    const COLUMNS: &'static [Column] = &FEE_COLUMNS;

    fn identity(&self) -> Option<i64> {
        self.id
    }

    fn set_identity(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn from_fields(f: &FieldReader<'_>) -> AppResult<Self> {
        Ok(Fee {
            id: None,
            student_id: f.integer(&FEE_COLUMNS[0])?,
            amount: f.number(&FEE_COLUMNS[1])?,
        })
    }

    fn to_fields(&self) -> FieldValues {
        FieldValues::from([
            ("studentId".to_string(), self.student_id.to_string()),
            ("amount".to_string(), self.amount.to_string()),
        ])
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Integer(self.student_id), Value::Real(self.amount)]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Fee {
            id: Some(row.get(0)?),
            student_id: row.get(1)?,
            amount: row.get(2)?,
        })
    }
}

/// A faculty row as the faculty screen sees it. Credentials live in the
/// same table but are never read or written from here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyMember {
    pub id: Option<i64>,
    pub name: String,
    pub department: Option<String>,
}

const FACULTY_COLUMNS: [Column; 2] = [
    text("name", "name", "Name"),
    Column {
        key: "department",
        sql: "department",
        label: "Department",
        kind: ColumnKind::Text,
        required: false,
    },
];

impl Record for FacultyMember {
    const TABLE: &'static str = "faculty";
    const IDENTITY: &'static str = "faculty_id";
    const COLUMNS: &'static [Column] = &FACULTY_COLUMNS;

    fn identity(&self) -> Option<i64> {
        self.id
    }

    fn set_identity(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn from_fields(f: &FieldReader<'_>) -> AppResult<Self> {
        Ok(FacultyMember {
            id: None,
            name: f.required_text(&FACULTY_COLUMNS[0])?,
            department: f.text(&FACULTY_COLUMNS[1])?,
        })
    }

    fn to_fields(&self) -> FieldValues {
        FieldValues::from([
            ("name".to_string(), self.name.clone()),
            (
                "department".to_string(),
                self.department.clone().unwrap_or_default(),
            ),
        ])
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone()), opt_text(&self.department)]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(FacultyMember {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            department: row.get(2)?,
        })
    }
}
