//! `<table>.*` methods for the five record screens.

use rusqlite::types::Value;
use serde_json::json;
use std::path::Path;
use tracing::warn;

use crate::config::Config;
use crate::db;
use crate::grid::fields::{fields_from_json, FieldReader};
use crate::grid::{Record, RecordGrid};
use crate::ipc::error::{app_err, app_err_as, err, ok};
use crate::ipc::types::{AppState, Request};

const TABLES: [&str; 5] = ["students", "marks", "subjects", "fees", "faculty"];

enum Selection {
    Index(Option<usize>),
    Invalid,
}

fn parse_index(req: &Request) -> Selection {
    match req.params.get("index") {
        None | Some(serde_json::Value::Null) => Selection::Index(None),
        Some(v) => match v.as_u64() {
            Some(i) => Selection::Index(Some(i as usize)),
            None => Selection::Invalid,
        },
    }
}

fn sql_value_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => json!(i),
        Value::Real(f) => json!(f),
        Value::Text(s) => json!(s),
        Value::Blob(b) => json!(b.len()),
    }
}

fn records_json<R: Record>(grid: &RecordGrid<R>) -> serde_json::Value {
    json!(grid.rows())
}

fn handle_open<R: Record>(
    slot: &mut Option<RecordGrid<R>>,
    workspace: &Path,
    config: &Config,
    req: &Request,
) -> serde_json::Value {
    let loaded = db::connect(workspace, config.busy_timeout_ms)
        .map_err(crate::error::AppError::from)
        .and_then(|conn| RecordGrid::<R>::load(&conn));

    match loaded {
        Ok(grid) => {
            let resp = ok(
                &req.id,
                json!({
                    "table": R::TABLE,
                    "columns": R::COLUMNS,
                    "records": records_json(&grid),
                }),
            );
            *slot = Some(grid);
            resp
        }
        Err(e) => {
            // The screen still opens, showing an empty set.
            warn!(table = R::TABLE, error = %e, "record set load failed");
            *slot = Some(RecordGrid::empty());
            err(
                &req.id,
                "db_query_failed",
                e.to_string(),
                Some(json!({ "table": R::TABLE, "records": [] })),
            )
        }
    }
}

fn handle_mutation<R: Record>(
    grid: &mut RecordGrid<R>,
    workspace: &Path,
    config: &Config,
    req: &Request,
    action: &str,
) -> serde_json::Value {
    let selected = match parse_index(req) {
        Selection::Index(v) => v,
        Selection::Invalid => {
            return err(
                &req.id,
                "bad_params",
                "index must be a non-negative integer or null",
                None,
            )
        }
    };
    let fields = if action == "delete" {
        Default::default()
    } else {
        match fields_from_json(req.params.get("fields").unwrap_or(&serde_json::Value::Null)) {
            Ok(f) => f,
            Err(msg) => return err(&req.id, "bad_params", msg, None),
        }
    };
    let reader = FieldReader::new(&fields, config.max_field_length);

    let conn = match db::connect(workspace, config.busy_timeout_ms) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "db_open_failed", e.to_string(), None),
    };

    let outcome = match action {
        "add" => grid.add(&conn, &reader),
        "edit" => grid.edit(&conn, selected, &reader),
        _ => grid.delete(&conn, selected),
    };

    match outcome {
        Ok(summary) => ok(
            &req.id,
            json!({
                "summary": summary,
                "records": records_json(grid),
            }),
        ),
        Err(e) => {
            if matches!(e, crate::error::AppError::Storage(_)) {
                warn!(table = R::TABLE, action, error = %e, "flush failed; changes kept in memory");
            }
            app_err_as(&req.id, &e, "db_flush_failed")
        }
    }
}

fn handle_table<R: Record>(
    slot: &mut Option<RecordGrid<R>>,
    workspace: &Path,
    config: &Config,
    req: &Request,
    action: &str,
) -> serde_json::Value {
    if action == "open" {
        return handle_open(slot, workspace, config, req);
    }
    if action == "close" {
        let was_open = slot.take().is_some();
        return ok(&req.id, json!({ "closed": was_open }));
    }

    let Some(grid) = slot.as_mut() else {
        return err(
            &req.id,
            "screen_not_open",
            format!("open {} first", R::TABLE),
            None,
        );
    };

    match action {
        "list" => ok(&req.id, json!({ "records": records_json(grid) })),
        "select" => match parse_index(req) {
            Selection::Index(selected) => match grid.selection_fields(selected) {
                Ok(fields) => ok(&req.id, json!({ "index": selected, "fields": fields })),
                Err(e) => app_err(&req.id, &e),
            },
            Selection::Invalid => err(
                &req.id,
                "bad_params",
                "index must be a non-negative integer or null",
                None,
            ),
        },
        "pending" => {
            let changes = grid
                .pending()
                .iter()
                .map(|c| {
                    let st = c.statement();
                    json!({
                        "kind": c.kind(),
                        "sql": st.sql,
                        "params": st.params.iter().map(sql_value_json).collect::<Vec<_>>(),
                    })
                })
                .collect::<Vec<_>>();
            ok(&req.id, json!({ "changes": changes }))
        }
        "add" | "edit" | "delete" => handle_mutation(grid, workspace, config, req, action),
        _ => err(
            &req.id,
            "not_implemented",
            format!("unknown method: {}", req.method),
            None,
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let (table, action) = req.method.split_once('.')?;
    if !TABLES.contains(&table) {
        return None;
    }

    let AppState {
        config,
        workspace,
        session,
        screens,
    } = state;

    if session.is_none() {
        return Some(err(&req.id, "not_authenticated", "log in first", None));
    }
    let Some(workspace) = workspace.as_deref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };

    let resp = match table {
        "students" => handle_table(&mut screens.students, workspace, config, req, action),
        "marks" => handle_table(&mut screens.marks, workspace, config, req, action),
        "subjects" => handle_table(&mut screens.subjects, workspace, config, req, action),
        "fees" => handle_table(&mut screens.fees, workspace, config, req, action),
        _ => handle_table(&mut screens.faculty, workspace, config, req, action),
    };
    Some(resp)
}
