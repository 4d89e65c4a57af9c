//! `auth.*` methods: registration, login and the session they establish.

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::gate::CredentialGate;
use crate::ipc::error::{app_err, err, ok};
use crate::ipc::types::{AppState, Request, Session};

fn str_param<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

fn handle_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (Some(name), Some(username), Some(password)) = (
        str_param(req, "name"),
        str_param(req, "username"),
        str_param(req, "password"),
    ) else {
        return err(
            &req.id,
            "bad_params",
            "name, username and password are required strings",
            None,
        );
    };

    let conn = match db::connect(workspace, state.config.busy_timeout_ms) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "db_open_failed", e.to_string(), None),
    };
    let gate = CredentialGate::new(
        &conn,
        state.config.password_scheme,
        state.config.max_field_length,
    );
    match gate.register(name, username, password) {
        Ok(faculty_id) => ok(
            &req.id,
            json!({ "facultyId": faculty_id, "username": username.trim() }),
        ),
        Err(e) => {
            if matches!(e, crate::error::AppError::Storage(_)) {
                warn!(error = %e, "registration failed");
            }
            app_err(&req.id, &e)
        }
    }
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (Some(username), Some(password)) = (str_param(req, "username"), str_param(req, "password"))
    else {
        return err(
            &req.id,
            "bad_params",
            "username and password are required strings",
            None,
        );
    };

    let conn = match db::connect(workspace, state.config.busy_timeout_ms) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "db_open_failed", e.to_string(), None),
    };
    let gate = CredentialGate::new(
        &conn,
        state.config.password_scheme,
        state.config.max_field_length,
    );
    let credential = match gate.authenticate(username, password) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "login check failed");
            return app_err(&req.id, &e);
        }
    };

    let Some(cred) = credential else {
        info!(username, "login rejected");
        return ok(
            &req.id,
            json!({
                "authenticated": false,
                "message": "Invalid username or password!"
            }),
        );
    };

    let session = Session {
        token: Uuid::new_v4(),
        faculty_id: cred.faculty_id,
        username: cred.username,
        name: cred.name,
        started_at: Utc::now(),
    };
    info!(username = %session.username, "login accepted");
    let result = json!({ "authenticated": true, "session": session });
    // Screens opened under a previous session do not carry over.
    state.screens.close_all();
    state.session = Some(session);
    ok(&req.id, result)
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let was = state.session.take();
    state.screens.close_all();
    if let Some(s) = &was {
        info!(username = %s.username, "logged out");
    }
    ok(&req.id, json!({ "loggedOut": was.is_some() }))
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "session": state.session }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.register" => Some(handle_register(state, req)),
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        _ => None,
    }
}
