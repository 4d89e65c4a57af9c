//! Response envelopes.

use serde_json::json;

use crate::error::AppError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn app_err(id: &str, e: &AppError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), e.details())
}

/// Like `app_err`, but reports storage faults under `storage_code`.
pub fn app_err_as(id: &str, e: &AppError, storage_code: &str) -> serde_json::Value {
    match e {
        AppError::Storage(_) => err(id, storage_code, e.to_string(), e.details()),
        _ => app_err(id, e),
    }
}
