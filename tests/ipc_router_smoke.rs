use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_studentd");
    let mut child = Command::new(exe)
        .env_remove("STUDENTD_WORKSPACE")
        .env_remove("STUDENTD_CONFIG")
        .env("STUDENTD_PASSWORD_SCHEME", "sha256")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn studentd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn read_response(reader: &mut BufReader<ChildStdout>) -> serde_json::Value {
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let value = read_response(reader);
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("studentd-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(
        health.pointer("/result/authenticated").and_then(|v| v.as_bool()),
        Some(false)
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert!(workspace.join("students.sqlite3").is_file());

    let _ = request(
        &mut stdin,
        &mut reader,
        "3",
        "auth.register",
        json!({ "name": "Smoke", "username": "smoke", "password": "pw" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "4",
        "auth.login",
        json!({ "username": "smoke", "password": "pw" }),
    );
    let _ = request(&mut stdin, &mut reader, "5", "auth.session", json!({}));

    let mut n = 0;
    for table in ["students", "marks", "subjects", "fees", "faculty"] {
        for action in ["open", "list", "select", "pending", "edit", "delete", "close"] {
            n += 1;
            let _ = request(
                &mut stdin,
                &mut reader,
                &format!("t{}", n),
                &format!("{}.{}", table, action),
                json!({}),
            );
        }
    }

    let health = request(&mut stdin, &mut reader, "6", "health", json!({}));
    assert_eq!(
        health.pointer("/result/authenticated").and_then(|v| v.as_bool()),
        Some(true)
    );
    let _ = request(&mut stdin, &mut reader, "7", "auth.logout", json!({}));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unknown_method_and_bad_json_are_reported() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let bad = read_response(&mut reader);
    assert_eq!(bad.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        bad.pointer("/error/code").and_then(|v| v.as_str()),
        Some("bad_json")
    );

    writeln!(
        stdin,
        "{}",
        json!({ "id": "x", "method": "students.explode", "params": {} })
    )
    .expect("write request");
    stdin.flush().expect("flush");
    let resp = read_response(&mut reader);
    // Table methods are gated before dispatch.
    assert_eq!(
        resp.pointer("/error/code").and_then(|v| v.as_str()),
        Some("not_authenticated")
    );

    writeln!(
        stdin,
        "{}",
        json!({ "id": "y", "method": "nope.nothing", "params": {} })
    )
    .expect("write request");
    stdin.flush().expect("flush");
    let resp = read_response(&mut reader);
    assert_eq!(resp.get("id").and_then(|v| v.as_str()), Some("y"));
    assert_eq!(
        resp.pointer("/error/code").and_then(|v| v.as_str()),
        Some("not_implemented")
    );

    drop(stdin);
    let _ = child.wait();
}
