use super::EXIT_USAGE;
use crate::core::rpc_tools::{self, INVALID_PARAMS, METHOD_NOT_FOUND, Service};
use crate::core::settings::Overrides;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::{BufRead, Write};

#[allow(dead_code)]
#[derive(Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

#[derive(Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcErrorObj>,
}

#[derive(Serialize)]
struct JsonRpcErrorObj {
    code: i32,
    message: String,
}

/// Line-delimited JSON-RPC 2.0 over stdio. Returns when stdin closes.
pub fn run(overrides: Overrides) -> i32 {
    let settings = match super::settings(overrides) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return EXIT_USAGE;
        }
    };
    let prepared = super::engine(&settings).and_then(|engine| {
        let store = super::vocabulary_store(&settings)?;
        Ok((engine, store))
    });
    let service = match prepared {
        Ok((engine, store)) => Service::new(engine, store, settings.records_db.clone()),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return EXIT_USAGE;
        }
    };
    tracing::info!(records_db = %settings.records_db.display(), "serving on stdio");

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(req) if req.method.starts_with("notifications/") => continue,
            Ok(req) => dispatch(&req, &service),
            Err(e) => error_response(None, -32700, format!("Parse error: {e}")),
        };
        if write_response(&mut out, &resp).is_err() {
            break;
        }
    }

    0
}

fn write_response(out: &mut impl Write, resp: &JsonRpcResponse) -> std::io::Result<()> {
    let text = serde_json::to_string(resp).map_err(std::io::Error::other)?;
    writeln!(out, "{text}")?;
    out.flush()
}

fn dispatch(req: &JsonRpcRequest, service: &Service) -> JsonRpcResponse {
    match req.method.as_str() {
        "initialize" => success(
            req,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {
                    "name": "isaac",
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "tools": rpc_tools::tools_list(),
            }),
        ),
        "tools/list" => success(req, json!({"tools": rpc_tools::tools_list()})),
        "tools/call" => handle_tools_call(req, service),
        _ => error_response(
            req.id.clone(),
            METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    }
}

fn handle_tools_call(req: &JsonRpcRequest, service: &Service) -> JsonRpcResponse {
    let Some(params) = req.params.as_ref() else {
        return error_response(req.id.clone(), INVALID_PARAMS, "Missing params".to_string());
    };
    let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
        return error_response(
            req.id.clone(),
            INVALID_PARAMS,
            "Missing tool name".to_string(),
        );
    };
    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    match service.call(tool_name, &args) {
        Ok(value) => success(
            req,
            json!({
                "content": [{"type": "text", "text": value.to_string()}]
            }),
        ),
        Err(e) => error_response(req.id.clone(), e.code, e.message),
    }
}

fn success(req: &JsonRpcRequest, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id: req.id.clone(),
        result: Some(result),
        error: None,
    }
}

fn error_response(id: Option<Value>, code: i32, message: String) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcErrorObj { code, message }),
    }
}
