//! Minimal MCP stdio server used only for connection pool integration tests.
//!
//! Speaks JSON-RPC over stdio directly, one message per line. Set
//! `UCP_MOCK_FAIL_CALLS=<n>` to make the first `n` `tools/call` invocations
//! return an error, exercising the pool's retry and breaker logic.

use serde_json::json;
use std::io::{BufRead as _, Write};

fn main() -> anyhow::Result<()> {
    let fail_calls: u32 = std::env::var("UCP_MOCK_FAIL_CALLS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut state = ServerState {
        call_count: 0,
        fail_calls,
    };
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if let Some(resp) = handle_line(&mut state, &line) {
            write_json_line(&mut stdout, &resp)?;
        }
    }

    Ok(())
}

struct ServerState {
    call_count: u32,
    fail_calls: u32,
}

fn handle_line(state: &mut ServerState, line: &str) -> Option<serde_json::Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let msg: serde_json::Value = serde_json::from_str(line).ok()?;
    handle_message(state, &msg)
}

fn handle_message(state: &mut ServerState, msg: &serde_json::Value) -> Option<serde_json::Value> {
    let method = msg.get("method").and_then(serde_json::Value::as_str)?;
    let id = msg.get("id")?.clone();

    match method {
        "initialize" => Some(jsonrpc_ok(
            &id,
            &json!({
                "protocolVersion": "2024-11-05",
                "capabilities": { "tools": {} },
                "serverInfo": { "name": "ucp-pool-mock-server", "version": "0" }
            }),
        )),
        "resources/list" => Some(jsonrpc_ok(&id, &json!({ "resources": [] }))),
        "prompts/list" => Some(jsonrpc_ok(&id, &json!({ "prompts": [] }))),
        "tools/list" => Some(jsonrpc_ok(
            &id,
            &json!({
                "tools": [{
                    "name": "echo",
                    "description": "Echo the input back",
                    "inputSchema": { "type": "object" }
                }]
            }),
        )),
        "tools/call" => match tools_call_result(state, msg) {
            Ok(result) => Some(jsonrpc_ok(&id, &result)),
            Err(error) => Some(jsonrpc_err(&id, &error)),
        },
        _ => Some(jsonrpc_err(
            &id,
            &json!({ "code": -32601, "message": "method not found" }),
        )),
    }
}

fn tools_call_result(
    state: &mut ServerState,
    msg: &serde_json::Value,
) -> Result<serde_json::Value, serde_json::Value> {
    state.call_count += 1;
    if state.call_count <= state.fail_calls {
        return Err(json!({ "code": -32000, "message": "injected failure" }));
    }
    let args = msg
        .get("params")
        .and_then(|p| p.get("arguments"))
        .cloned()
        .unwrap_or(json!({}));
    Ok(json!({
        "content": [{ "type": "text", "text": args.to_string() }]
    }))
}

fn jsonrpc_ok(id: &serde_json::Value, result: &serde_json::Value) -> serde_json::Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn jsonrpc_err(id: &serde_json::Value, error: &serde_json::Value) -> serde_json::Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": error })
}

fn write_json_line(stdout: &mut dyn Write, v: &serde_json::Value) -> anyhow::Result<()> {
    writeln!(stdout, "{}", serde_json::to_string(v)?)?;
    stdout.flush()?;
    Ok(())
}
