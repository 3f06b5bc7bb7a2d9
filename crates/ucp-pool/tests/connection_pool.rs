use std::collections::BTreeMap;
use ucp_core::config::PoolConfig;
use ucp_core::server::{ConnectionState, ServerDescriptor, Transport};
use ucp_pool::ConnectionPool;

fn mock_server_descriptor(name: &str, fail_calls: u32) -> ServerDescriptor {
    let mut env = BTreeMap::new();
    if fail_calls > 0 {
        env.insert("UCP_MOCK_FAIL_CALLS".to_string(), fail_calls.to_string());
    }
    ServerDescriptor {
        name: name.to_string(),
        transport: Transport::Stdio,
        command: Some(env!("CARGO_BIN_EXE_ucp-pool-mock-stdio-server").to_string()),
        args: Vec::new(),
        env,
        url: None,
        auth: None,
        tags: Default::default(),
        description: String::new(),
        timeout_secs: None,
    }
}

#[tokio::test]
async fn connects_and_lists_tools_from_mock_server() {
    let pool = ConnectionPool::new(vec![mock_server_descriptor("echo", 0)], PoolConfig::default());
    pool.connect_all().await;

    let statuses = pool.status();
    assert_eq!(statuses[0].connection, ConnectionState::Connected);
    assert_eq!(statuses[0].tool_count, 1);

    let tools = pool.list_tools("echo").unwrap();
    assert_eq!(tools[0].name, "echo");
}

#[tokio::test]
async fn call_tool_round_trips_arguments() {
    let pool = ConnectionPool::new(vec![mock_server_descriptor("echo", 0)], PoolConfig::default());
    pool.connect_all().await;

    let result = pool
        .call_tool("echo", "echo", serde_json::json!({"msg": "hi"}))
        .await
        .unwrap();
    let text = result.content[0].as_text().unwrap().text.to_string();
    assert!(text.contains("hi"));
}

#[tokio::test]
async fn retries_transient_failures_then_succeeds() {
    let config = PoolConfig {
        max_retries: 3,
        base_backoff_secs: 0.01,
        ..PoolConfig::default()
    };
    let pool = ConnectionPool::new(vec![mock_server_descriptor("echo", 2)], config);
    pool.connect_all().await;

    let result = pool
        .call_tool("echo", "echo", serde_json::json!({"n": 1}))
        .await
        .unwrap();
    let text = result.content[0].as_text().unwrap().text.to_string();
    assert!(text.contains('1'));
}

#[tokio::test]
async fn unknown_server_is_rejected() {
    let pool = ConnectionPool::new(vec![mock_server_descriptor("echo", 0)], PoolConfig::default());
    let err = pool
        .call_tool("missing", "echo", serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ucp_pool::PoolError::UnknownServer(_)));
}
