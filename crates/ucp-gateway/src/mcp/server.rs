use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, ListToolsResult, PaginatedRequestParam, ServerCapabilities,
    ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use serde_json::Value;
use tokio::sync::RwLock;
use ucp_core::learning::BANDIT_FEATURE_DIM;
use ucp_core::schema::ToolSchema;
use ucp_core::session::Role;
use ucp_router::RewardInputs;
use ucp_telemetry::{RewardSignal, RoutingEvent, ToolCallEvent};

use crate::context::GatewayContext;
use crate::mcp::errors;

/// Everything from the last `tools/list` call that `tools/call` needs back:
/// which routing event the tool call descends from, and the rerank-time
/// feature vector for each tool in the slate so the bandit can learn on the
/// features it actually scored, not a placeholder.
struct SlateContext {
    session_id: String,
    routing_event_id: uuid::Uuid,
    feature_vectors: BTreeMap<String, [f64; BANDIT_FEATURE_DIM]>,
}

/// One `UcpGatewayServer` per MCP connection (stdio client, or one per
/// streamable-HTTP session). All share the same `GatewayContext`; only the
/// conversation's `session_id` and the last routing slate/domain are
/// per-connection.
pub struct UcpGatewayServer {
    ctx: Arc<GatewayContext>,
    session_id: RwLock<Option<String>>,
    last_slate: RwLock<Option<SlateContext>>,
    last_domain: RwLock<Option<&'static str>>,
}

impl UcpGatewayServer {
    pub fn new(ctx: Arc<GatewayContext>) -> Self {
        Self {
            ctx,
            session_id: RwLock::new(None),
            last_slate: RwLock::new(None),
            last_domain: RwLock::new(None),
        }
    }

    async fn get_or_create_session(&self) -> Result<String, ErrorData> {
        let mut guard = self.session_id.write().await;
        if let Some(id) = guard.as_ref() {
            return Ok(id.clone());
        }
        let id = self
            .ctx
            .sessions
            .create_session()
            .await
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        *guard = Some(id.clone());
        Ok(id)
    }

    fn to_rmcp_tool(schema: &ToolSchema) -> Tool {
        let input_schema = match &schema.input_schema {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        Tool::new(schema.name.clone(), schema.description.clone(), Arc::new(input_schema))
    }

    fn known_tool_names(&self) -> Vec<String> {
        self.ctx.zoo.all_tools().into_iter().map(|t| t.name).collect()
    }
}

impl ServerHandler for UcpGatewayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "ucp-gateway".into(),
                title: Some("Universal Context Protocol Gateway".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Routes tool discovery and tool calls across many downstream MCP servers, \
                 surfacing only the tools relevant to the current conversation."
                    .into(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let session_id = self.get_or_create_session().await?;
        let session = self
            .ctx
            .sessions
            .get(&session_id)
            .await
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;

        let trace_id = uuid::Uuid::new_v4().to_string();
        let request_id = uuid::Uuid::new_v4().to_string();
        if let Err(e) = self
            .ctx
            .sessions
            .set_trace_context(&session_id, &trace_id, &request_id)
            .await
        {
            tracing::warn!(session_id = %session_id, error = %e, "failed to persist trace context");
        }

        let query = session.latest_user_message().unwrap_or("").to_string();

        let current_domain = ucp_router::domain::classify(&query);
        if let Some(domain) = current_domain {
            let mut last_domain = self.last_domain.write().await;
            if last_domain.is_some_and(|previous| previous != domain) {
                ucp_telemetry::metrics::record_context_shift_detected();
            }
            *last_domain = Some(domain);
        }

        let signals = self.ctx.signals();
        let decision = self
            .ctx
            .router
            .route(
                &query,
                &session,
                self.ctx.config.router.max_tools,
                self.ctx.config.router.max_context_tokens,
                &signals,
            )
            .await;

        ucp_telemetry::metrics::record_router_latency(decision.selection_time_ms);

        if decision.selected.is_empty() {
            return Err(errors::no_tools_available());
        }

        let tools: Vec<Tool> = decision
            .selected
            .iter()
            .filter_map(|name| self.ctx.zoo.get(name).ok())
            .map(|schema| Self::to_rmcp_tool(&schema))
            .collect();

        let event: RoutingEvent = RoutingEvent {
            event_type: "routing",
            event_id: uuid::Uuid::new_v4(),
            session_id: session_id.clone(),
            request_id: request_id.clone(),
            trace_id: trace_id.clone(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            query,
            selected: decision.selected.clone(),
            scores: decision.scores.clone(),
            strategy_used: decision.strategy_used.clone(),
            exploration_triggered: decision.exploration_triggered,
            selection_time_ms: decision.selection_time_ms,
            candidate_count: decision.candidate_count,
        };
        *self.last_slate.write().await = Some(SlateContext {
            session_id,
            routing_event_id: event.event_id,
            feature_vectors: decision.feature_vectors.clone(),
        });
        self.ctx.telemetry_index.record(event.clone().into());
        self.ctx.telemetry_log.emit(event);

        Ok(ListToolsResult {
            tools,
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let session_id = self.get_or_create_session().await?;
        let tool_name = request.name.to_string();
        let arguments = Value::Object(request.arguments.clone().unwrap_or_default());

        let Ok(schema) = self.ctx.zoo.get(&tool_name) else {
            return Err(errors::tool_not_found(&tool_name, &self.known_tool_names()));
        };

        errors::validate_arguments(&tool_name, &schema, &arguments)?;

        let session_before = self
            .ctx
            .sessions
            .get(&session_id)
            .await
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        let is_followup_retry = session_before
            .recent_tools
            .iter()
            .rev()
            .find(|t| t.name == tool_name)
            .is_some_and(|t| {
                !t.success && chrono::Utc::now() - t.invoked_at < chrono::Duration::seconds(2)
            });
        let trace_id = session_before.trace_id.clone().unwrap_or_default();
        let request_id = session_before.request_id.clone().unwrap_or_default();

        let _ = self
            .ctx
            .sessions
            .append_message(&session_id, Role::User, &format!("call {tool_name}"))
            .await;

        let prefix = format!("{}.", schema.server_name);
        let downstream_tool_name = schema.name.strip_prefix(&prefix).unwrap_or(&schema.name);

        let start = std::time::Instant::now();
        let result = self
            .ctx
            .pool
            .call_tool(&schema.server_name, downstream_tool_name, arguments.clone())
            .await;
        let exec_ms = start.elapsed().as_millis() as u64;

        let success = result.is_ok();
        let _ = self
            .ctx
            .sessions
            .log_tool_usage(&session_id, &tool_name, success)
            .await;
        ucp_telemetry::metrics::record_tool_invocation(&tool_name, success);

        let slate_guard = self.last_slate.read().await;
        let slate = slate_guard.as_ref().filter(|s| s.session_id == session_id);
        let routing_event_id = slate
            .map(|s| s.routing_event_id)
            .unwrap_or_else(uuid::Uuid::new_v4);
        let features = slate
            .and_then(|s| s.feature_vectors.get(&tool_name))
            .copied()
            .unwrap_or([0.0; BANDIT_FEATURE_DIM]);
        drop(slate_guard);

        let call_event = ToolCallEvent {
            event_type: "tool_call",
            event_id: uuid::Uuid::new_v4(),
            routing_event_id,
            session_id: session_id.clone(),
            request_id: request_id.clone(),
            trace_id: trace_id.clone(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            tool_name: tool_name.clone(),
            server_name: schema.server_name.clone(),
            success,
            exec_ms,
            error_code: result.as_ref().err().map(|e| e.to_string()),
        };
        self.ctx.telemetry_index.record(call_event.clone().into());
        self.ctx.telemetry_log.emit(call_event.clone());

        let reward = self
            .ctx
            .router
            .record_reward(
                &tool_name,
                &features,
                RewardInputs {
                    success,
                    exec_ms: exec_ms as f64,
                    schema_tokens: schema.schema_token_estimate,
                    is_followup_retry,
                },
            )
            .await;
        let reward_signal = RewardSignal {
            event_type: "reward",
            event_id: uuid::Uuid::new_v4(),
            tool_call_event_id: call_event.event_id,
            session_id: session_id.clone(),
            request_id,
            trace_id,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            tool_name: tool_name.clone(),
            reward,
        };
        self.ctx.telemetry_index.record(reward_signal.clone().into());
        self.ctx.telemetry_log.emit(reward_signal);

        match result {
            Ok(result) => Ok(result),
            Err(ucp_pool::PoolError::BreakerOpen { server, retry_after_secs }) => {
                Err(errors::breaker_open(&server, retry_after_secs))
            }
            Err(ucp_pool::PoolError::UnknownServer(server)) => Err(errors::no_server(&server)),
            Err(e) => Err(errors::tool_call_failed(
                &tool_name,
                &arguments,
                &e.to_string(),
                Some(&schema),
                &self.known_tool_names(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn to_rmcp_tool_carries_fully_qualified_name_and_schema() {
        let schema = ToolSchema::new(
            "gh",
            "delete_issue",
            "Delete an issue by number",
            serde_json::json!({ "type": "object", "properties": { "number": { "type": "integer" } } }),
            BTreeSet::new(),
        );

        let tool = UcpGatewayServer::to_rmcp_tool(&schema);

        assert_eq!(tool.name.to_string(), "gh.delete_issue");
        assert_eq!(
            tool.description.as_ref().map(|d| d.to_string()),
            Some("Delete an issue by number".to_string())
        );
        assert!(tool.input_schema.contains_key("properties"));
    }

    #[test]
    fn to_rmcp_tool_falls_back_to_empty_object_for_non_object_schema() {
        let schema = ToolSchema::new("gh", "ping", "Ping", serde_json::json!(null), BTreeSet::new());
        let tool = UcpGatewayServer::to_rmcp_tool(&schema);
        assert!(tool.input_schema.is_empty());
    }
}
