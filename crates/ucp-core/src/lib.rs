//! Shared data model and configuration types for the gateway.
//!
//! Every other `ucp-*` crate depends on this one for the vocabulary they pass
//! across component boundaries (tool schemas, server descriptors, session
//! state, telemetry events, config). Keeping these types in one place is what
//! lets the Zoo, Router, Pool, and Session Manager reference each other's
//! concepts by value instead of by pointer.

pub mod config;
pub mod learning;
pub mod schema;
pub mod server;
pub mod session;
pub mod telemetry;

pub use config::GatewayConfig;
pub use learning::{BanditWeights, ToolBias};
pub use schema::ToolSchema;
pub use server::{BreakerState, ConnectionState, ServerDescriptor, Transport};
pub use session::{Message, Role, SessionState};
pub use telemetry::{RewardSignal, RoutingEvent, ToolCallEvent};
