use rmcp::RoleClient;
use rmcp::service::{Peer, RunningService};
use std::time::Instant;
use ucp_core::config::PoolConfig;
use ucp_core::server::{BreakerState, ConnectionState};

/// A live downstream session. Dropping the `RunningService` tears down the
/// transport (and, for stdio, kills the child process).
pub struct ConnectedSession {
    pub peer: Peer<RoleClient>,
    pub tools: Vec<rmcp::model::Tool>,
    _service: RunningService<RoleClient, rmcp::model::ClientInfo>,
}

impl ConnectedSession {
    pub fn new(
        service: RunningService<RoleClient, rmcp::model::ClientInfo>,
        tools: Vec<rmcp::model::Tool>,
    ) -> Self {
        let peer = service.peer().clone();
        Self {
            peer,
            tools,
            _service: service,
        }
    }
}

/// Per-server state: connection lifecycle, circuit breaker, and the live
/// session if connected. One instance per configured server, guarded by its
/// own `parking_lot::Mutex` — never a single pool-wide lock (§5).
pub struct ServerRuntime {
    pub connection: ConnectionState,
    pub breaker: BreakerState,
    pub session: Option<ConnectedSession>,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_calls: u32,
    pub last_error: Option<String>,
    /// Calls currently in flight to this server, guarded by the same mutex as
    /// every other field here. Feeds the Router's `ServerSignals::load`.
    pub in_flight: u32,
}

impl Default for ServerRuntime {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            breaker: BreakerState::Closed,
            session: None,
            consecutive_failures: 0,
            opened_at: None,
            half_open_calls: 0,
            last_error: None,
            in_flight: 0,
        }
    }
}

impl ServerRuntime {
    /// Whether a new call is allowed right now. Transitions Open -> HalfOpen
    /// once `open_timeout_secs` has elapsed, per §4.3.
    pub fn allow_call(&mut self, config: &PoolConfig) -> bool {
        match self.breaker {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => self.half_open_calls < config.half_open_max_calls,
            BreakerState::Open => {
                let elapsed = self
                    .opened_at
                    .map(|t| t.elapsed().as_secs())
                    .unwrap_or(u64::MAX);
                if elapsed >= config.open_timeout_secs {
                    self.breaker = BreakerState::HalfOpen;
                    self.half_open_calls = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn retry_after_secs(&self, config: &PoolConfig) -> u64 {
        let elapsed = self
            .opened_at
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0);
        config.open_timeout_secs.saturating_sub(elapsed)
    }

    pub fn note_attempt(&mut self) {
        if self.breaker == BreakerState::HalfOpen {
            self.half_open_calls += 1;
        }
    }

    /// On a Closed breaker this just clears the failure streak. On a
    /// HalfOpen breaker it only closes once `half_open_max_calls` consecutive
    /// trial calls have succeeded (§4.3); `record_failure` already reopens
    /// immediately on any failure in between, so `half_open_calls` (attempts
    /// so far this half-open window) doubles as the consecutive-success count.
    pub fn record_success(&mut self, config: &PoolConfig) {
        self.consecutive_failures = 0;
        self.last_error = None;
        match self.breaker {
            BreakerState::HalfOpen => {
                if self.half_open_calls >= config.half_open_max_calls {
                    self.breaker = BreakerState::Closed;
                    self.opened_at = None;
                    self.half_open_calls = 0;
                }
            }
            BreakerState::Closed | BreakerState::Open => {
                self.breaker = BreakerState::Closed;
                self.opened_at = None;
                self.half_open_calls = 0;
            }
        }
    }

    pub fn record_failure(&mut self, config: &PoolConfig, error: String) {
        self.last_error = Some(error);
        match self.breaker {
            BreakerState::HalfOpen => {
                self.breaker = BreakerState::Open;
                self.opened_at = Some(Instant::now());
                self.half_open_calls = 0;
            }
            BreakerState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= config.failure_threshold {
                    self.breaker = BreakerState::Open;
                    self.opened_at = Some(Instant::now());
                }
            }
            BreakerState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(half_open_max_calls: u32) -> PoolConfig {
        PoolConfig {
            half_open_max_calls,
            ..PoolConfig::default()
        }
    }

    #[test]
    fn half_open_requires_consecutive_successes_before_closing() {
        let config = config(3);
        let mut runtime = ServerRuntime {
            breaker: BreakerState::HalfOpen,
            ..Default::default()
        };

        runtime.note_attempt();
        runtime.record_success(&config);
        assert_eq!(runtime.breaker, BreakerState::HalfOpen);

        runtime.note_attempt();
        runtime.record_success(&config);
        assert_eq!(runtime.breaker, BreakerState::HalfOpen);

        runtime.note_attempt();
        runtime.record_success(&config);
        assert_eq!(runtime.breaker, BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_immediately_regardless_of_prior_successes() {
        let config = config(3);
        let mut runtime = ServerRuntime {
            breaker: BreakerState::HalfOpen,
            ..Default::default()
        };

        runtime.note_attempt();
        runtime.record_success(&config);
        runtime.note_attempt();
        runtime.record_failure(&config, "boom".to_string());

        assert_eq!(runtime.breaker, BreakerState::Open);
    }
}
