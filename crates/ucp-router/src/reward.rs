//! Canonical reward computation (§4.2/§6): success, latency penalty, context
//! cost penalty, and a same-name-retry-after-failure follow-up penalty,
//! clamped to `[-1, 1]`.

use ucp_core::config::BiasLearningConfig;

#[derive(Debug, Clone, Copy)]
pub struct RewardInputs {
    pub success: bool,
    pub exec_ms: f64,
    pub schema_tokens: u32,
    /// True if this call is the same tool name retried within 2s of a
    /// preceding failure in the same session.
    pub is_followup_retry: bool,
}

pub fn compute_reward(inputs: RewardInputs, config: &BiasLearningConfig) -> f64 {
    let success_reward = if inputs.success { 1.0 } else { -1.0 };
    let latency_penalty = -(inputs.exec_ms / config.latency_scale).min(config.latency_cap);
    let context_cost_penalty =
        -((inputs.schema_tokens as f64) / config.ctx_scale).min(config.ctx_cap);
    let followup_penalty = if inputs.is_followup_retry { -0.2 } else { 0.0 };

    (success_reward + latency_penalty + context_cost_penalty + followup_penalty).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BiasLearningConfig {
        BiasLearningConfig {
            learning_rate: 0.1,
            decay: 0.01,
            max_bias: 0.5,
            latency_scale: 1000.0,
            latency_cap: 0.3,
            ctx_scale: 2000.0,
            ctx_cap: 0.2,
        }
    }

    #[test]
    fn successful_fast_call_scores_near_one() {
        let reward = compute_reward(
            RewardInputs {
                success: true,
                exec_ms: 10.0,
                schema_tokens: 20,
                is_followup_retry: false,
            },
            &config(),
        );
        assert!(reward > 0.9);
    }

    #[test]
    fn failed_slow_call_is_clamped_at_minus_one() {
        let reward = compute_reward(
            RewardInputs {
                success: false,
                exec_ms: 50_000.0,
                schema_tokens: 10_000,
                is_followup_retry: true,
            },
            &config(),
        );
        assert_eq!(reward, -1.0);
    }

    #[test]
    fn followup_retry_penalty_lowers_reward() {
        let base = config();
        let without_retry = compute_reward(
            RewardInputs {
                success: true,
                exec_ms: 100.0,
                schema_tokens: 100,
                is_followup_retry: false,
            },
            &base,
        );
        let with_retry = compute_reward(
            RewardInputs {
                success: true,
                exec_ms: 100.0,
                schema_tokens: 100,
                is_followup_retry: true,
            },
            &base,
        );
        assert!(with_retry < without_retry);
    }
}
