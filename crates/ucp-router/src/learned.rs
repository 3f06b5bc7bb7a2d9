//! Bandit weights and per-tool bias, read lock-free via snapshot and updated
//! on a single serialized writer lane (§4.2/§5).

use std::sync::Arc;
use ucp_core::config::{BanditConfig, BiasLearningConfig};
use ucp_core::learning::{BanditWeights, ToolBias, BANDIT_FEATURE_DIM};

#[derive(Debug, Clone, Default)]
pub struct LearnedParams {
    pub bandit: BanditWeights,
    pub bias: ToolBias,
}

pub struct LearnedStore {
    snapshot: parking_lot::RwLock<Arc<LearnedParams>>,
    writer: tokio::sync::Mutex<()>,
}

impl Default for LearnedStore {
    fn default() -> Self {
        Self {
            snapshot: parking_lot::RwLock::new(Arc::new(LearnedParams::default())),
            writer: tokio::sync::Mutex::new(()),
        }
    }
}

impl LearnedStore {
    /// Lock-free read of the current parameters.
    pub fn current(&self) -> Arc<LearnedParams> {
        self.snapshot.read().clone()
    }

    /// Apply one reward signal: a bandit SGD step plus a tool-bias update.
    /// Updates are serialized through `writer`; readers never block on this.
    pub async fn apply_reward(
        &self,
        tool_name: &str,
        features: &[f64; BANDIT_FEATURE_DIM],
        reward: f64,
        bandit_config: &BanditConfig,
        bias_config: &BiasLearningConfig,
    ) {
        let _guard = self.writer.lock().await;
        let current = self.current();
        let mut next = (*current).clone();
        next.bandit
            .update(features, reward, bandit_config.learning_rate, bandit_config.l2);
        next.bias.update(
            tool_name,
            reward,
            bias_config.learning_rate,
            bias_config.decay,
            bias_config.max_bias,
        );
        *self.snapshot.write() = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn apply_reward_updates_bias_and_bandit() {
        let store = LearnedStore::default();
        let bandit_config = BanditConfig::default();
        let bias_config = BiasLearningConfig::default();
        let features = [0.5; BANDIT_FEATURE_DIM];

        store
            .apply_reward("fs.read_file", &features, 1.0, &bandit_config, &bias_config)
            .await;

        let params = store.current();
        assert!(params.bias.get("fs.read_file") > 0.0);
    }
}
