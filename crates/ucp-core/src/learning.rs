use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dimensionality of the bandit's context feature vector (§4.2): normalized
/// semantic rank, keyword score, recency decay, tag overlap, domain match,
/// server load, breaker state.
pub const BANDIT_FEATURE_DIM: usize = 7;

/// Single shared linear scorer over the bandit feature vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanditWeights {
    pub weights: [f64; BANDIT_FEATURE_DIM],
}

impl Default for BanditWeights {
    fn default() -> Self {
        Self {
            weights: [0.0; BANDIT_FEATURE_DIM],
        }
    }
}

impl BanditWeights {
    /// Dot product of weights with the context vector, squashed through a
    /// logistic so the rerank contribution stays bounded in `(-1, 1)`.
    pub fn score(&self, features: &[f64; BANDIT_FEATURE_DIM]) -> f64 {
        let dot: f64 = self
            .weights
            .iter()
            .zip(features.iter())
            .map(|(w, f)| w * f)
            .sum();
        2.0 / (1.0 + (-dot).exp()) - 1.0
    }

    /// One SGD step with L2 regularization, `reward` as the target.
    pub fn update(&mut self, features: &[f64; BANDIT_FEATURE_DIM], reward: f64, lr: f64, l2: f64) {
        let prediction = self.score(features);
        let error = reward - prediction;
        for (w, f) in self.weights.iter_mut().zip(features.iter()) {
            *w += lr * (error * f - l2 * *w);
        }
    }
}

/// Per-tool scalar bias, clamped to `±max_bias`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolBias {
    pub bias: BTreeMap<String, f64>,
}

impl ToolBias {
    pub fn get(&self, tool_name: &str) -> f64 {
        self.bias.get(tool_name).copied().unwrap_or(0.0)
    }

    /// `tool_bias[name] ← clamp(tool_bias[name] + lr·reward − decay·tool_bias[name], ±max_bias)`
    pub fn update(&mut self, tool_name: &str, reward: f64, lr: f64, decay: f64, max_bias: f64) {
        let entry = self.bias.entry(tool_name.to_string()).or_insert(0.0);
        let updated = *entry + lr * reward - decay * *entry;
        *entry = updated.clamp(-max_bias, max_bias);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bias_stays_within_clamp() {
        let mut bias = ToolBias::default();
        for _ in 0..1000 {
            bias.update("calendar.create_event", 1.0, 0.5, 0.01, 0.5);
        }
        assert!(bias.get("calendar.create_event") <= 0.5);
    }

    #[test]
    fn positive_reward_increases_cold_bias() {
        let mut bias = ToolBias::default();
        assert_eq!(bias.get("calendar.create_event"), 0.0);
        bias.update("calendar.create_event", 1.0, 0.1, 0.01, 0.5);
        assert!(bias.get("calendar.create_event") > 0.0);
    }

    #[test]
    fn bandit_score_is_bounded() {
        let mut weights = BanditWeights::default();
        let features = [10.0; BANDIT_FEATURE_DIM];
        weights.update(&features, 1.0, 0.9, 0.0);
        let score = weights.score(&features);
        assert!(score > -1.0 && score < 1.0);
    }
}
