use crate::domain;
use crate::error::RouterError;
use crate::learned::LearnedStore;
use crate::reward::{compute_reward, RewardInputs};
use crate::signals::ServerSignals;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use ucp_core::config::{BanditConfig, BiasLearningConfig, ExplorationType, RouterConfig};
use ucp_core::learning::BANDIT_FEATURE_DIM;
use ucp_core::session::SessionState;
use ucp_core::ToolSchema;
use ucp_zoo::{SearchMode, ToolZoo};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub selected: Vec<String>,
    pub scores: BTreeMap<String, f64>,
    pub strategy_used: String,
    pub exploration_triggered: bool,
    pub selection_time_ms: u64,
    pub candidate_count: usize,
    /// The rerank-time feature vector for each selected tool, keyed by its
    /// fully-qualified name. Callers must cache this alongside the slate and
    /// feed it back into `record_reward` for the matching tool, since the
    /// bandit can only learn from the features it actually scored on.
    pub feature_vectors: BTreeMap<String, [f64; BANDIT_FEATURE_DIM]>,
}

struct Candidate {
    schema: ToolSchema,
    base_score: f64,
}

/// Chooses a small, diverse, budget-respecting slate of tools for a query
/// (§4.2). Never raises: every internal failure falls through to a less
/// precise but always-available strategy.
pub struct Router {
    zoo: Arc<ToolZoo>,
    config: RouterConfig,
    bandit_config: BanditConfig,
    bias_config: BiasLearningConfig,
    learned: LearnedStore,
}

impl Router {
    pub fn new(
        zoo: Arc<ToolZoo>,
        config: RouterConfig,
        bandit_config: BanditConfig,
        bias_config: BiasLearningConfig,
    ) -> Self {
        Self {
            zoo,
            config,
            bandit_config,
            bias_config,
            learned: LearnedStore::default(),
        }
    }

    /// Record one reward observation and apply the corresponding bandit/bias
    /// update (§4.2 "Learning").
    pub async fn record_reward(
        &self,
        tool_name: &str,
        features: &[f64; BANDIT_FEATURE_DIM],
        inputs: RewardInputs,
    ) -> f64 {
        let reward = compute_reward(inputs, &self.bias_config);
        self.learned
            .apply_reward(tool_name, features, reward, &self.bandit_config, &self.bias_config)
            .await;
        reward
    }

    pub async fn route(
        &self,
        query: &str,
        session: &SessionState,
        max_tools: usize,
        max_context_tokens: u32,
        signals: &dyn ServerSignals,
    ) -> RoutingDecision {
        let started = Instant::now();
        let pool_size = self.config.effective_candidate_pool_size();

        let (candidates, strategy_used) = self.retrieve_candidates(query, pool_size).await;
        let candidate_count = candidates.len();

        let learned = self.learned.current();
        let domain = domain::classify(query);
        let query_tokens = ucp_zoo::keyword::tokenize(query);

        let mut all_features: BTreeMap<String, [f64; BANDIT_FEATURE_DIM]> = BTreeMap::new();
        let mut scored: Vec<(Candidate, f64)> = candidates
            .into_iter()
            .enumerate()
            .map(|(rank, candidate)| {
                let (rerank, features) = self.rerank(
                    &candidate,
                    rank,
                    candidate_count,
                    query,
                    &query_tokens,
                    domain,
                    session,
                    signals,
                    &learned,
                );
                all_features.insert(candidate.schema.name.clone(), features);
                (candidate, rerank)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.schema.name.cmp(&b.0.schema.name))
        });

        let (mut selected, remaining) = self.build_slate(scored, max_tools, max_context_tokens);
        let exploration_triggered = self.explore(&mut selected, remaining);

        let scores = selected
            .iter()
            .map(|(c, score)| (c.schema.name.clone(), *score))
            .collect();
        let feature_vectors = selected
            .iter()
            .filter_map(|(c, _)| all_features.get(&c.schema.name).map(|f| (c.schema.name.clone(), *f)))
            .collect();
        let selected_names = selected.into_iter().map(|(c, _)| c.schema.name).collect();

        RoutingDecision {
            selected: selected_names,
            scores,
            strategy_used,
            exploration_triggered,
            selection_time_ms: started.elapsed().as_millis() as u64,
            candidate_count,
            feature_vectors,
        }
    }

    async fn retrieve_candidates(&self, query: &str, pool_size: usize) -> (Vec<Candidate>, String) {
        match self.zoo.search(query, pool_size, SearchMode::Hybrid).await {
            Ok(hits) if !hits.is_empty() => {
                return (to_candidates(hits), "hybrid".to_string());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "hybrid candidate retrieval failed, falling back to keyword"),
        }

        match self.zoo.search(query, pool_size, SearchMode::Keyword).await {
            Ok(hits) if !hits.is_empty() => {
                return (to_candidates(hits), "keyword".to_string());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "keyword candidate retrieval failed, falling back to configured fallback tools"),
        }

        let fallback: Vec<Candidate> = self
            .config
            .fallback_tools
            .iter()
            .filter_map(|name| self.zoo.get(name).ok())
            .map(|schema| Candidate { schema, base_score: 0.0 })
            .collect();
        if !fallback.is_empty() {
            return (fallback, "fallback_tools".to_string());
        }

        let all: Vec<Candidate> = self
            .zoo
            .all_tools()
            .into_iter()
            .map(|schema| Candidate { schema, base_score: 0.0 })
            .collect();
        (all, "all_tools".to_string())
    }

    #[allow(clippy::too_many_arguments)]
    fn rerank(
        &self,
        candidate: &Candidate,
        rank: usize,
        candidate_count: usize,
        query: &str,
        query_tokens: &std::collections::BTreeSet<String>,
        domain: Option<&'static str>,
        session: &SessionState,
        signals: &dyn ServerSignals,
        learned: &crate::learned::LearnedParams,
    ) -> (f64, [f64; BANDIT_FEATURE_DIM]) {
        let tag_match = if query_tokens.is_empty() {
            0.0
        } else {
            let hits = query_tokens
                .iter()
                .filter(|t| candidate.schema.tags.contains(*t))
                .count();
            hits as f64 / query_tokens.len() as f64
        };

        let domain_match = match domain {
            Some(d) if candidate.schema.tags.contains(d) => 1.0,
            _ => 0.0,
        };

        let recent_cooccurrence = session
            .recent_tools
            .iter()
            .find(|t| t.name == candidate.schema.name)
            .map(|t| t.weight)
            .unwrap_or(0.0);

        let keyword_score = ucp_zoo::keyword::score(query, &candidate.schema);
        let normalized_semantic_rank = if candidate_count == 0 {
            0.0
        } else {
            1.0 - (rank as f64 / candidate_count as f64)
        };

        let features = [
            normalized_semantic_rank,
            keyword_score,
            recent_cooccurrence,
            tag_match,
            domain_match,
            signals.load(&candidate.schema.server_name),
            signals.breaker_value(&candidate.schema.server_name),
        ];

        let bandit_score = learned.bandit.score(&features);
        let tool_bias = learned.bias.get(&candidate.schema.name);

        let score = candidate.base_score
            + 0.15 * tag_match
            + 0.10 * domain_match
            + 0.08 * recent_cooccurrence
            + bandit_score
            + tool_bias;

        (score, features)
    }

    /// Greedy budgeted selection: descending rerank order, respecting
    /// `max_tools`, `max_context_tokens`, and `max_per_server`; a second pass
    /// fills up to `min_tools` by relaxing the token budget and per-server
    /// cap if the first pass could not reach it (§4.2).
    fn build_slate(
        &self,
        ranked: Vec<(Candidate, f64)>,
        max_tools: usize,
        max_context_tokens: u32,
    ) -> (Vec<(Candidate, f64)>, Vec<(Candidate, f64)>) {
        let mut selected = Vec::new();
        let mut per_server: BTreeMap<String, usize> = BTreeMap::new();
        let mut token_total: u64 = 0;
        let mut remaining = Vec::new();

        for (candidate, score) in ranked {
            if selected.len() >= max_tools {
                remaining.push((candidate, score));
                continue;
            }
            let server_count = per_server.get(&candidate.schema.server_name).copied().unwrap_or(0);
            let would_total = token_total + candidate.schema.schema_token_estimate as u64;
            if server_count >= self.config.max_per_server || would_total > max_context_tokens as u64 {
                remaining.push((candidate, score));
                continue;
            }
            token_total = would_total;
            *per_server.entry(candidate.schema.server_name.clone()).or_insert(0) += 1;
            selected.push((candidate, score));
        }

        if selected.len() < self.config.min_tools {
            let mut still_remaining = Vec::new();
            for (candidate, score) in remaining {
                if selected.len() < self.config.min_tools && selected.len() < max_tools {
                    selected.push((candidate, score));
                } else {
                    still_remaining.push((candidate, score));
                }
            }
            remaining = still_remaining;
        }

        (selected, remaining)
    }

    /// Epsilon-greedy or Thompson-sampled exploration over the built slate
    /// (§4.2, spec.md:100). On an epsilon trigger, the last slot is replaced
    /// with a uniformly-sampled candidate drawn from the unchosen pool so the
    /// returned slate can actually surface a tool the rerank step demoted.
    /// Returns whether exploration actually changed the slate.
    fn explore(&self, selected: &mut Vec<(Candidate, f64)>, mut remaining: Vec<(Candidate, f64)>) -> bool {
        if selected.is_empty() {
            return false;
        }
        let mut rng = rand::rng();
        match self.config.exploration_type {
            ExplorationType::Epsilon => {
                if rng.random::<f64>() < self.config.exploration_rate && !remaining.is_empty() {
                    let idx = rng.random_range(0..remaining.len());
                    let swapped_in = remaining.swap_remove(idx);
                    let last = selected.len() - 1;
                    selected[last] = swapped_in;
                    return true;
                }
                false
            }
            ExplorationType::Thompson => {
                let mut changed = false;
                for (_, score) in selected.iter_mut() {
                    let sampled = sample_normal(&mut rng, *score, 0.1);
                    if (sampled - *score).abs() > 0.05 {
                        changed = true;
                    }
                    *score = sampled;
                }
                selected.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
                changed
            }
        }
    }
}

fn to_candidates(hits: Vec<(ToolSchema, f64)>) -> Vec<Candidate> {
    hits.into_iter()
        .map(|(schema, base_score)| Candidate { schema, base_score })
        .collect()
}

/// Box-Muller sample from `Normal(mean, std)`, used for Thompson exploration
/// without pulling in a separate distributions crate.
fn sample_normal(rng: &mut impl Rng, mean: f64, std: f64) -> f64 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random_range(0.0..1.0);
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std * z0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::NoopSignals;
    use std::collections::BTreeSet;
    use ucp_zoo::{EmbeddingBackend, HashEmbeddingBackend, SqliteVectorStore, VectorStore};

    async fn build_router() -> Router {
        let embeddings = Arc::new(HashEmbeddingBackend::new(128));
        let vectors = Arc::new(SqliteVectorStore::connect(":memory:").await.unwrap());
        let zoo = Arc::new(ToolZoo::new(
            embeddings as Arc<dyn EmbeddingBackend>,
            vectors as Arc<dyn VectorStore>,
            Default::default(),
        ));
        zoo.index(vec![
            ToolSchema::new(
                "fs",
                "read_file",
                "Read a file from disk",
                serde_json::json!({"type": "object"}),
                BTreeSet::from(["files".to_string()]),
            ),
            ToolSchema::new(
                "cal",
                "create_event",
                "Schedule a calendar meeting",
                serde_json::json!({"type": "object"}),
                BTreeSet::from(["calendar".to_string()]),
            ),
        ])
        .await
        .unwrap();

        Router::new(
            zoo,
            RouterConfig {
                max_tools: 1,
                min_tools: 1,
                exploration_rate: 0.0,
                ..RouterConfig::default()
            },
            BanditConfig::default(),
            BiasLearningConfig::default(),
        )
    }

    #[tokio::test]
    async fn route_picks_domain_relevant_tool() {
        let router = build_router().await;
        let session = SessionState::new("s1");
        let decision = router
            .route("schedule a meeting", &session, 1, 4000, &NoopSignals)
            .await;
        assert_eq!(decision.selected, vec!["cal.create_event".to_string()]);
        assert_eq!(decision.strategy_used, "hybrid");
    }

    #[tokio::test]
    async fn route_never_exceeds_max_tools() {
        let router = build_router().await;
        let session = SessionState::new("s1");
        let decision = router
            .route("file or meeting", &session, 1, 4000, &NoopSignals)
            .await;
        assert!(decision.selected.len() <= 1);
    }

    fn candidate(name: &str, server: &str) -> Candidate {
        Candidate {
            schema: ToolSchema::new(
                server,
                name,
                "test tool",
                serde_json::json!({"type": "object"}),
                BTreeSet::new(),
            ),
            base_score: 0.0,
        }
    }

    #[tokio::test]
    async fn epsilon_exploration_swaps_in_an_unchosen_candidate() {
        let router = build_router().await;
        let mut selected = vec![(candidate("a", "fs"), 0.9)];
        let remaining = vec![(candidate("b", "fs"), 0.1)];

        let mut forced = router;
        forced.config.exploration_rate = 1.0;
        let triggered = forced.explore(&mut selected, remaining);

        assert!(triggered);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0.schema.name, "fs.b");
    }

    #[tokio::test]
    async fn epsilon_exploration_is_a_noop_with_no_unchosen_pool() {
        let router = build_router().await;
        let mut selected = vec![(candidate("a", "fs"), 0.9)];

        let mut forced = router;
        forced.config.exploration_rate = 1.0;
        let triggered = forced.explore(&mut selected, Vec::new());

        assert!(!triggered);
        assert_eq!(selected[0].0.schema.name, "fs.a");
    }

    #[tokio::test]
    async fn empty_index_falls_back_to_all_tools_strategy() {
        let embeddings = Arc::new(HashEmbeddingBackend::new(128));
        let vectors = Arc::new(SqliteVectorStore::connect(":memory:").await.unwrap());
        let zoo = Arc::new(ToolZoo::new(
            embeddings as Arc<dyn EmbeddingBackend>,
            vectors as Arc<dyn VectorStore>,
            Default::default(),
        ));
        let router = Router::new(
            zoo,
            RouterConfig::default(),
            BanditConfig::default(),
            BiasLearningConfig::default(),
        );
        let session = SessionState::new("s1");
        let decision = router
            .route("anything", &session, 4, 4000, &NoopSignals)
            .await;
        assert!(decision.selected.is_empty());
        assert_eq!(decision.strategy_used, "all_tools");
    }
}
