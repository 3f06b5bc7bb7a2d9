//! Query-to-tool-slate routing (§4.2): candidate retrieval, rerank, a
//! budgeted greedy slate, exploration, and online bandit/bias learning.

pub mod domain;
pub mod error;
pub mod learned;
pub mod reward;
pub mod router;
pub mod signals;

pub use error::RouterError;
pub use learned::{LearnedParams, LearnedStore};
pub use reward::{compute_reward, RewardInputs};
pub use router::{Router, RoutingDecision};
pub use signals::{NoopSignals, ServerSignals};
