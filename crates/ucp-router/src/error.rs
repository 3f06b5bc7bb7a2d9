use thiserror::Error;

/// Internal routing failures. `Router::route` never surfaces these to
/// callers — it catches them and falls through the chain described in §4.2.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("tool zoo error: {0}")]
    Zoo(#[from] ucp_zoo::ZooError),
    #[error("candidate set empty")]
    EmptyCandidates,
}
