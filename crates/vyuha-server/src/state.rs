use std::path::PathBuf;
use std::sync::Arc;

use vyuha_core::agent::Agent;

/// Shared per-server state. The agent owns the ledger and event store, so
/// every request sees the same single-writer discipline.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub agent: Arc<Agent>,
}

impl AppState {
    pub fn new(agent: Agent) -> Self {
        Self {
            root: agent.root().to_path_buf(),
            agent: Arc::new(agent),
        }
    }
}
