use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const VYUHA_DIR: &str = ".vyuha";

pub const CONFIG_FILE: &str = ".vyuha/config.yaml";
pub const STATE_FILE: &str = ".vyuha/spacecraft.yaml";
pub const EVENTS_FILE: &str = ".vyuha/events.jsonl";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn vyuha_dir(root: &Path) -> PathBuf {
    root.join(VYUHA_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn events_path(root: &Path) -> PathBuf {
    root.join(EVENTS_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_vyuha_dir() {
        let root = Path::new("/srv/agent");
        assert!(config_path(root).starts_with(vyuha_dir(root)));
        assert!(state_path(root).starts_with(vyuha_dir(root)));
        assert!(events_path(root).starts_with(vyuha_dir(root)));
    }
}
