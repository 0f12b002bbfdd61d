use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const DEVCOACH_DIR: &str = ".devcoach";
pub const CONFIG_FILE: &str = ".devcoach/config.yaml";
pub const STATE_FILE: &str = ".devcoach/state.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn devcoach_dir(root: &Path) -> PathBuf {
    root.join(DEVCOACH_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}
