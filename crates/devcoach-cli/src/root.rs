use devcoach_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the devcoach root directory.
///
/// Priority:
/// 1. `--root` flag / `DEVCOACH_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.devcoach/`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    [paths::DEVCOACH_DIR, ".git"]
        .iter()
        .find_map(|marker| find_upward(&cwd, marker))
        .unwrap_or(cwd)
}

/// Nearest ancestor of `start` (inclusive) containing a `marker` directory.
fn find_upward(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}
