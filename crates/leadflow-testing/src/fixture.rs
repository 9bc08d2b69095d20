//! JSON fixture loader.
//!
//! Loads files from `fixtures/` at the workspace root (e.g. sample automation
//! rules) for tests that assert against stored documents.

use std::path::{Path, PathBuf};

use serde_json::Value;

/// # Example
/// ```no_run
/// use leadflow_testing::fixture::Fixture;
/// let rule = Fixture::load("fixtures/rules/status_change_sms.json");
/// ```
pub struct Fixture;

impl Fixture {
    /// Load and parse a fixture JSON file at `workspace_root/path`.
    ///
    /// Panics if the file is missing or invalid JSON.
    pub fn load(relative_path: &str) -> Value {
        let full_path = workspace_root().join(relative_path);
        let contents = std::fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("fixture not found at {}: {}", full_path.display(), e));
        serde_json::from_str(&contents)
            .unwrap_or_else(|e| panic!("invalid JSON in fixture {}: {}", relative_path, e))
    }
}

/// Walk up from the crate under test to the directory holding `fixtures/`.
fn workspace_root() -> PathBuf {
    let start = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().expect("current dir"));
    start
        .ancestors()
        .find(|dir| dir.join("fixtures").is_dir())
        .map(Path::to_path_buf)
        .unwrap_or(start)
}
