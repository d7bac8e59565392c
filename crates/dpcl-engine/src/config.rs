//! Engine configuration.
//!
//! The engine itself reads nothing from the environment; the shell
//! resolves CLI arguments and `DPCL_*` variables into an
//! [`EngineConfig`] and hands it over.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default step budget for one cascade.
///
/// Well-formed programs terminate naturally; the budget is the
/// safety net against reactive loops.
pub const DEFAULT_STEP_BUDGET: usize = 10_000;

/// Engine configuration.
///
/// # Example
///
/// ```
/// use dpcl_engine::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_step_budget(500)
///     .with_import_dir("programs");
/// assert_eq!(config.step_budget, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on dispatches per cascade; exceeding it surfaces
    /// a cascade-overflow error.
    pub step_budget: usize,
    /// Directories searched (in order) for `import` targets, after
    /// the importing file's own directory.
    pub import_dirs: Vec<PathBuf>,
}

impl EngineConfig {
    /// Replaces the step budget.
    #[must_use]
    pub fn with_step_budget(mut self, budget: usize) -> Self {
        self.step_budget = budget;
        self
    }

    /// Appends an import search directory.
    #[must_use]
    pub fn with_import_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.import_dirs.push(dir.into());
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_budget: DEFAULT_STEP_BUDGET,
            import_dirs: Vec::new(),
        }
    }
}
