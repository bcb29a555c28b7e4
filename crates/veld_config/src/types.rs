//! Configuration types deserialized from `veld.toml`.

use serde::Deserialize;

/// The top-level project configuration parsed from `veld.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata (name, version, top module).
    pub project: ProjectMeta,
    /// Settings for the module-specialization pass.
    #[serde(default)]
    pub specialize: SpecializeConfig,
}

/// Core project metadata required in every `veld.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    pub version: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
    /// The name of the top-level module.
    pub top: String,
}

/// Settings consumed by the module-specialization pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpecializeConfig {
    /// Maximum depth of recursive module instantiation before the
    /// instantiation chain is abandoned with an error.
    pub max_recursion_depth: u32,
    /// Concatenated specialization names longer than this many characters
    /// are collapsed to a short synthetic suffix. Hierarchical-block names
    /// are always collapsed.
    pub long_name_threshold: usize,
    /// Forces value-token hash collisions. Self-test of the collision
    /// handling path; never enable in production builds.
    pub debug_collision: bool,
    /// Upper bound on generate-loop trip counts.
    pub max_generate_iterations: i64,
}

impl Default for SpecializeConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: 100,
            long_name_threshold: 30,
            debug_collision: false,
            max_generate_iterations: 10_000,
        }
    }
}
