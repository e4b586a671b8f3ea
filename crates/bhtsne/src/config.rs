//! Hyperparameters and engine configuration

use crate::error::{Result, TsneError};
use crate::protocol::ExchangeFiles;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default output dimensionality (van der Maaten, 2013)
pub const DEFAULT_OUTPUT_DIMS: usize = 2;
/// Default perplexity (van der Maaten, 2013)
pub const DEFAULT_PERPLEXITY: f64 = 30.0;
/// Default Barnes-Hut accuracy (van der Maaten, 2013)
pub const DEFAULT_THETA: f64 = 0.5;

/// Environment variable consulted when no engine path is given explicitly.
pub const ENGINE_ENV_VAR: &str = "BH_TSNE_BIN";

/// File name of the engine binary when looked up next to the executable.
pub const ENGINE_BINARY_NAME: &str = "bh_tsne";

/// Algorithm hyperparameters sent to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TsneParams {
    /// Dimensionality of the produced embedding
    pub output_dims: usize,
    /// Effective number of neighbours per sample
    pub perplexity: f64,
    /// Barnes-Hut accuracy, 0.0 selects exact t-SNE
    pub theta: f64,
    /// Engine RNG seed; `None` lets the engine pick its own entropy
    pub seed: Option<i32>,
}

impl Default for TsneParams {
    fn default() -> Self {
        Self {
            output_dims: DEFAULT_OUTPUT_DIMS,
            perplexity: DEFAULT_PERPLEXITY,
            theta: DEFAULT_THETA,
            seed: None,
        }
    }
}

impl TsneParams {
    pub fn with_output_dims(mut self, output_dims: usize) -> Self {
        self.output_dims = output_dims;
        self
    }

    pub fn with_perplexity(mut self, perplexity: f64) -> Self {
        self.perplexity = perplexity;
        self
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_seed(mut self, seed: i32) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Whether the engine will run the exact, non-approximated algorithm.
    pub fn is_exact(&self) -> bool {
        self.theta == 0.0
    }

    /// Check ranges independent of the sample batch.
    pub fn validate(&self) -> Result<()> {
        if self.output_dims == 0 {
            return Err(TsneError::malformed("output_dims must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.theta) {
            return Err(TsneError::malformed(format!(
                "theta must lie in [0, 1], got {}",
                self.theta
            )));
        }
        if !self.perplexity.is_finite() || self.perplexity <= 0.0 {
            return Err(TsneError::malformed(format!(
                "perplexity must be a positive finite number, got {}",
                self.perplexity
            )));
        }
        Ok(())
    }
}

/// How and where the engine binary is run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the engine executable
    pub binary: PathBuf,
    /// File names the engine reads and writes inside its working directory
    pub files: ExchangeFiles,
    /// Kill the engine if it runs longer than this
    pub timeout: Option<Duration>,
    /// Parent directory for exchange workspaces (system temp dir when `None`)
    pub workspace_root: Option<PathBuf>,
}

impl EngineConfig {
    /// Configuration for a known engine path with default file names and no timeout.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            files: ExchangeFiles::default(),
            timeout: None,
            workspace_root: None,
        }
    }

    /// Locates the engine binary.
    ///
    /// An explicit path is used as given and fails if it is not a file. Otherwise checks
    /// in order:
    /// 1. `$BH_TSNE_BIN` environment variable
    /// 2. `bh_tsne` next to the running executable
    /// 3. `bh_tsne` in the current directory
    pub fn discover(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            if !path.is_file() {
                return Err(TsneError::EngineExecution(format!(
                    "engine binary {} not found",
                    path.display()
                )));
            }
            return Self::resolve(path);
        }

        let mut candidates: Vec<PathBuf> = Vec::new();

        if let Some(env_path) = std::env::var_os(ENGINE_ENV_VAR) {
            if !env_path.is_empty() {
                candidates.push(PathBuf::from(env_path));
            }
        }

        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            candidates.push(dir.join(ENGINE_BINARY_NAME));
        }

        candidates.push(PathBuf::from(ENGINE_BINARY_NAME));

        if let Some(candidate) = candidates.iter().find(|c| c.is_file()) {
            return Self::resolve(candidate);
        }

        Err(TsneError::EngineExecution(format!(
            "engine binary not found (checked: {}); have you forgotten to compile it?",
            candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    fn resolve(candidate: &Path) -> Result<Self> {
        // The engine runs with the workspace as cwd, so relative paths would break
        let binary = std::path::absolute(candidate).map_err(|e| {
            TsneError::EngineExecution(format!(
                "cannot resolve engine path {}: {}",
                candidate.display(),
                e
            ))
        })?;
        Ok(Self::new(binary))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn with_files(mut self, files: ExchangeFiles) -> Self {
        self.files = files;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = TsneParams::default();
        assert_eq!(params.output_dims, 2);
        assert_eq!(params.perplexity, 30.0);
        assert_eq!(params.theta, 0.5);
        assert!(params.seed.is_none());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_exact_mode() {
        assert!(TsneParams::default().with_theta(0.0).is_exact());
        assert!(!TsneParams::default().is_exact());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let bad = [
            TsneParams::default().with_output_dims(0),
            TsneParams::default().with_theta(1.5),
            TsneParams::default().with_theta(-0.1),
            TsneParams::default().with_perplexity(0.0),
            TsneParams::default().with_perplexity(f64::NAN),
        ];
        for params in bad {
            let err = params.validate().unwrap_err();
            assert!(matches!(err, TsneError::MalformedInput(_)), "{params:?}");
        }
    }

    #[test]
    fn test_params_from_partial_json() {
        let params: TsneParams =
            serde_json::from_str(r#"{"perplexity": 5.0, "seed": 42}"#).unwrap();
        assert_eq!(params.perplexity, 5.0);
        assert_eq!(params.seed, Some(42));
        assert_eq!(params.output_dims, DEFAULT_OUTPUT_DIMS);
        assert_eq!(params.theta, DEFAULT_THETA);
    }

    #[test]
    fn test_discover_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let engine = dir.path().join("custom_engine");
        std::fs::write(&engine, b"").unwrap();

        let config = EngineConfig::discover(Some(&engine)).unwrap();
        assert_eq!(config.binary, engine);
        assert_eq!(config.files, ExchangeFiles::default());
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_missing_explicit_path_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no_such_engine");

        let err = EngineConfig::discover(Some(&missing)).unwrap_err();
        match err {
            TsneError::EngineExecution(msg) => {
                assert!(msg.contains("no_such_engine"));
                assert!(!msg.contains("checked:"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            EngineConfig::discover(Some(dir.path())),
            Err(TsneError::EngineExecution(_))
        ));
    }
}
