//! Driver for the Barnes-Hut t-SNE engine
//!
//! The embedding itself is computed by a separately compiled engine binary (`bh_tsne`).
//! This crate owns everything around it:
//!
//! - **protocol**: binary request and result files exchanged with the engine
//! - **workspace**: transient, uniquely named exchange directory, removed on every exit path
//! - **engine**: subprocess invocation with exit-status checks, timeout and cancellation
//! - **reorder**: restores input order from the origin indices the engine returns
//! - **stream**: single-pass, input-ordered sequence of embedding vectors
//!
//! # Example
//!
//! ```rust,no_run
//! use bhtsne::{BhTsne, EngineConfig, TsneParams};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::discover(None)?.with_timeout(Duration::from_secs(600));
//! let tsne = BhTsne::new(config).verbose(true);
//!
//! let samples = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
//! let params = TsneParams::default().with_perplexity(0.5).with_seed(42);
//!
//! let points: Vec<Vec<f64>> = tsne.embed(&samples, &params)?.collect();
//! assert_eq!(points.len(), samples.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod reorder;
pub mod runner;
pub mod stream;
pub mod tracing;
pub mod workspace;

// Re-export main types
pub use config::{EngineConfig, TsneParams};
pub use engine::{CancelToken, Engine, ProcessEngine};
pub use error::{Result, TsneError};
pub use protocol::{ExchangeFiles, RawRecord, RawResult, Request};
pub use runner::{embed, BhTsne};
pub use stream::Embedding;
pub use workspace::Workspace;
