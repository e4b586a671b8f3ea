//! End-to-end embedding run: validate, exchange files with the engine, reorder.

use crate::config::{EngineConfig, TsneParams};
use crate::engine::{CancelToken, Engine, ProcessEngine};
use crate::error::{Result, TsneError};
use crate::protocol::{ExchangeFiles, RawResult, Request};
use crate::reorder::reorder;
use crate::stream::Embedding;
use crate::workspace::Workspace;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Embeds sample batches through an [`Engine`].
///
/// Every call is independent: it gets its own workspace, runs the engine once and
/// either returns the full ordered embedding or fails as a whole.
#[derive(Debug)]
pub struct BhTsne<E = ProcessEngine> {
    engine: E,
    files: ExchangeFiles,
    workspace_root: Option<PathBuf>,
    verbose: bool,
}

impl BhTsne<ProcessEngine> {
    /// Driver for the engine binary described by `config`.
    pub fn new(config: EngineConfig) -> Self {
        let engine = ProcessEngine::new(config.binary).with_timeout(config.timeout);
        let mut tsne = Self::with_engine(engine).with_files(config.files);
        tsne.workspace_root = config.workspace_root;
        tsne
    }

    /// Driver for the engine binary found by [`EngineConfig::discover`].
    pub fn discover() -> Result<Self> {
        EngineConfig::discover(None).map(Self::new)
    }
}

impl<E: Engine> BhTsne<E> {
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine,
            files: ExchangeFiles::default(),
            workspace_root: None,
            verbose: false,
        }
    }

    pub fn with_files(mut self, files: ExchangeFiles) -> Self {
        self.files = files;
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Forward the engine's progress output to stderr.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    /// Embed `samples`, taking the dimensionality from the first sample.
    ///
    /// The returned sequence is index-aligned with `samples`.
    pub fn embed<S: AsRef<[f64]>>(
        &self,
        samples: &[S],
        params: &TsneParams,
    ) -> Result<Embedding> {
        let request = Request::new(samples, params)?;
        self.embed_request(&request)
    }

    /// Like [`embed`](Self::embed), killing the engine when `cancel` is tripped.
    pub fn embed_with<S: AsRef<[f64]>>(
        &self,
        samples: &[S],
        params: &TsneParams,
        cancel: &CancelToken,
    ) -> Result<Embedding> {
        let request = Request::new(samples, params)?;
        self.embed_request_with(&request, cancel)
    }

    /// Run an already validated request.
    pub fn embed_request(&self, request: &Request) -> Result<Embedding> {
        self.run(request, None)
    }

    /// Run an already validated request under `cancel`.
    ///
    /// The token only affects this call: a tripped token fails it with
    /// [`TsneError::Cancelled`](crate::TsneError::Cancelled) and later calls are unaffected.
    pub fn embed_request_with(
        &self,
        request: &Request,
        cancel: &CancelToken,
    ) -> Result<Embedding> {
        if cancel.is_cancelled() {
            return Err(TsneError::Cancelled);
        }
        self.run(request, Some(cancel))
    }

    fn run(&self, request: &Request, cancel: Option<&CancelToken>) -> Result<Embedding> {
        let start = Instant::now();
        let workspace = Workspace::acquire(self.workspace_root.as_deref(), &self.files)?;

        let outcome = self.exchange(&workspace, request, cancel);
        let raw = workspace.release(outcome)?;

        if raw.dims != request.output_dims() {
            warn!(
                "Engine returned {}-dimensional embedding, {} was requested",
                raw.dims,
                request.output_dims()
            );
        }

        let dims = raw.dims;
        let rows = reorder(raw)?;

        info!(
            "Embedded {} samples from {} to {} dimensions in {}ms",
            rows.len(),
            request.dims(),
            dims,
            start.elapsed().as_millis()
        );

        Ok(Embedding::new(dims, rows))
    }

    fn exchange(
        &self,
        workspace: &Workspace,
        request: &Request,
        cancel: Option<&CancelToken>,
    ) -> Result<RawResult> {
        request.write_to(&workspace.request_path())?;
        self.engine.run(workspace.path(), self.verbose, cancel)?;
        RawResult::read_from(&workspace.result_path(), request.n_samples())
    }
}

/// Embed `samples` with the discovered engine binary.
///
/// ```rust,no_run
/// use bhtsne::TsneParams;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let samples = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
/// let params = TsneParams::default().with_perplexity(0.1);
///
/// for point in bhtsne::embed(&samples, &params, false)? {
///     println!("{:?}", point);
/// }
/// # Ok(())
/// # }
/// ```
pub fn embed<S: AsRef<[f64]>>(
    samples: &[S],
    params: &TsneParams,
    verbose: bool,
) -> Result<Embedding> {
    // Validate before looking for the binary so bad input is reported as such
    let request = Request::new(samples, params)?;
    BhTsne::<ProcessEngine>::discover()?.verbose(verbose).embed_request(&request)
}
