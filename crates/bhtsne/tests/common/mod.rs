//! In-process engines that speak the file protocol, for driving the full pipeline
//! without the native binary.

#![allow(dead_code)]

use bhtsne::{
    CancelToken, Engine, ExchangeFiles, RawRecord, RawResult, Request, Result, TsneError,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

fn request_in(workdir: &Path) -> Result<Request> {
    Request::read_from(&workdir.join(ExchangeFiles::default().request))
}

fn write_result(workdir: &Path, result: &RawResult) -> Result<()> {
    result.write_to(&workdir.join(ExchangeFiles::default().result))
}

/// Returns every sample unchanged (dims = input dims), tagged with its own index.
pub struct EchoEngine;

impl Engine for EchoEngine {
    fn run(&self, workdir: &Path, _verbose: bool, _cancel: Option<&CancelToken>) -> Result<()> {
        let request = request_in(workdir)?;
        let records = request
            .samples()
            .enumerate()
            .map(|(i, s)| RawRecord {
                origin: i as i32,
                vector: s.to_vec(),
            })
            .collect();
        write_result(
            workdir,
            &RawResult {
                dims: request.dims(),
                records,
                costs: vec![0.0; request.n_samples()],
            },
        )
    }
}

/// Echoes samples back in the order given by `permute(n)`, tagged with origin indices.
pub struct ShuffleEngine {
    pub permute: fn(usize) -> Vec<usize>,
}

impl ShuffleEngine {
    pub fn reversed() -> Self {
        Self {
            permute: |n| (0..n).rev().collect(),
        }
    }

    /// Odd indices first, then even ones.
    pub fn interleaved() -> Self {
        Self {
            permute: |n| {
                let odd = (0..n).filter(|i| i % 2 == 1);
                let even = (0..n).filter(|i| i % 2 == 0);
                odd.chain(even).collect()
            },
        }
    }
}

impl Engine for ShuffleEngine {
    fn run(&self, workdir: &Path, _verbose: bool, _cancel: Option<&CancelToken>) -> Result<()> {
        let request = request_in(workdir)?;
        let records = (self.permute)(request.n_samples())
            .into_iter()
            .map(|i| RawRecord {
                origin: i as i32,
                vector: request.sample(i).map(<[f64]>::to_vec).unwrap_or_default(),
            })
            .collect();
        write_result(
            workdir,
            &RawResult {
                dims: request.dims(),
                records,
                costs: vec![1.0; request.n_samples()],
            },
        )
    }
}

/// Writes a fixed result regardless of the request.
pub struct FixedEngine {
    pub result: RawResult,
}

impl Engine for FixedEngine {
    fn run(&self, workdir: &Path, _verbose: bool, _cancel: Option<&CancelToken>) -> Result<()> {
        write_result(workdir, &self.result)
    }
}

/// Behaves like a binary that exits with status 1.
pub struct FailingEngine;

impl Engine for FailingEngine {
    fn run(&self, _workdir: &Path, _verbose: bool, _cancel: Option<&CancelToken>) -> Result<()> {
        Err(TsneError::EngineExecution("engine exited with exit status: 1".to_string()))
    }
}

/// Exits successfully without producing a result.
pub struct SilentEngine;

impl Engine for SilentEngine {
    fn run(&self, _workdir: &Path, _verbose: bool, _cancel: Option<&CancelToken>) -> Result<()> {
        Ok(())
    }
}

/// Panics halfway through a run.
pub struct PanickingEngine;

impl Engine for PanickingEngine {
    fn run(&self, _workdir: &Path, _verbose: bool, _cancel: Option<&CancelToken>) -> Result<()> {
        panic!("engine crashed");
    }
}

/// Wraps an engine and remembers every workspace it was run in, plus the decoded request.
pub struct Recording<E> {
    pub inner: E,
    pub runs: Mutex<Vec<(PathBuf, Request)>>,
}

impl<E> Recording<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            runs: Mutex::new(Vec::new()),
        }
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    pub fn workdirs(&self) -> Vec<PathBuf> {
        self.runs.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.runs.lock().unwrap().last().map(|(_, r)| r.clone())
    }
}

impl<E: Engine> Engine for Recording<E> {
    fn run(&self, workdir: &Path, verbose: bool, cancel: Option<&CancelToken>) -> Result<()> {
        let request = request_in(workdir)?;
        self.runs
            .lock()
            .unwrap()
            .push((workdir.to_path_buf(), request));
        self.inner.run(workdir, verbose, cancel)
    }
}

/// Entries left under a workspace root.
pub fn leftover_entries(root: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}
