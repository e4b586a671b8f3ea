//! Request file: batch header, sample matrix and optional seed

use super::{wire_i32, WireReader, F64_SIZE, I32_SIZE};
use crate::config::TsneParams;
use crate::error::{Result, TsneError};
use std::path::Path;
use tracing::{debug, warn};

/// Header bytes: N, D, theta, perplexity, output_dims
const HEADER_SIZE: usize = I32_SIZE * 3 + F64_SIZE * 2;

/// A validated batch ready to be handed to the engine.
///
/// Samples are kept flattened in row-major order, which is exactly how they go on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    n_samples: usize,
    dims: usize,
    theta: f64,
    perplexity: f64,
    output_dims: usize,
    seed: Option<i32>,
    data: Vec<f64>,
}

impl Request {
    /// Build a request, taking the dimensionality from the first sample.
    pub fn new<S: AsRef<[f64]>>(samples: &[S], params: &TsneParams) -> Result<Self> {
        let dims = samples
            .first()
            .map(|s| s.as_ref().len())
            .ok_or_else(|| TsneError::malformed("sample batch is empty"))?;
        Self::with_dims(samples, dims, params)
    }

    /// Build a request for samples that must all have exactly `dims` values.
    ///
    /// Nothing is written anywhere; a failure here means no engine will be started.
    pub fn with_dims<S: AsRef<[f64]>>(
        samples: &[S],
        dims: usize,
        params: &TsneParams,
    ) -> Result<Self> {
        params.validate()?;

        if samples.is_empty() {
            return Err(TsneError::malformed("sample batch is empty"));
        }
        if dims == 0 {
            return Err(TsneError::malformed("samples must have at least one dimension"));
        }

        let n_samples = samples.len();
        wire_i32("sample count", n_samples)?;
        wire_i32("sample dimensionality", dims)?;
        wire_i32("output_dims", params.output_dims)?;

        for (i, sample) in samples.iter().enumerate() {
            let sample = sample.as_ref();
            if sample.len() != dims {
                return Err(TsneError::malformed(format!(
                    "sample {} has {} values, expected {}",
                    i,
                    sample.len(),
                    dims
                )));
            }
            if let Some(j) = sample.iter().position(|v| !v.is_finite()) {
                return Err(TsneError::malformed(format!(
                    "sample {} has a non-finite value at position {}",
                    i, j
                )));
            }
        }

        // Every row now has exactly `dims` values, so this matches memory the caller holds
        let mut data = Vec::with_capacity(n_samples * dims);
        for sample in samples {
            data.extend_from_slice(sample.as_ref());
        }

        // The reference engine aborts on this, surface it before a long run
        if ((n_samples - 1) as f64) < 3.0 * params.perplexity {
            warn!(
                "perplexity {} is too large for {} samples (need N - 1 >= 3 * perplexity)",
                params.perplexity, n_samples
            );
        }

        Ok(Self {
            n_samples,
            dims,
            theta: params.theta,
            perplexity: params.perplexity,
            output_dims: params.output_dims,
            seed: params.seed,
            data,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn perplexity(&self) -> f64 {
        self.perplexity
    }

    pub fn output_dims(&self) -> usize {
        self.output_dims
    }

    pub fn seed(&self) -> Option<i32> {
        self.seed
    }

    /// Row `i` of the sample matrix.
    pub fn sample(&self, i: usize) -> Option<&[f64]> {
        let start = i.checked_mul(self.dims)?;
        let end = start.checked_add(self.dims)?;
        self.data.get(start..end)
    }

    /// Iterate over the sample rows in input order.
    pub fn samples(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.dims)
    }

    /// Size of the encoded request in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.data.len() * F64_SIZE + self.seed.map_or(0, |_| I32_SIZE)
    }

    /// Serialize to the engine's request layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.encoded_len());

        // Counts were range-checked at construction
        buffer.extend_from_slice(&(self.n_samples as i32).to_ne_bytes());
        buffer.extend_from_slice(&(self.dims as i32).to_ne_bytes());
        buffer.extend_from_slice(&self.theta.to_ne_bytes());
        buffer.extend_from_slice(&self.perplexity.to_ne_bytes());
        buffer.extend_from_slice(&(self.output_dims as i32).to_ne_bytes());

        for value in &self.data {
            buffer.extend_from_slice(&value.to_ne_bytes());
        }

        if let Some(seed) = self.seed {
            buffer.extend_from_slice(&seed.to_ne_bytes());
        }

        buffer
    }

    /// Encode fully in memory, then write the file in one call.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = self.encode();
        std::fs::write(path, &bytes).map_err(|e| TsneError::workspace(path, e))?;
        debug!(
            "Wrote request {} ({} samples x {} dims, {} bytes)",
            path.display(),
            self.n_samples,
            self.dims,
            bytes.len()
        );
        Ok(())
    }

    /// Parse a request file. This is the engine's side of the exchange.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(bytes, "request");

        let n_samples = non_negative("sample count", reader.read_i32("sample count")?)?;
        let dims = non_negative("dimensionality", reader.read_i32("dimensionality")?)?;
        let theta = reader.read_f64("theta")?;
        let perplexity = reader.read_f64("perplexity")?;
        let output_dims = non_negative("output_dims", reader.read_i32("output_dims")?)?;
        if n_samples == 0 || dims == 0 {
            return Err(TsneError::mismatch(format!(
                "request declares an empty {}x{} sample matrix",
                n_samples, dims
            )));
        }

        let total = n_samples
            .checked_mul(dims)
            .ok_or_else(|| TsneError::mismatch("sample matrix size overflows"))?;
        reader.ensure_remaining(total.saturating_mul(F64_SIZE), "sample matrix")?;

        let mut data = Vec::with_capacity(total);
        for _ in 0..total {
            data.push(reader.read_f64("sample value")?);
        }

        let seed = match reader.remaining() {
            0 => None,
            I32_SIZE => Some(reader.read_i32("seed")?),
            extra => {
                return Err(TsneError::mismatch(format!(
                    "request has {} unexpected trailing bytes",
                    extra
                )))
            }
        };

        Ok(Self {
            n_samples,
            dims,
            theta,
            perplexity,
            output_dims,
            seed,
            data,
        })
    }

    /// Read and parse a request file from disk.
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| TsneError::workspace(path, e))?;
        Self::decode(&bytes)
    }
}

fn non_negative(field: &str, value: i32) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| TsneError::mismatch(format!("{} is negative: {}", field, value)))
}
