//! Result file: embedding rows, their origin indices and per-sample cost

use super::{wire_i32, WireReader, F64_SIZE, I32_SIZE};
use crate::error::{Result, TsneError};
use std::path::Path;
use tracing::debug;

/// One embedding row as emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Position of the source sample in the request
    pub origin: i32,
    /// Embedding coordinates
    pub vector: Vec<f64>,
}

/// Decoded result file, still in engine order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    /// Dimensionality of every record's vector
    pub dims: usize,
    /// Records in the order the engine wrote them
    pub records: Vec<RawRecord>,
    /// Final per-sample cost, kept in the format but not used for the embedding
    pub costs: Vec<f64>,
}

impl RawResult {
    /// Parse a result file produced for a request of `expected_samples` samples.
    ///
    /// The origin indices live in their own block after all vectors; the i-th index
    /// belongs to the i-th vector.
    pub fn decode(bytes: &[u8], expected_samples: usize) -> Result<Self> {
        let mut reader = WireReader::new(bytes, "result");

        let count = reader.read_i32("result count")?;
        let dims = reader.read_i32("result dimensionality")?;

        if usize::try_from(count).ok() != Some(expected_samples) {
            return Err(TsneError::mismatch(format!(
                "engine returned {} results for {} samples",
                count, expected_samples
            )));
        }
        let dims = usize::try_from(dims)
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| TsneError::mismatch(format!("invalid result dimensionality {}", dims)))?;

        // Each sample contributes a vector, an origin index and a cost
        let body = dims
            .checked_mul(F64_SIZE)
            .and_then(|row| row.checked_add(I32_SIZE + F64_SIZE))
            .and_then(|per_sample| per_sample.checked_mul(expected_samples))
            .ok_or_else(|| TsneError::mismatch("result size overflows"))?;
        reader.ensure_remaining(body, "result body")?;

        let mut vectors = Vec::with_capacity(expected_samples);
        for _ in 0..expected_samples {
            let mut vector = Vec::with_capacity(dims);
            for _ in 0..dims {
                vector.push(reader.read_f64("embedding value")?);
            }
            vectors.push(vector);
        }

        let mut records = Vec::with_capacity(expected_samples);
        for vector in vectors {
            let origin = reader.read_i32("origin index")?;
            records.push(RawRecord { origin, vector });
        }

        let mut costs = Vec::with_capacity(expected_samples);
        for _ in 0..expected_samples {
            costs.push(reader.read_f64("cost")?);
        }

        if reader.remaining() > 0 {
            debug!("Ignoring {} trailing bytes in result", reader.remaining());
        }

        Ok(Self {
            dims,
            records,
            costs,
        })
    }

    /// Read and parse the result file the engine left in the workspace.
    pub fn read_from(path: &Path, expected_samples: usize) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TsneError::mismatch(format!(
                    "engine exited successfully but wrote no result at {}",
                    path.display()
                ))
            } else {
                TsneError::workspace(path, e)
            }
        })?;
        debug!("Read result {} ({} bytes)", path.display(), bytes.len());
        Self::decode(&bytes, expected_samples)
    }

    /// Serialize in the engine's result layout. This is the engine's side of the exchange.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let n = self.records.len();
        let count = wire_i32("result count", n)?;
        let dims = wire_i32("result dimensionality", self.dims)?;

        let body: usize = self
            .records
            .iter()
            .map(|r| r.vector.len() * F64_SIZE + I32_SIZE)
            .sum();
        let mut buffer = Vec::with_capacity(I32_SIZE * 2 + body + self.costs.len() * F64_SIZE);

        buffer.extend_from_slice(&count.to_ne_bytes());
        buffer.extend_from_slice(&dims.to_ne_bytes());

        for record in &self.records {
            for value in &record.vector {
                buffer.extend_from_slice(&value.to_ne_bytes());
            }
        }
        for record in &self.records {
            buffer.extend_from_slice(&record.origin.to_ne_bytes());
        }
        for cost in &self.costs {
            buffer.extend_from_slice(&cost.to_ne_bytes());
        }

        Ok(buffer)
    }

    /// Write the encoded result in one call.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = self.encode()?;
        std::fs::write(path, bytes).map_err(|e| TsneError::workspace(path, e))
    }
}
