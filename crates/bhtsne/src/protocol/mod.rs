//! Binary file protocol spoken with the engine.
//!
//! The engine is started with the exchange workspace as its working directory and finds
//! its input and output purely by file name:
//!
//! ```text
//! <workspace>/
//! ├── data.dat     # request, written by us
//! └── result.dat   # response, written by the engine
//! ```
//!
//! Both files use the host's native byte order with C `int` (i32) and `double` (f64) fields.
//!
//! Request:
//!
//! ```text
//! [N: i32][D: i32][theta: f64][perplexity: f64][output_dims: i32]
//! [samples: N*D f64, row-major]
//! [seed: i32]            # only present when a seed was chosen
//! ```
//!
//! Response:
//!
//! ```text
//! [count: i32][dims: i32]
//! [embedding: count*dims f64, engine order]
//! [origin index: count i32, same order as the embedding rows]
//! [cost: count f64]
//! ```

pub mod request;
pub mod response;

pub use request::Request;
pub use response::{RawRecord, RawResult};

use crate::error::{Result, TsneError};

/// Request file name expected by the reference engine
pub const DEFAULT_REQUEST_FILE: &str = "data.dat";
/// Result file name written by the reference engine
pub const DEFAULT_RESULT_FILE: &str = "result.dat";

const I32_SIZE: usize = std::mem::size_of::<i32>();
const F64_SIZE: usize = std::mem::size_of::<f64>();

/// File names both sides agree on inside the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeFiles {
    pub request: String,
    pub result: String,
}

impl Default for ExchangeFiles {
    fn default() -> Self {
        Self {
            request: DEFAULT_REQUEST_FILE.to_string(),
            result: DEFAULT_RESULT_FILE.to_string(),
        }
    }
}

/// Convert a count to the wire's i32, naming the field on overflow.
fn wire_i32(field: &str, value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        TsneError::malformed(format!(
            "{} = {} does not fit the engine's 32-bit field",
            field, value
        ))
    })
}

/// Sequential reader over a fully loaded file.
///
/// Every short read is a protocol error: the engine either crashed mid-write or speaks a
/// different version of the format.
struct WireReader<'a> {
    data: &'a [u8],
    offset: usize,
    file: &'a str,
}

impl<'a> WireReader<'a> {
    fn new(data: &'a [u8], file: &'a str) -> Self {
        Self {
            data,
            offset: 0,
            file,
        }
    }

    fn take<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let end = self.offset + N;
        let bytes: [u8; N] = self
            .data
            .get(self.offset..end)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| {
                TsneError::mismatch(format!(
                    "{} truncated reading {} at byte {} (file is {} bytes)",
                    self.file,
                    what,
                    self.offset,
                    self.data.len()
                ))
            })?;
        self.offset = end;
        Ok(bytes)
    }

    fn read_i32(&mut self, what: &str) -> Result<i32> {
        self.take::<I32_SIZE>(what).map(i32::from_ne_bytes)
    }

    fn read_f64(&mut self, what: &str) -> Result<f64> {
        self.take::<F64_SIZE>(what).map(f64::from_ne_bytes)
    }

    /// Fail early instead of allocating for a length the file cannot hold.
    fn ensure_remaining(&self, bytes: usize, what: &str) -> Result<()> {
        if self.remaining() < bytes {
            return Err(TsneError::mismatch(format!(
                "{} truncated: {} needs {} bytes but only {} remain",
                self.file,
                what,
                bytes,
                self.remaining()
            )));
        }
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }
}
