//! Tab/whitespace separated sample input and embedding output

use serde::Serialize;
use std::io::{BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TsvError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}, column {column}: invalid number '{value}'")]
    InvalidNumber {
        line: usize,
        column: usize,
        value: String,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read one sample per non-blank line.
///
/// Row lengths are not checked here; mismatched rows are reported by the request encoder
/// with the sample index.
pub fn read_samples<R: BufRead>(reader: R) -> Result<Vec<Vec<f64>>, TsvError> {
    let mut samples = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let row = line
            .split_whitespace()
            .enumerate()
            .map(|(j, field)| {
                field.parse::<f64>().map_err(|_| TsvError::InvalidNumber {
                    line: i + 1,
                    column: j + 1,
                    value: field.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        samples.push(row);
    }

    Ok(samples)
}

/// Write one tab separated row per embedding vector.
pub fn write_rows<W: Write>(writer: &mut W, rows: &[Vec<f64>]) -> Result<(), TsvError> {
    for row in rows {
        let line = row
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonEmbedding<'a> {
    n_points: usize,
    dims: usize,
    embedding: &'a [Vec<f64>],
}

/// Write the embedding as a single JSON object.
pub fn write_json<W: Write>(
    writer: &mut W,
    dims: usize,
    rows: &[Vec<f64>],
) -> Result<(), TsvError> {
    serde_json::to_writer(
        &mut *writer,
        &JsonEmbedding {
            n_points: rows.len(),
            dims,
            embedding: rows,
        },
    )?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Shift and scale every column to [0, 1]. Constant columns become 0.
pub fn normalize(rows: &mut [Vec<f64>]) {
    let dims = rows.first().map_or(0, Vec::len);

    for d in 0..dims {
        let (min, max) = rows
            .iter()
            .filter_map(|row| row.get(d).copied())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;

        for row in rows.iter_mut() {
            if let Some(v) = row.get_mut(d) {
                *v = if range > 0.0 { (*v - min) / range } else { 0.0 };
            }
        }
    }
}
