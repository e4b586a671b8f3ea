//! Ordered, single-pass embedding sequence handed to the caller.

use std::iter::FusedIterator;

/// Embedding vectors in input order.
///
/// Single pass and not `Clone`: iterating again requires a new engine run.
#[derive(Debug)]
pub struct Embedding {
    dims: usize,
    rows: std::vec::IntoIter<Vec<f64>>,
}

impl Embedding {
    pub(crate) fn new(dims: usize, rows: Vec<Vec<f64>>) -> Self {
        Self {
            dims,
            rows: rows.into_iter(),
        }
    }

    /// Dimensionality of every vector in the sequence.
    pub fn dims(&self) -> usize {
        self.dims
    }
}

impl Iterator for Embedding {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for Embedding {}

impl FusedIterator for Embedding {}
