// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.

use crate::errors::AlleleError;

/// Counts of clonotypes carrying each mutation (diagonal) and each pair of
/// mutations (off the diagonal).  Indices refer to a cluster's sorted universe of
/// distinct mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooccurrenceMatrix {
    size: usize,
    cells: Vec<u32>,
}

impl CooccurrenceMatrix {
    /// Count over clonotypes given as sorted, deduplicated universe indices.
    pub fn build<'a>(size: usize, clonotypes: impl IntoIterator<Item = &'a [usize]>) -> Self {
        let mut matrix = CooccurrenceMatrix {
            size,
            cells: vec![0; size * size],
        };
        for indices in clonotypes {
            for (k, &i) in indices.iter().enumerate() {
                matrix.cells[i * size + i] += 1;
                for &j in &indices[k + 1..] {
                    matrix.cells[i * size + j] += 1;
                    matrix.cells[j * size + i] += 1;
                }
            }
        }
        matrix
    }

    #[cfg(test)]
    pub(crate) fn from_cells(size: usize, cells: Vec<u32>) -> Self {
        assert_eq!(cells.len(), size * size);
        CooccurrenceMatrix { size, cells }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn count(&self, i: usize, j: usize) -> u32 {
        self.cells[i * self.size + j]
    }

    /// Number of clonotypes carrying mutation `i`.
    pub fn occurrences(&self, i: usize) -> u32 {
        self.count(i, i)
    }

    /// Fails on the first pair of cells that disagree.
    pub fn check_symmetric(&self) -> Result<(), AlleleError> {
        for i in 0..self.size {
            for j in i + 1..self.size {
                let (upper, lower) = (self.count(i, j), self.count(j, i));
                if upper != lower {
                    return Err(AlleleError::AsymmetricMatrix { i, j, upper, lower });
                }
            }
        }
        Ok(())
    }
}
