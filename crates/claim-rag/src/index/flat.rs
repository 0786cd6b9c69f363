//! Exact nearest-neighbour index over squared Euclidean distance

use ndarray::{Array2, ArrayView1, Axis};
use std::cmp::Ordering;

use crate::error::{Error, Result};

/// One nearest-neighbour hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row position in insertion order
    pub row: usize,
    /// Squared L2 distance to the query
    pub distance: f32,
}

/// Flat (brute force) L2 index with a fixed dimensionality
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    /// Row-major vectors, shape `(len, dimensions)`
    vectors: Array2<f32>,
    dimensions: usize,
    built: bool,
}

impl FlatL2Index {
    /// Create an empty, unbuilt index
    pub fn new(dimensions: usize) -> Self {
        Self {
            vectors: Array2::zeros((0, dimensions)),
            dimensions,
            built: false,
        }
    }

    /// Embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `build` (or an initial `insert`) has happened
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Replace all contents with `vectors`
    pub fn build(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        let matrix = self.to_matrix(vectors)?;
        self.vectors = matrix;
        self.built = true;
        Ok(())
    }

    /// Append `vectors` after the existing rows
    pub fn insert(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        let matrix = self.to_matrix(vectors)?;
        self.vectors
            .append(Axis(0), matrix.view())
            .map_err(|e| Error::internal(format!("Index append failed: {}", e)))?;
        self.built = true;
        Ok(())
    }

    /// The `k` nearest rows to `query`, ascending by distance, ties by row
    pub fn query(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if !self.built {
            return Err(Error::NotBuilt);
        }
        self.check_dimensions(query)?;

        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let query = ArrayView1::from(query);
        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .outer_iter()
            .enumerate()
            .map(|(row, v)| Neighbor {
                row,
                distance: squared_l2(v, query),
            })
            .collect();

        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, compare_neighbors);
            neighbors.truncate(k);
        }
        neighbors.sort_unstable_by(compare_neighbors);

        Ok(neighbors)
    }

    /// Row `row` as a plain vector
    pub fn vector(&self, row: usize) -> Option<Vec<f32>> {
        (row < self.len()).then(|| self.vectors.row(row).to_vec())
    }

    /// All rows in order
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.vectors.outer_iter().map(|r| r.to_vec()).collect()
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Validate every vector before anything is mutated
    fn to_matrix(&self, vectors: &[Vec<f32>]) -> Result<Array2<f32>> {
        for vector in vectors {
            self.check_dimensions(vector)?;
        }

        let flat: Vec<f32> = vectors.iter().flatten().copied().collect();
        Array2::from_shape_vec((vectors.len(), self.dimensions), flat)
            .map_err(|e| Error::internal(format!("Invalid vector matrix: {}", e)))
    }
}

fn squared_l2(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.row.cmp(&b.row))
}
