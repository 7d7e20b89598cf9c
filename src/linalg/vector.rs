use std::ops::{Index, IndexMut};

/// Heap-allocated dense vector of runtime length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorN {
    data: Vec<f32>,
}

impl VectorN {
    /// Zero vector of length `len`.
    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    pub fn from_vec(data: Vec<f32>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f32> {
        self.data.iter()
    }

    /// Resizes to `len` and sets every entry to zero.
    pub fn reset(&mut self, len: usize) {
        self.data.clear();
        self.data.resize(len, 0.0);
    }

    pub fn dot(&self, other: &Self) -> f32 {
        assert_eq!(self.len(), other.len(), "dot product of mismatched vectors");
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    pub fn norm(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// `self += alpha * other`
    pub fn axpy(&mut self, alpha: f32, other: &Self) {
        assert_eq!(self.len(), other.len(), "axpy on mismatched vectors");
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += alpha * b;
        }
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

impl Index<usize> for VectorN {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.data[index]
    }
}

impl IndexMut<usize> for VectorN {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.data[index]
    }
}

impl From<Vec<f32>> for VectorN {
    fn from(data: Vec<f32>) -> Self {
        Self::from_vec(data)
    }
}
