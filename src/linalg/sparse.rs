use super::vector::VectorN;

/// Row-compressed sparse matrix. Each row keeps its entries sorted by column, so every
/// traversal (and therefore every floating point sum) happens in a fixed order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    entries: Vec<Vec<(usize, f32)>>,
}

impl SparseMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            entries: vec![Vec::new(); rows],
        }
    }

    pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, f32)]) -> Self {
        let mut matrix = Self::new(rows, cols);
        for &(row, col, value) in triplets {
            matrix.add(row, col, value);
        }
        matrix
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of explicitly stored entries.
    pub fn nnz(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }

    /// Stored entries of `row` as `(column, value)` pairs, sorted by column.
    pub fn row(&self, row: usize) -> &[(usize, f32)] {
        &self.entries[row]
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        let entries = &self.entries[row];
        match entries.binary_search_by_key(&col, |&(c, _)| c) {
            Ok(pos) => entries[pos].1,
            Err(_) => 0.0,
        }
    }

    /// Overwrites the entry at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.check_bounds(row, col);
        let entries = &mut self.entries[row];
        match entries.binary_search_by_key(&col, |&(c, _)| c) {
            Ok(pos) => entries[pos].1 = value,
            Err(pos) => entries.insert(pos, (col, value)),
        }
    }

    /// Accumulates `value` into the entry at `(row, col)`.
    pub fn add(&mut self, row: usize, col: usize, value: f32) {
        self.check_bounds(row, col);
        let entries = &mut self.entries[row];
        match entries.binary_search_by_key(&col, |&(c, _)| c) {
            Ok(pos) => entries[pos].1 += value,
            Err(pos) => entries.insert(pos, (col, value)),
        }
    }

    pub fn transpose(&self) -> Self {
        let mut transposed = Self::new(self.cols, self.rows);
        // Rows are visited in increasing order, so pushing keeps columns sorted.
        for (row, entries) in self.entries.iter().enumerate() {
            for &(col, value) in entries {
                transposed.entries[col].push((row, value));
            }
        }
        transposed
    }

    /// Dot product of one row with a dense vector.
    pub fn row_dot(&self, row: usize, vector: &VectorN) -> f32 {
        self.entries[row]
            .iter()
            .map(|&(col, value)| value * vector[col])
            .sum()
    }

    pub fn mul_vector(&self, vector: &VectorN) -> VectorN {
        assert_eq!(
            self.cols,
            vector.len(),
            "matrix-vector product with mismatched dimensions"
        );
        let data = (0..self.rows).map(|row| self.row_dot(row, vector)).collect();
        VectorN::from_vec(data)
    }

    /// Sparse matrix product `self * rhs`.
    pub fn multiply(&self, rhs: &SparseMatrix) -> SparseMatrix {
        assert_eq!(
            self.cols, rhs.rows,
            "matrix product with mismatched dimensions"
        );
        let mut product = Self::new(self.rows, rhs.cols);
        let mut accumulator = vec![0.0_f32; rhs.cols];
        let mut touched = vec![false; rhs.cols];
        let mut pattern: Vec<usize> = Vec::new();

        for (row, entries) in self.entries.iter().enumerate() {
            for &(k, lhs_value) in entries {
                for &(col, rhs_value) in &rhs.entries[k] {
                    if !touched[col] {
                        touched[col] = true;
                        pattern.push(col);
                    }
                    accumulator[col] += lhs_value * rhs_value;
                }
            }

            pattern.sort_unstable();
            let out = &mut product.entries[row];
            for &col in &pattern {
                out.push((col, accumulator[col]));
                accumulator[col] = 0.0;
                touched[col] = false;
            }
            pattern.clear();
        }

        product
    }

    /// Dense copy, mostly useful in tests and diagnostics.
    pub fn to_dense(&self) -> Vec<Vec<f32>> {
        let mut dense = vec![vec![0.0; self.cols]; self.rows];
        for (row, entries) in self.entries.iter().enumerate() {
            for &(col, value) in entries {
                dense[row][col] = value;
            }
        }
        dense
    }

    fn check_bounds(&self, row: usize, col: usize) {
        assert!(
            row < self.rows && col < self.cols,
            "entry ({row}, {col}) outside a {}x{} matrix",
            self.rows,
            self.cols
        );
    }
}
