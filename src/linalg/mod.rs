//! Dense and sparse containers used by the constraint assembly and the BLCP solver.

pub mod sparse;
pub mod vector;

pub use sparse::SparseMatrix;
pub use vector::VectorN;
