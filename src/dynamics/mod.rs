//! Contact dynamics: BLCP assembly, the projected Gauss-Seidel solver, impulse application
//! and time integration.

pub mod assembly;
pub mod impulse;
pub mod integrator;
pub mod solver;

pub use assembly::{
    compute_coefficient, compute_fric_jacobian_matrix, compute_generalized_velocity,
    compute_inv_mass_matrix, compute_jacobian_matrix, AssembledSystem, BlcpProblem,
};
pub use impulse::apply_impulse;
pub use integrator::Integrator;
pub use solver::{solve_blcp, tangential_impulse, PgsSolver, SolverStepMetrics};
