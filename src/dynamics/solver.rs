use std::f32::consts::PI;

use log::warn;

use super::assembly::BlcpProblem;
use crate::{
    config::DEFAULT_SOLVER_ITERATIONS,
    linalg::{SparseMatrix, VectorN},
};

/// Summary of one BLCP solve.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SolverStepMetrics {
    pub iterations: u32,
    pub contacts_solved: usize,
    /// Rows left at zero impulse because their effective mass vanished.
    pub skipped_rows: usize,
    pub normal_impulse_sum: f32,
    pub friction_impulse_sum: f32,
}

impl SolverStepMetrics {
    fn record(&mut self, z_norm: &VectorN, z_fric: &VectorN) {
        self.contacts_solved = z_norm.len();
        self.normal_impulse_sum = z_norm.iter().map(|z| z.abs()).sum();
        self.friction_impulse_sum = z_fric.iter().map(|z| z.abs()).sum();
    }
}

/// Projected Gauss-Seidel solver for the boxed LCP of contact impulses.
///
/// Every sweep visits each contact in order: first its normal row, then its friction rows.
/// Each row update uses the freshest impulses of every other row. The fixed iteration count
/// is the only termination condition.
///
/// Friction rows are the one-sided pyramid edges of
/// [`Dimension::friction_directions`](crate::core::dimension::Dimension::friction_directions):
/// each edge impulse lies in `[0, CoF · z_norm]`, and the edges of one contact are rescaled
/// together so that their tangential sum never leaves the Coulomb cone.
#[derive(Debug, Clone)]
pub struct PgsSolver {
    pub iterations: u32,
}

impl Default for PgsSolver {
    fn default() -> Self {
        Self::new(DEFAULT_SOLVER_ITERATIONS)
    }
}

impl PgsSolver {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Solves for `z_norm` (one per contact) and `z_fric` (friction rows, grouped per
    /// contact). Both vectors are resized to the problem and warm-started from zero.
    pub fn solve_blcp(
        &self,
        problem: &BlcpProblem,
        z_norm: &mut VectorN,
        z_fric: &mut VectorN,
    ) -> SolverStepMetrics {
        let contacts = problem.jmj.rows();
        let friction_rows = problem.dmd.rows();
        z_norm.reset(contacts);
        z_fric.reset(friction_rows);

        let mut metrics = SolverStepMetrics {
            iterations: self.iterations,
            ..Default::default()
        };
        if contacts == 0 {
            return metrics;
        }
        let per_contact = friction_rows / contacts;

        let normal_diag: Vec<f32> = (0..contacts).map(|i| problem.jmj.get(i, i)).collect();
        let friction_diag: Vec<f32> = (0..friction_rows).map(|j| problem.dmd.get(j, j)).collect();
        metrics.skipped_rows = normal_diag
            .iter()
            .chain(friction_diag.iter())
            .filter(|d| **d < f32::EPSILON)
            .count();
        if metrics.skipped_rows > 0 {
            warn!(
                "PGS: {} constraint rows have no effective mass and are skipped",
                metrics.skipped_rows
            );
        }

        for _ in 0..self.iterations {
            for i in 0..contacts {
                let jv = problem.jv[i];
                if normal_diag[i] >= f32::EPSILON {
                    let vn = jv
                        + problem.jmj.row_dot(i, z_norm)
                        + problem.jmd.row_dot(i, z_fric);
                    let target = if jv < 0.0 { -problem.cor[i] * jv } else { 0.0 };
                    z_norm[i] = (z_norm[i] - (vn - target) / normal_diag[i]).max(0.0);
                }

                let limit = (problem.cof[i] * z_norm[i]).max(0.0);
                let edges = i * per_contact..(i + 1) * per_contact;
                for j in edges.clone() {
                    if friction_diag[j] < f32::EPSILON {
                        continue;
                    }
                    let vf = problem.dv[j]
                        + problem.dmj.row_dot(j, z_norm)
                        + problem.dmd.row_dot(j, z_fric);
                    z_fric[j] = (z_fric[j] - vf / friction_diag[j]).clamp(0.0, limit);
                }
                clamp_to_cone(&mut z_fric.as_mut_slice()[edges], limit);
            }
        }

        metrics.record(z_norm, z_fric);
        metrics
    }
}

/// Length of the tangential impulse `Σ z_j d_j` of one contact's pyramid edges.
///
/// The edges are unit vectors evenly spaced over a full turn, so `d_j · d_k` only depends on
/// `j - k`.
pub fn tangential_impulse(edges: &[f32]) -> f32 {
    let count = edges.len() as f32;
    let mut length_sq = 0.0;
    for (j, &zj) in edges.iter().enumerate() {
        for (k, &zk) in edges.iter().enumerate() {
            let angle = 2.0 * PI * (j as f32 - k as f32) / count;
            length_sq += zj * zk * angle.cos();
        }
    }
    length_sq.max(0.0).sqrt()
}

/// Scales one contact's edge impulses down until `|Σ z_j d_j| <= limit`.
fn clamp_to_cone(edges: &mut [f32], limit: f32) {
    let length = tangential_impulse(edges);
    if length > limit && length > 0.0 {
        let scale = limit / length;
        for z in edges.iter_mut() {
            *z *= scale;
        }
    }
}

/// Free-standing form of [`PgsSolver::solve_blcp`] taking every operand explicitly.
#[allow(clippy::too_many_arguments)]
pub fn solve_blcp(
    jmj: &SparseMatrix,
    dmd: &SparseMatrix,
    jmd: &SparseMatrix,
    dmj: &SparseMatrix,
    jv: &VectorN,
    dv: &VectorN,
    z_norm: &mut VectorN,
    z_fric: &mut VectorN,
    cor: &[f32],
    cof: &[f32],
    iterations: u32,
) -> SolverStepMetrics {
    let problem = BlcpProblem {
        jmj: jmj.clone(),
        dmd: dmd.clone(),
        jmd: jmd.clone(),
        dmj: dmj.clone(),
        jv: jv.clone(),
        dv: dv.clone(),
        cor: cor.to_vec(),
        cof: cof.to_vec(),
    };
    PgsSolver::new(iterations).solve_blcp(&problem, z_norm, z_fric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec2;

    /// One contact with unit mass, sliding at `slip` along its tangent line. The friction
    /// pyramid has the two opposite edges of a planar contact.
    fn single_contact(jv: f32, slip: f32, cor: f32, cof: f32) -> BlcpProblem {
        pyramid_contact(jv, Vec2::new(slip, 0.0), 2, cor, cof)
    }

    /// One contact with unit mass and `edges` pyramid edges spread over the tangent plane.
    fn pyramid_contact(jv: f32, slip: Vec2, edges: usize, cor: f32, cof: f32) -> BlcpProblem {
        let directions: Vec<Vec2> = (0..edges)
            .map(|j| Vec2::from_angle(2.0 * PI * j as f32 / edges as f32))
            .collect();
        let mut gram = Vec::new();
        for (j, dj) in directions.iter().enumerate() {
            for (k, dk) in directions.iter().enumerate() {
                gram.push((j, k, dj.dot(*dk)));
            }
        }
        BlcpProblem {
            jmj: SparseMatrix::from_triplets(1, 1, &[(0, 0, 1.0)]),
            dmd: SparseMatrix::from_triplets(edges, edges, &gram),
            jmd: SparseMatrix::new(1, edges),
            dmj: SparseMatrix::new(edges, 1),
            jv: VectorN::from_vec(vec![jv]),
            dv: VectorN::from_vec(directions.iter().map(|d| d.dot(slip)).collect()),
            cor: vec![cor],
            cof: vec![cof],
        }
    }

    #[test]
    fn approaching_contact_is_stopped() {
        let mut z_norm = VectorN::default();
        let mut z_fric = VectorN::default();
        let metrics = PgsSolver::default().solve_blcp(
            &single_contact(-2.0, 0.0, 0.0, 0.0),
            &mut z_norm,
            &mut z_fric,
        );
        assert_relative_eq!(z_norm[0], 2.0);
        assert_eq!(metrics.iterations, 50);
        assert_eq!(metrics.contacts_solved, 1);
    }

    #[test]
    fn restitution_sets_the_separation_target() {
        let mut z_norm = VectorN::default();
        let mut z_fric = VectorN::default();
        PgsSolver::new(10).solve_blcp(&single_contact(-2.0, 0.0, 0.5, 0.0), &mut z_norm, &mut z_fric);
        // Post velocity -2 + z = +1.
        assert_relative_eq!(z_norm[0], 3.0);
    }

    #[test]
    fn separating_contact_gets_no_impulse() {
        let mut z_norm = VectorN::default();
        let mut z_fric = VectorN::default();
        PgsSolver::new(10).solve_blcp(&single_contact(1.0, 3.0, 0.0, 1.0), &mut z_norm, &mut z_fric);
        assert_eq!(z_norm[0], 0.0);
        assert_eq!(z_fric.as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn zero_friction_keeps_tangent_impulse_zero() {
        let mut z_norm = VectorN::default();
        let mut z_fric = VectorN::default();
        PgsSolver::default().solve_blcp(&single_contact(-1.0, 5.0, 0.0, 0.0), &mut z_norm, &mut z_fric);
        assert!(z_norm[0] > 0.0);
        assert_eq!(z_fric.as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn friction_is_bounded_by_the_cone() {
        let mut z_norm = VectorN::default();
        let mut z_fric = VectorN::default();
        PgsSolver::default().solve_blcp(&single_contact(-1.0, 5.0, 0.0, 0.5), &mut z_norm, &mut z_fric);
        assert_relative_eq!(z_norm[0], 1.0);
        // Only the edge opposing the slip pushes.
        assert_eq!(z_fric[0], 0.0);
        assert_relative_eq!(z_fric[1], 0.5, epsilon = 1e-6);

        // Sticking: the tangential slip is small enough to be cancelled entirely.
        PgsSolver::default().solve_blcp(&single_contact(-1.0, 0.2, 0.0, 0.5), &mut z_norm, &mut z_fric);
        assert_eq!(z_fric[0], 0.0);
        assert_relative_eq!(z_fric[1], 0.2, epsilon = 1e-6);
    }

    #[test]
    fn sliding_friction_stays_inside_the_coulomb_cone() {
        for slip in [Vec2::new(5.0, 0.0), Vec2::new(3.0, -4.0), Vec2::new(-0.7, 2.0)] {
            for edges in [3, 4, 8] {
                let mut z_norm = VectorN::default();
                let mut z_fric = VectorN::default();
                let problem = pyramid_contact(-1.0, slip, edges, 0.0, 0.5);
                PgsSolver::default().solve_blcp(&problem, &mut z_norm, &mut z_fric);

                let limit = 0.5 * z_norm[0];
                assert!(z_fric.iter().all(|z| (0.0..=limit + 1e-6).contains(z)));
                let length = tangential_impulse(z_fric.as_slice());
                assert!(length <= limit * (1.0 + 1e-5), "{edges} edges, slip {slip}: {length}");
                // Far from sticking, the full Coulomb impulse is applied.
                assert_relative_eq!(length, limit, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn tangential_impulse_of_opposite_edges_cancels() {
        assert_relative_eq!(tangential_impulse(&[0.3, 0.3]), 0.0);
        assert_relative_eq!(tangential_impulse(&[0.0, 0.0, 0.4, 0.0]), 0.4);
        assert_relative_eq!(tangential_impulse(&[0.3, 0.4, 0.0, 0.0]), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_rows_are_skipped() {
        let mut problem = single_contact(-1.0, 1.0, 0.0, 1.0);
        problem.jmj = SparseMatrix::new(1, 1);
        let mut z_norm = VectorN::default();
        let mut z_fric = VectorN::default();
        let metrics = PgsSolver::default().solve_blcp(&problem, &mut z_norm, &mut z_fric);
        assert_eq!(metrics.skipped_rows, 1);
        assert!(z_norm.is_finite());
        assert_eq!(z_norm[0], 0.0);
        assert_eq!(z_fric.as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn coupled_contacts_converge() {
        // Two contacts sharing one body: each row sees the other's impulse.
        let problem = BlcpProblem {
            jmj: SparseMatrix::from_triplets(2, 2, &[(0, 0, 2.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 2.0)]),
            dmd: SparseMatrix::new(0, 0),
            jmd: SparseMatrix::new(2, 0),
            dmj: SparseMatrix::new(0, 2),
            jv: VectorN::from_vec(vec![-3.0, -3.0]),
            dv: VectorN::default(),
            cor: vec![0.0, 0.0],
            cof: vec![0.0, 0.0],
        };
        let mut z_norm = VectorN::default();
        let mut z_fric = VectorN::default();
        PgsSolver::default().solve_blcp(&problem, &mut z_norm, &mut z_fric);
        assert_relative_eq!(z_norm[0], 1.0, epsilon = 1e-4);
        assert_relative_eq!(z_norm[1], 1.0, epsilon = 1e-4);
    }
}
