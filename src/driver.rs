//! The rigid body driver: owns the archived bodies and runs the per-step pipeline
//! gravity → collision detection → contact assembly → BLCP solve → impulse → integration.

pub mod archive;
pub mod persistence;
pub mod plugin;

use std::{path::Path, time::Instant};

use glam::Vec3;
use log::{debug, error, info};

use crate::{
    collision::{
        bvh::{ObjectBvh, SceneBvh},
        collidable::CollidableObject,
        contact::{ContactPoint, ContactPointManager},
        detection::{detect, CollisionDetectionResult},
    },
    config::DriverConfig,
    core::{dimension::Dimension, rigidbody::RigidBody},
    dynamics::{
        assembly::AssembledSystem,
        impulse::apply_impulse,
        integrator::Integrator,
        solver::{PgsSolver, SolverStepMetrics},
    },
    error::{PhysicsError, Result},
    linalg::VectorN,
    utils::{
        logging::{warn_if_frame_budget_exceeded, ScopedTimer},
        math::is_finite_state,
        profiling::{StageTimer, StepProfiler},
    },
};

pub use archive::RigidBodyArchive;
pub use persistence::DriverSnapshot;
pub use plugin::{EventCounter, PluginHandle, RigidDriverPlugin};

/// Lifecycle of a [`RigidBodyDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Initialized,
    Stepping,
    Finished,
    /// A step aborted part-way. Bodies may be partially integrated, so the driver only
    /// accepts a [`RigidBodyDriver::restore`] from here.
    Failed,
}

/// Anything that advances in time steps and frames.
pub trait Steppable {
    /// Advances the simulation by exactly `dt` seconds.
    fn advance_step(&mut self, dt: f32) -> Result<()>;

    /// Advances by one frame, split into time steps of at most `max_dt`.
    fn advance_frame(&mut self) -> Result<()>;

    /// Simulates every frame of the configured range.
    fn run(&mut self) -> Result<()>;
}

/// Rigid body simulation driver for scenes of dimension `D`.
pub struct RigidBodyDriver<D: Dimension> {
    config: DriverConfig,
    state: DriverState,
    archives: Vec<RigidBodyArchive<D>>,
    scene_bvh: SceneBvh,
    bvh_dirty: bool,
    archives_dirty: bool,
    gravity: f32,
    collision_result: CollisionDetectionResult,
    contact_manager: ContactPointManager,
    solver: PgsSolver,
    integrator: Integrator,
    z_norm: VectorN,
    z_fric: VectorN,
    solver_metrics: SolverStepMetrics,
    plugins: Vec<PluginHandle<D>>,
    frame: u32,
    step: u64,
    time: f32,
    frame_elapsed: f32,
    profiler: StepProfiler,
}

impl<D: Dimension> Default for RigidBodyDriver<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dimension> RigidBodyDriver<D> {
    pub fn new() -> Self {
        let config = DriverConfig::default();
        Self {
            state: DriverState::Uninitialized,
            archives: Vec::new(),
            scene_bvh: SceneBvh::new(),
            bvh_dirty: false,
            archives_dirty: false,
            gravity: config.gravity,
            collision_result: CollisionDetectionResult::default(),
            contact_manager: ContactPointManager::new(config.friction_directions),
            solver: PgsSolver::new(config.solver_iterations),
            integrator: Integrator::new(config.penetration_correction, config.penetration_slop),
            z_norm: VectorN::default(),
            z_fric: VectorN::default(),
            solver_metrics: SolverStepMetrics::default(),
            plugins: Vec::new(),
            frame: config.start_frame,
            step: 0,
            time: 0.0,
            frame_elapsed: 0.0,
            profiler: StepProfiler::default(),
            config,
        }
    }

    pub fn with_config(config: DriverConfig) -> Result<Self> {
        let mut driver = Self::new();
        driver.apply_config(config)?;
        Ok(driver)
    }

    fn apply_config(&mut self, config: DriverConfig) -> Result<()> {
        config.validate()?;
        self.gravity = config.gravity;
        self.contact_manager
            .set_friction_directions(config.friction_directions);
        self.solver = PgsSolver::new(config.solver_iterations);
        self.integrator = Integrator::new(config.penetration_correction, config.penetration_slop);
        if self.state == DriverState::Uninitialized {
            self.frame = config.start_frame;
        }
        if (config.contact_margin - self.config.contact_margin).abs() > f32::EPSILON {
            self.archives = std::mem::take(&mut self.archives)
                .into_iter()
                .map(|archive| {
                    let index = archive.index();
                    let mut rebuilt =
                        RigidBodyArchive::with_margin(archive.rigid_body().clone(), config.contact_margin);
                    rebuilt.set_index(index);
                    rebuilt
                })
                .collect();
            self.bvh_dirty = true;
        }
        self.config = config;
        Ok(())
    }

    /// Loads a JSON [`DriverConfig`] and applies it.
    pub fn init_configuration(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if self.is_terminal() {
            return Err(PhysicsError::InvalidState {
                reason: "cannot reconfigure a finished driver",
            });
        }
        let config = DriverConfig::from_file(path)?;
        self.apply_config(config)
    }

    pub fn print_config_file_format(&self) -> String {
        DriverConfig::file_format()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, DriverState::Finished | DriverState::Failed)
    }

    fn ensure_steppable(&self) -> Result<()> {
        match self.state {
            DriverState::Finished => Err(PhysicsError::InvalidState {
                reason: "the simulation has finished",
            }),
            DriverState::Failed => Err(PhysicsError::InvalidState {
                reason: "a previous step failed; restore a snapshot to continue",
            }),
            _ => Ok(()),
        }
    }

    /// Archives `body` and returns its index.
    ///
    /// With `rebuild_bvh == false` the scene BVH is only marked stale; call
    /// [`RigidBodyDriver::rebuild_scene_bvh`] after a batch of insertions (the driver also
    /// rebuilds before its next step).
    pub fn add_rigid_body(&mut self, body: RigidBody, rebuild_bvh: bool) -> Result<usize> {
        if self.is_terminal() {
            return Err(PhysicsError::InvalidState {
                reason: "cannot add bodies to a finished driver",
            });
        }
        if self
            .archives
            .iter()
            .any(|archive| archive.rigid_body().id == body.id)
        {
            return Err(PhysicsError::DuplicateBody { id: body.id.0 });
        }

        let index = self.archives.len();
        body.validate(index)?;

        let mut archive = RigidBodyArchive::with_margin(body, self.config.contact_margin);
        archive.set_index(index);
        self.archives.push(archive);

        if rebuild_bvh {
            self.rebuild_scene_bvh();
        } else {
            self.bvh_dirty = true;
        }

        debug!("archived rigid body {index} ({} dynamics)", D::NAME);
        self.notify(|plugin, driver| plugin.on_add_rigid_body(driver, index));
        Ok(index)
    }

    pub fn rebuild_scene_bvh(&mut self) {
        let volumes: Vec<&ObjectBvh> = self
            .archives
            .iter()
            .map(RigidBodyArchive::object_bvh)
            .collect();
        self.scene_bvh.build(&volumes);
        self.bvh_dirty = false;
    }

    pub fn scene_bvh(&self) -> &SceneBvh {
        &self.scene_bvh
    }

    /// Gravity magnitude, applied along -Y.
    pub fn set_gravity(&mut self, magnitude: f32) {
        self.gravity = magnitude;
    }

    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    fn gravity_vector(&self) -> Vec3 {
        Vec3::new(0.0, -self.gravity, 0.0)
    }

    pub fn collision_result(&self) -> &CollisionDetectionResult {
        &self.collision_result
    }

    pub fn contact_points(&self) -> &[ContactPoint] {
        self.contact_manager.points()
    }

    /// Normal and friction impulses of the last solve.
    pub fn last_impulses(&self) -> (&VectorN, &VectorN) {
        (&self.z_norm, &self.z_fric)
    }

    pub fn solver_metrics(&self) -> &SolverStepMetrics {
        &self.solver_metrics
    }

    pub fn profiler(&self) -> &StepProfiler {
        &self.profiler
    }

    pub fn num_rigid_body(&self) -> usize {
        self.archives.len()
    }

    pub fn rigid_body(&self, index: usize) -> Result<&RigidBody> {
        self.archive(index).map(RigidBodyArchive::rigid_body)
    }

    /// Mutable access to a body; its collision data is re-derived before the next step.
    pub fn rigid_body_mut(&mut self, index: usize) -> Result<&mut RigidBody> {
        let count = self.archives.len();
        let archive = self
            .archives
            .get_mut(index)
            .ok_or(PhysicsError::InvalidBodyIndex { index, count })?;
        self.archives_dirty = true;
        Ok(archive.rigid_body_mut())
    }

    pub fn archive(&self, index: usize) -> Result<&RigidBodyArchive<D>> {
        self.archives.get(index).ok_or(PhysicsError::InvalidBodyIndex {
            index,
            count: self.archives.len(),
        })
    }

    pub fn add_plugin(&mut self, plugin: PluginHandle<D>) {
        self.plugins.push(plugin);
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    fn notify(&self, mut hook: impl FnMut(&mut dyn RigidDriverPlugin<D>, &Self)) {
        for plugin in &self.plugins {
            let mut guard = plugin.lock();
            hook(&mut *guard, self);
        }
    }

    /// Builds the scene BVH and moves to [`DriverState::Initialized`].
    pub fn initialize(&mut self) -> Result<()> {
        match self.state {
            DriverState::Uninitialized | DriverState::Initialized => {}
            DriverState::Stepping | DriverState::Finished | DriverState::Failed => {
                return Err(PhysicsError::InvalidState {
                    reason: "initialize() must precede the first step",
                });
            }
        }
        self.refresh_archives();
        self.rebuild_scene_bvh();
        self.frame = self.config.start_frame;
        self.time = self.config.start_frame as f32 * self.config.frame_duration();
        self.frame_elapsed = 0.0;
        self.state = DriverState::Initialized;
        info!(
            "initialized {} driver with {} bodies, frames {}..{}",
            D::NAME,
            self.archives.len(),
            self.config.start_frame,
            self.config.end_frame
        );
        Ok(())
    }

    /// Largest step that neither exceeds `max_dt` nor crosses the next frame boundary.
    pub fn compute_time_step(&self) -> f32 {
        let remaining = self.config.frame_duration() - self.frame_elapsed;
        self.config.max_dt.min(remaining).max(0.0)
    }

    fn refresh_archives(&mut self) {
        for archive in &mut self.archives {
            archive.refresh();
        }
        self.archives_dirty = false;
    }

    fn update_scene_bvh(&mut self) {
        if self.bvh_dirty {
            self.rebuild_scene_bvh();
            return;
        }
        let volumes: Vec<&ObjectBvh> = self
            .archives
            .iter()
            .map(RigidBodyArchive::object_bvh)
            .collect();
        if !self.scene_bvh.refit(&volumes) {
            self.scene_bvh.build(&volumes);
        }
    }

    /// Adds `gravity * dt` to every dynamic body.
    pub fn perform_gravity(&mut self, dt: f32) {
        let gravity = self.gravity_vector();
        for archive in &mut self.archives {
            self.integrator
                .apply_gravity::<D>(archive.rigid_body_mut(), gravity, dt);
        }
    }

    /// Runs the broad and narrow phase; `true` iff at least one manifold was found.
    pub fn collision_detection(&mut self) -> bool {
        let pairs = self.broad_phase();
        self.narrow_phase(&pairs)
    }

    /// Rederives moved bodies, refits the scene BVH and returns the candidate pairs.
    fn broad_phase(&mut self) -> Vec<(usize, usize)> {
        if self.archives_dirty {
            self.refresh_archives();
        }
        self.update_scene_bvh();
        self.scene_bvh.overlapping_pairs()
    }

    fn narrow_phase(&mut self, pairs: &[(usize, usize)]) -> bool {
        let objects: Vec<&CollidableObject> = self
            .archives
            .iter()
            .map(RigidBodyArchive::collide_object)
            .collect();
        self.collision_result = detect::<D>(&objects, pairs, self.config.contact_margin);

        let archives = &self.archives;
        self.contact_manager
            .update::<D>(&self.collision_result, |index| archives[index].rigid_body().is_static);

        self.notify(|plugin, driver| plugin.on_collision_detection(driver));
        !self.collision_result.is_empty()
    }

    /// Assembles the contact BLCP, solves it and applies the impulses to the velocities.
    fn solve_contacts(&mut self, profiler: &mut StepProfiler) {
        let system = {
            let _timer = ScopedTimer::new("contacts::assemble");
            let _stage = StageTimer::new(&mut profiler.assembly_time);
            let bodies: Vec<&RigidBody> = self
                .archives
                .iter()
                .map(RigidBodyArchive::rigid_body)
                .collect();
            AssembledSystem::assemble::<D>(&bodies, self.contact_manager.points())
        };

        {
            let _timer = ScopedTimer::new("solver::pgs");
            let _stage = StageTimer::new(&mut profiler.solver_time);
            self.solver_metrics =
                self.solver
                    .solve_blcp(&system.problem, &mut self.z_norm, &mut self.z_fric);
        }

        apply_impulse::<D>(
            self.archives.iter_mut().map(RigidBodyArchive::rigid_body_mut),
            &system.inv_mass,
            &system.jacobian_t,
            &system.fric_jacobian_t,
            &self.z_norm,
            &self.z_fric,
        );
    }

    /// Integrates every body over `dt`, then applies the positional correction.
    pub fn update_rigid_body(&mut self, dt: f32) -> Result<()> {
        for archive in &mut self.archives {
            self.integrator.integrate::<D>(archive.rigid_body_mut(), dt);
        }

        let corrections = {
            let bodies: Vec<&RigidBody> = self
                .archives
                .iter()
                .map(RigidBodyArchive::rigid_body)
                .collect();
            self.integrator
                .position_corrections(&bodies, self.contact_manager.points())
        };

        for (archive, correction) in self.archives.iter_mut().zip(corrections) {
            archive.rigid_body_mut().transform.position += correction;
            archive.refresh();

            let body = archive.rigid_body();
            if !is_finite_state(
                body.transform.position,
                body.transform.rotation,
                body.velocity.linear,
                body.velocity.angular,
            ) {
                return Err(PhysicsError::NumericalDivergence {
                    index: archive.index(),
                });
            }
        }
        self.archives_dirty = false;
        Ok(())
    }

    fn run_stages(&mut self, dt: f32, profiler: &mut StepProfiler) -> Result<()> {
        {
            let _timer = ScopedTimer::new("gravity");
            let _stage = StageTimer::new(&mut profiler.gravity_time);
            self.perform_gravity(dt);
        }

        let pairs = {
            let _timer = ScopedTimer::new("collision::broad_phase");
            let _stage = StageTimer::new(&mut profiler.broad_phase_time);
            self.broad_phase()
        };
        let found = {
            let _timer = ScopedTimer::new("collision::narrow_phase");
            let _stage = StageTimer::new(&mut profiler.narrow_phase_time);
            self.narrow_phase(&pairs)
        };

        if found {
            self.solve_contacts(profiler);
        } else {
            self.z_norm.reset(0);
            self.z_fric.reset(0);
            self.solver_metrics = SolverStepMetrics::default();
        }

        let _timer = ScopedTimer::new("integrator");
        let _stage = StageTimer::new(&mut profiler.integrator_time);
        self.update_rigid_body(dt)
    }

    /// Current state as a restartable snapshot.
    pub fn snapshot(&self) -> DriverSnapshot {
        DriverSnapshot {
            dimension: D::NAME.to_string(),
            frame: self.frame,
            step: self.step,
            time: self.time,
            gravity: self.gravity_vector(),
            config: self.config.clone(),
            bodies: self
                .archives
                .iter()
                .map(|archive| archive.rigid_body().clone())
                .collect(),
        }
    }

    pub fn with_restart_support(&self) -> bool {
        true
    }

    /// Writes a JSON snapshot of the current state.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        self.snapshot().write(path)
    }

    /// Restores bodies, counters and configuration from a snapshot written by
    /// [`RigidBodyDriver::write`]. Registered plugins are kept.
    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = DriverSnapshot::read(path)?;
        self.restore(snapshot)
    }

    pub fn restore(&mut self, snapshot: DriverSnapshot) -> Result<()> {
        if snapshot.dimension != D::NAME {
            return Err(PhysicsError::configuration(format!(
                "snapshot holds a {} scene, driver simulates {}",
                snapshot.dimension,
                D::NAME
            )));
        }
        snapshot.config.validate()?;

        let mut archives = Vec::with_capacity(snapshot.bodies.len());
        for (index, body) in snapshot.bodies.into_iter().enumerate() {
            body.validate(index)?;
            let mut archive = RigidBodyArchive::with_margin(body, snapshot.config.contact_margin);
            archive.set_index(index);
            archives.push(archive);
        }

        self.archives = archives;
        self.apply_config(snapshot.config)?;
        self.gravity = -snapshot.gravity.y;
        self.frame = snapshot.frame;
        self.step = snapshot.step;
        self.time = snapshot.time;
        self.frame_elapsed = 0.0;
        self.collision_result.clear();
        self.contact_manager.clear();
        self.rebuild_scene_bvh();
        self.state = DriverState::Initialized;
        Ok(())
    }

    fn snapshot_path(&self) -> String {
        format!("{}{}.json", self.config.output_prefix, self.frame)
    }
}

impl<D: Dimension> Steppable for RigidBodyDriver<D> {
    fn advance_step(&mut self, dt: f32) -> Result<()> {
        self.ensure_steppable()?;
        if self.state == DriverState::Uninitialized {
            self.initialize()?;
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(PhysicsError::InvalidTimeStep { dt });
        }
        self.state = DriverState::Stepping;
        self.notify(|plugin, driver| plugin.on_begin_time_step(driver, dt));

        let started = Instant::now();
        let mut profiler = std::mem::take(&mut self.profiler);
        let outcome = self.run_stages(dt, &mut profiler);
        profiler.total_step_time += started.elapsed();
        profiler.steps += 1;
        profiler.body_count = self.archives.len();
        profiler.contact_count = self.contact_manager.num_contact_points();
        self.profiler = profiler;
        if let Err(err) = outcome {
            error!("step {} at t={:.4} aborted: {err}", self.step + 1, self.time);
            self.state = DriverState::Failed;
            return Err(err);
        }

        self.step += 1;
        self.time += dt;
        self.frame_elapsed += dt;
        debug!(
            "step {} dt={dt:.5} t={:.4}: {} manifolds, {} contact points, normal impulse {:.4}",
            self.step,
            self.time,
            self.collision_result.num_manifolds(),
            self.contact_manager.num_contact_points(),
            self.solver_metrics.normal_impulse_sum
        );
        self.notify(|plugin, driver| plugin.on_end_time_step(driver, dt));
        Ok(())
    }

    fn advance_frame(&mut self) -> Result<()> {
        self.ensure_steppable()?;
        if self.state == DriverState::Uninitialized {
            self.initialize()?;
        }
        self.notify(|plugin, driver| plugin.on_begin_frame(driver));

        let started = Instant::now();
        let frame_duration = self.config.frame_duration();
        // Tolerate rounding of the accumulated step lengths.
        let tolerance = frame_duration * 1e-4;
        while self.frame_elapsed < frame_duration - tolerance {
            let dt = self.compute_time_step();
            self.advance_step(dt)?;
        }
        self.frame_elapsed = 0.0;
        warn_if_frame_budget_exceeded(
            self.frame,
            started.elapsed(),
            std::time::Duration::from_secs_f32(frame_duration),
        );

        self.notify(|plugin, driver| plugin.on_end_frame(driver));
        if self.config.write_to_file {
            self.write(self.snapshot_path())?;
        }
        self.frame += 1;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.ensure_steppable()?;
        if self.state == DriverState::Uninitialized {
            self.initialize()?;
        }
        while self.frame < self.config.end_frame {
            self.advance_frame()?;
        }
        self.state = DriverState::Finished;
        info!(
            "finished {} simulation at frame {} after {} steps ({:.3} s simulated)",
            D::NAME,
            self.frame,
            self.step,
            self.time
        );
        self.profiler.report();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{dimension::ThreeD, rigidbody::BodyId, shape::Shape};

    #[test]
    fn duplicate_bodies_are_rejected() {
        let mut driver = RigidBodyDriver::<ThreeD>::new();
        let body = RigidBody::dynamic(BodyId(7), Shape::sphere(0.5), 1.0);
        assert_eq!(driver.add_rigid_body(body.clone(), true).expect("first insert"), 0);
        let err = driver.add_rigid_body(body, true).expect_err("duplicate");
        assert!(matches!(err, PhysicsError::DuplicateBody { id: 7 }));
    }

    #[test]
    fn time_step_stops_at_frame_boundary() {
        let config = DriverConfig {
            frame_rate: 40.0,
            max_dt: 0.01,
            ..DriverConfig::default()
        };
        let mut driver = RigidBodyDriver::<ThreeD>::with_config(config).expect("valid config");
        assert!((driver.compute_time_step() - 0.01).abs() < 1e-7);
        driver.frame_elapsed = 0.02;
        assert!((driver.compute_time_step() - 0.005).abs() < 1e-6);
    }

    #[test]
    fn finished_driver_refuses_to_step() {
        let config = DriverConfig {
            end_frame: 1,
            ..DriverConfig::default()
        };
        let mut driver = RigidBodyDriver::<ThreeD>::with_config(config).expect("valid config");
        driver.run().expect("empty run");
        assert_eq!(driver.state(), DriverState::Finished);
        assert!(matches!(
            driver.advance_step(0.01),
            Err(PhysicsError::InvalidState { .. })
        ));
    }

    #[test]
    fn invalid_time_steps_are_rejected() {
        let mut driver = RigidBodyDriver::<ThreeD>::new();
        assert!(matches!(
            driver.advance_step(0.0),
            Err(PhysicsError::InvalidTimeStep { .. })
        ));
        assert!(matches!(
            driver.advance_step(f32::NAN),
            Err(PhysicsError::InvalidTimeStep { .. })
        ));
    }
}
