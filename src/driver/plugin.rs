use std::sync::Arc;

use parking_lot::Mutex;

use super::RigidBodyDriver;
use crate::core::dimension::Dimension;

/// Listener invoked synchronously by the driver, in registration order.
///
/// Every hook has an empty default, so a plugin only implements what it observes. Hooks see
/// the driver read-only.
pub trait RigidDriverPlugin<D: Dimension>: Send {
    fn on_begin_frame(&mut self, _driver: &RigidBodyDriver<D>) {}

    fn on_end_frame(&mut self, _driver: &RigidBodyDriver<D>) {}

    fn on_begin_time_step(&mut self, _driver: &RigidBodyDriver<D>, _dt: f32) {}

    fn on_end_time_step(&mut self, _driver: &RigidBodyDriver<D>, _dt: f32) {}

    /// Called after the body at `index` has been archived.
    fn on_add_rigid_body(&mut self, _driver: &RigidBodyDriver<D>, _index: usize) {}

    /// Called after the narrow phase, before the contact response is solved.
    fn on_collision_detection(&mut self, _driver: &RigidBodyDriver<D>) {}
}

/// Shared handle to a registered plugin; callers keep a clone to read its state.
pub type PluginHandle<D> = Arc<Mutex<dyn RigidDriverPlugin<D>>>;

/// Counts driver events; handy for diagnostics and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventCounter {
    pub frames_begun: usize,
    pub frames_ended: usize,
    pub steps_begun: usize,
    pub steps_ended: usize,
    pub bodies_added: usize,
    pub detections: usize,
    /// Steps whose narrow phase reported at least one manifold.
    pub steps_with_contacts: usize,
}

impl<D: Dimension> RigidDriverPlugin<D> for EventCounter {
    fn on_begin_frame(&mut self, _driver: &RigidBodyDriver<D>) {
        self.frames_begun += 1;
    }

    fn on_end_frame(&mut self, _driver: &RigidBodyDriver<D>) {
        self.frames_ended += 1;
    }

    fn on_begin_time_step(&mut self, _driver: &RigidBodyDriver<D>, _dt: f32) {
        self.steps_begun += 1;
    }

    fn on_end_time_step(&mut self, _driver: &RigidBodyDriver<D>, _dt: f32) {
        self.steps_ended += 1;
    }

    fn on_add_rigid_body(&mut self, _driver: &RigidBodyDriver<D>, _index: usize) {
        self.bodies_added += 1;
    }

    fn on_collision_detection(&mut self, driver: &RigidBodyDriver<D>) {
        self.detections += 1;
        if !driver.collision_result().is_empty() {
            self.steps_with_contacts += 1;
        }
    }
}
