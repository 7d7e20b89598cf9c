use std::sync::Arc;

use approx::assert_relative_eq;
use contact_dynamics::*;
use glam::Mat3;
use parking_lot::Mutex;

const DT: f32 = 0.01;

fn ground() -> RigidBody {
    RigidBody::fixed(BodyId(0), Shape::ground()).with_material(Material::inelastic_frictionless())
}

fn unit_sphere(id: u64, height: f32) -> RigidBody {
    RigidBody::dynamic(BodyId(id), Shape::sphere(0.5), 1.0)
        .with_mass_properties(MassProperties::new(1.0, Mat3::IDENTITY))
        .with_material(Material::inelastic_frictionless())
        .with_position(Vec3::new(0.0, height, 0.0))
}

fn scene<D: Dimension>(bodies: Vec<RigidBody>) -> RigidBodyDriver<D> {
    let mut driver = RigidBodyDriver::<D>::new();
    for body in bodies {
        driver.add_rigid_body(body, false).expect("valid body");
    }
    driver.rebuild_scene_bvh();
    driver
}

#[test]
fn sphere_lands_on_ground_and_stops() {
    let mut driver = scene::<ThreeD>(vec![ground(), unit_sphere(1, 1.0)]);

    let mut landed = false;
    for _ in 0..100 {
        let before = driver.rigid_body(1).expect("sphere").velocity.linear.y;
        driver.advance_step(DT).expect("step");
        let (z_norm, z_fric) = driver.last_impulses();
        if z_norm.is_empty() {
            continue;
        }

        let after = driver.rigid_body(1).expect("sphere").velocity.linear.y;
        // Impulse equals the momentum change of the unit mass after gravity was applied.
        assert_relative_eq!(z_norm[0], after - (before - 9.81 * DT), epsilon = 1e-5);
        assert!(after.abs() < 1e-4, "vertical velocity {after}");
        assert!(z_fric.iter().all(|z| *z == 0.0));
        landed = true;
        break;
    }
    assert!(landed, "sphere never reached the ground");

    for _ in 0..50 {
        driver.advance_step(DT).expect("step");
    }
    let sphere = driver.rigid_body(1).expect("sphere");
    assert!(sphere.velocity.linear.y.abs() < 1e-4);
    assert!(sphere.transform.position.y > 0.45 && sphere.transform.position.y < 0.51);
}

#[test]
fn free_fall_only_applies_gravity() {
    let mut driver = scene::<ThreeD>(vec![ground(), unit_sphere(1, 5.0)]);
    driver.advance_step(DT).expect("step");

    assert!(driver.collision_result().is_empty());
    assert!(driver.contact_points().is_empty());
    let sphere = driver.rigid_body(1).expect("sphere");
    assert_relative_eq!(sphere.velocity.linear.y, -9.81 * DT, epsilon = 1e-6);
    assert_relative_eq!(sphere.transform.position.y, 5.0 - 9.81 * DT * DT, epsilon = 1e-5);
    assert_eq!(sphere.velocity.angular, Vec3::ZERO);
}

#[test]
fn resting_contact_does_not_approach() {
    let mut driver = scene::<ThreeD>(vec![ground(), unit_sphere(1, 0.5)]);
    driver.advance_step(DT).expect("step");

    assert_eq!(driver.collision_result().num_manifolds(), 1);
    let contact = &driver.contact_points()[0];
    assert_eq!(contact.normal, Vec3::Y);
    let sphere = driver.rigid_body(1).expect("sphere");
    assert!(sphere.velocity.linear.dot(contact.normal) >= -1e-5);
}

#[test]
fn restitution_scales_separation_speed() {
    let bouncy = Material::new(0.5, 0.0);
    let mut driver = scene::<ThreeD>(vec![
        RigidBody::fixed(BodyId(0), Shape::ground()).with_material(bouncy),
        unit_sphere(1, 0.5)
            .with_material(bouncy)
            .with_velocity(Vec3::new(0.0, -2.0, 0.0), Vec3::ZERO),
    ]);
    driver.set_gravity(0.0);
    driver.advance_step(DT).expect("step");

    let sphere = driver.rigid_body(1).expect("sphere");
    assert_relative_eq!(sphere.velocity.linear.y, 1.0, epsilon = 1e-4);
}

#[test]
fn frictionless_sliding_keeps_tangential_velocity() {
    let mut driver = scene::<ThreeD>(vec![
        ground(),
        unit_sphere(1, 0.5).with_velocity(Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO),
    ]);
    for _ in 0..10 {
        driver.advance_step(DT).expect("step");
        let (_, z_fric) = driver.last_impulses();
        assert!(z_fric.iter().all(|z| *z == 0.0));
    }
    let sphere = driver.rigid_body(1).expect("sphere");
    assert_relative_eq!(sphere.velocity.linear.x, 2.0, epsilon = 1e-6);
}

/// Sum of the friction edge impulses of contact `i` as a world-space vector.
fn tangential_impulse<D: Dimension>(driver: &RigidBodyDriver<D>, i: usize) -> Vec3 {
    let (_, z_fric) = driver.last_impulses();
    let contact = &driver.contact_points()[i];
    contact
        .friction_directions
        .iter()
        .enumerate()
        .map(|(k, d)| *d * z_fric[contact.friction_rows + k])
        .sum()
}

#[test]
fn sliding_friction_obeys_coulomb() {
    let rough = Material::new(0.0, 0.5);
    // Rotation is frozen out so the contact keeps sliding for the whole step.
    let puck = RigidBody::dynamic(BodyId(1), Shape::sphere(0.5), 1.0)
        .with_mass_properties(MassProperties::new(1.0, Mat3::from_diagonal(Vec3::splat(1e6))))
        .with_material(rough)
        .with_position(Vec3::new(0.0, 0.5, 0.0))
        .with_velocity(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO);
    let mut driver = scene::<ThreeD>(vec![
        RigidBody::fixed(BodyId(0), Shape::ground()).with_material(rough),
        puck,
    ]);
    driver.advance_step(DT).expect("step");

    let (z_norm, _) = driver.last_impulses();
    let tangential = tangential_impulse(&driver, 0);
    assert!(tangential.length() <= 0.5 * z_norm[0] * (1.0 + 1e-5));
    // Friction opposes the slip.
    assert!(tangential.x.abs() > 0.99 * tangential.length());

    let puck = driver.rigid_body(1).expect("puck");
    let expected = 5.0 - 0.5 * DriverConfig::default().gravity * DT;
    assert_relative_eq!(puck.velocity.linear.x, expected, epsilon = 1e-4);
    assert!(puck.velocity.linear.z.abs() < 1e-5);
}

#[test]
fn friction_slows_a_sliding_sphere() {
    let rough = Material::new(0.0, 0.5);
    let mut driver = scene::<ThreeD>(vec![
        RigidBody::fixed(BodyId(0), Shape::ground()).with_material(rough),
        unit_sphere(1, 0.5)
            .with_material(rough)
            .with_velocity(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO),
    ]);
    driver.advance_step(DT).expect("step");

    let (z_norm, z_fric) = driver.last_impulses();
    let limit = 0.5 * z_norm[0];
    assert!(z_fric.iter().all(|z| (0.0..=limit + 1e-6).contains(z)));
    assert!(tangential_impulse(&driver, 0).length() <= limit * (1.0 + 1e-5));

    let sphere = driver.rigid_body(1).expect("sphere");
    assert!(sphere.velocity.linear.x < 1.0);
    assert!(sphere.velocity.linear.x > 0.8);
    // Friction at the contact point spins the sphere about -z.
    assert!(sphere.velocity.angular.z < 0.0);
}

#[test]
fn planar_box_rests_on_ground() {
    let block = RigidBody::dynamic(BodyId(1), Shape::cuboid(Vec3::new(0.5, 0.5, 0.5)), 1.0)
        .with_material(Material::new(0.0, 0.6))
        .with_position(Vec3::new(0.0, 0.5, 0.0));
    let mut driver = scene::<TwoD>(vec![ground(), block]);
    for _ in 0..100 {
        driver.advance_step(DT).expect("step");
    }

    let block = driver.rigid_body(1).expect("block");
    assert_eq!(driver.contact_points().len(), 2);
    assert!((block.transform.position.y - 0.5).abs() < 0.05);
    assert!(block.velocity.linear.y.abs() < 0.05);
    assert_eq!(block.transform.position.z, 0.0);
    assert!(driver.contact_points().iter().all(|c| c.friction_directions.len() == 2));
}

#[test]
fn identical_scenes_evolve_identically() {
    fn build() -> RigidBodyDriver<ThreeD> {
        let mut bodies = vec![RigidBody::fixed(BodyId(0), Shape::ground())];
        for i in 0..6u64 {
            let x = (i % 3) as f32 * 1.05 - 1.0;
            let y = 0.5 + (i / 3) as f32 * 1.1;
            let shape = if i % 2 == 0 {
                Shape::sphere(0.5)
            } else {
                Shape::cuboid(Vec3::splat(0.5))
            };
            bodies.push(
                RigidBody::dynamic(BodyId(i + 1), shape, 1.0 + i as f32 * 0.1)
                    .with_position(Vec3::new(x, y, 0.1 * i as f32))
                    .with_material(Material::new(0.2, 0.4)),
            );
        }
        scene(bodies)
    }

    let mut a = build();
    let mut b = build();
    for _ in 0..40 {
        a.advance_step(DT).expect("step");
        b.advance_step(DT).expect("step");
    }
    for i in 0..a.num_rigid_body() {
        assert_eq!(a.rigid_body(i).expect("body"), b.rigid_body(i).expect("body"));
    }
    assert_eq!(a.last_impulses(), b.last_impulses());
}

#[test]
fn run_covers_the_frame_range() {
    let config = DriverConfig {
        start_frame: 2,
        end_frame: 5,
        ..DriverConfig::default()
    };
    let mut driver = RigidBodyDriver::<ThreeD>::with_config(config).expect("config");
    let counter = Arc::new(Mutex::new(EventCounter::default()));
    driver.add_plugin(counter.clone());
    driver.add_rigid_body(ground(), false).expect("ground");
    driver.add_rigid_body(unit_sphere(1, 3.0), true).expect("sphere");

    driver.run().expect("run");
    assert_eq!(driver.state(), DriverState::Finished);
    assert_eq!(driver.frame(), 5);

    let counter = counter.lock();
    assert_eq!(counter.bodies_added, 2);
    assert_eq!(counter.frames_begun, 3);
    assert_eq!(counter.frames_ended, 3);
    // 1/30 s frames split into 0.01 s steps plus a remainder.
    assert_eq!(counter.steps_begun, 12);
    assert_eq!(counter.steps_ended, 12);
    assert_eq!(counter.detections, 12);
    assert_relative_eq!(driver.time(), 5.0 / 30.0, epsilon = 1e-4);
}

#[test]
fn deferred_bvh_rebuild_still_detects_contacts() {
    let mut driver = RigidBodyDriver::<ThreeD>::new();
    driver.add_rigid_body(ground(), false).expect("ground");
    driver.add_rigid_body(unit_sphere(1, 0.5), false).expect("sphere");
    assert!(driver.scene_bvh().is_empty());

    driver.advance_step(DT).expect("step");
    assert!(driver.scene_bvh().covers_all());
    assert_eq!(driver.collision_result().num_manifolds(), 1);
}

#[test]
fn moved_bodies_are_rederived() {
    let mut driver = scene::<ThreeD>(vec![ground(), unit_sphere(1, 5.0)]);
    driver.advance_step(DT).expect("step");
    assert!(driver.collision_result().is_empty());

    driver.rigid_body_mut(1).expect("sphere").transform.position.y = 0.45;
    driver.advance_step(DT).expect("step");
    assert!(!driver.collision_result().is_empty());
}

#[test]
fn invalid_bodies_are_rejected() {
    let mut driver = RigidBodyDriver::<ThreeD>::new();
    let plane = RigidBody::dynamic(BodyId(1), Shape::ground(), 1.0);
    assert!(matches!(
        driver.add_rigid_body(plane, true),
        Err(PhysicsError::InvalidShape { .. })
    ));

    let massless = RigidBody::dynamic(BodyId(2), Shape::sphere(1.0), 0.0);
    assert!(matches!(
        driver.add_rigid_body(massless, true),
        Err(PhysicsError::DegenerateMass { index: 0, .. })
    ));

    assert!(matches!(
        driver.rigid_body(3),
        Err(PhysicsError::InvalidBodyIndex { index: 3, count: 0 })
    ));
    assert!(matches!(
        MassProperties::from_volumetric_mesh(&[], &[], 1.0),
        Err(PhysicsError::Unimplemented { .. })
    ));
}

#[test]
fn diverging_state_aborts_the_step() {
    let mut driver = scene::<ThreeD>(vec![unit_sphere(1, 5.0)]);
    driver.rigid_body_mut(0).expect("sphere").velocity.linear = Vec3::new(f32::NAN, 0.0, 0.0);
    assert!(matches!(
        driver.advance_step(DT),
        Err(PhysicsError::NumericalDivergence { index: 0 })
    ));
}

#[test]
fn failed_step_leaves_the_driver_unsteppable() {
    let healthy = unit_sphere(1, 5.0);
    let broken = unit_sphere(2, 5.0).with_position(Vec3::new(10.0, 5.0, 0.0));
    let mut driver = scene::<ThreeD>(vec![healthy, broken]);
    driver.rigid_body_mut(1).expect("sphere").velocity.linear = Vec3::new(f32::NAN, 0.0, 0.0);
    assert!(matches!(
        driver.advance_step(DT),
        Err(PhysicsError::NumericalDivergence { index: 1 })
    ));

    assert_eq!(driver.state(), DriverState::Failed);
    assert_eq!(driver.step_count(), 0);
    assert_eq!(driver.time(), 0.0);
    assert!(matches!(
        driver.advance_step(DT),
        Err(PhysicsError::InvalidState { .. })
    ));
    assert!(matches!(driver.advance_frame(), Err(PhysicsError::InvalidState { .. })));
    assert!(matches!(driver.run(), Err(PhysicsError::InvalidState { .. })));
    assert!(matches!(
        driver.add_rigid_body(unit_sphere(3, 8.0), true),
        Err(PhysicsError::InvalidState { .. })
    ));

    // Restoring a healthy snapshot brings the driver back.
    let healthy = scene::<ThreeD>(vec![unit_sphere(1, 5.0)]);
    driver.restore(healthy.snapshot()).expect("restore");
    assert_eq!(driver.state(), DriverState::Initialized);
    driver.advance_step(DT).expect("step after restore");
    assert_eq!(driver.step_count(), 1);
}

#[test]
fn broad_and_narrow_phase_are_timed_separately() {
    let mut bodies = vec![ground()];
    bodies.extend(
        (0..8u64).map(|i| unit_sphere(i + 1, 0.5).with_position(Vec3::new(i as f32 * 1.1, 0.5, 0.0))),
    );
    let mut driver = scene::<ThreeD>(bodies);
    for _ in 0..5 {
        driver.advance_step(DT).expect("step");
    }

    let profile = driver.profiler();
    assert_eq!(profile.steps, 5);
    assert!(profile.broad_phase_time > std::time::Duration::ZERO);
    assert!(profile.narrow_phase_time > std::time::Duration::ZERO);
    let stages = profile.gravity_time
        + profile.broad_phase_time
        + profile.narrow_phase_time
        + profile.assembly_time
        + profile.solver_time
        + profile.integrator_time;
    assert!(stages <= profile.total_step_time);
}
