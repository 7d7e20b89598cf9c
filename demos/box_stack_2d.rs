use contact_dynamics::prelude::*;

const LEVELS: usize = 5;

fn main() -> contact_dynamics::Result<()> {
    let config = DriverConfig {
        end_frame: 90,
        solver_iterations: 80,
        ..DriverConfig::default()
    };
    let mut driver = RigidBodyDriver::<TwoD>::with_config(config)?;
    driver.add_rigid_body(RigidBody::fixed(BodyId(0), Shape::ground()), false)?;
    for level in 0..LEVELS {
        let block = RigidBody::dynamic(BodyId(level as u64 + 1), Shape::cuboid(Vec3::splat(0.5)), 1.0)
            .with_position(Vec3::new(0.02 * level as f32, 0.5 + level as f32, 0.0))
            .with_material(Material::new(0.0, 0.6));
        driver.add_rigid_body(block, false)?;
    }
    driver.rebuild_scene_bvh();

    driver.run()?;
    for index in 1..driver.num_rigid_body() {
        let body = driver.rigid_body(index)?;
        println!(
            "block {index}: x={:.3} y={:.3}",
            body.transform.position.x, body.transform.position.y
        );
    }
    println!("{} steps, {} contact points", driver.step_count(), driver.contact_points().len());
    Ok(())
}
