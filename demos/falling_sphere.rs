use contact_dynamics::prelude::*;

fn main() -> contact_dynamics::Result<()> {
    let config = DriverConfig {
        end_frame: 60,
        ..DriverConfig::default()
    };
    let mut driver = RigidBodyDriver::<ThreeD>::with_config(config)?;
    driver.add_rigid_body(
        RigidBody::fixed(BodyId(0), Shape::ground()).with_material(Material::new(0.5, 0.3)),
        false,
    )?;
    let sphere = driver.add_rigid_body(
        RigidBody::dynamic(BodyId(1), Shape::sphere(0.5), 1.0)
            .with_position(Vec3::new(0.0, 3.0, 0.0))
            .with_velocity(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO)
            .with_material(Material::new(0.5, 0.3)),
        true,
    )?;

    driver.initialize()?;
    while driver.frame() < driver.config().end_frame {
        driver.advance_frame()?;
        let body = driver.rigid_body(sphere)?;
        println!(
            "frame {:3}: position {:?} velocity {:?} contacts {}",
            driver.frame(),
            body.transform.position,
            body.velocity.linear,
            driver.contact_points().len()
        );
    }
    Ok(())
}
