//! Exact contact generation between pairs of collidable objects.

use glam::{Mat3, Vec3};

use super::{
    collidable::{CollidableObject, WorldShape},
    detection::ManifoldPoint,
};
use crate::core::dimension::Dimension;

/// Upper bound on points kept per manifold.
pub const MAX_MANIFOLD_POINTS: usize = 8;

/// Points closer than this are merged into one contact.
const WELD_DISTANCE: f32 = 1e-3;

/// Contact normal (from A towards B) and the points sharing it.
pub type PairContact = (Vec3, Vec<ManifoldPoint>);

/// Narrow phase dispatcher.
pub struct NarrowPhase;

impl NarrowPhase {
    /// Computes the contact between `a` and `b`. Pairs separated by more than `margin`
    /// produce `None`; touching pairs produce points with (near) zero depth.
    pub fn collide<D: Dimension>(
        a: &CollidableObject,
        b: &CollidableObject,
        margin: f32,
    ) -> Option<PairContact> {
        use WorldShape::*;

        match (&a.shape, &b.shape) {
            (
                Sphere {
                    center: ca,
                    radius: ra,
                },
                Sphere {
                    center: cb,
                    radius: rb,
                },
            ) => sphere_sphere(*ca, *ra, *cb, *rb, margin),
            (Sphere { center, radius }, Plane { normal, offset }) => {
                sphere_plane(*center, *radius, *normal, *offset, margin)
            }
            (Plane { normal, offset }, Sphere { center, radius }) => {
                flip(sphere_plane(*center, *radius, *normal, *offset, margin))
            }
            (Sphere { center, radius }, Box { .. }) => {
                sphere_box::<D>(*center, *radius, &b.shape, margin)
            }
            (Box { .. }, Sphere { center, radius }) => {
                flip(sphere_box::<D>(*center, *radius, &a.shape, margin))
            }
            (Box { corners, .. }, Plane { normal, offset }) => {
                box_plane(corners, *normal, *offset, margin)
            }
            (Plane { normal, offset }, Box { corners, .. }) => {
                flip(box_plane(corners, *normal, *offset, margin))
            }
            (Box { .. }, Box { .. }) => SatAlgorithm::intersect_boxes::<D>(&a.shape, &b.shape, margin),
            (Plane { .. }, Plane { .. }) => None,
        }
    }
}

fn flip(contact: Option<PairContact>) -> Option<PairContact> {
    contact.map(|(normal, points)| (-normal, points))
}

fn sphere_sphere(ca: Vec3, ra: f32, cb: Vec3, rb: f32, margin: f32) -> Option<PairContact> {
    let delta = cb - ca;
    let distance = delta.length();
    let depth = ra + rb - distance;
    if depth < -margin {
        return None;
    }
    let normal = if distance > 1e-6 {
        delta / distance
    } else {
        Vec3::Y
    };
    let position = ca + normal * (ra - 0.5 * depth);
    Some((normal, vec![ManifoldPoint { position, depth }]))
}

/// Sphere as body A, half-space as body B.
fn sphere_plane(
    center: Vec3,
    radius: f32,
    plane_normal: Vec3,
    offset: f32,
    margin: f32,
) -> Option<PairContact> {
    let height = plane_normal.dot(center) - offset;
    let depth = radius - height;
    if depth < -margin {
        return None;
    }
    let position = center - plane_normal * (radius - 0.5 * depth);
    Some((-plane_normal, vec![ManifoldPoint { position, depth }]))
}

/// Sphere as body A, box as body B.
fn sphere_box<D: Dimension>(
    center: Vec3,
    radius: f32,
    box_shape: &WorldShape,
    margin: f32,
) -> Option<PairContact> {
    let WorldShape::Box {
        center: box_center,
        axes,
        half_extents,
        ..
    } = box_shape
    else {
        return None;
    };

    let local = axes.transpose() * (center - *box_center);
    let closest = local.clamp(-*half_extents, *half_extents);
    let offset = local - closest;
    let distance = offset.length();

    if distance <= 1e-6 {
        // Centre inside the box: push out through the nearest face.
        let mut best_axis = 0;
        let mut best_gap = f32::MAX;
        for axis in 0..D::DIM {
            let gap = half_extents[axis] - local[axis].abs();
            if gap < best_gap {
                best_gap = gap;
                best_axis = axis;
            }
        }
        let mut face = Vec3::ZERO;
        face[best_axis] = if local[best_axis] < 0.0 { -1.0 } else { 1.0 };
        let outward = *axes * face;
        return Some((
            -outward,
            vec![ManifoldPoint {
                position: center,
                depth: radius + best_gap,
            }],
        ));
    }

    let depth = radius - distance;
    if depth < -margin {
        return None;
    }
    let outward = *axes * (offset / distance);
    let box_point = *box_center + *axes * closest;
    let sphere_point = center - outward * radius;
    Some((
        -outward,
        vec![ManifoldPoint {
            position: (box_point + sphere_point) * 0.5,
            depth,
        }],
    ))
}

/// Box as body A (given by its world corners), half-space as body B.
fn box_plane(corners: &[Vec3], plane_normal: Vec3, offset: f32, margin: f32) -> Option<PairContact> {
    let mut points = Vec::new();
    for &corner in corners {
        let depth = offset - plane_normal.dot(corner);
        if depth >= -margin {
            push_welded(
                &mut points,
                ManifoldPoint {
                    position: corner + plane_normal * (0.5 * depth),
                    depth,
                },
            );
        }
    }
    if points.is_empty() {
        return None;
    }
    Some((-plane_normal, limit_points(points)))
}

fn push_welded(points: &mut Vec<ManifoldPoint>, point: ManifoldPoint) {
    if points
        .iter()
        .all(|p| p.position.distance(point.position) > WELD_DISTANCE)
    {
        points.push(point);
    }
}

/// Keeps the deepest points; ties keep generation order.
fn limit_points(mut points: Vec<ManifoldPoint>) -> Vec<ManifoldPoint> {
    if points.len() > MAX_MANIFOLD_POINTS {
        points.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        points.truncate(MAX_MANIFOLD_POINTS);
    }
    points
}

/// Separating axis theorem for oriented box pairs.
pub struct SatAlgorithm;

impl SatAlgorithm {
    pub fn intersect_boxes<D: Dimension>(
        a: &WorldShape,
        b: &WorldShape,
        margin: f32,
    ) -> Option<PairContact> {
        let (
            WorldShape::Box {
                center: center_a,
                axes: axes_a,
                half_extents: half_a,
                corners: corners_a,
            },
            WorldShape::Box {
                center: center_b,
                axes: axes_b,
                half_extents: half_b,
                corners: corners_b,
            },
        ) = (a, b)
        else {
            return None;
        };

        let relative_pos = *center_b - *center_a;
        let basis_a = [axes_a.x_axis, axes_a.y_axis, axes_a.z_axis];
        let basis_b = [axes_b.x_axis, axes_b.y_axis, axes_b.z_axis];

        let mut test_axes = Vec::with_capacity(15);
        test_axes.extend_from_slice(&basis_a[..D::DIM]);
        test_axes.extend_from_slice(&basis_b[..D::DIM]);
        if !D::PLANAR {
            for axis_a in &basis_a {
                for axis_b in &basis_b {
                    let axis = axis_a.cross(*axis_b);
                    if axis.length_squared() > 1e-6 {
                        test_axes.push(axis.normalize());
                    }
                }
            }
        }

        let mut min_overlap = f32::MAX;
        let mut min_axis = Vec3::ZERO;

        for axis in test_axes {
            let extent_a = projected_extent(axes_a, *half_a, axis);
            let extent_b = projected_extent(axes_b, *half_b, axis);
            let projection = relative_pos.dot(axis);
            let overlap = (extent_a + extent_b) - projection.abs();

            if overlap < -margin {
                return None;
            }

            if overlap < min_overlap {
                min_overlap = overlap;
                min_axis = if projection < 0.0 { -axis } else { axis };
            }
        }

        let normal = min_axis.normalize_or_zero();
        let face_a = center_a.dot(normal) + projected_extent(axes_a, *half_a, normal);
        let face_b = center_b.dot(normal) - projected_extent(axes_b, *half_b, normal);

        let mut points = Vec::new();
        for &corner in corners_b {
            let depth = face_a - corner.dot(normal);
            if depth >= -margin && contains::<D>(*center_a, axes_a, *half_a, corner, margin) {
                push_welded(
                    &mut points,
                    ManifoldPoint {
                        position: corner + normal * (0.5 * depth),
                        depth,
                    },
                );
            }
        }
        for &corner in corners_a {
            let depth = corner.dot(normal) - face_b;
            if depth >= -margin && contains::<D>(*center_b, axes_b, *half_b, corner, margin) {
                push_welded(
                    &mut points,
                    ManifoldPoint {
                        position: corner - normal * (0.5 * depth),
                        depth,
                    },
                );
            }
        }

        if points.is_empty() {
            // Edge-edge contact: no corner is inside the other box.
            let support_a = support(*center_a, axes_a, *half_a, normal);
            let support_b = support(*center_b, axes_b, *half_b, -normal);
            points.push(ManifoldPoint {
                position: (support_a + support_b) * 0.5,
                depth: min_overlap,
            });
        }

        Some((normal, limit_points(points)))
    }
}

fn projected_extent(axes: &Mat3, half_extents: Vec3, axis: Vec3) -> f32 {
    axes.x_axis.dot(axis).abs() * half_extents.x
        + axes.y_axis.dot(axis).abs() * half_extents.y
        + axes.z_axis.dot(axis).abs() * half_extents.z
}

fn support(center: Vec3, axes: &Mat3, half_extents: Vec3, direction: Vec3) -> Vec3 {
    let local_dir = axes.transpose() * direction;
    let local = Vec3::new(
        half_extents.x.copysign(local_dir.x),
        half_extents.y.copysign(local_dir.y),
        half_extents.z.copysign(local_dir.z),
    );
    center + *axes * local
}

fn contains<D: Dimension>(
    center: Vec3,
    axes: &Mat3,
    half_extents: Vec3,
    point: Vec3,
    margin: f32,
) -> bool {
    let local = axes.transpose() * (point - center);
    (0..D::DIM).all(|axis| local[axis].abs() <= half_extents[axis] + margin + WELD_DISTANCE)
}
