use std::marker::PhantomData;

use crate::{
    collision::{bvh::ObjectBvh, collidable::CollidableObject},
    config::DEFAULT_CONTACT_MARGIN,
    core::{dimension::Dimension, rigidbody::RigidBody},
};

/// A rigid body together with the collision data derived from it.
///
/// The collidable object and object BVH always describe the body's current transform; they
/// are re-derived by [`RigidBodyArchive::set_rigid_body`] and [`RigidBodyArchive::refresh`].
#[derive(Debug, Clone)]
pub struct RigidBodyArchive<D: Dimension> {
    index: usize,
    body: RigidBody,
    object: CollidableObject,
    bvh: ObjectBvh,
    margin: f32,
    _dimension: PhantomData<D>,
}

impl<D: Dimension> RigidBodyArchive<D> {
    pub fn new(body: RigidBody) -> Self {
        Self::with_margin(body, DEFAULT_CONTACT_MARGIN)
    }

    /// Archive whose object BVH is inflated by `margin`.
    pub fn with_margin(mut body: RigidBody, margin: f32) -> Self {
        D::constrain(&mut body);
        let object = CollidableObject::from_body::<D>(&body);
        let bvh = ObjectBvh::from_object(&object, margin);
        Self {
            index: 0,
            body,
            object,
            bvh,
            margin,
            _dimension: PhantomData,
        }
    }

    /// Replaces the body and re-derives its collision data.
    pub fn set_rigid_body(&mut self, body: RigidBody) {
        self.body = body;
        self.refresh();
    }

    /// Re-derives the collidable object and BVH after the body changed in place.
    pub fn refresh(&mut self) {
        D::constrain(&mut self.body);
        self.object = CollidableObject::from_body::<D>(&self.body);
        self.bvh = ObjectBvh::from_object(&self.object, self.margin);
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn rigid_body(&self) -> &RigidBody {
        &self.body
    }

    /// Mutable access to the body. Call [`RigidBodyArchive::refresh`] afterwards.
    pub fn rigid_body_mut(&mut self) -> &mut RigidBody {
        &mut self.body
    }

    pub fn collide_object(&self) -> &CollidableObject {
        &self.object
    }

    pub fn object_bvh(&self) -> &ObjectBvh {
        &self.bvh
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }
}
