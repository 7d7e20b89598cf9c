//! Bounding volumes for the broad phase: per-object volumes and the scene-wide tree.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collidable::CollidableObject;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn from_center_extent(center: Vec3, extent: Vec3) -> Self {
        Self::new(center - extent, center + extent)
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bounds = Self::empty();
        for &p in points {
            bounds.extend(p);
        }
        bounds
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn expanded(&self, margin: f32) -> Aabb {
        Aabb::new(self.min - Vec3::splat(margin), self.max + Vec3::splat(margin))
    }

    /// Touching boxes count as overlapping.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn longest_axis(&self) -> usize {
        let size = self.max - self.min;
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }
}

/// Bounding volume of a single collidable object.
///
/// Primitive shapes need exactly one leaf; unbounded shapes (planes) carry no box and are
/// tested against every other object by the scene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectBvh {
    bounds: Option<Aabb>,
}

impl ObjectBvh {
    pub fn from_object(object: &CollidableObject, margin: f32) -> Self {
        Self {
            bounds: object.aabb().map(|aabb| aabb.expanded(margin)),
        }
    }

    pub fn bounds(&self) -> Option<&Aabb> {
        self.bounds.as_ref()
    }

    pub fn is_unbounded(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn overlaps(&self, other: &ObjectBvh) -> bool {
        match (&self.bounds, &other.bounds) {
            (Some(a), Some(b)) => a.overlaps(b),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SceneNodeKind {
    Leaf { object: usize },
    Internal { left: usize, right: usize },
}

#[derive(Debug, Clone, PartialEq)]
struct SceneNode {
    bounds: Aabb,
    kind: SceneNodeKind,
}

/// Binary AABB tree over every archived object.
///
/// Children are always stored after their parent, so a reverse sweep over the node array
/// refits the tree bottom-up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneBvh {
    nodes: Vec<SceneNode>,
    leaf_of: Vec<Option<usize>>,
    unbounded: Vec<usize>,
    object_count: usize,
}

impl SceneBvh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the whole tree; `objects[i]` is the volume of object `i`.
    pub fn build(&mut self, objects: &[&ObjectBvh]) {
        self.nodes.clear();
        self.unbounded.clear();
        self.object_count = objects.len();
        self.leaf_of = vec![None; objects.len()];

        let mut items: Vec<(usize, Aabb)> = Vec::with_capacity(objects.len());
        for (index, object) in objects.iter().enumerate() {
            match object.bounds() {
                Some(bounds) => items.push((index, *bounds)),
                None => self.unbounded.push(index),
            }
        }

        if !items.is_empty() {
            self.build_recursive(&mut items);
        }
    }

    fn build_recursive(&mut self, items: &mut [(usize, Aabb)]) -> usize {
        let bounds = items
            .iter()
            .fold(Aabb::empty(), |acc, (_, aabb)| acc.union(aabb));
        let node_index = self.nodes.len();

        if let [(object, aabb)] = items {
            self.nodes.push(SceneNode {
                bounds: *aabb,
                kind: SceneNodeKind::Leaf { object: *object },
            });
            self.leaf_of[*object] = Some(node_index);
            return node_index;
        }

        self.nodes.push(SceneNode {
            bounds,
            kind: SceneNodeKind::Internal { left: 0, right: 0 },
        });

        let axis = bounds.longest_axis();
        items.sort_by(|(ia, a), (ib, b)| {
            a.center()[axis]
                .total_cmp(&b.center()[axis])
                .then(ia.cmp(ib))
        });
        let mid = items.len() / 2;
        let (lower, upper) = items.split_at_mut(mid);
        let left = self.build_recursive(lower);
        let right = self.build_recursive(upper);
        self.nodes[node_index].kind = SceneNodeKind::Internal { left, right };
        node_index
    }

    /// Updates leaf volumes after objects moved and refits the internal nodes.
    ///
    /// The tree topology is kept; returns `false` when the object set changed and a full
    /// [`SceneBvh::build`] is required instead.
    pub fn refit(&mut self, objects: &[&ObjectBvh]) -> bool {
        if objects.len() != self.object_count {
            return false;
        }
        for (index, object) in objects.iter().enumerate() {
            match (self.leaf_of[index], object.bounds()) {
                (Some(node), Some(bounds)) => self.nodes[node].bounds = *bounds,
                (None, None) => {}
                _ => return false,
            }
        }
        for node in (0..self.nodes.len()).rev() {
            if let SceneNodeKind::Internal { left, right } = self.nodes[node].kind {
                self.nodes[node].bounds = self.nodes[left].bounds.union(&self.nodes[right].bounds);
            }
        }
        true
    }

    /// Number of objects covered by the tree.
    pub fn len(&self) -> usize {
        self.object_count
    }

    pub fn is_empty(&self) -> bool {
        self.object_count == 0
    }

    /// True when every object has exactly one leaf or one unbounded entry.
    pub fn covers_all(&self) -> bool {
        (0..self.object_count)
            .all(|i| self.leaf_of[i].is_some() != self.unbounded.contains(&i))
    }

    /// Candidate pairs `(a, b)` with `a < b`, sorted and free of duplicates.
    pub fn overlapping_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        let mut stack = Vec::new();

        for node in &self.nodes {
            let SceneNodeKind::Leaf { object } = node.kind else {
                continue;
            };
            stack.clear();
            stack.push(0);
            while let Some(current) = stack.pop() {
                let candidate = &self.nodes[current];
                if !candidate.bounds.overlaps(&node.bounds) {
                    continue;
                }
                match candidate.kind {
                    SceneNodeKind::Leaf { object: other } if other > object => {
                        pairs.push((object, other));
                    }
                    SceneNodeKind::Leaf { .. } => {}
                    SceneNodeKind::Internal { left, right } => {
                        stack.push(right);
                        stack.push(left);
                    }
                }
            }
        }

        for &plane in &self.unbounded {
            for node in &self.nodes {
                if let SceneNodeKind::Leaf { object } = node.kind {
                    pairs.push((plane.min(object), plane.max(object)));
                }
            }
        }

        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(center: Vec3) -> ObjectBvh {
        ObjectBvh {
            bounds: Some(Aabb::from_center_extent(center, Vec3::splat(0.5))),
        }
    }

    #[test]
    fn touching_boxes_overlap() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&Aabb::new(Vec3::splat(1.1), Vec3::splat(2.0))));
    }

    #[test]
    fn scene_pairs_match_brute_force() {
        let objects: Vec<ObjectBvh> = (0..12)
            .map(|i| boxed(Vec3::new((i % 4) as f32 * 0.9, (i / 4) as f32 * 1.5, 0.0)))
            .collect();
        let refs: Vec<&ObjectBvh> = objects.iter().collect();
        let mut bvh = SceneBvh::new();
        bvh.build(&refs);
        assert!(bvh.covers_all());

        let mut expected = Vec::new();
        for i in 0..objects.len() {
            for j in (i + 1)..objects.len() {
                if objects[i].overlaps(&objects[j]) {
                    expected.push((i, j));
                }
            }
        }
        assert_eq!(bvh.overlapping_pairs(), expected);
    }

    #[test]
    fn unbounded_objects_pair_with_everything() {
        let objects = vec![
            boxed(Vec3::ZERO),
            ObjectBvh { bounds: None },
            boxed(Vec3::new(10.0, 0.0, 0.0)),
        ];
        let refs: Vec<&ObjectBvh> = objects.iter().collect();
        let mut bvh = SceneBvh::new();
        bvh.build(&refs);
        assert_eq!(bvh.overlapping_pairs(), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn refit_tracks_moved_objects() {
        let mut objects = vec![boxed(Vec3::ZERO), boxed(Vec3::new(5.0, 0.0, 0.0))];
        let mut bvh = SceneBvh::new();
        bvh.build(&objects.iter().collect::<Vec<_>>());
        assert!(bvh.overlapping_pairs().is_empty());

        objects[1] = boxed(Vec3::new(0.5, 0.0, 0.0));
        assert!(bvh.refit(&objects.iter().collect::<Vec<_>>()));
        assert_eq!(bvh.overlapping_pairs(), vec![(0, 1)]);

        objects.push(boxed(Vec3::ZERO));
        assert!(!bvh.refit(&objects.iter().collect::<Vec<_>>()));
    }
}
