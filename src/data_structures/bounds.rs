//! Bounding volumes attached to groups and primitives.
//!
//! They are read verbatim from the mesh stream and never recomputed.

use cgmath::{Matrix4, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vector3<f32>,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

/// Oriented box stored as the transform of the unit cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    pub matrix: Matrix4<f32>,
}

/// The three volumes every decoded group and primitive carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub sphere: Sphere,
    pub aabb: Aabb,
    pub obb: Obb,
}

