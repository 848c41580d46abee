//! Per-object transforms and their animation over time.
//!
//! The pipeline has no scene graph. Callers hand over a flat list of
//! [`SceneObject`]s, each pairing a mesh with an [`Animation`] that yields the
//! object's [`Instance`] for a given elapsed time.

use std::f32::consts::PI;

use cgmath::Vector3;

use crate::{math, resources::pool::MeshHandle};

/// Scale, Euler rotation (radians) and translation of one object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub scale: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub translation: Vector3<f32>,
}

impl Instance {
    /// Identity transform.
    pub fn new() -> Self {
        Self {
            scale: Vector3::new(1.0, 1.0, 1.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            translation: Vector3::new(0.0, 0.0, 0.0),
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vector3::new(scale, scale, scale);
        self
    }

    pub fn with_rotation(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Vector3::new(x, y, z);
        self
    }

    pub fn with_translation(mut self, x: f32, y: f32, z: f32) -> Self {
        self.translation = Vector3::new(x, y, z);
        self
    }

    pub fn to_matrix(&self) -> math::Mat4 {
        math::compose_scale_rotate_translate(self.scale, self.rotation, self.translation)
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vector3<f32>> for Instance {
    fn from(translation: Vector3<f32>) -> Self {
        Instance {
            translation,
            ..Default::default()
        }
    }
}

/// How an object's transform evolves with elapsed time (seconds).
pub enum Animation {
    Static(Instance),
    Animated(Box<dyn Fn(f32) -> Instance>),
}

impl Animation {
    pub fn instance_at(&self, elapsed: f32) -> Instance {
        match self {
            Animation::Static(instance) => *instance,
            Animation::Animated(f) => f(elapsed),
        }
    }
}

impl std::fmt::Debug for Animation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Animation::Static(instance) => f.debug_tuple("Static").field(instance).finish(),
            Animation::Animated(_) => f.write_str("Animated(..)"),
        }
    }
}

/// A mesh drawn with a per-frame model matrix.
#[derive(Debug)]
pub struct SceneObject {
    pub mesh: MeshHandle,
    pub animation: Animation,
}

impl SceneObject {
    pub fn fixed(mesh: MeshHandle, instance: Instance) -> Self {
        Self {
            mesh,
            animation: Animation::Static(instance),
        }
    }

    pub fn animated(mesh: MeshHandle, f: impl Fn(f32) -> Instance + 'static) -> Self {
        Self {
            mesh,
            animation: Animation::Animated(Box::new(f)),
        }
    }

    pub fn model_matrix(&self, elapsed: f32) -> math::Mat4 {
        self.animation.instance_at(elapsed).to_matrix()
    }
}

/// The classic shadow-map showcase: a large floor, an orbiting bunny and two
/// spinning cubes.
pub fn showcase(
    floor: MeshHandle,
    bunny: MeshHandle,
    hollow_cube: MeshHandle,
    cube: MeshHandle,
) -> Vec<SceneObject> {
    vec![
        SceneObject::fixed(floor, Instance::new().with_scale(30.0)),
        SceneObject::animated(bunny, |t| {
            Instance::new()
                .with_scale(5.0)
                .with_rotation(0.0, PI - t, 0.0)
                .with_translation(15.0, 5.0, 0.0)
        }),
        SceneObject::animated(hollow_cube, |t| {
            Instance::new()
                .with_scale(2.5)
                .with_rotation(0.0, 1.56 - t, 0.0)
                .with_translation(0.0, 10.0, 0.0)
        }),
        SceneObject::animated(cube, |t| {
            Instance::new()
                .with_scale(2.5)
                .with_rotation(0.0, 1.56 - t, 0.0)
                .with_translation(-15.0, 5.0, 0.0)
        }),
    ]
}
