//! Matrix composition for the shadow pipeline.
//!
//! All matrices are `cgmath::Matrix4<f32>` laid out column-major. Element order is
//! identical to a row-major matrix applied to row vectors, which lets the
//! composition read left to right: [`multiply(a, b)`](multiply) is the transform
//! that applies `a` first and `b` second. Every function here is pure.
//!
//! The view and projection helpers are left-handed and produce clip-space depth
//! in `[-1, 1]`. Backends with a different depth range remap on their side; the
//! vertical texture-origin difference is handled by [`crop_bias`] alone.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, Vector4};

pub type Mat4 = Matrix4<f32>;

/// Below this squared length the look-at basis is considered degenerate.
const DEGENERATE_UP_EPSILON: f32 = 1e-6;

pub fn identity() -> Mat4 {
    Mat4::identity()
}

/// Composes two transforms: `a` is applied first, then `b`.
pub fn multiply(a: &Mat4, b: &Mat4) -> Mat4 {
    b * a
}

/// Euler rotation applied around X, then Y, then Z (radians).
pub fn rotate_xyz(ax: f32, ay: f32, az: f32) -> Mat4 {
    let (sx, cx) = ax.sin_cos();
    let (sy, cy) = ay.sin_cos();
    let (sz, cz) = az.sin_cos();

    #[rustfmt::skip]
    let m = Mat4::new(
        cy * cz,                 -cy * sz,                 sy,       0.0,
        cz * sx * sy + cx * sz,  cx * cz - sx * sy * sz,   -cy * sx, 0.0,
        -cx * cz * sy + sx * sz, cz * sx + cx * sy * sz,   cx * cy,  0.0,
        0.0,                     0.0,                      0.0,      1.0,
    );
    m
}

/// Builds `scale · (rotate · translate)`.
///
/// The rotation is the [`rotate_xyz`] Euler rotation in radians. Callers must not
/// assume any other composition order: the vertex is scaled, then rotated, then
/// moved.
pub fn compose_scale_rotate_translate(
    scale: Vector3<f32>,
    rotation: Vector3<f32>,
    translation: Vector3<f32>,
) -> Mat4 {
    let mut rotate_translate = rotate_xyz(rotation.x, rotation.y, rotation.z);
    rotate_translate.w = Vector4::new(translation.x, translation.y, translation.z, 1.0);

    let scale = Mat4::from_nonuniform_scale(scale.x, scale.y, scale.z);
    multiply(&scale, &rotate_translate)
}

/// Left-handed view matrix looking from `eye` towards `target`.
///
/// World `+Y` is the up hint. When the view direction is parallel to it (a light
/// shining straight down, for instance) `+Z` is used instead so the basis stays
/// finite.
pub fn look_at(eye: Point3<f32>, target: Point3<f32>) -> Mat4 {
    let view = (target - eye).normalize();

    let mut up = Vector3::unit_y();
    if up.cross(view).magnitude2() < DEGENERATE_UP_EPSILON {
        up = Vector3::unit_z();
    }
    let right = up.cross(view).normalize();
    let up = view.cross(right);

    let eye = Vector3::new(eye.x, eye.y, eye.z);

    #[rustfmt::skip]
    let m = Mat4::new(
        right.x,          up.x,          view.x,          0.0,
        right.y,          up.y,          view.y,          0.0,
        right.z,          up.z,          view.z,          0.0,
        -right.dot(eye),  -up.dot(eye),  -view.dot(eye),  1.0,
    );
    m
}

/// Left-handed perspective projection; `fov_y` is the full vertical field of view.
pub fn perspective(fov_y: impl Into<Rad<f32>>, aspect: f32, near: f32, far: f32) -> Mat4 {
    let Rad(fov_y) = fov_y.into();
    let height = 1.0 / (fov_y * 0.5).tan();
    let width = height / aspect;
    let diff = far - near;

    #[rustfmt::skip]
    let m = Mat4::new(
        width, 0.0,    0.0,                       0.0,
        0.0,   height, 0.0,                       0.0,
        0.0,   0.0,    (far + near) / diff,       1.0,
        0.0,   0.0,    2.0 * far * near / -diff,  0.0,
    );
    m
}

/// Left-handed orthographic projection of the given box onto `[-1, 1]³`.
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    #[rustfmt::skip]
    let m = Mat4::new(
        2.0 / (right - left),             0.0,                              0.0,                          0.0,
        0.0,                              2.0 / (top - bottom),             0.0,                          0.0,
        0.0,                              0.0,                              2.0 / (far - near),           0.0,
        (left + right) / (left - right),  (top + bottom) / (bottom - top),  (near + far) / (near - far),  1.0,
    );
    m
}

/// Maps clip space `[-1, 1]` to texture space `[0, 1]` on every axis.
///
/// With `vertical_flip` the Y axis is inverted, for backends whose texture origin
/// sits at the top-left corner while clip-space Y points up.
pub fn crop_bias(vertical_flip: bool) -> Mat4 {
    let sy = if vertical_flip { -0.5 } else { 0.5 };

    #[rustfmt::skip]
    let m = Mat4::new(
        0.5, 0.0, 0.0, 0.0,
        0.0, sy,  0.0, 0.0,
        0.0, 0.0, 0.5, 0.0,
        0.5, 0.5, 0.5, 1.0,
    );
    m
}

/// Applies `m` to a point and performs the perspective divide.
pub fn transform_point(m: &Mat4, p: Point3<f32>) -> Point3<f32> {
    let v = m * p.to_homogeneous();
    Point3::from_homogeneous(v)
}
