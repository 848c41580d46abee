use cgmath::{Deg, Point3};

use crate::{
    backend::{Backend, ColorFormat, DepthFormat, RenderTargetDesc},
    math::{self, Mat4},
    render::{ClearValues, ViewId},
};

/// Camera placement and lens of the shaded pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub fov_y: Deg<f32>,
    pub near: f32,
    pub far: f32,
}

/// Orthographic volume of the directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightConfig {
    /// Half-extent of the orthographic volume in x and y.
    pub area: f32,
    pub near: f32,
    pub far: f32,
}

/// Settings shared by the resource pool and the shadow pipeline.
///
/// Built once and passed by reference; nothing in the crate keeps global state.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineContext {
    pub width: u32,
    pub height: u32,
    pub shadow_map_size: u32,
    /// Texture origin is top-left; see [`math::crop_bias`].
    pub vertical_flip: bool,
    pub clear: ClearValues,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub shadow_view: ViewId,
    pub scene_view: ViewId,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            shadow_map_size: 512,
            vertical_flip: false,
            clear: ClearValues {
                rgba: 0x303030ff,
                depth: 1.0,
            },
            camera: CameraConfig {
                eye: Point3::new(0.0, 30.0, -60.0),
                target: Point3::new(0.0, 5.0, 0.0),
                fov_y: Deg(60.0),
                near: 0.1,
                far: 1000.0,
            },
            light: LightConfig {
                area: 30.0,
                near: -100.0,
                far: 100.0,
            },
            shadow_view: ViewId(0),
            scene_view: ViewId(1),
        }
    }
}

impl PipelineContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Context matching the coordinate conventions of `backend`.
    pub fn for_backend(backend: &impl Backend, width: u32, height: u32) -> Self {
        Self {
            vertical_flip: backend.conventions().vertical_flip,
            ..Self::new(width, height)
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn camera_view(&self) -> Mat4 {
        math::look_at(self.camera.eye, self.camera.target)
    }

    pub fn camera_proj(&self) -> Mat4 {
        math::perspective(self.camera.fov_y, self.aspect(), self.camera.near, self.camera.far)
    }

    pub fn shadow_map_desc(&self) -> RenderTargetDesc {
        RenderTargetDesc {
            width: self.shadow_map_size,
            height: self.shadow_map_size,
            color: ColorFormat::Rgba8,
            depth: DepthFormat::D16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{headless::HeadlessBackend, BackendConventions};

    #[test]
    fn flip_follows_backend_conventions() {
        let backend = HeadlessBackend::new(BackendConventions {
            vertical_flip: true,
        });
        let ctx = PipelineContext::for_backend(&backend, 800, 600);
        assert!(ctx.vertical_flip);
        assert_eq!((ctx.width, ctx.height), (800, 600));
        assert_eq!(ctx.shadow_map_size, 512);
    }

    #[test]
    fn shadow_map_is_square_with_16_bit_depth() {
        let desc = PipelineContext::default().shadow_map_desc();
        assert_eq!((desc.width, desc.height), (512, 512));
        assert_eq!(desc.color, ColorFormat::Rgba8);
        assert_eq!(desc.depth, DepthFormat::D16);
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut ctx = PipelineContext::default();
        ctx.resize(0, 400);
        assert_eq!((ctx.width, ctx.height), (1280, 720));
        ctx.resize(640, 480);
        assert_eq!(ctx.aspect(), 640.0 / 480.0);
    }
}
