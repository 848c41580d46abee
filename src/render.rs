//! Per-frame data handed to the backend.
//!
//! The pipeline never talks to the GPU directly. Each frame it describes the
//! views it renders ([`ViewSetup`]), the shared uniforms ([`FrameUniforms`]) and
//! one [`DrawSubmission`] per group of every object, then closes the frame. The
//! [`Backend`](crate::backend::Backend) turns that into real work.
//!
//! # Key types
//!
//! - [`ViewSetup`] is viewport, render target, view/projection and clear values of one pass
//! - [`DrawSubmission`] is model matrix, optional light matrix, program and geometry
//! - [`Geometry`] references the vertex/index buffers and the range to draw

use crate::{
    backend::{BufferId, TargetId},
    math::Mat4,
};

/// Ordered pass slot; the backend executes views in ascending id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(pub u16);

/// Shader program selected per submission. Programs are loaded outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    /// Writes light-space depth packed into RGBA.
    PackDepth,
    /// Shades the camera view and samples the shadow map.
    Draw,
}

/// Pixel rectangle of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ViewRect {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Values a view's color and depth attachments are cleared to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValues {
    /// `0xRRGGBBAA`.
    pub rgba: u32,
    pub depth: f32,
}

impl ClearValues {
    pub fn to_wgpu_color(&self) -> wgpu::Color {
        let channel = |shift: u32| f64::from((self.rgba >> shift) & 0xff) / 255.0;
        wgpu::Color {
            r: channel(24),
            g: channel(16),
            b: channel(8),
            a: channel(0),
        }
    }
}

/// Everything a backend needs to set up one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSetup {
    pub rect: ViewRect,
    /// `None` renders into the default framebuffer.
    pub target: Option<TargetId>,
    pub view: Mat4,
    pub proj: Mat4,
    pub clear: Option<ClearValues>,
}

/// Uniforms shared by every draw of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    /// Direction the light travels in, `w = 0`.
    pub light_direction: [f32; 4],
}

/// Range of a group to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawRange {
    Indexed { start: u32, count: u32 },
    Vertices { start: u32, count: u32 },
}

impl DrawRange {
    pub fn count(&self) -> u32 {
        match *self {
            DrawRange::Indexed { count, .. } | DrawRange::Vertices { count, .. } => count,
        }
    }

    /// A range that would draw nothing.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Buffers and range of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub vertex_buffer: BufferId,
    pub index_buffer: Option<BufferId>,
    pub range: DrawRange,
}

/// One draw call handed to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawSubmission {
    pub model: Mat4,
    /// Model to shadow-map texture space; only set in the shaded pass.
    pub light_transform: Option<Mat4>,
    pub program: Program,
    /// Render target bound as a sampled texture.
    pub shadow_map: Option<TargetId>,
    pub geometry: Geometry,
}
