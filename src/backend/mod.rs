//! The contract between the core and the GPU command-submission backend.
//!
//! The core decides *what* is drawn and with which transforms. A [`Backend`]
//! creates the buffers and render targets, queues the submitted draws and
//! executes them at the frame boundary. Submission is fire-and-forget;
//! [`Backend::frame`] is the only point where the caller may be blocked.
//!
//! Two implementations ship with the crate:
//! - [`headless::HeadlessBackend`] records every call, for tests and tooling
//! - [`wgpu_backend::WgpuBackend`] renders through `wgpu`

pub mod headless;
pub mod wgpu_backend;

use crate::{
    data_structures::layout::VertexLayout,
    error::ResourceError,
    render::{DrawSubmission, FrameUniforms, ViewId, ViewSetup},
};

/// Backend-side buffer id. Ids are never reused by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Backend-side render target id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u32);

/// Coordinate conventions that differ between graphics APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendConventions {
    /// Texture origin is top-left while clip-space Y points up.
    pub vertical_flip: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    Rgba8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFormat {
    D16,
    D32Float,
}

/// Offscreen target with a color and a depth attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetDesc {
    pub width: u32,
    pub height: u32,
    pub color: ColorFormat,
    pub depth: DepthFormat,
}

pub trait Backend {
    fn conventions(&self) -> BackendConventions;

    fn create_vertex_buffer(
        &mut self,
        data: &[u8],
        layout: &VertexLayout,
    ) -> Result<BufferId, ResourceError>;

    fn create_index_buffer(&mut self, indices: &[u16]) -> Result<BufferId, ResourceError>;

    fn destroy_buffer(&mut self, id: BufferId);

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<TargetId, ResourceError>;

    fn destroy_render_target(&mut self, id: TargetId);

    /// Configures a pass for the current frame.
    fn set_view(&mut self, view: ViewId, setup: &ViewSetup);

    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms);

    /// Queues a draw; executed when the frame is closed.
    fn submit(&mut self, view: ViewId, draw: &DrawSubmission);

    /// Closes the frame and hands its queued work over.
    ///
    /// May block while too many earlier frames are still in flight. Returns the
    /// number of the frame just closed.
    fn frame(&mut self) -> Result<u64, ResourceError>;
}
