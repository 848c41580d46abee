//! A backend that records calls instead of rendering.
//!
//! Useful for tests and offline tooling: every call is appended to a command log,
//! live buffers and targets are tracked, and buffer creation can be made to fail
//! after a given number of successes.

use std::collections::HashSet;

use crate::{
    backend::{Backend, BackendConventions, BufferId, RenderTargetDesc, TargetId},
    data_structures::layout::VertexLayout,
    error::ResourceError,
    render::{DrawSubmission, FrameUniforms, ViewId, ViewSetup},
};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateVertexBuffer { id: BufferId, size: usize, stride: u16 },
    CreateIndexBuffer { id: BufferId, count: usize },
    DestroyBuffer(BufferId),
    CreateRenderTarget { id: TargetId, desc: RenderTargetDesc },
    DestroyRenderTarget(TargetId),
    SetView(ViewId, ViewSetup),
    SetFrameUniforms(FrameUniforms),
    Submit(ViewId, DrawSubmission),
    Frame(u64),
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    conventions: BackendConventions,
    commands: Vec<Command>,
    next_id: u32,
    live_buffers: HashSet<BufferId>,
    live_targets: HashSet<TargetId>,
    /// Destroy calls on ids that were not live.
    invalid_destroys: Vec<BufferId>,
    /// Successful buffer creations left before creation starts failing.
    buffer_budget: Option<usize>,
    frame: u64,
}

impl HeadlessBackend {
    pub fn new(conventions: BackendConventions) -> Self {
        Self {
            conventions,
            ..Default::default()
        }
    }

    /// Lets `count` more buffer creations succeed, then fails every later one.
    pub fn fail_buffers_after(mut self, count: usize) -> Self {
        self.buffer_budget = Some(count);
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Draws submitted to `view`, in submission order.
    pub fn submissions(&self, view: ViewId) -> impl Iterator<Item = &DrawSubmission> {
        self.commands.iter().filter_map(move |c| match c {
            Command::Submit(v, draw) if *v == view => Some(draw),
            _ => None,
        })
    }

    pub fn live_buffers(&self) -> usize {
        self.live_buffers.len()
    }

    pub fn is_live(&self, id: BufferId) -> bool {
        self.live_buffers.contains(&id)
    }

    pub fn live_targets(&self) -> usize {
        self.live_targets.len()
    }

    pub fn invalid_destroys(&self) -> &[BufferId] {
        &self.invalid_destroys
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    fn next_buffer_id(&mut self, resource: &'static str) -> Result<BufferId, ResourceError> {
        if let Some(budget) = self.buffer_budget.as_mut() {
            if *budget == 0 {
                return Err(ResourceError::creation(resource, "buffer budget exhausted"));
            }
            *budget -= 1;
        }
        self.next_id += 1;
        let id = BufferId(self.next_id);
        self.live_buffers.insert(id);
        Ok(id)
    }
}

impl Backend for HeadlessBackend {
    fn conventions(&self) -> BackendConventions {
        self.conventions
    }

    fn create_vertex_buffer(
        &mut self,
        data: &[u8],
        layout: &VertexLayout,
    ) -> Result<BufferId, ResourceError> {
        let id = self.next_buffer_id("vertex buffer")?;
        self.commands.push(Command::CreateVertexBuffer {
            id,
            size: data.len(),
            stride: layout.stride(),
        });
        Ok(id)
    }

    fn create_index_buffer(&mut self, indices: &[u16]) -> Result<BufferId, ResourceError> {
        let id = self.next_buffer_id("index buffer")?;
        self.commands.push(Command::CreateIndexBuffer {
            id,
            count: indices.len(),
        });
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        if !self.live_buffers.remove(&id) {
            log::error!("destroying buffer {id:?} which is not live");
            self.invalid_destroys.push(id);
        }
        self.commands.push(Command::DestroyBuffer(id));
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<TargetId, ResourceError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(ResourceError::creation("render target", "zero-sized target"));
        }
        self.next_id += 1;
        let id = TargetId(self.next_id);
        self.live_targets.insert(id);
        self.commands.push(Command::CreateRenderTarget { id, desc: *desc });
        Ok(id)
    }

    fn destroy_render_target(&mut self, id: TargetId) {
        self.live_targets.remove(&id);
        self.commands.push(Command::DestroyRenderTarget(id));
    }

    fn set_view(&mut self, view: ViewId, setup: &ViewSetup) {
        self.commands.push(Command::SetView(view, setup.clone()));
    }

    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms) {
        self.commands.push(Command::SetFrameUniforms(*uniforms));
    }

    fn submit(&mut self, view: ViewId, draw: &DrawSubmission) {
        self.commands.push(Command::Submit(view, draw.clone()));
    }

    fn frame(&mut self) -> Result<u64, ResourceError> {
        self.frame += 1;
        self.commands.push(Command::Frame(self.frame));
        Ok(self.frame)
    }
}
