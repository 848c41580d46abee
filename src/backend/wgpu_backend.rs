//! `wgpu` implementation of [`Backend`].
//!
//! Buffers and render targets are created immediately. Views and draws are queued
//! and encoded into a single command buffer when the frame is closed, one render
//! pass per view in ascending [`ViewId`] order.
//!
//! Shader programs are not created here. The application builds its render
//! pipelines against [`WgpuBackend::layouts`] and registers them with
//! [`WgpuBackend::register_program`]:
//!
//! - group 0: view uniform (`view`, `proj`, `light_direction`), dynamic offset
//! - group 1: draw uniform (`model`, `light`), dynamic offset
//! - group 2: shadow map texture + sampler, only bound for draws that sample it

use std::collections::{BTreeMap, HashMap, VecDeque};

use wgpu::util::DeviceExt;

use crate::{
    backend::{
        Backend, BackendConventions, BufferId, ColorFormat, DepthFormat, RenderTargetDesc,
        TargetId,
    },
    data_structures::{layout::VertexLayout, texture::Texture},
    error::ResourceError,
    math::{self, Mat4},
    render::{DrawRange, DrawSubmission, FrameUniforms, Program, ViewId, ViewSetup},
};

/// Frames that may be queued on the GPU before [`Backend::frame`] blocks.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Remaps clip-space depth from `[-1, 1]` to wgpu's `[0, 1]`.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ViewUniform {
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    light_direction: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniform {
    model: [[f32; 4]; 4],
    // Identity in the depth pass.
    light: [[f32; 4]; 4],
}

/// Bind group layouts every registered pipeline must be built against.
pub struct BindGroupLayouts {
    pub view: wgpu::BindGroupLayout,
    pub draw: wgpu::BindGroupLayout,
    pub shadow_map: wgpu::BindGroupLayout,
}

fn mk_uniform_layout(device: &wgpu::Device, label: &str, size: u64) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: wgpu::BufferSize::new(size),
            },
            count: None,
        }],
        label: Some(label),
    })
}

fn mk_shadow_map_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("shadow_map_bind_group_layout"),
    })
}

/// Uniform buffer holding one aligned slot per view or draw of a frame.
struct UniformSlots {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u64,
}

impl UniformSlots {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        element_size: u64,
        stride: u64,
        capacity: u64,
    ) -> Self {
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: stride * capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(element_size),
                }),
            }],
            label: Some(label),
        });
        Self {
            buffer,
            bind_group,
            capacity,
        }
    }
}

struct RenderTarget {
    color: Texture,
    depth: Texture,
    bind_group: wgpu::BindGroup,
}

struct DefaultTarget {
    view: wgpu::TextureView,
    depth: Texture,
    size: [u32; 2],
}

#[derive(Default)]
struct QueuedView {
    setup: Option<ViewSetup>,
    draws: Vec<DrawSubmission>,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layouts: BindGroupLayouts,
    uniform_stride: u64,
    view_slots: UniformSlots,
    draw_slots: UniformSlots,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    targets: HashMap<TargetId, RenderTarget>,
    programs: HashMap<Program, wgpu::RenderPipeline>,
    default_target: Option<DefaultTarget>,
    views: BTreeMap<ViewId, QueuedView>,
    frame_uniforms: FrameUniforms,
    in_flight: VecDeque<wgpu::SubmissionIndex>,
    next_id: u32,
    frame: u64,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let layouts = BindGroupLayouts {
            view: mk_uniform_layout(
                &device,
                "view_bind_group_layout",
                std::mem::size_of::<ViewUniform>() as u64,
            ),
            draw: mk_uniform_layout(
                &device,
                "draw_bind_group_layout",
                std::mem::size_of::<DrawUniform>() as u64,
            ),
            shadow_map: mk_shadow_map_layout(&device),
        };

        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let largest =
            std::mem::size_of::<ViewUniform>().max(std::mem::size_of::<DrawUniform>()) as u64;
        let uniform_stride = largest.div_ceil(alignment) * alignment;

        let view_slots = UniformSlots::new(
            &device,
            &layouts.view,
            "View Uniforms",
            std::mem::size_of::<ViewUniform>() as u64,
            uniform_stride,
            4,
        );
        let draw_slots = UniformSlots::new(
            &device,
            &layouts.draw,
            "Draw Uniforms",
            std::mem::size_of::<DrawUniform>() as u64,
            uniform_stride,
            64,
        );

        Self {
            device,
            queue,
            layouts,
            uniform_stride,
            view_slots,
            draw_slots,
            buffers: HashMap::new(),
            targets: HashMap::new(),
            programs: HashMap::new(),
            default_target: None,
            views: BTreeMap::new(),
            frame_uniforms: FrameUniforms {
                light_direction: [0.0, -1.0, 0.0, 0.0],
            },
            in_flight: VecDeque::new(),
            next_id: 0,
            frame: 0,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn layouts(&self) -> &BindGroupLayouts {
        &self.layouts
    }

    pub fn register_program(&mut self, program: Program, pipeline: wgpu::RenderPipeline) {
        self.programs.insert(program, pipeline);
    }

    /// Sets the texture that views without a render target draw into.
    ///
    /// Call once per frame with the acquired surface texture view; the matching
    /// depth buffer is recreated only when the size changes.
    pub fn set_default_target(&mut self, view: wgpu::TextureView, width: u32, height: u32) {
        let size = [width, height];
        if let Some(target) = self.default_target.as_mut() {
            if target.size == size {
                target.view = view;
                return;
            }
        }
        if let Some(old) = self.default_target.take() {
            old.depth.destroy();
        }
        let depth = Texture::create_depth_texture(
            &self.device,
            size,
            Texture::DEPTH_FORMAT,
            "default_depth_texture",
        );
        self.default_target = Some(DefaultTarget { view, depth, size });
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn ensure_uniform_capacity(&mut self, views: u64, draws: u64) {
        if views > self.view_slots.capacity {
            self.view_slots = UniformSlots::new(
                &self.device,
                &self.layouts.view,
                "View Uniforms",
                std::mem::size_of::<ViewUniform>() as u64,
                self.uniform_stride,
                views.next_power_of_two(),
            );
        }
        if draws > self.draw_slots.capacity {
            self.draw_slots = UniformSlots::new(
                &self.device,
                &self.layouts.draw,
                "Draw Uniforms",
                std::mem::size_of::<DrawUniform>() as u64,
                self.uniform_stride,
                draws.next_power_of_two(),
            );
        }
    }

    fn write_uniforms(&self) {
        let mut draw_index = 0u64;
        for (view_index, queued) in self.views.values().enumerate() {
            if let Some(setup) = &queued.setup {
                let proj = math::multiply(&setup.proj, &OPENGL_TO_WGPU_MATRIX);
                let uniform = ViewUniform {
                    view: setup.view.into(),
                    proj: proj.into(),
                    light_direction: self.frame_uniforms.light_direction,
                };
                self.queue.write_buffer(
                    &self.view_slots.buffer,
                    view_index as u64 * self.uniform_stride,
                    bytemuck::cast_slice(&[uniform]),
                );
            }
            for draw in &queued.draws {
                let light: Mat4 = draw.light_transform.unwrap_or_else(math::identity);
                let uniform = DrawUniform {
                    model: draw.model.into(),
                    light: light.into(),
                };
                self.queue.write_buffer(
                    &self.draw_slots.buffer,
                    draw_index * self.uniform_stride,
                    bytemuck::cast_slice(&[uniform]),
                );
                draw_index += 1;
            }
        }
    }

    fn encode(&self, encoder: &mut wgpu::CommandEncoder) -> usize {
        let mut skipped = 0;
        let mut draw_index = 0u64;

        for (view_index, (view_id, queued)) in self.views.iter().enumerate() {
            let Some(setup) = &queued.setup else {
                log::warn!(
                    "{} draws submitted to unconfigured view {:?}",
                    queued.draws.len(),
                    view_id
                );
                skipped += queued.draws.len();
                draw_index += queued.draws.len() as u64;
                continue;
            };
            let attachments = match setup.target {
                Some(id) => self.targets.get(&id).map(|t| (&t.color.view, &t.depth.view)),
                None => self.default_target.as_ref().map(|t| (&t.view, &t.depth.view)),
            };
            let Some((color_view, depth_view)) = attachments else {
                log::warn!("view {:?} has no render target to draw into", view_id);
                skipped += queued.draws.len();
                draw_index += queued.draws.len() as u64;
                continue;
            };

            let color_load = setup
                .clear
                .map_or(wgpu::LoadOp::Load, |c| wgpu::LoadOp::Clear(c.to_wgpu_color()));
            let depth_load = setup
                .clear
                .map_or(wgpu::LoadOp::Load, |c| wgpu::LoadOp::Clear(c.depth));

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pipeline Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            render_pass.set_viewport(
                setup.rect.x as f32,
                setup.rect.y as f32,
                setup.rect.width as f32,
                setup.rect.height as f32,
                0.0,
                1.0,
            );
            let view_offset = (view_index as u64 * self.uniform_stride) as wgpu::DynamicOffset;

            for draw in &queued.draws {
                let draw_offset = (draw_index * self.uniform_stride) as wgpu::DynamicOffset;
                draw_index += 1;

                let (Some(pipeline), Some(vertex_buffer)) = (
                    self.programs.get(&draw.program),
                    self.buffers.get(&draw.geometry.vertex_buffer),
                ) else {
                    skipped += 1;
                    continue;
                };
                // Empty slices panic in wgpu.
                if draw.geometry.range.is_empty() || vertex_buffer.size() == 0 {
                    log::debug!("skipping empty draw {:?}", draw.geometry);
                    continue;
                }

                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.view_slots.bind_group, &[view_offset]);
                render_pass.set_bind_group(1, &self.draw_slots.bind_group, &[draw_offset]);
                if let Some(target) = draw.shadow_map.and_then(|id| self.targets.get(&id)) {
                    render_pass.set_bind_group(2, &target.bind_group, &[]);
                }
                render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));

                match (draw.geometry.range, draw.geometry.index_buffer) {
                    (DrawRange::Indexed { start, count }, Some(index)) => {
                        let Some(index_buffer) =
                            self.buffers.get(&index).filter(|b| b.size() > 0)
                        else {
                            skipped += 1;
                            continue;
                        };
                        render_pass
                            .set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                        render_pass.draw_indexed(start..start + count, 0, 0..1);
                    }
                    (DrawRange::Vertices { start, count }, _) => {
                        render_pass.draw(start..start + count, 0..1);
                    }
                    (DrawRange::Indexed { .. }, None) => skipped += 1,
                }
            }
        }
        skipped
    }
}

impl Backend for WgpuBackend {
    fn conventions(&self) -> BackendConventions {
        BackendConventions {
            vertical_flip: true,
        }
    }

    fn create_vertex_buffer(
        &mut self,
        data: &[u8],
        layout: &VertexLayout,
    ) -> Result<BufferId, ResourceError> {
        let max = self.device.limits().max_buffer_size;
        if data.len() as u64 > max {
            return Err(ResourceError::creation(
                "vertex buffer",
                format!("{} bytes exceed the device limit of {max}", data.len()),
            ));
        }
        let id = BufferId(self.next_id());
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Vertex Buffer {} (stride {})", id.0, layout.stride())),
            contents: data,
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.buffers.insert(id, buffer);
        Ok(id)
    }

    fn create_index_buffer(&mut self, indices: &[u16]) -> Result<BufferId, ResourceError> {
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        let max = self.device.limits().max_buffer_size;
        if bytes.len() as u64 > max {
            return Err(ResourceError::creation(
                "index buffer",
                format!("{} bytes exceed the device limit of {max}", bytes.len()),
            ));
        }
        let id = BufferId(self.next_id());
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Index Buffer {}", id.0)),
            contents: bytes,
            usage: wgpu::BufferUsages::INDEX,
        });
        self.buffers.insert(id, buffer);
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        match self.buffers.remove(&id) {
            Some(buffer) => buffer.destroy(),
            None => log::warn!("destroy of unknown buffer {id:?}"),
        }
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<TargetId, ResourceError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(ResourceError::creation(
                "render target",
                format!("{}x{} outside 1..={max}", desc.width, desc.height),
            ));
        }
        let size = [desc.width, desc.height];
        let color_format = match desc.color {
            ColorFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        };
        let depth_format = match desc.depth {
            DepthFormat::D16 => wgpu::TextureFormat::Depth16Unorm,
            DepthFormat::D32Float => wgpu::TextureFormat::Depth32Float,
        };

        let color =
            Texture::create_color_target(&self.device, size, color_format, "shadow_map_color");
        let depth =
            Texture::create_depth_texture(&self.device, size, depth_format, "shadow_map_depth");
        let Some(sampler) = color.sampler.as_ref() else {
            return Err(ResourceError::creation("render target", "color target has no sampler"));
        };
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.layouts.shadow_map,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&color.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some("shadow_map_bind_group"),
        });

        let id = TargetId(self.next_id());
        self.targets.insert(
            id,
            RenderTarget {
                color,
                depth,
                bind_group,
            },
        );
        Ok(id)
    }

    fn destroy_render_target(&mut self, id: TargetId) {
        if let Some(target) = self.targets.remove(&id) {
            target.color.destroy();
            target.depth.destroy();
        }
    }

    fn set_view(&mut self, view: ViewId, setup: &ViewSetup) {
        self.views.entry(view).or_default().setup = Some(setup.clone());
    }

    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms) {
        self.frame_uniforms = *uniforms;
    }

    fn submit(&mut self, view: ViewId, draw: &DrawSubmission) {
        self.views.entry(view).or_default().draws.push(draw.clone());
    }

    fn frame(&mut self) -> Result<u64, ResourceError> {
        let view_count = self.views.len() as u64;
        let draw_count = self.views.values().map(|v| v.draws.len() as u64).sum();
        self.ensure_uniform_capacity(view_count, draw_count);
        self.write_uniforms();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Shadow Pipeline Encoder"),
            });
        let skipped = self.encode(&mut encoder);
        if skipped > 0 {
            log::warn!("{skipped} draws skipped (missing program, buffer or target)");
        }

        let submission = self.queue.submit(std::iter::once(encoder.finish()));
        self.in_flight.push_back(submission);
        self.views.clear();
        self.frame += 1;

        #[cfg(not(target_arch = "wasm32"))]
        while self.in_flight.len() > MAX_FRAMES_IN_FLIGHT {
            let oldest = self.in_flight.pop_front();
            self.device
                .poll(wgpu::PollType::Wait {
                    submission_index: oldest,
                    timeout: None,
                })
                .map_err(|e| ResourceError::Frame(e.to_string()))?;
        }
        #[cfg(target_arch = "wasm32")]
        while self.in_flight.len() > MAX_FRAMES_IN_FLIGHT {
            self.in_flight.pop_front();
        }

        Ok(self.frame)
    }
}
