use crate::{
    backend::wgpu_backend::{BindGroupLayouts, WgpuBackend},
    data_structures::{layout::VertexLayout, texture::Texture},
    render::Program,
};

/// Shadow-map color format, matches [`ColorFormat::Rgba8`](crate::backend::ColorFormat).
pub const SHADOW_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Shadow-map depth format, matches [`DepthFormat::D16`](crate::backend::DepthFormat).
pub const SHADOW_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth16Unorm;

/// Builds the render pipeline of `program` for meshes using `vertex_layout`.
///
/// The shader must expose `vs_main` and `fs_main` and use the bind groups
/// described in [`WgpuBackend`]'s module docs.
pub fn mk_program_pipeline(
    device: &wgpu::Device,
    layouts: &BindGroupLayouts,
    program: Program,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    vertex_layout: &VertexLayout,
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let (label, bind_group_layouts): (&str, Vec<Option<&wgpu::BindGroupLayout>>) = match program {
        Program::PackDepth => ("Pack Depth Pipeline", vec![Some(&layouts.view), Some(&layouts.draw)]),
        Program::Draw => (
            "Shaded Pipeline",
            vec![Some(&layouts.view), Some(&layouts.draw), Some(&layouts.shadow_map)],
        ),
    };
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &bind_group_layouts,
        immediate_size: 0,
    });

    let attributes = vertex_layout.wgpu_attributes();
    let vertex_buffer = wgpu::VertexBufferLayout {
        array_stride: wgpu::BufferAddress::from(vertex_layout.stride()),
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &attributes,
    };

    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(&render_pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex_buffer],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Winding of decoded meshes is not normalized.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
            depth_write_enabled: Some(true),
            depth_compare: Some(wgpu::CompareFunction::Less),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}

/// Builds both programs and registers them with `backend`.
///
/// `surface_format` is the format of the default framebuffer the shaded pass
/// renders into.
pub fn register_programs(
    backend: &mut WgpuBackend,
    surface_format: wgpu::TextureFormat,
    vertex_layout: &VertexLayout,
    pack_depth_shader: wgpu::ShaderModuleDescriptor,
    draw_shader: wgpu::ShaderModuleDescriptor,
) {
    let pack_depth = mk_program_pipeline(
        backend.device(),
        backend.layouts(),
        Program::PackDepth,
        SHADOW_COLOR_FORMAT,
        SHADOW_DEPTH_FORMAT,
        vertex_layout,
        pack_depth_shader,
    );
    let draw = mk_program_pipeline(
        backend.device(),
        backend.layouts(),
        Program::Draw,
        surface_format,
        Texture::DEPTH_FORMAT,
        vertex_layout,
        draw_shader,
    );
    backend.register_program(Program::PackDepth, pack_depth);
    backend.register_program(Program::Draw, draw);
}
