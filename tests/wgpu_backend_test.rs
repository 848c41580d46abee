#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn renders_frames_without_registered_programs() {
    use shadow_ngin::{
        backend::{Backend, wgpu_backend::WgpuBackend},
        context::PipelineContext,
        data_structures::{
            instance::{Instance, SceneObject},
            mesh::ground_plane,
        },
        pipelines::shadow::ShadowPipeline,
        resources::pool::GeometryPool,
    };

    common::test_utils::init_test_logging();

    let instance = wgpu::Instance::default();
    let Ok(adapter) = futures::executor::block_on(instance.request_adapter(
        &wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        },
    )) else {
        log::warn!("no GPU adapter available, skipping");
        return;
    };
    let (device, queue) = futures::executor::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            ..Default::default()
        },
    ))
    .unwrap();

    let (width, height) = (320, 240);
    let screen = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen screen"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    let mut backend = WgpuBackend::new(device, queue);
    let ctx = PipelineContext::for_backend(&backend, width, height);
    let mut pool = GeometryPool::new();
    let floor = pool.upload_mesh(&mut backend, &ground_plane().unwrap()).unwrap();
    let objects = vec![SceneObject::fixed(floor, Instance::new().with_scale(30.0))];
    let mut pipeline = ShadowPipeline::new(&ctx, &mut backend).unwrap();

    for _ in 0..4 {
        backend.set_default_target(
            screen.create_view(&wgpu::TextureViewDescriptor::default()),
            width,
            height,
        );
        pipeline
            .update_and_render(&ctx, &mut backend, &pool, &objects)
            .unwrap();
    }
    assert_eq!(pipeline.frames(), 4);

    pipeline.destroy(&mut backend);
    pool.clear(&mut backend);
    assert_eq!(backend.frame().unwrap(), 5);
}
