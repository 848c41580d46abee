//! The two-pass shadow-map pipeline.
//!
//! Every frame renders the scene twice:
//!
//! 1. From the light into the offscreen shadow map, packing depth into RGBA.
//! 2. From the camera into the default framebuffer, sampling the shadow map
//!    through each object's light matrix.
//!
//! The light is directional and orbits the scene, so its projection is
//! orthographic. All matrices of a frame are collected in [`FrameTransforms`].

use std::time::Duration;

use cgmath::{EuclideanSpace, Point3, Vector4};

use crate::{
    backend::{Backend, TargetId},
    context::PipelineContext,
    data_structures::instance::SceneObject,
    error::ResourceError,
    math::{self, Mat4},
    render::{DrawRange, DrawSubmission, FrameUniforms, Geometry, Program, ViewRect, ViewSetup},
    resources::pool::{GeometryPool, GpuGroup},
    time::FrameTimer,
};

/// Direction the light travels in after `elapsed` seconds, `w = 0`.
pub fn light_direction(elapsed: f32) -> Vector4<f32> {
    Vector4::new(-elapsed.cos(), -1.0, -elapsed.sin(), 0.0)
}

/// View and orthographic projection of a light travelling along `direction`.
///
/// The light looks at the origin from `-direction`.
pub fn light_view_projection(ctx: &PipelineContext, direction: Vector4<f32>) -> (Mat4, Mat4) {
    let eye = Point3::new(-direction.x, -direction.y, -direction.z);
    let view = math::look_at(eye, Point3::origin());
    let area = ctx.light.area;
    let proj = math::orthographic(-area, area, -area, area, ctx.light.near, ctx.light.far);
    (view, proj)
}

/// World space to shadow-map texture space.
pub fn shadow_matrix(light_view: &Mat4, light_proj: &Mat4, vertical_flip: bool) -> Mat4 {
    math::multiply(
        light_view,
        &math::multiply(light_proj, &math::crop_bias(vertical_flip)),
    )
}

/// Every matrix used in one frame. Rebuilt each frame, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTransforms {
    pub elapsed: f32,
    pub light_direction: Vector4<f32>,
    pub light_view: Mat4,
    pub light_proj: Mat4,
    pub camera_view: Mat4,
    pub camera_proj: Mat4,
    /// Shared part of every light matrix, see [`shadow_matrix`].
    pub shadow: Mat4,
    pub models: Vec<Mat4>,
    /// `model · shadow` per object, same order as `models`.
    pub light_matrices: Vec<Mat4>,
}

impl FrameTransforms {
    pub fn compute(
        ctx: &PipelineContext,
        elapsed: f32,
        light_direction: Vector4<f32>,
        models: Vec<Mat4>,
    ) -> Self {
        let (light_view, light_proj) = light_view_projection(ctx, light_direction);
        let shadow = shadow_matrix(&light_view, &light_proj, ctx.vertical_flip);
        let light_matrices = models
            .iter()
            .map(|model| math::multiply(model, &shadow))
            .collect();
        Self {
            elapsed,
            light_direction,
            light_view,
            light_proj,
            camera_view: ctx.camera_view(),
            camera_proj: ctx.camera_proj(),
            shadow,
            models,
            light_matrices,
        }
    }
}

/// Draw parameters of one group, `None` when the group has nothing to draw.
fn group_geometry(
    pool: &GeometryPool,
    group: &GpuGroup,
) -> Result<Option<Geometry>, ResourceError> {
    let (vertex_buffer, index_buffer) = pool.resolve(&group.buffers)?;
    if group.num_vertices == 0 {
        log::debug!("skipping group without vertices");
        return Ok(None);
    }
    let range = match index_buffer {
        Some(_) if group.num_indices > 0 => DrawRange::Indexed {
            start: 0,
            count: group.num_indices,
        },
        _ => DrawRange::Vertices {
            start: 0,
            count: group.num_vertices,
        },
    };
    Ok(Some(Geometry {
        vertex_buffer,
        index_buffer,
        range,
    }))
}

pub struct ShadowPipeline {
    shadow_map: TargetId,
    elapsed: f32,
    timer: FrameTimer,
    frames: u64,
}

impl ShadowPipeline {
    /// Creates the shadow-map render target.
    pub fn new(ctx: &PipelineContext, backend: &mut impl Backend) -> Result<Self, ResourceError> {
        let shadow_map = backend.create_render_target(&ctx.shadow_map_desc())?;
        log::debug!(
            "shadow map {shadow_map:?}: {0}x{0}",
            ctx.shadow_map_size
        );
        Ok(Self {
            shadow_map,
            elapsed: 0.0,
            timer: FrameTimer::new(),
            frames: 0,
        })
    }

    pub fn shadow_map(&self) -> TargetId {
        self.shadow_map
    }

    /// Seconds of animation time accumulated so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn advance(&mut self, dt: Duration) {
        self.elapsed += dt.as_secs_f32();
    }

    /// Advances by the wall-clock time since the previous tick.
    pub fn tick(&mut self) -> Duration {
        let dt = self.timer.tick();
        self.advance(dt);
        log::trace!("frame time {:.3} ms", dt.as_secs_f64() * 1000.0);
        dt
    }

    /// Renders both passes for the current elapsed time and closes the frame.
    ///
    /// Every mesh is resolved before the first backend call, so a stale handle
    /// fails the frame without submitting anything.
    pub fn render_frame(
        &mut self,
        ctx: &PipelineContext,
        backend: &mut impl Backend,
        pool: &GeometryPool,
        objects: &[SceneObject],
    ) -> crate::Result<FrameTransforms> {
        let geometries = objects
            .iter()
            .map(|object| -> Result<Vec<Geometry>, ResourceError> {
                let mesh = pool
                    .mesh(object.mesh)
                    .ok_or(ResourceError::StaleHandle("mesh"))?;
                mesh.groups
                    .iter()
                    .filter_map(|group| group_geometry(pool, group).transpose())
                    .collect()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let direction = light_direction(self.elapsed);
        let models = objects
            .iter()
            .map(|object| object.model_matrix(self.elapsed))
            .collect();
        let transforms = FrameTransforms::compute(ctx, self.elapsed, direction, models);

        backend.set_frame_uniforms(&FrameUniforms {
            light_direction: direction.into(),
        });
        backend.set_view(
            ctx.shadow_view,
            &ViewSetup {
                rect: ViewRect::sized(ctx.shadow_map_size, ctx.shadow_map_size),
                target: Some(self.shadow_map),
                view: transforms.light_view,
                proj: transforms.light_proj,
                clear: Some(ctx.clear),
            },
        );
        backend.set_view(
            ctx.scene_view,
            &ViewSetup {
                rect: ViewRect::sized(ctx.width, ctx.height),
                target: None,
                view: transforms.camera_view,
                proj: transforms.camera_proj,
                clear: Some(ctx.clear),
            },
        );

        for (model, groups) in transforms.models.iter().zip(&geometries) {
            for geometry in groups {
                backend.submit(
                    ctx.shadow_view,
                    &DrawSubmission {
                        model: *model,
                        light_transform: None,
                        program: Program::PackDepth,
                        shadow_map: None,
                        geometry: *geometry,
                    },
                );
            }
        }

        for ((model, light), groups) in transforms
            .models
            .iter()
            .zip(&transforms.light_matrices)
            .zip(&geometries)
        {
            for geometry in groups {
                backend.submit(
                    ctx.scene_view,
                    &DrawSubmission {
                        model: *model,
                        light_transform: Some(*light),
                        program: Program::Draw,
                        shadow_map: Some(self.shadow_map),
                        geometry: *geometry,
                    },
                );
            }
        }

        backend.frame()?;
        self.frames += 1;
        Ok(transforms)
    }

    /// [`tick`](Self::tick) followed by [`render_frame`](Self::render_frame).
    pub fn update_and_render(
        &mut self,
        ctx: &PipelineContext,
        backend: &mut impl Backend,
        pool: &GeometryPool,
        objects: &[SceneObject],
    ) -> crate::Result<FrameTransforms> {
        self.tick();
        self.render_frame(ctx, backend, pool, objects)
    }

    pub fn destroy(self, backend: &mut impl Backend) {
        backend.destroy_render_target(self.shadow_map);
    }
}
