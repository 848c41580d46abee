//! shadow-ngin
//!
//! Streams a chunked binary mesh format into GPU buffers and drives a two-pass
//! shadow-mapping pipeline: a depth pass from an orbiting directional light into
//! an offscreen target, then a shaded camera pass that samples it. The GPU work
//! itself goes through a [`backend::Backend`], so the core runs the same against
//! `wgpu` and against the recording headless backend used in tests.
//!
//! High-level modules
//! - `backend`: the submission contract plus headless and `wgpu` implementations
//! - `context`: screen, camera, light and view settings passed by reference
//! - `data_structures`: decoded meshes, vertex layouts, bounds and instances
//! - `error`: format and resource errors
//! - `logging`: `env_logger` setup for applications and tests
//! - `math`: matrix helpers shared by every pass
//! - `pipelines`: the per-frame shadow pipeline and its `wgpu` programs
//! - `render`: views and draw submissions handed to the backend
//! - `resources`: the mesh decoder and the geometry pool
//! - `time`: frame timing
//!

pub mod backend;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod logging;
pub mod math;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod time;

pub use error::{Error, FormatError, ResourceError, Result};

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
