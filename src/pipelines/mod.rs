//! Render pipelines.
//!
//! - `shadow` drives the per-frame light and camera passes
//! - `programs` builds the `wgpu` render pipelines those passes select

pub mod programs;
pub mod shadow;
