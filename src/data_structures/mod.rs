//! Engine data structures: decoded meshes, vertex layouts, bounds and instances.
//!
//! - `bounds` holds the bounding volumes attached to groups and primitives
//! - `layout` describes vertex attributes and strides
//! - `mesh` is the CPU-side result of decoding (groups, primitives)
//! - `instance` holds per-object transforms and their animation
//! - `texture` wraps GPU textures used as render targets

pub mod bounds;
pub mod instance;
pub mod layout;
pub mod mesh;
pub mod texture;
