//! CPU-side mesh data produced by the decoder.
//!
//! A [`MeshData`] is an ordered list of [`GroupData`] sharing one
//! [`VertexLayout`]. Nothing here touches the GPU; the geometry pool turns it into
//! owned backend buffers.

use crate::{
    data_structures::{
        bounds::Bounds,
        layout::{Attrib, AttribType, VertexLayout},
    },
    error::FormatError,
};

/// A named draw sub-range inside one group.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub name: String,
    pub start_index: u32,
    pub num_indices: u32,
    pub start_vertex: u32,
    pub num_vertices: u32,
    pub bounds: Bounds,
}

/// One vertex buffer, an optional index buffer and the primitives drawn from them.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupData {
    /// Raw vertex bytes, `num_vertices * stride` long.
    pub vertices: Vec<u8>,
    pub num_vertices: u32,
    pub indices: Option<Vec<u16>>,
    /// `None` only for groups built in memory by [`MeshData::from_raw_buffers`].
    pub bounds: Option<Bounds>,
    pub material: Option<String>,
    pub primitives: Vec<Primitive>,
}

impl GroupData {
    pub fn num_indices(&self) -> u32 {
        self.indices.as_ref().map_or(0, |i| i.len() as u32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub layout: VertexLayout,
    pub groups: Vec<GroupData>,
}

impl MeshData {
    /// Wraps caller-supplied geometry into a single group without primitives or bounds.
    ///
    /// An empty `indices` slice produces a non-indexed group.
    pub fn from_raw_buffers(
        vertices: &[u8],
        layout: VertexLayout,
        indices: &[u16],
    ) -> Result<Self, FormatError> {
        let stride = usize::from(layout.stride());
        if stride == 0 {
            return Err(FormatError::new("vertex layout has no attributes", 0));
        }
        if vertices.len() % stride != 0 {
            return Err(FormatError::new(
                format!(
                    "{} vertex bytes are not a multiple of the {stride} byte stride",
                    vertices.len()
                ),
                0,
            ));
        }

        let group = GroupData {
            num_vertices: (vertices.len() / stride) as u32,
            vertices: vertices.to_vec(),
            indices: (!indices.is_empty()).then(|| indices.to_vec()),
            bounds: None,
            material: None,
            primitives: Vec::new(),
        };

        Ok(Self {
            layout,
            groups: vec![group],
        })
    }

    pub fn num_vertices(&self) -> u32 {
        self.groups.iter().map(|g| g.num_vertices).sum()
    }
}

/// Packs four `[-1, 1]` floats into one `u32`, one byte per component.
pub fn pack_f4u(x: f32, y: f32, z: f32, w: f32) -> u32 {
    let pack = |v: f32| (v * 127.0 + 128.0) as u8;
    u32::from_le_bytes([pack(x), pack(y), pack(z), pack(w)])
}

/// Position plus packed normal, 16 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PosNormalVertex {
    pub position: [f32; 3],
    pub normal: u32,
}

/// Layout matching [`PosNormalVertex`].
pub fn pos_normal_layout() -> VertexLayout {
    VertexLayout::new()
        .add(Attrib::Position, 3, AttribType::Float, false, false)
        .add(Attrib::Normal, 4, AttribType::Uint8, true, true)
}

/// Unit plane in XZ facing +Y, two triangles.
pub fn ground_plane() -> Result<MeshData, FormatError> {
    let up = pack_f4u(0.0, 1.0, 0.0, 0.0);
    let vertices = [
        PosNormalVertex { position: [-1.0, 0.0, 1.0], normal: up },
        PosNormalVertex { position: [1.0, 0.0, 1.0], normal: up },
        PosNormalVertex { position: [-1.0, 0.0, -1.0], normal: up },
        PosNormalVertex { position: [1.0, 0.0, -1.0], normal: up },
    ];
    let indices: [u16; 6] = [0, 1, 2, 1, 3, 2];

    MeshData::from_raw_buffers(bytemuck::cast_slice(&vertices), pos_normal_layout(), &indices)
}
