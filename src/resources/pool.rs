//! GPU buffers derived from decoded meshes.
//!
//! The pool hands out generation-checked handles instead of raw backend ids.
//! Releasing a buffer removes its slot, so a handle that outlived its buffer is
//! detected as stale instead of aliasing whatever occupies the slot next.

use slotmap::{SlotMap, new_key_type};

use crate::{
    backend::{Backend, BufferId},
    data_structures::{
        bounds::Bounds,
        layout::VertexLayout,
        mesh::{GroupData, MeshData, Primitive},
    },
    error::ResourceError,
};

new_key_type! {
    /// Handle to one backend buffer owned by the pool.
    pub struct BufferHandle;
    /// Handle to an uploaded mesh.
    pub struct MeshHandle;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

#[derive(Debug, Clone, Copy)]
struct BufferSlot {
    id: BufferId,
    kind: BufferKind,
    size: usize,
}

/// Buffers created for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnedBuffers {
    pub vertex: BufferHandle,
    pub index: Option<BufferHandle>,
}

/// A group living on the GPU.
#[derive(Debug, Clone)]
pub struct GpuGroup {
    pub buffers: OwnedBuffers,
    pub num_vertices: u32,
    pub num_indices: u32,
    pub bounds: Option<Bounds>,
    pub material: Option<String>,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone)]
pub struct GpuMesh {
    pub layout: VertexLayout,
    pub groups: Vec<GpuGroup>,
}

#[derive(Debug, Default)]
pub struct GeometryPool {
    buffers: SlotMap<BufferHandle, BufferSlot>,
    meshes: SlotMap<MeshHandle, GpuMesh>,
}

impl GeometryPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, id: BufferId, kind: BufferKind, size: usize) -> BufferHandle {
        self.buffers.insert(BufferSlot { id, kind, size })
    }

    /// Creates the vertex buffer and, if the group is indexed, the index buffer.
    ///
    /// Nothing stays allocated when this fails.
    pub fn upload(
        &mut self,
        backend: &mut impl Backend,
        group: &GroupData,
        layout: &VertexLayout,
    ) -> Result<OwnedBuffers, ResourceError> {
        let vertex_id = backend.create_vertex_buffer(&group.vertices, layout)?;

        let index_id = match group.indices.as_deref() {
            Some(indices) => match backend.create_index_buffer(indices) {
                Ok(id) => Some((id, indices.len() * 2)),
                Err(e) => {
                    backend.destroy_buffer(vertex_id);
                    return Err(e);
                }
            },
            None => None,
        };

        let vertex = self.insert(vertex_id, BufferKind::Vertex, group.vertices.len());
        let index = index_id.map(|(id, size)| self.insert(id, BufferKind::Index, size));
        log::debug!(
            "uploaded group: {} vertices ({vertex_id:?}), {} indices",
            group.num_vertices,
            group.num_indices()
        );
        Ok(OwnedBuffers { vertex, index })
    }

    /// Uploads every group of `mesh`.
    ///
    /// Fails as a whole: groups uploaded before the failing one are released.
    pub fn upload_mesh(
        &mut self,
        backend: &mut impl Backend,
        mesh: &MeshData,
    ) -> Result<MeshHandle, ResourceError> {
        let mut groups = Vec::with_capacity(mesh.groups.len());
        for group in &mesh.groups {
            match self.upload(backend, group, &mesh.layout) {
                Ok(buffers) => groups.push(GpuGroup {
                    buffers,
                    num_vertices: group.num_vertices,
                    num_indices: group.num_indices(),
                    bounds: group.bounds,
                    material: group.material.clone(),
                    primitives: group.primitives.clone(),
                }),
                Err(e) => {
                    log::warn!(
                        "mesh upload failed after {} of {} groups: {e}",
                        groups.len(),
                        mesh.groups.len()
                    );
                    for uploaded in &groups {
                        self.release(backend, &uploaded.buffers);
                    }
                    return Err(e);
                }
            }
        }

        Ok(self.meshes.insert(GpuMesh {
            layout: mesh.layout.clone(),
            groups,
        }))
    }

    /// Destroys the buffers of one group.
    ///
    /// Returns `false` without touching the backend when they were already released.
    pub fn release(&mut self, backend: &mut impl Backend, buffers: &OwnedBuffers) -> bool {
        let Some(vertex) = self.buffers.remove(buffers.vertex) else {
            log::warn!("release of already released buffers {buffers:?}");
            return false;
        };
        backend.destroy_buffer(vertex.id);
        if let Some(index) = buffers.index.and_then(|handle| self.buffers.remove(handle)) {
            backend.destroy_buffer(index.id);
        }
        log::debug!("released buffers {buffers:?}");
        true
    }

    /// Releases every group of the mesh exactly once and invalidates its handle.
    pub fn destroy_mesh(&mut self, backend: &mut impl Backend, handle: MeshHandle) -> bool {
        let Some(mesh) = self.meshes.remove(handle) else {
            log::warn!("destroy of unknown mesh {handle:?}");
            return false;
        };
        for group in &mesh.groups {
            self.release(backend, &group.buffers);
        }
        true
    }

    pub fn mesh(&self, handle: MeshHandle) -> Option<&GpuMesh> {
        self.meshes.get(handle)
    }

    /// Backend ids behind `buffers`.
    pub fn resolve(
        &self,
        buffers: &OwnedBuffers,
    ) -> Result<(BufferId, Option<BufferId>), ResourceError> {
        let vertex = self
            .buffers
            .get(buffers.vertex)
            .ok_or(ResourceError::StaleHandle("vertex buffer"))?;
        let index = match buffers.index {
            Some(handle) => Some(
                self.buffers
                    .get(handle)
                    .ok_or(ResourceError::StaleHandle("index buffer"))?
                    .id,
            ),
            None => None,
        };
        Ok((vertex.id, index))
    }

    pub fn is_valid(&self, buffers: &OwnedBuffers) -> bool {
        self.resolve(buffers).is_ok()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Bytes held by live buffers of `kind`.
    pub fn resident_bytes(&self, kind: BufferKind) -> usize {
        self.buffers
            .values()
            .filter(|slot| slot.kind == kind)
            .map(|slot| slot.size)
            .sum()
    }

    /// Destroys every mesh and any buffer uploaded outside a mesh.
    pub fn clear(&mut self, backend: &mut impl Backend) {
        let meshes: Vec<MeshHandle> = self.meshes.keys().collect();
        for handle in meshes {
            self.destroy_mesh(backend, handle);
        }
        for (_, slot) in self.buffers.drain() {
            backend.destroy_buffer(slot.id);
        }
    }
}

impl Drop for GeometryPool {
    fn drop(&mut self) {
        if !self.buffers.is_empty() {
            log::warn!(
                "geometry pool dropped with {} live buffers; call clear() first",
                self.buffers.len()
            );
        }
    }
}
