use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context;

use crate::data_structures::mesh::MeshData;

/**
 * Loading meshes from external files and turning them into GPU buffers.
 *
 * `mesh` decodes the chunked container, `pool` owns the buffers created from it.
 */
pub mod mesh;
pub mod pool;

pub fn load_binary(path: impl AsRef<Path>) -> anyhow::Result<Vec<u8>> {
    let path = path.as_ref();
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

/// Decodes the mesh file at `path`, streaming it through a buffered reader.
pub fn load_mesh(path: impl AsRef<Path>) -> anyhow::Result<MeshData> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening mesh {}", path.display()))?;
    let mesh = mesh::decode(BufReader::new(file))
        .with_context(|| format!("decoding mesh {}", path.display()))?;
    log::info!(
        "loaded {}: {} groups, {} vertices",
        path.display(),
        mesh.groups.len(),
        mesh.num_vertices()
    );
    Ok(mesh)
}
