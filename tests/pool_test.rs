use shadow_ngin::{
    ResourceError,
    backend::{
        BackendConventions,
        headless::{Command, HeadlessBackend},
    },
    data_structures::mesh::{GroupData, MeshData, ground_plane, pos_normal_layout},
    resources::pool::{BufferKind, GeometryPool},
};

use crate::common::test_utils::init_test_logging;

mod common;

/// Two groups: the indexed ground plane and a non-indexed copy of its vertices.
fn two_group_mesh() -> MeshData {
    let mut mesh = ground_plane().unwrap();
    let unindexed = GroupData {
        indices: None,
        ..mesh.groups[0].clone()
    };
    mesh.groups.push(unindexed);
    mesh
}

fn destroyed(backend: &HeadlessBackend) -> usize {
    backend
        .commands()
        .iter()
        .filter(|c| matches!(c, Command::DestroyBuffer(_)))
        .count()
}

#[test]
fn release_twice_is_a_no_op() {
    init_test_logging();
    let mut backend = HeadlessBackend::new(BackendConventions::default());
    let mut pool = GeometryPool::new();
    let plane = ground_plane().unwrap();

    let buffers = pool
        .upload(&mut backend, &plane.groups[0], &plane.layout)
        .unwrap();
    assert!(buffers.index.is_some());
    assert!(pool.is_valid(&buffers));
    assert_eq!(backend.live_buffers(), 2);

    assert!(pool.release(&mut backend, &buffers));
    assert!(!pool.is_valid(&buffers));
    assert!(!pool.release(&mut backend, &buffers));

    assert_eq!(backend.live_buffers(), 0);
    assert_eq!(destroyed(&backend), 2);
    assert!(backend.invalid_destroys().is_empty());
    assert!(matches!(
        pool.resolve(&buffers),
        Err(ResourceError::StaleHandle(_))
    ));
}

#[test]
fn released_handle_does_not_alias_a_new_buffer() {
    let mut backend = HeadlessBackend::new(BackendConventions::default());
    let mut pool = GeometryPool::new();
    let plane = ground_plane().unwrap();

    let old = pool
        .upload(&mut backend, &plane.groups[0], &plane.layout)
        .unwrap();
    pool.release(&mut backend, &old);
    let new = pool
        .upload(&mut backend, &plane.groups[0], &plane.layout)
        .unwrap();

    assert_ne!(old.vertex, new.vertex);
    assert!(!pool.is_valid(&old));
    assert!(pool.is_valid(&new));
    pool.clear(&mut backend);
}

#[test]
fn failed_index_buffer_releases_the_vertex_buffer() {
    init_test_logging();
    let mut backend = HeadlessBackend::new(BackendConventions::default()).fail_buffers_after(1);
    let mut pool = GeometryPool::new();
    let plane = ground_plane().unwrap();

    let err = pool
        .upload(&mut backend, &plane.groups[0], &plane.layout)
        .unwrap_err();

    assert!(matches!(err, ResourceError::Creation { .. }));
    assert_eq!(backend.live_buffers(), 0);
    assert_eq!(pool.live_buffers(), 0);
    assert!(backend.invalid_destroys().is_empty());
}

#[test]
fn failed_mesh_upload_leaves_nothing_behind() {
    let mut backend = HeadlessBackend::new(BackendConventions::default()).fail_buffers_after(2);
    let mut pool = GeometryPool::new();

    // The first group takes both allowed buffers, the second fails.
    let result = pool.upload_mesh(&mut backend, &two_group_mesh());

    assert!(result.is_err());
    assert_eq!(backend.live_buffers(), 0);
    assert_eq!(pool.live_buffers(), 0);
    assert_eq!(destroyed(&backend), 2);
}

#[test]
fn destroy_mesh_releases_each_buffer_once() {
    let mut backend = HeadlessBackend::new(BackendConventions::default());
    let mut pool = GeometryPool::new();

    let handle = pool.upload_mesh(&mut backend, &two_group_mesh()).unwrap();
    let mesh = pool.mesh(handle).unwrap();
    assert_eq!(mesh.groups.len(), 2);
    assert_eq!(mesh.groups[0].num_indices, 6);
    assert_eq!(mesh.groups[1].buffers.index, None);
    let groups = mesh.groups.clone();
    assert_eq!(backend.live_buffers(), 3);

    assert!(pool.destroy_mesh(&mut backend, handle));
    assert!(!pool.destroy_mesh(&mut backend, handle));

    assert_eq!(backend.live_buffers(), 0);
    assert_eq!(destroyed(&backend), 3);
    assert!(backend.invalid_destroys().is_empty());
    assert!(pool.mesh(handle).is_none());
    assert!(groups.iter().all(|g| !pool.is_valid(&g.buffers)));
}

#[test]
fn raw_geometry_uploads_without_index_buffer() {
    let mut backend = HeadlessBackend::new(BackendConventions::default());
    let mut pool = GeometryPool::new();
    let plane = ground_plane().unwrap();
    let mesh =
        MeshData::from_raw_buffers(&plane.groups[0].vertices, pos_normal_layout(), &[]).unwrap();

    let handle = pool.upload_mesh(&mut backend, &mesh).unwrap();

    assert_eq!(pool.resident_bytes(BufferKind::Vertex), 4 * 16);
    assert_eq!(pool.resident_bytes(BufferKind::Index), 0);
    assert_eq!(
        backend.commands(),
        &[Command::CreateVertexBuffer {
            id: pool.resolve(&pool.mesh(handle).unwrap().groups[0].buffers).unwrap().0,
            size: 64,
            stride: 16,
        }]
    );
    pool.clear(&mut backend);
    assert_eq!(backend.live_buffers(), 0);
}
