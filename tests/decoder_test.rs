use shadow_ngin::{
    data_structures::layout::{Attrib, AttribType, VertexLayout},
    resources::{
        load_mesh,
        mesh::{decode, decode_bytes},
    },
};

use crate::common::test_utils::{
    MeshStream, TrickleReader, init_test_logging, layout16, vertex_bytes,
};

mod common;

#[test]
fn vertex_then_primitive_chunk_yields_one_group() {
    init_test_logging();
    let layout = layout16();
    let bytes = MeshStream::new()
        .vertex_chunk(&layout, &vertex_bytes(2, 16))
        .primitive_chunk("stone", &[("all", [0, 0, 0, 2])])
        .into_bytes();

    let mesh = decode_bytes(&bytes).unwrap();

    assert_eq!(mesh.layout.stride(), 16);
    assert_eq!(mesh.groups.len(), 1);
    let group = &mesh.groups[0];
    assert_eq!(group.num_vertices, 2);
    assert_eq!(group.vertices, vertex_bytes(2, 16));
    assert_eq!(group.indices, None);
    assert_eq!(group.material.as_deref(), Some("stone"));
    assert_eq!(group.primitives.len(), 1);

    let primitive = &group.primitives[0];
    assert_eq!(primitive.name, "all");
    assert_eq!(primitive.num_vertices, 2);
    assert_eq!(primitive.bounds.sphere.radius, 1.0);

    let bounds = group.bounds.expect("decoded groups carry bounds");
    assert_eq!(bounds.aabb.max.x, 1.0);
    assert_eq!(bounds.obb.matrix.w.w, 1.0);
}

#[test]
fn index_chunk_before_vertex_chunk_fails() {
    init_test_logging();
    let bytes = MeshStream::new().index_chunk(&[0, 1, 2]).into_bytes();

    let err = decode_bytes(&bytes).unwrap_err();

    assert_eq!(err.reason, "index chunk without vertex chunk");
    assert_eq!(err.offset, 0);
}

#[test]
fn indexed_group_keeps_its_indices() {
    let layout = layout16();
    let bytes = MeshStream::new()
        .vertex_chunk(&layout, &vertex_bytes(3, 16))
        .index_chunk(&[0, 1, 2, 2, 1, 0])
        .primitive_chunk("", &[("front", [0, 3, 0, 3]), ("back", [3, 3, 0, 3])])
        .into_bytes();

    let mesh = decode_bytes(&bytes).unwrap();

    let group = &mesh.groups[0];
    assert_eq!(group.indices.as_deref(), Some(&[0u16, 1, 2, 2, 1, 0][..]));
    assert_eq!(group.num_indices(), 6);
    assert_eq!(group.primitives[1].name, "back");
    assert_eq!(group.primitives[1].start_index, 3);
}

#[test]
fn trailing_unsealed_group_is_kept() {
    init_test_logging();
    let layout = layout16();
    let bytes = MeshStream::new()
        .vertex_chunk(&layout, &vertex_bytes(2, 16))
        .primitive_chunk("a", &[("a", [0, 0, 0, 2])])
        .vertex_chunk(&layout, &vertex_bytes(4, 16))
        .index_chunk(&[0, 1, 2])
        .into_bytes();

    let mesh = decode_bytes(&bytes).unwrap();

    assert_eq!(mesh.groups.len(), 2);
    let trailing = &mesh.groups[1];
    assert_eq!(trailing.num_vertices, 4);
    assert_eq!(trailing.num_indices(), 3);
    assert_eq!(trailing.material, None);
    assert!(trailing.primitives.is_empty());
    assert_eq!(mesh.num_vertices(), 6);
}

#[test]
fn vertex_chunk_closes_the_open_group() {
    let layout = layout16();
    let bytes = MeshStream::new()
        .vertex_chunk(&layout, &vertex_bytes(1, 16))
        .vertex_chunk(&layout, &vertex_bytes(2, 16))
        .primitive_chunk("b", &[("b", [0, 0, 0, 2])])
        .into_bytes();

    let mesh = decode_bytes(&bytes).unwrap();

    assert_eq!(mesh.groups.len(), 2);
    assert!(mesh.groups[0].primitives.is_empty());
    assert_eq!(mesh.groups[0].num_vertices, 1);
    assert_eq!(mesh.groups[1].primitives.len(), 1);
}

#[test]
fn second_index_chunk_fails() {
    let layout = layout16();
    let stream = MeshStream::new()
        .vertex_chunk(&layout, &vertex_bytes(3, 16))
        .index_chunk(&[0, 1, 2]);
    let offset = stream.len() as u64;
    let bytes = stream.index_chunk(&[2, 1, 0]).into_bytes();

    let err = decode_bytes(&bytes).unwrap_err();

    assert_eq!(err.offset, offset);
    assert!(err.reason.contains("index chunk"), "{}", err.reason);
}

#[test]
fn primitive_chunk_without_vertex_chunk_fails() {
    let bytes = MeshStream::new()
        .primitive_chunk("m", &[("p", [0, 0, 0, 0])])
        .into_bytes();

    let err = decode_bytes(&bytes).unwrap_err();

    assert_eq!(err.reason, "primitive chunk without vertex chunk");
}

#[test]
fn truncated_vertex_payload_fails() {
    let layout = layout16();
    let mut bytes = MeshStream::new()
        .vertex_chunk(&layout, &vertex_bytes(2, 16))
        .into_bytes();
    bytes.truncate(bytes.len() - 3);

    let err = decode_bytes(&bytes).unwrap_err();

    assert!(err.reason.contains("vertex data"), "{}", err.reason);
    assert_eq!(err.offset, bytes.len() as u64);
}

#[test]
fn index_count_beyond_stream_fails() {
    let layout = layout16();
    let bytes = MeshStream::new()
        .vertex_chunk(&layout, &vertex_bytes(1, 16))
        .raw(b"IB \0")
        .raw(&100u32.to_le_bytes())
        .raw(&[0, 0])
        .into_bytes();

    let err = decode_bytes(&bytes).unwrap_err();

    assert!(err.reason.contains("index data"), "{}", err.reason);
}

#[test]
fn unknown_tag_fails_after_a_valid_group() {
    init_test_logging();
    let layout = layout16();
    let stream = MeshStream::new()
        .vertex_chunk(&layout, &vertex_bytes(2, 16))
        .primitive_chunk("a", &[]);
    let offset = stream.len() as u64;
    let bytes = stream
        .raw(b"TEX\0")
        .vertex_chunk(&layout, &vertex_bytes(2, 16))
        .into_bytes();

    let err = decode_bytes(&bytes).unwrap_err();

    assert_eq!(err.offset, offset);
    assert!(err.reason.contains("TEX"), "{}", err.reason);
}

#[test]
fn stored_stride_must_match_attributes() {
    let layout = layout16();
    let bytes = MeshStream::new()
        .vertex_chunk_raw(&layout, 20, 1, &vertex_bytes(1, 20))
        .into_bytes();

    let err = decode_bytes(&bytes).unwrap_err();

    assert!(err.reason.contains("stride"), "{}", err.reason);
}

#[test]
fn decoded_stride_is_the_sum_of_attribute_sizes() {
    let types = [
        AttribType::Uint8,
        AttribType::Int16,
        AttribType::Half,
        AttribType::Float,
    ];
    for ty in types {
        for num in 1..=4u8 {
            let layout = VertexLayout::new()
                .add(Attrib::Position, num, ty, false, false)
                .add(Attrib::TexCoord(7), 5 - num, ty, true, false);
            let stride = usize::from(layout.stride());
            let bytes = MeshStream::new()
                .vertex_chunk(&layout, &vertex_bytes(3, stride))
                .into_bytes();

            let mesh = decode_bytes(&bytes).unwrap();

            let sum: u16 = mesh.layout.attributes().iter().map(|a| a.size()).sum();
            assert_eq!(mesh.layout.stride(), sum, "{ty:?} x{num}");
            assert_eq!(mesh.layout, layout);
            assert_eq!(mesh.groups[0].num_vertices, 3);
            assert_eq!(mesh.groups[0].vertices.len(), 3 * stride);
        }
    }
}

#[test]
fn groups_must_share_one_layout() {
    let narrow = VertexLayout::new().add(Attrib::Position, 2, AttribType::Float, false, false);
    let bytes = MeshStream::new()
        .vertex_chunk(&layout16(), &vertex_bytes(1, 16))
        .vertex_chunk(&narrow, &vertex_bytes(1, 8))
        .into_bytes();

    let err = decode_bytes(&bytes).unwrap_err();

    assert!(err.reason.contains("layout"), "{}", err.reason);
}

#[test]
fn tags_split_across_reads_are_reassembled() {
    let layout = layout16();
    let bytes = MeshStream::new()
        .vertex_chunk(&layout, &vertex_bytes(2, 16))
        .index_chunk(&[0, 1, 1])
        .primitive_chunk("slow", &[("all", [0, 3, 0, 2])])
        .into_bytes();

    let trickled = decode(TrickleReader::new(&bytes)).unwrap();

    assert_eq!(trickled, decode_bytes(&bytes).unwrap());
}

#[test]
fn load_mesh_reads_from_disk() {
    init_test_logging();
    let bytes = MeshStream::new()
        .vertex_chunk(&layout16(), &vertex_bytes(2, 16))
        .primitive_chunk("disk", &[("all", [0, 0, 0, 2])])
        .into_bytes();
    let path = std::env::temp_dir().join(format!("shadow_ngin_decoder_{}.bin", std::process::id()));
    std::fs::write(&path, &bytes).unwrap();

    let mesh = load_mesh(&path);
    std::fs::remove_file(&path).unwrap();

    assert_eq!(mesh.unwrap().groups[0].material.as_deref(), Some("disk"));
}

#[test]
fn load_mesh_reports_the_missing_path() {
    let err = load_mesh("does/not/exist.bin").unwrap_err();

    assert!(format!("{err:#}").contains("does/not/exist.bin"));
}
