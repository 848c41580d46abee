//! Decoder for the chunked binary mesh container.
//!
//! A stream is a sequence of chunks, each introduced by a four byte tag:
//!
//! | tag      | payload |
//! |----------|---------|
//! | `VB \0`  | bounds, vertex layout, `u16` vertex count, `count * stride` bytes |
//! | `IB \0`  | `u32` index count, `count` little-endian `u16` indices |
//! | `PRI\0`  | `u16`-prefixed material name, `u16` primitive count, primitives |
//!
//! Bounds are a sphere (4 `f32`), an axis aligned box (6 `f32`) and an oriented
//! box (16 `f32`). All integers and floats are little-endian.
//!
//! A vertex chunk opens a group, an optional index chunk adds indices to it and a
//! primitive chunk seals it. Chunks carry no length prefix, so an unknown tag
//! cannot be skipped and fails the whole decode.

use std::io::{self, Read};

use cgmath::{Matrix4, Vector3};

use crate::{
    data_structures::{
        bounds::{Aabb, Bounds, Obb, Sphere},
        layout::{Attrib, AttribType, VertexAttribute, VertexLayout},
        mesh::{GroupData, MeshData, Primitive},
    },
    error::FormatError,
};

pub const VERTEX_TAG: [u8; 4] = *b"VB \0";
pub const INDEX_TAG: [u8; 4] = *b"IB \0";
pub const PRIMITIVE_TAG: [u8; 4] = *b"PRI\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk {
    Vertex,
    Index,
    Primitive,
}

impl Chunk {
    fn from_tag(tag: [u8; 4]) -> Option<Self> {
        match tag {
            VERTEX_TAG => Some(Chunk::Vertex),
            INDEX_TAG => Some(Chunk::Index),
            PRIMITIVE_TAG => Some(Chunk::Primitive),
            _ => None,
        }
    }
}

/// The group currently being assembled.
enum Accumulator {
    Empty,
    HasVertices(GroupData),
    HasIndices(GroupData),
}

impl Accumulator {
    fn into_group(self) -> Option<GroupData> {
        match self {
            Accumulator::Empty => None,
            Accumulator::HasVertices(group) | Accumulator::HasIndices(group) => Some(group),
        }
    }
}

/// Little-endian reader that tracks its byte offset for error reporting.
struct ChunkReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> ChunkReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn io_error(&self, what: &str, err: io::Error) -> FormatError {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => {
                FormatError::new(format!("stream truncated while reading {what}"), self.offset)
            }
            _ => FormatError::new(format!("i/o error while reading {what}: {err}"), self.offset),
        }
    }

    /// Next chunk tag, `None` on a clean end of stream.
    fn tag(&mut self) -> Result<Option<[u8; 4]>, FormatError> {
        let mut tag = [0u8; 4];
        let mut filled = 0;
        while filled < tag.len() {
            match self.inner.read(&mut tag[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(self.io_error("chunk tag", e)),
            }
        }
        self.offset += filled as u64;
        match filled {
            0 => Ok(None),
            4 => Ok(Some(tag)),
            _ => Err(FormatError::new(
                format!("truncated chunk tag ({filled} of 4 bytes)"),
                self.offset,
            )),
        }
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N], FormatError> {
        let mut buf = [0u8; N];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| self.io_error(what, e))?;
        self.offset += N as u64;
        Ok(buf)
    }

    /// Reads a payload of `len` bytes, failing if fewer remain.
    fn bytes(&mut self, len: usize, what: &str) -> Result<Vec<u8>, FormatError> {
        let mut buf = Vec::with_capacity(len.min(1 << 20));
        let result = (&mut self.inner).take(len as u64).read_to_end(&mut buf);
        let read = result.map_err(|e| self.io_error(what, e))?;
        self.offset += read as u64;
        if read < len {
            return Err(FormatError::new(
                format!("{what} declares {len} bytes but only {read} remain"),
                self.offset,
            ));
        }
        Ok(buf)
    }

    fn u8(&mut self, what: &str) -> Result<u8, FormatError> {
        Ok(self.array::<1>(what)?[0])
    }

    fn u16(&mut self, what: &str) -> Result<u16, FormatError> {
        Ok(u16::from_le_bytes(self.array(what)?))
    }

    fn u32(&mut self, what: &str) -> Result<u32, FormatError> {
        Ok(u32::from_le_bytes(self.array(what)?))
    }

    fn f32(&mut self, what: &str) -> Result<f32, FormatError> {
        Ok(f32::from_le_bytes(self.array(what)?))
    }

    fn vec3(&mut self, what: &str) -> Result<Vector3<f32>, FormatError> {
        Ok(Vector3::new(self.f32(what)?, self.f32(what)?, self.f32(what)?))
    }

    fn string(&mut self, what: &str) -> Result<String, FormatError> {
        let len = self.u16(what)?;
        let bytes = self.bytes(usize::from(len), what)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn bounds(&mut self) -> Result<Bounds, FormatError> {
        let sphere = Sphere {
            center: self.vec3("bounding sphere")?,
            radius: self.f32("bounding sphere")?,
        };
        let aabb = Aabb {
            min: self.vec3("bounding box")?,
            max: self.vec3("bounding box")?,
        };
        let mut columns = [[0.0f32; 4]; 4];
        for column in columns.iter_mut() {
            for value in column.iter_mut() {
                *value = self.f32("oriented bounding box")?;
            }
        }
        let obb = Obb {
            matrix: Matrix4::from(columns),
        };
        Ok(Bounds { sphere, aabb, obb })
    }

    fn layout(&mut self) -> Result<VertexLayout, FormatError> {
        let start = self.offset;
        let count = self.u8("vertex layout")?;
        let stride = self.u16("vertex layout")?;

        let mut attributes = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let at = self.offset;
            let offset = self.u16("vertex attribute")?;
            let attrib_id = self.u16("vertex attribute")?;
            let num = self.u8("vertex attribute")?;
            let type_id = self.u16("vertex attribute")?;
            let normalized = self.u8("vertex attribute")? != 0;
            let as_int = self.u8("vertex attribute")? != 0;

            let attrib = Attrib::from_id(attrib_id).ok_or_else(|| {
                FormatError::new(format!("unknown vertex attribute id {attrib_id:#06x}"), at)
            })?;
            let ty = AttribType::from_id(type_id).ok_or_else(|| {
                FormatError::new(format!("unknown vertex attribute type {type_id:#06x}"), at)
            })?;
            attributes.push(VertexAttribute {
                attrib,
                num,
                ty,
                normalized,
                as_int,
                offset,
            });
        }
        VertexLayout::from_parts(attributes, stride)
            .map_err(|reason| FormatError::new(reason, start))
    }

    fn vertex_chunk(&mut self) -> Result<(GroupData, VertexLayout), FormatError> {
        let bounds = self.bounds()?;
        let layout = self.layout()?;
        let num_vertices = self.u16("vertex count")?;
        let len = usize::from(num_vertices) * usize::from(layout.stride());
        let vertices = self.bytes(len, "vertex data")?;

        let group = GroupData {
            vertices,
            num_vertices: u32::from(num_vertices),
            indices: None,
            bounds: Some(bounds),
            material: None,
            primitives: Vec::new(),
        };
        Ok((group, layout))
    }

    fn index_chunk(&mut self) -> Result<Vec<u16>, FormatError> {
        let count = self.u32("index count")?;
        let len = (count as usize)
            .checked_mul(2)
            .ok_or_else(|| FormatError::new("index count overflows", self.offset))?;
        let bytes = self.bytes(len, "index data")?;
        Ok(bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }

    fn primitive_chunk(&mut self) -> Result<(String, Vec<Primitive>), FormatError> {
        let material = self.string("material name")?;
        let count = self.u16("primitive count")?;

        let mut primitives = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let name = self.string("primitive name")?;
            let start_index = self.u32("primitive range")?;
            let num_indices = self.u32("primitive range")?;
            let start_vertex = self.u32("primitive range")?;
            let num_vertices = self.u32("primitive range")?;
            let bounds = self.bounds()?;
            primitives.push(Primitive {
                name,
                start_index,
                num_indices,
                start_vertex,
                num_vertices,
                bounds,
            });
        }
        Ok((material, primitives))
    }
}

/// Decodes a whole mesh from `reader`.
///
/// Decoding stops at the first clean end of stream. A group whose vertices were
/// read but which no primitive chunk sealed is still part of the result.
pub fn decode<R: Read>(reader: R) -> Result<MeshData, FormatError> {
    let mut reader = ChunkReader::new(reader);
    let mut layout: Option<VertexLayout> = None;
    let mut groups = Vec::new();
    let mut state = Accumulator::Empty;

    loop {
        let start = reader.offset();
        let Some(tag) = reader.tag()? else {
            break;
        };

        match Chunk::from_tag(tag) {
            Some(Chunk::Vertex) => {
                log::debug!("vertex chunk at offset {start}");
                if let Some(open) = std::mem::replace(&mut state, Accumulator::Empty).into_group() {
                    log::debug!("vertex chunk at offset {start} closes an unsealed group");
                    groups.push(open);
                }
                let (group, group_layout) = reader.vertex_chunk()?;
                match &layout {
                    Some(mesh_layout) if *mesh_layout != group_layout => {
                        return Err(FormatError::new(
                            "vertex layout differs from the first group's layout",
                            start,
                        ));
                    }
                    Some(_) => {}
                    None => layout = Some(group_layout),
                }
                state = Accumulator::HasVertices(group);
            }
            Some(Chunk::Index) => {
                log::debug!("index chunk at offset {start}");
                state = match state {
                    Accumulator::Empty => {
                        return Err(FormatError::new("index chunk without vertex chunk", start));
                    }
                    Accumulator::HasIndices(_) => {
                        return Err(FormatError::new("second index chunk for one group", start));
                    }
                    Accumulator::HasVertices(mut group) => {
                        group.indices = Some(reader.index_chunk()?);
                        Accumulator::HasIndices(group)
                    }
                };
            }
            Some(Chunk::Primitive) => {
                log::debug!("primitive chunk at offset {start}");
                let Some(mut group) = std::mem::replace(&mut state, Accumulator::Empty).into_group()
                else {
                    return Err(FormatError::new("primitive chunk without vertex chunk", start));
                };
                let (material, primitives) = reader.primitive_chunk()?;
                group.material = Some(material);
                group.primitives = primitives;
                groups.push(group);
            }
            None => {
                log::warn!(
                    "unrecognized chunk tag \"{}\" at offset {start}",
                    tag.escape_ascii()
                );
                return Err(FormatError::new(
                    format!("unrecognized chunk tag \"{}\"", tag.escape_ascii()),
                    start,
                ));
            }
        }
    }

    if let Some(open) = state.into_group() {
        log::debug!("appending trailing group without primitive chunk");
        groups.push(open);
    }

    let layout = layout.ok_or_else(|| FormatError::new("no vertex chunk", reader.offset()))?;
    Ok(MeshData { layout, groups })
}

pub fn decode_bytes(bytes: &[u8]) -> Result<MeshData, FormatError> {
    decode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stream_has_no_vertex_chunk() {
        let err = decode_bytes(&[]).unwrap_err();
        assert_eq!(err.reason, "no vertex chunk");
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn partial_tag_is_truncation() {
        let err = decode_bytes(b"VB").unwrap_err();
        assert!(err.reason.contains("truncated chunk tag"), "{}", err.reason);
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn unknown_tag_fails_at_its_offset() {
        let err = decode_bytes(b"XYZW").unwrap_err();
        assert!(err.reason.contains("unrecognized"), "{}", err.reason);
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn tag_without_payload_is_truncation() {
        let err = decode_bytes(&VERTEX_TAG).unwrap_err();
        assert!(err.reason.contains("truncated"), "{}", err.reason);
    }
}
