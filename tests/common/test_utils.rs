use shadow_ngin::{
    data_structures::layout::{Attrib, AttribType, VertexLayout},
    logging::{LoggingConfig, init_logging},
    resources::mesh::{INDEX_TAG, PRIMITIVE_TAG, VERTEX_TAG},
};

pub fn init_test_logging() {
    init_logging(LoggingConfig {
        env_filter: Some("shadow_ngin=debug".to_string()),
        is_test: true,
        ..Default::default()
    });
}

/// Position (3 floats) and a packed color, 16 bytes per vertex.
pub fn layout16() -> VertexLayout {
    VertexLayout::new()
        .add(Attrib::Position, 3, AttribType::Float, false, false)
        .add(Attrib::Color0, 4, AttribType::Uint8, true, false)
}

/// `count` vertices of `stride` bytes with distinguishable contents.
pub fn vertex_bytes(count: usize, stride: usize) -> Vec<u8> {
    (0..count * stride).map(|i| i as u8).collect()
}

/// Writes mesh streams chunk by chunk.
#[derive(Debug, Default, Clone)]
pub struct MeshStream {
    bytes: Vec<u8>,
}

impl MeshStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    fn u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn f32s(&mut self, values: &[f32]) {
        for v in values {
            self.bytes.extend_from_slice(&v.to_le_bytes());
        }
    }

    fn string(&mut self, s: &str) {
        self.u16(s.len() as u16);
        self.bytes.extend_from_slice(s.as_bytes());
    }

    /// Unit sphere, `[-1, 1]` box and identity oriented box.
    fn bounds(&mut self) {
        self.f32s(&[0.0, 0.0, 0.0, 1.0]);
        self.f32s(&[-1.0, -1.0, -1.0, 1.0, 1.0, 1.0]);
        self.f32s(&[
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
    }

    fn layout(&mut self, layout: &VertexLayout, stride: u16) {
        self.u8(layout.attributes().len() as u8);
        self.u16(stride);
        for attribute in layout.attributes() {
            self.u16(attribute.offset);
            self.u16(attribute.attrib.id());
            self.u8(attribute.num);
            self.u16(attribute.ty.id());
            self.u8(attribute.normalized as u8);
            self.u8(attribute.as_int as u8);
        }
    }

    pub fn vertex_chunk(self, layout: &VertexLayout, vertices: &[u8]) -> Self {
        let count = (vertices.len() / usize::from(layout.stride())) as u16;
        self.vertex_chunk_raw(layout, layout.stride(), count, vertices)
    }

    /// Vertex chunk with a caller-chosen stored stride and vertex count.
    pub fn vertex_chunk_raw(
        mut self,
        layout: &VertexLayout,
        stride: u16,
        count: u16,
        payload: &[u8],
    ) -> Self {
        self.bytes.extend_from_slice(&VERTEX_TAG);
        self.bounds();
        self.layout(layout, stride);
        self.u16(count);
        self.bytes.extend_from_slice(payload);
        self
    }

    pub fn index_chunk(mut self, indices: &[u16]) -> Self {
        self.bytes.extend_from_slice(&INDEX_TAG);
        self.u32(indices.len() as u32);
        for i in indices {
            self.u16(*i);
        }
        self
    }

    /// Primitive chunk; each primitive is a name and
    /// `[start_index, num_indices, start_vertex, num_vertices]`.
    pub fn primitive_chunk(mut self, material: &str, primitives: &[(&str, [u32; 4])]) -> Self {
        self.bytes.extend_from_slice(&PRIMITIVE_TAG);
        self.string(material);
        self.u16(primitives.len() as u16);
        for (name, range) in primitives {
            self.string(name);
            for v in range {
                self.u32(*v);
            }
            self.bounds();
        }
        self
    }
}

/// Reader handing out at most one byte per `read` call.
pub struct TrickleReader<'a> {
    bytes: &'a [u8],
}

impl<'a> TrickleReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl std::io::Read for TrickleReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match (self.bytes.split_first(), buf.first_mut()) {
            (Some((first, rest)), Some(slot)) => {
                *slot = *first;
                self.bytes = rest;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}
