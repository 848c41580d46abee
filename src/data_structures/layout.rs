//! Vertex layout descriptors.
//!
//! A [`VertexLayout`] is an ordered list of attributes, each with a semantic, a
//! component count, a component type and a normalization flag. The stride is the
//! sum of the attribute sizes, where attribute sizes follow the padded table of
//! the mesh format (three `Uint8` components still occupy four bytes).

/// Vertex attribute semantic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attrib {
    Position,
    Normal,
    Tangent,
    Bitangent,
    Color0,
    Color1,
    Indices,
    Weight,
    /// Texture coordinate set `0..=7`.
    TexCoord(u8),
}

impl Attrib {
    /// Decodes the on-disk attribute id.
    pub fn from_id(id: u16) -> Option<Self> {
        Some(match id {
            0x0001 => Attrib::Position,
            0x0002 => Attrib::Normal,
            0x0003 => Attrib::Tangent,
            0x0004 => Attrib::Bitangent,
            0x0005 => Attrib::Color0,
            0x0006 => Attrib::Color1,
            0x000e => Attrib::Indices,
            0x000f => Attrib::Weight,
            0x0010..=0x0017 => Attrib::TexCoord((id - 0x0010) as u8),
            _ => return None,
        })
    }

    pub fn id(self) -> u16 {
        match self {
            Attrib::Position => 0x0001,
            Attrib::Normal => 0x0002,
            Attrib::Tangent => 0x0003,
            Attrib::Bitangent => 0x0004,
            Attrib::Color0 => 0x0005,
            Attrib::Color1 => 0x0006,
            Attrib::Indices => 0x000e,
            Attrib::Weight => 0x000f,
            Attrib::TexCoord(set) => {
                debug_assert!(set <= 7, "texture coordinate set {set} out of range");
                0x0010 + u16::from(set)
            }
        }
    }
}

/// Component type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttribType {
    Uint8,
    Int16,
    Half,
    Float,
}

impl AttribType {
    pub fn from_id(id: u16) -> Option<Self> {
        Some(match id {
            0x0001 => AttribType::Uint8,
            0x0002 => AttribType::Int16,
            0x0003 => AttribType::Half,
            0x0004 => AttribType::Float,
            _ => return None,
        })
    }

    pub fn id(self) -> u16 {
        match self {
            AttribType::Uint8 => 0x0001,
            AttribType::Int16 => 0x0002,
            AttribType::Half => 0x0003,
            AttribType::Float => 0x0004,
        }
    }

    /// Byte size of an attribute with `num` components, `None` outside `1..=4`.
    pub fn size(self, num: u8) -> Option<u16> {
        const SIZES: [[u16; 4]; 4] = [
            [1, 2, 4, 4],
            [2, 4, 6, 8],
            [2, 4, 6, 8],
            [4, 8, 12, 16],
        ];
        if !(1..=4).contains(&num) {
            return None;
        }
        let row = match self {
            AttribType::Uint8 => 0,
            AttribType::Int16 => 1,
            AttribType::Half => 2,
            AttribType::Float => 3,
        };
        Some(SIZES[row][usize::from(num - 1)])
    }
}

/// One attribute inside a [`VertexLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub attrib: Attrib,
    pub num: u8,
    pub ty: AttribType,
    pub normalized: bool,
    pub as_int: bool,
    /// Byte offset inside a vertex.
    pub offset: u16,
}

impl VertexAttribute {
    pub fn size(&self) -> u16 {
        self.ty.size(self.num).unwrap_or(0)
    }
}

/// Ordered attribute list plus its byte stride.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
    stride: u16,
}

impl VertexLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute at the current end of the vertex.
    ///
    /// `num` must be in `1..=4` and texture coordinate sets in `0..=7`.
    pub fn add(
        mut self,
        attrib: Attrib,
        num: u8,
        ty: AttribType,
        normalized: bool,
        as_int: bool,
    ) -> Self {
        debug_assert!((1..=4).contains(&num), "{attrib:?} has {num} components");
        debug_assert!(
            !matches!(attrib, Attrib::TexCoord(set) if set > 7),
            "{attrib:?} is not a valid texture coordinate set"
        );
        let attribute = VertexAttribute {
            attrib,
            num,
            ty,
            normalized,
            as_int,
            offset: self.stride,
        };
        self.stride += attribute.size();
        self.attributes.push(attribute);
        self
    }

    /// Builds a layout from decoded attributes and checks the stored stride.
    pub(crate) fn from_parts(
        attributes: Vec<VertexAttribute>,
        stride: u16,
    ) -> Result<Self, String> {
        let mut computed: u16 = 0;
        for attribute in &attributes {
            let size = attribute.ty.size(attribute.num).ok_or_else(|| {
                format!("{:?} has {} components", attribute.attrib, attribute.num)
            })?;
            computed = computed
                .checked_add(size)
                .ok_or_else(|| "vertex stride overflows u16".to_string())?;
        }
        if computed != stride {
            return Err(format!(
                "vertex layout stride {stride} does not match attribute sizes ({computed})"
            ));
        }
        Ok(Self { attributes, stride })
    }

    pub fn stride(&self) -> u16 {
        self.stride
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn has(&self, attrib: Attrib) -> bool {
        self.attributes.iter().any(|a| a.attrib == attrib)
    }

    /// `wgpu` attribute list, shader locations assigned in declaration order.
    ///
    /// Attributes without a matching `wgpu::VertexFormat` are skipped.
    pub fn wgpu_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        self.attributes
            .iter()
            .enumerate()
            .filter_map(|(location, attribute)| {
                let format = wgpu_format(attribute)?;
                Some(wgpu::VertexAttribute {
                    format,
                    offset: wgpu::BufferAddress::from(attribute.offset),
                    shader_location: location as u32,
                })
            })
            .collect()
    }
}

fn wgpu_format(attribute: &VertexAttribute) -> Option<wgpu::VertexFormat> {
    use wgpu::VertexFormat as F;
    Some(match (attribute.ty, attribute.num, attribute.normalized) {
        (AttribType::Uint8, 2, false) => F::Uint8x2,
        (AttribType::Uint8, 3 | 4, false) => F::Uint8x4,
        (AttribType::Uint8, 2, true) => F::Unorm8x2,
        (AttribType::Uint8, 3 | 4, true) => F::Unorm8x4,
        (AttribType::Int16, 2, false) => F::Sint16x2,
        (AttribType::Int16, 4, false) => F::Sint16x4,
        (AttribType::Int16, 2, true) => F::Snorm16x2,
        (AttribType::Int16, 4, true) => F::Snorm16x4,
        (AttribType::Half, 2, _) => F::Float16x2,
        (AttribType::Half, 4, _) => F::Float16x4,
        (AttribType::Float, 1, _) => F::Float32,
        (AttribType::Float, 2, _) => F::Float32x2,
        (AttribType::Float, 3, _) => F::Float32x3,
        (AttribType::Float, 4, _) => F::Float32x4,
        _ => return None,
    })
}
