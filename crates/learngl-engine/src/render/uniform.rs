//! Uniform block reflection and CPU-side shadow storage.
//!
//! A program exposes at most one uniform block, bound at `@group(0) @binding(0)`.
//! Its members are addressed by name, the way `glGetUniformLocation` addresses
//! uniforms in a linked GL program.

use naga::{AddressSpace, ResourceBinding, TypeInner};

/// Bind group index of the program uniform block.
pub const UNIFORM_GROUP: u32 = 0;

/// Binding index of the program uniform block.
pub const UNIFORM_BINDING: u32 = 0;

/// Uniform buffers are sized in multiples of this many bytes.
const UNIFORM_SIZE_ALIGNMENT: u32 = 16;

/// Scalar kind of a uniform member, as far as setters are concerned.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformKind {
    F32,
    /// Vectors, matrices, integers... readable by shaders, not settable by name.
    Other,
}

/// One named member of the uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub kind: UniformKind,
}

/// Reflected layout of a uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    size: u32,
}

impl UniformLayout {
    /// Extracts the uniform block declared at `@group(0) @binding(0)`.
    ///
    /// A struct-typed block exposes its members; a bare `var<uniform> name: T`
    /// exposes a single field called `name`. Returns `None` when the module
    /// declares no uniform block at that binding.
    pub fn reflect(module: &naga::Module) -> Option<Self> {
        let expected = ResourceBinding {
            group: UNIFORM_GROUP,
            binding: UNIFORM_BINDING,
        };

        let (_, var) = module.global_variables.iter().find(|(_, var)| {
            var.space == AddressSpace::Uniform && var.binding.as_ref() == Some(&expected)
        })?;

        let gctx = module.to_ctx();
        let ty = &module.types[var.ty];
        let size = ty.inner.size(gctx);

        let fields = match &ty.inner {
            TypeInner::Struct { members, .. } => members
                .iter()
                .filter_map(|m| {
                    let inner = &module.types[m.ty].inner;
                    Some(UniformField {
                        name: m.name.clone()?,
                        offset: m.offset,
                        size: inner.size(gctx),
                        kind: kind_of(inner),
                    })
                })
                .collect(),
            other => var
                .name
                .iter()
                .map(|name| UniformField {
                    name: name.clone(),
                    offset: 0,
                    size,
                    kind: kind_of(other),
                })
                .collect(),
        };

        Some(Self { fields, size })
    }

    /// Size of the block as declared by the shader.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Size of the backing buffer, rounded up to a 16-byte multiple.
    pub fn buffer_size(&self) -> u32 {
        self.size
            .max(1)
            .div_ceil(UNIFORM_SIZE_ALIGNMENT)
            * UNIFORM_SIZE_ALIGNMENT
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

fn kind_of(inner: &TypeInner) -> UniformKind {
    match inner {
        TypeInner::Scalar(naga::Scalar::F32) => UniformKind::F32,
        _ => UniformKind::Other,
    }
}

/// CPU shadow of a uniform block's bytes.
///
/// The program uploads the bytes written by each setter; the shadow keeps the
/// current value of every member so it can be inspected without a readback.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: UniformLayout,
    data: Vec<u8>,
}

impl UniformBlock {
    /// Zero-initialized block for `layout`.
    pub fn new(layout: UniformLayout) -> Self {
        let data = vec![0; layout.buffer_size() as usize];
        Self { layout, data }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Writes `value` into the `f32` member `name`.
    ///
    /// Returns the byte offset written, or `None` (leaving every byte unchanged)
    /// when no `f32` member of that name exists.
    pub fn set_float(&mut self, name: &str, value: f32) -> Option<u32> {
        let field = self
            .layout
            .field(name)
            .filter(|f| f.kind == UniformKind::F32)?;
        let start = field.offset as usize;
        let bytes = bytemuck::bytes_of(&value);
        self.data
            .get_mut(start..start + bytes.len())?
            .copy_from_slice(bytes);
        Some(field.offset)
    }

    /// Reads back the `f32` member `name`.
    pub fn get_float(&self, name: &str) -> Option<f32> {
        let field = self
            .layout
            .field(name)
            .filter(|f| f.kind == UniformKind::F32)?;
        let start = field.offset as usize;
        let bytes = self.data.get(start..start + std::mem::size_of::<f32>())?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_of(src: &str) -> Option<UniformLayout> {
        let module = naga::front::wgsl::parse_str(src).expect("test shader parses");
        UniformLayout::reflect(&module)
    }

    const TWO_FIELDS: &str = r#"
        struct Params {
            greenVal: f32,
            scale: f32,
            tint: vec4<f32>,
        };
        @group(0) @binding(0) var<uniform> params: Params;

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return params.tint * params.greenVal * params.scale;
        }
    "#;

    #[test]
    fn reflects_struct_members_with_offsets() {
        let layout = layout_of(TWO_FIELDS).unwrap();
        let names: Vec<_> = layout.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["greenVal", "scale", "tint"]);
        assert_eq!(layout.field("greenVal").unwrap().offset, 0);
        assert_eq!(layout.field("scale").unwrap().offset, 4);
        assert_eq!(layout.field("tint").unwrap().offset, 16);
        assert_eq!(layout.field("tint").unwrap().kind, UniformKind::Other);
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn bare_scalar_uniform_uses_variable_name() {
        let layout = layout_of(
            r#"
            @group(0) @binding(0) var<uniform> greenVal: f32;
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return vec4<f32>(0.0, greenVal, 0.0, 1.0);
            }
            "#,
        )
        .unwrap();
        assert_eq!(layout.fields().len(), 1);
        assert_eq!(layout.field("greenVal").unwrap().kind, UniformKind::F32);
        assert_eq!(layout.buffer_size(), 16);
    }

    #[test]
    fn no_uniform_block_reflects_none() {
        let layout = layout_of(
            r#"
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return vec4<f32>(1.0);
            }
            "#,
        );
        assert!(layout.is_none());
    }

    #[test]
    fn set_float_writes_only_the_named_member() {
        let mut block = UniformBlock::new(layout_of(TWO_FIELDS).unwrap());
        assert_eq!(block.set_float("scale", 2.0), Some(4));
        assert_eq!(block.set_float("greenVal", 0.75), Some(0));
        assert_eq!(block.get_float("greenVal"), Some(0.75));
        assert_eq!(block.get_float("scale"), Some(2.0));
    }

    #[test]
    fn unknown_name_is_a_no_op() {
        let mut block = UniformBlock::new(layout_of(TWO_FIELDS).unwrap());
        block.set_float("scale", 3.5);
        let before = block.bytes().to_vec();

        assert_eq!(block.set_float("doesNotExist", 1.0), None);
        assert_eq!(block.bytes(), before.as_slice());
        assert_eq!(block.get_float("scale"), Some(3.5));
    }

    #[test]
    fn non_float_member_is_not_settable() {
        let mut block = UniformBlock::new(layout_of(TWO_FIELDS).unwrap());
        let before = block.bytes().to_vec();
        assert_eq!(block.set_float("tint", 1.0), None);
        assert_eq!(block.bytes(), before.as_slice());
    }
}
