use bytemuck::{Pod, Zeroable};
use naga::{Scalar, TypeInner, VectorSize};
use wgpu::util::DeviceExt;

/// Interleaved vertex: position followed by color.
///
/// Layout (stride 24):
/// - location 0: `position`, 3 x f32 at offset 0
/// - location 1: `color`, 3 x f32 at offset 12
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3  // color
    ];

    pub const STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;

    #[inline]
    pub const fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, color }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Shader-side type a vertex attribute format is read as.
///
/// Only float formats are mapped; anything else is rejected at link time.
pub(crate) fn attribute_shader_type(format: wgpu::VertexFormat) -> Option<TypeInner> {
    let vector = |size| TypeInner::Vector {
        size,
        scalar: Scalar::F32,
    };
    match format {
        wgpu::VertexFormat::Float32 => Some(TypeInner::Scalar(Scalar::F32)),
        wgpu::VertexFormat::Float32x2 => Some(vector(VectorSize::Bi)),
        wgpu::VertexFormat::Float32x3 => Some(vector(VectorSize::Tri)),
        wgpu::VertexFormat::Float32x4 => Some(vector(VectorSize::Quad)),
        _ => None,
    }
}

/// Device-resident vertex sequence, read with [`Vertex::layout`].
///
/// Created once and never mutated. The buffer is released when this value is
/// dropped.
pub struct GeometryBuffer {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

impl GeometryBuffer {
    /// Uploads `vertices` into a new vertex buffer.
    pub fn upload(device: &wgpu::Device, label: &str, vertices: &[Vertex]) -> Self {
        let contents: &[u8] = bytemuck::cast_slice(vertices);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::VERTEX,
        });

        log::debug!(
            "uploaded geometry `{label}`: {} vertices, {} bytes",
            vertices.len(),
            contents.len()
        );

        Self {
            buffer,
            vertex_count: vertices.len() as u32,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_24_bytes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
        assert_eq!(Vertex::STRIDE, 24);
    }

    #[test]
    fn attributes_match_interleaved_layout() {
        let [pos, color] = Vertex::ATTRIBUTES;
        assert_eq!((pos.shader_location, pos.offset), (0, 0));
        assert_eq!((color.shader_location, color.offset), (1, 12));
        assert_eq!(pos.format, wgpu::VertexFormat::Float32x3);
        assert_eq!(color.format, wgpu::VertexFormat::Float32x3);

        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 24);
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Vertex);
    }

    #[test]
    fn byte_size_is_float_count_times_four() {
        let tri = [
            Vertex::new([0.5, 0.5, 0.0], [1.0, 0.0, 0.0]),
            Vertex::new([0.5, -0.5, 0.0], [0.0, 1.0, 0.0]),
            Vertex::new([-0.5, 0.5, 0.0], [0.0, 0.0, 1.0]),
        ];
        let floats: &[f32] = bytemuck::cast_slice(&tri);
        let bytes: &[u8] = bytemuck::cast_slice(&tri);
        assert_eq!(floats.len(), 18);
        assert_eq!(bytes.len(), floats.len() * 4);
        assert_eq!(&floats[6..12], &[0.5, -0.5, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn float3_attribute_reads_as_vec3() {
        assert_eq!(
            attribute_shader_type(wgpu::VertexFormat::Float32x3),
            Some(TypeInner::Vector {
                size: VectorSize::Tri,
                scalar: Scalar::F32
            })
        );
        assert_eq!(attribute_shader_type(wgpu::VertexFormat::Uint32), None);
    }
}
