// Mesh buffers shared by the tree generator and the renderer.
//
//   generate_mesh() → RenderMesh { vertices, indices } → TreeRenderer::upload_mesh() → GPU

use glam::Vec3;

// ============================================================================
// GPU VERTEX
// ============================================================================

/// GPU-ready vertex with position, normal and color.
/// Byte layout must match the vertex stage of tree.wgsl:
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
///   @location(2) color:    vec3<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
    pub color:    [f32; 3],
}

impl GpuVertex {
    pub fn new(position: Vec3, normal: Vec3, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal:   normal.to_array(),
            color:    color.to_array(),
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

// ============================================================================
// RENDER MESH
// ============================================================================

/// GPU-ready triangle list with flat per-face normals.
/// Append-only while a generation pass runs: every index refers to the absolute
/// vertex offset at the time it was pushed. No vertex welding.
/// Upload vertex_bytes() to a VERTEX buffer, index_bytes() to an INDEX buffer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderMesh {
    pub vertices: Vec<GpuVertex>,
    pub indices:  Vec<u32>,
}

impl RenderMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, indices: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            indices:  Vec::with_capacity(indices),
        }
    }

    /// Append a vertex and return its absolute index.
    /// Indices are u32, so a mesh holds at most `u32::MAX + 1` vertices.
    pub fn push_vertex(&mut self, vertex: GpuVertex) -> u32 {
        let idx = vertex_index(self.vertices.len());
        self.vertices.push(vertex);
        idx
    }

    /// Append one triangle by absolute vertex indices.
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        debug_assert!(
            (a.max(b).max(c) as usize) < self.vertices.len(),
            "Triangle references a vertex that has not been pushed yet"
        );
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Cast vertex slice to raw bytes for wgpu buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Cast index slice to raw bytes for wgpu buffer upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn vertex_count(&self) -> usize   { self.vertices.len() }
    pub fn index_count(&self) -> usize    { self.indices.len() }
    pub fn triangle_count(&self) -> usize { self.indices.len() / 3 }
}

/// Index of the vertex stored at `offset`. Past the u32 range this saturates in
/// release builds; the renderer's buffer limit rejects such meshes long before.
fn vertex_index(offset: usize) -> u32 {
    let idx = u32::try_from(offset);
    debug_assert!(idx.is_ok(), "Vertex offset {offset} does not fit a u32 index");
    idx.unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<GpuVertex>(), 36);
        assert_eq!(std::mem::offset_of!(GpuVertex, normal), 12);
        assert_eq!(std::mem::offset_of!(GpuVertex, color), 24);

        let layout = GpuVertex::desc();
        assert_eq!(layout.array_stride, 36);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
    }

    #[test]
    fn push_returns_absolute_offsets() {
        let mut mesh = RenderMesh::new();
        let v = GpuVertex::new(Vec3::ZERO, Vec3::Y, Vec3::ONE);
        assert_eq!(mesh.push_vertex(v), 0);
        assert_eq!(mesh.push_vertex(v), 1);
        assert_eq!(mesh.push_vertex(v), 2);
        mesh.push_triangle(0, 1, 2);

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertex_bytes().len(), 3 * 36);
        assert_eq!(mesh.index_bytes().len(), 3 * 4);
    }

    #[test]
    fn last_u32_offset_is_a_valid_index() {
        assert_eq!(vertex_index(0), 0);
        assert_eq!(vertex_index(u32::MAX as usize), u32::MAX);
    }

    #[test]
    #[cfg(all(debug_assertions, target_pointer_width = "64"))]
    #[should_panic(expected = "does not fit a u32 index")]
    fn offset_past_u32_range_is_caught() {
        vertex_index(u32::MAX as usize + 1);
    }
}
