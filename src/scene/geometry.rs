//! Shape data for drawables
//!
//! Geometry is plain vertex and index data. Fill passes draw it as a triangle
//! list; outline passes draw [`Geometry::wireframe`] as a line list over the
//! same vertices.

use std::collections::BTreeSet;

use bytemuck::{Pod, Zeroable};

/// Vertex shared by fill and outline passes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Normal vector (for lighting)
    pub normal: [f32; 3],
    /// Texture coordinates
    pub uv: [f32; 2],
}

impl Vertex {
    /// Size of vertex in bytes
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Vertex buffer layout for wgpu
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // normal
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // uv
                wgpu::VertexAttribute {
                    offset: 24,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// How the index list is meant to be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
}

/// Generated mesh data
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Geometry {
    /// Axis-aligned box centered on the origin, each face subdivided into a grid
    pub fn cuboid(width: f32, height: f32, depth: f32, segments: [u32; 3]) -> Self {
        let [ws, hs, ds] = segments.map(|s| s.max(1));
        let mut builder = BoxBuilder::default();

        // (u axis, v axis, w axis, u dir, v dir, face width, face height, face depth, grid x, grid y)
        builder.plane(2, 1, 0, -1.0, -1.0, depth, height, width, ds, hs); // +x
        builder.plane(2, 1, 0, 1.0, -1.0, depth, height, -width, ds, hs); // -x
        builder.plane(0, 2, 1, 1.0, 1.0, width, depth, height, ws, ds); // +y
        builder.plane(0, 2, 1, 1.0, -1.0, width, depth, -height, ws, ds); // -y
        builder.plane(0, 1, 2, 1.0, -1.0, width, height, depth, ws, hs); // +z
        builder.plane(0, 1, 2, -1.0, -1.0, width, height, -depth, ws, hs); // -z

        Self {
            vertices: builder.vertices,
            indices: builder.indices,
            topology: Topology::Triangles,
        }
    }

    /// Edge set of this triangle geometry as a line list over the same vertices
    ///
    /// Each undirected edge appears once, in ascending index order.
    pub fn wireframe(&self) -> Self {
        let indices = match self.topology {
            Topology::Lines => self.indices.clone(),
            Topology::Triangles => self
                .edges()
                .into_iter()
                .flat_map(|(a, b)| [a, b])
                .collect(),
        };

        Self {
            vertices: self.vertices.clone(),
            indices,
            topology: Topology::Lines,
        }
    }

    /// Unique undirected edges, smaller index first
    pub fn edges(&self) -> BTreeSet<(u32, u32)> {
        let mut edges = BTreeSet::new();
        match self.topology {
            Topology::Triangles => {
                for tri in self.indices.chunks_exact(3) {
                    for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                        edges.insert((a.min(b), a.max(b)));
                    }
                }
            }
            Topology::Lines => {
                for line in self.indices.chunks_exact(2) {
                    edges.insert((line[0].min(line[1]), line[0].max(line[1])));
                }
            }
        }
        edges
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get index count
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

#[derive(Default)]
struct BoxBuilder {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl BoxBuilder {
    #[allow(clippy::too_many_arguments)]
    fn plane(
        &mut self,
        u: usize,
        v: usize,
        w: usize,
        u_dir: f32,
        v_dir: f32,
        width: f32,
        height: f32,
        depth: f32,
        grid_x: u32,
        grid_y: u32,
    ) {
        let base = self.vertices.len() as u32;
        let segment_width = width / grid_x as f32;
        let segment_height = height / grid_y as f32;
        let half_width = width / 2.0;
        let half_height = height / 2.0;
        let half_depth = depth / 2.0;

        for iy in 0..=grid_y {
            let y = iy as f32 * segment_height - half_height;
            for ix in 0..=grid_x {
                let x = ix as f32 * segment_width - half_width;

                let mut position = [0.0; 3];
                position[u] = x * u_dir;
                position[v] = y * v_dir;
                position[w] = half_depth;

                let mut normal = [0.0; 3];
                normal[w] = if depth > 0.0 { 1.0 } else { -1.0 };

                self.vertices.push(Vertex {
                    position,
                    normal,
                    uv: [ix as f32 / grid_x as f32, 1.0 - iy as f32 / grid_y as f32],
                });
            }
        }

        let row = grid_x + 1;
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = base + ix + row * iy;
                let b = base + ix + row * (iy + 1);
                let c = base + (ix + 1) + row * (iy + 1);
                let d = base + (ix + 1) + row * iy;
                self.indices.extend_from_slice(&[a, b, d]);
                self.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_box_counts() {
        let geometry = Geometry::cuboid(1.0, 1.0, 1.0, [1, 1, 1]);
        assert_eq!(geometry.vertex_count(), 24); // 6 faces * 4 corners
        assert_eq!(geometry.index_count(), 36); // 6 faces * 2 triangles * 3
    }

    #[test]
    fn test_subdivided_box_counts() {
        let geometry = Geometry::cuboid(1.0, 1.0, 1.0, [2, 2, 2]);
        assert_eq!(geometry.vertex_count(), 54); // 6 faces * 3 * 3
        assert_eq!(geometry.index_count(), 144); // 6 faces * 8 triangles * 3
    }

    #[test]
    fn test_box_extents_and_normals() {
        let geometry = Geometry::cuboid(2.0, 4.0, 6.0, [1, 1, 1]);
        for vertex in &geometry.vertices {
            let [x, y, z] = vertex.position;
            assert!((x.abs() - 1.0).abs() < 1e-6);
            assert!((y.abs() - 2.0).abs() < 1e-6);
            assert!((z.abs() - 3.0).abs() < 1e-6);

            // Normal points out of the face the vertex belongs to
            let n = vertex.normal;
            let axis = n.iter().position(|c| *c != 0.0).unwrap();
            assert_eq!(n[axis].signum(), vertex.position[axis].signum());
        }
    }

    #[test]
    fn test_triangles_wind_outward() {
        let geometry = Geometry::cuboid(1.0, 1.0, 1.0, [1, 1, 1]);
        for tri in geometry.indices.chunks_exact(3) {
            let p = |i: u32| glam::Vec3::from_array(geometry.vertices[i as usize].position);
            let face_normal = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            let vertex_normal = glam::Vec3::from_array(geometry.vertices[tri[0] as usize].normal);
            assert!(face_normal.dot(vertex_normal) > 0.0);
        }
    }

    #[test]
    fn test_wireframe_is_exact_edge_set() {
        let fill = Geometry::cuboid(1.0, 1.0, 1.0, [2, 2, 2]);
        let outline = fill.wireframe();

        assert_eq!(outline.topology, Topology::Lines);
        assert_eq!(outline.vertices, fill.vertices);
        assert_eq!(outline.edges(), fill.edges());
        // No duplicate edges in the line list
        assert_eq!(outline.index_count(), fill.edges().len() * 2);
        // 3x3 grid per face: 6 horizontal + 6 vertical + 4 diagonals
        assert_eq!(fill.edges().len(), 6 * 16);
    }

    #[test]
    fn test_wireframe_of_lines_is_identity() {
        let outline = Geometry::cuboid(1.0, 1.0, 1.0, [1, 1, 1]).wireframe();
        assert_eq!(outline.wireframe(), outline);
    }
}
