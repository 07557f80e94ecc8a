/// Geometry primitives for the loaded mesh
use nalgebra::{Matrix4, Point3, Vector3};

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Face normal from the winding of the vertices. Degenerate faces yield zero.
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1
            .cross(&edge2)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }
}

/// Axis-aligned box enclosing every vertex of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingExtent {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingExtent {
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

/// A triangle soup as decoded from an STL file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.triangles.iter().flat_map(|t| t.vertices.iter())
    }

    /// Bounding extent of all vertices, `None` for an empty mesh
    pub fn bounding_extent(&self) -> Option<BoundingExtent> {
        let mut vertices = self.vertices();
        let first = vertices.next()?.position;
        let extent = vertices.fold(
            BoundingExtent {
                min: first,
                max: first,
            },
            |extent, vertex| BoundingExtent {
                min: extent.min.inf(&vertex.position),
                max: extent.max.sup(&vertex.position),
            },
        );
        Some(extent)
    }

    /// Transform every vertex in place. Normals follow the linear part of the matrix.
    pub fn apply_matrix(&mut self, matrix: &Matrix4<f32>) {
        for triangle in &mut self.triangles {
            for vertex in &mut triangle.vertices {
                vertex.position = matrix.transform_point(&vertex.position);
                vertex.normal = matrix
                    .transform_vector(&vertex.normal)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or(vertex.normal);
            }
        }
    }

    /// Axis-aligned cube centered on the origin
    pub fn cube(size: f32) -> Self {
        Self::cuboid(Point3::new(-size / 2.0, -size / 2.0, -size / 2.0), Vector3::repeat(size))
    }

    /// Axis-aligned box with its minimum corner at `origin`
    pub fn cuboid(origin: Point3<f32>, size: Vector3<f32>) -> Self {
        let (x0, y0, z0) = (origin.x, origin.y, origin.z);
        let (x1, y1, z1) = (x0 + size.x, y0 + size.y, z0 + size.z);
        let mut mesh = Self::with_capacity(12);

        let mut quad = |corners: [(f32, f32, f32); 4], normal: (f32, f32, f32)| {
            let v = corners.map(|(x, y, z)| Vertex::new(x, y, z, normal.0, normal.1, normal.2));
            mesh.add_triangle(Triangle::new(v[0], v[1], v[2]));
            mesh.add_triangle(Triangle::new(v[0], v[2], v[3]));
        };

        // Front, back, top, bottom, right, left; counter-clockwise seen from outside
        quad([(x0, y0, z1), (x1, y0, z1), (x1, y1, z1), (x0, y1, z1)], (0.0, 0.0, 1.0));
        quad([(x0, y0, z0), (x0, y1, z0), (x1, y1, z0), (x1, y0, z0)], (0.0, 0.0, -1.0));
        quad([(x0, y1, z0), (x0, y1, z1), (x1, y1, z1), (x1, y1, z0)], (0.0, 1.0, 0.0));
        quad([(x0, y0, z0), (x1, y0, z0), (x1, y0, z1), (x0, y0, z1)], (0.0, -1.0, 0.0));
        quad([(x1, y0, z0), (x1, y1, z0), (x1, y1, z1), (x1, y0, z1)], (1.0, 0.0, 0.0));
        quad([(x0, y0, z0), (x0, y0, z1), (x0, y1, z1), (x0, y1, z0)], (-1.0, 0.0, 0.0));

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_mesh_has_no_extent() {
        assert!(Mesh::new().bounding_extent().is_none());
    }

    #[test]
    fn test_cuboid_extent() {
        let mesh = Mesh::cuboid(Point3::new(10.0, 0.0, -4.0), Vector3::new(2.0, 6.0, 4.0));
        assert_eq!(mesh.triangles.len(), 12);

        let extent = mesh.bounding_extent().unwrap();
        assert_relative_eq!(extent.min, Point3::new(10.0, 0.0, -4.0));
        assert_relative_eq!(extent.max, Point3::new(12.0, 6.0, 0.0));
        assert_relative_eq!(extent.center(), Point3::new(11.0, 3.0, -2.0));
        assert_relative_eq!(extent.size(), Vector3::new(2.0, 6.0, 4.0));
    }

    #[test]
    fn test_cube_normals_point_outward() {
        let mesh = Mesh::cube(2.0);
        for triangle in &mesh.triangles {
            let centroid = triangle
                .vertices
                .iter()
                .fold(Vector3::zeros(), |acc, v| acc + v.position.coords)
                / 3.0;
            let normal = triangle.calculate_normal();
            assert!(normal.dot(&centroid) > 0.0);
            assert_relative_eq!(normal, triangle.vertices[0].normal);
        }
    }

    #[test]
    fn test_apply_translation() {
        let mut mesh = Mesh::cube(2.0);
        mesh.apply_matrix(&Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0)));
        let extent = mesh.bounding_extent().unwrap();
        assert_relative_eq!(extent.center(), Point3::new(1.0, 2.0, 3.0));
        // Translation leaves normals alone
        assert_relative_eq!(mesh.triangles[0].vertices[0].normal, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_degenerate_triangle_normal_is_zero() {
        let v = Vertex::new(1.0, 1.0, 1.0, 0.0, 0.0, 0.0);
        let triangle = Triangle::new(v, v, v);
        assert_eq!(triangle.calculate_normal(), Vector3::zeros());
    }
}
