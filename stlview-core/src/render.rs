/// Render surface seam and the scene projection shared by all surfaces
use nalgebra::{Point3, Vector3};

use crate::config::Rgb;
use crate::error::RenderError;
use crate::projection::{Camera, ScreenPoint, Viewport};
use crate::scene::Scene;

/// The drawable target a session renders into
pub trait RenderSurface {
    /// Match the surface to a new container size
    fn resize(&mut self, viewport: Viewport);

    fn viewport(&self) -> Viewport;

    /// Draw one frame of `scene` as seen by `camera`
    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError>;
}

/// A mesh face in surface coordinates, ready to rasterize
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedTriangle {
    pub points: [ScreenPoint; 3],
    pub color: Rgb,
}

impl ProjectedTriangle {
    /// Mean depth, for painter's-algorithm sorting
    pub fn depth(&self) -> f32 {
        (self.points[0].depth + self.points[1].depth + self.points[2].depth) / 3.0
    }
}

/// Project the scene's mesh into surface space, sorted back to front.
///
/// Solid materials drop back-facing and clipped faces. Wireframes keep back faces.
pub fn project_scene(scene: &Scene, camera: &Camera, viewport: Viewport) -> Vec<ProjectedTriangle> {
    let Some(framed) = scene.mesh() else {
        return Vec::new();
    };

    let model = framed.model_matrix();
    let cull_back_faces = !framed.material.is_wireframe();
    let mut projected = Vec::with_capacity(framed.mesh.triangles.len());

    for triangle in &framed.mesh.triangles {
        let mut points = [ScreenPoint {
            x: 0.0,
            y: 0.0,
            depth: 0.0,
        }; 3];
        let mut visible = true;
        for (point, vertex) in points.iter_mut().zip(&triangle.vertices) {
            match camera.project_to_screen(&vertex.position, &model, viewport) {
                Some(p) => *point = p,
                None => {
                    visible = false;
                    break;
                }
            }
        }
        if !visible {
            continue;
        }

        // Surface y grows downwards, so front faces wind clockwise here
        let [a, b, c] = points;
        let signed_area = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
        if cull_back_faces && signed_area >= 0.0 {
            continue;
        }

        let normal = model.transform_vector(&triangle.calculate_normal());
        let [v0, v1, v2] = &triangle.vertices;
        let centroid = model.transform_point(&Point3::from(
            (v0.position.coords + v1.position.coords + v2.position.coords) / 3.0,
        ));
        let view_dir = (camera.position - centroid)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::z);
        let color = scene.lights.illuminate(&framed.material, &normal, &view_dir);

        projected.push(ProjectedTriangle { points, color });
    }

    projected.sort_by(|a, b| b.depth().total_cmp(&a.depth()));
    projected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MaterialMode, Rgb, ViewerConfig};
    use crate::controls::OrbitController;
    use crate::framing::frame;
    use crate::geometry::Mesh;

    fn framed_scene(mode: MaterialMode) -> (Scene, Camera) {
        let config = ViewerConfig {
            model_source: "cube.stl".to_string(),
            tint: Rgb::new(200, 100, 50),
            auto_rotate: false,
            material_mode: mode,
        };
        let mut camera = Camera::new(Viewport::new(80, 40));
        let mut scene = Scene::default();
        let (framed, _) = frame(Mesh::cube(40.0), &config, &mut camera, &mut OrbitController::new());
        scene.set_mesh(framed);
        (scene, camera)
    }

    #[test]
    fn test_empty_scene_projects_nothing() {
        assert!(project_scene(&Scene::default(), &Camera::default(), Viewport::new(10, 10)).is_empty());
    }

    #[test]
    fn test_solid_culls_back_faces() {
        let (scene, camera) = framed_scene(MaterialMode::Solid);
        let solid = project_scene(&scene, &camera, Viewport::new(80, 40));
        // From above and in front at most three cube sides face the camera
        assert!(!solid.is_empty());
        assert!(solid.len() <= 6);

        let (scene, camera) = framed_scene(MaterialMode::Wireframe);
        let wire = project_scene(&scene, &camera, Viewport::new(80, 40));
        assert_eq!(wire.len(), 12);
        assert!(wire.iter().all(|t| t.color == Rgb::new(200, 100, 50)));
    }

    #[test]
    fn test_sorted_back_to_front() {
        let (scene, camera) = framed_scene(MaterialMode::Wireframe);
        let wire = project_scene(&scene, &camera, Viewport::new(80, 40));
        assert!(wire.windows(2).all(|pair| pair[0].depth() >= pair[1].depth()));
    }
}
