/// Scene graph: light rig, materials and the single framed mesh
use nalgebra::{Matrix4, Point3, Vector3};

use crate::config::{MaterialMode, Rgb};
use crate::geometry::Mesh;
use crate::transform::{RotationState, Transform};

pub const PHONG_SPECULAR: Rgb = Rgb::from_u32(0x000064);
pub const PHONG_SHININESS: f32 = 100.0;
pub const WIREFRAME_LINE_WIDTH: f32 = 40.0;

/// Surface appearance of the mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Lit surface with diffuse and specular terms
    Phong {
        color: Rgb,
        specular: Rgb,
        shininess: f32,
    },
    /// Unlit edges only. `line_width` is advisory, surfaces may draw hairlines.
    Wireframe { color: Rgb, line_width: f32 },
}

impl Material {
    pub fn for_mode(mode: MaterialMode, tint: Rgb) -> Self {
        match mode {
            MaterialMode::Solid => Material::Phong {
                color: tint,
                specular: PHONG_SPECULAR,
                shininess: PHONG_SHININESS,
            },
            MaterialMode::Wireframe => Material::Wireframe {
                color: tint,
                line_width: WIREFRAME_LINE_WIDTH,
            },
        }
    }

    pub fn color(&self) -> Rgb {
        match *self {
            Material::Phong { color, .. } | Material::Wireframe { color, .. } => color,
        }
    }

    pub fn is_wireframe(&self) -> bool {
        matches!(self, Material::Wireframe { .. })
    }
}

/// Sky/ground gradient light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereLight {
    pub sky: Rgb,
    pub ground: Rgb,
    pub intensity: f32,
}

/// Parallel light shining from `position` towards the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Rgb,
    pub intensity: f32,
    pub position: Point3<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightRig {
    pub hemisphere: HemisphereLight,
    pub directional: DirectionalLight,
}

impl Default for LightRig {
    fn default() -> Self {
        Self {
            hemisphere: HemisphereLight {
                sky: Rgb::WHITE,
                ground: Rgb::from_u32(0x222222),
                intensity: 1.5,
            },
            directional: DirectionalLight {
                color: Rgb::WHITE,
                intensity: 1.5,
                position: Point3::new(-1.0, 0.0, -1.0),
            },
        }
    }
}

impl LightRig {
    /// Color of a surface with world-space `normal` seen along `view_dir`
    /// (unit vector from the surface towards the eye).
    pub fn illuminate(&self, material: &Material, normal: &Vector3<f32>, view_dir: &Vector3<f32>) -> Rgb {
        let (color, specular, shininess) = match *material {
            Material::Wireframe { color, .. } => return color,
            Material::Phong {
                color,
                specular,
                shininess,
            } => (color, specular, shininess),
        };

        let hemi = self.hemisphere;
        let weight = 0.5 * normal.y + 0.5;
        let ambient = hemi.ground.to_channels().lerp(&hemi.sky.to_channels(), weight) * hemi.intensity;

        let dir = self.directional;
        let to_light = dir.position.coords.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::y);
        let lambert = normal.dot(&to_light).max(0.0);
        let diffuse = dir.color.to_channels() * (lambert * dir.intensity);

        let half = (to_light + view_dir).try_normalize(f32::EPSILON).unwrap_or(to_light);
        let highlight = if lambert > 0.0 {
            normal.dot(&half).max(0.0).powf(shininess) * dir.intensity
        } else {
            0.0
        };

        let lit = color
            .to_channels()
            .component_mul(&((ambient + diffuse) / std::f32::consts::PI))
            + specular.to_channels() * highlight;
        Rgb::from_channels(lit)
    }
}

/// The loaded mesh after recentering, with its material and display rotation
#[derive(Debug, Clone, PartialEq)]
pub struct FramedMesh {
    pub mesh: Mesh,
    pub material: Material,
    pub rotation: RotationState,
}

impl FramedMesh {
    pub fn model_matrix(&self) -> Matrix4<f32> {
        Transform::rotation_matrix(&self.rotation)
    }
}

/// Scene root: the light rig plus at most one renderable child
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub lights: LightRig,
    mesh: Option<FramedMesh>,
}

impl Scene {
    pub fn new(lights: LightRig) -> Self {
        Self { lights, mesh: None }
    }

    /// Install the renderable child, replacing any previous one
    pub fn set_mesh(&mut self, mesh: FramedMesh) {
        self.mesh = Some(mesh);
    }

    pub fn mesh(&self) -> Option<&FramedMesh> {
        self.mesh.as_ref()
    }

    /// Number of renderable children, zero or one
    pub fn child_count(&self) -> usize {
        usize::from(self.mesh.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_selection_is_exclusive() {
        let tint = Rgb::new(0, 255, 0);
        let solid = Material::for_mode(MaterialMode::Solid, tint);
        let wire = Material::for_mode(MaterialMode::Wireframe, tint);

        assert!(!solid.is_wireframe());
        assert!(wire.is_wireframe());
        assert_eq!(solid.color(), tint);
        assert_eq!(wire.color(), tint);
        assert!(matches!(solid, Material::Phong { shininess, .. } if shininess == 100.0));
    }

    #[test]
    fn test_wireframe_is_unlit() {
        let rig = LightRig::default();
        let material = Material::for_mode(MaterialMode::Wireframe, Rgb::new(10, 20, 30));
        let color = rig.illuminate(&material, &Vector3::new(0.0, -1.0, 0.0), &Vector3::z());
        assert_eq!(color, Rgb::new(10, 20, 30));
    }

    #[test]
    fn test_upward_faces_are_brighter_than_downward() {
        let rig = LightRig::default();
        let material = Material::for_mode(MaterialMode::Solid, Rgb::new(0, 200, 0));
        let up = rig.illuminate(&material, &Vector3::y(), &Vector3::z());
        let down = rig.illuminate(&material, &-Vector3::y(), &Vector3::z());
        assert!(up.g > down.g);
        assert_eq!(up.r, 0);
    }

    #[test]
    fn test_scene_holds_single_child() {
        let mut scene = Scene::default();
        assert_eq!(scene.child_count(), 0);

        let framed = FramedMesh {
            mesh: Mesh::cube(1.0),
            material: Material::for_mode(MaterialMode::Solid, Rgb::WHITE),
            rotation: RotationState::zero(),
        };
        scene.set_mesh(framed.clone());
        scene.set_mesh(framed);
        assert_eq!(scene.child_count(), 1);
    }
}
