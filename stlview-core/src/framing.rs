/// Geometry framing: recenter the loaded mesh and place the camera around it
use std::f32::consts::FRAC_PI_2;

use nalgebra::{Point3, Vector3};

use crate::config::ViewerConfig;
use crate::controls::OrbitController;
use crate::geometry::{BoundingExtent, Mesh};
use crate::projection::Camera;
use crate::scene::{FramedMesh, Material};
use crate::transform::{RotationState, Transform};

/// Camera distance as a multiple of the largest dimension
pub const CAMERA_DISTANCE_FACTOR: f32 = 1.5;
/// Fixed camera height above the origin
pub const CAMERA_HEIGHT: f32 = 120.0;
/// Auto-rotation speed handed to the orbit controller
pub const AUTO_ROTATE_SPEED: f32 = 0.5;

/// What framing measured and where it put the camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    /// Applied to the geometry to bring the extent's center to the origin
    pub translation: Vector3<f32>,
    pub largest_dimension: f32,
    pub camera_distance: f32,
}

/// Largest coordinate of the extent's max corner.
///
/// This is measured from the raw, untranslated extent and is not the box size.
pub fn largest_dimension(extent: &BoundingExtent) -> f32 {
    extent.max.x.max(extent.max.y).max(extent.max.z)
}

/// Move the mesh so its bounding extent is centered on the origin.
///
/// Returns the raw extent and the applied translation, or `None` for an empty mesh.
pub fn recenter(mesh: &mut Mesh) -> Option<(BoundingExtent, Vector3<f32>)> {
    let extent = mesh.bounding_extent()?;
    let center = extent.center();
    mesh.apply_matrix(&Transform::recenter_matrix(&center));
    Some((extent, -center.coords))
}

/// Normalize `mesh` for display and aim `camera` at it.
///
/// Consumes the raw geometry and returns the scene child together with the
/// framing measurements. An empty mesh is framed as a point at the origin.
pub fn frame(
    mut mesh: Mesh,
    config: &ViewerConfig,
    camera: &mut Camera,
    controller: &mut OrbitController,
) -> (FramedMesh, Framing) {
    let (extent, translation) = recenter(&mut mesh).unwrap_or_else(|| {
        let origin = Point3::origin();
        (
            BoundingExtent {
                min: origin,
                max: origin,
            },
            Vector3::zeros(),
        )
    });

    let largest_dimension = largest_dimension(&extent);
    let camera_distance = largest_dimension * CAMERA_DISTANCE_FACTOR;
    camera.position = Point3::new(0.0, CAMERA_HEIGHT, camera_distance);
    camera.look_at(Point3::origin());

    controller.target = Point3::origin();
    if config.auto_rotate {
        controller.auto_rotate = true;
        controller.auto_rotate_speed = AUTO_ROTATE_SPEED;
    }

    let framed = FramedMesh {
        mesh,
        material: Material::for_mode(config.material_mode, config.tint),
        // STL assets are authored Z-up; the viewer displays Y-up
        rotation: RotationState::new(-FRAC_PI_2, 0.0, 0.0),
    };

    (
        framed,
        Framing {
            translation,
            largest_dimension,
            camera_distance,
        },
    )
}
