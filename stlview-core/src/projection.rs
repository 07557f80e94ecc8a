/// Perspective camera and screen projection
use nalgebra::{Matrix4, Point3, Vector3};

use crate::transform::Transform;

/// Vertical field of view of the viewer camera, in degrees
pub const FIELD_OF_VIEW_DEGREES: f32 = 50.0;
pub const NEAR_PLANE: f32 = 1.0;
pub const FAR_PLANE: f32 = 1000.0;

/// Size of the container the render surface fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height; a collapsed container reports 1.0
    pub fn aspect(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// A point projected onto the render surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    /// Normalized device depth in `-1.0..=1.0`, smaller is closer
    pub depth: f32,
}

/// Perspective camera
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fov: FIELD_OF_VIEW_DEGREES.to_radians(),
            aspect: viewport.aspect(),
            near: NEAR_PLANE,
            far: FAR_PLANE,
        }
    }

    /// Keep the projection in step with a resized container
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.aspect = viewport.aspect();
    }

    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    /// Create the view matrix (camera transformation).
    ///
    /// Looking straight along `up` leaves the orientation undefined, so that
    /// case turns the camera about +Z instead.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let forward = self.target - self.position;
        let up = if forward.cross(&self.up).norm() <= 1e-4 * forward.norm() * self.up.norm() {
            Vector3::z()
        } else {
            self.up
        };
        Matrix4::look_at_rh(&self.position, &self.target, &up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    /// Project a model-space point to surface coordinates.
    ///
    /// Returns `None` for points behind the camera or outside the near/far
    /// range. Points beside the viewport are still returned so partially
    /// visible triangles can be clipped by the rasterizer.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
        viewport: Viewport,
    ) -> Option<ScreenPoint> {
        let mvp = Transform::mvp_matrix(model_matrix, &self.view_matrix(), &self.projection_matrix());
        let clip = mvp * point.to_homogeneous();

        if clip.w <= 1e-6 {
            return None;
        }

        let ndc = clip.xyz() / clip.w;
        if ndc.z < -1.0 || ndc.z > 1.0 {
            return None;
        }

        Some(ScreenPoint {
            x: (ndc.x + 1.0) * 0.5 * viewport.width as f32,
            y: (1.0 - ndc.y) * 0.5 * viewport.height as f32,
            depth: ndc.z,
        })
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Viewport::new(800, 600))
    }
}
