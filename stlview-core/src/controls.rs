/// Orbit interaction controller
use std::f32::consts::{PI, TAU};

use nalgebra::{Point3, Vector3};

use crate::projection::Camera;

/// Keeps the polar angle off the poles so `look_at` stays well defined
const POLAR_EPSILON: f32 = 1e-6;

/// Orbits the camera around a target on a sphere.
///
/// User input accumulates as pending deltas that the next [`OrbitController::update`]
/// applies; auto-rotation adds a fixed azimuth step on every update.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitController {
    pub target: Point3<f32>,
    pub enable_zoom: bool,
    pub auto_rotate: bool,
    /// One full orbit takes `60 / speed` seconds at 60 updates per second
    pub auto_rotate_speed: f32,
    pending_azimuth: f32,
    pending_polar: f32,
    pending_scale: f32,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new()
    }
}

impl OrbitController {
    pub fn new() -> Self {
        Self {
            target: Point3::origin(),
            enable_zoom: true,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            pending_azimuth: 0.0,
            pending_polar: 0.0,
            pending_scale: 1.0,
        }
    }

    /// Azimuth step applied per update while auto-rotating
    pub fn auto_rotation_angle(&self) -> f32 {
        TAU / 60.0 / 60.0 * self.auto_rotate_speed
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.pending_azimuth -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.pending_polar -= angle;
    }

    /// Move closer by `scale` (> 1.0 zooms in)
    pub fn dolly_in(&mut self, scale: f32) {
        if self.enable_zoom && scale > 0.0 {
            self.pending_scale /= scale;
        }
    }

    /// Move away by `scale` (> 1.0 zooms out)
    pub fn dolly_out(&mut self, scale: f32) {
        if self.enable_zoom && scale > 0.0 {
            self.pending_scale *= scale;
        }
    }

    /// Apply pending input and auto-rotation to the camera. Returns whether it moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        if self.auto_rotate {
            self.rotate_left(self.auto_rotation_angle());
        }

        let offset = camera.position - self.target;
        let radius = offset.norm();
        let changed = self.pending_azimuth != 0.0 || self.pending_polar != 0.0 || self.pending_scale != 1.0;

        if changed && radius > 0.0 {
            let theta = offset.x.atan2(offset.z) + self.pending_azimuth;
            let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() + self.pending_polar)
                .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
            let radius = radius * self.pending_scale;

            let offset = Vector3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
            camera.position = self.target + offset;
        }
        camera.look_at(self.target);

        self.pending_azimuth = 0.0;
        self.pending_polar = 0.0;
        self.pending_scale = 1.0;
        changed
    }
}
