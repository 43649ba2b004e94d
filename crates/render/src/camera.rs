use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Mat4, Vec3, Vec4};
use rally_common::spherical::{normalize_phi, normalize_theta};
use rally_common::Spherical;

pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 500.0;

/// Relaxation rate of the orbit eye towards its home.
const EYE_RELAX_RATE: f32 = 5.0;
/// Relaxation rate of the first-person look target towards its home.
const TARGET_RELAX_RATE: f32 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    /// Orbit around the followed vehicle.
    ThirdPerson,
    /// Eye fixed in the cockpit, look target orbiting in the vehicle frame.
    FirstPerson,
}

/// Orbit / cockpit camera expressed in spherical coordinates in the frame of
/// the followed vehicle.
///
/// Setters validate and mark the view dirty when a value actually changes;
/// matrices are only rebuilt by [`Camera::recompute_if_dirty`].
#[derive(Debug, Clone)]
pub struct Camera {
    mode: CameraMode,
    eye: Spherical,
    eye_home: Spherical,
    eye_default: Spherical,
    target: Spherical,
    target_home: Spherical,
    target_default: Spherical,
    orbit_saved: Option<(Spherical, Spherical)>,
    fov: f32,
    follow_translation: Vec3,
    follow_facing: f32,
    viewport: Option<(u32, u32)>,
    camera_matrix: Mat4,
    view: Mat4,
    projection: Mat4,
    dirty: bool,
    recomputes: u64,
}

impl Camera {
    /// Third-person camera at `eye`, looking forward by default. `fov` is the
    /// vertical field of view in radians.
    pub fn new(eye: Spherical, fov: f32) -> Self {
        let target = default_target();
        Self {
            mode: CameraMode::ThirdPerson,
            eye,
            eye_home: eye,
            eye_default: eye,
            target,
            target_home: target,
            target_default: target,
            orbit_saved: None,
            fov,
            follow_translation: Vec3::ZERO,
            follow_facing: 0.0,
            viewport: None,
            camera_matrix: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            dirty: true,
            recomputes: 0,
        }
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn is_first_person(&self) -> bool {
        self.mode == CameraMode::FirstPerson
    }

    pub fn eye(&self) -> Spherical {
        self.eye
    }

    pub fn eye_home(&self) -> Spherical {
        self.eye_home
    }

    pub fn target(&self) -> Spherical {
        self.target
    }

    pub fn target_home(&self) -> Spherical {
        self.target_home
    }

    /// Eye position in the vehicle frame.
    pub fn eye_local(&self) -> Vec3 {
        self.eye.to_cartesian()
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// How many times the view matrices have been rebuilt.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    pub fn set_eye_d(&mut self, d: f32) -> bool {
        if d <= 0.0 || !d.is_finite() {
            return false;
        }
        self.dirty |= self.eye.d != d;
        self.eye.d = d;
        true
    }

    pub fn set_eye_theta(&mut self, theta: f32) -> bool {
        if !theta.is_finite() {
            return false;
        }
        let theta = normalize_theta(theta);
        self.dirty |= self.eye.theta != theta;
        self.eye.theta = theta;
        true
    }

    /// In third person the eye must stay above the ground plane.
    pub fn set_eye_phi(&mut self, phi: f32) -> bool {
        if !phi.is_finite() || (self.mode == CameraMode::ThirdPerson && phi >= FRAC_PI_2) {
            return false;
        }
        let phi = normalize_phi(phi);
        self.dirty |= self.eye.phi != phi;
        self.eye.phi = phi;
        true
    }

    pub fn set_target_d(&mut self, d: f32) -> bool {
        if d <= 0.0 || !d.is_finite() {
            return false;
        }
        self.dirty |= self.target.d != d;
        self.target.d = d;
        true
    }

    pub fn set_target_theta(&mut self, theta: f32) -> bool {
        if !theta.is_finite() {
            return false;
        }
        let theta = normalize_theta(theta);
        self.dirty |= self.target.theta != theta;
        self.target.theta = theta;
        true
    }

    pub fn set_target_phi(&mut self, phi: f32) -> bool {
        if !(phi > 0.0 && phi < PI) {
            return false;
        }
        let phi = normalize_phi(phi);
        self.dirty |= self.target.phi != phi;
        self.target.phi = phi;
        true
    }

    /// Place the camera frame on the followed vehicle. `facing` is degrees.
    pub fn set_follow(&mut self, translation: Vec3, facing: f32) {
        if translation != self.follow_translation || facing != self.follow_facing {
            self.follow_translation = translation;
            self.follow_facing = facing;
            self.dirty = true;
        }
    }

    /// Ease the orbit eye towards its home.
    pub fn update_camera_position(&mut self, delta: f32) {
        let k = relax_factor(delta, EYE_RELAX_RATE);
        if k == 0.0 {
            return;
        }
        let (eye, home) = (self.eye, self.eye_home);
        self.set_eye_d(eye.d + (home.d - eye.d) * k);
        self.set_eye_theta(eye.theta + angle_between(eye.theta, home.theta) * k);
        self.set_eye_phi(eye.phi + (home.phi - eye.phi) * k);
    }

    /// Ease the first-person look target towards its home.
    pub fn update_target_position(&mut self, delta: f32) {
        let k = relax_factor(delta, TARGET_RELAX_RATE);
        if k == 0.0 {
            return;
        }
        let (target, home) = (self.target, self.target_home);
        self.set_target_d(target.d + (home.d - target.d) * k);
        self.set_target_theta(target.theta + angle_between(target.theta, home.theta) * k);
        self.set_target_phi(target.phi + (home.phi - target.phi) * k);
    }

    pub fn lock_camera(&mut self) {
        self.eye_home = self.eye;
        if self.mode == CameraMode::FirstPerson {
            self.target_home = self.target;
        }
    }

    pub fn lock_distance(&mut self) {
        self.eye_home.d = self.eye.d;
    }

    /// Third person: back to the initial orbit. First person: look straight
    /// ahead from the cockpit again.
    pub fn reset_home(&mut self) {
        match self.mode {
            CameraMode::ThirdPerson => {
                self.eye = self.eye_default;
                self.eye_home = self.eye_default;
            }
            CameraMode::FirstPerson => {
                self.target = self.target_default;
                self.target_home = self.target_default;
            }
        }
        self.dirty = true;
    }

    /// Move the eye into the cockpit. The orbit pose is kept for the return
    /// to third person.
    pub fn enter_first_person(&mut self, anchor: Spherical, look: Spherical) {
        if self.mode == CameraMode::ThirdPerson {
            self.orbit_saved = Some((self.eye, self.eye_home));
        }
        self.mode = CameraMode::FirstPerson;
        self.eye = anchor;
        self.eye_home = anchor;
        self.target = look;
        self.target_home = look;
        self.target_default = look;
        self.dirty = true;
        tracing::debug!("camera: first person");
    }

    pub fn enter_third_person(&mut self) {
        if self.mode == CameraMode::ThirdPerson {
            return;
        }
        let (eye, home) = self
            .orbit_saved
            .take()
            .unwrap_or((self.eye_default, self.eye_default));
        self.mode = CameraMode::ThirdPerson;
        self.eye = eye;
        self.eye_home = home;
        self.target = default_target();
        self.target_home = self.target;
        self.target_default = self.target;
        self.dirty = true;
        tracing::debug!("camera: third person");
    }

    /// Rebuild the camera and view matrices if anything changed since the
    /// last rebuild. Returns whether a rebuild happened.
    pub fn recompute_if_dirty(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        let eye = self.eye.to_cartesian();
        let look_at = match self.mode {
            CameraMode::ThirdPerson => Vec3::ZERO,
            CameraMode::FirstPerson => eye + self.target.to_cartesian(),
        };
        let follow = Mat4::from_translation(self.follow_translation)
            * Mat4::from_rotation_y(self.follow_facing.to_radians());
        self.camera_matrix = follow * Mat4::look_at_rh(eye, look_at, Vec3::Y).inverse();
        self.view = self.camera_matrix.inverse();
        self.dirty = false;
        self.recomputes += 1;
        true
    }

    /// Rebuild the projection for a new viewport. Same-size calls and empty
    /// viewports are ignored.
    pub fn update_perspective_matrix(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || self.viewport == Some((width, height)) {
            return false;
        }
        self.viewport = Some((width, height));
        self.projection =
            Mat4::perspective_rh(self.fov, width as f32 / height as f32, NEAR_PLANE, FAR_PLANE);
        true
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    pub fn camera_matrix(&self) -> Mat4 {
        self.camera_matrix
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// Eye position in world space, as of the last rebuild.
    pub fn eye_world(&self) -> Vec3 {
        self.camera_matrix.w_axis.truncate()
    }

    /// Inverse of projection times the rotation-only view, used to turn
    /// clip-space positions into sky directions.
    pub fn skybox_matrix(&self) -> Mat4 {
        let mut view = self.view;
        view.w_axis = Vec4::W;
        (self.projection * view).inverse()
    }
}

/// Look straight ahead along the vehicle's forward axis.
fn default_target() -> Spherical {
    Spherical::from_degrees(1.0, -90.0, 90.0)
}

fn relax_factor(delta: f32, rate: f32) -> f32 {
    if !delta.is_finite() || delta <= 0.0 {
        return 0.0;
    }
    (delta * rate).min(1.0)
}

/// Signed shortest rotation from `from` to `to`, in `(-π, π]`.
fn angle_between(from: f32, to: f32) -> f32 {
    let d = (to - from).rem_euclid(TAU);
    if d > PI { d - TAU } else { d }
}
