use glam::{Mat4, Vec3};
use rally_common::spherical::{deg_to_rad, rad_to_deg};
use rally_common::{MeshId, Part, Spherical};
use serde::{Deserialize, Serialize};

/// Frame rate the per-step constants were tuned at. Delta-scaled terms are
/// multiplied by `REFERENCE_FPS * delta`, which is 1 at this rate.
pub const REFERENCE_FPS: f32 = 60.0;

/// Largest delta a single step will integrate, in seconds.
pub const MAX_FRAME_TIME: f32 = 0.1;

/// Steering angles at or below this magnitude snap to zero.
const STEERING_REST: f32 = 1e-2;

/// World velocity components at or below this magnitude snap to zero when
/// no drive key is held.
const VELOCITY_REST: f32 = 1e-3;

/// The five control slots a vehicle reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKey {
    Forward,
    Left,
    Back,
    Right,
    Handbrake,
}

impl ControlKey {
    pub const ALL: [ControlKey; 5] = [
        ControlKey::Forward,
        ControlKey::Left,
        ControlKey::Back,
        ControlKey::Right,
        ControlKey::Handbrake,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Handling constants. Fixed for the lifetime of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    /// Steering added per step while left/right is held (degrees).
    pub steer_rate: f32,
    /// Multiplicative steering return per step, below 1.
    pub steer_return: f32,
    /// Speed change per step from throttle, brake or handbrake.
    pub acc_max: f32,
    /// Per-axis multiplicative friction in the vehicle frame:
    /// x rolls, y is free, z is lateral grip.
    pub friction: Vec3,
    pub front_wheel_radius: f32,
    pub rear_wheel_radius: f32,
    /// How quickly the heading follows the steering angle.
    pub grip: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            steer_rate: 3.4,
            steer_return: 0.93,
            acc_max: 0.01,
            friction: Vec3::new(0.975, 1.0, 0.8),
            front_wheel_radius: 0.25,
            rear_wheel_radius: 0.35,
            grip: 0.45,
        }
    }
}

impl VehicleTuning {
    /// Asymptotic steering deflection with a steering key held.
    pub fn max_steering(&self) -> f32 {
        self.steer_rate * self.steer_return / (1.0 - self.steer_return)
    }
}

/// Render parts of a vehicle, one list per section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleParts {
    pub chassis: Vec<Part>,
    pub front_wheels: Vec<Part>,
    pub back_wheels: Vec<Part>,
    pub suspension_edges: Vec<Part>,
}

impl VehicleParts {
    pub fn len(&self) -> usize {
        self.chassis.len()
            + self.front_wheels.len()
            + self.back_wheels.len()
            + self.suspension_edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// First-person eye anchor and default look direction, in the vehicle frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CockpitView {
    pub eye: Spherical,
    pub target: Spherical,
}

impl Default for CockpitView {
    fn default() -> Self {
        Self {
            eye: Spherical::from_degrees(1.2, 0.0, 35.0),
            target: Spherical::from_degrees(1.0, -90.0, 90.0),
        }
    }
}

/// Arcade vehicle: kinematic state, control keys and the parts it poses.
///
/// The vehicle drives along its local -X axis. `facing` is the heading in
/// degrees around +Y and is never wrapped.
#[derive(Debug, Clone)]
pub struct VehicleModel {
    name: String,
    tuning: VehicleTuning,
    cockpit: CockpitView,
    parts: VehicleParts,
    rest_parts: VehicleParts,
    position: Vec3,
    facing: f32,
    velocity: Vec3,
    steering: f32,
    hub_front: f32,
    hub_rear: f32,
    keys: [bool; 5],
    key_pressed: bool,
    to_draw: bool,
    force_sync: bool,
}

impl VehicleModel {
    pub fn new(
        name: impl Into<String>,
        tuning: VehicleTuning,
        cockpit: CockpitView,
        parts: VehicleParts,
    ) -> Self {
        Self {
            name: name.into(),
            tuning,
            cockpit,
            rest_parts: parts.clone(),
            parts,
            position: Vec3::ZERO,
            facing: 0.0,
            velocity: Vec3::ZERO,
            steering: 0.0,
            hub_front: 0.0,
            hub_rear: 0.0,
            keys: [false; 5],
            key_pressed: false,
            to_draw: true,
            force_sync: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tuning(&self) -> &VehicleTuning {
        &self.tuning
    }

    pub fn cockpit(&self) -> &CockpitView {
        &self.cockpit
    }

    pub fn parts(&self) -> &VehicleParts {
        &self.parts
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn facing(&self) -> f32 {
        self.facing
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Velocity expressed in the vehicle frame.
    pub fn local_velocity(&self) -> Vec3 {
        let (sinf, cosf) = deg_to_rad(self.facing).sin_cos();
        to_local(self.velocity, sinf, cosf)
    }

    pub fn steering(&self) -> f32 {
        self.steering
    }

    pub fn hub_front(&self) -> f32 {
        self.hub_front
    }

    pub fn hub_rear(&self) -> f32 {
        self.hub_rear
    }

    /// Unit vector the vehicle drives towards under throttle.
    pub fn heading(&self) -> Vec3 {
        let (sinf, cosf) = deg_to_rad(self.facing).sin_cos();
        Vec3::new(-cosf, 0.0, sinf)
    }

    pub fn is_moving(&self) -> bool {
        self.velocity.x != 0.0 || self.velocity.z != 0.0
    }

    /// Whether the last step changed anything visible.
    pub fn to_draw(&self) -> bool {
        self.to_draw
    }

    /// Whether any control key is currently held.
    pub fn key_pressed(&self) -> bool {
        self.key_pressed
    }

    pub fn key(&self, key: ControlKey) -> bool {
        self.keys[key.index()]
    }

    pub fn set_key(&mut self, key: ControlKey, pressed: bool) {
        self.keys[key.index()] = pressed;
        self.key_pressed = self.keys.iter().any(|&k| k);
    }

    pub fn release_keys(&mut self) {
        self.keys = [false; 5];
        self.key_pressed = false;
    }

    /// Return to the idle pose at the origin, keeping tuning and parts.
    pub fn reload(&mut self) {
        self.position = Vec3::ZERO;
        self.facing = 0.0;
        self.velocity = Vec3::ZERO;
        self.steering = 0.0;
        self.hub_front = 0.0;
        self.hub_rear = 0.0;
        self.release_keys();
        self.force_sync = true;
        self.step(1.0);
        tracing::debug!(vehicle = %self.name, "vehicle reloaded");
    }

    /// Advance the vehicle by one simulated frame.
    pub fn step(&mut self, delta: f32) {
        let delta = if delta.is_finite() {
            delta.clamp(0.0, MAX_FRAME_TIME)
        } else {
            0.0
        };
        let frames = REFERENCE_FPS * delta;
        let t = self.tuning;
        let (sinf, cosf) = deg_to_rad(self.facing).sin_cos();
        let mut local = to_local(self.velocity, sinf, cosf);

        if self.key(ControlKey::Left) {
            self.steering += t.steer_rate;
        }
        if self.key(ControlKey::Right) {
            self.steering -= t.steer_rate;
        }
        self.steering *= t.steer_return;

        if self.key(ControlKey::Handbrake) {
            local.x = approach_zero(local.x, t.acc_max);
        } else {
            if self.key(ControlKey::Forward) {
                local.x -= t.acc_max;
            }
            if self.key(ControlKey::Back) {
                local.x += t.acc_max;
            }
        }

        local *= t.friction;

        self.facing -= frames * local.x * t.grip * self.steering;

        let spin = rad_to_deg(local.x);
        self.hub_front = (self.hub_front + spin / t.front_wheel_radius).rem_euclid(360.0);
        self.hub_rear = (self.hub_rear + spin / t.rear_wheel_radius).rem_euclid(360.0);

        self.velocity = Vec3::new(
            cosf * local.x + sinf * local.z,
            local.y,
            -sinf * local.x + cosf * local.z,
        );

        if !self.key(ControlKey::Forward) && !self.key(ControlKey::Back) {
            if self.velocity.x.abs() <= VELOCITY_REST {
                self.velocity.x = 0.0;
            }
            if self.velocity.z.abs() <= VELOCITY_REST {
                self.velocity.z = 0.0;
            }
        }
        if self.steering.abs() <= STEERING_REST {
            self.steering = 0.0;
        }

        self.position += self.velocity * frames;

        self.to_draw = self.is_moving() || self.steering != 0.0;
        if self.to_draw || std::mem::take(&mut self.force_sync) {
            self.sync_parts();
        }
    }

    /// World matrices for every part, chassis first. Wheels and suspension
    /// edges are placed relative to the first chassis part.
    pub fn world_matrices(&self) -> Vec<(MeshId, Mat4)> {
        let mut out = Vec::with_capacity(self.parts.len());
        for part in &self.parts.chassis {
            out.push((part.mesh, part.transform.matrix()));
        }
        let base = self
            .parts
            .chassis
            .first()
            .map(|p| p.transform.matrix())
            .unwrap_or(Mat4::IDENTITY);
        let attached = self
            .parts
            .front_wheels
            .iter()
            .chain(&self.parts.suspension_edges)
            .chain(&self.parts.back_wheels);
        for part in attached {
            out.push((part.mesh, base * part.transform.matrix()));
        }
        out
    }

    fn sync_parts(&mut self) {
        let yaw = deg_to_rad(self.facing);
        let steer = deg_to_rad(self.steering);
        let front_spin = deg_to_rad(self.hub_front);
        let rear_spin = deg_to_rad(self.hub_rear);

        for (part, rest) in self.parts.chassis.iter_mut().zip(&self.rest_parts.chassis) {
            part.transform.translation = rest.transform.translation + self.position;
            part.transform.rotation.y = rest.transform.rotation.y + yaw;
        }
        for (part, rest) in self
            .parts
            .front_wheels
            .iter_mut()
            .zip(&self.rest_parts.front_wheels)
        {
            part.transform.rotation.z = rest.transform.rotation.z - front_spin;
            part.transform.rotation.y = rest.transform.rotation.y + steer;
        }
        for (part, rest) in self
            .parts
            .suspension_edges
            .iter_mut()
            .zip(&self.rest_parts.suspension_edges)
        {
            part.transform.rotation.y = rest.transform.rotation.y + steer;
        }
        for (part, rest) in self
            .parts
            .back_wheels
            .iter_mut()
            .zip(&self.rest_parts.back_wheels)
        {
            part.transform.rotation.z = rest.transform.rotation.z - rear_spin;
        }
    }
}

fn to_local(v: Vec3, sinf: f32, cosf: f32) -> Vec3 {
    Vec3::new(cosf * v.x - sinf * v.z, v.y, sinf * v.x + cosf * v.z)
}

fn approach_zero(value: f32, amount: f32) -> f32 {
    if value.abs() <= amount {
        0.0
    } else {
        value - amount.copysign(value)
    }
}
