use glam::{Mat4, Vec2, Vec3};
use rally_assets::{AssetError, AssetStore, BoxMesh, VehicleSource};
use rally_common::spherical::deg_to_rad;
use rally_common::MeshId;
use rally_input::{Action, Command};
use rally_kernel::{CoinEvent, CoinField, VehicleModel, MAX_FRAME_TIME};
use rally_persist::RecordStore;
use rally_render::{Camera, DepthCompare, FrameRenderer, FrameUniforms};

use crate::config::SimConfig;
use crate::hud::HudState;

/// Height the coin floats at above the ground.
const COIN_HEIGHT: f32 = 3.0;

/// Fixed vehicle step: one frame at the integrator's reference rate.
const SIM_STEP: f64 = 1.0 / 60.0;
/// Absorbs rounding in host timestamps so a whole step is not skipped.
const STEP_SLACK: f64 = 1e-9;

/// All mutable state of a running scene. Owned by the loop and passed to
/// update and render explicitly.
pub struct GameState {
    config: SimConfig,
    source: Box<dyn VehicleSource>,
    store: AssetStore,
    vehicle: VehicleModel,
    /// Previously loaded vehicles by catalog index; the active slot is empty.
    garage: Vec<Option<VehicleModel>>,
    current: usize,
    camera: Camera,
    coins: CoinField,
    race_time: f64,
    /// Time not yet consumed by whole vehicle steps.
    accumulator: f64,
    win_time: Option<f64>,
    best_time: Option<f64>,
    records: Option<RecordStore>,
    help_visible: bool,
    recenter: bool,
    ground: MeshId,
    coin_mesh: MeshId,
}

impl GameState {
    /// Load the first vehicle and build the static scene. Fails if the first
    /// vehicle cannot be loaded.
    pub fn new(
        config: SimConfig,
        mut source: Box<dyn VehicleSource>,
        records: Option<RecordStore>,
    ) -> Result<Self, AssetError> {
        let count = source.len();
        if count == 0 {
            return Err(AssetError::NoSuchVehicle { index: 0, count });
        }
        let mut store = AssetStore::new();
        let mut vehicle = source.load(0, &mut store)?;
        vehicle.reload();
        let garage = (0..count).map(|_| None).collect();

        let extent = config.ground_half_extent * 2.0;
        let ground = store.register_box(
            BoxMesh::new(Vec3::new(extent, 0.1, extent), [0.32, 0.34, 0.3])
                .with_center(Vec3::new(0.0, -0.05, 0.0)),
        );
        let coin_mesh = store.register_box(BoxMesh::new(
            Vec3::new(1.6, 1.6, 0.3),
            [0.95, 0.78, 0.15],
        ));

        let coins = match config.seed {
            Some(seed) => CoinField::seeded(config.coins, seed),
            None => CoinField::new(config.coins),
        };
        let camera = Camera::new(config.camera_eye(), deg_to_rad(config.fov_deg));
        let best_time = records.as_ref().and_then(RecordStore::load_or_ignore);

        tracing::info!(vehicles = count, meshes = store.len(), "scene loaded");
        let mut game = Self {
            config,
            source,
            store,
            vehicle,
            garage,
            current: 0,
            camera,
            coins,
            race_time: 0.0,
            accumulator: 0.0,
            win_time: None,
            best_time,
            records,
            help_visible: true,
            recenter: true,
            ground,
            coin_mesh,
        };
        game.follow_vehicle();
        Ok(game)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn coins(&self) -> &CoinField {
        &self.coins
    }

    pub fn vehicle_index(&self) -> usize {
        self.current
    }

    pub fn vehicle_count(&self) -> usize {
        self.garage.len()
    }

    pub fn race_time(&self) -> f64 {
        self.race_time
    }

    pub fn best_time(&self) -> Option<f64> {
        self.best_time
    }

    pub fn is_won(&self) -> bool {
        self.win_time.is_some()
    }

    pub fn recenter(&self) -> bool {
        self.recenter
    }

    pub fn vehicle(&self) -> &VehicleModel {
        &self.vehicle
    }

    pub fn hud(&self) -> HudState {
        HudState {
            vehicle_number: self.current + 1,
            vehicle_count: self.garage.len(),
            vehicle_name: self.vehicle.name().to_string(),
            coins: self.coins.collected(),
            coin_target: self.coins.config().target,
            race_time: self.race_time,
            record: self.best_time,
            win_time: self.win_time,
            help_visible: self.help_visible,
            first_person: self.camera.is_first_person(),
        }
    }

    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::Control { key, pressed } => {
                // Driving is locked while a win waits for acknowledgement.
                if !self.is_won() {
                    self.vehicle.set_key(key, pressed);
                }
            }
            Command::Action(action) => self.handle_action(action),
            Command::Drag(delta) => self.drag(delta),
            Command::Zoom(amount) => {
                if !self.camera.is_first_person() {
                    let d = self.camera.eye().d;
                    self.camera.set_eye_d(d + amount);
                    self.recenter = false;
                }
            }
            Command::Resize { width, height } => {
                self.camera.update_perspective_matrix(width, height);
            }
        }
    }

    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::ToggleCameraMode => {
                if self.camera.is_first_person() {
                    self.camera.enter_third_person();
                } else {
                    let cockpit = *self.vehicle.cockpit();
                    self.camera.enter_first_person(cockpit.eye, cockpit.target);
                }
                self.camera.lock_camera();
                self.recenter = true;
            }
            Action::LockCamera => self.camera.lock_camera(),
            Action::LockDistance => self.camera.lock_distance(),
            Action::ResetCamera => {
                self.camera.reset_home();
                self.recenter = true;
            }
            Action::PrevVehicle => {
                let n = self.garage.len();
                self.select_or_log((self.current + n - 1) % n);
            }
            Action::NextVehicle => {
                let n = self.garage.len();
                self.select_or_log((self.current + 1) % n);
            }
            Action::SelectVehicle(index) => {
                if index < self.garage.len() {
                    self.select_or_log(index);
                }
            }
            Action::ToggleHelp => self.help_visible = !self.help_visible,
            Action::AcknowledgeWin => {
                if self.is_won() {
                    self.coins.acknowledge();
                    self.restart_round();
                    tracing::debug!("win acknowledged");
                }
            }
        }
    }

    fn select_or_log(&mut self, index: usize) {
        if let Err(e) = self.select_vehicle(index) {
            tracing::error!(index, error = %e, "vehicle load failed, keeping current vehicle");
        }
    }

    /// Switch to vehicle `index`, loading it on first use. Switching starts a
    /// new round.
    pub fn select_vehicle(&mut self, index: usize) -> Result<(), AssetError> {
        let count = self.garage.len();
        if index >= count {
            return Err(AssetError::NoSuchVehicle { index, count });
        }
        if index == self.current {
            return Ok(());
        }
        let next = match self.garage[index].take() {
            Some(cached) => cached,
            None => self.source.load(index, &mut self.store)?,
        };
        let mut previous = std::mem::replace(&mut self.vehicle, next);
        previous.release_keys();
        self.garage[self.current] = Some(previous);
        self.current = index;
        if self.camera.is_first_person() {
            let cockpit = *self.vehicle.cockpit();
            self.camera.enter_first_person(cockpit.eye, cockpit.target);
        }
        self.coins.reset();
        self.restart_round();
        tracing::debug!(index, name = self.vehicle.name(), "vehicle selected");
        Ok(())
    }

    fn drag(&mut self, delta: Vec2) {
        let Some((width, height)) = self.camera.viewport() else {
            return;
        };
        let (w, h) = (width as f32, height as f32);
        if self.camera.is_first_person() {
            let t = self.camera.target();
            self.camera
                .set_target_theta(t.theta - deg_to_rad(180.0 * delta.x / w));
            self.camera
                .set_target_phi(t.phi - deg_to_rad(45.0 * delta.y / h));
        } else {
            let e = self.camera.eye();
            self.camera
                .set_eye_theta(e.theta + deg_to_rad(180.0 * delta.x / w));
            self.camera.set_eye_phi(e.phi - deg_to_rad(90.0 * delta.y / h));
        }
        self.recenter = false;
    }

    /// Reset the clock and put the vehicle back at the origin.
    fn restart_round(&mut self) {
        self.race_time = 0.0;
        self.accumulator = 0.0;
        self.win_time = None;
        self.vehicle.reload();
        self.follow_vehicle();
    }

    fn follow_vehicle(&mut self) {
        self.camera
            .set_follow(self.vehicle.position(), self.vehicle.facing());
    }

    /// Advance the scene by `delta` seconds.
    ///
    /// The race clock takes the full `delta`. The vehicle advances in fixed
    /// 1/60 s steps, at most `MAX_FRAME_TIME` worth per call, so
    /// handling does not depend on how often the host calls in.
    pub fn update(&mut self, delta: f64) {
        let _span = tracing::info_span!("scene_update").entered();
        let elapsed = if delta.is_finite() && delta > 0.0 {
            delta
        } else {
            0.0
        };
        let clamped = elapsed.min(f64::from(MAX_FRAME_TIME));
        let dt = clamped as f32;

        if self.vehicle.is_moving() || self.recenter {
            self.camera.update_camera_position(dt);
        }
        if self.camera.is_first_person() && self.vehicle.key_pressed() {
            self.camera.update_target_position(dt);
        }
        self.coins.spin(dt);
        if !self.is_won() {
            self.race_time += elapsed;
        }

        self.accumulator += clamped;
        while self.accumulator + STEP_SLACK >= SIM_STEP {
            self.accumulator -= SIM_STEP;
            self.vehicle.step(SIM_STEP as f32);
            self.follow_vehicle();
            if self.is_won() {
                continue;
            }

            let position = self.vehicle.position();
            if let CoinEvent::Won { count } = self.coins.check_pickup(position) {
                self.on_win(count);
                continue;
            }
            if self.coins.is_out_of_bounds(position) {
                tracing::info!(x = position.x, z = position.z, "vehicle left the arena, round reset");
                self.coins.reset();
                self.restart_round();
                break;
            }
        }
        self.accumulator = self.accumulator.max(0.0);
    }

    fn on_win(&mut self, count: u32) {
        let time = self.race_time;
        self.win_time = Some(time);
        self.vehicle.release_keys();
        tracing::info!(coins = count, time, "round won");
        if self.best_time.is_none_or(|best| time < best) {
            self.best_time = Some(time);
        }
        if let Some(records) = &self.records {
            match records.offer(time) {
                Ok(true) => tracing::info!(time, "new best time saved"),
                Ok(false) => {}
                Err(e) => tracing::warn!(error = %e, "could not save best time"),
            }
        }
    }

    /// Issue the draw calls for one frame.
    pub fn render<R: FrameRenderer>(&mut self, renderer: &mut R) -> R::Output {
        self.camera.recompute_if_dirty();

        renderer.begin_frame(self.config.clear_color);
        renderer.set_frame_uniforms(&FrameUniforms {
            light_direction: self.config.light_direction.normalize_or(Vec3::Y),
            ambient: self.config.ambient,
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(),
            eye_position: self.camera.eye_world(),
        });

        renderer.draw_mesh(self.ground, Mat4::IDENTITY);
        for (mesh, world) in self.vehicle.world_matrices() {
            renderer.draw_mesh(mesh, world);
        }
        let coin = self.coins.position() + Vec3::new(0.0, COIN_HEIGHT, 0.0);
        renderer.draw_mesh(
            self.coin_mesh,
            Mat4::from_translation(coin)
                * Mat4::from_rotation_y(deg_to_rad(self.coins.spin_angle())),
        );
        renderer.draw_skybox(self.camera.skybox_matrix(), DepthCompare::LessEqual);
        renderer.end_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rally_assets::{MemoryVehicleSource, VehicleDescriptor};
    use rally_kernel::{CoinConfig, ControlKey};
    use rally_render::{DrawCall, RecordingRenderer};

    const DT: f64 = 1.0 / 60.0;

    fn config() -> SimConfig {
        SimConfig {
            seed: Some(11),
            ..SimConfig::default()
        }
    }

    fn two_cars() -> Box<dyn VehicleSource> {
        let mut blue = VehicleDescriptor::demo();
        blue.name = "Blue".into();
        Box::new(MemoryVehicleSource::new(vec![VehicleDescriptor::demo(), blue]))
    }

    fn game() -> GameState {
        GameState::new(config(), two_cars(), None).unwrap()
    }

    fn press(game: &mut GameState, key: ControlKey, pressed: bool) {
        game.handle_command(Command::Control { key, pressed });
    }

    #[test]
    fn starts_at_rest_on_first_vehicle() {
        let g = game();
        assert_eq!(g.vehicle_index(), 0);
        assert_eq!(g.vehicle_count(), 2);
        assert_eq!(g.vehicle().position(), Vec3::ZERO);
        assert!(!g.is_won());
    }

    #[test]
    fn empty_source_fails() {
        let source = Box::new(MemoryVehicleSource::new(Vec::new()));
        assert!(GameState::new(config(), source, None).is_err());
    }

    #[test]
    fn driving_moves_vehicle_and_clock() {
        let mut g = game();
        press(&mut g, ControlKey::Forward, true);
        for _ in 0..30 {
            g.update(DT);
        }
        assert!(g.vehicle().is_moving());
        assert!((g.race_time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn clock_keeps_time_beyond_frame_clamp() {
        let mut g = game();
        g.update(5.0);
        assert!((g.race_time() - 5.0).abs() < 1e-9);
        g.update(f64::NAN);
        g.update(-1.0);
        assert!((g.race_time() - 5.0).abs() < 1e-9);
    }

    /// Distance covered by one second of throttle with the host calling in
    /// at `rate` Hz.
    fn throttle_for_one_second(rate: u32) -> f32 {
        let mut g = game();
        press(&mut g, ControlKey::Forward, true);
        let mut last = 0.0;
        for i in 1..=rate {
            let now = f64::from(i) / f64::from(rate);
            g.update(now - last);
            last = now;
        }
        assert!((last - 1.0).abs() < 1e-12);
        g.vehicle().position().dot(g.vehicle().heading())
    }

    #[test]
    fn handling_does_not_depend_on_host_rate() {
        let at_60 = throttle_for_one_second(60);
        let at_144 = throttle_for_one_second(144);
        let at_30 = throttle_for_one_second(30);
        assert!(at_60 > 1.0);
        assert!((at_60 - at_144).abs() < 1e-3, "{at_60} vs {at_144}");
        assert!((at_60 - at_30).abs() < 1e-3, "{at_60} vs {at_30}");
    }

    #[test]
    fn short_updates_accumulate_into_steps() {
        let mut g = game();
        press(&mut g, ControlKey::Forward, true);
        g.update(DT / 4.0);
        assert_eq!(g.vehicle().position(), Vec3::ZERO);
        for _ in 0..3 {
            g.update(DT / 4.0);
        }
        assert!(g.vehicle().position().dot(g.vehicle().heading()) > 0.0);
    }

    #[test]
    fn vehicle_selection_caches_and_restarts() {
        let mut g = game();
        press(&mut g, ControlKey::Forward, true);
        for _ in 0..20 {
            g.update(DT);
        }
        g.handle_action(Action::NextVehicle);
        assert_eq!(g.vehicle_index(), 1);
        assert_eq!(g.vehicle().name(), "Blue");
        assert_eq!(g.race_time(), 0.0);
        assert!(!g.vehicle().key_pressed());

        g.handle_action(Action::SelectVehicle(0));
        assert_eq!(g.vehicle_index(), 0);
        assert_eq!(g.vehicle().position(), Vec3::ZERO);

        g.handle_action(Action::PrevVehicle);
        assert_eq!(g.vehicle_index(), 1);
        g.handle_action(Action::SelectVehicle(7));
        assert_eq!(g.vehicle_index(), 1);
        assert!(g.select_vehicle(9).is_err());
    }

    #[test]
    fn collecting_target_coins_wins_and_locks_driving() {
        let coins = CoinConfig {
            target: 1,
            pickup_radius: 200.0,
            ..CoinConfig::default()
        };
        let cfg = SimConfig {
            coins,
            ..config()
        };
        let mut g = GameState::new(cfg, two_cars(), None).unwrap();
        g.update(DT);
        g.update(DT);
        assert!(g.is_won());
        assert_eq!(g.best_time(), Some(DT));
        assert!(g.hud().win_message().is_some());

        press(&mut g, ControlKey::Forward, true);
        assert!(!g.vehicle().key_pressed());
        let clock = g.race_time();
        g.update(DT);
        assert_eq!(g.race_time(), clock);

        g.handle_action(Action::AcknowledgeWin);
        assert!(!g.is_won());
        assert_eq!(g.race_time(), 0.0);
        assert_eq!(g.coins().collected(), 0);
    }

    #[test]
    fn win_writes_record() {
        let dir = tempfile::tempdir().unwrap();
        let records = RecordStore::new(dir.path().join("record.json"));
        let cfg = SimConfig {
            coins: CoinConfig {
                target: 1,
                pickup_radius: 200.0,
                ..CoinConfig::default()
            },
            ..config()
        };
        let mut g = GameState::new(cfg.clone(), two_cars(), Some(records.clone())).unwrap();
        g.update(DT);
        assert!(g.is_won());
        assert_eq!(records.load().unwrap(), Some(DT));

        let again = GameState::new(cfg, two_cars(), Some(records)).unwrap();
        assert_eq!(again.best_time(), Some(DT));
    }

    #[test]
    fn leaving_arena_resets_round() {
        let cfg = SimConfig {
            coins: CoinConfig {
                bound: 0.5,
                pickup_radius: 0.0,
                ..CoinConfig::default()
            },
            ..config()
        };
        let mut g = GameState::new(cfg, two_cars(), None).unwrap();
        press(&mut g, ControlKey::Forward, true);
        let mut reset = false;
        for _ in 0..120 {
            g.update(DT);
            if g.race_time() == 0.0 {
                reset = true;
                break;
            }
        }
        assert!(reset);
        assert_eq!(g.vehicle().position(), Vec3::ZERO);
    }

    #[test]
    fn drag_orbits_and_clears_recenter() {
        let mut g = game();
        g.handle_command(Command::Resize {
            width: 800,
            height: 600,
        });
        assert!(g.recenter());
        let theta = g.camera().eye().theta;
        g.handle_command(Command::Drag(Vec2::new(400.0, 0.0)));
        assert!(!g.recenter());
        let turned = g.camera().eye().theta - theta;
        assert!((turned - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn zoom_ignored_in_first_person() {
        let mut g = game();
        g.handle_command(Command::Zoom(0.5));
        assert!((g.camera().eye().d - 12.5).abs() < 1e-5);
        g.handle_action(Action::ToggleCameraMode);
        assert!(g.camera().is_first_person());
        let d = g.camera().eye().d;
        g.handle_command(Command::Zoom(0.5));
        assert_eq!(g.camera().eye().d, d);
        g.handle_action(Action::ToggleCameraMode);
        assert!((g.camera().eye().d - 12.5).abs() < 1e-5);
    }

    #[test]
    fn render_order_ends_with_skybox() {
        let mut g = game();
        g.handle_command(Command::Resize {
            width: 640,
            height: 480,
        });
        let mut renderer = RecordingRenderer::new();
        let frame = g.render(&mut renderer);
        assert!(matches!(frame.calls.first(), Some(DrawCall::Clear(_))));
        assert!(matches!(frame.calls.get(1), Some(DrawCall::Uniforms(_))));
        assert!(matches!(
            frame.calls.last(),
            Some(DrawCall::Skybox {
                depth: DepthCompare::LessEqual,
                ..
            })
        ));
        // Ground, six demo parts, coin.
        assert_eq!(frame.mesh_draws().count(), 8);
        for (mesh, _) in frame.mesh_draws() {
            assert!(g.store().contains(mesh));
        }
    }

    #[test]
    fn render_does_not_rebuild_unchanged_camera() {
        let mut g = game();
        let mut renderer = RecordingRenderer::new();
        g.render(&mut renderer);
        let count = g.camera().recompute_count();
        g.update(DT);
        g.render(&mut renderer);
        assert_eq!(g.camera().recompute_count(), count);
    }

    #[test]
    fn help_toggles() {
        let mut g = game();
        assert!(g.hud().help_visible);
        g.handle_action(Action::ToggleHelp);
        assert!(!g.hud().help_visible);
    }
}
