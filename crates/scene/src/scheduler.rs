use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rally_render::FrameRenderer;

use crate::config::SimConfig;
use crate::game::GameState;
use crate::timer::FrameTimer;

/// Shared flag that stops a [`SceneLoop`]. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What one scheduler tick asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickPlan {
    /// Seconds since the previous update.
    pub update_delta: f64,
    /// Seconds since the previous render, when this tick renders.
    pub frame_delta: Option<f64>,
}

/// Decides, per host timestamp, how far to advance and whether to draw.
///
/// Every tick updates. A tick renders only when at least `min_frame_time`
/// has passed since the last rendered frame.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    min_frame_time: f64,
    last_update: Option<f64>,
    last_frame: Option<f64>,
}

impl FrameScheduler {
    pub fn new(min_frame_time: f64) -> Self {
        Self {
            min_frame_time,
            last_update: None,
            last_frame: None,
        }
    }

    pub fn min_frame_time(&self) -> f64 {
        self.min_frame_time
    }

    /// Plan the tick at `now` (seconds). Timestamps going backwards count as
    /// no time passing.
    pub fn advance(&mut self, now: f64) -> TickPlan {
        let update_delta = elapsed(self.last_update, now);
        self.last_update = Some(now.max(self.last_update.unwrap_or(now)));

        let frame_delta = match self.last_frame {
            Some(last) if now - last < self.min_frame_time => None,
            last => {
                self.last_frame = Some(now);
                Some(elapsed(last, now))
            }
        };
        TickPlan {
            update_delta,
            frame_delta,
        }
    }
}

fn elapsed(since: Option<f64>, now: f64) -> f64 {
    match since {
        Some(t) if now > t => now - t,
        _ => 0.0,
    }
}

/// Result of [`SceneLoop::tick`].
#[derive(Debug)]
pub enum Tick<O> {
    /// The loop was stopped; the host should not schedule another tick.
    Stopped,
    /// Simulation advanced, nothing drawn.
    Updated,
    /// Simulation advanced and a frame was drawn.
    Rendered(O),
}

/// A frame the scheduler has asked for. Hand it to [`SceneLoop::render`].
#[derive(Debug)]
#[must_use = "a due frame should be rendered"]
pub struct FrameDue {
    frame_delta: f64,
}

impl FrameDue {
    /// Seconds since the previous rendered frame.
    pub fn frame_delta(&self) -> f64 {
        self.frame_delta
    }
}

/// Tick counters, mostly for tests and the CLI summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub updates: u64,
    pub renders: u64,
}

/// The scene loop: owns the game state and paces update/render against
/// host timestamps.
pub struct SceneLoop {
    game: GameState,
    scheduler: FrameScheduler,
    timer: FrameTimer,
    stop: StopHandle,
    stats: LoopStats,
}

impl SceneLoop {
    pub fn new(game: GameState) -> Self {
        let config: &SimConfig = game.config();
        let scheduler = FrameScheduler::new(config.min_frame_time());
        let timer = FrameTimer::new(config.frame_history);
        Self {
            game,
            scheduler,
            timer,
            stop: StopHandle::new(),
            stats: LoopStats::default(),
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn frame_timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Run one host callback at time `now` (seconds, monotonic).
    pub fn tick<R: FrameRenderer>(&mut self, now: f64, renderer: &mut R) -> Tick<R::Output> {
        match self.update(now) {
            Tick::Stopped => Tick::Stopped,
            Tick::Updated => Tick::Updated,
            Tick::Rendered(due) => Tick::Rendered(self.render(due, renderer)),
        }
    }

    /// Update half of [`SceneLoop::tick`]. A [`Tick::Rendered`] result carries
    /// the frame to draw, so hosts can acquire a render target only when one
    /// is due.
    pub fn update(&mut self, now: f64) -> Tick<FrameDue> {
        if self.stop.is_stopped() {
            return Tick::Stopped;
        }
        self.stats.ticks += 1;
        let plan = self.scheduler.advance(now);

        self.game.update(plan.update_delta);
        self.stats.updates += 1;

        match plan.frame_delta {
            Some(frame_delta) => Tick::Rendered(FrameDue { frame_delta }),
            None => Tick::Updated,
        }
    }

    /// Draw a frame planned by [`SceneLoop::update`].
    pub fn render<R: FrameRenderer>(&mut self, due: FrameDue, renderer: &mut R) -> R::Output {
        self.timer.record(Duration::from_secs_f64(due.frame_delta));
        self.stats.renders += 1;
        self.game.render(renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rally_assets::MemoryVehicleSource;
    use rally_input::Command;
    use rally_kernel::ControlKey;
    use rally_render::RecordingRenderer;

    fn scene_loop() -> SceneLoop {
        let config = SimConfig {
            seed: Some(3),
            ..SimConfig::default()
        };
        let game = GameState::new(config, Box::new(MemoryVehicleSource::demo()), None).unwrap();
        SceneLoop::new(game)
    }

    #[test]
    fn first_tick_renders_with_zero_delta() {
        let mut s = FrameScheduler::new(1.0 / 120.0);
        let plan = s.advance(5.0);
        assert_eq!(plan.update_delta, 0.0);
        assert_eq!(plan.frame_delta, Some(0.0));
    }

    #[test]
    fn fast_ticks_update_without_rendering() {
        let mut s = FrameScheduler::new(1.0 / 120.0);
        s.advance(0.0);
        let plan = s.advance(0.004);
        assert!((plan.update_delta - 0.004).abs() < 1e-12);
        assert_eq!(plan.frame_delta, None);
        let plan = s.advance(0.009);
        assert!((plan.update_delta - 0.005).abs() < 1e-12);
        assert!((plan.frame_delta.unwrap() - 0.009).abs() < 1e-12);
    }

    #[test]
    fn update_time_is_never_double_counted() {
        let mut s = FrameScheduler::new(1.0 / 120.0);
        let mut total = 0.0;
        for i in 0..=100 {
            total += s.advance(i as f64 * 0.003).update_delta;
        }
        assert!((total - 0.3).abs() < 1e-9);
    }

    #[test]
    fn backwards_time_is_zero_delta() {
        let mut s = FrameScheduler::new(0.0);
        s.advance(1.0);
        let plan = s.advance(0.5);
        assert_eq!(plan.update_delta, 0.0);
        let plan = s.advance(1.25);
        assert!((plan.update_delta - 0.25).abs() < 1e-12);
    }

    #[test]
    fn dense_ticks_render_less_than_they_update() {
        let mut l = scene_loop();
        let mut r = RecordingRenderer::new();
        for i in 0..240 {
            l.tick(i as f64 / 240.0, &mut r);
        }
        let stats = l.stats();
        assert_eq!(stats.ticks, 240);
        assert_eq!(stats.updates, 240);
        assert!(stats.renders < stats.ticks);
        assert!(stats.renders > 0);
        assert_eq!(r.frame_count(), stats.renders);
    }

    #[test]
    fn stopped_loop_does_nothing() {
        let mut l = scene_loop();
        let mut r = RecordingRenderer::new();
        let stop = l.stop_handle();
        assert!(matches!(l.tick(0.0, &mut r), Tick::Rendered(_)));
        stop.stop();
        assert!(matches!(l.tick(1.0, &mut r), Tick::Stopped));
        assert_eq!(l.stats().ticks, 1);
    }

    #[test]
    fn split_update_reports_due_frames() {
        let mut l = scene_loop();
        let mut r = RecordingRenderer::new();
        let Tick::Rendered(due) = l.update(0.0) else {
            panic!("first tick should be due");
        };
        assert_eq!(due.frame_delta(), 0.0);
        l.render(due, &mut r);
        assert!(matches!(l.update(0.001), Tick::Updated));
        let Tick::Rendered(due) = l.update(0.05) else {
            panic!("frame should be due after the minimum interval");
        };
        assert!((due.frame_delta() - 0.05).abs() < 1e-12);
        l.render(due, &mut r);
        let stats = l.stats();
        assert_eq!((stats.ticks, stats.updates, stats.renders), (3, 3, 2));
        assert_eq!(r.frame_count(), 2);
    }

    #[test]
    fn loop_drives_vehicle_forward() {
        let mut l = scene_loop();
        let mut r = RecordingRenderer::new();
        l.game_mut().handle_command(Command::Control {
            key: ControlKey::Forward,
            pressed: true,
        });
        for i in 0..61 {
            l.tick(i as f64 / 60.0, &mut r);
        }
        let v = l.game().vehicle();
        assert!(v.is_moving());
        assert!(v.position().dot(v.heading()) > 0.0);
        assert!(l.frame_timer().fps() > 50.0);
    }
}
