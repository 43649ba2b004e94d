//! Scene: game state and the fixed-cadence update/render loop.
//!
//! # Invariants
//! - One `GameState` owns the vehicle, camera, coins and clock; nothing global.
//! - Every tick updates; a tick renders only when the minimum frame interval
//!   has passed since the last rendered frame.
//! - Update time is measured from the previous update, so skipped renders
//!   never double-count simulated time.
//! - The vehicle advances in fixed 1/60 s steps whatever the tick rate; the
//!   race clock takes the full, unclamped elapsed time.

pub mod config;
pub mod game;
pub mod hud;
pub mod scheduler;
pub mod timer;

pub use config::{ConfigError, SimConfig};
pub use game::GameState;
pub use hud::{HELP_LINES, HudState, format_clock};
pub use scheduler::{FrameDue, FrameScheduler, LoopStats, SceneLoop, StopHandle, Tick, TickPlan};
pub use timer::FrameTimer;
