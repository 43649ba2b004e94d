//! Input routing: raw key, pointer, wheel and touch events mapped to
//! vehicle controls, camera drags and game actions.
//!
//! # Invariants
//! - Game code never sees key names; every key goes through `KeyBindings`.
//! - Control keys are level-triggered, actions are edge-triggered on release.

pub mod action;
pub mod router;

pub use action::{Action, Binding, KeyBindings, KeyId};
pub use router::{Command, InputEvent, InputRouter, Touches};

/// Errors from parsing input configuration.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("unknown key name: {0:?}")]
    UnknownKey(String),
}
