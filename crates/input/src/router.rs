use glam::Vec2;
use rally_kernel::ControlKey;

use crate::action::{Action, Binding, KeyBindings, KeyId};

/// Orbit distance change per wheel notch.
pub const WHEEL_ZOOM_STEP: f32 = 0.5;
/// Orbit distance change per pinch movement.
pub const PINCH_ZOOM_STEP: f32 = 0.1;

/// Active touch points, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Touches {
    One(Vec2),
    Two(Vec2, Vec2),
}

/// Raw host input, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(KeyId),
    KeyUp(KeyId),
    PointerDown(Vec2),
    PointerMove(Vec2),
    PointerUp,
    /// Vertical scroll amount; only the sign is used.
    Wheel(f32),
    TouchStart(Touches),
    TouchMove(Touches),
    TouchEnd,
    Resize { width: u32, height: u32 },
}

/// What the scene should do in response to an input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Control { key: ControlKey, pressed: bool },
    Action(Action),
    /// Pointer drag since the previous move, in pixels.
    Drag(Vec2),
    /// Signed orbit distance change; positive moves the camera away.
    Zoom(f32),
    Resize { width: u32, height: u32 },
}

/// Turns raw events into commands.
///
/// Control keys report both press and release. Action keys fire on release.
/// A one-finger touch behaves like the mouse; two fingers pinch-zoom. A
/// one-finger tap that never dragged acknowledges a win.
#[derive(Debug, Clone)]
pub struct InputRouter {
    bindings: KeyBindings,
    pointer: Option<Vec2>,
    pinch_distance: Option<f32>,
    tap_candidate: bool,
}

impl InputRouter {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            pointer: None,
            pinch_distance: None,
            tap_candidate: false,
        }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn is_dragging(&self) -> bool {
        self.pointer.is_some()
    }

    pub fn route(&mut self, event: InputEvent) -> Option<Command> {
        match event {
            InputEvent::KeyDown(key) => match self.bindings.lookup(key)? {
                Binding::Control(key) => Some(Command::Control { key, pressed: true }),
                Binding::Action(_) => None,
            },
            InputEvent::KeyUp(key) => match self.bindings.lookup(key)? {
                Binding::Control(key) => Some(Command::Control {
                    key,
                    pressed: false,
                }),
                Binding::Action(action) => Some(Command::Action(action)),
            },
            InputEvent::PointerDown(at) => {
                self.pointer = Some(at);
                None
            }
            InputEvent::PointerMove(at) => self.drag_to(at),
            InputEvent::PointerUp => {
                self.pointer = None;
                None
            }
            InputEvent::Wheel(delta) => zoom(delta, WHEEL_ZOOM_STEP),
            InputEvent::TouchStart(Touches::One(at)) => {
                self.pointer = Some(at);
                self.pinch_distance = None;
                self.tap_candidate = true;
                None
            }
            InputEvent::TouchStart(Touches::Two(a, b)) => {
                self.pointer = None;
                self.pinch_distance = Some(a.distance(b));
                self.tap_candidate = false;
                None
            }
            InputEvent::TouchMove(Touches::One(at)) => {
                let cmd = self.drag_to(at);
                if cmd.is_some() {
                    self.tap_candidate = false;
                }
                cmd
            }
            InputEvent::TouchMove(Touches::Two(a, b)) => {
                let current = a.distance(b);
                let previous = self.pinch_distance.replace(current)?;
                zoom(previous - current, PINCH_ZOOM_STEP)
            }
            InputEvent::TouchEnd => {
                self.pointer = None;
                self.pinch_distance = None;
                if std::mem::take(&mut self.tap_candidate) {
                    Some(Command::Action(Action::AcknowledgeWin))
                } else {
                    None
                }
            }
            InputEvent::Resize { width, height } => Some(Command::Resize { width, height }),
        }
    }

    fn drag_to(&mut self, at: Vec2) -> Option<Command> {
        let start = self.pointer?;
        self.pointer = Some(at);
        let delta = at - start;
        if delta == Vec2::ZERO {
            return None;
        }
        Some(Command::Drag(delta))
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}

fn zoom(delta: f32, step: f32) -> Option<Command> {
    if delta == 0.0 || !delta.is_finite() {
        return None;
    }
    Some(Command::Zoom(step * delta.signum()))
}
