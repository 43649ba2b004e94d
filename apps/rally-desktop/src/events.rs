//! winit event translation into `rally_input` events.

use std::collections::BTreeMap;

use glam::Vec2;
use rally_input::{InputEvent, KeyId, Touches};
use winit::event::{ElementState, MouseScrollDelta, TouchPhase};
use winit::keyboard::{Key, NamedKey};

pub fn key_id(key: &Key) -> Option<KeyId> {
    match key {
        Key::Named(NamedKey::Space) => Some(KeyId::Space),
        Key::Named(NamedKey::Enter) => Some(KeyId::Enter),
        Key::Named(NamedKey::Escape) => Some(KeyId::Escape),
        Key::Character(s) => {
            let mut chars = s.chars();
            let c = chars.next()?;
            chars.next().is_none().then(|| KeyId::char(c))
        }
        _ => None,
    }
}

/// Key repeats are dropped; controls are level-triggered anyway.
pub fn key_event(key: &Key, state: ElementState, repeat: bool) -> Option<InputEvent> {
    let id = key_id(key)?;
    match state {
        ElementState::Pressed if repeat => None,
        ElementState::Pressed => Some(InputEvent::KeyDown(id)),
        ElementState::Released => Some(InputEvent::KeyUp(id)),
    }
}

/// Scrolling towards the user zooms out.
pub fn wheel(delta: MouseScrollDelta) -> InputEvent {
    let y = match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(p) => p.y as f32,
    };
    InputEvent::Wheel(-y)
}

/// Tracks active touch points so per-finger winit events become whole-gesture
/// events. Only the first two fingers count.
#[derive(Debug, Default)]
pub struct TouchTracker {
    points: BTreeMap<u64, Vec2>,
}

impl TouchTracker {
    pub fn update(&mut self, id: u64, phase: TouchPhase, at: Vec2) -> Option<InputEvent> {
        match phase {
            TouchPhase::Started => {
                self.points.insert(id, at);
                self.touches().map(InputEvent::TouchStart)
            }
            TouchPhase::Moved => {
                let point = self.points.get_mut(&id)?;
                *point = at;
                self.touches().map(InputEvent::TouchMove)
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.points.remove(&id)?;
                // Lifting one of two fingers restarts as a one-finger gesture.
                Some(match self.touches() {
                    Some(remaining) => InputEvent::TouchStart(remaining),
                    None => InputEvent::TouchEnd,
                })
            }
        }
    }

    fn touches(&self) -> Option<Touches> {
        let mut it = self.points.values().copied();
        match (it.next(), it.next()) {
            (Some(a), Some(b)) => Some(Touches::Two(a, b)),
            (Some(a), None) => Some(Touches::One(a)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn characters_map_case_insensitively() {
        assert_eq!(key_id(&Key::Character("W".into())), Some(KeyId::Char('w')));
        assert_eq!(key_id(&Key::Character("3".into())), Some(KeyId::Char('3')));
        assert_eq!(key_id(&Key::Named(NamedKey::Space)), Some(KeyId::Space));
        assert_eq!(key_id(&Key::Character("ab".into())), None);
        assert_eq!(key_id(&Key::Named(NamedKey::Tab)), None);
    }

    #[test]
    fn repeats_are_dropped() {
        let w = Key::Character("w".into());
        assert_eq!(
            key_event(&w, ElementState::Pressed, false),
            Some(InputEvent::KeyDown(KeyId::Char('w')))
        );
        assert_eq!(key_event(&w, ElementState::Pressed, true), None);
        assert_eq!(
            key_event(&w, ElementState::Released, false),
            Some(InputEvent::KeyUp(KeyId::Char('w')))
        );
    }

    #[test]
    fn wheel_down_zooms_out() {
        assert_eq!(
            wheel(MouseScrollDelta::LineDelta(0.0, -1.0)),
            InputEvent::Wheel(1.0)
        );
    }

    #[test]
    fn touches_form_gestures() {
        let mut t = TouchTracker::default();
        let a = Vec2::new(1.0, 1.0);
        let b = Vec2::new(5.0, 1.0);
        assert_eq!(
            t.update(1, TouchPhase::Started, a),
            Some(InputEvent::TouchStart(Touches::One(a)))
        );
        assert_eq!(
            t.update(2, TouchPhase::Started, b),
            Some(InputEvent::TouchStart(Touches::Two(a, b)))
        );
        let b2 = Vec2::new(7.0, 1.0);
        assert_eq!(
            t.update(2, TouchPhase::Moved, b2),
            Some(InputEvent::TouchMove(Touches::Two(a, b2)))
        );
        assert_eq!(
            t.update(2, TouchPhase::Ended, b2),
            Some(InputEvent::TouchStart(Touches::One(a)))
        );
        assert_eq!(t.update(1, TouchPhase::Ended, a), Some(InputEvent::TouchEnd));
        assert_eq!(t.update(9, TouchPhase::Moved, a), None);
    }
}
