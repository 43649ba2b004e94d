use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rally_kernel::ControlKey;
use serde::{Deserialize, Serialize};

use crate::InputError;

/// A discrete game command produced by the input layer.
///
/// The scene consumes actions, never raw key names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Switch between third-person orbit and first-person look.
    ToggleCameraMode,
    /// Make the current camera pose the relaxation target.
    LockCamera,
    /// Make the current orbit distance the relaxation target.
    LockDistance,
    /// Return the camera (or the first-person look) to its default.
    ResetCamera,
    PrevVehicle,
    NextVehicle,
    /// Zero-based catalog index.
    SelectVehicle(usize),
    ToggleHelp,
    AcknowledgeWin,
}

/// A physical key, named the way the host reports it.
///
/// Letters are stored lowercase. Serialized as a short string such as
/// `"w"`, `"space"` or `"escape"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyId {
    Char(char),
    Space,
    Enter,
    Escape,
}

impl KeyId {
    pub fn char(c: char) -> Self {
        if c == ' ' {
            return KeyId::Space;
        }
        KeyId::Char(c.to_ascii_lowercase())
    }
}

impl FromStr for KeyId {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "space" | " " => Ok(KeyId::Space),
            "enter" => Ok(KeyId::Enter),
            "escape" | "esc" => Ok(KeyId::Escape),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(KeyId::char(c)),
                    _ => Err(InputError::UnknownKey(s.to_string())),
                }
            }
        }
    }
}

impl TryFrom<String> for KeyId {
    type Error = InputError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<KeyId> for String {
    fn from(key: KeyId) -> Self {
        key.to_string()
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Char(c) => write!(f, "{c}"),
            KeyId::Space => f.write_str("space"),
            KeyId::Enter => f.write_str("enter"),
            KeyId::Escape => f.write_str("escape"),
        }
    }
}

/// What a bound key does: hold a vehicle control or fire an action on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    Control(ControlKey),
    Action(Action),
}

/// Lookup table from keys to bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBindings {
    table: BTreeMap<KeyId, Binding>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut b = Self::empty();
        b.bind(KeyId::char('w'), Binding::Control(ControlKey::Forward));
        b.bind(KeyId::char('a'), Binding::Control(ControlKey::Left));
        b.bind(KeyId::char('s'), Binding::Control(ControlKey::Back));
        b.bind(KeyId::char('d'), Binding::Control(ControlKey::Right));
        b.bind(KeyId::Space, Binding::Control(ControlKey::Handbrake));
        b.bind(KeyId::char('c'), Binding::Action(Action::ToggleCameraMode));
        b.bind(KeyId::char('0'), Binding::Action(Action::LockCamera));
        b.bind(KeyId::char('l'), Binding::Action(Action::LockDistance));
        b.bind(KeyId::char('r'), Binding::Action(Action::ResetCamera));
        b.bind(KeyId::char('q'), Binding::Action(Action::PrevVehicle));
        b.bind(KeyId::char('e'), Binding::Action(Action::NextVehicle));
        b.bind(KeyId::char('h'), Binding::Action(Action::ToggleHelp));
        b.bind(KeyId::char('f'), Binding::Action(Action::AcknowledgeWin));
        for n in 1..=8u8 {
            let digit = char::from(b'0' + n);
            b.bind(
                KeyId::char(digit),
                Binding::Action(Action::SelectVehicle(usize::from(n - 1))),
            );
        }
        b
    }
}

impl KeyBindings {
    pub fn empty() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    /// Bind `key`, replacing any previous binding. Returns the old one.
    pub fn bind(&mut self, key: KeyId, binding: Binding) -> Option<Binding> {
        self.table.insert(key, binding)
    }

    pub fn unbind(&mut self, key: KeyId) -> Option<Binding> {
        self.table.remove(&key)
    }

    pub fn lookup(&self, key: KeyId) -> Option<Binding> {
        self.table.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeyId, Binding)> + '_ {
        self.table.iter().map(|(k, b)| (*k, *b))
    }
}
