//! Input events carried on the `app-input` data channel.
//!
//! Frame: `{"type": "KEYDOWN", "data": "{\"keyCode\":65}"}`. `data` is a
//! JSON document serialized into a string (no Base64).

use serde::{Deserialize, Serialize};

use crate::error::{PlaycastError, Result};

pub const KEY_DOWN: &str = "KEYDOWN";
pub const KEY_UP: &str = "KEYUP";
pub const MOUSE_DOWN: &str = "MOUSEDOWN";
pub const MOUSE_UP: &str = "MOUSEUP";
pub const MOUSE_MOVE: &str = "MOUSEMOVE";

/// Pointer button as reported by the UI (DOM numbering: 0 = primary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Other(u8),
}

impl MouseButton {
    pub fn from_index(button: u8) -> Self {
        if button == 0 {
            MouseButton::Primary
        } else {
            MouseButton::Other(button)
        }
    }

    /// Wire value of `isLeft`: 1 for the primary button, 0 otherwise.
    ///
    /// The remote endpoint depends on this exact encoding; keep it even though
    /// some older notes describe 1 as the right button.
    pub fn is_left_flag(self) -> u8 {
        match self {
            MouseButton::Primary => 1,
            MouseButton::Other(_) => 0,
        }
    }
}

/// Bounding box of the rendering surface, in the same space as pointer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerData {
    pub is_left: u8,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PointerData {
    /// Translate absolute pointer coordinates into surface-relative ones.
    pub fn relative(
        button: MouseButton,
        client_x: f64,
        client_y: f64,
        surface: SurfaceRect,
    ) -> Self {
        Self {
            is_left: button.is_left_flag(),
            x: client_x - surface.left,
            y: client_y - surface.top,
            width: surface.width,
            height: surface.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyData {
    key_code: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct InputFrame {
    #[serde(rename = "type")]
    kind: String,
    data: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown { key_code: u32 },
    KeyUp { key_code: u32 },
    MouseDown(PointerData),
    MouseUp(PointerData),
    MouseMove(PointerData),
}

impl InputEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InputEvent::KeyDown { .. } => KEY_DOWN,
            InputEvent::KeyUp { .. } => KEY_UP,
            InputEvent::MouseDown(_) => MOUSE_DOWN,
            InputEvent::MouseUp(_) => MOUSE_UP,
            InputEvent::MouseMove(_) => MOUSE_MOVE,
        }
    }

    /// Serialize to the text frame sent on the data channel.
    pub fn to_frame(&self) -> Result<String> {
        let data = match self {
            InputEvent::KeyDown { key_code } | InputEvent::KeyUp { key_code } => {
                to_json(&KeyData { key_code: *key_code })?
            }
            InputEvent::MouseDown(p) | InputEvent::MouseUp(p) | InputEvent::MouseMove(p) => {
                to_json(p)?
            }
        };
        to_json(&InputFrame {
            kind: self.kind().to_string(),
            data,
        })
    }

    pub fn from_frame(s: &str) -> Result<Self> {
        let frame: InputFrame = from_json(s)?;
        match frame.kind.as_str() {
            KEY_DOWN => {
                let k: KeyData = from_json(&frame.data)?;
                Ok(InputEvent::KeyDown { key_code: k.key_code })
            }
            KEY_UP => {
                let k: KeyData = from_json(&frame.data)?;
                Ok(InputEvent::KeyUp { key_code: k.key_code })
            }
            MOUSE_DOWN => Ok(InputEvent::MouseDown(from_json(&frame.data)?)),
            MOUSE_UP => Ok(InputEvent::MouseUp(from_json(&frame.data)?)),
            MOUSE_MOVE => Ok(InputEvent::MouseMove(from_json(&frame.data)?)),
            other => Err(PlaycastError::Malformed(format!("unknown input type: {other}"))),
        }
    }
}

fn to_json<T: Serialize>(v: &T) -> Result<String> {
    serde_json::to_string(v)
        .map_err(|e| PlaycastError::Internal(format!("json encode failed: {e}")))
}

fn from_json<T: serde::de::DeserializeOwned>(s: &str) -> Result<T> {
    serde_json::from_str(s)
        .map_err(|e| PlaycastError::Malformed(format!("invalid input frame: {e}")))
}
