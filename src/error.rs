//! Error types shared by the simulation and the script host.
//!
//! Nothing here is fatal to a running level: configuration errors reject a
//! single registration, and script faults are contained to the handler
//! invocation that raised them.

use thiserror::Error;

/// Errors raised by the simulation core and by actor scripts.
#[derive(Debug, Clone, Error)]
pub enum SimError {
    /// A rectangle was built with a negative or non-finite size.
    #[error("invalid rectangle size {w}x{h}")]
    InvalidRect { w: f32, h: f32 },
    /// A hitbox with negative dimensions was requested.
    #[error("invalid hitbox size {w}x{h}")]
    InvalidHitbox { w: f32, h: f32 },
    /// `add_animation` was called with no frames.
    #[error("animation '{name}' has no frames")]
    EmptyAnimation { name: String },
    /// `add_animation` was called with a zero or negative frame duration.
    #[error("animation '{name}' has invalid frame duration {frame_ms}ms")]
    InvalidFrameDuration { name: String, frame_ms: f32 },
    /// A handler raised a fault.
    #[error("{}", script_message(.actor, .message))]
    Script { actor: String, message: String },
    /// A Lua handler raised an error.
    #[cfg(feature = "lua")]
    #[error("lua: {0}")]
    Lua(#[from] mlua::Error),
    /// Configuration or manifest could not be loaded.
    #[error("config: {0}")]
    Config(String),
}

fn script_message(actor: &str, message: &str) -> String {
    if actor.is_empty() {
        message.to_string()
    } else {
        format!("[{}] {}", actor, message)
    }
}

/// Result returned by script handlers and host calls.
pub type ScriptResult<T> = Result<T, SimError>;

impl SimError {
    /// Script fault with a free-form message.
    pub fn fault(message: impl Into<String>) -> Self {
        SimError::Script {
            actor: String::new(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let e = SimError::EmptyAnimation { name: "open".into() };
        assert_eq!(e.to_string(), "animation 'open' has no frames");
        assert_eq!(SimError::fault("boom").to_string(), "boom");
        let e = SimError::Script {
            actor: "button".into(),
            message: "boom".into(),
        };
        assert_eq!(e.to_string(), "[button] boom");
    }
}
