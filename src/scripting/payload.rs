use std::fmt;

use bevy_ecs::prelude::Entity;

/// Value carried by a message or returned as a reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    Text(String),
    Actor(Entity),
}

impl Payload {
    pub fn is_nil(&self) -> bool {
        matches!(self, Payload::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Payload::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Payload::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_actor(&self) -> Option<Entity> {
        match self {
            Payload::Actor(e) => Some(*e),
            _ => None,
        }
    }

    /// Lua-style truthiness: only nil and `false` are false.
    pub fn truthy(&self) -> bool {
        !matches!(self, Payload::Nil | Payload::Bool(false))
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Nil => write!(f, "nil"),
            Payload::Bool(b) => write!(f, "{}", b),
            Payload::Number(n) => write!(f, "{}", n),
            Payload::Text(s) => write!(f, "{:?}", s),
            Payload::Actor(e) => write!(f, "actor {:?}", e),
        }
    }
}

impl From<bool> for Payload {
    fn from(b: bool) -> Self {
        Payload::Bool(b)
    }
}

impl From<f64> for Payload {
    fn from(n: f64) -> Self {
        Payload::Number(n)
    }
}

impl From<i32> for Payload {
    fn from(n: i32) -> Self {
        Payload::Number(n as f64)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<Entity> for Payload {
    fn from(e: Entity) -> Self {
        Payload::Actor(e)
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::Nil
    }
}
