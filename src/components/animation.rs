//! Named frame-sequence animations.
//!
//! An [`Animator`] holds every sequence an actor registered plus the
//! playback currently advancing, if any. Frames are opaque [`FrameId`]s
//! resolved by the renderer; this component only decides which one is shown.
//!
//! Each call to [`Animator::play`] hands out a fresh *ticket*. The completion
//! handler is stored by the actor's script under that ticket, so a stop or a
//! replacing play simply orphans the old ticket and its handler never runs.

use bevy_ecs::prelude::Component;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Identifier of a sprite frame/layer, by index or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameId {
    Index(u32),
    Named(String),
}

impl From<u32> for FrameId {
    fn from(i: u32) -> Self {
        FrameId::Index(i)
    }
}

impl From<&str> for FrameId {
    fn from(s: &str) -> Self {
        FrameId::Named(s.to_string())
    }
}

impl From<String> for FrameId {
    fn from(s: String) -> Self {
        FrameId::Named(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationSeq {
    pub frame_ms: f32,
    pub frames: Vec<FrameId>,
}

/// State of the sequence being advanced.
#[derive(Debug, Clone)]
pub struct Playback {
    pub name: String,
    pub frame_index: usize,
    pub elapsed_ms: f32,
    pub ticket: u64,
}

/// Outcome of advancing an animator by one tick.
#[derive(Debug, Default, PartialEq)]
pub struct AnimationStep {
    /// Frame to show, when it changed this tick.
    pub shown: Option<FrameId>,
    /// Ticket of a playback that ran to completion this tick.
    pub completed: Option<u64>,
}

#[derive(Component, Debug, Clone, Default)]
pub struct Animator {
    sequences: FxHashMap<String, AnimationSeq>,
    playing: Option<Playback>,
    current_frame: Option<FrameId>,
    next_ticket: u64,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, replacing an earlier sequence of the same name.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        frame_ms: f32,
        frames: Vec<FrameId>,
    ) -> Result<(), SimError> {
        let name = name.into();
        if frames.is_empty() {
            return Err(SimError::EmptyAnimation { name });
        }
        if !frame_ms.is_finite() || frame_ms <= 0.0 {
            return Err(SimError::InvalidFrameDuration { name, frame_ms });
        }
        self.sequences.insert(name, AnimationSeq { frame_ms, frames });
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.sequences.contains_key(name)
    }

    /// Start `name` from its first frame. Returns the new ticket and the
    /// frame to show, or `None` when no such sequence exists.
    pub fn play(&mut self, name: &str) -> Option<(u64, FrameId)> {
        let first = self.sequences.get(name)?.frames.first()?.clone();
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.playing = Some(Playback {
            name: name.to_string(),
            frame_index: 0,
            elapsed_ms: 0.0,
            ticket,
        });
        self.current_frame = Some(first.clone());
        Some((ticket, first))
    }

    /// Halt playback, keeping the shown frame. Returns whether anything was
    /// playing.
    pub fn stop(&mut self) -> bool {
        self.playing.take().is_some()
    }

    pub fn is_animating(&self) -> bool {
        self.playing.is_some()
    }

    pub fn playing(&self) -> Option<&Playback> {
        self.playing.as_ref()
    }

    pub fn current_frame(&self) -> Option<&FrameId> {
        self.current_frame.as_ref()
    }

    /// Record a frame shown directly by a script.
    pub fn set_frame(&mut self, frame: FrameId) {
        self.current_frame = Some(frame);
    }

    /// Advance playback by `delta_ms`.
    ///
    /// The last frame stays on screen for a full frame duration before the
    /// playback completes.
    pub fn advance(&mut self, delta_ms: f32) -> AnimationStep {
        let mut step = AnimationStep::default();
        let Some(playback) = self.playing.as_mut() else {
            return step;
        };
        let Some(seq) = self.sequences.get(&playback.name) else {
            self.playing = None;
            return step;
        };
        playback.elapsed_ms += delta_ms;
        while playback.elapsed_ms >= seq.frame_ms {
            playback.elapsed_ms -= seq.frame_ms;
            playback.frame_index += 1;
            if playback.frame_index >= seq.frames.len() {
                step.completed = Some(playback.ticket);
                self.playing = None;
                return step;
            }
            let frame = seq.frames[playback.frame_index].clone();
            self.current_frame = Some(frame.clone());
            step.shown = Some(frame);
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(ids: &[u32]) -> Vec<FrameId> {
        ids.iter().map(|&i| FrameId::Index(i)).collect()
    }

    #[test]
    fn rejects_empty_and_zero_duration() {
        let mut a = Animator::new();
        assert!(matches!(
            a.add("open", 100.0, vec![]),
            Err(SimError::EmptyAnimation { .. })
        ));
        assert!(matches!(
            a.add("open", 0.0, frames(&[1])),
            Err(SimError::InvalidFrameDuration { .. })
        ));
        assert!(!a.has("open"));
    }

    #[test]
    fn runs_through_frames_then_completes_once() {
        let mut a = Animator::new();
        a.add("open", 100.0, frames(&[0, 1, 2])).unwrap();
        let (ticket, first) = a.play("open").unwrap();
        assert_eq!(first, FrameId::Index(0));

        assert_eq!(a.advance(99.0), AnimationStep::default());
        assert_eq!(a.advance(1.0).shown, Some(FrameId::Index(1)));
        assert_eq!(a.advance(100.0).shown, Some(FrameId::Index(2)));
        let last = a.advance(100.0);
        assert_eq!(last.completed, Some(ticket));
        assert!(!a.is_animating());
        assert_eq!(a.current_frame(), Some(&FrameId::Index(2)));
        assert_eq!(a.advance(1000.0), AnimationStep::default());
    }

    #[test]
    fn replay_issues_new_ticket() {
        let mut a = Animator::new();
        a.add("spin", 50.0, frames(&[4])).unwrap();
        let (t1, _) = a.play("spin").unwrap();
        let (t2, _) = a.play("spin").unwrap();
        assert_ne!(t1, t2);
        assert_eq!(a.advance(50.0).completed, Some(t2));
    }

    #[test]
    fn stop_keeps_frame() {
        let mut a = Animator::new();
        a.add("walk", 10.0, frames(&[7, 8])).unwrap();
        a.play("walk").unwrap();
        a.advance(10.0);
        assert!(a.stop());
        assert!(!a.stop());
        assert_eq!(a.current_frame(), Some(&FrameId::Index(8)));
        assert!(a.play("missing").is_none());
    }
}
