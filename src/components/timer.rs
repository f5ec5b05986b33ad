//! Per-actor timer bookkeeping.
//!
//! [`ActorTimers`] only stores *when* each timer is due; the callbacks live
//! with the actor's script (see [`crate::scripting`]). The timer system asks
//! for due entries each tick and re-validates every entry with
//! [`ActorTimers::fire`] right before running its callback, so a timer that
//! was cancelled or rescheduled by an earlier callback in the same tick is
//! skipped.

use std::fmt;

use bevy_ecs::prelude::Component;

/// Identifier of a timer, unique within one actor. The first id is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u32);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledTimer {
    pub id: TimerId,
    /// World time in milliseconds at which the timer fires next.
    pub due_ms: f64,
    pub interval_ms: f64,
    pub repeat: bool,
    seq: u64,
}

#[derive(Component, Debug, Clone, Default)]
pub struct ActorTimers {
    entries: Vec<ScheduledTimer>,
    next_id: u32,
    next_seq: u64,
}

impl ActorTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a timer `delay_ms` after `now_ms`.
    pub fn schedule(&mut self, now_ms: f64, delay_ms: f64, repeat: bool) -> TimerId {
        self.next_id += 1;
        self.next_seq += 1;
        let id = TimerId(self.next_id);
        let interval_ms = delay_ms.max(0.0);
        self.entries.push(ScheduledTimer {
            id,
            due_ms: now_ms + interval_ms,
            interval_ms,
            repeat,
            seq: self.next_seq,
        });
        id
    }

    /// Cancel a timer. Returns whether it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|t| t.id != id);
        self.entries.len() != before
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.entries.iter().any(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Timers due at `now_ms` as `(id, due)`, earliest first, ties in
    /// registration order.
    pub fn due(&self, now_ms: f64) -> Vec<(TimerId, f64)> {
        let mut due: Vec<&ScheduledTimer> =
            self.entries.iter().filter(|t| t.due_ms <= now_ms).collect();
        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|t| (t.id, t.due_ms)).collect()
    }

    /// Claim a due timer for firing.
    ///
    /// Returns `false` if the timer is gone or was rescheduled since `due`
    /// was collected. One-shot timers are removed; repeating timers move to
    /// their next due time (a zero interval counts as `min_interval_ms`).
    pub fn fire(&mut self, id: TimerId, due_ms: f64, min_interval_ms: f64) -> bool {
        let Some(pos) = self.entries.iter().position(|t| t.id == id) else {
            return false;
        };
        if self.entries[pos].due_ms != due_ms {
            return false;
        }
        if self.entries[pos].repeat {
            let timer = &mut self.entries[pos];
            timer.due_ms += timer.interval_ms.max(min_interval_ms);
        } else {
            self.entries.remove(pos);
        }
        true
    }
}
