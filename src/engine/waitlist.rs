use tracing::info;
use ulid::Ulid;

use crate::limits::MAX_WAITLIST_PER_SLOT;
use crate::model::*;

use super::bookings::{validate_requester, validate_selection};
use super::error::EngineError;
use super::Engine;

/// Remove `id` from a queue and close the gap: every entry with a strictly
/// greater position shifts down by one, keeping positions contiguous from 1.
pub(super) fn remove_and_renumber(
    queue: &mut Vec<WaitlistEntry>,
    id: Ulid,
) -> Option<WaitlistEntry> {
    let idx = queue.iter().position(|e| e.id == id)?;
    let removed = queue.remove(idx);
    for e in queue.iter_mut() {
        if e.position > removed.position {
            e.position -= 1;
        }
    }
    Some(removed)
}

impl Engine {
    /// Append to the waitlist for the exact `(court, window)` slot at
    /// `position = len + 1`. No availability check happens here: joining
    /// is caller-driven and does not require the slot to be full.
    pub async fn join_waitlist(
        &self,
        requester: Requester,
        selection: ResourceSelection,
        window: TimeWindow,
    ) -> Result<WaitlistEntry, EngineError> {
        window.validate()?;
        validate_requester(&requester)?;
        validate_selection(&selection)?;

        let key = SlotKey::new(selection.court_id, &window);
        let queue = self.queue_handle(&key);
        let mut guard = queue.write().await;
        if guard.len() >= MAX_WAITLIST_PER_SLOT {
            return Err(EngineError::validation("waitlist for this slot is full"));
        }

        let entry = WaitlistEntry {
            id: Ulid::new(),
            requester,
            court_id: selection.court_id,
            window,
            equipment: selection.equipment,
            coach_id: selection.coach_id,
            position: guard.len() as u32 + 1,
            notified: false,
        };
        let event = Event::WaitlistJoined {
            entry: entry.clone(),
        };
        self.wal_append(&event).await?;
        self.entry_to_slot.insert(entry.id, key);
        guard.push(entry.clone());
        self.notify.send(key.court_id, &event);
        metrics::counter!(crate::observability::WAITLIST_JOINS_TOTAL).increment(1);
        info!(
            "waitlisted {} at position {} for {}",
            entry.requester.user_id, entry.position, entry.window
        );
        Ok(entry)
    }

    /// Remove an entry and renumber the remaining queue contiguously.
    pub async fn leave_waitlist(&self, id: Ulid) -> Result<(), EngineError> {
        let key = self
            .entry_to_slot
            .get(&id)
            .map(|e| *e.value())
            .ok_or(EngineError::NotFound(id))?;
        let queue = self.get_queue(&key).ok_or(EngineError::NotFound(id))?;
        let mut guard = queue.write().await;
        if !guard.iter().any(|e| e.id == id) {
            return Err(EngineError::NotFound(id));
        }

        let event = Event::WaitlistLeft { id };
        self.wal_append(&event).await?;
        remove_and_renumber(&mut guard, id);
        self.entry_to_slot.remove(&id);
        self.notify.send(key.court_id, &event);
        Ok(())
    }

    /// Promote the lowest-position entry not yet notified for the exact
    /// slot: mark it notified (terminal) and fire the notification hook.
    /// At most one entry per call; the entry stays queued and the slot is
    /// not reserved — the promoted requester must re-attempt booking.
    pub async fn promote_next(
        &self,
        court_id: Ulid,
        window: &TimeWindow,
    ) -> Result<Option<WaitlistEntry>, EngineError> {
        let key = SlotKey::new(court_id, window);
        let Some(queue) = self.get_queue(&key) else {
            return Ok(None);
        };
        let mut guard = queue.write().await;
        // The queue is position-ordered, so the first un-notified entry is
        // the lowest position.
        let Some(idx) = guard.iter().position(|e| !e.notified) else {
            return Ok(None);
        };

        let mut promoted = guard[idx].clone();
        promoted.notified = true;
        let event = Event::WaitlistPromoted {
            entry: promoted.clone(),
        };
        self.wal_append(&event).await?;
        guard[idx].notified = true;
        self.notify.send(court_id, &event);
        metrics::counter!(crate::observability::WAITLIST_PROMOTIONS_TOTAL).increment(1);
        info!(
            "promoted waitlist entry {} (position {}) for {}",
            promoted.id, promoted.position, promoted.window
        );
        Ok(Some(promoted))
    }

    /// Slot keys that still have an un-notified entry queued. Used by the
    /// sweeper; skips queues that are busy rather than blocking on them.
    pub fn promotable_slots(&self) -> Vec<SlotKey> {
        let mut out = Vec::new();
        for entry in self.waitlists.iter() {
            if let Ok(guard) = entry.value().try_read()
                && guard.iter().any(|e| !e.notified)
            {
                out.push(*entry.key());
            }
        }
        out
    }
}
