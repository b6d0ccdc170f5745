use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::availability::{check_coach, check_equipment_item, find_conflict, hourly_slots};
use super::error::EngineError;
use super::Engine;

impl Engine {
    /// True when no confirmed booking for the court overlaps the window.
    /// `exclude` lets re-validation ignore the booking being modified.
    pub async fn court_available(
        &self,
        court_id: Ulid,
        window: &TimeWindow,
        exclude: Option<Ulid>,
    ) -> bool {
        match self.get_timeline(&court_id) {
            Some(tl) => {
                let guard = tl.read().await;
                find_conflict(&guard, window, exclude).is_none()
            }
            None => true,
        }
    }

    /// Check every requested item against its pool; the first failing item
    /// short-circuits. Missing or inactive equipment is a hard failure
    /// here, unlike pricing's leniency.
    pub async fn equipment_available(
        &self,
        items: &[EquipmentItem],
        window: &TimeWindow,
        exclude: Option<Ulid>,
    ) -> Result<(), EngineError> {
        for item in items {
            let equipment = self.catalog.get_equipment(item.equipment_id).await;
            match self.get_timeline(&item.equipment_id) {
                Some(tl) => {
                    let guard = tl.read().await;
                    check_equipment_item(&guard, equipment.as_ref(), item, window, exclude)?;
                }
                None => {
                    let empty = Timeline::new(item.equipment_id);
                    check_equipment_item(&empty, equipment.as_ref(), item, window, exclude)?;
                }
            }
        }
        Ok(())
    }

    /// `None` always succeeds — no coach was requested.
    pub async fn coach_available(
        &self,
        coach_id: Option<Ulid>,
        window: &TimeWindow,
        exclude: Option<Ulid>,
    ) -> Result<(), EngineError> {
        let Some(id) = coach_id else {
            return Ok(());
        };
        let coach = self.catalog.get_coach(id).await;
        match self.get_timeline(&id) {
            Some(tl) => {
                let guard = tl.read().await;
                check_coach(&guard, coach.as_ref(), id, window, exclude)
            }
            None => {
                let empty = Timeline::new(id);
                check_coach(&empty, coach.as_ref(), id, window, exclude)
            }
        }
    }

    /// Hourly display slots for a court and date. Convenience projection
    /// only; the commit path never consults it.
    pub async fn available_slots(&self, court_id: Ulid, date: NaiveDate) -> Vec<AvailableSlot> {
        match self.get_timeline(&court_id) {
            Some(tl) => {
                let guard = tl.read().await;
                hourly_slots(&guard, date)
            }
            None => hourly_slots(&Timeline::new(court_id), date),
        }
    }

    pub fn get_booking(&self, id: Ulid) -> Option<Booking> {
        self.bookings.get(&id).map(|b| b.value().clone())
    }

    /// A user's bookings, most recent window first.
    pub fn bookings_for_user(&self, user_id: &str) -> Vec<Booking> {
        let mut out: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.requester.user_id == user_id)
            .map(|b| b.value().clone())
            .collect();
        out.sort_by(|a, b| {
            (b.window.date, b.window.start).cmp(&(a.window.date, a.window.start))
        });
        out
    }

    /// Confirmed bookings for a court on a date, in window order.
    pub fn bookings_for_court(&self, court_id: Ulid, date: NaiveDate) -> Vec<Booking> {
        let mut out: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.court_id == court_id && b.window.date == date && b.is_confirmed())
            .map(|b| b.value().clone())
            .collect();
        out.sort_by_key(|b| b.window.start);
        out
    }

    pub async fn waitlist_entries(&self, court_id: Ulid, window: &TimeWindow) -> Vec<WaitlistEntry> {
        let key = SlotKey::new(court_id, window);
        match self.get_queue(&key) {
            Some(queue) => queue.read().await.clone(),
            None => Vec::new(),
        }
    }

    pub async fn waitlist_for_user(&self, user_id: &str) -> Vec<WaitlistEntry> {
        let mut out = Vec::new();
        let queues: Vec<_> = self.waitlists.iter().map(|e| e.value().clone()).collect();
        for queue in queues {
            let guard = queue.read().await;
            out.extend(
                guard
                    .iter()
                    .filter(|e| e.requester.user_id == user_id)
                    .cloned(),
            );
        }
        out
    }
}
