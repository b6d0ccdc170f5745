use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::pricing;

use super::availability::{check_coach, check_court, check_equipment_item};
use super::error::{EngineError, ResourceKind};
use super::Engine;

pub(super) fn validate_requester(requester: &Requester) -> Result<(), EngineError> {
    if requester.user_id.is_empty() {
        return Err(EngineError::validation("user id must not be empty"));
    }
    if requester.name.is_empty() || requester.name.len() > MAX_NAME_LEN {
        return Err(EngineError::validation("requester name missing or too long"));
    }
    if !requester.email.contains('@') || requester.email.len() > MAX_EMAIL_LEN {
        return Err(EngineError::validation("requester email is not valid"));
    }
    Ok(())
}

pub(super) fn validate_selection(selection: &ResourceSelection) -> Result<(), EngineError> {
    if selection.equipment.len() > MAX_EQUIPMENT_ITEMS {
        return Err(EngineError::validation("too many equipment items"));
    }
    for (i, item) in selection.equipment.iter().enumerate() {
        if item.quantity == 0 {
            return Err(EngineError::validation(
                "equipment quantity must be at least 1",
            ));
        }
        if item.quantity > MAX_EQUIPMENT_UNITS {
            return Err(EngineError::validation("equipment quantity too large"));
        }
        if selection.equipment[..i]
            .iter()
            .any(|other| other.equipment_id == item.equipment_id)
        {
            return Err(EngineError::validation("duplicate equipment item"));
        }
    }
    Ok(())
}

impl Engine {
    /// Create a booking: verify court, equipment and coach availability
    /// against one consistent snapshot, compute the price, and commit —
    /// all while holding every involved resource timeline's write lock, so
    /// no concurrent attempt can double-allocate an overlapping window.
    ///
    /// Checks run in priority order court → equipment → coach; the first
    /// failure is returned and the rest are skipped. On `Conflict` the
    /// caller is expected to offer waitlisting.
    pub async fn create_booking(
        &self,
        requester: Requester,
        selection: ResourceSelection,
        window: TimeWindow,
    ) -> Result<Booking, EngineError> {
        // Validation precedes every resource check and is never partial.
        window.validate()?;
        validate_requester(&requester)?;
        validate_selection(&selection)?;

        // Catalog snapshot: each entity fetched exactly once, shared by the
        // availability checks and the price fold below.
        let court = self
            .catalog
            .get_court(selection.court_id)
            .await
            .ok_or(EngineError::court_not_found(selection.court_id))?;
        if !court.is_active {
            return Err(EngineError::conflict(
                ResourceKind::Court,
                format!("Court {} is not active", court.name),
            ));
        }
        let rules = self.catalog.list_active_pricing_rules().await;
        let mut equipment = Vec::with_capacity(selection.equipment.len());
        for item in &selection.equipment {
            equipment.push((*item, self.catalog.get_equipment(item.equipment_id).await));
        }
        let coach = match selection.coach_id {
            Some(id) => self.catalog.get_coach(id).await,
            None => None,
        };

        // Acquire write locks in sorted id order to prevent deadlocks
        // between concurrent bookings sharing resources.
        let mut resource_ids: Vec<Ulid> = Vec::with_capacity(2 + selection.equipment.len());
        resource_ids.push(selection.court_id);
        resource_ids.extend(selection.equipment.iter().map(|i| i.equipment_id));
        resource_ids.extend(selection.coach_id);
        resource_ids.sort();
        resource_ids.dedup();

        let mut guards = Vec::with_capacity(resource_ids.len());
        let mut guard_idx = HashMap::new();
        for rid in &resource_ids {
            let tl = self.timeline_handle(*rid);
            let guard = tl.write_owned().await;
            if guard.len() >= MAX_ALLOCATIONS_PER_TIMELINE {
                return Err(EngineError::validation("resource timeline is full"));
            }
            guard_idx.insert(*rid, guards.len());
            guards.push(guard);
        }

        // Checks, court conflict first. Nothing is mutated until all pass.
        let checked: Result<(), EngineError> = (|| {
            check_court(&guards[guard_idx[&selection.court_id]], &window, None)?;
            for (item, eq) in &equipment {
                check_equipment_item(
                    &guards[guard_idx[&item.equipment_id]],
                    eq.as_ref(),
                    item,
                    &window,
                    None,
                )?;
            }
            if let Some(coach_id) = selection.coach_id {
                check_coach(
                    &guards[guard_idx[&coach_id]],
                    coach.as_ref(),
                    coach_id,
                    &window,
                    None,
                )?;
            }
            Ok(())
        })();
        if let Err(e) = checked {
            if let EngineError::Conflict { resource, .. } = &e {
                metrics::counter!(
                    crate::observability::BOOKING_CONFLICTS_TOTAL,
                    "resource" => resource.as_str()
                )
                .increment(1);
            }
            return Err(e);
        }

        // Price from the same snapshot the checks used.
        let equipment_pricing: Vec<(u32, Option<crate::catalog::Equipment>)> = equipment
            .into_iter()
            .map(|(item, eq)| (item.quantity, eq))
            .collect();
        let breakdown =
            pricing::price_resolved(&court, &rules, &equipment_pricing, coach.as_ref(), &window);

        let booking = Booking {
            id: Ulid::new(),
            requester,
            court_id: selection.court_id,
            window,
            equipment: selection.equipment,
            coach_id: selection.coach_id,
            total_price: breakdown.final_price,
            price_breakdown: breakdown,
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
        };

        // Commit: WAL first, then apply to the held timelines. A WAL
        // failure leaves no state behind.
        let event = Event::BookingCreated {
            booking: booking.clone(),
        };
        self.wal_append(&event).await?;
        for (resource_id, units) in booking.allocations() {
            guards[guard_idx[&resource_id]].insert(Allocation {
                booking_id: booking.id,
                window: booking.window,
                units,
            });
        }
        self.bookings.insert(booking.id, booking.clone());
        self.notify.send(booking.court_id, &event);
        metrics::counter!(crate::observability::BOOKINGS_CREATED_TOTAL).increment(1);
        info!(
            "booked {} for {} on {}",
            booking.id, booking.requester.user_id, booking.window
        );
        Ok(booking)
    }

    /// Flip a booking to cancelled and promote the freed slot's waitlist.
    ///
    /// Cancellation is terminal and idempotent: cancelling an already
    /// cancelled booking changes nothing but still triggers promotion
    /// (best effort). The promotion is deliberately not atomic with the
    /// status flip — a crash in between leaves the entry un-promoted and
    /// the sweeper recovers it; the booking is never re-confirmed.
    pub async fn cancel_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        let booking = self
            .bookings
            .get(&id)
            .map(|b| b.value().clone())
            .ok_or(EngineError::NotFound(id))?;

        if booking.is_confirmed() {
            let mut resource_ids: Vec<Ulid> =
                booking.allocations().iter().map(|(rid, _)| *rid).collect();
            resource_ids.sort();
            resource_ids.dedup();
            let mut guards = Vec::with_capacity(resource_ids.len());
            for rid in &resource_ids {
                guards.push(self.timeline_handle(*rid).write_owned().await);
            }

            // A concurrent cancel may have won while we were locking.
            let still_confirmed = self
                .bookings
                .get(&id)
                .is_some_and(|b| b.is_confirmed());
            if still_confirmed {
                let event = Event::BookingCancelled { id };
                self.wal_append(&event).await?;
                for guard in guards.iter_mut() {
                    guard.remove_booking(id);
                }
                if let Some(mut stored) = self.bookings.get_mut(&id) {
                    stored.status = BookingStatus::Cancelled;
                }
                self.notify.send(booking.court_id, &event);
                metrics::counter!(crate::observability::BOOKINGS_CANCELLED_TOTAL).increment(1);
                info!("cancelled booking {id}");
            }
        }

        // Promotion failures must not roll back the committed cancel.
        if let Err(e) = self.promote_next(booking.court_id, &booking.window).await {
            warn!("waitlist promotion after cancelling {id} failed: {e}");
        }

        self.bookings
            .get(&id)
            .map(|b| b.value().clone())
            .ok_or(EngineError::NotFound(id))
    }
}
