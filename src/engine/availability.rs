use ulid::Ulid;

use crate::catalog::{Coach, Equipment};
use crate::model::*;

use super::error::{EngineError, ResourceKind};

// ── Availability predicates ──────────────────────────────────────
//
// Pure functions over a resource timeline plus resolved catalog entities.
// The booking commit path runs them under write guards; the read API runs
// the same functions under read guards, so check and commit can never
// disagree about what counts as a conflict.

/// Display projection bounds: hourly slots from 06:00 to 22:00.
pub const SLOTS_OPEN: Minute = 6 * 60;
pub const SLOTS_CLOSE: Minute = 22 * 60;

/// First confirmed allocation overlapping `window`, if any.
pub fn find_conflict(
    timeline: &Timeline,
    window: &TimeWindow,
    exclude: Option<Ulid>,
) -> Option<Ulid> {
    timeline
        .overlapping(window)
        .find(|a| exclude != Some(a.booking_id))
        .map(|a| a.booking_id)
}

/// Units already committed by overlapping confirmed bookings.
pub fn booked_units(timeline: &Timeline, window: &TimeWindow, exclude: Option<Ulid>) -> u32 {
    timeline
        .overlapping(window)
        .filter(|a| exclude != Some(a.booking_id))
        .map(|a| a.units)
        .sum()
}

/// True when some weekly slot matches the window's day-of-week and fully
/// contains the window.
pub fn coach_covers(coach: &Coach, window: &TimeWindow) -> bool {
    let dow = window.day_of_week();
    coach
        .availability
        .iter()
        .any(|slot| slot.day_of_week == dow && window.contained_in(slot.start, slot.end))
}

/// Court check: any overlapping confirmed booking is a conflict.
pub fn check_court(
    timeline: &Timeline,
    window: &TimeWindow,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    if find_conflict(timeline, window, exclude).is_some() {
        return Err(EngineError::conflict(
            ResourceKind::Court,
            "Court not available at this time",
        ));
    }
    Ok(())
}

/// Equipment check for one requested item. Unlike pricing, missing or
/// inactive equipment is a hard failure here.
pub fn check_equipment_item(
    timeline: &Timeline,
    equipment: Option<&Equipment>,
    item: &EquipmentItem,
    window: &TimeWindow,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    let Some(eq) = equipment else {
        return Err(EngineError::ResourceNotFound {
            kind: ResourceKind::Equipment,
            id: item.equipment_id,
        });
    };
    if !eq.is_active {
        return Err(EngineError::conflict(
            ResourceKind::Equipment,
            format!("Equipment {} is not active", eq.name),
        ));
    }
    let booked = booked_units(timeline, window, exclude);
    let available = i64::from(eq.quantity) - i64::from(booked);
    if available < i64::from(item.quantity) {
        return Err(EngineError::conflict(
            ResourceKind::Equipment,
            format!(
                "Insufficient {}. Available: {}, Required: {}",
                eq.name, available, item.quantity
            ),
        ));
    }
    Ok(())
}

/// Coach check: exists + active, window contained in a weekly slot, and no
/// overlapping confirmed booking for the coach.
pub fn check_coach(
    timeline: &Timeline,
    coach: Option<&Coach>,
    coach_id: Ulid,
    window: &TimeWindow,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    let Some(coach) = coach else {
        return Err(EngineError::ResourceNotFound {
            kind: ResourceKind::Coach,
            id: coach_id,
        });
    };
    if !coach.is_active {
        return Err(EngineError::conflict(
            ResourceKind::Coach,
            format!("Coach {} is not active", coach.name),
        ));
    }
    if !coach_covers(coach, window) {
        return Err(EngineError::conflict(
            ResourceKind::Coach,
            format!("Coach {} is not available at this time", coach.name),
        ));
    }
    if find_conflict(timeline, window, exclude).is_some() {
        return Err(EngineError::conflict(
            ResourceKind::Coach,
            format!("Coach {} is already booked at this time", coach.name),
        ));
    }
    Ok(())
}

/// One-hour display slots between [`SLOTS_OPEN`] and [`SLOTS_CLOSE`], each
/// independently checked against the court timeline. Convenience for
/// display only — the commit path never consults this.
pub fn hourly_slots(timeline: &Timeline, date: chrono::NaiveDate) -> Vec<AvailableSlot> {
    let mut slots = Vec::with_capacity(((SLOTS_CLOSE - SLOTS_OPEN) / 60) as usize);
    let mut start = SLOTS_OPEN;
    while start < SLOTS_CLOSE {
        let end = start + 60;
        let window = TimeWindow { date, start, end };
        slots.push(AvailableSlot {
            start,
            end,
            available: find_conflict(timeline, &window, None).is_none(),
        });
        start = end;
    }
    slots
}
