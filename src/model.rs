use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Minute-of-day — the only clock type. 0 = midnight, 1440 = end of day.
pub type Minute = u16;

pub const MINUTES_PER_DAY: Minute = 1440;

/// Parse failure for an `HH:mm` string or an out-of-range window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedTimeError(pub String);

impl std::fmt::Display for MalformedTimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed time: {}", self.0)
    }
}

impl std::error::Error for MalformedTimeError {}

/// Parse `HH:mm` into a minute-of-day. Hour 24 is rejected; windows that
/// end at midnight use `MINUTES_PER_DAY` directly.
pub fn parse_hhmm(s: &str) -> Result<Minute, MalformedTimeError> {
    let (h, m) = s
        .split_once(':')
        .ok_or_else(|| MalformedTimeError(s.into()))?;
    if h.len() != 2 || m.len() != 2 {
        return Err(MalformedTimeError(s.into()));
    }
    let hour: u16 = h.parse().map_err(|_| MalformedTimeError(s.into()))?;
    let minute: u16 = m.parse().map_err(|_| MalformedTimeError(s.into()))?;
    if hour > 23 || minute > 59 {
        return Err(MalformedTimeError(s.into()));
    }
    Ok(hour * 60 + minute)
}

/// Render a minute-of-day back to `HH:mm`.
pub fn format_hhmm(minute: Minute) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// Half-open booking window `[start, end)` on a single calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub date: NaiveDate,
    pub start: Minute,
    pub end: Minute,
}

impl TimeWindow {
    pub fn new(date: NaiveDate, start: Minute, end: Minute) -> Result<Self, MalformedTimeError> {
        let w = Self { date, start, end };
        w.validate()?;
        Ok(w)
    }

    /// Build a window from `HH:mm` strings.
    pub fn parse(date: NaiveDate, start: &str, end: &str) -> Result<Self, MalformedTimeError> {
        Self::new(date, parse_hhmm(start)?, parse_hhmm(end)?)
    }

    pub fn validate(&self) -> Result<(), MalformedTimeError> {
        if self.start >= self.end || self.end > MINUTES_PER_DAY {
            return Err(MalformedTimeError(format!(
                "invalid window [{}, {})",
                format_hhmm(self.start),
                format_hhmm(self.end)
            )));
        }
        Ok(())
    }

    /// Strict half-open overlap: touching windows never conflict.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.date == other.date && self.start < other.end && other.start < self.end
    }

    /// Duration in hours, exact for fractional hours (30 min → 0.5).
    pub fn duration_hours(&self) -> Decimal {
        Decimal::from(self.end - self.start) / Decimal::from(60)
    }

    /// Returns true if `self` lies fully inside `[outer_start, outer_end)`.
    pub fn contained_in(&self, outer_start: Minute, outer_end: Minute) -> bool {
        self.start >= outer_start && self.end <= outer_end
    }

    /// Day of week, 0 = Sunday .. 6 = Saturday.
    pub fn day_of_week(&self) -> u8 {
        use chrono::Datelike;
        self.date.weekday().num_days_from_sunday() as u8
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.date,
            format_hhmm(self.start),
            format_hhmm(self.end)
        )
    }
}

// ── Booking request types ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentItem {
    pub equipment_id: Ulid,
    pub quantity: u32,
}

/// Immutable once submitted to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSelection {
    pub court_id: Ulid,
    pub equipment: Vec<EquipmentItem>,
    pub coach_id: Option<Ulid>,
}

impl ResourceSelection {
    pub fn court_only(court_id: Ulid) -> Self {
        Self {
            court_id,
            equipment: Vec::new(),
            coach_id: None,
        }
    }
}

// ── Price breakdown ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMultiplier {
    pub rule_name: String,
    pub multiplier: Decimal,
}

/// Recomputed fresh on every request — active pricing rules can change,
/// so breakdowns are never cached across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub court_base_price: Decimal,
    pub applied_multipliers: Vec<AppliedMultiplier>,
    pub equipment_total: Decimal,
    pub coach_fee: Decimal,
    pub final_price: Decimal,
}

// ── Booking ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

/// Created only by a successful commit. The single permitted mutation is
/// the terminal `Confirmed` → `Cancelled` flip; records are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub requester: Requester,
    pub court_id: Ulid,
    pub window: TimeWindow,
    pub equipment: Vec<EquipmentItem>,
    pub coach_id: Option<Ulid>,
    pub total_price: Decimal,
    pub price_breakdown: PriceBreakdown,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    /// Resource ids this booking allocates, with the units taken from each:
    /// one court unit, the requested quantity per equipment pool, one coach
    /// unit when a coach is attached.
    pub fn allocations(&self) -> Vec<(Ulid, u32)> {
        let mut out = Vec::with_capacity(2 + self.equipment.len());
        out.push((self.court_id, 1));
        for item in &self.equipment {
            out.push((item.equipment_id, item.quantity));
        }
        if let Some(coach_id) = self.coach_id {
            out.push((coach_id, 1));
        }
        out
    }
}

// ── Waitlist ─────────────────────────────────────────────────────

/// Exact-slot key a waitlist queue is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub court_id: Ulid,
    pub date: NaiveDate,
    pub start: Minute,
    pub end: Minute,
}

impl SlotKey {
    pub fn new(court_id: Ulid, window: &TimeWindow) -> Self {
        Self {
            court_id,
            date: window.date,
            start: window.start,
            end: window.end,
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            date: self.date,
            start: self.start,
            end: self.end,
        }
    }
}

/// Positions for a fixed slot key are contiguous from 1; `notified` flips
/// true exactly once and never resets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: Ulid,
    pub requester: Requester,
    pub court_id: Ulid,
    pub window: TimeWindow,
    pub equipment: Vec<EquipmentItem>,
    pub coach_id: Option<Ulid>,
    pub position: u32,
    pub notified: bool,
}

impl WaitlistEntry {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.court_id, &self.window)
    }
}

// ── Timelines ────────────────────────────────────────────────────

/// One committed claim on a resource for a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub booking_id: Ulid,
    pub window: TimeWindow,
    pub units: u32,
}

/// Per-resource allocation list, sorted by `(date, start)`. Courts,
/// equipment pools and coaches each get one; availability is always
/// derived from this list, never from stored counters.
#[derive(Debug, Clone)]
pub struct Timeline {
    pub resource_id: Ulid,
    pub allocations: Vec<Allocation>,
}

impl Timeline {
    pub fn new(resource_id: Ulid) -> Self {
        Self {
            resource_id,
            allocations: Vec::new(),
        }
    }

    /// Insert an allocation maintaining sort order by `(date, start)`.
    pub fn insert(&mut self, alloc: Allocation) {
        let key = (alloc.window.date, alloc.window.start);
        let pos = self
            .allocations
            .binary_search_by_key(&key, |a| (a.window.date, a.window.start))
            .unwrap_or_else(|e| e);
        self.allocations.insert(pos, alloc);
    }

    /// Remove every allocation held by `booking_id`. Returns how many were
    /// dropped (a booking holds at most one per timeline).
    pub fn remove_booking(&mut self, booking_id: Ulid) -> usize {
        let before = self.allocations.len();
        self.allocations.retain(|a| a.booking_id != booking_id);
        before - self.allocations.len()
    }

    /// Allocations whose window overlaps `query`. Binary search skips
    /// everything starting at or after `query.end` on the query date.
    pub fn overlapping<'a>(
        &'a self,
        query: &'a TimeWindow,
    ) -> impl Iterator<Item = &'a Allocation> + 'a {
        let bound = (query.date, query.end);
        let right = self
            .allocations
            .partition_point(|a| (a.window.date, a.window.start) < bound);
        self.allocations[..right]
            .iter()
            .filter(move |a| a.window.date == query.date && a.window.end > query.start)
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }
}

// ── Events ───────────────────────────────────────────────────────

/// The WAL record format — flat, no nesting. Events carry full records so
/// compaction can dump current state as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated { booking: Booking },
    BookingCancelled { id: Ulid },
    WaitlistJoined { entry: WaitlistEntry },
    WaitlistLeft { id: Ulid },
    WaitlistPromoted { entry: WaitlistEntry },
}

// ── Query result types ───────────────────────────────────────────

/// One display slot of the hourly availability projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub start: Minute,
    pub end: Minute,
    pub available: bool,
}
