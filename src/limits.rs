//! Input bounds enforced at the engine boundary.

/// Longest accepted requester/user name.
pub const MAX_NAME_LEN: usize = 128;

/// Longest accepted requester email.
pub const MAX_EMAIL_LEN: usize = 254;

/// Distinct equipment items on a single booking.
pub const MAX_EQUIPMENT_ITEMS: usize = 16;

/// Units of one equipment item on a single booking.
pub const MAX_EQUIPMENT_UNITS: u32 = 1_000;

/// Entries queued for a single (court, window) slot.
pub const MAX_WAITLIST_PER_SLOT: usize = 256;

/// Allocations held on a single resource timeline.
pub const MAX_ALLOCATIONS_PER_TIMELINE: usize = 100_000;
