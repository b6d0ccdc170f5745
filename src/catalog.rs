//! Read-only catalog boundary.
//!
//! The engine never manages catalog lifecycle; it consumes courts,
//! equipment pools, coaches and pricing rules through the [`Catalog`]
//! trait. "Not found" is distinct from "found but inactive" — lookups
//! return the entity with its `is_active` flag and callers must treat
//! inactive resources as unbookable.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::Minute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourtType {
    Indoor,
    Outdoor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Court {
    pub id: Ulid,
    pub name: String,
    pub court_type: CourtType,
    pub base_price: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentKind {
    Racket,
    Shoes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: Ulid,
    pub name: String,
    pub kind: EquipmentKind,
    /// Total units owned; availability subtracts overlapping committed units.
    pub quantity: u32,
    pub rental_price: Decimal,
    pub is_active: bool,
}

/// Recurring weekly template slot, distinct from booking-level windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    pub start: Minute,
    pub end: Minute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coach {
    pub id: Ulid,
    pub name: String,
    pub email: String,
    pub hourly_rate: Decimal,
    pub availability: Vec<AvailabilitySlot>,
    pub is_active: bool,
}

/// Rule applicability, one variant per rule kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// Applies when the booking *start* falls in `[start, end)`.
    TimeRange { start: Minute, end: Minute },
    /// Applies when the booking date's day-of-week is listed.
    DayOfWeek { days: Vec<u8> },
    /// Applies when the court's type matches.
    CourtType { court_type: CourtType },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: Ulid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Evaluation order: ascending priority, ties broken by name. Stacking
    /// is order-dependent, so the order is part of the contract.
    pub priority: i32,
    pub kind: RuleKind,
    pub multiplier: Decimal,
    pub is_active: bool,
}

/// Read-only catalog lookups. Within one engine operation every entity is
/// fetched at most once, so an implementation only needs per-call
/// consistency, not repeatable reads.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_court(&self, id: Ulid) -> Option<Court>;
    async fn get_equipment(&self, id: Ulid) -> Option<Equipment>;
    async fn get_coach(&self, id: Ulid) -> Option<Coach>;
    /// Active rules in their stable evaluation order.
    async fn list_active_pricing_rules(&self) -> Vec<PricingRule>;
}

// ── In-process implementation ────────────────────────────────────

/// Seed document shape for [`StaticCatalog::from_json`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub courts: Vec<Court>,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub coaches: Vec<Coach>,
    #[serde(default)]
    pub pricing_rules: Vec<PricingRule>,
}

/// DashMap-backed catalog for embedders and tests.
#[derive(Default)]
pub struct StaticCatalog {
    courts: DashMap<Ulid, Court>,
    equipment: DashMap<Ulid, Equipment>,
    coaches: DashMap<Ulid, Coach>,
    rules: DashMap<Ulid, PricingRule>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        let catalog = Self::new();
        for c in seed.courts {
            catalog.insert_court(c);
        }
        for e in seed.equipment {
            catalog.insert_equipment(e);
        }
        for c in seed.coaches {
            catalog.insert_coach(c);
        }
        for r in seed.pricing_rules {
            catalog.insert_rule(r);
        }
        catalog
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_seed(serde_json::from_str(json)?))
    }

    pub fn insert_court(&self, court: Court) {
        self.courts.insert(court.id, court);
    }

    pub fn insert_equipment(&self, equipment: Equipment) {
        self.equipment.insert(equipment.id, equipment);
    }

    pub fn insert_coach(&self, coach: Coach) {
        self.coaches.insert(coach.id, coach);
    }

    pub fn insert_rule(&self, rule: PricingRule) {
        self.rules.insert(rule.id, rule);
    }

    pub fn set_court_active(&self, id: Ulid, active: bool) {
        if let Some(mut c) = self.courts.get_mut(&id) {
            c.is_active = active;
        }
    }

    pub fn set_equipment_active(&self, id: Ulid, active: bool) {
        if let Some(mut e) = self.equipment.get_mut(&id) {
            e.is_active = active;
        }
    }

    pub fn set_coach_active(&self, id: Ulid, active: bool) {
        if let Some(mut c) = self.coaches.get_mut(&id) {
            c.is_active = active;
        }
    }

    pub fn set_rule_active(&self, id: Ulid, active: bool) {
        if let Some(mut r) = self.rules.get_mut(&id) {
            r.is_active = active;
        }
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn get_court(&self, id: Ulid) -> Option<Court> {
        self.courts.get(&id).map(|c| c.value().clone())
    }

    async fn get_equipment(&self, id: Ulid) -> Option<Equipment> {
        self.equipment.get(&id).map(|e| e.value().clone())
    }

    async fn get_coach(&self, id: Ulid) -> Option<Coach> {
        self.coaches.get(&id).map(|c| c.value().clone())
    }

    async fn list_active_pricing_rules(&self) -> Vec<PricingRule> {
        let mut rules: Vec<PricingRule> = self
            .rules
            .iter()
            .filter(|r| r.is_active)
            .map(|r| r.value().clone())
            .collect();
        rules.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        rules
    }
}
