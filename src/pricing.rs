//! Deterministic price computation.
//!
//! The breakdown is a pure fold over the active rule list: same inputs and
//! same rule set always produce a bit-identical [`PriceBreakdown`]. All
//! arithmetic is `Decimal`; no state is kept between calls.
//!
//! Missing or inactive equipment and coaches contribute zero here instead
//! of failing — pricing is not a validation gate. Availability checking is
//! the mandatory gate and is strict about both.

use rust_decimal::Decimal;

use crate::catalog::{Catalog, Coach, Court, Equipment, PricingRule, RuleKind};
use crate::engine::EngineError;
use crate::model::{AppliedMultiplier, PriceBreakdown, ResourceSelection, TimeWindow};

/// Evaluate one rule against the court and window.
fn rule_applies(rule: &PricingRule, court: &Court, window: &TimeWindow) -> bool {
    match &rule.kind {
        // Only the start instant is tested, not the full interval; a
        // booking reaching into peak hours from before is not surcharged.
        RuleKind::TimeRange { start, end } => window.start >= *start && window.start < *end,
        RuleKind::DayOfWeek { days } => days.contains(&window.day_of_week()),
        RuleKind::CourtType { court_type } => *court_type == court.court_type,
    }
}

/// Core fold over already-resolved catalog entities. The coordinator calls
/// this with the snapshot it used for availability so pricing and checks
/// observe the same catalog state.
pub(crate) fn price_resolved(
    court: &Court,
    rules: &[PricingRule],
    equipment: &[(u32, Option<Equipment>)],
    coach: Option<&Coach>,
    window: &TimeWindow,
) -> PriceBreakdown {
    let duration = window.duration_hours();

    let mut applied = Vec::new();
    let mut court_price = court.base_price;
    for rule in rules {
        if rule_applies(rule, court, window) {
            court_price *= rule.multiplier;
            applied.push(AppliedMultiplier {
                rule_name: rule.name.clone(),
                multiplier: rule.multiplier,
            });
        }
    }
    court_price *= duration;

    let mut equipment_total = Decimal::ZERO;
    for (quantity, eq) in equipment {
        if let Some(eq) = eq
            && eq.is_active
        {
            equipment_total += eq.rental_price * Decimal::from(*quantity) * duration;
        }
    }

    let coach_fee = match coach {
        Some(c) if c.is_active => c.hourly_rate * duration,
        _ => Decimal::ZERO,
    };

    PriceBreakdown {
        court_base_price: court.base_price,
        applied_multipliers: applied,
        equipment_total,
        coach_fee,
        final_price: court_price + equipment_total + coach_fee,
    }
}

/// Compute the price breakdown for a selection, resolving entities from
/// the catalog. Fails only when the court id does not resolve.
pub async fn calculate_price(
    catalog: &dyn Catalog,
    selection: &ResourceSelection,
    window: &TimeWindow,
) -> Result<PriceBreakdown, EngineError> {
    let court = catalog
        .get_court(selection.court_id)
        .await
        .ok_or(EngineError::court_not_found(selection.court_id))?;
    let rules = catalog.list_active_pricing_rules().await;

    let mut equipment = Vec::with_capacity(selection.equipment.len());
    for item in &selection.equipment {
        equipment.push((item.quantity, catalog.get_equipment(item.equipment_id).await));
    }
    let coach = match selection.coach_id {
        Some(id) => catalog.get_coach(id).await,
        None => None,
    };

    Ok(price_resolved(
        &court,
        &rules,
        &equipment,
        coach.as_ref(),
        window,
    ))
}
