//! Timed station state: oven slots, sink slots and dispensers.
//!
//! Each slot is a single tagged record instead of parallel arrays, so slot
//! occupancy, elapsed time and assignment can never drift apart.

use crate::domain::items::{ItemId, ItemKind, ItemRegistry, PlayerId, Toppings};
use crate::domain::tuning::{BAKE_TIME, BURN_EXTRA};

/// One oven slot. Elapsed time accumulates every tick while an item occupies
/// the slot; baking continues unattended.
#[derive(Debug, Clone, Copy, Default)]
pub enum OvenSlot {
    #[default]
    Empty,
    Occupied { item: ItemId, elapsed: f32 },
}

impl OvenSlot {
    pub fn item(&self) -> Option<ItemId> {
        match self {
            Self::Empty => None,
            Self::Occupied { item, .. } => Some(*item),
        }
    }

    pub fn elapsed(&self) -> f32 {
        match self {
            Self::Empty => 0.0,
            Self::Occupied { elapsed, .. } => *elapsed,
        }
    }
}

/// One sink slot. `washer` is set while a wash is in progress; the assigned
/// player must stay in range or progress resets to zero.
#[derive(Debug, Clone, Copy, Default)]
pub enum SinkSlot {
    #[default]
    Empty,
    Occupied {
        item: ItemId,
        elapsed: f32,
        washer: Option<PlayerId>,
    },
}

impl SinkSlot {
    pub fn item(&self) -> Option<ItemId> {
        match self {
            Self::Empty => None,
            Self::Occupied { item, .. } => Some(*item),
        }
    }

    pub fn elapsed(&self) -> f32 {
        match self {
            Self::Empty => 0.0,
            Self::Occupied { elapsed, .. } => *elapsed,
        }
    }

    pub fn is_washing(&self) -> bool {
        matches!(self, Self::Occupied { washer: Some(_), .. })
    }
}

/// A single-slot timed dispenser (coke pump / ice cream machine).
#[derive(Debug, Clone, Copy)]
pub struct Dispenser {
    pub gives: ItemKind,
    pub run: Option<DispenseRun>,
}

#[derive(Debug, Clone, Copy)]
pub struct DispenseRun {
    pub by: PlayerId,
    pub elapsed: f32,
}

impl Dispenser {
    pub fn new(gives: ItemKind) -> Self {
        Self { gives, run: None }
    }

    pub fn is_active(&self) -> bool {
        self.run.is_some()
    }

    pub fn cancel(&mut self) {
        self.run = None;
    }
}

/// The bake transition for a pizza that has spent `elapsed` seconds in the
/// oven. States are never skipped: a raw pizza first becomes its cooked dish
/// at BAKE_TIME and only a cooked pizza burns at BAKE_TIME + BURN_EXTRA.
pub fn bake_transition(kind: ItemKind, toppings: Toppings, elapsed: f32) -> Option<ItemKind> {
    if kind == ItemKind::RawPizza && elapsed >= BAKE_TIME {
        return toppings.cooked_dish();
    }
    if kind.is_cooked_pizza() && elapsed >= BAKE_TIME + BURN_EXTRA {
        return Some(ItemKind::BurntPizza);
    }
    None
}

/// Advances all oven slots. Slots referencing items that no longer exist are
/// silently cleared (consistency repair).
pub fn tick_oven(
    slots: &mut [OvenSlot],
    items: &mut ItemRegistry,
    dt: f32,
    notes: &mut Vec<String>,
) {
    for slot in slots.iter_mut() {
        let OvenSlot::Occupied { item, elapsed } = slot else {
            continue;
        };
        let Some(it) = items.get_mut(*item) else {
            *slot = OvenSlot::Empty;
            continue;
        };

        *elapsed += dt;

        if let Some(next) = bake_transition(it.kind, it.toppings, *elapsed) {
            it.kind = next;
            if next == ItemKind::BurntPizza {
                notes.push("Pizza burnt".to_string());
            } else {
                notes.push("Pizza baked".to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::items::ItemSpot;

    fn raw_pizza(items: &mut ItemRegistry, toppings: Toppings) -> ItemId {
        let id = items.spawn(ItemKind::RawPizza, 0.0, 0.0, ItemSpot::OvenSlot(0));
        items.get_mut(id).unwrap().toppings = toppings;
        id
    }

    #[test]
    fn bakes_then_burns_without_skipping_states() {
        let mut items = ItemRegistry::new();
        let id = raw_pizza(&mut items, Toppings { cheese: true, sausage: false });
        let mut slots = vec![OvenSlot::Occupied { item: id, elapsed: 0.0 }];
        let mut notes = Vec::new();

        // Coarse 0.5s steps. The pizza must pass through cooked before burnt.
        let mut saw_cooked = false;
        for _ in 0..40 {
            tick_oven(&mut slots, &mut items, 0.5, &mut notes);
            let kind = items.get(id).unwrap().kind;
            if kind == ItemKind::CheesePizza {
                saw_cooked = true;
            }
            if kind == ItemKind::BurntPizza {
                break;
            }
        }
        assert!(saw_cooked);
        assert_eq!(items.get(id).unwrap().kind, ItemKind::BurntPizza);
    }

    #[test]
    fn cooked_kind_matches_toppings() {
        for (toppings, want) in [
            (Toppings { cheese: true, sausage: false }, ItemKind::CheesePizza),
            (Toppings { cheese: false, sausage: true }, ItemKind::SausagePizza),
            (Toppings { cheese: true, sausage: true }, ItemKind::DeluxePizza),
        ] {
            let mut items = ItemRegistry::new();
            let id = raw_pizza(&mut items, toppings);
            let mut slots = vec![OvenSlot::Occupied { item: id, elapsed: 0.0 }];
            let mut notes = Vec::new();
            tick_oven(&mut slots, &mut items, BAKE_TIME, &mut notes);
            assert_eq!(items.get(id).unwrap().kind, want);
        }
    }

    #[test]
    fn not_cooked_before_bake_time() {
        let mut items = ItemRegistry::new();
        let id = raw_pizza(&mut items, Toppings { cheese: true, sausage: false });
        let mut slots = vec![OvenSlot::Occupied { item: id, elapsed: 0.0 }];
        let mut notes = Vec::new();
        tick_oven(&mut slots, &mut items, BAKE_TIME - 0.1, &mut notes);
        assert_eq!(items.get(id).unwrap().kind, ItemKind::RawPizza);
    }

    #[test]
    fn stale_slot_reference_is_cleared() {
        let mut items = ItemRegistry::new();
        let mut slots = vec![OvenSlot::Occupied { item: 999, elapsed: 3.0 }];
        let mut notes = Vec::new();
        tick_oven(&mut slots, &mut items, 0.1, &mut notes);
        assert!(slots[0].item().is_none());
        assert_eq!(slots[0].elapsed(), 0.0);
    }
}
