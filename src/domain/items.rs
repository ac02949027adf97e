//! Physical items (plates, ingredients, pizzas, drinks) and their registry.
//!
//! An item occupies exactly one location at a time; `ItemSpot` makes that
//! structural instead of bookkeeping-by-convention.

use serde::Serialize;

pub type ItemId = u64;
pub type PlayerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemKind {
    #[serde(rename = "PIZZA_BASE")]
    PizzaBase,
    #[serde(rename = "RAW_PIZZA")]
    RawPizza,
    #[serde(rename = "PIZZA_PHOMAI")]
    CheesePizza,
    #[serde(rename = "PIZZA_XUCXICH")]
    SausagePizza,
    #[serde(rename = "PIZZA_XUCXICH_PHOMAI")]
    DeluxePizza,
    #[serde(rename = "BURNT_PIZZA")]
    BurntPizza,
    #[serde(rename = "PLATE")]
    Plate,
    #[serde(rename = "COKE")]
    Coke,
    #[serde(rename = "ICE_CREAM")]
    IceCream,
    #[serde(rename = "CHEESE")]
    Cheese,
    #[serde(rename = "SAUSAGE")]
    Sausage,
}

impl ItemKind {
    /// Any pizza stage, including base, raw, cooked and burnt.
    pub fn is_pizza(self) -> bool {
        matches!(
            self,
            Self::PizzaBase
                | Self::RawPizza
                | Self::CheesePizza
                | Self::SausagePizza
                | Self::DeluxePizza
                | Self::BurntPizza
        )
    }

    pub fn is_cooked_pizza(self) -> bool {
        matches!(self, Self::CheesePizza | Self::SausagePizza | Self::DeluxePizza)
    }

    pub fn topping(self) -> Option<Topping> {
        match self {
            Self::Cheese => Some(Topping::Cheese),
            Self::Sausage => Some(Topping::Sausage),
            _ => None,
        }
    }

    /// The canonical dish a held item or plate content counts as when served.
    /// Burnt pizza is worthless and never matches an order.
    pub fn as_dish(self) -> Option<ItemKind> {
        match self {
            Self::CheesePizza | Self::SausagePizza | Self::DeluxePizza | Self::Coke
            | Self::IceCream => Some(self),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::PizzaBase => "pizza base",
            Self::RawPizza => "raw pizza",
            Self::CheesePizza => "cheese pizza",
            Self::SausagePizza => "sausage pizza",
            Self::DeluxePizza => "cheese + sausage pizza",
            Self::BurntPizza => "burnt pizza",
            Self::Plate => "plate",
            Self::Coke => "coke",
            Self::IceCream => "ice cream",
            Self::Cheese => "cheese",
            Self::Sausage => "sausage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topping {
    Cheese,
    Sausage,
}

/// Topping flags on an in-progress pizza.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Toppings {
    pub cheese: bool,
    pub sausage: bool,
}

impl Toppings {
    pub fn any(self) -> bool {
        self.cheese || self.sausage
    }

    /// Adds a topping; returns false if it was already present.
    pub fn add(&mut self, topping: Topping) -> bool {
        let flag = match topping {
            Topping::Cheese => &mut self.cheese,
            Topping::Sausage => &mut self.sausage,
        };
        if *flag {
            return false;
        }
        *flag = true;
        true
    }

    /// The canonical cooked dish for this topping combination. A bare base
    /// yields nothing (and is rejected at the oven in the first place).
    pub fn cooked_dish(self) -> Option<ItemKind> {
        match (self.cheese, self.sausage) {
            (true, true) => Some(ItemKind::DeluxePizza),
            (true, false) => Some(ItemKind::CheesePizza),
            (false, true) => Some(ItemKind::SausagePizza),
            (false, false) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrayStage {
    #[serde(rename = "PIZZA_BASE")]
    Base,
    #[serde(rename = "RAW_PIZZA")]
    Raw,
}

/// An in-progress pizza build carried on a plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tray {
    pub stage: TrayStage,
    #[serde(rename = "meta")]
    pub toppings: Toppings,
}

impl Tray {
    pub fn from_pizza(kind: ItemKind, toppings: Toppings) -> Self {
        let stage = if kind == ItemKind::PizzaBase {
            TrayStage::Base
        } else {
            TrayStage::Raw
        };
        Self { stage, toppings }
    }
}

/// Plate contents. `dish` holds a completed (cooked or burnt) pizza; `tray`
/// holds an in-progress build. They are mutually exclusive in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PlateState {
    pub dish: Option<ItemKind>,
    pub tray: Option<Tray>,
    pub dirty: bool,
}

impl PlateState {
    pub fn has_dish(&self) -> bool {
        self.dish.is_some()
    }

    pub fn has_tray(&self) -> bool {
        self.tray.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_dish() && !self.has_tray()
    }

    /// Clears contents but keeps dirtiness; scraping food off a plate does
    /// not wash it.
    pub fn clear_contents(&mut self) {
        self.dish = None;
        self.tray = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackId {
    Home,
    Service,
}

/// The single authoritative location of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSpot {
    Held(PlayerId),
    CenterSlot(usize),
    PlateStack(StackId, usize),
    OvenSlot(usize),
    SinkSlot(usize),
    TableSeat(usize, usize),
    Floor,
}

impl ItemSpot {
    /// Coarse zone name used by the snapshot contract.
    pub fn zone(&self) -> &'static str {
        match self {
            Self::Held(_) => "held",
            Self::CenterSlot(_) | Self::PlateStack(..) => "counter",
            Self::OvenSlot(_) | Self::SinkSlot(_) => "station",
            Self::TableSeat(..) => "table",
            Self::Floor => "floor",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    pub kind: ItemKind,
    pub x: f32,
    pub y: f32,
    pub spot: ItemSpot,
    /// Topping flags; meaningful only for base/raw pizzas.
    pub toppings: Toppings,
    /// Plate payload; meaningful only for plates.
    pub plate: PlateState,
}

/// All physical items of one game instance.
#[derive(Debug, Default)]
pub struct ItemRegistry {
    items: Vec<Item>,
    next_id: ItemId,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, kind: ItemKind, x: f32, y: f32, spot: ItemSpot) -> ItemId {
        self.next_id += 1;
        let id = self.next_id;
        self.items.push(Item {
            id,
            kind,
            x,
            y,
            spot,
            toppings: Toppings::default(),
            plate: PlateState::default(),
        });
        id
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|it| it.id == id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|it| it.id == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        let idx = self.items.iter().position(|it| it.id == id)?;
        Some(self.items.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Item> {
        self.items.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topping_lookup_table() {
        let both = Toppings { cheese: true, sausage: true };
        let cheese = Toppings { cheese: true, sausage: false };
        let sausage = Toppings { cheese: false, sausage: true };
        assert_eq!(both.cooked_dish(), Some(ItemKind::DeluxePizza));
        assert_eq!(cheese.cooked_dish(), Some(ItemKind::CheesePizza));
        assert_eq!(sausage.cooked_dish(), Some(ItemKind::SausagePizza));
        assert_eq!(Toppings::default().cooked_dish(), None);
    }

    #[test]
    fn toppings_apply_once() {
        let mut t = Toppings::default();
        assert!(t.add(Topping::Cheese));
        assert!(!t.add(Topping::Cheese));
        assert!(t.add(Topping::Sausage));
        assert!(t.any());
    }

    #[test]
    fn burnt_pizza_is_not_a_dish() {
        assert_eq!(ItemKind::BurntPizza.as_dish(), None);
        assert_eq!(ItemKind::CheesePizza.as_dish(), Some(ItemKind::CheesePizza));
        assert_eq!(ItemKind::Coke.as_dish(), Some(ItemKind::Coke));
    }

    #[test]
    fn registry_spawn_get_remove() {
        let mut reg = ItemRegistry::new();
        let id = reg.spawn(ItemKind::Plate, 1.0, 2.0, ItemSpot::Floor);
        assert!(reg.contains(id));
        assert_eq!(reg.get(id).map(|it| it.kind), Some(ItemKind::Plate));
        let removed = reg.remove(id).expect("item");
        assert_eq!(removed.id, id);
        assert!(!reg.contains(id));
    }

    #[test]
    fn spot_zones() {
        assert_eq!(ItemSpot::Held(1).zone(), "held");
        assert_eq!(ItemSpot::CenterSlot(0).zone(), "counter");
        assert_eq!(ItemSpot::PlateStack(StackId::Home, 2).zone(), "counter");
        assert_eq!(ItemSpot::OvenSlot(1).zone(), "station");
        assert_eq!(ItemSpot::TableSeat(0, 2).zone(), "table");
        assert_eq!(ItemSpot::Floor.zone(), "floor");
    }
}
