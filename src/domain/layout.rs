//! Deterministic kitchen map construction.
//!
//! Given the locked player count, produces the same stations, walls, tables
//! and entrance every time, so station and table identities are stable
//! across snapshots.

use serde::Serialize;

use crate::domain::geometry::{Rect, Vec2};
use crate::domain::items::ItemKind;
use crate::domain::tuning::{
    KITCHEN_DOOR_BOT, KITCHEN_DOOR_TOP, KITCHEN_FENCE_X, MAP_H, MAP_W, WALL_T,
    home_plate_slot_count, oven_slot_count, service_plate_slot_count,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StationId {
    #[serde(rename = "BIN_BASE")]
    BinBase,
    #[serde(rename = "BIN_CHEESE")]
    BinCheese,
    #[serde(rename = "BIN_SAUSAGE")]
    BinSausage,
    #[serde(rename = "COKE_PUMP")]
    CokePump,
    #[serde(rename = "OVEN")]
    Oven,
    #[serde(rename = "PLATE_HOME")]
    PlateHome,
    #[serde(rename = "TRASH")]
    Trash,
    #[serde(rename = "SINK")]
    Sink,
    #[serde(rename = "PLATE_SERVICE")]
    PlateService,
    #[serde(rename = "ICE_CREAM_MACHINE")]
    IceCreamMachine,
    #[serde(rename = "CENTER")]
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationKind {
    Bin,
    Dispenser,
    Oven,
    Plate,
    Trash,
    Sink,
    Center,
}

/// Static station geometry. Mutable station state (oven/sink slots,
/// dispenser runs) lives on the game instance.
#[derive(Debug, Clone)]
pub struct Station {
    pub id: StationId,
    pub kind: StationKind,
    pub label: String,
    /// What a bin or dispenser grants.
    pub gives: Option<ItemKind>,
    pub rect: Rect,
    /// Shelf slot count for plate stacks.
    pub slot_count: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub chair_x: f32,
    pub chair_y: f32,
    pub plate_x: f32,
    pub plate_y: f32,
}

pub const SEATS_PER_TABLE: usize = 3;

/// A round customer table with exactly three seats. The rect is the
/// bounding box used for interaction-range checks; collision uses the
/// circle (cx, cy, r).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    pub cx: f32,
    pub cy: f32,
    pub r: f32,
    pub seats: [Seat; SEATS_PER_TABLE],
    #[serde(flatten)]
    pub rect: Rect,
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub stations: Vec<Station>,
    pub walls: Vec<Rect>,
    pub tables: Vec<Table>,
    pub entrance: Vec2,
}

impl Layout {
    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }
}

const TABLE_CENTERS: [(f32, f32); 3] = [(620.0, 180.0), (750.0, 180.0), (685.0, 325.0)];
const TABLE_R: f32 = 22.0;
const TABLE_BOX_HALF: f32 = 32.0;
const CHAIR_DIST: f32 = 42.0;
const PLATE_DIST: f32 = 18.0;
const CHAIR_ANGLES_DEG: [f32; SEATS_PER_TABLE] = [-90.0, 30.0, 150.0];

fn plate_stack_width(slots: usize) -> f32 {
    12.0 + slots as f32 * 40.0
}

/// Builds the kitchen map for a locked player count. Deterministic: fixed
/// coordinates, no randomness.
pub fn build(locked_count: u8) -> Layout {
    let mut stations = Vec::new();

    let top_y = 26.0;
    let top_h = 54.0;
    let kitchen_right_inner = KITCHEN_FENCE_X - WALL_T;

    // Ingredient shelf: three bins packed closely.
    let shelf_x = 40.0;
    let bin_w = 78.0;
    let bins = [
        (StationId::BinBase, ItemKind::PizzaBase, "PIZZA"),
        (StationId::BinCheese, ItemKind::Cheese, "CHEESE"),
        (StationId::BinSausage, ItemKind::Sausage, "SAUSAGE"),
    ];
    for (i, (id, gives, label)) in bins.into_iter().enumerate() {
        stations.push(Station {
            id,
            kind: StationKind::Bin,
            label: label.to_string(),
            gives: Some(gives),
            rect: Rect::new(shelf_x + bin_w * i as f32, top_y, bin_w, top_h),
            slot_count: None,
        });
    }

    // Coke pump mid-left in the kitchen.
    stations.push(Station {
        id: StationId::CokePump,
        kind: StationKind::Dispenser,
        label: "COKE".to_string(),
        gives: Some(ItemKind::Coke),
        rect: Rect::new(40.0, 238.0, 78.0, 54.0),
        slot_count: None,
    });

    let oven_slots = oven_slot_count(locked_count);
    let oven_w = if oven_slots == 3 { 132.0 } else { 92.0 };
    stations.push(Station {
        id: StationId::Oven,
        kind: StationKind::Oven,
        label: format!("OVEN ({oven_slots})"),
        gives: None,
        rect: Rect::new(kitchen_right_inner - oven_w - 10.0, top_y, oven_w, top_h),
        slot_count: Some(oven_slots),
    });

    let bot_y = 432.0;
    let bot_h = 62.0;

    let home_slots = home_plate_slot_count(locked_count);
    stations.push(Station {
        id: StationId::PlateHome,
        kind: StationKind::Plate,
        label: format!("PLATE STACK ({home_slots})"),
        gives: None,
        rect: Rect::new(80.0, bot_y, plate_stack_width(home_slots), bot_h),
        slot_count: Some(home_slots),
    });

    // Trash stays far right as "punishment".
    stations.push(Station {
        id: StationId::Trash,
        kind: StationKind::Trash,
        label: "TRASH".to_string(),
        gives: None,
        rect: Rect::new(640.0, bot_y, 102.0, 56.0),
        slot_count: None,
    });

    // Two sink slots so two players can wash simultaneously.
    let sink_w = 92.0;
    stations.push(Station {
        id: StationId::Sink,
        kind: StationKind::Sink,
        label: "SINK (2)".to_string(),
        gives: None,
        rect: Rect::new(kitchen_right_inner - sink_w - 10.0, bot_y, sink_w, bot_h),
        slot_count: Some(2),
    });

    let service_slots = service_plate_slot_count(locked_count);
    stations.push(Station {
        id: StationId::PlateService,
        kind: StationKind::Plate,
        label: format!("PLATE STACK ({service_slots})"),
        gives: None,
        rect: Rect::new(
            KITCHEN_FENCE_X + 40.0,
            top_y,
            plate_stack_width(service_slots),
            top_h,
        ),
        slot_count: Some(service_slots),
    });

    stations.push(Station {
        id: StationId::IceCreamMachine,
        kind: StationKind::Dispenser,
        label: "ICE CREAM".to_string(),
        gives: Some(ItemKind::IceCream),
        rect: Rect::new(780.0, top_y, 92.0, top_h),
        slot_count: None,
    });

    stations.push(Station {
        id: StationId::Center,
        kind: StationKind::Center,
        label: "MAIN TABLE (3 slots)".to_string(),
        gives: None,
        rect: Rect::new(270.0, 240.0, 132.0, 62.0),
        slot_count: Some(CENTER_SLOT_COUNT),
    });

    let tables = TABLE_CENTERS
        .iter()
        .enumerate()
        .map(|(i, &(cx, cy))| {
            let seats: [Seat; SEATS_PER_TABLE] = std::array::from_fn(|si| {
                let ang = CHAIR_ANGLES_DEG[si].to_radians();
                Seat {
                    chair_x: cx + ang.cos() * CHAIR_DIST,
                    chair_y: cy + ang.sin() * CHAIR_DIST,
                    plate_x: cx + ang.cos() * PLATE_DIST,
                    plate_y: cy + ang.sin() * PLATE_DIST,
                }
            });
            Table {
                id: format!("TABLE_{}", i + 1),
                cx,
                cy,
                r: TABLE_R,
                seats,
                rect: Rect::new(
                    cx - TABLE_BOX_HALF,
                    cy - TABLE_BOX_HALF,
                    TABLE_BOX_HALF * 2.0,
                    TABLE_BOX_HALF * 2.0,
                ),
            }
        })
        .collect();

    let mut walls = vec![
        Rect::new(0.0, 0.0, MAP_W, WALL_T),
        Rect::new(0.0, MAP_H - WALL_T, MAP_W, WALL_T),
        Rect::new(0.0, 0.0, WALL_T, MAP_H),
        Rect::new(MAP_W - WALL_T, 0.0, WALL_T, MAP_H),
    ];
    // Stations are solid.
    walls.extend(stations.iter().map(|s| s.rect));
    // Kitchen fence with a doorway gap separating kitchen from dining.
    walls.push(Rect::new(KITCHEN_FENCE_X, 0.0, WALL_T, KITCHEN_DOOR_TOP));
    walls.push(Rect::new(
        KITCHEN_FENCE_X,
        KITCHEN_DOOR_BOT,
        WALL_T,
        MAP_H - KITCHEN_DOOR_BOT,
    ));

    Layout {
        stations,
        walls,
        tables,
        entrance: Vec2::new(862.0, 305.0),
    }
}

pub const CENTER_SLOT_COUNT: usize = 3;

/// Centers of the three main-table slots (single row).
pub fn center_slot_centers(center: &Rect) -> Vec<Vec2> {
    let margin_x = 6.0;
    let margin_y = 16.0;
    let cols = CENTER_SLOT_COUNT;
    let cell_w = (center.w - margin_x * 2.0) / cols as f32;
    let cell_h = center.h - margin_y * 2.0;
    (0..cols)
        .map(|c| {
            Vec2::new(
                center.x + margin_x + cell_w * (c as f32 + 0.5),
                center.y + margin_y + cell_h * 0.5,
            )
        })
        .collect()
}

/// Centers of the n plate-shelf slots (single row).
pub fn plate_stack_slot_centers(station: &Rect, slots: usize) -> Vec<Vec2> {
    let margin_x = 8.0;
    let cols = slots.max(1);
    let cell_w = (station.w - margin_x * 2.0) / cols as f32;
    let cy = station.y + station.h / 2.0;
    (0..cols)
        .map(|c| Vec2::new(station.x + margin_x + cell_w * (c as f32 + 0.5), cy))
        .collect()
}

/// Centers of the oven/sink slots (single row).
pub fn row_slot_centers(station: &Rect, slots: usize) -> Vec<Vec2> {
    let margin_x = 6.0;
    let cols = slots.max(1);
    let cell_w = (station.w - margin_x * 2.0) / cols as f32;
    let cy = station.y + station.h / 2.0;
    (0..cols)
        .map(|c| Vec2::new(station.x + margin_x + cell_w * (c as f32 + 0.5), cy))
        .collect()
}

/// Fixed player spawn points inside the kitchen.
pub fn spawn_positions() -> [Vec2; 5] {
    [
        Vec2::new(250.0, 330.0),
        Vec2::new(300.0, 350.0),
        Vec2::new(350.0, 330.0),
        Vec2::new(400.0, 350.0),
        Vec2::new(450.0, 330.0),
    ]
}
