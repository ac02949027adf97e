// Wire-shaped view of a room mid-game. Built once per broadcast tick and
// shared between receivers behind an Arc.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::customers::{Customer, CustomerState};
use crate::domain::geometry::{Rect, Vec2};
use crate::domain::items::{Item, ItemId, ItemKind, ItemSpot, PlateState, PlayerId, Toppings};
use crate::domain::layout::{Station, StationId, StationKind, Table};
use crate::domain::tuning::{Difficulty, MAP_H, MAP_W};
use crate::use_cases::game::GameInstance;
use crate::use_cases::room::{Phase, Player, Room};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub code: String,
    pub phase: Phase,
    pub host_id: Option<PlayerId>,
    pub locked_count: u8,
    pub map: MapDto,
    pub config: Option<Difficulty>,
    pub game: GameDto,
    pub stations: Vec<StationDto>,
    pub tables: Vec<Table>,
    pub entrance: Vec2,
    pub center_slots: Vec<Option<ItemId>>,
    pub plate_stacks: PlateStacksDto,
    pub table_seat_slots: Vec<Vec<Option<ItemId>>>,
    pub customers: Vec<CustomerDto>,
    pub players: Vec<PlayerDto>,
    pub items: Vec<ItemDto>,
}

#[derive(Debug, Serialize)]
pub struct MapDto {
    pub w: f32,
    pub h: f32,
    pub walls: Vec<Rect>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDto {
    pub time_left: f32,
    pub duration: f32,
    pub score: u32,
    pub target: u32,
    pub below_min_for: f32,
    pub paused: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDto {
    pub id: StationId,
    pub kind: StationKind,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gives: Option<ItemKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_count: Option<usize>,
    /// Oven/sink occupancy by item id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<Vec<Option<ItemId>>>,
    /// Oven/sink per-slot elapsed seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_ts: Option<Vec<f32>>,
    /// Sink per-slot "actively washing" flags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_actives: Option<Vec<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_player_id: Option<PlayerId>,
}

#[derive(Debug, Serialize)]
pub struct PlateStacksDto {
    pub home: StackDto,
    pub service: StackDto,
}

#[derive(Debug, Serialize)]
pub struct StackDto {
    pub slots: Vec<Option<ItemId>>,
    pub centers: Vec<Vec2>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerDto {
    pub left: f32,
    pub total: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDto {
    pub id: u64,
    pub group_id: u64,
    pub table_index: usize,
    pub seat_index: usize,
    pub x: f32,
    pub y: f32,
    pub state: CustomerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dish: Option<ItemKind>,
    pub pre_served: bool,
    pub served: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greet: Option<TimerDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patience: Option<TimerDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eating: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub id: PlayerId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub held_type: Option<ItemKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub held_meta: Option<Toppings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub held_plate: Option<PlateState>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub x: f32,
    pub y: f32,
    pub zone: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Toppings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate: Option<PlateState>,
}

/// Builds the full authoritative view. Returns `None` before a game exists.
pub fn build_snapshot(room: &Room) -> Option<Arc<Snapshot>> {
    let game = room.game.as_ref()?;
    Some(Arc::new(Snapshot {
        code: room.code.clone(),
        phase: room.phase,
        host_id: room.host_id,
        locked_count: room.locked_count,
        map: MapDto {
            w: MAP_W,
            h: MAP_H,
            walls: game.layout.walls.clone(),
        },
        config: room.config,
        game: GameDto {
            time_left: game.time_left,
            duration: game.difficulty.game_duration,
            score: game.score,
            target: game.difficulty.target_score,
            below_min_for: game.below_min_for,
            paused: game.paused,
        },
        stations: game.layout.stations.iter().map(|s| station_dto(s, game)).collect(),
        tables: game.layout.tables.clone(),
        entrance: game.layout.entrance,
        center_slots: game.center_slots.clone(),
        plate_stacks: PlateStacksDto {
            home: StackDto {
                slots: game.home_stack.slots.clone(),
                centers: game.home_stack.centers.clone(),
            },
            service: StackDto {
                slots: game.service_stack.slots.clone(),
                centers: game.service_stack.centers.clone(),
            },
        },
        table_seat_slots: game.table_seats.iter().map(|s| s.to_vec()).collect(),
        customers: game.customers.iter().map(|c| customer_dto(c, game)).collect(),
        players: room.players.iter().map(player_dto(game)).collect(),
        items: game
            .items
            .iter()
            .filter(|it| !matches!(it.spot, ItemSpot::Held(_)))
            .map(item_dto)
            .collect(),
    }))
}

fn station_dto(station: &Station, game: &GameInstance) -> StationDto {
    let mut dto = StationDto {
        id: station.id,
        kind: station.kind,
        label: station.label.clone(),
        x: station.rect.x,
        y: station.rect.y,
        w: station.rect.w,
        h: station.rect.h,
        gives: station.gives,
        slot_count: station.slot_count,
        slots: None,
        slot_ts: None,
        slot_actives: None,
        active: None,
        t: None,
        by_player_id: None,
    };
    match station.kind {
        StationKind::Oven => {
            dto.slots = Some(game.oven_slots.iter().map(|s| s.item()).collect());
            dto.slot_ts = Some(game.oven_slots.iter().map(|s| s.elapsed()).collect());
        }
        StationKind::Sink => {
            dto.slots = Some(game.sink_slots.iter().map(|s| s.item()).collect());
            dto.slot_ts = Some(game.sink_slots.iter().map(|s| s.elapsed()).collect());
            dto.slot_actives = Some(game.sink_slots.iter().map(|s| s.is_washing()).collect());
        }
        StationKind::Dispenser => {
            let run = game
                .dispensers
                .iter()
                .find(|(sid, _)| *sid == station.id)
                .and_then(|(_, d)| d.run);
            dto.active = Some(run.is_some());
            dto.t = run.map(|r| r.elapsed);
            dto.by_player_id = run.map(|r| r.by);
        }
        _ => {}
    }
    dto
}

fn customer_dto(c: &Customer, game: &GameInstance) -> CustomerDto {
    let greet = match c.state {
        // Shared greet window while the whole party orders.
        CustomerState::AwaitOrder => game
            .groups
            .get(&c.group_id)
            .filter(|g| g.greet_active)
            .map(|g| TimerDto { left: g.greet_left.max(0.0), total: g.greet_total }),
        CustomerState::AwaitOrderMain => match (c.main_greet_left, c.main_greet_total) {
            (Some(left), Some(total)) => Some(TimerDto { left: left.max(0.0), total }),
            _ => None,
        },
        _ => None,
    };
    let patience = match c.state {
        CustomerState::WaitingPre | CustomerState::WaitingFood => {
            match (c.patience_left, c.patience_total) {
                (Some(left), Some(total)) => Some(TimerDto { left: left.max(0.0), total }),
                _ => None,
            }
        }
        _ => None,
    };
    CustomerDto {
        id: c.id,
        group_id: c.group_id,
        table_index: c.table_index,
        seat_index: c.seat_index,
        x: c.x,
        y: c.y,
        state: c.state,
        dish: c.dish,
        pre_served: c.pre_served,
        served: c.served,
        greet,
        patience,
        eating: (c.state == CustomerState::Eating).then_some(c.eat_left),
    }
}

fn player_dto(game: &GameInstance) -> impl Fn(&Player) -> PlayerDto + '_ {
    move |p| {
        let held = p.held.and_then(|id| game.items.get(id));
        PlayerDto {
            id: p.id,
            name: p.name.clone(),
            x: p.x,
            y: p.y,
            connected: p.connected,
            held_type: held.map(|it| it.kind),
            held_meta: held
                .filter(|it| it.kind.is_pizza())
                .map(|it| it.toppings),
            held_plate: held
                .filter(|it| it.kind == ItemKind::Plate)
                .map(|it| it.plate),
        }
    }
}

fn item_dto(it: &Item) -> ItemDto {
    ItemDto {
        id: it.id,
        kind: it.kind,
        x: it.x,
        y: it.y,
        zone: it.spot.zone(),
        meta: it.kind.is_pizza().then_some(it.toppings),
        plate: (it.kind == ItemKind::Plate).then_some(it.plate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::items::ItemSpot;

    fn started_room() -> Room {
        let mut room = Room::new("SNAPT".to_string(), 16);
        room.add_player(1, "ada".to_string()).unwrap();
        room.add_player(2, "bo".to_string()).unwrap();
        room.start_game(1).unwrap();
        room
    }

    #[test]
    fn no_snapshot_without_a_game() {
        let room = Room::new("EMPTY".to_string(), 16);
        assert!(build_snapshot(&room).is_none());
    }

    #[test]
    fn snapshot_shape_is_camel_case() {
        let room = started_room();
        let snap = build_snapshot(&room).unwrap();
        let v = serde_json::to_value(&*snap).unwrap();

        assert_eq!(v["code"], "SNAPT");
        assert_eq!(v["phase"], "playing");
        assert_eq!(v["hostId"], 1);
        assert_eq!(v["lockedCount"], 2);
        assert!(v["game"]["timeLeft"].is_number());
        assert!(v["game"]["duration"].is_number());
        assert_eq!(v["game"]["paused"], false);
        assert!(v["map"]["walls"].is_array());
        assert_eq!(v["players"].as_array().unwrap().len(), 2);
        assert_eq!(v["tables"].as_array().unwrap().len(), 3);
        assert!(v["plateStacks"]["home"]["slots"].is_array());
        assert!(v["centerSlots"].is_array());
        assert!(v["tableSeatSlots"].is_array());
    }

    #[test]
    fn station_dtos_expose_their_runtime_state() {
        let room = started_room();
        let snap = build_snapshot(&room).unwrap();
        let v = serde_json::to_value(&*snap).unwrap();
        let stations = v["stations"].as_array().unwrap();

        let oven = stations.iter().find(|s| s["id"] == "OVEN").unwrap();
        assert!(oven["slots"].is_array());
        assert!(oven["slotTs"].is_array());

        let sink = stations.iter().find(|s| s["id"] == "SINK").unwrap();
        assert!(sink["slotActives"].is_array());

        let pump = stations.iter().find(|s| s["id"] == "COKE_PUMP").unwrap();
        assert_eq!(pump["active"], false);
        assert_eq!(pump["gives"], "COKE");

        let bin = stations.iter().find(|s| s["id"] == "BIN_BASE").unwrap();
        assert!(bin.get("slots").is_none());
    }

    #[test]
    fn held_items_are_mirrored_on_the_player_not_the_item_list() {
        let mut room = started_room();
        let held = {
            let game = room.game.as_mut().unwrap();
            let id = game.items.spawn(ItemKind::RawPizza, 0.0, 0.0, ItemSpot::Held(1));
            game.items.get_mut(id).unwrap().toppings.cheese = true;
            id
        };
        room.player_mut(1).unwrap().held = Some(held);

        let snap = build_snapshot(&room).unwrap();
        let v = serde_json::to_value(&*snap).unwrap();

        let items = v["items"].as_array().unwrap();
        assert!(items.iter().all(|it| it["id"] != held));

        let p1 = v["players"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["id"] == 1)
            .unwrap();
        assert_eq!(p1["heldType"], "RAW_PIZZA");
        assert_eq!(p1["heldMeta"]["cheese"], true);
        assert!(p1.get("heldPlate").is_none());
    }

    #[test]
    fn starting_plates_appear_with_zone_and_plate_fields() {
        let room = started_room();
        let snap = build_snapshot(&room).unwrap();
        let v = serde_json::to_value(&*snap).unwrap();
        let items = v["items"].as_array().unwrap();
        assert!(!items.is_empty());
        for it in items {
            assert_eq!(it["type"], "PLATE");
            assert_eq!(it["zone"], "counter");
            assert_eq!(it["plate"]["dirty"], false);
        }
    }
}
