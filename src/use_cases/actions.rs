// The interact button: one context-sensitive action resolved against the
// nearest seat, station or floor item.
//
// Returns feedback text for the acting player; world-visible results reach
// everyone through the next snapshot.

use rand::Rng;

use crate::domain::customers::{
    CustomerState, GroupState, food_wait_from_greet_delay, gold_from_patience, sample_main_dish,
    sample_pre_item,
};
use crate::domain::geometry::{Vec2, dist};
use crate::domain::items::{
    ItemId, ItemKind, ItemSpot, PlayerId, StackId, Topping, Tray, TrayStage,
};
use crate::domain::layout::{StationId, StationKind};
use crate::domain::stations::{DispenseRun, OvenSlot, SinkSlot};
use crate::domain::tuning::{
    EAT_TIME_MAX, EAT_TIME_MIN, FOOD_WAIT_MAX, INTERACT_DIST, ORDER_TAKE_TIME, PRE_BONUS_WAIT,
    PRE_EAT_TIME_MAX, PRE_EAT_TIME_MIN, WRONG_DISH_WAIT_PENALTY,
};
use crate::use_cases::game::GameInstance;
use crate::use_cases::room::Player;

/// Resolves one interact press for `actor`. The caller has already verified
/// phase, pause state, connection and the rate limit.
pub fn perform_action(
    game: &mut GameInstance,
    players: &mut [Player],
    actor: PlayerId,
) -> Option<String> {
    let actor_idx = players.iter().position(|p| p.id == actor)?;
    let (px, py) = (players[actor_idx].x, players[actor_idx].y);

    if let Some((t, s)) = nearest_interesting_seat(game, px, py) {
        return seat_action(game, players, actor_idx, t, s);
    }

    let station = game
        .layout
        .stations
        .iter()
        .map(|st| (st.rect.distance_to(px, py), st))
        .filter(|(d, _)| *d <= INTERACT_DIST)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, st)| (st.id, st.kind, st.gives));
    if let Some((id, kind, gives)) = station {
        return match kind {
            StationKind::Bin => bin_action(game, players, actor_idx, gives),
            StationKind::Dispenser => dispenser_action(game, players, actor_idx, id),
            StationKind::Oven => oven_action(game, players, actor_idx),
            StationKind::Sink => sink_action(game, players, actor_idx),
            StationKind::Trash => trash_action(game, players, actor_idx),
            StationKind::Plate => {
                let stack = if id == StationId::PlateHome {
                    StackId::Home
                } else {
                    StackId::Service
                };
                counter_action(game, players, actor_idx, Counter::Stack(stack))
            }
            StationKind::Center => counter_action(game, players, actor_idx, Counter::Center),
        };
    }

    floor_pickup(game, players, actor_idx)
}

// ---------------------------------------------------------------------------
// Seats

/// Nearest seat (by plate spot) within reach that has a diner or an item.
fn nearest_interesting_seat(game: &GameInstance, px: f32, py: f32) -> Option<(usize, usize)> {
    let mut best: Option<(f32, usize, usize)> = None;
    for (t, table) in game.layout.tables.iter().enumerate() {
        for (s, seat) in table.seats.iter().enumerate() {
            let d = dist(px, py, seat.plate_x, seat.plate_y);
            if d > INTERACT_DIST {
                continue;
            }
            let has_item = game.table_seats[t][s].is_some();
            let has_diner = seated_customer(game, t, s).is_some();
            if !has_item && !has_diner {
                continue;
            }
            if best.is_none_or(|(bd, _, _)| d < bd) {
                best = Some((d, t, s));
            }
        }
    }
    best.map(|(_, t, s)| (t, s))
}

fn seated_customer(game: &GameInstance, t: usize, s: usize) -> Option<usize> {
    game.customers.iter().position(|c| {
        c.table_index == t
            && c.seat_index == s
            && !matches!(c.state, CustomerState::Walking | CustomerState::Leaving)
    })
}

fn seat_action(
    game: &mut GameInstance,
    players: &mut [Player],
    actor_idx: usize,
    t: usize,
    s: usize,
) -> Option<String> {
    let diner = seated_customer(game, t, s);

    if let Some(ci) = diner {
        match game.customers[ci].state {
            CustomerState::AwaitOrder if !game.customers[ci].accepted => {
                return take_order(game, ci);
            }
            CustomerState::AwaitOrderMain => {
                return take_main_order(game, ci);
            }
            _ => {}
        }
    }

    let held = players[actor_idx].held;
    let seat_item = game.table_seats[t][s];

    if held.is_none() {
        if let Some(iid) = seat_item {
            let eating = diner
                .is_some_and(|ci| game.customers[ci].state == CustomerState::Eating);
            if eating {
                return Some("They're still eating".to_string());
            }
            game.table_seats[t][s] = None;
            pick_up(game, &mut players[actor_idx], iid);
            return None;
        }
        return Some("Nothing to do here".to_string());
    }

    if let (Some(hid), Some(ci)) = (held, diner) {
        let waiting = game.customers[ci].is_waiting_for_food();
        if waiting && seat_item.is_none() {
            return serve(game, players, actor_idx, hid, ci, t, s);
        }
        if waiting {
            return Some("Clear their spot first".to_string());
        }
    }
    Some("Nothing to do here".to_string())
}

fn take_order(game: &mut GameInstance, ci: usize) -> Option<String> {
    let gid = game.customers[ci].group_id;
    if !game.groups.get(&gid).is_some_and(|g| g.greet_active) {
        return Some("Wait for customers to sit first".to_string());
    }

    let mut rng = rand::thread_rng();
    let pre = sample_pre_item(&mut rng);
    {
        let c = &mut game.customers[ci];
        c.accepted = true;
        c.pre = pre;
        match pre {
            // Starters are eaten first; the main dish gets ordered at the
            // seat afterwards.
            Some(p) => {
                c.main_dish = None;
                c.dish = Some(p);
            }
            None => {
                let main = sample_main_dish(&mut rng);
                c.main_dish = Some(main);
                c.dish = Some(main);
            }
        }
    }

    let g = game.groups.get_mut(&gid)?;
    g.accepted_count += 1;
    if g.accepted_count < g.size {
        return Some("Order taken".to_string());
    }

    // Last order in: the whole table's wait starts now, sized by how long
    // the greeting took.
    let greet_elapsed = (g.greet_total - g.greet_left).clamp(0.0, g.greet_total);
    let wait = food_wait_from_greet_delay(greet_elapsed).round();
    g.state = GroupState::WaitingFood;
    g.greet_active = false;
    for c in game
        .customers
        .iter_mut()
        .filter(|c| c.group_id == gid && c.state == CustomerState::AwaitOrder)
    {
        if c.pre.is_some() {
            c.state = CustomerState::WaitingPre;
            c.patience_total = Some(FOOD_WAIT_MAX);
            c.patience_left = Some(FOOD_WAIT_MAX);
        } else {
            c.state = CustomerState::WaitingFood;
            c.patience_total = Some(wait);
            c.patience_left = Some(wait);
        }
    }
    Some("Order taken".to_string())
}

fn take_main_order(game: &mut GameInstance, ci: usize) -> Option<String> {
    let main = match game.customers[ci].main_dish {
        Some(main) => main,
        None => sample_main_dish(&mut rand::thread_rng()),
    };
    let c = &mut game.customers[ci];
    let elapsed = c.main_greet_total.unwrap_or(ORDER_TAKE_TIME)
        - c.main_greet_left.unwrap_or(0.0);
    let mut wait = food_wait_from_greet_delay(elapsed).round();
    if c.pre_served {
        wait += PRE_BONUS_WAIT;
    }
    c.state = CustomerState::WaitingFood;
    c.main_dish = Some(main);
    c.dish = Some(main);
    c.patience_total = Some(wait);
    c.patience_left = Some(wait);
    c.main_greet_left = None;
    c.main_greet_total = None;
    Some("Order taken".to_string())
}

fn serve(
    game: &mut GameInstance,
    players: &mut [Player],
    actor_idx: usize,
    hid: ItemId,
    ci: usize,
    t: usize,
    s: usize,
) -> Option<String> {
    // A burnt pizza still counts as an offered dish so it runs through the
    // wrong-dish penalty below instead of a free refusal.
    let served_dish = {
        let it = game.items.get(hid)?;
        match it.kind {
            ItemKind::Plate => it.plate.dish,
            other => other.as_dish(),
        }
    };
    let Some(served_dish) = served_dish else {
        return Some("They won't eat that".to_string());
    };

    let expected = game.customers[ci].dish;
    if Some(served_dish) != expected {
        let c = &mut game.customers[ci];
        if !c.wrong_penalty_used {
            c.wrong_penalty_used = true;
            if let Some(left) = c.patience_left.as_mut() {
                *left = (*left - WRONG_DISH_WAIT_PENALTY).max(0.0);
            }
        }
        return Some("That's not what they ordered".to_string());
    }

    let seat = game.layout.tables[t].seats[s];
    players[actor_idx].held = None;
    if let Some(it) = game.items.get_mut(hid) {
        it.spot = ItemSpot::TableSeat(t, s);
        it.x = seat.plate_x;
        it.y = seat.plate_y;
    }
    game.table_seats[t][s] = Some(hid);

    let mut rng = rand::thread_rng();
    let c = &mut game.customers[ci];
    match c.state {
        CustomerState::WaitingPre => {
            c.state = CustomerState::Eating;
            c.eating_kind = Some(crate::domain::customers::EatingKind::Pre);
            c.eat_left = rng.gen_range(PRE_EAT_TIME_MIN..=PRE_EAT_TIME_MAX);
        }
        _ => {
            // Pay is locked in at serve time; it lands on the score when the
            // plate is finished.
            c.pay = gold_from_patience(
                c.patience_total.unwrap_or(FOOD_WAIT_MAX),
                c.patience_left.unwrap_or(0.0),
            );
            c.served = true;
            c.state = CustomerState::Eating;
            c.eating_kind = Some(crate::domain::customers::EatingKind::Main);
            c.eat_left = rng.gen_range(EAT_TIME_MIN..=EAT_TIME_MAX);
        }
    }
    Some("Served!".to_string())
}

// ---------------------------------------------------------------------------
// Counters (main table and plate shelves)

#[derive(Clone, Copy)]
enum Counter {
    Center,
    Stack(StackId),
}

impl Counter {
    fn spot(self, slot: usize) -> ItemSpot {
        match self {
            Self::Center => ItemSpot::CenterSlot(slot),
            Self::Stack(id) => ItemSpot::PlateStack(id, slot),
        }
    }
}

fn counter_centers(game: &GameInstance, counter: Counter) -> Vec<Vec2> {
    match counter {
        Counter::Center => game.center_slot_centers.clone(),
        Counter::Stack(StackId::Home) => game.home_stack.centers.clone(),
        Counter::Stack(StackId::Service) => game.service_stack.centers.clone(),
    }
}

fn counter_slot(game: &GameInstance, counter: Counter, si: usize) -> Option<ItemId> {
    match counter {
        Counter::Center => game.center_slots[si],
        Counter::Stack(StackId::Home) => game.home_stack.slots[si],
        Counter::Stack(StackId::Service) => game.service_stack.slots[si],
    }
}

fn set_counter_slot(game: &mut GameInstance, counter: Counter, si: usize, v: Option<ItemId>) {
    match counter {
        Counter::Center => game.center_slots[si] = v,
        Counter::Stack(StackId::Home) => game.home_stack.slots[si] = v,
        Counter::Stack(StackId::Service) => game.service_stack.slots[si] = v,
    }
}

fn nearest_slot(centers: &[Vec2], px: f32, py: f32) -> Option<usize> {
    centers
        .iter()
        .enumerate()
        .min_by(|a, b| dist(px, py, a.1.x, a.1.y).total_cmp(&dist(px, py, b.1.x, b.1.y)))
        .map(|(i, _)| i)
}

fn counter_action(
    game: &mut GameInstance,
    players: &mut [Player],
    actor_idx: usize,
    counter: Counter,
) -> Option<String> {
    let (px, py) = (players[actor_idx].x, players[actor_idx].y);
    let centers = counter_centers(game, counter);
    let si = nearest_slot(&centers, px, py)?;
    let center = centers[si];
    let held = players[actor_idx].held;

    let Some(sid) = counter_slot(game, counter, si) else {
        // Empty slot: put whatever is carried down.
        let Some(hid) = held else {
            return Some("Nothing there".to_string());
        };
        players[actor_idx].held = None;
        place_item(game, hid, counter.spot(si), center);
        set_counter_slot(game, counter, si, Some(hid));
        return None;
    };

    let Some(hid) = held else {
        set_counter_slot(game, counter, si, None);
        pick_up(game, &mut players[actor_idx], sid);
        return None;
    };

    let held_kind = game.items.get(hid)?.kind;
    let slot_kind = game.items.get(sid)?.kind;

    // Topping in hand: dress the pizza (or the build on a plate) in the slot.
    if let Some(topping) = held_kind.topping() {
        return apply_topping(game, players, actor_idx, hid, sid, slot_kind, topping);
    }

    // Pizza in hand onto a plate in the slot.
    if matches!(held_kind, ItemKind::PizzaBase | ItemKind::RawPizza)
        && slot_kind == ItemKind::Plate
    {
        return merge_pizza_onto_plate(game, players, actor_idx, hid, sid);
    }

    // Plate in hand catches a pizza from the slot.
    if held_kind == ItemKind::Plate && slot_kind.is_pizza() {
        return catch_pizza_with_plate(game, hid, sid, counter, si);
    }

    Some("Slot occupied".to_string())
}

fn apply_topping(
    game: &mut GameInstance,
    players: &mut [Player],
    actor_idx: usize,
    hid: ItemId,
    sid: ItemId,
    slot_kind: ItemKind,
    topping: Topping,
) -> Option<String> {
    let applied = if matches!(slot_kind, ItemKind::PizzaBase | ItemKind::RawPizza) {
        let it = game.items.get_mut(sid)?;
        if !it.toppings.add(topping) {
            return Some("Already on it".to_string());
        }
        it.kind = ItemKind::RawPizza;
        true
    } else if slot_kind == ItemKind::Plate {
        let it = game.items.get_mut(sid)?;
        match it.plate.tray.as_mut() {
            Some(tray) => {
                if !tray.toppings.add(topping) {
                    return Some("Already on it".to_string());
                }
                tray.stage = TrayStage::Raw;
                true
            }
            None => return Some("No pizza to top".to_string()),
        }
    } else {
        false
    };

    if !applied {
        return Some("Can't top that".to_string());
    }
    players[actor_idx].held = None;
    game.items.remove(hid);
    None
}

fn merge_pizza_onto_plate(
    game: &mut GameInstance,
    players: &mut [Player],
    actor_idx: usize,
    hid: ItemId,
    sid: ItemId,
) -> Option<String> {
    let plate = game.items.get(sid)?.plate;
    if plate.dirty {
        return Some("Wash the plate first".to_string());
    }
    if !plate.is_empty() {
        return Some("Plate already loaded".to_string());
    }
    let (kind, toppings) = {
        let it = game.items.get(hid)?;
        (it.kind, it.toppings)
    };
    let tray = Tray::from_pizza(kind, toppings);
    game.items.get_mut(sid)?.plate.tray = Some(tray);
    players[actor_idx].held = None;
    game.items.remove(hid);
    None
}

fn catch_pizza_with_plate(
    game: &mut GameInstance,
    hid: ItemId,
    sid: ItemId,
    counter: Counter,
    si: usize,
) -> Option<String> {
    let plate = game.items.get(hid)?.plate;
    if plate.dirty {
        return Some("Wash the plate first".to_string());
    }
    if !plate.is_empty() {
        return Some("Plate already loaded".to_string());
    }
    let (kind, toppings) = {
        let it = game.items.get(sid)?;
        (it.kind, it.toppings)
    };
    {
        let held_plate = &mut game.items.get_mut(hid)?.plate;
        if matches!(kind, ItemKind::PizzaBase | ItemKind::RawPizza) {
            held_plate.tray = Some(Tray::from_pizza(kind, toppings));
        } else {
            held_plate.dish = Some(kind);
        }
    }
    set_counter_slot(game, counter, si, None);
    game.items.remove(sid);
    None
}

// ---------------------------------------------------------------------------
// Single-purpose stations

fn bin_action(
    game: &mut GameInstance,
    players: &mut [Player],
    actor_idx: usize,
    gives: Option<ItemKind>,
) -> Option<String> {
    let p = &mut players[actor_idx];
    if p.held.is_some() {
        return Some("Hands full!".to_string());
    }
    let kind = gives?;
    let id = game.items.spawn(kind, p.x, p.y, ItemSpot::Held(p.id));
    p.held = Some(id);
    None
}

fn dispenser_action(
    game: &mut GameInstance,
    players: &mut [Player],
    actor_idx: usize,
    station: StationId,
) -> Option<String> {
    let p = &players[actor_idx];
    if p.held.is_some() {
        return Some("Hands full!".to_string());
    }
    let pid = p.id;
    let (_, disp) = game.dispensers.iter_mut().find(|(sid, _)| *sid == station)?;
    if let Some(run) = disp.run {
        return Some(if run.by == pid {
            "Dispensing...".to_string()
        } else {
            "Machine busy".to_string()
        });
    }
    disp.run = Some(DispenseRun { by: pid, elapsed: 0.0 });
    Some("Dispensing...".to_string())
}

fn trash_action(
    game: &mut GameInstance,
    players: &mut [Player],
    actor_idx: usize,
) -> Option<String> {
    let Some(hid) = players[actor_idx].held else {
        return Some("Nothing to toss".to_string());
    };
    let kind = game.items.get(hid)?.kind;
    if kind != ItemKind::Plate {
        players[actor_idx].held = None;
        game.items.remove(hid);
        return Some("Thrown away".to_string());
    }
    let it = game.items.get_mut(hid)?;
    if it.plate.is_empty() {
        return Some(if it.plate.dirty {
            "Wash it instead".to_string()
        } else {
            "Plate is empty".to_string()
        });
    }
    it.plate.clear_contents();
    Some("Scraped into the trash".to_string())
}

fn sink_action(
    game: &mut GameInstance,
    players: &mut [Player],
    actor_idx: usize,
) -> Option<String> {
    let (px, py, pid) = {
        let p = &players[actor_idx];
        (p.x, p.y, p.id)
    };
    let si = nearest_slot(&game.sink_slot_centers, px, py)?;
    let center = game.sink_slot_centers[si];

    let Some(hid) = players[actor_idx].held else {
        return match game.sink_slots[si] {
            SinkSlot::Empty => Some("Nothing to wash".to_string()),
            SinkSlot::Occupied { washer: Some(_), .. } => Some("Washing...".to_string()),
            SinkSlot::Occupied { item, .. } => {
                let dirty = game.items.get(item).is_some_and(|it| it.plate.dirty);
                if dirty {
                    game.sink_slots[si] =
                        SinkSlot::Occupied { item, elapsed: 0.0, washer: Some(pid) };
                    Some("Washing...".to_string())
                } else {
                    game.sink_slots[si] = SinkSlot::Empty;
                    pick_up(game, &mut players[actor_idx], item);
                    None
                }
            }
        };
    };

    if !matches!(game.sink_slots[si], SinkSlot::Empty) {
        return Some("Sink slot taken".to_string());
    }
    let it = game.items.get(hid)?;
    if it.kind != ItemKind::Plate {
        return Some("Only plates go in the sink".to_string());
    }
    // Loaded plates may be parked here; only a dirty empty plate starts
    // washing immediately under its depositor.
    let start_wash = it.plate.dirty && it.plate.is_empty();
    players[actor_idx].held = None;
    place_item(game, hid, ItemSpot::SinkSlot(si), center);
    game.sink_slots[si] = SinkSlot::Occupied {
        item: hid,
        elapsed: 0.0,
        washer: if start_wash { Some(pid) } else { None },
    };
    None
}

fn oven_action(
    game: &mut GameInstance,
    players: &mut [Player],
    actor_idx: usize,
) -> Option<String> {
    let (px, py) = (players[actor_idx].x, players[actor_idx].y);
    let si = nearest_slot(&game.oven_slot_centers, px, py)?;
    let center = game.oven_slot_centers[si];
    let held = players[actor_idx].held;

    if let OvenSlot::Occupied { item: oid, .. } = game.oven_slots[si] {
        // Taking out of the oven always needs an empty clean plate.
        let Some(hid) = held else {
            return Some("Need an empty plate".to_string());
        };
        let plate_ok = game
            .items
            .get(hid)
            .is_some_and(|it| it.kind == ItemKind::Plate && it.plate.is_empty() && !it.plate.dirty);
        if !plate_ok {
            return Some("Need an empty clean plate".to_string());
        }
        let (kind, toppings) = {
            let it = game.items.get(oid)?;
            (it.kind, it.toppings)
        };
        {
            let plate = &mut game.items.get_mut(hid)?.plate;
            if kind == ItemKind::RawPizza {
                // Pulled early: the unfinished pizza rides the plate back to
                // the counter.
                plate.tray = Some(Tray { stage: TrayStage::Raw, toppings });
            } else {
                plate.dish = Some(kind);
            }
        }
        game.oven_slots[si] = OvenSlot::Empty;
        game.items.remove(oid);
        return None;
    }

    let Some(hid) = held else {
        return Some("Oven is empty".to_string());
    };
    let (kind, toppings, tray) = {
        let it = game.items.get(hid)?;
        (it.kind, it.toppings, it.plate.tray)
    };
    match kind {
        ItemKind::Plate => {
            let Some(tray) = tray else {
                return Some("Nothing to bake".to_string());
            };
            if tray.stage != TrayStage::Raw || !tray.toppings.any() {
                return Some("Add a topping first".to_string());
            }
            let raw = game
                .items
                .spawn(ItemKind::RawPizza, center.x, center.y, ItemSpot::OvenSlot(si));
            game.items.get_mut(raw)?.toppings = tray.toppings;
            game.items.get_mut(hid)?.plate.tray = None;
            game.oven_slots[si] = OvenSlot::Occupied { item: raw, elapsed: 0.0 };
            None
        }
        ItemKind::RawPizza if toppings.any() => {
            players[actor_idx].held = None;
            place_item(game, hid, ItemSpot::OvenSlot(si), center);
            game.oven_slots[si] = OvenSlot::Occupied { item: hid, elapsed: 0.0 };
            None
        }
        ItemKind::PizzaBase | ItemKind::RawPizza => Some("Add a topping first".to_string()),
        _ => Some("That doesn't bake".to_string()),
    }
}

fn floor_pickup(
    game: &mut GameInstance,
    players: &mut [Player],
    actor_idx: usize,
) -> Option<String> {
    if players[actor_idx].held.is_some() {
        return None;
    }
    let (px, py) = (players[actor_idx].x, players[actor_idx].y);
    let nearest = game
        .items
        .iter()
        .filter(|it| it.spot == ItemSpot::Floor)
        .map(|it| (dist(px, py, it.x, it.y), it.id))
        .filter(|(d, _)| *d <= INTERACT_DIST)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, id)| id);
    let iid = nearest?;
    pick_up(game, &mut players[actor_idx], iid);
    None
}

// ---------------------------------------------------------------------------

fn pick_up(game: &mut GameInstance, player: &mut Player, iid: ItemId) {
    if let Some(it) = game.items.get_mut(iid) {
        it.spot = ItemSpot::Held(player.id);
        it.x = player.x;
        it.y = player.y;
    }
    player.held = Some(iid);
}

fn place_item(game: &mut GameInstance, iid: ItemId, spot: ItemSpot, at: Vec2) {
    if let Some(it) = game.items.get_mut(iid) {
        it.spot = spot;
        it.x = at.x;
        it.y = at.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customers::{Customer, Group};
    use crate::domain::layout::StationId;
    use crate::domain::tuning::difficulty_for;
    use crate::use_cases::game::GameInstance;

    fn setup(locked: u8) -> (GameInstance, Vec<Player>) {
        let game = GameInstance::new(locked, difficulty_for(locked));
        let players = (0..locked as u64)
            .map(|i| Player::new(i + 1, format!("p{i}"), 250.0, 330.0))
            .collect();
        (game, players)
    }

    fn move_to_station(game: &GameInstance, p: &mut Player, id: StationId) {
        let r = game.layout.station(id).unwrap().rect;
        p.x = r.x + r.w / 2.0;
        p.y = r.y + r.h + 20.0;
    }

    fn seat_diner(game: &mut GameInstance, t: usize, s: usize) -> u64 {
        let gid = game.next_id();
        let mut group = Group::new(gid, t, 1);
        group.state = crate::domain::customers::GroupState::AwaitOrder;
        group.greet_active = true;
        let cid = game.next_id();
        let chair = game.layout.tables[t].seats[s];
        let mut c = Customer::new(cid, &group, s, (chair.chair_x, chair.chair_y), (chair.chair_x, chair.chair_y));
        c.state = CustomerState::AwaitOrder;
        group.member_ids.push(cid);
        game.groups.insert(gid, group);
        game.table_group[t] = Some(gid);
        game.customers.push(c);
        cid
    }

    fn stand_at_seat(game: &GameInstance, p: &mut Player, t: usize, s: usize) {
        let seat = game.layout.tables[t].seats[s];
        p.x = seat.plate_x + 5.0;
        p.y = seat.plate_y;
    }

    #[test]
    fn bin_fills_empty_hands_only() {
        let (mut game, mut players) = setup(2);
        move_to_station(&game, &mut players[0], StationId::BinCheese);

        assert!(perform_action(&mut game, &mut players, 1).is_none());
        let held = players[0].held.unwrap();
        assert_eq!(game.items.get(held).unwrap().kind, ItemKind::Cheese);

        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "Hands full!");
    }

    #[test]
    fn counter_place_and_take_back_round_trips() {
        let (mut game, mut players) = setup(2);
        move_to_station(&game, &mut players[0], StationId::BinBase);
        perform_action(&mut game, &mut players, 1);
        let base = players[0].held.unwrap();

        move_to_station(&game, &mut players[0], StationId::Center);
        perform_action(&mut game, &mut players, 1);
        assert!(players[0].held.is_none());
        let si = game
            .center_slots
            .iter()
            .position(|s| *s == Some(base))
            .expect("placed in a slot");
        let spot = game.items.get(base).unwrap().spot;
        assert_eq!(spot, ItemSpot::CenterSlot(si));

        // Same spot, same slot: the action takes the item straight back.
        perform_action(&mut game, &mut players, 1);
        assert_eq!(players[0].held, Some(base));
        assert!(game.center_slots[si].is_none());
    }

    #[test]
    fn topping_a_base_makes_it_raw_and_consumes_the_topping() {
        let (mut game, mut players) = setup(2);
        let si = 1;
        let base = game.items.spawn(
            ItemKind::PizzaBase,
            game.center_slot_centers[si].x,
            game.center_slot_centers[si].y,
            ItemSpot::CenterSlot(si),
        );
        game.center_slots[si] = Some(base);

        let cheese = game.items.spawn(ItemKind::Cheese, 0.0, 0.0, ItemSpot::Held(1));
        players[0].held = Some(cheese);
        players[0].x = game.center_slot_centers[si].x;
        players[0].y = game.center_slot_centers[si].y + 50.0;

        assert!(perform_action(&mut game, &mut players, 1).is_none());
        assert!(players[0].held.is_none());
        assert!(!game.items.contains(cheese));
        let it = game.items.get(base).unwrap();
        assert_eq!(it.kind, ItemKind::RawPizza);
        assert!(it.toppings.cheese);
    }

    #[test]
    fn double_topping_is_refused() {
        let (mut game, mut players) = setup(2);
        let si = 0;
        let raw = game.items.spawn(
            ItemKind::RawPizza,
            game.center_slot_centers[si].x,
            game.center_slot_centers[si].y,
            ItemSpot::CenterSlot(si),
        );
        game.items.get_mut(raw).unwrap().toppings.cheese = true;
        game.center_slots[si] = Some(raw);

        let cheese = game.items.spawn(ItemKind::Cheese, 0.0, 0.0, ItemSpot::Held(1));
        players[0].held = Some(cheese);
        players[0].x = game.center_slot_centers[si].x;
        players[0].y = game.center_slot_centers[si].y + 50.0;

        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "Already on it");
        // Refusal keeps the topping in hand.
        assert_eq!(players[0].held, Some(cheese));
    }

    #[test]
    fn dirty_plate_refuses_a_pizza() {
        let (mut game, mut players) = setup(2);
        let si = 0;
        let plate = game.items.spawn(
            ItemKind::Plate,
            game.center_slot_centers[si].x,
            game.center_slot_centers[si].y,
            ItemSpot::CenterSlot(si),
        );
        game.items.get_mut(plate).unwrap().plate.dirty = true;
        game.center_slots[si] = Some(plate);

        let raw = game.items.spawn(ItemKind::RawPizza, 0.0, 0.0, ItemSpot::Held(1));
        game.items.get_mut(raw).unwrap().toppings.cheese = true;
        players[0].held = Some(raw);
        players[0].x = game.center_slot_centers[si].x;
        players[0].y = game.center_slot_centers[si].y + 50.0;

        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "Wash the plate first");
        assert_eq!(players[0].held, Some(raw));
    }

    #[test]
    fn held_plate_catches_a_counter_pizza() {
        let (mut game, mut players) = setup(2);
        let si = 0;
        let raw = game.items.spawn(
            ItemKind::RawPizza,
            game.center_slot_centers[si].x,
            game.center_slot_centers[si].y,
            ItemSpot::CenterSlot(si),
        );
        game.items.get_mut(raw).unwrap().toppings.sausage = true;
        game.center_slots[si] = Some(raw);

        let plate = game.items.spawn(ItemKind::Plate, 0.0, 0.0, ItemSpot::Held(1));
        players[0].held = Some(plate);
        players[0].x = game.center_slot_centers[si].x;
        players[0].y = game.center_slot_centers[si].y + 50.0;

        assert!(perform_action(&mut game, &mut players, 1).is_none());
        assert!(game.center_slots[si].is_none());
        assert!(!game.items.contains(raw));
        let tray = game.items.get(plate).unwrap().plate.tray.unwrap();
        assert_eq!(tray.stage, TrayStage::Raw);
        assert!(tray.toppings.sausage);
    }

    #[test]
    fn oven_loads_from_a_plate_tray_and_unloads_onto_a_plate() {
        let (mut game, mut players) = setup(2);
        let plate = game.items.spawn(ItemKind::Plate, 0.0, 0.0, ItemSpot::Held(1));
        game.items.get_mut(plate).unwrap().plate.tray = Some(Tray {
            stage: TrayStage::Raw,
            toppings: crate::domain::items::Toppings { cheese: true, sausage: false },
        });
        players[0].held = Some(plate);
        move_to_station(&game, &mut players[0], StationId::Oven);

        assert!(perform_action(&mut game, &mut players, 1).is_none());
        assert!(game.items.get(plate).unwrap().plate.tray.is_none());
        let si = game
            .oven_slots
            .iter()
            .position(|s| s.item().is_some())
            .unwrap();
        let baking = game.oven_slots[si].item().unwrap();
        assert_eq!(game.items.get(baking).unwrap().kind, ItemKind::RawPizza);

        // Bake to done, then pull it with the same (now empty) plate.
        let mut notes = Vec::new();
        crate::domain::stations::tick_oven(
            &mut game.oven_slots,
            &mut game.items,
            crate::domain::tuning::BAKE_TIME,
            &mut notes,
        );
        // Nearest slot must be the loaded one for the unload to find it.
        players[0].x = game.oven_slot_centers[si].x;
        players[0].y = game.oven_slot_centers[si].y + 60.0;
        assert!(perform_action(&mut game, &mut players, 1).is_none());
        assert!(game.oven_slots[si].item().is_none());
        assert_eq!(
            game.items.get(plate).unwrap().plate.dish,
            Some(ItemKind::CheesePizza)
        );
    }

    #[test]
    fn bare_base_is_refused_by_the_oven() {
        let (mut game, mut players) = setup(2);
        let base = game.items.spawn(ItemKind::PizzaBase, 0.0, 0.0, ItemSpot::Held(1));
        players[0].held = Some(base);
        move_to_station(&game, &mut players[0], StationId::Oven);

        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "Add a topping first");
        assert_eq!(players[0].held, Some(base));
    }

    #[test]
    fn dirty_plate_in_sink_starts_washing_immediately() {
        let (mut game, mut players) = setup(2);
        let plate = game.items.spawn(ItemKind::Plate, 0.0, 0.0, ItemSpot::Held(1));
        game.items.get_mut(plate).unwrap().plate.dirty = true;
        players[0].held = Some(plate);
        move_to_station(&game, &mut players[0], StationId::Sink);
        players[0].y -= 40.0;

        assert!(perform_action(&mut game, &mut players, 1).is_none());
        assert!(players[0].held.is_none());
        let slot = game
            .sink_slots
            .iter()
            .find(|s| s.item() == Some(plate))
            .unwrap();
        assert!(slot.is_washing());
    }

    #[test]
    fn loaded_plate_is_refused_by_the_sink() {
        let (mut game, mut players) = setup(2);
        let plate = game.items.spawn(ItemKind::Plate, 0.0, 0.0, ItemSpot::Held(1));
        game.items.get_mut(plate).unwrap().plate.dish = Some(ItemKind::CheesePizza);
        players[0].held = Some(plate);
        move_to_station(&game, &mut players[0], StationId::Sink);

        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "Scrape it first");
        assert_eq!(players[0].held, Some(plate));
    }

    #[test]
    fn trash_scrapes_a_loaded_plate_but_keeps_it() {
        let (mut game, mut players) = setup(2);
        let plate = game.items.spawn(ItemKind::Plate, 0.0, 0.0, ItemSpot::Held(1));
        game.items.get_mut(plate).unwrap().plate.dish = Some(ItemKind::BurntPizza);
        players[0].held = Some(plate);
        move_to_station(&game, &mut players[0], StationId::Trash);

        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "Scraped into the trash");
        assert_eq!(players[0].held, Some(plate));
        assert!(game.items.get(plate).unwrap().plate.is_empty());

        // Non-plates are destroyed outright.
        let cheese = game.items.spawn(ItemKind::Cheese, 0.0, 0.0, ItemSpot::Held(1));
        players[0].held = Some(cheese);
        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "Thrown away");
        assert!(players[0].held.is_none());
        assert!(!game.items.contains(cheese));
    }

    #[test]
    fn loaded_plates_can_be_parked_in_the_sink() {
        let (mut game, mut players) = setup(2);
        let plate = game.items.spawn(ItemKind::Plate, 0.0, 0.0, ItemSpot::Held(1));
        game.items.get_mut(plate).unwrap().plate.dish = Some(ItemKind::CheesePizza);
        players[0].held = Some(plate);
        move_to_station(&game, &mut players[0], StationId::Sink);

        assert!(perform_action(&mut game, &mut players, 1).is_none());
        assert!(players[0].held.is_none());
        let si = game
            .sink_slots
            .iter()
            .position(|s| matches!(s, SinkSlot::Occupied { item, .. } if *item == plate))
            .expect("plate parked in a sink slot");
        // Parked, not washing: the plate still has food on it.
        assert!(matches!(
            game.sink_slots[si],
            SinkSlot::Occupied { washer: None, .. }
        ));
        assert_eq!(game.items.get(plate).unwrap().spot, ItemSpot::SinkSlot(si));
    }

    #[test]
    fn taking_an_order_sets_patience_and_advances_the_group() {
        let (mut game, mut players) = setup(2);
        let cid = seat_diner(&mut game, 0, 0);
        let gid = game.customers[0].group_id;
        // 12s of the greet window already burned.
        game.groups.get_mut(&gid).unwrap().greet_left = 8.0;
        stand_at_seat(&game, &mut players[0], 0, 0);

        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "Order taken");
        let c = game.customers.iter().find(|c| c.id == cid).unwrap();
        assert!(c.accepted);
        assert!(c.is_waiting_for_food());
        assert!(c.dish.is_some());
        let total = c.patience_total.unwrap();
        if c.pre.is_some() {
            assert_eq!(total, FOOD_WAIT_MAX);
        } else {
            assert_eq!(total, food_wait_from_greet_delay(12.0).round());
        }
        let g = game.groups.get(&gid).unwrap();
        assert_eq!(g.accepted_count, 1);
        assert_eq!(g.state, GroupState::WaitingFood);
    }

    #[test]
    fn the_last_order_sets_one_wait_for_the_whole_table() {
        let (mut game, mut players) = setup(2);
        let gid = game.next_id();
        let mut group = Group::new(gid, 0, 2);
        group.state = GroupState::AwaitOrder;
        group.greet_active = true;
        let mut cids = Vec::new();
        for s in 0..2 {
            let cid = game.next_id();
            let chair = game.layout.tables[0].seats[s];
            let mut c = Customer::new(
                cid,
                &group,
                s,
                (chair.chair_x, chair.chair_y),
                (chair.chair_x, chair.chair_y),
            );
            c.state = CustomerState::AwaitOrder;
            group.member_ids.push(cid);
            cids.push(cid);
            game.customers.push(c);
        }
        game.table_group[0] = Some(gid);
        game.groups.insert(gid, group);

        // Seat 0 orders immediately. No patience may be locked in yet.
        stand_at_seat(&game, &mut players[0], 0, 0);
        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "Order taken");
        {
            let c = game.customers.iter_mut().find(|c| c.id == cids[0]).unwrap();
            assert!(c.accepted);
            assert_eq!(c.state, CustomerState::AwaitOrder);
            assert_eq!(c.patience_left, None);
            // Pin a plain main so the shared wait is observable below.
            c.pre = None;
            c.main_dish = Some(ItemKind::CheesePizza);
            c.dish = Some(ItemKind::CheesePizza);
        }
        assert_eq!(game.groups.get(&gid).unwrap().state, GroupState::AwaitOrder);

        // Seat 1 orders 18s into the greet; that delay prices everyone's wait.
        {
            let g = game.groups.get_mut(&gid).unwrap();
            g.greet_left = g.greet_total - 18.0;
        }
        stand_at_seat(&game, &mut players[0], 0, 1);
        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "Order taken");

        let shared = food_wait_from_greet_delay(18.0).round();
        let c0 = game.customers.iter().find(|c| c.id == cids[0]).unwrap();
        assert_eq!(c0.state, CustomerState::WaitingFood);
        assert_eq!(c0.patience_total, Some(shared));
        assert_eq!(c0.patience_left, Some(shared));
        let g = game.groups.get(&gid).unwrap();
        assert_eq!(g.state, GroupState::WaitingFood);
        assert!(!g.greet_active);
    }

    #[test]
    fn orders_wait_until_the_whole_party_is_seated() {
        let (mut game, mut players) = setup(2);
        let cid = seat_diner(&mut game, 0, 0);
        let gid = game.customers[0].group_id;
        {
            // One member is at the table but the rest are still walking in.
            let g = game.groups.get_mut(&gid).unwrap();
            g.state = GroupState::Arriving;
            g.greet_active = false;
        }
        stand_at_seat(&game, &mut players[0], 0, 0);

        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "Wait for customers to sit first");
        let c = game.customers.iter().find(|c| c.id == cid).unwrap();
        assert!(!c.accepted);
        assert_eq!(c.state, CustomerState::AwaitOrder);
        assert_eq!(game.groups.get(&gid).unwrap().accepted_count, 0);
    }

    #[test]
    fn taking_the_main_order_applies_the_starter_bonus() {
        let (mut game, mut players) = setup(2);
        let cid = seat_diner(&mut game, 0, 0);
        {
            let c = game.customers.iter_mut().find(|c| c.id == cid).unwrap();
            c.state = CustomerState::AwaitOrderMain;
            c.accepted = true;
            c.pre_served = true;
            c.main_dish = Some(ItemKind::SausagePizza);
            c.main_greet_total = Some(ORDER_TAKE_TIME);
            // Taken right away: 4s of the window burned.
            c.main_greet_left = Some(ORDER_TAKE_TIME - 4.0);
        }
        stand_at_seat(&game, &mut players[0], 0, 0);

        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "Order taken");
        let c = game.customers.iter().find(|c| c.id == cid).unwrap();
        assert_eq!(c.state, CustomerState::WaitingFood);
        assert_eq!(c.dish, Some(ItemKind::SausagePizza));
        assert!(c.main_greet_left.is_none());
        let want = food_wait_from_greet_delay(4.0).round() + PRE_BONUS_WAIT;
        assert_eq!(c.patience_total, Some(want));
    }

    #[test]
    fn wrong_dish_penalizes_patience_exactly_once() {
        let (mut game, mut players) = setup(2);
        let cid = seat_diner(&mut game, 0, 0);
        {
            let c = game.customers.iter_mut().find(|c| c.id == cid).unwrap();
            c.state = CustomerState::WaitingFood;
            c.accepted = true;
            c.dish = Some(ItemKind::CheesePizza);
            c.patience_total = Some(60.0);
            c.patience_left = Some(50.0);
        }
        let coke = game.items.spawn(ItemKind::Coke, 0.0, 0.0, ItemSpot::Held(1));
        players[0].held = Some(coke);
        stand_at_seat(&game, &mut players[0], 0, 0);

        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "That's not what they ordered");
        assert_eq!(players[0].held, Some(coke));
        let left = game.customers[0].patience_left.unwrap();
        assert_eq!(left, 50.0 - WRONG_DISH_WAIT_PENALTY);

        // Second mistake costs nothing further.
        perform_action(&mut game, &mut players, 1);
        assert_eq!(game.customers[0].patience_left.unwrap(), 50.0 - WRONG_DISH_WAIT_PENALTY);
    }

    #[test]
    fn correct_dish_locks_pay_and_starts_eating() {
        let (mut game, mut players) = setup(2);
        let cid = seat_diner(&mut game, 0, 0);
        {
            let c = game.customers.iter_mut().find(|c| c.id == cid).unwrap();
            c.state = CustomerState::WaitingFood;
            c.accepted = true;
            c.dish = Some(ItemKind::CheesePizza);
            c.patience_total = Some(60.0);
            c.patience_left = Some(60.0);
        }
        let plate = game.items.spawn(ItemKind::Plate, 0.0, 0.0, ItemSpot::Held(1));
        game.items.get_mut(plate).unwrap().plate.dish = Some(ItemKind::CheesePizza);
        players[0].held = Some(plate);
        stand_at_seat(&game, &mut players[0], 0, 0);

        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "Served!");
        assert!(players[0].held.is_none());
        let c = game.customers.iter().find(|c| c.id == cid).unwrap();
        assert_eq!(c.state, CustomerState::Eating);
        assert!(c.served);
        assert_eq!(c.pay, 40);
        assert_eq!(game.table_seats[0][0], Some(plate));
        assert_eq!(
            game.items.get(plate).unwrap().spot,
            ItemSpot::TableSeat(0, 0)
        );
    }

    #[test]
    fn burnt_pizza_counts_as_a_wrong_dish() {
        let (mut game, mut players) = setup(2);
        let cid = seat_diner(&mut game, 0, 0);
        {
            let c = game.customers.iter_mut().find(|c| c.id == cid).unwrap();
            c.state = CustomerState::WaitingFood;
            c.accepted = true;
            c.dish = Some(ItemKind::CheesePizza);
            c.patience_total = Some(60.0);
            c.patience_left = Some(60.0);
        }
        let plate = game.items.spawn(ItemKind::Plate, 0.0, 0.0, ItemSpot::Held(1));
        game.items.get_mut(plate).unwrap().plate.dish = Some(ItemKind::BurntPizza);
        players[0].held = Some(plate);
        stand_at_seat(&game, &mut players[0], 0, 0);

        let note = perform_action(&mut game, &mut players, 1).unwrap();
        assert_eq!(note, "That's not what they ordered");
        assert_eq!(players[0].held, Some(plate));
        let c = game.customers.iter().find(|c| c.id == cid).unwrap();
        assert!(c.wrong_penalty_used);
        assert_eq!(c.patience_left, Some(60.0 - WRONG_DISH_WAIT_PENALTY));
    }

    #[test]
    fn floor_items_can_be_recovered() {
        let (mut game, mut players) = setup(2);
        let plate = game.items.spawn(ItemKind::Plate, 250.0, 340.0, ItemSpot::Floor);
        players[0].x = 250.0;
        players[0].y = 330.0;

        assert!(perform_action(&mut game, &mut players, 1).is_none());
        assert_eq!(players[0].held, Some(plate));
        assert_eq!(game.items.get(plate).unwrap().spot, ItemSpot::Held(1));
    }
}
