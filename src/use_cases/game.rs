// The authoritative per-room simulation: one instance per started game,
// advanced by the shared scheduler task.

use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::domain::customers::{
    Customer, CustomerId, CustomerState, EatingKind, Group, GroupId, GroupState,
    sample_group_size,
};
use crate::domain::geometry::Vec2;
use crate::domain::items::{ItemId, ItemKind, ItemRegistry, ItemSpot, StackId};
use crate::domain::layout::{self, Layout, SEATS_PER_TABLE, StationId};
use crate::domain::movement::{Obstacles, separate_players, step_customer, step_player};
use crate::domain::stations::{Dispenser, OvenSlot, SinkSlot, tick_oven};
use crate::domain::tuning::{
    BELOW_MIN_PLAYERS_GRACE, CUSTOMER_ARRIVE_DIST, DISPENSE_TIME, Difficulty,
    HELD_ITEM_Y_OFFSET, INITIAL_CUSTOMER_SPAWN_DELAY, INITIAL_GROUP_MAX_SIZE, INTERACT_DIST,
    MAX_TICK_DT, MIN_PLAYERS, ORDER_TAKE_TIME, WASH_TIME, angry_leave_penalty_per_person,
    max_customers, oven_slot_count, third_table_spawn_chance,
};
use crate::use_cases::room::Player;
use crate::use_cases::types::EndInfo;

/// A shelf of counter slots with fixed world positions.
#[derive(Debug)]
pub struct PlateStack {
    pub slots: Vec<Option<ItemId>>,
    pub centers: Vec<Vec2>,
}

impl PlateStack {
    fn empty(centers: Vec<Vec2>) -> Self {
        Self {
            slots: vec![None; centers.len()],
            centers,
        }
    }
}

pub struct GameInstance {
    pub locked_count: u8,
    pub layout: Layout,
    pub difficulty: Difficulty,
    pub time_left: f32,
    pub score: u32,
    pub paused: bool,
    pub ended: bool,
    pub end_info: Option<EndInfo>,

    pub items: ItemRegistry,
    pub center_slots: Vec<Option<ItemId>>,
    pub center_slot_centers: Vec<Vec2>,
    pub home_stack: PlateStack,
    pub service_stack: PlateStack,
    pub oven_slots: Vec<OvenSlot>,
    pub oven_slot_centers: Vec<Vec2>,
    pub sink_slots: Vec<SinkSlot>,
    pub sink_slot_centers: Vec<Vec2>,
    pub dispensers: Vec<(StationId, Dispenser)>,
    /// Item resting in front of each seat, by table and seat index.
    pub table_seats: Vec<[Option<ItemId>; SEATS_PER_TABLE]>,
    /// Group currently holding each table.
    pub table_group: Vec<Option<GroupId>>,

    pub customers: Vec<Customer>,
    pub groups: HashMap<GroupId, Group>,
    customer_spawn_t: f32,
    spawned_groups: u64,
    /// Seconds spent continuously under the player minimum.
    pub below_min_for: f32,
    next_actor_id: u64,
    /// Seconds since the last snapshot broadcast; owned by the scheduler.
    pub snapshot_acc: f32,
}

impl GameInstance {
    pub fn new(locked_count: u8, difficulty: Difficulty) -> Self {
        let layout = layout::build(locked_count);
        let mut items = ItemRegistry::new();

        let center_slot_centers = layout
            .station(StationId::Center)
            .map(|s| layout::center_slot_centers(&s.rect))
            .unwrap_or_default();
        let home_centers = layout
            .station(StationId::PlateHome)
            .map(|s| layout::plate_stack_slot_centers(&s.rect, s.slot_count.unwrap_or(0)))
            .unwrap_or_default();
        let service_centers = layout
            .station(StationId::PlateService)
            .map(|s| layout::plate_stack_slot_centers(&s.rect, s.slot_count.unwrap_or(0)))
            .unwrap_or_default();
        let oven_slot_centers = layout
            .station(StationId::Oven)
            .map(|s| layout::row_slot_centers(&s.rect, s.slot_count.unwrap_or(0)))
            .unwrap_or_default();
        let sink_slot_centers = layout
            .station(StationId::Sink)
            .map(|s| layout::row_slot_centers(&s.rect, s.slot_count.unwrap_or(0)))
            .unwrap_or_default();

        // Every home-shelf slot starts with a clean plate.
        let mut home_stack = PlateStack::empty(home_centers);
        for (i, center) in home_stack.centers.clone().iter().enumerate() {
            let id = items.spawn(
                ItemKind::Plate,
                center.x,
                center.y,
                ItemSpot::PlateStack(StackId::Home, i),
            );
            home_stack.slots[i] = Some(id);
        }
        let service_stack = PlateStack::empty(service_centers);

        let table_count = layout.tables.len();
        Self {
            locked_count,
            layout,
            difficulty,
            time_left: difficulty.game_duration,
            score: 0,
            paused: false,
            ended: false,
            end_info: None,
            items,
            center_slots: vec![None; center_slot_centers.len()],
            center_slot_centers,
            home_stack,
            service_stack,
            oven_slots: vec![OvenSlot::Empty; oven_slot_count(locked_count)],
            oven_slot_centers,
            sink_slots: vec![SinkSlot::Empty; 2],
            sink_slot_centers,
            dispensers: vec![
                (StationId::CokePump, Dispenser::new(ItemKind::Coke)),
                (StationId::IceCreamMachine, Dispenser::new(ItemKind::IceCream)),
            ],
            table_seats: vec![[None; SEATS_PER_TABLE]; table_count],
            table_group: vec![None; table_count],
            customers: Vec::new(),
            groups: HashMap::new(),
            // First party shows up a few seconds in, then the difficulty
            // interval takes over.
            customer_spawn_t: difficulty.order_spawn_interval - INITIAL_CUSTOMER_SPAWN_DELAY,
            spawned_groups: 0,
            below_min_for: 0.0,
            next_actor_id: 0,
            snapshot_acc: 0.0,
        }
    }

    pub fn next_id(&mut self) -> u64 {
        self.next_actor_id += 1;
        self.next_actor_id
    }

    /// Advances the whole simulation by one step. Room-wide notices are
    /// appended to `notes`.
    pub fn update(&mut self, players: &mut [Player], dt: f32, notes: &mut Vec<String>) {
        if self.ended {
            return;
        }
        let dt = dt.min(MAX_TICK_DT);
        if self.paused {
            return;
        }

        let connected = players.iter().filter(|p| p.connected).count();
        if connected < MIN_PLAYERS {
            self.below_min_for += dt;
            if self.below_min_for >= BELOW_MIN_PLAYERS_GRACE {
                self.end(false, "Not enough players");
                return;
            }
        } else {
            self.below_min_for = 0.0;
        }

        self.time_left = (self.time_left - dt).max(0.0);

        tick_oven(&mut self.oven_slots, &mut self.items, dt, notes);
        self.tick_sinks(players, dt, notes);
        self.tick_dispensers(players, dt, notes);
        self.tick_spawner(dt);
        self.tick_groups(dt, notes);
        self.tick_customers(dt);
        self.move_players(players, dt);
        self.carry_held_items(players);
        self.check_end();
    }

    pub fn end(&mut self, win: bool, reason: &str) {
        self.ended = true;
        self.end_info = Some(EndInfo {
            win,
            reason: reason.to_string(),
            score: self.score,
            target: self.difficulty.target_score,
        });
    }

    fn check_end(&mut self) {
        if self.score >= self.difficulty.target_score {
            self.end(true, "Target reached");
        } else if self.time_left <= 0.0 {
            self.end(false, "Time up");
        }
    }

    /// Washing needs the assigned player to stay at the sink; walking away
    /// (or dropping) loses all progress on that plate.
    fn tick_sinks(&mut self, players: &[Player], dt: f32, notes: &mut Vec<String>) {
        let Some(sink_rect) = self.layout.station(StationId::Sink).map(|s| s.rect) else {
            return;
        };
        for slot in &mut self.sink_slots {
            let SinkSlot::Occupied { item, elapsed, washer } = slot else {
                continue;
            };
            let Some(pid) = *washer else {
                continue;
            };
            let attending = players
                .iter()
                .find(|p| p.id == pid)
                .is_some_and(|p| p.connected && sink_rect.is_near(p.x, p.y, INTERACT_DIST));
            if !attending {
                *washer = None;
                *elapsed = 0.0;
                continue;
            }
            *elapsed += dt;
            if *elapsed >= WASH_TIME {
                *elapsed = WASH_TIME;
                *washer = None;
                if let Some(it) = self.items.get_mut(*item) {
                    it.plate.dirty = false;
                }
                notes.push("Plate washed".to_string());
            }
        }
    }

    /// Same attendance rule as the sink, and the player's hands must stay
    /// free to receive the item.
    fn tick_dispensers(&mut self, players: &mut [Player], dt: f32, notes: &mut Vec<String>) {
        for (sid, disp) in &mut self.dispensers {
            let Some(mut run) = disp.run else {
                continue;
            };
            let Some(rect) = self.layout.station(*sid).map(|s| s.rect) else {
                disp.run = None;
                continue;
            };
            let attending = players
                .iter()
                .find(|p| p.id == run.by)
                .is_some_and(|p| {
                    p.connected && p.held.is_none() && rect.is_near(p.x, p.y, INTERACT_DIST)
                });
            if !attending {
                disp.run = None;
                continue;
            }
            run.elapsed += dt;
            if run.elapsed < DISPENSE_TIME {
                disp.run = Some(run);
                continue;
            }
            disp.run = None;
            if let Some(p) = players.iter_mut().find(|p| p.id == run.by) {
                let id = self.items.spawn(
                    disp.gives,
                    p.x,
                    p.y - HELD_ITEM_Y_OFFSET,
                    ItemSpot::Held(p.id),
                );
                p.held = Some(id);
                notes.push(format!("{} ready", disp.gives.label()));
            }
        }
    }

    fn tick_spawner(&mut self, dt: f32) {
        self.customer_spawn_t += dt;
        if self.customer_spawn_t < self.difficulty.order_spawn_interval {
            return;
        }
        self.customer_spawn_t = 0.0;

        let mut rng = rand::thread_rng();
        let cap = max_customers(self.locked_count);
        if self.customers.len() >= cap {
            return;
        }
        let remaining = cap - self.customers.len();

        let occupied = self.table_group.iter().filter(|g| g.is_some()).count();
        if occupied >= self.layout.tables.len() {
            return;
        }
        // The last free table only fills on a difficulty-scaled roll, so the
        // room is not permanently slammed.
        if occupied >= 2 && rng.gen_range(0.0..1.0) > third_table_spawn_chance(self.locked_count) {
            return;
        }

        let free: Vec<usize> = self
            .table_group
            .iter()
            .enumerate()
            .filter(|(_, g)| g.is_none())
            .map(|(i, _)| i)
            .collect();
        let Some(&table_index) = free.choose(&mut rng) else {
            return;
        };

        let mut size = sample_group_size(&mut rng, self.locked_count);
        if self.spawned_groups == 0 {
            size = size.min(INITIAL_GROUP_MAX_SIZE);
        }
        let size = size.min(remaining).min(SEATS_PER_TABLE).max(1);

        self.spawned_groups += 1;
        self.next_actor_id += 1;
        let gid = self.next_actor_id;
        let mut group = Group::new(gid, table_index, size);
        let entrance = self.layout.entrance;
        for seat in 0..size {
            self.next_actor_id += 1;
            let cid = self.next_actor_id;
            let chair = self.layout.tables[table_index].seats[seat];
            group.member_ids.push(cid);
            self.customers.push(Customer::new(
                cid,
                &group,
                seat,
                (entrance.x, entrance.y),
                (chair.chair_x, chair.chair_y),
            ));
        }
        self.table_group[table_index] = Some(gid);
        self.groups.insert(gid, group);
    }

    fn tick_groups(&mut self, dt: f32, notes: &mut Vec<String>) {
        let entrance = self.layout.entrance;
        let mut penalty_total: u32 = 0;
        for group in self.groups.values_mut() {
            match group.state {
                GroupState::Arriving => {
                    let all_seated = !group.member_ids.is_empty()
                        && group.member_ids.iter().all(|id| {
                            self.customers
                                .iter()
                                .find(|c| c.id == *id)
                                .is_some_and(|c| c.state == CustomerState::AwaitOrder)
                        });
                    if all_seated {
                        group.greet_active = true;
                        group.state = GroupState::AwaitOrder;
                    }
                }
                GroupState::AwaitOrder => {
                    if group.greet_active && group.accepted_count < group.size {
                        group.greet_left -= dt;
                        if group.greet_left <= 0.0 {
                            // Ignored too long; they walk out without a
                            // score penalty.
                            group.greet_left = 0.0;
                            group.greet_active = false;
                            group.state = GroupState::Leaving;
                            for c in self
                                .customers
                                .iter_mut()
                                .filter(|c| c.group_id == group.id)
                            {
                                c.state = CustomerState::Leaving;
                                c.head_for(entrance.x, entrance.y);
                            }
                            notes.push("A party left before ordering".to_string());
                        }
                    }
                }
                GroupState::WaitingFood => {
                    let mut timed_out: u32 = 0;
                    for c in self
                        .customers
                        .iter_mut()
                        .filter(|c| c.group_id == group.id)
                    {
                        if !c.is_waiting_for_food() || c.served {
                            continue;
                        }
                        let Some(left) = c.patience_left.as_mut() else {
                            continue;
                        };
                        *left -= dt;
                        if *left <= 0.0 {
                            c.state = CustomerState::Leaving;
                            c.head_for(entrance.x, entrance.y);
                            timed_out += 1;
                        }
                    }
                    if timed_out > 0 {
                        penalty_total +=
                            angry_leave_penalty_per_person(group.size) * timed_out;
                        notes.push("A customer stormed out hungry".to_string());
                    }

                    let all_done = group.member_ids.iter().all(|id| {
                        self.customers
                            .iter()
                            .find(|c| c.id == *id)
                            .is_none_or(|c| c.state == CustomerState::Done)
                    });
                    if all_done {
                        group.state = GroupState::Leaving;
                        for c in self
                            .customers
                            .iter_mut()
                            .filter(|c| c.group_id == group.id)
                        {
                            if c.state == CustomerState::Done {
                                c.state = CustomerState::Leaving;
                                c.head_for(entrance.x, entrance.y);
                            }
                        }
                    }
                }
                GroupState::Leaving => {}
            }
        }
        if penalty_total > 0 {
            self.score = self.score.saturating_sub(penalty_total);
        }
    }

    fn tick_customers(&mut self, dt: f32) {
        let entrance = self.layout.entrance;
        let mut removed: Vec<CustomerId> = Vec::new();

        for c in &mut self.customers {
            match c.state {
                CustomerState::Walking => {
                    if step_customer(
                        &mut c.x, &mut c.y, c.tx, c.ty, c.speed, dt, CUSTOMER_ARRIVE_DIST,
                    ) {
                        c.state = CustomerState::AwaitOrder;
                    }
                }
                CustomerState::Leaving => {
                    if step_customer(
                        &mut c.x, &mut c.y, c.tx, c.ty, c.speed, dt, CUSTOMER_ARRIVE_DIST,
                    ) {
                        removed.push(c.id);
                    }
                }
                CustomerState::AwaitOrderMain => {
                    if let Some(left) = c.main_greet_left.as_mut() {
                        *left -= dt;
                        if *left <= 0.0 {
                            c.state = CustomerState::Leaving;
                            c.head_for(entrance.x, entrance.y);
                        }
                    }
                }
                CustomerState::Eating => {
                    c.eat_left -= dt;
                    if c.eat_left > 0.0 {
                        continue;
                    }
                    c.eat_left = 0.0;

                    // Plates stay behind dirty; drinks and desserts vanish
                    // with their container.
                    if let Some(iid) = self.table_seats[c.table_index][c.seat_index] {
                        let is_plate = self
                            .items
                            .get(iid)
                            .is_some_and(|it| it.kind == ItemKind::Plate);
                        if is_plate {
                            if let Some(it) = self.items.get_mut(iid) {
                                it.plate.clear_contents();
                                it.plate.dirty = true;
                            }
                        } else {
                            self.items.remove(iid);
                            self.table_seats[c.table_index][c.seat_index] = None;
                        }
                    }

                    match c.eating_kind.take() {
                        Some(EatingKind::Pre) => {
                            // The starter is down; the main order must now be
                            // taken at the seat within its own greet window.
                            c.pre_served = true;
                            c.served = false;
                            c.dish = None;
                            c.patience_left = None;
                            c.patience_total = None;
                            c.state = CustomerState::AwaitOrderMain;
                            c.main_greet_total = Some(ORDER_TAKE_TIME);
                            c.main_greet_left = Some(ORDER_TAKE_TIME);
                        }
                        Some(EatingKind::Main) | None => {
                            self.score += c.pay;
                            c.state = CustomerState::Done;
                        }
                    }
                }
                _ => {}
            }
        }

        if removed.is_empty() {
            return;
        }
        let mut gone: Vec<(CustomerId, GroupId)> = Vec::new();
        self.customers.retain(|c| {
            if removed.contains(&c.id) {
                gone.push((c.id, c.group_id));
                false
            } else {
                true
            }
        });
        for (cid, gid) in gone {
            let now_empty = match self.groups.get_mut(&gid) {
                Some(g) => {
                    g.member_ids.retain(|m| *m != cid);
                    g.member_ids.is_empty()
                }
                None => false,
            };
            if now_empty {
                if let Some(g) = self.groups.remove(&gid) {
                    self.table_group[g.table_index] = None;
                }
            }
        }
    }

    fn move_players(&mut self, players: &mut [Player], dt: f32) {
        let customer_circles: Vec<(f32, f32)> =
            self.customers.iter().map(|c| (c.x, c.y)).collect();
        let obstacles = Obstacles {
            walls: &self.layout.walls,
            tables: &self.layout.tables,
            customers: &customer_circles,
        };
        for p in players.iter_mut() {
            (p.x, p.y) = step_player(p.x, p.y, &p.input, dt, &obstacles);
        }

        let mut circles: Vec<(f32, f32, bool)> =
            players.iter().map(|p| (p.x, p.y, p.connected)).collect();
        separate_players(&mut circles, &self.layout);
        for (p, (x, y, _)) in players.iter_mut().zip(circles) {
            p.x = x;
            p.y = y;
        }
    }

    fn carry_held_items(&mut self, players: &[Player]) {
        for p in players {
            let Some(id) = p.held else {
                continue;
            };
            if let Some(it) = self.items.get_mut(id) {
                it.x = p.x;
                it.y = p.y - HELD_ITEM_Y_OFFSET;
            }
        }
    }
}
