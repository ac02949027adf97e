//! Gameplay tuning for the kitchen simulation.
//!
//! Keep this separate from runtime/server configuration (tick rates, buffer
//! sizes, etc. live in `frameworks::config`).

use serde::Serialize;

pub const MAP_W: f32 = 900.0;
pub const MAP_H: f32 = 520.0;

pub const WALL_T: f32 = 18.0;
pub const KITCHEN_FENCE_X: f32 = 460.0;
pub const KITCHEN_DOOR_TOP: f32 = 90.0;
pub const KITCHEN_DOOR_BOT: f32 = 190.0;

pub const PLAYER_R: f32 = 16.0;
pub const PLAYER_SPEED: f32 = 175.0;

// Customers are treated as small circles for collision; the round tables get
// extra padding so players cannot squeeze between chairs.
pub const CUSTOMER_R: f32 = 12.0;
pub const TABLE_COLLISION_PAD: f32 = 6.0;
pub const CUSTOMER_WALK_SPEED: f32 = 98.0;
pub const CUSTOMER_ARRIVE_DIST: f32 = 2.5;

pub const INTERACT_DIST: f32 = 42.0;

// Carried items hover above the carrier's head.
pub const HELD_ITEM_Y_OFFSET: f32 = 30.0;

// Baking times (seconds). Burning starts counting after the pizza is cooked.
pub const BAKE_TIME: f32 = 9.0;
pub const BURN_EXTRA: f32 = 8.0;

pub const EAT_TIME_MIN: f32 = 5.0;
pub const EAT_TIME_MAX: f32 = 10.0;
pub const PRE_EAT_TIME_MIN: f32 = 2.0;
pub const PRE_EAT_TIME_MAX: f32 = 3.5;
pub const WASH_TIME: f32 = 7.0;
// Dispensing a drink/dessert takes as long as washing a plate.
pub const DISPENSE_TIME: f32 = WASH_TIME;

// Order taking / greeting.
pub const ORDER_TAKE_TIME: f32 = 20.0;
pub const ORDER_QUICK_TIME: f32 = 10.0;
pub const FOOD_WAIT_MAX: f32 = 60.0;
pub const FOOD_WAIT_MIN: f32 = 30.0;

pub const INITIAL_CUSTOMER_SPAWN_DELAY: f32 = 5.0;
pub const INITIAL_GROUP_MAX_SIZE: usize = 2;

// -10s ONCE from a seat's remaining wait time when serving the wrong item.
pub const WRONG_DISH_WAIT_PENALTY: f32 = 10.0;
// +10s to remaining wait time after a correctly served pre-item is consumed.
pub const PRE_BONUS_WAIT: f32 = 10.0;

pub const ACTIONS_PER_SEC_LIMIT: f32 = 10.0;

// A single simulation step never advances more than this, regardless of how
// late the scheduler fires. Bounds step error under scheduling jitter.
pub const MAX_TICK_DT: f32 = 0.06;

// Dropping below 2 connected players for this long ends the game as a loss.
pub const BELOW_MIN_PLAYERS_GRACE: f32 = 15.0;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 5;

/// Difficulty parameters locked to the connected player count at game start.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Difficulty {
    pub game_duration: f32,
    pub target_score: u32,
    pub order_slots: usize,
    pub order_spawn_interval: f32,
    pub patience_time: f32,
}

pub fn difficulty_for(locked_count: u8) -> Difficulty {
    match locked_count.clamp(2, 5) {
        2 => Difficulty {
            game_duration: 160.0,
            target_score: 140,
            order_slots: 2,
            order_spawn_interval: 8.0,
            patience_time: 35.0,
        },
        3 => Difficulty {
            game_duration: 150.0,
            target_score: 190,
            order_slots: 3,
            order_spawn_interval: 7.0,
            patience_time: 33.0,
        },
        4 => Difficulty {
            game_duration: 145.0,
            target_score: 240,
            order_slots: 3,
            order_spawn_interval: 6.3,
            patience_time: 31.0,
        },
        _ => Difficulty {
            game_duration: 140.0,
            target_score: 290,
            order_slots: 4,
            order_spawn_interval: 5.8,
            patience_time: 29.0,
        },
    }
}

/// Oven gets a third slot with 4+ players.
pub fn oven_slot_count(locked_count: u8) -> usize {
    if locked_count.clamp(2, 5) >= 4 { 3 } else { 2 }
}

pub fn home_plate_slot_count(locked_count: u8) -> usize {
    if locked_count.clamp(2, 5) >= 4 { 4 } else { 3 }
}

pub fn service_plate_slot_count(locked_count: u8) -> usize {
    if locked_count.clamp(2, 5) == 2 { 1 } else { 2 }
}

/// Probability that a group is allowed to occupy the third table while two
/// tables are already taken. Higher player counts see more "full house" spikes.
pub fn third_table_spawn_chance(locked_count: u8) -> f64 {
    match locked_count.clamp(2, 5) {
        2 => 0.18,
        3 => 0.28,
        4 => 0.48,
        _ => 0.62,
    }
}

/// Hard cap on simultaneous customers on the map.
pub fn max_customers(locked_count: u8) -> usize {
    match locked_count.clamp(2, 5) {
        2 => 4,
        3 => 5,
        4 => 7,
        _ => 8,
    }
}

/// Angry-leave penalty per timed-out person, scaled by the original group size.
pub fn angry_leave_penalty_per_person(group_size: usize) -> u32 {
    match group_size.clamp(1, 3) {
        1 => 12,
        2 => 18,
        _ => 24,
    }
}

/// Group size sampling weights (size 1, 2, 3). More players means more 2-3
/// person groups.
pub fn group_size_weights(locked_count: u8) -> [f64; 3] {
    match locked_count.clamp(2, 5) {
        2 => [0.52, 0.36, 0.12],
        3 => [0.34, 0.44, 0.22],
        4 => [0.22, 0.46, 0.32],
        _ => [0.18, 0.44, 0.38],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_scales_with_player_count() {
        assert_eq!(difficulty_for(2).target_score, 140);
        assert_eq!(difficulty_for(2).game_duration, 160.0);
        assert_eq!(difficulty_for(5).target_score, 290);
        // Out-of-range counts clamp instead of panicking.
        assert_eq!(difficulty_for(7).target_score, 290);
    }

    #[test]
    fn oven_and_plate_slots_scale() {
        assert_eq!(oven_slot_count(2), 2);
        assert_eq!(oven_slot_count(3), 2);
        assert_eq!(oven_slot_count(4), 3);
        assert_eq!(home_plate_slot_count(5), 4);
        assert_eq!(service_plate_slot_count(2), 1);
        assert_eq!(service_plate_slot_count(3), 2);
    }

    #[test]
    fn angry_penalty_by_group_size() {
        assert_eq!(angry_leave_penalty_per_person(1), 12);
        assert_eq!(angry_leave_penalty_per_person(2), 18);
        assert_eq!(angry_leave_penalty_per_person(3), 24);
    }
}
