//! Customer groups, per-seat order/patience/eating state machines and the
//! payment/penalty math.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::domain::items::ItemKind;
use crate::domain::tuning::{
    CUSTOMER_WALK_SPEED, FOOD_WAIT_MAX, FOOD_WAIT_MIN, ORDER_QUICK_TIME, ORDER_TAKE_TIME,
    group_size_weights,
};

pub type CustomerId = u64;
pub type GroupId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerState {
    Walking,
    AwaitOrder,
    WaitingPre,
    WaitingFood,
    AwaitOrderMain,
    Eating,
    Done,
    Leaving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Arriving,
    AwaitOrder,
    WaitingFood,
    Leaving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EatingKind {
    Pre,
    Main,
}

/// A party of 1-3 customers seated together at one table, sharing one greet
/// timer.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: GroupId,
    pub table_index: usize,
    pub size: usize,
    pub member_ids: Vec<CustomerId>,
    pub state: GroupState,
    pub greet_total: f32,
    pub greet_left: f32,
    pub greet_active: bool,
    pub accepted_count: usize,
}

impl Group {
    pub fn new(id: GroupId, table_index: usize, size: usize) -> Self {
        Self {
            id,
            table_index,
            size,
            member_ids: Vec::with_capacity(size),
            state: GroupState::Arriving,
            greet_total: ORDER_TAKE_TIME,
            greet_left: ORDER_TAKE_TIME,
            greet_active: false,
            accepted_count: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Customer {
    pub id: CustomerId,
    pub group_id: GroupId,
    pub table_index: usize,
    pub seat_index: usize,
    pub x: f32,
    pub y: f32,
    /// Current walk target (chair while arriving, entrance while leaving).
    pub tx: f32,
    pub ty: f32,
    pub seat_x: f32,
    pub seat_y: f32,
    pub state: CustomerState,
    /// The currently revealed order (pre-item first if any, then main dish).
    pub dish: Option<ItemKind>,
    pub pre: Option<ItemKind>,
    pub pre_served: bool,
    pub main_dish: Option<ItemKind>,
    pub accepted: bool,
    pub served: bool,
    pub wrong_penalty_used: bool,
    pub patience_total: Option<f32>,
    pub patience_left: Option<f32>,
    pub eat_left: f32,
    pub eating_kind: Option<EatingKind>,
    pub main_greet_total: Option<f32>,
    pub main_greet_left: Option<f32>,
    /// Payment captured at serve time, banked when eating finishes.
    pub pay: u32,
    pub speed: f32,
}

impl Customer {
    pub fn new(
        id: CustomerId,
        group: &Group,
        seat_index: usize,
        entrance: (f32, f32),
        chair: (f32, f32),
    ) -> Self {
        Self {
            id,
            group_id: group.id,
            table_index: group.table_index,
            seat_index,
            x: entrance.0,
            y: entrance.1,
            tx: chair.0,
            ty: chair.1,
            seat_x: chair.0,
            seat_y: chair.1,
            state: CustomerState::Walking,
            dish: None,
            pre: None,
            pre_served: false,
            main_dish: None,
            accepted: false,
            served: false,
            wrong_penalty_used: false,
            patience_total: None,
            patience_left: None,
            eat_left: 0.0,
            eating_kind: None,
            main_greet_total: None,
            main_greet_left: None,
            pay: 0,
            speed: CUSTOMER_WALK_SPEED,
        }
    }

    pub fn is_waiting_for_food(&self) -> bool {
        matches!(self.state, CustomerState::WaitingFood | CustomerState::WaitingPre)
    }

    pub fn head_for(&mut self, x: f32, y: f32) {
        self.tx = x;
        self.ty = y;
    }
}

/// Food patience granted for a given greet delay: instant/quick orders get
/// the maximum wait, a full 20s greet gets the minimum, linear in between.
pub fn food_wait_from_greet_delay(delay_sec: f32) -> f32 {
    if delay_sec <= ORDER_QUICK_TIME {
        return FOOD_WAIT_MAX;
    }
    let t = ((delay_sec - ORDER_QUICK_TIME) / (ORDER_TAKE_TIME - ORDER_QUICK_TIME)).clamp(0.0, 1.0);
    FOOD_WAIT_MAX - t * (FOOD_WAIT_MAX - FOOD_WAIT_MIN)
}

/// Payment for a correctly served main dish: a customer served fast relative
/// to their own allotted wait pays more. Always in [20, 40].
pub fn gold_from_patience(total: f32, left: f32) -> u32 {
    let total = total.max(1.0);
    let ratio = (left.clamp(0.0, total) / total).clamp(0.0, 1.0);
    (20.0 + 20.0 * ratio).round() as u32
}

const PIZZA_DISHES: [ItemKind; 3] = [
    ItemKind::CheesePizza,
    ItemKind::SausagePizza,
    ItemKind::DeluxePizza,
];

/// 40% of customers order a pre-item before their pizza: 20% ice cream,
/// 20% coke.
pub fn sample_pre_item<R: Rng + ?Sized>(rng: &mut R) -> Option<ItemKind> {
    let r: f64 = rng.gen_range(0.0..1.0);
    if r < 0.20 {
        Some(ItemKind::IceCream)
    } else if r < 0.40 {
        Some(ItemKind::Coke)
    } else {
        None
    }
}

pub fn sample_main_dish<R: Rng + ?Sized>(rng: &mut R) -> ItemKind {
    *PIZZA_DISHES.choose(rng).unwrap_or(&ItemKind::CheesePizza)
}

/// Weighted group size; more players shift weight towards 2-3 person groups.
pub fn sample_group_size<R: Rng + ?Sized>(rng: &mut R, locked_count: u8) -> usize {
    let [w1, w2, w3] = group_size_weights(locked_count);
    let r: f64 = rng.gen_range(0.0..(w1 + w2 + w3));
    if r < w1 {
        1
    } else if r < w1 + w2 {
        2
    } else {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_greet_gets_max_wait() {
        assert_eq!(food_wait_from_greet_delay(0.0), FOOD_WAIT_MAX);
        assert_eq!(food_wait_from_greet_delay(5.0), FOOD_WAIT_MAX);
        assert_eq!(food_wait_from_greet_delay(10.0), FOOD_WAIT_MAX);
    }

    #[test]
    fn full_greet_gets_min_wait() {
        assert_eq!(food_wait_from_greet_delay(20.0), FOOD_WAIT_MIN);
        assert_eq!(food_wait_from_greet_delay(25.0), FOOD_WAIT_MIN);
    }

    #[test]
    fn greet_delay_interpolates_linearly() {
        let mid = food_wait_from_greet_delay(15.0);
        assert!((mid - (FOOD_WAIT_MAX + FOOD_WAIT_MIN) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn gold_bounds() {
        assert_eq!(gold_from_patience(60.0, 60.0), 40);
        assert_eq!(gold_from_patience(60.0, 0.0), 20);
        assert_eq!(gold_from_patience(60.0, 30.0), 30);
        // Overshoot clamps instead of exceeding the ceiling.
        assert_eq!(gold_from_patience(60.0, 90.0), 40);
        assert_eq!(gold_from_patience(0.0, 0.0), 20);
    }

    #[test]
    fn pre_item_sampling_distribution() {
        let mut rng = rand::thread_rng();
        let mut pre = 0;
        for _ in 0..2000 {
            if sample_pre_item(&mut rng).is_some() {
                pre += 1;
            }
        }
        // 40% expected; allow a generous band.
        assert!(pre > 600 && pre < 1000, "pre-item count out of band: {pre}");
    }

    #[test]
    fn group_size_within_bounds() {
        let mut rng = rand::thread_rng();
        for locked in 2..=5 {
            for _ in 0..100 {
                let s = sample_group_size(&mut rng, locked);
                assert!((1..=3).contains(&s));
            }
        }
    }
}
