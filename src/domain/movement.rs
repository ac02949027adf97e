//! Player movement integration and collision resolution.
//!
//! Runs every simulation step. Inputs are already sanitized at the protocol
//! edge; here they only get normalized so diagonals are not faster.

use serde::Deserialize;

use crate::domain::geometry::{
    Rect, dist, push_circle_out_of_circle, push_circle_out_of_rect,
};
use crate::domain::layout::{Layout, Table};
use crate::domain::tuning::{
    CUSTOMER_R, MAP_H, MAP_W, PLAYER_R, PLAYER_SPEED, TABLE_COLLISION_PAD,
};

/// Latest movement input of one player. Directional flags and analog axes
/// combine; whichever is non-zero wins, with analog taking precedence.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MoveInput {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub ax: f32,
    #[serde(default)]
    pub ay: f32,
}

impl MoveInput {
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Movement direction with magnitude in [0, 1].
    pub fn direction(&self) -> (f32, f32) {
        let (mut dx, mut dy) = (self.ax, self.ay);
        if dx == 0.0 && dy == 0.0 {
            dx = (self.right as i8 - self.left as i8) as f32;
            dy = (self.down as i8 - self.up as i8) as f32;
        }
        let mag = dx.hypot(dy);
        if mag <= 1.0 {
            (dx, dy)
        } else {
            (dx / mag, dy / mag)
        }
    }
}

/// Anything that blocks or bumps a moving player.
pub struct Obstacles<'a> {
    pub walls: &'a [Rect],
    pub tables: &'a [Table],
    /// Customer circle centers.
    pub customers: &'a [(f32, f32)],
}

fn clamp_to_map(x: f32, y: f32) -> (f32, f32) {
    let margin = PLAYER_R + 6.0;
    (
        x.clamp(margin, MAP_W - margin),
        y.clamp(margin, MAP_H - margin),
    )
}

fn resolve_walls(x: f32, y: f32, walls: &[Rect]) -> (f32, f32) {
    let (mut x, mut y) = (x, y);
    for wall in walls {
        if let Some((nx, ny)) = push_circle_out_of_rect(x, y, PLAYER_R, wall) {
            x = nx;
            y = ny;
        }
    }
    (x, y)
}

/// Integrates one player's input and resolves static collisions (map bounds,
/// walls, tables, customers). Returns the new position.
pub fn step_player(
    x: f32,
    y: f32,
    input: &MoveInput,
    dt: f32,
    obstacles: &Obstacles<'_>,
) -> (f32, f32) {
    let (dx, dy) = input.direction();
    let (mut x, mut y) = (x + dx * PLAYER_SPEED * dt, y + dy * PLAYER_SPEED * dt);

    (x, y) = clamp_to_map(x, y);
    (x, y) = resolve_walls(x, y, obstacles.walls);

    for table in obstacles.tables {
        if let Some((nx, ny)) = push_circle_out_of_circle(
            x,
            y,
            PLAYER_R,
            table.cx,
            table.cy,
            table.r + TABLE_COLLISION_PAD,
        ) {
            x = nx;
            y = ny;
        }
    }

    for &(cx, cy) in obstacles.customers {
        if let Some((nx, ny)) = push_circle_out_of_circle(x, y, PLAYER_R, cx, cy, CUSTOMER_R) {
            x = nx;
            y = ny;
        }
    }

    // Pushes above can shove a player back into bounds geometry.
    (x, y) = clamp_to_map(x, y);
    resolve_walls(x, y, obstacles.walls)
}

/// Separates every overlapping player pair symmetrically. Disconnected
/// (ghost) players barely resist, so live players can push through them.
pub fn separate_players(players: &mut [(f32, f32, bool)], layout: &Layout) {
    let n = players.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (ax, ay, a_conn) = players[i];
            let (bx, by, b_conn) = players[j];
            let d = dist(ax, ay, bx, by);
            let min_d = PLAYER_R * 2.0;
            if d >= min_d {
                continue;
            }
            let d = d.max(1e-4);
            let overlap = min_d - d;
            let (ux, uy) = ((ax - bx) / d, (ay - by) / d);
            let wa = if a_conn { 1.0 } else { 0.2 };
            let wb = if b_conn { 1.0 } else { 0.2 };

            let (mut nax, mut nay) = (ax + ux * overlap * 0.5 * wa, ay + uy * overlap * 0.5 * wa);
            let (mut nbx, mut nby) = (bx - ux * overlap * 0.5 * wb, by - uy * overlap * 0.5 * wb);
            (nax, nay) = clamp_to_map(nax, nay);
            (nax, nay) = resolve_walls(nax, nay, &layout.walls);
            (nbx, nby) = clamp_to_map(nbx, nby);
            (nbx, nby) = resolve_walls(nbx, nby, &layout.walls);

            players[i] = (nax, nay, a_conn);
            players[j] = (nbx, nby, b_conn);
        }
    }
}

/// Straight-line customer walk towards a target. Returns true on arrival.
pub fn step_customer(
    x: &mut f32,
    y: &mut f32,
    tx: f32,
    ty: f32,
    speed: f32,
    dt: f32,
    arrive_dist: f32,
) -> bool {
    let dx = tx - *x;
    let dy = ty - *y;
    let d = dx.hypot(dy);
    if d <= arrive_dist {
        *x = tx;
        *y = ty;
        return true;
    }
    let step = speed * dt;
    if step >= d {
        *x = tx;
        *y = ty;
        return true;
    }
    *x += dx / d * step;
    *y += dy / d * step;
    false
}
