//! Pure simulation rules: no sockets, no clocks, no channels.

pub mod customers;
pub mod geometry;
pub mod items;
pub mod layout;
pub mod movement;
pub mod stations;
pub mod tuning;
