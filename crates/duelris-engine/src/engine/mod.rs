//! Rules-driven state machines built on the [`core`](crate::core) model.

pub use self::{
    battle::*, board::*, event::*, generator::*, input::*, rules::*, snapshot::*, stats::*,
};

mod battle;
mod board;
mod event;
mod generator;
mod input;
mod rules;
mod snapshot;
mod stats;
