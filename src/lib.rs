#[macro_use]
extern crate tracing;

pub mod config;
pub mod context;
pub mod dns;
pub mod reconcile;
pub mod resources;
pub mod secrets;
pub mod solver;

#[cfg(test)]
mod testing;
