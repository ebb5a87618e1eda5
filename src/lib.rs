//! Island EV shuttle fleet simulator on a solar microgrid.

#[cfg(feature = "api")]
pub mod api;
/// TOML scenario configuration and presets.
pub mod config;
/// Vehicles, stations, passenger demand and vehicle physics.
pub mod fleet;
pub mod grid;
pub mod io;
pub mod route;
/// Concurrent stepper, broadcaster and snapshot sinks.
pub mod runtime;
/// Simulation engine, policy, metrics and event modules.
pub mod sim;
