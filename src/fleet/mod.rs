//! Vehicles, stations and the models that move passengers and energy between them.

/// Stochastic passenger arrivals.
pub mod demand;
/// Power model, platoon detection and per-tick integration.
pub mod physics;
pub mod station;
pub mod vehicle;

// Re-export the main types for convenience
pub use demand::DemandModel;
pub use physics::{MotionOutcome, PhysicsParams};
pub use station::{Exchange, Station, StationStatus};
pub use vehicle::{Vehicle, VehicleStatus};
