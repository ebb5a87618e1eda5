/// Simulated time keeping.
pub mod clock;
pub mod engine;
/// Rate-limited operator event stream.
pub mod event;
pub mod metrics;
/// Baseline and adaptive dispatch policies.
pub mod policy;
/// Immutable views published to observers.
pub mod snapshot;
pub mod types;

pub use engine::Simulation;
pub use policy::PolicyMode;
pub use snapshot::FleetSnapshot;
pub use types::FleetConfig;
