pub mod fixtures;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use fixtures::{profile, regular_player_stats, StatsDocument};
#[allow(unused_imports)]
pub use mocks::MockTransport;
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};
