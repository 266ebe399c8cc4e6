pub mod clock;
pub mod errors;
pub mod lifecycle;
pub mod metrics;
pub mod model;
pub mod ports;
pub mod units;

pub use clock::*;
pub use errors::*;
pub use lifecycle::*;
pub use metrics::*;
pub use model::*;
pub use ports::*;
pub use units::*;

pub use alloy_primitives::U256;
