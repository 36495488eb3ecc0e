//! Peripheral Drivers
//!
//! Transmitter chips behind the [`crate::radio::backend::RadioBackend`]
//! command set. Drivers are generic over `embedded_hal` 1.0 buses, so the
//! same code runs on the target and against mocks on the host.

pub mod si4032;
pub mod si4063;
pub mod si5351;

pub use si4032::Si4032;
pub use si4063::Si4063;
pub use si5351::Si5351;
