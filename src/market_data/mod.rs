// =============================================================================
// Market Data Module
// =============================================================================
//
// Rate acquisition and the in-memory price window:
// - `RateSource` — the seam between the engine and wherever rates come from
// - `ExchangeRateClient` — live HTTP source
// - `SyntheticRateSource` — seeded random walk for Demo mode
// - `PriceWindow` — bounded trailing window the indicators read from

pub mod source;
pub mod window;

pub use source::{ExchangeRateClient, RateSource, SyntheticRateSource};
pub use window::PriceWindow;
