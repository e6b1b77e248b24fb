// ============================================================================
// Module : sources
// ============================================================================
// Tout ce qui transforme les résultats des providers en "ce qui peut être
// affiché" : statuts, normalisation, registre des sources
// ============================================================================

pub mod normalize; // RawCandle -> Candle (temps en secondes entières)
pub mod registry;  // Provider -> chandelles, ordre de première arrivée
pub mod status;    // Pending -> Ok / Empty / Failed par provider

pub use normalize::{normalize_candle, normalize_candles, normalize_time};
pub use registry::SourceRegistry;
pub use status::{ProviderStatus, StatusEntry, StatusSummary, StatusTracker};
