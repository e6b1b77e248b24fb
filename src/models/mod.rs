// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données de l'application
// ============================================================================

pub mod candle;   // Chandelle canonique et chandelle provider (avant normalisation)
pub mod provider; // Providers configurés, résultats de fetch, cycles

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use candledeck::models::candle::Candle;
// On peut faire : use candledeck::models::Candle;
pub use candle::{Candle, RawCandle};
pub use provider::{CycleId, FetchRequest, ProviderResult, ProviderSpec};
