// ============================================================================
// Module : api
// ============================================================================
// Ce module contient le contrat du backend d'agrégation, le client HTTP et
// l'orchestrateur qui interroge tous les providers pendant un cycle
// ============================================================================

pub mod backend;      // Trait CandleBackend + types JSON du contrat
pub mod client;       // Client HTTP (reqwest)
pub mod error;        // FetchError : erreurs de transport
pub mod orchestrator; // Un cycle de fetch, tolérant aux échecs partiels

// Re-export des types principaux
pub use backend::{AdapterInfo, CandleBackend, RequestShape};
pub use client::HttpBackend;
pub use error::FetchError;
pub use orchestrator::{CycleSummary, FetchEvent, FetchOrchestrator};
