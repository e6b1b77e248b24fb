// ============================================================================
// Erreurs de transport à la frontière d'un provider
// ============================================================================
// Ces erreurs ne remontent jamais au-delà d'un appel : l'orchestrateur les
// convertit en ProviderResult en échec.
// ============================================================================

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Échec d'un appel au backend pour un provider (ou pour le lot)
#[derive(Debug, Error)]
pub enum FetchError {
    /// Échec réseau (connexion refusée, DNS, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Pas de réponse dans le délai imparti
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Réponse HTTP hors 2xx
    #[error("HTTP error! status: {0}")]
    Status(StatusCode),

    /// JSON illisible ou non conforme au contrat
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Le backend ne connaît pas ce provider
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Réponse batchée sans entrée pour un provider configuré
    #[error("No result returned for {0}")]
    MissingResult(String),
}

impl FetchError {
    /// Classe une erreur reqwest dans la taxonomie de transport
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status)
        } else {
            FetchError::Network(err.to_string())
        }
    }
}
