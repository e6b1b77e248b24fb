// ============================================================================
// Contrat du backend d'agrégation
// ============================================================================
// Deux formes de requête existent :
//   (a) batchée   : POST /api/fetch { symbol, days } -> { results: [...] }
//   (b) provider  : GET /api/ohlcv/{key}?symbol=...  -> { candles: [...] }
// Plus la découverte : GET /api/adapters -> { adapters: [...] }
//
// CONCEPT RUST : trait async (async-trait)
// - L'orchestrateur ne dépend que du trait, pas de reqwest
// - Les tests fournissent un faux backend sans réseau
// ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::FetchError;
use crate::models::{ProviderSpec, RawCandle};

/// Forme de requête utilisée pour un cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestShape {
    /// Un seul appel qui renvoie tous les providers d'un coup
    Batched,

    /// Un appel par provider, tous lancés en même temps
    #[default]
    PerProvider,
}

impl RequestShape {
    /// Parse la valeur de configuration ("batched", "per-provider")
    pub fn parse(value: &str) -> Option<RequestShape> {
        match value.trim().to_ascii_lowercase().as_str() {
            "batched" | "batch" => Some(RequestShape::Batched),
            "per-provider" | "per_provider" | "provider" => Some(RequestShape::PerProvider),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestShape::Batched => "batched",
            RequestShape::PerProvider => "per-provider",
        }
    }
}

/// Corps de la requête batchée
#[derive(Debug, Clone, Serialize)]
pub struct BatchRequest<'a> {
    pub symbol: &'a str,
    pub days: u32,
}

/// Réponse batchée complète
#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub symbol: Option<String>,
    pub results: Vec<BatchEntry>,
}

/// Une entrée de la réponse batchée (un provider)
#[derive(Debug, Clone, Deserialize)]
pub struct BatchEntry {
    pub adapter_name: String,
    pub success: bool,
    #[serde(default)]
    pub data: Option<Vec<RawCandle>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub rate_limit_info: Option<String>,
}

/// Réponse d'un appel par provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderPayload {
    #[serde(default)]
    pub candles: Vec<RawCandle>,

    /// Le backend renvoie "no_data" (ou le message d'exception) avec une liste vide
    #[serde(default)]
    pub error: Option<String>,
}

/// Description d'un adapter exposée par le backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AdapterInfo {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub requires_api_key: bool,
    #[serde(default)]
    pub configured: bool,
}

impl AdapterInfo {
    /// Provider correspondant à cet adapter
    ///
    /// Réutilise la clé d'un provider connu portant ce nom ; sinon la clé
    /// est dérivée du nom ("Alpha Vantage" -> "alpha_vantage").
    pub fn to_provider_spec(&self, known: &[ProviderSpec]) -> ProviderSpec {
        if let Some(spec) = known.iter().find(|spec| spec.matches(&self.name)) {
            return spec.clone();
        }

        let key = self
            .name
            .trim()
            .to_ascii_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        ProviderSpec::new(key, self.name.trim())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdapterList {
    pub adapters: Vec<AdapterInfo>,
}

/// Seam entre l'orchestrateur et le transport
#[async_trait]
pub trait CandleBackend: Send + Sync {
    /// Forme (a) : tous les providers en un appel
    async fn fetch_batch(&self, symbol: &str, days: u32) -> Result<Vec<BatchEntry>, FetchError>;

    /// Forme (b) : un provider
    async fn fetch_provider(
        &self,
        provider: &ProviderSpec,
        symbol: &str,
        days: u32,
    ) -> Result<ProviderPayload, FetchError>;

    /// Liste des adapters connus du backend
    async fn list_adapters(&self) -> Result<Vec<AdapterInfo>, FetchError>;
}

// ============================================================================
// Tests unitaires
// ============================================================================
