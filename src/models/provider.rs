// ============================================================================
// Structures : ProviderSpec, ProviderResult, FetchRequest
// ============================================================================
// Décrit les providers configurés et le résultat d'une tentative de fetch
//
// CONCEPTS RUST :
// 1. Newtype pattern : CycleId(u64) pour ne pas confondre avec un compteur
// 2. Constructeurs nommés : succeeded() / failed() plutôt qu'un new() ambigu
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Candle;

/// Un provider de données configuré (clé stable + nom affiché)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Clé stable (ex: "coingecko"), utilisée dans les URLs et le registre
    pub key: String,

    /// Nom affiché (ex: "CoinGecko")
    pub label: String,
}

impl ProviderSpec {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }

    /// Vérifie si un nom renvoyé par le backend désigne ce provider
    ///
    /// Le backend batché renvoie le label ("CoinGecko"), le backend
    /// par provider renvoie la clé ("coingecko") : on accepte les deux.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        self.key.eq_ignore_ascii_case(name) || self.label.eq_ignore_ascii_case(name)
    }

    /// Providers par défaut du backend d'agrégation
    pub fn defaults() -> Vec<ProviderSpec> {
        vec![
            ProviderSpec::new("alpha_vantage", "Alpha Vantage"),
            ProviderSpec::new("stooq", "Stooq"),
            ProviderSpec::new("coingecko", "CoinGecko"),
            ProviderSpec::new("coinmarketcap", "CoinMarketCap"),
        ]
    }
}

/// Résultat d'une tentative de fetch pour un provider
///
/// - `success` : flag de transport (le provider a répondu correctement)
/// - `data` : chandelles normalisées (peut être vide même si success)
/// - `error` : message lisible, présent si échec
/// - `rate_limit_info` : information indicative, pour les deux issues
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResult {
    /// Clé du provider (ProviderSpec::key)
    pub provider: String,
    pub success: bool,
    pub data: Vec<Candle>,
    pub error: Option<String>,
    pub rate_limit_info: Option<String>,
}

impl ProviderResult {
    /// Résultat d'un appel qui a abouti (les données peuvent être vides)
    pub fn succeeded(provider: impl Into<String>, data: Vec<Candle>) -> Self {
        Self {
            provider: provider.into(),
            success: true,
            data,
            error: None,
            rate_limit_info: None,
        }
    }

    /// Résultat d'un appel en échec
    pub fn failed(provider: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            success: false,
            data: Vec::new(),
            error: Some(error.into()),
            rate_limit_info: None,
        }
    }

    /// Ajoute un message (ex: "no_data" renvoyé avec une réponse vide)
    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    pub fn with_rate_limit_info(mut self, info: Option<String>) -> Self {
        self.rate_limit_info = info;
        self
    }

    /// Affichable uniquement si succès ET au moins une chandelle
    pub fn is_displayable(&self) -> bool {
        self.success && !self.data.is_empty()
    }
}

/// Identifiant monotone d'un cycle de fetch
///
/// Chaque cycle reçoit un id strictement supérieur au précédent ; les
/// résultats portant un autre id que le cycle courant sont ignorés.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleId(pub u64);

impl CycleId {
    pub fn next(self) -> CycleId {
        CycleId(self.0 + 1)
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Demande de fetch pour un cycle (symbole et jours déjà corrigés)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub cycle: CycleId,
    pub symbol: String,
    pub days: u32,
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_matches_key_or_label() {
        let spec = ProviderSpec::new("coingecko", "CoinGecko");
        assert!(spec.matches("coingecko"));
        assert!(spec.matches("CoinGecko"));
        assert!(spec.matches(" COINGECKO "));
        assert!(!spec.matches("stooq"));
    }

    #[test]
    fn test_empty_success_is_not_displayable() {
        let empty = ProviderResult::succeeded("stooq", Vec::new());
        assert!(empty.success);
        assert!(!empty.is_displayable());

        let full = ProviderResult::succeeded("stooq", vec![Candle::new(1, 1.0, 1.0, 1.0, 1.0)]);
        assert!(full.is_displayable());

        let failed = ProviderResult::failed("stooq", "HTTP 500");
        assert!(!failed.is_displayable());
        assert_eq!(failed.error.as_deref(), Some("HTTP 500"));
    }

    #[test]
    fn test_cycle_id_is_monotonic() {
        let first = CycleId::default();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.to_string(), "#1");
    }
}
