// ============================================================================
// Status Tracker : état de chaque provider pendant un cycle
// ============================================================================
// Machine à états par provider : Pending -> { Ok, Empty, Failed }
//
// CONCEPT : État purement dérivé
// - Aucune logique au-delà de ProviderResult -> ProviderStatus
// - Recalculé en entier à chaque cycle (begin_cycle remet tout à Pending)
// - Empty et Failed sont tous deux des états "error" pour l'affichage,
//   mais Empty s'affiche avec un indicateur neutre
// ============================================================================

use tracing::warn;

use crate::models::{ProviderResult, ProviderSpec};

/// Statut d'affichage d'un provider
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderStatus {
    /// Aucun résultat connu pour ce cycle
    Pending,

    /// Succès avec au moins une chandelle
    Ok {
        points: usize,
        rate_limit_info: Option<String>,
    },

    /// Réponse correcte mais sans aucune chandelle
    Empty {
        message: Option<String>,
        rate_limit_info: Option<String>,
    },

    /// Échec explicite (transport, HTTP, JSON, résultat manquant)
    Failed {
        message: String,
        rate_limit_info: Option<String>,
    },
}

impl ProviderStatus {
    /// Dérive le statut d'un résultat
    pub fn from_result(result: &ProviderResult) -> Self {
        let rate_limit_info = result.rate_limit_info.clone();

        if result.is_displayable() {
            ProviderStatus::Ok {
                points: result.data.len(),
                rate_limit_info,
            }
        } else if result.success {
            ProviderStatus::Empty {
                message: result.error.clone(),
                rate_limit_info,
            }
        } else {
            ProviderStatus::Failed {
                message: result
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
                rate_limit_info,
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ProviderStatus::Pending)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ProviderStatus::Ok { .. })
    }

    /// Empty et Failed : pas de données affichables pour ce provider
    pub fn is_error(&self) -> bool {
        matches!(self, ProviderStatus::Empty { .. } | ProviderStatus::Failed { .. })
    }

    pub fn rate_limit_info(&self) -> Option<&str> {
        match self {
            ProviderStatus::Pending => None,
            ProviderStatus::Ok { rate_limit_info, .. }
            | ProviderStatus::Empty { rate_limit_info, .. }
            | ProviderStatus::Failed { rate_limit_info, .. } => rate_limit_info.as_deref(),
        }
    }
}

/// Une ligne du tracker : le provider et son statut courant
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub provider: ProviderSpec,
    pub status: ProviderStatus,
}

/// Compteurs agrégés d'un cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub pending: usize,
    pub ok: usize,
    pub empty: usize,
    pub failed: usize,
}

impl StatusSummary {
    /// Tous les providers ont répondu, et aucun avec des données
    pub fn is_no_data_anywhere(&self) -> bool {
        self.pending == 0 && self.ok == 0
    }
}

/// Tracker : une entrée par provider configuré, dans l'ordre de configuration
#[derive(Debug, Clone)]
pub struct StatusTracker {
    entries: Vec<StatusEntry>,
}

impl StatusTracker {
    /// Crée le tracker : tous les providers commencent en Pending
    pub fn new(providers: &[ProviderSpec]) -> Self {
        Self {
            entries: providers
                .iter()
                .cloned()
                .map(|provider| StatusEntry {
                    provider,
                    status: ProviderStatus::Pending,
                })
                .collect(),
        }
    }

    /// Début de cycle : remise à zéro complète, rien n'est gardé du cycle précédent
    pub fn begin_cycle(&mut self) {
        for entry in &mut self.entries {
            entry.status = ProviderStatus::Pending;
        }
    }

    /// Applique un résultat ; retourne false si le provider n'est pas configuré
    pub fn apply(&mut self, result: &ProviderResult) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.provider.key == result.provider)
        {
            Some(entry) => {
                entry.status = ProviderStatus::from_result(result);
                true
            }
            None => {
                warn!(provider = %result.provider, "Result for an unconfigured provider");
                false
            }
        }
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    pub fn status_of(&self, key: &str) -> Option<&ProviderStatus> {
        self.entries
            .iter()
            .find(|entry| entry.provider.key == key)
            .map(|entry| &entry.status)
    }

    /// Label affiché pour une clé (la clé elle-même si inconnue)
    pub fn label_of<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|entry| entry.provider.key == key)
            .map(|entry| entry.provider.label.as_str())
            .unwrap_or(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> StatusSummary {
        self.entries
            .iter()
            .fold(StatusSummary::default(), |mut summary, entry| {
                match entry.status {
                    ProviderStatus::Pending => summary.pending += 1,
                    ProviderStatus::Ok { .. } => summary.ok += 1,
                    ProviderStatus::Empty { .. } => summary.empty += 1,
                    ProviderStatus::Failed { .. } => summary.failed += 1,
                }
                summary
            })
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candle;

    fn providers() -> Vec<ProviderSpec> {
        vec![
            ProviderSpec::new("a", "Provider A"),
            ProviderSpec::new("b", "Provider B"),
            ProviderSpec::new("c", "Provider C"),
        ]
    }

    #[test]
    fn test_all_pending_initially() {
        let tracker = StatusTracker::new(&providers());
        assert_eq!(tracker.len(), 3);
        assert!(tracker.entries().iter().all(|e| e.status.is_pending()));
        assert!(!tracker.summary().is_no_data_anywhere());
    }

    #[test]
    fn test_transitions() {
        let mut tracker = StatusTracker::new(&providers());

        let ok = ProviderResult::succeeded("a", vec![Candle::new(1, 1.0, 1.0, 1.0, 1.0)])
            .with_rate_limit_info(Some("Free tier: 10-30 requests/minute".to_string()));
        let empty = ProviderResult::succeeded("b", Vec::new());
        let failed = ProviderResult::failed("c", "HTTP 500 Internal Server Error");

        assert!(tracker.apply(&ok));
        assert!(tracker.apply(&empty));
        assert!(tracker.apply(&failed));

        assert!(tracker.status_of("a").unwrap().is_ok());
        assert_eq!(
            tracker.status_of("a").unwrap().rate_limit_info(),
            Some("Free tier: 10-30 requests/minute")
        );
        assert!(matches!(tracker.status_of("b"), Some(ProviderStatus::Empty { .. })));
        assert!(tracker.status_of("b").unwrap().is_error());
        assert!(matches!(tracker.status_of("c"), Some(ProviderStatus::Failed { .. })));

        // Nombre d'entrées = nombre de providers, quel que soit le résultat
        assert_eq!(tracker.entries().len(), 3);
        assert_eq!(
            tracker.summary(),
            StatusSummary {
                pending: 0,
                ok: 1,
                empty: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn test_failed_without_message() {
        let mut result = ProviderResult::failed("a", "x");
        result.error = None;
        assert_eq!(
            ProviderStatus::from_result(&result),
            ProviderStatus::Failed {
                message: "Unknown error".to_string(),
                rate_limit_info: None
            }
        );
    }

    #[test]
    fn test_begin_cycle_resets_wholesale() {
        let mut tracker = StatusTracker::new(&providers());
        tracker.apply(&ProviderResult::failed("a", "boom"));
        tracker.apply(&ProviderResult::failed("b", "boom"));
        tracker.apply(&ProviderResult::failed("c", "boom"));
        assert!(tracker.summary().is_no_data_anywhere());

        tracker.begin_cycle();
        assert_eq!(tracker.summary().pending, 3);
    }

    #[test]
    fn test_unknown_provider_ignored() {
        let mut tracker = StatusTracker::new(&providers());
        assert!(!tracker.apply(&ProviderResult::failed("zzz", "boom")));
        assert_eq!(tracker.len(), 3);
        assert_eq!(tracker.label_of("zzz"), "zzz");
        assert_eq!(tracker.label_of("a"), "Provider A");
    }
}
