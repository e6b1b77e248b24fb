// ============================================================================
// Fetch Orchestrator : un cycle de fetch sur tous les providers
// ============================================================================
// Lance une requête par provider (ou un lot), collecte chaque issue
// indépendamment et émet des FetchEvent au fil de l'eau.
//
// GARANTIES :
// - l'échec, le timeout ou le JSON invalide d'un provider ne retarde
//   ni n'annule les autres
// - toute erreur de transport devient un ProviderResult en échec
// - chaque cycle se termine par FetchEvent::Finished
//
// CONCEPT RUST : FuturesUnordered
// - Toutes les futures sont créées d'un coup et pollées ensemble
// - .next() renvoie la prochaine future TERMINÉE (ordre d'arrivée)
// ============================================================================

use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::api::backend::{BatchEntry, CandleBackend, ProviderPayload, RequestShape};
use crate::api::FetchError;
use crate::models::{CycleId, FetchRequest, ProviderResult, ProviderSpec};
use crate::sources::normalize_candles;

/// Événements émis pendant un cycle
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    /// Un ou plusieurs providers ont répondu (un seul en forme b, tous en forme a)
    Settled {
        cycle: CycleId,
        results: Vec<ProviderResult>,
    },

    /// Tous les appels du cycle sont terminés
    Finished { cycle: CycleId },
}

impl FetchEvent {
    pub fn cycle(&self) -> CycleId {
        match self {
            FetchEvent::Settled { cycle, .. } | FetchEvent::Finished { cycle } => *cycle,
        }
    }
}

/// Compteurs d'un cycle, pour les logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub ok: usize,
    pub empty: usize,
    pub failed: usize,
}

impl CycleSummary {
    fn record(&mut self, result: &ProviderResult) {
        if result.is_displayable() {
            self.ok += 1;
        } else if result.success {
            self.empty += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Orchestrateur : providers configurés + backend + forme de requête
pub struct FetchOrchestrator {
    backend: Arc<dyn CandleBackend>,
    providers: Vec<ProviderSpec>,
    shape: RequestShape,
}

impl FetchOrchestrator {
    pub fn new(
        backend: Arc<dyn CandleBackend>,
        providers: Vec<ProviderSpec>,
        shape: RequestShape,
    ) -> Self {
        Self {
            backend,
            providers,
            shape,
        }
    }

    /// Exécute un cycle complet
    ///
    /// `emit` reçoit les événements dans l'ordre où ils se produisent ;
    /// la fonction ne retourne qu'une fois tous les appels terminés.
    #[instrument(skip(self, emit), fields(cycle = %request.cycle, symbol = %request.symbol, days = request.days))]
    pub async fn run_cycle<F>(&self, request: &FetchRequest, mut emit: F) -> CycleSummary
    where
        F: FnMut(FetchEvent),
    {
        info!(shape = self.shape.label(), providers = self.providers.len(), "Starting fetch cycle");

        let summary = match self.shape {
            RequestShape::PerProvider => self.run_per_provider(request, &mut emit).await,
            RequestShape::Batched => self.run_batched(request, &mut emit).await,
        };

        emit(FetchEvent::Finished {
            cycle: request.cycle,
        });

        info!(
            ok = summary.ok,
            empty = summary.empty,
            failed = summary.failed,
            "Fetch cycle finished"
        );
        summary
    }

    /// Forme (b) : un appel par provider, émis dès qu'il se termine
    async fn run_per_provider<F>(&self, request: &FetchRequest, emit: &mut F) -> CycleSummary
    where
        F: FnMut(FetchEvent),
    {
        let mut pending: FuturesUnordered<_> = self
            .providers
            .iter()
            .map(|provider| async move {
                let outcome = self
                    .backend
                    .fetch_provider(provider, &request.symbol, request.days)
                    .await;
                (provider, outcome)
            })
            .collect();

        let mut summary = CycleSummary::default();

        while let Some((provider, outcome)) = pending.next().await {
            let result = result_from_payload(provider, outcome);
            log_result(&result);
            summary.record(&result);

            emit(FetchEvent::Settled {
                cycle: request.cycle,
                results: vec![result],
            });
        }

        summary
    }

    /// Forme (a) : un seul appel, tous les résultats appliqués d'un bloc
    async fn run_batched<F>(&self, request: &FetchRequest, emit: &mut F) -> CycleSummary
    where
        F: FnMut(FetchEvent),
    {
        let results = match self.backend.fetch_batch(&request.symbol, request.days).await {
            Ok(entries) => match_batch_entries(&self.providers, entries),
            Err(err) => {
                warn!(error = %err, "Batched fetch failed for every provider");
                self.providers
                    .iter()
                    .map(|provider| ProviderResult::failed(&provider.key, err.to_string()))
                    .collect()
            }
        };

        let mut summary = CycleSummary::default();
        for result in &results {
            log_result(result);
            summary.record(result);
        }

        emit(FetchEvent::Settled {
            cycle: request.cycle,
            results,
        });

        summary
    }
}

/// Texte d'erreur du backend pour une réponse vide sans échec
const NO_DATA_ERROR: &str = "no_data";

/// Classe l'issue d'un appel par provider
fn result_from_payload(
    provider: &ProviderSpec,
    outcome: Result<ProviderPayload, FetchError>,
) -> ProviderResult {
    match outcome {
        Ok(payload) => match payload.error {
            // Exception de l'adapter : enveloppe vide avec son message
            Some(error) if payload.candles.is_empty() && error != NO_DATA_ERROR => {
                ProviderResult::failed(&provider.key, error)
            }
            error => ProviderResult::succeeded(&provider.key, normalize_candles(&payload.candles))
                .with_error(error),
        },
        Err(err) => ProviderResult::failed(&provider.key, err.to_string()),
    }
}

/// Associe les entrées batchées aux providers configurés
///
/// - une entrée par provider configuré, dans l'ordre de la réponse
/// - provider absent de la réponse : échec MissingResult (ajouté à la fin)
/// - nom inconnu : ignoré avec un warning
fn match_batch_entries(providers: &[ProviderSpec], entries: Vec<BatchEntry>) -> Vec<ProviderResult> {
    let mut results: Vec<ProviderResult> = Vec::with_capacity(providers.len());

    for entry in entries {
        let Some(provider) = providers.iter().find(|p| p.matches(&entry.adapter_name)) else {
            warn!(adapter = %entry.adapter_name, "Ignoring result for unknown adapter");
            continue;
        };

        if results.iter().any(|r| r.provider == provider.key) {
            warn!(adapter = %entry.adapter_name, "Ignoring duplicate adapter result");
            continue;
        }

        let result = if entry.success {
            let candles = entry.data.as_deref().map(normalize_candles).unwrap_or_default();
            ProviderResult::succeeded(&provider.key, candles).with_error(entry.error)
        } else {
            ProviderResult::failed(
                &provider.key,
                entry.error.unwrap_or_else(|| "Unknown error".to_string()),
            )
        };

        results.push(result.with_rate_limit_info(entry.rate_limit_info));
    }

    for provider in providers {
        if !results.iter().any(|r| r.provider == provider.key) {
            results.push(ProviderResult::failed(
                &provider.key,
                FetchError::MissingResult(provider.label.clone()).to_string(),
            ));
        }
    }

    results
}

fn log_result(result: &ProviderResult) {
    if result.is_displayable() {
        debug!(provider = %result.provider, candles = result.data.len(), "Provider settled with data");
    } else if result.success {
        debug!(provider = %result.provider, "Provider settled without data");
    } else {
        warn!(
            provider = %result.provider,
            error = result.error.as_deref().unwrap_or_default(),
            "Provider failed"
        );
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use super::*;
    use crate::api::backend::AdapterInfo;
    use crate::models::RawCandle;

    /// Réponse simulée d'un provider, avec un délai pour fixer l'ordre d'arrivée
    enum Scripted {
        Candles(usize, u64),
        Status(StatusCode, u64),
        Malformed(u64),
        AdapterError(&'static str),
    }

    struct FakeBackend {
        per_provider: HashMap<String, Scripted>,
        batch: Option<Result<Vec<BatchEntry>, StatusCode>>,
    }

    fn raw_candles(count: usize) -> Vec<RawCandle> {
        (0..count)
            .map(|i| RawCandle::new(1_700_000_000_000.0 + i as f64 * 60_000.0, 1.0, 2.0, 0.5, 1.5))
            .collect()
    }

    #[async_trait]
    impl CandleBackend for FakeBackend {
        async fn fetch_batch(&self, _symbol: &str, _days: u32) -> Result<Vec<BatchEntry>, FetchError> {
            match &self.batch {
                Some(Ok(entries)) => Ok(entries.clone()),
                Some(Err(status)) => Err(FetchError::Status(*status)),
                None => Err(FetchError::Network("no batch scripted".to_string())),
            }
        }

        async fn fetch_provider(
            &self,
            provider: &ProviderSpec,
            _symbol: &str,
            _days: u32,
        ) -> Result<ProviderPayload, FetchError> {
            match self.per_provider.get(&provider.key) {
                Some(Scripted::Candles(count, delay)) => {
                    tokio::time::sleep(Duration::from_millis(*delay)).await;
                    Ok(ProviderPayload {
                        candles: raw_candles(*count),
                        error: (*count == 0).then(|| "no_data".to_string()),
                    })
                }
                Some(Scripted::Status(status, delay)) => {
                    tokio::time::sleep(Duration::from_millis(*delay)).await;
                    Err(FetchError::Status(*status))
                }
                Some(Scripted::Malformed(delay)) => {
                    tokio::time::sleep(Duration::from_millis(*delay)).await;
                    Err(FetchError::Malformed("expected value at line 1".to_string()))
                }
                Some(Scripted::AdapterError(message)) => Ok(ProviderPayload {
                    candles: Vec::new(),
                    error: Some(message.to_string()),
                }),
                None => Err(FetchError::UnknownProvider(provider.key.clone())),
            }
        }

        async fn list_adapters(&self) -> Result<Vec<AdapterInfo>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn providers() -> Vec<ProviderSpec> {
        vec![
            ProviderSpec::new("a", "Provider A"),
            ProviderSpec::new("b", "Provider B"),
            ProviderSpec::new("c", "Provider C"),
        ]
    }

    fn request() -> FetchRequest {
        FetchRequest {
            cycle: CycleId(7),
            symbol: "ETH".to_string(),
            days: 90,
        }
    }

    #[tokio::test]
    async fn test_per_provider_emits_in_settlement_order() {
        let backend = FakeBackend {
            per_provider: HashMap::from([
                ("a".to_string(), Scripted::Candles(50, 40)),
                ("b".to_string(), Scripted::Status(StatusCode::INTERNAL_SERVER_ERROR, 5)),
                ("c".to_string(), Scripted::Candles(0, 20)),
            ]),
            batch: None,
        };
        let orchestrator =
            FetchOrchestrator::new(Arc::new(backend), providers(), RequestShape::PerProvider);

        let mut events = Vec::new();
        let summary = orchestrator.run_cycle(&request(), |e| events.push(e)).await;

        assert_eq!(summary, CycleSummary { ok: 1, empty: 1, failed: 1 });
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.cycle() == CycleId(7)));

        let order: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                FetchEvent::Settled { results, .. } => Some(results[0].provider.clone()),
                FetchEvent::Finished { .. } => None,
            })
            .collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert_eq!(events.last(), Some(&FetchEvent::Finished { cycle: CycleId(7) }));
    }

    #[tokio::test]
    async fn test_per_provider_failures_are_contained_and_normalized() {
        let backend = FakeBackend {
            per_provider: HashMap::from([
                ("a".to_string(), Scripted::Candles(3, 0)),
                ("b".to_string(), Scripted::Malformed(0)),
            ]),
            batch: None,
        };
        let orchestrator =
            FetchOrchestrator::new(Arc::new(backend), providers(), RequestShape::PerProvider);

        let mut results = Vec::new();
        orchestrator
            .run_cycle(&request(), |e| {
                if let FetchEvent::Settled { results: r, .. } = e {
                    results.extend(r);
                }
            })
            .await;

        assert_eq!(results.len(), 3);

        let a = results.iter().find(|r| r.provider == "a").unwrap();
        assert!(a.is_displayable());
        // Millisecondes converties en secondes
        assert_eq!(a.data[0].time, 1_700_000_000);
        assert_eq!(a.data[1].time, 1_700_000_060);

        let b = results.iter().find(|r| r.provider == "b").unwrap();
        assert!(!b.success);
        assert!(b.error.as_deref().unwrap().starts_with("Malformed response"));

        let c = results.iter().find(|r| r.provider == "c").unwrap();
        assert_eq!(c.error.as_deref(), Some("Unknown provider: c"));
    }

    #[tokio::test]
    async fn test_batched_applies_atomically() {
        let entries = vec![
            BatchEntry {
                adapter_name: "Provider C".to_string(),
                success: true,
                data: Some(Vec::new()),
                error: None,
                rate_limit_info: Some("Free tier".to_string()),
            },
            BatchEntry {
                adapter_name: "a".to_string(),
                success: true,
                data: Some(raw_candles(50)),
                error: None,
                rate_limit_info: None,
            },
            BatchEntry {
                adapter_name: "Somebody Else".to_string(),
                success: true,
                data: Some(raw_candles(5)),
                error: None,
                rate_limit_info: None,
            },
        ];
        let backend = FakeBackend {
            per_provider: HashMap::new(),
            batch: Some(Ok(entries)),
        };
        let orchestrator =
            FetchOrchestrator::new(Arc::new(backend), providers(), RequestShape::Batched);

        let mut events = Vec::new();
        let summary = orchestrator.run_cycle(&request(), |e| events.push(e)).await;

        assert_eq!(events.len(), 2);
        let FetchEvent::Settled { results, .. } = &events[0] else {
            panic!("expected a settled event first");
        };

        let keys: Vec<&str> = results.iter().map(|r| r.provider.as_str()).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
        assert_eq!(results[0].rate_limit_info.as_deref(), Some("Free tier"));
        assert_eq!(results[2].error.as_deref(), Some("No result returned for Provider B"));
        assert_eq!(summary, CycleSummary { ok: 1, empty: 1, failed: 1 });
    }

    #[tokio::test]
    async fn test_batched_transport_failure_fails_every_provider() {
        let backend = FakeBackend {
            per_provider: HashMap::new(),
            batch: Some(Err(StatusCode::BAD_GATEWAY)),
        };
        let orchestrator =
            FetchOrchestrator::new(Arc::new(backend), providers(), RequestShape::Batched);

        let mut events = Vec::new();
        let summary = orchestrator.run_cycle(&request(), |e| events.push(e)).await;

        assert_eq!(summary.failed, 3);
        let FetchEvent::Settled { results, .. } = &events[0] else {
            panic!("expected a settled event first");
        };
        assert!(results.iter().all(|r| !r.success));
        assert_eq!(
            results[0].error.as_deref(),
            Some("HTTP error! status: 502 Bad Gateway")
        );
    }

    #[tokio::test]
    async fn test_adapter_exception_envelope_is_a_failure() {
        let backend = FakeBackend {
            per_provider: HashMap::from([
                ("a".to_string(), Scripted::AdapterError("Alpha Vantage API key missing")),
                ("b".to_string(), Scripted::Candles(0, 0)),
                ("c".to_string(), Scripted::Candles(2, 0)),
            ]),
            batch: None,
        };
        let orchestrator =
            FetchOrchestrator::new(Arc::new(backend), providers(), RequestShape::PerProvider);

        let mut results = Vec::new();
        let summary = orchestrator
            .run_cycle(&request(), |e| {
                if let FetchEvent::Settled { results: r, .. } = e {
                    results.extend(r);
                }
            })
            .await;

        assert_eq!(summary, CycleSummary { ok: 1, empty: 1, failed: 1 });

        let a = results.iter().find(|r| r.provider == "a").unwrap();
        assert!(!a.success);
        assert_eq!(a.error.as_deref(), Some("Alpha Vantage API key missing"));

        // "no_data" reste une réponse vide, pas un échec
        let b = results.iter().find(|r| r.provider == "b").unwrap();
        assert!(b.success);
        assert!(b.data.is_empty());
    }

    #[test]
    fn test_result_from_payload_envelopes() {
        let provider = ProviderSpec::new("alpha_vantage", "Alpha Vantage");

        let failed: ProviderPayload =
            serde_json::from_str(r#"{"candles": [], "error": "Alpha Vantage API key missing"}"#).unwrap();
        let result = result_from_payload(&provider, Ok(failed));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Alpha Vantage API key missing"));

        let empty: ProviderPayload =
            serde_json::from_str(r#"{"candles": [], "error": "no_data"}"#).unwrap();
        let result = result_from_payload(&provider, Ok(empty));
        assert!(result.success);
        assert!(!result.is_displayable());
    }
}
