// ============================================================================
// Client HTTP : backend d'agrégation OHLC
// ============================================================================
// Implémente CandleBackend avec reqwest
//
// CONCEPTS RUST :
// 1. async/await : les appels réseau ne bloquent pas le thread
// 2. Result<T, FetchError> : chaque échec est classé (réseau, HTTP, JSON)
// 3. Serde : désérialisation du contrat JSON
// ============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument};

use crate::api::backend::{
    AdapterInfo, AdapterList, BatchEntry, BatchRequest, BatchResponse, CandleBackend,
    ProviderPayload,
};
use crate::api::FetchError;
use crate::models::ProviderSpec;

const USER_AGENT: &str = concat!("candledeck/", env!("CARGO_PKG_VERSION"));

/// Client du backend (un seul reqwest::Client partagé entre les appels)
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpBackend {
    /// Crée le client
    ///
    /// Seule erreur possible : URL de base invalide ou client non construit.
    /// Les erreurs d'appel, elles, sont toujours des FetchError.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("URL de backend invalide : {base_url}"))?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// POST {base}/api/fetch
    fn batch_url(&self) -> Result<Url, FetchError> {
        self.endpoint(&["api", "fetch"])
    }

    /// GET {base}/api/ohlcv/{key}?symbol=...&days=...
    fn provider_url(&self, key: &str, symbol: &str, days: u32) -> Result<Url, FetchError> {
        let mut url = self.endpoint(&["api", "ohlcv", key])?;
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("days", &days.to_string());
        Ok(url)
    }

    /// GET {base}/api/adapters
    fn adapters_url(&self) -> Result<Url, FetchError> {
        self.endpoint(&["api", "adapters"])
    }

    /// Ajoute des segments de chemin à l'URL de base (encodés par Url)
    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Network(format!("cannot-be-a-base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Envoie la requête, vérifie le statut, parse le JSON
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        // Vérifie que la réponse est un succès HTTP (200-299)
        if !status.is_success() {
            error!(status = %status, "Backend returned error status");
            return Err(FetchError::Status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        decode_body(status, &body)
    }
}

/// Classe une réponse reçue : statut hors 2xx, JSON illisible ou valeur
fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, FetchError> {
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    serde_json::from_slice(body).map_err(|e| FetchError::Malformed(e.to_string()))
}

#[async_trait]
impl CandleBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn fetch_batch(&self, symbol: &str, days: u32) -> Result<Vec<BatchEntry>, FetchError> {
        let url = self.batch_url()?;
        debug!(url = %url, "Sending batched fetch");

        let response: BatchResponse = self
            .send_json(self.client.post(url).json(&BatchRequest { symbol, days }))
            .await?;

        info!(results = response.results.len(), "Batched fetch answered");
        Ok(response.results)
    }

    #[instrument(skip(self, provider), fields(provider = %provider.key))]
    async fn fetch_provider(
        &self,
        provider: &ProviderSpec,
        symbol: &str,
        days: u32,
    ) -> Result<ProviderPayload, FetchError> {
        let url = self.provider_url(&provider.key, symbol, days)?;
        debug!(url = %url, "Sending provider fetch");

        let payload: ProviderPayload = self
            .send_json(self.client.get(url))
            .await
            .map_err(|err| match err {
                FetchError::Status(status) if status == reqwest::StatusCode::NOT_FOUND => {
                    FetchError::UnknownProvider(provider.key.clone())
                }
                other => other,
            })?;

        info!(candles = payload.candles.len(), "Provider fetch answered");
        Ok(payload)
    }

    #[instrument(skip(self))]
    async fn list_adapters(&self) -> Result<Vec<AdapterInfo>, FetchError> {
        let url = self.adapters_url()?;
        let list: AdapterList = self.send_json(self.client.get(url)).await?;
        debug!(adapters = list.adapters.len(), "Adapter list received");
        Ok(list.adapters)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
