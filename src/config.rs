// ============================================================================
// Configuration : variables d'environnement (+ fichier .env)
// ============================================================================
// Toutes les valeurs ont un défaut ; une valeur invalide est signalée par un
// warning et remplacée par le défaut (jamais d'erreur au démarrage).
//
// CONCEPT RUST : Lookup injectable
// - from_env() lit std::env
// - from_lookup() prend une closure : les tests n'ont pas à toucher l'env
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::api::RequestShape;
use crate::models::ProviderSpec;

pub const BACKEND_URL_ENV: &str = "CANDLEDECK_BACKEND_URL";
pub const REQUEST_SHAPE_ENV: &str = "CANDLEDECK_REQUEST_SHAPE";
pub const PROVIDERS_ENV: &str = "CANDLEDECK_PROVIDERS";
pub const DISCOVER_PROVIDERS_ENV: &str = "CANDLEDECK_DISCOVER_PROVIDERS";
pub const TIMEOUT_SECS_ENV: &str = "CANDLEDECK_TIMEOUT_SECS";
pub const SYMBOL_ENV: &str = "CANDLEDECK_SYMBOL";
pub const DAYS_ENV: &str = "CANDLEDECK_DAYS";
pub const LOG_DIR_ENV: &str = "CANDLEDECK_LOG_DIR";

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_SYMBOL: &str = "BTC";
pub const DEFAULT_DAYS: u32 = 90;
pub const MAX_DAYS: u32 = 365;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration de la session
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub backend_url: String,
    pub request_shape: RequestShape,
    pub providers: Vec<ProviderSpec>,
    pub discover_providers: bool,
    pub timeout: Duration,
    pub symbol: String,
    pub days: u32,
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_shape: RequestShape::default(),
            providers: ProviderSpec::defaults(),
            discover_providers: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            symbol: DEFAULT_SYMBOL.to_string(),
            days: DEFAULT_DAYS,
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Lit la configuration depuis l'environnement du process
    ///
    /// Le fichier .env doit déjà avoir été chargé (dotenv) par l'appelant.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construit la configuration à partir d'une fonction de lecture
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend_url = read(BACKEND_URL_ENV).unwrap_or(defaults.backend_url);

        let request_shape = match read(REQUEST_SHAPE_ENV) {
            Some(value) => RequestShape::parse(&value).unwrap_or_else(|| {
                warn!(value = %value, "Invalid request shape, using default");
                defaults.request_shape
            }),
            None => defaults.request_shape,
        };

        let providers = match read(PROVIDERS_ENV) {
            Some(value) => {
                let parsed = parse_providers(&value);
                if parsed.is_empty() {
                    warn!(value = %value, "No provider in configuration, using defaults");
                    defaults.providers
                } else {
                    parsed
                }
            }
            None => defaults.providers,
        };

        let discover_providers = match read(DISCOVER_PROVIDERS_ENV) {
            Some(value) => parse_bool(&value).unwrap_or_else(|| {
                warn!(value = %value, "Invalid boolean for provider discovery, using default");
                defaults.discover_providers
            }),
            None => defaults.discover_providers,
        };

        let timeout = match read(TIMEOUT_SECS_ENV) {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(value = %value, "Invalid timeout, using default");
                    defaults.timeout
                }
            },
            None => defaults.timeout,
        };

        let symbol = read(SYMBOL_ENV)
            .map(|s| s.to_uppercase())
            .unwrap_or(defaults.symbol);

        let days = match read(DAYS_ENV) {
            Some(value) => match value.parse::<u32>() {
                Ok(days) if days > 0 => days.min(MAX_DAYS),
                _ => {
                    warn!(value = %value, "Invalid lookback days, using default");
                    defaults.days
                }
            },
            None => defaults.days,
        };

        let log_dir = read(LOG_DIR_ENV).map(PathBuf::from);

        Self {
            backend_url,
            request_shape,
            providers,
            discover_providers,
            timeout,
            symbol,
            days,
            log_dir,
        }
    }

    /// Répertoire des logs : configuré, sinon données locales, sinon ./logs
    pub fn resolve_log_dir(&self) -> PathBuf {
        default_log_dir(self.log_dir.clone())
    }

    /// Répertoire des logs lu seul, avant le reste de la configuration
    ///
    /// Le logging doit tourner avant from_env pour que ses warnings soient écrits.
    pub fn log_dir_from_env() -> PathBuf {
        Self::log_dir_from_lookup(|key| std::env::var(key).ok())
    }

    pub fn log_dir_from_lookup<F>(lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        let configured = lookup(LOG_DIR_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        default_log_dir(configured)
    }
}

fn default_log_dir(configured: Option<PathBuf>) -> PathBuf {
    configured.unwrap_or_else(|| {
        dirs::data_local_dir()
            .map(|dir| dir.join("candledeck").join("logs"))
            .unwrap_or_else(|| PathBuf::from("./logs"))
    })
}

/// Parse "key:Label,key:Label" (le label est optionnel : "stooq" -> stooq/stooq)
pub fn parse_providers(value: &str) -> Vec<ProviderSpec> {
    let mut providers: Vec<ProviderSpec> = Vec::new();

    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, label) = match item.split_once(':') {
            Some((key, label)) => (key.trim(), label.trim()),
            None => (item, item),
        };
        if key.is_empty() {
            warn!(item, "Provider without key ignored");
            continue;
        }
        if providers.iter().any(|p| p.key == key) {
            warn!(key, "Duplicate provider ignored");
            continue;
        }
        let label = if label.is_empty() { key } else { label };
        providers.push(ProviderSpec::new(key, label));
    }

    providers
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
