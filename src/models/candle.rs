// ============================================================================
// Structures : Candle et RawCandle
// ============================================================================
// Candle    : chandelle canonique (time en secondes Unix entières)
// RawCandle : chandelle telle que renvoyée par un provider, avant normalisation
//
// CONCEPTS RUST :
// 1. i64 pour le temps : secondes Unix, triées par ordre croissant
// 2. f64 pour les prix : passés tels quels, jamais revalidés
// 3. Désérialisation custom : un champ JSON qui peut être nombre OU texte
// ============================================================================

use chrono::{DateTime, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Une chandelle OHLC canonique
///
/// Invariant attendu de l'amont (non revérifié) : low ≤ open,close ≤ high
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Timestamp en secondes Unix
    pub time: i64,

    /// Prix d'ouverture (Open)
    pub open: f64,

    /// Prix le plus haut (High)
    pub high: f64,

    /// Prix le plus bas (Low)
    pub low: f64,

    /// Prix de clôture (Close)
    pub close: f64,
}

impl Candle {
    /// Constructeur : crée une nouvelle chandelle
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
        }
    }

    /// Valeur unique pour les séries line/area : le prix de clôture
    pub fn value(&self) -> f64 {
        self.close
    }
}

/// Chandelle côté provider, avant normalisation
///
/// Le champ `time` accepte :
/// - un nombre : secondes, millisecondes ou secondes fractionnaires
/// - une date texte : "2024-01-15", "20240115" ou RFC 3339
///
/// Les dates texte sont converties en secondes dès la désérialisation.
/// Une date illisible rend tout le payload invalide (erreur de transport).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RawCandle {
    #[serde(deserialize_with = "time_from_number_or_date")]
    pub time: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl RawCandle {
    pub fn new(time: f64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
        }
    }
}

// ============================================================================
// Désérialisation du champ time
// ============================================================================
// CONCEPT RUST : #[serde(untagged)]
// - Serde essaie chaque variant dans l'ordre jusqu'à ce qu'un match
// - Permet d'accepter 1700000000, 1700000000000.0 ou "2024-01-15"
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTime {
    Number(f64),
    Text(String),
}

fn time_from_number_or_date<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match WireTime::deserialize(deserializer)? {
        WireTime::Number(value) => Ok(value),
        WireTime::Text(text) => parse_time_text(&text)
            .ok_or_else(|| de::Error::custom(format!("unrecognised candle time: {text:?}"))),
    }
}

/// Convertit une date texte en secondes Unix (minuit UTC pour une date seule)
pub fn parse_time_text(text: &str) -> Option<f64> {
    let text = text.trim();

    // "20240115" est aussi un nombre valide : la forme compacte passe en premier
    if text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()) {
        return parse_date(text, "%Y%m%d");
    }

    if let Ok(value) = text.parse::<f64>() {
        return Some(value);
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.timestamp() as f64);
    }

    parse_date(text, "%Y-%m-%d")
}

fn parse_date(text: &str, format: &str) -> Option<f64> {
    NaiveDate::parse_from_str(text, format)
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().timestamp() as f64)
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_value_is_close() {
        let candle = Candle::new(1_700_000_000, 1.0, 2.0, 0.5, 1.5);
        assert_eq!(candle.value(), 1.5);
    }

    #[test]
    fn test_raw_candle_numeric_time() {
        let raw: RawCandle = serde_json::from_str(
            r#"{"time": 1700000000.75, "open": 1, "high": 2, "low": 0.5, "close": 1.5}"#,
        )
        .unwrap();
        assert_eq!(raw.time, 1_700_000_000.75);
        assert_eq!(raw.high, 2.0);
    }

    #[test]
    fn test_raw_candle_date_string_time() {
        let raw: RawCandle = serde_json::from_str(
            r#"{"time": "2024-01-15", "open": 1, "high": 2, "low": 0.5, "close": 1.5, "volume": 10}"#,
        )
        .unwrap();
        assert_eq!(raw.time, 1_705_276_800.0);
    }

    #[test]
    fn test_parse_time_text_formats() {
        assert_eq!(parse_time_text("20240115"), Some(1_705_276_800.0));
        assert_eq!(parse_time_text("2024-01-15T00:00:00Z"), Some(1_705_276_800.0));
        assert_eq!(parse_time_text("1700000000"), Some(1_700_000_000.0));
        assert_eq!(parse_time_text("yesterday"), None);
    }

    #[test]
    fn test_raw_candle_rejects_garbage_time() {
        let result: Result<RawCandle, _> = serde_json::from_str(
            r#"{"time": "soon", "open": 1, "high": 2, "low": 0.5, "close": 1.5}"#,
        );
        assert!(result.is_err());
    }
}
