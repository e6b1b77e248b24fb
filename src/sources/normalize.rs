// ============================================================================
// Normalisation : RawCandle -> Candle
// ============================================================================
// Ramène chaque chandelle provider à la forme canonique
//
// RÈGLES :
// - time : secondes Unix entières (millisecondes détectées puis divisées)
// - fractions : toujours floor(), jamais round() (ordre chronologique stable)
// - open/high/low/close : passés tels quels
// - pas de tri, pas de dédoublonnage, pas de validation de monotonie
// ============================================================================

use crate::models::{Candle, RawCandle};

/// Au-delà de ce seuil, un timestamp est interprété en millisecondes
///
/// 1e11 secondes = an 5138 ; 1e11 millisecondes = 1973.
pub const MILLIS_THRESHOLD: f64 = 1e11;

/// Normalise un timestamp provider en secondes Unix entières
///
/// Fonction totale : NaN donne 0 et les infinis saturent (cast `as i64`).
pub fn normalize_time(time: f64) -> i64 {
    let seconds = if time.abs() >= MILLIS_THRESHOLD {
        time / 1000.0
    } else {
        time
    };
    seconds.floor() as i64
}

/// Normalise une chandelle
pub fn normalize_candle(raw: &RawCandle) -> Candle {
    Candle::new(
        normalize_time(raw.time),
        raw.open,
        raw.high,
        raw.low,
        raw.close,
    )
}

/// Normalise une séquence complète : même longueur, même ordre
pub fn normalize_candles(raw: &[RawCandle]) -> Vec<Candle> {
    raw.iter().map(normalize_candle).collect()
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractional_seconds_are_truncated() {
        let raw = RawCandle::new(1_700_000_000.750, 1.0, 2.0, 0.5, 1.5);
        let candle = normalize_candle(&raw);
        assert_eq!(candle.time, 1_700_000_000);
        assert_eq!(candle.open, 1.0);
        assert_eq!(candle.high, 2.0);
        assert_eq!(candle.low, 0.5);
        assert_eq!(candle.close, 1.5);
    }

    #[test]
    fn test_milliseconds_are_converted() {
        assert_eq!(normalize_time(1_700_000_000_999.0), 1_700_000_000);
        assert_eq!(normalize_time(1_700_000_000_000.0), 1_700_000_000);
    }

    #[test]
    fn test_plain_seconds_unchanged() {
        assert_eq!(normalize_time(1_700_000_000.0), 1_700_000_000);
        assert_eq!(normalize_time(0.0), 0);
    }

    #[test]
    fn test_non_finite_times_do_not_panic() {
        assert_eq!(normalize_time(f64::NAN), 0);
        assert_eq!(normalize_time(f64::INFINITY), i64::MAX);
    }

    #[test]
    fn test_order_and_length_preserved() {
        // Séquence volontairement non monotone avec doublon : rien n'est corrigé
        let raw = vec![
            RawCandle::new(30.9, 1.0, 1.0, 1.0, 1.0),
            RawCandle::new(10.1, 2.0, 2.0, 2.0, 2.0),
            RawCandle::new(10.1, 3.0, 3.0, 3.0, 3.0),
        ];

        let candles = normalize_candles(&raw);
        assert_eq!(candles.len(), raw.len());

        let times: Vec<i64> = candles.iter().map(|c| c.time).collect();
        assert_eq!(times, vec![30, 10, 10]);

        let opens: Vec<f64> = candles.iter().map(|c| c.open).collect();
        assert_eq!(opens, vec![1.0, 2.0, 3.0]);
    }
}
