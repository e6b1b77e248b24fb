// ============================================================================
// TerminalChart : la surface de production
// ============================================================================
// Garde l'état du graphique (la série vivante et la plage visible) ;
// ui::chart le dessine à chaque frame.
//
// La plage visible est une plage de temps. fit_visible_range() l'étend à
// toute la série ; sans fit, le rendu montre les derniers points qui tiennent.
// ============================================================================

use tracing::{debug, warn};

use crate::chart::{ChartOptions, ChartSurface, SeriesId, SeriesKind, SeriesPoint, SeriesStyle};

/// La série attachée au graphique
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSeries {
    pub id: SeriesId,
    pub kind: SeriesKind,
    pub style: SeriesStyle,
    pub points: Vec<SeriesPoint>,
}

/// Graphique terminal (au plus une série)
#[derive(Debug, Clone)]
pub struct TerminalChart {
    options: ChartOptions,
    live: Option<LiveSeries>,
    visible_range: Option<(i64, i64)>,
    next_id: u64,
}

impl TerminalChart {
    pub fn new(options: ChartOptions) -> Self {
        Self {
            options,
            live: None,
            visible_range: None,
            next_id: 0,
        }
    }

    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    pub fn live(&self) -> Option<&LiveSeries> {
        self.live.as_ref()
    }

    /// Plage de temps ajustée (None tant qu'aucun fit n'a eu lieu)
    pub fn visible_range(&self) -> Option<(i64, i64)> {
        self.visible_range
    }

    /// Points à dessiner sur `width` colonnes
    ///
    /// Avec une plage ajustée, toute la plage est compressée dans la largeur ;
    /// sinon on garde les `width` derniers points.
    pub fn visible_points(&self, width: usize) -> Vec<SeriesPoint> {
        let Some(live) = &self.live else {
            return Vec::new();
        };

        match self.visible_range {
            Some((from, to)) => {
                let in_range: Vec<SeriesPoint> = live
                    .points
                    .iter()
                    .filter(|p| p.time() >= from && p.time() <= to)
                    .copied()
                    .collect();
                compress(&in_range, width)
            }
            None => {
                let start = live.points.len().saturating_sub(width);
                live.points[start..].to_vec()
            }
        }
    }
}

impl Default for TerminalChart {
    fn default() -> Self {
        Self::new(ChartOptions::default())
    }
}

impl ChartSurface for TerminalChart {
    fn add_series(&mut self, kind: SeriesKind, style: SeriesStyle) -> SeriesId {
        if let Some(previous) = &self.live {
            warn!(series = %previous.id, "Series still attached, replacing it");
        }

        self.next_id += 1;
        let id = SeriesId(self.next_id);
        self.live = Some(LiveSeries {
            id,
            kind,
            style,
            points: Vec::new(),
        });
        self.visible_range = None;
        debug!(series = %id, kind = kind.label(), "Series added");
        id
    }

    fn set_data(&mut self, id: SeriesId, points: Vec<SeriesPoint>) {
        match &mut self.live {
            Some(live) if live.id == id => live.points = points,
            _ => warn!(series = %id, "set_data on a detached series ignored"),
        }
    }

    fn remove_series(&mut self, id: SeriesId) {
        if self.live.as_ref().is_some_and(|live| live.id == id) {
            self.live = None;
            self.visible_range = None;
            debug!(series = %id, "Series removed");
        }
    }

    fn fit_visible_range(&mut self) {
        // Bornes sur tous les points : l'ordre des données n'est pas garanti
        self.visible_range = self.live.as_ref().and_then(|live| {
            let from = live.points.iter().map(SeriesPoint::time).min()?;
            let to = live.points.iter().map(SeriesPoint::time).max()?;
            Some((from, to))
        });
    }
}

/// Compresse `points` en au plus `width` points
///
/// Un seau OHLC fusionne ses points (premier open, plus haut high, plus bas
/// low, dernier close) ; un seau de valeurs garde la dernière valeur.
pub fn compress(points: &[SeriesPoint], width: usize) -> Vec<SeriesPoint> {
    if width == 0 {
        return Vec::new();
    }
    if points.len() <= width {
        return points.to_vec();
    }

    (0..width)
        .filter_map(|bucket| {
            let start = bucket * points.len() / width;
            let end = (bucket + 1) * points.len() / width;
            merge(&points[start..end])
        })
        .collect()
}

fn merge(bucket: &[SeriesPoint]) -> Option<SeriesPoint> {
    let first = *bucket.first()?;
    let last = *bucket.last()?;

    match (first, last) {
        (SeriesPoint::Ohlc { time, open, .. }, SeriesPoint::Ohlc { close, .. }) => {
            let (low, high) = bucket.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                let (l, h) = p.range();
                (lo.min(l), hi.max(h))
            });
            Some(SeriesPoint::Ohlc {
                time,
                open,
                high,
                low,
                close,
            })
        }
        _ => Some(last),
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ohlc(time: i64, open: f64, high: f64, low: f64, close: f64) -> SeriesPoint {
        SeriesPoint::Ohlc {
            time,
            open,
            high,
            low,
            close,
        }
    }

    #[test]
    fn test_single_live_series() {
        let mut chart = TerminalChart::default();
        let first = chart.add_series(SeriesKind::Candlestick, SeriesKind::Candlestick.default_style());
        chart.remove_series(first);
        let second = chart.add_series(SeriesKind::Line, SeriesKind::Line.default_style());

        assert_ne!(first, second);
        assert_eq!(chart.live().map(|l| l.kind), Some(SeriesKind::Line));
    }

    #[test]
    fn test_set_data_on_removed_series_is_ignored() {
        let mut chart = TerminalChart::default();
        let old = chart.add_series(SeriesKind::Bar, SeriesKind::Bar.default_style());
        chart.remove_series(old);
        let new = chart.add_series(SeriesKind::Bar, SeriesKind::Bar.default_style());

        chart.set_data(old, vec![ohlc(1, 1.0, 1.0, 1.0, 1.0)]);
        assert!(chart.live().unwrap().points.is_empty());

        chart.set_data(new, vec![ohlc(1, 1.0, 1.0, 1.0, 1.0)]);
        assert_eq!(chart.live().unwrap().points.len(), 1);
    }

    #[test]
    fn test_fit_covers_whole_series() {
        let mut chart = TerminalChart::default();
        let id = chart.add_series(SeriesKind::Line, SeriesKind::Line.default_style());
        let points: Vec<SeriesPoint> = (0..100)
            .map(|i| SeriesPoint::Value {
                time: i * 60,
                value: i as f64,
            })
            .collect();
        chart.set_data(id, points);

        // Sans fit : les derniers points seulement
        let tail = chart.visible_points(10);
        assert_eq!(tail.first().map(|p| p.time()), Some(90 * 60));

        chart.fit_visible_range();
        assert_eq!(chart.visible_range(), Some((0, 99 * 60)));
        let fitted = chart.visible_points(10);
        assert_eq!(fitted.len(), 10);
        assert_eq!(fitted.first().map(|p| p.time()), Some(9 * 60));
        assert_eq!(fitted.last().map(|p| p.last_value()), Some(99.0));
    }

    #[test]
    fn test_fit_covers_out_of_order_points() {
        let mut chart = TerminalChart::default();
        let id = chart.add_series(SeriesKind::Candlestick, SeriesKind::Candlestick.default_style());
        chart.set_data(
            id,
            vec![
                ohlc(300, 1.0, 2.0, 0.5, 1.5),
                ohlc(100, 1.0, 2.0, 0.5, 1.5),
                ohlc(500, 1.0, 2.0, 0.5, 1.5),
                ohlc(200, 1.0, 2.0, 0.5, 1.5),
            ],
        );

        chart.fit_visible_range();
        assert_eq!(chart.visible_range(), Some((100, 500)));
        assert_eq!(chart.visible_points(10).len(), 4);
    }

    #[test]
    fn test_compress_merges_ohlc_buckets() {
        let points = vec![
            ohlc(1, 10.0, 12.0, 9.0, 11.0),
            ohlc(2, 11.0, 15.0, 10.0, 14.0),
            ohlc(3, 14.0, 14.5, 8.0, 9.0),
            ohlc(4, 9.0, 10.0, 7.0, 8.0),
        ];

        let merged = compress(&points, 2);

        assert_eq!(
            merged,
            vec![ohlc(1, 10.0, 15.0, 9.0, 14.0), ohlc(3, 14.0, 14.5, 7.0, 8.0)]
        );
    }

    #[test]
    fn test_compress_short_series_untouched() {
        let points = vec![ohlc(1, 1.0, 2.0, 0.5, 1.5)];
        assert_eq!(compress(&points, 80), points);
        assert!(compress(&points, 0).is_empty());
    }
}
