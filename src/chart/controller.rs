// ============================================================================
// ChartController : une série vivante, deux axes de changement
// ============================================================================
// État : (type actif, provider actif, handle de la série)
//
// - rebind(provider)   : pousse les données du registre dans la série existante
// - change_type(kind)  : détruit la série, en crée une du nouveau type, rebind
//
// INVARIANT : au plus une série attachée à la surface ; l'ancienne est
// toujours retirée avant que la nouvelle soit ajoutée.
// ============================================================================

use tracing::{debug, info, warn};

use crate::chart::{ChartSurface, SeriesId, SeriesKind};
use crate::sources::SourceRegistry;

/// Résultat d'une opération du controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartOutcome {
    /// Le graphique montre maintenant `points` points de `provider`
    Displayed { provider: String, points: usize },

    /// Provider absent du registre : rien n'a changé
    Unavailable { provider: String },

    /// Aucun provider actif : rien n'a changé
    NoData,
}

impl ChartOutcome {
    pub fn is_displayed(&self) -> bool {
        matches!(self, ChartOutcome::Displayed { .. })
    }
}

/// Propriétaire unique de la série du graphique
pub struct ChartController<S: ChartSurface> {
    surface: S,
    kind: SeriesKind,
    provider: Option<String>,
    series: Option<SeriesId>,
}

impl<S: ChartSurface> ChartController<S> {
    /// Crée le graphique avec une série chandeliers vide
    pub fn new(mut surface: S) -> Self {
        let kind = SeriesKind::default();
        let series = surface.add_series(kind, kind.default_style());
        debug!(series = %series, kind = kind.label(), "Initial series attached");

        Self {
            surface,
            kind,
            provider: None,
            series: Some(series),
        }
    }

    pub fn active_kind(&self) -> SeriesKind {
        self.kind
    }

    pub fn active_provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Lie la série vivante aux données de `provider`
    ///
    /// Ne recrée pas la série. Un provider absent du registre laisse le
    /// graphique tel quel.
    pub fn rebind(&mut self, registry: &SourceRegistry, provider: &str) -> ChartOutcome {
        let Some(candles) = registry.get(provider) else {
            warn!(provider, "Provider not in registry, chart left unchanged");
            return ChartOutcome::Unavailable {
                provider: provider.to_string(),
            };
        };

        let series = match self.series {
            Some(series) => series,
            None => self.attach(self.kind),
        };

        let points = self.kind.points(candles);
        let count = points.len();
        self.surface.set_data(series, points);
        self.surface.fit_visible_range();
        self.provider = Some(provider.to_string());

        info!(provider, kind = self.kind.label(), points = count, "Chart bound");
        ChartOutcome::Displayed {
            provider: provider.to_string(),
            points: count,
        }
    }

    /// Remplace la série par une série de type `kind` et la repeuple
    ///
    /// Sans provider actif (ou si le registre ne l'a plus), ne touche à rien.
    pub fn change_type(&mut self, registry: &SourceRegistry, kind: SeriesKind) -> ChartOutcome {
        let Some(provider) = self.provider.clone() else {
            debug!(kind = kind.label(), "No active provider, type change ignored");
            return ChartOutcome::NoData;
        };

        if !registry.contains(&provider) {
            debug!(provider = %provider, "Active provider gone from registry, type change ignored");
            return ChartOutcome::NoData;
        }

        if let Some(old) = self.series.take() {
            self.surface.remove_series(old);
        }
        self.kind = kind;
        self.attach(kind);

        self.rebind(registry, &provider)
    }

    /// Ajoute une série du type donné (la précédente doit déjà être retirée)
    fn attach(&mut self, kind: SeriesKind) -> SeriesId {
        let series = self.surface.add_series(kind, kind.default_style());
        self.series = Some(series);
        series
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::recording::{RecordingSurface, SurfaceCall};
    use crate::models::{Candle, CycleId};

    fn candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| Candle::new(1_700_000_000 + i as i64 * 86_400, 1.0, 2.0, 0.5, 1.5))
            .collect()
    }

    fn registry(entries: &[(&str, usize)]) -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        let cycle = CycleId(1);
        registry.reset(cycle);
        for (provider, count) in entries {
            registry.register(cycle, provider, candles(*count));
        }
        registry
    }

    #[test]
    fn test_new_attaches_one_candlestick_series() {
        let controller = ChartController::new(RecordingSurface::new());
        assert_eq!(controller.surface().attached_count(), 1);
        assert_eq!(controller.surface().kind(), Some(SeriesKind::Candlestick));
        assert_eq!(controller.active_provider(), None);
    }

    #[test]
    fn test_rebind_updates_without_recreating() {
        let registry = registry(&[("coingecko", 10), ("stooq", 4)]);
        let mut controller = ChartController::new(RecordingSurface::new());

        assert!(controller.rebind(&registry, "coingecko").is_displayed());
        let outcome = controller.rebind(&registry, "stooq");

        assert_eq!(
            outcome,
            ChartOutcome::Displayed {
                provider: "stooq".to_string(),
                points: 4
            }
        );
        let adds = controller
            .surface()
            .calls
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Add(..)))
            .count();
        assert_eq!(adds, 1);
        assert_eq!(controller.surface().calls.last(), Some(&SurfaceCall::Fit));
    }

    #[test]
    fn test_rebind_unknown_provider_is_noop() {
        let registry = registry(&[("coingecko", 10)]);
        let mut controller = ChartController::new(RecordingSurface::new());
        controller.rebind(&registry, "coingecko");
        let calls_before = controller.surface().calls.len();

        let outcome = controller.rebind(&registry, "stooq");

        assert_eq!(
            outcome,
            ChartOutcome::Unavailable {
                provider: "stooq".to_string()
            }
        );
        assert_eq!(controller.surface().calls.len(), calls_before);
        assert_eq!(controller.active_provider(), Some("coingecko"));
    }

    #[test]
    fn test_change_type_removes_before_adding() {
        let registry = registry(&[("coingecko", 10)]);
        let mut controller = ChartController::new(RecordingSurface::new());
        controller.rebind(&registry, "coingecko");

        controller.change_type(&registry, SeriesKind::Line);

        let calls = &controller.surface().calls;
        let remove = calls
            .iter()
            .position(|c| matches!(c, SurfaceCall::Remove(_)))
            .unwrap();
        let last_add = calls
            .iter()
            .rposition(|c| matches!(c, SurfaceCall::Add(..)))
            .unwrap();
        assert!(remove < last_add);
        assert_eq!(controller.surface().attached_count(), 1);
        assert_eq!(controller.active_kind(), SeriesKind::Line);
    }

    #[test]
    fn test_change_type_keeps_point_count_for_every_kind() {
        let registry = registry(&[("stooq", 37)]);
        let mut controller = ChartController::new(RecordingSurface::new());
        controller.rebind(&registry, "stooq");

        for kind in SeriesKind::ALL {
            controller.change_type(&registry, kind);
            let outcome = controller.rebind(&registry, "stooq");

            assert_eq!(controller.surface().attached_count(), 1);
            assert_eq!(controller.surface().points().map(|p| p.len()), Some(37));
            assert_eq!(
                outcome,
                ChartOutcome::Displayed {
                    provider: "stooq".to_string(),
                    points: 37
                }
            );
        }
    }

    #[test]
    fn test_change_type_without_provider_is_noop() {
        let registry = SourceRegistry::new();
        let mut controller = ChartController::new(RecordingSurface::new());

        let outcome = controller.change_type(&registry, SeriesKind::Area);

        assert_eq!(outcome, ChartOutcome::NoData);
        assert_eq!(controller.active_kind(), SeriesKind::Candlestick);
        assert_eq!(controller.surface().calls.len(), 1);
    }
}
