// ============================================================================
// Module : chart
// ============================================================================
// Le graphique est vu à travers un contrat minimal (ChartSurface) :
//   add_series / set_data / remove_series / fit_visible_range
//
// Seul le ChartController crée, modifie ou détruit la série vivante.
// ============================================================================

pub mod controller; // ChartController : une seule série active
pub mod series;     // Types de série, styles par défaut, points
pub mod terminal;   // Surface de production (rendue par ui::chart)

pub use controller::{ChartController, ChartOutcome};
pub use series::{Rgba, SeriesKind, SeriesPoint, SeriesStyle};
pub use terminal::{LiveSeries, TerminalChart};

use std::fmt;

/// Identifiant d'une série attachée à une surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesId(pub u64);

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "series-{}", self.0)
    }
}

/// Contrat consommé par le ChartController
pub trait ChartSurface {
    /// Attache une nouvelle série vide
    fn add_series(&mut self, kind: SeriesKind, style: SeriesStyle) -> SeriesId;

    /// Remplace les points d'une série
    fn set_data(&mut self, id: SeriesId, points: Vec<SeriesPoint>);

    /// Détache une série
    fn remove_series(&mut self, id: SeriesId);

    /// Ajuste la plage visible pour montrer toutes les données
    fn fit_visible_range(&mut self);
}

/// Options de création du graphique (thème sombre du dashboard)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartOptions {
    pub background: Rgba,
    pub text_color: Rgba,
    pub grid_color: Rgba,
    pub border_color: Rgba,
    pub time_visible: bool,
    pub seconds_visible: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            background: Rgba::rgb(0x16, 0x1B, 0x22), // #161B22
            text_color: Rgba::rgb(0xE6, 0xED, 0xF3), // #E6EDF3
            grid_color: Rgba::rgb(0x30, 0x36, 0x3D), // #30363D
            border_color: Rgba::rgb(0x30, 0x36, 0x3D),
            time_visible: true,
            seconds_visible: false,
        }
    }
}

// ============================================================================
// Double de test : enregistre chaque appel
// ============================================================================

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    /// Un appel reçu par la surface
    #[derive(Debug, Clone, PartialEq)]
    pub enum SurfaceCall {
        Add(SeriesId, SeriesKind),
        SetData(SeriesId, usize),
        Remove(SeriesId),
        Fit,
    }

    /// Surface qui garde la trace des appels et des séries attachées
    #[derive(Debug, Default)]
    pub struct RecordingSurface {
        pub calls: Vec<SurfaceCall>,
        pub attached: Vec<(SeriesId, SeriesKind, Vec<SeriesPoint>)>,
        next_id: u64,
    }

    impl RecordingSurface {
        pub fn new() -> Self {
            Self::default()
        }

        /// Nombre de séries attachées en même temps
        pub fn attached_count(&self) -> usize {
            self.attached.len()
        }

        pub fn points(&self) -> Option<&[SeriesPoint]> {
            self.attached.first().map(|(_, _, points)| points.as_slice())
        }

        pub fn kind(&self) -> Option<SeriesKind> {
            self.attached.first().map(|(_, kind, _)| *kind)
        }
    }

    impl ChartSurface for RecordingSurface {
        fn add_series(&mut self, kind: SeriesKind, _style: SeriesStyle) -> SeriesId {
            self.next_id += 1;
            let id = SeriesId(self.next_id);
            self.calls.push(SurfaceCall::Add(id, kind));
            self.attached.push((id, kind, Vec::new()));
            id
        }

        fn set_data(&mut self, id: SeriesId, points: Vec<SeriesPoint>) {
            self.calls.push(SurfaceCall::SetData(id, points.len()));
            if let Some(entry) = self.attached.iter_mut().find(|(sid, _, _)| *sid == id) {
                entry.2 = points;
            }
        }

        fn remove_series(&mut self, id: SeriesId) {
            self.calls.push(SurfaceCall::Remove(id));
            self.attached.retain(|(sid, _, _)| *sid != id);
        }

        fn fit_visible_range(&mut self) {
            self.calls.push(SurfaceCall::Fit);
        }
    }
}
