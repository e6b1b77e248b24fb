// ============================================================================
// Séries : type, style par défaut, points
// ============================================================================
// Chaque type de série a :
// - un style par défaut fixe (parité visuelle avec le dashboard web)
// - sa propre forme de point (OHLC complet ou (time, value=close))
//
// CONCEPT RUST : Tagged union
// - SeriesStyle porte le style propre à chaque variant
// - Une fonction fabrique par variant, pas de chaîne "line"/"area" qui traîne
// ============================================================================

use crate::models::Candle;

/// Couleur RGBA (alpha 0.0 = transparent, 1.0 = opaque)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Couleur opaque obtenue en posant self sur un fond
    ///
    /// Un terminal n'a pas de transparence : les dégradés de l'aire sont
    /// précalculés contre le fond du graphique.
    pub fn over(self, background: Rgba) -> Rgba {
        let alpha = self.a.clamp(0.0, 1.0);
        let mix = |top: u8, bottom: u8| -> u8 {
            (top as f32 * alpha + bottom as f32 * (1.0 - alpha)).round() as u8
        };
        Rgba::rgb(
            mix(self.r, background.r),
            mix(self.g, background.g),
            mix(self.b, background.b),
        )
    }
}

/// Couleurs partagées par les styles par défaut
pub const UP_COLOR: Rgba = Rgba::rgb(0x26, 0xA6, 0x9A); // #26A69A
pub const DOWN_COLOR: Rgba = Rgba::rgb(0xEF, 0x53, 0x50); // #EF5350
pub const LINE_COLOR: Rgba = Rgba::rgb(0x29, 0x62, 0xFF); // #2962FF

/// Type de série affichable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SeriesKind {
    #[default]
    Candlestick,
    Line,
    Area,
    Bar,
}

impl SeriesKind {
    /// Tous les types, dans l'ordre du sélecteur
    pub const ALL: [SeriesKind; 4] = [
        SeriesKind::Candlestick,
        SeriesKind::Line,
        SeriesKind::Area,
        SeriesKind::Bar,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SeriesKind::Candlestick => "candlestick",
            SeriesKind::Line => "line",
            SeriesKind::Area => "area",
            SeriesKind::Bar => "bar",
        }
    }

    /// Type suivant (cycle)
    pub fn next(&self) -> SeriesKind {
        let index = SeriesKind::ALL.iter().position(|k| k == self).unwrap_or(0);
        SeriesKind::ALL[(index + 1) % SeriesKind::ALL.len()]
    }

    /// Type précédent (cycle)
    pub fn previous(&self) -> SeriesKind {
        let index = SeriesKind::ALL.iter().position(|k| k == self).unwrap_or(0);
        SeriesKind::ALL[(index + SeriesKind::ALL.len() - 1) % SeriesKind::ALL.len()]
    }

    /// Fabrique du style par défaut de ce type
    pub fn default_style(&self) -> SeriesStyle {
        match self {
            SeriesKind::Candlestick => SeriesStyle::Candlestick(CandlestickStyle::default()),
            SeriesKind::Line => SeriesStyle::Line(LineStyle::default()),
            SeriesKind::Area => SeriesStyle::Area(AreaStyle::default()),
            SeriesKind::Bar => SeriesStyle::Bar(BarStyle::default()),
        }
    }

    /// Vrai si le type consomme l'OHLC complet
    pub fn uses_ohlc(&self) -> bool {
        matches!(self, SeriesKind::Candlestick | SeriesKind::Bar)
    }

    /// Convertit les chandelles canoniques en points de ce type (un point par chandelle)
    pub fn points(&self, candles: &[Candle]) -> Vec<SeriesPoint> {
        if self.uses_ohlc() {
            candles.iter().map(SeriesPoint::ohlc).collect()
        } else {
            candles.iter().map(SeriesPoint::value).collect()
        }
    }
}

/// Style d'une série, propre à son type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesStyle {
    Candlestick(CandlestickStyle),
    Line(LineStyle),
    Area(AreaStyle),
    Bar(BarStyle),
}

impl SeriesStyle {
    pub fn kind(&self) -> SeriesKind {
        match self {
            SeriesStyle::Candlestick(_) => SeriesKind::Candlestick,
            SeriesStyle::Line(_) => SeriesKind::Line,
            SeriesStyle::Area(_) => SeriesKind::Area,
            SeriesStyle::Bar(_) => SeriesKind::Bar,
        }
    }
}

/// Chandeliers : paire haussier/baissier, pas de bordure, mèches assorties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandlestickStyle {
    pub up_color: Rgba,
    pub down_color: Rgba,
    pub border_visible: bool,
    pub wick_up_color: Rgba,
    pub wick_down_color: Rgba,
}

impl Default for CandlestickStyle {
    fn default() -> Self {
        Self {
            up_color: UP_COLOR,
            down_color: DOWN_COLOR,
            border_visible: false,
            wick_up_color: UP_COLOR,
            wick_down_color: DOWN_COLOR,
        }
    }
}

/// Ligne : une couleur, une épaisseur fixe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: Rgba,
    pub line_width: u8,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: LINE_COLOR,
            line_width: 2,
        }
    }
}

/// Aire : dégradé haut/bas, couleur et épaisseur du trait
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaStyle {
    pub top_color: Rgba,
    pub bottom_color: Rgba,
    pub line_color: Rgba,
    pub line_width: u8,
}

impl Default for AreaStyle {
    fn default() -> Self {
        Self {
            top_color: Rgba::rgba(41, 98, 255, 0.4),
            bottom_color: Rgba::rgba(41, 98, 255, 0.0),
            line_color: LINE_COLOR,
            line_width: 2,
        }
    }
}

/// Barres OHLC : paire haussier/baissier, rien d'autre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarStyle {
    pub up_color: Rgba,
    pub down_color: Rgba,
}

impl Default for BarStyle {
    fn default() -> Self {
        Self {
            up_color: UP_COLOR,
            down_color: DOWN_COLOR,
        }
    }
}

/// Point poussé dans une série
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesPoint {
    /// Chandeliers et barres
    Ohlc {
        time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    /// Ligne et aire : value = close
    Value { time: i64, value: f64 },
}

impl SeriesPoint {
    pub fn ohlc(candle: &Candle) -> Self {
        SeriesPoint::Ohlc {
            time: candle.time,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
        }
    }

    pub fn value(candle: &Candle) -> Self {
        SeriesPoint::Value {
            time: candle.time,
            value: candle.value(),
        }
    }

    pub fn time(&self) -> i64 {
        match self {
            SeriesPoint::Ohlc { time, .. } | SeriesPoint::Value { time, .. } => *time,
        }
    }

    /// Bornes verticales du point (low, high) ; (value, value) pour une valeur
    pub fn range(&self) -> (f64, f64) {
        match self {
            SeriesPoint::Ohlc { low, high, .. } => (*low, *high),
            SeriesPoint::Value { value, .. } => (*value, *value),
        }
    }

    /// Dernière valeur du point (close ou value)
    pub fn last_value(&self) -> f64 {
        match self {
            SeriesPoint::Ohlc { close, .. } => *close,
            SeriesPoint::Value { value, .. } => *value,
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn candles() -> Vec<Candle> {
        vec![
            Candle::new(60, 1.0, 2.0, 0.5, 1.5),
            Candle::new(120, 1.5, 2.5, 1.0, 1.2),
            Candle::new(180, 1.2, 1.8, 1.1, 1.7),
        ]
    }

    #[test]
    fn test_point_count_matches_candle_count_for_every_kind() {
        let candles = candles();
        for kind in SeriesKind::ALL {
            assert_eq!(kind.points(&candles).len(), candles.len(), "{}", kind.label());
        }
    }

    #[test]
    fn test_line_and_area_use_close() {
        let points = SeriesKind::Area.points(&candles());
        assert_eq!(points[1], SeriesPoint::Value { time: 120, value: 1.2 });

        let points = SeriesKind::Bar.points(&candles());
        assert!(matches!(points[0], SeriesPoint::Ohlc { high, .. } if high == 2.0));
    }

    #[test]
    fn test_default_styles() {
        let SeriesStyle::Candlestick(candle) = SeriesKind::Candlestick.default_style() else {
            panic!("candlestick factory returned another variant");
        };
        assert!(!candle.border_visible);
        assert_eq!(candle.wick_up_color, candle.up_color);
        assert_eq!(candle.wick_down_color, candle.down_color);

        let SeriesStyle::Area(area) = SeriesKind::Area.default_style() else {
            panic!("area factory returned another variant");
        };
        assert_eq!(area.top_color.a, 0.4);
        assert_eq!(area.bottom_color.a, 0.0);
        assert_eq!(area.line_width, 2);

        for kind in SeriesKind::ALL {
            assert_eq!(kind.default_style().kind(), kind);
        }
    }

    #[test]
    fn test_kind_cycle() {
        assert_eq!(SeriesKind::Candlestick.next(), SeriesKind::Line);
        assert_eq!(SeriesKind::Bar.next(), SeriesKind::Candlestick);
        assert_eq!(SeriesKind::Candlestick.previous(), SeriesKind::Bar);
    }

    #[test]
    fn test_rgba_over_background() {
        let background = Rgba::rgb(0, 0, 0);
        assert_eq!(Rgba::rgba(200, 100, 50, 0.0).over(background), background);
        assert_eq!(Rgba::rgba(200, 100, 50, 0.5).over(background), Rgba::rgb(100, 50, 25));
    }
}
