// ============================================================================
// Chart - Rendu du graphique (TerminalChart)
// ============================================================================
// Dessine la série vivante de la surface selon son style :
// - Chandeliers : caractères Unicode, ligne par ligne (algorithme 3 zones)
// - Barres OHLC : mèche │ avec tick d'ouverture ┤ et de clôture ├
// - Aire : colonnes pleines, dégradé haut/bas précalculé sur le fond
// - Ligne : widget Chart de ratatui
//
// Les labels de temps sont formatés dans le fuseau choisi (rendu seulement).
//
// CARACTÈRES UNICODE (chandeliers) :
// ┃ Corps plein          │ Mèche pleine
// ╻ Demi-corps (bas)     ╹ Demi-corps (haut)
// ╽ Transition top       ╿ Transition bottom
// ╷ Demi-mèche sup       ╵ Demi-mèche inf
// ============================================================================

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::{App, DisplayTimezone};
use crate::chart::series::{AreaStyle, BarStyle, CandlestickStyle, LineStyle};
use crate::chart::{ChartOptions, Rgba, SeriesPoint, SeriesStyle, TerminalChart};

// ============================================================================
// Constantes
// ============================================================================

const UNICODE_VOID: char = ' ';
const UNICODE_BODY: char = '┃';
const UNICODE_HALF_BODY_BOTTOM: char = '╻';
const UNICODE_HALF_BODY_TOP: char = '╹';
const UNICODE_WICK: char = '│';
const UNICODE_TOP: char = '╽';
const UNICODE_BOTTOM: char = '╿';
const UNICODE_UPPER_WICK: char = '╷';
const UNICODE_LOWER_WICK: char = '╵';

/// Barres OHLC : ouverture à gauche, clôture à droite
const BAR_STEM: char = '│';
const BAR_OPEN: char = '┤';
const BAR_CLOSE: char = '├';
const BAR_OPEN_CLOSE: char = '┼';

/// Huitièmes de bloc pour le sommet de l'aire
const PARTIAL_BLOCKS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Largeur de l'axe Y (pour les prix)
const Y_AXIS_WIDTH: u16 = 12;
const ADAPTIVE_Y_AXIS_THRESHOLD: u16 = 80;
const NARROW_Y_AXIS_WIDTH: u16 = 9;

/// Taille minimale de la zone graphique
const MIN_CHART_WIDTH: u16 = 30;
const MIN_CHART_HEIGHT: u16 = 6;

/// Lignes réservées à l'axe X (ticks + labels)
const X_AXIS_HEIGHT: u16 = 2;

// ============================================================================
// Fonction principale de rendu
// ============================================================================

/// Dessine le graphique de la session
pub fn render_chart(frame: &mut Frame, app: &App<TerminalChart>, area: Rect) {
    let chart = app.chart().surface();
    let options = *chart.options();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(to_color(options.border_color)))
        .style(
            Style::default()
                .bg(to_color(options.background))
                .fg(to_color(options.text_color)),
        )
        .title(chart_title(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(live) = chart.live() else {
        render_placeholder(frame, inner, &options, "No series attached");
        return;
    };

    if live.points.is_empty() {
        render_placeholder(frame, inner, &options, "No data loaded yet. Press [r] to fetch.");
        return;
    }

    if inner.width < MIN_CHART_WIDTH || inner.height < MIN_CHART_HEIGHT {
        render_placeholder(frame, inner, &options, "Terminal too small for the chart");
        return;
    }

    let y_axis_width = if area.width < ADAPTIVE_Y_AXIS_THRESHOLD {
        NARROW_Y_AXIS_WIDTH
    } else {
        Y_AXIS_WIDTH
    };
    let plot_width = inner.width.saturating_sub(y_axis_width) as usize;
    let points = chart.visible_points(plot_width);

    match live.style {
        SeriesStyle::Line(style) => {
            render_line(frame, inner, &points, style, &options, app.timezone);
        }
        style => {
            let renderer = GlyphRenderer::new(&points, style, options, app.timezone, inner, y_axis_width);
            frame.render_widget(Paragraph::new(renderer.render_lines()), inner);
        }
    }
}

/// Titre : symbole, type, source, nombre de points, fuseau
fn chart_title(app: &App<TerminalChart>) -> String {
    let kind = app.series_kind().label();
    match app.active_source() {
        Some(provider) => {
            let bars = app
                .chart()
                .surface()
                .live()
                .map_or(0, |live| live.points.len());
            format!(
                " 🕯️ {} · {} · {} ({} bars) · {} ",
                app.symbol(),
                kind,
                app.status().label_of(provider),
                bars,
                app.timezone.label()
            )
        }
        None => format!(" 🕯️ {} · {} ", app.symbol(), kind),
    }
}

// ============================================================================
// Échelle de prix
// ============================================================================

/// Projection prix -> hauteur (en lignes, 0 en bas)
#[derive(Debug, Clone, Copy)]
struct PriceScale {
    min: f64,
    max: f64,
    height: u16,
}

impl PriceScale {
    /// Bornes sur tous les points + marge de 2%
    fn fit(points: &[SeriesPoint], height: u16) -> Self {
        let (low, high) = points
            .iter()
            .map(SeriesPoint::range)
            .filter(|(l, h)| l.is_finite() && h.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), (l, h)| {
                (min.min(l), max.max(h))
            });

        if !low.is_finite() || !high.is_finite() {
            return Self {
                min: 0.0,
                max: 1.0,
                height,
            };
        }

        let margin = (high - low) * 0.02;
        Self {
            min: (low - margin).max(0.0),
            max: high + margin,
            height,
        }
    }

    fn to_height(&self, price: f64) -> f64 {
        if self.max == self.min {
            return self.height as f64 / 2.0;
        }
        (price - self.min) / (self.max - self.min) * self.height as f64
    }

    fn price_at(&self, y: u16) -> f64 {
        self.min + (y as f64 * (self.max - self.min) / self.height.max(1) as f64)
    }
}

// ============================================================================
// Rendu par caractères (chandeliers, barres, aire)
// ============================================================================

struct GlyphRenderer<'a> {
    points: &'a [SeriesPoint],
    style: SeriesStyle,
    options: ChartOptions,
    timezone: DisplayTimezone,
    scale: PriceScale,
    width: usize,
    y_axis_width: u16,
}

impl<'a> GlyphRenderer<'a> {
    fn new(
        points: &'a [SeriesPoint],
        style: SeriesStyle,
        options: ChartOptions,
        timezone: DisplayTimezone,
        area: Rect,
        y_axis_width: u16,
    ) -> Self {
        let height = area.height.saturating_sub(X_AXIS_HEIGHT);
        Self {
            points,
            style,
            options,
            timezone,
            scale: PriceScale::fit(points, height),
            width: area.width.saturating_sub(y_axis_width) as usize,
            y_axis_width,
        }
    }

    /// Génère toutes les lignes du graphique (grille + axe X)
    fn render_lines(&self) -> Vec<Line<'static>> {
        let height = self.scale.height;
        let text = to_color(self.options.text_color);
        let mut grid = vec![vec![(UNICODE_VOID, text); self.width]; height as usize];
        let positions = compute_columns(self.width, self.points.len());

        for (point, &column) in self.points.iter().zip(&positions) {
            for y in 1..=height {
                if let Some(cell) = self.cell(point, y) {
                    grid[(height - y) as usize][column] = cell;
                }
            }
        }

        let axis_style = Style::default().fg(to_color(self.options.grid_color));
        let mut lines: Vec<Line<'static>> = grid
            .into_iter()
            .enumerate()
            .map(|(row, cells)| {
                let y = height - row as u16;
                let mut spans = vec![Span::styled(self.y_axis_label(y), axis_style)];
                spans.extend(merge_cells(cells));
                Line::from(spans)
            })
            .collect();

        lines.extend(self.render_x_axis(&positions));
        lines
    }

    fn cell(&self, point: &SeriesPoint, y: u16) -> Option<(char, Color)> {
        match (self.style, point) {
            (
                SeriesStyle::Candlestick(style),
                SeriesPoint::Ohlc {
                    open,
                    high,
                    low,
                    close,
                    ..
                },
            ) => self.candle_cell(&style, *open, *high, *low, *close, y),
            (
                SeriesStyle::Bar(style),
                SeriesPoint::Ohlc {
                    open,
                    high,
                    low,
                    close,
                    ..
                },
            ) => self.bar_cell(&style, *open, *high, *low, *close, y),
            (SeriesStyle::Area(style), point) => self.area_cell(&style, point.last_value(), y),
            _ => None,
        }
    }

    /// Chandelier à une hauteur donnée (zones : mèche sup, corps, mèche inf)
    fn candle_cell(
        &self,
        style: &CandlestickStyle,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        y: u16,
    ) -> Option<(char, Color)> {
        let height_unit = y as f64;
        let high_y = self.scale.to_height(high);
        let low_y = self.scale.to_height(low);
        let max_y = self.scale.to_height(open.max(close));
        let min_y = self.scale.to_height(close.min(open));

        let mut output = UNICODE_VOID;

        // ZONE 1 : Mèche supérieure (high → max)
        if high_y.ceil() >= height_unit && height_unit >= max_y.floor() {
            if max_y - height_unit > 0.75 {
                output = UNICODE_BODY;
            } else if (max_y - height_unit) > 0.25 {
                if (high_y - height_unit) > 0.75 {
                    output = UNICODE_TOP;
                } else {
                    output = UNICODE_HALF_BODY_BOTTOM;
                }
            } else if (high_y - height_unit) > 0.75 {
                output = UNICODE_WICK;
            } else if (high_y - height_unit) > 0.25 {
                output = UNICODE_UPPER_WICK;
            }
        }
        // ZONE 2 : Corps (min → max)
        else if max_y.floor() >= height_unit && height_unit >= min_y.ceil() {
            output = UNICODE_BODY;
        }
        // ZONE 3 : Mèche inférieure (min → low)
        else if min_y.ceil() >= height_unit && height_unit >= low_y.floor() {
            if (min_y - height_unit) < 0.25 {
                output = UNICODE_BODY;
            } else if (min_y - height_unit) < 0.75 {
                if (low_y - height_unit) < 0.25 {
                    output = UNICODE_BOTTOM;
                } else {
                    output = UNICODE_HALF_BODY_TOP;
                }
            } else if low_y - height_unit < 0.25 {
                output = UNICODE_WICK;
            } else if low_y - height_unit < 0.75 {
                output = UNICODE_LOWER_WICK;
            }
        }

        if output == UNICODE_VOID {
            return None;
        }

        let bullish = close >= open;
        let is_wick = matches!(output, UNICODE_WICK | UNICODE_UPPER_WICK | UNICODE_LOWER_WICK);
        let color = match (bullish, is_wick) {
            (true, false) => style.up_color,
            (false, false) => style.down_color,
            (true, true) => style.wick_up_color,
            (false, true) => style.wick_down_color,
        };
        Some((output, self.color(color)))
    }

    /// Barre OHLC : une ligne par rangée couverte par [low, high]
    fn bar_cell(
        &self,
        style: &BarStyle,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        y: u16,
    ) -> Option<(char, Color)> {
        let row_of = |price: f64| self.scale.to_height(price).ceil().max(1.0) as u16;
        let (low_row, high_row) = (row_of(low), row_of(high));
        if y < low_row || y > high_row {
            return None;
        }

        let glyph = match (y == row_of(open), y == row_of(close)) {
            (true, true) => BAR_OPEN_CLOSE,
            (true, false) => BAR_OPEN,
            (false, true) => BAR_CLOSE,
            (false, false) => BAR_STEM,
        };
        let color = if close >= open {
            style.up_color
        } else {
            style.down_color
        };
        Some((glyph, self.color(color)))
    }

    /// Aire : colonne pleine jusqu'à la valeur, sommet en huitièmes de bloc
    fn area_cell(&self, style: &AreaStyle, value: f64, y: u16) -> Option<(char, Color)> {
        let level = self.scale.to_height(value).max(0.0);
        let full = level.floor() as u16;
        let fraction = level - level.floor();

        if y <= full {
            let color = if y == full && fraction == 0.0 {
                style.line_color
            } else {
                let t = y as f32 / self.scale.height.max(1) as f32;
                lerp(style.bottom_color, style.top_color, t)
            };
            Some(('█', self.color(color)))
        } else if y == full + 1 && fraction > 0.0 {
            let eighths = ((fraction * 8.0).round() as usize).clamp(1, 8);
            Some((PARTIAL_BLOCKS[eighths], self.color(style.line_color)))
        } else {
            None
        }
    }

    fn color(&self, color: Rgba) -> Color {
        to_color(color.over(self.options.background))
    }

    /// Label de prix toutes les 4 lignes
    fn y_axis_label(&self, y: u16) -> String {
        let width = (self.y_axis_width as usize).saturating_sub(3);
        if y % 4 == 0 {
            format!("{:>width$.2} │ ", self.scale.price_at(y), width = width)
        } else {
            format!("{:>width$} │ ", "", width = width)
        }
    }

    /// Ligne de ticks + ligne de labels de temps
    fn render_x_axis(&self, positions: &[usize]) -> Vec<Line<'static>> {
        let pattern = time_pattern(self.points);
        let label_width = 5;
        let max_labels = (self.width / (label_width + 2)).clamp(2, 10);
        let label_interval = (self.points.len() / max_labels).max(1);

        let mut ticks = vec![' '; self.width];
        let mut labels = vec![' '; self.width];
        let mut next_free = 0;

        for (i, (point, &column)) in self.points.iter().zip(positions).enumerate() {
            if i % label_interval != 0 {
                continue;
            }
            ticks[column] = '│';

            let label: Vec<char> = self.timezone.format(point.time(), pattern).chars().collect();
            if column >= next_free && column + label.len() <= self.width {
                labels[column..column + label.len()].copy_from_slice(&label);
                next_free = column + label.len() + 1;
            }
        }

        let padding = " ".repeat(self.y_axis_width as usize);
        let style = Style::default().fg(to_color(self.options.grid_color));
        let text_style = Style::default().fg(to_color(self.options.text_color));
        vec![
            Line::from(vec![
                Span::raw(padding.clone()),
                Span::styled(ticks.into_iter().collect::<String>(), style),
            ]),
            Line::from(vec![
                Span::raw(padding),
                Span::styled(labels.into_iter().collect::<String>(), text_style),
            ]),
        ]
    }
}

/// Colonne de chaque point (calculée depuis l'index : pas de dérive d'arrondi)
fn compute_columns(width: usize, count: usize) -> Vec<usize> {
    if count == 0 || width == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![width / 2];
    }

    let spacing = width as f64 / count as f64;
    (0..count)
        .map(|i| ((i as f64 * spacing).round() as usize).min(width - 1))
        .collect()
}

/// Regroupe les cellules consécutives de même couleur en un seul Span
fn merge_cells(cells: Vec<(char, Color)>) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut current_color: Option<Color> = None;

    for (glyph, color) in cells {
        if current_color != Some(color) && !current.is_empty() {
            let text = std::mem::take(&mut current);
            spans.push(Span::styled(text, Style::default().fg(current_color.unwrap_or(color))));
        }
        current_color = Some(color);
        current.push(glyph);
    }
    if let Some(color) = current_color {
        spans.push(Span::styled(current, Style::default().fg(color)));
    }
    spans
}

// ============================================================================
// Ligne : widget Chart de ratatui
// ============================================================================

fn render_line(
    frame: &mut Frame,
    area: Rect,
    points: &[SeriesPoint],
    style: LineStyle,
    options: &ChartOptions,
    timezone: DisplayTimezone,
) {
    let data: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, point)| (i as f64, point.last_value()))
        .collect();

    let scale = PriceScale::fit(points, area.height);
    let last_x = (data.len().saturating_sub(1)).max(1) as f64;
    let pattern = time_pattern(points);
    let time_label = |index: usize| {
        points
            .get(index)
            .map(|p| timezone.format(p.time(), pattern))
            .unwrap_or_default()
    };

    // Braille double la résolution : l'épaisseur de 2 du style web
    let marker = if style.line_width >= 2 {
        symbols::Marker::Braille
    } else {
        symbols::Marker::Dot
    };

    let datasets = vec![Dataset::default()
        .marker(marker)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(to_color(style.color.over(options.background))))
        .data(&data)];

    let axis_style = Style::default().fg(to_color(options.grid_color));
    let x_axis = Axis::default()
        .style(axis_style)
        .bounds([0.0, last_x])
        .labels(vec![
            Span::raw(time_label(0)),
            Span::raw(time_label(points.len() / 2)),
            Span::raw(time_label(points.len().saturating_sub(1))),
        ]);

    let y_axis = Axis::default()
        .style(axis_style)
        .bounds([scale.min, scale.max])
        .labels(vec![
            Span::raw(format!("{:.2}", scale.min)),
            Span::raw(format!("{:.2}", (scale.min + scale.max) / 2.0)),
            Span::raw(format!("{:.2}", scale.max)),
        ]);

    let chart = Chart::new(datasets)
        .style(Style::default().bg(to_color(options.background)))
        .x_axis(x_axis)
        .y_axis(y_axis);

    frame.render_widget(chart, area);
}

// ============================================================================
// Helpers
// ============================================================================

/// Heures si les points sont plus serrés qu'un jour, sinon dates
fn time_pattern(points: &[SeriesPoint]) -> &'static str {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() > 1 => {
            let step = (last.time() - first.time()).abs() / (points.len() as i64 - 1);
            if step < 86_400 {
                "%H:%M"
            } else {
                "%d/%m"
            }
        }
        _ => "%d/%m",
    }
}

fn to_color(color: Rgba) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

fn lerp(from: Rgba, to: Rgba, t: f32) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Rgba::rgba(
        mix(from.r, to.r),
        mix(from.g, to.g),
        mix(from.b, to.b),
        from.a + (to.a - from.a) * t,
    )
}

/// Message centré dans la zone du graphique (pas une erreur)
fn render_placeholder(frame: &mut Frame, area: Rect, options: &ChartOptions, message: &str) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(to_color(options.text_color)),
        )),
    ];
    let paragraph = Paragraph::new(text).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Tests unitaires
// ============================================================================
