// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Une seule vue, de haut en bas :
//   header   : titre + indicateur "fetching"
//   contrôles: symbole, jours, type, source, fuseau
//   statuts  : une carte par provider configuré (toujours toutes)
//   graphique
//   info     : message d'information du cycle
//   footer   : raccourcis, confirmation de quit ou ligne de saisie
//
// CONCEPTS RATATUI :
// 1. Layout : découpage vertical puis horizontal (cartes)
// 2. Block / Paragraph / Span : composition de texte stylé
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputField, MessageLevel, Screen};
use crate::chart::{SeriesKind, TerminalChart};
use crate::sources::{ProviderStatus, StatusEntry};
use crate::ui::chart::render_chart;

const SPINNER: [&str; 4] = ["⠋", "⠙", "⠹", "⠸"];

// ============================================================================
// Fonction principale de rendu
// ============================================================================

/// Dessine l'interface complète
pub fn render(frame: &mut Frame, app: &App<TerminalChart>) {
    let chunks = create_layout(frame.size());

    render_header(frame, app, chunks[0]);
    render_controls(frame, app, chunks[1]);
    render_status_cards(frame, app, chunks[2]);
    render_chart(frame, app, chunks[3]);
    render_info(frame, app, chunks[4]);

    match app.current_screen {
        Screen::Dashboard => render_footer(frame, app, chunks[5]),
        Screen::Input(field) => render_input_footer(frame, app, field, chunks[5]),
    }
}

/// Crée le layout principal
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Contrôles
            Constraint::Length(5), // Cartes de statut
            Constraint::Min(8),    // Graphique
            Constraint::Length(1), // Info
            Constraint::Length(3), // Footer
        ])
        .split(area)
        .to_vec()
}

// ============================================================================
// Header
// ============================================================================

fn render_header(frame: &mut Frame, app: &App<TerminalChart>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" CandleDeck ")
        .title_alignment(Alignment::Center);

    let line = if app.is_fetching() {
        let frame_index = app.ticks() % SPINNER.len();
        Line::from(vec![
            Span::styled(
                format!("{} ", SPINNER[frame_index]),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("Fetching {} ({} days)...", app.symbol(), app.days()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
        ])
    } else {
        Line::from(Span::styled(
            "📈 Multi-source OHLC dashboard",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ))
    };

    let paragraph = Paragraph::new(vec![line])
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Contrôles
// ============================================================================

fn render_controls(frame: &mut Frame, app: &App<TerminalChart>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Controls ");

    let key = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let value = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled("[s]", key),
        Span::raw(" Symbol: "),
        Span::styled(app.symbol_input.clone(), value),
        Span::raw("   "),
        Span::styled("[d]", key),
        Span::raw(" Days: "),
        Span::styled(app.days_input.clone(), value),
        Span::raw("   "),
        Span::styled("[c]", key),
        Span::raw(" Type: "),
    ];

    let active_kind = app.series_kind();
    for kind in SeriesKind::ALL {
        let style = if kind == active_kind {
            value.add_modifier(Modifier::REVERSED)
        } else {
            dim
        };
        spans.push(Span::styled(format!(" {} ", kind.label()), style));
    }

    spans.push(Span::raw("   "));
    spans.push(Span::styled("[Tab]", key));
    spans.push(Span::raw(" Source: "));

    let sources = app.available_sources();
    if sources.is_empty() {
        spans.push(Span::styled("none", dim));
    }
    for (provider, label) in sources {
        let style = if Some(provider) == app.active_source() {
            value.add_modifier(Modifier::REVERSED)
        } else {
            dim
        };
        spans.push(Span::styled(format!(" {} ", label), style));
    }

    spans.push(Span::raw("   "));
    spans.push(Span::styled("[t]", key));
    spans.push(Span::raw(format!(" {}", app.timezone.label())));

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Cartes de statut
// ============================================================================

/// Une carte par provider configuré, quel que soit le nombre de succès
fn render_status_cards(frame: &mut Frame, app: &App<TerminalChart>, area: Rect) {
    let entries = app.status().entries();
    if entries.is_empty() {
        return;
    }

    let constraints: Vec<Constraint> = entries
        .iter()
        .map(|_| Constraint::Ratio(1, entries.len() as u32))
        .collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (entry, column) in entries.iter().zip(columns.iter()) {
        render_status_card(frame, entry, *column);
    }
}

fn render_status_card(frame: &mut Frame, entry: &StatusEntry, area: Rect) {
    let (icon, color, text) = match &entry.status {
        ProviderStatus::Pending => ("⏳", Color::Cyan, "Pending...".to_string()),
        ProviderStatus::Ok { points, .. } => ("✅", Color::Green, format!("{} data points", points)),
        ProviderStatus::Empty { message, .. } => (
            "○",
            Color::Gray,
            match message {
                Some(message) => format!("No data ({})", message),
                None => "No data".to_string(),
            },
        ),
        ProviderStatus::Failed { message, .. } => ("❌", Color::Red, message.clone()),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(format!(" {} {} ", icon, entry.provider.label));

    let mut lines = vec![Line::from(Span::styled(text, Style::default().fg(color)))];
    if let Some(info) = entry.status.rate_limit_info() {
        lines.push(Line::from(Span::styled(
            info.to_string(),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Ligne d'information
// ============================================================================

fn render_info(frame: &mut Frame, app: &App<TerminalChart>, area: Rect) {
    let Some(message) = &app.message else {
        return;
    };

    let (icon, color) = match message.level {
        MessageLevel::Info => ("ℹ", Color::Cyan),
        MessageLevel::Warning => ("⚠", Color::Yellow),
        MessageLevel::Error => ("✗", Color::Red),
    };

    let line = Line::from(vec![
        Span::styled(format!(" {} ", icon), Style::default().fg(color)),
        Span::styled(message.text.clone(), Style::default().fg(color)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

// ============================================================================
// Footer : Instructions
// ============================================================================

fn render_footer(frame: &mut Frame, app: &App<TerminalChart>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let key = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let shortcuts = if app.is_awaiting_quit_confirmation() {
        Line::from(vec![
            Span::styled(
                "⚠  Press ",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "[q]",
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD)
                    .add_modifier(Modifier::SLOW_BLINK),
            ),
            Span::styled(
                " again to quit, any other key to cancel ⚠",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled("[q]", key),
            Span::raw(" Quit  "),
            Span::styled("[r]", key),
            Span::raw(" Reload  "),
            Span::styled("[s/d]", key),
            Span::raw(" Edit  "),
            Span::styled("[c/C 1-4]", key),
            Span::raw(" Chart type  "),
            Span::styled("[Tab/←→]", key),
            Span::raw(" Source  "),
            Span::styled("[t]", key),
            Span::raw(" Timezone"),
        ])
    };

    let paragraph = Paragraph::new(vec![shortcuts])
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

/// Footer en mode saisie : prompt + buffer + curseur
fn render_input_footer(frame: &mut Frame, app: &App<TerminalChart>, field: InputField, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let input_line = Line::from(vec![
        Span::styled(
            field.prompt(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.input_buffer.clone(), Style::default().fg(Color::White)),
        Span::styled(
            "█",
            Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK),
        ),
        Span::raw("   "),
        Span::styled(
            "[Enter]",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" Fetch  "),
        Span::styled(
            "[ESC]",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" Cancel"),
    ]);

    let paragraph = Paragraph::new(vec![input_line])
        .block(block)
        .alignment(Alignment::Left);
    frame.render_widget(paragraph, area);
}
