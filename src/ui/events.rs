// ============================================================================
// Gestion des événements
// ============================================================================
// Gère les événements clavier et les ticks de l'application
//
// CONCEPTS RUST :
// 1. Enums avec variants : représenter différents types d'événements
// 2. Prédicats purs : une fonction is_*_event par action
// 3. Error handling avec Result
//
// TOUCHES :
//   s / d      éditer symbole / jours      Enter   valider et fetcher
//   r          recharger                   c / C   type suivant / précédent
//   1..4       type direct                 Tab → l source suivante
//   ⇧Tab ← h   source précédente           t       fuseau UTC/local
//   q q        quitter                     Esc     annuler la saisie
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind};

use crate::chart::SeriesKind;

// ============================================================================
// Enum Event
// ============================================================================

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Tick régulier (pour le spinner et le rafraîchissement)
    Tick,
}

// ============================================================================
// Structure EventHandler
// ============================================================================

/// Gestionnaire d'événements
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }

    /// Lit le prochain événement (bloquant au plus tick_rate)
    ///
    /// Timeout, release de touche, resize, souris : Event::Tick
    pub fn next(&self) -> Result<Event> {
        if event::poll(self.tick_rate)? {
            match event::read()? {
                // Sur certains OS, on reçoit Press ET Release
                CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Ok(Event::Key(key)),
                _ => Ok(Event::Tick),
            }
        } else {
            Ok(Event::Tick)
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

// ============================================================================
// Helper : Convertir KeyEvent en action
// ============================================================================

fn key_code(event: &Event) -> Option<KeyCode> {
    match event {
        Event::Key(key) => Some(key.code),
        Event::Tick => None,
    }
}

/// 'q' : quitter (two-step)
pub fn is_quit_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('q') | KeyCode::Char('Q')))
}

pub fn is_escape_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Esc))
}

pub fn is_enter_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Enter))
}

pub fn is_backspace_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Backspace))
}

/// 's' : éditer le symbole
pub fn is_edit_symbol_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('s') | KeyCode::Char('S')))
}

/// 'd' : éditer le nombre de jours
pub fn is_edit_days_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('d') | KeyCode::Char('D')))
}

/// 'r' : relancer un cycle avec les contrôles actuels
pub fn is_reload_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('r') | KeyCode::Char('R')))
}

/// 'c' : type de graphique suivant
pub fn is_next_chart_type_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('c')))
}

/// 'C' : type de graphique précédent
pub fn is_previous_chart_type_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('C')))
}

/// '1'..'4' : type de graphique direct, dans l'ordre du sélecteur
pub fn chart_type_from_event(event: &Event) -> Option<SeriesKind> {
    match key_code(event)? {
        KeyCode::Char(c @ '1'..='4') => {
            let index = c.to_digit(10)? as usize - 1;
            SeriesKind::ALL.get(index).copied()
        }
        _ => None,
    }
}

/// Tab, → ou 'l' : source suivante
pub fn is_next_source_event(event: &Event) -> bool {
    matches!(
        key_code(event),
        Some(KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('L'))
    )
}

/// Shift-Tab, ← ou 'h' : source précédente
pub fn is_previous_source_event(event: &Event) -> bool {
    matches!(
        key_code(event),
        Some(KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('H'))
    )
}

/// 't' : fuseau d'affichage
pub fn is_timezone_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('t') | KeyCode::Char('T')))
}

/// Caractère acceptable dans un champ de saisie (symbole ou jours)
pub fn is_input_char_event(event: &Event) -> bool {
    matches!(
        key_code(event),
        Some(KeyCode::Char(c)) if c.is_alphanumeric() || matches!(c, '-' | '.' | '/' | '^' | '=')
    )
}

/// Extrait le caractère d'un événement clavier si c'est un caractère
pub fn get_char_from_event(event: &Event) -> Option<char> {
    match key_code(event)? {
        KeyCode::Char(c) => Some(c),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
