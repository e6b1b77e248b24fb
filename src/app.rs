// ============================================================================
// Structure : App
// ============================================================================
// État de la session du dashboard, construit une seule fois au démarrage et
// passé par &mut aux handlers d'événements (aucun état global)
//
// CONCEPTS RUST :
// 1. Générique sur la surface : App<S: ChartSurface> (TerminalChart en prod,
//    surface d'enregistrement en test)
// 2. Ownership : App possède le registre, les statuts et le graphique ;
//    le worker ne fait que produire des FetchEvent
// 3. Newtype CycleId : garde contre les résultats d'un cycle dépassé
//
// FLUX :
// - begin_fetch()        : nouveau cycle, reset, FetchRequest pour le worker
// - apply_fetch_event()  : statuts + registre + liaison progressive du graphique
// - select_source / set_series_kind : ne touchent que le graphique
// ============================================================================

use chrono::{DateTime, Local, Utc};
use tracing::{debug, info, warn};

use crate::api::FetchEvent;
use crate::chart::{ChartController, ChartOutcome, ChartSurface, SeriesKind};
use crate::config::{AppConfig, DEFAULT_DAYS, DEFAULT_SYMBOL, MAX_DAYS};
use crate::models::{CycleId, FetchRequest, ProviderResult, ProviderSpec};
use crate::sources::{SourceRegistry, StatusTracker};

/// Message affiché quand aucun provider n'a renvoyé de données
pub const NO_DATA_MESSAGE: &str =
    "No data available from any source. Please check adapter status above.";

// ============================================================================
// Enum : Screen
// ============================================================================

/// Champ en cours d'édition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Symbol,
    Days,
}

impl InputField {
    pub fn prompt(&self) -> &'static str {
        match self {
            InputField::Symbol => "Symbol: ",
            InputField::Days => "Days: ",
        }
    }
}

/// Écrans de l'application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Vue principale : contrôles, statuts, graphique
    Dashboard,

    /// Mode saisie (Vim-like) : Enter valide et relance un fetch, ESC annule
    Input(InputField),
}

// ============================================================================
// Message d'information
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl InfoMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            text: text.into(),
        }
    }
}

// ============================================================================
// Fuseau d'affichage
// ============================================================================

/// Fuseau utilisé pour les labels du graphique (n'affecte jamais les données)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayTimezone {
    #[default]
    Utc,
    Local,
}

impl DisplayTimezone {
    pub fn label(&self) -> &'static str {
        match self {
            DisplayTimezone::Utc => "UTC",
            DisplayTimezone::Local => "Local",
        }
    }

    pub fn next(&self) -> DisplayTimezone {
        match self {
            DisplayTimezone::Utc => DisplayTimezone::Local,
            DisplayTimezone::Local => DisplayTimezone::Utc,
        }
    }

    /// Formate un timestamp Unix (secondes) dans ce fuseau
    pub fn format(&self, time: i64, pattern: &str) -> String {
        let Some(utc) = DateTime::<Utc>::from_timestamp(time, 0) else {
            return time.to_string();
        };

        match self {
            DisplayTimezone::Utc => utc.format(pattern).to_string(),
            DisplayTimezone::Local => utc.with_timezone(&Local).format(pattern).to_string(),
        }
    }
}

// ============================================================================
// Correction des saisies
// ============================================================================

/// Symbole vide après trim -> BTC ; sinon en majuscules
pub fn correct_symbol(input: &str) -> String {
    let symbol = input.trim();
    if symbol.is_empty() {
        DEFAULT_SYMBOL.to_string()
    } else {
        symbol.to_uppercase()
    }
}

/// Jours illisibles, vides ou nuls -> 90 ; plafonné à 365
pub fn correct_days(input: &str) -> u32 {
    match input.trim().parse::<u32>() {
        Ok(days) if days > 0 => days.min(MAX_DAYS),
        _ => DEFAULT_DAYS,
    }
}

// ============================================================================
// Structure : App
// ============================================================================

/// État principal de l'application
pub struct App<S: ChartSurface> {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Two-step quit : première pression de 'q' -> confirmation
    pub confirm_quit: bool,

    pub current_screen: Screen,

    /// Buffer du champ en cours d'édition
    pub input_buffer: String,

    /// Valeurs des contrôles (brutes, corrigées au moment du fetch)
    pub symbol_input: String,
    pub days_input: String,

    /// Cycle courant et paramètres corrigés de ce cycle
    cycle: CycleId,
    symbol: String,
    days: u32,

    /// Indicateur "fetching" (posé avant l'envoi, retiré quand tout est réglé)
    fetching: bool,

    status: StatusTracker,
    registry: SourceRegistry,
    chart: ChartController<S>,

    /// Symbole des données actuellement affichées
    chart_symbol: Option<String>,

    /// Source liée avant le cycle courant (reprise dès qu'elle revient)
    preferred_source: Option<String>,

    pub message: Option<InfoMessage>,
    pub timezone: DisplayTimezone,

    /// Compteur de ticks (animation du spinner)
    ticks: usize,
}

impl<S: ChartSurface> App<S> {
    /// Crée l'état de session (le graphique démarre avec une série chandeliers vide)
    pub fn new(providers: &[ProviderSpec], surface: S) -> Self {
        Self {
            running: true,
            confirm_quit: false,
            current_screen: Screen::Dashboard,
            input_buffer: String::new(),
            symbol_input: DEFAULT_SYMBOL.to_string(),
            days_input: DEFAULT_DAYS.to_string(),
            cycle: CycleId::default(),
            symbol: DEFAULT_SYMBOL.to_string(),
            days: DEFAULT_DAYS,
            fetching: false,
            status: StatusTracker::new(providers),
            registry: SourceRegistry::new(),
            chart: ChartController::new(surface),
            chart_symbol: None,
            preferred_source: None,
            message: None,
            timezone: DisplayTimezone::default(),
            ticks: 0,
        }
    }

    /// Crée l'état avec les valeurs initiales de la configuration
    pub fn from_config(config: &AppConfig, surface: S) -> Self {
        let mut app = Self::new(&config.providers, surface);
        app.symbol_input = config.symbol.clone();
        app.days_input = config.days.to_string();
        app
    }

    // ========================================================================
    // Accès en lecture (pour le rendu)
    // ========================================================================

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    /// Tick : appelé à chaque itération de la boucle
    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn cycle(&self) -> CycleId {
        self.cycle
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn status(&self) -> &StatusTracker {
        &self.status
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn chart(&self) -> &ChartController<S> {
        &self.chart
    }

    pub fn series_kind(&self) -> SeriesKind {
        self.chart.active_kind()
    }

    pub fn active_source(&self) -> Option<&str> {
        self.chart.active_provider()
    }

    /// Sources sélectionnables : (clé, label) dans l'ordre d'arrivée
    pub fn available_sources(&self) -> Vec<(&str, &str)> {
        self.registry
            .list_available()
            .into_iter()
            .map(|key| (key, self.status.label_of(key)))
            .collect()
    }

    // ========================================================================
    // Cycle de fetch
    // ========================================================================

    /// Démarre un cycle : corrige les saisies, reset, indicateur "fetching"
    ///
    /// Le FetchRequest retourné est envoyé au worker par l'appelant.
    pub fn begin_fetch(&mut self) -> FetchRequest {
        self.symbol = correct_symbol(&self.symbol_input);
        self.days = correct_days(&self.days_input);
        self.symbol_input = self.symbol.clone();
        self.days_input = self.days.to_string();

        self.cycle = self.cycle.next();
        self.preferred_source = self.chart.active_provider().map(str::to_string);
        self.registry.reset(self.cycle);
        self.status.begin_cycle();
        self.fetching = true;
        self.message = Some(InfoMessage::info(format!(
            "Fetching {} days of data for {}...",
            self.days, self.symbol
        )));

        info!(cycle = %self.cycle, symbol = %self.symbol, days = self.days, "Fetch cycle started");

        FetchRequest {
            cycle: self.cycle,
            symbol: self.symbol.clone(),
            days: self.days,
        }
    }

    /// Applique un événement du worker
    ///
    /// Retourne false (et ne touche à rien) si l'événement vient d'un cycle dépassé.
    pub fn apply_fetch_event(&mut self, event: FetchEvent) -> bool {
        if event.cycle() != self.cycle {
            debug!(event_cycle = %event.cycle(), current = %self.cycle, "Stale fetch event ignored");
            return false;
        }

        match event {
            FetchEvent::Settled { results, .. } => {
                for result in results {
                    self.apply_result(result);
                }
            }
            FetchEvent::Finished { .. } => self.finish_cycle(),
        }
        true
    }

    /// Le cycle n'a pas pu être envoyé au worker
    pub fn abort_fetch(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(cycle = %self.cycle, reason = %reason, "Fetch cycle aborted");
        self.fetching = false;
        self.message = Some(InfoMessage::error(reason));
    }

    /// Un provider réglé : statut, registre, puis liaison progressive
    fn apply_result(&mut self, result: ProviderResult) {
        self.status.apply(&result);

        if !result.is_displayable() {
            debug!(provider = %result.provider, success = result.success, "Result not displayable");
            return;
        }

        let provider = result.provider;
        if !self.registry.register(self.cycle, &provider, result.data) {
            return;
        }

        let active = self.chart.active_provider();
        let shows_other_symbol = self.chart_symbol.as_deref() != Some(self.symbol.as_str());
        let preferred = self.preferred_source.as_deref() == Some(provider.as_str());
        let should_bind = match active {
            None => true,
            Some(active) => active == provider || preferred || shows_other_symbol,
        };

        if should_bind {
            self.bind(&provider);
        }
    }

    /// Tous les providers sont réglés
    fn finish_cycle(&mut self) {
        self.fetching = false;
        let summary = self.status.summary();
        info!(
            cycle = %self.cycle,
            ok = summary.ok,
            empty = summary.empty,
            failed = summary.failed,
            sources = self.registry.len(),
            "Fetch cycle settled"
        );

        if self.registry.is_empty() {
            // Graphique laissé tel quel
            self.message = Some(InfoMessage::info(NO_DATA_MESSAGE));
            return;
        }

        // Source d'avant le cycle si elle est revenue, sinon la source liée
        let bound = self
            .preferred_source
            .as_deref()
            .filter(|p| self.registry.contains(p))
            .filter(|p| self.chart.active_provider() != Some(*p))
            .or_else(|| {
                self.chart
                    .active_provider()
                    .filter(|p| self.registry.contains(p))
            })
            .map(str::to_string);

        match bound {
            Some(provider)
                if self.chart.active_provider() == Some(provider.as_str())
                    && self.chart_symbol.as_deref() == Some(self.symbol.as_str()) =>
            {
                self.message = Some(self.displaying_message(&provider));
            }
            Some(provider) => {
                self.bind(&provider);
            }
            None => {
                if let Some(first) = self.registry.first().map(str::to_string) {
                    self.bind(&first);
                }
            }
        }
    }

    /// Lie le graphique à `provider` et met à jour le message
    fn bind(&mut self, provider: &str) -> ChartOutcome {
        let outcome = self.chart.rebind(&self.registry, provider);
        self.report(&outcome);
        outcome
    }

    fn report(&mut self, outcome: &ChartOutcome) {
        match outcome {
            ChartOutcome::Displayed { provider, .. } => {
                self.chart_symbol = Some(self.symbol.clone());
                self.message = Some(self.displaying_message(provider));
            }
            ChartOutcome::Unavailable { provider } => {
                self.message = Some(InfoMessage::warning(format!(
                    "Source {} has no data for {}",
                    self.status.label_of(provider),
                    self.symbol
                )));
            }
            ChartOutcome::NoData => {
                self.message = Some(InfoMessage::info(if self.fetching {
                    "No data loaded yet, waiting for providers..."
                } else {
                    NO_DATA_MESSAGE
                }));
            }
        }
    }

    fn displaying_message(&self, provider: &str) -> InfoMessage {
        let bars = self.registry.get(provider).map_or(0, |c| c.len());
        InfoMessage::info(format!(
            "Displaying {} bars from {} for symbol {}",
            bars,
            self.status.label_of(provider),
            self.symbol
        ))
    }

    // ========================================================================
    // Source et type de graphique (ne touchent jamais l'orchestrateur)
    // ========================================================================

    /// Affiche la source `provider`
    pub fn select_source(&mut self, provider: &str) -> ChartOutcome {
        info!(provider, "User selected data source");
        self.preferred_source = Some(provider.to_string());
        self.bind(provider)
    }

    pub fn next_source(&mut self) -> ChartOutcome {
        self.step_source(1)
    }

    pub fn previous_source(&mut self) -> ChartOutcome {
        self.step_source(-1)
    }

    fn step_source(&mut self, step: isize) -> ChartOutcome {
        let sources = self.registry.list_available();
        if sources.is_empty() {
            let outcome = ChartOutcome::NoData;
            self.report(&outcome);
            return outcome;
        }

        let len = sources.len() as isize;
        let target = match self
            .chart
            .active_provider()
            .and_then(|active| sources.iter().position(|s| *s == active))
        {
            Some(index) => (index as isize + step).rem_euclid(len) as usize,
            None => 0,
        };
        let provider = sources[target].to_string();

        self.select_source(&provider)
    }

    /// Change le type de série
    pub fn set_series_kind(&mut self, kind: SeriesKind) -> ChartOutcome {
        info!(kind = kind.label(), "User changed chart type");
        let outcome = self.chart.change_type(&self.registry, kind);
        self.report(&outcome);
        outcome
    }

    pub fn next_series_kind(&mut self) -> ChartOutcome {
        self.set_series_kind(self.chart.active_kind().next())
    }

    pub fn previous_series_kind(&mut self) -> ChartOutcome {
        self.set_series_kind(self.chart.active_kind().previous())
    }

    /// UTC <-> heure locale (rendu seulement)
    pub fn cycle_timezone(&mut self) {
        self.timezone = self.timezone.next();
        debug!(timezone = self.timezone.label(), "Display timezone changed");
    }

    // ========================================================================
    // Quit (two-step)
    // ========================================================================

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    // ========================================================================
    // Input Mode Management
    // ========================================================================

    /// Entre en mode saisie, le buffer part de la valeur actuelle
    pub fn start_input(&mut self, field: InputField) {
        self.input_buffer = match field {
            InputField::Symbol => self.symbol_input.clone(),
            InputField::Days => self.days_input.clone(),
        };
        self.current_screen = Screen::Input(field);
    }

    pub fn cancel_input(&mut self) {
        self.current_screen = Screen::Dashboard;
        self.input_buffer.clear();
    }

    /// Range le buffer dans le contrôle édité et retourne au dashboard
    pub fn submit_input(&mut self) {
        if let Screen::Input(field) = self.current_screen {
            let value = std::mem::take(&mut self.input_buffer);
            match field {
                InputField::Symbol => self.symbol_input = value,
                InputField::Days => self.days_input = value,
            }
        } else {
            warn!("submit_input called outside input mode");
        }
        self.current_screen = Screen::Dashboard;
    }

    /// Ajoute un caractère (les jours n'acceptent que des chiffres)
    pub fn append_char(&mut self, c: char) {
        match self.current_screen {
            Screen::Input(InputField::Days) if !c.is_ascii_digit() => {}
            Screen::Input(_) => self.input_buffer.push(c),
            Screen::Dashboard => {}
        }
    }

    pub fn backspace(&mut self) {
        self.input_buffer.pop();
    }

    pub fn is_in_input_mode(&self) -> bool {
        matches!(self.current_screen, Screen::Input(_))
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::recording::RecordingSurface;
    use crate::models::Candle;
    use crate::sources::ProviderStatus;

    fn providers() -> Vec<ProviderSpec> {
        vec![
            ProviderSpec::new("a", "Provider A"),
            ProviderSpec::new("b", "Provider B"),
            ProviderSpec::new("c", "Provider C"),
        ]
    }

    fn candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| Candle::new(1_700_000_000 + i as i64 * 86_400, 1.0, 2.0, 0.5, 1.5))
            .collect()
    }

    fn app() -> App<RecordingSurface> {
        App::new(&providers(), RecordingSurface::new())
    }

    fn settled(cycle: CycleId, result: ProviderResult) -> FetchEvent {
        FetchEvent::Settled {
            cycle,
            results: vec![result],
        }
    }

    #[test]
    fn test_input_correction() {
        assert_eq!(correct_symbol("   "), "BTC");
        assert_eq!(correct_symbol(" eth "), "ETH");
        assert_eq!(correct_days(""), 90);
        assert_eq!(correct_days("abc"), 90);
        assert_eq!(correct_days("0"), 90);
        assert_eq!(correct_days("30"), 30);
        assert_eq!(correct_days("9999"), 365);
    }

    #[test]
    fn test_begin_fetch_resets_state() {
        let mut app = app();
        app.symbol_input = "  ".to_string();
        app.days_input = "x".to_string();

        let request = app.begin_fetch();

        assert_eq!(request.symbol, "BTC");
        assert_eq!(request.days, 90);
        assert_eq!(request.cycle, CycleId(1));
        assert!(app.is_fetching());
        assert!(app.registry().is_empty());
        assert!(app.status().entries().iter().all(|e| e.status.is_pending()));
    }

    #[test]
    fn test_end_to_end_one_usable_provider() {
        let mut app = app();
        app.symbol_input = "ETH".to_string();
        let request = app.begin_fetch();
        let cycle = request.cycle;

        app.apply_fetch_event(settled(cycle, ProviderResult::succeeded("a", candles(50))));
        app.apply_fetch_event(settled(
            cycle,
            ProviderResult::failed("b", "HTTP error! status: 500 Internal Server Error"),
        ));
        app.apply_fetch_event(settled(cycle, ProviderResult::succeeded("c", Vec::new())));
        app.apply_fetch_event(FetchEvent::Finished { cycle });

        assert_eq!(app.status().entries().len(), 3);
        assert_eq!(app.registry().list_available(), vec!["a"]);
        assert_eq!(app.registry().get("a").map(|c| c.len()), Some(50));
        assert_eq!(app.available_sources(), vec![("a", "Provider A")]);
        assert_eq!(app.active_source(), Some("a"));
        assert_eq!(app.chart().surface().points().map(|p| p.len()), Some(50));
        assert!(matches!(
            app.status().status_of("c"),
            Some(ProviderStatus::Empty { .. })
        ));
        assert!(!app.is_fetching());
        assert_eq!(
            app.message.as_ref().map(|m| m.text.as_str()),
            Some("Displaying 50 bars from Provider A for symbol ETH")
        );
    }

    #[test]
    fn test_all_providers_fail_keeps_previous_chart() {
        let mut app = app();
        let first = app.begin_fetch().cycle;
        app.apply_fetch_event(settled(first, ProviderResult::succeeded("b", candles(12))));
        app.apply_fetch_event(FetchEvent::Finished { cycle: first });
        let calls_before = app.chart().surface().calls.len();

        let second = app.begin_fetch().cycle;
        for key in ["a", "b", "c"] {
            app.apply_fetch_event(settled(second, ProviderResult::failed(key, "Network error")));
        }
        app.apply_fetch_event(FetchEvent::Finished { cycle: second });

        assert!(app.registry().is_empty());
        assert_eq!(app.chart().surface().calls.len(), calls_before);
        assert_eq!(app.chart().surface().points().map(|p| p.len()), Some(12));
        assert_eq!(
            app.message,
            Some(InfoMessage::info(NO_DATA_MESSAGE))
        );
        assert!(app.status().summary().is_no_data_anywhere());
    }

    #[test]
    fn test_stale_cycle_results_are_ignored() {
        let mut app = app();
        let old = app.begin_fetch().cycle;
        let new = app.begin_fetch().cycle;

        assert!(!app.apply_fetch_event(settled(old, ProviderResult::succeeded("a", candles(5)))));
        assert!(!app.apply_fetch_event(FetchEvent::Finished { cycle: old }));
        assert!(app.registry().is_empty());
        assert!(app.is_fetching());

        assert!(app.apply_fetch_event(settled(new, ProviderResult::succeeded("b", candles(3)))));
        assert_eq!(app.registry().list_available(), vec!["b"]);
    }

    #[test]
    fn test_first_arrival_is_default_source() {
        let mut app = app();
        let cycle = app.begin_fetch().cycle;

        app.apply_fetch_event(settled(cycle, ProviderResult::succeeded("c", candles(4))));
        app.apply_fetch_event(settled(cycle, ProviderResult::succeeded("a", candles(6))));
        app.apply_fetch_event(FetchEvent::Finished { cycle });

        assert_eq!(app.registry().list_available(), vec!["c", "a"]);
        assert_eq!(app.active_source(), Some("c"));
    }

    #[test]
    fn test_binding_kept_when_provider_still_present() {
        let mut app = app();
        let first = app.begin_fetch().cycle;
        app.apply_fetch_event(settled(first, ProviderResult::succeeded("a", candles(4))));
        app.apply_fetch_event(settled(first, ProviderResult::succeeded("b", candles(6))));
        app.apply_fetch_event(FetchEvent::Finished { cycle: first });
        app.select_source("b");

        let second = app.begin_fetch().cycle;
        app.apply_fetch_event(settled(second, ProviderResult::succeeded("a", candles(8))));
        app.apply_fetch_event(settled(second, ProviderResult::succeeded("b", candles(9))));
        app.apply_fetch_event(FetchEvent::Finished { cycle: second });

        assert_eq!(app.active_source(), Some("b"));
        assert_eq!(app.chart().surface().points().map(|p| p.len()), Some(9));
    }

    #[test]
    fn test_binding_survives_symbol_change() {
        let mut app = app();
        let first = app.begin_fetch().cycle;
        app.apply_fetch_event(settled(first, ProviderResult::succeeded("a", candles(4))));
        app.apply_fetch_event(settled(first, ProviderResult::succeeded("b", candles(6))));
        app.apply_fetch_event(FetchEvent::Finished { cycle: first });
        app.select_source("b");

        app.symbol_input = "ETH".to_string();
        let second = app.begin_fetch().cycle;

        // La première arrivée remplace le graphique BTC
        app.apply_fetch_event(settled(second, ProviderResult::succeeded("a", candles(8))));
        assert_eq!(app.active_source(), Some("a"));

        app.apply_fetch_event(settled(second, ProviderResult::succeeded("b", candles(9))));
        app.apply_fetch_event(FetchEvent::Finished { cycle: second });

        assert_eq!(app.registry().list_available(), vec!["a", "b"]);
        assert_eq!(app.active_source(), Some("b"));
        assert_eq!(app.chart().surface().points().map(|p| p.len()), Some(9));
    }

    #[test]
    fn test_binding_falls_back_to_first_available() {
        let mut app = app();
        let first = app.begin_fetch().cycle;
        app.apply_fetch_event(settled(first, ProviderResult::succeeded("b", candles(4))));
        app.apply_fetch_event(FetchEvent::Finished { cycle: first });

        let second = app.begin_fetch().cycle;
        app.apply_fetch_event(settled(second, ProviderResult::failed("b", "timeout")));
        app.apply_fetch_event(settled(second, ProviderResult::succeeded("c", candles(7))));
        app.apply_fetch_event(FetchEvent::Finished { cycle: second });

        assert_eq!(app.active_source(), Some("c"));
        assert_eq!(app.chart().surface().points().map(|p| p.len()), Some(7));
    }

    #[test]
    fn test_source_and_type_changes() {
        let mut app = app();
        let cycle = app.begin_fetch().cycle;
        app.apply_fetch_event(FetchEvent::Settled {
            cycle,
            results: vec![
                ProviderResult::succeeded("a", candles(3)),
                ProviderResult::succeeded("b", candles(5)),
            ],
        });
        app.apply_fetch_event(FetchEvent::Finished { cycle });

        assert!(app.next_source().is_displayed());
        assert_eq!(app.active_source(), Some("b"));
        assert!(app.next_source().is_displayed());
        assert_eq!(app.active_source(), Some("a"));
        assert!(app.previous_source().is_displayed());
        assert_eq!(app.active_source(), Some("b"));

        let outcome = app.set_series_kind(SeriesKind::Area);
        assert_eq!(
            outcome,
            ChartOutcome::Displayed {
                provider: "b".to_string(),
                points: 5
            }
        );
        assert_eq!(app.series_kind(), SeriesKind::Area);
        assert_eq!(app.chart().surface().attached_count(), 1);

        let outcome = app.select_source("c");
        assert!(matches!(outcome, ChartOutcome::Unavailable { .. }));
        assert_eq!(app.active_source(), Some("b"));
    }

    #[test]
    fn test_type_change_without_data_is_informational() {
        let mut app = app();
        let outcome = app.next_series_kind();

        assert_eq!(outcome, ChartOutcome::NoData);
        assert_eq!(app.series_kind(), SeriesKind::Candlestick);
        assert_eq!(app.message.as_ref().map(|m| m.level), Some(MessageLevel::Info));
    }

    #[test]
    fn test_input_mode() {
        let mut app = app();
        app.start_input(InputField::Days);
        assert_eq!(app.input_buffer, "90");
        app.backspace();
        app.backspace();
        app.append_char('x');
        app.append_char('3');
        app.append_char('0');
        app.submit_input();

        assert!(!app.is_in_input_mode());
        assert_eq!(app.days_input, "30");
    }

    #[test]
    fn test_abort_fetch_clears_indicator() {
        let mut app = app();
        app.begin_fetch();
        app.abort_fetch("worker stopped");

        assert!(!app.is_fetching());
        assert_eq!(app.message, Some(InfoMessage::error("worker stopped")));
    }

    #[test]
    fn test_two_step_quit() {
        let mut app = app();
        app.request_quit();
        assert!(app.is_awaiting_quit_confirmation());
        app.cancel_quit();
        assert!(app.is_running());
        app.quit();
        assert!(!app.is_running());
    }

    #[test]
    fn test_timezone_format() {
        assert_eq!(DisplayTimezone::Utc.format(1_705_276_800, "%Y-%m-%d %H:%M"), "2024-01-15 00:00");
        assert_eq!(DisplayTimezone::Utc.next(), DisplayTimezone::Local);
    }
}
