// ============================================================================
// CandleDeck - Dashboard OHLC multi-sources
// ============================================================================
// Programme TUI qui interroge plusieurs providers via un backend d'agrégation,
// suit leur statut et affiche une source au choix sous forme de chandeliers,
// ligne, aire ou barres
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle qui gère événements, résultats et rendering
// 3. Async dans sync : worker thread avec son runtime tokio
// 4. Ownership : l'event loop possède App, le worker ne produit que des événements
// ============================================================================

use std::io;
use std::path::Path;
use std::sync::{mpsc, Arc};

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, error, info, warn};

use candledeck::api::{CandleBackend, FetchEvent, FetchOrchestrator, HttpBackend};
use candledeck::app::{App, InfoMessage, InputField};
use candledeck::chart::{ChartOptions, TerminalChart};
use candledeck::config::AppConfig;
use candledeck::models::{FetchRequest, ProviderSpec};
use candledeck::ui::{events::EventHandler, render, Event};

// ============================================================================
// WorkerCommand : Commandes pour le worker thread
// ============================================================================

/// Commandes envoyées au worker thread
#[derive(Debug, Clone)]
enum WorkerCommand {
    /// Lancer un cycle de fetch (les cycles précédents continuent, jamais annulés)
    Fetch(FetchRequest),
}

// ============================================================================
// Initialisation du logging
// ============================================================================
// Les println! ne fonctionnent pas une fois le TUI lancé : on log vers un
// fichier, avec rotation quotidienne
// ============================================================================

/// Initialise le système de logging vers fichier
///
/// # Utilisation
/// ```bash
/// tail -f ~/.local/share/candledeck/logs/candledeck.log
/// RUST_LOG=candledeck=trace cargo run
/// ```
fn init_logging(log_dir: &Path) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    std::fs::create_dir_all(log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "candledeck.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "candledeck=debug,info".into()),
        )
        .try_init()
        .context("Échec de l'initialisation du subscriber tracing")?;

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    // .env optionnel : les variables déjà présentes gardent la priorité
    let _ = dotenv::dotenv();

    // Logging d'abord : les warnings de configuration doivent être écrits
    init_logging(&AppConfig::log_dir_from_env()).unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    let mut config = AppConfig::from_env();

    info!(
        backend = %config.backend_url,
        shape = config.request_shape.label(),
        providers = config.providers.len(),
        "CandleDeck starting up"
    );

    if config.discover_providers {
        config.providers = discover_providers(&config)?;
    }

    let backend = Arc::new(
        HttpBackend::new(&config.backend_url, config.timeout)
            .context("Impossible de créer le client du backend")?,
    );

    let orchestrator = Arc::new(FetchOrchestrator::new(
        backend,
        config.providers.clone(),
        config.request_shape,
    ));

    // Setup du terminal en mode TUI
    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    // État de session : construit une fois, passé par &mut aux handlers
    let mut app = App::from_config(&config, TerminalChart::new(ChartOptions::default()));

    let (command_tx, command_rx) = mpsc::channel::<WorkerCommand>();
    let (event_tx, event_rx) = mpsc::channel::<FetchEvent>();

    info!("Spawning background worker thread");
    spawn_background_worker(command_rx, event_tx, orchestrator);

    // Premier cycle : symbole par défaut
    start_fetch(&mut app, &command_tx);

    let events = EventHandler::default();

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &events, &command_tx, &event_rx);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Découverte des providers
// ============================================================================

/// Remplace les providers configurés par les adapters du backend
///
/// En cas d'échec ou de liste vide, garde la configuration.
/// Client dédié : son pool de connexions meurt avec ce runtime.
fn discover_providers(config: &AppConfig) -> Result<Vec<ProviderSpec>> {
    let configured = config.providers.as_slice();
    let backend = HttpBackend::new(&config.backend_url, config.timeout)
        .context("Impossible de créer le client du backend")?;
    let runtime = tokio::runtime::Runtime::new().context("Échec de la création du runtime tokio")?;

    match runtime.block_on(backend.list_adapters()) {
        Ok(adapters) if !adapters.is_empty() => {
            let providers: Vec<ProviderSpec> = adapters
                .iter()
                .inspect(|adapter| {
                    if adapter.requires_api_key && !adapter.configured {
                        warn!(adapter = %adapter.name, "Adapter requires an API key and is not configured");
                    }
                })
                .map(|adapter| adapter.to_provider_spec(configured))
                .collect();
            info!(count = providers.len(), "Providers discovered from backend");
            Ok(providers)
        }
        Ok(_) => {
            warn!("Backend returned no adapter, keeping configured providers");
            Ok(configured.to_vec())
        }
        Err(e) => {
            warn!(error = %e, "Provider discovery failed, keeping configured providers");
            Ok(configured.to_vec())
        }
    }
}

// ============================================================================
// Background Worker Thread
// ============================================================================
// Thread séparé avec son runtime tokio :
// - reçoit des WorkerCommand
// - lance chaque cycle comme une tâche tokio indépendante
// - renvoie les FetchEvent à l'event loop (qui seule modifie App)
// ============================================================================

fn spawn_background_worker(
    command_rx: mpsc::Receiver<WorkerCommand>,
    event_tx: mpsc::Sender<FetchEvent>,
    orchestrator: Arc<FetchOrchestrator>,
) {
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");

        while let Ok(command) = command_rx.recv() {
            match command {
                WorkerCommand::Fetch(request) => {
                    info!(cycle = %request.cycle, symbol = %request.symbol, "Worker received fetch command");

                    let orchestrator = orchestrator.clone();
                    let event_tx = event_tx.clone();
                    runtime.spawn(async move {
                        orchestrator
                            .run_cycle(&request, |event| {
                                // L'event loop peut être déjà fermée : on ignore
                                let _ = event_tx.send(event);
                            })
                            .await;
                    });
                }
            }
        }

        info!("Worker thread exiting (channel closed)");
    });
}

/// Démarre un cycle et l'envoie au worker
fn start_fetch(app: &mut App<TerminalChart>, command_tx: &mpsc::Sender<WorkerCommand>) {
    let request = app.begin_fetch();
    if command_tx.send(WorkerCommand::Fetch(request)).is_err() {
        error!("Worker thread is gone, fetch not sent");
        app.abort_fetch("Background worker stopped, cannot fetch data");
    }
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   0. Applique les événements du worker
//   1. Dessine l'interface
//   2. Traite l'input
//   3. Tick
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<TerminalChart>,
    events: &EventHandler,
    command_tx: &mpsc::Sender<WorkerCommand>,
    event_rx: &mpsc::Receiver<FetchEvent>,
) -> Result<()> {
    let mut worker_lost = false;

    while app.is_running() {
        // 0. RÉSULTATS : tous les événements arrivés depuis la dernière frame
        loop {
            match event_rx.try_recv() {
                Ok(event) => {
                    app.apply_fetch_event(event);
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    if !worker_lost {
                        error!("Worker thread disconnected!");
                        app.message = Some(InfoMessage::error("Background worker stopped"));
                        worker_lost = true;
                    }
                    break;
                }
            }
        }

        // 1. RENDER
        terminal.draw(|frame| render(frame, app))?;

        // 2. INPUT
        match events.next() {
            Ok(event) => handle_event(app, event, command_tx),
            Err(e) => warn!(error = %e, "Failed to read terminal event"),
        }

        // 3. UPDATE
        app.tick();
    }

    Ok(())
}

// ============================================================================
// Gestion des événements
// ============================================================================

/// Traite un événement et met à jour l'état de l'application
///
/// Changer de source ou de type ne touche que le graphique ; seuls
/// Enter (saisie) et 'r' lancent un cycle.
fn handle_event(app: &mut App<TerminalChart>, event: Event, command_tx: &mpsc::Sender<WorkerCommand>) {
    use candledeck::ui::events::{
        chart_type_from_event, get_char_from_event, is_backspace_event, is_edit_days_event,
        is_edit_symbol_event, is_enter_event, is_escape_event, is_input_char_event,
        is_next_chart_type_event, is_next_source_event, is_previous_chart_type_event,
        is_previous_source_event, is_quit_event, is_reload_event, is_timezone_event,
    };

    if matches!(event, Event::Tick) {
        return;
    }

    // ========================================
    // Input Mode : Gestion de la saisie
    // ========================================
    if app.is_in_input_mode() {
        if is_escape_event(&event) {
            info!("User cancelled input");
            app.cancel_input();
        } else if is_enter_event(&event) {
            app.submit_input();
            info!(symbol = %app.symbol_input, days = %app.days_input, "User submitted input");
            start_fetch(app, command_tx);
        } else if is_backspace_event(&event) {
            app.backspace();
        } else if is_input_char_event(&event) {
            if let Some(c) = get_char_from_event(&event) {
                app.append_char(c);
            }
        }
        return;
    }

    // Touche 'q' : quit confirmation two-step
    if is_quit_event(&event) {
        if app.is_awaiting_quit_confirmation() {
            info!("User confirmed quit");
            app.quit();
        } else {
            info!("User requested quit (awaiting confirmation)");
            app.request_quit();
        }
        return;
    }

    // Toute autre touche annule la confirmation
    app.cancel_quit();

    if is_edit_symbol_event(&event) {
        app.start_input(InputField::Symbol);
    } else if is_edit_days_event(&event) {
        app.start_input(InputField::Days);
    } else if is_enter_event(&event) || is_reload_event(&event) {
        info!("User requested reload");
        start_fetch(app, command_tx);
    } else if is_next_chart_type_event(&event) {
        app.next_series_kind();
    } else if is_previous_chart_type_event(&event) {
        app.previous_series_kind();
    } else if let Some(kind) = chart_type_from_event(&event) {
        app.set_series_kind(kind);
    } else if is_next_source_event(&event) {
        app.next_source();
    } else if is_previous_source_event(&event) {
        app.previous_source();
    } else if is_timezone_event(&event) {
        app.cycle_timezone();
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================
// IMPORTANT : Toujours restaurer le terminal avant de quitter !
// ============================================================================

/// Configure le terminal en mode TUI
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("Échec de l'activation du raw mode")?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Échec de l'entrée dans l'écran alternatif")?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("Échec de la création du terminal")
}

/// Restaure le terminal à son état normal
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}
