//! DolarLempira - USD to Honduran lempira exchange rate
//!
//! A terminal converter backed by a cached central-bank rate, a one-shot `show`
//! command, and the `serve` proxy that shields the upstream API key.

use std::io;
use std::panic;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};

use dolarlempira::app::App;
use dolarlempira::cache::RateCache;
use dolarlempira::cli::{Cli, Command};
use dolarlempira::config::{ClientConfig, ProxyConfig};
use dolarlempira::convert::Converter;
use dolarlempira::format::{display_rate_date, format_number};
use dolarlempira::rate::{LoadState, RateService, RateSource};
use dolarlempira::refresh::{RefreshConfig, RefreshHandle};
use dolarlempira::{logging, proxy, ui};

type BoxError = Box<dyn std::error::Error>;

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableFocusChange, LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

fn build_service(config: &ClientConfig) -> RateService {
    let cache = RateCache::with_dir(config.cache_dir.clone());
    let source = RateSource::new(config.endpoint.clone()).with_timeout(config.fetch_timeout);
    RateService::new(cache, source)
}

/// Loads the rate once and prints it with the conversion table
async fn run_show(config: ClientConfig) -> Result<ExitCode, BoxError> {
    let mut service = build_service(&config);
    let state = service.load().await.clone();

    let record = match &state {
        LoadState::Ready { record, .. } => record,
        LoadState::Degraded { record } => {
            eprintln!("Warning: offline, showing last known rate");
            record
        }
        _ => {
            eprintln!("Error: could not load the exchange rate (no connection and no cached rate)");
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("1 USD = L {}", format_number(record.value(), 2));
    println!("As of: {}", display_rate_date(record.as_of_date()));
    println!();
    let converter = Converter::new(Some(record.value()));
    for row in converter.conversion_table() {
        println!("{:>8}  {:>16}", row.usd_display(), row.local_display());
    }
    Ok(ExitCode::SUCCESS)
}

/// Runs the interactive converter until the user quits
async fn run_tui(config: ClientConfig) -> Result<ExitCode, BoxError> {
    // Stderr belongs to the terminal UI; log to a file instead
    if let Err(e) = logging::init_file(&config.cache_dir) {
        eprintln!("Warning: could not open log file: {}", e);
    }

    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(build_service(&config), config.swap_mode);
    let mut refresh = RefreshHandle::spawn(RefreshConfig {
        interval: config.refresh_interval,
        ..RefreshConfig::default()
    });

    // Initial render to show loading state
    terminal.draw(|f| ui::render_ui(f, &app))?;
    app.load().await;

    // Main event loop
    let result = loop {
        if let Err(e) = terminal.draw(|f| ui::render_ui(f, &app)) {
            break Err(e);
        }

        // Poll for terminal events with 100ms timeout
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Ok(Event::FocusGained) => app.on_focus_gained().await,
                Ok(_) => {}
                Err(e) => break Err(e),
            },
            Ok(false) => {}
            Err(e) => break Err(e),
        }

        if refresh.try_recv().is_some() {
            info!("Scheduled refresh");
            app.load().await;
        }
        if app.refresh_requested {
            app.load().await;
        }
        app.tick();

        if app.should_quit {
            break Ok(());
        }
    };

    refresh.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableFocusChange, LeaveAlternateScreen)?;

    result?;
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode, BoxError> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let client_config = || {
        ClientConfig::from_cli(&cli).map_err(|e| {
            eprintln!("Error: {}", e);
        })
    };

    match cli.command.clone() {
        Some(Command::Serve { bind }) => {
            logging::init_stderr();
            let config = ProxyConfig::from_env().with_bind(bind);
            actix_web::rt::System::new().block_on(proxy::serve(config))?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Show) => {
            logging::init_stderr();
            let Ok(config) = client_config() else {
                return Ok(ExitCode::FAILURE);
            };
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_show(config))
        }
        None => {
            let Ok(config) = client_config() else {
                return Ok(ExitCode::FAILURE);
            };
            let runtime = tokio::runtime::Runtime::new()?;
            let result = runtime.block_on(run_tui(config));
            if let Err(e) = &result {
                error!(error = %e, "Terminal UI exited with an error");
            }
            result
        }
    }
}
