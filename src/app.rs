//! Application state for the terminal converter
//!
//! `App` is the UI binding: it owns the rate service, listens to its events, keeps
//! the converter field texts, and maps key presses onto conversion operations.

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::{Duration, Instant};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info};

use crate::config::INITIAL_USD_AMOUNT;
use crate::convert::{Converter, SwapMode, TableRow};
use crate::format::format_number;
use crate::rate::{LoadState, RateEvent, RateRecord, RateService};

/// Message shown when no rate can be loaded at all
pub const FAILED_MESSAGE: &str = "Could not load the exchange rate. Please try again later.";

/// Converter input field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Usd,
    Local,
}

impl Field {
    fn other(self) -> Self {
        match self {
            Field::Usd => Field::Local,
            Field::Local => Field::Usd,
        }
    }
}

/// A transient notice with a deadline
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory {
    pub message: String,
    pub expires_at: Instant,
}

/// Main application struct managing state and data
pub struct App {
    /// Rate service feeding this view
    pub service: RateService,
    /// Subscription to rate service events
    events: broadcast::Receiver<RateEvent>,
    /// Load state as last reported by the service
    pub status: LoadState,
    /// Text in the USD field
    pub usd_input: String,
    /// Text in the local currency field
    pub local_input: String,
    /// Field receiving keystrokes
    pub focus: Field,
    /// Swap semantics
    pub swap_mode: SwapMode,
    /// Conversion table for the current rate
    pub table: Vec<TableRow>,
    /// Advisory currently on screen
    pub advisory: Option<Advisory>,
    /// Timestamp of last completed load
    pub last_refresh: Option<DateTime<Local>>,
    /// Flag indicating a refresh has been requested
    pub refresh_requested: bool,
    /// Flag to show help overlay
    pub show_help: bool,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// Whether the converter has been seeded with the initial amount
    converter_seeded: bool,
}

impl App {
    /// Creates a new App bound to `service`
    pub fn new(service: RateService, swap_mode: SwapMode) -> Self {
        let events = service.subscribe();
        Self {
            service,
            events,
            status: LoadState::Idle,
            usd_input: String::new(),
            local_input: String::new(),
            focus: Field::Usd,
            swap_mode,
            table: Vec::new(),
            advisory: None,
            last_refresh: None,
            refresh_requested: false,
            show_help: false,
            should_quit: false,
            converter_seeded: false,
        }
    }

    /// Converter for the rate currently on display
    pub fn converter(&self) -> Converter {
        Converter::new(self.status.record().map(RateRecord::value))
    }

    /// Whether the converter inputs accept edits
    pub fn inputs_enabled(&self) -> bool {
        !matches!(self.status, LoadState::Failed)
    }

    /// Runs a load cycle and applies the resulting events
    pub async fn load(&mut self) {
        self.refresh_requested = false;
        self.service.load().await;
        self.last_refresh = Some(Local::now());
        self.process_events();
    }

    /// Reloads when the app regains focus and no fresh rate is cached
    pub async fn on_focus_gained(&mut self) {
        if self.service.reload_if_needed().await {
            self.last_refresh = Some(Local::now());
        }
        self.process_events();
    }

    /// Drains pending service events into view state
    pub fn process_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Rate events lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    /// Applies one service event
    pub fn apply_event(&mut self, event: RateEvent) {
        match event {
            RateEvent::StateChanged(state) => {
                self.status = state;
                if self.status.record().is_some() {
                    self.rate_changed();
                } else if self.status == LoadState::Failed {
                    self.rate_lost();
                }
            }
            RateEvent::Advisory {
                message,
                display_for,
            } => {
                self.advisory = Some(Advisory {
                    message,
                    expires_at: Instant::now() + display_for,
                });
            }
        }
    }

    /// Clears expired advisories; call once per frame
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    fn tick_at(&mut self, now: Instant) {
        if self.advisory.as_ref().is_some_and(|a| now >= a.expires_at) {
            self.advisory = None;
        }
    }

    /// Time left on the current advisory
    pub fn advisory_remaining(&self) -> Option<Duration> {
        self.advisory
            .as_ref()
            .map(|a| a.expires_at.saturating_duration_since(Instant::now()))
    }

    fn rate_changed(&mut self) {
        let converter = self.converter();
        self.table = converter.conversion_table();

        if !self.converter_seeded {
            self.usd_input = format_number(INITIAL_USD_AMOUNT, 0);
            self.local_input = format_number(converter.usd_to_local(INITIAL_USD_AMOUNT), 2);
            self.converter_seeded = true;
            info!("Converter initialised with ${}", INITIAL_USD_AMOUNT);
        } else {
            self.recompute_from(self.focus);
        }
    }

    /// Drops every figure derived from the previous rate
    fn rate_lost(&mut self) {
        self.table.clear();
        self.usd_input.clear();
        self.local_input.clear();
        self.converter_seeded = false;
    }

    /// Recomputes the field opposite to `source`
    fn recompute_from(&mut self, source: Field) {
        let converter = self.converter();
        match source {
            Field::Usd => {
                if let Some(local) = converter.usd_input_changed(&self.usd_input) {
                    self.local_input = local;
                }
            }
            Field::Local => {
                if let Some(usd) = converter.local_input_changed(&self.local_input) {
                    self.usd_input = usd;
                }
            }
        }
    }

    fn focused_input_mut(&mut self) -> &mut String {
        match self.focus {
            Field::Usd => &mut self.usd_input,
            Field::Local => &mut self.local_input,
        }
    }

    /// Appends a typed character to the focused field
    pub fn type_char(&mut self, c: char) {
        if !self.inputs_enabled() || !(c.is_ascii_digit() || c == '.' || c == ',') {
            return;
        }
        self.focused_input_mut().push(c);
        self.recompute_from(self.focus);
    }

    /// Removes the last character of the focused field
    pub fn backspace(&mut self) {
        if !self.inputs_enabled() {
            return;
        }
        self.focused_input_mut().pop();
        self.recompute_from(self.focus);
    }

    /// Clears the focused field
    pub fn clear_field(&mut self) {
        if !self.inputs_enabled() {
            return;
        }
        self.focused_input_mut().clear();
        self.recompute_from(self.focus);
    }

    /// Swaps the converter fields and moves focus to the other field
    pub fn swap(&mut self) {
        if !self.inputs_enabled() {
            return;
        }
        if let Some((usd, local)) =
            self.converter()
                .swap(&self.usd_input, &self.local_input, self.swap_mode)
        {
            self.usd_input = usd;
            self.local_input = local;
            self.focus = self.focus.other();
        }
    }

    /// Handles keyboard input and updates state accordingly
    ///
    /// # Key Bindings
    /// - `0`-`9`, `.`, `,`: Type into the focused field
    /// - `Backspace`: Delete last character; `Delete`: clear field
    /// - `Tab`/`Up`/`Down`: Switch between USD and local fields
    /// - `s`: Swap
    /// - `r`: Refresh the rate
    /// - `?`: Toggle help
    /// - `q`, `Esc`, `Ctrl-C`: Quit
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        // Help overlay intercepts all keys when shown
        if self.show_help {
            if matches!(
                key_event.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                self.show_help = false;
            }
            return;
        }

        if key_event.modifiers.contains(KeyModifiers::CONTROL)
            && key_event.code == KeyCode::Char('c')
        {
            self.should_quit = true;
            return;
        }

        match key_event.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('r') => self.refresh_requested = true,
            KeyCode::Char('s') => self.swap(),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.focus = self.focus.other();
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.clear_field(),
            KeyCode::Char(c) => self.type_char(c),
            _ => {}
        }
    }
}
