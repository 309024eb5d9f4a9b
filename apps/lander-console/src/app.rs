use crate::logging::LogStore;
use chrono::Local;
use crossterm::event::{Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use lander_application::session::{Followup, Session, SessionEvent};
use lander_domain::services::formatting::{bytes_to_human, MISSING};
use lander_domain::services::gate::Rejection;
use lander_domain::value_objects::command::CommandKind;
use lander_domain::value_objects::notification::Notification;
use lander_domain::value_objects::video::VideoDescriptor;
use lander_infrastructure::training_api::resolve_media_url;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

const LOG_SCROLL_STEP: usize = 3;

pub struct App {
    pub session: Session,
    pub api_base: String,
    media_origin: String,

    pub logs: Arc<Mutex<LogStore>>,
    pub log_scroll: usize,
    seen_log_generation: u64,

    pub notification: Option<Notification>,
    notification_expires_at: Option<Instant>,
    notification_ttl: Duration,

    pending: Vec<Followup>,
    pub dirty: bool,
    spinner: usize,
}

impl App {
    pub fn new(
        session: Session,
        api_base: String,
        media_origin: String,
        notification_ttl: Duration,
        logs: Arc<Mutex<LogStore>>,
    ) -> Self {
        let pending = session.startup();
        Self {
            session,
            api_base,
            media_origin,
            logs,
            log_scroll: 0,
            seen_log_generation: 0,
            notification: None,
            notification_expires_at: None,
            notification_ttl,
            pending,
            dirty: true,
            spinner: 0,
        }
    }

    /// Followups produced since the last call; the run loop executes them.
    pub fn take_followups(&mut self) -> Vec<Followup> {
        std::mem::take(&mut self.pending)
    }

    pub fn on_tick(&mut self, now: Instant) {
        if self.session.in_flight() {
            self.spinner = (self.spinner + 1) % 4;
            self.dirty = true;
        }

        if let Some(until) = self.notification_expires_at {
            if now >= until {
                self.notification = None;
                self.notification_expires_at = None;
                self.dirty = true;
            }
        }

        let generation = self.logs.lock().generation();
        if generation != self.seen_log_generation {
            self.seen_log_generation = generation;
            self.dirty = true;
        }
    }

    pub fn on_session_event(&mut self, event: SessionEvent) {
        let followups = self.session.apply(event);
        self.pending.extend(followups);
        if let Some(notification) = self.session.take_notification() {
            self.show_notification(notification, Instant::now());
        }
        self.dirty = true;
    }

    fn show_notification(&mut self, notification: Notification, now: Instant) {
        self.notification = Some(notification);
        self.notification_expires_at = Some(now + self.notification_ttl);
    }

    /// Returns `true` when the user asked to quit.
    pub fn on_input(&mut self, event: CtEvent) -> bool {
        match event {
            CtEvent::Key(key) if key.kind != KeyEventKind::Release => self.on_key(key),
            CtEvent::Resize(_, _) => {
                self.dirty = true;
                false
            }
            _ => false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('s') => self.request(CommandKind::Start),
            KeyCode::Char('x') => self.request(CommandKind::Stop),
            KeyCode::Char('e') => self.request(CommandKind::Evaluate),
            KeyCode::Char('v') => self.request(CommandKind::RecordVideo),
            KeyCode::Char('r') => {
                let followups = self.session.refresh();
                self.pending.extend(followups);
            }
            KeyCode::Left => self.session.catalog_mut().select_prev_weights(),
            KeyCode::Right => self.session.catalog_mut().select_next_weights(),
            KeyCode::Up => self.session.catalog_mut().preview_prev(),
            KeyCode::Down => self.session.catalog_mut().preview_next(),
            KeyCode::PageUp => {
                self.log_scroll = self.log_scroll.saturating_add(LOG_SCROLL_STEP);
            }
            KeyCode::PageDown => {
                self.log_scroll = self.log_scroll.saturating_sub(LOG_SCROLL_STEP);
            }
            _ => return false,
        }
        self.dirty = true;
        false
    }

    fn request(&mut self, kind: CommandKind) {
        match self.session.request(kind) {
            Ok(followup) => self.pending.push(followup),
            Err(rejection) => {
                debug!(command = kind.as_str(), reason = %rejection, "command not available");
                metrics::counter!(
                    "lander.console.rejected_commands_total",
                    "command" => kind.as_str(),
                    "reason" => rejection_label(rejection)
                )
                .increment(1);
            }
        }
    }

    pub fn spinner_char(&self) -> char {
        match self.spinner {
            0 => '|',
            1 => '/',
            2 => '-',
            _ => '\\',
        }
    }

    pub fn media_url(&self, path: &str) -> String {
        resolve_media_url(&self.media_origin, path)
    }

    pub fn video_row(&self, video: &VideoDescriptor) -> String {
        format!(
            "{}  {}  {}",
            video.name,
            bytes_to_human(video.size_bytes),
            local_time(video)
        )
    }
}

fn rejection_label(rejection: Rejection) -> &'static str {
    match rejection {
        Rejection::Busy => "busy",
        Rejection::AlreadyRunning => "already_running",
        Rejection::NotRunning => "not_running",
        Rejection::NoWeightsSelected => "no_weights",
    }
}

pub fn local_time(video: &VideoDescriptor) -> String {
    video
        .modified_at()
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}
