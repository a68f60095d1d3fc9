use std::path::PathBuf;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::{
    Connection, ConnectUseCase, ConversationHistoryUseCase, ListModelsUseCase, SendMessageUseCase,
};
use crate::domain::{ChatSession, Conversation, DomainError, ModelInfo};

/// Results delivered to the UI loop by background tasks.
#[derive(Debug)]
pub enum AppEvent {
    Connected(Result<Connection, DomainError>),
    ModelsLoaded(Result<Vec<ModelInfo>, DomainError>),
    /// Chat events carry the turn they belong to; a cancelled task may
    /// still deliver events after the next turn has started.
    Chunk { turn: u64, text: String },
    ChatFinished {
        turn: u64,
        result: Result<String, DomainError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Endpoint,
    Models,
    History,
    Input,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Endpoint => Focus::Models,
            Focus::Models => Focus::History,
            Focus::History => Focus::Input,
            Focus::Input => Focus::Endpoint,
        }
    }

    fn previous(self) -> Self {
        match self {
            Focus::Endpoint => Focus::Input,
            Focus::Models => Focus::Endpoint,
            Focus::History => Focus::Models,
            Focus::Input => Focus::History,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// Everything the terminal front end needs to start.
pub struct AppConfig {
    pub endpoint: String,
    pub auto_connect: bool,
    pub session: ChatSession,
    pub connect: Arc<ConnectUseCase>,
    pub history: Arc<ConversationHistoryUseCase>,
    pub export_dir: PathBuf,
}

pub struct App {
    pub(crate) session: ChatSession,
    pub(crate) endpoint_input: String,
    pub(crate) input: String,
    pub(crate) focus: Focus,
    pub(crate) model_cursor: usize,
    pub(crate) history: Vec<Conversation>,
    pub(crate) history_cursor: usize,
    pub(crate) notice: Option<Notice>,
    /// Lines scrolled up from the bottom of the transcript.
    pub(crate) scroll_back: u16,
    pub(crate) connecting: bool,
    pub(crate) spinner: usize,
    connection: Option<Connection>,
    connect: Arc<ConnectUseCase>,
    history_use_case: Arc<ConversationHistoryUseCase>,
    export_dir: PathBuf,
    tx: UnboundedSender<AppEvent>,
    chat_task: Option<JoinHandle<()>>,
    turn: u64,
    should_quit: bool,
}

impl App {
    pub fn new(config: AppConfig, tx: UnboundedSender<AppEvent>) -> Self {
        let mut app = Self {
            session: config.session,
            endpoint_input: config.endpoint,
            input: String::new(),
            focus: Focus::Endpoint,
            model_cursor: 0,
            history: Vec::new(),
            history_cursor: 0,
            notice: None,
            scroll_back: 0,
            connecting: false,
            spinner: 0,
            connection: None,
            connect: config.connect,
            history_use_case: config.history,
            export_dir: config.export_dir,
            tx,
            chat_task: None,
            turn: 0,
            should_quit: false,
        };
        if config.auto_connect {
            app.start_connect();
        }
        app
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn on_tick(&mut self) {
        if self.session.is_generating() || self.connecting {
            self.spinner = self.spinner.wrapping_add(1);
        }
    }

    fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        let text = text.into();
        debug!("Notice ({:?}): {}", level, text);
        self.notice = Some(Notice { level, text });
    }

    fn notify_error(&mut self, error: &DomainError) {
        self.notify(NoticeLevel::Error, error.user_message());
    }

    pub async fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
                self.cancel_generation();
                self.should_quit = true;
            }
            KeyCode::Char('n') if ctrl => self.new_chat().await,
            KeyCode::Char('r') if ctrl => self.start_load_models(),
            KeyCode::Char('s') if ctrl => self.export_current().await,
            KeyCode::Esc => {
                if self.session.is_generating() {
                    self.cancel_generation();
                    self.notify(NoticeLevel::Info, "Generation cancelled");
                }
            }
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.previous(),
            KeyCode::PageUp => self.scroll_back = self.scroll_back.saturating_add(5),
            KeyCode::PageDown => self.scroll_back = self.scroll_back.saturating_sub(5),
            _ => match self.focus {
                Focus::Endpoint => self.handle_endpoint_key(key),
                Focus::Models => self.handle_models_key(key),
                Focus::History => self.handle_history_key(key).await,
                Focus::Input => self.handle_input_key(key),
            },
        }
    }

    fn handle_endpoint_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.start_connect(),
            KeyCode::Backspace => {
                self.endpoint_input.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.endpoint_input.push(c)
            }
            _ => {}
        }
    }

    fn handle_models_key(&mut self, key: KeyEvent) {
        let count = self.session.models().len();
        match key.code {
            KeyCode::Up => self.model_cursor = self.model_cursor.saturating_sub(1),
            KeyCode::Down if count > 0 => {
                self.model_cursor = (self.model_cursor + 1).min(count - 1)
            }
            KeyCode::Enter => {
                if let Some(model) = self.session.models().get(self.model_cursor) {
                    let id = model.id().to_string();
                    let name = model.name().to_string();
                    self.session.select_model(id);
                    self.notify(NoticeLevel::Info, format!("Model: {name}"));
                    self.focus = Focus::Input;
                }
            }
            _ => {}
        }
    }

    async fn handle_history_key(&mut self, key: KeyEvent) {
        let count = self.history.len();
        match key.code {
            KeyCode::Up => self.history_cursor = self.history_cursor.saturating_sub(1),
            KeyCode::Down if count > 0 => {
                self.history_cursor = (self.history_cursor + 1).min(count - 1)
            }
            KeyCode::Enter => {
                let Some(id) = self.history.get(self.history_cursor).map(|c| c.id().to_string())
                else {
                    return;
                };
                match self.history_use_case.open(&mut self.session, &id).await {
                    Ok(()) => {
                        self.scroll_back = 0;
                        self.focus = Focus::Input;
                    }
                    Err(e) => self.notify_error(&e),
                }
                self.refresh_history().await;
            }
            KeyCode::Delete | KeyCode::Char('d') => {
                let Some(id) = self.history.get(self.history_cursor).map(|c| c.id().to_string())
                else {
                    return;
                };
                if let Err(e) = self.history_use_case.delete(&id).await {
                    self.notify_error(&e);
                }
                self.refresh_history().await;
            }
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let newline = key
            .modifiers
            .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT);
        match key.code {
            KeyCode::Enter if newline => self.input.push('\n'),
            KeyCode::Char('j') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.push('\n')
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.push(c)
            }
            _ => {}
        }
    }

    fn start_connect(&mut self) {
        if self.connecting {
            return;
        }
        if self.session.is_generating() {
            self.notify(NoticeLevel::Error, "Wait for the current response to finish");
            return;
        }
        self.connecting = true;
        self.notify(NoticeLevel::Info, "Connecting...");

        let connect = self.connect.clone();
        let endpoint = self.endpoint_input.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = connect.execute(&endpoint).await;
            let _ = tx.send(AppEvent::Connected(result));
        });
    }

    fn start_load_models(&mut self) {
        let Some(connection) = &self.connection else {
            self.notify(NoticeLevel::Error, "Not connected");
            return;
        };
        let use_case = ListModelsUseCase::new(connection.client.clone());
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = use_case.execute().await;
            let _ = tx.send(AppEvent::ModelsLoaded(result));
        });
    }

    /// Sends the composed message. Does nothing when the send control would
    /// be disabled: blank input, no model, or a reply in flight.
    pub fn submit(&mut self) {
        if !self.session.can_submit(&self.input) {
            if self.session.selected_model().is_none() && !self.input.trim().is_empty() {
                self.notify(NoticeLevel::Error, "Please select a model");
            }
            return;
        }
        let Some(connection) = &self.connection else {
            self.notify(NoticeLevel::Error, "Not connected");
            return;
        };

        let use_case = SendMessageUseCase::new(connection.client.clone());
        let request = match use_case.prepare(&mut self.session, &self.input) {
            Ok(request) => request,
            Err(e) => {
                self.notify_error(&e);
                return;
            }
        };
        self.input.clear();
        self.scroll_back = 0;
        self.notice = None;

        self.turn += 1;
        let turn = self.turn;
        let tx = self.tx.clone();
        self.chat_task = Some(tokio::spawn(async move {
            let chunk_tx = tx.clone();
            let mut forward = move |chunk: &str| {
                let _ = chunk_tx.send(AppEvent::Chunk {
                    turn,
                    text: chunk.to_string(),
                });
            };
            let result = use_case.stream(&request, &mut forward).await;
            let _ = tx.send(AppEvent::ChatFinished { turn, result });
        }));
    }

    fn cancel_generation(&mut self) {
        if let Some(task) = self.chat_task.take() {
            task.abort();
        }
        if self.session.is_generating() {
            info!("Generation cancelled");
            self.session.abort_turn();
        }
    }

    async fn new_chat(&mut self) {
        match self.history_use_case.start_new(&mut self.session).await {
            Ok(()) => {
                self.scroll_back = 0;
                self.focus = Focus::Input;
            }
            Err(e) => self.notify_error(&e),
        }
        self.refresh_history().await;
    }

    async fn export_current(&mut self) {
        let conversation = self.session.conversation();
        if conversation.is_empty() {
            self.notify(NoticeLevel::Info, "Nothing to export");
            return;
        }
        let short_id: String = conversation.id().chars().take(8).collect();
        let path = self.export_dir.join(format!("conversation-{short_id}.json"));
        match self.history_use_case.export(conversation, &path).await {
            Ok(()) => self.notify(NoticeLevel::Success, format!("Saved {}", path.display())),
            Err(e) => self.notify(NoticeLevel::Error, format!("Export failed: {e}")),
        }
    }

    async fn refresh_history(&mut self) {
        match self.history_use_case.list().await {
            Ok(history) => {
                self.history = history;
                self.history_cursor = self
                    .history_cursor
                    .min(self.history.len().saturating_sub(1));
            }
            Err(e) => warn!("Failed to list conversations: {}", e),
        }
    }

    pub async fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Connected(Ok(connection)) => {
                self.connecting = false;
                self.endpoint_input = connection.endpoint.to_string();
                self.session.set_connected(connection.endpoint.clone());
                self.connection = Some(connection);
                self.notify(NoticeLevel::Success, "Connected");
                self.focus = Focus::Input;
                self.start_load_models();
            }
            AppEvent::Connected(Err(e)) => {
                self.connecting = false;
                self.notify_error(&e);
            }
            AppEvent::ModelsLoaded(Ok(models)) => {
                let count = models.len();
                self.session.set_models(models);
                if self.session.selected_model().is_none() {
                    if let Some(first) = self.session.models().first() {
                        let id = first.id().to_string();
                        self.session.select_model(id);
                    }
                }
                self.model_cursor = self
                    .session
                    .selected_model()
                    .and_then(|id| self.session.models().iter().position(|m| m.id() == id))
                    .unwrap_or(0);
                if count == 0 {
                    self.notify(NoticeLevel::Info, "Server lists no models");
                }
            }
            AppEvent::ModelsLoaded(Err(e)) => {
                warn!("Failed to load models: {}", e);
                self.notify(NoticeLevel::Error, "Failed to load models");
            }
            AppEvent::Chunk { turn, .. } | AppEvent::ChatFinished { turn, .. }
                if turn != self.turn =>
            {
                debug!("Dropping event from stale turn {} (current {})", turn, self.turn);
            }
            AppEvent::Chunk { text, .. } => {
                if self.session.is_generating() {
                    self.session.append_chunk(&text);
                }
            }
            AppEvent::ChatFinished { result: Ok(_), .. } => {
                self.chat_task = None;
                if self.session.is_generating() {
                    self.session.finish_turn();
                }
            }
            AppEvent::ChatFinished { result: Err(e), .. } => {
                self.chat_task = None;
                warn!("Chat failed: {}", e);
                self.session.abort_turn();
                self.notify_error(&e);
            }
        }
    }
}
