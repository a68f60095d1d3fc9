//! Terminal front end: endpoint bar, model and history sidebar, streamed
//! transcript, and a message box.

mod app;
mod markdown;
mod ui;

use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyEventKind};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::info;

pub use app::{App, AppConfig, AppEvent, Focus, Notice, NoticeLevel};
pub use markdown::{render as render_markdown, Highlighter};

use crate::domain::DomainError;

const TICK: Duration = Duration::from_millis(150);

/// Runs the interactive chat until the user quits.
pub async fn run(config: AppConfig) -> Result<(), DomainError> {
    let mut terminal = ratatui::try_init()?;
    let result = event_loop(&mut terminal, config).await;
    ratatui::restore();
    result
}

async fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    config: AppConfig,
) -> Result<(), DomainError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = App::new(config, tx);
    let highlighter = Highlighter::new();
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK);

    loop {
        terminal.draw(|frame| ui::draw(frame, &app, &highlighter))?;
        if app.should_quit() {
            break;
        }

        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key).await;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(event) = rx.recv() => app.handle_event(event).await,
            _ = tick.tick() => app.on_tick(),
        }
    }

    info!("Chat closed");
    Ok(())
}
