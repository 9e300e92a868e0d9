use std::io::{self, Stderr};
use std::time::Duration;
use anyhow::Result;
use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
        Event, KeyEvent, KeyEventKind, MouseEvent,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::bridge::ViewEvent;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

#[derive(Debug)]
#[allow(dead_code)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Bracketed paste; a file dropped onto the terminal arrives as its path
    Paste(String),
    Resize(u16, u16),
    Tick,
    /// Update pushed by the chat controller
    View(ViewEvent),
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventHandler {
    /// `tick` drives the typing reveal, so it should match the per-character
    /// interval.
    pub fn new(tick: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        // Spawn event reader task
        let tx_events = tx.clone();
        tokio::spawn(forward_terminal_events(event::EventStream::new(), tx_events));

        // Spawn tick timer for the typing reveal and the Thinking ellipsis
        let tx_tick = tx.clone();
        let tick = tick.max(Duration::from_millis(10));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                interval.tick().await;
                if tx_tick.send(AppEvent::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }

    /// Handle for other tasks to feed events into the loop
    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

/// Pump terminal events into the app channel until either side closes
async fn forward_terminal_events<S>(mut reader: S, tx: mpsc::UnboundedSender<AppEvent>)
where
    S: Stream<Item = io::Result<Event>> + Unpin,
{
    while let Some(evt) = reader.next().await {
        let Ok(evt) = evt else {
            continue;
        };
        if let Some(event) = translate(evt) {
            if tx.send(event).is_err() {
                break;
            }
        }
    }
}

fn translate(evt: Event) -> Option<AppEvent> {
    match evt {
        // Only handle key press events, not release
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
        Event::Mouse(mouse) => Some(AppEvent::Mouse(mouse)),
        Event::Paste(text) => Some(AppEvent::Paste(text)),
        Event::Resize(w, h) => Some(AppEvent::Resize(w, h)),
        _ => None,
    }
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen)?;

    // Enable mouse capture and bracketed paste (drag-and-drop of files)
    execute!(io::stderr(), EnableMouseCapture, EnableBracketedPaste)?;

    let backend = CrosstermBackend::new(io::stderr());
    let terminal = Terminal::new(backend)?;

    Ok(terminal)
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), DisableBracketedPaste, DisableMouseCapture)?;
    execute!(io::stderr(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Install panic hook to restore terminal on panic
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};
    use futures_util::stream;

    fn key(kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        })
    }

    #[tokio::test]
    async fn test_reader_stops_when_stream_ends() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = stream::iter(vec![
            Ok(key(KeyEventKind::Press)),
            Err(io::Error::new(io::ErrorKind::Other, "read failed")),
            Ok(key(KeyEventKind::Release)),
            Ok(Event::Paste("/tmp/a.png".to_string())),
        ]);

        // Returns once the stream is exhausted instead of polling forever
        forward_terminal_events(events, tx).await;

        assert!(matches!(rx.recv().await, Some(AppEvent::Key(_))));
        assert!(matches!(rx.recv().await, Some(AppEvent::Paste(p)) if p == "/tmp/a.png"));
        assert!(rx.recv().await.is_none());
    }
}
