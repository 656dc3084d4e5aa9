//! Terminal input plus the tick and frame pulses that drive the screens.

use std::time::Duration;

use crossterm::event::{Event as TermEvent, EventStream, KeyEvent, KeyEventKind, MouseEvent};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Bracketed paste, delivered whole.
    Paste(String),
    Resize(u16, u16),
    /// Ages the "Updated Xs ago" label, expires toasts, spins throbbers.
    Tick,
    Render,
}

/// How often [`Event::Tick`] and [`Event::Render`] fire.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub tick: Duration,
    pub frame: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(250),
            frame: Duration::from_millis(33),
        }
    }
}

/// Map a raw terminal event. Key releases and repeats, focus changes
/// and empty pastes are dropped.
pub fn translate(event: TermEvent) -> Option<Event> {
    match event {
        TermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
        TermEvent::Mouse(mouse) => Some(Event::Mouse(mouse)),
        TermEvent::Paste(text) if !text.is_empty() => Some(Event::Paste(text)),
        TermEvent::Resize(cols, rows) => Some(Event::Resize(cols, rows)),
        _ => None,
    }
}

fn pulse(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Background reader feeding [`Event`]s over a channel.
pub struct EventReader {
    rx: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
}

impl EventReader {
    pub fn spawn(cadence: Cadence) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(read_loop(tx, cadence, cancel.clone()));
        Self { rx, cancel }
    }

    /// `None` once the reader has stopped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for EventReader {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn read_loop(tx: mpsc::UnboundedSender<Event>, cadence: Cadence, cancel: CancellationToken) {
    let mut input = EventStream::new();
    let mut tick = pulse(cadence.tick);
    let mut frame = pulse(cadence.frame);

    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => return,
            _ = tick.tick() => Event::Tick,
            _ = frame.tick() => Event::Render,
            raw = input.next() => match raw {
                Some(Ok(raw)) => match translate(raw) {
                    Some(event) => event,
                    None => continue,
                },
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "terminal input error");
                    continue;
                }
                None => return,
            },
        };
        if tx.send(event).is_err() {
            return;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};
    use pretty_assertions::assert_eq;

    use super::*;

    fn key(kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code: KeyCode::Char('r'),
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn only_key_presses_pass() {
        let press = key(KeyEventKind::Press);
        assert_eq!(translate(TermEvent::Key(press)), Some(Event::Key(press)));
        assert_eq!(translate(TermEvent::Key(key(KeyEventKind::Release))), None);
        assert_eq!(translate(TermEvent::Key(key(KeyEventKind::Repeat))), None);
    }

    #[test]
    fn pastes_arrive_whole_and_empty_ones_are_dropped() {
        assert_eq!(
            translate(TermEvent::Paste("aa:bb:cc:dd:ee:ff".into())),
            Some(Event::Paste("aa:bb:cc:dd:ee:ff".into()))
        );
        assert_eq!(translate(TermEvent::Paste(String::new())), None);
    }

    #[test]
    fn resize_and_focus() {
        assert_eq!(translate(TermEvent::Resize(120, 40)), Some(Event::Resize(120, 40)));
        assert_eq!(translate(TermEvent::FocusGained), None);
    }
}
