use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Event handler for terminal events
///
/// Ticks at the idle rate normally and at the animation rate while panes are
/// moving, so frames render as fast as the animations produce them.
pub struct EventHandler {
    events: EventStream,
    tick: Interval,
    animation_tick: Interval,
}

impl EventHandler {
    pub fn new(tick_rate: Duration, animation_tick_rate: Duration) -> Self {
        Self {
            events: EventStream::new(),
            tick: skipping_interval(tick_rate),
            animation_tick: skipping_interval(animation_tick_rate),
        }
    }

    /// Wait for the next event, or a tick at the idle rate
    pub async fn next(&mut self) -> Result<Option<AppEvent>> {
        tokio::select! {
            _ = self.tick.tick() => Ok(Some(AppEvent::Tick)),
            event = self.events.next() => translate(event),
        }
    }

    /// Wait for the next event, or a tick at the animation rate
    pub async fn next_animation(&mut self) -> Result<Option<AppEvent>> {
        tokio::select! {
            _ = self.animation_tick.tick() => Ok(Some(AppEvent::Tick)),
            event = self.events.next() => translate(event),
        }
    }
}

fn skipping_interval(period: Duration) -> Interval {
    let mut interval = interval(period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

fn translate(event: Option<std::io::Result<Event>>) -> Result<Option<AppEvent>> {
    match event {
        Some(Ok(Event::Key(key))) => {
            // Only handle key press events, ignore release events
            // (crossterm 0.27+ sends release events on some systems)
            if key.kind == KeyEventKind::Press {
                Ok(Some(AppEvent::Key(key)))
            } else {
                Ok(None)
            }
        }
        Some(Ok(Event::Resize(w, h))) => Ok(Some(AppEvent::Resize(w, h))),
        Some(Ok(_)) => Ok(None),
        Some(Err(e)) => Err(e.into()),
        None => Err(anyhow::anyhow!("terminal event stream closed")),
    }
}

/// Application events
#[derive(Debug)]
pub enum AppEvent {
    /// A key was pressed
    Key(KeyEvent),
    /// Terminal was resized
    Resize(u16, u16),
    /// Tick event for periodic redraws
    Tick,
}
