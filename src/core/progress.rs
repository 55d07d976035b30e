//! Progress feedback for long-running asynchronous commands.
//!
//! A [`Progress`] spinner owns one notification slot. A ticker thread sends a
//! [`ProgressTick`] to the control loop at a fixed interval; the loop advances
//! the glyph and replaces the slot's text, so renders never stack. Stopping
//! cancels the ticker and clears the slot. Ticks that arrive after a stop are
//! ignored, which makes an immediate start/stop pair safe.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

pub const SPINNER_FRAMES: [&str; 10] = [
    "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
];

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Identifier of one replaceable notification line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

/// Where user-visible messages go
pub trait Notifier {
    /// Append a one-off message
    fn notify(&mut self, level: Level, message: &str);

    /// Set the text of a slot, replacing what it showed before
    fn replace(&mut self, slot: SlotId, text: &str);

    fn clear(&mut self, slot: SlotId);
}

/// In-memory notification area drained by the view host on every redraw
#[derive(Debug, Default)]
pub struct Notifications {
    slots: BTreeMap<SlotId, String>,
    messages: Vec<(Level, String)>,
    slots_changed: bool,
}

impl Notifications {
    pub fn slot(&self, slot: SlotId) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    pub fn slot_texts(&self) -> impl Iterator<Item = &str> {
        self.slots.values().map(String::as_str)
    }

    pub fn messages(&self) -> &[(Level, String)] {
        &self.messages
    }

    pub fn take_messages(&mut self) -> Vec<(Level, String)> {
        std::mem::take(&mut self.messages)
    }

    /// Whether any slot changed since the last call
    pub fn take_slots_changed(&mut self) -> bool {
        std::mem::replace(&mut self.slots_changed, false)
    }
}

impl Notifier for Notifications {
    fn notify(&mut self, level: Level, message: &str) {
        // The host shows the message; the log only keeps a trace
        log::debug!("{level:?}: {message}");
        self.messages.push((level, message.to_string()));
    }

    fn replace(&mut self, slot: SlotId, text: &str) {
        self.slots.insert(slot, text.to_string());
        self.slots_changed = true;
    }

    fn clear(&mut self, slot: SlotId) {
        if self.slots.remove(&slot).is_some() {
            self.slots_changed = true;
        }
    }
}

/// Sent by the ticker thread; handled on the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTick {
    pub slot: SlotId,
}

/// Returned by [`Progress::start`]; pass back to [`Progress::stop`]
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a spinner runs until its handle is stopped"]
pub struct ProgressHandle {
    slot: SlotId,
}

impl ProgressHandle {
    pub fn slot(&self) -> SlotId {
        self.slot
    }
}

struct Spinner {
    label: String,
    frame: usize,
    stop: Arc<AtomicBool>,
}

pub struct Progress {
    interval: Duration,
    next_slot: u64,
    active: BTreeMap<SlotId, Spinner>,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl Progress {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: 0,
            active: BTreeMap::new(),
        }
    }

    /// Show the first frame now and tick the loop every interval
    pub fn start<E>(
        &mut self,
        label: &str,
        events: &Sender<E>,
        notifier: &mut dyn Notifier,
    ) -> ProgressHandle
    where
        E: From<ProgressTick> + Send + 'static,
    {
        self.next_slot += 1;
        let slot = SlotId(self.next_slot);
        let stop = Arc::new(AtomicBool::new(false));

        let ticker_stop = Arc::clone(&stop);
        let sender = events.clone();
        let interval = self.interval;
        std::thread::spawn(move || loop {
            std::thread::sleep(interval);
            if ticker_stop.load(Ordering::Relaxed) {
                break;
            }
            if sender.send(E::from(ProgressTick { slot })).is_err() {
                break;
            }
        });

        notifier.replace(slot, &render_frame(0, label));
        self.active.insert(
            slot,
            Spinner {
                label: label.to_string(),
                frame: 0,
                stop,
            },
        );
        ProgressHandle { slot }
    }

    /// Advance the glyph of a running spinner; stale ticks are ignored
    pub fn tick(&mut self, tick: ProgressTick, notifier: &mut dyn Notifier) {
        if let Some(spinner) = self.active.get_mut(&tick.slot) {
            spinner.frame = (spinner.frame + 1) % SPINNER_FRAMES.len();
            notifier.replace(tick.slot, &render_frame(spinner.frame, &spinner.label));
        }
    }

    pub fn stop(&mut self, handle: ProgressHandle, notifier: &mut dyn Notifier) {
        if let Some(spinner) = self.active.remove(&handle.slot) {
            spinner.stop.store(true, Ordering::Relaxed);
        }
        notifier.clear(handle.slot);
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        for spinner in self.active.values() {
            spinner.stop.store(true, Ordering::Relaxed);
        }
    }
}

fn render_frame(frame: usize, label: &str) -> String {
    format!("{} {}", SPINNER_FRAMES[frame % SPINNER_FRAMES.len()], label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_start_renders_first_frame() {
        let (tx, _rx) = mpsc::channel::<ProgressTick>();
        let mut progress = Progress::new(Duration::from_secs(60));
        let mut notifications = Notifications::default();

        let handle = progress.start("Pushing", &tx, &mut notifications);
        assert_eq!(notifications.slot(handle.slot()), Some("⠋ Pushing"));
        progress.stop(handle, &mut notifications);
    }

    #[test]
    fn test_ticks_replace_the_same_slot() {
        let (tx, rx) = mpsc::channel::<ProgressTick>();
        let mut progress = Progress::new(Duration::from_millis(5));
        let mut notifications = Notifications::default();

        let handle = progress.start("Pulling", &tx, &mut notifications);
        for _ in 0..3 {
            let tick = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            progress.tick(tick, &mut notifications);
        }
        assert_eq!(notifications.slot_texts().count(), 1);
        assert_eq!(notifications.slot(handle.slot()), Some("⠸ Pulling"));

        progress.stop(handle, &mut notifications);
        assert_eq!(notifications.slot_texts().count(), 0);
    }

    #[test]
    fn test_immediate_stop_is_safe() {
        let (tx, rx) = mpsc::channel::<ProgressTick>();
        let mut progress = Progress::new(Duration::from_millis(1));
        let mut notifications = Notifications::default();

        let handle = progress.start("Fetching", &tx, &mut notifications);
        let slot = handle.slot();
        progress.stop(handle, &mut notifications);
        assert_eq!(progress.active_count(), 0);

        // A tick already in flight must not resurrect the slot
        progress.tick(ProgressTick { slot }, &mut notifications);
        while let Ok(tick) = rx.recv_timeout(Duration::from_millis(20)) {
            progress.tick(tick, &mut notifications);
        }
        assert_eq!(notifications.slot(slot), None);
    }

    #[test]
    fn test_notify_collects_messages() {
        let mut notifications = Notifications::default();
        notifications.notify(Level::Warning, "Nothing staged to commit");
        let messages = notifications.take_messages();
        assert_eq!(messages, vec![(Level::Warning, "Nothing staged to commit".to_string())]);
        assert!(notifications.messages().is_empty());
    }
}
