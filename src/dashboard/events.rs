//! Control loop events.
//!
//! Everything that reaches the dashboard from another thread (typed input,
//! job output, progress ticks) arrives as a [`LoopEvent`] on one channel and
//! is handled on the loop, one event at a time.

use crate::core::jobs::JobEvent;
use crate::core::progress::ProgressTick;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug)]
pub enum LoopEvent {
    Input(String),
    InputClosed,
    Job(JobEvent),
    Tick(ProgressTick),
}

impl From<JobEvent> for LoopEvent {
    fn from(event: JobEvent) -> Self {
        LoopEvent::Job(event)
    }
}

impl From<ProgressTick> for LoopEvent {
    fn from(tick: ProgressTick) -> Self {
        LoopEvent::Tick(tick)
    }
}

/// The loop's receiving end.
///
/// Prompts read input through [`EventSource::next_input`] while a handler is
/// running; job and tick events that arrive meanwhile are deferred and handed
/// out again, in order, by [`EventSource::next_event`].
///
/// With an input gate attached, the reader thread reads one line per
/// [`EventSource::request_input`] and is otherwise idle, so a foreground
/// editor or pager owns the terminal while it runs.
pub struct EventSource {
    receiver: Receiver<LoopEvent>,
    deferred: VecDeque<LoopEvent>,
    gate: Option<Sender<()>>,
    input_requested: bool,
}

impl EventSource {
    pub fn new(receiver: Receiver<LoopEvent>) -> Self {
        Self {
            receiver,
            deferred: VecDeque::new(),
            gate: None,
            input_requested: false,
        }
    }

    /// Read typed lines only on request, through `gate`
    pub fn with_input_gate(mut self, gate: Sender<()>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Let the reader take one more line; at most one request is outstanding
    pub fn request_input(&mut self) {
        if self.input_requested {
            return;
        }
        if let Some(gate) = &self.gate {
            self.input_requested = gate.send(()).is_ok();
        }
    }

    fn receive(&mut self) -> Option<LoopEvent> {
        let event = self.receiver.recv().ok()?;
        if matches!(event, LoopEvent::Input(_) | LoopEvent::InputClosed) {
            self.input_requested = false;
        }
        Some(event)
    }

    /// Block for the next event; `None` once every sender is gone
    pub fn next_event(&mut self) -> Option<LoopEvent> {
        match self.deferred.pop_front() {
            Some(event) => Some(event),
            None => self.receive(),
        }
    }

    /// Wait for the next typed line, deferring everything else
    pub fn next_input(&mut self) -> Option<String> {
        if let Some(pos) = self
            .deferred
            .iter()
            .position(|event| matches!(event, LoopEvent::Input(_) | LoopEvent::InputClosed))
        {
            return match self.deferred.remove(pos) {
                Some(LoopEvent::Input(line)) => Some(line),
                Some(closed) => {
                    self.deferred.insert(pos, closed);
                    None
                }
                None => None,
            };
        }

        self.request_input();
        loop {
            match self.receive()? {
                LoopEvent::Input(line) => return Some(line),
                LoopEvent::InputClosed => {
                    self.deferred.push_back(LoopEvent::InputClosed);
                    return None;
                }
                other => self.deferred.push_back(other),
            }
        }
    }
}

/// Forward lines of `reader` to the loop, one per request on the returned gate.
///
/// The thread waits for a request before every read and never reads ahead.
/// It ends at EOF, which is reported as [`LoopEvent::InputClosed`], or once
/// the gate or the loop is dropped.
pub fn spawn_line_reader<R>(mut reader: R, sender: Sender<LoopEvent>) -> Sender<()>
where
    R: BufRead + Send + 'static,
{
    let (gate, requests) = mpsc::channel::<()>();
    std::thread::spawn(move || {
        while requests.recv().is_ok() {
            let mut line = String::new();
            let event = match reader.read_line(&mut line) {
                Ok(0) | Err(_) => LoopEvent::InputClosed,
                Ok(_) => {
                    let trimmed = line.trim_end_matches(['\n', '\r']).len();
                    line.truncate(trimmed);
                    LoopEvent::Input(line)
                }
            };
            let closed = matches!(event, LoopEvent::InputClosed);
            if sender.send(event).is_err() || closed {
                return;
            }
        }
    });
    gate
}

/// Forward stdin lines to the loop, one per request
pub fn spawn_stdin_reader(sender: Sender<LoopEvent>) -> Sender<()> {
    spawn_line_reader(BufReader::new(std::io::stdin()), sender)
}
