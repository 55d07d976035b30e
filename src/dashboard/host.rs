//! The surface the dashboard renders into and asks the user through.
//!
//! [`ViewHost`] is the seam between the control loop and whatever paints the
//! view. [`TerminalHost`] prints numbered lines and reads answers from the
//! loop's input stream; [`ScriptedHost`] answers from queues and records what
//! it was shown.

use crate::core::colors::Palette;
use crate::core::error::{DashboardError, Result};
use crate::core::output::{print_info, print_notification, print_section_header};
use crate::core::pager::PagedCommand;
use crate::core::process::ExternalCommand;
use crate::core::progress::{Level, Notifications};
use crate::dashboard::composer::{ComposedView, LineKind};
use crate::dashboard::events::EventSource;
use crate::dashboard::view_model::Style;
use colored::*;
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// One choice offered by [`ViewHost::pick`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickOption {
    pub label: String,
    /// Drawn as the current value
    pub marked: bool,
}

impl PickOption {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            marked: false,
        }
    }

    pub fn marked(mut self, marked: bool) -> Self {
        self.marked = marked;
        self
    }
}

pub trait ViewHost {
    /// Colours for the semantic styles, after providers adjusted them
    fn set_palette(&mut self, palette: Palette);

    /// Paint a freshly composed view, then pending notifications
    fn render(&mut self, view: &ComposedView, notifications: &mut Notifications);

    /// Show pending messages and progress slots without repainting the view
    fn flush_notifications(&mut self, notifications: &mut Notifications);

    /// Ask a yes/no question; anything but an explicit yes is a no
    fn confirm(&mut self, prompt: &str) -> bool;

    /// Index of the chosen option, `None` when dismissed
    fn pick(&mut self, title: &str, options: &[PickOption]) -> Option<usize>;

    /// Free-text answer, `None` when dismissed
    fn input(&mut self, prompt: &str) -> Option<String>;

    fn show_document(&mut self, title: &str, lines: &[String]);

    /// Hand off a display pipeline such as a paged diff; its exit status is not checked
    fn show_command(&mut self, title: &str, command: PagedCommand) -> Result<()>;

    /// Open a working-tree file in the user's editor
    fn open_path(&mut self, path: &Path) -> Result<()>;
}

/// Where a terminal host gets answers from
pub enum PromptSource {
    /// Typed lines from the control loop's event stream
    Interactive(Rc<RefCell<EventSource>>),
    /// No user present; confirms answer `assume_yes`, picks and inputs are dismissed
    Batch { assume_yes: bool },
}

pub struct TerminalHost {
    workdir: PathBuf,
    palette: Palette,
    prompts: PromptSource,
    spinner_visible: bool,
}

impl TerminalHost {
    pub fn new(workdir: impl Into<PathBuf>, prompts: PromptSource) -> Self {
        Self {
            workdir: workdir.into(),
            palette: Palette::default(),
            prompts,
            spinner_visible: false,
        }
    }

    fn ask(&mut self, prompt: &str) -> Option<String> {
        let source = match &self.prompts {
            PromptSource::Interactive(source) => Rc::clone(source),
            PromptSource::Batch { .. } => {
                log::debug!("No user to answer '{prompt}'");
                return None;
            }
        };
        self.clear_spinner();
        print!("{} ", prompt.bold());
        let _ = std::io::stdout().flush();
        let answer = source.borrow_mut().next_input();
        answer
    }

    fn clear_spinner(&mut self) {
        if self.spinner_visible {
            print!("\r\x1b[2K");
            let _ = std::io::stdout().flush();
            self.spinner_visible = false;
        }
    }

    fn run_inherited(&mut self, command: &ExternalCommand) -> Result<()> {
        self.clear_spinner();
        let status = command.to_std(&self.workdir).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(DashboardError::command_failed(
                command.to_string(),
                "",
                status.code().unwrap_or(-1),
            ))
        }
    }

    fn render_line(&self, view: &ComposedView, number: usize, text: &str) -> String {
        let Some(entry) = view.entry(number) else {
            return text.to_string();
        };
        let mut rendered = match entry.kind {
            LineKind::Header => self.palette.paint(Style::Header, text).to_string(),
            LineKind::Spacing => String::new(),
            LineKind::Content => self.palette.render_line(text, view.highlight(number)),
        };
        if let Some((annotation, style)) = view.annotation(number) {
            let style = style.unwrap_or(Style::Muted);
            rendered.push_str(&format!("  {}", self.palette.paint(style, annotation)));
        }
        rendered
    }
}

impl ViewHost for TerminalHost {
    fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    fn render(&mut self, view: &ComposedView, notifications: &mut Notifications) {
        self.clear_spinner();
        println!();
        for (i, text) in view.lines().iter().enumerate() {
            let number = i + 1;
            let rendered = self.render_line(view, number, text);
            if rendered.is_empty() {
                println!("{}", format!("{number:>3}").dimmed());
            } else {
                println!("{} {}", format!("{number:>3}").dimmed(), rendered);
            }
        }
        self.flush_notifications(notifications);
    }

    fn flush_notifications(&mut self, notifications: &mut Notifications) {
        let messages = notifications.take_messages();
        if !messages.is_empty() {
            self.clear_spinner();
        }
        for (level, message) in messages {
            print_notification(level, &message);
        }

        if notifications.take_slots_changed() {
            let text = notifications.slot_texts().collect::<Vec<_>>().join("  ");
            if text.is_empty() {
                self.clear_spinner();
            } else {
                print!("\r\x1b[2K{text}");
                let _ = std::io::stdout().flush();
                self.spinner_visible = true;
            }
        }
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        if let PromptSource::Batch { assume_yes } = self.prompts {
            log::debug!("Answering '{prompt}' with {assume_yes}");
            return assume_yes;
        }
        self.ask(&format!("{prompt} [y/N]"))
            .is_some_and(|answer| matches!(answer.trim(), "y" | "Y" | "yes"))
    }

    fn pick(&mut self, title: &str, options: &[PickOption]) -> Option<usize> {
        if options.is_empty() {
            return None;
        }
        if matches!(self.prompts, PromptSource::Batch { .. }) {
            log::debug!("No user to pick from '{title}'");
            return None;
        }
        print_section_header(title);
        for (i, option) in options.iter().enumerate() {
            let marker = if option.marked { "*" } else { " " };
            println!("{:>3} {} {}", i + 1, marker.green(), option.label);
        }
        let answer = self.ask("Pick a number (empty to cancel):")?;
        let index = answer.trim().parse::<usize>().ok()?;
        (1..=options.len()).contains(&index).then(|| index - 1)
    }

    fn input(&mut self, prompt: &str) -> Option<String> {
        self.ask(&format!("{prompt}:"))
            .filter(|answer| !answer.trim().is_empty())
    }

    fn show_document(&mut self, title: &str, lines: &[String]) {
        self.clear_spinner();
        print_section_header(title);
        for line in lines {
            print_info(line);
        }
    }

    fn show_command(&mut self, title: &str, command: PagedCommand) -> Result<()> {
        self.clear_spinner();
        print_section_header(title);
        // Diff tools exit non-zero when there are differences
        let status = command.command.to_std(&self.workdir).status()?;
        log::debug!("`{}` exited with {:?}", command.command, status.code());
        Ok(())
    }

    fn open_path(&mut self, path: &Path) -> Result<()> {
        let editor = std::env::var("VISUAL")
            .or_else(|_| std::env::var("EDITOR"))
            .map_err(|_| DashboardError::precondition("Set $EDITOR to open files"))?;
        let full_path = self.workdir.join(path);
        let quoted = shell_escape::escape(Cow::Owned(full_path.to_string_lossy().into_owned()));
        self.run_inherited(&ExternalCommand::shell(format!("{editor} {quoted}")))
    }
}

/// Host that answers from queues and records everything it is shown
#[derive(Debug, Default)]
pub struct ScriptedHost {
    confirms: VecDeque<bool>,
    picks: VecDeque<Option<usize>>,
    inputs: VecDeque<Option<String>>,
    pub prompts: Vec<String>,
    pub pick_options: Vec<Vec<PickOption>>,
    pub documents: Vec<(String, Vec<String>)>,
    pub commands: Vec<String>,
    pub opened: Vec<PathBuf>,
    pub messages: Vec<(Level, String)>,
    pub renders: usize,
    pub last_view: Vec<String>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_confirm(mut self, answer: bool) -> Self {
        self.confirms.push_back(answer);
        self
    }

    pub fn answer_pick(mut self, choice: Option<usize>) -> Self {
        self.picks.push_back(choice);
        self
    }

    pub fn answer_input(mut self, text: impl Into<String>) -> Self {
        self.inputs.push_back(Some(text.into()));
        self
    }

    /// Messages recorded at `level`
    pub fn messages_at(&self, level: Level) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|(message_level, _)| *message_level == level)
            .map(|(_, message)| message.as_str())
            .collect()
    }
}

impl ViewHost for ScriptedHost {
    fn set_palette(&mut self, _palette: Palette) {}

    fn render(&mut self, view: &ComposedView, notifications: &mut Notifications) {
        self.renders += 1;
        self.last_view = view.lines().to_vec();
        self.flush_notifications(notifications);
    }

    fn flush_notifications(&mut self, notifications: &mut Notifications) {
        self.messages.extend(notifications.take_messages());
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_string());
        self.confirms.pop_front().unwrap_or(false)
    }

    fn pick(&mut self, title: &str, options: &[PickOption]) -> Option<usize> {
        self.prompts.push(title.to_string());
        self.pick_options.push(options.to_vec());
        self.picks.pop_front().flatten()
    }

    fn input(&mut self, prompt: &str) -> Option<String> {
        self.prompts.push(prompt.to_string());
        self.inputs.pop_front().flatten()
    }

    fn show_document(&mut self, title: &str, lines: &[String]) {
        self.documents.push((title.to_string(), lines.to_vec()));
    }

    fn show_command(&mut self, _title: &str, command: PagedCommand) -> Result<()> {
        self.commands.push(command.command.to_string());
        Ok(())
    }

    fn open_path(&mut self, path: &Path) -> Result<()> {
        self.opened.push(path.to_path_buf());
        Ok(())
    }
}
