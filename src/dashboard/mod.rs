//! The view layer: per-section view models, their composition into one
//! numbered view, action dispatch, and the control loop driving it all.

pub mod composer;
pub mod dispatcher;
pub mod events;
pub mod host;
pub mod provider;
pub mod session;
pub mod view_model;

pub use composer::{compose, ComposedView, LineEntry, LineKind};
pub use dispatcher::{dispatch, dispatch_lines, DispatchReport};
pub use events::{spawn_stdin_reader, EventSource, LoopEvent};
pub use host::{PickOption, PromptSource, ScriptedHost, TerminalHost, ViewHost};
pub use provider::{BuildContext, SectionDescriptor, SectionKey, SectionProvider};
pub use session::{Flow, InputCommand, Session};
pub use view_model::{
    action, Action, ActionContext, ActionKind, Highlight, HighlightRange, LineMeta, Refresh,
    Style, ViewModel,
};
