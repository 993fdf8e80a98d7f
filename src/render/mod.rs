//! Live chart rendering
//!
//! The render layer owns the lifecycle of an embedded chart. The chart surface
//! itself (a browser widget, a notebook output, a test double) is abstracted as
//! [`ChartView`]; embedding is asynchronous and happens outside this crate, so
//! the [`session::RenderSession`] hands out embed requests and is told when
//! each one settles.

pub mod session;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::naming;
use crate::Result;

pub use session::{EmbedOutcome, EmbedRequest, RenderSession, SessionInputs, SessionState};

/// Callback invoked with `(signal_name, value)` whenever a chart signal fires
pub type SignalListener = Rc<dyn Fn(&str, &Value)>;

/// Listeners keyed by signal name
pub type SignalListeners = BTreeMap<String, SignalListener>;

/// An embedded chart instance.
///
/// Listeners are identified by pointer, so `remove_signal_listener` must be
/// given the same `Rc` that was added.
pub trait ChartView {
    /// Replace every row of a named dataset: all old rows are removed before
    /// the new rows become visible.
    fn replace_data(&mut self, dataset: &str, rows: &[Value]) -> Result<()>;

    /// Recompute the layout after a data or container change
    fn resize(&mut self) -> Result<()>;

    /// Redraw
    fn run(&mut self) -> Result<()>;

    fn add_signal_listener(&mut self, signal: &str, listener: SignalListener);

    fn remove_signal_listener(&mut self, signal: &str, listener: &SignalListener);

    /// Release the instance's render context. The instance is never used again.
    fn finalize(&mut self);
}

/// Options controlling how a specification is embedded
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Show the renderer's action menu
    pub debug: bool,
    /// Editor the action menu links to
    pub editor_url: Option<String>,
}

impl RenderOptions {
    pub fn embed_options(&self) -> EmbedOptions {
        EmbedOptions {
            mode: naming::EMBED_MODE.to_string(),
            actions: self.debug,
            editor_url: self.editor_url.clone(),
        }
    }
}

/// Options passed along with every embed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedOptions {
    pub mode: String,
    pub actions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_url: Option<String>,
}
