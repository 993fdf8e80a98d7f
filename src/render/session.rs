//! Render session state machine
//!
//! A [`RenderSession`] owns at most one live chart instance and re-embeds it
//! whenever its inputs change.
//!
//! # Lifecycle
//!
//! ```text
//! Empty ──update──▶ Rendering ──on_embedded(Ok)──▶ Live
//!                      ▲                            │
//!                      └───────────update───────────┘
//! any state ──dispose──▶ Disposed
//! ```
//!
//! The session does no IO. [`RenderSession::update`] compiles the inputs and
//! returns an [`EmbedRequest`] carrying a ticket; the host embeds the
//! specification and reports the outcome through [`RenderSession::on_embedded`]
//! with the same ticket. Only the most recently issued ticket may go live. Any
//! other instance is finalized as soon as it arrives, so after all pending
//! embeds settle exactly one live instance remains.
//!
//! Change detection hashes the small dependencies (request, compile options,
//! render options) and compares the rows against the last compiled table with
//! `equals_missing`; identical inputs never re-enter `Rendering`.

use polars::prelude::DataFrame;
use serde::Serialize;
use serde_json::Value;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::rc::Rc;

use super::{ChartView, EmbedOptions, RenderOptions, SignalListeners};
use crate::data::dataframe_to_values;
use crate::naming;
use crate::plot::aggregate::{Aggregator, PolarsAggregator};
use crate::plot::query::ChartRequest;
use crate::writer::vegalite::spec::Specification;
use crate::writer::{CompileOptions, VegaLiteWriter};
use crate::{ChartspecError, Result};

// =============================================================================
// Types
// =============================================================================

/// Observable state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing embedded, nothing pending
    Empty,
    /// An embed request is outstanding
    Rendering,
    Live,
    Disposed,
}

/// Everything a render depends on
#[derive(Debug, Clone, Copy)]
pub struct SessionInputs<'a> {
    pub request: &'a ChartRequest,
    /// Raw rows; aggregated by the session when aggregation is in effect
    pub rows: &'a DataFrame,
    pub options: &'a CompileOptions,
    pub render: &'a RenderOptions,
}

impl SessionInputs<'_> {
    fn fingerprint(&self) -> Result<Fingerprint> {
        let mut hasher = DefaultHasher::new();
        to_json(self.request)?.hash(&mut hasher);
        to_json(self.options)?.hash(&mut hasher);
        to_json(self.render)?.hash(&mut hasher);
        Ok(Fingerprint {
            config: hasher.finish(),
            rows: self.rows.clone(),
        })
    }
}

/// Identity of the inputs last compiled. Cloning a table only bumps the
/// reference counts of its columns.
struct Fingerprint {
    config: u64,
    rows: DataFrame,
}

impl Fingerprint {
    fn matches(&self, other: &Fingerprint) -> bool {
        self.config == other.config && self.rows.equals_missing(&other.rows)
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| ChartspecError::InternalError(format!("Failed to serialize input: {}", e)))
}

/// A specification the host must embed, answered with `on_embedded(ticket, ..)`
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedRequest {
    pub ticket: u64,
    pub spec: Specification,
    pub options: EmbedOptions,
}

/// What happened to an embedded instance reported through `on_embedded`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedOutcome {
    /// The instance is now the live instance
    Live,
    /// The instance was superseded (or the session disposed) and got finalized
    Finalized,
    /// Embedding or the initial data push failed; the previous instance stays live
    Failed,
}

struct PendingEmbed {
    ticket: u64,
    spec: Specification,
    rows: Vec<Value>,
}

struct LiveInstance<V> {
    view: V,
    spec: Specification,
}

// =============================================================================
// Session
// =============================================================================

/// Owner of one live chart instance
pub struct RenderSession<V: ChartView> {
    aggregator: Box<dyn Aggregator>,
    fingerprint: Option<Fingerprint>,
    last_ticket: u64,
    pending: Option<PendingEmbed>,
    live: Option<LiveInstance<V>>,
    listeners: SignalListeners,
    disposed: bool,
}

impl<V: ChartView> Default for RenderSession<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: ChartView> RenderSession<V> {
    /// Session aggregating with [`PolarsAggregator`]
    pub fn new() -> Self {
        Self::with_aggregator(Box::new(PolarsAggregator::new()))
    }

    pub fn with_aggregator(aggregator: Box<dyn Aggregator>) -> Self {
        Self {
            aggregator,
            fingerprint: None,
            last_ticket: 0,
            pending: None,
            live: None,
            listeners: SignalListeners::new(),
            disposed: false,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.disposed {
            SessionState::Disposed
        } else if self.pending.is_some() {
            SessionState::Rendering
        } else if self.live.is_some() {
            SessionState::Live
        } else {
            SessionState::Empty
        }
    }

    /// Specification of the live instance
    pub fn current_spec(&self) -> Option<&Specification> {
        self.live.as_ref().map(|l| &l.spec)
    }

    pub fn live_view(&self) -> Option<&V> {
        self.live.as_ref().map(|l| &l.view)
    }

    /// React to an input change.
    ///
    /// Returns an embed request when the inputs differ from the last compiled
    /// ones and describe a renderable chart. Issuing a request supersedes any
    /// request still in flight.
    ///
    /// # Errors
    ///
    /// Aggregation and compilation failures are returned unchanged; the live
    /// instance is kept and the same inputs are retried on the next call.
    pub fn update(&mut self, inputs: &SessionInputs<'_>) -> Result<Option<EmbedRequest>> {
        if self.disposed {
            tracing::debug!("update ignored, session is disposed");
            return Ok(None);
        }

        if !inputs.request.query.is_renderable() {
            tracing::debug!("query has no position or geometry, nothing to render");
            self.invalidate_pending();
            self.fingerprint = None;
            return Ok(None);
        }

        let fingerprint = inputs.fingerprint()?;
        if self
            .fingerprint
            .as_ref()
            .is_some_and(|last| last.matches(&fingerprint))
        {
            return Ok(None);
        }

        let options = CompileOptions {
            inline_data: false,
            ..inputs.options.clone()
        };
        let writer = VegaLiteWriter::with_options(options);
        let table = writer.prepare_table(self.aggregator.as_ref(), inputs.request, inputs.rows)?;
        let spec = writer.compile(inputs.request, &table)?;
        if !spec.has_mark() {
            tracing::warn!("compiled specification has no mark, skipping embed");
            self.fingerprint = Some(fingerprint);
            self.invalidate_pending();
            return Ok(None);
        }

        let rows = dataframe_to_values(&table)?;
        self.fingerprint = Some(fingerprint);

        self.last_ticket += 1;
        let ticket = self.last_ticket;
        if let Some(previous) = self.pending.replace(PendingEmbed {
            ticket,
            spec: spec.clone(),
            rows,
        }) {
            tracing::debug!(superseded = previous.ticket, ticket, "embed superseded");
        }

        Ok(Some(EmbedRequest {
            ticket,
            spec,
            options: inputs.render.embed_options(),
        }))
    }

    /// Settle the embed issued under `ticket`.
    ///
    /// The newest pending instance is promoted: its rows are pushed with a
    /// replace changeset, it is resized and redrawn, then the previous instance
    /// loses its listeners and is finalized. Any other arrival is finalized.
    /// Failures are logged and leave the previous instance live.
    pub fn on_embedded(&mut self, ticket: u64, result: Result<V>) -> EmbedOutcome {
        let is_newest = self.pending.as_ref().is_some_and(|p| p.ticket == ticket);
        if !is_newest {
            return match result {
                Ok(mut view) => {
                    tracing::debug!(ticket, "finalizing stale chart instance");
                    view.finalize();
                    EmbedOutcome::Finalized
                }
                Err(e) => {
                    tracing::debug!(ticket, error = %e, "stale embed failed");
                    EmbedOutcome::Failed
                }
            };
        }

        let Some(pending) = self.pending.take() else {
            return EmbedOutcome::Failed;
        };

        let mut view = match result {
            Ok(view) => view,
            Err(e) => {
                tracing::error!(ticket, error = %e, "embedding failed");
                return EmbedOutcome::Failed;
            }
        };

        if let Err(e) = Self::load(&mut view, &pending.rows) {
            tracing::error!(ticket, error = %e, "failed to load data into chart instance");
            view.finalize();
            return EmbedOutcome::Failed;
        }

        if let Some(mut old) = self.live.take() {
            self.detach_listeners(&mut old.view);
            old.view.finalize();
        }
        self.attach_listeners(&mut view);
        self.live = Some(LiveInstance {
            view,
            spec: pending.spec,
        });
        tracing::debug!(ticket, "chart instance is live");
        EmbedOutcome::Live
    }

    /// Replace the signal listener mapping, re-attaching on the live instance
    pub fn set_listeners(&mut self, listeners: SignalListeners) {
        if self.disposed {
            return;
        }
        if let Some(mut live) = self.live.take() {
            self.detach_listeners(&mut live.view);
            self.listeners = listeners;
            self.attach_listeners(&mut live.view);
            self.live = Some(live);
        } else {
            self.listeners = listeners;
        }
    }

    /// Finalize the live instance and stop reacting to inputs
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(mut live) = self.live.take() {
            self.detach_listeners(&mut live.view);
            live.view.finalize();
        }
        self.pending = None;
        self.disposed = true;
        tracing::debug!("render session disposed");
    }

    fn invalidate_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(ticket = pending.ticket, "pending embed invalidated");
        }
    }

    fn load(view: &mut V, rows: &[Value]) -> Result<()> {
        view.replace_data(naming::DATA_SOURCE, rows)?;
        view.resize()?;
        view.run()
    }

    fn attach_listeners(&self, view: &mut V) {
        for (signal, listener) in &self.listeners {
            view.add_signal_listener(signal, Rc::clone(listener));
        }
    }

    fn detach_listeners(&self, view: &mut V) {
        for (signal, listener) in &self.listeners {
            view.remove_signal_listener(signal, listener);
        }
    }
}

impl<V: ChartView> Drop for RenderSession<V> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::geom::Geometry;
    use crate::plot::query::Query;
    use crate::plot::types::{AnalyticType, FieldMeta, SemanticType};
    use crate::render::SignalListener;
    use polars::prelude::*;
    use std::cell::RefCell;

    // ==================== Recording View ====================

    #[derive(Debug, Default)]
    struct Log {
        events: Vec<String>,
        signals: Vec<(u32, String)>,
    }

    impl Log {
        fn count(&self, prefix: &str) -> usize {
            self.events.iter().filter(|e| e.starts_with(prefix)).count()
        }
    }

    struct FakeView {
        id: u32,
        log: Rc<RefCell<Log>>,
        listeners: Vec<(String, SignalListener)>,
        fail_data: bool,
    }

    impl FakeView {
        fn new(id: u32, log: &Rc<RefCell<Log>>) -> Self {
            Self {
                id,
                log: Rc::clone(log),
                listeners: Vec::new(),
                fail_data: false,
            }
        }

        fn record(&self, event: String) {
            self.log.borrow_mut().events.push(event);
        }

        fn emit(&self, signal: &str, value: &Value) {
            for (name, listener) in &self.listeners {
                if name == signal {
                    listener(signal, value);
                }
            }
        }
    }

    impl ChartView for FakeView {
        fn replace_data(&mut self, dataset: &str, rows: &[Value]) -> Result<()> {
            if self.fail_data {
                return Err(ChartspecError::EmbedError("dataset missing".to_string()));
            }
            self.record(format!("data:{}:{}:{}", self.id, dataset, rows.len()));
            Ok(())
        }

        fn resize(&mut self) -> Result<()> {
            self.record(format!("resize:{}", self.id));
            Ok(())
        }

        fn run(&mut self) -> Result<()> {
            self.record(format!("run:{}", self.id));
            Ok(())
        }

        fn add_signal_listener(&mut self, signal: &str, listener: SignalListener) {
            self.record(format!("add:{}:{}", self.id, signal));
            self.listeners.push((signal.to_string(), listener));
        }

        fn remove_signal_listener(&mut self, signal: &str, listener: &SignalListener) {
            self.record(format!("remove:{}:{}", self.id, signal));
            self.listeners
                .retain(|(name, l)| !(name == signal && Rc::ptr_eq(l, listener)));
        }

        fn finalize(&mut self) {
            self.record(format!("finalize:{}", self.id));
        }
    }

    // ==================== Fixtures ====================

    fn request() -> ChartRequest {
        let fields = vec![
            FieldMeta::new("region", SemanticType::Nominal, AnalyticType::Dimension, 3),
            FieldMeta::new("sales", SemanticType::Quantitative, AnalyticType::Measure, 5),
        ];
        let query = Query::new(Geometry::Bar).with_position(&["region", "sales"]);
        ChartRequest::new(query, fields)
    }

    fn rows(scale: f64) -> DataFrame {
        df! {
            "region" => ["north", "south", "north", "east"],
            "sales" => [10.0 * scale, 20.0 * scale, 30.0 * scale, 5.0 * scale],
        }
        .unwrap()
    }

    fn update(
        session: &mut RenderSession<FakeView>,
        request: &ChartRequest,
        rows: &DataFrame,
    ) -> Result<Option<EmbedRequest>> {
        let options = CompileOptions::default();
        let render = RenderOptions::default();
        session.update(&SessionInputs {
            request,
            rows,
            options: &options,
            render: &render,
        })
    }

    fn listener(log: &Rc<RefCell<Log>>, tag: u32) -> SignalListener {
        let log = Rc::clone(log);
        Rc::new(move |signal: &str, _value: &Value| {
            log.borrow_mut().signals.push((tag, signal.to_string()));
        })
    }

    // ==================== Lifecycle Tests ====================

    #[test]
    fn test_first_render_goes_live() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();
        assert_eq!(session.state(), SessionState::Empty);

        let req = update(&mut session, &request(), &rows(1.0)).unwrap().unwrap();
        assert_eq!(req.ticket, 1);
        assert_eq!(req.options.mode, "vega-lite");
        assert_eq!(session.state(), SessionState::Rendering);

        let outcome = session.on_embedded(req.ticket, Ok(FakeView::new(1, &log)));
        assert_eq!(outcome, EmbedOutcome::Live);
        assert_eq!(session.state(), SessionState::Live);
        assert_eq!(session.current_spec(), Some(&req.spec));
        assert_eq!(session.live_view().map(|v| v.id), Some(1));

        // Three aggregated groups, pushed then resized then redrawn
        assert_eq!(
            log.borrow().events,
            vec!["data:1:dataSource:3", "resize:1", "run:1"]
        );
    }

    #[test]
    fn test_unchanged_inputs_do_not_rerender() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();
        let (request, rows) = (request(), rows(1.0));

        let req = update(&mut session, &request, &rows).unwrap().unwrap();
        session.on_embedded(req.ticket, Ok(FakeView::new(1, &log)));

        assert!(update(&mut session, &request, &rows).unwrap().is_none());
        assert_eq!(session.state(), SessionState::Live);
    }

    #[test]
    fn test_equal_rebuilt_table_does_not_rerender() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();
        let request = request();

        let req = update(&mut session, &request, &rows(1.0)).unwrap().unwrap();
        session.on_embedded(req.ticket, Ok(FakeView::new(1, &log)));

        // A fresh table with the same contents is not a change
        assert!(update(&mut session, &request, &rows(1.0)).unwrap().is_none());

        let edited = df! {
            "region" => ["north", "south", "north", "east"],
            "sales" => [10.0, 20.0, 30.0, 6.0],
        }
        .unwrap();
        assert!(update(&mut session, &request, &edited).unwrap().is_some());
    }

    #[test]
    fn test_changed_inputs_replace_live_instance() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();

        let first = update(&mut session, &request(), &rows(1.0)).unwrap().unwrap();
        session.on_embedded(first.ticket, Ok(FakeView::new(1, &log)));

        let second = update(&mut session, &request(), &rows(2.0)).unwrap().unwrap();
        assert_eq!(session.state(), SessionState::Rendering);
        // Old instance stays live until the new one resolves
        assert_eq!(session.live_view().map(|v| v.id), Some(1));

        session.on_embedded(second.ticket, Ok(FakeView::new(2, &log)));
        assert_eq!(session.live_view().map(|v| v.id), Some(2));

        let log = log.borrow();
        assert_eq!(log.count("finalize:1"), 1);
        let data_2 = log.events.iter().position(|e| e.starts_with("data:2")).unwrap();
        let finalize_1 = log.events.iter().position(|e| e == "finalize:1").unwrap();
        assert!(data_2 < finalize_1);
    }

    // ==================== Ordering Tests ====================

    fn rapid_changes(order: &[usize]) -> (RenderSession<FakeView>, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();
        let request = request();

        let tickets: Vec<u64> = (1..=order.len())
            .map(|i| {
                update(&mut session, &request, &rows(i as f64))
                    .unwrap()
                    .unwrap()
                    .ticket
            })
            .collect();

        for &i in order {
            session.on_embedded(tickets[i], Ok(FakeView::new(i as u32 + 1, &log)));
        }
        (session, log)
    }

    #[test]
    fn test_rapid_changes_resolved_in_order() {
        let (session, log) = rapid_changes(&[0, 1, 2, 3]);
        assert_eq!(session.state(), SessionState::Live);
        assert_eq!(session.live_view().map(|v| v.id), Some(4));
        assert_eq!(log.borrow().count("finalize:"), 3);
        assert_eq!(log.borrow().count("finalize:4"), 0);
    }

    #[test]
    fn test_rapid_changes_resolved_in_reverse() {
        let (session, log) = rapid_changes(&[3, 2, 1, 0]);
        assert_eq!(session.live_view().map(|v| v.id), Some(4));
        assert_eq!(log.borrow().count("finalize:"), 3);
        // Stale instances never receive data
        assert_eq!(log.borrow().count("data:"), 1);
    }

    #[test]
    fn test_rapid_changes_resolved_out_of_order() {
        let (session, log) = rapid_changes(&[1, 3, 0, 2]);
        assert_eq!(session.live_view().map(|v| v.id), Some(4));
        assert_eq!(log.borrow().count("finalize:"), 3);
    }

    // ==================== Failure Tests ====================

    #[test]
    fn test_embed_failure_keeps_previous_instance() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();
        let request = request();

        let first = update(&mut session, &request, &rows(1.0)).unwrap().unwrap();
        session.on_embedded(first.ticket, Ok(FakeView::new(1, &log)));

        let changed = rows(2.0);
        let second = update(&mut session, &request, &changed).unwrap().unwrap();
        let outcome = session.on_embedded(
            second.ticket,
            Err(ChartspecError::EmbedError("renderer fault".to_string())),
        );
        assert_eq!(outcome, EmbedOutcome::Failed);
        assert_eq!(session.state(), SessionState::Live);
        assert_eq!(session.live_view().map(|v| v.id), Some(1));
        assert_eq!(session.current_spec(), Some(&first.spec));
        assert_eq!(log.borrow().count("finalize:"), 0);

        // No retry until the inputs genuinely change
        assert!(update(&mut session, &request, &changed).unwrap().is_none());
        assert!(update(&mut session, &request, &rows(3.0)).unwrap().is_some());
    }

    #[test]
    fn test_first_embed_failure_leaves_session_empty() {
        let mut session: RenderSession<FakeView> = RenderSession::new();
        let req = update(&mut session, &request(), &rows(1.0)).unwrap().unwrap();
        session.on_embedded(
            req.ticket,
            Err(ChartspecError::EmbedError("bad spec".to_string())),
        );
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.current_spec().is_none());
    }

    #[test]
    fn test_data_push_failure_finalizes_new_instance() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();

        let first = update(&mut session, &request(), &rows(1.0)).unwrap().unwrap();
        session.on_embedded(first.ticket, Ok(FakeView::new(1, &log)));

        let second = update(&mut session, &request(), &rows(2.0)).unwrap().unwrap();
        let mut broken = FakeView::new(2, &log);
        broken.fail_data = true;
        assert_eq!(session.on_embedded(second.ticket, Ok(broken)), EmbedOutcome::Failed);

        assert_eq!(session.live_view().map(|v| v.id), Some(1));
        assert_eq!(log.borrow().count("finalize:2"), 1);
        assert_eq!(log.borrow().count("finalize:1"), 0);
    }

    #[test]
    fn test_aggregation_error_propagates_and_keeps_live() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();

        let first = update(&mut session, &request(), &rows(1.0)).unwrap().unwrap();
        session.on_embedded(first.ticket, Ok(FakeView::new(1, &log)));

        let broken = request().with_dimensions(vec!["missing".to_string()]);
        let err = update(&mut session, &broken, &rows(1.0)).unwrap_err();
        assert!(matches!(err, ChartspecError::AggregationError(_)));
        assert_eq!(session.state(), SessionState::Live);
        assert_eq!(session.live_view().map(|v| v.id), Some(1));

        // The failed inputs are retried rather than remembered
        assert!(update(&mut session, &broken, &rows(1.0)).is_err());
    }

    // ==================== Degenerate Input Tests ====================

    #[test]
    fn test_non_renderable_query_invalidates_pending() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();

        let req = update(&mut session, &request(), &rows(1.0)).unwrap().unwrap();

        let mut empty = request();
        empty.query.position.clear();
        assert!(update(&mut session, &empty, &rows(1.0)).unwrap().is_none());
        assert_eq!(session.state(), SessionState::Empty);

        // The invalidated embed settles late and is discarded
        let outcome = session.on_embedded(req.ticket, Ok(FakeView::new(1, &log)));
        assert_eq!(outcome, EmbedOutcome::Finalized);
        assert!(session.live_view().is_none());

        // Returning to the earlier inputs renders again
        assert!(update(&mut session, &request(), &rows(1.0)).unwrap().is_some());
    }

    #[test]
    fn test_query_without_channels_skips_embed() {
        let mut session: RenderSession<FakeView> = RenderSession::new();
        let mut degenerate = request();
        degenerate.query.position = vec![String::new()];
        assert!(update(&mut session, &degenerate, &rows(1.0)).unwrap().is_none());
        assert_eq!(session.state(), SessionState::Empty);
    }

    // ==================== Listener Tests ====================

    #[test]
    fn test_listeners_attached_on_promotion() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();
        session.set_listeners(SignalListeners::from([("grid".to_string(), listener(&log, 1))]));

        let req = update(&mut session, &request(), &rows(1.0)).unwrap().unwrap();
        session.on_embedded(req.ticket, Ok(FakeView::new(1, &log)));
        assert_eq!(log.borrow().count("add:1:grid"), 1);

        session
            .live_view()
            .unwrap()
            .emit("grid", &serde_json::json!({"x": [0, 10]}));
        assert_eq!(log.borrow().signals, vec![(1, "grid".to_string())]);
    }

    #[test]
    fn test_listener_swap_on_live_instance() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();
        session.set_listeners(SignalListeners::from([("grid".to_string(), listener(&log, 1))]));
        let req = update(&mut session, &request(), &rows(1.0)).unwrap().unwrap();
        session.on_embedded(req.ticket, Ok(FakeView::new(1, &log)));

        session.set_listeners(SignalListeners::from([("hover".to_string(), listener(&log, 2))]));
        assert_eq!(log.borrow().count("remove:1:grid"), 1);
        assert_eq!(log.borrow().count("add:1:hover"), 1);

        let view = session.live_view().unwrap();
        assert_eq!(view.listeners.len(), 1);
        view.emit("grid", &Value::Null);
        view.emit("hover", &Value::Null);
        assert_eq!(log.borrow().signals, vec![(2, "hover".to_string())]);
    }

    #[test]
    fn test_listeners_move_with_live_instance() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();
        session.set_listeners(SignalListeners::from([("grid".to_string(), listener(&log, 1))]));

        let first = update(&mut session, &request(), &rows(1.0)).unwrap().unwrap();
        session.on_embedded(first.ticket, Ok(FakeView::new(1, &log)));
        let second = update(&mut session, &request(), &rows(2.0)).unwrap().unwrap();
        session.on_embedded(second.ticket, Ok(FakeView::new(2, &log)));

        let log = log.borrow();
        assert_eq!(log.count("remove:1:grid"), 1);
        assert_eq!(log.count("add:2:grid"), 1);
        let remove = log.events.iter().position(|e| e == "remove:1:grid").unwrap();
        let finalize = log.events.iter().position(|e| e == "finalize:1").unwrap();
        assert!(remove < finalize);
    }

    // ==================== Dispose Tests ====================

    #[test]
    fn test_dispose_finalizes_live_instance() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();
        let req = update(&mut session, &request(), &rows(1.0)).unwrap().unwrap();
        session.on_embedded(req.ticket, Ok(FakeView::new(1, &log)));

        session.dispose();
        assert_eq!(session.state(), SessionState::Disposed);
        assert!(session.live_view().is_none());
        assert_eq!(log.borrow().count("finalize:1"), 1);

        // Idempotent, and no further transitions
        session.dispose();
        assert_eq!(log.borrow().count("finalize:1"), 1);
        assert!(update(&mut session, &request(), &rows(2.0)).unwrap().is_none());
    }

    #[test]
    fn test_late_arrival_after_dispose_is_finalized() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = RenderSession::new();
        let req = update(&mut session, &request(), &rows(1.0)).unwrap().unwrap();

        session.dispose();
        let outcome = session.on_embedded(req.ticket, Ok(FakeView::new(1, &log)));
        assert_eq!(outcome, EmbedOutcome::Finalized);
        assert_eq!(session.state(), SessionState::Disposed);
        assert_eq!(log.borrow().count("finalize:1"), 1);
    }

    #[test]
    fn test_drop_finalizes_live_instance() {
        let log = Rc::new(RefCell::new(Log::default()));
        {
            let mut session = RenderSession::new();
            let req = update(&mut session, &request(), &rows(1.0)).unwrap().unwrap();
            session.on_embedded(req.ticket, Ok(FakeView::new(1, &log)));
        }
        assert_eq!(log.borrow().count("finalize:1"), 1);
    }
}
