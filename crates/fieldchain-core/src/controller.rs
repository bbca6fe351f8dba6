//! Chain controller
//!
//! Owns the fields of one form section and orchestrates:
//! - value changes, gated by the confirmation gate when they would discard
//!   downstream state
//! - resets of descendant fields and auxiliary form state
//! - option loading for children of changed fields, with per-field
//!   generation tagging so only the latest fetch is ever applied
//!
//! All mutations go through one lock that is never held across an await, so
//! an observer sees either the state before a change or the state after it
//! (including its resets), never a mix.

use crate::error::{ChainError, ConfirmationError};
use crate::gate::ConfirmationGate;
use crate::graph::DependencyGraph;
use crate::reset::{PendingChange, ResetSpec, ResetTarget};
use crate::store::{is_blank, FormStore};
use crate::types::{AutoSelect, ChainConfig, LoadState, NodeState, SelectableField};
use crate::validation::ValidationErrors;
use fieldchain_options::{FetchError, FieldId, OptionKey, OptionSource, ParentValues, SelectOption};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Declaration of one field in a chain
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field id
    pub id: FieldId,
    /// Form-store path the selection is written to
    pub path: Option<String>,
    /// Remote option source
    pub source: Option<Arc<dyn OptionSource>>,
    /// Fixed options, loaded from mount
    pub static_options: Option<Vec<SelectOption>>,
    /// What a change of this field clears
    pub reset: ResetSpec,
    /// Selection applied once options load
    pub auto_select: AutoSelect,
    /// Replace a value missing from freshly loaded options
    pub replace_missing: bool,
}

impl FieldSpec {
    /// Create field without options
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<FieldId>) -> Self {
        Self {
            id: id.into(),
            path: None,
            source: None,
            static_options: None,
            reset: ResetSpec::default(),
            auto_select: AutoSelect::Never,
            replace_missing: false,
        }
    }

    /// Bind to a form-store path
    #[inline]
    #[must_use]
    pub fn bind(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Load options from a source
    #[inline]
    #[must_use]
    pub fn source(mut self, source: Arc<dyn OptionSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Use a fixed option list
    #[inline]
    #[must_use]
    pub fn options(mut self, options: Vec<SelectOption>) -> Self {
        self.static_options = Some(options);
        self
    }

    /// Reset behaviour
    #[inline]
    #[must_use]
    pub fn reset(mut self, reset: ResetSpec) -> Self {
        self.reset = reset;
        self
    }

    /// Auto-selection policy
    #[inline]
    #[must_use]
    pub fn auto_select(mut self, auto_select: AutoSelect) -> Self {
        self.auto_select = auto_select;
        self
    }

    /// When loaded options no longer contain the value, swap it for the
    /// auto-selection pick (or clear it), resetting targets without a prompt
    #[inline]
    #[must_use]
    pub fn replace_missing(mut self, enabled: bool) -> Self {
        self.replace_missing = enabled;
        self
    }
}

/// Result of a value change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Requested value equals the current one
    Unchanged,
    /// Value set, resets applied
    Applied,
    /// User declined; nothing changed
    Rejected,
    /// Field changed by other means while the prompt was open; discarded
    Superseded,
}

enum ChangePlan {
    NoOp,
    Immediate { change: PendingChange, clear: bool },
    Confirm(PendingChange),
}

#[derive(Debug)]
struct FetchJob {
    field: FieldId,
    generation: u64,
    source: Arc<dyn OptionSource>,
    parents: ParentValues,
}

#[derive(Debug)]
struct FieldNode {
    spec: FieldSpec,
    field: SelectableField,
    generation: u64,
    in_flight: Option<AbortHandle>,
    awaiting: Option<PendingChange>,
}

/// Mutable state of a chain; only touched under the controller's lock
#[derive(Debug)]
struct ChainState {
    graph: DependencyGraph,
    nodes: IndexMap<FieldId, FieldNode>,
    store: Box<dyn FormStore>,
    auto_select: bool,
}

impl ChainState {
    fn node(&self, id: &FieldId) -> Result<&FieldNode, ChainError> {
        self.nodes
            .get(id)
            .ok_or_else(|| ChainError::UnknownField(id.clone()))
    }

    fn target_holds_value(&self, target: &ResetTarget) -> bool {
        match target {
            // A bound value the chain could not read still counts
            ResetTarget::Field(id) => self.nodes.get(id).is_some_and(|n| {
                n.field.value.is_some()
                    || n.spec.path.as_deref().is_some_and(|path| self.path_holds_value(path))
            }),
            ResetTarget::Path { path, .. } => self.path_holds_value(path),
        }
    }

    fn path_holds_value(&self, path: &str) -> bool {
        self.store.get(path).is_some_and(|value| !is_blank(&value))
    }

    fn plan_change(
        &self,
        id: &FieldId,
        proposed: Option<OptionKey>,
    ) -> Result<ChangePlan, ChainError> {
        let node = self.node(id)?;
        if node.field.value == proposed {
            return Ok(ChangePlan::NoOp);
        }
        if node.awaiting.is_some() {
            return Err(ConfirmationError::Concurrent.into());
        }

        let change = PendingChange {
            field_id: id.clone(),
            previous: node.field.value.clone(),
            proposed,
            reset_targets: node.spec.reset.targets.clone(),
            message: node.spec.reset.message.clone(),
        };

        // Nothing downstream can derive from an unset value
        if change.previous.is_none() {
            return Ok(ChangePlan::Immediate { change, clear: false });
        }

        let guarded = node
            .spec
            .reset
            .guard()
            .iter()
            .any(|target| self.target_holds_value(target));
        if guarded {
            Ok(ChangePlan::Confirm(change))
        } else {
            Ok(ChangePlan::Immediate { change, clear: true })
        }
    }

    fn write_value(&mut self, id: &FieldId, value: Option<OptionKey>) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        let mut changed = node.field.value != value;
        if let Some(path) = &node.spec.path {
            match &value {
                Some(key) if changed => self.store.set(path, key.to_value()),
                Some(_) => {}
                None => {
                    // Clear whatever is stored, parsed or not
                    if self.store.get(path).is_some_and(|stored| !is_blank(&stored)) {
                        self.store.remove(path);
                        changed = true;
                    }
                }
            }
        }
        node.field.value = value;
        changed
    }

    /// Apply a change and (optionally) its resets; returns the fields whose value moved
    fn apply(&mut self, change: &PendingChange, clear: bool) -> Vec<FieldId> {
        let mut changed = Vec::new();
        if self.write_value(&change.field_id, change.proposed.clone()) {
            changed.push(change.field_id.clone());
        }

        if clear {
            for target in &change.reset_targets {
                match target {
                    ResetTarget::Field(id) => {
                        if self.write_value(id, None) {
                            changed.push(id.clone());
                        }
                    }
                    ResetTarget::Path { path, empty } => self.store.set(path, empty.clone()),
                }
            }
        }

        tracing::info!(
            "Applied {} = {:?}, {} field(s) changed",
            change.field_id,
            change.proposed,
            changed.len()
        );
        changed
    }

    /// Children of changed fields, parents first
    fn refresh_targets(&self, changed: &[FieldId]) -> Vec<FieldId> {
        let mut targets: Vec<FieldId> = Vec::new();
        for id in changed {
            for child in self.graph.children(id) {
                if !targets.contains(&child) {
                    targets.push(child);
                }
            }
        }
        let rank = self.graph.topological_rank();
        targets.sort_by_key(|id| rank.get(id).copied().unwrap_or(usize::MAX));
        targets
    }

    fn parent_values(&self, id: &FieldId) -> Option<ParentValues> {
        let mut parents = ParentValues::new();
        for parent in self.graph.parents(id) {
            let value = self.nodes.get(&parent)?.field.value.clone()?;
            parents.insert(parent, value);
        }
        Some(parents)
    }

    /// Move a field to `Loading` or `Idle` depending on its parents
    fn begin_fetch(&mut self, id: &FieldId) -> Option<FetchJob> {
        let parents = self.parent_values(id);
        let node = self.nodes.get_mut(id)?;
        let source = node.spec.source.clone()?;

        node.generation += 1;
        if let Some(handle) = node.in_flight.take() {
            handle.abort();
        }
        node.field.options.clear();
        node.field.error = None;

        let next = if parents.is_some() { LoadState::Loading } else { LoadState::Idle };
        debug_assert!(node.field.load_state.can_transition_to(next));
        node.field.load_state = next;
        let parents = parents?;

        tracing::debug!("Fetching options for {} (generation {})", id, node.generation);
        Some(FetchJob {
            field: id.clone(),
            generation: node.generation,
            source,
            parents,
        })
    }

    /// Record a fetch result; returns whether it was current, plus any
    /// auto-selection or replacement to apply
    fn complete_fetch(
        &mut self,
        id: &FieldId,
        generation: u64,
        result: Result<Vec<SelectOption>, FetchError>,
    ) -> (bool, Option<PendingChange>) {
        let auto_select_enabled = self.auto_select;
        let Some(node) = self.nodes.get_mut(id) else {
            return (false, None);
        };
        if node.generation != generation {
            tracing::debug!(
                "Discarding stale options for {} (generation {}, current {})",
                id,
                generation,
                node.generation
            );
            return (false, None);
        }
        if !node.field.load_state.is_loading() {
            tracing::debug!("Discarding options for {}, no fetch in flight", id);
            return (false, None);
        }
        node.in_flight = None;

        let next = if result.is_ok() { LoadState::Loaded } else { LoadState::Error };
        debug_assert!(node.field.load_state.can_transition_to(next));
        node.field.load_state = next;
        match result {
            Ok(options) => {
                node.field.options = options;
                node.field.error = None;
            }
            Err(e) => {
                tracing::warn!("Loading options for {} failed: {}", id, e);
                node.field.options.clear();
                node.field.error = Some(e);
                return (true, None);
            }
        }

        if !auto_select_enabled {
            return (true, None);
        }
        (true, auto_selection(node))
    }
}

/// Selection to apply after a field's options load
///
/// An unset field takes its policy's pick. A field opted into
/// `replace_missing` whose value is absent from a non-empty option list is
/// moved to the pick (or cleared), together with its reset targets; the
/// returned change then carries `previous`.
fn auto_selection(node: &FieldNode) -> Option<PendingChange> {
    if node.awaiting.is_some() {
        return None;
    }
    let options = &node.field.options;
    match &node.field.value {
        None => {
            let picked = node.spec.auto_select.pick(options)?;
            Some(PendingChange {
                field_id: node.field.id.clone(),
                previous: None,
                proposed: Some(picked.key.clone()),
                reset_targets: Vec::new(),
                message: String::new(),
            })
        }
        Some(current)
            if node.spec.replace_missing
                && !options.is_empty()
                && !options.iter().any(|o| &o.key == current) =>
        {
            Some(PendingChange {
                field_id: node.field.id.clone(),
                previous: Some(current.clone()),
                proposed: node.spec.auto_select.pick(options).map(|o| o.key.clone()),
                reset_targets: node.spec.reset.targets.clone(),
                message: node.spec.reset.message.clone(),
            })
        }
        Some(_) => None,
    }
}

/// Builder for a [`ChainController`]
#[derive(Debug, Default)]
pub struct ChainBuilder {
    fields: Vec<FieldSpec>,
    edges: Vec<(FieldId, FieldId)>,
    config: ChainConfig,
}

impl ChainBuilder {
    /// Create empty builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field
    #[inline]
    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Declare that `child`'s options depend on `parent`'s selection
    #[inline]
    #[must_use]
    pub fn depends_on(mut self, child: impl Into<FieldId>, parent: impl Into<FieldId>) -> Self {
        self.edges.push((parent.into(), child.into()));
        self
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the chain and seed field values from `store`
    ///
    /// Nothing is fetched until [`ChainController::mount`].
    ///
    /// # Errors
    /// - `ChainError::DuplicateField` if a field id is declared twice
    /// - `ChainError::UnknownField` if an edge or reset target names an undeclared field
    /// - `ChainError::SelfLoop` / `ChainError::CycleDetected` for invalid edges
    pub fn build(
        self,
        store: impl FormStore + 'static,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Result<ChainController, ChainError> {
        let mut graph = DependencyGraph::new();
        for spec in &self.fields {
            graph.add_field(spec.id.clone())?;
        }
        for (parent, child) in &self.edges {
            graph.add_edge(parent, child)?;
        }
        for spec in &self.fields {
            for target in &spec.reset.targets {
                if let ResetTarget::Field(id) = target {
                    if !graph.contains(id) {
                        return Err(ChainError::UnknownField(id.clone()));
                    }
                }
            }
        }

        let mut nodes = IndexMap::new();
        for spec in self.fields {
            let mut field = SelectableField::new(spec.id.clone());
            field.value = spec
                .path
                .as_deref()
                .and_then(|path| store.get(path))
                .and_then(|value| OptionKey::from_value(&value));
            if let Some(options) = &spec.static_options {
                field.options = options.clone();
                field.load_state = LoadState::Loaded;
            }
            nodes.insert(
                spec.id.clone(),
                FieldNode {
                    spec,
                    field,
                    generation: 0,
                    in_flight: None,
                    awaiting: None,
                },
            );
        }

        let state = ChainState {
            graph,
            nodes,
            store: Box::new(store),
            auto_select: self.config.auto_select,
        };
        let (revision, _) = watch::channel(0);

        Ok(ChainController {
            inner: Arc::new(ControllerInner {
                state: Mutex::new(state),
                gate,
                config: self.config,
                revision,
            }),
        })
    }
}

#[derive(Debug)]
struct ControllerInner {
    state: Mutex<ChainState>,
    gate: Arc<dyn ConfirmationGate>,
    config: ChainConfig,
    revision: watch::Sender<u64>,
}

/// Orchestrates the fields of a dependency chain
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct ChainController {
    inner: Arc<ControllerInner>,
}

impl ChainController {
    /// Start loading options
    ///
    /// Applies auto-selection to fields with fixed options, then issues a
    /// fetch for every sourced field whose parents are complete. Fetches are
    /// spawned onto the current Tokio runtime.
    pub fn mount(&self) {
        let mut state = self.inner.state.lock();
        let order = state.graph.topological_order();

        if self.inner.config.auto_select {
            for id in &order {
                let change = state
                    .nodes
                    .get(id)
                    .filter(|n| n.spec.static_options.is_some())
                    .and_then(auto_selection);
                if let Some(change) = change {
                    state.apply(&change, change.previous.is_some());
                }
            }
        }

        self.schedule_fetches(&mut state, order);
        drop(state);
        self.bump();
    }

    /// Abort in-flight fetches; late results are discarded
    pub fn unmount(&self) {
        let mut state = self.inner.state.lock();
        for node in state.nodes.values_mut() {
            node.generation += 1;
            if let Some(handle) = node.in_flight.take() {
                handle.abort();
            }
            if node.field.load_state.is_loading() {
                node.field.load_state = LoadState::Idle;
            }
        }
        drop(state);
        self.bump();
    }

    /// Request a value change
    ///
    /// Same-value requests are no-ops. Changes from an unset value apply
    /// immediately. Otherwise, if any guarded reset target holds a value, the
    /// change waits on the confirmation gate; on confirmation the value is
    /// set and every reset target cleared in one step.
    ///
    /// # Errors
    /// - `ChainError::UnknownField` if `id` is not part of the chain
    /// - `ChainError::Confirmation` if the field (or the gate) already has a
    ///   confirmation open, or the prompt was dismissed
    pub async fn set_value(
        &self,
        id: &FieldId,
        value: Option<OptionKey>,
    ) -> Result<ChangeOutcome, ChainError> {
        let pending = {
            let mut state = self.inner.state.lock();
            match state.plan_change(id, value)? {
                ChangePlan::NoOp => return Ok(ChangeOutcome::Unchanged),
                ChangePlan::Immediate { change, clear } => {
                    let changed = state.apply(&change, clear);
                    let refresh = state.refresh_targets(&changed);
                    self.schedule_fetches(&mut state, refresh);
                    drop(state);
                    self.bump();
                    return Ok(ChangeOutcome::Applied);
                }
                ChangePlan::Confirm(change) => {
                    if let Some(node) = state.nodes.get_mut(id) {
                        node.awaiting = Some(change.clone());
                    }
                    change
                }
            }
        };
        self.bump();

        tracing::debug!("Awaiting confirmation for {}", id);
        let answer = self.inner.gate.confirm(&pending.message).await;

        let mut state = self.inner.state.lock();
        if let Some(node) = state.nodes.get_mut(id) {
            node.awaiting = None;
        }

        let outcome = match answer {
            Err(e) => {
                drop(state);
                self.bump();
                return Err(e.into());
            }
            Ok(false) => {
                tracing::info!("Change of {} declined", id);
                ChangeOutcome::Rejected
            }
            Ok(true) => {
                let current = state.node(id).map(|n| n.field.value.clone())?;
                if current == pending.previous {
                    let changed = state.apply(&pending, true);
                    let refresh = state.refresh_targets(&changed);
                    self.schedule_fetches(&mut state, refresh);
                    ChangeOutcome::Applied
                } else {
                    tracing::info!("Change of {} superseded while awaiting confirmation", id);
                    ChangeOutcome::Superseded
                }
            }
        };
        drop(state);
        self.bump();
        Ok(outcome)
    }

    /// Record the result of a fetch tagged with `generation`
    ///
    /// Results for anything but the field's current generation are discarded.
    /// Returns whether the result was applied.
    pub fn apply_fetch_result(
        &self,
        id: &FieldId,
        generation: u64,
        result: Result<Vec<SelectOption>, FetchError>,
    ) -> bool {
        let mut state = self.inner.state.lock();
        let (applied, auto) = state.complete_fetch(id, generation, result);
        if let Some(change) = auto {
            match &change.previous {
                Some(missing) => tracing::info!("Replacing {} for {}, no longer offered", missing, id),
                None => tracing::debug!("Auto-selecting {:?} for {}", change.proposed, id),
            }
            let changed = state.apply(&change, change.previous.is_some());
            let refresh = state.refresh_targets(&changed);
            self.schedule_fetches(&mut state, refresh);
        }
        drop(state);
        if applied {
            self.bump();
        }
        applied
    }

    /// Re-issue the fetch for a field, e.g. after an error
    ///
    /// # Errors
    /// - `ChainError::UnknownField` if `id` is not part of the chain
    pub fn reload(&self, id: &FieldId) -> Result<(), ChainError> {
        let mut state = self.inner.state.lock();
        state.node(id)?;
        self.schedule_fetches(&mut state, vec![id.clone()]);
        drop(state);
        self.bump();
        Ok(())
    }

    fn schedule_fetches(&self, state: &mut ChainState, ids: Vec<FieldId>) {
        let timeout = self.inner.config.fetch_timeout();
        let after_ms = self.inner.config.fetch_timeout_ms;

        for id in ids {
            let Some(job) = state.begin_fetch(&id) else {
                continue;
            };
            let controller = self.clone();
            let FetchJob {
                field,
                generation,
                source,
                parents,
            } = job;

            let task = tokio::spawn(async move {
                let result = match tokio::time::timeout(timeout, source.fetch_options(&parents)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout { after_ms }),
                };
                controller.apply_fetch_result(&field, generation, result);
            });

            if let Some(node) = state.nodes.get_mut(&id) {
                node.in_flight = Some(task.abort_handle());
            }
        }
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
    }

    /// Snapshot of a field
    ///
    /// # Errors
    /// - `ChainError::UnknownField` if `id` is not part of the chain
    pub fn field(&self, id: &FieldId) -> Result<SelectableField, ChainError> {
        self.inner.state.lock().node(id).map(|n| n.field.clone())
    }

    /// Snapshots of all fields, in declaration order
    #[must_use]
    pub fn fields(&self) -> Vec<SelectableField> {
        self.inner
            .state
            .lock()
            .nodes
            .values()
            .map(|n| n.field.clone())
            .collect()
    }

    /// Current selection of a field
    ///
    /// # Errors
    /// - `ChainError::UnknownField` if `id` is not part of the chain
    pub fn value(&self, id: &FieldId) -> Result<Option<OptionKey>, ChainError> {
        self.inner.state.lock().node(id).map(|n| n.field.value.clone())
    }

    /// Current options of a field
    ///
    /// # Errors
    /// - `ChainError::UnknownField` if `id` is not part of the chain
    pub fn options(&self, id: &FieldId) -> Result<Vec<SelectOption>, ChainError> {
        self.inner
            .state
            .lock()
            .node(id)
            .map(|n| n.field.options.clone())
    }

    /// Load state of a field's options
    ///
    /// # Errors
    /// - `ChainError::UnknownField` if `id` is not part of the chain
    pub fn load_state(&self, id: &FieldId) -> Result<LoadState, ChainError> {
        self.inner.state.lock().node(id).map(|n| n.field.load_state)
    }

    /// Current fetch generation of a field
    ///
    /// # Errors
    /// - `ChainError::UnknownField` if `id` is not part of the chain
    pub fn generation(&self, id: &FieldId) -> Result<u64, ChainError> {
        self.inner.state.lock().node(id).map(|n| n.generation)
    }

    /// Interaction state of a field
    ///
    /// # Errors
    /// - `ChainError::UnknownField` if `id` is not part of the chain
    pub fn node_state(&self, id: &FieldId) -> Result<NodeState, ChainError> {
        self.inner.state.lock().node(id).map(|n| {
            if n.awaiting.is_some() {
                NodeState::AwaitingConfirmation
            } else {
                NodeState::Ready
            }
        })
    }

    /// Change suspended on the confirmation gate, if any
    #[must_use]
    pub fn pending_change(&self, id: &FieldId) -> Option<PendingChange> {
        self.inner
            .state
            .lock()
            .nodes
            .get(id)
            .and_then(|n| n.awaiting.clone())
    }

    /// Read the enclosing form's value at `path`
    #[must_use]
    pub fn store_value(&self, path: &str) -> Option<Value> {
        self.inner.state.lock().store.get(path)
    }

    /// Validation messages for a field's bound path
    ///
    /// # Errors
    /// - `ChainError::UnknownField` if `id` is not part of the chain
    pub fn field_errors(
        &self,
        id: &FieldId,
        errors: &ValidationErrors,
    ) -> Result<Vec<String>, ChainError> {
        let state = self.inner.state.lock();
        let node = state.node(id)?;
        Ok(node
            .spec
            .path
            .as_deref()
            .map(|path| errors.for_path(path).into_iter().map(str::to_string).collect())
            .unwrap_or_default())
    }

    /// Direct children of a field
    #[must_use]
    pub fn children(&self, id: &FieldId) -> Vec<FieldId> {
        self.inner.state.lock().graph.children(id)
    }

    /// Check if any field is loading
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner
            .state
            .lock()
            .nodes
            .values()
            .any(|n| n.field.load_state.is_loading())
    }

    /// Watch the state revision, bumped after every mutation
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Wait until no field is loading
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        loop {
            if !self.is_loading() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
