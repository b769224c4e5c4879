//! The hanging-protocol orchestrator.

use super::config::ServiceConfig;
use super::provider::DisplaySetProvider;
use super::types::{
    ActiveProtocol, ImageLoadRequest, ImageLoadStrategy, MatchDetailsView, RunRequest,
    SetProtocolOptions,
};
use crate::assignment::{
    plan_viewport_update, DisplaySetMatchMap, StageMatch, ViewportMatchDetails, ViewportMatchMap,
    ViewportResolver, ViewportUpdate,
};
use crate::error::{HangingError, Result};
use crate::events::{
    EventBus, EventKind, HangingEvent, NewLayout, ProtocolChanged, StageActivation, Subscription,
};
use crate::matching::MatchingEngine;
use crate::model::{AttributeValue, DisplaySet, Options, Protocol, Study, Viewport};
use crate::registry::{GeneratorContext, ProtocolRegistry, ProtocolSource, RegistrationOutcome};
use crate::rules::{AttributeTable, MatchContext, MatchTarget};
use crate::stage::{classify, find_stage, needs_matching, next_available, Direction};
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-session state replaced wholesale by every successful operation.
#[derive(Debug, Clone, Default)]
struct Session {
    protocol: Option<Arc<Protocol>>,
    stage_index: usize,
    viewport_match_details: ViewportMatchMap,
    display_set_match_details: DisplaySetMatchMap,
    image_load_strategy: Option<String>,
    custom_image_load_performed: bool,
}

/// The study data a session is computed against.
struct StudyInputs {
    studies: Vec<Study>,
    display_sets: Vec<DisplaySet>,
    active_study: Option<usize>,
}

/// A fully computed session plus the events announcing it.
struct Planned {
    session: Session,
    events: Vec<HangingEvent>,
}

/// Applies hanging protocols to a set of studies.
///
/// The service owns the protocol registry and the session state: the
/// active protocol's working copy, the active stage and the match-detail
/// maps. Every mutating operation computes the complete new session first
/// and commits it only on success, so a failing call leaves the previous
/// protocol, stage and maps in place. Events are published after the commit.
///
/// # Examples
///
/// ```
/// use u_hanging::model::{
///     Constraint, DisplaySet, DisplaySetOptionsDefinition, DisplaySetSelector, MatchingRule,
///     ProtocolDefinition, StageDefinition, Study, ViewportDefinition,
/// };
/// use u_hanging::service::{HangingProtocolService, InMemoryDisplaySets, RunRequest};
///
/// let display_sets = vec![DisplaySet::new("ds-1", "1.2.3", "1.2.3.1").with_modality("CT")];
/// let mut service = HangingProtocolService::new(InMemoryDisplaySets::new(display_sets));
///
/// let ct = DisplaySetSelector::new().with_series_rule(
///     MatchingRule::new("ct", "Modality", Constraint::Equals("CT".into())).required(),
/// );
/// service
///     .add_protocol(
///         "default",
///         ProtocolDefinition::new("default")
///             .with_selector("main", ct)
///             .with_stage(
///                 StageDefinition::new("1x1").with_viewport(
///                     ViewportDefinition::new()
///                         .with_display_set(DisplaySetOptionsDefinition::new("main")),
///                 ),
///             ),
///     )
///     .unwrap();
///
/// service.run(RunRequest::new(vec![Study::new("1.2.3")]), None).unwrap();
/// let details = service.get_match_details();
/// assert_eq!(details.viewport_match_details[&0].primary_uid(), Some("ds-1"));
/// ```
pub struct HangingProtocolService<P> {
    config: ServiceConfig,
    provider: P,
    registry: ProtocolRegistry,
    attributes: AttributeTable,
    image_load_strategies: HashMap<String, ImageLoadStrategy>,
    studies: Vec<Study>,
    display_sets: Vec<DisplaySet>,
    active_study: Option<usize>,
    session: Session,
    events: EventBus<HangingEvent, HangingProtocolService<P>>,
}

impl<P: DisplaySetProvider> HangingProtocolService<P> {
    /// Creates a service with the default configuration.
    pub fn new(provider: P) -> Self {
        Self::build(provider, ServiceConfig::default())
    }

    /// Creates a service with a validated configuration.
    pub fn with_config(provider: P, config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(provider, config))
    }

    fn build(provider: P, config: ServiceConfig) -> Self {
        Self {
            registry: ProtocolRegistry::new(config.default_viewport_options.clone()),
            config,
            provider,
            attributes: AttributeTable::with_builtins(),
            image_load_strategies: HashMap::new(),
            studies: Vec::new(),
            display_sets: Vec::new(),
            active_study: None,
            session: Session::default(),
            events: EventBus::new(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Studies of the current session.
    pub fn studies(&self) -> &[Study] {
        &self.studies
    }

    /// Display sets of the current session.
    pub fn display_sets(&self) -> &[DisplaySet] {
        &self.display_sets
    }

    /// The study protocol ranking runs against.
    pub fn active_study(&self) -> Option<&Study> {
        self.active_study.and_then(|i| self.studies.get(i))
    }

    // ---- registry ----

    /// Registers a protocol definition or generator under `id`.
    ///
    /// # Errors
    ///
    /// `NormalizationFailure` for a malformed static definition; nothing is
    /// stored in that case.
    pub fn add_protocol(
        &mut self,
        id: impl Into<String>,
        source: impl Into<ProtocolSource>,
    ) -> Result<RegistrationOutcome> {
        self.registry.add(id, source)
    }

    /// Restricts `run`'s candidate protocols to `ids`, in that order.
    /// `None` or an empty list re-enables every registered protocol.
    pub fn set_active_protocols(&mut self, ids: Option<Vec<String>>) {
        self.registry.set_active_protocols(ids);
    }

    pub fn add_active_protocol(&mut self, id: impl Into<String>) {
        self.registry.add_active_protocol(id);
    }

    /// Every enumerated protocol, resolved against the current session.
    pub fn get_protocols(&self) -> Vec<Arc<Protocol>> {
        self.registry.protocols(&self.generator_context())
    }

    /// The active working copy when `id` is active, else the registry's
    /// protocol. Generator failures are logged and reported as `None`.
    pub fn get_protocol_by_id(&self, id: &str) -> Option<Arc<Protocol>> {
        if let Some(active) = self.session.protocol.as_ref().filter(|p| p.id == id) {
            return Some(Arc::clone(active));
        }
        self.registry.resolve(id, &self.generator_context())
    }

    /// The protocol registered under the configured default id.
    pub fn get_default_protocol(&self) -> Option<Arc<Protocol>> {
        self.get_protocol_by_id(&self.config.default_protocol_id)
    }

    pub fn get_active_protocol(&self) -> Option<ActiveProtocol> {
        self.session.protocol.as_ref().map(|protocol| ActiveProtocol {
            protocol: Arc::clone(protocol),
            stage_index: self.session.stage_index,
        })
    }

    pub fn get_match_details(&self) -> MatchDetailsView<'_> {
        MatchDetailsView {
            viewport_match_details: &self.session.viewport_match_details,
            display_set_match_details: &self.session.display_set_match_details,
        }
    }

    /// Locates a stage of `protocol_id` by id, else by explicit index.
    ///
    /// With neither selector given the first stage is returned. An unknown
    /// stage id yields `None`.
    ///
    /// # Errors
    ///
    /// `ProtocolNotFound` when `protocol_id` cannot be resolved.
    pub fn get_stage_index(
        &self,
        protocol_id: &str,
        stage_id: Option<&str>,
        stage_index: Option<usize>,
    ) -> Result<Option<usize>> {
        let protocol = self
            .get_protocol_by_id(protocol_id)
            .ok_or_else(|| HangingError::ProtocolNotFound {
                id: protocol_id.to_string(),
            })?;
        Ok(match (stage_id, stage_index) {
            (Some(id), _) => protocol.stage_index_by_id(id),
            (None, Some(index)) => Some(index),
            (None, None) => Some(0),
        })
    }

    /// Adds or replaces a synthetic attribute usable by matching rules.
    pub fn add_custom_attribute<F>(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        callback: F,
        options: Options,
    ) where
        F: Fn(MatchTarget<'_>, &MatchContext<'_>) -> Option<AttributeValue> + Send + Sync + 'static,
    {
        self.attributes.insert(id, name, Arc::new(callback), options);
    }

    // ---- image loading ----

    /// Registers a named image-load strategy. Protocols opt in by name.
    pub fn register_image_load_strategy<F>(&mut self, name: impl Into<String>, strategy: F)
    where
        F: Fn(&ImageLoadRequest<'_>) -> Option<AttributeValue> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            warn!("ignored image load strategy without a name");
            return;
        }
        self.image_load_strategies.insert(name, Arc::new(strategy));
    }

    /// Whether the active protocol opted into a registered strategy.
    pub fn has_custom_image_load_strategy(&self) -> bool {
        self.active_image_load_strategy().is_some()
    }

    /// Whether a strategy rearranged the data since the last assignment pass.
    pub fn custom_image_load_performed(&self) -> bool {
        self.session.custom_image_load_performed
    }

    fn active_image_load_strategy(&self) -> Option<&ImageLoadStrategy> {
        self.session
            .image_load_strategy
            .as_ref()
            .and_then(|name| self.image_load_strategies.get(name))
    }

    /// Runs the active image-load strategy over `data`.
    ///
    /// Returns `true` when the strategy produced a payload, which is then
    /// published as `CustomImageLoadPerformed`. `false` means the caller
    /// should load images the default way.
    pub fn run_image_load_strategy(&mut self, data: AttributeValue) -> bool {
        let Some(strategy) = self.active_image_load_strategy().cloned() else {
            return false;
        };
        let request = ImageLoadRequest {
            data: &data,
            display_set_match_details: &self.session.display_set_match_details,
            viewport_match_details: &self.session.viewport_match_details,
        };
        let Some(payload) = strategy(&request) else {
            debug!("image load strategy fell back to default loading");
            return false;
        };

        self.session.custom_image_load_performed = true;
        let event = HangingEvent::CustomImageLoadPerformed(payload);
        let this: &Self = self;
        this.events.publish(&event, this);
        true
    }

    // ---- events ----

    /// Subscribes to one kind of event. The listener also receives the
    /// service, already updated, so it can query the new state.
    pub fn subscribe<F>(&mut self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&HangingEvent, &Self) + 'static,
    {
        self.events.subscribe(kind, listener)
    }

    pub fn subscribe_all<F>(&mut self, listener: F) -> Subscription
    where
        F: Fn(&HangingEvent, &Self) + 'static,
    {
        self.events.subscribe_all(listener)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.events.unsubscribe(subscription)
    }

    // ---- applying protocols ----

    /// Starts a session over `request` and applies a protocol.
    ///
    /// With `protocol_id` that protocol is applied; otherwise every
    /// enumerated protocol is ranked against the active study and the best
    /// one wins, falling back to the configured default id. Stage
    /// activation is always recomputed, since the studies changed.
    ///
    /// # Errors
    ///
    /// Whatever [`set_protocol`](Self::set_protocol) reports. On error the
    /// previous studies and display sets are restored along with the session.
    pub fn run(&mut self, request: RunRequest, protocol_id: Option<&str>) -> Result<()> {
        let display_sets = match request.display_sets {
            Some(display_sets) => display_sets,
            None => self.provider.active_display_sets(),
        };
        let studies = request.studies;
        let active_study = request
            .active_study_instance_uid
            .as_deref()
            .and_then(|uid| studies.iter().position(|s| s.study_instance_uid == uid))
            .or_else(|| (!studies.is_empty()).then_some(0));
        let previous = self.swap_inputs(StudyInputs {
            studies,
            display_sets,
            active_study,
        });

        let protocol_id = match protocol_id {
            Some(id) => id.to_string(),
            None => self.best_protocol_id(),
        };
        let result = self.apply(&protocol_id, SetProtocolOptions::default(), true);
        if result.is_err() {
            self.swap_inputs(previous);
        }
        result
    }

    /// Installs `inputs` and returns the ones they replace.
    fn swap_inputs(&mut self, inputs: StudyInputs) -> StudyInputs {
        StudyInputs {
            studies: mem::replace(&mut self.studies, inputs.studies),
            display_sets: mem::replace(&mut self.display_sets, inputs.display_sets),
            active_study: mem::replace(&mut self.active_study, inputs.active_study),
        }
    }

    fn best_protocol_id(&self) -> String {
        let best = self.active_study().and_then(|study| {
            let protocols = self.get_protocols();
            self.engine()
                .rank_protocols(protocols.iter().map(|p| &**p), study)
                .into_iter()
                .next()
        });
        match best {
            Some(found) => {
                info!(
                    protocol_id = %found.protocol_id,
                    score = found.score,
                    "protocol matched active study"
                );
                found.protocol_id
            }
            None => {
                debug!(
                    protocol_id = %self.config.default_protocol_id,
                    "no protocol matched; using default"
                );
                self.config.default_protocol_id.clone()
            }
        }
    }

    /// Applies `protocol_id` at the stage `options` select.
    ///
    /// Switching protocols takes a fresh working copy and recomputes stage
    /// activation; re-applying the active protocol keeps its working copy.
    ///
    /// # Errors
    ///
    /// `ProtocolNotFound` and `ReuseTargetNotFound` before anything
    /// changes; `StageOutOfRange` when the selected stage does not exist,
    /// after which the previous state is still in place.
    pub fn set_protocol(&mut self, protocol_id: &str, options: SetProtocolOptions) -> Result<()> {
        self.apply(protocol_id, options, false)
    }

    fn apply(
        &mut self,
        protocol_id: &str,
        options: SetProtocolOptions,
        reactivate: bool,
    ) -> Result<()> {
        let Some(protocol) = self.get_protocol_by_id(protocol_id) else {
            warn!(protocol_id, "protocol not found");
            return Err(HangingError::ProtocolNotFound {
                id: protocol_id.to_string(),
            });
        };
        self.validate_reuse_targets(&options)?;

        match self.plan_protocol(protocol, &options, reactivate) {
            Ok(planned) => {
                info!(
                    protocol_id,
                    stage = planned.session.stage_index,
                    viewports = planned.session.viewport_match_details.len(),
                    "applied hanging protocol"
                );
                self.commit(planned);
                Ok(())
            }
            Err(err) => {
                warn!(protocol_id, error = %err, "failed to apply protocol; previous state kept");
                Err(err)
            }
        }
    }

    /// Moves to the next stage that is not disabled.
    ///
    /// # Errors
    ///
    /// `NoActiveProtocol`, `NoStageAvailable` when every later stage is
    /// disabled, `ReuseTargetNotFound`. State is unchanged on error.
    pub fn next_protocol_stage(&mut self, options: SetProtocolOptions) -> Result<()> {
        self.step_stage(Direction::Next, options)
    }

    /// Moves to the previous stage that is not disabled.
    ///
    /// # Errors
    ///
    /// As [`next_protocol_stage`](Self::next_protocol_stage).
    pub fn previous_protocol_stage(&mut self, options: SetProtocolOptions) -> Result<()> {
        self.step_stage(Direction::Previous, options)
    }

    fn step_stage(&mut self, direction: Direction, options: SetProtocolOptions) -> Result<()> {
        let protocol = self
            .session
            .protocol
            .clone()
            .ok_or(HangingError::NoActiveProtocol)?;
        let from = self.session.stage_index;
        let Some(target) = next_available(&protocol.stages, from, direction) else {
            info!(
                protocol_id = %protocol.id,
                from,
                direction = direction.as_str(),
                "no stage available"
            );
            return Err(HangingError::NoStageAvailable {
                protocol_id: protocol.id.clone(),
                from,
                direction: direction.as_str(),
            });
        };
        self.validate_reuse_targets(&options)?;

        let planned = {
            let engine = self.engine();
            let (stage_match, layout) = self.assign_stage(&engine, &protocol, target, &options)?;
            let strategy = self.session.image_load_strategy.clone();
            Self::finish(protocol, target, stage_match, layout, strategy, Vec::new())
        };
        info!(from, to = target, "changed protocol stage");
        self.commit(planned);
        Ok(())
    }

    fn validate_reuse_targets(&self, options: &SetProtocolOptions) -> Result<()> {
        if !self.config.require_reuse_targets {
            return Ok(());
        }
        for (reuse_id, uid) in &options.reuse_id_map {
            if self.provider.display_set_by_uid(uid).is_none() {
                warn!(reuse_id = %reuse_id, display_set = %uid, "reuse target not loaded");
                return Err(HangingError::ReuseTargetNotFound {
                    reuse_id: reuse_id.clone(),
                    display_set_instance_uid: uid.clone(),
                });
            }
        }
        Ok(())
    }

    fn plan_protocol(
        &self,
        protocol: Arc<Protocol>,
        options: &SetProtocolOptions,
        reactivate: bool,
    ) -> Result<Planned> {
        let engine = self.engine();
        let mut events = Vec::new();

        let current = self
            .session
            .protocol
            .as_ref()
            .filter(|active| !reactivate && active.id == protocol.id);
        let (protocol, strategy) = match current {
            Some(active) => (Arc::clone(active), self.session.image_load_strategy.clone()),
            None => {
                let mut working = protocol.working_copy();
                self.activate_stages(&engine, &mut working, options);
                events.push(HangingEvent::StageActivation(StageActivation {
                    protocol_id: working.id.clone(),
                    stages: working.stages.clone(),
                }));
                let strategy = working
                    .image_load_strategy
                    .clone()
                    .filter(|name| self.image_load_strategies.contains_key(name));
                (Arc::new(working), strategy)
            }
        };

        let stage_index = find_stage(
            &protocol.stages,
            options.stage_id.as_deref(),
            options.stage_index,
        );
        let (stage_match, layout) = self.assign_stage(&engine, &protocol, stage_index, options)?;
        Ok(Self::finish(protocol, stage_index, stage_match, layout, strategy, events))
    }

    /// Classifies every stage of `protocol` with a scratch matching pass.
    fn activate_stages(
        &self,
        engine: &MatchingEngine<'_>,
        protocol: &mut Protocol,
        options: &SetProtocolOptions,
    ) {
        for index in 0..protocol.stages.len() {
            let enable = {
                let stage = &protocol.stages[index];
                let needed = needs_matching(stage.required_viewports, stage.preferred_viewports);
                let matched = if needed {
                    let mut resolver = ViewportResolver::new(
                        engine,
                        &protocol.display_set_selectors,
                        &options.reuse_id_map,
                        options.in_display_slice(),
                    );
                    resolver.match_all(&stage.viewports).matched_viewports
                } else {
                    0
                };
                classify(matched, stage.required_viewports, stage.preferred_viewports)
            };
            debug!(protocol_id = %protocol.id, stage = index, ?enable, "stage activation");
            protocol.stages[index].enable = Some(enable);
        }
    }

    fn assign_stage(
        &self,
        engine: &MatchingEngine<'_>,
        protocol: &Protocol,
        stage_index: usize,
        options: &SetProtocolOptions,
    ) -> Result<(StageMatch, Option<NewLayout>)> {
        let stage = protocol
            .stage(stage_index)
            .ok_or_else(|| HangingError::StageOutOfRange {
                protocol_id: protocol.id.clone(),
                stage_index,
                stage_count: protocol.stages.len(),
            })?;
        if stage.viewports.is_empty() {
            debug!(protocol_id = %protocol.id, stage = stage_index, "stage has no viewports");
            return Ok((StageMatch::default(), None));
        }

        let structure = &stage.viewport_structure;
        let layout = NewLayout {
            layout_type: structure.layout_type.clone(),
            num_rows: structure.properties.rows,
            num_cols: structure.properties.columns,
            layout_options: structure.properties.layout_options.clone(),
        };
        let mut resolver = ViewportResolver::new(
            engine,
            &protocol.display_set_selectors,
            &options.reuse_id_map,
            options.in_display_slice(),
        );
        Ok((resolver.match_all(&stage.viewports), Some(layout)))
    }

    fn finish(
        protocol: Arc<Protocol>,
        stage_index: usize,
        stage_match: StageMatch,
        layout: Option<NewLayout>,
        image_load_strategy: Option<String>,
        mut events: Vec<HangingEvent>,
    ) -> Planned {
        if let Some(layout) = layout {
            events.push(HangingEvent::NewLayout(layout));
        }
        if let Some(stage) = protocol.stage(stage_index) {
            events.push(HangingEvent::ProtocolChanged(ProtocolChanged {
                protocol: Arc::clone(&protocol),
                stage_index,
                stage: stage.clone(),
                viewport_match_details: stage_match.viewport_match_details.clone(),
                display_set_match_details: stage_match.display_set_match_details.clone(),
            }));
        }
        Planned {
            session: Session {
                protocol: Some(protocol),
                stage_index,
                viewport_match_details: stage_match.viewport_match_details,
                display_set_match_details: stage_match.display_set_match_details,
                image_load_strategy,
                custom_image_load_performed: false,
            },
            events,
        }
    }

    fn commit(&mut self, planned: Planned) {
        self.session = planned.session;
        let this: &Self = self;
        for event in &planned.events {
            this.events.publish(event, this);
        }
    }

    // ---- viewport queries ----

    /// Resolves the default viewport for a grid position the stage does not
    /// declare.
    ///
    /// Uses the stage's `default_viewport`, else the protocol's, narrowed to
    /// `display_sets_by_position[position_id]` when present. Session state
    /// is not modified.
    ///
    /// # Errors
    ///
    /// `ProtocolMismatch` when `protocol_id` is not the active protocol;
    /// `StageOutOfRange` for an unknown stage.
    pub fn get_missing_viewport(
        &self,
        protocol_id: &str,
        stage_index: usize,
        position_id: &str,
        options: &SetProtocolOptions,
    ) -> Result<Option<ViewportMatchDetails>> {
        let protocol = self
            .session
            .protocol
            .as_ref()
            .filter(|p| p.id == protocol_id)
            .ok_or_else(|| HangingError::ProtocolMismatch {
                active: self
                    .session
                    .protocol
                    .as_ref()
                    .map(|p| p.id.clone())
                    .unwrap_or_default(),
                requested: protocol_id.to_string(),
            })?;
        let stage = protocol
            .stage(stage_index)
            .ok_or_else(|| HangingError::StageOutOfRange {
                protocol_id: protocol.id.clone(),
                stage_index,
                stage_count: protocol.stages.len(),
            })?;
        let Some(template) = stage
            .default_viewport
            .as_ref()
            .or(protocol.default_viewport.as_ref())
        else {
            return Ok(None);
        };
        let viewport = narrow_to_position(template, position_id);

        let engine = self.engine();
        let mut matches = self.session.display_set_match_details.clone();
        let mut resolver = ViewportResolver::new(
            &engine,
            &protocol.display_set_selectors,
            &options.reuse_id_map,
            options.in_display_slice(),
        );
        Ok(Some(resolver.match_viewport(&viewport, &mut matches)))
    }

    /// Resolves default viewports for several positions in order.
    ///
    /// Each resolved display set is added to the `in_display` list the next
    /// position sees, so `display_set_index = -1` spreads across positions.
    pub fn fill_missing_viewports(
        &self,
        protocol_id: &str,
        stage_index: usize,
        position_ids: &[&str],
        options: &SetProtocolOptions,
    ) -> Result<Vec<Option<ViewportMatchDetails>>> {
        let mut in_display = options.in_display.clone().unwrap_or_default();
        let mut filled = Vec::with_capacity(position_ids.len());
        for position_id in position_ids {
            let step = SetProtocolOptions {
                in_display: Some(in_display.clone()),
                ..options.clone()
            };
            let details = self.get_missing_viewport(protocol_id, stage_index, position_id, &step)?;
            if let Some(details) = &details {
                in_display.extend(
                    details
                        .display_set_instance_uids()
                        .into_iter()
                        .map(String::from),
                );
            }
            filled.push(details);
        }
        Ok(filled)
    }

    /// Viewports to reload when `new_uid` is dropped on `viewport_index`.
    ///
    /// # Errors
    ///
    /// `NoActiveProtocol`; `UnsupportedUpdate` for a multi-display-set
    /// target; `DisplaySetNotFound` or `RequiredRuleViolation` when the
    /// dropped display set fails validation against the target's selector.
    pub fn get_viewports_require_update(
        &self,
        viewport_index: usize,
        new_uid: &str,
    ) -> Result<Vec<ViewportUpdate>> {
        let protocol = self
            .session
            .protocol
            .as_ref()
            .ok_or(HangingError::NoActiveProtocol)?;
        let stage = protocol
            .stage(self.session.stage_index)
            .ok_or_else(|| HangingError::StageOutOfRange {
                protocol_id: protocol.id.clone(),
                stage_index: self.session.stage_index,
                stage_count: protocol.stages.len(),
            })?;
        let engine = self.engine();

        plan_viewport_update(
            stage,
            &protocol.display_set_selectors,
            &self.session.viewport_match_details,
            &self.session.display_set_match_details,
            viewport_index,
            new_uid,
            |selector_id, selector| {
                let display_set = self.provider.display_set_by_uid(new_uid).ok_or_else(|| {
                    HangingError::DisplaySetNotFound {
                        display_set_instance_uid: new_uid.to_string(),
                    }
                })?;
                if engine.satisfies_selector(selector, display_set) {
                    Ok(())
                } else {
                    Err(HangingError::RequiredRuleViolation {
                        display_set_instance_uid: new_uid.to_string(),
                        selector_id: selector_id.to_string(),
                    })
                }
            },
        )
    }

    // ---- lifecycle ----

    /// Clears session data and match details. The applied protocol stays
    /// known so the next `set_protocol` with the same id keeps its stages.
    pub fn reset(&mut self) {
        self.studies.clear();
        self.display_sets.clear();
        self.active_study = None;
        self.session.viewport_match_details.clear();
        self.session.display_set_match_details.clear();
        self.session.custom_image_load_performed = false;
    }

    pub fn on_mode_exit(&mut self) {
        debug!("mode exit; resetting session");
        self.reset();
    }

    /// Returns the service to its freshly constructed state, dropping the
    /// registry, custom attributes, strategies and listeners.
    pub fn destroy(&mut self) {
        self.reset();
        self.session = Session::default();
        self.registry.clear();
        self.attributes = AttributeTable::with_builtins();
        self.image_load_strategies.clear();
        self.events.clear();
    }

    // ---- helpers ----

    fn engine(&self) -> MatchingEngine<'_> {
        MatchingEngine::new(&self.studies, &self.display_sets, &self.attributes)
            .with_epsilon(self.config.score_epsilon)
    }

    fn generator_context(&self) -> GeneratorContext<'_> {
        GeneratorContext {
            studies: &self.studies,
            display_sets: &self.display_sets,
            active_protocol_id: self.session.protocol.as_deref().map(|p| p.id.as_str()),
        }
    }
}

fn narrow_to_position(template: &Viewport, position_id: &str) -> Viewport {
    let mut viewport = template.clone();
    if let Some(entries) = template
        .display_sets_by_position
        .as_ref()
        .and_then(|positions| positions.get(position_id))
    {
        viewport.display_sets = entries.clone();
    }
    viewport
}

impl<P: fmt::Debug> fmt::Debug for HangingProtocolService<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HangingProtocolService")
            .field("config", &self.config)
            .field("provider", &self.provider)
            .field("registry", &self.registry)
            .field("studies", &self.studies.len())
            .field("session", &self.session)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
