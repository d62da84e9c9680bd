//! The per-turn pipeline and the session state around it.
//!
//! Turn order: analyze emotion, track the sample, update desires and the
//! self-model, route, apply any persona switch, run any ritual, generate the
//! response with the augmented prompt, store the exchange.
//!
//! Each entity sits behind its own lock and is never held across a provider
//! call. Lock order is entity then kv: an entity's lock stays held until its
//! write reaches the store, so the stored copy never trails a later mutation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::Mutex;

use nova_core::self_state::AmbientMood;
use nova_core::{
    AgentRouter, Desire, DesireLedger, DesireSummary, EmotionalContext, EmotionalSummary,
    Interaction, InteractionContext, Mood, PersonaId, PersonaSwitch, PromptContext, RitualKind,
    RoutingDecision, SelfModel, SelfModelSnapshot, SelfStateView, UserProfile, UserReaction,
    analyze, detect_persona_switch, detect_ritual_trigger, fallback_response,
};
use nova_store::{KvStore, MemoryKv, state};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::documents::{DocumentSource, FsDocumentSource};
use crate::effects::{LogEffects, RitualEffects};
use crate::error::{EngineError, Result};
use crate::memory_store::{MemoryStore, SharedKv, shared_kv};
use crate::openai::OpenAiClient;
use crate::provider::{CompletionProvider, CompletionRequest, EmbeddingProvider, MultimodalPayload};

const PROMPT_DESIRES: usize = 3;

/// One user turn as supplied by the host.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub input: String,
    pub multimodal: Option<MultimodalPayload>,
    /// Reaction to the previous response, when known.
    pub reaction: Option<UserReaction>,
    pub context: InteractionContext,
}

impl TurnRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_multimodal(mut self, payload: MultimodalPayload) -> Self {
        self.multimodal = Some(payload);
        self
    }

    pub fn with_reaction(mut self, reaction: UserReaction) -> Self {
        self.reaction = Some(reaction);
        self
    }

    pub fn with_context(mut self, context: InteractionContext) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub response: String,
    pub emotional_context: EmotionalContext,
    pub routing: RoutingDecision,
    pub persona: PersonaId,
    pub ritual_triggered: bool,
    pub ritual: Option<RitualKind>,
    /// The response is a canned fallback rather than a completion.
    pub fallback: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub active: bool,
    pub persona: PersonaId,
    pub ambient: AmbientMood,
    pub self_state: SelfStateView,
    pub ritual_active: bool,
    pub session_duration_ms: u64,
    pub memory_count: usize,
    pub current_agent: String,
    pub routing_stats: Vec<(String, usize)>,
    pub desires: DesireSummary,
    /// Name from the user profile, when one is loaded.
    pub user_name: Option<String>,
}

struct Session {
    persona: PersonaId,
    last_response: String,
}

/// Clears the ritual busy flag however the ritual ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct OrchestratorBuilder {
    config: EngineConfig,
    kv: Option<SharedKv>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    completion: Option<Arc<dyn CompletionProvider>>,
    documents: Option<Arc<dyn DocumentSource>>,
    effects: Option<Arc<dyn RitualEffects>>,
    clock: Option<Arc<dyn Clock>>,
}

impl OrchestratorBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            kv: None,
            embedder: None,
            completion: None,
            documents: None,
            effects: None,
            clock: None,
        }
    }

    pub fn store(mut self, store: impl KvStore + 'static) -> Self {
        self.kv = Some(shared_kv(store));
        self
    }

    pub fn shared_store(mut self, kv: SharedKv) -> Self {
        self.kv = Some(kv);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn completion(mut self, completion: Arc<dyn CompletionProvider>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn documents(mut self, documents: Arc<dyn DocumentSource>) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn effects(mut self, effects: Arc<dyn RitualEffects>) -> Self {
        self.effects = Some(effects);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Wire the parts and load persisted state. Missing parts default to an
    /// in-memory store, filesystem documents under the configured root, the
    /// logging effects sink and the system clock.
    pub async fn build(self) -> Orchestrator {
        let config = self.config;
        let kv = self.kv.unwrap_or_else(|| shared_kv(MemoryKv::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let documents = self
            .documents
            .unwrap_or_else(|| Arc::new(FsDocumentSource::new(config.document_root())));
        let effects = self.effects.unwrap_or_else(|| Arc::new(LogEffects));
        let now = clock.now_millis();

        if self.embedder.is_none() {
            tracing::warn!("no embedding provider configured, memory recall disabled");
        }
        let memory = MemoryStore::new(kv.clone(), self.embedder, config.retention());
        memory.initialize().await;

        let (ledger, self_model) = {
            let store = kv.lock().await;
            let ledger = match state::load_desires(&**store) {
                Ok(Some(desires)) => DesireLedger::from_desires(desires),
                Ok(None) => DesireLedger::new(now),
                Err(e) => {
                    tracing::error!("failed to load desires, using defaults: {e}");
                    DesireLedger::new(now)
                }
            };
            let self_model = match state::load_self_model(&**store) {
                Ok(Some(snapshot)) => SelfModel::from_snapshot(snapshot),
                Ok(None) => SelfModel::new(now),
                Err(e) => {
                    tracing::error!("failed to load self model, using defaults: {e}");
                    SelfModel::new(now)
                }
            };
            (ledger, self_model)
        };
        let profile = load_profile(&kv, documents.as_ref()).await;
        let persona = match documents.assistant_profile().await {
            Ok(assistant) => assistant
                .and_then(|a| a.starting_persona())
                .unwrap_or_default(),
            Err(e) => {
                tracing::warn!("failed to load assistant profile: {e}");
                PersonaId::default()
            }
        };

        tracing::info!(
            desires = ledger.desires().len(),
            completion = self.completion.is_some(),
            profile = profile.is_some(),
            %persona,
            "orchestrator ready"
        );

        Orchestrator {
            config,
            memory,
            ledger: Mutex::new(ledger),
            self_model: Mutex::new(self_model),
            router: Mutex::new(AgentRouter::new()),
            session: Mutex::new(Session {
                persona,
                last_response: String::new(),
            }),
            profile: Mutex::new(profile),
            completion: self.completion,
            documents,
            effects,
            kv,
            clock,
            ritual_active: AtomicBool::new(false),
            session_start: now,
        }
    }
}

pub struct Orchestrator {
    config: EngineConfig,
    memory: MemoryStore,
    ledger: Mutex<DesireLedger>,
    self_model: Mutex<SelfModel>,
    router: Mutex<AgentRouter>,
    session: Mutex<Session>,
    profile: Mutex<Option<UserProfile>>,
    completion: Option<Arc<dyn CompletionProvider>>,
    documents: Arc<dyn DocumentSource>,
    effects: Arc<dyn RitualEffects>,
    kv: SharedKv,
    clock: Arc<dyn Clock>,
    ritual_active: AtomicBool,
    session_start: u64,
}

impl Orchestrator {
    pub fn builder(config: EngineConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    /// Production wiring: SQLite under the data dir, OpenAI-compatible
    /// providers for whichever keys are set, documents on disk.
    pub async fn from_config(config: EngineConfig) -> Result<Self> {
        let store = nova_store::open_in_dir(&config.base_dir())?;
        let mut builder = Self::builder(config.clone()).store(store);
        if let Some(client) = OpenAiClient::completion_client(&config)? {
            builder = builder.completion(Arc::new(client));
        }
        if let Some(client) = OpenAiClient::embedding_client(&config)? {
            builder = builder.embedder(Arc::new(client));
        }
        Ok(builder.build().await)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Convenience wrapper for a turn with no reaction or session flags.
    pub async fn process_input(
        &self,
        input: &str,
        multimodal: Option<MultimodalPayload>,
    ) -> TurnResponse {
        self.process_turn(TurnRequest {
            input: input.to_string(),
            multimodal,
            ..TurnRequest::default()
        })
        .await
    }

    /// Run one turn through the whole pipeline. Never fails: provider and
    /// persistence problems degrade to logged warnings and a fallback reply.
    pub async fn process_turn(&self, request: TurnRequest) -> TurnResponse {
        let now = self.clock.now_millis();
        let TurnRequest {
            input,
            multimodal,
            reaction,
            context,
        } = request;
        tracing::info!(chars = input.chars().count(), "processing turn");

        let emotion = analyze(&input);
        self.memory.track(&input, emotion.mood, now).await;
        self.record_user_mood(emotion.mood, now).await;
        let summary = self.memory.emotional_summary().await;
        tracing::debug!(mood = %emotion.mood, intensity = emotion.intensity, "emotion analyzed");

        let previous_response = self.session.lock().await.last_response.clone();
        let interaction = Interaction {
            input: input.clone(),
            response: previous_response,
            user_reaction: reaction,
            context,
        };
        self.update_inner_state(&interaction, summary.as_ref(), now).await;

        let routing = self.router.lock().await.route(&input, &emotion, now);
        tracing::info!(agent = %routing.agent_id, model = %routing.model, "agent routed");

        if let Some(switch) = detect_persona_switch(&input, &emotion) {
            self.switch_persona(switch).await;
        }

        let trigger = detect_ritual_trigger(&input, &emotion);
        if let Some(trigger) = &trigger {
            tracing::info!(ritual = %trigger.ritual, reason = %trigger.reason, "ritual triggered");
            if let Err(e) = self.trigger_ritual(trigger.ritual).await {
                tracing::warn!(ritual = %trigger.ritual, "ritual failed: {e}");
            }
        }

        let (response, fallback) = match self
            .generate(&input, multimodal, &emotion, summary.as_ref(), &routing)
            .await
        {
            Ok(text) => (text, false),
            Err(e) => {
                tracing::warn!("response generation failed, using fallback: {e}");
                (fallback_text(), true)
            }
        };

        self.memory.store(&input, &response, &emotion, now).await;

        let persona = {
            let mut session = self.session.lock().await;
            session.last_response = response.clone();
            session.persona
        };

        TurnResponse {
            response,
            emotional_context: emotion,
            routing,
            persona,
            ritual_triggered: trigger.is_some(),
            ritual: trigger.map(|t| t.ritual),
            fallback,
        }
    }

    async fn update_inner_state(
        &self,
        interaction: &Interaction,
        summary: Option<&EmotionalSummary>,
        now: u64,
    ) {
        {
            let mut ledger = self.ledger.lock().await;
            for change in ledger.update(interaction, now) {
                tracing::debug!(
                    desire = %change.id,
                    grew = change.grew,
                    decayed = change.decayed,
                    score = change.priority_score,
                    "desire changed"
                );
            }
            if let Err(e) = self.persist_desires(ledger.desires()).await {
                tracing::error!("failed to persist desires: {e}");
            }
        }

        let mut model = self.self_model.lock().await;
        let reflection = model.update_emotional_state(interaction, now);
        for insight in &reflection.insights {
            tracing::debug!(%insight, "self reflection");
        }
        model.passive_update(summary);
        if let Err(e) = self.persist_self_model(&model.snapshot()).await {
            tracing::error!("failed to persist self model: {e}");
        }
    }

    /// Stamp the detected mood onto the user profile, if there is one.
    async fn record_user_mood(&self, mood: Mood, now: u64) {
        let mut guard = self.profile.lock().await;
        let Some(profile) = guard.as_mut() else {
            return;
        };
        profile.record_mood(mood, now);
        let mut kv = self.kv.lock().await;
        if let Err(e) = state::save_user_profile(&mut **kv, profile) {
            tracing::error!("failed to persist user profile: {e}");
        }
    }

    /// Applies the switch only when the persona document loads.
    async fn switch_persona(&self, switch: PersonaSwitch) -> bool {
        match self.documents.persona(switch.persona).await {
            Ok(doc) => {
                self.session.lock().await.persona = switch.persona;
                tracing::info!(
                    persona = %switch.persona,
                    name = %doc.name,
                    reason = %switch.reason,
                    "persona switched"
                );
                true
            }
            Err(e) => {
                tracing::warn!(persona = %switch.persona, "persona switch failed: {e}");
                false
            }
        }
    }

    /// Play a ritual's steps in order, pausing after each. Returns `false`
    /// without doing anything when another ritual is already running.
    pub async fn trigger_ritual(&self, kind: RitualKind) -> Result<bool> {
        if self.ritual_active.swap(true, Ordering::SeqCst) {
            tracing::debug!(ritual = %kind, "ritual already active, skipping");
            return Ok(false);
        }
        let _busy = BusyGuard(&self.ritual_active);

        let doc = self.documents.ritual(kind).await?;
        let default_pause = self.config.ritual_step_pause();
        tracing::info!(
            ritual = %kind,
            name = %doc.name,
            steps = doc.sequence.len(),
            "ritual started"
        );

        for step in &doc.sequence {
            self.effects.perform(kind, step).await;
            tokio::time::sleep(step.pause(default_pause)).await;
        }

        tracing::info!(ritual = %kind, name = %doc.name, "ritual complete");
        Ok(true)
    }

    async fn generate(
        &self,
        input: &str,
        multimodal: Option<MultimodalPayload>,
        emotion: &EmotionalContext,
        summary: Option<&EmotionalSummary>,
        routing: &RoutingDecision,
    ) -> Result<String> {
        let persona_id = self.session.lock().await.persona;
        let persona = self.documents.persona(persona_id).await?;
        let memories = self.memory.recall(input, self.config.recall_limit).await;
        let tone = self.self_model.lock().await.tone_suggestion();
        let top: Vec<Desire> = self
            .ledger
            .lock()
            .await
            .dominant(PROMPT_DESIRES)
            .into_iter()
            .cloned()
            .collect();
        let desires: Vec<&Desire> = top.iter().collect();

        let system_prompt = PromptContext {
            persona: &persona,
            emotion,
            summary,
            memories: &memories,
            routing: Some(routing),
            tone,
            desires: &desires,
        }
        .compose();

        let provider = self.completion.as_ref().ok_or_else(|| {
            EngineError::ProviderUnavailable("no completion provider configured".to_string())
        })?;
        tracing::debug!(memories = memories.len(), persona = %persona_id, "requesting response");
        provider
            .complete(CompletionRequest {
                model: routing.model.clone(),
                system_prompt,
                user_input: input.to_string(),
                multimodal,
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            })
            .await
    }

    // --- Host controls ---

    pub async fn force_agent(&self, id: &str) -> Result<RoutingDecision> {
        let decision = self.router.lock().await.force_agent(id)?;
        tracing::info!(agent = %decision.agent_id, "agent forced");
        Ok(decision)
    }

    pub async fn current_persona(&self) -> PersonaId {
        self.session.lock().await.persona
    }

    pub fn available_personas(&self) -> &'static [PersonaId] {
        &PersonaId::ALL
    }

    pub fn available_rituals(&self) -> &'static [RitualKind] {
        &RitualKind::ALL
    }

    pub fn ritual_active(&self) -> bool {
        self.ritual_active.load(Ordering::SeqCst)
    }

    pub async fn emotional_summary(&self) -> Option<EmotionalSummary> {
        self.memory.emotional_summary().await
    }

    pub async fn desire_summary(&self) -> DesireSummary {
        self.ledger.lock().await.summary()
    }

    pub async fn self_state(&self) -> SelfStateView {
        self.self_model.lock().await.current_state()
    }

    pub async fn growth_insights(&self) -> Vec<String> {
        self.self_model.lock().await.growth_insights()
    }

    pub async fn user_profile(&self) -> Option<UserProfile> {
        self.profile.lock().await.clone()
    }

    pub async fn add_desire(&self, text: &str, priority_score: f64) -> Result<Desire> {
        let now = self.clock.now_millis();
        let mut ledger = self.ledger.lock().await;
        let added = ledger.add_desire(text, priority_score, now).clone();
        self.persist_desires(ledger.desires()).await?;
        Ok(added)
    }

    pub async fn remove_desire(&self, id: &str) -> Result<bool> {
        let mut ledger = self.ledger.lock().await;
        let removed = ledger.remove_desire(id);
        if removed {
            self.persist_desires(ledger.desires()).await?;
        }
        Ok(removed)
    }

    pub async fn status(&self) -> StatusReport {
        let now = self.clock.now_millis();
        let persona = self.session.lock().await.persona;
        let (ambient, self_state) = {
            let model = self.self_model.lock().await;
            (model.ambient().clone(), model.current_state())
        };
        let (current_agent, routing_stats) = {
            let router = self.router.lock().await;
            (router.current_agent().id.clone(), router.routing_stats())
        };
        StatusReport {
            active: true,
            persona,
            ambient,
            self_state,
            ritual_active: self.ritual_active(),
            session_duration_ms: now.saturating_sub(self.session_start),
            memory_count: self.memory.len().await,
            current_agent,
            routing_stats,
            desires: self.desire_summary().await,
            user_name: self
                .profile
                .lock()
                .await
                .as_ref()
                .map(|p| p.name().to_string()),
        }
    }

    // --- Background ticks ---

    /// Refresh the ambient mood from the emotional summary.
    pub async fn self_state_tick(&self) -> Result<bool> {
        let summary = self.memory.emotional_summary().await;
        let mut model = self.self_model.lock().await;
        if !model.passive_update(summary.as_ref()) {
            return Ok(false);
        }
        self.persist_self_model(&model.snapshot()).await?;
        tracing::debug!(mood = %model.ambient().mood, "ambient mood refreshed");
        Ok(true)
    }

    /// Apply passive desire decay. Returns how many desires decayed.
    pub async fn desire_tick(&self) -> Result<usize> {
        let now = self.clock.now_millis();
        let mut ledger = self.ledger.lock().await;
        let decayed = ledger.tick(now);
        if decayed > 0 {
            self.persist_desires(ledger.desires()).await?;
            tracing::debug!(decayed, "desires decayed");
        }
        Ok(decayed)
    }

    /// Persist every entity and flush the store.
    pub async fn shutdown(&self) -> Result<()> {
        self.memory.flush().await?;
        {
            let ledger = self.ledger.lock().await;
            self.persist_desires(ledger.desires()).await?;
        }
        {
            let model = self.self_model.lock().await;
            self.persist_self_model(&model.snapshot()).await?;
        }
        {
            let profile = self.profile.lock().await;
            if let Some(profile) = profile.as_ref() {
                state::save_user_profile(&mut **self.kv.lock().await, profile)?;
            }
        }
        self.kv.lock().await.flush()?;
        tracing::info!("orchestrator state flushed");
        Ok(())
    }

    // --- Persistence ---

    async fn persist_desires(&self, desires: &[Desire]) -> Result<()> {
        let mut kv = self.kv.lock().await;
        state::save_desires(&mut **kv, desires)?;
        Ok(())
    }

    async fn persist_self_model(&self, snapshot: &SelfModelSnapshot) -> Result<()> {
        let mut kv = self.kv.lock().await;
        state::save_self_model(&mut **kv, snapshot)?;
        Ok(())
    }
}

/// A persisted profile wins over the host document, which is only the seed.
async fn load_profile(kv: &SharedKv, documents: &dyn DocumentSource) -> Option<UserProfile> {
    let persisted = {
        let store = kv.lock().await;
        state::load_user_profile(&**store)
    };
    match persisted {
        Ok(Some(profile)) => return Some(profile),
        Ok(None) => {}
        Err(e) => tracing::error!("failed to load user profile: {e}"),
    }
    match documents.user_profile().await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!("failed to load user profile document: {e}");
            None
        }
    }
}

fn fallback_text() -> String {
    fallback_response(&mut rand::rng()).to_string()
}
