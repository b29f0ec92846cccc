//! Session/channel correlation.
//!
//! One correlator binds one client instance to at most one active
//! channel at a time. Request flows park a oneshot future in a map
//! keyed by a generated correlation id; a single demux task owns the
//! inbound stream and either resolves the matching future or forwards
//! the event to the turn stream. A deadline timer races each future;
//! whichever side loses finds the map entry already gone, so detachment
//! never double-fires.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use base64::Engine;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use voiceid_profile::VoiceProfile;
use voiceid_sync::SyncReconciler;

use crate::envelope::{Broadcast, ClientEnvelope, RawBroadcast, TurnMessage};
use crate::session::{now_ms, ChannelProvider, ChannelState, VoiceSession};
use crate::transport::Transport;
use crate::ChannelError;

/// Deadlines and identity for a correlator instance.
#[derive(Debug, Clone)]
pub struct CorrelatorConfig {
    /// Local entity id: events from this sender are self-echo.
    pub entity_id: String,
    /// The agent this client converses with.
    pub agent_id: String,
    /// Partition key stamped onto outgoing turns.
    pub browser_session_id: String,
    /// Source tag stamped onto outgoing turns.
    pub source_tag: String,
    /// Deadline for identification and command responses.
    pub identify_timeout: Duration,
    /// Deadline for registration responses.
    pub register_timeout: Duration,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            entity_id: String::new(),
            agent_id: String::new(),
            browser_session_id: String::new(),
            source_tag: "voice".to_string(),
            identify_timeout: Duration::from_secs(10),
            register_timeout: Duration::from_secs(30),
        }
    }
}

/// What a request flow is asking for.
#[derive(Debug, Clone, Copy)]
enum FlowKind {
    Identify,
    Command,
    Register,
}

impl FlowKind {
    fn action(&self) -> &'static str {
        match self {
            FlowKind::Identify => "identify",
            FlowKind::Command => "command",
            FlowKind::Register => "register",
        }
    }
}

/// Result of completing a registration flow.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub profile: VoiceProfile,
    /// False when the authoritative fetch failed and the profile was
    /// rebuilt from the response payload without embeddings.
    pub complete: bool,
}

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Broadcast>>>>;

/// Binds a logical voice session to a transport channel and matches
/// inbound events to outstanding request flows.
///
/// Constructed once at startup and passed by handle to consumers. The
/// active channel id is one mutable slot: last writer wins, so exactly
/// one session filters events at a time per client instance.
pub struct ChannelCorrelator {
    cfg: CorrelatorConfig,
    transport: Arc<dyn Transport>,
    provider: Arc<dyn ChannelProvider>,
    state: Mutex<ChannelState>,
    session: Mutex<Option<VoiceSession>>,
    active_channel: Arc<RwLock<Option<String>>>,
    pending: PendingMap,
    cancel: CancellationToken,
}

impl ChannelCorrelator {
    /// Build the correlator and spawn its demux task over `inbound`.
    /// Returns the stream of ordinary (non-correlated) turn events.
    pub fn new(
        cfg: CorrelatorConfig,
        transport: Arc<dyn Transport>,
        provider: Arc<dyn ChannelProvider>,
        inbound: mpsc::Receiver<RawBroadcast>,
    ) -> (Self, mpsc::Receiver<Broadcast>) {
        let (turn_tx, turn_rx) = mpsc::channel(64);
        let active_channel: Arc<RwLock<Option<String>>> = Arc::new(RwLock::new(None));
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let cancel = CancellationToken::new();

        tokio::spawn(demux(
            inbound,
            active_channel.clone(),
            pending.clone(),
            cfg.entity_id.clone(),
            turn_tx,
            cancel.clone(),
        ));

        (
            Self {
                cfg,
                transport,
                provider,
                state: Mutex::new(ChannelState::Uninitialized),
                session: Mutex::new(None),
                active_channel,
                pending,
                cancel,
            },
            turn_rx,
        )
    }

    pub fn state(&self) -> ChannelState {
        *self.state.lock().unwrap()
    }

    pub fn session(&self) -> Option<VoiceSession> {
        self.session.lock().unwrap().clone()
    }

    /// Create a session and bind it to a routing channel.
    ///
    /// An Active session is implicitly superseded; a start already in
    /// flight is an error. On failure no binding remains.
    pub async fn start_session(&self, user_id: &str) -> Result<VoiceSession, ChannelError> {
        {
            let mut state = self.state.lock().unwrap();
            if matches!(*state, ChannelState::ChannelCreating | ChannelState::Joining) {
                return Err(ChannelError::InvalidState(state.as_str()));
            }
            *state = ChannelState::ChannelCreating;
        }

        match self.start_inner(user_id).await {
            Ok(session) => Ok(session),
            Err(e) => {
                *self.active_channel.write().unwrap() = None;
                *self.session.lock().unwrap() = None;
                *self.state.lock().unwrap() = ChannelState::Uninitialized;
                Err(e)
            }
        }
    }

    async fn start_inner(&self, user_id: &str) -> Result<VoiceSession, ChannelError> {
        let session_id = format!("vs-{}", uuid::Uuid::new_v4());
        let channel_id = self.provider.channel_for(&session_id).await?;

        *self.state.lock().unwrap() = ChannelState::Joining;
        self.transport
            .send(&ClientEnvelope::room_join(&channel_id, &self.cfg.entity_id))
            .await?;
        self.transport.wait_connected().await?;

        // Publish the filter before flipping to Active so no event can
        // observe an Active correlator with a stale slot.
        *self.active_channel.write().unwrap() = Some(channel_id.clone());
        *self.state.lock().unwrap() = ChannelState::Active;

        let session = VoiceSession::new(session_id, channel_id, user_id, &self.cfg.agent_id);
        *self.session.lock().unwrap() = Some(session.clone());
        info!(session = %session.id, channel = %session.channel_id, "session active");
        Ok(session)
    }

    /// End the session: clear the filter and fail outstanding flows.
    pub fn end_session(&self) {
        *self.state.lock().unwrap() = ChannelState::Ended;
        *self.active_channel.write().unwrap() = None;
        *self.session.lock().unwrap() = None;
        // Dropping the senders resolves every awaiting flow with Closed.
        self.pending.lock().unwrap().clear();
        debug!("session ended");
    }

    /// Stop the demux task. Ends the session first.
    pub fn shutdown(&self) {
        self.end_session();
        self.cancel.cancel();
    }

    /// Emit one voice turn on the active channel.
    pub async fn send_turn(
        &self,
        audio: &[u8],
        transcript: Option<&str>,
    ) -> Result<(), ChannelError> {
        let session = self.require_active()?;
        let msg = self.turn_message(&session, audio, transcript);
        self.transport.send(&ClientEnvelope::SendMessage(msg)).await
    }

    /// Ask the agent to identify the speaker of `audio`.
    /// Resolves with the correlated response or [`ChannelError::Timeout`].
    pub async fn request_identification(&self, audio: &[u8]) -> Result<Broadcast, ChannelError> {
        self.request(FlowKind::Identify, audio, None, None).await
    }

    /// Send a command turn expecting a correlated response.
    pub async fn request_command(
        &self,
        audio: &[u8],
        transcript: Option<&str>,
    ) -> Result<Broadcast, ChannelError> {
        self.request(FlowKind::Command, audio, transcript, None).await
    }

    /// Ask the agent to register `user_name` from `audio`.
    pub async fn request_registration(
        &self,
        user_name: &str,
        audio: &[u8],
    ) -> Result<Broadcast, ChannelError> {
        self.request(FlowKind::Register, audio, None, Some(user_name)).await
    }

    async fn request(
        &self,
        kind: FlowKind,
        audio: &[u8],
        transcript: Option<&str>,
        user_name: Option<&str>,
    ) -> Result<Broadcast, ChannelError> {
        let session = self.require_active()?;
        let correlation_id = format!("corr-{}", uuid::Uuid::new_v4());

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap()
            .insert(correlation_id.clone(), tx);

        let mut msg = self.turn_message(&session, audio, transcript);
        msg.action = Some(kind.action().to_string());
        msg.correlation_id = Some(correlation_id.clone());
        msg.user_name = user_name.map(str::to_string);

        if let Err(e) = self.transport.send(&ClientEnvelope::SendMessage(msg)).await {
            self.detach(&correlation_id);
            return Err(e);
        }

        let deadline = match kind {
            FlowKind::Identify | FlowKind::Command => self.cfg.identify_timeout,
            FlowKind::Register => self.cfg.register_timeout,
        };

        // The deadline races the correlated response; the loser finds
        // the map entry already removed.
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(event)) => Ok(event),
            Ok(Err(_)) => {
                // Sender dropped: the session ended under us.
                self.detach(&correlation_id);
                Err(ChannelError::Closed)
            }
            Err(_) => {
                self.detach(&correlation_id);
                warn!(action = kind.action(), "no correlated response before deadline");
                Err(ChannelError::Timeout)
            }
        }
    }

    /// Finish a registration flow from its correlated response.
    ///
    /// The response payload may omit embeddings, so the authoritative
    /// profile is fetched from the registry; if that fails the outcome
    /// falls back to an embeddings-less profile flagged incomplete.
    /// A best-effort sync runs either way.
    pub async fn complete_registration(
        &self,
        response: &Broadcast,
        reconciler: &SyncReconciler,
    ) -> Result<RegistrationOutcome, ChannelError> {
        if response.success == Some(false) {
            return Err(ChannelError::UnexpectedResponse(
                "registration rejected".to_string(),
            ));
        }
        let user_id = response
            .user_id
            .clone()
            .ok_or_else(|| ChannelError::UnexpectedResponse("missing userId".to_string()))?;

        let outcome = match reconciler.remote().fetch_profile(&user_id).await {
            Ok(Some(profile)) => RegistrationOutcome {
                profile,
                complete: true,
            },
            Ok(None) => {
                warn!(user_id = %user_id, "registered profile not in registry yet");
                RegistrationOutcome {
                    profile: self.fallback_profile(&user_id, response),
                    complete: false,
                }
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "authoritative profile fetch failed");
                RegistrationOutcome {
                    profile: self.fallback_profile(&user_id, response),
                    complete: false,
                }
            }
        };

        // Best effort: convergence can catch up on the next sync.
        let _ = reconciler.perform_sync().await;
        Ok(outcome)
    }

    fn fallback_profile(&self, user_id: &str, response: &Broadcast) -> VoiceProfile {
        VoiceProfile {
            user_id: user_id.to_string(),
            user_name: response
                .user_name
                .clone()
                .unwrap_or_else(|| response.sender_name.clone()),
            voice_embedding: Vec::new(),
            phrase_embeddings: Vec::new(),
            phrases: Vec::new(),
            consistency_score: 0.0,
            min_consistency: 0.0,
            enrolled_at: now_ms(),
            browser_session_id: self.cfg.browser_session_id.clone(),
        }
    }

    fn turn_message(
        &self,
        session: &VoiceSession,
        audio: &[u8],
        transcript: Option<&str>,
    ) -> TurnMessage {
        TurnMessage {
            source_tag: self.cfg.source_tag.clone(),
            session_id: session.id.clone(),
            audio_payload: base64::engine::general_purpose::STANDARD.encode(audio),
            transcript: transcript.map(str::to_string),
            browser_session_id: self.cfg.browser_session_id.clone(),
            timestamp: now_ms(),
            action: None,
            correlation_id: None,
            user_name: None,
        }
    }

    fn require_active(&self) -> Result<VoiceSession, ChannelError> {
        let state = *self.state.lock().unwrap();
        if state != ChannelState::Active {
            return Err(ChannelError::InvalidState(state.as_str()));
        }
        self.session
            .lock()
            .unwrap()
            .clone()
            .ok_or(ChannelError::InvalidState("active"))
    }

    /// Remove a pending entry. Idempotent: the response path and the
    /// timeout path may both call this for the same id.
    fn detach(&self, correlation_id: &str) -> bool {
        self.pending.lock().unwrap().remove(correlation_id).is_some()
    }
}

async fn demux(
    mut inbound: mpsc::Receiver<RawBroadcast>,
    active: Arc<RwLock<Option<String>>>,
    pending: PendingMap,
    entity_id: String,
    turn_tx: mpsc::Sender<Broadcast>,
    cancel: CancellationToken,
) {
    loop {
        let raw = tokio::select! {
            _ = cancel.cancelled() => return,
            raw = inbound.recv() => match raw {
                Some(raw) => raw,
                None => return,
            },
        };
        let event = Broadcast::normalize(raw);

        // The filter is read from the shared slot at handling time, not
        // captured when a flow started: an event for a superseded
        // channel must be compared against the current id.
        let active_id = active.read().unwrap().clone();
        let Some(active_id) = active_id else {
            debug!(channel = %event.channel_id, "no active channel, dropping event");
            continue;
        };
        if event.channel_id != active_id {
            debug!(
                channel = %event.channel_id,
                active = %active_id,
                "foreign channel, dropping event"
            );
            continue;
        }
        if event.sender_id == entity_id {
            continue;
        }

        if let Some(cid) = event.correlation_id.clone() {
            let sender = pending.lock().unwrap().remove(&cid);
            match sender {
                Some(tx) => {
                    let _ = tx.send(event);
                }
                // A response nothing awaits is stale; its flow timed
                // out or the session ended. Discard it.
                None => debug!(correlation = %cid, "no pending flow, discarding response"),
            }
            continue;
        }

        if turn_tx.send(event).await.is_err() {
            return;
        }
    }
}
