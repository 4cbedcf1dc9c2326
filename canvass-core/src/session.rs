//! Session orchestrator: lifecycle state machine, mesh event handling, and
//! answer fan-out over the live peer set.
//!
//! Host-driven: the host funnels transport events into `handle_event` from
//! a single consumer task and performs the returned actions. Rendering and
//! notification actions belong on the host's UI context; sends go back to
//! the transport.

use crate::codec::{self, MalformedFormError};
use crate::form::{AnswerSheet, Form};
use crate::peer::{PeerId, PeerRegistry};

/// Well-known port both sides of a questionnaire session bind and address.
pub const QUESTIONNAIRE_PORT: u16 = 9876;

/// Session lifecycle. Forward-only, except that `Stopped` is reachable
/// from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unbound,
    Bound,
    Active,
    Stopped,
}

/// Typed transport event, as delivered by the host's mesh plumbing.
#[derive(Debug, Clone)]
pub enum MeshEvent {
    PeerJoined(PeerId),
    PeerLeft(PeerId),
    DataReceived(Vec<u8>),
}

/// Side effect for the host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Show a received questionnaire to the respondent.
    RenderForm(Form),
    /// Show a completed sheet received from a respondent.
    ShowAnswers(AnswerSheet),
    /// Audible alert for a received payload. Must not block event handling.
    PlayNotification,
    /// Toggle the mesh configuration entry point: hidden while peers are
    /// in range, shown again when the last peer leaves.
    SetConfigureVisibility(bool),
    /// One reliable send to one peer.
    SendReliable {
        peer: PeerId,
        port: u16,
        payload: Vec<u8>,
    },
}

/// Fatal bind failure: the session cannot start and the bind is not
/// retried.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("port {0} is already in use")]
    PortBusy(u16),
    #[error("transport unavailable: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-peer send failure. Reported individually; never aborts a fan-out.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("no route to peer")]
    UnknownPeer,
    #[error("send timed out")]
    TimedOut,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one reliable send within a fan-out.
#[derive(Debug)]
pub struct SendReport {
    pub peer: PeerId,
    pub result: Result<(), SendError>,
}

/// Questionnaire session. The host owns exactly one and drives it from a
/// single task; methods never block.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    registry: PeerRegistry,
    port: u16,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Unbound,
            registry: PeerRegistry::new(),
            port: QUESTIONNAIRE_PORT,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Peers currently in range. Order is not meaningful.
    pub fn peers(&self) -> Vec<PeerId> {
        self.registry.snapshot()
    }

    /// The host bound the questionnaire port. A failed bind never reaches
    /// the session; the host surfaces the `BindError` and ends startup.
    pub fn on_bound(&mut self) {
        if self.state == SessionState::Unbound {
            self.state = SessionState::Bound;
        }
    }

    /// The host registered its data-received and peer-changed plumbing;
    /// events are accepted from here on.
    pub fn activate(&mut self) {
        if self.state == SessionState::Bound {
            self.state = SessionState::Active;
        }
    }

    /// Tear down. Idempotent; a stopped session ignores all further events.
    pub fn stop(&mut self) {
        self.state = SessionState::Stopped;
    }

    /// Process one transport event. Events outside `Active` are dropped
    /// without touching the peer set.
    pub fn handle_event(&mut self, event: MeshEvent) -> Result<Vec<Action>, MalformedFormError> {
        if self.state != SessionState::Active {
            return Ok(Vec::new());
        }
        match event {
            MeshEvent::PeerJoined(id) => {
                let was_empty = self.registry.is_empty();
                self.registry.on_peer_joined(id);
                if was_empty && !self.registry.is_empty() {
                    return Ok(vec![Action::SetConfigureVisibility(false)]);
                }
                Ok(Vec::new())
            }
            MeshEvent::PeerLeft(id) => {
                let was_empty = self.registry.is_empty();
                self.registry.on_peer_left(id);
                if !was_empty && self.registry.is_empty() {
                    return Ok(vec![Action::SetConfigureVisibility(true)]);
                }
                Ok(Vec::new())
            }
            MeshEvent::DataReceived(bytes) => self.on_data_received(&bytes),
        }
    }

    /// Data payloads are decoded as forms first. A payload matching the
    /// answer grammar instead is surfaced as `ShowAnswers` (a node that
    /// distributed a form hears completed sheets on the same port). The
    /// form decode error is returned when neither grammar matches.
    fn on_data_received(&self, bytes: &[u8]) -> Result<Vec<Action>, MalformedFormError> {
        match codec::decode_form(bytes) {
            Ok(form) => Ok(vec![Action::RenderForm(form), Action::PlayNotification]),
            Err(form_err) => match codec::decode_answers(bytes) {
                Ok(sheet) => Ok(vec![Action::ShowAnswers(sheet), Action::PlayNotification]),
                Err(answer_err) => {
                    log::debug!("payload matches neither grammar: {answer_err}");
                    Err(form_err)
                }
            },
        }
    }

    /// Encode the completed sheet and emit one reliable send per known
    /// peer. The host performs each send independently: one peer's failure
    /// must not keep the payload from the rest.
    pub fn submit(&self, sheet: &AnswerSheet) -> Vec<Action> {
        if self.state != SessionState::Active {
            return Vec::new();
        }
        let payload = codec::encode_answers(&sheet.answers, sheet.score);
        self.registry
            .snapshot()
            .into_iter()
            .map(|peer| Action::SendReliable {
                peer,
                port: self.port,
                payload: payload.clone(),
            })
            .collect()
    }
}
