//! Canvass questionnaire session protocol.
//! Host-driven: no I/O; the host passes mesh events and performs the
//! returned actions.

pub mod codec;
pub mod form;
pub mod peer;
pub mod session;

pub use codec::{
    decode_answers, decode_form, encode_answers, MalformedAnswerError, MalformedFormError,
};
pub use form::{AnswerSheet, Form, FormKind, QuestionCode, FREQUENCY_CHOICES};
pub use peer::{PeerId, PeerRegistry};
pub use session::{
    Action, BindError, MeshEvent, SendError, SendReport, Session, SessionState, QUESTIONNAIRE_PORT,
};
