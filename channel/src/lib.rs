//! Realtime channel binding and request/response correlation.
//!
//! A logical voice session is bound to one routing channel of the
//! conversational backend:
//!
//! ```text
//! Uninitialized -> ChannelCreating -> Joining -> Active -> Ended
//! ```
//!
//! Once Active, the channel id becomes the *active filter*: inbound
//! events for any other channel are dropped. Request flows (identify,
//! register) install a oneshot future keyed by a generated correlation
//! id; one demux task resolves the matching future or forwards the
//! event to the turn stream. Detaching a flow is a map removal, so the
//! response/timeout race cannot double-fire.

mod correlator;
mod envelope;
mod error;
mod session;
mod transport;
mod websocket;

pub use correlator::{ChannelCorrelator, CorrelatorConfig, RegistrationOutcome};
pub use envelope::{Broadcast, ClientEnvelope, RawBroadcast, RoomJoin, TurnMessage};
pub use error::ChannelError;
pub use session::{ChannelProvider, ChannelState, VoiceSession};
pub use transport::{PipeTransport, Transport};
pub use websocket::WsTransport;
