//! companion-relay: pairing broker that relays editor state from a
//! producer connection to a companion viewer.
//!
//! A producer asks for a session and receives a six-character pairing
//! code. A consumer joins with that code, after which every payload the
//! producer sends is stored as the session's latest state and forwarded
//! to the consumer in order. Payloads are opaque strings; the relay never
//! inspects them.

pub mod code;
pub mod connection;
pub mod gateway;
pub mod protocol;
pub mod reaper;
pub mod session;
pub mod status;

pub use code::CodeGenerator;
pub use gateway::{ConnectionState, RelayGateway};
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{DisconnectOutcome, MemorySessionStore, Role, Session, SessionStore};
