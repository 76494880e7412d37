//! The process's one piece of shared mutable state (spec §4.6): who is
//! connected, what name they go by, which table they're seated at, and the
//! live outbound queue (if any) that reaches their socket. Grounded on the
//! teacher's `hosting::Casino`, which holds the equivalent
//! `RwLock<HashMap<RoomId, RoomHandle>>` for rooms rather than sessions.

mod registry;
mod token;

pub use registry::{validate_name, SessionError, SessionId, SessionRegistry};
pub use token::Token;
