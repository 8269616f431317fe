//! catalog-fsm — replicated-log state machine for the service catalog.
//!
//! The consensus layer hands committed entries, each with its log index,
//! to [`StateMachine::apply`]. Followers that fall too far behind receive
//! a [`SnapshotData`] instead and install it wholesale.
//!
//! # Architecture
//!
//! - **`typ`** — log payloads (`Request`, `LogEntry`, `Response`)
//! - **`state_machine`** — applies entries to a `StateStore`, builds and
//!   installs snapshots
//! - **`error`** — `FsmError` / `FsmResult`

pub mod error;
pub mod state_machine;
pub mod typ;

pub use error::{FsmError, FsmResult};
pub use state_machine::{SnapshotData, StateMachine};
pub use typ::{LogEntry, Request, Response};
