//! Strictly Match - chess match sessions kept consistent by polling
//!
//! Two clients play one match held by an authoritative store. Each client
//! validates and applies its own moves optimistically, then periodically
//! re-fetches the authoritative snapshot to pick up the opponent's moves,
//! status changes and rematches.
//!
//! # Architecture
//!
//! - **Session**: the match state machine (`WAITING`, `PLAYING`, `PAUSED`, `FINISHED`)
//! - **Clock**: per-side time with an increment; running out loses
//! - **Validator**: move preconditions checked against session and board
//! - **Authority**: the store contract, an in-memory store, its REST surface
//!   and an HTTP client for it
//! - **Local**: a client's cached view and move submission
//! - **Poller**: the periodic reconciliation task
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strictly_chess::Move;
//! use strictly_match::{InMemoryAuthority, MatchClient, Participant, SessionStatus};
//!
//! # async fn example() -> strictly_match::MatchResult<()> {
//! let store = Arc::new(InMemoryAuthority::new());
//! let alice = MatchClient::host(store.clone(), Participant::new("alice".into(), "Alice".into())).await?;
//! let match_id = alice.match_id().await;
//! let bob = MatchClient::join(store.clone(), match_id, Participant::new("bob".into(), "Bob".into())).await?;
//!
//! alice.refresh().await?;
//! alice.submit_move(Move::parse("e2e4").unwrap()).await?;
//! bob.refresh().await?;
//! assert!(bob.view().await.is_my_turn());
//! assert_eq!(bob.view().await.session().status(), SessionStatus::Playing);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod authority;
mod client;
mod clock;
mod config;
mod error;
mod local;
mod memory;
mod poller;
mod server;
mod session;
mod validator;

// Crate-level exports - Errors
pub use error::{MatchError, MatchErrorKind, MatchResult};

// Crate-level exports - Session state machine
pub use session::{
    ActiveMatch, ControlAction, FinishedMatch, MatchId, MatchSession, Outcome, OutcomeReason,
    Participant, PlayerId, RematchAgreement, Seats, SessionPhase, SessionStatus, Transition,
};

// Crate-level exports - Match clock
pub use clock::{DEFAULT_INCREMENT, DEFAULT_INITIAL_TIME, MatchClock};

// Crate-level exports - Move validation
pub use validator::{ActorHasTurn, MoveIsLegal, MoveValidator, SessionIsActive};

// Crate-level exports - Authoritative store
pub use authority::{
    AutomatedReply, ControlReceipt, ControlRequest, CreatedMatch, JoinedMatch, MatchAuthority,
    MoveReceipt, MoveRequest, SeatRequest, StatusSnapshot,
};
pub use memory::{
    AUTOMATED_PLAYER_ID, AutomatedOpponent, DEFAULT_RETENTION, FirstLegalMove, InMemoryAuthority,
};

// Crate-level exports - REST surface
pub use client::HttpAuthority;
pub use server::{AppState, router, serve};

// Crate-level exports - Client view and reconciliation
pub use local::{LocalMatch, MatchClient, Reconciliation};
pub use poller::{PollerHandle, ReconciliationPoller, SyncEvent};

// Crate-level exports - Configuration
pub use config::{ConfigError, ConfigOverrides, MatchConfig};
