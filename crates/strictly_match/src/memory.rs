//! In-memory authoritative match store.
//!
//! Besides session and board, each record carries the match clock. The side
//! to move is charged from the moment its turn started; the clock stops
//! while the match is paused and for good once it is finished. Finished
//! matches are kept for a retention period so both clients can see the
//! result and arrange a rematch, then evicted when new matches are created.

use crate::authority::{
    AutomatedReply, ControlReceipt, CreatedMatch, JoinedMatch, MatchAuthority, MoveReceipt,
    StatusSnapshot,
};
use crate::clock::MatchClock;
use crate::error::{MatchError, MatchErrorKind, MatchResult};
use crate::session::{
    ControlAction, MatchId, MatchSession, Participant, SessionStatus, Transition,
};
use crate::validator::MoveValidator;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use strictly_chess::{Board, Color, Game, Move, all_legal_moves};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Player id under which the automated opponent is seated.
pub const AUTOMATED_PLAYER_ID: &str = "automated";

/// How long a finished match stays readable before eviction.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

// ─────────────────────────────────────────────────────────────
//  Automated opponent
// ─────────────────────────────────────────────────────────────

/// Move source for the single-opponent variant.
///
/// Only the submission contract matters to the store: given the board with
/// the opponent on move, return one of its legal moves.
pub trait AutomatedOpponent: Send + Sync + std::fmt::Debug {
    /// Display name used for the opponent's seat.
    fn name(&self) -> &str;

    /// Picks a move, or `None` if there is none.
    fn choose_move(&self, board: &Board) -> Option<Move>;
}

/// Plays the first legal move in generation order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstLegalMove;

impl AutomatedOpponent for FirstLegalMove {
    fn name(&self) -> &str {
        "First Legal Move"
    }

    fn choose_move(&self, board: &Board) -> Option<Move> {
        all_legal_moves(board).into_iter().next()
    }
}

// ─────────────────────────────────────────────────────────────
//  Store
// ─────────────────────────────────────────────────────────────

/// Everything the store keeps about one match.
#[derive(Debug, Clone)]
struct MatchRecord {
    session: MatchSession,
    game: Game,
    created_at: DateTime<Utc>,
    opponent: Option<Arc<dyn AutomatedOpponent>>,
    /// Clock as of `turn_started`.
    clock: MatchClock,
    /// When the side to move started thinking; `None` unless playing.
    turn_started: Option<Instant>,
    finished_at: Option<Instant>,
}

impl MatchRecord {
    fn new(
        session: MatchSession,
        clock: MatchClock,
        opponent: Option<Arc<dyn AutomatedOpponent>>,
    ) -> Self {
        let mut record = Self {
            session,
            game: Game::new(),
            created_at: Utc::now(),
            opponent,
            clock,
            turn_started: None,
            finished_at: None,
        };
        record.sync_clock();
        record
    }

    /// Time the side to move has spent on the current turn.
    fn thinking(&self) -> Duration {
        self.turn_started
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    /// Clock with the running turn charged.
    fn live_clock(&self) -> MatchClock {
        match (self.session.turn(), self.turn_started) {
            (Some(turn), Some(_)) => self.clock.charged(turn, self.thinking()),
            _ => self.clock,
        }
    }

    /// Starts or stops the running clock to follow the session phase.
    fn sync_clock(&mut self) {
        match self.session.status() {
            SessionStatus::Playing => {
                self.turn_started.get_or_insert_with(Instant::now);
            }
            SessionStatus::Finished => {
                self.turn_started = None;
                self.finished_at.get_or_insert_with(Instant::now);
            }
            SessionStatus::Waiting | SessionStatus::Paused => self.turn_started = None,
        }
    }

    /// Adopts `session` after a control action, banking the running turn.
    fn settle(&mut self, session: MatchSession) {
        self.clock = self.live_clock();
        self.turn_started = None;
        self.session = session;
        self.sync_clock();
    }

    /// Adopts `session` after `mover` played, crediting the increment.
    fn record_move(&mut self, session: MatchSession, mover: Color) {
        self.clock = self.clock.after_move(mover, self.thinking());
        self.turn_started = None;
        self.session = session;
        self.sync_clock();
    }

    /// Finishes the match if the side to move has run out of time.
    fn expire(&mut self) {
        let Some(turn) = self.session.turn() else {
            return;
        };
        if self.turn_started.is_none() || !self.clock.is_flagged(turn, self.thinking()) {
            return;
        }
        match self.session.time_out(turn) {
            Ok(done) => {
                warn!(match_id = self.session.id, loser = %turn, "Flag fell");
                self.settle(done);
            }
            Err(e) => warn!(error = %e, "Could not end match on time"),
        }
    }

    fn snapshot(&self) -> StatusSnapshot {
        let clock = self.live_clock();
        StatusSnapshot::new(&self.session, self.game.notation())
            .with_clock(clock.remaining(Color::White), clock.remaining(Color::Black))
    }
}

#[derive(Debug, Default)]
struct Store {
    matches: HashMap<MatchId, MatchRecord>,
    last_id: MatchId,
}

impl Store {
    fn allocate(&mut self) -> MatchId {
        self.last_id += 1;
        self.last_id
    }

    /// Drops matches finished longer than `retention` ago.
    fn prune(&mut self, retention: Duration) {
        let before = self.matches.len();
        self.matches.retain(|_, record| {
            record
                .finished_at
                .is_none_or(|at| at.elapsed() < retention)
        });
        let evicted = before - self.matches.len();
        if evicted > 0 {
            debug!(evicted, "Evicted finished matches");
        }
    }

    #[track_caller]
    fn record_mut(&mut self, match_id: MatchId) -> MatchResult<&mut MatchRecord> {
        self.matches.get_mut(&match_id).ok_or_else(|| {
            MatchError::new(
                MatchErrorKind::MatchNotFound,
                format!("No match with id {match_id}"),
            )
        })
    }
}

/// Authoritative store holding every match in memory.
///
/// One lock guards all matches. Validation and application of a move happen
/// under that lock, so two submissions for the same turn cannot both land.
#[derive(Debug, Clone)]
pub struct InMemoryAuthority {
    store: Arc<Mutex<Store>>,
    clock: MatchClock,
    retention: Duration,
}

impl Default for InMemoryAuthority {
    fn default() -> Self {
        Self {
            store: Arc::default(),
            clock: MatchClock::default(),
            retention: DEFAULT_RETENTION,
        }
    }
}

impl InMemoryAuthority {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating in-memory match store");
        Self::default()
    }

    /// Uses `clock` for every match created from now on.
    pub fn with_clock(self, clock: MatchClock) -> Self {
        Self { clock, ..self }
    }

    /// Keeps finished matches for `retention`.
    pub fn with_retention(self, retention: Duration) -> Self {
        Self { retention, ..self }
    }

    /// Creates a match against `opponent`. The human plays White.
    #[instrument(skip(self, host, opponent), fields(host = %host.id))]
    pub async fn create_automated_match(
        &self,
        host: Participant,
        opponent: Arc<dyn AutomatedOpponent>,
    ) -> MatchResult<CreatedMatch> {
        let mut store = self.store.lock().await;
        store.prune(self.retention);
        let match_id = store.allocate();
        let bot = Participant::new(AUTOMATED_PLAYER_ID.to_string(), opponent.name().to_string());
        let session = MatchSession::create(match_id, host).join(bot)?;
        let record = MatchRecord::new(session, self.clock, Some(opponent));
        let board_notation = record.game.notation();
        store.matches.insert(match_id, record);

        info!(match_id, "Automated match created");
        Ok(CreatedMatch {
            match_id,
            board_notation,
            color: Color::White,
        })
    }

    /// Asks the automated opponent of `match_id` for its move and applies it.
    ///
    /// # Errors
    ///
    /// `MatchNotFound`, `InvalidTransition` when the match has no automated
    /// opponent or it is not on move, `GameNotActive` unless playing.
    #[instrument(skip(self))]
    pub async fn submit_automated_opponent_move(
        &self,
        match_id: MatchId,
    ) -> MatchResult<AutomatedReply> {
        let mut store = self.store.lock().await;
        let record = store.record_mut(match_id)?;
        record.expire();
        play_automated(record)?.ok_or_else(|| {
            MatchError::new(
                MatchErrorKind::InvalidTransition,
                "Automated opponent is not on move",
            )
        })
    }

    /// Number of matches held, including finished ones.
    pub async fn match_count(&self) -> usize {
        self.store.lock().await.matches.len()
    }

    /// When `match_id` was created.
    pub async fn created_at(&self, match_id: MatchId) -> MatchResult<DateTime<Utc>> {
        let mut store = self.store.lock().await;
        Ok(store.record_mut(match_id)?.created_at)
    }
}

/// Plays the automated opponent's move if it holds the side to move.
///
/// Returns `Ok(None)` when there is no automated opponent or it is not its
/// turn.
fn play_automated(record: &mut MatchRecord) -> MatchResult<Option<AutomatedReply>> {
    let Some(opponent) = record.opponent.clone() else {
        return Ok(None);
    };
    let on_move = record.session.player_to_move().map(|p| p.id.as_str());
    if on_move != Some(AUTOMATED_PLAYER_ID) {
        return Ok(None);
    }

    let Some(choice) = opponent.choose_move(record.game.board()) else {
        warn!(match_id = record.session.id, "Automated opponent found no move");
        return Ok(None);
    };
    let mv = MoveValidator::validate(
        &record.session,
        record.game.board(),
        AUTOMATED_PLAYER_ID,
        &choice,
    )?;
    let mover = record.game.board().side_to_move();
    let end = record.game.play(mv)?;
    let session = record.session.after_move(AUTOMATED_PLAYER_ID, end)?;
    record.record_move(session, mover);

    info!(match_id = record.session.id, mv = %mv, "Automated opponent moved");
    Ok(Some(AutomatedReply {
        mv,
        status: record.session.status(),
    }))
}

fn rejected_move(record: &MatchRecord, err: &MatchError) -> MoveReceipt {
    MoveReceipt {
        accepted: false,
        board_notation: record.game.notation(),
        status: record.session.status(),
        reason: Some(err.user_message()),
        error: Some(err.kind),
        automated_reply: None,
    }
}

#[async_trait]
impl MatchAuthority for InMemoryAuthority {
    #[instrument(skip(self, host), fields(host = %host.id))]
    async fn create_match(&self, host: Participant) -> MatchResult<CreatedMatch> {
        let mut store = self.store.lock().await;
        store.prune(self.retention);
        let match_id = store.allocate();
        let record = MatchRecord::new(MatchSession::create(match_id, host), self.clock, None);
        let board_notation = record.game.notation();
        store.matches.insert(match_id, record);

        Ok(CreatedMatch {
            match_id,
            board_notation,
            color: Color::White,
        })
    }

    #[instrument(skip(self, joiner), fields(joiner = %joiner.id))]
    async fn join_match(
        &self,
        match_id: MatchId,
        joiner: Participant,
    ) -> MatchResult<JoinedMatch> {
        let mut store = self.store.lock().await;
        let record = store.record_mut(match_id)?;
        let joiner_id = joiner.id.clone();
        record.session = record.session.join(joiner)?;
        record.sync_clock();

        Ok(JoinedMatch {
            match_id,
            board_notation: record.game.notation(),
            color: record.session.color_of(&joiner_id).unwrap_or(Color::Black),
        })
    }

    #[instrument(skip(self, mv), fields(mv = %mv))]
    async fn submit_move(
        &self,
        match_id: MatchId,
        actor: &str,
        mv: Move,
    ) -> MatchResult<MoveReceipt> {
        let mut store = self.store.lock().await;
        let record = store.record_mut(match_id)?;
        record.expire();

        let legal = match MoveValidator::validate(&record.session, record.game.board(), actor, &mv)
        {
            Ok(legal) => legal,
            Err(e) => return Ok(rejected_move(record, &e)),
        };

        let mut game = record.game.clone();
        let applied = game
            .play(legal)
            .map_err(MatchError::from)
            .and_then(|end| record.session.after_move(actor, end));
        let session = match applied {
            Ok(session) => session,
            Err(e) => return Ok(rejected_move(record, &e)),
        };
        let mover = record.game.board().side_to_move();
        record.game = game;
        record.record_move(session, mover);
        debug!(move_count = record.session.move_count, "Move accepted");

        let automated_reply = play_automated(record)?;

        Ok(MoveReceipt {
            accepted: true,
            board_notation: record.game.notation(),
            status: record.session.status(),
            reason: None,
            error: None,
            automated_reply,
        })
    }

    #[instrument(skip(self))]
    async fn get_status(&self, match_id: MatchId) -> MatchResult<StatusSnapshot> {
        let mut store = self.store.lock().await;
        let record = store.record_mut(match_id)?;
        record.expire();
        Ok(record.snapshot())
    }

    #[instrument(skip(self))]
    async fn control_action(
        &self,
        match_id: MatchId,
        actor: &str,
        action: ControlAction,
    ) -> MatchResult<ControlReceipt> {
        let mut store = self.store.lock().await;
        let record = store.record_mut(match_id)?;
        record.expire();

        let transition = match record.session.control(actor, action) {
            Ok(transition) => transition,
            Err(e) => {
                return Ok(ControlReceipt {
                    accepted: false,
                    status: record.session.status(),
                    new_match_id: None,
                    reason: Some(e.user_message()),
                    error: Some(e.kind),
                });
            }
        };

        match transition {
            Transition::Updated(next) => {
                record.settle(next);
                Ok(ControlReceipt {
                    accepted: true,
                    status: record.session.status(),
                    new_match_id: None,
                    reason: None,
                    error: None,
                })
            }
            Transition::RematchAgreed(agreement) => {
                let opponent = record.opponent.clone();
                let new_id = store.allocate();
                let (closed, fresh) = agreement.open(new_id);
                let status = closed.status();

                let mut rematch = MatchRecord::new(fresh, self.clock, opponent);
                play_automated(&mut rematch)?;
                store.record_mut(match_id)?.settle(closed);
                store.matches.insert(new_id, rematch);

                info!(match_id, new_id, "Rematch created");
                Ok(ControlReceipt {
                    accepted: true,
                    status,
                    new_match_id: Some(new_id),
                    reason: None,
                    error: None,
                })
            }
        }
    }
}
