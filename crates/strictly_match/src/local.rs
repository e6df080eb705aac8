//! The client's local view of a match.
//!
//! [`LocalMatch`] caches the session and board the client last saw. The
//! authoritative store always wins: [`LocalMatch::reconcile`] replaces the
//! cache with a fetched snapshot instead of patching it, so feeding the same
//! snapshot twice changes nothing the second time.

use crate::authority::{ControlReceipt, MatchAuthority, MoveReceipt, StatusSnapshot};
use crate::error::{MatchError, MatchErrorKind, MatchResult};
use crate::session::{ControlAction, MatchId, MatchSession, Participant, PlayerId, SessionStatus};
use crate::validator::MoveValidator;
use std::sync::Arc;
use std::time::Duration;
use strictly_chess::{Board, Color, Game, Move, MoveRecord, all_legal_moves, board_notation};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// What a reconciliation changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The snapshot matched the cache.
    Unchanged,
    /// A local move was in flight or submitted since the fetch; the
    /// snapshot was ignored.
    Skipped,
    /// A rematch replaced the match wholesale.
    Rematched {
        /// Id of the new match.
        new_id: MatchId,
        /// Colour this client now plays.
        color: Color,
    },
    /// The session status changed.
    StatusChanged {
        /// Status before.
        from: SessionStatus,
        /// Status now.
        to: SessionStatus,
    },
    /// The board changed without a status change.
    BoardChanged {
        /// The opponent's move, when it could be identified.
        opponent_move: Option<MoveRecord>,
        /// Whether this client is now on move.
        your_turn: bool,
    },
    /// Offers or other session details changed.
    SessionUpdated,
}

/// Cached session and board for one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMatch {
    session: MatchSession,
    game: Game,
    player_id: PlayerId,
    color: Color,
    history: Vec<MoveRecord>,
    in_flight: bool,
    generation: u64,
    white_time: Option<Duration>,
    black_time: Option<Duration>,
}

impl LocalMatch {
    /// Builds the local view for `player_id` from a snapshot.
    ///
    /// # Errors
    ///
    /// `NotAParticipant` if the player is not in the match, `CorruptSnapshot`
    /// if the board cannot be decoded.
    #[instrument(skip(snapshot), fields(match_id = snapshot.match_id))]
    pub fn from_snapshot(player_id: &str, snapshot: &StatusSnapshot) -> MatchResult<Self> {
        let session = snapshot.session.clone();
        if !session.is_participant(player_id) {
            return Err(MatchError::new(
                MatchErrorKind::NotAParticipant,
                format!("{player_id} is not in match {}", session.id),
            ));
        }
        // The host of a waiting match will play White.
        let color = session.color_of(player_id).unwrap_or(Color::White);
        let game = Game::from_notation(&snapshot.board_notation)?;
        Ok(Self {
            session,
            game,
            player_id: player_id.to_string(),
            color,
            history: Vec::new(),
            in_flight: false,
            generation: 0,
            white_time: snapshot.remaining(Color::White),
            black_time: snapshot.remaining(Color::Black),
        })
    }

    /// Cached session.
    pub fn session(&self) -> &MatchSession {
        &self.session
    }

    /// Cached board.
    pub fn board(&self) -> &Board {
        self.game.board()
    }

    /// Cached board in notation form.
    pub fn notation(&self) -> String {
        self.game.notation()
    }

    /// This client's player id.
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Colour this client plays.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Move history for display.
    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    /// Remaining time of `color` as of the last adopted snapshot.
    pub fn remaining(&self, color: Color) -> Option<Duration> {
        match color {
            Color::White => self.white_time,
            Color::Black => self.black_time,
        }
    }

    /// Whether a move submission is awaiting its round trip.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Counter bumped by every local move submission.
    ///
    /// A snapshot fetched under one generation must not be applied under
    /// another; see [`LocalMatch::reconcile_fetched`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this client may move now.
    pub fn is_my_turn(&self) -> bool {
        self.session.status() == SessionStatus::Playing && self.session.turn() == Some(self.color)
    }

    /// Merges an authoritative snapshot into the cache.
    ///
    /// In order: a different match id replaces everything (rematch), a
    /// different status adopts the snapshot, a different board is decoded
    /// and adopted, and any remaining session difference is adopted.
    /// Clock readings are refreshed without counting as a change.
    ///
    /// # Errors
    ///
    /// `CorruptSnapshot` when the board cannot be decoded and
    /// `StaleSnapshot` when a replacement match does not seat this
    /// player. The cache is unchanged on error.
    #[instrument(skip(self, snapshot), fields(local_id = self.session.id, match_id = snapshot.match_id))]
    pub fn reconcile(&mut self, snapshot: &StatusSnapshot) -> MatchResult<Reconciliation> {
        if self.in_flight {
            debug!("Move in flight, skipping snapshot");
            return Ok(Reconciliation::Skipped);
        }

        let change = self.merge(snapshot)?;
        self.white_time = snapshot.remaining(Color::White);
        self.black_time = snapshot.remaining(Color::Black);
        Ok(change)
    }

    fn merge(&mut self, snapshot: &StatusSnapshot) -> MatchResult<Reconciliation> {
        if snapshot.match_id != self.session.id {
            return self.replace(snapshot);
        }

        let from = self.session.status();
        if snapshot.status != from {
            let game = self.follow(&snapshot.board_notation)?;
            self.adopt_board(game);
            self.session = snapshot.session.clone();
            if let Some(color) = self.session.color_of(&self.player_id) {
                self.color = color;
            }
            info!(%from, to = %snapshot.status, "Status changed");
            return Ok(Reconciliation::StatusChanged {
                from,
                to: snapshot.status,
            });
        }

        if snapshot.board_notation != self.game.notation() {
            let game = self.follow(&snapshot.board_notation)?;
            let opponent_move = self.adopt_board(game);
            self.session = snapshot.session.clone();
            let your_turn = self.is_my_turn();
            info!(your_turn, "Board changed");
            return Ok(Reconciliation::BoardChanged {
                opponent_move,
                your_turn,
            });
        }

        if snapshot.session != self.session {
            self.session = snapshot.session.clone();
            debug!("Session details changed");
            return Ok(Reconciliation::SessionUpdated);
        }

        Ok(Reconciliation::Unchanged)
    }

    /// Reconciles a snapshot fetched while the view was at `fetched_at`.
    ///
    /// A local move submitted since the fetch makes the snapshot older than
    /// the view, so it is skipped like one arriving mid-flight.
    ///
    /// # Errors
    ///
    /// As for [`LocalMatch::reconcile`].
    pub fn reconcile_fetched(
        &mut self,
        snapshot: &StatusSnapshot,
        fetched_at: u64,
    ) -> MatchResult<Reconciliation> {
        if self.generation != fetched_at {
            debug!(
                fetched_at,
                generation = self.generation,
                "Local move since fetch, skipping snapshot"
            );
            return Ok(Reconciliation::Skipped);
        }
        self.reconcile(snapshot)
    }

    fn replace(&mut self, snapshot: &StatusSnapshot) -> MatchResult<Reconciliation> {
        if !snapshot.session.is_participant(&self.player_id) {
            return Err(MatchError::new(
                MatchErrorKind::StaleSnapshot,
                format!(
                    "match {} does not follow match {}",
                    snapshot.match_id, self.session.id
                ),
            ));
        }
        debug!(old_id = self.session.id, "Replacing local match");

        let mut next = Self::from_snapshot(&self.player_id, snapshot)?;
        next.generation = self.generation;
        let new_id = next.session.id;
        let color = next.color;
        *self = next;
        info!(new_id, %color, "Rematch adopted");
        Ok(Reconciliation::Rematched { new_id, color })
    }

    /// Game reaching `notation` from the cached board.
    ///
    /// When one legal move explains the change it is played, keeping
    /// repetition counts and recording the move. Otherwise the board is
    /// decoded afresh.
    fn follow(&self, notation: &str) -> MatchResult<(Game, Option<MoveRecord>)> {
        let target = board_notation::decode(notation)?;
        let target_notation = board_notation::encode(&target);

        for mv in all_legal_moves(self.game.board()) {
            let mut game = self.game.clone();
            if game.play(mv).is_ok() && game.notation() == target_notation {
                let record = game.history().last().cloned();
                return Ok((game, record));
            }
        }
        Ok((Game::from_board(target), None))
    }

    fn adopt_board(&mut self, (game, record): (Game, Option<MoveRecord>)) -> Option<MoveRecord> {
        self.game = game;
        if let Some(record) = &record {
            let record = MoveRecord::new(self.history.len() + 1, record.piece, record.mv);
            debug!(mv = %record, "Opponent move identified");
            self.history.push(record);
        }
        record
    }

    /// Plays `mv` for `mover` on the cached game and session.
    fn apply(&mut self, mover: &str, mv: Move) -> MatchResult<()> {
        let mut game = self.game.clone();
        let end = game.play(mv)?;
        let session = self.session.after_move(mover, end)?;
        if let Some(record) = game.history().last() {
            self.history
                .push(MoveRecord::new(self.history.len() + 1, record.piece, record.mv));
        }
        self.game = game;
        self.session = session;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
//  Client
// ─────────────────────────────────────────────────────────────

/// A participant's handle on one match.
///
/// Cheap to clone; clones share the local view.
#[derive(Clone)]
pub struct MatchClient {
    local: Arc<Mutex<LocalMatch>>,
    authority: Arc<dyn MatchAuthority>,
}

impl std::fmt::Debug for MatchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchClient").finish_non_exhaustive()
    }
}

impl MatchClient {
    /// Attaches `player_id` to an existing match.
    ///
    /// # Errors
    ///
    /// Whatever fetching the snapshot or building the view reports.
    #[instrument(skip(authority))]
    pub async fn attach(
        authority: Arc<dyn MatchAuthority>,
        player_id: &str,
        match_id: MatchId,
    ) -> MatchResult<Self> {
        let snapshot = authority.get_status(match_id).await?;
        let local = LocalMatch::from_snapshot(player_id, &snapshot)?;
        info!(color = %local.color, status = %local.session.status(), "Attached to match");
        Ok(Self {
            local: Arc::new(Mutex::new(local)),
            authority,
        })
    }

    /// Creates a match hosted by `me` and attaches to it.
    ///
    /// # Errors
    ///
    /// As for [`MatchAuthority::create_match`] and [`MatchClient::attach`].
    pub async fn host(authority: Arc<dyn MatchAuthority>, me: Participant) -> MatchResult<Self> {
        let player_id = me.id.clone();
        let created = authority.create_match(me).await?;
        Self::attach(authority, &player_id, created.match_id).await
    }

    /// Joins `match_id` as `me` and attaches to it.
    ///
    /// # Errors
    ///
    /// As for [`MatchAuthority::join_match`] and [`MatchClient::attach`].
    pub async fn join(
        authority: Arc<dyn MatchAuthority>,
        match_id: MatchId,
        me: Participant,
    ) -> MatchResult<Self> {
        let player_id = me.id.clone();
        authority.join_match(match_id, me).await?;
        Self::attach(authority, &player_id, match_id).await
    }

    /// Snapshot of the local view.
    pub async fn view(&self) -> LocalMatch {
        self.local.lock().await.clone()
    }

    /// Id of the match currently followed.
    pub async fn match_id(&self) -> MatchId {
        self.local.lock().await.session.id
    }

    /// Validates, applies and submits a move.
    ///
    /// The move is applied to the local view before the round trip and
    /// rolled back if the store rejects it or cannot be reached. Only one
    /// submission may be in flight.
    ///
    /// # Errors
    ///
    /// `MoveInFlight`, any validation error, the store's in-band rejection
    /// reason, or `CollaboratorUnavailable`.
    #[instrument(skip(self, mv), fields(mv = %mv))]
    pub async fn submit_move(&self, mv: Move) -> MatchResult<MoveReceipt> {
        let (match_id, player_id, legal, prior) = {
            let mut local = self.local.lock().await;
            if local.in_flight {
                return Err(MatchError::new(
                    MatchErrorKind::MoveInFlight,
                    "Previous move has not resolved",
                ));
            }
            let legal =
                MoveValidator::validate(&local.session, local.board(), &local.player_id, &mv)?;
            let prior = local.clone();
            let player_id = local.player_id.clone();
            local.apply(&player_id, legal)?;
            local.generation += 1;
            local.in_flight = true;
            (local.session.id, player_id, legal, prior)
        };

        let result = self.authority.submit_move(match_id, &player_id, legal).await;

        let mut local = self.local.lock().await;
        local.in_flight = false;
        match result {
            Ok(receipt) if receipt.accepted => {
                if let Some(reply) = &receipt.automated_reply {
                    let mover = local.session.player_to_move().map(|p| p.id.clone());
                    if let Some(mover) = mover {
                        if let Err(e) = local.apply(&mover, reply.mv) {
                            warn!(error = %e, "Could not replay automated reply");
                        }
                    }
                }
                if receipt.board_notation != local.notation() {
                    match local.follow(&receipt.board_notation) {
                        Ok(game) => {
                            local.adopt_board(game);
                        }
                        Err(e) => {
                            warn!(error = %e, "Receipt board unreadable, keeping local board");
                        }
                    }
                }
                info!(status = %receipt.status, "Move accepted");
                Ok(receipt)
            }
            Ok(receipt) => {
                *local = prior;
                let kind = receipt.error.unwrap_or(MatchErrorKind::IllegalMove);
                warn!(%kind, "Move rejected by store");
                Err(MatchError::new(kind, receipt.reason.unwrap_or_default()))
            }
            Err(e) => {
                *local = prior;
                warn!(error = %e, "Move submission failed, local move rolled back");
                Err(e)
            }
        }
    }

    /// Requests a control action and refreshes the local view.
    ///
    /// # Errors
    ///
    /// The store's in-band rejection, or a transport failure.
    #[instrument(skip(self))]
    pub async fn control(&self, action: ControlAction) -> MatchResult<ControlReceipt> {
        let (match_id, player_id) = {
            let local = self.local.lock().await;
            (local.session.id, local.player_id.clone())
        };
        let receipt = self
            .authority
            .control_action(match_id, &player_id, action)
            .await?;
        if !receipt.accepted {
            let kind = receipt.error.unwrap_or(MatchErrorKind::InvalidTransition);
            return Err(MatchError::new(kind, receipt.reason.unwrap_or_default()));
        }
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Refresh after control action failed");
        }
        Ok(receipt)
    }

    /// Runs one fetch and reconcile cycle.
    ///
    /// When the fetched match has been superseded by a rematch, the new
    /// match is fetched and adopted instead. A local move submitted while
    /// the fetch was out makes the result `Skipped`.
    ///
    /// # Errors
    ///
    /// Transport failures and undecodable snapshots.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> MatchResult<Reconciliation> {
        let (match_id, fetched_at) = {
            let local = self.local.lock().await;
            (local.session.id, local.generation)
        };
        let mut snapshot = self.authority.get_status(match_id).await?;
        if let Some(new_id) = snapshot.rematch_id {
            debug!(new_id, "Match superseded, fetching rematch");
            snapshot = self.authority.get_status(new_id).await?;
        }
        self.local
            .lock()
            .await
            .reconcile_fetched(&snapshot, fetched_at)
    }
}
