//! The match state machine.
//!
//! Owns the board, the turn, the round tallies and the mode. Connection
//! tasks submit intents; the machine validates them and answers with the
//! events to deliver. It performs no I/O itself, so every method can run
//! inside the shared-state critical section.

use noughts_protocol::{GameMode, Role, ServerToClient, Winner};
use thiserror::Error;
use tracing::info;

use crate::board::{Board, PlaceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitingForOpponent,
    InProgress,
    RoundOver,
    MatchOver,
}

/// Where an event goes: to both sessions, or back to the intent's sender.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Broadcast(ServerToClient),
    Reply(ServerToClient),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejected {
    #[error("no round in progress")]
    RoundNotActive,
    #[error("not your turn")]
    NotYourTurn,
    #[error(transparent)]
    Board(#[from] PlaceError),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RestartRejected {
    #[error("waiting for an opponent")]
    WaitingForOpponent,
    #[error("round still in progress")]
    RoundInProgress,
}

#[derive(Debug)]
pub struct Match {
    board: Board,
    current_turn: Role,
    mode: GameMode,
    round: u32,
    wins_x: u32,
    wins_o: u32,
    terminal: Option<Winner>,
    phase: Phase,
}

impl Match {
    pub fn new(mode: GameMode) -> Self {
        Self {
            board: Board::new(),
            current_turn: Role::X,
            mode,
            round: 1,
            wins_x: 0,
            wins_o: 0,
            terminal: None,
            phase: Phase::WaitingForOpponent,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn current_turn(&self) -> Role {
        self.current_turn
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn wins(&self, role: Role) -> u32 {
        match role {
            Role::X => self.wins_x,
            Role::O => self.wins_o,
        }
    }

    pub fn terminal(&self) -> Option<Winner> {
        self.terminal
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The second seat was filled.
    ///
    /// A decided best-of-N match survives a disconnect, so a fresh pairing
    /// can land in `MatchOver`: the final tallies are shown and play waits
    /// for an explicit restart instead of starting a round.
    pub fn opponent_joined(&mut self) -> Vec<Effect> {
        match self.phase {
            Phase::WaitingForOpponent => {
                self.current_turn = Role::X;
                self.phase = Phase::InProgress;
                info!(round = self.round, "both seats filled, round starts");
                vec![Effect::Broadcast(ServerToClient::StartGame {
                    current_turn: self.current_turn,
                })]
            }
            Phase::MatchOver => vec![Effect::Broadcast(ServerToClient::Score {
                wins_x: self.wins_x,
                wins_o: self.wins_o,
                round: self.round,
            })],
            _ => Vec::new(),
        }
    }

    /// A session left. Reset to waiting — except that a decided best-of-N
    /// match keeps its final tallies until an explicit restart.
    pub fn opponent_left(&mut self) {
        let decided =
            self.phase == Phase::MatchOver && matches!(self.mode, GameMode::BestOfN { .. });
        if decided {
            info!("opponent left after decided match, tallies preserved");
            return;
        }
        self.board.reset();
        self.current_turn = Role::X;
        self.terminal = None;
        self.phase = Phase::WaitingForOpponent;
    }

    /// Validate and apply one move intent.
    ///
    /// On rejection nothing changes and nothing is broadcast; the caller
    /// reports the error to the sender alone.
    pub fn apply_move(&mut self, role: Role, x: i32, y: i32) -> Result<Vec<Effect>, MoveRejected> {
        if self.phase != Phase::InProgress {
            return Err(MoveRejected::RoundNotActive);
        }
        if role != self.current_turn {
            return Err(MoveRejected::NotYourTurn);
        }
        self.board.place(x, y, role)?;

        let mut effects = vec![Effect::Broadcast(ServerToClient::UpdateBoard {
            x,
            y,
            player: role,
        })];

        if let Some(winner) = self.board.winner() {
            self.terminal = Some(winner.into());
            effects.push(self.finish_won_round(winner));
        } else if self.board.is_full() {
            self.terminal = Some(Winner::Draw);
            self.phase = Phase::RoundOver;
            info!(round = self.round, "round drawn");
            effects.push(Effect::Broadcast(ServerToClient::GameOver {
                winner: Winner::Draw,
            }));
        } else {
            self.current_turn = self.current_turn.opponent();
            effects.push(Effect::Broadcast(ServerToClient::NextTurn {
                player: self.current_turn,
            }));
        }
        Ok(effects)
    }

    // The `match_decided` event fires on the transition into `MatchOver`
    // and nowhere else; once there, no further move is accepted, so the
    // emission cannot repeat.
    fn finish_won_round(&mut self, winner: Role) -> Effect {
        match self.mode {
            GameMode::SingleRound => {
                self.phase = Phase::RoundOver;
                info!(%winner, "round won");
                Effect::Broadcast(ServerToClient::GameOver {
                    winner: winner.into(),
                })
            }
            GameMode::BestOfN { wins_needed } => {
                match winner {
                    Role::X => self.wins_x += 1,
                    Role::O => self.wins_o += 1,
                }
                if self.wins(winner) >= wins_needed {
                    self.phase = Phase::MatchOver;
                    info!(%winner, wins_x = self.wins_x, wins_o = self.wins_o, "match decided");
                    Effect::Broadcast(ServerToClient::MatchDecided {
                        wins_x: self.wins_x,
                        wins_o: self.wins_o,
                    })
                } else {
                    self.phase = Phase::RoundOver;
                    info!(%winner, round = self.round, wins_x = self.wins_x, wins_o = self.wins_o, "round won");
                    Effect::Broadcast(ServerToClient::RoundOver {
                        wins_x: self.wins_x,
                        wins_o: self.wins_o,
                        round: self.round,
                    })
                }
            }
        }
    }

    /// Restart intent from either session.
    ///
    /// After a round: next round, tallies kept. After a decided match:
    /// brand-new match, tallies and round number reset. Anywhere else the
    /// intent is rejected.
    pub fn restart(&mut self, opponent_present: bool) -> Result<Vec<Effect>, RestartRejected> {
        match self.phase {
            Phase::WaitingForOpponent => Err(RestartRejected::WaitingForOpponent),
            Phase::InProgress => Err(RestartRejected::RoundInProgress),
            Phase::RoundOver => {
                self.board.reset();
                self.terminal = None;
                self.current_turn = Role::X;
                self.round += 1;
                self.phase = Phase::InProgress;
                info!(round = self.round, "round restarted");
                Ok(vec![Effect::Broadcast(ServerToClient::RestartGame {
                    current_turn: self.current_turn,
                    round: self.round,
                })])
            }
            Phase::MatchOver => {
                self.board.reset();
                self.terminal = None;
                self.current_turn = Role::X;
                self.wins_x = 0;
                self.wins_o = 0;
                self.round = 1;
                self.phase = if opponent_present {
                    Phase::InProgress
                } else {
                    Phase::WaitingForOpponent
                };
                info!("new match started");
                Ok(vec![Effect::Broadcast(ServerToClient::RestartGame {
                    current_turn: self.current_turn,
                    round: self.round,
                })])
            }
        }
    }

    /// Mode change intent. Honored only from the host while the mode is
    /// still open; everyone else gets the authoritative mode echoed back.
    pub fn select_mode(&mut self, role: Role, mode: GameMode) -> Vec<Effect> {
        if role == Role::X && !self.mode_locked() {
            self.mode = mode;
            info!(%mode, "game mode changed");
            vec![Effect::Broadcast(ServerToClient::ModeUpdate { mode })]
        } else {
            vec![Effect::Reply(ServerToClient::ModeUpdate { mode: self.mode })]
        }
    }

    // The mode is open while waiting for the opponent and up to the first
    // move of round 1 of a fresh match.
    fn mode_locked(&self) -> bool {
        match self.phase {
            Phase::WaitingForOpponent => false,
            Phase::InProgress => {
                !(self.round == 1 && self.wins_x == 0 && self.wins_o == 0 && self.board.is_empty())
            }
            Phase::RoundOver | Phase::MatchOver => true,
        }
    }

    pub fn score(&self) -> Vec<Effect> {
        vec![Effect::Broadcast(ServerToClient::Score {
            wins_x: self.wins_x,
            wins_o: self.wins_o,
            round: self.round,
        })]
    }
}
