use serde::{Deserialize, Serialize};
use std::fmt;

pub mod frame;

pub use frame::{FrameCodec, FrameError, MAX_FRAME_LEN};

/// ---- Roles ----
///
/// The two fixed player identities. The first connection is always `X` and
/// acts as the host; the second is `O`. `X` opens every round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    X,
    O,
}

impl Role {
    pub fn opponent(self) -> Role {
        match self {
            Role::X => Role::O,
            Role::O => Role::X,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::X => write!(f, "X"),
            Role::O => write!(f, "O"),
        }
    }
}

/// ---- Game Modes ----
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// One round, then the match is over.
    SingleRound,
    /// First role to `wins_needed` round wins takes the match.
    BestOfN { wins_needed: u32 },
}

impl Default for GameMode {
    fn default() -> Self {
        GameMode::SingleRound
    }
}

/// Round wins needed to take a best-of-N match unless configured otherwise.
pub const DEFAULT_WINS_NEEDED: u32 = 2;

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameMode::SingleRound => write!(f, "single round"),
            GameMode::BestOfN { wins_needed } => write!(f, "first to {wins_needed} wins"),
        }
    }
}

/// ---- Round Outcomes ----
///
/// Terminal result of a single round. Serializes as `"X"`, `"O"` or `"Draw"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Winner {
    X,
    O,
    Draw,
}

impl From<Role> for Winner {
    fn from(role: Role) -> Self {
        match role {
            Role::X => Winner::X,
            Role::O => Winner::O,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::X => write!(f, "X"),
            Winner::O => write!(f, "O"),
            Winner::Draw => write!(f, "Draw"),
        }
    }
}

/// ---- Wire Messages ----
///
/// Every record carries a `"type"` discriminator so either side can dispatch
/// without peeking at payload fields. Records travel inside length-prefixed
/// frames (see [`frame`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientToServer {
    /// Place the sender's mark at (x, y). Columns are `x`, rows are `y`,
    /// both 0-based from the top-left.
    Move { x: i32, y: i32 },
    /// Start the next round, or a fresh match once one is decided.
    Restart,
    /// Change the game mode. Only honored from the host before play starts.
    ModeSelect { mode: GameMode },
    /// Ask for the current tallies and round number.
    ScoreRequest,
    ChatMessage { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerToClient {
    /// Role assignment, sent once right after the connection is accepted.
    Symbol { symbol: Role },
    /// Both seats are filled; play begins.
    StartGame { current_turn: Role },
    /// An accepted move.
    UpdateBoard { x: i32, y: i32, player: Role },
    NextTurn { player: Role },
    /// A round ended with a win (single-round mode) or a draw (any mode).
    GameOver { winner: Winner },
    /// Best-of-N only: a round ended but the match is still open.
    RoundOver { wins_x: u32, wins_o: u32, round: u32 },
    /// Best-of-N only: a tally reached the threshold. Emitted exactly once
    /// per decided match.
    MatchDecided { wins_x: u32, wins_o: u32 },
    RestartGame { current_turn: Role, round: u32 },
    Score { wins_x: u32, wins_o: u32, round: u32 },
    OpponentDisconnected,
    ServerFull,
    /// The authoritative mode, broadcast on change and echoed to rejected
    /// `mode_select` senders.
    ModeUpdate { mode: GameMode },
    ChatMessage {
        player: Role,
        text: String,
        timestamp: String,
    },
    /// Request-scoped rejection, sent to the offending sender only.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_opponent_flips() {
        assert_eq!(Role::X.opponent(), Role::O);
        assert_eq!(Role::O.opponent(), Role::X);
    }

    #[test]
    fn requests_carry_type_discriminator() {
        let json = serde_json::to_value(ClientToServer::Move { x: 1, y: 2 }).unwrap();
        assert_eq!(json["type"], "move");
        assert_eq!(json["x"], 1);
        assert_eq!(json["y"], 2);

        let json = serde_json::to_value(ClientToServer::ScoreRequest).unwrap();
        assert_eq!(json["type"], "score_request");
    }

    #[test]
    fn events_carry_type_discriminator() {
        let json = serde_json::to_value(ServerToClient::GameOver {
            winner: Winner::Draw,
        })
        .unwrap();
        assert_eq!(json["type"], "game_over");
        assert_eq!(json["winner"], "Draw");

        let json = serde_json::to_value(ServerToClient::Symbol { symbol: Role::X }).unwrap();
        assert_eq!(json["type"], "symbol");
        assert_eq!(json["symbol"], "X");
    }

    #[test]
    fn mode_serializes_by_name() {
        let json = serde_json::to_value(ServerToClient::ModeUpdate {
            mode: GameMode::SingleRound,
        })
        .unwrap();
        assert_eq!(json["mode"], "single_round");

        let json = serde_json::to_value(ServerToClient::ModeUpdate {
            mode: GameMode::BestOfN { wins_needed: 2 },
        })
        .unwrap();
        assert_eq!(json["mode"]["best_of_n"]["wins_needed"], 2);
    }

    #[test]
    fn request_roundtrip() {
        let original = ClientToServer::ChatMessage {
            text: "gg {} braces".to_string(),
        };
        let json = serde_json::to_string(&original).unwrap();
        let back: ClientToServer = serde_json::from_str(&json).unwrap();
        assert_eq!(original, back);
    }
}
