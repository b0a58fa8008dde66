//! Number guessing game service
//!
//! Per-player guessing sessions, the multiplication table exercise and the
//! HTTP API serving both.

pub mod api;
pub mod config;
pub mod error;
pub mod game;
pub mod random;
pub mod store;
pub mod table;

pub use api::{
    create_router, AppState, DispatchRequest, ErrorResponse, JsonOrForm, NumberInput,
    NumberRequest, Player, StartResponse, TableResponse, PLAYER_ID_HEADER,
};
pub use config::{Config, ConsistencyMode};
pub use error::{GameError, Result};
pub use game::{
    GameSession, GuessOutcome, GuessVerdict, SessionPhase, StateSnapshot, SECRET_MAX, SECRET_MIN,
};
pub use random::{FixedSecret, ScriptedSecrets, SecretSource, ThreadRngSource};
pub use store::{spawn_idle_sweeper, PlayerId, SessionStore, MAX_PLAYER_ID_LEN};
pub use table::{multiplication_table, MultiplicationTable, TABLE_SIZE};
