use thiserror::Error;

use crate::constants::{MAX_DISCUSSION_MINUTES, MIN_DISCUSSION_MINUTES, MIN_PLAYERS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Precondition,
    Permission,
    Lookup,
}

/// Rejections reported inline to the chat. None of them change session state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("⚠️ Usage: {0}")]
    Usage(&'static str),
    #[error(
        "⚠️ Please choose between {} and {} minutes.",
        MIN_DISCUSSION_MINUTES,
        MAX_DISCUSSION_MINUTES
    )]
    MinutesOutOfRange,

    #[error("⚠️ Game already running!")]
    AlreadyRunning,
    #[error("❌ No active game! Start with /startgame")]
    NoActiveGame,
    #[error("⚠️ No game is running!")]
    NoGameRunning,
    #[error("⚠️ You already joined!")]
    AlreadyJoined,
    #[error("⚠️ Not in mode selection phase!")]
    NotInModeSelection,
    #[error("⚠️ Game has not been set up yet!")]
    NotSetUp,
    #[error("⚠️ Need at least {} players to start!", MIN_PLAYERS)]
    NotEnoughPlayers,
    #[error("⚠️ The round has already begun!")]
    RoundInProgress,
    #[error("❌ You can only extend time during discussion phase.")]
    ExtendOutsideDiscussion,
    #[error("❌ You can only guess during discussion.")]
    GuessOutsideDiscussion,
    #[error("❌ Only Spy can guess!")]
    NotSpy,
    #[error("⚠️ Voting is not open!")]
    VotingClosed,
    #[error("⚠️ Only players in this round can vote!")]
    NotAPlayer,
    #[error("⚠️ You already voted!")]
    AlreadyVoted,
    #[error("ℹ️ No locations available.")]
    NoLocations,

    #[error("❌ {0}")]
    NotPermitted(&'static str),

    #[error("❌ Could not find that user.")]
    UnknownUser,
    #[error("⚠️ That user is not in the game.")]
    NotInGame,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Usage(_) | Self::MinutesOutOfRange => ErrorKind::Input,
            Self::NotPermitted(_) => ErrorKind::Permission,
            Self::UnknownUser | Self::NotInGame => ErrorKind::Lookup,
            _ => ErrorKind::Precondition,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// The user never opened a private chat with the bot, blocked it, or is otherwise
    /// unreachable one-to-one.
    #[error("cannot message user privately: {0}")]
    PrivateChatUnavailable(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl TransportError {
    pub fn is_private_chat_unavailable(&self) -> bool {
        matches!(self, Self::PrivateChatUnavailable(_))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("database connection lock poisoned")]
    Poisoned,
    #[error("storage worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Name cannot be empty.")]
    EmptyName,
    #[error("Already added.")]
    AlreadyAdded,
    #[error("Not found among custom locations.")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
