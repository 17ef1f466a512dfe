use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::{
    DEFAULT_DISCUSSION_SECS, EXTEND_SECS, MAX_DISCUSSION_MINUTES, MIN_DISCUSSION_MINUTES,
    MIN_PLAYERS,
};
use crate::error::GameError;
use crate::types::{GameMode, Profile, Role, SetupPhase, Stage, UserId};

pub mod roles;
pub mod timer;
pub mod voting;

use self::roles::RoundAssignment;
use self::timer::TimerHandle;
use self::voting::{Resolution, Vote};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Snapshot taken before role delivery; the round only commits if the session
/// is still the same one afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundRequest {
    pub session_id: u64,
    pub players: Vec<UserId>,
    pub mode: GameMode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tick {
    Running,
    MinuteMark(u32),
    VotingOpened(Vec<UserId>),
    Stopped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuessOutcome {
    Correct { location: String },
    Wrong,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    Registered,
    Complete,
}

/// Game state for one chat.
#[derive(Debug)]
pub struct Session {
    id: u64,
    players: Vec<UserId>,
    profiles: HashMap<UserId, Profile>,
    roles: HashMap<UserId, Role>,
    votes: Vec<Vote>,
    started: bool,
    mode: Option<GameMode>,
    setup_phase: Option<SetupPhase>,
    stage: Stage,
    starter: Option<UserId>,
    location: Option<String>,
    decoy: Option<String>,
    discussion_secs_remaining: u32,
    timer: Option<TimerHandle>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            players: Vec::new(),
            profiles: HashMap::new(),
            roles: HashMap::new(),
            votes: Vec::new(),
            started: false,
            mode: None,
            setup_phase: None,
            stage: Stage::Waiting,
            starter: None,
            location: None,
            decoy: None,
            discussion_secs_remaining: DEFAULT_DISCUSSION_SECS,
            timer: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn players(&self) -> &[UserId] {
        &self.players
    }

    pub fn profiles(&self) -> &HashMap<UserId, Profile> {
        &self.profiles
    }

    pub fn roles(&self) -> &HashMap<UserId, Role> {
        &self.roles
    }

    pub fn role_of(&self, user: UserId) -> Option<Role> {
        self.roles.get(&user).copied()
    }

    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn mode(&self) -> Option<GameMode> {
        self.mode
    }

    pub fn setup_phase(&self) -> Option<SetupPhase> {
        self.setup_phase
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn starter(&self) -> Option<UserId> {
        self.starter
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn decoy(&self) -> Option<&str> {
        self.decoy.as_deref()
    }

    pub fn discussion_secs_remaining(&self) -> u32 {
        self.discussion_secs_remaining
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn owns_timer(&self, timer_id: u64) -> bool {
        self.timer.as_ref().map(|timer| timer.id()) == Some(timer_id)
    }

    pub fn open_lobby(&mut self, opener: Profile) -> Result<(), GameError> {
        if self.started {
            return Err(GameError::AlreadyRunning);
        }
        self.reset();
        self.started = true;
        self.stage = Stage::Joining;
        self.setup_phase = Some(SetupPhase::AwaitingTime);
        self.starter = Some(opener.id);
        self.profiles.insert(opener.id, opener);
        Ok(())
    }

    /// `None` means the text is not a minutes answer and is ignored without
    /// feedback: either the lobby is not waiting for one or the text is not a number.
    pub fn supply_minutes(&mut self, raw: &str) -> Option<Result<u32, GameError>> {
        if self.setup_phase != Some(SetupPhase::AwaitingTime) {
            return None;
        }
        let trimmed = raw.trim();
        let minutes = match trimmed.parse::<i64>() {
            Ok(minutes) => minutes,
            Err(_) if is_integer_literal(trimmed) => {
                return Some(Err(GameError::MinutesOutOfRange));
            }
            Err(_) => return None,
        };
        if !(MIN_DISCUSSION_MINUTES..=MAX_DISCUSSION_MINUTES).contains(&minutes) {
            return Some(Err(GameError::MinutesOutOfRange));
        }
        let minutes = minutes as u32;
        self.discussion_secs_remaining = minutes * 60;
        self.setup_phase = Some(SetupPhase::AwaitingMode);
        Some(Ok(minutes))
    }

    pub fn select_mode(&mut self, mode: GameMode) -> Result<(), GameError> {
        if self.setup_phase != Some(SetupPhase::AwaitingMode) {
            return Err(GameError::NotInModeSelection);
        }
        self.mode = Some(mode);
        self.setup_phase = None;
        Ok(())
    }

    pub fn join(&mut self, profile: Profile) -> Result<(), GameError> {
        if !self.started {
            return Err(GameError::NoActiveGame);
        }
        if self.players.contains(&profile.id) {
            return Err(GameError::AlreadyJoined);
        }
        self.players.push(profile.id);
        self.profiles.insert(profile.id, profile);
        Ok(())
    }

    /// Resolves `@username`, a username or a first name to a joined player.
    pub fn find_player(&self, query: &str) -> Option<UserId> {
        let needle = query.trim().trim_start_matches('@').to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let joined = || {
            self.players
                .iter()
                .filter_map(|player| self.profiles.get(player))
        };
        joined()
            .find(|profile| {
                profile
                    .username
                    .as_deref()
                    .is_some_and(|username| username.to_lowercase() == needle)
            })
            .or_else(|| joined().find(|profile| profile.first_name.to_lowercase() == needle))
            .map(|profile| profile.id)
    }

    /// Returns whether the removal leaves every remaining player with a vote in.
    /// Only the removed player's own ballot is dropped; votes cast against them
    /// stay final and still count.
    pub fn remove_player(&mut self, user: UserId) -> Result<bool, GameError> {
        let Some(index) = self.players.iter().position(|player| *player == user) else {
            return Err(GameError::NotInGame);
        };
        self.players.remove(index);
        self.votes.retain(|vote| vote.voter != user);
        Ok(self.voting_complete())
    }

    pub fn prepare_round(&self) -> Result<RoundRequest, GameError> {
        let Some(mode) = self.mode.filter(|_| self.started) else {
            return Err(GameError::NotSetUp);
        };
        if self.stage != Stage::Joining {
            return Err(GameError::RoundInProgress);
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }
        Ok(RoundRequest {
            session_id: self.id,
            players: self.players.clone(),
            mode,
        })
    }

    /// Commits every role at once and takes ownership of the discussion timer,
    /// cancelling any previous one.
    pub fn commit_round(&mut self, assignment: RoundAssignment, timer: TimerHandle) {
        self.roles = assignment.roles;
        self.location = Some(assignment.location);
        self.decoy = assignment.decoy;
        self.votes.clear();
        self.stage = Stage::Discussion;
        self.timer = Some(timer);
    }

    pub fn tick_discussion(&mut self) -> Tick {
        if self.stage != Stage::Discussion {
            return Tick::Stopped;
        }
        self.discussion_secs_remaining = self.discussion_secs_remaining.saturating_sub(1);
        if self.discussion_secs_remaining == 0 {
            self.stage = Stage::Voting;
            return Tick::VotingOpened(self.players.clone());
        }
        if self.discussion_secs_remaining % 60 == 0 {
            return Tick::MinuteMark(self.discussion_secs_remaining / 60);
        }
        Tick::Running
    }

    pub fn extend(&mut self) -> Result<u32, GameError> {
        if self.stage != Stage::Discussion {
            return Err(GameError::ExtendOutsideDiscussion);
        }
        self.discussion_secs_remaining += EXTEND_SECS;
        Ok(self.discussion_secs_remaining)
    }

    pub fn guess(&self, user: UserId, raw: Option<&str>) -> Result<GuessOutcome, GameError> {
        if self.stage != Stage::Discussion {
            return Err(GameError::GuessOutsideDiscussion);
        }
        // A removed player keeps their role for the tally but is out of the round.
        if !self.players.contains(&user) || self.role_of(user) != Some(Role::Spy) {
            return Err(GameError::NotSpy);
        }
        let Some(raw) = raw else {
            return Err(GameError::Usage("/guess <location>"));
        };
        let location = self.location.clone().unwrap_or_default();
        if raw.trim().to_lowercase() == location.to_lowercase() {
            Ok(GuessOutcome::Correct { location })
        } else {
            Ok(GuessOutcome::Wrong)
        }
    }

    pub fn cast_vote(&mut self, voter: UserId, accused: UserId) -> Result<VoteOutcome, GameError> {
        if self.stage != Stage::Voting {
            return Err(GameError::VotingClosed);
        }
        if !self.players.contains(&voter) {
            return Err(GameError::NotAPlayer);
        }
        if self.votes.iter().any(|vote| vote.voter == voter) {
            return Err(GameError::AlreadyVoted);
        }
        if !self.players.contains(&accused) {
            return Err(GameError::NotInGame);
        }
        self.votes.push(Vote { voter, accused });
        if self.voting_complete() {
            Ok(VoteOutcome::Complete)
        } else {
            Ok(VoteOutcome::Registered)
        }
    }

    pub fn voting_complete(&self) -> bool {
        self.stage == Stage::Voting && self.votes.len() == self.players.len()
    }

    /// Moves `Voting` to `Finished` and computes the result. Any later call gets
    /// `None`, so competing resolution paths settle exactly once.
    pub fn begin_resolution(&mut self) -> Option<Resolution> {
        if self.stage != Stage::Voting {
            return None;
        }
        self.stage = Stage::Finished;
        Some(voting::resolve(&self.players, &self.roles, &self.votes))
    }

    pub fn cancel_timer(&mut self) {
        self.timer = None;
    }

    /// Cancels the timer and swaps in a fresh session, returning the old one.
    pub fn reset(&mut self) -> Session {
        self.cancel_timer();
        std::mem::replace(self, Session::new())
    }
}

/// Digits with an optional sign, whatever their magnitude.
fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}
