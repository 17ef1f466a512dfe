use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::{interval_at, sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands::{parse_command, parse_tap, Command, TapAction};
use crate::constants::{
    BROADCAST_DELAY, BUTTON_COOLDOWN, COMMAND_COOLDOWN, COOLDOWN_PRUNE_EVERY, DISCUSSION_TICK,
    TAP_COOLDOWN_KEY, VOTING_WINDOW,
};
use crate::cooldown::{CooldownOptions, Cooldowns, ScopeKey};
use crate::error::{GameError, HandlerError, LocationError, StoreError};
use crate::game::roles::assign_roles;
use crate::game::timer::TimerHandle;
use crate::game::{GuessOutcome, Session, Tick, VoteOutcome};
use crate::locations::build_pool;
use crate::messages::{self, escape_html, Roster};
use crate::persistence::{LocationStore, UserRegistry};
use crate::store::SessionStore;
use crate::transport::ChatTransport;
use crate::types::{
    ChatId, GameMode, InboundEvent, InboundKind, Profile, Role, Stage, TapRef, UserId,
};

#[derive(Clone, Debug)]
pub struct GameSettings {
    pub command_cooldown: Duration,
    pub button_cooldown: Duration,
    pub voting_window: Duration,
    pub broadcast_delay: Duration,
    /// `None` disables `/broadcast`.
    pub owner: Option<UserId>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            command_cooldown: COMMAND_COOLDOWN,
            button_cooldown: BUTTON_COOLDOWN,
            voting_window: VOTING_WINDOW,
            broadcast_delay: BROADCAST_DELAY,
            owner: None,
        }
    }
}

struct Inner {
    transport: Arc<dyn ChatTransport>,
    sessions: Arc<SessionStore>,
    users: Arc<dyn UserRegistry>,
    locations: Arc<dyn LocationStore>,
    cooldowns: Cooldowns,
    settings: GameSettings,
}

/// Routes inbound events to the chat's session. Cheap to clone; timer tasks hold a clone.
#[derive(Clone)]
pub struct GameService {
    inner: Arc<Inner>,
}

impl GameService {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        users: Arc<dyn UserRegistry>,
        locations: Arc<dyn LocationStore>,
        settings: GameSettings,
    ) -> Self {
        let cooldowns = Cooldowns::new(
            CooldownOptions {
                cooldown: settings.command_cooldown,
                prune_every: COOLDOWN_PRUNE_EVERY,
            },
            CooldownOptions {
                cooldown: settings.button_cooldown,
                prune_every: COOLDOWN_PRUNE_EVERY,
            },
        );
        Self {
            inner: Arc::new(Inner {
                transport,
                sessions: Arc::new(SessionStore::new()),
                users,
                locations,
                cooldowns,
                settings,
            }),
        }
    }

    pub fn sessions(&self) -> Arc<SessionStore> {
        self.inner.sessions.clone()
    }

    pub fn settings(&self) -> &GameSettings {
        &self.inner.settings
    }

    /// Failures stay inside this chat's handler; they are logged and never propagate.
    pub async fn handle(&self, event: InboundEvent) {
        let InboundEvent { chat, sender, kind } = event;
        let user = sender.id;
        let result = match kind {
            InboundKind::Text { text, mentions } => {
                self.on_text(chat, sender, &text, &mentions).await
            }
            InboundKind::Tap { tap, data } => self.on_tap(sender, &tap, &data).await,
        };
        if let Err(err) = result {
            warn!(chat_id = %chat, user_id = %user, error = %err, "handler failed");
        }
    }

    async fn on_text(
        &self,
        chat: ChatId,
        sender: Profile,
        text: &str,
        mentions: &[Profile],
    ) -> Result<(), HandlerError> {
        let Some(command) = parse_command(text) else {
            return self.on_free_text(chat, text).await;
        };

        let key = ScopeKey::new(chat, sender.id, command.name());
        if !self.inner.cooldowns.commands.allow(key) {
            debug!(chat_id = %chat, user_id = %sender.id, command = command.name(), "command throttled");
            return self.reply(chat, messages::COMMAND_THROTTLED).await;
        }

        let name = command.name();
        let outcome = match command {
            Command::Start => self.start(chat, &sender).await,
            Command::StartGame => self.open_lobby(chat, sender).await,
            Command::Help => self.reply(chat, &messages::help()).await,
            Command::Rules => self.reply(chat, &messages::rules()).await,
            Command::Join => self.join(chat, sender).await,
            Command::Players => self.list_players(chat).await,
            Command::Begin => self.begin_round(chat).await,
            Command::Status => self.status(chat).await,
            Command::Extend => self.extend(chat).await,
            Command::Guess(arg) => self.guess(chat, sender.id, arg).await,
            Command::Remove(arg) => self.remove_player(chat, sender.id, arg, mentions).await,
            Command::StopGame => self.stop(chat, sender.id).await,
            Command::AddLocation(arg) => self.add_location(chat, sender.id, arg).await,
            Command::RemoveLocation(arg) => self.remove_location(chat, sender.id, arg).await,
            Command::ListLocations => self.list_locations(chat).await,
            Command::ResetLocations => self.reset_locations(chat, sender.id).await,
            Command::Broadcast(arg) => self.broadcast(chat, sender.id, arg).await,
        };

        match outcome {
            Err(HandlerError::Game(err)) => {
                debug!(chat_id = %chat, command = name, kind = ?err.kind(), "command rejected");
                self.reply(chat, &escape_html(&err.to_string())).await
            }
            Err(HandlerError::Store(err)) => {
                warn!(chat_id = %chat, command = name, error = %err, "store failure");
                self.reply(chat, &messages::something_went_wrong()).await
            }
            other => other,
        }
    }

    async fn on_free_text(&self, chat: ChatId, text: &str) -> Result<(), HandlerError> {
        let Some(session) = self.inner.sessions.get(chat) else {
            return Ok(());
        };
        let answer = session.lock().await.supply_minutes(text);
        match answer {
            None => Ok(()),
            Some(Err(err)) => self.reply(chat, &escape_html(&err.to_string())).await,
            Some(Ok(minutes)) => {
                info!(chat_id = %chat, minutes, "discussion time set");
                self.inner
                    .transport
                    .send_buttons(chat, &messages::minutes_set(minutes), &messages::mode_buttons())
                    .await?;
                Ok(())
            }
        }
    }

    async fn on_tap(&self, sender: Profile, tap: &TapRef, data: &str) -> Result<(), HandlerError> {
        let chat = tap.chat;
        let key = ScopeKey::new(chat, sender.id, TAP_COOLDOWN_KEY);
        if !self.inner.cooldowns.buttons.allow(key) {
            debug!(chat_id = %chat, user_id = %sender.id, "tap throttled");
            self.inner
                .transport
                .answer_tap(tap, Some(messages::TAP_THROTTLED), false)
                .await?;
            return Ok(());
        }

        let Some(action) = parse_tap(data) else {
            debug!(chat_id = %chat, data, "unrecognised tap payload");
            self.inner.transport.answer_tap(tap, None, false).await?;
            return Ok(());
        };

        let outcome = match action {
            TapAction::Mode(mode) => self.select_mode(tap, mode).await,
            TapAction::Vote(accused) => self.vote(tap, sender.id, accused).await,
        };
        match outcome {
            Err(HandlerError::Game(err)) => {
                debug!(chat_id = %chat, kind = ?err.kind(), "tap rejected");
                self.inner
                    .transport
                    .answer_tap(tap, Some(&err.to_string()), true)
                    .await?;
                Ok(())
            }
            other => other,
        }
    }

    async fn start(&self, chat: ChatId, sender: &Profile) -> Result<(), HandlerError> {
        self.reply(chat, &messages::welcome()).await?;
        let users = self.inner.users.clone();
        let user = sender.id;
        run_blocking(move || users.record_user(user)).await?;
        debug!(user_id = %user, "user recorded");
        Ok(())
    }

    async fn open_lobby(&self, chat: ChatId, opener: Profile) -> Result<(), HandlerError> {
        let session = self.inner.sessions.session(chat);
        let opener_id = opener.id;
        session.lock().await.open_lobby(opener)?;
        info!(chat_id = %chat, user_id = %opener_id, "lobby opened");
        self.reply(chat, &messages::lobby_opened()).await
    }

    async fn select_mode(&self, tap: &TapRef, mode: GameMode) -> Result<(), HandlerError> {
        let session = self.inner.sessions.session(tap.chat);
        session.lock().await.select_mode(mode)?;
        info!(chat_id = %tap.chat, mode = mode.key(), "mode selected");
        self.inner.transport.answer_tap(tap, None, false).await?;
        self.inner
            .transport
            .edit_tapped(tap, &messages::mode_selected(mode))
            .await?;
        Ok(())
    }

    async fn join(&self, chat: ChatId, profile: Profile) -> Result<(), HandlerError> {
        let session = self.inner.sessions.session(chat);
        let text = messages::joined(&profile);
        session.lock().await.join(profile)?;
        self.reply(chat, &text).await
    }

    async fn list_players(&self, chat: ChatId) -> Result<(), HandlerError> {
        let session = self.inner.sessions.session(chat);
        let text = {
            let guard = session.lock().await;
            messages::players(Roster::new(guard.profiles()), guard.players())
        };
        self.reply(chat, &text).await
    }

    async fn status(&self, chat: ChatId) -> Result<(), HandlerError> {
        let session = self.inner.sessions.session(chat);
        let text = {
            let guard = session.lock().await;
            if guard.is_started() {
                messages::status(
                    Roster::new(guard.profiles()),
                    guard.mode(),
                    guard.stage(),
                    guard.players(),
                )
            } else {
                messages::no_active_game()
            }
        };
        self.reply(chat, &text).await
    }

    /// Roles are only committed once every player has received their briefing.
    /// Any failed delivery resets the chat and names the unreachable players.
    async fn begin_round(&self, chat: ChatId) -> Result<(), HandlerError> {
        let session = self.inner.sessions.session(chat);
        let request = session.lock().await.prepare_round()?;

        let locations = self.inner.locations.clone();
        let custom = run_blocking(move || locations.list(chat)).await?;
        let pool = build_pool(&custom);
        let assignment = {
            let mut rng = rand::rng();
            assign_roles(&mut rng, &request.players, request.mode, &pool)?
        };

        let deliveries = request.players.iter().map(|player| {
            let player = *player;
            let text = match assignment.role_of(player) {
                Some(Role::Spy) => messages::spy_briefing(),
                Some(Role::FakeCivilian) => messages::civilian_briefing(
                    assignment.decoy.as_deref().unwrap_or(&assignment.location),
                ),
                _ => messages::civilian_briefing(&assignment.location),
            };
            let transport = self.inner.transport.clone();
            async move { (player, transport.send_private(player, &text).await) }
        });

        let mut failed = Vec::new();
        for (player, delivery) in join_all(deliveries).await {
            if let Err(err) = delivery {
                warn!(
                    chat_id = %chat,
                    user_id = %player,
                    private_chat_unavailable = err.is_private_chat_unavailable(),
                    error = %err,
                    "role delivery failed"
                );
                failed.push(player);
            }
        }

        let mut guard = session.lock().await;
        if guard.id() != request.session_id || guard.stage() != Stage::Joining {
            info!(chat_id = %chat, "session changed during role delivery, round dropped");
            return Ok(());
        }

        if !failed.is_empty() {
            let text = messages::round_aborted(Roster::new(guard.profiles()), &failed);
            guard.reset();
            drop(guard);
            info!(chat_id = %chat, failed = failed.len(), "round aborted");
            return self.reply(chat, &text).await;
        }

        let (timer, token) = TimerHandle::new();
        let timer_id = timer.id();
        let discussion_secs = guard.discussion_secs_remaining();
        guard.commit_round(assignment, timer);
        drop(guard);

        info!(
            chat_id = %chat,
            mode = request.mode.key(),
            players = request.players.len(),
            timer_id,
            "round started"
        );
        self.spawn_round_timer(chat, timer_id, token);
        self.reply(chat, &messages::round_started(discussion_secs)).await
    }

    fn spawn_round_timer(&self, chat: ChatId, timer_id: u64, token: CancellationToken) {
        let service = self.clone();
        tokio::spawn(async move {
            let voting_opened = tokio::select! {
                _ = token.cancelled() => false,
                opened = service.count_down(chat, timer_id) => opened,
            };
            if !voting_opened {
                debug!(chat_id = %chat, timer_id, "discussion timer stopped");
                return;
            }

            let window = service.inner.settings.voting_window;
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(chat_id = %chat, timer_id, "voting window closed early");
                    return;
                }
                _ = sleep(window) => {}
            }
            service.resolve_voting(chat, Some(timer_id)).await;
        });
    }

    /// Returns `true` once voting has opened, `false` if the round went away first.
    async fn count_down(&self, chat: ChatId, timer_id: u64) -> bool {
        let Some(session) = self.inner.sessions.get(chat) else {
            return false;
        };
        let mut ticks = interval_at(Instant::now() + DISCUSSION_TICK, DISCUSSION_TICK);
        loop {
            ticks.tick().await;
            let (tick, buttons) = {
                let mut guard = session.lock().await;
                if !guard.owns_timer(timer_id) {
                    return false;
                }
                let tick = guard.tick_discussion();
                let buttons = match &tick {
                    Tick::VotingOpened(players) => {
                        messages::vote_buttons(Roster::new(guard.profiles()), players)
                    }
                    _ => Vec::new(),
                };
                (tick, buttons)
            };

            match tick {
                Tick::Running => {}
                Tick::MinuteMark(minutes) => {
                    self.notify(chat, &messages::minutes_left(minutes)).await;
                }
                Tick::VotingOpened(players) => {
                    info!(chat_id = %chat, players = players.len(), "voting opened");
                    let text = messages::voting_opened(self.inner.settings.voting_window.as_secs());
                    if let Err(err) = self.inner.transport.send_buttons(chat, &text, &buttons).await {
                        warn!(chat_id = %chat, error = %err, "failed to post ballot");
                    }
                    return true;
                }
                Tick::Stopped => return false,
            }
        }
    }

    async fn extend(&self, chat: ChatId) -> Result<(), HandlerError> {
        let session = self.inner.sessions.session(chat);
        let remaining = session.lock().await.extend()?;
        self.reply(chat, &messages::extended(remaining)).await
    }

    async fn guess(
        &self,
        chat: ChatId,
        user: UserId,
        arg: Option<String>,
    ) -> Result<(), HandlerError> {
        let session = self.inner.sessions.session(chat);
        let mut guard = session.lock().await;
        match guard.guess(user, arg.as_deref())? {
            GuessOutcome::Correct { location } => {
                guard.reset();
                drop(guard);
                info!(chat_id = %chat, user_id = %user, "spy guessed the location");
                self.reply(chat, &messages::guess_correct(&location)).await
            }
            GuessOutcome::Wrong => {
                drop(guard);
                self.reply(chat, &messages::guess_wrong()).await
            }
        }
    }

    async fn vote(&self, tap: &TapRef, voter: UserId, accused: UserId) -> Result<(), HandlerError> {
        let session = self.inner.sessions.session(tap.chat);
        let outcome = session.lock().await.cast_vote(voter, accused)?;
        debug!(chat_id = %tap.chat, user_id = %voter, accused = %accused, "vote registered");
        let answered = self
            .inner
            .transport
            .answer_tap(tap, Some(messages::VOTE_REGISTERED), false)
            .await;
        if outcome == VoteOutcome::Complete {
            self.resolve_voting(tap.chat, None).await;
        }
        answered?;
        Ok(())
    }

    /// Settles the ballot at most once: only a session still in `Voting` (and, for the
    /// timer path, still owning `timer_id`) produces a result.
    pub async fn resolve_voting(&self, chat: ChatId, timer_id: Option<u64>) {
        let Some(session) = self.inner.sessions.get(chat) else {
            return;
        };
        let text = {
            let mut guard = session.lock().await;
            if timer_id.is_some_and(|id| !guard.owns_timer(id)) {
                debug!(chat_id = %chat, "stale timer ignored");
                return;
            }
            let Some(resolution) = guard.begin_resolution() else {
                return;
            };
            let text = messages::result(Roster::new(guard.profiles()), &resolution);
            info!(
                chat_id = %chat,
                verdict = ?resolution.verdict,
                votes = resolution.breakdown.len(),
                "round resolved"
            );
            guard.reset();
            text
        };
        self.notify(chat, &text).await;
    }

    async fn remove_player(
        &self,
        chat: ChatId,
        sender: UserId,
        arg: Option<String>,
        mentions: &[Profile],
    ) -> Result<(), HandlerError> {
        let Some(query) = arg else {
            return Err(GameError::Usage("/remove @username or /remove Name").into());
        };
        let session = self.inner.sessions.session(chat);
        let starter = session.lock().await.starter();
        if !self.is_privileged(chat, sender, starter).await {
            return Err(GameError::NotPermitted(messages::REMOVE_PLAYER_DENIED).into());
        }

        let (text, voting_complete, target) = {
            let mut guard = session.lock().await;
            let target = resolve_target(&guard, &query, mentions).ok_or(GameError::UnknownUser)?;
            let text = messages::player_removed(Roster::new(guard.profiles()), target);
            let voting_complete = guard.remove_player(target)?;
            (text, voting_complete, target)
        };
        info!(chat_id = %chat, user_id = %target, "player removed");
        self.reply(chat, &text).await?;
        if voting_complete {
            self.resolve_voting(chat, None).await;
        }
        Ok(())
    }

    async fn stop(&self, chat: ChatId, sender: UserId) -> Result<(), HandlerError> {
        let session = self.inner.sessions.session(chat);
        let (started, starter) = {
            let guard = session.lock().await;
            (guard.is_started(), guard.starter())
        };
        if !started {
            return Err(GameError::NoGameRunning.into());
        }
        if !self.is_privileged(chat, sender, starter).await {
            return Err(GameError::NotPermitted(messages::STOP_DENIED).into());
        }
        self.inner.sessions.reset(chat).await;
        info!(chat_id = %chat, user_id = %sender, "game stopped");
        self.reply(chat, &messages::game_stopped()).await
    }

    async fn add_location(
        &self,
        chat: ChatId,
        sender: UserId,
        arg: Option<String>,
    ) -> Result<(), HandlerError> {
        if !self.is_admin(chat, sender).await {
            return Err(GameError::NotPermitted(messages::ADD_LOCATION_DENIED).into());
        }
        let Some(name) = arg else {
            return Err(GameError::Usage("/addlocation <name>").into());
        };
        let locations = self.inner.locations.clone();
        match run_blocking(move || locations.add(chat, &name)).await {
            Ok(stored) => {
                info!(chat_id = %chat, location = %stored, "custom location added");
                self.reply(chat, &messages::location_added(&stored)).await
            }
            Err(LocationError::Store(err)) => Err(err.into()),
            Err(rejection) => {
                self.reply(chat, &messages::location_rejected(&rejection.to_string()))
                    .await
            }
        }
    }

    async fn remove_location(
        &self,
        chat: ChatId,
        sender: UserId,
        arg: Option<String>,
    ) -> Result<(), HandlerError> {
        if !self.is_admin(chat, sender).await {
            return Err(GameError::NotPermitted(messages::REMOVE_LOCATION_DENIED).into());
        }
        let Some(name) = arg else {
            return Err(GameError::Usage("/removelocation <name>").into());
        };
        let locations = self.inner.locations.clone();
        let lookup = name.clone();
        match run_blocking(move || locations.remove(chat, &lookup)).await {
            Ok(()) => {
                info!(chat_id = %chat, location = %name, "custom location removed");
                self.reply(chat, &messages::location_removed(&name)).await
            }
            Err(LocationError::Store(err)) => Err(err.into()),
            Err(rejection) => {
                self.reply(chat, &messages::location_rejected(&rejection.to_string()))
                    .await
            }
        }
    }

    async fn list_locations(&self, chat: ChatId) -> Result<(), HandlerError> {
        let locations = self.inner.locations.clone();
        let custom = run_blocking(move || locations.list(chat)).await?;
        self.reply(chat, &messages::location_list(&build_pool(&custom)))
            .await
    }

    async fn reset_locations(&self, chat: ChatId, sender: UserId) -> Result<(), HandlerError> {
        if !self.is_admin(chat, sender).await {
            return Err(GameError::NotPermitted(messages::RESET_LOCATIONS_DENIED).into());
        }
        let locations = self.inner.locations.clone();
        run_blocking(move || locations.reset_all(chat)).await?;
        info!(chat_id = %chat, "custom locations reset");
        self.reply(chat, &messages::locations_reset()).await
    }

    /// Owner-only. Failures are counted, never retried.
    async fn broadcast(
        &self,
        chat: ChatId,
        sender: UserId,
        arg: Option<String>,
    ) -> Result<(), HandlerError> {
        if self.inner.settings.owner != Some(sender) {
            return Err(GameError::NotPermitted(messages::BROADCAST_DENIED).into());
        }
        let Some(message) = arg else {
            return Err(GameError::Usage("/broadcast <message>").into());
        };

        let users = self.inner.users.clone();
        let recipients = run_blocking(move || users.list_all_users()).await?;
        let html = escape_html(&message);
        let delay = self.inner.settings.broadcast_delay;
        let (mut sent, mut failed) = (0usize, 0usize);
        for user in recipients {
            match self.inner.transport.send_private(user, &html).await {
                Ok(()) => sent += 1,
                Err(err) => {
                    debug!(user_id = %user, error = %err, "broadcast delivery failed");
                    failed += 1;
                }
            }
            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
        info!(sent, failed, "broadcast finished");
        self.reply(chat, &messages::broadcast_report(sent, failed)).await
    }

    async fn is_privileged(&self, chat: ChatId, user: UserId, starter: Option<UserId>) -> bool {
        starter == Some(user) || self.is_admin(chat, user).await
    }

    /// A failed lookup counts as "not an admin".
    async fn is_admin(&self, chat: ChatId, user: UserId) -> bool {
        match self.inner.transport.is_admin(chat, user).await {
            Ok(admin) => admin,
            Err(err) => {
                warn!(chat_id = %chat, user_id = %user, error = %err, "admin lookup failed");
                false
            }
        }
    }

    async fn reply(&self, chat: ChatId, html: &str) -> Result<(), HandlerError> {
        self.inner.transport.send_text(chat, html).await?;
        Ok(())
    }

    /// For background paths with no caller to report to.
    async fn notify(&self, chat: ChatId, html: &str) {
        if let Err(err) = self.inner.transport.send_text(chat, html).await {
            warn!(chat_id = %chat, error = %err, "failed to notify chat");
        }
    }
}

/// Text mention first, then a joined player's username or first name, then a raw id.
fn resolve_target(session: &Session, query: &str, mentions: &[Profile]) -> Option<UserId> {
    if let Some(mentioned) = mentions.first() {
        return Some(mentioned.id);
    }
    session
        .find_player(query)
        .or_else(|| query.trim().parse::<i64>().ok().map(UserId))
}

async fn run_blocking<T, E, F>(work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<StoreError> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(err) => Err(StoreError::from(err).into()),
    }
}
