use crate::types::{GameMode, UserId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    StartGame,
    Help,
    Rules,
    Join,
    Players,
    Begin,
    Status,
    Extend,
    Guess(Option<String>),
    Remove(Option<String>),
    StopGame,
    AddLocation(Option<String>),
    RemoveLocation(Option<String>),
    ListLocations,
    ResetLocations,
    Broadcast(Option<String>),
}

impl Command {
    /// Command name without the slash; also the cooldown action key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::StartGame => "startgame",
            Self::Help => "help",
            Self::Rules => "rules",
            Self::Join => "join",
            Self::Players => "players",
            Self::Begin => "begin",
            Self::Status => "status",
            Self::Extend => "extend",
            Self::Guess(_) => "guess",
            Self::Remove(_) => "remove",
            Self::StopGame => "stopgame",
            Self::AddLocation(_) => "addlocation",
            Self::RemoveLocation(_) => "removelocation",
            Self::ListLocations => "listlocations",
            Self::ResetLocations => "resetlocations",
            Self::Broadcast(_) => "broadcast",
        }
    }
}

/// Parses `/name[@bot] [args]`. Anything that is not a known command yields `None`.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim_start();
    let rest = text.strip_prefix('/')?;
    let (head, arg) = match rest.split_once(char::is_whitespace) {
        Some((head, arg)) => (head, non_empty(arg)),
        None => (rest, None),
    };
    let name = match head.split_once('@') {
        Some((name, _bot)) => name,
        None => head,
    };

    let command = match name {
        "start" => Command::Start,
        "startgame" => Command::StartGame,
        "help" => Command::Help,
        "rules" => Command::Rules,
        "join" => Command::Join,
        "players" => Command::Players,
        "begin" => Command::Begin,
        "status" => Command::Status,
        "extend" => Command::Extend,
        "guess" => Command::Guess(arg),
        "remove" => Command::Remove(arg),
        "stopgame" => Command::StopGame,
        "addlocation" => Command::AddLocation(arg),
        "removelocation" => Command::RemoveLocation(arg),
        "listlocations" => Command::ListLocations,
        "resetlocations" => Command::ResetLocations,
        "broadcast" => Command::Broadcast(arg),
        _ => return None,
    };
    Some(command)
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapAction {
    Mode(GameMode),
    Vote(UserId),
}

impl TapAction {
    pub fn payload(self) -> String {
        match self {
            Self::Mode(mode) => format!("mode:{}", mode.key()),
            Self::Vote(user) => format!("vote:{}", user.0),
        }
    }
}

pub fn parse_tap(data: &str) -> Option<TapAction> {
    let (kind, value) = data.split_once(':')?;
    match kind {
        "mode" => GameMode::parse(value).map(TapAction::Mode),
        "vote" => value.parse::<i64>().ok().map(|id| TapAction::Vote(UserId(id))),
        _ => None,
    }
}
