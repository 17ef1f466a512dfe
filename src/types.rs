use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Spy,
    Civilian,
    FakeCivilian,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameMode {
    Classic,
    FakeCivilian,
    DoubleSpy,
    Chaos,
}

impl GameMode {
    pub const ALL: [GameMode; 4] = [
        GameMode::Classic,
        GameMode::FakeCivilian,
        GameMode::DoubleSpy,
        GameMode::Chaos,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "classic" => Some(Self::Classic),
            "fake_civilian" => Some(Self::FakeCivilian),
            "double_spy" => Some(Self::DoubleSpy),
            "chaos" => Some(Self::Chaos),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::FakeCivilian => "fake_civilian",
            Self::DoubleSpy => "double_spy",
            Self::Chaos => "chaos",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Classic => "Classic",
            Self::FakeCivilian => "Fake Civilian",
            Self::DoubleSpy => "Double Spy",
            Self::Chaos => "Chaos",
        }
    }

    pub fn button_label(self) -> &'static str {
        match self {
            Self::Classic => "🎯 Classic Mode",
            Self::FakeCivilian => "🤔 Fake Civilian Mode",
            Self::DoubleSpy => "🕵️ Double Spy Mode",
            Self::Chaos => "🎲 Chaos Mode",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupPhase {
    AwaitingTime,
    AwaitingMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Waiting,
    Joining,
    Discussion,
    Voting,
    Finished,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Joining => "joining",
            Self::Discussion => "discussion",
            Self::Voting => "voting",
            Self::Finished => "finished",
        }
    }
}

/// A chat member as seen on an inbound event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub id: UserId,
    pub first_name: String,
    pub username: Option<String>,
}

impl Profile {
    pub fn new(id: UserId, first_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Handle needed to answer or edit the message behind a button tap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TapRef {
    pub chat: ChatId,
    pub callback_id: String,
    pub message_id: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundKind {
    Text {
        text: String,
        mentions: Vec<Profile>,
    },
    Tap {
        tap: TapRef,
        data: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundEvent {
    pub chat: ChatId,
    pub sender: Profile,
    pub kind: InboundKind,
}

impl InboundEvent {
    pub fn text(chat: ChatId, sender: Profile, text: impl Into<String>) -> Self {
        Self {
            chat,
            sender,
            kind: InboundKind::Text {
                text: text.into(),
                mentions: Vec::new(),
            },
        }
    }

    pub fn tap(
        chat: ChatId,
        sender: Profile,
        callback_id: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            chat,
            sender,
            kind: InboundKind::Tap {
                tap: TapRef {
                    chat,
                    callback_id: callback_id.into(),
                    message_id: None,
                },
                data: data.into(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}
