use std::collections::HashMap;

use crate::commands::TapAction;
use crate::constants::format_clock;
use crate::game::voting::{Resolution, Verdict};
use crate::types::{Button, GameMode, Profile, Stage, UserId};

pub const COMMAND_THROTTLED: &str = "⚠️ Slow down a bit.";
pub const TAP_THROTTLED: &str = "⏳ Easy there…";
pub const VOTE_REGISTERED: &str = "✅ Vote registered!";

pub const ADD_LOCATION_DENIED: &str = "Only group admins can add locations.";
pub const REMOVE_LOCATION_DENIED: &str = "Only group admins can remove custom locations.";
pub const RESET_LOCATIONS_DENIED: &str = "Only group admins can reset custom locations.";
pub const STOP_DENIED: &str = "Only group admins or game starter can stop the game.";
pub const REMOVE_PLAYER_DENIED: &str = "Only admins or game starter can remove players.";
pub const BROADCAST_DENIED: &str = "Only the bot owner can use this command.";

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn mention(id: UserId, name: &str) -> String {
    format!("<a href='tg://user?id={id}'>{}</a>", escape_html(name))
}

/// Display names known to a session, keyed by user.
#[derive(Clone, Copy)]
pub struct Roster<'a> {
    profiles: &'a HashMap<UserId, Profile>,
}

impl<'a> Roster<'a> {
    pub fn new(profiles: &'a HashMap<UserId, Profile>) -> Self {
        Self { profiles }
    }

    pub fn name(&self, id: UserId) -> &'a str {
        self.profiles
            .get(&id)
            .map(|profile| profile.first_name.as_str())
            .unwrap_or("Unknown")
    }

    pub fn mention(&self, id: UserId) -> String {
        mention(id, self.name(id))
    }

    fn joined(&self, ids: &[UserId], separator: &str) -> String {
        ids.iter()
            .map(|id| self.mention(*id))
            .collect::<Vec<_>>()
            .join(separator)
    }
}

pub fn welcome() -> String {
    "👋 Welcome to <b>Spy x Civilians</b> Bot!\n\n\
     🎮 This is a group game where one player is the Spy 🕵️ \
     and the rest are Civilians 👥.\n\n\
     👉 To start a new game in a group, use: /startgame\n\
     👉 To read the rules: /rules\n\
     👉 For help: /help\n\n\
     ⚠️ Note: The game is played only in groups, but some information \
     will be sent to you here in private chat."
        .to_string()
}

pub fn help() -> String {
    "📖 <b>Spy x Civilians - Help</b>\n\n\
     /startgame - Start a new game\n\
     /join - Join the current game\n\
     /begin - Begin the game (assign roles)\n\
     /players - Show list of joined players\n\
     /status - Show current game stage &amp; info\n\
     /extend - Extend discussion by 1 min (discussion only)\n\
     /guess &lt;location&gt; - Spy guesses location (discussion only)\n\
     /remove @username - Remove a player (admins/host only)\n\
     /stopgame - Force end the game (admins/host only)\n\
     /rules - Show game rules\n\n\
     🧭 <b>Custom Locations</b> (per group):\n\
     /addlocation &lt;name&gt; - Add a custom location (admins only)\n\
     /removelocation &lt;name&gt; - Remove a custom location (admins only)\n\
     /listlocations - Show all locations (default + custom)\n\
     /resetlocations - Clear all custom locations (admins only)\n"
        .to_string()
}

pub fn rules() -> String {
    "📜 <b>Spy x Civilians Rules</b>\n\n\
     - One or more players are Spies 🕵️.\n\
     - Civilians 👥 know a secret location.\n\
     - Spies don't know the location and must deduce it.\n\
     - Players discuss to identify the Spy.\n\
     - After discussion, players vote.\n\
     - Civilians win if they catch the Spy.\n\
     - Spy wins if not caught, or if they correctly guess the location during discussion."
        .to_string()
}

pub fn lobby_opened() -> String {
    "🎮 New Spy x Civilian Game Started!\n\n\
     Players can join using /join\n\n\
     👉 First, tell me discussion time in minutes (e.g. type <code>5</code> for 5 minutes)."
        .to_string()
}

pub fn minutes_set(minutes: u32) -> String {
    format!("✅ Discussion time set to {minutes} minutes!\n\nNow choose Game Mode:")
}

pub fn mode_buttons() -> Vec<Button> {
    GameMode::ALL
        .iter()
        .map(|mode| Button::new(mode.button_label(), TapAction::Mode(*mode).payload()))
        .collect()
}

pub fn mode_selected(mode: GameMode) -> String {
    format!(
        "🎮 Game Mode selected: {}\n\n\
         Players can now join using /join.\n\
         When ready, use /begin to start.",
        mode.label()
    )
}

pub fn joined(profile: &Profile) -> String {
    format!("✅ {} joined the game!", mention(profile.id, &profile.first_name))
}

pub fn players(roster: Roster<'_>, players: &[UserId]) -> String {
    if players.is_empty() {
        return "⚠️ No players have joined yet.".to_string();
    }
    let lines: Vec<String> = players
        .iter()
        .map(|id| format!("- {}", roster.mention(*id)))
        .collect();
    format!("👥 Current Players:\n{}", lines.join("\n"))
}

pub fn no_active_game() -> String {
    "⚠️ No active game.".to_string()
}

pub fn status(roster: Roster<'_>, mode: Option<GameMode>, stage: Stage, players: &[UserId]) -> String {
    format!(
        "📊 Game Status:\n\
         Mode: {}\n\
         Stage: {}\n\
         Players Joined: {}\n\
         👥 {}",
        mode.map(GameMode::label).unwrap_or("Not selected"),
        stage.as_str(),
        players.len(),
        roster.joined(players, ", ")
    )
}

pub fn round_aborted(roster: Roster<'_>, failed: &[UserId]) -> String {
    let lines: Vec<String> = failed
        .iter()
        .map(|id| format!("- {}", roster.mention(*id)))
        .collect();
    format!(
        "⚠️ The following players must /start the bot in PM before the game can begin:\n{}",
        lines.join("\n")
    )
}

pub fn spy_briefing() -> String {
    "🕵️‍♂️ <b>Secret Role Assigned!</b>\n\n\
     You are the <b>SPY</b> 😈\n\
     ❓ Your mission: Blend in, ask smart questions, and try to <b>guess the location</b>.\n\n\
     🗣️ Be careful… if they find you, civilians win!"
        .to_string()
}

/// Also sent to a Fake Civilian, with the decoy location.
pub fn civilian_briefing(location: &str) -> String {
    format!(
        "👥 <b>Secret Role Assigned!</b>\n\n\
         You are a <b>Civilian</b> 🙌\n\
         📍 The secret location is: <b>{}</b>\n\n\
         🎯 Your mission: Spot the Spy by asking tricky questions and defending yourself.",
        escape_html(location)
    )
}

pub fn round_started(discussion_secs: u32) -> String {
    format!(
        "🎉 <b>All roles have been secretly assigned!</b>\n\n\
         🗣️ Discussion Phase has started.\n\
         ⏳ Time: <b>{} minutes</b>\n\n\
         👉 Ask smart questions, confuse the Spy, and defend yourself!",
        format_clock(discussion_secs)
    )
}

pub fn minutes_left(minutes: u32) -> String {
    format!("⏳ {minutes} minutes left for discussion!")
}

pub fn voting_opened(window_secs: u64) -> String {
    let minutes = window_secs / 60;
    let window = if window_secs % 60 == 0 && minutes > 0 {
        format!("{minutes} minutes")
    } else {
        format!("{window_secs} seconds")
    };
    format!("🗳️ Discussion ended! Voting starts now ({window}):")
}

pub fn vote_buttons(roster: Roster<'_>, players: &[UserId]) -> Vec<Button> {
    players
        .iter()
        .map(|id| {
            Button::new(
                format!("Vote {}", roster.name(*id)),
                TapAction::Vote(*id).payload(),
            )
        })
        .collect()
}

pub fn extended(remaining_secs: u32) -> String {
    format!(
        "⏳ Discussion extended by 1 minute! (Now {} remaining)",
        format_clock(remaining_secs)
    )
}

pub fn guess_correct(location: &str) -> String {
    format!(
        "🎉 Spy guessed the location correctly ({})!\nSpy wins! 🕵️",
        escape_html(location)
    )
}

pub fn guess_wrong() -> String {
    "❌ Wrong guess! Game continues...".to_string()
}

pub fn result(roster: Roster<'_>, resolution: &Resolution) -> String {
    let mut out = match resolution.verdict {
        Verdict::NoVotes => return "⚠️ No votes were cast. Spy wins by default 😈".to_string(),
        Verdict::CiviliansWin { accused } => format!(
            "🎉 Civilians win!\n🕵️ Spy was {}\n\n👥 Civilians: {}",
            roster.mention(accused),
            roster.joined(&resolution.civilians, ", ")
        ),
        Verdict::SpiesWin { accused } => {
            let mut out = format!(
                "😈 Spy wins!\n❌ {} was wrongly accused.\n\n🕵️ Spies: {}",
                roster.mention(accused),
                roster.joined(&resolution.spies, ", ")
            );
            if !resolution.fake_civilians.is_empty() {
                out.push_str(&format!(
                    "\n🎭 Fake Civilians: {}",
                    roster.joined(&resolution.fake_civilians, ", ")
                ));
            }
            if !resolution.civilians.is_empty() {
                out.push_str(&format!(
                    "\n👥 Civilians: {}",
                    roster.joined(&resolution.civilians, ", ")
                ));
            }
            out
        }
    };

    if !resolution.breakdown.is_empty() {
        let lines: Vec<String> = resolution
            .breakdown
            .iter()
            .map(|vote| format!("{} ➝ {}", roster.mention(vote.voter), roster.mention(vote.accused)))
            .collect();
        out.push_str("\n\n🗳️ <b>Voting Breakdown:</b>\n");
        out.push_str(&lines.join("\n"));
    }
    out
}

pub fn game_stopped() -> String {
    "🛑 Game has been stopped by admin/host.".to_string()
}

pub fn player_removed(roster: Roster<'_>, id: UserId) -> String {
    format!("🚫 {} has been removed from the game.", roster.mention(id))
}

pub fn location_added(name: &str) -> String {
    format!("✅ Added location: <b>{}</b>", escape_html(name))
}

pub fn location_removed(name: &str) -> String {
    format!("✅ Removed location: <b>{}</b>", escape_html(name))
}

pub fn location_rejected(reason: &str) -> String {
    format!("⚠️ {}", escape_html(reason))
}

pub fn locations_reset() -> String {
    "♻️ Custom locations cleared for this chat. Using defaults now.".to_string()
}

pub fn location_list(pool: &[String]) -> String {
    if pool.is_empty() {
        return "ℹ️ No locations available.".to_string();
    }
    let lines: Vec<String> = pool
        .iter()
        .map(|name| format!("• {}", escape_html(name)))
        .collect();
    format!("🧭 <b>Locations for this chat:</b>\n{}", lines.join("\n"))
}

pub fn broadcast_report(sent: usize, failed: usize) -> String {
    format!("✅ Broadcast complete!\n📨 Sent: {sent}\n❌ Failed: {failed}")
}

pub fn something_went_wrong() -> String {
    "⚠️ Something went wrong, please try again.".to_string()
}
