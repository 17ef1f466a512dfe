use std::time::Duration;

pub const DEFAULT_DISCUSSION_SECS: u32 = 60;
pub const MIN_DISCUSSION_MINUTES: i64 = 1;
pub const MAX_DISCUSSION_MINUTES: i64 = 30;
pub const EXTEND_SECS: u32 = 60;
pub const MIN_PLAYERS: usize = 3;

pub const DISCUSSION_TICK: Duration = Duration::from_secs(1);
pub const VOTING_WINDOW: Duration = Duration::from_secs(120);

pub const COMMAND_COOLDOWN: Duration = Duration::from_millis(1_500);
pub const BUTTON_COOLDOWN: Duration = Duration::from_millis(750);
pub const COOLDOWN_PRUNE_EVERY: u64 = 512;

pub const BROADCAST_DELAY: Duration = Duration::from_millis(100);

pub const TAP_COOLDOWN_KEY: &str = "cb";

pub const DEFAULT_LOCATIONS: [&str; 56] = [
    "Hospital 🏥",
    "Airport ✈️",
    "Cinema 🎬",
    "Beach 🏖️",
    "School 🏫",
    "Restaurant 🍽️",
    "Museum 🖼️",
    "Train Station 🚉",
    "Library 📚",
    "Park 🌳",
    "Hotel 🏨",
    "Supermarket 🛒",
    "Bank 🏦",
    "Bus Station 🚌",
    "Church ⛪",
    "Police Station 👮",
    "Fire Station 🚒",
    "Shopping Mall 🛍️",
    "Stadium 🏟️",
    "Zoo 🦁",
    "Amusement Park 🎡",
    "Aquarium 🐠",
    "Factory 🏭",
    "Farm 🚜",
    "Harbor ⚓",
    "Office 💼",
    "Post Office 📮",
    "Gas Station ⛽",
    "Theater 🎭",
    "Bowling Alley 🎳",
    "Gym 🏋️",
    "Cafe ☕",
    "Casino 🎰",
    "Prison 🔒",
    "Concert Hall 🎤",
    "Race Track 🏎️",
    "Mountain 🏔️",
    "Forest 🌲",
    "Cave 🕳️",
    "Desert 🏜️",
    "Ice Rink ⛸️",
    "Volcano 🌋",
    "Bridge 🌉",
    "Space Station 🛰️",
    "Castle 🏰",
    "Palace 👑",
    "Cemetery ⚰️",
    "Underground Bunker 🛡️",
    "Laboratory 🔬",
    "Military Base 🎖️",
    "Courtroom ⚖️",
    "Ship 🚢",
    "Submarine 🚤",
    "Jungle 🐒",
    "Market Bazaar 🕌",
    "Village 🏘️",
];

pub fn format_clock(total_secs: u32) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pads_seconds() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(30 * 60), "30:00");
    }

    #[test]
    fn default_locations_are_unique() {
        let mut seen = std::collections::HashSet::new();
        assert!(DEFAULT_LOCATIONS.iter().all(|name| seen.insert(*name)));
    }
}
