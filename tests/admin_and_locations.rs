mod support;

use std::time::Duration;

use spy_civilians_bot::constants::DEFAULT_LOCATIONS;
use spy_civilians_bot::persistence::{LocationStore, UserRegistry};
use spy_civilians_bot::service::GameSettings;
use spy_civilians_bot::types::{ChatId, InboundEvent, InboundKind, Stage, UserId};
use support::{advance, player, quiet_settings, Harness};

const CHAT: ChatId = ChatId(-3003);

#[tokio::test]
async fn custom_location_is_unique_case_insensitively() {
    let h = Harness::new();
    let admin = player(1, "Ann");
    h.transport.make_admin(CHAT, admin.id);

    h.say(CHAT, &admin, "/addlocation Moon Base").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("✅ Added location: <b>Moon Base</b>")
    );
    h.say(CHAT, &admin, "/addlocation moon base").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("⚠️ Already added.")
    );

    h.say(CHAT, &admin, "/listlocations").await;
    let listing = h.transport.last_text(CHAT).expect("listing");
    let entries: Vec<&str> = listing.lines().filter(|line| line.starts_with("• ")).collect();
    assert_eq!(entries.len(), DEFAULT_LOCATIONS.len() + 1);
    assert_eq!(entries.last().copied(), Some("• Moon Base"));
    assert_eq!(entries.iter().filter(|e| e.contains("Moon Base")).count(), 1);
}

#[tokio::test]
async fn location_commands_require_admin_and_argument() {
    let h = Harness::new();
    let admin = player(1, "Ann");
    let member = player(2, "Bob");
    h.transport.make_admin(CHAT, admin.id);

    h.say(CHAT, &member, "/addlocation Moon Base").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("❌ Only group admins can add locations.")
    );
    h.say(CHAT, &member, "/resetlocations").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("❌ Only group admins can reset custom locations.")
    );

    h.say(CHAT, &admin, "/addlocation   ").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("⚠️ Usage: /addlocation &lt;name&gt;")
    );
    assert!(h.store.list(CHAT).expect("list").is_empty());
}

#[tokio::test]
async fn remove_and_reset_custom_locations() {
    let h = Harness::new();
    let admin = player(1, "Ann");
    h.transport.make_admin(CHAT, admin.id);

    h.say(CHAT, &admin, "/addlocation Moon Base").await;
    h.say(CHAT, &admin, "/addlocation Lighthouse").await;
    h.say(CHAT, &admin, "/removelocation MOON BASE").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("✅ Removed location: <b>MOON BASE</b>")
    );
    h.say(CHAT, &admin, "/removelocation Moon Base").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("⚠️ Not found among custom locations.")
    );
    assert_eq!(h.store.list(CHAT).expect("list"), vec!["Lighthouse"]);

    h.say(CHAT, &admin, "/resetlocations").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("♻️ Custom locations cleared for this chat. Using defaults now.")
    );
    assert!(h.store.list(CHAT).expect("list").is_empty());
}

#[tokio::test]
async fn custom_location_can_be_drawn_for_a_round() {
    let h = Harness::new();
    let players = vec![player(1, "Ann"), player(2, "Bob"), player(3, "Cy")];
    h.store.add(CHAT, "Moon Base").expect("add");

    let mut drawn = false;
    for _ in 0..1_000 {
        h.begin(CHAT, &players, 1, "classic").await;
        let location = h
            .with_session(CHAT, |session| session.location().map(str::to_string))
            .await;
        h.say(CHAT, &players[0], "/stopgame").await;
        if location.as_deref() == Some("Moon Base") {
            drawn = true;
            break;
        }
    }
    assert!(drawn, "custom location never drawn");
}

#[tokio::test]
async fn stop_requires_starter_or_admin() {
    let h = Harness::new();
    let host = player(1, "Ann");
    let member = player(2, "Bob");
    let admin = player(3, "Cy");
    h.transport.make_admin(CHAT, admin.id);

    h.say(CHAT, &member, "/stopgame").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("⚠️ No game is running!")
    );

    h.say(CHAT, &host, "/startgame").await;
    h.say(CHAT, &member, "/stopgame").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("❌ Only group admins or game starter can stop the game.")
    );
    assert!(h.with_session(CHAT, |s| s.is_started()).await);

    h.say(CHAT, &admin, "/stopgame").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("🛑 Game has been stopped by admin/host.")
    );
    assert!(!h.with_session(CHAT, |s| s.is_started()).await);

    h.say(CHAT, &host, "/startgame").await;
    h.say(CHAT, &host, "/stopgame").await;
    assert_eq!(h.with_session(CHAT, |s| s.stage()).await, Stage::Waiting);
}

#[tokio::test]
async fn remove_resolves_targets_and_checks_permission() {
    let h = Harness::new();
    let host = player(1, "Ann");
    let bob = player(2, "Bob").with_username("bobby");
    let cy = player(3, "Cy");
    h.lobby(CHAT, &[host.clone(), bob.clone(), cy.clone()], 1, "classic")
        .await;

    h.say(CHAT, &host, "/remove").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("⚠️ Usage: /remove @username or /remove Name")
    );

    h.say(CHAT, &cy, "/remove @bobby").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("❌ Only admins or game starter can remove players.")
    );

    h.say(CHAT, &host, "/remove @ghost").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("❌ Could not find that user.")
    );

    h.say(CHAT, &host, "/remove 999").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("⚠️ That user is not in the game.")
    );

    h.say(CHAT, &host, "/remove @BOBBY").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("🚫 <a href='tg://user?id=2'>Bob</a> has been removed from the game.")
    );
    assert_eq!(
        h.with_session(CHAT, |s| s.players().to_vec()).await,
        vec![UserId(1), UserId(3)]
    );
}

#[tokio::test]
async fn remove_prefers_text_mention() {
    let h = Harness::new();
    let host = player(1, "Ann");
    let players = vec![host.clone(), player(2, "Bob"), player(3, "Cy")];
    h.lobby(CHAT, &players, 1, "classic").await;

    let mut event = InboundEvent::text(CHAT, host, "/remove Bob");
    if let InboundKind::Text { mentions, .. } = &mut event.kind {
        mentions.push(player(3, "Cy"));
    }
    h.service.handle(event).await;

    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("🚫 <a href='tg://user?id=3'>Cy</a> has been removed from the game.")
    );
    assert_eq!(
        h.with_session(CHAT, |s| s.players().to_vec()).await,
        vec![UserId(1), UserId(2)]
    );
}

#[tokio::test]
async fn players_and_status_describe_the_lobby() {
    let h = Harness::new();
    let host = player(1, "Ann");
    let bob = player(2, "Bob");

    h.say(CHAT, &host, "/status").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("⚠️ No active game.")
    );
    h.say(CHAT, &host, "/players").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("⚠️ No players have joined yet.")
    );

    h.lobby(CHAT, &[host.clone(), bob.clone()], 2, "double_spy")
        .await;
    h.say(CHAT, &host, "/players").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some(
            "👥 Current Players:\n- <a href='tg://user?id=1'>Ann</a>\n- <a href='tg://user?id=2'>Bob</a>"
        )
    );
    h.say(CHAT, &host, "/status").await;
    let status = h.transport.last_text(CHAT).expect("status");
    assert!(status.contains("Mode: Double Spy"));
    assert!(status.contains("Stage: joining"));
    assert!(status.contains("Players Joined: 2"));
}

#[tokio::test]
async fn start_records_user_for_broadcast() {
    let owner = player(100, "Owner");
    let h = Harness::with_settings(GameSettings {
        owner: Some(owner.id),
        ..quiet_settings()
    });
    let private = |id: i64| ChatId(id);

    for profile in [player(1, "Ann"), player(2, "Bob"), player(3, "Cy")] {
        h.say(private(profile.id.0), &profile, "/start").await;
        assert!(h
            .transport
            .last_text(private(profile.id.0))
            .expect("welcome")
            .starts_with("👋 Welcome to <b>Spy x Civilians</b> Bot!"));
    }
    h.say(private(1), &player(1, "Ann"), "/start").await;
    assert_eq!(
        h.store.list_all_users().expect("users"),
        vec![UserId(1), UserId(2), UserId(3)]
    );

    h.transport.mark_unreachable(UserId(2));
    h.say(private(1), &player(1, "Ann"), "/broadcast hi").await;
    assert_eq!(
        h.transport.last_text(private(1)).as_deref(),
        Some("❌ Only the bot owner can use this command.")
    );

    h.say(private(100), &owner, "/broadcast").await;
    assert_eq!(
        h.transport.last_text(private(100)).as_deref(),
        Some("⚠️ Usage: /broadcast &lt;message&gt;")
    );

    h.say(private(100), &owner, "/broadcast Game night <tonight>").await;
    assert_eq!(
        h.transport.last_text(private(100)).as_deref(),
        Some("✅ Broadcast complete!\n📨 Sent: 2\n❌ Failed: 1")
    );
    assert_eq!(
        h.transport.privates(UserId(3)),
        vec!["Game night &lt;tonight&gt;".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn rapid_repeats_are_throttled_per_namespace() {
    let h = Harness::with_settings(GameSettings::default());
    let ann = player(1, "Ann");
    let bob = player(2, "Bob");

    h.say(CHAT, &ann, "/help").await;
    h.say(CHAT, &ann, "/help").await;
    assert_eq!(
        h.transport.last_text(CHAT).as_deref(),
        Some("⚠️ Slow down a bit.")
    );

    // Other commands and other users have their own windows.
    h.say(CHAT, &ann, "/rules").await;
    assert!(h
        .transport
        .last_text(CHAT)
        .expect("rules")
        .starts_with("📜"));
    h.say(CHAT, &bob, "/help").await;
    assert!(h.transport.last_text(CHAT).expect("help").starts_with("📖"));

    h.tap(CHAT, &ann, "mode:classic").await;
    h.tap(CHAT, &ann, "mode:classic").await;
    assert_eq!(
        h.transport.last_answer(),
        Some((Some("⏳ Easy there…".to_string()), false))
    );

    advance(Duration::from_millis(1_500)).await;
    h.say(CHAT, &ann, "/help").await;
    assert!(h.transport.last_text(CHAT).expect("help").starts_with("📖"));
}
