//! Gateway Integration Tests
//!
//! Each test spawns its own gateway on an ephemeral port backed by an
//! in-memory directory, so no external services are needed.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use aeon_common::WebSocketConfig;
use aeon_core::{MessageId, UserId};
use aeon_gateway::ServerEvent;
use integration_tests::{init_data_for, unique_chat, TestGateway};
use serde_json::json;

fn status(user_id: UserId, is_online: bool) -> ServerEvent {
    ServerEvent::UserStatus { user_id, is_online }
}

/// Poll `check` until it holds or a second passes
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// ============================================================================
// Health & Handshake
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let gateway = TestGateway::start().await.expect("Failed to start gateway");
    assert!(integration_tests::health_ok(&gateway).await.unwrap());
}

#[tokio::test]
async fn test_connection_established_names_user() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = gateway.user();

    let init_data = init_data_for(&gateway.auth, alice.telegram_id);
    let mut client = gateway.connect_raw(Some(&init_data)).await.unwrap();

    match client.next_event().await.unwrap() {
        ServerEvent::ConnectionEstablished { user_id, .. } => assert_eq!(user_id, alice.user_id),
        other => panic!("unexpected first event: {other:?}"),
    }
    assert!(gateway.state.registry().is_online(alice.user_id));
}

#[tokio::test]
async fn test_missing_init_data_rejected() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.connect_raw(None).await.unwrap();
    assert_eq!(client.close_code().await.unwrap(), 4001);
}

#[tokio::test]
async fn test_forged_init_data_rejected() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = gateway.user();
    let forger = aeon_common::TelegramAuth::new("1:NOT-THE-BOT").unwrap();

    let init_data = init_data_for(&forger, alice.telegram_id);
    let mut client = gateway.connect_raw(Some(&init_data)).await.unwrap();
    assert_eq!(client.close_code().await.unwrap(), 4001);
    assert_eq!(gateway.state.registry().connection_count(), 0);
}

#[tokio::test]
async fn test_unknown_user_rejected() {
    let gateway = TestGateway::start().await.unwrap();
    let stranger = integration_tests::TestUser::unique();

    let init_data = init_data_for(&gateway.auth, stranger.telegram_id);
    let mut client = gateway.connect_raw(Some(&init_data)).await.unwrap();
    assert_eq!(client.close_code().await.unwrap(), 4001);
}

#[tokio::test]
async fn test_directory_outage_closes_with_server_error() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = gateway.user();
    gateway.directory.set_unavailable(true);

    let init_data = init_data_for(&gateway.auth, alice.telegram_id);
    let mut client = gateway.connect_raw(Some(&init_data)).await.unwrap();
    assert_eq!(client.close_code().await.unwrap(), 4000);
}

#[tokio::test]
async fn test_slow_handshake_closes_with_timeout() {
    let gateway = TestGateway::start_with_settings(WebSocketConfig {
        handshake_timeout_ms: 50,
        ..WebSocketConfig::default()
    })
    .await
    .unwrap();
    let alice = gateway.user();
    gateway.directory.set_latency(Duration::from_millis(500));

    let init_data = init_data_for(&gateway.auth, alice.telegram_id);
    let mut client = gateway.connect_raw(Some(&init_data)).await.unwrap();
    assert_eq!(client.close_code().await.unwrap(), 4008);
    assert!(!gateway.state.registry().is_online(alice.user_id));
}

// ============================================================================
// Subscriptions & Fan-out
// ============================================================================

#[tokio::test]
async fn test_memberships_loaded_on_connect() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = gateway.user();
    let (first, second) = (unique_chat(), unique_chat());
    gateway.add_members(first, &[alice]);
    gateway.add_members(second, &[alice]);

    let _client = gateway.connect(alice.telegram_id).await.unwrap();

    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(gateway.state.registry().user_chats(alice.user_id), expected);
}

#[tokio::test]
async fn test_peer_sees_online_and_typing() {
    let gateway = TestGateway::start().await.unwrap();
    let (alice, bob) = (gateway.user(), gateway.user());
    let chat = unique_chat();
    gateway.add_members(chat, &[alice, bob]);

    let mut a = gateway.connect(alice.telegram_id).await.unwrap();
    let mut b = gateway.connect(bob.telegram_id).await.unwrap();
    assert_eq!(a.next_event().await.unwrap(), status(bob.user_id, true));

    a.send_json(&json!({"type": "typing", "chat_id": chat, "is_typing": true}))
        .await
        .unwrap();
    assert_eq!(
        b.next_event().await.unwrap(),
        ServerEvent::Typing {
            chat_id: chat,
            user_id: alice.user_id,
            is_typing: true
        }
    );

    // The typist hears nothing back
    assert!(a.events_until_pong().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_new_message_reaches_all_subscribers() {
    let gateway = TestGateway::start().await.unwrap();
    let (alice, bob) = (gateway.user(), gateway.user());
    let chat = unique_chat();
    gateway.add_members(chat, &[alice, bob]);

    let mut a = gateway.connect(alice.telegram_id).await.unwrap();
    let mut b = gateway.connect(bob.telegram_id).await.unwrap();
    a.next_event().await.unwrap();

    let payload = json!({"id": 1, "chat_id": chat, "text": "hello", "sender_id": alice.user_id});
    let sent = gateway
        .state
        .router()
        .notify_new_message(chat, payload.clone())
        .await;
    assert_eq!(sent, 2);

    let expected = ServerEvent::NewMessage {
        chat_id: chat,
        message: payload,
    };
    assert_eq!(a.next_event().await.unwrap(), expected);
    assert_eq!(b.next_event().await.unwrap(), expected);
}

#[tokio::test]
async fn test_message_read_skips_reader() {
    let gateway = TestGateway::start().await.unwrap();
    let (alice, bob) = (gateway.user(), gateway.user());
    let chat = unique_chat();
    gateway.add_members(chat, &[alice, bob]);

    let mut a = gateway.connect(alice.telegram_id).await.unwrap();
    let mut b = gateway.connect(bob.telegram_id).await.unwrap();
    a.next_event().await.unwrap();

    gateway
        .state
        .router()
        .notify_message_read(chat, MessageId::new(77), bob.user_id)
        .await;

    assert_eq!(
        a.next_event().await.unwrap(),
        ServerEvent::MessageRead {
            message_id: MessageId::new(77),
            chat_id: chat,
            user_id: bob.user_id
        }
    );
    assert!(b.events_until_pong().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_join_and_leave_chat_frames() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = gateway.user();
    let chat = unique_chat();

    let mut a = gateway.connect(alice.telegram_id).await.unwrap();

    // Membership granted after connecting; the client asks to subscribe
    gateway.add_members(chat, &[alice]);
    a.send_json(&json!({"type": "join_chat", "chat_id": chat}))
        .await
        .unwrap();
    a.events_until_pong().await.unwrap();
    assert_eq!(gateway.state.registry().user_chats(alice.user_id), vec![chat]);

    a.send_json(&json!({"type": "leave_chat", "chat_id": chat}))
        .await
        .unwrap();
    a.events_until_pong().await.unwrap();
    assert!(gateway.state.registry().user_chats(alice.user_id).is_empty());
}

#[tokio::test]
async fn test_join_foreign_chat_ignored() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = gateway.user();
    let chat = unique_chat();

    let mut a = gateway.connect(alice.telegram_id).await.unwrap();
    a.send_json(&json!({"type": "join_chat", "chat_id": chat}))
        .await
        .unwrap();
    a.events_until_pong().await.unwrap();

    let sent = gateway
        .state
        .router()
        .notify_new_message(chat, json!({"text": "secret"}))
        .await;
    assert_eq!(sent, 0);
    assert!(a.events_until_pong().await.unwrap().is_empty());
}

// ============================================================================
// Frames & Keepalive
// ============================================================================

#[tokio::test]
async fn test_ping_answered_on_same_connection_only() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = gateway.user();

    let mut first = gateway.connect(alice.telegram_id).await.unwrap();
    let mut second = gateway.connect(alice.telegram_id).await.unwrap();

    assert!(first.events_until_pong().await.unwrap().is_empty());
    // Had the first pong leaked, it would show up here before our own
    assert!(second.events_until_pong().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_frames_do_not_close_socket() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = gateway.user();

    let mut a = gateway.connect(alice.telegram_id).await.unwrap();
    a.send_text("not json").await.unwrap();
    a.send_json(&json!({"type": "dance"})).await.unwrap();
    a.send_json(&json!({"type": "typing"})).await.unwrap();

    assert!(a.events_until_pong().await.unwrap().is_empty());
    assert!(gateway.state.registry().is_online(alice.user_id));
}

// ============================================================================
// Presence & Teardown
// ============================================================================

#[tokio::test]
async fn test_last_disconnect_announces_offline() {
    let gateway = TestGateway::start().await.unwrap();
    let (alice, bob) = (gateway.user(), gateway.user());
    let chat = unique_chat();
    gateway.add_members(chat, &[alice, bob]);

    let mut a = gateway.connect(alice.telegram_id).await.unwrap();
    let b = gateway.connect(bob.telegram_id).await.unwrap();
    assert_eq!(a.next_event().await.unwrap(), status(bob.user_id, true));

    b.close().await.unwrap();
    assert_eq!(a.next_event().await.unwrap(), status(bob.user_id, false));

    let registry = gateway.state.registry().clone();
    assert!(eventually(|| !registry.is_online(bob.user_id)).await);
    assert!(registry.user_chats(bob.user_id).is_empty());
    assert_eq!(registry.chat_members(chat), vec![alice.user_id]);
}

#[tokio::test]
async fn test_presence_follows_last_connection() {
    let gateway = TestGateway::start().await.unwrap();
    let (alice, bob) = (gateway.user(), gateway.user());
    let chat = unique_chat();
    gateway.add_members(chat, &[alice, bob]);

    let mut b = gateway.connect(bob.telegram_id).await.unwrap();
    let a1 = gateway.connect(alice.telegram_id).await.unwrap();
    let a2 = gateway.connect(alice.telegram_id).await.unwrap();

    // Only the first connection brings Alice online
    assert_eq!(b.next_event().await.unwrap(), status(alice.user_id, true));
    assert!(b.events_until_pong().await.unwrap().is_empty());

    a1.close().await.unwrap();
    let registry = gateway.state.registry().clone();
    assert!(eventually(|| registry.user_connections(alice.user_id).len() == 1).await);
    assert!(b.events_until_pong().await.unwrap().is_empty());
    assert_eq!(registry.user_chats(alice.user_id), vec![chat]);

    a2.close().await.unwrap();
    assert_eq!(b.next_event().await.unwrap(), status(alice.user_id, false));
}

#[tokio::test]
async fn test_presence_deduplicated_across_shared_chats() {
    let gateway = TestGateway::start().await.unwrap();
    let (alice, bob) = (gateway.user(), gateway.user());
    let (first, second) = (unique_chat(), unique_chat());
    gateway.add_members(first, &[alice, bob]);
    gateway.add_members(second, &[alice, bob]);

    let mut b = gateway.connect(bob.telegram_id).await.unwrap();
    let _a = gateway.connect(alice.telegram_id).await.unwrap();

    assert_eq!(b.next_event().await.unwrap(), status(alice.user_id, true));
    assert!(b.events_until_pong().await.unwrap().is_empty());
}
