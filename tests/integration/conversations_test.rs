//! Conversation store tests: ad-hoc threads, read markers, the audit
//! trail for deletions and participant changes.

use assert_matches::assert_matches;
use serial_test::serial;

use fixdesk::backend::chat::store;
use fixdesk::shared::chat::{
    ConversationKind, ListMessagesQuery, MessageKind, NewConversationRequest, NewMessageRequest,
};
use fixdesk::shared::error::{codes, CoreError};

use crate::common::database::TestDatabase;
use crate::common::fixtures::{Scenario, TestWorld};

fn text(body: &str) -> NewMessageRequest {
    NewMessageRequest {
        body: body.to_string(),
        attachments: Vec::new(),
    }
}

#[tokio::test]
#[serial]
async fn test_post_and_read_acknowledges_unread() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    db.reset().await;
    let world = TestWorld::new(db.pool().clone());
    let s = Scenario::seed(db.pool()).await;

    let rita = world.profile(s.requester).await;
    let conversation = world
        .chat
        .create(
            &rita,
            NewConversationRequest {
                kind: ConversationKind::Group,
                participant_ids: vec![s.recipient],
                title: Some("Lobby renovation".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(conversation.kind, ConversationKind::Group);

    world
        .chat
        .post(&rita, conversation.id, text("Kickoff at 9:00"))
        .await
        .unwrap();

    let listed = world.chat.my_conversations(s.recipient).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, conversation.id);

    let unread = world.chat.unread(s.recipient).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].conversation_id, conversation.id);
    assert_eq!(unread[0].unread, 1);

    // Fetching a page acknowledges everything in it.
    let frank = world.profile(s.recipient).await;
    let page = world
        .chat
        .messages(&frank, conversation.id, ListMessagesQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.messages[0].kind, MessageKind::Text);
    assert_eq!(page.messages[0].body, "Kickoff at 9:00");
    assert_eq!(page.messages[0].author_id, Some(s.requester));

    let unread = world.chat.unread(s.recipient).await.unwrap();
    assert_eq!(unread[0].unread, 0);
}

#[tokio::test]
#[serial]
async fn test_read_marker_never_regresses() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    db.reset().await;
    let world = TestWorld::new(db.pool().clone());
    let s = Scenario::seed(db.pool()).await;

    let rita = world.profile(s.requester).await;
    let frank = world.profile(s.recipient).await;
    let conversation = world
        .chat
        .create(
            &rita,
            NewConversationRequest {
                kind: ConversationKind::Group,
                participant_ids: vec![s.recipient],
                title: None,
            },
        )
        .await
        .unwrap();

    let first = world
        .chat
        .post(&rita, conversation.id, text("one"))
        .await
        .unwrap();
    world
        .chat
        .post(&rita, conversation.id, text("two"))
        .await
        .unwrap();

    // The fetch advances the marker to the newest message in the page.
    world
        .chat
        .messages(&frank, conversation.id, ListMessagesQuery::default())
        .await
        .unwrap();
    let unread = world.chat.unread(s.recipient).await.unwrap();
    assert_eq!(unread[0].unread, 0);

    // An explicit acknowledgement of an older message must not move it back.
    world
        .chat
        .mark_read(&frank, conversation.id, first.id)
        .await
        .unwrap();
    let unread = world.chat.unread(s.recipient).await.unwrap();
    assert_eq!(unread[0].unread, 0);
}

#[tokio::test]
#[serial]
async fn test_case_bound_kinds_are_not_creatable_directly() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    db.reset().await;
    let world = TestWorld::new(db.pool().clone());
    let s = Scenario::seed(db.pool()).await;

    let rita = world.profile(s.requester).await;
    for kind in [ConversationKind::External, ConversationKind::Internal] {
        let err = world
            .chat
            .create(
                &rita,
                NewConversationRequest {
                    kind,
                    participant_ids: vec![],
                    title: None,
                },
            )
            .await
            .unwrap_err();
        assert_matches!(
            err,
            CoreError::Constraint { code, .. } if code == codes::CASE_BOUND_CONVERSATION
        );
    }
}

#[tokio::test]
#[serial]
async fn test_non_participant_cannot_post_or_read() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    db.reset().await;
    let world = TestWorld::new(db.pool().clone());
    let s = Scenario::seed(db.pool()).await;

    let rita = world.profile(s.requester).await;
    let conversation = world
        .chat
        .create(
            &rita,
            NewConversationRequest {
                kind: ConversationKind::Group,
                participant_ids: vec![s.recipient],
                title: None,
            },
        )
        .await
        .unwrap();

    let oscar = world.profile(s.outsider).await;
    let err = world
        .chat
        .post(&oscar, conversation.id, text("let me in"))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Forbidden { .. });

    let err = world
        .chat
        .messages(&oscar, conversation.id, ListMessagesQuery::default())
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Forbidden { .. });
}

#[tokio::test]
#[serial]
async fn test_delete_message_is_author_only_and_leaves_audit() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    db.reset().await;
    let world = TestWorld::new(db.pool().clone());
    let s = Scenario::seed(db.pool()).await;

    let rita = world.profile(s.requester).await;
    let frank = world.profile(s.recipient).await;
    let conversation = world
        .chat
        .create(
            &rita,
            NewConversationRequest {
                kind: ConversationKind::Group,
                participant_ids: vec![s.recipient],
                title: None,
            },
        )
        .await
        .unwrap();
    let message = world
        .chat
        .post(&rita, conversation.id, text("typo everywhre"))
        .await
        .unwrap();

    let err = world
        .chat
        .delete_message(&frank, conversation.id, message.id)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Forbidden { .. });

    let deleted = world
        .chat
        .delete_message(&rita, conversation.id, message.id)
        .await
        .unwrap();
    assert!(deleted.deleted_at.is_some());

    let page = world
        .chat
        .messages(&rita, conversation.id, ListMessagesQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    let audit = page.messages.last().unwrap();
    assert_eq!(audit.kind, MessageKind::MessageDeleted);
    assert_eq!(audit.author_id, None);
    assert_eq!(audit.metadata["messageId"], serde_json::json!(message.id));

    // Deleting a tombstone is a not-found, not a second tombstone.
    let err = world
        .chat
        .delete_message(&rita, conversation.id, message.id)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::NotFound { .. });
}

#[tokio::test]
#[serial]
async fn test_participant_add_remove_lifecycle() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    db.reset().await;
    let world = TestWorld::new(db.pool().clone());
    let s = Scenario::seed(db.pool()).await;

    let rita = world.profile(s.requester).await;
    let oscar = world.profile(s.outsider).await;
    let conversation = world
        .chat
        .create(
            &rita,
            NewConversationRequest {
                kind: ConversationKind::Group,
                participant_ids: vec![s.recipient],
                title: None,
            },
        )
        .await
        .unwrap();

    world
        .chat
        .add_participant(&rita, conversation.id, s.outsider)
        .await
        .unwrap();
    world
        .chat
        .post(&oscar, conversation.id, text("thanks for the invite"))
        .await
        .unwrap();

    // Adding an active participant again is a no-op and posts nothing.
    let before = world
        .chat
        .messages(&rita, conversation.id, ListMessagesQuery::default())
        .await
        .unwrap()
        .total;
    world
        .chat
        .add_participant(&rita, conversation.id, s.outsider)
        .await
        .unwrap();
    let after = world
        .chat
        .messages(&rita, conversation.id, ListMessagesQuery::default())
        .await
        .unwrap()
        .total;
    assert_eq!(before, after);

    world
        .chat
        .remove_participant(&rita, conversation.id, s.outsider)
        .await
        .unwrap();
    let err = world
        .chat
        .post(&oscar, conversation.id, text("hello?"))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Forbidden { .. });

    let page = world
        .chat
        .messages(&rita, conversation.id, ListMessagesQuery::default())
        .await
        .unwrap();
    let kinds: Vec<MessageKind> = page.messages.iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == MessageKind::ParticipantJoined)
            .count(),
        1
    );
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == MessageKind::ParticipantLeft)
            .count(),
        1
    );

    // The removed row is kept inactive, marker intact.
    let mut conn = db.pool().acquire().await.unwrap();
    let participant = store::get_participant(&mut conn, conversation.id, s.outsider)
        .await
        .unwrap()
        .unwrap();
    assert!(!participant.active);
}
