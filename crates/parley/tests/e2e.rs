// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end session scenarios.
//!
//! Each test creates an isolated TestHarness with mock adapters. Tests are
//! independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use parley_core::{
    Author, Connectivity, Lifecycle, ParleyError, PlanTier, QuotaKind, QuotaState, RawFile,
};
use parley_session::ATTACHMENT_PLACEHOLDER;
use parley_test_utils::TestHarness;

fn quota(used: u64, limit: u64) -> QuotaState {
    QuotaState {
        plan_tier: PlanTier::Free,
        messages_used: used,
        message_limit: Some(limit),
        attachments_used: 0,
        attachment_limit: Some(10),
    }
}

// ---- Turn pipeline ----

#[tokio::test]
async fn n_turns_append_2n_messages_in_order() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["r0".into(), "r1".into(), "r2".into(), "r3".into()])
        .build()
        .await;
    let before = harness.messages().await.len();

    for i in 0..4 {
        harness.send(&format!("q{i}")).await.unwrap();
    }

    let messages = harness.messages().await;
    assert_eq!(messages.len(), before + 8);
    let turns = &messages[before..];
    for (i, pair) in turns.chunks(2).enumerate() {
        assert_eq!(pair[0].author, Author::Requester);
        assert_eq!(pair[0].content, format!("q{i}"));
        assert_eq!(pair[0].lifecycle, Lifecycle::Delivered);
        assert_eq!(pair[1].author, Author::Assistant);
        assert_eq!(pair[1].content, format!("r{i}"));
    }
    assert!(messages.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn welcome_message_only_when_online() {
    let online = TestHarness::builder().build().await;
    assert_eq!(online.messages().await.len(), 1);

    let offline = TestHarness::builder()
        .with_connectivity(Connectivity::Offline)
        .build()
        .await;
    assert!(offline.messages().await.is_empty());
}

// ---- Quota ----

#[tokio::test]
async fn last_message_of_the_period() {
    let harness = TestHarness::builder().with_quota(quota(49, 50)).build().await;

    harness.send("hello").await.unwrap();
    assert_eq!(harness.coordinator.quota().await.messages_used, 50);

    let before = harness.messages().await;
    let err = harness.send("again").await.unwrap_err();
    assert!(matches!(
        err,
        ParleyError::QuotaExceeded {
            kind: QuotaKind::Messages
        }
    ));
    assert_eq!(harness.messages().await, before);
    assert_eq!(harness.assistant.call_count(), 1);
}

#[tokio::test]
async fn new_period_allows_sending_again() {
    let harness = TestHarness::builder().with_quota(quota(50, 50)).build().await;
    assert!(harness.send("blocked").await.is_err());

    harness.coordinator.reset_quota_period().await;
    harness.send("allowed").await.unwrap();
    assert_eq!(harness.coordinator.quota().await.messages_used, 1);
}

// ---- Attachments ----

#[tokio::test]
async fn attachment_only_turn_previews_before_upload_completes() {
    let harness = TestHarness::builder().build().await;
    harness.transfer.set_step_delay(Duration::from_millis(40));

    let file = RawFile::new("fileA.png", "image/png", vec![7; 2 * 1024 * 1024]);
    let coordinator = Arc::clone(&harness.coordinator);
    let turn = tokio::spawn(async move { coordinator.send_turn("", vec![file]).await });

    // Watch the transcript until the staged attachment shows up.
    let staged = loop {
        let messages = harness.messages().await;
        if let Some(attachment) = messages
            .iter()
            .find(|m| m.author == Author::Requester)
            .and_then(|m| m.attachments.first())
        {
            break attachment.clone();
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    };
    assert!(staged.preview_ref.is_some());
    assert!(staged.remote_ref.is_none());

    let outcome = turn.await.unwrap().unwrap();
    let messages = harness.messages().await;
    let requester = messages
        .iter()
        .find(|m| m.id == outcome.requester_id)
        .unwrap();
    assert_eq!(requester.content, ATTACHMENT_PLACEHOLDER);
    assert_eq!(requester.attachments.len(), 1);
    assert_eq!(requester.attachments[0].preview_ref, staged.preview_ref);
    assert!(requester.attachments[0].remote_ref.is_some());
    assert_eq!(requester.attachments[0].byte_size, 2 * 1024 * 1024);
}

#[tokio::test]
async fn oversized_file_is_dropped_but_turn_proceeds() {
    let harness = TestHarness::builder().build().await;
    let files = vec![
        RawFile::new("huge.bin", "application/octet-stream", vec![0; 11 * 1024 * 1024]),
        RawFile::new("small.txt", "text/plain", b"notes".to_vec()),
    ];

    let outcome = harness.send_with_files("two files", files).await.unwrap();
    assert_eq!(outcome.upload_failures.len(), 1);
    assert!(matches!(
        outcome.upload_failures[0].error,
        ParleyError::AttachmentTooLarge { .. }
    ));

    let messages = harness.messages().await;
    let requester = messages.iter().find(|m| m.id == outcome.requester_id).unwrap();
    assert_eq!(requester.attachments.len(), 1);
    assert_eq!(requester.attachments[0].display_name, "small.txt");
}

// ---- Failure and retry ----

#[tokio::test(start_paused = true)]
async fn timeout_then_retry_sends_exactly_once_more() {
    let harness = TestHarness::builder()
        .with_timeout(Duration::from_secs(3))
        .with_assistant_delay(Duration::from_secs(30))
        .build()
        .await;

    let err = harness.send("are you there?").await.unwrap_err();
    assert!(err.is_retryable());
    let failed = harness
        .messages()
        .await
        .into_iter()
        .find(|m| m.author == Author::Requester)
        .unwrap();
    assert_eq!(failed.lifecycle, Lifecycle::Failed);
    assert_eq!(harness.coordinator.quota().await.messages_used, 0);

    harness.assistant.set_delay(Duration::ZERO);
    let outcome = harness.coordinator.retry(&failed.id).await.unwrap();
    assert_eq!(harness.assistant.call_count(), 2);

    let messages = harness.messages().await;
    let requesters: Vec<_> = messages
        .iter()
        .filter(|m| m.author == Author::Requester)
        .collect();
    assert_eq!(requesters.len(), 1);
    assert_eq!(requesters[0].id, outcome.requester_id);
    assert_eq!(requesters[0].content, "are you there?");
    assert_eq!(harness.coordinator.quota().await.messages_used, 1);
}

// ---- Transcript operations ----

#[tokio::test]
async fn delete_removes_exactly_one_message() {
    let harness = TestHarness::builder().build().await;
    harness.send("first").await.unwrap();
    let second = harness.send("second").await.unwrap();
    let before = harness.messages().await;

    harness.coordinator.delete(&second.requester_id).await.unwrap();

    let after = harness.messages().await;
    let expected: Vec<_> = before
        .into_iter()
        .filter(|m| m.id != second.requester_id)
        .collect();
    assert_eq!(after, expected);
}

#[tokio::test]
async fn search_matches_content_and_attachment_names() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["Nothing here".into(), "FOO in caps".into()])
        .build()
        .await;
    harness
        .send_with_files(
            "see file",
            vec![RawFile::new("foo-report.pdf", "application/pdf", vec![1; 32])],
        )
        .await
        .unwrap();
    harness.send("plain").await.unwrap();

    let found = harness.coordinator.search("foo").await;
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].content, "see file");
    assert_eq!(found[1].content, "FOO in caps");
    assert_eq!(harness.coordinator.search("foo").await, found);
}

#[tokio::test]
async fn export_writes_one_document() {
    let harness = TestHarness::builder().build().await;
    harness.send("keep this").await.unwrap();

    let receipt = harness.coordinator.export().await.unwrap();
    assert_eq!(receipt.message_count, 3);
    assert!(receipt.file_name.starts_with("parley-transcript-"));

    let saved = harness.export_sink.saved().await;
    assert_eq!(saved.len(), 1);
    let doc: serde_json::Value = serde_json::from_slice(&saved[0].1).unwrap();
    assert_eq!(doc["messageCount"], 3);
    assert_eq!(doc["messages"][1]["content"], "keep this");
    assert_eq!(doc["identity"]["id"], "test-user");
}

#[tokio::test]
async fn failed_export_leaves_session_intact() {
    let harness = TestHarness::builder().with_failing_export().build().await;
    harness.send("hello").await.unwrap();
    let before = harness.messages().await;

    let err = harness.coordinator.export().await.unwrap_err();
    assert!(matches!(err, ParleyError::Export { .. }));
    assert_eq!(harness.messages().await, before);
}

// ---- Rejections ----

#[tokio::test]
async fn signed_out_and_offline_sessions_reject_without_mutation() {
    let anonymous = TestHarness::builder().without_identity().build().await;
    let before = anonymous.messages().await;
    assert!(matches!(
        anonymous.send("hi").await,
        Err(ParleyError::NotAuthenticated)
    ));
    assert_eq!(anonymous.messages().await, before);

    let harness = TestHarness::builder().build().await;
    harness.set_connectivity(Connectivity::Connecting);
    let before = harness.messages().await;
    assert!(matches!(
        harness.send("hi").await,
        Err(ParleyError::NotConnected {
            state: Connectivity::Connecting
        })
    ));
    assert_eq!(harness.messages().await, before);
    assert_eq!(harness.assistant.call_count(), 0);
}

#[tokio::test]
async fn sign_out_then_bind_identity() {
    let harness = TestHarness::builder().build().await;
    harness.send("hello").await.unwrap();
    assert!(harness.coordinator.active_conversation().await.is_some());

    harness.coordinator.sign_out().await;
    assert!(harness.coordinator.active_conversation().await.is_none());
    assert!(harness.send("hi").await.is_err());

    harness
        .coordinator
        .bind_identity(parley_core::Identity::new("u-2", "Second"))
        .await;
    harness.send("hi").await.unwrap();
    let requests = harness.assistant.requests().await;
    assert_eq!(requests.last().unwrap().identity_id.as_str(), "u-2");
}
