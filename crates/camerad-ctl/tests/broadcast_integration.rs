//! Integration tests for the broadcast engine against mock controllers.
//!
//! These tests exercise `Broadcaster::send` through its public API the same
//! way the operation layer uses it.  They verify:
//!
//! - The happy path: every host answers the same terminal token and the
//!   broadcast reduces to that token.
//! - The reduction contract: identical tokens succeed (even `ERROR` —
//!   agreement is what is being measured), differing tokens fail with the
//!   full per-host token list, and a host with no parsable reply fails the
//!   call.
//! - The fail-fast path: an empty host set is rejected before any I/O.

mod common;

use std::time::Duration;

use camerad_core::Command;
use camerad_ctl::infrastructure::network::{BroadcastError, Broadcaster, HostSet};
use common::MockController;
use tokio_test::assert_ok;

#[tokio::test]
async fn test_all_hosts_agreeing_reduces_to_shared_token() {
    let cam1 = MockController::start("camera1", "DONE\n").await;
    let cam2 = MockController::start("camera2", "DONE\n").await;
    let cam3 = MockController::start("camera3", "DONE\n").await;

    let mut hosts = HostSet::new(common::entries(&[&cam1, &cam2, &cam3]));
    hosts.open(None).await.expect("open mocks");
    assert_eq!(hosts.open_count(), 3);

    let result = Broadcaster::new()
        .send(&mut hosts, &Command::new("mode").arg("RAW"))
        .await;
    let token = assert_ok!(result);
    assert_eq!(token, "DONE");

    // every mock saw exactly the formatted command line
    for cam in [&cam1, &cam2, &cam3] {
        assert_eq!(cam.lines().await, vec!["mode RAW\n".to_string()]);
    }
}

#[tokio::test]
async fn test_disagreeing_hosts_fail_with_every_token() {
    let cam1 = MockController::start("camera1", "DONE\n").await;
    let cam2 = MockController::start("camera2", "ERROR\n").await;
    let cam3 = MockController::start("camera3", "ERROR\n").await;

    let mut hosts = HostSet::new(common::entries(&[&cam1, &cam2, &cam3]));
    hosts.open(None).await.expect("open mocks");

    let err = Broadcaster::new()
        .send(&mut hosts, &Command::new("expose").arg(1))
        .await
        .expect_err("hosts disagree");

    match err {
        BroadcastError::Disagreement(replies) => {
            let tokens: Vec<Option<&str>> = replies.iter().map(|r| r.token.as_deref()).collect();
            assert_eq!(
                tokens,
                vec![Some("DONE"), Some("ERROR"), Some("ERROR")],
                "token list preserves host order"
            );
            let hosts: Vec<&str> = replies.iter().map(|r| r.host.as_str()).collect();
            assert_eq!(hosts, vec!["camera1", "camera2", "camera3"]);
        }
        other => panic!("expected Disagreement, got {other:?}"),
    }
}

#[tokio::test]
async fn test_identical_error_tokens_still_agree() {
    // Agreement, not the token's spelling, decides the outcome: the caller
    // sees the shared token and can react to it.
    let cam1 = MockController::start("camera1", "ERROR 12\n").await;
    let cam2 = MockController::start("camera2", "ERROR 12\n").await;

    let mut hosts = HostSet::new(common::entries(&[&cam1, &cam2]));
    hosts.open(None).await.expect("open mocks");

    let token = Broadcaster::new()
        .send(&mut hosts, &Command::new("load"))
        .await
        .expect("identical replies agree");
    assert_eq!(token, "ERROR");
}

#[tokio::test]
async fn test_interim_chatter_before_terminal_line_reduces_on_final_token() {
    // one host streams progress output before its status line; the reduction
    // must use the terminal line, not the chatter
    let cam1 = MockController::chatty("camera1", "exposing...", "DONE 0\n").await;
    let cam2 = MockController::start("camera2", "DONE 0\n").await;

    let mut hosts = HostSet::new(common::entries(&[&cam1, &cam2]));
    hosts.open(None).await.expect("open mocks");

    let token = Broadcaster::new()
        .send(&mut hosts, &Command::new("expose").arg(1))
        .await
        .expect("hosts agree on the terminal token");
    assert_eq!(token, "DONE");
}

#[tokio::test]
async fn test_empty_host_set_fails_before_any_io() {
    let cam1 = MockController::start("camera1", "DONE\n").await;

    // configured but never opened: not eligible for dispatch
    let mut hosts = HostSet::new(common::entries(&[&cam1]));

    let result = Broadcaster::new()
        .send(&mut hosts, &Command::new("open"))
        .await;
    assert!(matches!(result, Err(BroadcastError::NoConnection)));
    assert!(cam1.lines().await.is_empty(), "nothing was transmitted");
}

#[tokio::test]
async fn test_silent_host_times_out_as_missing_reply() {
    let cam1 = MockController::start("camera1", "DONE\n").await;
    let cam2 = MockController::silent("camera2").await;

    let mut hosts = HostSet::new(common::entries(&[&cam1, &cam2]));
    hosts.open(None).await.expect("open mocks");

    let err = Broadcaster::with_read_timeout(Duration::from_millis(100))
        .send(&mut hosts, &Command::new("basename").arg("ngc253"))
        .await
        .expect_err("silent host cannot agree");

    match err {
        BroadcastError::NoReply(replies) => {
            assert_eq!(replies[0].token.as_deref(), Some("DONE"));
            assert_eq!(replies[1].token, None);
        }
        other => panic!("expected NoReply, got {other:?}"),
    }

    // the silent host still received the command before the timeout
    assert_eq!(cam2.lines().await, vec!["basename ngc253\n".to_string()]);
}
