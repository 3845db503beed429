mod common;

use argo_console::modules::error::{ConsoleError, NoticeKind};
use argo_console::modules::form::ConfigForm;
use argo_console::modules::stats::{STATS_BACKLOG, StatsRow};
use common::{MockGateway, dead_addr, session_for};
use std::time::Duration;
use tokio::time::timeout;

fn row(key: &str, value: &str) -> StatsRow {
    StatsRow {
        key: key.into(),
        value: value.into(),
    }
}

#[tokio::test]
async fn each_frame_supersedes_the_last() {
    let addr = MockGateway::with_frames(&[r#"{"126992":"12:00"}"#, r#"{"127250":"180"}"#])
        .serve()
        .await;
    let mut session = session_for(addr, ConfigForm::default());
    session.open_stats().unwrap();

    assert!(session.next_stats_event().await);
    assert_eq!(session.view().stats.rows(), &[row("126992", "12:00")]);

    assert!(session.next_stats_event().await);
    assert_eq!(session.view().stats.rows(), &[row("127250", "180")]);

    assert!(!session.next_stats_event().await);
    assert!(!session.view().stats_connected());
    // Frozen at the last snapshot after the socket goes away.
    assert_eq!(session.view().stats.rows(), &[row("127250", "180")]);
    assert_eq!(session.view().stats.generation(), 2);
}

#[tokio::test]
async fn rows_keep_frame_order_and_render_numbers_as_text() {
    let addr = MockGateway::with_frames(&[r#"{"130306":4.5,"129025":"59.3,18.1","60928":12}"#])
        .serve()
        .await;
    let mut session = session_for(addr, ConfigForm::default());
    session.open_stats().unwrap();

    assert!(session.next_stats_event().await);
    assert_eq!(
        session.view().stats.rows(),
        &[
            row("130306", "4.5"),
            row("129025", "59.3,18.1"),
            row("60928", "12")
        ]
    );
}

#[tokio::test]
async fn malformed_frame_raises_notice_and_keeps_table() {
    let addr = MockGateway::with_frames(&[r#"{"126992":"12:00"}"#, "not json", r#"["array"]"#])
        .serve()
        .await;
    let mut session = session_for(addr, ConfigForm::default());
    session.open_stats().unwrap();

    for _ in 0..3 {
        assert!(session.next_stats_event().await);
    }
    assert_eq!(session.view().stats.rows(), &[row("126992", "12:00")]);
    let notices = session.view_mut().take_notices();
    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|n| n.kind == NoticeKind::Payload));
}

#[tokio::test]
async fn clicking_a_rendered_key_opens_its_metadata() {
    let gw = MockGateway::with_frames(&[r#"{"126992":"12:00"}"#]);
    let addr = gw.clone().serve().await;
    let mut session = session_for(addr, ConfigForm::default());
    session.open_stats().unwrap();
    assert!(session.next_stats_event().await);

    let descriptor = session.click_stats_row(0).await.unwrap().unwrap();
    assert_eq!(descriptor.description, "System Time");
    let paths: Vec<String> = gw.captured().into_iter().map(|c| c.path).collect();
    assert_eq!(paths, vec!["/signalk/v1/api/messages/126992"]);
    assert_eq!(session.view().modal.fields, vec!["SID", "Date"]);

    assert!(matches!(
        session.click_stats_row(1).await,
        Err(ConsoleError::Fatal { .. })
    ));
}

#[tokio::test]
async fn shutdown_closes_an_open_socket() {
    let gw = MockGateway {
        hold_open: true,
        ..MockGateway::with_frames(&[r#"{"126992":"12:00"}"#])
    };
    let addr = gw.serve().await;
    let mut session = session_for(addr, ConfigForm::default());
    session.open_stats().unwrap();
    assert!(session.next_stats_event().await);
    assert!(session.view().stats_connected());

    timeout(Duration::from_secs(5), session.shutdown())
        .await
        .expect("stats task did not stop");
    assert!(!session.view().stats_connected());
    assert!(!session.next_stats_event().await);
}

#[tokio::test]
async fn only_one_socket_per_session() {
    let addr = MockGateway::with_frames(&[]).serve().await;
    let mut session = session_for(addr, ConfigForm::default());
    session.open_stats().unwrap();
    assert!(matches!(session.open_stats(), Err(ConsoleError::Fatal { .. })));
    session.shutdown().await;
}

#[tokio::test]
async fn refused_socket_is_a_network_notice() {
    let addr = dead_addr().await;
    let mut session = session_for(addr, ConfigForm::default());
    session.open_stats().unwrap();

    assert!(session.next_stats_event().await);
    assert!(!session.next_stats_event().await);
    let notices = session.view_mut().take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Network);
}

#[tokio::test]
async fn idle_session_holds_back_the_socket_and_still_shuts_down() {
    let frames: Vec<String> = (0..3 * STATS_BACKLOG)
        .map(|n| format!(r#"{{"126992":"{n}"}}"#))
        .collect();
    let refs: Vec<&str> = frames.iter().map(String::as_str).collect();
    let gw = MockGateway {
        hold_open: true,
        ..MockGateway::with_frames(&refs)
    };
    let addr = gw.serve().await;
    let mut session = session_for(addr, ConfigForm::default());
    session.open_stats().unwrap();

    // Busy elsewhere while the gateway pushes more than the backlog.
    tokio::time::sleep(Duration::from_millis(200)).await;

    for n in 0..2 {
        assert!(session.next_stats_event().await);
        assert_eq!(session.view().stats.rows(), &[row("126992", &n.to_string())]);
    }

    timeout(Duration::from_secs(5), session.shutdown())
        .await
        .expect("stats task did not stop");
    assert!(!session.view().stats_connected());
}
