mod common;

use jimeng::{JimengError, PollOptions};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

use common::HistorySequence;

fn forever_pending(server_mock_id: &str) -> HistorySequence {
    HistorySequence::new(server_mock_id, vec![common::pending_record()])
}

#[tokio::test]
async fn test_cancellation_stops_the_poll_loop() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mweb/v1/get_history_by_ids"))
        .respond_with(forever_pending("hist-1"))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let options = PollOptions {
        interval: Duration::from_millis(10),
        max_attempts: None,
        timeout: None,
        cancel: Some(cancel.clone()),
    };

    let client = common::client(&server);
    let waiter = tokio::spawn(async move {
        client.wait_for_history("hist-1", &options).await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(JimengError::Cancelled)));
}

#[tokio::test]
async fn test_attempt_ceiling_times_the_loop_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mweb/v1/get_history_by_ids"))
        .respond_with(forever_pending("hist-2"))
        .mount(&server)
        .await;

    let options = PollOptions {
        interval: Duration::from_millis(5),
        max_attempts: Some(3),
        timeout: None,
        cancel: None,
    };

    let client = common::client(&server);
    let result = client.wait_for_history("hist-2", &options).await;
    assert!(matches!(result, Err(JimengError::TimedOut)));

    // Three status requests were issued, then the loop gave up.
    let polls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/mweb/v1/get_history_by_ids")
        .count();
    assert_eq!(polls, 3);
}

#[tokio::test]
async fn test_deadline_times_the_loop_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mweb/v1/get_history_by_ids"))
        .respond_with(forever_pending("hist-3"))
        .mount(&server)
        .await;

    let options = PollOptions {
        interval: Duration::from_millis(10),
        max_attempts: None,
        timeout: Some(Duration::from_millis(60)),
        cancel: None,
    };

    let client = common::client(&server);
    let result = client.wait_for_history("hist-3", &options).await;
    assert!(matches!(result, Err(JimengError::TimedOut)));
}

#[tokio::test]
async fn test_done_with_an_empty_item_list_yields_no_urls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mweb/v1/get_history_by_ids"))
        .respond_with(HistorySequence::new("hist-4", vec![common::done_record(&[])]))
        .mount(&server)
        .await;

    let options = PollOptions {
        interval: Duration::from_millis(10),
        ..PollOptions::default()
    };

    let client = common::client(&server);
    let urls = client.wait_for_history("hist-4", &options).await.unwrap();
    assert!(urls.is_empty());
}
