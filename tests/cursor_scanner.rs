mod common;

use std::time::Duration;

use common::{MockService, init_tracing, page, scanner};
use event_feed::{
    ChainHeadSource, CursorScannerBuilder, FeedError, SubscribeRequest, TransportResponse,
    assert_closed, assert_next, assert_next_batch, assert_pending,
};
use serde_json::json;

fn builder() -> CursorScannerBuilder {
    CursorScannerBuilder::new().window_span(10).page_size(100).poll_interval(Duration::from_millis(10))
}

#[tokio::test]
async fn pages_through_window_then_advances() -> anyhow::Result<()> {
    init_tracing();
    let service = MockService::with_head(1_000);
    service.push_page(page(100, 250));
    service.push_page(page(100, 250));
    service.push_page(page(50, 250));

    let scanner = scanner(&service, builder());
    let mut subscription = scanner.subscribe(SubscribeRequest::from_block(100))?;

    let first = assert_next_batch!(subscription, 100..=110, page = 1);
    assert_eq!(first.events.len(), 100);
    assert!(!first.meta.scan_latest_block_completed);
    assert_eq!(first.meta.scan_latest_block_number, 110);

    let second = assert_next_batch!(subscription, 100..=110, page = 2);
    assert!(!second.meta.scan_latest_block_completed);

    let third = assert_next_batch!(subscription, 100..=110, page = 3);
    assert_eq!(third.events.len(), 50);
    assert!(third.meta.scan_latest_block_completed);

    let fourth = assert_next_batch!(subscription, 111..=121, page = 1);
    assert!(fourth.events.is_empty());
    assert!(fourth.meta.scan_latest_block_completed);

    let _ = assert_next_batch!(subscription, 122..=132, page = 1);

    subscription.handle().stop();
    Ok(())
}

#[tokio::test]
async fn short_first_page_moves_to_next_window() -> anyhow::Result<()> {
    let service = MockService::with_head(1_000);
    service.push_page(page(50, 50));

    let scanner = scanner(&service, builder());
    let mut subscription = scanner.subscribe(SubscribeRequest::from_block(100))?;

    let batch = assert_next_batch!(subscription, 100..=110, page = 1);
    assert!(batch.meta.scan_latest_block_completed);
    let _ = assert_next_batch!(subscription, 111..=121, page = 1);

    let requests = service.requests();
    assert_eq!((requests[1].from_block, requests[1].to_block, requests[1].page_number), (111, 121, 1));
    Ok(())
}

#[tokio::test]
async fn full_page_matching_total_completes_window() -> anyhow::Result<()> {
    let service = MockService::with_head(1_000);
    service.push_page(page(100, 100));

    let scanner = scanner(&service, builder());
    let mut subscription = scanner.subscribe(SubscribeRequest::from_block(0))?;

    let batch = assert_next_batch!(subscription, 0..=10, page = 1);
    assert!(batch.meta.scan_latest_block_completed);
    let _ = assert_next_batch!(subscription, 11..=21, page = 1);
    Ok(())
}

#[tokio::test]
async fn waits_while_chain_head_is_behind_window() -> anyhow::Result<()> {
    let service = MockService::with_head(105);
    service.push_page(page(3, 3));

    let scanner = scanner(&service, builder());
    let mut subscription = scanner.subscribe(SubscribeRequest::from_block(100))?;

    assert_pending!(subscription, millis = 100);
    assert!(service.requests().is_empty());
    assert!(service.head_calls() > 1);

    service.set_head(110);
    let batch = assert_next_batch!(subscription, 100..=110, page = 1);
    assert_eq!(batch.events.len(), 3);
    Ok(())
}

#[tokio::test]
async fn failed_cycle_is_reported_and_retried_at_same_position() -> anyhow::Result<()> {
    let service = MockService::with_head(1_000);
    service.push_page(page(100, 300));
    service.push_response(Ok(TransportResponse::ok(
        json!({"code": 400, "message": "invalid filter"}).to_string(),
    )));
    service.push_response(Err(FeedError::Transport("connection reset".into())));
    service.push_page(page(10, 300));

    let scanner = scanner(&service, builder());
    let mut subscription = scanner.subscribe(SubscribeRequest::from_block(100))?;

    let _ = assert_next_batch!(subscription, 100..=110, page = 1);
    assert_next!(subscription, Err(FeedError::Api { code: 400, message: String::new() }));
    assert_next!(subscription, Err(FeedError::RetriesExhausted {
        attempts: 1,
        source: Box::new(FeedError::Timeout)
    }));
    let batch = assert_next_batch!(subscription, 100..=110, page = 2);
    assert!(batch.meta.scan_latest_block_completed);

    let pages: Vec<u64> = service.requests().iter().take(4).map(|r| r.page_number).collect();
    assert_eq!(pages, vec![1, 2, 2, 2]);
    Ok(())
}

#[tokio::test]
async fn flow_control_releases_one_batch_per_ack() -> anyhow::Result<()> {
    let service = MockService::with_head(u64::MAX);
    let scanner = scanner(&service, builder().flow_control(true));
    let mut subscription = scanner.subscribe(SubscribeRequest::from_block(0))?;

    let _ = assert_next_batch!(subscription, 0..=10, page = 1);
    assert_pending!(subscription, millis = 100);
    assert_eq!(service.requests().len(), 1);

    let windows = [11..=21, 22..=32, 33..=43];
    for window in windows {
        subscription.ack().await?;
        let _ = assert_next_batch!(subscription, window, page = 1);
    }

    assert_pending!(subscription, millis = 100);
    assert_eq!(service.requests().len(), 4);
    Ok(())
}

#[tokio::test]
async fn acknowledger_can_be_moved_to_another_task() -> anyhow::Result<()> {
    let service = MockService::with_head(u64::MAX);
    let scanner = scanner(&service, builder().flow_control(true));
    let mut subscription = scanner.subscribe(SubscribeRequest::from_block(0))?;
    let acknowledger = subscription.acknowledger().expect("flow control enabled");

    let acks = tokio::spawn(async move {
        for _ in 0..2 {
            acknowledger.ack().await?;
        }
        Ok::<_, FeedError>(())
    });

    let _ = assert_next_batch!(subscription, 0..=10, page = 1);
    let _ = assert_next_batch!(subscription, 11..=21, page = 1);
    let _ = assert_next_batch!(subscription, 22..=32, page = 1);
    acks.await??;
    assert_pending!(subscription, millis = 100);
    Ok(())
}

#[tokio::test]
async fn ack_without_flow_control_is_a_no_op() -> anyhow::Result<()> {
    let service = MockService::with_head(u64::MAX);
    let scanner = scanner(&service, builder());
    let subscription = scanner.subscribe(SubscribeRequest::from_block(0))?;

    assert!(subscription.acknowledger().is_none());
    subscription.ack().await?;
    Ok(())
}

#[tokio::test]
async fn inline_chain_head_skips_head_endpoint() -> anyhow::Result<()> {
    let service = MockService::with_head(0);
    let mut behind = page(5, 5);
    behind["latestBlockNumber"] = json!(105);
    let mut mined = page(5, 5);
    mined["latestBlockNumber"] = json!(200);
    service.push_page(behind);
    service.push_page(mined);

    let scanner = scanner(
        &service,
        builder().chain_head_source(ChainHeadSource::Inline).flow_control(true),
    );
    let mut subscription = scanner.subscribe(SubscribeRequest::from_block(100))?;

    let batch = assert_next_batch!(subscription, 100..=110, page = 1);
    assert_eq!(batch.events.len(), 5);
    assert_eq!(service.head_calls(), 0);

    let requests = service.requests();
    assert_eq!(requests[0].page_number, 1);
    assert_eq!(requests[1].page_number, 1);
    Ok(())
}

#[tokio::test]
async fn filters_reach_every_query() -> anyhow::Result<()> {
    let service = MockService::with_head(u64::MAX);
    let scanner = scanner(&service, builder().page_size(25));
    let request = SubscribeRequest::from_block(7)
        .address("0x6b175474e89094c44da98b954eedeac495271d0f")
        .event_name("Transfer")
        .event_name("Approval");
    let mut subscription = scanner.subscribe(request)?;

    let _ = assert_next_batch!(subscription, 7..=17, page = 1);
    let _ = assert_next_batch!(subscription, 18..=28, page = 1);

    for query in service.requests().iter().take(2) {
        assert_eq!(query.page_size, 25);
        assert_eq!(query.address.as_deref(), Some("0x6b175474e89094c44da98b954eedeac495271d0f"));
        assert_eq!(query.event_names, vec!["Transfer".to_string(), "Approval".to_string()]);
    }
    Ok(())
}

#[tokio::test]
async fn stop_closes_subscription() -> anyhow::Result<()> {
    let service = MockService::with_head(u64::MAX);
    let scanner = scanner(&service, builder().flow_control(true));
    let mut subscription = scanner.subscribe(SubscribeRequest::from_block(0))?;
    let handle = subscription.handle();

    let _ = assert_next_batch!(subscription, 0..=10, page = 1);
    handle.stop();
    assert!(handle.is_stopped());

    assert_closed!(subscription);
    assert!(matches!(subscription.ack().await, Err(FeedError::FlowControlClosed)));
    Ok(())
}

#[tokio::test]
async fn stop_interrupts_delivery_into_full_buffer() -> anyhow::Result<()> {
    let service = MockService::with_head(u64::MAX);
    let scanner = scanner(&service, builder().buffer_capacity(1));
    let mut subscription = scanner.subscribe(SubscribeRequest::from_block(0))?;

    // one batch buffered, the second one waiting for room
    tokio::time::timeout(Duration::from_secs(5), async {
        while service.requests().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(service.requests().len(), 2);

    subscription.handle().stop();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let _ = assert_next_batch!(subscription, 0..=10, page = 1);
    assert_closed!(subscription);
    assert_eq!(service.requests().len(), 2);
    Ok(())
}

#[test]
fn rejects_degenerate_configuration() {
    let service = MockService::default();
    let fetcher = || event_feed::RetryingFetcherBuilder::fragile(service.clone()).build().unwrap();

    assert!(matches!(
        CursorScannerBuilder::new().page_size(0).connect(fetcher()),
        Err(FeedError::InvalidPageSize)
    ));
    assert!(matches!(
        CursorScannerBuilder::new().window_span(0).connect(fetcher()),
        Err(FeedError::InvalidWindowSpan)
    ));
    assert!(matches!(
        CursorScannerBuilder::new().poll_interval(Duration::ZERO).connect(fetcher()),
        Err(FeedError::InvalidPollInterval)
    ));
    assert!(matches!(
        CursorScannerBuilder::new().buffer_capacity(0).connect(fetcher()),
        Err(FeedError::InvalidBufferCapacity)
    ));
}
