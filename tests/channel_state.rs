use event_feed::{EventBatch, FeedError, FeedResult, ScanMeta};
use tokio::sync::mpsc;

fn batch() -> EventBatch {
    EventBatch {
        events: Vec::new(),
        meta: ScanMeta { scan_latest_block_number: 110, scan_latest_block_completed: true },
        from_block: 100,
        to_block: 110,
        page_number: 1,
    }
}

mod channel_state_enum {
    use event_feed::ChannelState;

    #[test]
    fn open_and_closed_predicates() {
        assert!(ChannelState::Open.is_open());
        assert!(!ChannelState::Open.is_closed());
        assert!(ChannelState::Closed.is_closed());
        assert!(!ChannelState::Closed.is_open());
    }

    #[test]
    fn channel_state_is_copy() {
        let state = ChannelState::Open;
        let copied = state;
        assert_eq!(state, copied);
    }

    #[test]
    fn channel_state_debug_format() {
        assert_eq!(format!("{:?}", ChannelState::Open), "Open");
        assert_eq!(format!("{:?}", ChannelState::Closed), "Closed");
    }
}

mod try_stream {
    use super::*;
    use event_feed::{ChannelState, TryStream};

    #[tokio::test]
    async fn try_stream_returns_open_when_receiver_exists() {
        let (tx, _rx) = mpsc::channel::<FeedResult<EventBatch>>(10);

        let result = tx.try_stream(batch()).await;

        assert_eq!(result, ChannelState::Open);
    }

    #[tokio::test]
    async fn try_stream_returns_closed_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel::<FeedResult<EventBatch>>(10);
        drop(rx);

        let result = tx.try_stream(batch()).await;

        assert_eq!(result, ChannelState::Closed);
    }

    #[tokio::test]
    async fn try_stream_forwards_batches_and_errors() {
        let (tx, mut rx) = mpsc::channel::<FeedResult<EventBatch>>(10);

        assert!(tx.try_stream(batch()).await.is_open());
        assert!(tx.try_stream(FeedError::Timeout).await.is_open());

        assert_eq!(rx.recv().await.unwrap().unwrap(), batch());
        assert!(matches!(rx.recv().await.unwrap(), Err(FeedError::Timeout)));
    }
}
