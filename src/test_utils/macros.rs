#[macro_export]
macro_rules! assert_next {
    // error variants are compared by discriminant only
    ($stream: expr, Err($expected_err:expr)) => {
        $crate::assert_next!($stream, Err($expected_err), timeout = 5)
    };
    ($stream: expr, Err($expected_err:expr), timeout = $secs: expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out");
        if let Some(msg) = message {
            let expected = &$expected_err;
            assert_eq!(&msg, expected, "Expected error {:?}, got {:?}", expected, msg);
        } else {
            panic!("Expected error {:?}, but channel was closed", $expected_err);
        }
    };

    ($stream: expr, $expected: expr) => {
        $crate::assert_next!($stream, $expected, timeout = 5)
    };
    ($stream: expr, $expected: expr, timeout = $secs: expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out");
        let expected = $expected;
        match message {
            std::option::Option::Some(std::result::Result::Ok(msg)) => {
                assert_eq!(msg, expected, "Expected {:?}, got {:?}", expected, msg);
            }
            std::option::Option::Some(std::result::Result::Err(e)) => {
                panic!("Expected Ok({:?}), got Err({:?})", expected, e);
            }
            std::option::Option::None => {
                panic!("Expected Ok({:?}), but channel was closed", expected);
            }
        }
    };
}

/// Awaits the next [`EventBatch`](crate::EventBatch) and checks which `(window, page)` it was
/// fetched for. Evaluates to the batch.
///
/// ```rust,ignore
/// let batch = assert_next_batch!(subscription, 100..=110, page = 1);
/// assert!(batch.meta.scan_latest_block_completed);
/// ```
#[macro_export]
macro_rules! assert_next_batch {
    ($stream: expr, $window: expr, page = $page: expr) => {
        $crate::assert_next_batch!($stream, $window, page = $page, timeout = 5)
    };
    ($stream: expr, $window: expr, page = $page: expr, timeout = $secs: expr) => {{
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out waiting for the next batch");
        let window: std::ops::RangeInclusive<u64> = $window;
        match message {
            std::option::Option::Some(std::result::Result::Ok(batch)) => {
                assert_eq!(
                    (batch.from_block..=batch.to_block, batch.page_number),
                    (window.clone(), $page),
                    "unexpected batch position"
                );
                batch
            }
            std::option::Option::Some(std::result::Result::Err(e)) => {
                panic!("Expected batch for {:?} page {}, got Err({:?})", window, $page, e);
            }
            std::option::Option::None => {
                panic!("Expected batch for {:?} page {}, but channel was closed", window, $page);
            }
        }
    }};
}

#[macro_export]
macro_rules! assert_closed {
    ($stream: expr) => {
        $crate::assert_closed!($stream, timeout = 5)
    };
    ($stream: expr, timeout = $secs: expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out");
        assert!(message.is_none(), "Expected closed stream, got {:?}", message)
    };
}

/// Asserts that the stream yields nothing for `millis` milliseconds.
#[macro_export]
macro_rules! assert_pending {
    ($stream: expr) => {
        $crate::assert_pending!($stream, millis = 200)
    };
    ($stream: expr, millis = $millis: expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_millis($millis),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await;
        assert!(message.is_err(), "Expected no pending items, got {:?}", message)
    };
}
