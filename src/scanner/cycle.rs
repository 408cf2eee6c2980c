use std::{sync::Arc, time::Duration};

use alloy::primitives::BlockNumber;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    FeedError, FeedResult,
    config::ChainHeadSource,
    fetcher::RetryingFetcher,
    flow_control::AckReceiver,
    model::EventBatch,
    scanner::Cursor,
    transport::Transport,
    types::TryStream,
};

/// Outcome of one fetch cycle.
#[derive(Debug)]
pub(crate) enum Cycle {
    /// A page was fetched and the cursor moved past it.
    Delivered(EventBatch),
    /// The service has not indexed the whole window yet; the cursor is unchanged.
    Pending { chain_head: BlockNumber },
}

/// Everything a running scanner task owns.
pub(crate) struct ScanLoop<T> {
    pub(crate) fetcher: Arc<RetryingFetcher<T>>,
    pub(crate) cursor: Cursor,
    pub(crate) poll_interval: Duration,
    pub(crate) chain_head_source: ChainHeadSource,
    // dropped before `sender`, so a closed subscription never accepts a late acknowledgement
    pub(crate) acks: Option<AckReceiver>,
    pub(crate) sender: mpsc::Sender<FeedResult<EventBatch>>,
    pub(crate) token: CancellationToken,
}

impl<T: Transport> ScanLoop<T> {
    /// Runs fetch cycles until the token is cancelled, the consumer goes away, or, with flow
    /// control, every acknowledger is dropped.
    ///
    /// Cycles are strictly sequential: the next one starts only after the previous delivery (and
    /// its acknowledgement) completed and a poll interval elapsed.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
    pub(crate) async fn run(mut self) {
        loop {
            let cycle = tokio::select! {
                biased;
                () = self.token.cancelled() => break,
                cycle = scan_cycle(&self.fetcher, &mut self.cursor, self.chain_head_source) => cycle,
            };

            match cycle {
                Ok(Cycle::Delivered(batch)) => {
                    let delivered = tokio::select! {
                        biased;
                        () = self.token.cancelled() => break,
                        delivered = self.sender.try_stream(batch) => delivered,
                    };
                    if delivered.is_closed() {
                        break;
                    }
                    if let Some(acks) = self.acks.as_mut() {
                        trace!("Waiting for acknowledgement");
                        let acked = tokio::select! {
                            biased;
                            () = self.token.cancelled() => break,
                            acked = acks.wait() => acked,
                        };
                        if acked.is_err() {
                            debug!("Every acknowledger dropped, stopping scanner");
                            break;
                        }
                    }
                }
                Ok(Cycle::Pending { chain_head }) => {
                    let window = self.cursor.window();
                    debug!(
                        chain_head = chain_head,
                        to_block = *window.end(),
                        "Window not mined yet, waiting for next cycle"
                    );
                }
                Err(err) => {
                    // the cursor was not touched, the same page is fetched again next cycle
                    let delivered = tokio::select! {
                        biased;
                        () = self.token.cancelled() => break,
                        delivered = self.sender.try_stream(err) => delivered,
                    };
                    if delivered.is_closed() {
                        break;
                    }
                }
            }

            tokio::select! {
                biased;
                () = self.token.cancelled() => break,
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        debug!("Cursor scanner stopped");
    }
}

/// Performs one head check and page fetch, advancing `cursor` only on success.
pub(crate) async fn scan_cycle<T: Transport>(
    fetcher: &RetryingFetcher<T>,
    cursor: &mut Cursor,
    chain_head_source: ChainHeadSource,
) -> Result<Cycle, FeedError> {
    if chain_head_source == ChainHeadSource::Endpoint {
        let chain_head = fetcher.latest_block_number().await?;
        if !cursor.is_window_mined(chain_head) {
            return Ok(Cycle::Pending { chain_head });
        }
    }

    let request = cursor.request();
    let page = fetcher.fetch_events(&request).await?;

    if chain_head_source == ChainHeadSource::Inline {
        let chain_head = match page.latest_block_number {
            Some(chain_head) => chain_head,
            None => fetcher.latest_block_number().await?,
        };
        if !cursor.is_window_mined(chain_head) {
            return Ok(Cycle::Pending { chain_head });
        }
    }

    let meta = cursor.advance(page.data.len(), page.total);

    trace!(
        from_block = request.from_block,
        to_block = request.to_block,
        page_number = request.page_number,
        events = page.data.len(),
        completed = meta.scan_latest_block_completed,
        "Fetched page"
    );

    Ok(Cycle::Delivered(EventBatch {
        events: page.data,
        meta,
        from_block: request.from_block,
        to_block: request.to_block,
        page_number: request.page_number,
    }))
}
