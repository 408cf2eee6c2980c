use std::ops::RangeInclusive;

use alloy::primitives::BlockNumber;

use crate::{
    FeedError,
    model::{EventsRequest, ScanMeta, SubscribeRequest},
};

/// Block-range and pagination position of one pull subscription.
///
/// The window `[from_block, to_block]` stays fixed while it is being paged through and only the
/// page number moves. Once a page comes back short, or the pages seen so far account for the
/// reported total, the window shifts to `[to_block + 1, to_block + 1 + window_span]` and paging
/// restarts at 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    from_block: BlockNumber,
    to_block: BlockNumber,
    page_number: u64,
    page_size: u64,
    window_span: u64,
    address: Option<String>,
    event_names: Vec<String>,
}

impl Cursor {
    /// Positions a cursor on the first page of `[from_block, from_block + window_span]`.
    ///
    /// # Errors
    ///
    /// * [`FeedError::InvalidPageSize`] - if `page_size` is 0.
    /// * [`FeedError::InvalidWindowSpan`] - if `window_span` is 0.
    pub fn new(
        request: SubscribeRequest,
        page_size: u64,
        window_span: u64,
    ) -> Result<Self, FeedError> {
        if page_size == 0 {
            return Err(FeedError::InvalidPageSize);
        }
        if window_span == 0 {
            return Err(FeedError::InvalidWindowSpan);
        }
        Ok(Self {
            from_block: request.from_block,
            to_block: request.from_block.saturating_add(window_span),
            page_number: 1,
            page_size,
            window_span,
            address: request.address,
            event_names: request.event_names,
        })
    }

    /// The query for the current `(from_block, to_block, page_number)` position.
    #[must_use]
    pub fn request(&self) -> EventsRequest {
        EventsRequest {
            from_block: self.from_block,
            to_block: self.to_block,
            event_names: self.event_names.clone(),
            address: self.address.clone(),
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }

    /// Whether the service has indexed every block of the current window.
    #[must_use]
    pub fn is_window_mined(&self, chain_head: BlockNumber) -> bool {
        chain_head >= self.to_block
    }

    /// Moves past the page that was just fetched and reports the progress it represents.
    ///
    /// `returned` is the number of events on the page, `total` the service's item count for the
    /// whole window.
    pub fn advance(&mut self, returned: usize, total: u64) -> ScanMeta {
        let short_page = u64::try_from(returned).is_ok_and(|n| n < self.page_size);
        let last_page = self.page_number.saturating_mul(self.page_size) == total;
        let completed = short_page || last_page;

        let meta =
            ScanMeta { scan_latest_block_number: self.to_block, scan_latest_block_completed: completed };

        if completed {
            self.from_block = self.to_block.saturating_add(1);
            self.to_block = self.from_block.saturating_add(self.window_span);
            self.page_number = 1;
        } else {
            self.page_number += 1;
        }

        meta
    }

    #[must_use]
    pub fn window(&self) -> RangeInclusive<BlockNumber> {
        self.from_block..=self.to_block
    }

    #[must_use]
    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }
}
