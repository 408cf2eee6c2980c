//! Data shapes exchanged with the indexing service.
//!
//! Field names follow the service's camelCase JSON. Hex-encoded chain values are kept as the
//! strings the service sent so that one malformed field never rejects a whole page; the typed
//! accessors on [`Event`] parse them into [`alloy`] primitives on demand.

use alloy::primitives::{Address, B256, BlockHash, BlockNumber, Bytes, TxHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A single indexed contract event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Event {
    pub id: u64,
    pub block_number: BlockNumber,
    pub block_hash: String,
    pub transaction_hash: String,
    pub transaction_index: u32,
    pub log_index: u32,
    pub contract_address: String,
    pub user_address: String,
    pub trade_fee: u64,
    pub trade_fee_currency: String,
    pub event_unique_hash: String,
    pub event_name: String,
    pub event_signature: String,
    #[serde(deserialize_with = "null_as_default")]
    pub topics: Vec<String>,
    pub data: String,
    pub removed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Event {
    #[must_use]
    pub fn block_hash(&self) -> Option<BlockHash> {
        self.block_hash.parse().ok()
    }

    #[must_use]
    pub fn transaction_hash(&self) -> Option<TxHash> {
        self.transaction_hash.parse().ok()
    }

    #[must_use]
    pub fn contract_address(&self) -> Option<Address> {
        self.contract_address.parse().ok()
    }

    #[must_use]
    pub fn user_address(&self) -> Option<Address> {
        self.user_address.parse().ok()
    }

    /// Parses every topic; returns `None` if any of them is not a 32-byte hex word.
    #[must_use]
    pub fn topic_hashes(&self) -> Option<Vec<B256>> {
        self.topics.iter().map(|topic| topic.parse().ok()).collect()
    }

    #[must_use]
    pub fn data_bytes(&self) -> Option<Bytes> {
        self.data.parse().ok()
    }
}

/// One page of results for a `(fromBlock, toBlock, pageNumber)` query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Page {
    pub page: u64,
    pub size: u64,
    pub total: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub data: Vec<Event>,
    /// Chain head reported inline by services that support it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_block_number: Option<BlockNumber>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockNumber {
    pub latest_block_number: BlockNumber,
}

/// Envelope around every request/response payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// `200`, or an omitted/zero code, denotes success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == 200 || self.code == 0
    }
}

/// Body of the paginated event query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsRequest {
    pub from_block: BlockNumber,
    pub to_block: BlockNumber,
    pub event_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub page_number: u64,
    pub page_size: u64,
}

/// A one-shot pull subscription, expanded by the scanner into successive windows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub from_block: BlockNumber,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_names: Vec<String>,
}

impl SubscribeRequest {
    #[must_use]
    pub fn from_block(from_block: BlockNumber) -> Self {
        Self { from_block, ..Self::default() }
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn event_name(mut self, name: impl Into<String>) -> Self {
        self.event_names.push(name.into());
        self
    }
}

/// Subscription request sent as the first frame of a push-mode connection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_block: Option<BlockNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_block: Option<BlockNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Resumable progress attached to each delivered batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanMeta {
    /// Upper bound of the window the batch belongs to.
    pub scan_latest_block_number: BlockNumber,
    /// `true` once the window has been paged through completely.
    pub scan_latest_block_completed: bool,
}

/// One delivery from the cursor scanner: a single `(fromBlock, toBlock, pageNumber)` page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventBatch {
    pub events: Vec<Event>,
    pub meta: ScanMeta,
    pub from_block: BlockNumber,
    pub to_block: BlockNumber,
    pub page_number: u64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_event_with_missing_and_null_fields() {
        let event: Event = serde_json::from_value(json!({
            "id": 7,
            "blockNumber": 120,
            "blockHash": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
            "topics": null,
            "eventName": "Transfer",
            "createdAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(event.id, 7);
        assert_eq!(event.block_number, 120);
        assert!(event.topics.is_empty());
        assert_eq!(event.event_name, "Transfer");
        assert!(event.block_hash().is_some());
        assert!(event.created_at.is_some());
        assert!(event.updated_at.is_none());
        assert!(event.contract_address().is_none());
    }

    #[test]
    fn null_page_data_is_empty() {
        let page: Page =
            serde_json::from_value(json!({"page": 1, "size": 100, "total": 0, "data": null}))
                .unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.latest_block_number, None);
    }

    #[test]
    fn api_response_success_codes() {
        let ok: ApiResponse<LatestBlockNumber> =
            serde_json::from_value(json!({"data": {"latestBlockNumber": 5}})).unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.data.unwrap().latest_block_number, 5);

        let explicit: ApiResponse<()> =
            serde_json::from_value(json!({"code": 200, "message": "ok"})).unwrap();
        assert!(explicit.is_success());

        let failed: ApiResponse<()> =
            serde_json::from_value(json!({"code": 400, "message": "bad filter"})).unwrap();
        assert!(!failed.is_success());
    }

    #[test]
    fn events_request_wire_shape() {
        let request = EventsRequest {
            from_block: 100,
            to_block: 110,
            event_names: vec!["Transfer".into()],
            address: None,
            page_number: 1,
            page_size: 100,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "fromBlock": 100,
                "toBlock": 110,
                "eventNames": ["Transfer"],
                "pageNumber": 1,
                "pageSize": 100
            })
        );
    }

    #[test]
    fn stream_request_omits_unset_fields() {
        let request = StreamRequest { from_block: Some(5), ..StreamRequest::default() };
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({"fromBlock": 5}));
    }
}
