//! Per-item outcome reporting.
//!
//! Every operation reports exactly one [`OperationResult`] per input item
//! through a [`ResponseSink`], independent of sibling items' outcomes.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

use crate::item::ItemId;

/// Tracked payload property carrying the remaining TTL in seconds.
pub const TTL_METADATA: &str = "ttl";

/// Host-platform status of one item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    Success,
    /// The item was rejected for a reason the caller can correct.
    ApplicationError,
    /// The store failed while handling the item.
    Failure,
}

/// Status code reported alongside an [`OperationStatus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    NoKey,
    NotFound,
    BadInput,
    Err,
}

impl ResultCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoKey => "NO_KEY",
            Self::NotFound => "NOT_FOUND",
            Self::BadInput => "BAD_INPUT",
            Self::Err => "ERR",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response payload with optional tracked metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    pub data: Bytes,
    pub metadata: BTreeMap<String, String>,
}

impl Payload {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    /// The `ttl` tracked property, if attached.
    pub fn ttl(&self) -> Option<&str> {
        self.metadata.get(TTL_METADATA).map(String::as_str)
    }

    /// Payload data as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// The outcome reported for one input item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationResult {
    pub item: ItemId,
    pub status: OperationStatus,
    pub code: ResultCode,
    pub message: Option<String>,
    pub payload: Option<Payload>,
}

impl OperationResult {
    pub fn success(item: ItemId, payload: Payload) -> Self {
        Self {
            item,
            status: OperationStatus::Success,
            code: ResultCode::Ok,
            message: None,
            payload: Some(payload),
        }
    }

    /// A success with no payload, e.g. a get for an absent key.
    pub fn empty_success(item: ItemId) -> Self {
        Self {
            item,
            status: OperationStatus::Success,
            code: ResultCode::Ok,
            message: None,
            payload: None,
        }
    }

    pub fn application_error(
        item: ItemId,
        code: ResultCode,
        message: impl Into<String>,
        payload: Option<Payload>,
    ) -> Self {
        Self {
            item,
            status: OperationStatus::ApplicationError,
            code,
            message: Some(message.into()),
            payload,
        }
    }

    pub fn failure(item: ItemId, message: impl Into<String>) -> Self {
        Self {
            item,
            status: OperationStatus::Failure,
            code: ResultCode::Err,
            message: Some(message.into()),
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }
}

/// Accepts per-item outcomes from an operation.
pub trait ResponseSink {
    fn add_result(&mut self, result: OperationResult);
}

/// In-memory sink collecting every reported result in order.
#[derive(Clone, Debug, Default)]
pub struct CollectingResponse {
    results: Vec<OperationResult>,
}

impl CollectingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &[OperationResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<OperationResult> {
        self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// All results reported for the given item.
    pub fn for_item(&self, item: ItemId) -> Vec<&OperationResult> {
        self.results.iter().filter(|r| r.item == item).collect()
    }

    /// The single result for an item, if exactly one was reported.
    pub fn only(&self, item: ItemId) -> Option<&OperationResult> {
        match self.for_item(item).as_slice() {
            [one] => Some(*one),
            _ => None,
        }
    }

    pub fn count_status(&self, status: OperationStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

impl ResponseSink for CollectingResponse {
    fn add_result(&mut self, result: OperationResult) {
        self.results.push(result);
    }
}
