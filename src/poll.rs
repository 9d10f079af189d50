//! Polling controls and result extraction for in-flight generation jobs.

use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::types::HistoryItem;

/// Fail code the service reports when the content filter rejects a job.
pub(crate) const CONTENT_FILTER_FAIL_CODE: &str = "2038";

/// Decoded job status. The service reports numeric codes; anything outside
/// the known set is carried through as [`JobStatus::Other`] and treated as
/// terminal, matching the web client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Code 20: still queued or rendering.
    Pending,
    /// Code 30: terminal failure; see `fail_code`.
    Failed,
    /// Code 50: finished, results available.
    Done,
    /// Any other code the service may emit.
    Other(i64),
}

impl JobStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            20 => JobStatus::Pending,
            30 => JobStatus::Failed,
            50 => JobStatus::Done,
            other => JobStatus::Other(other),
        }
    }
}

/// Controls for the poll-until-terminal loop.
///
/// The service itself never bounds the loop, so the defaults impose a
/// ceiling; set `max_attempts` and `timeout` to `None` to restore the
/// unbounded behavior. A [`CancellationToken`] stops the loop at the next
/// suspension point and surfaces [`JimengError::Cancelled`](crate::JimengError::Cancelled).
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Delay between consecutive status requests.
    pub interval: Duration,
    /// Maximum number of status requests before giving up with `TimedOut`.
    pub max_attempts: Option<u32>,
    /// Overall deadline for the loop, checked between requests.
    pub timeout: Option<Duration>,
    /// Caller-supplied cancellation signal.
    pub cancel: Option<CancellationToken>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: Some(300),
            timeout: None,
            cancel: None,
        }
    }
}

/// Collects the result URLs of a finished job, in item order.
///
/// Each item contributes its first large-image URL when any large image was
/// rendered, otherwise its cover URL; items with neither are skipped.
pub(crate) fn extract_image_urls(items: &[HistoryItem]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| {
            match item
                .image
                .as_ref()
                .filter(|image| !image.large_images.is_empty())
            {
                Some(image) => image.large_images[0].image_url.clone(),
                None => item
                    .common_attr
                    .as_ref()
                    .and_then(|attr| attr.cover_url.clone()),
            }
        })
        .collect()
}

/// Builds the body of `POST /mweb/v1/get_history_by_ids`: the polled history
/// id plus the fixed family of output renditions the web client requests.
pub(crate) fn history_query_body(history_id: &str, aid: u64) -> Value {
    json!({
        "history_ids": [history_id],
        "image_info": {
            "width": 2048,
            "height": 2048,
            "format": "webp",
            "image_scene_list": [
                {"scene": "smart_crop", "width": 360, "height": 360, "uniq_key": "smart_crop-w:360-h:360", "format": "webp"},
                {"scene": "smart_crop", "width": 480, "height": 480, "uniq_key": "smart_crop-w:480-h:480", "format": "webp"},
                {"scene": "smart_crop", "width": 720, "height": 720, "uniq_key": "smart_crop-w:720-h:720", "format": "webp"},
                {"scene": "smart_crop", "width": 720, "height": 480, "uniq_key": "smart_crop-w:720-h:480", "format": "webp"},
                {"scene": "smart_crop", "width": 360, "height": 240, "uniq_key": "smart_crop-w:360-h:240", "format": "webp"},
                {"scene": "smart_crop", "width": 240, "height": 320, "uniq_key": "smart_crop-w:240-h:320", "format": "webp"},
                {"scene": "smart_crop", "width": 480, "height": 640, "uniq_key": "smart_crop-w:480-h:640", "format": "webp"},
                {"scene": "normal", "width": 2400, "height": 2400, "uniq_key": "2400", "format": "webp"},
                {"scene": "normal", "width": 1080, "height": 1080, "uniq_key": "1080", "format": "webp"},
                {"scene": "normal", "width": 720, "height": 720, "uniq_key": "720", "format": "webp"},
                {"scene": "normal", "width": 480, "height": 480, "uniq_key": "480", "format": "webp"},
                {"scene": "normal", "width": 360, "height": 360, "uniq_key": "360", "format": "webp"}
            ]
        },
        "http_common_info": {
            "aid": aid
        }
    })
}
