use serde::Deserialize;
use std::path::PathBuf;

/// (Internal) A generic wrapper for API responses where the content is nested
/// under a "data" field, alongside the service's error message when the call
/// was rejected at the application level.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub(crate) data: Option<T>,
    #[serde(default)]
    pub(crate) errmsg: Option<String>,
}

/// The account's credit breakdown.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CreditInfo {
    /// Free credit granted by the daily claim.
    #[serde(default)]
    pub gift_credit: i64,
    /// Credit bought outright.
    #[serde(default)]
    pub purchase_credit: i64,
    /// Credit included with a VIP subscription.
    #[serde(default)]
    pub vip_credit: i64,
}

impl CreditInfo {
    /// Total credit available for generation.
    pub fn total(&self) -> i64 {
        self.gift_credit + self.purchase_credit + self.vip_credit
    }
}

/// (Internal) Envelope of the balance endpoint; the breakdown sits at the top
/// level rather than under "data".
#[derive(Debug, Deserialize)]
pub(crate) struct CreditResponse {
    #[serde(default)]
    pub(crate) credit: Option<CreditInfo>,
}

/// (Internal) Short-lived credentials returned by the upload-token endpoint,
/// scoped to a single upload's signed calls.
#[derive(Debug, Deserialize, Clone)]
pub(crate) struct UploadCredentials {
    pub(crate) access_key_id: String,
    pub(crate) secret_access_key: String,
    pub(crate) session_token: String,
}

/// (Internal) Envelope of the object-storage endpoint: either a `Result`
/// payload or a `Response.Error` rejection.
#[derive(Debug, Deserialize)]
pub(crate) struct ImagexResponse<T> {
    #[serde(rename = "Response", default)]
    pub(crate) response: Option<ImagexResponseMeta>,
    #[serde(rename = "Result")]
    pub(crate) result: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImagexResponseMeta {
    #[serde(rename = "Error", default)]
    pub(crate) error: Option<ImagexError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImagexError {
    #[serde(rename = "Message")]
    pub(crate) message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplyUploadResult {
    #[serde(rename = "UploadAddress")]
    pub(crate) upload_address: UploadAddress,
}

/// (Internal) Where and how to push the raw bytes; consumed immediately by
/// the one upload it was issued for.
#[derive(Debug, Deserialize)]
pub(crate) struct UploadAddress {
    #[serde(rename = "UploadHosts")]
    pub(crate) upload_hosts: Vec<String>,
    #[serde(rename = "StoreInfos")]
    pub(crate) store_infos: Vec<StoreInfo>,
    #[serde(rename = "SessionKey")]
    pub(crate) session_key: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoreInfo {
    #[serde(rename = "StoreUri")]
    pub(crate) store_uri: String,
    #[serde(rename = "Auth")]
    pub(crate) auth: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitUploadResult {
    #[serde(rename = "Results")]
    pub(crate) results: Vec<CommittedUpload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommittedUpload {
    #[serde(rename = "Uri")]
    pub(crate) uri: String,
}

/// (Internal) Response of the raw byte upload; `code` 2000 means accepted.
#[derive(Debug, Deserialize)]
pub(crate) struct StoreUploadResponse {
    pub(crate) code: i64,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

/// (Internal) Payload of a successful generation submission.
#[derive(Debug, Deserialize)]
pub(crate) struct SubmitData {
    #[serde(default)]
    pub(crate) aigc_data: Option<AigcData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AigcData {
    #[serde(default)]
    pub(crate) history_record_id: Option<String>,
}

/// The state of a generation job as reported by the history endpoint.
///
/// `status` carries the raw numeric code (20 pending, 30 failed, 50 done);
/// see [`JobStatus`](crate::poll::JobStatus) for the decoded form.
#[derive(Debug, Deserialize, Clone)]
pub struct GenerationRecord {
    pub status: i64,
    #[serde(default)]
    pub fail_code: Option<String>,
    #[serde(default)]
    pub item_list: Vec<HistoryItem>,
}

/// One produced item of a finished generation.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HistoryItem {
    #[serde(default)]
    pub image: Option<ItemImage>,
    #[serde(default)]
    pub common_attr: Option<CommonAttr>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ItemImage {
    #[serde(default)]
    pub large_images: Vec<LargeImage>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LargeImage {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CommonAttr {
    #[serde(default)]
    pub cover_url: Option<String>,
}

/// A reference image handed to [`generate`](crate::JimengClient::generate):
/// raw bytes, a local file, or a remote URL fetched before upload.
#[derive(Debug, Clone)]
pub enum ImageInput {
    Bytes(Vec<u8>),
    Path(PathBuf),
    Url(String),
}

impl ImageInput {
    /// Interprets a string the way the web client does: anything starting
    /// with `http://` or `https://` is a URL, everything else a local path.
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            ImageInput::Url(source.to_string())
        } else {
            ImageInput::Path(PathBuf::from(source))
        }
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::Bytes(bytes)
    }
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        ImageInput::Path(path)
    }
}
