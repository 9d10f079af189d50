//! The three-phase upload pipeline: apply for an upload address, push the
//! raw bytes, commit. All three calls are authorized with short-lived
//! credentials fetched once per upload; any failure aborts the whole upload
//! with no retry.

use rand::Rng;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::client::JimengClient;
use crate::error::JimengError;
use crate::signer::{canonical_query, RequestSigner};
use crate::types::{
    ApiResponse, ApplyUploadResult, CommitUploadResult, ImageInput, ImagexResponse,
    StoreUploadResponse, UploadCredentials,
};

pub(crate) const DEFAULT_IMAGEX_ENDPOINT: &str = "https://imagex.bytedanceapi.com/";
const IMAGEX_REGION: &str = "cn-north-1";
const IMAGEX_SERVICE: &str = "imagex";
const IMAGEX_SERVICE_ID: &str = "tb4s082cfz";
const IMAGEX_API_VERSION: &str = "2018-08-01";

/// Raw image content plus its checksum, computed once and reused across the
/// apply/store/commit sequence.
struct ImageAsset {
    bytes: Vec<u8>,
    crc32: u32,
}

impl ImageAsset {
    fn new(bytes: Vec<u8>) -> Self {
        let crc32 = crc32fast::hash(&bytes);
        Self { bytes, crc32 }
    }

    /// Lower-case hex of the checksum integer, without zero padding, the
    /// form the store endpoint expects in `Content-Crc32`.
    fn crc32_hex(&self) -> String {
        format!("{:x}", self.crc32)
    }
}

/// The `s` query nonce: 11 random lowercase-alphanumeric characters.
fn random_nonce(length: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

fn upload_target(host: &str, store_uri: &str) -> String {
    // Hosts come back without a scheme; accept scheme-qualified ones so the
    // store endpoint can be mocked in tests.
    if host.contains("://") {
        format!("{host}/upload/v1/{store_uri}")
    } else {
        format!("https://{host}/upload/v1/{store_uri}")
    }
}

fn into_step_result<T>(response: ImagexResponse<T>, step: &'static str) -> Result<T, JimengError> {
    if let Some(error) = response.response.and_then(|meta| meta.error) {
        return Err(JimengError::Upload {
            step,
            message: error.message,
        });
    }
    response
        .result
        .ok_or_else(|| JimengError::Protocol(format!("storage {step} response carried no result")))
}

impl JimengClient {
    /// Fetches the short-lived signing credentials for one upload.
    pub(crate) async fn get_upload_token(&self) -> Result<UploadCredentials, JimengError> {
        let response: ApiResponse<UploadCredentials> = self
            .request_json(
                Method::POST,
                "/mweb/v1/get_upload_token?aid=513695&da_version=3.2.2&aigc_features=app_lip_sync",
                Some(&json!({ "scene": 2 })),
                &[],
                None,
            )
            .await?;

        response.data.ok_or_else(|| {
            JimengError::Auth(response.errmsg.unwrap_or_else(|| {
                "no upload credentials were returned; the account may be logged out".to_string()
            }))
        })
    }

    /// Resolves an [`ImageInput`] into raw bytes.
    pub(crate) async fn load_image(&self, input: ImageInput) -> Result<Vec<u8>, JimengError> {
        match input {
            ImageInput::Bytes(bytes) => Ok(bytes),
            ImageInput::Path(path) => Ok(tokio::fs::read(path).await?),
            ImageInput::Url(url) => {
                let response = self.http.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(JimengError::ApiError {
                        message: format!(
                            "failed to fetch reference image: status {}",
                            response.status()
                        ),
                    });
                }
                Ok(response.bytes().await?.to_vec())
            }
        }
    }

    /// Uploads image bytes and returns the server-side asset URI referenced
    /// by blend drafts.
    pub async fn upload_image(&self, bytes: Vec<u8>) -> Result<String, JimengError> {
        let credentials = self.get_upload_token().await?;
        let asset = ImageAsset::new(bytes);
        let signer = RequestSigner::new(&credentials, IMAGEX_REGION, IMAGEX_SERVICE);

        // Phase 1: apply for an upload address.
        let apply_params = vec![
            ("Action".to_string(), "ApplyImageUpload".to_string()),
            ("FileSize".to_string(), asset.bytes.len().to_string()),
            ("ServiceId".to_string(), IMAGEX_SERVICE_ID.to_string()),
            ("Version".to_string(), IMAGEX_API_VERSION.to_string()),
            ("s".to_string(), random_nonce(11)),
        ];
        let headers = signer.sign("GET", &apply_params, None);
        let apply: ImagexResponse<ApplyUploadResult> = self
            .imagex_request(Method::GET, &apply_params, headers, None)
            .await?;
        let address = into_step_result(apply, "apply")?.upload_address;

        let host = address.upload_hosts.first().ok_or_else(|| {
            JimengError::Protocol("upload address carried no upload hosts".to_string())
        })?;
        let store = address.store_infos.first().ok_or_else(|| {
            JimengError::Protocol("upload address carried no store infos".to_string())
        })?;

        // Phase 2: push the raw bytes to the granted store URI.
        debug!(size = asset.bytes.len(), host = %host, "uploading image bytes");
        let response = self
            .http
            .post(upload_target(host, &store.store_uri))
            .header(AUTHORIZATION, &store.auth)
            .header("Content-Crc32", asset.crc32_hex())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(asset.bytes.clone())
            .send()
            .await?;
        let stored: StoreUploadResponse = response.json().await?;
        if stored.code != 2000 {
            return Err(JimengError::Upload {
                step: "store",
                message: stored
                    .message
                    .unwrap_or_else(|| "the store endpoint rejected the bytes".to_string()),
            });
        }

        // Phase 3: commit the session.
        let commit_params = vec![
            ("Action".to_string(), "CommitImageUpload".to_string()),
            ("FileSize".to_string(), asset.bytes.len().to_string()),
            ("ServiceId".to_string(), IMAGEX_SERVICE_ID.to_string()),
            ("Version".to_string(), IMAGEX_API_VERSION.to_string()),
        ];
        // Serialized once; the signer hashes the exact bytes that go on the
        // wire.
        let body = serde_json::to_string(&json!({ "SessionKey": address.session_key }))?;
        let mut headers = signer.sign("POST", &commit_params, Some(&body));
        headers.push(("Content-Type".to_string(), "application/json".to_string()));

        let commit: ImagexResponse<CommitUploadResult> = self
            .imagex_request(Method::POST, &commit_params, headers, Some(body))
            .await?;
        let committed = into_step_result(commit, "commit")?;

        committed
            .results
            .into_iter()
            .next()
            .map(|result| result.uri)
            .ok_or_else(|| JimengError::Protocol("commit returned no uploaded assets".to_string()))
    }

    /// Issues a signed call against the object-storage endpoint. The query
    /// string is the canonical (sorted) form that was signed.
    async fn imagex_request<T: DeserializeOwned>(
        &self,
        method: Method,
        params: &[(String, String)],
        headers: Vec<(String, String)>,
        body: Option<String>,
    ) -> Result<T, JimengError> {
        let url = format!("{}?{}", self.imagex_endpoint, canonical_query(params));
        let mut request = self
            .http
            .request(method, &url)
            .header(COOKIE, self.identity.cookie(&self.session_token));
        for (name, value) in headers {
            request = request.header(name.as_str(), value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(JimengError::ApiError {
                message: format!("storage endpoint returned status {}", response.status()),
            });
        }
        Ok(response.json().await?)
    }
}
