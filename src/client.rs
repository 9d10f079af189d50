use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{COOKIE, REFERER};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::env;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::draft::DraftSpec;
use crate::error::JimengError;
use crate::identity::{browser_headers, ClientIdentity};
use crate::models::{resolve_model, DEFAULT_BLEND_MODEL, DEFAULT_MODEL};
use crate::poll::{
    extract_image_urls, history_query_body, JobStatus, PollOptions, CONTENT_FILTER_FAIL_CODE,
};
use crate::types::{ApiResponse, CreditInfo, CreditResponse, GenerationRecord, ImageInput, SubmitData};
use crate::upload::DEFAULT_IMAGEX_ENDPOINT;

const DEFAULT_BASE_URL: &str = "https://jimeng.jianying.com";
const GENERATE_REFERER: &str = "https://jimeng.jianying.com/ai-tool/image/generate";
pub(crate) const ASSISTANT_ID: u64 = 513695;

/// Python-`quote` style percent encoding with `/` left intact, applied to the
/// `babi_param` query value.
const QUOTE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// The main client for interacting with the Jimeng image-generation API.
///
/// It holds the shared `reqwest::Client`, the session token and the client
/// identity presented to the service. It is designed to be cloneable and safe
/// to share across threads; run concurrent [`generate`](Self::generate) calls
/// on separate clones, since upload credentials are scoped to one in-flight
/// upload.
#[derive(Clone)]
pub struct JimengClient {
    pub(crate) http: reqwest::Client,
    base_url: Url,
    pub(crate) session_token: String,
    pub(crate) identity: ClientIdentity,
    /// Base URL of the object-storage endpoint, overridable for tests.
    pub imagex_endpoint: String,
}

/// Tunables for a single [`generate`](JimengClient::generate) call.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Public model name; `None` picks the default. Ignored when a reference
    /// image is supplied, which forces the blend-capable model.
    pub model: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Sampling strength in `[0, 1]`.
    pub sample_strength: f32,
    pub negative_prompt: String,
    /// Polling behavior for the submitted job.
    pub poll: PollOptions,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            model: None,
            width: 1024,
            height: 1024,
            sample_strength: 0.5,
            negative_prompt: String::new(),
            poll: PollOptions::default(),
        }
    }
}

impl JimengClient {
    /// Creates a new `JimengClient`.
    ///
    /// This method initializes the client with a session token. It first
    /// checks for the `session_token` parameter. If it's `None`, it falls
    /// back to the `JIMENG_API_TOKEN` environment variable. No network call
    /// is made.
    ///
    /// # Errors
    ///
    /// - `JimengError::MissingSessionToken` if the token is not provided in
    ///   either way.
    /// - `JimengError::RequestFailed` if the internal HTTP client fails to
    ///   build.
    pub fn new(session_token: Option<String>) -> Result<Self, JimengError> {
        let session_token = session_token.or_else(|| env::var("JIMENG_API_TOKEN").ok());
        let Some(session_token) = session_token else {
            return Err(JimengError::MissingSessionToken);
        };
        Self::with_identity(session_token, DEFAULT_BASE_URL, ClientIdentity::generate())
    }

    /// Creates a new `JimengClient` with a custom base URL.
    ///
    /// This is useful for testing or for connecting to a different API
    /// endpoint.
    pub fn new_with_url(session_token: String, base_url: &str) -> Result<Self, JimengError> {
        Self::with_identity(session_token, base_url, ClientIdentity::generate())
    }

    /// Creates a client with an explicit [`ClientIdentity`], e.g. to pin one
    /// identity across client instances.
    pub fn with_identity(
        session_token: String,
        base_url: &str,
        identity: ClientIdentity,
    ) -> Result<Self, JimengError> {
        let http = reqwest::Client::builder()
            .default_headers(browser_headers())
            .build()?;

        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            session_token,
            identity,
            imagex_endpoint: DEFAULT_IMAGEX_ENDPOINT.to_string(),
        })
    }

    /// Queries the account's credit breakdown.
    pub async fn get_credit(&self) -> Result<CreditInfo, JimengError> {
        let response: CreditResponse = self
            .request_json(
                Method::POST,
                "/commerce/v1/benefits/user_credit",
                Some(&json!({})),
                &[],
                Some(GENERATE_REFERER),
            )
            .await?;
        Ok(response.credit.unwrap_or_default())
    }

    /// Claims the free daily credit grant.
    pub async fn receive_credit(&self) -> Result<(), JimengError> {
        let _: serde_json::Value = self
            .request_json(
                Method::POST,
                "/commerce/v1/benefits/credit_receive",
                Some(&json!({ "time_zone": "Asia/Shanghai" })),
                &[],
                Some(GENERATE_REFERER),
            )
            .await?;
        Ok(())
    }

    /// Generates images from a prompt, optionally steered by a reference
    /// image, and waits for the job to finish.
    ///
    /// When `image` is supplied it is uploaded first and the blend-capable
    /// default model is used regardless of `options.model`. The returned URLs
    /// are in the order the service produced the items; the list may be
    /// empty.
    ///
    /// # Errors
    ///
    /// - `JimengError::Validation` for an empty prompt (no network call is
    ///   made).
    /// - `JimengError::ContentFiltered` when the job fails with the
    ///   content-moderation code, `JimengError::GenerationFailed` for any
    ///   other terminal failure.
    /// - `JimengError::Cancelled` / `JimengError::TimedOut` when the poll
    ///   loop is stopped by [`PollOptions`].
    pub async fn generate(
        &self,
        prompt: &str,
        image: Option<ImageInput>,
        options: &GenerateOptions,
    ) -> Result<Vec<String>, JimengError> {
        if prompt.trim().is_empty() {
            return Err(JimengError::Validation(
                "prompt must be a non-empty string".to_string(),
            ));
        }

        let image_uri = match image {
            Some(input) => {
                let bytes = self.load_image(input).await?;
                Some(self.upload_image(bytes).await?)
            }
            None => None,
        };

        let model_name = if image_uri.is_some() {
            DEFAULT_BLEND_MODEL
        } else {
            options.model.as_deref().unwrap_or(DEFAULT_MODEL)
        };
        let model = resolve_model(model_name);

        let credit = self.get_credit().await?;
        if credit.total() <= 0 {
            // Best effort only: a failed claim never aborts the generation.
            if let Err(error) = self.receive_credit().await {
                warn!(%error, "failed to claim the daily credit grant");
            }
        }

        let request = DraftSpec {
            model,
            prompt,
            negative_prompt: &options.negative_prompt,
            width: options.width,
            height: options.height,
            sample_strength: options.sample_strength,
            image_uri: image_uri.as_deref(),
        }
        .build()?;
        let params = self.generate_query(model, image_uri.is_some())?;

        let response: ApiResponse<SubmitData> = self
            .request_json(
                Method::POST,
                "/mweb/v1/aigc_draft/generate",
                Some(&request),
                &params,
                None,
            )
            .await?;
        let ApiResponse { data, errmsg } = response;

        let history_id = data
            .and_then(|data| data.aigc_data)
            .and_then(|aigc| aigc.history_record_id)
            .ok_or_else(|| {
                JimengError::Submission(errmsg.unwrap_or_else(|| {
                    "the response carried no history record id".to_string()
                }))
            })?;
        debug!(%history_id, model, "generation submitted");

        self.wait_for_history(&history_id, &options.poll).await
    }

    /// Polls a submitted job until it reaches a terminal status, returning
    /// the result URLs.
    ///
    /// The loop sleeps, requests the record, and decides: pending keeps
    /// polling; failed maps to an error by fail code; anything else is
    /// terminal and yields the extracted URLs. [`PollOptions`] bound the loop
    /// via attempts, deadline, or cancellation.
    pub async fn wait_for_history(
        &self,
        history_id: &str,
        options: &PollOptions,
    ) -> Result<Vec<String>, JimengError> {
        let deadline = options
            .timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);
        let mut attempts = 0u32;

        loop {
            if let Some(max) = options.max_attempts {
                if attempts >= max {
                    return Err(JimengError::TimedOut);
                }
            }
            if let Some(deadline) = deadline {
                if tokio::time::Instant::now() >= deadline {
                    return Err(JimengError::TimedOut);
                }
            }

            match &options.cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => return Err(JimengError::Cancelled),
                        _ = sleep(options.interval) => {}
                    }
                }
                None => sleep(options.interval).await,
            }
            attempts += 1;

            let record = self.get_history_record(history_id).await?;
            match JobStatus::from_code(record.status) {
                JobStatus::Pending => {
                    debug!(history_id, attempts, "job still pending");
                }
                JobStatus::Failed => {
                    let fail_code = record.fail_code.unwrap_or_default();
                    return Err(if fail_code == CONTENT_FILTER_FAIL_CODE {
                        JimengError::ContentFiltered { fail_code }
                    } else {
                        JimengError::GenerationFailed { fail_code }
                    });
                }
                status => {
                    if let JobStatus::Other(code) = status {
                        debug!(history_id, code, "treating unknown status as terminal");
                    }
                    return Ok(extract_image_urls(&record.item_list));
                }
            }
        }
    }

    /// Fetches the current history record of a job.
    pub async fn get_history_record(
        &self,
        history_id: &str,
    ) -> Result<GenerationRecord, JimengError> {
        let body = history_query_body(history_id, ASSISTANT_ID);
        let response: ApiResponse<HashMap<String, GenerationRecord>> = self
            .request_json(
                Method::POST,
                "/mweb/v1/get_history_by_ids",
                Some(&body),
                &[],
                None,
            )
            .await?;

        response
            .data
            .and_then(|mut records| records.remove(history_id))
            .ok_or_else(|| JimengError::Protocol(format!("no history record for id {history_id}")))
    }

    fn generate_query(
        &self,
        model: &str,
        with_reference: bool,
    ) -> Result<Vec<(String, String)>, JimengError> {
        #[derive(Serialize)]
        struct BabiParam<'a> {
            scenario: &'a str,
            feature_key: &'a str,
            feature_entrance: &'a str,
            feature_entrance_detail: String,
        }

        let babi = BabiParam {
            scenario: "image_video_generation",
            feature_key: if with_reference {
                "to_image_referenceimage_generate"
            } else {
                "aigc_to_image"
            },
            feature_entrance: "to_image",
            feature_entrance_detail: if with_reference {
                "to_image-referenceimage-byte_edit".to_string()
            } else {
                format!("to_image-{model}")
            },
        };
        let encoded = utf8_percent_encode(&serde_json::to_string(&babi)?, QUOTE).to_string();

        Ok(vec![
            ("babi_param".to_string(), encoded),
            ("aid".to_string(), ASSISTANT_ID.to_string()),
            ("device_platform".to_string(), "web".to_string()),
            ("region".to_string(), "CN".to_string()),
            ("web_id".to_string(), self.identity.web_id.to_string()),
        ])
    }

    /// Sends a JSON request to the service, attaching the per-call cookie.
    /// Absolute URLs are passed through; everything else is joined onto the
    /// base URL.
    pub(crate) async fn request_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        params: &[(String, String)],
        referer: Option<&str>,
    ) -> Result<T, JimengError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            Url::parse(path)?
        } else {
            self.base_url.join(path)?
        };

        let mut request = self
            .http
            .request(method, url)
            .header(COOKIE, self.identity.cookie(&self.session_token));
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error_response: serde_json::Value = response.json().await.unwrap_or_default();
            Err(JimengError::ApiError {
                message: error_response.to_string(),
            })
        }
    }
}
