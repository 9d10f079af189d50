use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::form_urlencoded;

use crate::types::UploadCredentials;

type HmacSha256 = Hmac<Sha256>;

/// Signs requests to the object-storage endpoint with the AWS-SigV4-compatible
/// scheme the service expects.
///
/// The canonical request is assembled byte-for-byte the way the web client
/// does it: method, a fixed `/` path, the sorted form-urlencoded query, the
/// lower-cased signed headers, and the hex SHA-256 of the JSON body string.
/// The caller serializes the body exactly once and hands the same string to
/// both the signer and the transport, so the hashed payload always matches
/// the transmitted payload.
pub(crate) struct RequestSigner<'a> {
    credentials: &'a UploadCredentials,
    region: &'a str,
    service: &'a str,
}

impl<'a> RequestSigner<'a> {
    pub(crate) fn new(credentials: &'a UploadCredentials, region: &'a str, service: &'a str) -> Self {
        Self {
            credentials,
            region,
            service,
        }
    }

    /// Produces the headers authorizing a single request: `X-Amz-Date`,
    /// `X-Amz-Security-Token`, `X-Amz-Content-Sha256` (iff a body is present)
    /// and `Authorization`.
    pub(crate) fn sign(
        &self,
        method: &str,
        params: &[(String, String)],
        body: Option<&str>,
    ) -> Vec<(String, String)> {
        self.sign_at(Utc::now(), method, params, body)
    }

    /// Like [`sign`](Self::sign) but with an explicit timestamp, so tests can
    /// freeze the clock.
    pub(crate) fn sign_at(
        &self,
        now: DateTime<Utc>,
        method: &str,
        params: &[(String, String)],
        body: Option<&str>,
    ) -> Vec<(String, String)> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let mut headers = vec![
            ("X-Amz-Date".to_string(), amz_date.clone()),
            (
                "X-Amz-Security-Token".to_string(),
                self.credentials.session_token.clone(),
            ),
        ];
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            headers.push(("X-Amz-Content-Sha256".to_string(), sha256_hex(body)));
        }

        let scope = self.credential_scope(&amz_date);
        let signature = self.signature(&amz_date, &scope, method, params, &headers, body);
        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.credentials.access_key_id,
            scope,
            signed_headers(&headers),
            signature
        );
        headers.push(("Authorization".to_string(), authorization));
        headers
    }

    fn credential_scope(&self, amz_date: &str) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            &amz_date[..8],
            self.region,
            self.service
        )
    }

    fn signature(
        &self,
        amz_date: &str,
        scope: &str,
        method: &str,
        params: &[(String, String)],
        headers: &[(String, String)],
        body: Option<&str>,
    ) -> String {
        let k_date = hmac_sha256(
            format!("AWS4{}", self.credentials.secret_access_key).as_bytes(),
            amz_date[..8].as_bytes(),
        );
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, self.service.as_bytes());
        let signing_key = hmac_sha256(&k_service, b"aws4_request");

        let canonical = canonical_request(method, params, headers, body);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            scope,
            sha256_hex(&canonical)
        );

        hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()))
    }
}

/// The sorted, form-urlencoded query string, used both in the canonical
/// request and as the literal query of the signed URL.
pub(crate) fn canonical_query(params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in sorted {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn canonical_request(
    method: &str,
    params: &[(String, String)],
    headers: &[(String, String)],
    body: Option<&str>,
) -> String {
    let mut lowered: Vec<(String, &str)> = headers
        .iter()
        .map(|(key, value)| (key.to_lowercase(), value.as_str()))
        .collect();
    lowered.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = lowered
        .iter()
        .map(|(key, value)| format!("{}:{}\n", key, value))
        .collect();

    format!(
        "{}\n/\n{}\n{}\n{}\n{}",
        method.to_uppercase(),
        canonical_query(params),
        canonical_headers,
        signed_headers(headers),
        sha256_hex(body.unwrap_or(""))
    )
}

fn signed_headers(headers: &[(String, String)]) -> String {
    let mut names: Vec<String> = headers.iter().map(|(key, _)| key.to_lowercase()).collect();
    names.sort();
    names.join(";")
}

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn credentials() -> UploadCredentials {
        UploadCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: "session-token".to_string(),
        }
    }

    fn params() -> Vec<(String, String)> {
        vec![
            ("Version".to_string(), "2018-08-01".to_string()),
            ("Action".to_string(), "ApplyImageUpload".to_string()),
            ("FileSize".to_string(), "1024".to_string()),
        ]
    }

    #[test]
    fn test_signing_is_deterministic_for_a_fixed_clock() {
        let creds = credentials();
        let signer = RequestSigner::new(&creds, "cn-north-1", "imagex");
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 45).unwrap();

        let first = signer.sign_at(now, "GET", &params(), None);
        let second = signer.sign_at(now, "GET", &params(), None);
        assert_eq!(first, second);

        let date = first
            .iter()
            .find(|(key, _)| key == "X-Amz-Date")
            .map(|(_, value)| value.clone())
            .unwrap();
        assert_eq!(date, "20240115T123045Z");
    }

    #[test]
    fn test_authorization_header_shape() {
        let creds = credentials();
        let signer = RequestSigner::new(&creds, "cn-north-1", "imagex");
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 45).unwrap();

        let headers = signer.sign_at(now, "GET", &params(), None);
        let authorization = headers
            .iter()
            .find(|(key, _)| key == "Authorization")
            .map(|(_, value)| value.clone())
            .unwrap();

        let prefix = "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240115/cn-north-1/imagex/aws4_request, SignedHeaders=x-amz-date;x-amz-security-token, Signature=";
        assert!(authorization.starts_with(prefix), "got: {authorization}");

        let signature = authorization.rsplit('=').next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_body_hash_header_present_iff_body_is_non_empty() {
        let creds = credentials();
        let signer = RequestSigner::new(&creds, "cn-north-1", "imagex");
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 45).unwrap();

        let without_body = signer.sign_at(now, "GET", &params(), None);
        assert!(!without_body
            .iter()
            .any(|(key, _)| key == "X-Amz-Content-Sha256"));

        let body = r#"{"SessionKey":"abc"}"#;
        let with_body = signer.sign_at(now, "POST", &params(), Some(body));
        let hash = with_body
            .iter()
            .find(|(key, _)| key == "X-Amz-Content-Sha256")
            .map(|(_, value)| value.clone())
            .unwrap();
        assert_eq!(hash, sha256_hex(body));

        // The body hash feeds the signature as well.
        let authorization = |headers: &[(String, String)]| {
            headers
                .iter()
                .find(|(key, _)| key == "Authorization")
                .map(|(_, value)| value.clone())
                .unwrap()
        };
        assert_ne!(authorization(&without_body), authorization(&with_body));
    }

    #[test]
    fn test_canonical_query_sorts_keys() {
        let query = canonical_query(&params());
        assert_eq!(
            query,
            "Action=ApplyImageUpload&FileSize=1024&Version=2018-08-01"
        );
    }

    #[test]
    fn test_canonical_query_percent_encodes_values() {
        let params = vec![("a".to_string(), "x y/z".to_string())];
        assert_eq!(canonical_query(&params), "a=x+y%2Fz");
    }

    #[test]
    fn test_empty_body_hash_matches_empty_string_digest() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
