//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Every request is signed independently with a fresh nonce and the current
//! timestamp. Only form-encoded body parameters and query parameters are part
//! of the signature; JSON and multipart bodies are not.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha1::Sha1;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Credentials;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// RFC 3986 percent-encoding: everything except `A-Z a-z 0-9 - . _ ~`
pub fn percent_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Output of one signing operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub signature: String,
    /// Value for the `Authorization` header
    pub authorization: String,
}

type NonceFn = Arc<dyn Fn() -> String + Send + Sync>;
type ClockFn = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Signs requests on behalf of one user account
#[derive(Clone)]
pub struct OAuthSigner {
    credentials: Arc<Credentials>,
    nonce: NonceFn,
    clock: ClockFn,
}

impl std::fmt::Debug for OAuthSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSigner")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl OAuthSigner {
    /// Signer using random UUID nonces and the system clock
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Arc::new(credentials),
            nonce: Arc::new(|| uuid::Uuid::new_v4().simple().to_string()),
            clock: Arc::new(|| chrono::Utc::now().timestamp()),
        }
    }

    /// Replace the nonce generator
    pub fn with_nonce_fn(mut self, nonce: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.nonce = Arc::new(nonce);
        self
    }

    /// Replace the clock (Unix seconds)
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Pin both nonce and timestamp, making signatures reproducible
    pub fn with_fixed(self, nonce: &str, timestamp: i64) -> Self {
        let nonce = nonce.to_string();
        self.with_nonce_fn(move || nonce.clone())
            .with_clock(move || timestamp)
    }

    /// Sign `method url` with the given request parameters
    ///
    /// `params` must hold every query-string and form-body parameter that
    /// will be sent; they are folded into the signature but not echoed in
    /// the header.
    pub fn sign(&self, method: &str, url: &str, params: &[(&str, &str)]) -> SignedRequest {
        let nonce = (self.nonce)();
        let timestamp = (self.clock)().to_string();
        let creds = &self.credentials;

        let mut oauth: BTreeMap<String, String> = BTreeMap::new();
        oauth.insert(
            "oauth_consumer_key".into(),
            creds.api_key.expose_secret().to_string(),
        );
        oauth.insert("oauth_nonce".into(), nonce);
        oauth.insert("oauth_signature_method".into(), SIGNATURE_METHOD.into());
        oauth.insert("oauth_timestamp".into(), timestamp);
        oauth.insert(
            "oauth_token".into(),
            creds.access_token.expose_secret().to_string(),
        );
        oauth.insert("oauth_version".into(), OAUTH_VERSION.into());

        let base = signature_base_string(method, url, &oauth, params);
        let key = format!(
            "{}&{}",
            percent_encode(creds.api_secret.expose_secret()),
            percent_encode(creds.access_secret.expose_secret())
        );
        let signature = hmac_sha1_base64(key.as_bytes(), base.as_bytes());

        oauth.insert("oauth_signature".into(), signature.clone());
        let authorization = format!(
            "OAuth {}",
            oauth
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
                .collect::<Vec<_>>()
                .join(", ")
        );

        SignedRequest {
            signature,
            authorization,
        }
    }
}

/// `METHOD&enc(url)&enc(k1=v1&k2=v2...)` with pairs sorted by encoded key,
/// then encoded value
pub fn signature_base_string(
    method: &str,
    url: &str,
    oauth: &BTreeMap<String, String>,
    params: &[(&str, &str)],
) -> String {
    let mut pairs: Vec<(String, String)> = oauth
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .chain(
            params
                .iter()
                .map(|(k, v)| (percent_encode(k), percent_encode(v))),
        )
        .collect();
    pairs.sort();

    let normalized = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&normalized)
    )
}

fn hmac_sha1_base64(key: &[u8], message: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    BASE64.encode(mac.finalize().into_bytes())
}
