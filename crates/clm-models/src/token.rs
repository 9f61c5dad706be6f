//! OAuth credentials and tokens.
//!
//! A [`Token`] is built from the authorization server's [`TokenResponse`]
//! and stamped with the local time at which it was obtained. Validity is
//! always computed against that local stamp, never the server clock.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens are treated as expired this long before their actual expiry so
/// that a request never starts with a token that lapses mid-flight.
pub const EXPIRY_MARGIN_SECS: i64 = 5 * 60;

/// Length of the access-token prefix shown by [`Token::redacted_access_token`].
const REDACTED_PREFIX_LEN: usize = 20;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// OAuth client credentials (integration key and secret).
///
/// Held in memory for the lifetime of a session only.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    /// OAuth client id (integration key).
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

impl Credentials {
    /// Create credentials from an id/secret pair.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// `true` when the client id is present.
    pub fn has_client_id(&self) -> bool {
        !self.client_id.trim().is_empty()
    }

    /// `true` when both the client id and secret are present.
    pub fn is_complete(&self) -> bool {
        self.has_client_id() && !self.client_secret.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TokenResponse
// ---------------------------------------------------------------------------

/// Body returned by `POST /oauth/token` for both grant types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Bearer credential for API calls.
    pub access_token: String,
    /// Credential used to obtain the next access token. Some servers omit
    /// it on refresh.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Usually `"Bearer"`.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// The single live token, as held in a session and persisted on disk.
///
/// On disk `issued_at` is stored under the `timestamp` key.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use clm_models::{Token, TokenResponse};
///
/// let now = Utc::now();
/// let token = Token::from_response(
///     TokenResponse {
///         access_token: "at".into(),
///         refresh_token: Some("rt".into()),
///         token_type: "Bearer".into(),
///         expires_in: 3600,
///     },
///     now,
/// );
/// assert!(token.is_valid_at(now));
/// assert!(!token.is_valid_at(now + Duration::minutes(55)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer credential attached to API calls.
    pub access_token: String,
    /// Credential used to refresh the access token.
    #[serde(default)]
    pub refresh_token: String,
    /// Token type reported by the server.
    pub token_type: String,
    /// Lifetime in seconds, counted from `issued_at`.
    pub expires_in: i64,
    /// Local time at which the token was obtained or refreshed.
    #[serde(rename = "timestamp", with = "timestamp")]
    pub issued_at: DateTime<Utc>,
}

impl Token {
    /// Build a token from a token-endpoint response, stamping `issued_at`.
    ///
    /// A response without a refresh token yields an empty one; use
    /// [`Token::refreshed`] when replacing an existing token.
    pub fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.unwrap_or_default(),
            token_type: response.token_type,
            expires_in: response.expires_in,
            issued_at,
        }
    }

    /// Build the successor of `self` from a refresh response, keeping the
    /// current refresh token when the server did not rotate it.
    pub fn refreshed(&self, response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        let mut next = Self::from_response(response, issued_at);
        if next.refresh_token.is_empty() {
            next.refresh_token.clone_from(&self.refresh_token);
        }
        next
    }

    /// Instant at which the server considers the token expired.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.expires_in)
    }

    /// `true` iff `now` is strictly before the expiry minus the safety margin.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at() - Duration::seconds(EXPIRY_MARGIN_SECS)
    }

    /// [`Token::is_valid_at`] against the current time.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// `true` when a refresh token is available.
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Access token shortened for display (`"eyJ0eXAiOiJNVCIsImFs..."`).
    pub fn redacted_access_token(&self) -> String {
        let prefix: String = self.access_token.chars().take(REDACTED_PREFIX_LEN).collect();
        format!("{prefix}...")
    }
}

/// Serde adapter for the `timestamp` field.
///
/// Writes RFC 3339. Reads RFC 3339 or a naive ISO-8601 timestamp, the
/// latter interpreted in local time.
mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn token_at(issued_at: DateTime<Utc>, expires_in: i64) -> Token {
        Token {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            token_type: "Bearer".into(),
            expires_in,
            issued_at,
        }
    }

    #[test]
    fn valid_until_five_minutes_before_expiry() {
        let issued = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let token = token_at(issued, 3600);

        assert!(token.is_valid_at(issued));
        assert!(token.is_valid_at(issued + Duration::seconds(3600 - 301)));
        // Exactly at the margin boundary the token is already invalid.
        assert!(!token.is_valid_at(issued + Duration::seconds(3600 - 300)));
        assert!(!token.is_valid_at(issued + Duration::seconds(3600)));
    }

    #[test]
    fn short_lived_token_is_never_valid() {
        let issued = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let token = token_at(issued, 120);
        assert!(!token.is_valid_at(issued));
    }

    #[test]
    fn refresh_keeps_previous_refresh_token_when_not_rotated() {
        let issued = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let old = token_at(issued, 3600);
        let later = issued + Duration::hours(2);
        let next = old.refreshed(
            TokenResponse {
                access_token: "new-access".into(),
                refresh_token: None,
                token_type: "Bearer".into(),
                expires_in: 28800,
            },
            later,
        );
        assert_eq!(next.access_token, "new-access");
        assert_eq!(next.refresh_token, "refresh");
        assert_eq!(next.issued_at, later);
    }

    #[test]
    fn refresh_takes_rotated_refresh_token() {
        let issued = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let next = token_at(issued, 3600).refreshed(
            TokenResponse {
                access_token: "a2".into(),
                refresh_token: Some("r2".into()),
                token_type: "Bearer".into(),
                expires_in: 3600,
            },
            issued,
        );
        assert_eq!(next.refresh_token, "r2");
    }

    #[test]
    fn token_file_layout_uses_timestamp_key() {
        let issued = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let json = serde_json::to_value(token_at(issued, 3600)).unwrap();
        assert_eq!(json["timestamp"], "2025-03-01T12:00:00+00:00");
        assert_eq!(json["expires_in"], 3600);
        assert!(json.get("issued_at").is_none());
    }

    #[test]
    fn naive_timestamp_is_accepted() {
        let raw = r#"{
            "access_token": "a",
            "refresh_token": "r",
            "token_type": "Bearer",
            "expires_in": 28800,
            "timestamp": "2025-03-01T12:00:00.123456"
        }"#;
        let token: Token = serde_json::from_str(raw).unwrap();
        assert_eq!(token.expires_in, 28800);
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        let raw = r#"{"access_token":"a","token_type":"Bearer","expires_in":1,"timestamp":"yesterday"}"#;
        assert!(serde_json::from_str::<Token>(raw).is_err());
    }

    #[test]
    fn redacted_access_token_shows_prefix_only() {
        let mut token = token_at(Utc::now(), 3600);
        token.access_token = "abcdefghijklmnopqrstuvwxyz".into();
        assert_eq!(token.redacted_access_token(), "abcdefghijklmnopqrst...");
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = Credentials::new("id", "super-secret");
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("id"));
        assert!(!dbg.contains("super-secret"));
    }

    #[test]
    fn credentials_completeness() {
        assert!(Credentials::new("id", "secret").is_complete());
        assert!(!Credentials::new("id", "").is_complete());
        assert!(Credentials::new("id", "").has_client_id());
        assert!(!Credentials::new("  ", "secret").has_client_id());
    }
}
