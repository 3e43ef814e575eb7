/// Default API root, including the `/api` prefix.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000/api";
/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// What the client does with its session when an authenticated call gets a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthFailurePolicy {
    /// Drop the stored token so the caller has to sign in again.
    #[default]
    ClearSession,
    /// Keep the token and only surface the error.
    Preserve,
}

impl AuthFailurePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "clear" | "clear_session" => Some(Self::ClearSession),
            "preserve" | "keep" => Some(Self::Preserve),
            _ => None,
        }
    }
}

/// Connection settings for [`ApiClient`](super::ApiClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub auth_failure: AuthFailurePolicy,
}

impl ClientConfig {
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub const fn with_auth_failure(mut self, policy: AuthFailurePolicy) -> Self {
        self.auth_failure = policy;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            auth_failure: AuthFailurePolicy::default(),
        }
    }
}
