use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Final destination URL of a chunked upload
pub const HEADER_DESTINATION: &str = "Destination";
/// Size of the original file, decimal
pub const HEADER_TOTAL_LENGTH: &str = "OC-Total-Length";
/// Creation time, epoch seconds
pub const HEADER_CTIME: &str = "X-OC-CTime";
/// Modification time, epoch seconds
pub const HEADER_MTIME: &str = "X-OC-MTime";
pub const HEADER_OVERWRITE: &str = "Overwrite";

/// Attributes of a stored resource as reported by the server
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    pub href: String,
    pub file_id: Option<String>,
    pub oc_id: Option<String>,
    pub etag: Option<String>,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    pub is_collection: bool,
}

/// Per-request knobs handed to the transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Insert or replace a header (names compare case-insensitively)
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// Account and server coordinates for one logged-in user
#[derive(Debug, Clone)]
pub struct DavAccount {
    pub base_url: String,
    pub user: String,
    pub user_id: String,
    pub password: String,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl DavAccount {
    pub fn new(
        base_url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let user = user.into();
        Self {
            base_url: base_url.into(),
            user_id: user.clone(),
            user,
            password: password.into(),
            user_agent: format!("chunkdav/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut options = RequestOptions::new().with_header("Destination", "a");
        options.set_header("destination", "b");

        assert_eq!(options.headers().len(), 1);
        assert_eq!(options.header("DESTINATION"), Some("b"));
    }

    #[test]
    fn test_account_defaults_user_id_to_user() {
        let account = DavAccount::new("https://cloud.example.com", "alice", "secret");
        assert_eq!(account.user_id, "alice");
        assert!(account.user_agent.starts_with("chunkdav/"));
    }
}
