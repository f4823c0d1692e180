//! Server configuration resolved from the environment.
//!
//! All environment access happens here, once, so the rest of the crate
//! (and every test) works from explicit values.

use std::path::PathBuf;

/// Environment variable overriding the primary session file path.
pub const SESSION_FILE_ENV: &str = "MONARCH_SESSION_FILE";
/// Environment variable holding the Monarch Money account email.
pub const EMAIL_ENV: &str = "MONARCH_EMAIL";
/// Environment variable holding the Monarch Money account password.
pub const PASSWORD_ENV: &str = "MONARCH_PASSWORD";
/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "MONARCH_BASE_URL";

/// Default base URL of the Monarch Money API.
const DEFAULT_BASE_URL: &str = "https://api.monarchmoney.com";

/// Primary session file, relative to the working directory.
const PRIMARY_SESSION_FILE: &str = "monarch_session.json";
/// Secondary session file, relative to the working directory.
const SECONDARY_SESSION_FILE: &str = ".mm/mm_session.json";
/// Session file under the user's home directory.
const HOME_SESSION_FILE: &str = ".mm/mm_session.json";

/// Email/password pair used for the credential fallback login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never include the password in debug output.
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Resolved configuration for the server and the login utility.
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Session file override (highest-priority candidate).
    session_file_override: Option<PathBuf>,
    /// Account email for the credential fallback.
    email: Option<String>,
    /// Account password for the credential fallback.
    password: Option<String>,
    /// API base URL override.
    base_url: Option<String>,
    /// Home directory used for the `~/.mm` session candidate.
    home_dir: Option<PathBuf>,
}

impl core::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("session_file_override", &self.session_file_override)
            .field("email", &self.email)
            .field("base_url", &self.base_url)
            .field("home_dir", &self.home_dir)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Creates an empty configuration with built-in defaults only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            session_file_override: std::env::var_os(SESSION_FILE_ENV).map(PathBuf::from),
            email: std::env::var(EMAIL_ENV).ok().filter(|v| !v.is_empty()),
            password: std::env::var(PASSWORD_ENV).ok().filter(|v| !v.is_empty()),
            base_url: std::env::var(BASE_URL_ENV).ok().filter(|v| !v.is_empty()),
            home_dir: dirs::home_dir(),
        }
    }

    /// Sets the session file override.
    #[must_use]
    pub fn with_session_file(mut self, path: PathBuf) -> Self {
        self.session_file_override = Some(path);
        self
    }

    /// Sets fallback login credentials.
    #[must_use]
    pub fn with_credentials(mut self, email: &str, password: &str) -> Self {
        self.email = Some(email.to_owned());
        self.password = Some(password.to_owned());
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_owned());
        self
    }

    /// Sets the home directory used for the `~/.mm` candidate.
    #[must_use]
    pub fn with_home_dir(mut self, home_dir: PathBuf) -> Self {
        self.home_dir = Some(home_dir);
        self
    }

    /// API base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Configured account email, if any.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Fallback credentials, present only when both email and password are set.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        self.email
            .as_ref()
            .zip(self.password.as_ref())
            .map(|(email, password)| Credentials {
                email: email.clone(),
                password: password.clone(),
            })
    }

    /// Candidate session file paths, in search order.
    ///
    /// The override (when configured) comes first, then the conventional
    /// working-directory locations, then the home-directory location.
    #[must_use]
    pub fn candidate_session_paths(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(4);
        if let Some(path) = self.session_file_override.as_ref() {
            candidates.push(path.clone());
        }
        candidates.push(PathBuf::from(PRIMARY_SESSION_FILE));
        candidates.push(PathBuf::from(SECONDARY_SESSION_FILE));
        if let Some(home) = self.home_dir.as_ref() {
            candidates.push(home.join(HOME_SESSION_FILE));
        }
        candidates
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::shadow_reuse,
    clippy::use_debug,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect and shadow reuse for readability"
)]
mod tests {
    use std::path::PathBuf;

    use super::ServerConfig;

    #[test]
    fn candidates_without_override() {
        let config = ServerConfig::new().with_home_dir(PathBuf::from("/home/someone"));
        let candidates = config.candidate_session_paths();
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("monarch_session.json"),
                PathBuf::from(".mm/mm_session.json"),
                PathBuf::from("/home/someone/.mm/mm_session.json"),
            ]
        );
    }

    #[test]
    fn override_comes_first() {
        let config = ServerConfig::new()
            .with_session_file(PathBuf::from("/tmp/custom_session.json"))
            .with_home_dir(PathBuf::from("/home/someone"));
        let candidates = config.candidate_session_paths();
        assert_eq!(
            candidates.first(),
            Some(&PathBuf::from("/tmp/custom_session.json"))
        );
        assert_eq!(candidates.len(), 4);
    }

    #[test]
    fn no_home_dir_drops_home_candidate() {
        let config = ServerConfig::new();
        let candidates = config.candidate_session_paths();
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn credentials_require_both_fields() {
        let config = ServerConfig::new();
        assert!(config.credentials().is_none());

        let config = ServerConfig::new().with_credentials("a@b.c", "hunter2");
        let credentials = config.credentials().expect("both fields set");
        assert_eq!(credentials.email, "a@b.c");
        assert_eq!(credentials.password, "hunter2");
    }

    #[test]
    fn default_base_url() {
        let config = ServerConfig::new();
        assert_eq!(config.base_url(), "https://api.monarchmoney.com");
        let config = config.with_base_url("http://127.0.0.1:9");
        assert_eq!(config.base_url(), "http://127.0.0.1:9");
    }

    #[test]
    fn debug_output_omits_password() {
        let config = ServerConfig::new().with_credentials("a@b.c", "hunter2");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
