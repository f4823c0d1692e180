//! Authentication flow: session search first, credential login second.
//!
//! The login state machine is {NoSession} → login → {Authenticated} |
//! {MFARequired} → MFA exchange → {Authenticated} | {Failed}. The server
//! path below handles everything up to the challenge; the interactive
//! `monarch-login` binary owns the prompt-for-code branch, since a stdio
//! MCP server has no way to ask for a one-time code.

use crate::client::MonarchClient;
use crate::config::ServerConfig;
use crate::error::{MonarchError, MonarchResult};
use crate::session;

/// Produces an authenticated client, or an error naming the remedy.
///
/// Runs the session locator over the configured candidate paths; when no
/// candidate yields a session, falls back to a credential login from the
/// environment. A failed login is terminal for this invocation; it is
/// reported, never retried here.
///
/// # Errors
///
/// Returns [`MonarchError::AuthenticationRequired`] when there is neither
/// a loadable session nor a usable credential pair, and the underlying
/// login error otherwise.
pub async fn establish(config: &ServerConfig) -> MonarchResult<MonarchClient> {
    let candidates = config.candidate_session_paths();
    if let Some(located) = session::locate(&candidates) {
        return Ok(MonarchClient::from_session(config, located.session));
    }
    tracing::info!("no saved session found, trying environment credentials");

    let Some(credentials) = config.credentials() else {
        return Err(MonarchError::AuthenticationRequired);
    };
    MonarchClient::login(config, &credentials.email, &credentials.password)
        .await
        .map_err(map_login_failure)
}

/// Maps a headless login failure to what the tool caller should see.
///
/// The second-factor challenge cannot be answered without a terminal, so
/// here it collapses into the authentication-required error, whose
/// message routes the user to the interactive setup utility.
fn map_login_failure(err: MonarchError) -> MonarchError {
    match err {
        MonarchError::MfaRequired => MonarchError::AuthenticationRequired,
        MonarchError::AuthenticationRequired
        | MonarchError::SessionLoad { .. }
        | MonarchError::Http(_)
        | MonarchError::Api { .. }
        | MonarchError::GraphQl(_)
        | MonarchError::InvalidDate { .. }
        | MonarchError::Json(_)
        | MonarchError::Io(_) => err,
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use std::fs;

    use super::{establish, map_login_failure};
    use crate::config::ServerConfig;
    use crate::error::MonarchError;

    #[tokio::test]
    async fn no_session_and_no_credentials_is_authentication_required() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = ServerConfig::new()
            .with_session_file(dir.path().join("absent.json"))
            .with_home_dir(dir.path().to_path_buf());

        let err = establish(&config).await.expect_err("nothing to load");
        assert!(matches!(err, MonarchError::AuthenticationRequired));
    }

    #[tokio::test]
    async fn corrupt_candidates_still_end_in_authentication_required() {
        let dir = tempfile::tempdir().expect("temp dir");
        let corrupt = dir.path().join("session.json");
        fs::write(&corrupt, "definitely not json").expect("writable temp file");
        let config = ServerConfig::new()
            .with_session_file(corrupt)
            .with_home_dir(dir.path().to_path_buf());

        let err = establish(&config).await.expect_err("corrupt candidate");
        assert!(matches!(err, MonarchError::AuthenticationRequired));
    }

    #[tokio::test]
    async fn saved_session_wins_without_touching_credentials() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"token": "tok-saved", "device_uuid": "dev-1"}"#)
            .expect("writable temp file");
        // Credentials present but unused: the locator hit short-circuits
        // before any login attempt (which would fail against this URL).
        let config = ServerConfig::new()
            .with_session_file(path)
            .with_home_dir(dir.path().to_path_buf())
            .with_credentials("a@b.c", "hunter2")
            .with_base_url("http://127.0.0.1:9");

        let client = establish(&config).await.expect("session loads");
        assert_eq!(client.session().token, "tok-saved");
    }

    #[test]
    fn mfa_challenge_maps_to_authentication_required() {
        assert!(matches!(
            map_login_failure(MonarchError::MfaRequired),
            MonarchError::AuthenticationRequired
        ));
    }

    #[test]
    fn other_login_failures_pass_through() {
        let err = map_login_failure(MonarchError::Api {
            status: 401,
            message: "bad credentials".to_owned(),
        });
        assert!(matches!(err, MonarchError::Api { status: 401, .. }));
    }
}
