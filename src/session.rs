//! Saved-session storage: the locator and the persister.
//!
//! A session is a small JSON blob holding the API token. The locator
//! walks an ordered list of candidate paths and returns the first one
//! that exists and parses; the persister (used by `monarch-login` only)
//! writes the session to every candidate location for redundancy.
//! Copies are independent and never reconciled.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MonarchError, MonarchResult};

/// Serialized authentication state accepted by the Monarch API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token sent as `Authorization: Token <token>`.
    pub token: String,
    /// Device UUID the token was issued against, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_uuid: Option<String>,
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // The token is a credential; keep it out of debug output.
        f.debug_struct("Session")
            .field("device_uuid", &self.device_uuid)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Reads and parses a session file.
    ///
    /// # Errors
    ///
    /// Returns [`MonarchError::SessionLoad`] when the file cannot be read
    /// or does not contain a valid session blob.
    pub fn load(path: &Path) -> MonarchResult<Self> {
        let raw = fs::read_to_string(path).map_err(|err| MonarchError::SessionLoad {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|err| MonarchError::SessionLoad {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }
}

/// A session together with the candidate path it was loaded from.
#[derive(Debug, Clone)]
pub struct LocatedSession {
    /// The parsed session.
    pub session: Session,
    /// Where it was found.
    pub path: PathBuf,
}

/// Returns the session from the first candidate that exists and parses.
///
/// Candidates that are missing are skipped silently; candidates that
/// exist but fail to read or parse are logged and skipped; a corrupt
/// file must never abort the search. Returns `None` when no candidate
/// yields a session.
#[must_use]
pub fn locate(candidates: &[PathBuf]) -> Option<LocatedSession> {
    for path in candidates {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "session candidate not found");
            continue;
        }
        match Session::load(path) {
            Ok(session) => {
                tracing::info!(path = %path.display(), "loaded saved session");
                return Some(LocatedSession {
                    session,
                    path: path.clone(),
                });
            }
            Err(err) => {
                tracing::warn!(%err, path = %path.display(), "skipping unreadable session candidate");
            }
        }
    }
    None
}

/// Per-location outcome report from [`persist`].
#[derive(Debug, Default)]
pub struct PersistReport {
    /// Locations the session was written to.
    saved: Vec<PathBuf>,
    /// Locations that failed, with the reason.
    failed: Vec<(PathBuf, String)>,
}

impl PersistReport {
    /// Locations the session was written to.
    #[must_use]
    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }

    /// Locations that failed, with the reason.
    #[must_use]
    pub fn failures(&self) -> &[(PathBuf, String)] {
        &self.failed
    }

    /// Overall success: at least one location was written.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.saved.is_empty()
    }
}

/// Writes the session to every candidate location, creating parent
/// directories as needed.
///
/// A failure at one location never prevents the remaining writes; the
/// report carries the per-location outcomes.
pub fn persist(session: &Session, candidates: &[PathBuf]) -> PersistReport {
    let mut report = PersistReport::default();
    for path in candidates {
        match write_one(session, path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "saved session");
                report.saved.push(path.clone());
            }
            Err(err) => {
                tracing::warn!(%err, path = %path.display(), "failed to save session");
                report.failed.push((path.clone(), err.to_string()));
            }
        }
    }
    report
}

/// Writes the session to a single location.
fn write_one(session: &Session, path: &Path) -> MonarchResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let raw = serde_json::to_string_pretty(session)?;
    fs::write(path, raw)?;
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{LocatedSession, Session, locate, persist};

    fn sample_session(token: &str) -> Session {
        Session {
            token: token.to_owned(),
            device_uuid: Some("5f1c9df2-52cb-4a63-8a1c-000000000000".to_owned()),
        }
    }

    fn write_session(path: &PathBuf, token: &str) {
        let raw = serde_json::to_string(&sample_session(token)).expect("serializable session");
        fs::write(path, raw).expect("writable temp file");
    }

    #[test]
    fn locate_skips_missing_and_corrupt_candidates() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("a.json");
        let corrupt = dir.path().join("b.json");
        let valid = dir.path().join("c.json");
        fs::write(&corrupt, "not json at all").expect("writable temp file");
        write_session(&valid, "tok-c");

        let located: LocatedSession =
            locate(&[missing, corrupt, valid.clone()]).expect("one valid candidate");
        assert_eq!(located.session.token, "tok-c");
        assert_eq!(located.path, valid);
    }

    #[test]
    fn locate_returns_first_valid_candidate() {
        let dir = tempfile::tempdir().expect("temp dir");
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        write_session(&first, "tok-first");
        write_session(&second, "tok-second");

        let located = locate(&[first, second]).expect("valid candidates");
        assert_eq!(located.session.token, "tok-first");
    }

    #[test]
    fn locate_handles_no_usable_candidate() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("nope.json");
        let corrupt = dir.path().join("bad.json");
        fs::write(&corrupt, "{").expect("writable temp file");

        assert!(locate(&[]).is_none());
        assert!(locate(&[missing, corrupt]).is_none());
    }

    #[test]
    fn session_without_device_uuid_still_loads() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("token_only.json");
        fs::write(&path, r#"{"token": "tok-bare"}"#).expect("writable temp file");

        let session = Session::load(&path).expect("parseable session");
        assert_eq!(session.token, "tok-bare");
        assert!(session.device_uuid.is_none());
    }

    #[test]
    fn persist_reports_per_location_outcomes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ok_one = dir.path().join("one/session.json");
        let ok_two = dir.path().join("two/session.json");
        // A regular file where a parent directory is required makes
        // create_dir_all fail for this candidate only.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").expect("writable temp file");
        let blocked = blocker.join("sub/session.json");

        let report = persist(
            &sample_session("tok"),
            &[ok_one.clone(), blocked, ok_two.clone()],
        );
        assert_eq!(report.saved(), &[ok_one, ok_two]);
        assert_eq!(report.failures().len(), 1);
        assert!(report.succeeded());
    }

    #[test]
    fn persist_overall_failure_when_no_location_writable() {
        let dir = tempfile::tempdir().expect("temp dir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file").expect("writable temp file");

        let report = persist(&sample_session("tok"), &[blocker.join("a/s.json")]);
        assert!(!report.succeeded());
        assert_eq!(report.failures().len(), 1);
    }

    #[test]
    fn persisted_sessions_load_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("nested/deeply/session.json");
        let session = sample_session("tok-roundtrip");

        let report = persist(&session, core::slice::from_ref(&target));
        assert!(report.succeeded());

        let located = locate(&[target]).expect("persisted candidate");
        assert_eq!(located.session, session);
    }
}
