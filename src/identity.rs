use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub member_id: String,
    #[serde(default)]
    pub handle: Option<String>,
}

/// The member this installation joined as. Read once at startup and handed
/// to the UI explicitly.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    current: Option<Identity>,
}

impl Session {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let current = match fs::read(&path) {
            Ok(raw) => match serde_json::from_slice::<Identity>(&raw) {
                Ok(identity) => Some(identity),
                Err(error) => {
                    warn!(path = %path.display(), %error, "ignoring unreadable session file");
                    None
                }
            },
            Err(error) if error.kind() == ErrorKind::NotFound => None,
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to read session file {}", path.display()));
            }
        };

        Ok(Self { path, current })
    }

    pub fn current(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    pub fn current_member_id(&self) -> Option<&str> {
        self.current
            .as_ref()
            .map(|identity| identity.member_id.as_str())
    }

    pub fn set_current_member(&mut self, member_id: &str, handle: &str) -> Result<()> {
        let identity = Identity {
            member_id: member_id.to_owned(),
            handle: Some(handle.to_owned()),
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let encoded = serde_json::to_vec_pretty(&identity).context("failed to encode session")?;
        fs::write(&self.path, encoded)
            .with_context(|| format!("failed to write session file {}", self.path.display()))?;

        info!(member_id, "session identity stored");
        self.current = Some(identity);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => {
                return Err(error).with_context(|| {
                    format!("failed to remove session file {}", self.path.display())
                });
            }
        }

        if self.current.take().is_some() {
            info!("session identity cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_no_identity() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::load(dir.path().join("session.json")).unwrap();
        assert_eq!(session.current_member_id(), None);
    }

    #[test]
    fn identity_survives_reload_and_clear_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut session = Session::load(&path).unwrap();
        session.set_current_member("m-1", "alice").unwrap();
        assert_eq!(session.current_member_id(), Some("m-1"));

        let reloaded = Session::load(&path).unwrap();
        assert_eq!(
            reloaded.current(),
            Some(&Identity {
                member_id: "m-1".to_owned(),
                handle: Some("alice".to_owned()),
            })
        );

        session.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(session.current_member_id(), None);
        session.clear().unwrap();
    }

    #[test]
    fn corrupt_session_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, b"[]").unwrap();

        let session = Session::load(&path).unwrap();
        assert_eq!(session.current(), None);
    }
}
