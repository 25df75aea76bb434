//! Local preferences storage
//!
//! Persists the signed-in user's handle, session token, postponed actions,
//! and the unread notification count as a single JSON file in a platform
//! data directory. A missing file reads as defaults; a corrupt or unwritable
//! file is an error, since account state cannot be reconstructed from
//! anywhere else.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading or writing preferences
#[derive(Debug, Error)]
pub enum PrefsError {
    /// Filesystem operation failed
    #[error("preferences storage failed: {0}")]
    Io(#[from] io::Error),

    /// The preferences file is not valid JSON
    #[error("preferences file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// An action postponed until the user signs in
///
/// Follow and block require authorization; when requested while signed out
/// they are recorded here and executed after the next successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingAction {
    /// Follow the user once signed in
    Follow {
        /// Handle of the user to follow
        user_handle: String,
    },
    /// Block the user once signed in
    Block {
        /// Handle of the user to block
        user_handle: String,
    },
}

/// Persisted preference values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PrefsData {
    user_handle: Option<String>,
    session_token: Option<String>,
    account: Option<crate::data::AccountData>,
    pending_action: Option<PendingAction>,
    notification_count: u32,
}

/// Disk-backed preferences for the SDK
#[derive(Debug, Clone)]
pub struct Preferences {
    path: PathBuf,
}

impl Preferences {
    /// Creates preferences stored in the platform data directory
    ///
    /// Returns `None` if the data directory cannot be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "socialkit")?;
        let path = project_dirs.data_dir().join("preferences.json");
        Some(Self { path })
    }

    /// Creates preferences stored at an explicit path
    ///
    /// Useful for testing or when the host application owns the location.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<PrefsData, PrefsError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(PrefsData::default())
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, data: &PrefsData) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn update(
        &self,
        mutate: impl FnOnce(&mut PrefsData),
    ) -> Result<(), PrefsError> {
        let mut data = self.load()?;
        mutate(&mut data);
        self.save(&data)
    }

    /// Handle of the signed-in user, if any
    pub fn user_handle(&self) -> Result<Option<String>, PrefsError> {
        Ok(self.load()?.user_handle)
    }

    /// Session token of the signed-in user, if any
    pub fn session_token(&self) -> Result<Option<String>, PrefsError> {
        Ok(self.load()?.session_token)
    }

    /// Stored profile of the signed-in user, if any
    pub fn account_data(&self) -> Result<Option<crate::data::AccountData>, PrefsError> {
        Ok(self.load()?.account)
    }

    /// Stores the session identity after a successful sign-in
    pub fn set_session(
        &self,
        user_handle: &str,
        session_token: &str,
        account: &crate::data::AccountData,
    ) -> Result<(), PrefsError> {
        self.update(|data| {
            data.user_handle = Some(user_handle.to_string());
            data.session_token = Some(session_token.to_string());
            data.account = Some(account.clone());
        })
    }

    /// Replaces the stored account profile
    pub fn set_account_data(&self, account: &crate::data::AccountData) -> Result<(), PrefsError> {
        self.update(|data| data.account = Some(account.clone()))
    }

    /// Clears everything tied to the signed-in user
    pub fn clear_session(&self) -> Result<(), PrefsError> {
        self.update(|data| {
            data.user_handle = None;
            data.session_token = None;
            data.account = None;
            data.notification_count = 0;
        })
    }

    /// The postponed action, if one was recorded
    pub fn pending_action(&self) -> Result<Option<PendingAction>, PrefsError> {
        Ok(self.load()?.pending_action)
    }

    /// Records an action to run after the next sign-in
    pub fn set_pending_action(&self, action: PendingAction) -> Result<(), PrefsError> {
        self.update(|data| data.pending_action = Some(action))
    }

    /// Removes the postponed action
    pub fn clear_pending_action(&self) -> Result<(), PrefsError> {
        self.update(|data| data.pending_action = None)
    }

    /// Current unread notification count
    pub fn notification_count(&self) -> Result<u32, PrefsError> {
        Ok(self.load()?.notification_count)
    }

    /// Replaces the unread notification count
    pub fn set_notification_count(&self, count: u32) -> Result<(), PrefsError> {
        self.update(|data| data.notification_count = count)
    }
}
