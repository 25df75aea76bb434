//! Account management
//!
//! `AccountManager` owns the signed-in user's identity: handle, session
//! token, and profile. It performs relationship actions (follow, block,
//! accept/reject requests) against the platform, defers follow/block to a
//! pending action when no user is signed in, and notifies the host
//! application of account changes over a bounded channel.
//!
//! All collaborators are injected: the manager never reaches into process
//! globals for its API client, preferences, or cache.

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{ApiError, SessionService, UserActions};
use crate::cache::{CacheError, CacheStore};
use crate::data::{AccountData, FollowerStatus, UserCompactView};
use crate::prefs::{PendingAction, Preferences, PrefsError};

/// Capacity of the account event channel
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Notifications sent to the host application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    /// A user signed in
    SignedIn,
    /// The user signed out
    SignedOut,
    /// An action required authorization; the host should start sign-in
    SignInRequired,
    /// The follow relationship towards a user changed
    FollowerStatusChanged {
        /// Handle of the affected user
        user_handle: String,
        /// New relationship status
        status: FollowerStatus,
    },
    /// A user was blocked
    UserBlocked {
        /// Handle of the blocked user
        user_handle: String,
    },
    /// A user was unblocked
    UserUnblocked {
        /// Handle of the unblocked user
        user_handle: String,
    },
}

/// Errors that can occur during account operations
#[derive(Debug, Error)]
pub enum AccountError {
    /// Preferences storage failed
    #[error(transparent)]
    Prefs(#[from] PrefsError),

    /// Cache storage failed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A platform call failed
    #[error("account request failed: {0}")]
    Api(#[from] ApiError),
}

/// Manages functionality related to the signed-in user account
pub struct AccountManager<A> {
    api: A,
    prefs: Preferences,
    cache: CacheStore,
    user_handle: Option<String>,
    account: Option<AccountData>,
    events: mpsc::Sender<AccountEvent>,
}

impl<A: UserActions + SessionService> AccountManager<A> {
    /// Creates an account manager, restoring any persisted session
    ///
    /// Returns the manager together with the receiving end of the event
    /// channel. If preferences hold a session from a previous run, the
    /// identity is restored and the API client gets its token back.
    pub fn new(
        api: A,
        prefs: Preferences,
        cache: CacheStore,
    ) -> Result<(Self, mpsc::Receiver<AccountEvent>), AccountError> {
        let user_handle = prefs.user_handle()?;
        let account = prefs.account_data()?;
        if let Some(token) = prefs.session_token()? {
            api.set_session_token(Some(token));
        }

        let (events, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Ok((
            Self {
                api,
                prefs,
                cache,
                user_handle,
                account,
                events,
            },
            receiver,
        ))
    }

    async fn emit(&self, event: AccountEvent) {
        // The host may have dropped the receiver; events are advisory
        let _ = self.events.send(event).await;
    }

    /// Whether a user is currently signed in
    pub fn is_signed_in(&self) -> bool {
        self.user_handle.is_some()
    }

    /// Whether the given handle belongs to the signed-in user
    pub fn is_current_user(&self, some_user_handle: &str) -> bool {
        self.user_handle.as_deref() == Some(some_user_handle)
    }

    /// Handle of the signed-in user, if any
    pub fn user_handle(&self) -> Option<&str> {
        self.user_handle.as_deref()
    }

    /// Profile of the signed-in user, if any
    pub fn account_data(&self) -> Option<&AccountData> {
        self.account.as_ref()
    }

    /// Builds a compact view of the signed-in user's profile
    pub fn compact_view(&self) -> Option<UserCompactView> {
        let user_handle = self.user_handle.clone()?;
        let account = self.account.as_ref()?;
        Some(UserCompactView {
            user_handle,
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            photo_url: account.photo_url.clone(),
            is_private: account.is_private,
            follower_status: FollowerStatus::None,
        })
    }

    /// Completes a sign-in
    ///
    /// Clears feeds cached for the previous identity, persists the new
    /// session, emits [`AccountEvent::SignedIn`], and runs any action that
    /// was postponed while signed out.
    pub async fn on_signed_in(
        &mut self,
        user_handle: &str,
        session_token: &str,
        account: AccountData,
    ) -> Result<(), AccountError> {
        self.cache.clear()?;
        self.prefs.set_session(user_handle, session_token, &account)?;
        self.api.set_session_token(Some(session_token.to_string()));
        self.user_handle = Some(user_handle.to_string());
        self.account = Some(account);
        debug!(%user_handle, "signed in");
        self.emit(AccountEvent::SignedIn).await;

        if let Some(action) = self.prefs.pending_action()? {
            self.prefs.clear_pending_action()?;
            self.run_pending_action(action).await?;
        }
        Ok(())
    }

    async fn run_pending_action(&mut self, action: PendingAction) -> Result<(), AccountError> {
        debug!(?action, "running postponed action");
        match action {
            PendingAction::Follow { user_handle } => {
                self.api.follow_user(&user_handle).await?;
                self.emit(AccountEvent::FollowerStatusChanged {
                    user_handle,
                    status: FollowerStatus::Follow,
                })
                .await;
            }
            PendingAction::Block { user_handle } => {
                self.api.block_user(&user_handle).await?;
                self.emit(AccountEvent::UserBlocked { user_handle }).await;
            }
        }
        Ok(())
    }

    /// Signs out: ends the platform session and clears all local state
    ///
    /// Local state is cleared even when the platform call fails; the network
    /// error is still reported so the host can surface it.
    pub async fn sign_out(&mut self) -> Result<(), AccountError> {
        let network = self.api.delete_session().await;
        if let Err(err) = &network {
            warn!(error = %err, "session deletion failed, signing out locally anyway");
        }
        self.sign_out_locally().await?;
        network?;
        Ok(())
    }

    /// Clears all local state tied to the signed-in user
    pub async fn sign_out_locally(&mut self) -> Result<(), AccountError> {
        self.prefs.clear_session()?;
        self.cache.clear()?;
        self.api.set_session_token(None);
        self.user_handle = None;
        self.account = None;
        self.emit(AccountEvent::SignedOut).await;
        Ok(())
    }

    /// Replaces the signed-in user's profile
    pub fn update_account_data(&mut self, new_account: AccountData) -> Result<(), AccountError> {
        self.prefs.set_account_data(&new_account)?;
        self.account = Some(new_account);
        Ok(())
    }

    /// Follows another user
    ///
    /// Requires authorization: when no user is signed in, the follow is
    /// recorded as a pending action, [`AccountEvent::SignInRequired`] is
    /// emitted, and `Ok(false)` is returned. The action runs after the next
    /// successful sign-in.
    ///
    /// # Arguments
    /// * `user_handle` - Handle of the user to follow
    /// * `is_private` - Whether the target account is private (follow
    ///   requests to private accounts end up pending approval)
    pub async fn follow_user(
        &mut self,
        user_handle: &str,
        is_private: bool,
    ) -> Result<bool, AccountError> {
        if !self.is_signed_in() {
            self.prefs.set_pending_action(PendingAction::Follow {
                user_handle: user_handle.to_string(),
            })?;
            self.emit(AccountEvent::SignInRequired).await;
            return Ok(false);
        }

        self.api.follow_user(user_handle).await?;
        let status = if is_private {
            FollowerStatus::Pending
        } else {
            FollowerStatus::Follow
        };
        self.emit(AccountEvent::FollowerStatusChanged {
            user_handle: user_handle.to_string(),
            status,
        })
        .await;
        Ok(true)
    }

    /// Unfollows a user
    pub async fn unfollow_user(&mut self, user_handle: &str) -> Result<(), AccountError> {
        self.api.unfollow_user(user_handle).await?;
        self.emit(AccountEvent::FollowerStatusChanged {
            user_handle: user_handle.to_string(),
            status: FollowerStatus::None,
        })
        .await;
        Ok(())
    }

    /// Blocks a user
    ///
    /// Requires authorization, with the same pending-action behavior as
    /// [`AccountManager::follow_user`].
    pub async fn block_user(&mut self, user_handle: &str) -> Result<bool, AccountError> {
        if !self.is_signed_in() {
            self.prefs.set_pending_action(PendingAction::Block {
                user_handle: user_handle.to_string(),
            })?;
            self.emit(AccountEvent::SignInRequired).await;
            return Ok(false);
        }

        self.api.block_user(user_handle).await?;
        self.emit(AccountEvent::UserBlocked {
            user_handle: user_handle.to_string(),
        })
        .await;
        Ok(true)
    }

    /// Unblocks a user
    pub async fn unblock_user(&mut self, user_handle: &str) -> Result<(), AccountError> {
        self.api.unblock_user(user_handle).await?;
        self.emit(AccountEvent::UserUnblocked {
            user_handle: user_handle.to_string(),
        })
        .await;
        Ok(())
    }

    /// Accepts an incoming follow request
    pub async fn accept_follow_request(&mut self, user_handle: &str) -> Result<(), AccountError> {
        self.api.accept_follow_request(user_handle).await?;
        Ok(())
    }

    /// Rejects an incoming follow request
    pub async fn reject_follow_request(&mut self, user_handle: &str) -> Result<(), AccountError> {
        self.api.reject_follow_request(user_handle).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{SessionCreated, SessionParams};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<String>>,
        token: Mutex<Option<String>>,
        fail_delete_session: bool,
    }

    impl FakeApi {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UserActions for &FakeApi {
        async fn follow_user(&self, user_handle: &str) -> Result<(), ApiError> {
            self.record(format!("follow:{}", user_handle));
            Ok(())
        }

        async fn unfollow_user(&self, user_handle: &str) -> Result<(), ApiError> {
            self.record(format!("unfollow:{}", user_handle));
            Ok(())
        }

        async fn block_user(&self, user_handle: &str) -> Result<(), ApiError> {
            self.record(format!("block:{}", user_handle));
            Ok(())
        }

        async fn unblock_user(&self, user_handle: &str) -> Result<(), ApiError> {
            self.record(format!("unblock:{}", user_handle));
            Ok(())
        }

        async fn accept_follow_request(&self, user_handle: &str) -> Result<(), ApiError> {
            self.record(format!("accept:{}", user_handle));
            Ok(())
        }

        async fn reject_follow_request(&self, user_handle: &str) -> Result<(), ApiError> {
            self.record(format!("reject:{}", user_handle));
            Ok(())
        }
    }

    #[async_trait]
    impl SessionService for &FakeApi {
        async fn post_session(&self, _params: &SessionParams) -> Result<SessionCreated, ApiError> {
            self.record("post_session");
            Ok(SessionCreated {
                user_handle: "alice".to_string(),
                session_token: "token".to_string(),
            })
        }

        async fn delete_session(&self) -> Result<(), ApiError> {
            self.record("delete_session");
            if self.fail_delete_session {
                Err(ApiError::Status { code: 500 })
            } else {
                Ok(())
            }
        }

        fn set_session_token(&self, token: Option<String>) {
            *self.token.lock().unwrap() = token;
        }
    }

    struct Fixture {
        _temp_dir: TempDir,
        cache: CacheStore,
        prefs: Preferences,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheStore::with_dir(temp_dir.path().join("cache"));
        let prefs = Preferences::with_path(temp_dir.path().join("preferences.json"));
        Fixture {
            _temp_dir: temp_dir,
            cache,
            prefs,
        }
    }

    fn sample_account() -> AccountData {
        AccountData {
            first_name: "Alice".to_string(),
            last_name: "Adams".to_string(),
            photo_url: Some("https://cdn.example.com/alice.jpg".to_string()),
            bio: None,
            is_private: false,
        }
    }

    #[tokio::test]
    async fn test_starts_signed_out_with_empty_prefs() {
        let api = FakeApi::default();
        let fx = fixture();

        let (manager, _events) = AccountManager::new(&api, fx.prefs, fx.cache)
            .expect("Manager creation should succeed");

        assert!(!manager.is_signed_in());
        assert!(manager.account_data().is_none());
        assert!(manager.compact_view().is_none());
    }

    #[tokio::test]
    async fn test_restores_persisted_session() {
        let api = FakeApi::default();
        let fx = fixture();
        fx.prefs
            .set_session("alice", "token-1", &sample_account())
            .expect("Seed should succeed");

        let (manager, _events) = AccountManager::new(&api, fx.prefs, fx.cache)
            .expect("Manager creation should succeed");

        assert!(manager.is_signed_in());
        assert!(manager.is_current_user("alice"));
        assert!(!manager.is_current_user("bob"));
        assert_eq!(api.token.lock().unwrap().as_deref(), Some("token-1"));
    }

    #[tokio::test]
    async fn test_on_signed_in_persists_and_clears_cache() {
        let api = FakeApi::default();
        let fx = fixture();
        fx.cache
            .write("followers_old_user", &vec!["stale".to_string()])
            .expect("Seed should succeed");
        let prefs = fx.prefs.clone();

        let (mut manager, mut events) = AccountManager::new(&api, fx.prefs, fx.cache.clone())
            .expect("Manager creation should succeed");

        manager
            .on_signed_in("alice", "token-1", sample_account())
            .await
            .expect("Sign-in completion should succeed");

        assert!(manager.is_signed_in());
        assert_eq!(prefs.user_handle().unwrap().as_deref(), Some("alice"));
        assert_eq!(prefs.session_token().unwrap().as_deref(), Some("token-1"));
        let stale: Option<crate::cache::CachedEntry<Vec<String>>> =
            fx.cache.read("followers_old_user").expect("Read should not fail");
        assert!(stale.is_none(), "Previous identity's cache must be cleared");
        assert_eq!(events.try_recv().unwrap(), AccountEvent::SignedIn);
    }

    #[tokio::test]
    async fn test_follow_while_signed_out_records_pending_action() {
        let api = FakeApi::default();
        let fx = fixture();
        let prefs = fx.prefs.clone();

        let (mut manager, mut events) = AccountManager::new(&api, fx.prefs, fx.cache)
            .expect("Manager creation should succeed");

        let followed = manager
            .follow_user("bob", false)
            .await
            .expect("Follow should not error");

        assert!(!followed);
        assert!(api.calls().is_empty(), "No API call while signed out");
        assert_eq!(
            prefs.pending_action().unwrap(),
            Some(PendingAction::Follow {
                user_handle: "bob".to_string()
            })
        );
        assert_eq!(events.try_recv().unwrap(), AccountEvent::SignInRequired);
    }

    #[tokio::test]
    async fn test_pending_follow_runs_after_sign_in() {
        let api = FakeApi::default();
        let fx = fixture();
        let prefs = fx.prefs.clone();

        let (mut manager, mut events) = AccountManager::new(&api, fx.prefs, fx.cache)
            .expect("Manager creation should succeed");

        manager.follow_user("bob", false).await.expect("Follow should not error");
        manager
            .on_signed_in("alice", "token-1", sample_account())
            .await
            .expect("Sign-in completion should succeed");

        assert_eq!(api.calls(), vec!["follow:bob".to_string()]);
        assert!(prefs.pending_action().unwrap().is_none());
        assert_eq!(events.try_recv().unwrap(), AccountEvent::SignInRequired);
        assert_eq!(events.try_recv().unwrap(), AccountEvent::SignedIn);
        assert_eq!(
            events.try_recv().unwrap(),
            AccountEvent::FollowerStatusChanged {
                user_handle: "bob".to_string(),
                status: FollowerStatus::Follow,
            }
        );
    }

    #[tokio::test]
    async fn test_follow_while_signed_in_calls_api() {
        let api = FakeApi::default();
        let fx = fixture();

        let (mut manager, mut events) = AccountManager::new(&api, fx.prefs, fx.cache)
            .expect("Manager creation should succeed");
        manager
            .on_signed_in("alice", "token-1", sample_account())
            .await
            .expect("Sign-in completion should succeed");
        let _ = events.try_recv();

        let followed = manager
            .follow_user("bob", true)
            .await
            .expect("Follow should succeed");

        assert!(followed);
        assert_eq!(api.calls(), vec!["follow:bob".to_string()]);
        // Private target: the relationship lands in pending approval
        assert_eq!(
            events.try_recv().unwrap(),
            AccountEvent::FollowerStatusChanged {
                user_handle: "bob".to_string(),
                status: FollowerStatus::Pending,
            }
        );
    }

    #[tokio::test]
    async fn test_block_while_signed_out_records_pending_action() {
        let api = FakeApi::default();
        let fx = fixture();
        let prefs = fx.prefs.clone();

        let (mut manager, _events) = AccountManager::new(&api, fx.prefs, fx.cache)
            .expect("Manager creation should succeed");

        let blocked = manager.block_user("mallory").await.expect("Block should not error");

        assert!(!blocked);
        assert_eq!(
            prefs.pending_action().unwrap(),
            Some(PendingAction::Block {
                user_handle: "mallory".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_sign_out_clears_local_state() {
        let api = FakeApi::default();
        let fx = fixture();
        let prefs = fx.prefs.clone();

        let (mut manager, mut events) = AccountManager::new(&api, fx.prefs, fx.cache)
            .expect("Manager creation should succeed");
        manager
            .on_signed_in("alice", "token-1", sample_account())
            .await
            .expect("Sign-in completion should succeed");

        manager.sign_out().await.expect("Sign-out should succeed");

        assert!(!manager.is_signed_in());
        assert!(prefs.user_handle().unwrap().is_none());
        assert!(prefs.session_token().unwrap().is_none());
        assert!(api.token.lock().unwrap().is_none());
        assert_eq!(events.try_recv().unwrap(), AccountEvent::SignedIn);
        assert_eq!(events.try_recv().unwrap(), AccountEvent::SignedOut);
    }

    #[tokio::test]
    async fn test_sign_out_clears_locally_even_when_network_fails() {
        let api = FakeApi {
            fail_delete_session: true,
            ..Default::default()
        };
        let fx = fixture();
        let prefs = fx.prefs.clone();

        let (mut manager, _events) = AccountManager::new(&api, fx.prefs, fx.cache)
            .expect("Manager creation should succeed");
        manager
            .on_signed_in("alice", "token-1", sample_account())
            .await
            .expect("Sign-in completion should succeed");

        let result = manager.sign_out().await;

        assert!(matches!(
            result,
            Err(AccountError::Api(ApiError::Status { code: 500 }))
        ));
        assert!(!manager.is_signed_in(), "Local sign-out must not be rolled back");
        assert!(prefs.user_handle().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unfollow_emits_status_change() {
        let api = FakeApi::default();
        let fx = fixture();

        let (mut manager, mut events) = AccountManager::new(&api, fx.prefs, fx.cache)
            .expect("Manager creation should succeed");
        manager
            .on_signed_in("alice", "token-1", sample_account())
            .await
            .expect("Sign-in completion should succeed");
        let _ = events.try_recv();

        manager.unfollow_user("bob").await.expect("Unfollow should succeed");

        assert_eq!(api.calls(), vec!["unfollow:bob".to_string()]);
        assert_eq!(
            events.try_recv().unwrap(),
            AccountEvent::FollowerStatusChanged {
                user_handle: "bob".to_string(),
                status: FollowerStatus::None,
            }
        );
    }

    #[tokio::test]
    async fn test_accept_and_reject_pass_through() {
        let api = FakeApi::default();
        let fx = fixture();

        let (mut manager, _events) = AccountManager::new(&api, fx.prefs, fx.cache)
            .expect("Manager creation should succeed");
        manager
            .on_signed_in("alice", "token-1", sample_account())
            .await
            .expect("Sign-in completion should succeed");

        manager
            .accept_follow_request("bob")
            .await
            .expect("Accept should succeed");
        manager
            .reject_follow_request("carol")
            .await
            .expect("Reject should succeed");

        assert_eq!(
            api.calls(),
            vec!["accept:bob".to_string(), "reject:carol".to_string()]
        );
    }

    #[tokio::test]
    async fn test_compact_view_reflects_account() {
        let api = FakeApi::default();
        let fx = fixture();

        let (mut manager, _events) = AccountManager::new(&api, fx.prefs, fx.cache)
            .expect("Manager creation should succeed");
        manager
            .on_signed_in("alice", "token-1", sample_account())
            .await
            .expect("Sign-in completion should succeed");

        let view = manager.compact_view().expect("View should exist when signed in");
        assert_eq!(view.user_handle, "alice");
        assert_eq!(view.first_name, "Alice");
        assert_eq!(
            view.photo_url.as_deref(),
            Some("https://cdn.example.com/alice.jpg")
        );
    }

    #[tokio::test]
    async fn test_update_account_data_persists() {
        let api = FakeApi::default();
        let fx = fixture();
        let prefs = fx.prefs.clone();

        let (mut manager, _events) = AccountManager::new(&api, fx.prefs, fx.cache)
            .expect("Manager creation should succeed");
        manager
            .on_signed_in("alice", "token-1", sample_account())
            .await
            .expect("Sign-in completion should succeed");

        let mut updated = sample_account();
        updated.bio = Some("hello".to_string());
        manager
            .update_account_data(updated.clone())
            .expect("Update should succeed");

        assert_eq!(manager.account_data(), Some(&updated));
        assert_eq!(prefs.account_data().unwrap(), Some(updated));
    }
}
