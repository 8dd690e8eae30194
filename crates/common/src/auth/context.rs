//! Application-facing view of the authenticated user
//!
//! `AuthContext` turns the current session into an [`AuthUser`] and answers
//! permission and route questions for it. Sessions from the local-auth path
//! carry no role claim; their role is looked up in the profile table.

use std::sync::Arc;

use mentorhub_domain::{AuthUser, Role, Session, UserProfile};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::session::SessionManager;
use super::traits::ProfileSource;
use super::types::AuthError;
use crate::security::PermissionEvaluator;

/// Outcome of a route guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Granted,
    /// Signed in, but the role may not open this route
    Forbidden,
    /// No session
    SignInRequired,
}

#[derive(Default)]
struct Resolved {
    user: Option<AuthUser>,
    /// Last profile fetched successfully, kept for fetch failures
    profile: Option<UserProfile>,
    /// Bumped by every sign-out and published session change; a resolve
    /// that started under an older generation must not commit
    generation: u64,
}

/// Authenticated-user state shared with the application
pub struct AuthContext {
    sessions: Arc<SessionManager>,
    evaluator: PermissionEvaluator,
    profiles: Option<Arc<dyn ProfileSource>>,
    resolved: RwLock<Resolved>,
}

impl AuthContext {
    #[must_use]
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            sessions,
            evaluator: PermissionEvaluator::default(),
            profiles: None,
            resolved: RwLock::new(Resolved::default()),
        }
    }

    /// Look roles up in the profile table when claims lack one
    #[must_use]
    pub fn with_profile_source(mut self, profiles: Arc<dyn ProfileSource>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    #[must_use]
    pub fn with_evaluator(mut self, evaluator: PermissionEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Re-derive the user from the current session
    ///
    /// A failed profile lookup is logged and leaves the user with the last
    /// known profile, or the least-privileged role. If the session ends or
    /// changes while the lookup is in flight, the result is discarded.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the session cannot be read
    pub async fn resolve(&self) -> Result<Option<AuthUser>, AuthError> {
        let generation = self.resolved.read().generation;
        let session = self.sessions.get_current_session().await?;
        Ok(self.apply_session(session.as_ref(), generation).await)
    }

    async fn apply_session(&self, session: Option<&Session>, generation: u64) -> Option<AuthUser> {
        let Some(session) = session else {
            self.clear();
            return None;
        };

        let mut user = AuthUser::from_claims(&session.user);
        let needs_profile = session.user.role.is_none();
        let fetched = match (&self.profiles, needs_profile) {
            (Some(profiles), true) => {
                let result = profiles.fetch_profile(session).await;
                if !self.still_signed_in(session).await {
                    debug!(user = %user.id, "Session ended during profile lookup");
                    self.clear();
                    return None;
                }
                match result {
                    Ok(profile) => Some(profile),
                    Err(e) => {
                        warn!(error = %e, user = %user.id, "Profile lookup failed; keeping role");
                        None
                    }
                }
            }
            _ => None,
        };

        let mut resolved = self.resolved.write();
        if resolved.generation != generation {
            debug!(user = %user.id, "Auth context changed during resolve; result dropped");
            return resolved.user.clone();
        }
        if fetched.is_some() {
            resolved.profile = fetched;
        } else if resolved.profile.as_ref().is_some_and(|p| p.id != user.id) {
            resolved.profile = None;
        }
        if needs_profile {
            if let Some(profile) = &resolved.profile {
                user.apply_profile(profile);
            }
        }
        resolved.user = Some(user.clone());
        Some(user)
    }

    /// Whether the store still holds a session for `session`'s user
    async fn still_signed_in(&self, session: &Session) -> bool {
        match self.sessions.get_current_session().await {
            Ok(Some(current)) => current.user.id == session.user.id,
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Could not re-read session after profile lookup");
                false
            }
        }
    }

    fn clear(&self) {
        let mut resolved = self.resolved.write();
        *resolved = Resolved { generation: resolved.generation + 1, ..Resolved::default() };
        debug!("No session; auth context cleared");
    }

    fn next_generation(&self) -> u64 {
        let mut resolved = self.resolved.write();
        resolved.generation += 1;
        resolved.generation
    }

    /// Retry the profile lookup for the current session
    ///
    /// # Errors
    /// Returns `AuthError::NotAuthenticated` without a session, or the
    /// lookup's `AuthError::ProfileFetch`
    pub async fn refresh_profile(&self) -> Result<AuthUser, AuthError> {
        let generation = self.resolved.read().generation;
        let session =
            self.sessions.get_current_session().await?.ok_or(AuthError::NotAuthenticated)?;
        let profiles = self
            .profiles
            .as_ref()
            .ok_or_else(|| AuthError::ProfileFetch("no profile source configured".into()))?;
        let profile = profiles.fetch_profile(&session).await?;
        if !self.still_signed_in(&session).await {
            self.clear();
            return Err(AuthError::NotAuthenticated);
        }

        let mut user = AuthUser::from_claims(&session.user);
        user.apply_profile(&profile);
        let mut resolved = self.resolved.write();
        if resolved.generation != generation {
            return resolved.user.clone().ok_or(AuthError::NotAuthenticated);
        }
        resolved.profile = Some(profile);
        resolved.user = Some(user.clone());
        Ok(user)
    }

    /// Keep this context in step with the session manager
    ///
    /// Re-resolves whenever the manager publishes a session change. The task
    /// ends when the manager is dropped.
    #[must_use]
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let context = Arc::clone(self);
        let mut changes = self.sessions.subscribe();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let session = changes.borrow_and_update().clone();
                let generation = context.next_generation();
                context.apply_session(session.as_ref(), generation).await;
            }
        })
    }

    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        self.resolved.read().user.clone()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.resolved.read().user.as_ref().map(|u| u.role)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.resolved.read().user.is_some()
    }

    /// Whether the current user holds `permission`; false when signed out
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.role().is_some_and(|role| self.evaluator.has_permission(role, permission))
    }

    /// Whether the current user may open `path`; false when signed out
    #[must_use]
    pub fn can_access_route(&self, path: &str) -> bool {
        self.check_route(path) == RouteAccess::Granted
    }

    #[must_use]
    pub fn check_route(&self, path: &str) -> RouteAccess {
        match self.role() {
            None => RouteAccess::SignInRequired,
            Some(role) if self.evaluator.can_access_route(role, path) => RouteAccess::Granted,
            Some(_) => RouteAccess::Forbidden,
        }
    }

    /// Whether the current user has any of `roles`
    #[must_use]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role().is_some_and(|role| roles.contains(&role))
    }

    #[must_use]
    pub fn evaluator(&self) -> &PermissionEvaluator {
        &self.evaluator
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use mentorhub_domain::{AuthConfig, SessionOrigin, UserClaims};
    use tokio::sync::Notify;

    use super::*;
    use crate::auth::store::{MemorySecretStore, PersistedTokenStore};
    use crate::auth::traits::TokenStore;
    use crate::testing::{MockProfileSource, RecordingNavigator};

    /// Profile source that holds each lookup until released
    struct GatedProfiles {
        entered: Notify,
        release: Notify,
        profile: UserProfile,
    }

    #[async_trait]
    impl ProfileSource for GatedProfiles {
        async fn fetch_profile(&self, _session: &Session) -> Result<UserProfile, AuthError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(self.profile.clone())
        }
    }

    async fn context_with(
        claims: Option<UserClaims>,
        profiles: &Arc<MockProfileSource>,
    ) -> AuthContext {
        context_with_source(claims, profiles.clone()).await
    }

    async fn context_with_source(
        claims: Option<UserClaims>,
        profiles: Arc<dyn ProfileSource>,
    ) -> AuthContext {
        let store = Arc::new(PersistedTokenStore::new(
            MemorySecretStore::new(),
            "ctx",
            mentorhub_domain::Environment::Test.storage_attributes(),
            3600,
        ));
        if let Some(claims) = claims {
            let session =
                Session::new("at", "rt", 3600, None, claims).with_origin(SessionOrigin::Local);
            store.save(&session).await.unwrap();
        }
        let sessions = SessionManager::builder(AuthConfig::new("", "", ""))
            .store(store)
            .navigator(Arc::new(RecordingNavigator::new()))
            .build()
            .unwrap();
        AuthContext::new(sessions).with_profile_source(profiles)
    }

    fn profile(role: &str) -> UserProfile {
        UserProfile {
            id: "u1".into(),
            email: "u1@example.com".into(),
            full_name: Some("User One".into()),
            role: Some(role.into()),
            department: None,
            external_id: None,
        }
    }

    #[tokio::test]
    async fn signed_out_context_denies_everything() {
        let ctx = context_with(None, &Arc::new(MockProfileSource::new())).await;
        assert_eq!(ctx.resolve().await.unwrap(), None);
        assert!(!ctx.has_permission("view_dashboard"));
        assert_eq!(ctx.check_route("/dashboard"), RouteAccess::SignInRequired);
    }

    #[tokio::test]
    async fn role_claim_skips_profile_lookup() {
        let profiles = Arc::new(MockProfileSource::new());
        let claims = UserClaims::new("u1", "u1@example.com").with_role("admin");
        let ctx = context_with(Some(claims), &profiles).await;

        let user = ctx.resolve().await.unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(profiles.calls(), 0);
        assert!(ctx.has_permission("manage_users"));
        assert_eq!(ctx.check_route("/admin/users"), RouteAccess::Granted);
    }

    /// Validates `AuthContext::resolve` behavior for the local-auth session
    /// scenario.
    ///
    /// Assertions:
    /// - The profile table's role is applied.
    /// - A later lookup failure keeps the last known role.
    #[tokio::test]
    async fn local_session_takes_role_from_profile() {
        let profiles = Arc::new(MockProfileSource::new());
        profiles.push(Ok(profile("mentor")));
        profiles.push(Err(AuthError::ProfileFetch("timeout".into())));
        let ctx = context_with(Some(UserClaims::new("u1", "u1@example.com")), &profiles).await;

        let first = ctx.resolve().await.unwrap().unwrap();
        assert_eq!(first.role, Role::Mentor);
        assert_eq!(first.display_name, "User One");

        let second = ctx.resolve().await.unwrap().unwrap();
        assert_eq!(second.role, Role::Mentor);
        assert_eq!(profiles.calls(), 2);
    }

    #[tokio::test]
    async fn failed_first_lookup_defaults_to_mentee() {
        let profiles = Arc::new(MockProfileSource::new());
        profiles.push(Err(AuthError::ProfileFetch("no row".into())));
        let ctx = context_with(Some(UserClaims::new("u1", "u1@example.com")), &profiles).await;

        let user = ctx.resolve().await.unwrap().unwrap();
        assert_eq!(user.role, Role::Mentee);
        assert_eq!(ctx.check_route("/admin"), RouteAccess::Forbidden);
        assert!(ctx.can_access_route("/some/unlisted/page"));
    }

    #[tokio::test]
    async fn refresh_profile_updates_role() {
        let profiles = Arc::new(MockProfileSource::new());
        profiles.push(Err(AuthError::ProfileFetch("offline".into())));
        profiles.push(Ok(profile("dept_lead")));
        let ctx = context_with(Some(UserClaims::new("u1", "u1@example.com")), &profiles).await;

        ctx.resolve().await.unwrap();
        assert_eq!(ctx.role(), Some(Role::Mentee));

        let user = ctx.refresh_profile().await.unwrap();
        assert_eq!(user.role, Role::DeptLead);
        assert_eq!(ctx.role(), Some(Role::DeptLead));
        assert!(ctx.has_any_role(&[Role::Admin, Role::DeptLead]));
    }

    /// Validates `AuthContext::resolve` behavior when logout lands during
    /// the profile lookup.
    ///
    /// # Test Steps
    /// 1. Start a resolve whose profile lookup blocks.
    /// 2. Log out while the lookup is held.
    /// 3. Release the lookup with an admin profile.
    ///
    /// Assertions:
    /// - The late result is dropped and the context stays signed out.
    #[tokio::test]
    async fn logout_during_profile_lookup_leaves_context_signed_out() {
        let profiles = Arc::new(GatedProfiles {
            entered: Notify::new(),
            release: Notify::new(),
            profile: profile("admin"),
        });
        let ctx = Arc::new(
            context_with_source(Some(UserClaims::new("u1", "u1@example.com")), profiles.clone())
                .await,
        );
        let listener = ctx.spawn_listener();

        let pending = tokio::spawn({
            let ctx = Arc::clone(&ctx);
            async move { ctx.resolve().await }
        });
        profiles.entered.notified().await;
        ctx.sessions().logout().await.unwrap();
        profiles.release.notify_one();

        assert_eq!(pending.await.unwrap().unwrap(), None);
        tokio::task::yield_now().await;
        assert!(ctx.sessions().get_current_session().await.unwrap().is_none());
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.role(), None);
        assert!(!ctx.can_access_route("/admin/users"));
        listener.abort();
    }
}
