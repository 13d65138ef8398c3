use super::store::TokenStore;
use super::types::*;
use crate::error::{ConsoleError, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Holds the operator's bearer token and gates navigation on it.
///
/// The token is opaque: nothing here decodes or checks its claims. An
/// expired or forged token is only discovered when the backend rejects a
/// request made with it.
pub struct SessionHolder {
    token: Arc<RwLock<Option<String>>>,
    store: Arc<dyn TokenStore>,
}

impl SessionHolder {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
            store,
        }
    }

    /// Builds a holder and loads any token persisted by a previous run.
    pub async fn restore(store: Arc<dyn TokenStore>) -> Result<Self> {
        let holder = Self::new(store);
        let persisted = holder.store.load().await?;
        if persisted.is_some() {
            tracing::info!("Restored persisted session");
        }
        *holder.token.write().await = persisted;
        Ok(holder)
    }

    pub async fn login(&self, token: impl Into<String>) -> Result<Navigation> {
        let token = token.into();
        self.store.save(&token).await?;
        *self.token.write().await = Some(token);
        tracing::info!("Session started");
        Ok(Navigation::redirect(DASHBOARD_ROUTE))
    }

    pub async fn logout(&self) -> Result<Navigation> {
        *self.token.write().await = None;
        self.store.clear().await?;
        tracing::info!("Session ended");
        Ok(Navigation::redirect(LOGIN_ROUTE))
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Token for an authenticated request, or `NotAuthenticated`.
    pub async fn bearer(&self) -> Result<String> {
        self.token().await.ok_or(ConsoleError::NotAuthenticated)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Decides whether `path` may render. Entry routes always proceed so the
    /// login page can never redirect to itself.
    pub async fn guard(&self, path: &str) -> Navigation {
        match RouteKind::classify(path) {
            RouteKind::Protected if !self.is_authenticated().await => {
                tracing::debug!(path = %path, "Redirecting unauthenticated navigation");
                Navigation::redirect(LOGIN_ROUTE)
            }
            _ => Navigation::Proceed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::InMemoryTokenStore;

    fn setup_holder() -> (SessionHolder, Arc<InMemoryTokenStore>) {
        let store = Arc::new(InMemoryTokenStore::new());
        (SessionHolder::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_guard_redirects_without_token() {
        let (holder, _) = setup_holder();

        assert_eq!(holder.guard("/dashboard").await, Navigation::redirect(LOGIN_ROUTE));
        assert_eq!(
            holder.guard("/dashboard/workers").await,
            Navigation::redirect(LOGIN_ROUTE)
        );
    }

    #[tokio::test]
    async fn test_guard_never_redirects_entry_routes() {
        let (holder, _) = setup_holder();

        assert_eq!(holder.guard(LOGIN_ROUTE).await, Navigation::Proceed);
        assert_eq!(holder.guard(REGISTER_ROUTE).await, Navigation::Proceed);
        assert_eq!(holder.guard(REGISTERED_ROUTE).await, Navigation::Proceed);
        assert_eq!(holder.guard("/").await, Navigation::Proceed);
    }

    #[tokio::test]
    async fn test_login_persists_and_unlocks() {
        let (holder, store) = setup_holder();

        let nav = holder.login("tok-123").await.unwrap();

        assert_eq!(nav, Navigation::redirect(DASHBOARD_ROUTE));
        assert!(holder.is_authenticated().await);
        assert_eq!(holder.guard("/dashboard").await, Navigation::Proceed);
        assert_eq!(store.load().await.unwrap().as_deref(), Some("tok-123"));
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let (holder, store) = setup_holder();
        holder.login("tok-123").await.unwrap();

        let nav = holder.logout().await.unwrap();

        assert_eq!(nav, Navigation::redirect(LOGIN_ROUTE));
        assert!(!holder.is_authenticated().await);
        assert!(matches!(holder.bearer().await, Err(ConsoleError::NotAuthenticated)));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_picks_up_persisted_token() {
        let store = Arc::new(InMemoryTokenStore::with_token("from-last-run"));

        let holder = SessionHolder::restore(store).await.unwrap();

        assert_eq!(holder.bearer().await.unwrap(), "from-last-run");
        assert_eq!(holder.guard("/dashboard").await, Navigation::Proceed);
    }

    #[tokio::test]
    async fn test_token_is_not_inspected() {
        let (holder, _) = setup_holder();

        holder.login("definitely-not-a-jwt").await.unwrap();

        assert_eq!(holder.bearer().await.unwrap(), "definitely-not-a-jwt");
    }
}
