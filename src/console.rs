//! Top-level handle that wires the client, session, fetcher, coordinator and
//! roster manager together from a single [`ConsoleConfig`].

use crate::api::{ApiClient, BusinessIdentity, FailureLog, InboundCall, RegisterRequest, Task};
use crate::assignment::AssignmentCoordinator;
use crate::config::ConsoleConfig;
use crate::dashboard::DashboardFetcher;
use crate::error::Result;
use crate::roster::RosterManager;
use crate::session::{Navigation, SessionHolder, TokenStore, REGISTERED_ROUTE};
use std::sync::Arc;

pub const LOGIN_FALLBACK: &str = "Login failed";
pub const REGISTER_FALLBACK: &str = "Registration failed";

/// Caller number the call simulator uses unless told otherwise.
pub const DEFAULT_CALLER_PHONE: &str = "+919876543210";
pub const DEFAULT_FAILURE_LIMIT: u32 = 50;

/// A canned transcript for the call simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleCall {
    pub title: &'static str,
    pub text: &'static str,
}

pub const SAMPLE_CALLS: [SampleCall; 5] = [
    SampleCall {
        title: "AC Repair - Urgent",
        text: "Hello, my AC stopped working completely. It's not cooling at all. I'm in Madhapur and it's really hot. Can someone come today?",
    },
    SampleCall {
        title: "Plumbing - Medium",
        text: "Hi, I have a leaking faucet in my kitchen. It's been dripping for a few days. I'm in Banjara Hills. When can someone fix it?",
    },
    SampleCall {
        title: "Electrical - Critical",
        text: "Emergency! The main circuit breaker in my house keeps tripping. I have no power. I'm in Gachibowli. Need immediate help!",
    },
    SampleCall {
        title: "Clinic Appointment",
        text: "I'd like to book an appointment for tomorrow afternoon. I have a persistent cough and need to see a doctor. My phone is 9876543210.",
    },
    SampleCall {
        title: "General Maintenance",
        text: "We need a general inspection of our apartment. Looking for next week, preferably Wednesday. We're in Kondapur.",
    },
];

impl SampleCall {
    /// Looks up a sample by its 1-based position in [`SAMPLE_CALLS`].
    pub fn numbered(number: usize) -> Option<&'static SampleCall> {
        number.checked_sub(1).and_then(|i| SAMPLE_CALLS.get(i))
    }
}

pub struct Console {
    config: ConsoleConfig,
    api: Arc<ApiClient>,
    session: Arc<SessionHolder>,
    fetcher: Arc<DashboardFetcher>,
    coordinator: Arc<AssignmentCoordinator>,
    roster: Arc<RosterManager>,
}

impl Console {
    /// Builds every component and restores any persisted session from `store`.
    pub async fn new(config: ConsoleConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        config.validate()?;
        let api = Arc::new(ApiClient::new(&config)?);
        let session = Arc::new(SessionHolder::restore(store).await?);
        let fetcher = Arc::new(DashboardFetcher::new(api.clone(), session.clone()));
        let coordinator = Arc::new(AssignmentCoordinator::new(
            api.clone(),
            session.clone(),
            fetcher.clone(),
            &config,
        ));
        let roster = Arc::new(RosterManager::new(
            api.clone(),
            session.clone(),
            fetcher.clone(),
        ));

        tracing::debug!(api_url = %config.base_url(), "Console initialized");
        Ok(Self {
            config,
            api,
            session,
            fetcher,
            coordinator,
            roster,
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn api(&self) -> Arc<ApiClient> {
        self.api.clone()
    }

    pub fn session(&self) -> Arc<SessionHolder> {
        self.session.clone()
    }

    pub fn fetcher(&self) -> Arc<DashboardFetcher> {
        self.fetcher.clone()
    }

    pub fn coordinator(&self) -> Arc<AssignmentCoordinator> {
        self.coordinator.clone()
    }

    pub fn roster(&self) -> Arc<RosterManager> {
        self.roster.clone()
    }

    /// Exchanges credentials for a token and starts the session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Navigation> {
        match self.api.login(email, password).await {
            Ok(response) => self.session.login(response.access_token).await,
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "Login failed");
                Err(e)
            }
        }
    }

    /// Creates a business account. Does not sign in; the caller is sent to
    /// the login page with a success marker instead.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        business_name: &str,
    ) -> Result<Navigation> {
        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            business_name: business_name.to_string(),
        };
        match self.api.register(&request).await {
            Ok(response) => {
                tracing::info!(business_id = %response.id, "Business registered");
                Ok(Navigation::redirect(REGISTERED_ROUTE))
            }
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "Registration failed");
                Err(e)
            }
        }
    }

    pub async fn sign_out(&self) -> Result<Navigation> {
        self.session.logout().await
    }

    pub async fn whoami(&self) -> Result<BusinessIdentity> {
        let token = self.session.bearer().await?;
        self.api.current_business(&token).await
    }

    /// Feeds a transcribed call to the backend as if it came from the phone
    /// line. Returns the task the backend created.
    pub async fn simulate_call(&self, phone_number: &str, voice_text: &str) -> Result<Task> {
        let call = InboundCall {
            phone_number: phone_number.to_string(),
            voice_text: voice_text.to_string(),
        };
        let task = self.api.simulate_inbound_call(&call).await?;
        tracing::info!(task_id = %task.task_id, intent = %task.intent, "Simulated call created task");
        Ok(task)
    }

    /// Most recent call-processing failures recorded by the backend.
    pub async fn failure_logs(&self, limit: u32) -> Result<Vec<FailureLog>> {
        self.api.failure_logs(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::Slice;
    use crate::error::ConsoleError;
    use crate::session::{FileTokenStore, InMemoryTokenStore, DASHBOARD_ROUTE, LOGIN_ROUTE};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_console(server: &MockServer) -> Console {
        let config = ConsoleConfig::default().with_api_url(server.uri());
        Console::new(config, Arc::new(InMemoryTokenStore::new()))
            .await
            .unwrap()
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_string_contains("username=owner%40acme.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt-abc",
                "token_type": "bearer"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_login_then_partial_refresh() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/dashboard/stats"))
            .and(header("authorization", "Bearer jwt-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_calls": 4})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tasks"))
            .and(header("authorization", "Bearer jwt-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/workers/stats"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/workers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let console = setup_console(&server).await;
        assert_eq!(
            console.session().guard("/dashboard/workers").await,
            Navigation::redirect(LOGIN_ROUTE)
        );

        let nav = console.sign_in("owner@acme.test", "hunter2").await.unwrap();
        assert_eq!(nav.target(), Some(DASHBOARD_ROUTE));
        assert_eq!(
            console.session().guard("/dashboard/workers").await,
            Navigation::Proceed
        );

        let report = console.fetcher().refresh().await;
        assert_eq!(report.failed_slices(), vec![Slice::WorkerStats]);
        let snapshot = console.fetcher().snapshot().await;
        assert_eq!(snapshot.stats.unwrap().total_calls, 4);
        assert!(snapshot.worker_stats.is_none());
    }

    #[tokio::test]
    async fn test_login_rejection_keeps_session_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"detail": "Incorrect email or password"})),
            )
            .mount(&server)
            .await;

        let console = setup_console(&server).await;
        let err = console.sign_in("owner@acme.test", "wrong").await.unwrap_err();

        assert_eq!(
            err.operator_message(LOGIN_FALLBACK),
            "Incorrect email or password"
        );
        assert!(!console.session().is_authenticated().await);
    }

    #[tokio::test]
    async fn test_register_redirects_to_login_with_marker() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Business registered successfully",
                "id": "b-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let console = setup_console(&server).await;
        let nav = console
            .register("owner@acme.test", "hunter2", "Acme Repairs")
            .await
            .unwrap();

        assert_eq!(nav.target(), Some(REGISTERED_ROUTE));
        assert!(!console.session().is_authenticated().await);
    }

    #[tokio::test]
    async fn test_sign_out_blocks_later_requests() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        let console = setup_console(&server).await;
        console.sign_in("owner@acme.test", "hunter2").await.unwrap();
        let nav = console.sign_out().await.unwrap();

        assert_eq!(nav.target(), Some(LOGIN_ROUTE));
        assert!(matches!(
            console.whoami().await,
            Err(ConsoleError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_corrupt_session_file_still_allows_login() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let config = ConsoleConfig::default().with_api_url(server.uri());
        let console = Console::new(config, Arc::new(FileTokenStore::new(&path)))
            .await
            .unwrap();
        assert!(!console.session().is_authenticated().await);

        console.sign_in("owner@acme.test", "hunter2").await.unwrap();

        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.load().await.unwrap().as_deref(), Some("jwt-abc"));
    }

    #[test]
    fn test_sample_calls_are_numbered_from_one() {
        assert_eq!(SampleCall::numbered(1).unwrap().title, "AC Repair - Urgent");
        assert_eq!(SampleCall::numbered(5).unwrap().title, "General Maintenance");
        assert!(SampleCall::numbered(0).is_none());
        assert!(SampleCall::numbered(6).is_none());
    }

    #[tokio::test]
    async fn test_failure_logs_default_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/logs/failures"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let console = setup_console(&server).await;
        let logs = console.failure_logs(DEFAULT_FAILURE_LIMIT).await.unwrap();

        assert!(logs.is_empty());
    }

    #[tokio::test]
    async fn test_simulate_call_returns_task() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/voice/inbound"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "task_id": "t9",
                "intent": "AC Repair",
                "issue": "AC not cooling",
                "urgency": "high",
                "confidence": 0.91,
                "status": "new",
                "customer_phone": "555-0177",
                "created_at": "2024-05-02T10:30:00"
            })))
            .mount(&server)
            .await;

        let console = setup_console(&server).await;
        let task = console
            .simulate_call("555-0177", "My AC is not cooling")
            .await
            .unwrap();

        assert_eq!(task.task_id, "t9");
    }
}
