use super::types::*;
use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

/// Typed client for the VoiceTask backend.
///
/// Endpoints behind authentication take the bearer token explicitly; the
/// client itself holds no session state.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // Auth

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse> {
        let request = self
            .client
            .post(self.url("/api/auth/login"))
            .form(&[("username", email), ("password", password)]);
        self.send_json(request).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        let request = self.client.post(self.url("/api/auth/register")).json(request);
        self.send_json(request).await
    }

    pub async fn current_business(&self, token: &str) -> Result<BusinessIdentity> {
        let request = self.client.get(self.url("/api/auth/me")).bearer_auth(token);
        self.send_json(request).await
    }

    // Dashboard and tasks

    pub async fn dashboard_stats(&self, token: &str) -> Result<DashboardStats> {
        let request = self
            .client
            .get(self.url("/api/dashboard/stats"))
            .bearer_auth(token);
        self.send_json(request).await
    }

    pub async fn list_tasks(&self, token: &str) -> Result<Vec<Task>> {
        let request = self.client.get(self.url("/api/tasks")).bearer_auth(token);
        self.send_json(request).await
    }

    pub async fn get_task(&self, token: &str, task_id: &str) -> Result<Task> {
        let request = self
            .client
            .get(self.url(&format!("/api/tasks/{}", task_id)))
            .bearer_auth(token);
        self.send_json(request).await
    }

    pub async fn update_task_status(
        &self,
        token: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<()> {
        // The backend reads `status` from the query; the body form is kept
        // for servers that take JSON.
        let request = self
            .client
            .patch(self.url(&format!("/api/tasks/{}/status", task_id)))
            .bearer_auth(token)
            .query(&[("status", status.as_str())])
            .json(&json!({ "status": status }));
        self.send_discard(request).await
    }

    pub async fn auto_assign(&self, token: &str, task_id: &str) -> Result<AssignmentReceipt> {
        let request = self
            .client
            .post(self.url(&format!("/api/tasks/{}/assign", task_id)))
            .bearer_auth(token)
            .json(&json!({ "auto": true }));
        self.send_json(request).await
    }

    pub async fn assign_worker(
        &self,
        token: &str,
        task_id: &str,
        worker_id: &str,
    ) -> Result<AssignmentReceipt> {
        let request = self
            .client
            .post(self.url(&format!("/api/tasks/{}/assign", task_id)))
            .bearer_auth(token)
            .query(&[("worker_id", worker_id)]);
        self.send_json(request).await
    }

    pub async fn escalate_task(&self, token: &str, task_id: &str, reason: &str) -> Result<()> {
        let body = EscalationRequest {
            task_id: task_id.to_string(),
            reason: reason.to_string(),
        };
        let request = self
            .client
            .post(self.url(&format!("/api/tasks/{}/escalate", task_id)))
            .bearer_auth(token)
            .json(&body);
        self.send_discard(request).await
    }

    pub async fn complete_task(
        &self,
        token: &str,
        task_id: &str,
        rating: Option<f64>,
    ) -> Result<()> {
        let mut request = self
            .client
            .post(self.url(&format!("/api/tasks/{}/complete", task_id)))
            .bearer_auth(token);
        if let Some(rating) = rating {
            request = request.query(&[("rating", rating)]);
        }
        self.send_discard(request).await
    }

    // Workers

    pub async fn list_workers(
        &self,
        token: &str,
        status: Option<WorkerStatus>,
    ) -> Result<Vec<Worker>> {
        let mut request = self.client.get(self.url("/api/workers")).bearer_auth(token);
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }
        self.send_json(request).await
    }

    pub async fn get_worker(&self, token: &str, worker_id: &str) -> Result<Worker> {
        let request = self
            .client
            .get(self.url(&format!("/api/workers/{}", worker_id)))
            .bearer_auth(token);
        self.send_json(request).await
    }

    pub async fn worker_stats(&self, token: &str) -> Result<WorkerStats> {
        let request = self
            .client
            .get(self.url("/api/workers/stats"))
            .bearer_auth(token);
        self.send_json(request).await
    }

    pub async fn create_worker(&self, token: &str, worker: &NewWorker) -> Result<Worker> {
        let request = self
            .client
            .post(self.url("/api/workers"))
            .bearer_auth(token)
            .query(&worker.query_pairs())
            .json(worker);
        self.send_json(request).await
    }

    pub async fn update_worker(
        &self,
        token: &str,
        worker_id: &str,
        update: &WorkerUpdate,
    ) -> Result<Worker> {
        let request = self
            .client
            .patch(self.url(&format!("/api/workers/{}", worker_id)))
            .bearer_auth(token)
            .query(&update.query_pairs())
            .json(update);
        self.send_json(request).await
    }

    pub async fn delete_worker(&self, token: &str, worker_id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/api/workers/{}", worker_id)))
            .bearer_auth(token);
        self.send_discard(request).await
    }

    // Logs

    pub async fn failure_logs(&self, limit: u32) -> Result<Vec<FailureLog>> {
        let request = self
            .client
            .get(self.url("/api/logs/failures"))
            .query(&[("limit", limit)]);
        self.send_json(request).await
    }

    // Voice

    pub async fn simulate_inbound_call(&self, call: &InboundCall) -> Result<Task> {
        let request = self.client.post(self.url("/api/voice/inbound")).json(call);
        self.send_json(request).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = Self::execute(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ConsoleError::Decode(e.to_string()))
    }

    async fn send_discard(&self, request: RequestBuilder) -> Result<()> {
        Self::execute(request).await.map(|_| ())
    }

    async fn execute(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(url = %response.url(), status = %status, "API response");

        if status.is_success() {
            return Ok(response);
        }

        let detail = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(ErrorBody::into_message),
            Err(_) => None,
        };
        Err(ConsoleError::Api { status, detail })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        let config = ConsoleConfig::default().with_api_url(server.uri());
        ApiClient::new(&config).unwrap()
    }

    fn task_json(id: &str, status: &str) -> serde_json::Value {
        json!({
            "task_id": id,
            "intent": "Plumbing",
            "issue": "Dripping faucet",
            "urgency": "low",
            "confidence": 0.9,
            "status": status,
            "customer_phone": "555-0100",
            "created_at": "2024-05-01T09:00:00"
        })
    }

    #[tokio::test]
    async fn test_login_posts_form_credentials() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_string_contains("username=owner%40example.com"))
            .and(body_string_contains("password=hunter2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "abc.def.ghi",
                "token_type": "bearer"
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let token = client.login("owner@example.com", "hunter2").await.unwrap();

        assert_eq!(token.access_token, "abc.def.ghi");
        assert_eq!(token.token_type, "bearer");
    }

    #[tokio::test]
    async fn test_login_failure_carries_detail() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"detail": "Incorrect email or password"})),
            )
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = client.login("owner@example.com", "wrong").await.unwrap_err();

        match err {
            ConsoleError::Api { status, detail } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(detail.as_deref(), Some("Incorrect email or password"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_tasks_sends_bearer_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tasks"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([task_json("t1", "new"), task_json("t2", "closed")])),
            )
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let tasks = client.list_tasks("tok-1").await.unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].status, TaskStatus::Closed);
    }

    #[tokio::test]
    async fn test_get_task_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tasks/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Task not found"})))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = client.get_task("tok", "missing").await.unwrap_err();

        assert_eq!(err.operator_message("Failed to load task"), "Task not found");
    }

    #[tokio::test]
    async fn test_auto_assign_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/tasks/t1/assign"))
            .and(body_json(json!({"auto": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "task_id": "t1",
                "worker_id": "w7",
                "worker_name": "Ravi",
                "status": "in_progress"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let receipt = client.auto_assign("tok", "t1").await.unwrap();

        assert_eq!(receipt.worker_id, "w7");
        assert_eq!(receipt.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_manual_assign_uses_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/tasks/t1/assign"))
            .and(query_param("worker_id", "w2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "task_id": "t1",
                "worker_id": "w2",
                "worker_name": "Asha",
                "status": "in_progress"
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let receipt = client.assign_worker("tok", "t1", "w2").await.unwrap();

        assert_eq!(receipt.worker_name, "Asha");
    }

    #[tokio::test]
    async fn test_update_status_sends_query_and_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/api/tasks/t1/status"))
            .and(query_param("status", "escalated"))
            .and(body_json(json!({"status": "escalated"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t1"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client
            .update_task_status("tok", "t1", TaskStatus::Escalated)
            .await;

        tokio_test::assert_ok!(result);
    }

    #[tokio::test]
    async fn test_list_workers_with_status_filter() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/workers"))
            .and(query_param("status", "available"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "w1",
                "name": "Asha",
                "phone": "555-0101",
                "skills": ["Plumbing"],
                "status": "available",
                "current_tasks": 0,
                "max_tasks": 5,
                "rating": 4.5,
                "total_jobs": 12,
                "created_at": "2024-04-01T08:00:00",
                "updated_at": "2024-04-02T08:00:00"
            }])))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let workers = client
            .list_workers("tok", Some(WorkerStatus::Available))
            .await
            .unwrap();

        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].rating, Some(4.5));
        assert!(workers[0].created_at.is_some());
    }

    #[tokio::test]
    async fn test_error_without_detail() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/workers/stats"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = client.worker_stats("tok").await.unwrap_err();

        assert!(matches!(
            err,
            ConsoleError::Api { status, detail: None } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dashboard/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = client.dashboard_stats("tok").await.unwrap_err();

        assert!(matches!(err, ConsoleError::Decode(_)));
    }

    #[tokio::test]
    async fn test_handle_connection_error() {
        // Use a port that's guaranteed not to be listening
        let config = ConsoleConfig::default().with_api_url("http://127.0.0.1:59999");
        let client = ApiClient::new(&config).unwrap();

        let err = client.list_tasks("tok").await.unwrap_err();

        assert!(matches!(err, ConsoleError::Transport(_)));
    }

    #[tokio::test]
    async fn test_simulate_inbound_call_needs_no_auth() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/voice/inbound"))
            .and(body_json(json!({
                "phone_number": "+919876543210",
                "voice_text": "My kitchen faucet is leaking"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_json("t9", "new")))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let task = client
            .simulate_inbound_call(&InboundCall {
                phone_number: "+919876543210".to_string(),
                voice_text: "My kitchen faucet is leaking".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(task.task_id, "t9");
        assert_eq!(task.status, TaskStatus::New);
    }

    #[tokio::test]
    async fn test_worker_writes_send_scalars_as_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/workers"))
            .and(query_param("name", "Dev"))
            .and(query_param("phone", "555-0142"))
            .and(query_param("max_tasks", "3"))
            .and(body_json(json!({
                "name": "Dev",
                "phone": "555-0142",
                "skills": ["Carpentry"],
                "max_tasks": 3,
                "status": "available"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "w3", "name": "Dev", "status": "available"})))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/workers/w3"))
            .and(query_param("status", "busy"))
            .and(body_json(json!({"status": "busy"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "w3", "name": "Dev", "status": "busy"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let worker = NewWorker::new("Dev", "555-0142")
            .with_skill("Carpentry")
            .with_max_tasks(3);
        tokio_test::assert_ok!(client.create_worker("tok", &worker).await);

        let update = WorkerUpdate {
            status: Some(WorkerStatus::Busy),
            ..Default::default()
        };
        let updated = client.update_worker("tok", "w3", &update).await.unwrap();
        assert_eq!(updated.status, WorkerStatus::Busy);
    }

    #[tokio::test]
    async fn test_failure_logs_with_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/logs/failures"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "f2",
                    "error_message": "Intent extraction failed",
                    "phone_number": "+919876543210",
                    "created_at": "2024-05-02T08:00:00.512000"
                },
                {
                    "id": "f1",
                    "error_message": "Twilio webhook timeout",
                    "phone_number": null,
                    "created_at": "2024-05-01T23:59:59"
                }
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let logs = client.failure_logs(2).await.unwrap();

        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].error_message, "Intent extraction failed");
        assert!(logs[1].phone_number.is_none());
        assert!(logs[0].created_at > logs[1].created_at);
    }
}
