//! End-to-end integration tests for the Workroom assistant service.
//!
//! These tests drive the full HTTP pipeline (auth, routing, orchestration,
//! tool dispatch, persistence) against an in-memory store and a scripted
//! model.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use workroom_assistant::Assistants;
use workroom_config::{AppConfig, AssistantConfig};
use workroom_core::error::ProviderError;
use workroom_core::history::ConversationStore;
use workroom_core::identity::{UserDirectory, UserProfile};
use workroom_core::knowledge::{KnowledgeChunk, KnowledgeStore};
use workroom_core::message::{ConversationId, Message, MessageToolCall, Role};
use workroom_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
use workroom_gateway::{GatewayState, JwtAuthenticator, build_router};
use workroom_store::{InMemoryStore, Stores};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: Vec<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn text(response: &str) -> Self {
        Self::new(vec![text_response(response)])
    }

    fn tool_then_text(tool_calls: Vec<MessageToolCall>, answer: &str) -> Self {
        Self::new(vec![tool_response(tool_calls), text_response(answer)])
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> ProviderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len();
        requests.push(request);
        match self.responses.get(index) {
            Some(response) => Ok(response.clone()),
            None => panic!(
                "ScriptedProvider exhausted: call #{}, have {}",
                index,
                self.responses.len()
            ),
        }
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(EmbeddingResponse {
            embeddings: vec![vec![1.0, 0.0, 0.0]; request.inputs.len()],
            model: request.model,
            usage: None,
        })
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock".into(),
    }
}

fn tool_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut msg = Message::assistant("");
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: usage(),
        model: "mock".into(),
    }
}

fn make_tool_call(name: &str, args: Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

const SECRET: &str = "e2e-secret";

struct Harness {
    app: Router,
    store: Arc<InMemoryStore>,
    provider: Arc<ScriptedProvider>,
}

impl Harness {
    async fn new(provider: ScriptedProvider) -> Self {
        Self::with_config(provider, AppConfig::default()).await
    }

    async fn with_config(provider: ScriptedProvider, config: AppConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        store
            .upsert_user(UserProfile::new("am-1", "acme", "account_manager"))
            .await
            .unwrap();
        store
            .upsert_user(UserProfile::new("fm-1", "acme", "finance_manager"))
            .await
            .unwrap();
        store
            .insert_rows(
                "agency_campaign_overview",
                vec![
                    json!({
                        "tenant_id": "acme",
                        "campaign_code": "SMI-001",
                        "campaign_name": "Summer Mobile Launch",
                        "status": "in_progress",
                        "budget": 120000,
                        "spent": 45000
                    }),
                    json!({
                        "tenant_id": "globex",
                        "campaign_code": "SMI-001",
                        "campaign_name": "Someone else's campaign",
                        "status": "completed"
                    }),
                ],
            )
            .await;

        let provider = Arc::new(provider);
        let stores = Stores::from_backend(store.clone());
        let assistants = Assistants::from_config(&config, provider.clone(), &stores);
        let state = Arc::new(GatewayState {
            assistants,
            users: stores.users.clone(),
            auth: JwtAuthenticator::new(SECRET, None, None, 600),
        });

        Self {
            app: build_router(state, config.gateway.body_limit_bytes),
            store,
            provider,
        }
    }

    async fn post(&self, uri: &str, user: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("authorization", format!("Bearer {}", token(user)));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn conversations(&self) -> usize {
        self.store.count_conversations().await.unwrap()
    }

    async fn messages(&self) -> usize {
        self.store.count_messages().await.unwrap()
    }
}

fn token(user: &str) -> String {
    JwtAuthenticator::new(SECRET, None, None, 600)
        .issue(user)
        .unwrap()
}

// ── E2E: Conversation lifecycle ──────────────────────────────────────────

#[tokio::test]
async fn e2e_new_session_creates_one_conversation_and_two_messages() {
    let h = Harness::new(ScriptedProvider::text("Hi! How can I help with your campaigns?")).await;

    let (status, body) = h
        .post("/v1/assistants/agency/query", Some("am-1"), json!({"message": "Hello"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["message"], "Hi! How can I help with your campaigns?");
    assert_eq!(h.conversations().await, 1);
    assert_eq!(h.messages().await, 2);

    let id = ConversationId::from(body["data"]["session_id"].as_str().unwrap());
    let rows = h.store.messages_of(&id).await;
    assert_eq!(rows[0].role, Role::User);
    assert_eq!(rows[0].content, "Hello");
    assert_eq!(rows[1].role, Role::Assistant);
}

#[tokio::test]
async fn e2e_existing_session_appends_rows() {
    let h = Harness::new(ScriptedProvider::new(vec![
        text_response("First answer"),
        text_response("Second answer"),
    ]))
    .await;

    let (_, first) = h
        .post("/agency-ai-query", Some("am-1"), json!({"message": "First question"}))
        .await;
    let session_id = first["data"]["session_id"].as_str().unwrap().to_string();

    let (status, second) = h
        .post(
            "/agency-ai-query",
            Some("am-1"),
            json!({"session_id": &session_id, "message": "Follow-up"}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["session_id"], session_id.as_str());
    assert_eq!(h.conversations().await, 1);
    assert_eq!(h.messages().await, 4);

    // The follow-up completion replays the earlier exchange.
    let contents: Vec<String> = h
        .provider
        .last_request()
        .messages
        .iter()
        .skip(1)
        .map(|m| m.content.clone())
        .collect();
    assert_eq!(contents, vec!["First question", "First answer", "Follow-up"]);
}

#[tokio::test]
async fn e2e_empty_follow_up_is_rejected_before_persistence() {
    let h = Harness::new(ScriptedProvider::text("Noted.")).await;

    let (_, first) = h
        .post("/finance-ppm-ai-query", Some("fm-1"), json!({"message": "What is WIP?"}))
        .await;
    let session_id = first["data"]["session_id"].as_str().unwrap().to_string();
    assert_eq!(h.messages().await, 2);

    let (status, body) = h
        .post(
            "/finance-ppm-ai-query",
            Some("fm-1"),
            json!({"session_id": session_id, "message": "   "}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "message is required");
    assert_eq!(h.messages().await, 2);
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test]
async fn e2e_session_from_another_user_is_not_found() {
    let h = Harness::new(ScriptedProvider::text("Private answer")).await;

    let (_, first) = h
        .post("/v1/assistants/agency/query", Some("am-1"), json!({"message": "Mine"}))
        .await;
    let session_id = first["data"]["session_id"].as_str().unwrap().to_string();

    let (status, _) = h
        .post(
            "/v1/assistants/agency/query",
            Some("fm-1"),
            json!({"session_id": session_id, "message": "Let me read it"}),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(h.messages().await, 2);
}

#[tokio::test]
async fn e2e_session_is_not_shared_across_assistants() {
    let h = Harness::new(ScriptedProvider::text("Agency answer")).await;

    let (_, first) = h
        .post("/agency-ai-query", Some("am-1"), json!({"message": "Campaigns?"}))
        .await;
    let session_id = first["data"]["session_id"].as_str().unwrap().to_string();

    let (status, _) = h
        .post(
            "/finance-ppm-ai-query",
            Some("am-1"),
            json!({"session_id": session_id, "message": "WIP?"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── E2E: Auth ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_missing_or_malformed_authorization_writes_nothing() {
    let h = Harness::new(ScriptedProvider::new(vec![])).await;

    let (status, body) = h
        .post("/scout-ai-query", None, json!({"message": "Top SKUs?"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let request = Request::builder()
        .method("POST")
        .uri("/scout-ai-query")
        .header("content-type", "application/json")
        .header("authorization", "Bearer not-a-jwt")
        .body(Body::from(json!({"message": "Top SKUs?"}).to_string()))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(h.conversations().await, 0);
    assert_eq!(h.messages().await, 0);
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn e2e_unknown_user_is_forbidden() {
    let h = Harness::new(ScriptedProvider::new(vec![])).await;
    let (status, body) = h
        .post("/scout-ai-query", Some("intruder"), json!({"message": "hi"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "User not found");
    assert_eq!(h.conversations().await, 0);
}

// ── E2E: Tool calling ────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_campaign_status_tool_invocation() {
    let h = Harness::new(ScriptedProvider::tool_then_text(
        vec![make_tool_call(
            "get_campaign_status",
            json!({"campaign_code": "SMI-001"}),
        )],
        "Campaign SMI-001 (Summer Mobile Launch) is in progress with 45,000 of 120,000 spent.",
    ))
    .await;

    let (status, body) = h
        .post(
            "/v1/assistants/agency/query",
            Some("am-1"),
            json!({"message": "What's the status of campaign SMI-001?"}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let calls = &body["data"]["tool_calls"];
    assert_eq!(calls[0]["tool"], "get_campaign_status");
    assert_eq!(calls[0]["input"]["campaign_code"], "SMI-001");
    // Tenant scoping: only acme's campaign is visible.
    assert_eq!(calls[0]["output"]["campaign_name"], "Summer Mobile Launch");
    assert_eq!(h.provider.calls(), 2);

    let id = ConversationId::from(body["data"]["session_id"].as_str().unwrap());
    let rows = h.store.messages_of(&id).await;
    assert_eq!(rows.len(), 2);
    assert!(rows[1].content.contains("SMI-001"));
    assert_eq!(rows[1].tool_calls.len(), 1);
    assert_eq!(rows[1].tool_calls[0].tool, "get_campaign_status");
}

#[tokio::test]
async fn e2e_unknown_tool_is_recorded_and_request_succeeds() {
    let h = Harness::new(ScriptedProvider::tool_then_text(
        vec![make_tool_call("launch_rocket", json!({"target": "moon"}))],
        "I can't do that, but here's what I can help with.",
    ))
    .await;

    let (status, body) = h
        .post("/v1/assistants/agency/query", Some("am-1"), json!({"message": "Launch"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    let call = &body["data"]["tool_calls"][0];
    assert_eq!(call["tool"], "launch_rocket");
    assert_eq!(call["output"]["error"], "Unknown tool: launch_rocket");
    assert_eq!(h.messages().await, 2);
}

#[tokio::test]
async fn e2e_missing_campaign_is_reported_to_model() {
    let h = Harness::new(ScriptedProvider::tool_then_text(
        vec![make_tool_call(
            "get_campaign_status",
            json!({"campaign_code": "NOPE-404"}),
        )],
        "I couldn't find that campaign.",
    ))
    .await;

    let (_, body) = h
        .post("/agency-ai-query", Some("am-1"), json!({"message": "Status of NOPE-404?"}))
        .await;

    assert_eq!(body["data"]["tool_calls"][0]["output"]["error"], "Campaign not found");
    let tool_message = h
        .provider
        .last_request()
        .messages
        .into_iter()
        .find(|m| m.role == Role::Tool)
        .unwrap();
    assert!(tool_message.content.contains("Campaign not found"));
}

#[tokio::test]
async fn e2e_extra_tool_rounds_follow_config() {
    let mut config = AppConfig::default();
    config.assistants.insert(
        "agency".into(),
        AssistantConfig {
            max_tool_rounds: 2,
            ..AssistantConfig::default()
        },
    );
    let call = || {
        tool_response(vec![make_tool_call(
            "get_campaign_status",
            json!({"campaign_code": "SMI-001"}),
        )])
    };
    let h = Harness::with_config(
        ScriptedProvider::new(vec![call(), call(), text_response("Checked twice.")]),
        config,
    )
    .await;

    let (status, body) = h
        .post("/agency-ai-query", Some("am-1"), json!({"message": "Double-check SMI-001"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Checked twice.");
    assert_eq!(body["data"]["tool_calls"].as_array().unwrap().len(), 2);
    assert_eq!(h.provider.calls(), 3);
    assert!(h.provider.last_request().tools.is_empty());
}

// ── E2E: Knowledge ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_knowledge_context_and_sources() {
    let h = Harness::new(ScriptedProvider::text("Close the books by day 5.")).await;
    h.store
        .index_chunk(KnowledgeChunk {
            chunk_id: "sop-1-0".into(),
            namespace: "finance_ppm".into(),
            tenant_id: "acme".into(),
            document_id: "sop-1".into(),
            document_title: "Month-End Close SOP".into(),
            chunk_text: "All project accruals must be posted by business day 5.".into(),
            category: Some("sop".into()),
            roles: vec!["finance_manager".into()],
            metadata: json!({"version": 3}),
            embedding: vec![1.0, 0.0, 0.0],
        })
        .await
        .unwrap();

    let (status, body) = h
        .post("/finance-ppm-ai-query", Some("fm-1"), json!({"message": "When do we close?"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    let source = &body["data"]["sources"][0];
    assert_eq!(source["type"], "document");
    assert_eq!(source["id"], "sop-1");
    assert_eq!(source["title"], "Month-End Close SOP");
    assert!(source["excerpt"].as_str().unwrap().ends_with("..."));

    let system = h.provider.last_request().messages[0].content.clone();
    assert!(system.contains("The user is a finance_manager"));
    assert!(system.contains("[Month-End Close SOP]"));

    // Role filtering: an account manager does not see the restricted SOP.
    let (_, search) = h
        .post(
            "/v1/assistants/finance_ppm/search",
            Some("am-1"),
            json!({"query": "month-end close"}),
        )
        .await;
    assert_eq!(search["data"]["results_count"], 0);

    let (_, search) = h
        .post(
            "/v1/assistants/finance_ppm/search",
            Some("fm-1"),
            json!({"query": "month-end close", "category": "sop"}),
        )
        .await;
    assert_eq!(search["data"]["results_count"], 1);
    assert_eq!(search["data"]["results"][0]["metadata"]["version"], 3);
}

// ── E2E: CORS ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_cors_preflight_on_legacy_route() {
    let h = Harness::new(ScriptedProvider::new(vec![])).await;
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/scout-ai-query")
        .header("origin", "https://dashboard.example.com")
        .header("access-control-request-method", "POST")
        .header(
            "access-control-request-headers",
            "authorization, x-client-info, apikey, content-type",
        )
        .body(Body::empty())
        .unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(h.provider.calls(), 0);
}
