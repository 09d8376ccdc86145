#![allow(dead_code)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use backoffice_api::auth::{generate_jwt, Claims};
use backoffice_api::routes::{app, AppState};

pub const SECRET: &str = "integration-test-secret";

/// An in-process server over a fresh in-memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    client: Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        let router = app(AppState::in_memory(SECRET));
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self { port, base_url, client: Client::new() };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Requests authenticated as a platform-scope administrator
    pub fn admin(&self) -> Caller<'_> {
        self.caller(token("admin", "", &[]))
    }

    /// Requests authenticated as a user of `tenant_id`
    pub fn tenant(&self, tenant_id: &str) -> Caller<'_> {
        self.caller(token("tenant-user", tenant_id, &[]))
    }

    pub fn caller(&self, token: String) -> Caller<'_> {
        Caller { server: self, token }
    }
}

pub struct Caller<'a> {
    server: &'a TestServer,
    token: String,
}

impl Caller<'_> {
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.server.client.get(self.server.api(path)).bearer_auth(&self.token)
    }

    pub fn post(&self, path: &str, body: &Value) -> RequestBuilder {
        self.server.client.post(self.server.api(path)).bearer_auth(&self.token).json(body)
    }

    pub fn put(&self, path: &str, body: &Value) -> RequestBuilder {
        self.server.client.put(self.server.api(path)).bearer_auth(&self.token).json(body)
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.server.client.delete(self.server.api(path)).bearer_auth(&self.token)
    }

    pub fn delete_json(&self, path: &str, body: &Value) -> RequestBuilder {
        self.delete(path).json(body)
    }
}

pub fn token(user_id: &str, tenant_id: &str, role_ids: &[&str]) -> String {
    let roles = role_ids.iter().map(|r| r.to_string()).collect();
    let claims = Claims::new(user_id, user_id, tenant_id, roles, 1);
    generate_jwt(&claims, SECRET).expect("test token")
}

/// Asserts the status and returns the `data` member of a success envelope
pub async fn data(resp: reqwest::Response, expected: StatusCode) -> Result<Value> {
    let status = resp.status();
    let body: Value = resp.json().await?;
    assert_eq!(status, expected, "unexpected status, body: {}", body);
    assert_eq!(body["success"], true, "missing success envelope: {}", body);
    Ok(body["data"].clone())
}

/// Asserts the status and returns the error `code`
pub async fn error_code(resp: reqwest::Response, expected: StatusCode) -> Result<String> {
    let status = resp.status();
    let body: Value = resp.json().await?;
    assert_eq!(status, expected, "unexpected status, body: {}", body);
    assert_eq!(body["error"], true, "missing error envelope: {}", body);
    Ok(body["code"].as_str().unwrap_or_default().to_string())
}
