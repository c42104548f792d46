#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use sqlx::Executor;
use tokio::sync::OnceCell;

const MIGRATION: &str = include_str!("../../migrations/0001_init.sql");

static SERVER: OnceLock<TestServer> = OnceLock::new();
static MIGRATED: OnceCell<()> = OnceCell::const_new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_diary-api"));
        cmd.env("HTTP_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server sees DATABASE_URL and TOKEN_SECRET_KEY
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

/// Database-backed tests only run when DATABASE_URL is configured
pub fn database_configured() -> bool {
    let _ = dotenvy::dotenv();
    match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => true,
        _ => {
            eprintln!("DATABASE_URL not set; skipping database-backed test");
            false
        }
    }
}

async fn migrate() -> Result<()> {
    MIGRATED
        .get_or_try_init(|| async {
            let url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
            let pool = sqlx::PgPool::connect(&url).await.context("failed to connect for migration")?;
            pool.execute(MIGRATION).await.context("failed to apply migration")?;
            pool.close().await;
            Ok::<(), anyhow::Error>(())
        })
        .await?;
    Ok(())
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    migrate().await?;
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// A freshly registered user and its bearer token
pub struct Session {
    pub client: reqwest::Client,
    pub base_url: String,
    pub token: String,
}

impl Session {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.url(path)).bearer_auth(&self.token).send().await?;
        read(res).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self.client.post(self.url(path)).bearer_auth(&self.token).json(&body).send().await?;
        read(res).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self.client.put(self.url(path)).bearer_auth(&self.token).json(&body).send().await?;
        read(res).await
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.delete(self.url(path)).bearer_auth(&self.token).send().await?;
        read(res).await
    }

    /// Create a diary and return its idx
    pub async fn diary(&self, title: &str, date: &str, tags: &[&str]) -> Result<i64> {
        let (status, body) = self
            .post(
                "/diaries",
                json!({ "title": title, "content": "content", "emotion_idx": 1, "date": date, "tag": tags }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "diary create failed: {} {}", status, body);
        body["data"]["idx"].as_i64().context("diary idx")
    }
}

pub async fn read(res: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = res.status();
    let bytes = res.bytes().await?;
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, body))
}

pub fn unique_email(prefix: &str) -> String {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or_default();
    format!("{}{}@example.com", prefix, nanos)
}

/// Register a new user and log in
pub async fn session(server: &TestServer) -> Result<Session> {
    let client = reqwest::Client::new();
    let email = unique_email("writer");
    let password = "abcde12345";

    let res = client
        .post(format!("{}/users", server.base_url))
        .json(&json!({ "email": email, "password": password, "nickname": "writer" }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());

    let res = client
        .post(format!("{}/users/login", server.base_url))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    let (status, body) = read(res).await?;
    anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
    let token = body["data"]["token"].as_str().context("token")?.to_string();

    Ok(Session { client, base_url: server.base_url.clone(), token })
}
