//! Shared utilities for integration tests: boot the real server on an
//! ephemeral port inside a temporary data directory.

#![allow(dead_code)]

use std::time::Duration;

use plan_store::config::{ServerConfig, UserConfig};
use plan_store::session::credentials::hash_password;
use plan_store::{Application, Shutdown};
use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::task::JoinHandle;

pub const COACH: (&str, &str) = ("coach", "s3cret");
pub const ADMIN: (&str, &str) = ("root", "hunter2");

pub struct TestServer {
    pub base: String,
    pub client: Client,
    pub dir: TempDir,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

pub fn test_config(dir: &TempDir) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.storage.data_dir = dir.path().to_path_buf();
    config.users = vec![
        UserConfig {
            id: Some("u-coach".to_string()),
            username: COACH.0.to_string(),
            password_hash: hash_password(COACH.1).unwrap(),
            roles: vec!["coach".to_string()],
            admin: false,
        },
        UserConfig {
            id: Some("u-root".to_string()),
            username: ADMIN.0.to_string(),
            password_hash: hash_password(ADMIN.1).unwrap(),
            roles: vec!["admin".to_string()],
            admin: true,
        },
    ];
    config
}

pub async fn start() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    start_with(dir, config).await
}

pub async fn start_with(dir: TempDir, config: ServerConfig) -> TestServer {
    let app = Application::build(&config).await.unwrap();
    let addr = app.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let running = app.run(&shutdown);
    let handle = tokio::spawn(async move {
        running.await.unwrap();
    });

    TestServer {
        base: format!("http://{}", addr),
        client: Client::builder().timeout(Duration::from_secs(10)).build().unwrap(),
        dir,
        shutdown,
        handle,
    }
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Log in and return the `Cookie` header value for later requests.
    pub async fn login(&self, (username, password): (&str, &str)) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "login failed for {username}");
        session_cookie(response.headers()).expect("login sets a session cookie")
    }

    pub async fn get(&self, path: &str, cookie: &str) -> Response {
        self.client
            .get(self.url(path))
            .header(COOKIE, cookie)
            .send()
            .await
            .unwrap()
    }

    pub async fn post_json(&self, path: &str, cookie: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .header(COOKIE, cookie)
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Create a plan and return `(id, etag)`.
    pub async fn create_plan(&self, cookie: &str, title: &str) -> (u64, String) {
        let response = self
            .post_json("/api/plans", cookie, &json!({ "title": title, "date": "2026-02-02" }))
            .await;
        assert_eq!(response.status(), 201);
        let tag = etag(&response);
        let body: Value = response.json().await.unwrap();
        (body["id"].as_u64().unwrap(), tag)
    }

    pub fn read_document(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.dir.path().join(name)).unwrap()
    }

    /// Stop the server and wait until every store is closed.
    pub async fn stop(self) -> TempDir {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("server did not stop")
            .unwrap();
        self.dir
    }
}

pub fn etag(response: &Response) -> String {
    response.headers()["etag"].to_str().unwrap().to_string()
}

/// `name=value` of the first session `Set-Cookie`, if any.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}
