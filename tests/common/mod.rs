#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    extract::Path,
    http::{Method, Request, StatusCode, header},
    response::Response,
    routing::get,
};
use moddocs::{
    AppState, Config, auth, db,
    files::Disks,
    mail::{InvitationMail, Mailer},
    session::USER_ID,
    users::{self, ProviderProfile, User},
};
use serde_json::Value;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tempfile::TempDir;
use tower::ServiceExt;
use tower_sessions::Session;
use uuid::Uuid;

pub const BOUNDARY: &str = "moddocs-test-boundary";

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<InvitationMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_invitation(&self, mail: &InvitationMail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send_invitation(&self, _mail: &InvitationMail) -> anyhow::Result<()> {
        anyhow::bail!("smtp relay unreachable")
    }
}

pub struct TestApp {
    pub app: Router,
    pub db_pool: SqlitePool,
    pub mailer: Arc<RecordingMailer>,
    pub storage: TempDir,
}

async fn login_as(Path(id): Path<Uuid>, session: Session) -> StatusCode {
    session.insert(USER_ID, id).await.unwrap();
    StatusCode::NO_CONTENT
}

pub async fn spawn() -> TestApp {
    let mailer = Arc::new(RecordingMailer::default());
    spawn_with(mailer.clone(), mailer, 10 * 1024 * 1024).await
}

pub async fn spawn_with(mailer: Arc<dyn Mailer>, recording: Arc<RecordingMailer>, max_upload_bytes: u64) -> TestApp {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::migrate(&db_pool).await.unwrap();

    let storage = tempfile::tempdir().unwrap();
    let config = Config {
        storage_root: storage.path().to_path_buf(),
        max_upload_bytes,
        ..Config::default()
    };

    let app_state = AppState {
        db_pool: db_pool.clone(),
        clients: auth::Clients::default(),
        config: Arc::new(config),
        mailer,
        disks: Disks::local(storage.path()),
    };

    let app = Router::new()
        .route("/__login/{id}", get(login_as))
        .merge(moddocs::router())
        .with_state(app_state)
        .layer(moddocs::session_layer(60));

    TestApp { app, db_pool, mailer: recording, storage }
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub bytes: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|value| value.to_str().ok())
    }
}

async fn reply(response: Response) -> Reply {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
    Reply { status, headers, bytes }
}

impl TestApp {
    pub async fn user(&self, login: &str) -> User {
        users::upsert(&self.db_pool, ProviderProfile {
            provider: "github".to_owned(),
            provider_id: login.to_owned(),
            name: login.to_owned(),
            login: Some(login.to_owned()),
            email: format!("{login}@example.com"),
            avatar_url: None,
        })
        .await
        .unwrap()
    }

    /// Signs `user` in and returns the session cookie to send along.
    pub async fn login(&self, user: &User) -> String {
        let response = self
            .app
            .clone()
            .oneshot(Request::get(format!("/__login/{}", user.id)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        cookie.split(';').next().unwrap().to_owned()
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        reply(self.app.clone().oneshot(request).await.unwrap()).await
    }

    pub async fn call(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Reply {
        self.call(Method::GET, uri, cookie, None).await
    }

    pub async fn post(&self, uri: &str, cookie: &str, body: Value) -> Reply {
        self.call(Method::POST, uri, Some(cookie), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, cookie: &str, body: Value) -> Reply {
        self.call(Method::PATCH, uri, Some(cookie), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, cookie: &str) -> Reply {
        self.call(Method::DELETE, uri, Some(cookie), None).await
    }

    /// Creates a workspace as the signed-in user and returns its slug.
    pub async fn new_mod(&self, cookie: &str, name: &str, visibility: &str) -> String {
        let reply = self
            .post("/mods", cookie, serde_json::json!({ "name": name, "visibility": visibility, "storage_driver": "local" }))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
        reply.json()["mod"]["slug"].as_str().unwrap().to_owned()
    }

    pub async fn new_page(&self, cookie: &str, slug: &str, body: Value) -> Value {
        let reply = self.post(&format!("/mods/{slug}/pages"), cookie, body).await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
        reply.json()["page"].clone()
    }

    pub async fn upload(&self, uri: &str, cookie: &str, file_name: &str, content_type: &str, bytes: &[u8], page_id: Option<&str>) -> Reply {
        let body = multipart_body(file_name, content_type, bytes, page_id);
        let request = Request::post(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }
}

pub fn multipart_body(file_name: &str, content_type: &str, bytes: &[u8], page_id: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(page_id) = page_id {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"page_id\"\r\n\r\n{page_id}\r\n").as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}
