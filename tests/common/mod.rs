#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::util::ServiceExt;

use tenant_notes_api::{
    config::Config,
    db::{CredentialStore, MemoryStore},
    models::{
        auth::Role,
        tenant::{PlanType, Tenant},
        user::NewUser,
    },
    router, AppState,
};

pub const PASSWORD: &str = "password";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub acme: Tenant,
    pub globex: Tenant,
}

pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: "integration-secret".into(),
        app_base_url: "http://localhost:3000".into(),
        production: false,
        host: "127.0.0.1".into(),
        port: 0,
        bcrypt_cost: 4,
    }
}

/// Two tenants, each with an admin; Acme also has a member.
pub async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let acme = store.add_tenant("acme", "Acme", PlanType::Free);
    let globex = store.add_tenant("globex", "Globex", PlanType::Free);

    let hash = bcrypt::hash(PASSWORD, 4).unwrap();
    for (email, role, tenant_id) in [
        ("admin@acme.test", Role::Admin, acme.id),
        ("user@acme.test", Role::Member, acme.id),
        ("admin@globex.test", Role::Admin, globex.id),
    ] {
        store
            .insert_user(NewUser {
                email: email.into(),
                password_hash: hash.clone(),
                role,
                tenant_id,
            })
            .await
            .unwrap();
    }

    let state = AppState::new(Arc::new(test_config()), store.clone(), store.clone());
    TestApp {
        router: router(state),
        store,
        acme,
        globex,
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Value,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Logs in and returns the `auth=<token>` pair to send back as a cookie.
    pub async fn login(&self, email: &str) -> String {
        let (status, headers, _) = self
            .json(
                "POST",
                "/api/auth/login",
                None,
                serde_json::json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed for {email}");
        session_pair(&headers).expect("login sets a session cookie")
    }
}

/// `auth=<token>` from a Set-Cookie header, if one was set with a value.
pub fn session_pair(headers: &HeaderMap) -> Option<String> {
    let set_cookie = headers.get(header::SET_COOKIE)?.to_str().ok()?;
    let pair = set_cookie.split(';').next()?.trim();
    (pair.starts_with("auth=") && pair.len() > "auth=".len()).then(|| pair.to_string())
}

pub fn token_from_link(link: &str) -> String {
    let encoded = link.split("token=").nth(1).unwrap();
    urlencoding::decode(encoded).unwrap().into_owned()
}
