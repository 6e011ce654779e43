use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use axum_extra::extract::cookie::Key;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

use pensive_api::mail::MailError;
use pensive_api::{AppState, Mailer, feed, router};
use pensive_db::Database;
use pensive_storage::ObjectStore;

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

struct TestApp {
    _dir: TempDir,
    state: AppState,
    app: Router,
    mailer: Arc<RecordingMailer>,
}

async fn app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let public_url = Url::parse("http://localhost:8000").unwrap();
    let objects = ObjectStore::new(dir.path().join("media"), b"media-key", public_url.clone())
        .await
        .unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::new(
        Database::open_in_memory().unwrap(),
        objects,
        Key::generate(),
        "access-secret",
        public_url,
        mailer.clone(),
    );
    TestApp {
        _dir: dir,
        app: router(state.clone()),
        state,
        mailer,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(req).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::get(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req =
            Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.send(req.body(Body::from(form.to_string())).unwrap()).await
    }

    async fn post_multipart(
        &self,
        cookie: &str,
        text: &str,
        file: Option<(&str, &[u8])>,
    ) -> Response<Body> {
        let boundary = "pensive-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"post\"\r\n\r\n{text}\r\n"
            )
            .as_bytes(),
        );
        if let Some((name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\n\
                     Content-Disposition: form-data; name=\"media-source\"; filename=\"{name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let req = Request::post("/post")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    async fn register(&self, username: &str, password: &str) {
        let resp = self
            .post_form(
                "/register",
                &format!("username={username}&password={password}&email={username}%40example.com"),
                None,
            )
            .await;
        assert_eq!(location(&resp), "/login");
    }

    /// Log in and return the `cookie` header value for later requests.
    async fn login(&self, username: &str, password: &str) -> String {
        let resp = self
            .post_form("/login", &format!("username={username}&password={password}"), None)
            .await;
        assert_eq!(location(&resp), "/");
        session_cookie(&resp).expect("login sets a session cookie")
    }
}

fn location(resp: &Response<Body>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap())
        .unwrap_or("")
}

fn session_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap())
        .find(|v| v.starts_with("session="))
        .map(|v| v.split(';').next().unwrap().to_string())
}

async fn bytes(resp: Response<Body>) -> Vec<u8> {
    resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn text(resp: Response<Body>) -> String {
    String::from_utf8(bytes(resp).await).unwrap()
}

#[tokio::test]
async fn pages_require_a_session() {
    let t = app().await;
    for uri in ["/", "/@ada", "/settings", "/settings/account", "/files/x.txt"] {
        let resp = t.get(uri, None).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&resp), "/login", "{uri}");
    }

    let resp = t.get("/", Some("session=forged")).await;
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn home_redirects_to_root() {
    let t = app().await;
    let resp = t.get("/home", None).await;
    assert_eq!(location(&resp), "/");
}

#[tokio::test]
async fn login_and_register_pages_render() {
    let t = app().await;
    let resp = t.get("/login", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(text(resp).await.contains("action=\"/login\""));

    let resp = t.get("/register", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(text(resp).await.contains("action=\"/register\""));
}

#[tokio::test]
async fn signed_in_users_skip_the_entry_forms() {
    let t = app().await;
    t.register("ada", "hunter2").await;
    let ada = t.login("ada", "hunter2").await;

    let resp = t.get("/login", Some(&ada)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    let resp = t.get("/register", Some(&ada)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn register_login_post_and_read_feed() {
    let t = app().await;
    t.register("ada", "hunter2").await;
    let cookie = t.login("ada", "hunter2").await;

    // logged in users skip the login form
    assert_eq!(location(&t.get("/login", Some(&cookie)).await), "/");

    let resp = t.get("/", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = text(resp).await;
    assert!(page.contains("@ada"));
    assert!(page.contains("Nothing here yet."));

    let resp = t.post_multipart(&cookie, "hello world", None).await;
    assert_eq!(location(&resp), "/");

    let page = text(t.get("/", Some(&cookie)).await).await;
    assert!(page.contains("hello world"));

    let page = text(t.get("/@ada", Some(&cookie)).await).await;
    assert!(page.contains("hello world"));
}

#[tokio::test]
async fn bad_credentials_go_back_to_the_form() {
    let t = app().await;
    t.register("ada", "hunter2").await;

    let resp = t.post_form("/login", "username=ada&password=wrong", None).await;
    assert_eq!(location(&resp), "/login");
    assert!(session_cookie(&resp).is_none());

    let resp = t.post_form("/login", "username=nobody&password=hunter2", None).await;
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn duplicate_and_invalid_registrations_are_refused() {
    let t = app().await;
    t.register("ada", "hunter2").await;

    let resp = t
        .post_form("/register", "username=ada&password=x&email=other%40example.com", None)
        .await;
    assert_eq!(location(&resp), "/register");

    let resp = t
        .post_form("/register", "username=bob&password=x&email=not-an-email", None)
        .await;
    assert_eq!(location(&resp), "/register");

    let resp = t
        .post_form("/register", "username=b&password=x&email=b%40example.com", None)
        .await;
    assert_eq!(location(&resp), "/register");
}

#[tokio::test]
async fn empty_posts_are_rejected() {
    let t = app().await;
    t.register("ada", "hunter2").await;
    let cookie = t.login("ada", "hunter2").await;

    let resp = t.post_multipart(&cookie, "", None).await;
    assert_eq!(location(&resp), "/");
    assert!(t.state.db.get_all_posts().unwrap().is_empty());
}

#[tokio::test]
async fn media_is_served_through_presigned_links() {
    let t = app().await;
    t.register("ada", "hunter2").await;
    t.register("grace", "hunter2").await;
    let ada = t.login("ada", "hunter2").await;
    let grace = t.login("grace", "hunter2").await;

    let data: &[u8] = b"\x89PNG not really";
    let resp = t.post_multipart(&ada, "", Some(("cat.png", data))).await;
    assert_eq!(location(&resp), "/");

    let views = feed::load(&t.state, None).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].author, "ada");
    let link = Url::parse(&views[0].attachment_url).unwrap();
    assert!(link.path().starts_with("/media/user1/"));
    let path_and_query = format!("{}?{}", link.path(), link.query().unwrap());

    // presigned links need no session
    let resp = t.get(&path_and_query, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"cat.png\""
    );
    assert_eq!(bytes(resp).await, data);

    // tampered signature
    let tampered = path_and_query.replace("X-Signature=", "X-Signature=00");
    assert_eq!(t.get(&tampered, None).await.status(), StatusCode::FORBIDDEN);

    // same query against another object
    let other = path_and_query.replace("/media/user1/", "/media/user2/");
    assert_eq!(t.get(&other, None).await.status(), StatusCode::FORBIDDEN);

    // no signature at all
    assert_eq!(t.get(link.path(), None).await.status(), StatusCode::BAD_REQUEST);

    // direct reads only see the caller's own bucket
    let key = link.path().trim_start_matches("/media/user1/");
    let resp = t.get(&format!("/files/{key}"), Some(&ada)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(bytes(resp).await, data);
    let resp = t.get(&format!("/files/{key}"), Some(&grace)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_are_keyed_by_their_file_name() {
    let t = app().await;
    t.register("ada", "hunter2").await;
    let ada = t.login("ada", "hunter2").await;

    let resp = t.post_multipart(&ada, "", Some(("cat.png", &b"meow"[..]))).await;
    assert_eq!(location(&resp), "/");
    let resp = t
        .post_multipart(&ada, "again", Some(("../../etc/cat pic.png", &b"purr"[..])))
        .await;
    assert_eq!(location(&resp), "/");

    let posts = t.state.db.get_posts(1).unwrap();
    let keys: Vec<_> = posts.iter().map(|p| p.media_id.as_deref()).collect();
    assert_eq!(keys, [Some("cat_pic.png"), Some("cat.png")]);

    let resp = t.get("/files/cat.png", Some(&ada)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(bytes(resp).await, b"meow");
}

#[tokio::test]
async fn unknown_profiles_go_home() {
    let t = app().await;
    t.register("ada", "hunter2").await;
    let cookie = t.login("ada", "hunter2").await;

    assert_eq!(location(&t.get("/@nobody", Some(&cookie)).await), "/");
    assert_eq!(location(&t.get("/ada", Some(&cookie)).await), "/");
}

#[tokio::test]
async fn logout_clears_the_session() {
    let t = app().await;
    t.register("ada", "hunter2").await;
    let cookie = t.login("ada", "hunter2").await;

    let resp = t.post_form("/logout", "", Some(&cookie)).await;
    assert_eq!(location(&resp), "/login");
    let cleared = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| v.to_str().unwrap().starts_with("session=;"));
    assert!(cleared);
}

#[tokio::test]
async fn settings_updates() {
    let t = app().await;
    t.register("ada", "hunter2").await;
    let cookie = t.login("ada", "hunter2").await;

    for page in ["/settings", "/settings/profile", "/settings/privacy", "/settings/account"] {
        assert_eq!(t.get(page, Some(&cookie)).await.status(), StatusCode::OK, "{page}");
    }

    // wrong password leaves the username alone
    let resp = t
        .post_form("/settings/profile", "username=grace&password=wrong", Some(&cookie))
        .await;
    assert_eq!(location(&resp), "/settings/profile");
    assert_eq!(t.state.db.get_user(1).unwrap().username, "ada");

    t.post_form("/settings/profile", "username=grace&password=hunter2", Some(&cookie))
        .await;
    assert_eq!(t.state.db.get_user(1).unwrap().username, "grace");

    // mismatched confirmation
    t.post_form(
        "/settings/privacy",
        "old_password=hunter2&new_password=a&conf_password=b",
        Some(&cookie),
    )
    .await;
    t.login("grace", "hunter2").await;

    t.post_form(
        "/settings/privacy",
        "old_password=hunter2&new_password=s3cret&conf_password=s3cret",
        Some(&cookie),
    )
    .await;
    t.login("grace", "s3cret").await;

    t.post_form("/settings/account", "email=g%40example.org&password=s3cret", Some(&cookie))
        .await;
    assert_eq!(t.state.db.get_user(1).unwrap().email, "g@example.org");
}

#[tokio::test]
async fn email_verification() {
    let t = app().await;
    t.register("ada", "hunter2").await;
    let cookie = t.login("ada", "hunter2").await;

    let resp = t.post_form("/verify", "", Some(&cookie)).await;
    assert_eq!(location(&resp), "/settings/account");

    let (to, subject, body) = t.mailer.sent.lock().unwrap().pop().unwrap();
    assert_eq!(to, "ada@example.com");
    assert_eq!(subject, "Welcome to pensive");
    assert!(body.contains("@ada"));

    let link = body
        .lines()
        .find(|l| l.starts_with("http://localhost:8000/verify?token="))
        .unwrap()
        .to_string();
    let uri = link.trim_start_matches("http://localhost:8000");

    // a garbage token changes nothing
    t.get("/verify?token=garbage", Some(&cookie)).await;
    assert!(!t.state.db.get_user(1).unwrap().is_verified);

    let resp = t.get(uri, Some(&cookie)).await;
    assert_eq!(location(&resp), "/settings/account");
    assert!(t.state.db.get_user(1).unwrap().is_verified);

    // verified accounts get no more mail
    t.post_form("/verify", "", Some(&cookie)).await;
    assert!(t.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn tokens_are_bound_to_the_user() {
    let t = app().await;
    t.register("ada", "hunter2").await;
    t.register("grace", "hunter2").await;
    let grace = t.login("grace", "hunter2").await;

    let ada_token = pensive_crypto::token::create("access-secret", "1").unwrap();
    t.get(&format!("/verify?token={ada_token}"), Some(&grace)).await;
    assert!(!t.state.db.get_user(2).unwrap().is_verified);
    assert!(!t.state.db.get_user(1).unwrap().is_verified);
}

#[tokio::test]
async fn metrics_need_a_recorder() {
    let t = app().await;
    assert_eq!(t.get("/metrics", None).await.status(), StatusCode::NOT_FOUND);
}
