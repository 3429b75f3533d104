mod common;

use std::time::Duration;

use photodesk_core::auth::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
use photodesk_core::{AppError, Intent, View};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{auth_headers, desk, photo_json, project_json, user_json};

async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": token, "token_type": "bearer"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(server)
        .await;
}

async fn mount_projects(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            project_json("p-1", "Carpathians"),
            project_json("p-2", "Odesa")
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fresh_start_gates_protected_routes() {
    let server = MockServer::start().await;
    let mut desk = desk(&server, Box::new(MemoryTokenStorage::default()));

    let visit = desk.navigate("/projects").await.unwrap();
    assert_eq!(visit.navigation.location.path, "/login");
    assert_eq!(visit.view, View::Login);

    let visit = desk.navigate("/login").await.unwrap();
    assert_eq!(visit.navigation.location.path, "/login");
    assert!(!visit.navigation.redirected());

    // No protected payload was ever requested
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_startup_with_persisted_token() {
    let server = MockServer::start().await;
    mount_projects(&server, "abc").await;

    let dir = TempDir::new().unwrap();
    FileTokenStorage::new(dir.path()).save("abc").unwrap();

    let mut desk = desk(&server, Box::new(FileTokenStorage::new(dir.path())));
    assert_eq!(desk.store().token().as_deref(), Some("abc"));
    assert_eq!(desk.store().user(), None);
    assert!(desk.is_authenticated());

    let visit = desk.navigate("/login").await.unwrap();
    assert_eq!(visit.navigation.location.path, "/projects");
    match visit.view {
        View::Projects(projects) => assert_eq!(projects.len(), 2),
        other => panic!("unexpected view {:?}", other),
    }
}

#[tokio::test]
async fn test_login_admits_projects_and_persists_token() {
    let server = MockServer::start().await;
    mount_login(&server, "xyz").await;
    mount_projects(&server, "xyz").await;

    let dir = TempDir::new().unwrap();
    let mut desk = desk(&server, Box::new(FileTokenStorage::new(dir.path())));

    let user = desk.login("olena@example.com", "pw").await.unwrap();
    assert_eq!(user.name, "Olena");
    assert_eq!(desk.store().user(), Some(user));

    let visit = desk.navigate("/projects").await.unwrap();
    assert_eq!(visit.navigation.location.path, "/projects");
    assert!(!visit.navigation.redirected());

    assert_eq!(FileTokenStorage::new(dir.path()).load().unwrap().as_deref(), Some("xyz"));
}

#[tokio::test]
async fn test_unauthorized_call_redirects_next_navigation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Could not validate credentials"})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    FileTokenStorage::new(dir.path()).save("expired").unwrap();
    let mut desk = desk(&server, Box::new(FileTokenStorage::new(dir.path())));

    // The guard admits (the token is present locally), then the load fails
    let err = desk.navigate("/projects").await.unwrap_err();
    assert!(matches!(err, AppError::Api(ref e) if e.is_unauthorized()));
    assert_eq!(desk.current().map(|l| l.path.as_str()), Some("/projects"));

    // Session is gone, in memory and on disk
    assert!(!desk.is_authenticated());
    assert_eq!(FileTokenStorage::new(dir.path()).load().unwrap(), None);

    for target in ["/projects", "/projects/p-1", "/"] {
        let visit = desk.navigate(target).await.unwrap();
        assert_eq!(visit.navigation.location.path, "/login", "{}", target);
    }
}

#[tokio::test]
async fn test_logout_then_navigate() {
    let server = MockServer::start().await;
    mount_projects(&server, "abc").await;

    let mut desk = desk(&server, Box::new(MemoryTokenStorage::with_token("abc")));
    desk.navigate("/projects").await.unwrap();

    desk.logout();
    desk.logout();
    assert!(!desk.is_authenticated());

    let visit = desk.navigate("/projects").await.unwrap();
    assert_eq!(visit.navigation.location.path, "/login");
}

#[tokio::test]
async fn test_register_then_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({"name": "Olena", "email": "olena@example.com", "password": "pw"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;
    mount_login(&server, "fresh").await;

    let mut desk = desk(&server, Box::new(MemoryTokenStorage::default()));
    let user = desk.register(" Olena ", "olena@example.com", "pw").await.unwrap();
    assert_eq!(user.id, "u-1");
    assert_eq!(desk.store().token().as_deref(), Some("fresh"));

    let visit = desk.navigate("/register").await.unwrap();
    assert_eq!(visit.navigation.location.path, "/projects");

    // register and login anonymous, profile fetch signed
    let headers = auth_headers(&server).await;
    assert_eq!(headers[0], None);
    assert_eq!(headers[1], None);
    assert_eq!(headers[2].as_deref(), Some("Bearer fresh"));
}

#[tokio::test]
async fn test_register_conflict_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Email already registered"})))
        .mount(&server)
        .await;

    let desk = desk(&server, Box::new(MemoryTokenStorage::default()));
    let err = desk.register("Olena", "olena@example.com", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "Rejected: Email already registered");
    assert!(!desk.is_authenticated());
}

#[tokio::test]
async fn test_duplicate_login_is_rejected_while_pending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "xyz", "token_type": "bearer"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(&server)
        .await;

    let desk = desk(&server, Box::new(MemoryTokenStorage::default()));
    let (first, second) = tokio::join!(
        desk.login("olena@example.com", "pw"),
        desk.login("olena@example.com", "pw"),
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(AppError::AlreadyInFlight(Intent::Login))));
    assert_eq!(desk.store().token().as_deref(), Some("xyz"));

    // Finished logins release the slot
    assert!(desk.login("olena@example.com", "pw").await.is_ok());
}

#[tokio::test]
async fn test_wrong_password_is_not_a_session_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Incorrect email or password"})))
        .mount(&server)
        .await;

    let desk = desk(&server, Box::new(MemoryTokenStorage::default()));
    let err = desk.login("olena@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials(_)));
    assert_eq!(err.user_message(), "Incorrect email or password");
    assert!(!desk.is_authenticated());
}

#[tokio::test]
async fn test_login_rejected_while_registration_pending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(user_json())
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    mount_login(&server, "fresh").await;

    let desk = desk(&server, Box::new(MemoryTokenStorage::default()));
    let (registered, login) = tokio::join!(
        desk.register("Olena", "olena@example.com", "pw"),
        desk.login("olena@example.com", "pw"),
    );

    assert!(registered.is_ok());
    assert!(matches!(login, Err(AppError::AlreadyInFlight(Intent::Register))));
    // Only the registration's own login reached the server
    let logins = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/auth/login")
        .count();
    assert_eq!(logins, 1);
}

#[tokio::test]
async fn test_logout_during_profile_fetch_fails_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "xyz", "token_type": "bearer"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(user_json())
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let desk = desk(&server, Box::new(MemoryTokenStorage::default()));
    let (login, _) = tokio::join!(desk.login("olena@example.com", "pw"), async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        desk.logout();
    });

    assert!(matches!(login, Err(AppError::SessionEnded)));
    assert!(!desk.is_authenticated());
    assert_eq!(desk.store().user(), None);
}

#[tokio::test]
async fn test_restore_user_for_persisted_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;

    let desk = desk(&server, Box::new(MemoryTokenStorage::with_token("abc")));
    let user = desk.restore_user().await.unwrap().unwrap();
    assert_eq!(user.email, "olena@example.com");

    // Cached afterwards
    assert_eq!(desk.restore_user().await.unwrap(), Some(user));
}

#[tokio::test]
async fn test_workspace_view_loads_project_and_photos() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/p-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(project_json("p-1", "Carpathians")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/p-1/photos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [photo_json("f-1")]})))
        .mount(&server)
        .await;

    let mut desk = desk(&server, Box::new(MemoryTokenStorage::with_token("abc")));
    let visit = desk.navigate("/projects/p-1").await.unwrap();
    match visit.view {
        View::Workspace { project, photos } => {
            assert_eq!(project.name, "Carpathians");
            assert_eq!(photos.len(), 1);
        }
        other => panic!("unexpected view {:?}", other),
    }
}

#[tokio::test]
async fn test_bulk_photo_operations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/projects/p-1/photos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": ["f-1", "f-2"]})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/projects/p-1/photos/f-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/projects/p-1/photos/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Photo not found"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/p-1/photos/f-2"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"pixels".to_vec()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.jpg");
    let b = dir.path().join("b.jpg");
    std::fs::write(&a, b"one").unwrap();
    std::fs::write(&b, b"two").unwrap();

    let desk = desk(&server, Box::new(MemoryTokenStorage::with_token("abc")));
    let ids = desk.upload_files("p-1", &[a, b]).await.unwrap();
    assert_eq!(ids, vec!["f-1", "f-2"]);

    let missing_file = dir.path().join("nope.jpg");
    assert!(matches!(
        desk.upload_files("p-1", &[missing_file]).await,
        Err(AppError::File { .. })
    ));

    let results = desk
        .delete_photos("p-1", &["f-1".to_string(), "missing".to_string()])
        .await;
    assert_eq!(results[0].0, "f-1");
    assert!(results[0].1.is_ok());
    assert_eq!(results[1].0, "missing");
    assert!(results[1].1.is_err());

    let dest = dir.path().join("out.jpg");
    let written = desk.save_photo("p-1", "f-2", &dest).await.unwrap();
    assert_eq!(written, 6);
    assert_eq!(std::fs::read(&dest).unwrap(), b"pixels");

    // Still logged in: none of these were authorization failures
    assert!(desk.is_authenticated());
}
