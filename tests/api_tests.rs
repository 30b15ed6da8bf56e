// tests/api_tests.rs

use examina_backend::{config::Config, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    // Note: For Postgres, you must have a running database.
    // We'll read from DATABASE_URL environment variable.
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState::new(pool, config);

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await
        .unwrap();
    });

    address
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    // Truncate UUID to ensure username length < 20
    let unique_name = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    // Act
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": unique_name,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 201);
}

#[tokio::test]
async fn register_fails_validation() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: Send a username that is too short
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "yo",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn register_rejects_duplicate_username() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let unique_name = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let body = serde_json::json!({
        "username": unique_name,
        "password": "password123"
    });

    client
        .post(&format!("{}/api/auth/register", address))
        .json(&body)
        .send()
        .await
        .expect("First register failed");

    // Act
    let second = client
        .post(&format!("{}/api/auth/register", address))
        .json(&body)
        .send()
        .await
        .expect("Second register failed");

    // Assert
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn login_returns_token_and_profile_is_reachable() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({"username": username, "password": password}))
        .send()
        .await
        .expect("Register failed");

    // Act
    let login_resp = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"username": username, "password": password}))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    let token = login_resp["token"].as_str().expect("Token not found");
    assert_eq!(login_resp["is_premium"], false);

    let me = client
        .get(&format!("{}/api/profile/me", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Profile fetch failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse profile json");

    // Assert: fresh account starts at level 1 with zeroed counters
    assert_eq!(me["username"], username);
    assert_eq!(me["xp"], 0);
    assert_eq!(me["level"], 1);
    assert_eq!(me["streak"], 0);
    assert_eq!(me["badges"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn protected_routes_require_token() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(&format!("{}/api/profile/me", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({"username": username, "password": password}))
        .send()
        .await
        .expect("Register failed");

    let login_resp = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"username": username, "password": password}))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let token = login_resp["token"].as_str().unwrap();

    // Act
    let response = client
        .get(&format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn auth_routes_are_rate_limited() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: hammer the login route well past the burst allowance
    let mut saw_too_many_requests = false;
    for _ in 0..40 {
        let response = client
            .post(&format!("{}/api/auth/login", address))
            .json(&serde_json::json!({
                "username": "nobody_here",
                "password": "password123"
            }))
            .send()
            .await
            .expect("Failed to execute request");

        if response.status().as_u16() == 429 {
            saw_too_many_requests = true;
            break;
        }
    }

    // Assert
    assert!(
        saw_too_many_requests,
        "expected the limiter to reject rapid-fire auth requests"
    );
}
