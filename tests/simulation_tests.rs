// tests/simulation_tests.rs

use std::collections::{HashMap, HashSet};

use examina_backend::{config::Config, routes, state::AppState};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

async fn spawn_app() -> String {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "simulation_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState::new(pool, config);
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

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

async fn test_pool() -> PgPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test DB")
}

async fn seed_discipline(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO disciplines (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_questions(pool: &PgPool, discipline_id: i64, count: usize) -> Vec<i64> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO questions (discipline_id, statement, options, correct_option)
            VALUES ($1, $2, $3, 'A')
            RETURNING id
            "#,
        )
        .bind(discipline_id)
        .bind(format!("Question {}", i))
        .bind(serde_json::json!(["A", "B", "C", "D"]))
        .fetch_one(pool)
        .await
        .unwrap();
        ids.push(id);
    }
    ids
}

async fn register_and_login(client: &reqwest::Client, address: &str) -> String {
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

    login_resp["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn custom_generation_returns_requested_unique_questions() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;

    let discipline_id = seed_discipline(&pool, "Custom Gen Discipline").await;
    seed_questions(&pool, discipline_id, 20).await;
    let token = register_and_login(&client, &address).await;

    // Act
    let questions: Vec<serde_json::Value> = client
        .post(&format!("{}/api/simulations/generate", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "mode": "custom",
            "question_count": 5,
            "discipline_ids": [discipline_id]
        }))
        .send()
        .await
        .expect("Generate failed")
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(questions.len(), 5);

    let ids: HashSet<i64> = questions.iter().map(|q| q["id"].as_i64().unwrap()).collect();
    assert_eq!(ids.len(), 5, "returned questions must be unique");

    for q in &questions {
        assert_eq!(q["discipline_id"].as_i64().unwrap(), discipline_id);
        assert_eq!(q["previously_answered"], false);
        assert_eq!(q["previously_correct"], false);
    }
}

#[tokio::test]
async fn generation_returns_all_available_when_pool_is_small() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;

    let discipline_id = seed_discipline(&pool, "Small Pool Discipline").await;
    seed_questions(&pool, discipline_id, 3).await;
    let token = register_and_login(&client, &address).await;

    // Act: ask for more than exists in the targeted discipline
    let response = client
        .post(&format!("{}/api/simulations/generate", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "mode": "custom",
            "question_count": 10,
            "discipline_ids": [discipline_id]
        }))
        .send()
        .await
        .expect("Generate failed");

    // Assert: not an error, just fewer questions
    assert_eq!(response.status().as_u16(), 200);
    let questions: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(questions.len(), 3);
}

#[tokio::test]
async fn custom_mode_without_disciplines_is_rejected() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address).await;

    // Act
    let response = client
        .post(&format!("{}/api/simulations/generate", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "mode": "custom",
            "question_count": 5
        }))
        .send()
        .await
        .expect("Generate failed");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn submit_records_history_and_result() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;

    let discipline_id = seed_discipline(&pool, "Submit Discipline").await;
    let question_ids = seed_questions(&pool, discipline_id, 5).await;
    let token = register_and_login(&client, &address).await;

    // Act: answer everything correctly ('A' per the seed)
    let mut answers = HashMap::new();
    for id in &question_ids {
        answers.insert(id.to_string(), "A".to_string());
    }

    let result: serde_json::Value = client
        .post(&format!("{}/api/simulations/submit", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"mode": "custom", "answers": answers}))
        .send()
        .await
        .expect("Submit failed")
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(result["score"], 100);
    assert_eq!(result["correct_count"], 5);
    assert_eq!(result["total_questions"], 5);

    let mine: Vec<serde_json::Value> = client
        .get(&format!("{}/api/simulations/mine", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine[0]["score"], 100);
    assert_eq!(mine[0]["mode"], "custom");

    // The next generation of the same questions carries the attempt flags
    let questions: Vec<serde_json::Value> = client
        .post(&format!("{}/api/simulations/generate", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "mode": "custom",
            "question_count": 5,
            "discipline_ids": [discipline_id]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    for q in &questions {
        assert_eq!(q["previously_answered"], true);
        assert_eq!(q["previously_correct"], true);
    }
}

#[tokio::test]
async fn revision_surfaces_previously_wrong_questions() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;

    let discipline_id = seed_discipline(&pool, "Revision Discipline").await;
    let question_ids = seed_questions(&pool, discipline_id, 3).await;
    let token = register_and_login(&client, &address).await;

    // Answer everything wrong ('B' against a correct 'A')
    let mut answers = HashMap::new();
    for id in &question_ids {
        answers.insert(id.to_string(), "B".to_string());
    }
    client
        .post(&format!("{}/api/simulations/submit", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"mode": "custom", "answers": answers}))
        .send()
        .await
        .expect("Submit failed");

    // Act
    let questions: Vec<serde_json::Value> = client
        .post(&format!("{}/api/simulations/generate", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "mode": "revision",
            "question_count": 3
        }))
        .send()
        .await
        .expect("Generate failed")
        .json()
        .await
        .unwrap();

    // Assert: exactly the wrongly answered questions come back
    let expected: HashSet<i64> = question_ids.iter().copied().collect();
    let got: HashSet<i64> = questions.iter().map(|q| q["id"].as_i64().unwrap()).collect();
    assert_eq!(got, expected);

    for q in &questions {
        assert_eq!(q["previously_answered"], true);
        assert_eq!(q["previously_correct"], false);
    }
}

#[tokio::test]
async fn revision_falls_back_to_random_without_history() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;

    let discipline_id = seed_discipline(&pool, "Fallback Discipline").await;
    seed_questions(&pool, discipline_id, 5).await;
    let token = register_and_login(&client, &address).await;

    // Act: a fresh user has no wrong answers to revise
    let questions: Vec<serde_json::Value> = client
        .post(&format!("{}/api/simulations/generate", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "mode": "revision",
            "question_count": 3
        }))
        .send()
        .await
        .expect("Generate failed")
        .json()
        .await
        .unwrap();

    // Assert: random questions instead of an empty run
    assert!(!questions.is_empty());
}
