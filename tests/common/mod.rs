use std::net::SocketAddr;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crewdesk::config::Config;

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn register(
        &self,
        employee_id: &str,
        full_name: &str,
        password: &str,
        position: &str,
        location: &str,
    ) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({
                "employee_id": employee_id,
                "full_name": full_name,
                "password": password,
                "position": position,
                "location": location,
            }))
            .send()
            .await
            .expect("register request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn login(&self, employee_id: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "employee_id": employee_id, "password": password }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Register a regular crew member, return the access token.
    pub async fn crew_member(&self, employee_id: &str) -> String {
        let (body, status) = self
            .register(
                employee_id,
                "Crew Member Test",
                "password123",
                "Flight Attendant",
                "Moscow",
            )
            .await;
        assert_eq!(status, StatusCode::OK, "crew register failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Register an admin (ADMIN position grants admin rights), return the token.
    pub async fn admin(&self, employee_id: &str) -> String {
        let (body, status) = self
            .register(employee_id, "Admin User Test", "password123", "ADMIN", "Moscow")
            .await;
        assert_eq!(status, StatusCode::OK, "admin register failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Submit a flight order with a valid default itinerary, return the order.
    pub async fn create_flight_order(&self, token: &str) -> Value {
        let (body, status) = self
            .post_auth("/api/v1/orders/flight", token, &flight_payload())
            .await;
        assert_eq!(status, StatusCode::OK, "create flight order failed: {body}");
        body
    }

    /// Submit a hotel order with a valid default itinerary, return the order.
    pub async fn create_hotel_order(&self, token: &str) -> Value {
        let (body, status) = self
            .post_auth("/api/v1/orders/hotel", token, &hotel_payload())
            .await;
        assert_eq!(status, StatusCode::OK, "create hotel order failed: {body}");
        body
    }

    /// Request a status transition on an order.
    pub async fn transition(
        &self,
        order_id: &str,
        token: &str,
        status: &str,
        notes: Option<&str>,
    ) -> (Value, StatusCode) {
        let mut body = json!({ "status": status });
        if let Some(n) = notes {
            body["admin_notes"] = json!(n);
        }
        self.post_auth(&format!("/api/v1/orders/{order_id}/transition"), token, &body)
            .await
    }
}

pub fn flight_payload() -> Value {
    json!({
        "departure_city": "Moscow",
        "arrival_city": "Sochi",
        "departure_date": "2024-03-01",
        "departure_time": "08:30",
        "arrival_date": "2024-03-01",
        "arrival_time": "12:10",
        "flight_number": "SU-1122",
        "airline": "Aeroflot",
        "purpose": "Crew rotation",
        "passengers": 1
    })
}

pub fn hotel_payload() -> Value {
    json!({
        "city": "Sochi",
        "check_in_date": "2024-03-01",
        "check_in_time": "14:00",
        "check_out_date": "2024-03-03",
        "check_out_time": "12:00",
        "flight_date": "2024-03-03",
        "flight_number": "SU-1123"
    })
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    // Create a unique test database
    let db_name = format!(
        "crewdesk_test_{}",
        Uuid::now_v7().to_string().replace('-', "")
    );

    // Connect to default postgres DB to create the test DB
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to a random port
        log_level: "warn".to_string(),
    };

    let app = crewdesk::build_app(pool.clone(), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
