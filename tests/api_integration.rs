//! End-to-end tests for the HTTP surface.
//!
//! Each test starts a real server on `127.0.0.1:0` backed by in-memory
//! persistence and a manual clock, then drives it with `reqwest`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::{TimeDelta, TimeZone};
use prepbot::api::ApiServer;
use prepbot::config::ServerConfig;
use prepbot::store::{MemoryBackend, MemoryPhotoStorage, RetentionPolicy};
use prepbot::time::{Clock, ManualClock, Stamp, parse_timezone};
use prepbot::{StoreHandle, TaskStore};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;

struct Harness {
    server: ApiServer,
    client: reqwest::Client,
    clock: Arc<ManualClock>,
    backend: MemoryBackend,
    photos: MemoryPhotoStorage,
}

impl Harness {
    async fn start() -> Self {
        let tz = parse_timezone("Europe/Kyiv").unwrap();
        let clock = Arc::new(ManualClock::new(
            tz.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        let backend = MemoryBackend::new();
        let photos = MemoryPhotoStorage::new();
        let store = TaskStore::open(
            Box::new(backend.clone()),
            Box::new(photos.clone()),
            clock.clone(),
            RetentionPolicy::default(),
        )
        .unwrap();

        let config = ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
            max_upload_bytes: 1024,
        };
        let server = ApiServer::start(StoreHandle::new(store), &config, None)
            .await
            .unwrap();

        Self {
            server,
            client: reqwest::Client::new(),
            clock,
            backend,
            photos,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.server.addr())
    }

    fn stamp_in(&self, delta: TimeDelta) -> String {
        Stamp::at(&(self.clock.now() + delta)).to_string()
    }

    async fn create_task(&self, title: &str, days_ahead: i64) -> Value {
        let response = self
            .client
            .post(self.url("/api/tasks"))
            .json(&json!({
                "title": title,
                "description": "bring snacks",
                "event_date": self.stamp_in(TimeDelta::days(days_ahead)),
                "preparation_date": self.stamp_in(TimeDelta::days(days_ahead - 3)),
                "created_by": 1,
                "created_by_username": "alice",
                "checklist": ["cake"],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn health_endpoint_responds() {
    let h = Harness::start().await;
    let (status, body) = h.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn user_registration_is_create_if_absent() {
    let h = Harness::start().await;
    let (status, user) = h
        .post(
            "/api/users",
            json!({"telegram_id": 42, "username": "olga", "first_name": "Olga"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["timezone"], "Europe/Kiev");
    assert_eq!(user["language"], "uk");

    let (_, again) = h
        .post("/api/users", json!({"telegram_id": 42, "username": "changed"}))
        .await;
    assert_eq!(again["username"], "olga");

    let response = h
        .client
        .put(h.url("/api/users/42"))
        .json(&json!({"language": "en"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, user) = h.get("/api/users/42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["language"], "en");

    let (status, body) = h.get("/api/users/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("user"));
}

#[tokio::test]
async fn task_creation_validates_and_reports_status() {
    let h = Harness::start().await;

    let (status, body) = h
        .post("/api/tasks", json!({"title": "no dates", "created_by": 1}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("event_date"));

    let task = h.create_task("Picnic", 5).await;
    assert_eq!(task["status"], "future");
    assert_eq!(task["checklist"][0]["text"], "cake");
    assert_eq!(task["ready_users"], json!([]));

    let id = task["id"].as_str().unwrap();
    h.clock.advance(TimeDelta::days(3));
    let (_, fetched) = h.get(&format!("/api/tasks/{id}")).await;
    assert_eq!(fetched["status"], "preparation");

    h.clock.advance(TimeDelta::days(2));
    let (_, fetched) = h.get(&format!("/api/tasks/{id}")).await;
    assert_eq!(fetched["status"], "urgent");

    assert_eq!(h.backend.saved().tasks.len(), 1);
}

#[tokio::test]
async fn readiness_keeps_sets_disjoint() {
    let h = Harness::start().await;
    let task = h.create_task("Hike", 4).await;
    let id = task["id"].as_str().unwrap();

    h.post(&format!("/api/tasks/{id}/ready"), json!({"user_id": 5}))
        .await;
    let (status, task) = h
        .post(&format!("/api/tasks/{id}/not-going"), json!({"user_id": 5}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["ready_users"], json!([]));
    assert_eq!(task["not_going_users"], json!([5]));

    let (status, _) = h
        .post("/api/tasks/missing/ready", json!({"user_id": 5}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lifecycle_round_trips_through_archives() {
    let h = Harness::start().await;
    let task = h.create_task("Dinner", 6).await;
    let id = task["id"].as_str().unwrap();

    let response = h
        .client
        .delete(h.url(&format!("/api/tasks/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, active) = h.get("/api/tasks").await;
    assert_eq!(active, json!([]));
    let (_, deleted) = h.get("/api/tasks/deleted").await;
    assert_eq!(deleted[0]["id"], id);
    assert_eq!(deleted[0]["is_deleted"], true);

    let (status, restored) = h.post(&format!("/api/tasks/{id}/restore"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["is_deleted"], false);
    assert!(restored.get("deleted_at").is_none());

    let (_, done) = h.post(&format!("/api/tasks/{id}/complete"), json!({})).await;
    assert_eq!(done["status"], "preparation_completed");
    let (_, completed) = h.get("/api/tasks/completed").await;
    assert_eq!(completed.as_array().unwrap().len(), 1);

    let (status, _) = h.post(&format!("/api/tasks/{id}/restore"), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, back) = h
        .post(&format!("/api/tasks/{id}/restore-completed"), json!({}))
        .await;
    assert_eq!(back["status"], "future");
    let (_, active) = h.get("/api/tasks").await;
    assert_eq!(active.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn checklist_endpoints() {
    let h = Harness::start().await;
    let task = h.create_task("Party", 6).await;
    let id = task["id"].as_str().unwrap();

    let (status, item) = h
        .post(&format!("/api/tasks/{id}/checklist"), json!({"text": "balloons"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let item_id = item["id"].as_str().unwrap();

    let (_, toggled) = h
        .post(
            &format!("/api/tasks/{id}/checklist/{item_id}/toggle"),
            json!({"user_id": 9}),
        )
        .await;
    assert_eq!(toggled["is_completed"], true);
    assert_eq!(toggled["completed_by"], json!([9]));

    let response = h
        .client
        .put(h.url(&format!("/api/tasks/{id}/checklist/{item_id}")))
        .json(&json!({"text": "more balloons"}))
        .send()
        .await
        .unwrap();
    let edited: Value = response.json().await.unwrap();
    assert_eq!(edited["text"], "more balloons");

    let (status, _) = h
        .post(
            &format!("/api/tasks/{id}/checklist/unknown/toggle"),
            json!({"user_id": 9}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Removing an unknown item is tolerated.
    let response = h
        .client
        .delete(h.url(&format!("/api/tasks/{id}/checklist/unknown")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = h
        .client
        .delete(h.url(&format!("/api/tasks/{id}/checklist/{item_id}")))
        .send()
        .await
        .unwrap();
    let after: Value = response.json().await.unwrap();
    assert_eq!(after["checklist"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn search_by_date_range() {
    let h = Harness::start().await;
    h.create_task("soon", 2).await;
    h.create_task("later", 20).await;

    let from = h.stamp_in(TimeDelta::days(1));
    let to = h.stamp_in(TimeDelta::days(10));
    let response = h
        .client
        .get(h.url("/api/tasks/search"))
        .query(&[("from", from.as_str()), ("to", to.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let hits: Value = response.json().await.unwrap();
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["title"], "soon");

    let response = h
        .client
        .get(h.url("/api/tasks/search"))
        .query(&[("from", to.as_str()), ("to", from.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = h.get("/api/tasks/search?from=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn photo_upload_and_removal() {
    let h = Harness::start().await;
    let task = h.create_task("Trip", 8).await;
    let id = task["id"].as_str().unwrap();

    let response = h
        .client
        .post(h.url(&format!("/api/tasks/{id}/photos")))
        .query(&[("filename", "map.txt")])
        .body("not an image")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = h
        .client
        .post(h.url(&format!("/api/tasks/{id}/photos")))
        .query(&[("filename", "map.png")])
        .body(vec![1u8; 16])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let task: Value = response.json().await.unwrap();
    let reference = task["photos"][0].as_str().unwrap().to_owned();
    assert!(reference.starts_with("/photos/"));

    let response = h
        .client
        .post(h.url(&format!("/api/tasks/{id}/photos")))
        .query(&[("filename", "huge.png")])
        .body(vec![0u8; 4096])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = h
        .client
        .delete(h.url(&format!("/api/tasks/{id}/photos")))
        .query(&[("reference", reference.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.photos.purged(), vec![reference]);
}

#[tokio::test]
async fn incomplete_bodies_are_bad_requests() {
    let h = Harness::start().await;
    let task = h.create_task("Gala", 9).await;
    let id = task["id"].as_str().unwrap();
    let item_id = task["checklist"][0]["id"].as_str().unwrap();

    for path in [
        format!("/api/tasks/{id}/ready"),
        format!("/api/tasks/{id}/not-going"),
        format!("/api/tasks/{id}/checklist/{item_id}/toggle"),
    ] {
        let (status, body) = h.post(&path, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert!(body["error"].as_str().unwrap().contains("user_id"), "{path}");
    }

    let (status, body) = h.post("/api/users", json!({"telegram_id": 5})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("username"));

    let (status, body) = h
        .post("/api/users", json!({"telegram_id": 5, "username": " "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("username"));

    let response = h
        .client
        .post(h.url("/api/users"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    let (_, users) = h.get("/api/users").await;
    assert_eq!(users, json!([]));
}

#[tokio::test]
async fn task_creation_rejects_blank_creator_and_foreign_photos() {
    let h = Harness::start().await;
    let mut draft = json!({
        "title": "Fair",
        "event_date": h.stamp_in(TimeDelta::days(5)),
        "preparation_date": h.stamp_in(TimeDelta::days(2)),
        "created_by": 1,
        "created_by_username": "   ",
    });

    let (status, body) = h.post("/api/tasks", draft.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("created_by_username")
    );

    draft["created_by_username"] = json!("alice");
    draft["photos"] = json!(["/photos/not_mine.png"]);
    let (status, task) = h.post("/api/tasks", draft).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["photos"], json!([]));
}

#[tokio::test]
async fn persistence_failure_is_a_server_error() {
    let h = Harness::start().await;
    h.backend.set_fail_saves(true);
    let (status, body) = h
        .post(
            "/api/users",
            json!({"telegram_id": 1, "username": "kate", "first_name": "Kate"}),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("persistence"));

    h.backend.set_fail_saves(false);
    let (_, users) = h.get("/api/users").await;
    assert_eq!(users, json!([]));
}

#[tokio::test]
async fn server_shuts_down_gracefully() {
    let h = Harness::start().await;
    let addr = h.server.addr();
    h.server.shutdown().await;
    assert!(reqwest::get(format!("http://{addr}/health")).await.is_err());
}
