//! HTTP-level integration tests for the `/deployments` endpoints.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{body_json, get, post_json};
use serde_json::json;
use sqlx::PgPool;
use studyhub_storage::MemoryAssetStorage;
use uuid::Uuid;

const BUCKET: &str = "study-assets";

async fn create(pool: &PgPool, body: serde_json::Value) -> serde_json::Value {
    let app = common::build_test_app(pool.clone());
    let response = post_json(app, "/api/v1/deployments", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

fn rich_source(article_id: Uuid) -> serde_json::Value {
    json!({
        "name": "Heart study",
        "icon": { "bucket": BUCKET, "key": "icons/heart.png" },
        "learn": {
            "sections": [{
                "title": "Basics",
                "articles": [{
                    "id": article_id,
                    "title": "What is AF?",
                    "thumbnail": { "bucket": BUCKET, "key": "learn/af.png" }
                }]
            }]
        },
        "module_configs": [{
            "module_id": "BloodPressure",
            "about": "Measure twice a day",
            "learn_article_ids": [article_id]
        }],
        "key_actions": [{
            "title": "Read the basics",
            "learn_article_id": article_id
        }]
    })
}

// ---------------------------------------------------------------------------
// Create / retrieve
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_assigns_codes_and_draft_status(pool: PgPool) {
    let data = create(&pool, json!({ "name": "Sleep study" })).await;

    assert_eq!(data["name"], "Sleep study");
    assert_eq!(data["status"], "DRAFT");
    assert_eq!(data["version"], 0);
    assert_eq!(data["language"], "en");
    assert_eq!(data["user_activation_code"].as_str().unwrap().len(), 8);
    assert_eq!(data["manager_activation_code"].as_str().unwrap().len(), 8);
    assert_eq!(data["proxy_activation_code"].as_str().unwrap().len(), 8);

    let id = data["id"].as_str().unwrap();
    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/deployments/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["id"], id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_rejects_blank_name(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(app, "/api/v1/deployments", json!({ "name": "  " })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_rejects_key_action_with_two_references(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = json!({
        "name": "Study",
        "key_actions": [{
            "title": "Ambiguous",
            "learn_article_id": Uuid::now_v7(),
            "module_config_id": Uuid::now_v7()
        }]
    });
    let response = post_json(app, "/api/v1/deployments", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_get_missing_deployment_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/deployments/{}", Uuid::now_v7())).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Clone
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_clone_copies_assets_and_remaps_references(pool: PgPool) {
    let article_id = Uuid::now_v7();
    let source = create(&pool, rich_source(article_id)).await;
    let source_id = source["id"].as_str().unwrap().to_string();

    let storage = Arc::new(MemoryAssetStorage::new());
    storage.put(BUCKET, "icons/heart.png").await;
    storage.put(BUCKET, "learn/af.png").await;

    let app = common::build_test_app_with_storage(pool.clone(), storage.clone());
    let response = post_json(
        app,
        "/api/v1/deployments/clone",
        json!({ "reference_id": source_id, "name": "Heart study (copy)" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let clone_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(clone_id, source_id);

    assert_eq!(storage.copy_count(), 2);
    assert!(
        storage
            .contains(BUCKET, &format!("deployment/{clone_id}/icons/heart.png"))
            .await
    );
    assert!(
        storage
            .contains(BUCKET, &format!("deployment/{clone_id}/learn/af.png"))
            .await
    );

    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/deployments/{clone_id}")).await;
    let clone = body_json(response).await["data"].clone();

    assert_eq!(clone["name"], "Heart study (copy)");
    assert_eq!(clone["status"], "DRAFT");
    assert_eq!(clone["version"], 0);
    assert_ne!(
        clone["user_activation_code"],
        source["user_activation_code"]
    );

    let new_article_id = clone["learn"]["sections"][0]["articles"][0]["id"].clone();
    assert_ne!(new_article_id, json!(article_id));
    assert_eq!(
        clone["module_configs"][0]["learn_article_ids"],
        json!([new_article_id])
    );
    assert_eq!(clone["key_actions"][0]["learn_article_id"], new_article_id);
    assert_eq!(
        clone["icon"]["key"],
        format!("deployment/{clone_id}/icons/heart.png")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_clone_with_missing_icon_is_invalid_source(pool: PgPool) {
    let source = create(&pool, rich_source(Uuid::now_v7())).await;

    // Icon never uploaded.
    let storage = Arc::new(MemoryAssetStorage::new());
    storage.put(BUCKET, "learn/af.png").await;

    let app = common::build_test_app_with_storage(pool, storage.clone());
    let response = post_json(
        app,
        "/api/v1/deployments/clone",
        json!({ "reference_id": source["id"], "name": "Copy" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "INVALID_SOURCE");
    assert_eq!(storage.copy_count(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_clone_unknown_reference_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/deployments/clone",
        json!({ "reference_id": Uuid::now_v7(), "name": "Copy" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_clone_rejects_empty_name(pool: PgPool) {
    let source = create(&pool, json!({ "name": "Study" })).await;

    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/deployments/clone",
        json!({ "reference_id": source["id"], "name": "" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_clone_survives_transient_copy_failures(pool: PgPool) {
    let source = create(&pool, rich_source(Uuid::now_v7())).await;

    let storage = Arc::new(MemoryAssetStorage::new());
    storage.put(BUCKET, "icons/heart.png").await;
    storage.put(BUCKET, "learn/af.png").await;
    storage.fail_next_copies(2);

    let app = common::build_test_app_with_storage(pool, storage.clone());
    let response = post_json(
        app,
        "/api/v1/deployments/clone",
        json!({ "reference_id": source["id"], "name": "Copy" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(storage.copy_count(), 2);
}

// ---------------------------------------------------------------------------
// Localization
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_localizable_fields_lists_sorted_paths(pool: PgPool) {
    let source = create(&pool, rich_source(Uuid::now_v7())).await;
    let id = source["id"].as_str().unwrap();

    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/deployments/{id}/localizable-fields")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let paths: Vec<String> =
        serde_json::from_value(body_json(response).await["data"].clone()).unwrap();
    assert!(paths.contains(&"deployment.module_configs.about".to_string()));
    assert!(paths.windows(2).all(|w| w[0] < w[1]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_master_translation_and_locale_views(pool: PgPool) {
    let source = create(&pool, rich_source(Uuid::now_v7())).await;
    let id = source["id"].as_str().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/deployments/{id}/generate-master-translation"),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let saved = body_json(response).await["data"].clone();
    assert_eq!(saved["version"], 1);
    assert_eq!(saved["module_configs"][0]["about"], "hu_bloodpressure_about");
    assert_eq!(
        saved["localizations"]["en"]["hu_bloodpressure_about"],
        "Measure twice a day"
    );

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/deployments/{id}/localizations"),
        json!({
            "localizations": {
                "de": { "hu_bloodpressure_about": "Zweimal täglich messen" }
            }
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let tables = body_json(response).await["data"].clone();
    assert!(tables["en"].is_object());
    assert!(tables["de"].is_object());

    let app = common::build_test_app(pool.clone());
    let response = get(app, &format!("/api/v1/deployments/{id}?locale=de")).await;
    let german = body_json(response).await["data"].clone();
    assert_eq!(german["module_configs"][0]["about"], "Zweimal täglich messen");

    // Unknown locale falls back to the master table.
    let app = common::build_test_app(pool.clone());
    let response = get(app, &format!("/api/v1/deployments/{id}/localizations/fr")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["hu_bloodpressure_about"],
        "Measure twice a day"
    );

    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/deployments/{id}/localizations/de")).await;
    assert_eq!(
        body_json(response).await["data"]["hu_bloodpressure_about"],
        "Zweimal täglich messen"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_localization_without_tables_returns_404(pool: PgPool) {
    let source = create(&pool, json!({ "name": "Study" })).await;
    let id = source["id"].as_str().unwrap();

    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/deployments/{id}/localizations/de")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_locale_codes_are_rejected(pool: PgPool) {
    let source = create(&pool, json!({ "name": "Study" })).await;
    let id = source["id"].as_str().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/deployments/{id}/localizations"),
        json!({ "localizations": { "NOT A LOCALE": {} } }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/deployments/{id}?locale=E_N")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
