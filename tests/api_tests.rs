use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use serde_json::{json, Value};
use tempfile::TempDir;

use scrumboard_be::config::AppConfig;
use scrumboard_be::configure_api;
use scrumboard_be::handlers::auth::issue_token;
use scrumboard_be::repository::{MemoryRepository, Repository};
use scrumboard_be::services::BoardRegistry;

struct TestContext {
    _upload_dir: TempDir,
    repository: Arc<MemoryRepository>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    admin_token: String,
    user_token: String,
}

async fn setup() -> TestContext {
    let upload_dir = tempfile::tempdir().unwrap();
    let config = AppConfig::for_tests(upload_dir.path().to_str().unwrap());

    let repository = Arc::new(MemoryRepository::new());
    let admin = repository
        .upsert_user("admin", "Administrador", &bcrypt::hash("admin123", 4).unwrap(), true)
        .await
        .unwrap();
    let user = repository
        .upsert_user("maria", "Maria", &bcrypt::hash("maria123", 4).unwrap(), false)
        .await
        .unwrap();

    let registry = BoardRegistry::load(repository.clone()).await.unwrap();

    TestContext {
        admin_token: issue_token(&admin, &config).unwrap(),
        user_token: issue_token(&user, &config).unwrap(),
        _upload_dir: upload_dir,
        repository,
        registry: web::Data::new(registry),
        config: web::Data::new(config),
    }
}

macro_rules! init_app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .app_data($ctx.registry.clone())
                .app_data($ctx.config.clone())
                .configure(configure_api),
        )
        .await
    };
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

macro_rules! create_card {
    ($app:expr, $token:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/scrumboard/cards")
            .insert_header(bearer($token))
            .set_json($body)
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["data"].clone()
    }};
}

fn column_ids(view: &Value, board: &str) -> Vec<String> {
    view["data"]["columns"][board]
        .as_array()
        .map(|cards| {
            cards
                .iter()
                .map(|c| c["id"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[actix_web::test]
async fn test_login_and_me() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "maria", "password": "maria123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["username"], "maria");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "maria", "password": "wrong" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_requests_without_token_are_rejected() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get().uri("/api/scrumboard/board").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_unknown_variant_is_not_found() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/cartorio/board")
        .insert_header(bearer(&ctx.user_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_seeded_board_view() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/registro-civil/board")
        .insert_header(bearer(&ctx.user_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body["data"]["ordered"],
        json!(["A Fazer", "Em Andamento", "Em Revisão"])
    );
    assert_eq!(body["data"]["variant"], "registro-civil");
}

#[actix_web::test]
async fn test_create_and_drag_card_between_boards() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let first = create_card!(app, &ctx.user_token, json!({ "name": "Primeira" }));
    let second = create_card!(app, &ctx.user_token, json!({ "name": "Segunda" }));
    assert_eq!(first["board"], "A Fazer");
    assert_eq!(second["position"], 1);
    assert_eq!(first["projectId"], "SB-1");

    let req = test::TestRequest::post()
        .uri(&format!("/api/scrumboard/cards/{}/move", first["id"].as_str().unwrap()))
        .insert_header(bearer(&ctx.user_token))
        .set_json(json!({
            "source": { "board": "A Fazer", "index": 0 },
            "destination": { "type": "board", "board": "Em Andamento", "index": 0 }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/scrumboard/board")
        .insert_header(bearer(&ctx.user_token))
        .to_request();
    let view: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(column_ids(&view, "A Fazer"), vec![second["id"].as_str().unwrap()]);
    assert_eq!(column_ids(&view, "Em Andamento"), vec![first["id"].as_str().unwrap()]);
    assert_eq!(view["data"]["columns"]["A Fazer"][0]["position"], 0);
}

#[actix_web::test]
async fn test_stale_drag_source_conflicts() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let card = create_card!(app, &ctx.user_token, json!({ "name": "Card" }));
    let req = test::TestRequest::post()
        .uri(&format!("/api/scrumboard/cards/{}/move", card["id"].as_str().unwrap()))
        .insert_header(bearer(&ctx.user_token))
        .set_json(json!({
            "source": { "board": "Em Revisão", "index": 0 },
            "destination": { "type": "board", "board": "Em Andamento", "index": 0 }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_trash_and_restore_card() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let card = create_card!(app, &ctx.user_token, json!({ "name": "Descartável", "board": "Em Revisão" }));
    let id = card["id"].as_str().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/scrumboard/cards/{}/move", id))
        .insert_header(bearer(&ctx.user_token))
        .set_json(json!({ "destination": { "type": "trash" } }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["board"], "Lixeira");
    assert_eq!(body["data"]["lastActiveBoard"], "Em Revisão");

    let req = test::TestRequest::post()
        .uri(&format!("/api/scrumboard/cards/{}/restore", id))
        .insert_header(bearer(&ctx.user_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["board"], "Em Revisão");
}

#[actix_web::test]
async fn test_complete_card_moves_it_to_finalized_column() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let card = create_card!(app, &ctx.user_token, json!({ "name": "Entrega" }));
    let req = test::TestRequest::post()
        .uri(&format!("/api/scrumboard/cards/{}/complete", card["id"].as_str().unwrap()))
        .insert_header(bearer(&ctx.user_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["board"], "Concluídas");
    assert!(body["data"]["completedAt"].is_string());

    let req = test::TestRequest::get()
        .uri("/api/scrumboard/dashboard")
        .insert_header(bearer(&ctx.user_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_invalid_field_value_reports_field_errors() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/scrumboard/cards")
        .insert_header(bearer(&ctx.user_token))
        .set_json(json!({ "name": "Card", "fields": { "prioridade": "Urgente" } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["prioridade"].is_string());
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/scrumboard/cards")
        .insert_header(bearer(&ctx.user_token))
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_storage_outage_rolls_back_mutation() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let card = create_card!(app, &ctx.user_token, json!({ "name": "Estável" }));
    ctx.repository.set_offline(true);

    let req = test::TestRequest::post()
        .uri(&format!("/api/scrumboard/cards/{}/move", card["id"].as_str().unwrap()))
        .insert_header(bearer(&ctx.user_token))
        .set_json(json!({ "board": "Em Andamento", "index": 0 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    ctx.repository.set_offline(false);
    let req = test::TestRequest::get()
        .uri(&format!("/api/scrumboard/cards/{}", card["id"].as_str().unwrap()))
        .insert_header(bearer(&ctx.user_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["board"], "A Fazer");
    assert_eq!(body["data"]["version"], card["version"]);
}

#[actix_web::test]
async fn test_only_admins_manage_board_members() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/scrumboard/boards/A%20Fazer/members")
        .insert_header(bearer(&ctx.user_token))
        .set_json(json!({ "username": "maria" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/scrumboard/boards/A%20Fazer/members")
        .insert_header(bearer(&ctx.admin_token))
        .set_json(json!({ "username": "maria" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], json!(["maria"]));
}

#[actix_web::test]
async fn test_protected_field_cannot_be_deleted() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::delete()
        .uri("/api/scrumboard/fields/name")
        .insert_header(bearer(&ctx.admin_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/scrumboard/form-schema")
        .insert_header(bearer(&ctx.user_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["data"].as_array().is_some_and(|fields| !fields.is_empty()));
}

#[actix_web::test]
async fn test_upload_and_download_attachment() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let card = create_card!(app, &ctx.user_token, json!({ "name": "Com anexo" }));
    let id = card["id"].as_str().unwrap();

    let boundary = "scrumboardtestboundary";
    let payload = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"certidao.txt\"\r\nContent-Type: text/plain\r\n\r\nconteudo do arquivo\r\n--{b}--\r\n",
        b = boundary
    );
    let req = test::TestRequest::post()
        .uri(&format!("/api/scrumboard/cards/{}/attachments", id))
        .insert_header(bearer(&ctx.user_token))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let url = body["data"]["url"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["mimeType"], "text/plain");

    let req = test::TestRequest::get()
        .uri(&url)
        .insert_header(bearer(&ctx.user_token))
        .to_request();
    let bytes = test::call_and_read_body(&app, req).await;
    assert_eq!(&bytes[..], b"conteudo do arquivo");
}

#[actix_web::test]
async fn test_health_reports_storage() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["storage"], "memory");
    assert_eq!(body["data"]["stats"]["users"], 2);
}

#[actix_web::test]
async fn test_route_segments_cannot_name_boards_or_fields() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    for name in ["order", "colors"] {
        let req = test::TestRequest::post()
            .uri("/api/scrumboard/boards")
            .insert_header(bearer(&ctx.admin_token))
            .set_json(json!({ "name": name }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    let req = test::TestRequest::post()
        .uri("/api/scrumboard/fields")
        .insert_header(bearer(&ctx.admin_token))
        .set_json(json!({ "fieldName": "order", "nome": "Pedido", "tipo": "text" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // the fixed route keeps working
    let req = test::TestRequest::put()
        .uri("/api/scrumboard/boards/order")
        .insert_header(bearer(&ctx.admin_token))
        .set_json(json!({ "ordered": ["Em Revisão", "Em Andamento", "A Fazer"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_board_member_must_have_an_account() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/scrumboard/boards/A%20Fazer/members")
        .insert_header(bearer(&ctx.admin_token))
        .set_json(json!({ "username": "fantasma" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/api/scrumboard/boards/A%20Fazer/members")
        .insert_header(bearer(&ctx.admin_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], json!([]));
}
