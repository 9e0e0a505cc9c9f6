//! Integration tests for `HttpCatalogBackend`.
//!
//! Each test stands up a local `wiremock` server, so no real network
//! traffic is made. Covers every endpoint, status mapping and the retry
//! policy (idempotent requests retry, POST never does).

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vitrina_client::{
    CatalogBackend, CatalogListing, CatalogSession, ClientError, HttpCatalogBackend,
};
use vitrina_core::{
    CustomProductDraft, OverlayResolver, OverrideRecord, PriceValue, ProductRef, PLACEHOLDER_NAME,
};

/// 5-second timeout, no retries.
fn test_backend(server: &MockServer) -> HttpCatalogBackend {
    HttpCatalogBackend::new(&server.uri(), 5, "vitrina-test/0.1", None, 0, 0)
        .expect("failed to build test backend")
}

fn test_backend_with_retries(server: &MockServer, max_retries: u32) -> HttpCatalogBackend {
    HttpCatalogBackend::new(&server.uri(), 5, "vitrina-test/0.1", None, max_retries, 0)
        .expect("failed to build test backend")
}

fn product_json(id: u64, price: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("Producto {id}"),
        "price": price,
        "regular_price": price,
        "sale_price": "",
        "images": [{"id": 1, "src": format!("https://cdn.test/{id}.jpg"), "alt": ""}],
        "stock_status": "instock"
    })
}

// ---------------------------------------------------------------------------
// reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_product_decodes_source_product() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json(12, "80.000")))
        .expect(1)
        .mount(&server)
        .await;

    let product = test_backend(&server).get_product(12).await.unwrap();
    assert_eq!(product.id, 12);
    assert_eq!(product.price, Some(PriceValue::Raw("80.000".to_owned())));
    assert_eq!(product.images.len(), 1);
}

#[tokio::test]
async fn list_catalog_products_accepts_records_and_bare_sources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalogs/7/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"product_id": 12, "catalog_price": 90000, "product": product_json(12, "100.000")},
            product_json(13, "5000"),
        ])))
        .mount(&server)
        .await;

    let listing = test_backend(&server)
        .list_catalog_products(7)
        .await
        .unwrap();
    assert_eq!(listing.len(), 2);
    assert!(matches!(&listing[0], CatalogListing::Record(r) if r.product.is_some()));
    assert!(matches!(&listing[1], CatalogListing::Source(s) if s.id == 13));
}

#[tokio::test]
async fn bearer_token_is_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/12"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json(12, "1")))
        .expect(1)
        .mount(&server)
        .await;

    let backend =
        HttpCatalogBackend::new(&server.uri(), 5, "vitrina-test/0.1", Some("s3cret"), 0, 0)
            .unwrap();
    backend.get_product(12).await.unwrap();
}

// ---------------------------------------------------------------------------
// writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn put_catalog_product_sends_only_set_override_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/catalogs/7/products/12"))
        .and(body_json(json!({"catalog_price": 80000.0, "catalog_name": "Camisa"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let overrides = OverrideRecord {
        catalog_price: Some(PriceValue::Numeric(80_000.0)),
        catalog_name: Some("Camisa".to_owned()),
        ..OverrideRecord::default()
    };
    test_backend(&server)
        .put_catalog_product(7, 12, &overrides)
        .await
        .unwrap();
}

#[tokio::test]
async fn create_custom_product_returns_persisted_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/catalogs/7/custom-products"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 501,
            "name": "Kit regalo",
            "price": 45000
        })))
        .expect(1)
        .mount(&server)
        .await;

    let draft = CustomProductDraft {
        name: "Kit regalo".to_owned(),
        price: PriceValue::Numeric(45_000.0),
        ..CustomProductDraft::default()
    };
    let created = test_backend(&server)
        .create_custom_product(7, &draft)
        .await
        .unwrap();
    assert_eq!(created.id, ProductRef::Custom(501));
    assert_eq!(created.name, "Kit regalo");
}

#[tokio::test]
async fn update_custom_product_puts_draft_to_custom_path() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/catalogs/7/custom-products/501"))
        .and(body_json(json!({
            "name": "Kit navideño",
            "price": 50000.0,
            "sku": null,
            "description": null,
            "short_description": null,
            "image": null,
            "images": []
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let draft = CustomProductDraft {
        name: "Kit navideño".to_owned(),
        price: PriceValue::Numeric(50_000.0),
        ..CustomProductDraft::default()
    };
    test_backend(&server)
        .update_custom_product(7, 501, &draft)
        .await
        .unwrap();
}

#[tokio::test]
async fn create_catalog_posts_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/catalogs"))
        .and(body_json(json!({"name": "Temporada"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7, "name": "Temporada"})))
        .expect(1)
        .mount(&server)
        .await;

    let created = test_backend(&server).create_catalog("Temporada").await.unwrap();
    assert_eq!(created.id, 7);
}

#[tokio::test]
async fn delete_endpoints_use_membership_and_custom_paths() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/catalogs/7/products/12"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/catalogs/7/custom-products/501"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    backend.delete_catalog_product(7, 12).await.unwrap();
    backend.delete_custom_product(7, 501).await.unwrap();
}

// ---------------------------------------------------------------------------
// status mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = test_backend(&server).get_product(404).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound { .. }), "got: {err:?}");
}

#[tokio::test]
async fn server_error_maps_to_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalogs/7/products"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_backend(&server)
        .list_catalog_products(7)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClientError::UnexpectedStatus { status: 503, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn malformed_body_maps_to_deserialize() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/12"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = test_backend(&server).get_product(12).await.unwrap_err();
    assert!(matches!(err, ClientError::Deserialize { .. }), "got: {err:?}");
}

#[tokio::test]
async fn rate_limit_reports_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/12"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "17"))
        .mount(&server)
        .await;

    let err = test_backend(&server).get_product(12).await.unwrap_err();
    assert!(
        matches!(
            err,
            ClientError::RateLimited {
                retry_after_secs: 17
            }
        ),
        "got: {err:?}"
    );
}

// ---------------------------------------------------------------------------
// retry policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn idempotent_request_retries_after_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/catalogs/7/products/12"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/catalogs/7/products/12"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    test_backend_with_retries(&server, 2)
        .put_catalog_product(7, 12, &OverrideRecord::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn post_is_never_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/catalogs"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_backend_with_retries(&server, 3)
        .create_catalog("Temporada")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RateLimited { .. }));
}

// ---------------------------------------------------------------------------
// session over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn session_load_turns_failed_lookups_into_placeholders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalogs/7/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"product_id": 12, "catalog_price": "COP 90.000"},
            {"product_id": 404},
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json(12, "100.000")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let session = CatalogSession::load(
        test_backend(&server),
        7,
        "Temporada",
        OverlayResolver::default(),
    )
    .await
    .unwrap();

    let views = session.list_view_products().await;
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].price, 90_000.0);
    assert_eq!(views[0].original_price, 100_000.0);
    assert!(views[0].has_price_override());
    assert_eq!(views[0].image, "https://cdn.test/12.jpg");
    assert!(views[1].is_placeholder);
    assert_eq!(views[1].name, PLACEHOLDER_NAME);
}

#[tokio::test]
async fn session_override_of_custom_product_never_touches_membership_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalogs/7/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            product_json(501, "100.000"),
            {"product_id": 0, "id": 501, "catalog_name": "Kit", "catalog_price": 45000},
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/catalogs/7/custom-products/501"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/catalogs/7/products/501"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = CatalogSession::load(
        test_backend(&server),
        7,
        "Temporada",
        OverlayResolver::default(),
    )
    .await
    .unwrap();
    assert_eq!(session.list_view_products().await.len(), 2);

    let patch = OverrideRecord {
        catalog_price: Some(PriceValue::Numeric(40_000.0)),
        ..OverrideRecord::default()
    };
    session
        .add_override(ProductRef::Custom(501), patch)
        .await
        .unwrap();

    let views = session.list_view_products().await;
    assert_eq!(views[0].price, 100_000.0);
    assert_eq!(views[1].price, 40_000.0);
}
