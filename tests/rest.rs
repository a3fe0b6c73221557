//! REST adapter integration tests.
//!
//! Drives the request handler the way an HTTP front-end would, covering
//! region, key and query resources.

mod common;

use common::*;
use serde_json::json;
use tessera::adapters::rest::{RestAdapter, RestRequest};

const CUSTOMER1: &str = r#"{"id":1,"firstName":"Jane","lastName":"Doe"}"#;
const CUSTOMER2: &str = r#"{"id":2,"firstName":"John","lastName":"Roe"}"#;

async fn seeded() -> RestAdapter {
    let rest = rest();
    for (key, body) in [("customer1", CUSTOMER1), ("customer2", CUSTOMER2)] {
        let resp = rest
            .handle(RestRequest::put(format!("/regionA/{key}"), body.to_string()))
            .await;
        assert_eq!(resp.http_code(), 200);
    }
    rest
}

// ============================================================================
// Regions
// ============================================================================

#[tokio::test]
async fn test_list_regions() {
    let rest = rest();
    let resp = rest.handle(RestRequest::get("")).await;
    assert_eq!(resp.http_code(), 200);
    assert_eq!(
        resp.body_json().unwrap(),
        json!({"regions": [{
            "name": "regionA",
            "type": "REPLICATE",
            "key-constraint": null,
            "value-constraint": null
        }]})
    );
}

#[tokio::test]
async fn test_empty_region_values() {
    let rest = rest();
    let resp = rest.handle(RestRequest::get("/regionA")).await;
    assert_eq!(resp.http_code(), 200);
    assert_eq!(resp.body_json().unwrap(), json!({"regionA": []}));
}

#[tokio::test]
async fn test_region_values_and_limit() {
    let rest = seeded().await;
    let resp = rest.handle(RestRequest::get("/regionA")).await;
    let body = resp.body_json().unwrap();
    assert_eq!(body["regionA"].as_array().unwrap().len(), 2);

    let resp = rest
        .handle(RestRequest::get("/regionA").with_query("limit", "1"))
        .await;
    assert_eq!(resp.body_json().unwrap()["regionA"].as_array().unwrap().len(), 1);

    let resp = rest
        .handle(RestRequest::get("/regionA").with_query("limit", "ALL"))
        .await;
    assert_eq!(resp.body_json().unwrap()["regionA"].as_array().unwrap().len(), 2);

    let resp = rest
        .handle(RestRequest::get("/regionA").with_query("limit", "lots"))
        .await;
    assert_eq!(resp.http_code(), 400);
}

#[tokio::test]
async fn test_clear_region() {
    let rest = seeded().await;
    let resp = rest.handle(RestRequest::delete("/regionA")).await;
    assert_eq!(resp.http_code(), 200);

    let resp = rest.handle(RestRequest::get("/regionA/keys")).await;
    assert_eq!(resp.body_json().unwrap(), json!({"keys": []}));
}

#[tokio::test]
async fn test_unknown_region() {
    let rest = rest();
    for req in [
        RestRequest::get("/regionB"),
        RestRequest::get("/regionB/k"),
        RestRequest::put("/regionB/k", "{}"),
        RestRequest::delete("/regionB"),
    ] {
        let resp = rest.handle(req).await;
        assert_eq!(resp.http_code(), 404);
        assert!(resp.body_json().unwrap()["cause"].is_string());
    }
}

// ============================================================================
// Keys
// ============================================================================

#[tokio::test]
async fn test_get_single_and_multiple_keys() {
    let rest = seeded().await;

    let resp = rest.handle(RestRequest::get("/regionA/customer1")).await;
    assert_eq!(resp.http_code(), 200);
    assert_eq!(resp.body.as_deref(), Some(CUSTOMER1));

    let resp = rest.handle(RestRequest::get("/regionA/keys")).await;
    assert_eq!(
        resp.body_json().unwrap(),
        json!({"keys": ["customer1", "customer2"]})
    );

    let resp = rest
        .handle(RestRequest::get("/regionA/customer2,missing,customer1"))
        .await;
    let body = resp.body_json().unwrap();
    let ids: Vec<i64> = body["regionA"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 1]);

    let resp = rest.handle(RestRequest::get("/regionA/missing")).await;
    assert_eq!(resp.http_code(), 404);
}

#[tokio::test]
async fn test_put_multiple_keys() {
    let rest = rest();
    let resp = rest
        .handle(RestRequest::put("/regionA/a,b", r#"[{"n":1},{"n":2}]"#))
        .await;
    assert_eq!(resp.http_code(), 200);
    let resp = rest.handle(RestRequest::get("/regionA/b")).await;
    assert_eq!(resp.body_json().unwrap(), json!({"n": 2}));

    let resp = rest
        .handle(RestRequest::put("/regionA/a,b,c", r#"[{"n":1}]"#))
        .await;
    assert_eq!(resp.http_code(), 400);
}

#[tokio::test]
async fn test_replace_requires_existing_key() {
    let rest = seeded().await;
    let resp = rest
        .handle(put_op("/regionA/customer3", "REPLACE", CUSTOMER1))
        .await;
    assert_eq!(resp.http_code(), 404);

    let resp = rest
        .handle(put_op("/regionA/customer1", "REPLACE", CUSTOMER2))
        .await;
    assert_eq!(resp.http_code(), 200);
    let resp = rest.handle(RestRequest::get("/regionA/customer1")).await;
    assert_eq!(resp.body.as_deref(), Some(CUSTOMER2));
}

#[tokio::test]
async fn test_compare_and_set() {
    let rest = seeded().await;
    let payload = format!(r#"{{"@old":{CUSTOMER1},"@new":{CUSTOMER2}}}"#);

    let resp = rest.handle(put_op("/regionA/customer1", "CAS", &payload)).await;
    assert_eq!(resp.http_code(), 200);
    let resp = rest.handle(RestRequest::get("/regionA/customer1")).await;
    assert_eq!(resp.body.as_deref(), Some(CUSTOMER2));

    // Expected value is now stale: the conflict body is the current value.
    let resp = rest.handle(put_op("/regionA/customer1", "CAS", &payload)).await;
    assert_eq!(resp.http_code(), 409);
    assert_eq!(resp.body.as_deref(), Some(CUSTOMER2));

    let resp = rest.handle(put_op("/regionA/customer9", "CAS", &payload)).await;
    assert_eq!(resp.http_code(), 200);
    let resp = rest.handle(RestRequest::get("/regionA/customer9")).await;
    assert_eq!(resp.http_code(), 404);

    let resp = rest
        .handle(put_op("/regionA/customer1", "CAS", CUSTOMER1))
        .await;
    assert_eq!(resp.http_code(), 400);
}

#[tokio::test]
async fn test_create_with_post() {
    let rest = rest();
    let resp = rest
        .handle(RestRequest::post("/regionA", CUSTOMER1).with_query("key", "customer1"))
        .await;
    assert_eq!(resp.http_code(), 201);

    let resp = rest
        .handle(RestRequest::post("/regionA", CUSTOMER2).with_query("key", "customer1"))
        .await;
    assert_eq!(resp.http_code(), 409);
    assert_eq!(resp.body.as_deref(), Some(CUSTOMER1));
}

#[tokio::test]
async fn test_delete_keys() {
    let rest = seeded().await;
    let resp = rest.handle(RestRequest::delete("/regionA/customer1")).await;
    assert_eq!(resp.http_code(), 200);
    let resp = rest.handle(RestRequest::delete("/regionA/customer1")).await;
    assert_eq!(resp.http_code(), 404);

    let resp = rest
        .handle(RestRequest::delete("/regionA/customer1,customer2"))
        .await;
    assert_eq!(resp.http_code(), 200);
    let resp = rest.handle(RestRequest::get("/regionA/keys")).await;
    assert_eq!(resp.body_json().unwrap(), json!({"keys": []}));
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn test_adhoc_query() {
    let rest = RestAdapter::new(engine_with_books());
    let resp = rest
        .handle(RestRequest::get("/queries/adhoc").with_query("q", PRICE_QUERY))
        .await;
    assert_eq!(resp.http_code(), 200);
    assert_eq!(sorted_numbers(&resp), PRICES_ABOVE_5.to_vec());

    let resp = rest
        .handle(RestRequest::get("/queries/adhoc").with_query("q", "SELECT FROM WHERE"))
        .await;
    assert_eq!(resp.http_code(), 400);

    let nested = format!(
        "SELECT * FROM /regionA e WHERE {}e.id = 1{}",
        "(".repeat(10_000),
        ")".repeat(10_000)
    );
    let resp = rest
        .handle(RestRequest::get("/queries/adhoc").with_query("q", nested))
        .await;
    assert_eq!(resp.http_code(), 400);
}

#[tokio::test]
async fn test_prepared_queries() {
    let rest = RestAdapter::new(engine_with_books());
    for i in 1..=5 {
        let resp = rest
            .handle(
                RestRequest::post("/queries", "")
                    .with_query("id", format!("Query{i}"))
                    .with_query("q", PRICE_QUERY_PARAM),
            )
            .await;
        assert_eq!(resp.http_code(), 201);
    }

    let resp = rest.handle(RestRequest::get("/queries")).await;
    let body = resp.body_json().unwrap();
    let queries = body["queries"].as_array().unwrap();
    assert_eq!(queries.len(), 5);
    assert_eq!(queries[0], json!({"id": "Query1", "oql": PRICE_QUERY_PARAM}));

    for i in 1..=5 {
        let resp = rest
            .handle(RestRequest::post(format!("/queries/Query{i}"), PRICE_PARAMS))
            .await;
        assert_eq!(resp.http_code(), 200);
        assert_eq!(sorted_numbers(&resp), PRICES_ABOVE_8_99.to_vec());
    }

    let resp = rest
        .handle(
            RestRequest::post("/queries", "")
                .with_query("id", "Query1")
                .with_query("q", PRICE_QUERY),
        )
        .await;
    assert_eq!(resp.http_code(), 409);

    let resp = rest.handle(RestRequest::delete("/queries/Query1")).await;
    assert_eq!(resp.http_code(), 200);
    let resp = rest
        .handle(RestRequest::post("/queries/Query1", PRICE_PARAMS))
        .await;
    assert_eq!(resp.http_code(), 404);

    let resp = rest
        .handle(RestRequest::post(
            "/queries/Query2",
            r#"[{"@type":"double","@value":"cheap"}]"#,
        ))
        .await;
    assert_eq!(resp.http_code(), 400);
}

#[tokio::test]
async fn test_ping() {
    let rest = rest();
    let resp = rest.handle(RestRequest::get("/ping")).await;
    assert_eq!(resp.http_code(), 200);
}
