//! REST adapter.
//!
//! Maps decoded HTTP requests onto the store and query service. Routes:
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET | `/` | region listing |
//! | GET | `/{region}` | all values (`?limit=N`) |
//! | GET | `/{region}/keys` | sorted keys |
//! | GET | `/{region}/{k}` or `/{region}/{k1,k2}` | single value or present values |
//! | PUT | `/{region}/{k}` | put, `?op=REPLACE`, `?op=CAS` |
//! | PUT | `/{region}/{k1,k2}` | pairwise put from a JSON array |
//! | POST | `/{region}?key=K` | create if absent |
//! | DELETE | `/{region}`, `/{region}/{k}`, `/{region}/{k1,k2}` | clear or remove |
//! | GET | `/queries` | prepared query listing |
//! | POST | `/queries?id=&q=` | define |
//! | DELETE | `/queries/{id}` | undefine |
//! | GET | `/queries/adhoc?q=` | ad hoc query |
//! | POST | `/queries/{id}` | run prepared query with typed parameters |
//! | GET | `/ping` | liveness |

mod request;

pub use request::{Method, RestRequest, RestResponse};

use crate::core::error::{StatusKind, TesseraError, TesseraResult};
use crate::engine::Engine;
use crate::query::parse_params;
use crate::store::cas::WriteRequest;
use crate::store::document::Document;
use crate::store::entry::Value;
use crate::store::region::RegionSpec;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const QUERIES: &str = "queries";
const ADHOC: &str = "adhoc";
const KEYS: &str = "keys";

#[derive(Serialize)]
struct RegionListing<'a> {
    regions: Vec<&'a RegionSpec>,
}

#[derive(Serialize)]
struct KeyListing {
    keys: Vec<String>,
}

#[derive(Serialize)]
struct QueryList {
    queries: Vec<crate::query::QueryListing>,
}

/// Request handler for an external HTTP front-end.
#[derive(Debug, Clone)]
pub struct RestAdapter {
    engine: Arc<Engine>,
}

impl RestAdapter {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Handle one request. Every failure becomes an error response.
    pub async fn handle(&self, request: RestRequest) -> RestResponse {
        let response = match self.route(&request).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_validation_error() {
                    tracing::debug!(error = %e, "rest request rejected before store access");
                } else if matches!(e, TesseraError::Timeout { .. } | TesseraError::Internal { .. }) {
                    tracing::warn!(error = %e, path = %request.path, "rest request failed");
                }
                RestResponse::error(&e)
            }
        };
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = %response.status,
            "rest request"
        );
        response
    }

    async fn route(&self, req: &RestRequest) -> TesseraResult<RestResponse> {
        let segments = req.segments();
        match (req.method, segments.as_slice()) {
            (Method::Get, []) => self.list_regions(),
            (Method::Get, ["ping"]) => Ok(RestResponse::ok()),

            (Method::Get, [QUERIES]) => self.list_queries(),
            (Method::Post, [QUERIES]) => self.define_query(req),
            (Method::Get, [QUERIES, ADHOC]) => self.adhoc_query(req),
            (Method::Post, [QUERIES, id]) => self.run_query(id, req),
            (Method::Delete, [QUERIES, id]) => {
                self.engine.queries().undefine(id)?;
                Ok(RestResponse::ok())
            }

            (Method::Get, [region]) => self.region_values(region, req),
            (Method::Get, [region, KEYS]) => {
                let keys = self.engine.catalog().region(region)?.list_keys();
                Ok(RestResponse::json(StatusKind::Ok, &KeyListing { keys }))
            }
            (Method::Get, [region, keys]) => self.get_keys(region, keys),
            (Method::Put, [region, keys]) => self.put_keys(region, keys, req).await,
            (Method::Post, [region]) => self.create(region, req).await,
            (Method::Delete, [region]) => {
                let removed = self.engine.catalog().region(region)?.clear();
                tracing::info!(region = %region, removed, "region cleared");
                Ok(RestResponse::ok())
            }
            (Method::Delete, [region, keys]) => self.delete_keys(region, keys).await,

            (method, _) => Err(TesseraError::malformed(format!(
                "unsupported request: {} {}",
                method, req.path
            ))),
        }
    }

    fn list_regions(&self) -> TesseraResult<RestResponse> {
        let regions = self.engine.catalog().regions();
        let listing = RegionListing {
            regions: regions.iter().map(|r| r.spec()).collect(),
        };
        Ok(RestResponse::json(StatusKind::Ok, &listing))
    }

    fn region_values(&self, name: &str, req: &RestRequest) -> TesseraResult<RestResponse> {
        let region = self.engine.catalog().region(name)?;
        let limit = match req.param("limit") {
            None => None,
            Some(l) if l.eq_ignore_ascii_case("ALL") => None,
            Some(l) => Some(l.parse::<usize>().map_err(|_| {
                TesseraError::malformed(format!("limit must be a non-negative integer: {}", l))
            })?),
        };

        let values: Vec<Document> = region
            .values()
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(Value::to_document)
            .collect();
        Ok(region_body(name, values))
    }

    fn get_keys(&self, name: &str, keys: &str) -> TesseraResult<RestResponse> {
        let region = self.engine.catalog().region(name)?;
        if !keys.contains(',') {
            let entry = region.get(keys)?;
            return Ok(RestResponse::new(
                StatusKind::Ok,
                Some(entry.value.to_document().to_json()),
            ));
        }

        let values = region
            .get_all(&split_keys(keys))
            .iter()
            .map(|e| e.value.to_document())
            .collect();
        Ok(region_body(name, values))
    }

    async fn put_keys(&self, name: &str, keys: &str, req: &RestRequest) -> TesseraResult<RestResponse> {
        let coordinator = self.engine.catalog().coordinator(name)?;
        let document = parse_body(&req.body)?;

        if keys.contains(',') {
            let keys = split_keys(keys);
            let Document::Array(values) = document else {
                return Err(TesseraError::malformed("multi-key put requires a JSON array body"));
            };
            if values.len() != keys.len() {
                return Err(TesseraError::malformed(format!(
                    "{} keys but {} values",
                    keys.len(),
                    values.len()
                )));
            }
            for (key, value) in keys.into_iter().zip(values) {
                coordinator
                    .write(WriteRequest::put(key, Value::Document(value)))
                    .await?;
            }
            return Ok(RestResponse::ok());
        }

        let request = match req.param("op").map(str::to_ascii_uppercase).as_deref() {
            None | Some("PUT") => WriteRequest::put(keys, Value::Document(document)),
            Some("REPLACE") => WriteRequest::replace(keys, Value::Document(document)),
            Some("CAS") => WriteRequest::from_cas_payload(keys, document)?,
            Some(other) => {
                return Err(TesseraError::malformed(format!("unsupported op: {}", other)));
            }
        };

        let outcome = coordinator.write(request).await?;
        outcome.into_result(keys)?;
        Ok(RestResponse::ok())
    }

    async fn create(&self, name: &str, req: &RestRequest) -> TesseraResult<RestResponse> {
        let coordinator = self.engine.catalog().coordinator(name)?;
        let key = req
            .param("key")
            .filter(|k| !k.is_empty())
            .ok_or_else(|| TesseraError::malformed("missing key parameter"))?;
        let value = Value::Document(parse_body(&req.body)?);

        coordinator
            .write(WriteRequest::create(key, value))
            .await?
            .into_result(key)?;
        Ok(RestResponse::created())
    }

    async fn delete_keys(&self, name: &str, keys: &str) -> TesseraResult<RestResponse> {
        let coordinator = self.engine.catalog().coordinator(name)?;
        if keys.contains(',') {
            let removed = coordinator.remove_all(&split_keys(keys)).await?;
            tracing::debug!(region = %name, removed, "keys removed");
        } else {
            coordinator.remove(keys).await?;
        }
        Ok(RestResponse::ok())
    }

    fn list_queries(&self) -> TesseraResult<RestResponse> {
        let queries = self.engine.queries().list();
        Ok(RestResponse::json(StatusKind::Ok, &QueryList { queries }))
    }

    fn define_query(&self, req: &RestRequest) -> TesseraResult<RestResponse> {
        let id = req
            .param("id")
            .ok_or_else(|| TesseraError::malformed("missing id parameter"))?;
        let text = match req.param("q") {
            Some(q) => q.to_string(),
            None => std::str::from_utf8(&req.body)
                .map_err(|_| TesseraError::malformed("query text must be UTF-8"))?
                .trim()
                .to_string(),
        };
        if text.is_empty() {
            return Err(TesseraError::malformed("missing q parameter"));
        }

        self.engine.queries().define(id, &text)?;
        Ok(RestResponse::created())
    }

    fn adhoc_query(&self, req: &RestRequest) -> TesseraResult<RestResponse> {
        let text = req
            .param("q")
            .ok_or_else(|| TesseraError::malformed("missing q parameter"))?;
        let rows = self.engine.query(text)?;
        Ok(RestResponse::json(StatusKind::Ok, &rows))
    }

    fn run_query(&self, id: &str, req: &RestRequest) -> TesseraResult<RestResponse> {
        let params = parse_params(&req.body)?;
        let rows = self.engine.execute(id, &params)?;
        Ok(RestResponse::json(StatusKind::Ok, &rows))
    }
}

fn split_keys(keys: &str) -> Vec<&str> {
    keys.split(',').filter(|k| !k.is_empty()).collect()
}

fn parse_body(body: &[u8]) -> TesseraResult<Document> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(TesseraError::malformed("request body is empty"));
    }
    Document::from_json(body).map_err(|e| TesseraError::malformed(format!("invalid JSON body: {}", e)))
}

/// `{"<region>": [values...]}`
fn region_body(name: &str, values: Vec<Document>) -> RestResponse {
    let mut body = BTreeMap::new();
    body.insert(name, values);
    RestResponse::json(StatusKind::Ok, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> RestAdapter {
        let engine = Engine::default();
        engine
            .catalog()
            .create_region(RegionSpec::new("regionA"))
            .unwrap();
        RestAdapter::new(Arc::new(engine))
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let rest = adapter();
        let resp = rest.handle(RestRequest::put("/regionA/k", r#"{"a":1}"#)).await;
        assert_eq!(resp, RestResponse::ok());

        let resp = rest.handle(RestRequest::get("/regionA/k")).await;
        assert_eq!(resp.body.as_deref(), Some(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_unknown_region_is_not_found() {
        let rest = adapter();
        let resp = rest.handle(RestRequest::get("/nope")).await;
        assert_eq!(resp.http_code(), 404);
    }

    #[tokio::test]
    async fn test_invalid_body_and_op() {
        let rest = adapter();
        let resp = rest.handle(RestRequest::put("/regionA/k", "{not json")).await;
        assert_eq!(resp.http_code(), 400);
        let resp = rest
            .handle(RestRequest::put("/regionA/k", "{}").with_query("op", "MERGE"))
            .await;
        assert_eq!(resp.http_code(), 400);
        let resp = rest.handle(RestRequest::post("/regionA", "{}")).await;
        assert_eq!(resp.http_code(), 400);
    }

    #[tokio::test]
    async fn test_limit_parameter() {
        let rest = adapter();
        for k in ["a", "b", "c"] {
            rest.handle(RestRequest::put(format!("/regionA/{k}"), "1")).await;
        }
        let resp = rest
            .handle(RestRequest::get("/regionA").with_query("limit", "2"))
            .await;
        assert_eq!(resp.body.as_deref(), Some(r#"{"regionA":[1,1]}"#));
        let resp = rest
            .handle(RestRequest::get("/regionA").with_query("limit", "x"))
            .await;
        assert_eq!(resp.http_code(), 400);
    }

    #[tokio::test]
    async fn test_multi_key_put_length_mismatch() {
        let rest = adapter();
        let resp = rest.handle(RestRequest::put("/regionA/a,b", "[1]")).await;
        assert_eq!(resp.http_code(), 400);
        let resp = rest.handle(RestRequest::put("/regionA/a,b", "[1,2]")).await;
        assert!(resp.is_success());
        let resp = rest.handle(RestRequest::get("/regionA/a,b,zz")).await;
        assert_eq!(resp.body.as_deref(), Some(r#"{"regionA":[1,2]}"#));
    }

    #[tokio::test]
    async fn test_ping_and_unsupported() {
        let rest = adapter();
        assert!(rest.handle(RestRequest::get("/ping")).await.is_success());
        let resp = rest.handle(RestRequest::post("/regionA/a/b", "")).await;
        assert_eq!(resp.http_code(), 400);
    }
}
