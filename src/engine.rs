//! Store engine: the region catalog together with the query service.
//!
//! Both protocol adapters share one `Engine` behind an `Arc`.

use crate::core::config::Config;
use crate::core::error::TesseraResult;
use crate::query::QueryService;
use crate::store::catalog::Catalog;
use crate::store::document::Document;

/// Regions, memory accounting and prepared queries for one process.
#[derive(Debug, Default)]
pub struct Engine {
    catalog: Catalog,
    queries: QueryService,
}

impl Engine {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            queries: QueryService::new(),
        }
    }

    /// Build an engine and create every region the configuration declares.
    pub fn from_config(config: &Config) -> TesseraResult<Self> {
        let catalog = Catalog::new(
            config.server.lock_timeout(),
            config.server.lock_sweep_threshold,
        );
        for spec in config.region_specs() {
            catalog.create_region(spec)?;
        }
        Ok(Self::new(catalog))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn queries(&self) -> &QueryService {
        &self.queries
    }

    /// Run an ad hoc query against the catalog.
    pub fn query(&self, text: &str) -> TesseraResult<Vec<Document>> {
        self.queries.execute_adhoc(&self.catalog, text)
    }

    /// Run a prepared query against the catalog.
    pub fn execute(&self, id: &str, params: &[Document]) -> TesseraResult<Vec<Document>> {
        self.queries.execute_defined(&self.catalog, id, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::entry::Value;
    use std::time::Duration;

    #[test]
    fn test_from_config_creates_regions() {
        let config = Config::from_toml(
            r#"
            [server]
            lock_timeout_ms = 250

            [[regions]]
            name = "orders"

            [listeners.redis]
            bind = "127.0.0.1:0"
            region = "cache"
            "#,
        )
        .unwrap();
        let engine = Engine::from_config(&config).unwrap();
        let names: Vec<_> = engine
            .catalog()
            .regions()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["cache", "orders"]);
        assert_eq!(engine.catalog().lock_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_query_through_engine() {
        let engine = Engine::default();
        let region = engine
            .catalog()
            .create_region(crate::store::RegionSpec::new("people"))
            .unwrap();
        region.put("1", Value::from_json(br#"{"age":30}"#).unwrap());
        region.put("2", Value::from_json(br#"{"age":12}"#).unwrap());

        let rows = engine.query("SELECT e.age FROM /people e WHERE e.age > 18").unwrap();
        assert_eq!(rows, vec![Document::Int(30)]);

        engine
            .queries()
            .define("adults", "SELECT e.age FROM /people e WHERE e.age >= $1")
            .unwrap();
        let rows = engine.execute("adults", &[Document::Int(10)]).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
