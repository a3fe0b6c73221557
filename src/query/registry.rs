//! Prepared query registry.

use super::ast::Query;
use super::parser::parse;
use crate::core::error::{TesseraError, TesseraResult};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named, parsed query.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    pub id: String,
    pub text: String,
    pub query: Query,
    pub parameter_count: usize,
}

/// Listing row for a prepared query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryListing {
    pub id: String,
    pub oql: String,
}

/// Prepared queries keyed by id.
#[derive(Debug, Default)]
pub struct QueryRegistry {
    queries: RwLock<BTreeMap<String, Arc<PreparedQuery>>>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register a query.
    ///
    /// Nothing is registered when the text fails to parse.
    pub fn define(&self, id: &str, text: &str) -> TesseraResult<Arc<PreparedQuery>> {
        if id.is_empty() {
            return Err(TesseraError::malformed("query id must not be empty"));
        }
        let query = parse(text)?;

        let mut queries = self.queries.write();
        if queries.contains_key(id) {
            return Err(TesseraError::QueryAlreadyExists { id: id.to_string() });
        }

        let prepared = Arc::new(PreparedQuery {
            id: id.to_string(),
            text: text.to_string(),
            parameter_count: query.parameter_count(),
            query,
        });
        queries.insert(id.to_string(), Arc::clone(&prepared));
        tracing::debug!(id = %id, params = prepared.parameter_count, "query defined");
        Ok(prepared)
    }

    pub fn undefine(&self, id: &str) -> TesseraResult<Arc<PreparedQuery>> {
        self.queries
            .write()
            .remove(id)
            .ok_or_else(|| TesseraError::UnknownQuery { id: id.to_string() })
    }

    pub fn get(&self, id: &str) -> TesseraResult<Arc<PreparedQuery>> {
        self.queries
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| TesseraError::UnknownQuery { id: id.to_string() })
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<String> {
        self.queries.read().keys().cloned().collect()
    }

    /// `{id, oql}` rows ordered by id.
    pub fn list(&self) -> Vec<QueryListing> {
        self.queries
            .read()
            .values()
            .map(|q| QueryListing {
                id: q.id.clone(),
                oql: q.text.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_get_undefine() {
        let registry = QueryRegistry::new();
        let q = registry
            .define("q1", "SELECT * FROM /r e WHERE e.a = $1 AND e.b = $2")
            .unwrap();
        assert_eq!(q.parameter_count, 2);
        assert!(matches!(
            registry.define("q1", "SELECT * FROM r"),
            Err(TesseraError::QueryAlreadyExists { .. })
        ));

        assert_eq!(registry.get("q1").unwrap().text, q.text);
        registry.undefine("q1").unwrap();
        assert!(matches!(
            registry.get("q1"),
            Err(TesseraError::UnknownQuery { .. })
        ));
    }

    #[test]
    fn test_syntax_error_registers_nothing() {
        let registry = QueryRegistry::new();
        assert!(matches!(
            registry.define("bad", "SELEKT * FROM r"),
            Err(TesseraError::QuerySyntax { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_listing_sorted_by_id() {
        let registry = QueryRegistry::new();
        registry.define("b", "SELECT * FROM r").unwrap();
        registry.define("a", "SELECT * FROM s").unwrap();
        assert_eq!(registry.ids(), vec!["a", "b"]);
        assert_eq!(registry.list()[0].oql, "SELECT * FROM s");
    }
}
