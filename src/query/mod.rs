//! Query language: parsing, prepared queries and evaluation.
//!
//! Queries select a projected path from the entries of one region, optionally
//! unnesting collections and filtering on a predicate:
//!
//! ```text
//! SELECT book.displayprice FROM /regionA e, e.store.book book
//!  WHERE book.displayprice > $1
//! ```

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod params;
pub mod parser;
pub mod registry;

pub use ast::Query;
pub use params::parse_params;
pub use parser::parse;
pub use registry::{PreparedQuery, QueryListing, QueryRegistry};

use crate::core::error::TesseraResult;
use crate::store::catalog::Catalog;
use crate::store::document::Document;

/// Ad hoc and prepared query execution against a catalog.
#[derive(Debug, Default)]
pub struct QueryService {
    registry: QueryRegistry,
}

impl QueryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &QueryRegistry {
        &self.registry
    }

    /// Register a prepared query.
    pub fn define(&self, id: &str, text: &str) -> TesseraResult<()> {
        self.registry.define(id, text).map(|_| ())
    }

    pub fn undefine(&self, id: &str) -> TesseraResult<()> {
        self.registry.undefine(id).map(|_| ())
    }

    /// Prepared queries as `{id, oql}` rows.
    pub fn list(&self) -> Vec<QueryListing> {
        self.registry.list()
    }

    /// Parse and run a query once.
    pub fn execute_adhoc(&self, catalog: &Catalog, text: &str) -> TesseraResult<Vec<Document>> {
        self.run(catalog, &parse(text)?, &[])
    }

    /// Run a prepared query with bound parameters.
    pub fn execute_defined(
        &self,
        catalog: &Catalog,
        id: &str,
        params: &[Document],
    ) -> TesseraResult<Vec<Document>> {
        let prepared = self.registry.get(id)?;
        self.run(catalog, &prepared.query, params)
    }

    fn run(&self, catalog: &Catalog, query: &Query, params: &[Document]) -> TesseraResult<Vec<Document>> {
        let region = catalog.region(query.region())?;
        eval::evaluate(query, &region, params)
    }
}
