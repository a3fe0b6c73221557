//! Query evaluation by direct interpretation of the syntax tree.
//!
//! Each region entry is bound to the first iterator; later iterators unnest a
//! path reached from earlier bindings. Every complete set of bindings that
//! satisfies the filter produces one projected value.

use super::ast::{CompareOp, Expr, Path, Projection, Query, Source};
use crate::core::error::{TesseraError, TesseraResult};
use crate::store::document::Document;
use crate::store::entry::Value;
use crate::store::region::Region;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::mem::discriminant;

#[derive(Debug, Clone, Copy)]
struct Binding<'a> {
    alias: Option<&'a str>,
    value: &'a Document,
}

/// Evaluate `query` over the entries of `region`.
///
/// `params` must supply exactly one value per placeholder.
pub fn evaluate(query: &Query, region: &Region, params: &[Document]) -> TesseraResult<Vec<Document>> {
    let expected = query.parameter_count();
    if params.len() != expected {
        return Err(TesseraError::parameter_mismatch(format!(
            "query expects {expected} parameter(s), got {}",
            params.len()
        )));
    }

    let roots: Vec<Document> = region.values().iter().map(Value::to_document).collect();
    let root_alias = query.from.first().and_then(|item| item.alias.as_deref());

    let mut results = Vec::new();
    let mut bindings = Vec::with_capacity(query.from.len());
    for root in &roots {
        bindings.push(Binding {
            alias: root_alias,
            value: root,
        });
        walk(query, params, 1, &mut bindings, &mut results);
        bindings.pop();
    }

    if query.distinct {
        let mut unique: Vec<Document> = Vec::with_capacity(results.len());
        for value in results {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        results = unique;
    }

    tracing::debug!(region = %region.name(), rows = results.len(), "query evaluated");
    Ok(results)
}

fn walk<'a>(
    query: &'a Query,
    params: &'a [Document],
    depth: usize,
    bindings: &mut Vec<Binding<'a>>,
    out: &mut Vec<Document>,
) {
    let Some(item) = query.from.get(depth) else {
        let keep = query
            .filter
            .as_ref()
            .map_or(true, |filter| test(filter, bindings, params));
        if keep {
            out.push(project(query, bindings));
        }
        return;
    };

    let Source::Path(path) = &item.source else {
        return;
    };
    let alias = item.alias.as_deref();

    match resolve(path, bindings) {
        None | Some(Document::Null) => {}
        Some(Document::Array(items)) => {
            for value in items {
                bindings.push(Binding { alias, value });
                walk(query, params, depth + 1, bindings, out);
                bindings.pop();
            }
        }
        Some(value) => {
            bindings.push(Binding { alias, value });
            walk(query, params, depth + 1, bindings, out);
            bindings.pop();
        }
    }
}

/// Resolve a path against the current bindings.
///
/// A leading segment naming an alias starts from that binding; otherwise the
/// path is tried against bindings from the innermost outwards.
fn resolve<'a>(path: &Path, bindings: &[Binding<'a>]) -> Option<&'a Document> {
    let (first, rest) = path.segments.split_first()?;

    if let Some(binding) = bindings
        .iter()
        .rev()
        .find(|b| b.alias == Some(first.as_str()))
    {
        return binding.value.path(rest);
    }

    bindings
        .iter()
        .rev()
        .find_map(|b| b.value.field(first))
        .and_then(|doc| doc.path(rest))
}

fn project(query: &Query, bindings: &[Binding<'_>]) -> Document {
    match &query.projection {
        Projection::Path(path) => resolve(path, bindings).cloned().unwrap_or(Document::Null),
        Projection::All if bindings.len() == 1 => bindings[0].value.clone(),
        Projection::All => Document::object(bindings.iter().enumerate().map(|(i, b)| {
            let name = b.alias.map_or_else(|| format!("iter{i}"), str::to_string);
            (name, b.value.clone())
        })),
    }
}

fn value<'a>(expr: &'a Expr, bindings: &[Binding<'a>], params: &'a [Document]) -> Cow<'a, Document> {
    match expr {
        Expr::Literal(doc) => Cow::Borrowed(doc),
        Expr::Param(n) => params
            .get(n - 1)
            .map_or(Cow::Owned(Document::Null), Cow::Borrowed),
        Expr::Path(path) => resolve(path, bindings).map_or(Cow::Owned(Document::Null), Cow::Borrowed),
        predicate => Cow::Owned(Document::Bool(test(predicate, bindings, params))),
    }
}

fn test<'a>(expr: &'a Expr, bindings: &[Binding<'a>], params: &'a [Document]) -> bool {
    match expr {
        Expr::And(lhs, rhs) => test(lhs, bindings, params) && test(rhs, bindings, params),
        Expr::Or(lhs, rhs) => test(lhs, bindings, params) || test(rhs, bindings, params),
        Expr::Not(inner) => !test(inner, bindings, params),
        Expr::IsNull { expr, negated } => value(expr, bindings, params).is_null() != *negated,
        Expr::Compare { op, lhs, rhs } => compare(
            *op,
            &value(lhs, bindings, params),
            &value(rhs, bindings, params),
        ),
        other => matches!(*value(other, bindings, params), Document::Bool(true)),
    }
}

/// Apply a comparison. Incomparable operands never match.
fn compare(op: CompareOp, lhs: &Document, rhs: &Document) -> bool {
    match op {
        CompareOp::Eq => equals(lhs, rhs).unwrap_or(false),
        CompareOp::Ne => equals(lhs, rhs).is_some_and(|eq| !eq),
        CompareOp::Lt => lhs.compare(rhs) == Some(Ordering::Less),
        CompareOp::Le => matches!(lhs.compare(rhs), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => lhs.compare(rhs) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(
            lhs.compare(rhs),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

fn equals(lhs: &Document, rhs: &Document) -> Option<bool> {
    if let Some(ordering) = lhs.compare(rhs) {
        return Some(ordering == Ordering::Equal);
    }
    (discriminant(lhs) == discriminant(rhs)).then(|| lhs == rhs)
}
