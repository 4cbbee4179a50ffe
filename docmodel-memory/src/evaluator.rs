//! Filter evaluation and ordering for in-memory documents.
//!
//! [`DocumentEvaluator`] walks an [`Expr`] against one stored document; [`compare_documents`]
//! orders two documents by a list of sort keys.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime};

use docmodel_core::{
    query::{QueryVisitor, Expr, FieldOp, Sort, SortDirection},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Comparable view of a BSON value. Integers and doubles compare as one numeric type.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            // Other types are not comparable
            _ => Comparable::Null,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl<'a> Comparable<'a> {
    fn contains(&self, needle: &Comparable<'_>) -> bool {
        match (self, needle) {
            (Comparable::Array(items), needle) => items.iter().any(|item| item == needle),
            (Comparable::String(haystack), Comparable::String(needle)) => haystack.contains(needle),
            _ => false,
        }
    }

    /// Whether this value, or any element of it when it is an array, equals one of `candidates`.
    /// A non-array candidate list is treated as a single candidate.
    fn intersects(&self, candidates: &Comparable<'_>) -> bool {
        let candidates = match candidates {
            Comparable::Array(values) => values.iter().collect::<Vec<_>>(),
            single => vec![single],
        };

        match self {
            Comparable::Array(items) => items
                .iter()
                .any(|item| candidates.iter().any(|candidate| item == *candidate)),
            value => candidates.iter().any(|candidate| value == *candidate),
        }
    }

    /// Position of the value's type in the cross-type sort order. Unsupported BSON types map to
    /// null and share its rank.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Bool(_) => 5,
            Comparable::DateTime(_) => 6,
        }
    }

    /// Total order used for sorting.
    ///
    /// Values of different types order by type: null (and missing) first, then numbers, strings,
    /// documents, arrays, booleans and dates. Numbers use IEEE total ordering, so NaN sorts after
    /// every other number.
    fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Number(a), Comparable::Number(b)) => a.total_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.cmp(b),
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b)
                .map(|(left, right)| left.sort_cmp(right))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Map(a), Comparable::Map(b)) => {
                let mut a = a.iter().collect::<Vec<_>>();
                let mut b = b.iter().collect::<Vec<_>>();
                a.sort_by_key(|(key, _)| **key);
                b.sort_by_key(|(key, _)| **key);

                a.iter()
                    .zip(&b)
                    .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| va.sort_cmp(vb)))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or_else(|| a.len().cmp(&b.len()))
            }
            (left, right) => left.type_rank().cmp(&right.type_rank()),
        }
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Whether a stored body matches `expr`. Bodies that are not documents never match.
    pub fn matches(body: &Bson, expr: &Expr) -> DocumentStoreResult<bool> {
        match body.as_document() {
            Some(document) => DocumentEvaluator::new(document).evaluate(expr),
            None => Ok(false),
        }
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(self.document.contains_key(field) == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = self.document.get(field) else {
            return Ok(false);
        };

        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => left == right,
            FieldOp::Ne => left != right,
            FieldOp::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
            FieldOp::Gte => matches!(left.partial_cmp(&right), Some(Ordering::Greater | Ordering::Equal)),
            FieldOp::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
            FieldOp::Lte => matches!(left.partial_cmp(&right), Some(Ordering::Less | Ordering::Equal)),
            FieldOp::Contains => left.contains(&right),
            FieldOp::NotContains => !left.contains(&right),
            FieldOp::StartsWith => match (left, right) {
                (Comparable::String(left), Comparable::String(right)) => left.starts_with(right),
                _ => false,
            },
            FieldOp::EndsWith => match (left, right) {
                (Comparable::String(left), Comparable::String(right)) => left.ends_with(right),
                _ => false,
            },
            FieldOp::AnyOf => left.intersects(&right),
            FieldOp::NoneOf => !left.intersects(&right),
        })
    }
}

/// Orders two stored bodies by `sort`, earlier keys first. Equal on every key means equal.
pub(crate) fn compare_documents(left: &Bson, right: &Bson, sort: &[Sort]) -> Ordering {
    for key in sort {
        let a = field_of(left, &key.field);
        let b = field_of(right, &key.field);

        let ordering = match key.direction {
            SortDirection::Asc => a.sort_cmp(&b),
            SortDirection::Desc => b.sort_cmp(&a),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn field_of<'a>(body: &'a Bson, field: &str) -> Comparable<'a> {
    body.as_document()
        .and_then(|document| document.get(field))
        .map(Comparable::from)
        .unwrap_or(Comparable::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docmodel_core::query::Filter;

    fn matches(document: Document, expr: Expr) -> bool {
        DocumentEvaluator::new(&document).evaluate(&expr).unwrap()
    }

    #[test]
    fn numbers_compare_across_widths() {
        assert!(matches(doc! { "n": 3_i32 }, Filter::eq("n", 3_i64)));
        assert!(matches(doc! { "n": 3_i64 }, Filter::gt("n", 2.5)));
        assert!(!matches(doc! { "n": "3" }, Filter::eq("n", 3)));
    }

    #[test]
    fn missing_field_never_matches_a_comparison() {
        assert!(!matches(doc! {}, Filter::ne("n", 1)));
        assert!(matches(doc! {}, Filter::not_exists("n")));
    }

    #[test]
    fn contains_checks_arrays_and_substrings() {
        assert!(matches(doc! { "tags": ["a", "b"] }, Filter::contains("tags", "b")));
        assert!(matches(doc! { "name": "theodore" }, Filter::contains("name", "odo")));
        assert!(matches(doc! { "tags": ["a"] }, Filter::not_contains("tags", "z")));
    }

    #[test]
    fn any_of_and_none_of() {
        assert!(matches(doc! { "city": "Oslo" }, Filter::any_of("city", vec!["Rome", "Oslo"])));
        assert!(matches(doc! { "tags": ["x", "y"] }, Filter::any_of("tags", vec!["y"])));
        assert!(matches(doc! { "city": "Oslo" }, Filter::none_of("city", vec!["Rome"])));
        assert!(!matches(doc! { "tags": ["x", "y"] }, Filter::none_of("tags", vec!["y", "z"])));
    }

    #[test]
    fn non_document_bodies_never_match() {
        assert!(!DocumentEvaluator::matches(&Bson::Int32(1), &Filter::exists("a")).unwrap());
    }

    #[test]
    fn sorts_by_keys_in_order() {
        let a = Bson::Document(doc! { "last": "b", "first": "x" });
        let b = Bson::Document(doc! { "last": "a", "first": "y" });
        let c = Bson::Document(doc! { "last": "a", "first": "z" });
        let sort = vec![
            Sort { field: "last".into(), direction: SortDirection::Asc },
            Sort { field: "first".into(), direction: SortDirection::Desc },
        ];

        let mut rows = vec![&a, &b, &c];
        rows.sort_by(|l, r| compare_documents(l, r, &sort));

        assert_eq!(rows, vec![&c, &b, &a]);
    }

    #[test]
    fn missing_values_sort_first() {
        let present = Bson::Document(doc! { "n": 1 });
        let missing = Bson::Document(doc! {});
        let sort = vec![Sort { field: "n".into(), direction: SortDirection::Asc }];

        assert_eq!(compare_documents(&missing, &present, &sort), Ordering::Less);
    }

    #[test]
    fn mixed_types_sort_by_type_then_value() {
        let values = [
            Bson::Boolean(true),
            Bson::String("b".into()),
            Bson::Double(f64::NAN),
            Bson::Int32(2),
            Bson::Null,
            Bson::String("a".into()),
            Bson::Boolean(false),
            Bson::Double(-1.5),
            Bson::Array(vec![Bson::Int32(1)]),
            Bson::Document(doc! { "x": 1 }),
        ];
        let bodies = values
            .iter()
            .map(|value| Bson::Document(doc! { "k": value.clone() }))
            .collect::<Vec<_>>();
        let sort = vec![Sort { field: "k".into(), direction: SortDirection::Asc }];

        let mut rows = bodies.iter().collect::<Vec<_>>();
        rows.sort_by(|l, r| compare_documents(l, r, &sort));

        let sorted = rows
            .iter()
            .map(|body| body.as_document().unwrap().get("k").unwrap().clone())
            .collect::<Vec<_>>();

        assert_eq!(sorted[0], Bson::Null);
        assert_eq!(sorted[1], Bson::Double(-1.5));
        assert_eq!(sorted[2], Bson::Int32(2));
        assert!(matches!(sorted[3], Bson::Double(n) if n.is_nan()));
        assert_eq!(sorted[4..6], [Bson::String("a".into()), Bson::String("b".into())]);
        assert_eq!(sorted[6], Bson::Document(doc! { "x": 1 }));
        assert_eq!(sorted[7], Bson::Array(vec![Bson::Int32(1)]));
        assert_eq!(sorted[8..10], [Bson::Boolean(false), Bson::Boolean(true)]);
    }

    #[test]
    fn sort_comparison_is_a_total_order() {
        let values = [
            Bson::Null,
            Bson::Int32(3),
            Bson::Int64(-7),
            Bson::Double(f64::NAN),
            Bson::Double(0.5),
            Bson::String("z".into()),
            Bson::String("".into()),
            Bson::Boolean(false),
            Bson::Array(vec![]),
            Bson::Array(vec![Bson::String("a".into())]),
            Bson::Document(doc! {}),
            Bson::Document(doc! { "a": 1 }),
        ];
        let comparables = values.iter().map(Comparable::from).collect::<Vec<_>>();

        for a in &comparables {
            assert_eq!(a.sort_cmp(a), Ordering::Equal);

            for b in &comparables {
                assert_eq!(a.sort_cmp(b), b.sort_cmp(a).reverse());

                for c in &comparables {
                    if a.sort_cmp(b).is_le() && b.sort_cmp(c).is_le() {
                        assert!(a.sort_cmp(c).is_le());
                    }
                }
            }
        }
    }
}
