//! Query translation from filter expressions to MongoDB query syntax.
//!
//! Field names are escaped the same way stored keys are. Comparisons against a missing field never
//! match, including the negated operators, so results agree with the in-memory backend.

use bson::{Document, Bson, doc};

use docmodel_core::{
    query::{QueryVisitor, Expr, FieldOp, Sort, SortDirection},
    error::DocumentStoreError,
};

use crate::sanitizer::ValueSanitizer;

/// Translates filter expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Builds a sort document from `sort`, with `_id` as the final tiebreak so results come back
    /// in a stable order.
    pub(crate) fn sort_document(sort: &[Sort]) -> Document {
        let mut document = Document::new();

        for key in sort {
            document.insert(
                ValueSanitizer::sanitize_string(&key.field),
                match key.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                },
            );
        }

        if !document.contains_key("_id") {
            document.insert("_id", 1);
        }

        document
    }

    fn contains(field: &str, value: &Bson) -> Document {
        match value {
            Bson::String(s) => doc! {
                "$or": [
                    { field: s },
                    { field: { "$regex": escape_regex(s), "$not": { "$type": "array" } } },
                ]
            },
            _ => doc! { field: value },
        }
    }
}

fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());

    for ch in input.chars() {
        if "\\.^$|?*+()[]{}".contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

fn as_array(value: &Bson) -> Bson {
    match value {
        Bson::Array(_) => value.clone(),
        single => Bson::Array(vec![single.clone()]),
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            // Nothing matches; every stored document has an _id
            return Ok(doc! { "_id": { "$exists": false } });
        }

        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        let field = ValueSanitizer::sanitize_string(field);

        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let sanitized = ValueSanitizer::sanitize_string(field);
        let field = sanitized.as_str();

        Ok(match op {
            FieldOp::Eq => doc! { field: { "$eq": value } },
            FieldOp::Ne => doc! { field: { "$ne": value, "$exists": true } },
            FieldOp::Gt => doc! { field: { "$gt": value } },
            FieldOp::Gte => doc! { field: { "$gte": value } },
            FieldOp::Lt => doc! { field: { "$lt": value } },
            FieldOp::Lte => doc! { field: { "$lte": value } },
            FieldOp::Contains => Self::contains(field, value),
            FieldOp::NotContains => doc! {
                "$and": [
                    { field: { "$exists": true } },
                    { "$nor": [Self::contains(field, value)] },
                ]
            },
            FieldOp::StartsWith => match value {
                Bson::String(s) => doc! { field: { "$regex": format!("^{}", escape_regex(s)) } },
                _ => return Err(DocumentStoreError::Backend("starts-with requires a string value".to_string())),
            },
            FieldOp::EndsWith => match value {
                Bson::String(s) => doc! { field: { "$regex": format!("{}$", escape_regex(s)) } },
                _ => return Err(DocumentStoreError::Backend("ends-with requires a string value".to_string())),
            },
            FieldOp::AnyOf => doc! { field: { "$in": as_array(value) } },
            FieldOp::NoneOf => doc! { field: { "$nin": as_array(value), "$exists": true } },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmodel_core::query::Filter;

    fn translate(expr: Expr) -> Document {
        MongoQueryTranslator.visit_expr(&expr).unwrap()
    }

    #[test]
    fn comparisons_use_native_operators() {
        assert_eq!(translate(Filter::eq("id", "1")), doc! { "id": { "$eq": "1" } });
        assert_eq!(translate(Filter::gte("age", 18)), doc! { "age": { "$gte": 18 } });
        assert_eq!(
            translate(Filter::ne("age", 18)),
            doc! { "age": { "$ne": 18, "$exists": true } }
        );
    }

    #[test]
    fn field_names_are_escaped() {
        assert_eq!(
            translate(Filter::eq("a.b", 1)),
            doc! { "a__dot__b": { "$eq": 1 } }
        );
    }

    #[test]
    fn conjunctions_nest() {
        let expr = Filter::eq("a", 1).and(Filter::eq("b", 2));

        assert_eq!(
            translate(expr),
            doc! { "$and": [{ "a": { "$eq": 1 } }, { "b": { "$eq": 2 } }] }
        );
    }

    #[test]
    fn negation_uses_nor() {
        assert_eq!(
            translate(Filter::eq("a", 1).not()),
            doc! { "$nor": [{ "a": { "$eq": 1 } }] }
        );
    }

    #[test]
    fn empty_groups_match_all_or_nothing() {
        assert_eq!(translate(Expr::And(vec![])), doc! {});
        assert_eq!(translate(Expr::Or(vec![])), doc! { "_id": { "$exists": false } });
    }

    #[test]
    fn any_of_wraps_scalars() {
        assert_eq!(
            translate(Filter::any_of("city", "Oslo")),
            doc! { "city": { "$in": ["Oslo"] } }
        );
    }

    #[test]
    fn prefix_match_escapes_regex() {
        assert_eq!(
            translate(Filter::starts_with("name", "a.b")),
            doc! { "name": { "$regex": "^a\\.b" } }
        );
    }

    #[test]
    fn starts_with_rejects_non_strings() {
        let err = MongoQueryTranslator
            .visit_expr(&Filter::starts_with("name", 1))
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::Backend(_)));
    }

    #[test]
    fn sort_document_keeps_key_order_and_adds_tiebreak() {
        let sort = vec![
            Sort { field: "last".into(), direction: SortDirection::Asc },
            Sort { field: "first".into(), direction: SortDirection::Desc },
        ];

        let document = MongoQueryTranslator::sort_document(&sort);

        assert_eq!(document, doc! { "last": 1, "first": -1, "_id": 1 });
        assert_eq!(
            document.keys().collect::<Vec<_>>(),
            vec!["last", "first", "_id"]
        );
    }
}
