//! Field name sanitization for MongoDB compatibility.
//!
//! MongoDB reserves dots and dollar signs in field names for query syntax. Keys are escaped on the
//! way in and restored on the way out; values are stored untouched so that filters compare
//! against exactly what was written.

use bson::{Bson, Document};

/// Escapes and restores document keys that MongoDB would reject or misinterpret.
///
/// MongoDB does not allow field names to contain:
/// - Dots (`.`) - used for nested field access in queries
/// - Dollar signs (`$`) - used for operators in queries
/// - Null bytes (`\0`) - field name terminators
pub(crate) struct ValueSanitizer;

impl ValueSanitizer {
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    /// Recursively escapes every key in `document`, including keys of nested documents and of
    /// documents inside arrays.
    pub(crate) fn sanitize_document(document: &Document) -> Document {
        document
            .iter()
            .map(|(k, v)| (Self::sanitize_string(k), Self::map_keys(v, Self::sanitize_string)))
            .collect()
    }

    /// Escapes keys of any documents nested in `value`.
    pub(crate) fn sanitize_value(value: &Bson) -> Bson {
        Self::map_keys(value, Self::sanitize_string)
    }

    /// Inverse of [`ValueSanitizer::sanitize_document`].
    pub(crate) fn restore_document(document: &Document) -> Document {
        document
            .iter()
            .map(|(k, v)| (Self::restore_string(k), Self::map_keys(v, Self::restore_string)))
            .collect()
    }

    fn map_keys(value: &Bson, rename: fn(&str) -> String) -> Bson {
        match value {
            Bson::Array(arr) => Bson::Array(
                arr
                    .iter()
                    .map(|item| Self::map_keys(item, rename))
                    .collect(),
            ),
            Bson::Document(doc) => Bson::Document(
                doc.iter()
                    .map(|(k, v)| (rename(k), Self::map_keys(v, rename)))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    /// Escapes a single field or collection name.
    pub(crate) fn sanitize_string(input: &str) -> String {
        let mut sanitized = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter() {
            sanitized = sanitized.replace(*target, *replacement);
        }
        sanitized
    }

    pub(crate) fn restore_string(input: &str) -> String {
        let mut restored = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter().rev() {
            restored = restored.replace(*replacement, *target);
        }
        restored
    }
}
