//! Field-level updates applied to a stored document.
//!
//! A [`Patch`] is what a record accumulates through `set`/`increment`/`remove` before `update`.
//! Backends either apply it directly ([`Patch::apply_to`]) or translate it to native update
//! operators.

use bson::{Bson, Document};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// One pending change to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Replace the field's value.
    Set(Bson),
    /// Add a number to the field's current value.
    Increment(Bson),
    /// Remove the field from the document.
    Remove,
}

/// An ordered set of field updates, at most one per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    updates: Vec<(String, FieldUpdate)>,
}

impl Patch {
    pub fn new() -> Self {
        Patch::default()
    }

    /// Records `update` for `field`. A later update of the same field replaces the earlier one
    /// but keeps its position.
    pub fn insert(&mut self, field: impl Into<String>, update: FieldUpdate) {
        let field = field.into();

        match self.updates.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = update,
            None => self.updates.push((field, update)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldUpdate> {
        self.updates
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, update)| update)
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldUpdate)> {
        self.updates
            .iter()
            .map(|(field, update)| (field.as_str(), update))
    }

    /// Applies every update to `document` in order.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::InvalidDocument`] if an increment is not numeric or overflows. The
    /// document is left untouched in that case.
    pub fn apply_to(&self, document: &mut Document) -> DocumentStoreResult<()> {
        let mut patched = document.clone();

        for (field, update) in &self.updates {
            match update {
                FieldUpdate::Set(value) => {
                    patched.insert(field.clone(), value.clone());
                }
                FieldUpdate::Increment(delta) => {
                    let next = increment(patched.get(field), delta).map_err(|err| {
                        DocumentStoreError::InvalidDocument(format!("Cannot increment '{field}': {err}"))
                    })?;
                    patched.insert(field.clone(), next);
                }
                FieldUpdate::Remove => {
                    patched.remove(field);
                }
            }
        }

        *document = patched;

        Ok(())
    }
}

impl IntoIterator for Patch {
    type Item = (String, FieldUpdate);
    type IntoIter = std::vec::IntoIter<(String, FieldUpdate)>;

    fn into_iter(self) -> Self::IntoIter {
        self.updates.into_iter()
    }
}

/// Whether `value` can be used as an increment.
pub fn is_numeric(value: &Bson) -> bool {
    matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

/// Numeric add with service-style typing: integers stay integers, any double makes a double,
/// and a missing or non-numeric current value is replaced by the delta.
///
/// # Errors
///
/// Fails when `delta` is not a number or a 64-bit integer sum overflows.
pub fn increment(current: Option<&Bson>, delta: &Bson) -> Result<Bson, String> {
    if !is_numeric(delta) {
        return Err(format!("delta {delta} is not a number"));
    }

    let overflow = || format!("adding {delta} overflows a 64-bit integer");

    Ok(match (current, delta) {
        (Some(Bson::Int32(a)), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(*a as i64 + *b as i64),
        },
        (Some(Bson::Int32(a)), Bson::Int64(b)) => {
            Bson::Int64((*a as i64).checked_add(*b).ok_or_else(overflow)?)
        }
        (Some(Bson::Int64(a)), Bson::Int32(b)) => {
            Bson::Int64(a.checked_add(*b as i64).ok_or_else(overflow)?)
        }
        (Some(Bson::Int64(a)), Bson::Int64(b)) => Bson::Int64(a.checked_add(*b).ok_or_else(overflow)?),
        (Some(current), delta) => match (as_f64(current), as_f64(delta)) {
            (Some(a), Some(b)) => Bson::Double(a + b),
            _ => delta.clone(),
        },
        (None, delta) => delta.clone(),
    })
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}
