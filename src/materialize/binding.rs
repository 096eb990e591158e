use std::fmt;

use crate::error::SqlMutationError;
use crate::results::Record;
use crate::types::RowValues;

/// Something that can report the value of one of its own columns.
///
/// Used to read the correlation value of a destination element and the identity of already
/// materialized children.
pub trait Keyed {
    fn key_value(&self, column: &str) -> Option<RowValues>;

    /// Reject destinations of the wrong shape before any binding happens.
    ///
    /// # Errors
    /// Returns `SqlMutationError::Materialize` describing the mismatch.
    fn check_shape(&self) -> Result<(), SqlMutationError> {
        Ok(())
    }
}

/// A value that can be built from, and updated by, a [`Record`].
pub trait Entity: Keyed + Default {
    /// Copy the record's columns onto `self`. Columns the record lacks are left untouched.
    ///
    /// # Errors
    /// Returns `SqlMutationError::Materialize` when a column cannot be stored.
    fn merge_record(&mut self, record: &Record) -> Result<(), SqlMutationError>;
}

/// Parent key ↔ child column pair used to correlate rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationKeys {
    pub parent: String,
    pub child: String,
}

impl CorrelationKeys {
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }
}

impl Default for CorrelationKeys {
    fn default() -> Self {
        Self::new("id", "id")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingCardinality {
    One,
    Many,
}

pub(crate) struct BindScope<'a> {
    pub attribute: &'a str,
    pub identity: &'a str,
}

type BindFn<P> =
    Box<dyn Fn(&mut P, &[&Record], &BindScope<'_>) -> Result<(), SqlMutationError> + Send + Sync>;

/// How one attribute of `P` is populated from related rows.
pub struct RelationBinding<P> {
    pub(crate) attribute: String,
    pub(crate) cardinality: BindingCardinality,
    pub(crate) keys: Option<CorrelationKeys>,
    pub(crate) identity: String,
    pub(crate) bind: BindFn<P>,
}

impl<P> RelationBinding<P> {
    pub(crate) fn from_fn(
        attribute: impl Into<String>,
        cardinality: BindingCardinality,
        bind: BindFn<P>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            cardinality,
            keys: None,
            identity: "id".to_string(),
            bind,
        }
    }

    /// Single child stored inline; the first matching row is merged into it.
    pub fn one<C, F>(attribute: impl Into<String>, slot: F) -> Self
    where
        C: Entity,
        F: Fn(&mut P) -> &mut C + Send + Sync + 'static,
    {
        Self::from_fn(
            attribute,
            BindingCardinality::One,
            Box::new(
                move |parent: &mut P, matches: &[&Record], _: &BindScope<'_>| match matches
                    .first()
                {
                    Some(record) => slot(parent).merge_record(record),
                    None => Ok(()),
                },
            ),
        )
    }

    /// Optional child; created on first match, otherwise left as is.
    pub fn optional<C, F>(attribute: impl Into<String>, slot: F) -> Self
    where
        C: Entity,
        F: Fn(&mut P) -> &mut Option<C> + Send + Sync + 'static,
    {
        Self::from_fn(
            attribute,
            BindingCardinality::One,
            Box::new(
                move |parent: &mut P, matches: &[&Record], _: &BindScope<'_>| match matches
                    .first()
                {
                    Some(record) => slot(parent)
                        .get_or_insert_with(C::default)
                        .merge_record(record),
                    None => Ok(()),
                },
            ),
        )
    }

    /// Child collection, rebuilt in related-row order with existing children reused by identity.
    pub fn many<C, F>(attribute: impl Into<String>, slot: F) -> Self
    where
        C: Entity,
        F: Fn(&mut P) -> &mut Vec<C> + Send + Sync + 'static,
    {
        Self::from_fn(
            attribute,
            BindingCardinality::Many,
            Box::new(
                move |parent: &mut P, matches: &[&Record], scope: &BindScope<'_>| {
                    rebuild_children(slot(parent), matches, scope.identity)
                },
            ),
        )
    }

    /// Correlate `parent` on the destination with `child` on the related rows.
    #[must_use]
    pub fn keys(mut self, parent: impl Into<String>, child: impl Into<String>) -> Self {
        self.keys = Some(CorrelationKeys::new(parent, child));
        self
    }

    /// Identity column used to recognise existing children (default `id`).
    #[must_use]
    pub fn identity(mut self, column: impl Into<String>) -> Self {
        self.identity = column.into();
        self
    }

    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    #[must_use]
    pub fn cardinality(&self) -> BindingCardinality {
        self.cardinality
    }

    #[must_use]
    pub fn correlation_keys(&self) -> Option<&CorrelationKeys> {
        self.keys.as_ref()
    }
}

impl<P> fmt::Debug for RelationBinding<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationBinding")
            .field("attribute", &self.attribute)
            .field("cardinality", &self.cardinality)
            .field("keys", &self.keys)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

pub(crate) fn identity_key<K: Keyed + ?Sized>(item: &K, identity: &str) -> Option<String> {
    item.key_value(identity)
        .and_then(|value| value.correlation_key())
}

/// Rebuild a child list from `matches`, moving existing children whose identity matches.
///
/// On error the list keeps the children it had before the call.
pub(crate) fn rebuild_children<C: Entity>(
    children: &mut Vec<C>,
    matches: &[&Record],
    identity: &str,
) -> Result<(), SqlMutationError> {
    let mut pool: Vec<Option<C>> = std::mem::take(children).into_iter().map(Some).collect();
    // (index in `pool` the child came from, child)
    let mut out: Vec<(Option<usize>, C)> = Vec::with_capacity(matches.len());
    for record in matches {
        let wanted = record
            .get(identity)
            .and_then(RowValues::correlation_key);
        let origin = wanted.and_then(|wanted| {
            pool.iter().position(|slot| {
                slot.as_ref()
                    .is_some_and(|child| identity_key(child, identity).as_ref() == Some(&wanted))
            })
        });
        let mut child = origin
            .and_then(|idx| pool[idx].take())
            .unwrap_or_default();
        if let Err(err) = child.merge_record(record) {
            out.push((origin, child));
            for (origin, child) in out {
                if let Some(idx) = origin {
                    pool[idx] = Some(child);
                }
            }
            *children = pool.into_iter().flatten().collect();
            return Err(err);
        }
        out.push((origin, child));
    }
    *children = out.into_iter().map(|(_, child)| child).collect();
    Ok(())
}
