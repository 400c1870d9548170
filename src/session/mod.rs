//! Stateful side of filtering: named record layers, the active filter and the
//! saved query list.
//!
//! The session only commits a filter that parsed, compiled, combined and
//! evaluated cleanly over its layer. Any failure leaves the last good filter
//! in place.

use indexmap::IndexMap;

use crate::dsl::parse;
use crate::error::FilterError;
use crate::pipeline;
use crate::predicate::{CombinationMode, Predicate, combine, compile};
use crate::record::{FieldSchema, Record};

/// A named record collection with its field schema.
#[derive(Debug)]
pub struct Layer {
    name: String,
    records: Vec<Record>,
    schema: FieldSchema,
}

impl Layer {
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        let schema = FieldSchema::from_records(&records);
        Layer {
            name: name.into(),
            records,
            schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }
}

/// The filter currently applied to a layer.
#[derive(Debug, Clone)]
pub struct ActiveFilter {
    pub layer: String,
    /// Query text equivalent to `predicate`; combined filters are spelled out
    /// with explicit parentheses.
    pub query: String,
    pub predicate: Predicate,
}

/// A query kept for later reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedQuery {
    pub layer: String,
    pub query: String,
}

#[derive(Debug, Default)]
pub struct FilterSession {
    layers: IndexMap<String, Layer>,
    active: Option<ActiveFilter>,
    saved: Vec<SavedQuery>,
}

impl FilterSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer. A layer with the same name is replaced, and an
    /// active filter on it is dropped since its schema may have changed.
    pub fn add_layer(&mut self, layer: Layer) {
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.layer == layer.name)
        {
            self.active = None;
        }
        tracing::debug!(
            "Layer '{}' registered with {} records and {} fields",
            layer.name,
            layer.records.len(),
            layer.schema.len()
        );
        self.layers.insert(layer.name.clone(), layer);
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn active(&self) -> Option<&ActiveFilter> {
        self.active.as_ref()
    }

    /// Apply `query` to `layer`, merging with the active filter per `mode`.
    /// Returns the number of matching records.
    pub fn apply(
        &mut self,
        layer: &str,
        query: &str,
        mode: CombinationMode,
    ) -> Result<usize, FilterError> {
        match self.try_apply(layer, query, mode) {
            Ok((filter, matched)) => {
                tracing::info!(
                    "Filter applied to '{}' ({}): {} -> {} matches",
                    filter.layer,
                    mode,
                    filter.query,
                    matched
                );
                self.active = Some(filter);
                Ok(matched)
            }
            Err(err) => {
                match &self.active {
                    Some(active) => tracing::warn!(
                        "Filter '{}' rejected ({}); keeping '{}' on '{}'",
                        query,
                        err,
                        active.query,
                        active.layer
                    ),
                    None => tracing::warn!("Filter '{}' rejected ({})", query, err),
                }
                Err(err)
            }
        }
    }

    fn try_apply(
        &self,
        layer_name: &str,
        query: &str,
        mode: CombinationMode,
    ) -> Result<(ActiveFilter, usize), FilterError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FilterError::EmptyQuery);
        }
        let layer = self
            .layers
            .get(layer_name)
            .ok_or_else(|| FilterError::UnknownLayer {
                layer: layer_name.to_string(),
            })?;

        let previous = match &self.active {
            Some(active) if mode.needs_previous() && active.layer != layer_name => {
                return Err(FilterError::LayerMismatch {
                    active: active.layer.clone(),
                    requested: layer_name.to_string(),
                });
            }
            Some(active) if mode.needs_previous() => Some(active),
            _ => None,
        };

        let fresh = compile(&parse(query)?, &layer.schema)?;
        let predicate = combine(mode, previous.map(|p| p.predicate.clone()), fresh)?;
        let matched = pipeline::select(&predicate, &layer.records)?.len();

        let query = match previous {
            Some(previous) => combined_query(mode, &previous.query, query),
            None => query.to_string(),
        };
        Ok((
            ActiveFilter {
                layer: layer_name.to_string(),
                query,
                predicate,
            },
            matched,
        ))
    }

    /// Drop the active filter.
    pub fn clear(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::info!("Filter cleared on '{}'", active.layer);
        }
    }

    /// Records of the active filter's layer that match it, in layer order.
    /// Empty when no filter is active.
    pub fn matching_records(&self) -> Result<Vec<&Record>, FilterError> {
        let Some(active) = &self.active else {
            return Ok(Vec::new());
        };
        let layer = self
            .layers
            .get(&active.layer)
            .ok_or_else(|| FilterError::UnknownLayer {
                layer: active.layer.clone(),
            })?;
        pipeline::par_select(&active.predicate, &layer.records)
    }

    /// Keep the active filter's query for later. Returns its index.
    pub fn save_current(&mut self) -> Result<usize, FilterError> {
        let active = self.active.as_ref().ok_or(FilterError::NothingToSave)?;
        self.saved.push(SavedQuery {
            layer: active.layer.clone(),
            query: active.query.clone(),
        });
        Ok(self.saved.len() - 1)
    }

    /// Add a query to the saved list without applying it.
    pub fn add_saved(&mut self, layer: impl Into<String>, query: impl Into<String>) -> usize {
        self.saved.push(SavedQuery {
            layer: layer.into(),
            query: query.into(),
        });
        self.saved.len() - 1
    }

    pub fn saved_queries(&self) -> &[SavedQuery] {
        &self.saved
    }

    /// Re-apply a saved query, replacing the active filter.
    pub fn apply_saved(&mut self, index: usize) -> Result<usize, FilterError> {
        let saved = self
            .saved
            .get(index)
            .cloned()
            .ok_or(FilterError::NoSuchSavedQuery { index })?;
        self.apply(&saved.layer, &saved.query, CombinationMode::Replace)
    }

    /// Remove a saved query. The active filter is cleared as well.
    pub fn delete_saved(&mut self, index: usize) -> Result<SavedQuery, FilterError> {
        if index >= self.saved.len() {
            return Err(FilterError::NoSuchSavedQuery { index });
        }
        let removed = self.saved.remove(index);
        self.clear();
        Ok(removed)
    }
}

/// Query text for a combined filter; parses back to the same predicate.
fn combined_query(mode: CombinationMode, previous: &str, fresh: &str) -> String {
    match mode {
        CombinationMode::Replace => fresh.to_string(),
        CombinationMode::AndWithPrevious => format!("({}) and ({})", previous, fresh),
        CombinationMode::AndNotPrevious => format!("({}) and not ({})", previous, fresh),
        CombinationMode::OrWithPrevious => format!("({}) or ({})", previous, fresh),
    }
}
