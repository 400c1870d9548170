//! Combining a fresh predicate with the previously active one.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Predicate;
use crate::error::FilterError;

/// How a new filter merges with the one already applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
pub enum CombinationMode {
    /// Discard the previous filter.
    #[default]
    #[serde(rename = "replace")]
    #[value(name = "replace")]
    Replace,
    /// `previous AND new`
    #[serde(rename = "and")]
    #[value(name = "and")]
    AndWithPrevious,
    /// `previous AND NOT new`
    #[serde(rename = "and-not")]
    #[value(name = "and-not")]
    AndNotPrevious,
    /// `previous OR new`
    #[serde(rename = "or")]
    #[value(name = "or")]
    OrWithPrevious,
}

impl CombinationMode {
    pub fn needs_previous(self) -> bool {
        !matches!(self, CombinationMode::Replace)
    }
}

impl fmt::Display for CombinationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombinationMode::Replace => write!(f, "replace"),
            CombinationMode::AndWithPrevious => write!(f, "and"),
            CombinationMode::AndNotPrevious => write!(f, "and-not"),
            CombinationMode::OrWithPrevious => write!(f, "or"),
        }
    }
}

/// Merge `fresh` into `previous` according to `mode`.
///
/// Both predicates must have been compiled for the same record collection;
/// nothing here can check that, so mixing collections is a caller error.
pub fn combine(
    mode: CombinationMode,
    previous: Option<Predicate>,
    fresh: Predicate,
) -> Result<Predicate, FilterError> {
    let combined = match (mode, previous) {
        (CombinationMode::Replace, _) => fresh,
        (_, None) => return Err(FilterError::NoPreviousFilter { mode }),
        (CombinationMode::AndWithPrevious, Some(previous)) => Predicate::And(vec![previous, fresh]),
        (CombinationMode::AndNotPrevious, Some(previous)) => {
            Predicate::And(vec![previous, Predicate::Not(Box::new(fresh))])
        }
        (CombinationMode::OrWithPrevious, Some(previous)) => Predicate::Or(vec![previous, fresh]),
    };
    Ok(combined)
}
