//! Applying a compiled predicate to a record collection.
//!
//! All selections keep input order and borrow from the collection; nothing
//! is copied beyond the result vector.

use rayon::prelude::*;

use crate::error::FilterError;
use crate::predicate::Predicate;
use crate::record::Record;

/// Matching records, in input order.
pub fn select<'a>(
    predicate: &Predicate,
    records: &'a [Record],
) -> Result<Vec<&'a Record>, FilterError> {
    let matched = select_iter(predicate, records).collect::<Result<Vec<_>, _>>()?;
    tracing::debug!("Selected {} of {} records", matched.len(), records.len());
    Ok(matched)
}

/// Lazy selection: records are evaluated only as the iterator is consumed,
/// so a caller can stop early.
pub fn select_iter<'a, 'p>(
    predicate: &'p Predicate,
    records: &'a [Record],
) -> impl Iterator<Item = Result<&'a Record, FilterError>> + use<'a, 'p> {
    records
        .iter()
        .filter_map(move |record| match predicate.evaluate(record) {
            Ok(true) => Some(Ok(record)),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        })
}

/// Same result as [`select`], evaluated on the rayon pool.
pub fn par_select<'a>(
    predicate: &Predicate,
    records: &'a [Record],
) -> Result<Vec<&'a Record>, FilterError> {
    let matched = records
        .par_iter()
        .filter_map(|record| match predicate.evaluate(record) {
            Ok(true) => Some(Ok(record)),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(
        "Selected {} of {} records (parallel)",
        matched.len(),
        records.len()
    );
    Ok(matched)
}
