//! Boolean filter queries over record attributes.
//!
//! A query such as `nombre like 'C.*' and poblacion > 1000` is parsed into an
//! [`Expression`], compiled against a collection's [`FieldSchema`] into a
//! [`Predicate`], optionally merged with a previous filter through
//! [`combine`], and applied to records with [`select`].

pub mod app;
pub mod config;
pub mod dsl;
pub mod error;
pub mod pipeline;
pub mod predicate;
pub mod record;
pub mod session;
pub mod sinks;
pub mod utils;

pub use dsl::{Expression, parse};
pub use error::FilterError;
pub use pipeline::{par_select, select, select_iter};
pub use predicate::{CombinationMode, Predicate, combine, compile};
pub use record::{FieldSchema, Record, Value};
pub use session::FilterSession;
