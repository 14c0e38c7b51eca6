//! Global parameters and the alias graph.
//!
//! A global parameter exists only while at least one (experiment, local
//! parameter) pair is linked to it. The registry owns the global side of the
//! alias graph; the experiment-side alias maps live on each [`Model`] and
//! are kept in sync by the [`GlobalFit`] session.
//!
//! [`Model`]: crate::model::Model
//! [`GlobalFit`]: crate::session::GlobalFit

pub mod parameter;
pub mod registry;

pub use parameter::{AliasEdge, GlobalParameter};
pub use registry::ParameterRegistry;
