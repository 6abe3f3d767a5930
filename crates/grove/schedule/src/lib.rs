//! GROVE schedule evaluation
//!
//! Pure decision logic for the temporal scheduler:
//! - [`evaluator`] answers whether a rule fires at a given instant for a
//!   given purpose (start, stop, terminate, or a look-ahead stop preview);
//! - [`inactivity`] is the independent override that stops an idle resource
//!   regardless of its time window.
//!
//! Nothing in this crate mutates state; the orchestrator owns all writes.

pub mod evaluator;
pub mod inactivity;

pub use evaluator::{fires, SchedulePurpose};
pub use inactivity::should_stop_for_inactivity;
