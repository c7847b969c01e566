//! Experience reference resolution
//!
//! Eager substitution of bare ids plus per-owner queries, with generation
//! tickets to drop results that were overtaken by a newer resolution.

mod generations;
mod reference_resolver;

pub use generations::{Generations, Ticket};
pub use reference_resolver::{
    carry_resolved, distinct_unresolved, substitute, ReferenceResolver, ResolveReport, SlotFailure,
};
