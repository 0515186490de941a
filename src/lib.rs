//! Single-mismatch variants of CRISPRi guides with tunable knockdown.
//!
//! A fitted additive model scores every single-base substitution of a guide;
//! for each requested efficacy the closest unused variant is picked.

pub mod error;
pub mod files;
pub mod matcher;
pub mod model;
pub mod pipeline;
pub mod sequence;
pub mod variants;
pub mod weights;

pub use error::{Error, Result};
pub use matcher::{desired_scores, select};
pub use model::score;
pub use sequence::{gc_content, Guide};
pub use variants::{enumerate_variants, ScoredVariant, Variant};
pub use weights::WeightTable;
