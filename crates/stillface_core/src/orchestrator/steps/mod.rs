//! Pipeline step implementations.
//!
//! Each step handles one stage of turning synced recordings into phase
//! clips and composites.

mod cut;
mod stack;
mod thumbnail;

pub use cut::CutStep;
pub use stack::{mother_baby_file_name, StackStep};
pub use thumbnail::ThumbnailStep;
