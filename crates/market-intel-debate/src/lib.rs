//! Thesis Construction and Cross-Examination: turns a fused signal into a
//! bull/bear argument pair, then adversarially tests both sides.

mod cross_examination;
mod thesis;

pub use cross_examination::{run_cross_examination, winning_side};
pub use thesis::construct_theses;
