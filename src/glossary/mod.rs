pub mod normalize;
pub mod term;
pub mod blacklist;

pub use normalize::*;
pub use term::*;
pub use blacklist::*;
