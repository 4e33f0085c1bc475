pub mod tree;
pub mod html;
pub mod select;

pub use tree::*;
pub use html::*;
pub use select::*;
