pub mod text;
pub mod matcher;
pub mod cleanup;

pub use text::*;
pub use matcher::*;
pub use cleanup::*;
