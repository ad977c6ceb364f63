pub mod error;
pub mod merge;
pub mod traits;

#[cfg(feature = "elastic")]
pub mod elastic;

#[cfg(feature = "memory")]
pub mod memory;

pub use error::*;
pub use traits::*;
