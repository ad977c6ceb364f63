pub mod challenge;
pub mod event;
pub mod payload;
pub mod time;
pub mod validation;

pub use challenge::*;
pub use event::*;
pub use payload::*;
pub use time::*;
pub use validation::{ValidationError, validate_uuid};
