pub use crate::agents::*;
pub use crate::bulk::*;
