//! Share request domain entities.

pub mod item;
pub mod model;
pub mod status;

pub use item::{ShareItem, ShareItemType};
pub use model::ShareObject;
pub use status::{ShareItemStatus, ShareObjectStatus};
