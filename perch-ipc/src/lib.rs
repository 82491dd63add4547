pub mod command;
pub mod event;
pub mod item;

pub use command::{Command, PermissionInfo, Response};
pub use event::{EventFilter, StateEvent, SubscribeRequest};
pub use item::ItemInfo;
