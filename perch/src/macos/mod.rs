mod accessibility;
mod app_info;
mod display;
mod events;
mod window_list;

pub use accessibility::*;
pub use app_info::*;
pub use display::*;
pub use events::*;
pub use window_list::*;
