//! Academic-year scheduling

pub mod label;
pub mod manager;
pub mod view;

pub use manager::ScheduleManager;
pub use view::ScheduleView;
