pub mod command;
pub mod notification;
pub mod snapshot;
pub mod video;
