pub mod formatting;
pub mod gate;
pub mod history;
