pub mod app;
pub mod press;
