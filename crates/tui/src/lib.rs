mod app;
pub mod components;
mod spinner;
pub mod theme;
mod ui;
mod worker;

pub use app::{App, AppMode, DisplayItem, Role};
pub use worker::{TurnRequest, TurnUpdate, Worker};
