pub mod banks;
pub mod convert;
pub mod history;
pub mod setup;
pub mod ui;
