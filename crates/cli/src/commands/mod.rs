//! Command implementations.

mod console;
mod info;
mod run;
mod validate;

pub use console::run_console;
pub use info::run_info;
pub use run::run_bridge;
pub use validate::run_validate;
