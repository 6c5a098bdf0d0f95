mod formatter;
mod inventory;

pub use formatter::OutputFormatter;
pub use inventory::{Inventory, UNKNOWN_HOSTNAME};
