pub mod commands;
pub mod input;
pub mod logging;
pub mod process_command;
