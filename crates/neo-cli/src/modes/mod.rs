//! Front-end modes: run a script file or start the REPL.

pub mod repl;
pub mod script;
