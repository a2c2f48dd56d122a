//! Library side of the `tablefill` binary, kept here so tests can drive the command without
//! spawning a process.

pub mod cli;
