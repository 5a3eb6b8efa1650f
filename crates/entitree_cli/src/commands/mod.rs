//! CLI command implementations.

pub mod add;
pub mod explain;
pub mod init;
pub mod mv;
pub mod rename;
pub mod rm;
pub mod show;
pub mod verify;
