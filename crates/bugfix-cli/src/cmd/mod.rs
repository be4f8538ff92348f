pub mod cherry_pick;
pub mod config;
pub mod fix;
pub mod init;
pub mod revert;
pub mod transition;
