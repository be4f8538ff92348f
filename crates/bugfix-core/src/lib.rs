pub mod cherry_pick;
pub mod config;
pub mod error;
pub mod fix_branches;
pub mod fix_version;
pub mod io;
pub mod issue;
pub mod operator;
pub mod paths;
pub mod repository;
pub mod tracker;
pub mod transition;
pub mod vcs;

#[cfg(test)]
mod fakes;

pub use error::{BugfixError, Result};
