//! CLI Commands

pub mod address;
pub mod build;
pub mod install;
pub mod validate;
