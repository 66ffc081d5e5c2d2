//! Command-line front end for procurement declaration forms.

pub mod commands;
pub mod logging;
pub mod summary;
