//! Utility functions for string formatting and argument parsing.

pub mod format;

pub use format::{format_timestamp, parse_date_arg, percent_bar, truncate_string};
