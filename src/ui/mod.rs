// Terminal formatting for the monitor output

pub mod formatters;

pub use formatters::{format_elapsed, format_raw_line, format_state, format_trend};
