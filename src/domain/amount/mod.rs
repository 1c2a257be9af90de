//! Amount domain - conversion between display and base-unit amounts

mod converter;

pub use converter::{to_base_units, to_display, to_display_rounded, MAX_DECIMALS};
