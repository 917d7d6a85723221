//! Error handling foundation for playschool.
//!
//! Only the `Result` alias lives here. Each crate defines its own error enums
//! next to the code that produces them; fatal paths wrap those enums in a
//! rootcause `Report` so the whole chain prints when the process gives up.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
