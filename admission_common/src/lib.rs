mod helpers;
mod rupiah;

pub mod op;
mod secret;

pub use helpers::{parse_boolean_flag, parse_or_default};
pub use rupiah::{Rupiah, RupiahConversionError, RUPIAH_CURRENCY_CODE};
pub use secret::Secret;
