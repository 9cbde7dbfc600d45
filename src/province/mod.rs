//! Province identity: the static alias table and the resolver that maps user input and
//! raw sensor addresses onto canonical province names.
//!
//! The table is immutable after first use, so every function here is safe to call from
//! any number of concurrent requests without locking.

mod aliases;
mod resolver;

pub use aliases::PROVINCES;
pub use resolver::{
    derive_from_address, fuzzy_equals, last_word_province, match_filters, match_strength,
    MatchStrength,
};
