#![allow(clippy::len_without_is_empty)]
#![deny(
    unsafe_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

//! Core of the `trickle` streaming JSON parser.
//!
//! The parser accepts a JSON document as an arbitrary sequence of byte
//! chunks and can materialize a best-effort snapshot of everything
//! unambiguously known so far after every chunk, without waiting for the
//! document to close. Chunk boundaries may fall anywhere: inside strings,
//! numbers, literals, escape sequences or multi-byte UTF-8 scalars.
//!
//! The exposure policy is strict about soundness:
//!
//! - partial **string values** are visible and grow monotonically;
//! - partial **object keys** are never visible;
//! - partial **numbers and literals** are withheld until a terminating byte
//!   proves the token complete.
//!
//! See [`Parser`] for the three-operation API (`new`, `consume`, `get`).

mod buffer;
pub mod config;
mod error;
mod lexer;
mod parser;
mod value;

pub use config::ParserConfig;
pub use error::Malformed;
pub use parser::Parser;
pub use value::{Map, Value};
