#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_qualifications
)]

pub mod blank;
pub mod lexer;
pub mod model;
pub mod n3p;
pub mod ntriples;
pub mod parser;
pub mod uri;
pub mod utf;

pub use blank::BlankNodeGenerator;
pub use model::Term;
pub use n3p::N3pEmitter;
pub use ntriples::NTriplesEmitter;
pub use parser::{parse, ParseError, Sink, TurtleParser};
pub use uri::{Uri, UriSyntaxError};
