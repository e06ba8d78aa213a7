//! Parses anonymous remailer messages.
//!
//! A remailer message is a line-oriented envelope:
//!
//! ```text
//! ::
//! Anon-To: alice@example.org
//! Latent-Time: +1:00
//!
//! ##
//! payload ...
//! ```
//!
//! An envelope may instead carry the header `Encrypted: PGP`, in
//! which case it is followed by an ASCII-armored OpenPGP message
//! that decrypts to another complete envelope.  [`RemailerParser`]
//! strips any number of such layers (up to a configurable limit) and
//! returns the innermost routing headers and payload as a
//! [`RemailerMessage`].
//!
//! Armor blocks labeled with something other than `PGP MESSAGE` are
//! handed to [`Extension`]s, which transform the decrypted plaintext
//! before it is parsed again.  The `remailer-pgpz` crate provides the
//! decompressing extension for `PGPZ MESSAGE` blocks.
//!
//! # Examples
//!
//! ```
//! use remailer_parser::RemailerParser;
//! use sequoia_openpgp::Cert;
//!
//! # fn main() -> remailer_parser::Result<()> {
//! let keyring: Vec<Cert> = Vec::new();
//! let parser = RemailerParser::new(keyring);
//!
//! let message = parser.parse_bytes(
//!     &b"::\nAnon-To: alice@example.org\n\n##\nHello, Alice!\n"[..])?;
//! assert_eq!(message.to(), "alice@example.org");
//! assert_eq!(message.body(), b"Hello, Alice!\n");
//! # Ok(()) }
//! ```

#![warn(missing_docs)]

pub mod armor;
mod decrypt;
pub mod extension;
pub mod keyring;
pub mod lines;
mod parser;

pub use crate::extension::{Extension, Extensions, Transform};
pub use crate::keyring::KeyRing;
pub use crate::lines::{Buffer, Buffered, LineRead};
pub use crate::parser::{
    RemailerMessage,
    RemailerParser,
    RemailerParserBuilder,
    DEFAULT_MAX_LAYERS,
};

/// Crate result specialization.
///
/// Failures of the OpenPGP engine, of extension transforms and of the
/// underlying stream are passed through unchanged.  Use
/// `anyhow::Error::downcast_ref::<Error>` to recognize this crate's
/// own error kinds.
pub type Result<T> = ::std::result::Result<T, anyhow::Error>;

/// Errors returned by this crate.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The envelope marker is missing at the current layer.
    ///
    /// This is also returned if a decrypted layer does not start a
    /// new envelope.
    #[error("Not a remailer message")]
    NotARemailerMessage,

    /// The payload delimiter is missing.
    #[error("Malformed remailer message")]
    Malformed,

    /// The armor could not be decoded, or its label names a format
    /// that no extension handles.
    #[error("Bad ASCII armor: {0}")]
    BadArmor(String),

    /// The message is nested deeper than the configured limit.
    #[error("Too many encryption layers (limit: {0})")]
    TooManyLayers(usize),
}
