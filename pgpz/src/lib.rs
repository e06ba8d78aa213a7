//! Compressed remailer layers.
//!
//! Some remailer clients compress a layer's plaintext before
//! encrypting it, and announce this by armoring the ciphertext as
//! `PGPZ MESSAGE` (or `COMPRESSD`) instead of `PGP MESSAGE`.  The
//! compression is raw DEFLATE ([RFC 1951]), without a zlib or gzip
//! wrapper.
//!
//! Register [`Pgpz`] with a parser to handle such layers:
//!
//! ```
//! use remailer_parser::RemailerParser;
//! use remailer_pgpz::Pgpz;
//! use sequoia_openpgp::Cert;
//!
//! let parser = RemailerParser::builder(Vec::<Cert>::new())
//!     .extension(Pgpz)
//!     .build();
//! # let _ = parser;
//! ```
//!
//! [RFC 1951]: https://tools.ietf.org/html/rfc1951

use std::io::{self, Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use remailer_parser::{Extension, Transform};

/// Armor label of a compressed layer.
pub const PGPZ_MESSAGE: &str = "PGPZ MESSAGE";

/// Alternative armor label of a compressed layer.
pub const COMPRESSD: &str = "COMPRESSD";

/// Inflates layers armored as [`PGPZ_MESSAGE`] or [`COMPRESSD`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Pgpz;

impl Extension for Pgpz {
    fn transform(&self, label: &str) -> Option<Transform> {
        match label {
            PGPZ_MESSAGE | COMPRESSD => Some(Box::new(|compressed: Vec<u8>| {
                let plaintext = inflate(&compressed)?;
                log::debug!("inflated {} bytes to {}",
                            compressed.len(), plaintext.len());
                Ok(plaintext)
            })),
            _ => None,
        }
    }
}

/// Decompresses raw DEFLATE data.
pub fn inflate(compressed: &[u8]) -> io::Result<Vec<u8>> {
    let mut plaintext = Vec::new();
    DeflateDecoder::new(compressed).read_to_end(&mut plaintext)?;
    Ok(plaintext)
}

/// Compresses `data` as raw DEFLATE.
pub fn deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
