//! ASCII Armor.
//!
//! Remailer layers are exchanged as ASCII-armored blocks (see [RFC
//! 4880, section 6]).  Unlike a general OpenPGP armor reader, the
//! decoder in this module does not restrict the label: remailer
//! software uses labels like `PGPZ MESSAGE` to announce that the
//! plaintext needs further processing, and the label is what selects
//! the [`Extension`] that does it.
//!
//! # Scope
//!
//! Multipart armor is not supported.  The checksum is optional when
//! decoding, and always emitted when encoding.
//!
//! [RFC 4880, section 6]: https://tools.ietf.org/html/rfc4880#section-6
//! [`Extension`]: crate::Extension

use std::str;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::lines::LineRead;
use crate::{Error, Result};

mod crc;
use self::crc::crc24;

/// The label of a standard OpenPGP message.
pub const PGP_MESSAGE: &str = "PGP MESSAGE";

/// Encoded lines are at most 76 characters (see [RFC 4880, section
/// 6.3]).  GnuPG uses 64.
///
/// [RFC 4880, section 6.3]: https://tools.ietf.org/html/rfc4880#section-6.3
const LINE_LENGTH: usize = 64;

const BEGIN: &str = "-----BEGIN ";
const END: &str = "-----END ";
const DASHES: &str = "-----";

/// A decoded armor block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    label: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Block {
    /// Returns the label, e.g. `PGP MESSAGE`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the armor headers in the order they appeared.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the decoded data.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the decoded data, consuming the block.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Decodes the next armor block from `source`.
    ///
    /// Lines before the `-----BEGIN` line are skipped.  The source is
    /// left positioned after the `-----END` line.
    ///
    /// Malformed armor is reported as [`Error::BadArmor`]; errors
    /// reading from `source` are returned as-is.
    pub fn decode(source: &mut dyn LineRead) -> Result<Self> {
        let label = loop {
            let line = match source.read_line()? {
                Some(line) => trimmed(line),
                None => return Err(bad("missing armor header line")),
            };
            if let Some(label) = line.strip_prefix(BEGIN)
                .and_then(|l| l.strip_suffix(DASHES))
            {
                break label.to_string();
            }
        };

        let mut headers = Vec::new();
        let mut encoded = String::new();
        let mut checksum = None;
        let mut in_headers = true;
        loop {
            let line = match source.read_line()? {
                Some(line) => trimmed(line),
                None => return Err(bad("missing armor footer")),
            };

            if in_headers {
                if line.is_empty() {
                    in_headers = false;
                    continue;
                }
                if let Some(i) = line.find(": ") {
                    headers.push((line[..i].to_string(),
                                  line[i + 2..].to_string()));
                    continue;
                }
                // No separating blank line.  Treat as data.
                in_headers = false;
            }

            if let Some(footer) = line.strip_prefix(END) {
                if footer.strip_suffix(DASHES) != Some(&label[..]) {
                    return Err(bad("armor footer does not match header"));
                }
                break;
            }

            if checksum.is_some() {
                return Err(bad("data after armor checksum"));
            }

            if let Some(crc) = line.strip_prefix('=') {
                let crc = BASE64.decode(crc)
                    .map_err(|e| bad(&format!("invalid checksum: {}", e)))?;
                if crc.len() != 3 {
                    return Err(bad("invalid checksum length"));
                }
                checksum = Some([crc[0], crc[1], crc[2]]);
            } else {
                encoded.push_str(&line);
            }
        }

        let body = BASE64.decode(encoded.as_bytes())
            .map_err(|e| bad(&format!("invalid base64 data: {}", e)))?;

        if let Some(expected) = checksum {
            if crc24(&body).octets() != expected {
                return Err(bad("bad checksum"));
            }
        }

        Ok(Block { label, headers, body })
    }
}

/// Armors `data` under `label`.
///
/// The result is terminated by a newline.
pub fn encode(label: &str, headers: &[(&str, &str)], data: &[u8])
    -> String
{
    let mut armored = format!("{}{}{}\n", BEGIN, label, DASHES);
    for (key, value) in headers {
        armored.push_str(&format!("{}: {}\n", key, value));
    }
    armored.push('\n');

    let encoded = BASE64.encode(data);
    for chunk in encoded.as_bytes().chunks(LINE_LENGTH) {
        // Base64 output is ASCII.
        armored.push_str(str::from_utf8(chunk).unwrap_or_default());
        armored.push('\n');
    }

    armored.push('=');
    armored.push_str(&BASE64.encode(crc24(data).octets()));
    armored.push('\n');
    armored.push_str(&format!("{}{}{}\n", END, label, DASHES));
    armored
}

fn trimmed(line: &[u8]) -> String {
    String::from_utf8_lossy(line).trim().to_string()
}

fn bad(msg: &str) -> anyhow::Error {
    Error::BadArmor(msg.into()).into()
}
