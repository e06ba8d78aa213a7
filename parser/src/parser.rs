use std::collections::HashMap;
use std::fmt;
use std::io;

use lazy_static::lazy_static;
use regex::Regex;

use sequoia_openpgp as openpgp;
use openpgp::policy::{Policy, StandardPolicy};

use crate::decrypt::decrypt_layer;
use crate::extension::{Extension, Extensions};
use crate::keyring::KeyRing;
use crate::lines::{Buffer, Buffered, LineRead};
use crate::{Error, Result};

/// Default limit on the number of encrypted layers.
pub const DEFAULT_MAX_LAYERS: usize = 16;

const ENVELOPE_MARKER: &str = "::";
const PAYLOAD_MARKER: &str = "##";

const ENCRYPTED: &str = "encrypted";
const ANON_TO: &str = "anon-to";
const LATENT_TIME: &str = "latent-time";

lazy_static! {
    static ref HEADER: Regex = Regex::new(r"([^:]+): (.*)")
        .expect("valid regex");
}

/// The innermost layer of a remailer message.
#[derive(Clone, PartialEq, Eq)]
pub struct RemailerMessage {
    body: Vec<u8>,
    to: String,
    latent_time: String,
    layers: usize,
}

impl fmt::Debug for RemailerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RemailerMessage")
            .field("body", &format!("{} bytes", self.body.len()))
            .field("to", &self.to)
            .field("latent_time", &self.latent_time)
            .field("layers", &self.layers)
            .finish()
    }
}

impl RemailerMessage {
    /// Returns the payload.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the payload, consuming the message.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Returns the destination (the `Anon-To` header).
    ///
    /// Empty if the header is absent.  Bytes that are not valid UTF-8
    /// are replaced with U+FFFD.
    pub fn to(&self) -> &str {
        &self.to
    }

    /// Returns the delivery delay hint (the `Latent-Time` header).
    ///
    /// Empty if the header is absent.  Bytes that are not valid UTF-8
    /// are replaced with U+FFFD.
    pub fn latent_time(&self) -> &str {
        &self.latent_time
    }

    /// Returns the number of encrypted layers that were removed.
    pub fn layers(&self) -> usize {
        self.layers
    }
}

/// Configures a [`RemailerParser`].
///
/// # Examples
///
/// ```
/// use remailer_parser::RemailerParser;
/// use sequoia_openpgp::Cert;
///
/// let parser = RemailerParser::builder(Vec::<Cert>::new())
///     .max_layers(4)
///     .build();
/// assert_eq!(parser.max_layers(), 4);
/// ```
pub struct RemailerParserBuilder<K> {
    keyring: K,
    extensions: Extensions,
    max_layers: usize,
    policy: Box<dyn Policy + Send + Sync>,
}

impl<K: KeyRing> RemailerParserBuilder<K> {
    /// Appends an extension.
    ///
    /// Extensions are consulted in the order they are added.
    pub fn extension<E>(mut self, extension: E) -> Self
        where E: Extension + 'static
    {
        self.extensions.push(extension);
        self
    }

    /// Limits the number of encrypted layers.
    ///
    /// Messages nested deeper fail with [`Error::TooManyLayers`].
    /// Zero rejects every encrypted message.
    pub fn max_layers(mut self, max_layers: usize) -> Self {
        self.max_layers = max_layers;
        self
    }

    /// Sets the policy used to decrypt layers.
    ///
    /// Defaults to `StandardPolicy`.
    pub fn policy<P>(mut self, policy: P) -> Self
        where P: Policy + Send + Sync + 'static
    {
        self.policy = Box::new(policy);
        self
    }

    /// Returns the parser.
    pub fn build(self) -> RemailerParser<K> {
        RemailerParser {
            keyring: self.keyring,
            extensions: self.extensions,
            max_layers: self.max_layers,
            policy: self.policy,
        }
    }
}

/// Parses remailer messages.
///
/// A parser is immutable once built and may be shared between
/// threads; every parse owns its state.
pub struct RemailerParser<K> {
    keyring: K,
    extensions: Extensions,
    max_layers: usize,
    policy: Box<dyn Policy + Send + Sync>,
}

impl<K> fmt::Debug for RemailerParser<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RemailerParser")
            .field("extensions", &self.extensions)
            .field("max_layers", &self.max_layers)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<K: KeyRing> RemailerParser<K> {
    /// Returns a parser with default settings and no extensions.
    pub fn new(keyring: K) -> Self {
        Self::builder(keyring).build()
    }

    /// Returns a builder for a parser using `keyring`.
    pub fn builder(keyring: K) -> RemailerParserBuilder<K> {
        RemailerParserBuilder {
            keyring,
            extensions: Extensions::new(),
            max_layers: DEFAULT_MAX_LAYERS,
            policy: Box::new(StandardPolicy::new()),
        }
    }

    /// Returns the key ring.
    pub fn keyring(&self) -> &K {
        &self.keyring
    }

    /// Returns the layer limit.
    pub fn max_layers(&self) -> usize {
        self.max_layers
    }

    /// Parses a message read from `reader`.
    pub fn parse_message<R>(&self, reader: R) -> Result<RemailerMessage>
        where R: io::Read + Send + Sync
    {
        self.parse_lines(Buffered::from_reader(reader))
    }

    /// Parses a message held in memory.
    pub fn parse_bytes<B>(&self, bytes: B) -> Result<RemailerMessage>
        where B: Into<Vec<u8>>
    {
        self.parse_lines(Buffer::from(bytes.into()))
    }

    /// Parses a message from a line reader.
    pub fn parse_lines<'a, L>(&self, source: L) -> Result<RemailerMessage>
        where L: LineRead + 'a
    {
        let mut source: Box<dyn LineRead + 'a> = Box::new(source);
        let mut layers = 0;

        loop {
            expect_envelope(&mut *source)?;
            let headers = read_headers(&mut *source)?;

            if headers.get(ENCRYPTED).map(String::as_str) == Some("PGP") {
                if layers == self.max_layers {
                    return Err(Error::TooManyLayers(self.max_layers).into());
                }
                layers += 1;
                log::debug!("decrypting layer {}", layers);

                let plaintext = decrypt_layer(&mut *source, &self.keyring,
                                              &self.extensions,
                                              self.policy.as_ref())?;
                source = Box::new(plaintext);
                continue;
            }

            expect_payload(&mut *source)?;

            return Ok(RemailerMessage {
                body: source.into_bytes()?,
                to: headers.get(ANON_TO).cloned().unwrap_or_default(),
                latent_time: headers.get(LATENT_TIME).cloned()
                    .unwrap_or_default(),
                layers,
            });
        }
    }
}

/// Returns the next complete line, trimmed.
///
/// Invalid UTF-8 is replaced with U+FFFD.
fn next_line(source: &mut dyn LineRead) -> io::Result<Option<String>> {
    match source.read_line()? {
        Some(line) if line.ends_with(b"\n") =>
            Ok(Some(String::from_utf8_lossy(line).trim().to_string())),
        _ => Ok(None),
    }
}

fn unexpected_eof() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof,
                   "unexpected end of remailer message")
}

/// Skips blank lines up to the envelope marker.
fn expect_envelope(source: &mut dyn LineRead) -> Result<()> {
    loop {
        match next_line(source)? {
            Some(line) if line.is_empty() => continue,
            Some(line) if line == ENVELOPE_MARKER => return Ok(()),
            _ => return Err(Error::NotARemailerMessage.into()),
        }
    }
}

/// Reads the header block, up to and including the blank line.
fn read_headers(source: &mut dyn LineRead)
    -> Result<HashMap<String, String>>
{
    let mut headers = HashMap::new();
    loop {
        let line = next_line(source)?.ok_or_else(unexpected_eof)?;
        if line.is_empty() {
            return Ok(headers);
        }

        if let Some(c) = HEADER.captures(&line) {
            let key = c[1].to_lowercase();
            log::trace!("header {:?}", key);
            headers.insert(key, c[2].to_string());
        }
    }
}

/// Skips blank lines up to and including the payload marker.
fn expect_payload(source: &mut dyn LineRead) -> Result<()> {
    loop {
        let line = next_line(source)?.ok_or_else(unexpected_eof)?;
        if line.is_empty() {
            continue;
        }
        if line == PAYLOAD_MARKER {
            return Ok(());
        }
        return Err(Error::Malformed.into());
    }
}
