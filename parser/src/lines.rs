//! Line-oriented access to message streams.
//!
//! The envelope parser consumes its input one `\n`-terminated line
//! at a time and finally takes whatever is left as the payload.
//! [`LineRead`] captures exactly these two operations.  There is one
//! implementation per kind of stream:
//!
//!   - [`Buffer`] for data that is already in memory, like the
//!     plaintext of a decrypted layer, and
//!   - [`Buffered`] for everything else.  It is a thin shim around
//!     a [`BufferedReader`], which is used as-is if the caller already
//!     has one, and otherwise wraps an `io::Read` with a small
//!     look-ahead buffer.

use std::fmt;
use std::io;

use buffered_reader::BufferedReader;

/// Preferred chunk size when wrapping an unbuffered reader.
///
/// Envelope header lines are short, and the payload is read in one
/// go at the end, so there is no need for a large buffer.
pub const HEADER_CHUNK_SIZE: usize = 200;

/// Reads a stream line by line.
pub trait LineRead {
    /// Returns the next line, including the terminating `\n`.
    ///
    /// If the stream ends without a terminator, the remaining bytes
    /// are returned as the last line.  Returns `Ok(None)` at the end
    /// of the stream.
    fn read_line(&mut self) -> io::Result<Option<&[u8]>>;

    /// Returns the rest of the stream.
    fn into_bytes(self: Box<Self>) -> io::Result<Vec<u8>>;
}

impl<L: LineRead + ?Sized> LineRead for Box<L> {
    fn read_line(&mut self) -> io::Result<Option<&[u8]>> {
        self.as_mut().read_line()
    }

    fn into_bytes(self: Box<Self>) -> io::Result<Vec<u8>> {
        L::into_bytes(*self)
    }
}

/// A fully materialized stream.
#[derive(Clone, Default)]
pub struct Buffer {
    bytes: Vec<u8>,
    // The next byte to read.
    cursor: usize,
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("bytes", &self.bytes.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl Buffer {
    /// Returns the data that has not been read yet.
    pub fn remaining(&self) -> &[u8] {
        &self.bytes[self.cursor..]
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Buffer { bytes, cursor: 0 }
    }
}

impl LineRead for Buffer {
    fn read_line(&mut self) -> io::Result<Option<&[u8]>> {
        let rest = &self.bytes[self.cursor..];
        if rest.is_empty() {
            return Ok(None);
        }

        let len = rest.iter().position(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(rest.len());
        let start = self.cursor;
        self.cursor += len;
        Ok(Some(&self.bytes[start..self.cursor]))
    }

    fn into_bytes(self: Box<Self>) -> io::Result<Vec<u8>> {
        let Buffer { mut bytes, cursor } = *self;
        if cursor > 0 {
            bytes.drain(..cursor);
        }
        Ok(bytes)
    }
}

/// A stream backed by a [`BufferedReader`].
pub struct Buffered<'a> {
    reader: Box<dyn BufferedReader<()> + 'a>,
}

impl<'a> fmt::Debug for Buffered<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Buffered")
            .field("reader", &self.reader)
            .finish()
    }
}

impl<'a> Buffered<'a> {
    /// Reads lines from an existing `BufferedReader`.
    ///
    /// No additional buffering is added.
    pub fn new<R>(reader: R) -> Self
        where R: BufferedReader<()> + 'a
    {
        Buffered { reader: Box::new(reader) }
    }

    /// Reads lines from an arbitrary reader.
    ///
    /// The reader is wrapped in a `buffered_reader::Generic` with a
    /// [`HEADER_CHUNK_SIZE`] byte chunk size.
    pub fn from_reader<R>(reader: R) -> Self
        where R: io::Read + Send + Sync + 'a
    {
        Self::new(buffered_reader::Generic::new(
            reader, Some(HEADER_CHUNK_SIZE)))
    }
}

impl<'a> From<Box<dyn BufferedReader<()> + 'a>> for Buffered<'a> {
    fn from(reader: Box<dyn BufferedReader<()> + 'a>) -> Self {
        Buffered { reader }
    }
}

impl<'a> LineRead for Buffered<'a> {
    fn read_line(&mut self) -> io::Result<Option<&[u8]>> {
        let len = self.reader.read_to(b'\n')?.len();
        if len == 0 {
            return Ok(None);
        }
        Ok(Some(&self.reader.consume(len)[..len]))
    }

    fn into_bytes(mut self: Box<Self>) -> io::Result<Vec<u8>> {
        self.reader.steal_eof()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &[u8] = b"::\nAnon-To: a@b\n\n##\nbody\nwithout newline";

    fn lines(mut r: Box<dyn LineRead + '_>) -> (Vec<Vec<u8>>, Vec<u8>) {
        let mut lines = Vec::new();
        for _ in 0..4 {
            lines.push(r.read_line().unwrap().unwrap().to_vec());
        }
        (lines, r.into_bytes().unwrap())
    }

    fn check(r: Box<dyn LineRead + '_>) {
        let (lines, rest) = lines(r);
        assert_eq!(lines, vec![
            b"::\n".to_vec(),
            b"Anon-To: a@b\n".to_vec(),
            b"\n".to_vec(),
            b"##\n".to_vec(),
        ]);
        assert_eq!(rest, b"body\nwithout newline");
    }

    #[test]
    fn buffer() {
        check(Box::new(Buffer::from(TEXT.to_vec())));
    }

    #[test]
    fn buffered_reader() {
        check(Box::new(Buffered::new(buffered_reader::Memory::new(TEXT))));
    }

    #[test]
    fn generic_reader() {
        check(Box::new(Buffered::from_reader(TEXT)));
    }

    #[test]
    fn line_longer_than_chunk() {
        let mut long = vec![b'x'; 3 * HEADER_CHUNK_SIZE];
        long.push(b'\n');
        long.extend_from_slice(b"tail");

        let mut r = Buffered::from_reader(&long[..]);
        assert_eq!(r.read_line().unwrap().unwrap(),
                   &long[..3 * HEADER_CHUNK_SIZE + 1]);
        assert_eq!(r.read_line().unwrap().unwrap(), b"tail");
        assert!(r.read_line().unwrap().is_none());
        assert_eq!(Box::new(r).into_bytes().unwrap(), b"");
    }

    #[test]
    fn unterminated() {
        let mut r = Buffer::from(b"no newline".to_vec());
        assert_eq!(r.read_line().unwrap().unwrap(), b"no newline");
        assert!(r.read_line().unwrap().is_none());

        let mut r = Buffer::default();
        assert!(r.read_line().unwrap().is_none());
    }

    #[test]
    fn materialize_untouched_buffer() {
        let bytes = TEXT.to_vec();
        let ptr = bytes.as_ptr();
        let rest = Box::new(Buffer::from(bytes)).into_bytes().unwrap();
        // The vector is handed back as-is.
        assert_eq!(rest.as_ptr(), ptr);
        assert_eq!(rest, TEXT);
    }

    #[test]
    fn materialize_after_lines() {
        let mut r = Buffer::from(TEXT.to_vec());
        r.read_line().unwrap();
        assert_eq!(r.remaining(), &TEXT[3..]);
        assert_eq!(Box::new(r).into_bytes().unwrap(), &TEXT[3..]);
    }
}
