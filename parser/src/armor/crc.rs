//! CRC-24 armor checksum (see [RFC 4880, section 6.1]).
//!
//! [RFC 4880, section 6.1]: https://tools.ietf.org/html/rfc4880#section-6.1

const CRC24_INIT: u32 = 0xB704CE;
const CRC24_POLY: u32 = 0x864CFB;

/// Running CRC-24 over the unencoded armor payload.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Crc24(u32);

impl Default for Crc24 {
    fn default() -> Self {
        Crc24(CRC24_INIT)
    }
}

impl Crc24 {
    pub(crate) fn update(mut self, data: &[u8]) -> Self {
        for &octet in data {
            self.0 ^= u32::from(octet) << 16;
            for _ in 0..8 {
                self.0 <<= 1;
                if self.0 & 0x1000000 != 0 {
                    self.0 ^= CRC24_POLY;
                }
            }
        }
        self
    }

    pub(crate) fn value(self) -> u32 {
        self.0 & 0xFFFFFF
    }

    /// The checksum as the three octets that are base64-encoded in
    /// the armor footer.
    pub(crate) fn octets(self) -> [u8; 3] {
        let n = self.value();
        [(n >> 16) as u8, (n >> 8) as u8, n as u8]
    }
}

/// Computes the checksum of `data`.
pub(crate) fn crc24(data: &[u8]) -> Crc24 {
    Crc24::default().update(data)
}
