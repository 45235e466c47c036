use std::io::Read;

use ubyte::{ByteUnit, ToByteUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// An upper limit on the size of the bodies a binder is willing to decode.
pub enum BodySizeLimit {
    /// There is an active limit on the size of incoming bodies.
    Enabled {
        /// The maximum size of incoming bodies, in bytes.
        max_size: ByteUnit,
    },
    /// There is no limit on the size of incoming bodies.
    Disabled,
}

impl Default for BodySizeLimit {
    fn default() -> Self {
        Self::Enabled {
            max_size: 2.megabytes(),
        }
    }
}

/// A reader that refuses to yield more than `max_size` bytes.
///
/// It remembers whether the limit was hit, so that the caller can tell a truncated
/// body apart from an oversized one once the decoder bails out.
pub(super) struct LimitedReader<R> {
    inner: R,
    remaining: Option<u64>,
    exceeded: bool,
}

impl<R> LimitedReader<R> {
    pub(super) fn new(inner: R, limit: BodySizeLimit) -> Self {
        let remaining = match limit {
            BodySizeLimit::Enabled { max_size } => Some(max_size.as_u64()),
            BodySizeLimit::Disabled => None,
        };
        Self {
            inner,
            remaining,
            exceeded: false,
        }
    }

    pub(super) fn exceeded(&self) -> bool {
        self.exceeded
    }
}

impl<R: Read> Read for LimitedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let Some(remaining) = self.remaining else {
            return self.inner.read(buf);
        };
        if buf.is_empty() {
            return Ok(0);
        }
        // Ask for one byte more than we're allowed to hand out, to detect an oversized body
        // without waiting for a follow-up read.
        let allowed = remaining.saturating_add(1).min(buf.len() as u64) as usize;
        let n = self.inner.read(&mut buf[..allowed])?;
        if n as u64 > remaining {
            self.exceeded = true;
            return Err(std::io::Error::other("body size limit exceeded"));
        }
        self.remaining = Some(remaining - n as u64);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use ubyte::ToByteUnit;

    use super::{BodySizeLimit, LimitedReader};

    #[test]
    fn bodies_within_the_limit_are_read_in_full() {
        let limit = BodySizeLimit::Enabled {
            max_size: 4.bytes(),
        };
        let mut reader = LimitedReader::new(&b"1234"[..], limit);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"1234");
        assert!(!reader.exceeded());
    }

    #[test]
    fn oversized_bodies_are_flagged() {
        let limit = BodySizeLimit::Enabled {
            max_size: 4.bytes(),
        };
        let mut reader = LimitedReader::new(&b"12345"[..], limit);
        let mut out = Vec::new();
        assert!(reader.read_to_end(&mut out).is_err());
        assert!(reader.exceeded());
    }

    #[test]
    fn disabled_limit_reads_everything() {
        let body = vec![b'x'; 10_000];
        let mut reader = LimitedReader::new(&body[..], BodySizeLimit::Disabled);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 10_000);
    }

    #[test]
    fn default_limit_is_two_megabytes() {
        assert_eq!(
            BodySizeLimit::default(),
            BodySizeLimit::Enabled {
                max_size: 2.megabytes()
            }
        );
    }
}
