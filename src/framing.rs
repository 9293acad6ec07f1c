//! NETCONF 1.1-style chunked framing: `\n#<len>\n<payload>...\n##\n`.
//!
//! Used both for the local JSON protocol (client <-> daemon) and, when a
//! device negotiates base:1.1, for the wire to the device itself.

use std::io::{self, Read, Write};

#[derive(Debug)]
pub enum FrameError {
    Eof,
    Malformed(&'static str),
    Io(io::Error),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Eof => write!(f, "connection closed before a full frame was read"),
            FrameError::Malformed(why) => write!(f, "malformed frame: {}", why),
            FrameError::Io(e) => write!(f, "io error reading frame: {}", e),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<io::Error> for FrameError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FrameError::Eof
        } else {
            FrameError::Io(e)
        }
    }
}

const MAX_LEN_DIGITS: usize = 10;

fn read_byte<R: Read>(r: &mut R) -> Result<u8, FrameError> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

/// Reads one logical message, concatenating all of its chunks, and
/// consuming the trailing `\n##\n` terminator. Returns `Ok(None)` only
/// when the peer closed the stream cleanly before sending any bytes of
/// a new frame; any other truncation is a `FrameError`.
pub fn decode<R: Read>(r: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
    let mut buf = Vec::new();
    let mut started = false;

    loop {
        let first = match read_byte(r) {
            Ok(b) => b,
            Err(FrameError::Eof) if !started => return Ok(None),
            Err(e) => return Err(e),
        };
        started = true;

        if first != b'\n' {
            return Err(FrameError::Malformed("expected leading '\\n'"));
        }
        let hash = read_byte(r)?;
        if hash != b'#' {
            return Err(FrameError::Malformed("expected '#' after '\\n'"));
        }

        let first = read_byte(r)?;
        if first == b'#' {
            let nl = read_byte(r)?;
            if nl != b'\n' {
                return Err(FrameError::Malformed("expected '\\n' after terminating \"##\""));
            }
            return Ok(Some(buf));
        }
        if !first.is_ascii_digit() {
            return Err(FrameError::Malformed("non-digit in chunk length field"));
        }

        let mut digits: Vec<u8> = vec![first];
        loop {
            let c = read_byte(r)?;
            if c == b'\n' {
                break;
            }
            if !c.is_ascii_digit() {
                return Err(FrameError::Malformed("non-digit in chunk length field"));
            }
            digits.push(c);
            if digits.len() > MAX_LEN_DIGITS {
                return Err(FrameError::Malformed("chunk length field too long"));
            }
        }

        let len: u64 = std::str::from_utf8(&digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(FrameError::Malformed("invalid chunk length"))?;
        if len == 0 {
            return Err(FrameError::Malformed("zero-length chunk"));
        }

        let mut chunk = vec![0u8; len as usize];
        r.read_exact(&mut chunk)?;
        buf.extend_from_slice(&chunk);
    }
}

/// Encodes `payload` as a single chunk followed by the `##` terminator
/// and writes it to `w`.
pub fn encode<W: Write>(w: &mut W, payload: &[u8]) -> io::Result<()> {
    write!(w, "\n#{}\n", payload.len())?;
    w.write_all(payload)?;
    write!(w, "\n##\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        encode(&mut buf, payload).unwrap();
        let mut cur = Cursor::new(buf);
        decode(&mut cur).unwrap().unwrap()
    }

    #[test]
    fn roundtrips_arbitrary_payloads() {
        for payload in [&b""[..], b"hello", b"{\"type\":1}", &vec![b'x'; 5000][..]] {
            assert_eq!(roundtrip(payload), payload);
        }
    }

    #[test]
    fn empty_stream_returns_none() {
        let mut cur = Cursor::new(Vec::<u8>::new());
        assert!(matches!(decode(&mut cur), Ok(None)));
    }

    #[test]
    fn zero_length_chunk_is_malformed() {
        let mut cur = Cursor::new(b"\n#0\n\n##\n".to_vec());
        assert!(matches!(decode(&mut cur), Err(FrameError::Malformed(_))));
    }

    #[test]
    fn overlong_length_field_is_malformed() {
        let mut cur = Cursor::new(b"\n#123456789012\nx\n##\n".to_vec());
        assert!(matches!(decode(&mut cur), Err(FrameError::Malformed(_))));
    }

    #[test]
    fn missing_terminator_before_eof_is_an_error() {
        let mut cur = Cursor::new(b"\n#5\nhello".to_vec());
        assert!(decode(&mut cur).is_err());
    }

    #[test]
    fn multiple_chunks_concatenate() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"\n#5\nhello");
        buf.extend_from_slice(b"\n#6\n world");
        buf.extend_from_slice(b"\n##\n");
        let mut cur = Cursor::new(buf);
        let msg = decode(&mut cur).unwrap().unwrap();
        assert_eq!(msg, b"hello world");
    }
}
