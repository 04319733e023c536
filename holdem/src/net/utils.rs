//! Length-prefixed framing over bincode payloads.
//!
//! Every frame is a big-endian `u32` payload length followed by that
//! many bytes of serialized data, in both directions.

use bincode::{ErrorKind, deserialize, serialize};
use serde::{Serialize, de::DeserializeOwned};
use std::io::{self, Read, Write};

/// Maximum allowed frame payload (1MB) to prevent unbounded allocation
/// from a hostile length prefix.
const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Deserialize one payload, mapping bincode failures onto io errors.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> io::Result<T> {
    match deserialize(bytes) {
        Ok(value) => Ok(value),
        Err(error) => match *error {
            ErrorKind::Io(error) => Err(error),
            _ => Err(io::ErrorKind::InvalidData.into()),
        },
    }
}

/// Read one length-prefixed value from a blocking reader.
pub fn read_prefixed<T: DeserializeOwned, R: Read>(reader: &mut R) -> io::Result<T> {
    let mut len_bytes = [0; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_be_bytes(len_bytes) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds the {MAX_FRAME_SIZE} byte cap"),
        ));
    }

    // If we get a would-block error here, the sender very likely does
    // not follow the prefix protocol; surface it as invalid data and
    // let the reader decide what to do with such senders.
    let mut buf = vec![0; len];
    if let Err(error) = reader.read_exact(&mut buf) {
        let kind = match error.kind() {
            io::ErrorKind::WouldBlock => io::ErrorKind::InvalidData,
            kind => kind,
        };
        return Err(kind.into());
    }

    decode(&buf)
}

/// Serialize `value` and write it as one length-prefixed chunk. Writing
/// the prefix and payload together avoids read-side EOF races; writing
/// into a `Vec<u8>` outbound buffer never fails.
pub fn write_prefixed<T: Serialize, W: Write>(writer: &mut W, value: &T) -> io::Result<()> {
    match serialize(value) {
        Ok(serialized) => {
            if serialized.len() > MAX_FRAME_SIZE {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "frame of {} bytes exceeds the {MAX_FRAME_SIZE} byte cap",
                        serialized.len()
                    ),
                ));
            }
            let size = serialized.len() as u32;
            let mut buf = Vec::from(size.to_be_bytes());
            buf.extend(serialized);
            writer.write_all(&buf)?;
            Ok(())
        }
        Err(error) => match *error {
            ErrorKind::Io(error) => Err(error),
            _ => Err(io::ErrorKind::InvalidData.into()),
        },
    }
}

/// Incremental reassembly of inbound frames for one non-blocking
/// connection: first four bytes name the payload length, then exactly
/// that many payload bytes, repeated for as long as bytes arrive.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    /// Offset of the pending payload, once its header has been read.
    off: usize,
    /// Pending payload length; zero means the header is still owed.
    size: usize,
}

impl FrameBuffer {
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop one complete payload off the buffer, if one has fully
    /// arrived.
    pub fn try_parse_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.size == 0 && self.off == 0 {
            if self.buf.len() < 4 {
                return Ok(None);
            }
            let len =
                u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;
            if len > MAX_FRAME_SIZE {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("frame of {len} bytes exceeds the {MAX_FRAME_SIZE} byte cap"),
                ));
            }
            self.off = 4;
            self.size = len;
        }
        if self.buf.len() < self.off + self.size {
            return Ok(None);
        }
        let frame = self.buf[self.off..self.off + self.size].to_vec();
        self.buf.drain(..self.off + self.size);
        self.off = 0;
        self.size = 0;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};

    use super::*;

    fn setup() -> (TcpStream, TcpStream) {
        let server = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (stream, _) = server.accept().unwrap();
        (client, stream)
    }

    #[test]
    fn write_and_read() {
        let (mut client, mut stream) = setup();
        let value = "Hello, World!".to_string();
        assert!(write_prefixed(&mut stream, &value).is_ok());
        assert!(read_prefixed::<String, TcpStream>(&mut client).is_ok_and(|v| v == value));
    }

    #[test]
    fn write_and_read_multiple_messages() {
        let (mut client, mut stream) = setup();

        let msgs = ["first", "second", "third"];
        for msg in &msgs {
            assert!(write_prefixed(&mut stream, &msg.to_string()).is_ok());
        }
        for msg in &msgs {
            let received: String = read_prefixed(&mut client).unwrap();
            assert_eq!(&received, msg);
        }
    }

    #[test]
    fn read_unexpected_eof() {
        let (mut client, mut stream) = setup();
        let payload = b"short";
        let overlong = payload.len() as u32 + 2;
        assert!(stream.write_all(&overlong.to_be_bytes()).is_ok());
        assert!(stream.write_all(payload).is_ok());
        drop(stream);
        assert_eq!(
            read_prefixed::<String, TcpStream>(&mut client).map_err(|e| e.kind()),
            Err(io::ErrorKind::UnexpectedEof)
        );
    }

    #[test]
    fn reject_oversized_frame() {
        let (mut client, mut stream) = setup();

        // A length prefix claiming 2GB must be rejected before any
        // allocation happens.
        let malicious = 2_000_000_000u32;
        assert!(stream.write_all(&malicious.to_be_bytes()).is_ok());
        assert_eq!(
            read_prefixed::<String, TcpStream>(&mut client).map_err(|e| e.kind()),
            Err(io::ErrorKind::InvalidData)
        );
    }

    #[test]
    fn prefix_is_big_endian() {
        let mut buf = Vec::new();
        write_prefixed(&mut buf, &7u8).unwrap();
        // bincode encodes a u8 as one byte; the prefix must read as a
        // network-order 1.
        assert_eq!(&buf[..4], &[0, 0, 0, 1]);
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn frame_buffer_reassembles_split_frames() {
        let mut framed = Vec::new();
        write_prefixed(&mut framed, &"split me".to_string()).unwrap();

        let mut parser = FrameBuffer::default();
        // Feed one byte at a time; the frame appears only on the last.
        for byte in &framed {
            assert!(parser.try_parse_frame().unwrap().is_none());
            parser.extend(&[*byte]);
        }
        let payload = parser.try_parse_frame().unwrap().unwrap();
        let value: String = decode(&payload).unwrap();
        assert_eq!(value, "split me");
        assert!(parser.try_parse_frame().unwrap().is_none());
    }

    #[test]
    fn frame_buffer_parses_back_to_back_frames() {
        let mut framed = Vec::new();
        write_prefixed(&mut framed, &1u32).unwrap();
        write_prefixed(&mut framed, &2u32).unwrap();

        let mut parser = FrameBuffer::default();
        parser.extend(&framed);
        let first: u32 = decode(&parser.try_parse_frame().unwrap().unwrap()).unwrap();
        let second: u32 = decode(&parser.try_parse_frame().unwrap().unwrap()).unwrap();
        assert_eq!((first, second), (1, 2));
        assert!(parser.try_parse_frame().unwrap().is_none());
    }

    #[test]
    fn frame_buffer_rejects_oversized_header() {
        let mut parser = FrameBuffer::default();
        parser.extend(&u32::MAX.to_be_bytes());
        assert!(parser.try_parse_frame().is_err());
    }

    #[test]
    fn frame_buffer_accepts_empty_payload() {
        let mut parser = FrameBuffer::default();
        parser.extend(&0u32.to_be_bytes());
        let frame = parser.try_parse_frame().unwrap().unwrap();
        assert!(frame.is_empty());
        assert!(parser.try_parse_frame().unwrap().is_none());
    }
}
