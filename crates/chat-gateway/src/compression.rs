//! Transport compression
//!
//! When compression is enabled the server sends binary frames from one
//! long-lived zlib stream; each message ends with a Z_SYNC_FLUSH suffix.
//! The inflate context must survive across frames.

use flate2::{Decompress, FlushDecompress};

/// Z_SYNC_FLUSH trailer terminating every compressed message
const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

/// Growth step for the inflate output buffer
const OUTPUT_CHUNK: usize = 16 * 1024;

/// Streaming zlib inflater for one gateway connection
#[derive(Debug)]
pub struct Inflater {
    decompress: Decompress,
    pending: Vec<u8>,
}

impl Inflater {
    #[must_use]
    pub fn new() -> Self {
        Self {
            decompress: Decompress::new(true),
            pending: Vec::new(),
        }
    }

    /// Feed one transport frame
    ///
    /// Returns a complete message once the accumulated input ends with the
    /// sync-flush suffix; `None` means more frames are needed.
    pub fn push(&mut self, frame: &[u8]) -> Result<Option<Vec<u8>>, flate2::DecompressError> {
        self.pending.extend_from_slice(frame);
        if !self.pending.ends_with(&ZLIB_SUFFIX) {
            return Ok(None);
        }

        let mut output = Vec::with_capacity(self.pending.len().max(OUTPUT_CHUNK));
        let mut consumed = 0usize;
        while consumed < self.pending.len() {
            if output.len() == output.capacity() {
                output.reserve(OUTPUT_CHUNK);
            }
            let before = self.decompress.total_in();
            self.decompress
                .decompress_vec(&self.pending[consumed..], &mut output, FlushDecompress::Sync)?;
            let read = (self.decompress.total_in() - before) as usize;
            if read == 0 && output.len() < output.capacity() {
                break;
            }
            consumed += read;
        }

        self.pending.clear();
        Ok(Some(output))
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compress, Compression, FlushCompress};

    /// Deflate messages through one shared context, as the server does
    fn deflate_stream(messages: &[&str]) -> Vec<Vec<u8>> {
        let mut compress = Compress::new(Compression::fast(), true);
        messages
            .iter()
            .map(|message| {
                let mut frame = Vec::with_capacity(message.len() + 64);
                compress
                    .compress_vec(message.as_bytes(), &mut frame, FlushCompress::Sync)
                    .unwrap();
                frame
            })
            .collect()
    }

    #[test]
    fn test_inflate_single_message() {
        let frames = deflate_stream(&[r#"{"op":10,"d":{"heartbeat_interval":41250}}"#]);
        let mut inflater = Inflater::new();

        let message = inflater.push(&frames[0]).unwrap().unwrap();
        assert_eq!(
            String::from_utf8(message).unwrap(),
            r#"{"op":10,"d":{"heartbeat_interval":41250}}"#
        );
    }

    #[test]
    fn test_context_survives_across_messages() {
        let frames = deflate_stream(&[
            r#"{"op":0,"t":"MESSAGE_CREATE","s":1,"d":{}}"#,
            r#"{"op":0,"t":"MESSAGE_CREATE","s":2,"d":{}}"#,
        ]);
        let mut inflater = Inflater::new();

        let first = inflater.push(&frames[0]).unwrap().unwrap();
        let second = inflater.push(&frames[1]).unwrap().unwrap();
        assert!(String::from_utf8(first).unwrap().contains("\"s\":1"));
        assert!(String::from_utf8(second).unwrap().contains("\"s\":2"));
    }

    #[test]
    fn test_partial_frame_buffers() {
        let frames = deflate_stream(&[r#"{"op":11}"#]);
        let (head, tail) = frames[0].split_at(frames[0].len() / 2);
        let mut inflater = Inflater::new();

        assert!(inflater.push(head).unwrap().is_none());
        let message = inflater.push(tail).unwrap().unwrap();
        assert_eq!(String::from_utf8(message).unwrap(), r#"{"op":11}"#);
    }
}
