//! Framing for the TCP data plane: 4 bytes LE length + raw payload.

const LEN_SIZE: usize = 4;
const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024; // 16 MiB

/// Encode a payload into a single frame.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, FrameEncodeError> {
    if payload.len() > MAX_FRAME_LEN as usize {
        return Err(FrameEncodeError::TooLarge);
    }
    let mut out = Vec::with_capacity(LEN_SIZE + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Error encoding a payload into a frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameEncodeError {
    #[error("frame too large")]
    TooLarge,
}

/// Decode one frame from the front of `bytes`. Returns the payload and the
/// number of bytes consumed. Call with a partial buffer; `NeedMore` means
/// the caller should read more data and try again.
pub fn decode_frame(bytes: &[u8]) -> Result<(Vec<u8>, usize), FrameDecodeError> {
    if bytes.len() < LEN_SIZE {
        return Err(FrameDecodeError::NeedMore);
    }
    let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if len > MAX_FRAME_LEN as usize {
        return Err(FrameDecodeError::TooLarge);
    }
    if bytes.len() < LEN_SIZE + len {
        return Err(FrameDecodeError::NeedMore);
    }
    Ok((bytes[LEN_SIZE..LEN_SIZE + len].to_vec(), LEN_SIZE + len))
}

/// Error decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameDecodeError {
    #[error("need more bytes")]
    NeedMore,
    #[error("frame too large")]
    TooLarge,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let frame = encode_frame(b"?*+-,1").unwrap();
        let (payload, n) = decode_frame(&frame).unwrap();
        assert_eq!(payload, b"?*+-,1");
        assert_eq!(n, frame.len());
    }

    #[test]
    fn partial_read_need_more() {
        let frame = encode_frame(b"Alice, 30, F, 123, 0, 7").unwrap();
        assert!(matches!(
            decode_frame(&frame[..2]),
            Err(FrameDecodeError::NeedMore)
        ));
        assert!(matches!(
            decode_frame(&frame[..LEN_SIZE]),
            Err(FrameDecodeError::NeedMore)
        ));
    }

    #[test]
    fn multiple_frames() {
        let fa = encode_frame(b"?*").unwrap();
        let fb = encode_frame(b"+-,1").unwrap();
        let mut buf = Vec::new();
        buf.extend_from_slice(&fa);
        buf.extend_from_slice(&fb);
        let (p1, n1) = decode_frame(&buf).unwrap();
        assert_eq!(p1, b"?*");
        let (p2, n2) = decode_frame(&buf[n1..]).unwrap();
        assert_eq!(p2, b"+-,1");
        assert_eq!(n1 + n2, buf.len());
    }

    #[test]
    fn oversized_length_prefix_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_LEN + 1).to_le_bytes());
        buf.extend_from_slice(b"junk");
        assert!(matches!(
            decode_frame(&buf),
            Err(FrameDecodeError::TooLarge)
        ));
    }

    #[test]
    fn empty_payload_frames() {
        let frame = encode_frame(b"").unwrap();
        let (payload, n) = decode_frame(&frame).unwrap();
        assert!(payload.is_empty());
        assert_eq!(n, LEN_SIZE);
    }
}
