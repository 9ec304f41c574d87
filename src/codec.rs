//! MLLP framing: a [`tokio_util::codec`] encoder/decoder pair, plus the
//! lenient [`strip_frame`] helper the client applies to accumulated
//! acknowledgement bytes.

use std::io;

use bytes::{Buf, BufMut, BytesMut};
use log::{debug, trace};
use tokio_util::codec::{Decoder, Encoder};

const BLOCK_HEADER: u8 = 0x0B; //Vertical-Tab char, the marker for the start of a message
const BLOCK_FOOTER: [u8; 2] = [0x1C, 0x0D]; //File-Separator char + CR, the marker for the end of a message

/// A tokio codec for the HL7 MLLP network protocol.
///
/// Messages written through the codec are wrapped in the MLLP block
/// header/footer; messages read through it have the wrapping removed. It can
/// be driven by a [Framed](tokio_util::codec::Framed) stream, or standalone
/// for one-shot framing and for testing.
#[derive(Debug, Default)]
pub struct MllpCodec;

impl MllpCodec {
    /// Creates a new codec instance.
    pub fn new() -> Self {
        MllpCodec
    }
}

/// Offset of the first footer byte pair, scanning the whole buffer.
///
/// MLLP reserves the footer bytes for framing, so the first occurrence is
/// taken as end-of-message even if a misbehaving peer embedded the pair in
/// its payload.
pub(crate) fn footer_position(src: &[u8]) -> Option<usize> {
    src.windows(2).position(|pair| pair == BLOCK_FOOTER)
}

/// Removes MLLP framing from `bytes` without validating it.
///
/// One leading block-header byte is dropped if present, as is any trailing
/// run of footer bytes; anything else passes through unchanged. Malformed
/// input is therefore trimmed rather than rejected.
pub fn strip_frame(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_prefix(&[BLOCK_HEADER]).unwrap_or(bytes);
    let end = bytes
        .iter()
        .rposition(|b| !BLOCK_FOOTER.contains(b))
        .map_or(0, |i| i + 1);
    &bytes[..end]
}

// Encodes an outbound message as an MLLP frame. Used for the primary HL7
// message on the publishing side, and for ACK/NAK replies on the listening side.
impl Encoder<BytesMut> for MllpCodec {
    type Error = io::Error;

    fn encode(&mut self, item: BytesMut, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 3); //message plus header and footer

        dst.put_u8(BLOCK_HEADER);
        dst.put_slice(&item);
        dst.put_slice(&BLOCK_FOOTER);

        trace!("MLLP: encoded {} payload bytes for send", item.len());
        Ok(())
    }
}

// Decodes MLLP frames off a stream. Bytes ahead of the block header are not
// message data and are discarded; an incomplete frame stays buffered until
// more data arrives.
impl Decoder for MllpCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let start = match src.iter().position(|&b| b == BLOCK_HEADER) {
            Some(offset) => offset,
            None => {
                src.clear();
                return Ok(None);
            }
        };

        let end = match footer_position(&src[start..]) {
            Some(offset) => start + offset,
            None => {
                trace!("MLLP: no footer yet, awaiting more data");
                return Ok(None);
            }
        };

        debug!("MLLP: frame spans bytes {}..{}", start, end);

        let mut frame = src.split_to(end + BLOCK_FOOTER.len());
        frame.advance(start + 1); //skip anything ahead of the header, and the header itself
        frame.truncate(frame.len() - BLOCK_FOOTER.len());
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn wrap_for_mllp(s: &str) -> Bytes {
        Bytes::from(format!("\x0B{}\x1C\x0D", s))
    }

    fn wrap_for_mllp_mut(s: &str) -> BytesMut {
        BytesMut::from(format!("\x0B{}\x1C\x0D", s).as_str())
    }

    #[test]
    fn can_construct_without_error() {
        let _m = MllpCodec::new();
        let _m = MllpCodec::default();
    }

    #[test]
    fn wraps_simple_data() {
        let mut m = MllpCodec::new();
        let mut output_buf = BytesMut::with_capacity(64);

        m.encode(BytesMut::from("abcd"), &mut output_buf)
            .expect("Non OK value returned from encode");

        assert_eq!(output_buf.freeze(), wrap_for_mllp("abcd"));
    }

    #[test]
    fn empty_message_still_gets_framed() {
        let mut m = MllpCodec::new();
        let mut output_buf = BytesMut::new();

        m.encode(BytesMut::new(), &mut output_buf).unwrap();

        assert_eq!(&output_buf[..], b"\x0B\x1C\x0D");
    }

    #[test]
    fn framed_message_is_three_bytes_longer() {
        let mut m = MllpCodec::new();
        let mut output_buf = BytesMut::new();

        m.encode(BytesMut::from("MSA|AA"), &mut output_buf).unwrap();

        assert_eq!(output_buf.len(), "MSA|AA".len() + 3);
        assert_eq!(output_buf[0], 0x0B);
        assert_eq!(&output_buf[output_buf.len() - 2..], b"\x1C\x0D");
    }

    #[test]
    fn find_footer_location() {
        let data = wrap_for_mllp_mut("abcd"); //footer lands at position 5, after the header byte
        assert_eq!(footer_position(&data), Some(5));
    }

    #[test]
    fn missing_footer_detected() {
        let data = BytesMut::from("no footer");
        assert_eq!(footer_position(&data), None);
    }

    #[test]
    fn ensure_decoder_finds_simple_message() {
        let mut data = wrap_for_mllp_mut("abcd");
        let mut m = MllpCodec::new();

        match m.decode(&mut data) {
            Ok(Some(message)) => assert_eq!(&message[..], b"abcd"),
            Ok(None) => panic!("Failed to find a simple message!"),
            Err(err) => panic!("Error looking for simple message: {:?}", err),
        }
    }

    #[test]
    fn ensure_data_before_header_is_ignored() {
        let mut data = BytesMut::from("junk\x0BTest Data\x1C\x0D");
        let mut m = MllpCodec::new();

        match m.decode(&mut data) {
            Ok(Some(message)) => assert_eq!(&message[..], b"Test Data"),
            other => panic!("Failure decoding message with leading noise: {:?}", other),
        }
    }

    #[test]
    fn ensure_data_after_end_is_ignored() {
        // The MLLP spec states:
        // "the Source system shall not send new HL7 content until an acknowledgement for the previous HL7 Content has been received."
        // so trailing data is a peer bug; we just leave it in the buffer.
        let mut data = BytesMut::from("\x0BTest Data\x1C\x0DMore Data");
        let mut m = MllpCodec::new();

        match m.decode(&mut data) {
            Ok(Some(message)) => assert_eq!(&message[..], b"Test Data"),
            other => panic!("Failure for message with illegal trailing data: {:?}", other),
        }
    }

    #[test]
    fn test_message_split_over_multiple_reads() {
        // Framed hands the decoder a growing buffer; an incomplete frame must
        // come back as None with the bytes left in place.
        let mut m = MllpCodec::new();
        let mut data = BytesMut::from("\x0BTest");

        assert!(matches!(m.decode(&mut data), Ok(None)));

        data.extend_from_slice(b" Data");
        assert!(matches!(m.decode(&mut data), Ok(None)));

        data.extend_from_slice(b" Here\x1C\x0D");
        match m.decode(&mut data) {
            Ok(Some(message)) => assert_eq!(&message[..], b"Test Data Here"),
            other => panic!("Expected completed frame, got {:?}", other),
        }
    }

    #[test]
    fn decoder_consumes_the_frame_it_returns() {
        let mut data = wrap_for_mllp_mut("Test Data");
        let mut m = MllpCodec::new();

        let _ = m.decode(&mut data);

        assert_eq!(data.len(), 0, "Decoder left frame bytes in the buffer");
    }

    #[test]
    fn decoder_handles_back_to_back_frames() {
        let mut m = MllpCodec::new();
        let mut data = wrap_for_mllp_mut("Test Data");
        data.extend_from_slice(&wrap_for_mllp("This is different"));

        match m.decode(&mut data) {
            Ok(Some(message)) => assert_eq!(&message[..], b"Test Data"),
            other => panic!("Error decoding first message: {:?}", other),
        }

        match m.decode(&mut data) {
            Ok(Some(message)) => assert_eq!(&message[..], b"This is different"),
            other => panic!("Error decoding second message: {:?}", other),
        }
    }

    #[test]
    fn test_real_message() {
        let mut m = MllpCodec::new();
        let mut data = wrap_for_mllp_mut("MSH|^~\\&|ZIS|1^AHospital|||200405141144||¶ADT^A01|20041104082400|P|2.3|||AL|NE|||8859/15|¶EVN|A01|20041104082400.0000+0100|20041104082400¶PID||\"\"|10||Vries^Danny^D.^^de||19951202|M|||Rembrandlaan^7^Leiden^^7301TH^\"\"^^P||\"\"|\"\"||\"\"|||||||\"\"|\"\"¶PV1||I|3w^301^\"\"^01|S|||100^van den Berg^^A.S.^^\"\"^dr|\"\"||9||||H||||20041104082400.0000+0100");

        match m.decode(&mut data) {
            Ok(Some(message)) => assert_eq!(message.len(), 338),
            other => panic!("Error decoding real message: {:?}", other),
        }
    }

    #[test]
    fn strip_frame_round_trips_with_encode() {
        let payload = b"MSA|AA|MSG00001";
        let mut m = MllpCodec::new();
        let mut framed = BytesMut::new();
        m.encode(BytesMut::from(&payload[..]), &mut framed).unwrap();

        assert_eq!(strip_frame(&framed), payload);
    }

    #[test]
    fn strip_frame_removes_header_and_footer() {
        assert_eq!(strip_frame(b"\x0BMSA|AA\x1C\x0D"), b"MSA|AA");
    }

    #[test]
    fn strip_frame_trims_partial_and_repeated_footers() {
        assert_eq!(strip_frame(b"\x0BMSA|AA\x1C"), b"MSA|AA");
        assert_eq!(strip_frame(b"\x0BMSA|AA\x1C\x0D\x1C\x0D"), b"MSA|AA");
    }

    #[test]
    fn strip_frame_passes_unframed_bytes_through() {
        assert_eq!(strip_frame(b"MSA|AA"), b"MSA|AA");
    }

    #[test]
    fn strip_frame_of_pure_framing_is_empty() {
        assert_eq!(strip_frame(b"\x0B\x1C\x0D"), b"");
        assert_eq!(strip_frame(b""), b"");
    }
}
