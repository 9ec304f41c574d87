/*!
# A Tokio client for the HL7 MLLP network protocol.

 HL7's MLLP is a simple, single-byte-text based protocol for framing HL7 messages over a TCP (or similar) transport.
 The full specification is available at [the HL7 site](https://www.hl7.org/implement/standards/product_brief.cfm?product_id=55)
 (Note that they place the standards behind a free membership/login form).

 This crate provides [`MllpClient`], which performs one complete publish cycle per call: connect,
 wrap the message in MLLP framing, send it, then wait for the acknowledgement frame within a
 deadline. The outcome comes back as a structured value ([`Ack`] or [`SendError`]) rather than
 console output, so the cycle is usable and testable as a library operation. The underlying
 [`MllpCodec`] is exposed too, for stream-oriented use through a
 [Framed](tokio_util::codec::Framed) transport (see the listener demo).

 Message *content* is left alone: payloads and acknowledgements are moved around as opaque
 bytes, and the acknowledgement text is decoded leniently (invalid sequences are substituted,
 never fatal). Parsing MSA segments or validating HL7 structure belongs to a higher layer.

 ## Example
 ```no_run
 use hl7_mllp_client::MllpClient;

 #[tokio::main]
 async fn main() -> Result<(), Box<dyn std::error::Error>> {
     // 2575 is the registered MLLP port
     let client = MllpClient::new("127.0.0.1:2575");

     // Send some bytes wrapped in MLLP (Note: not a valid HL7 message)
     let ack = client.send(b"Hello World").await?;

     println!("Received response: {:?}", ack.message);
     Ok(())
 }
 ```
*/

pub mod client;
pub mod codec;
pub mod error;

pub use client::{Ack, MllpClient, DEFAULT_ACK_TIMEOUT, DEFAULT_MAX_ACK_BYTES};
pub use codec::{strip_frame, MllpCodec};
pub use error::SendError;
