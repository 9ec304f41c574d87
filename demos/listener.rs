//! A toy MLLP listener for exercising the client against: listens on
//! 127.0.0.1:2575 for inbound HL7 messages and answers each with a simple ACK.
//!
//! Run with `cargo run --example listener`, then point `hl7-send` or the
//! publisher demo at it. Not production ready; inbound messages just go to
//! the console.

use std::error::Error;

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use hl7_mllp_client::MllpCodec;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let listener = TcpListener::bind("127.0.0.1:2575").await?;
    println!("Listening on {}", listener.local_addr()?);

    loop {
        let (stream, _) = listener.accept().await?;

        tokio::spawn(async move {
            println!("Connection opened...");
            if let Err(e) = process(stream).await {
                println!("Failed to process connection; error = {}", e);
            }
        });
    }
}

async fn process(stream: TcpStream) -> Result<(), Box<dyn Error>> {
    let mut transport = Framed::new(stream, MllpCodec::new());

    while let Some(result) = transport.next().await {
        match result {
            Ok(message) => {
                println!("Got message: {:?}", message);

                let ack = BytesMut::from("\x06"); //<ACK> ascii char, simple ack
                transport.send(ack).await?; //the codec wraps it in the MLLP header/footer for us
                println!("  ACK sent...");
            }
            Err(e) => {
                println!("Error from MLLP transport: {:?}", e);
                return Err(e.into());
            }
        }
    }
    println!("Connection closed...");
    Ok(())
}
