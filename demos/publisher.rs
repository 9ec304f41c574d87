//! Publishes a single HL7 message through [`MllpClient`] and prints the
//! acknowledgement. Pair it with the listener demo.

use std::time::Duration;

use hl7_mllp_client::MllpClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let sample_hl7 = "MSH|^~\\&|EPIC|EPICADT|SMS|SMSADT|199912271408|CHARRIS|ADT^A04|1817457|D|2.5|\rPID||0493575^^^2^ID 1|454721||DOE^JOHN^^^^|DOE^JOHN^^^^|19480203|M||B|254 MYSTREET AVE^^MYTOWN^OH^44123^USA||(216)123-4567|||M|NON|400003403~1129086|";

    let client = MllpClient::new("127.0.0.1:2575").with_ack_timeout(Duration::from_secs(5));

    println!("Sending message, awaiting ack...");
    let ack = client.send(sample_hl7.as_bytes()).await?;
    println!("  Received response: {:?}", ack.message);

    Ok(())
}
