//! `hl7-send`: sends one HL7 message over MLLP and prints the acknowledgement.
//!
//! Glue around [`MllpClient`]; all protocol behaviour lives in the library.

use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use hl7_mllp_client::{MllpClient, SendError};

/// Sent when no file is given. Segments end with CR, as HL7 requires; this is
/// unrelated to the CR that closes the MLLP frame.
const SAMPLE_ADT: &str = "MSH|^~\\&|SendingApp|SendingFac|ReceivingApp|ReceivingFac|20240101120000||ADT^A01|MSG00001|P|2.5\rPID|1||123456^^^Hospital^MR||Doe^John||19800101|M|||123 Street^^Town^CT^12345||555-5555|\r";

#[derive(Parser)]
#[command(version, about = "Send an HL7 message over MLLP and print the acknowledgement")]
struct Args {
    /// Host name or address of the MLLP listener
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port the listener is bound to
    #[arg(long)]
    port: u16,

    /// File holding the HL7 message; a sample ADT^A01 is sent when omitted
    #[arg(long)]
    file: Option<PathBuf>,

    /// Seconds to wait for the acknowledgement
    #[arg(long, default_value_t = 5)]
    timeout: u64,
}

async fn run(args: Args) -> Result<(), String> {
    let message = match &args.file {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?,
        None => SAMPLE_ADT.to_string(),
    };

    let client = MllpClient::new(format!("{}:{}", args.host, args.port))
        .with_ack_timeout(Duration::from_secs(args.timeout));

    println!("Connecting to {}...", client.addr());
    match client.send(message.as_bytes()).await {
        Ok(ack) => {
            if !ack.complete {
                println!("(peer closed the connection mid-frame; partial acknowledgement follows)");
            }
            println!("\nReceived ACK:\n-----------------\n");
            println!("{}", ack.message);
            Ok(())
        }
        Err(SendError::AckTimeout(timeout)) => {
            Err(format!("timed out waiting for ACK after {:?}", timeout))
        }
        Err(SendError::EmptyResponse) => Err("no ACK received".to_string()),
        Err(e) => Err(format!("failed to send message: {}", e)),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("{}", e);
        process::exit(1);
    }
}
