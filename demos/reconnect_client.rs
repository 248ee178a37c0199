//! Reconnecting client example.
//!
//! This example sends a few messages through a connection that dials
//! lazily and reconnects whenever a read times out.
//!
//! Run the server first: cargo run --example limit_server
//! Then run: cargo run --example reconnect_client

use connguard::transport::TcpConnection;
use connguard::{Connection, Options, ReconnectingConnection};
use std::time::Duration;

const SERVER_ADDR: &str = "127.0.0.1:30500";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = Options::default()
        .with_reconnect(true)
        .with_read_timeout(Duration::from_secs(2))
        .with_write_timeout(Duration::from_secs(2));

    let conn = ReconnectingConnection::new(|| TcpConnection::connect(SERVER_ADDR), options);
    println!("State before first use: {:?}", conn.state());

    for i in 1..=3 {
        let message = format!("Message #{i}");
        conn.write(message.as_bytes())?;
        println!("Sent {message:?} to {:?}", conn.peer_addr());

        let mut buf = [0u8; 1024];
        match conn.read(&mut buf)? {
            // Ok(0) after a timeout means the connection was replaced.
            0 => println!("No reply in time, reconnected"),
            n => println!("Reply: {:?}", String::from_utf8_lossy(&buf[..n])),
        }
    }

    println!("Dial stats: {:?}", conn.stats());
    conn.close()?;
    println!("\nDone!");
    Ok(())
}
