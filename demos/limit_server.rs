//! Concurrency-limited echo server example.
//!
//! This example accepts at most two clients at a time and echoes back
//! whatever they send. A third client waits until one of the first two
//! disconnects.
//!
//! Run with: cargo run --example limit_server
//! Then connect with: cargo run --example reconnect_client

use connguard::transport::TcpAcceptor;
use connguard::{Connection, LimitListener, Listener};
use std::thread;

const BIND_ADDR: &str = "127.0.0.1:30500";
const MAX_CLIENTS: usize = 2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Starting echo server on {BIND_ADDR} (max {MAX_CLIENTS} clients)...");

    let listener = LimitListener::new(TcpAcceptor::bind(BIND_ADDR)?, MAX_CLIENTS);

    loop {
        let conn = match listener.accept() {
            Ok(conn) => conn,
            Err(e) => {
                eprintln!("Accept error: {e}");
                continue;
            }
        };

        let peer = conn.peer_addr();
        println!(
            "New connection from {peer:?} ({} slots left)",
            listener.available()
        );

        // Handle each connection in a separate thread
        thread::spawn(move || {
            let mut buf = [0u8; 1024];
            loop {
                match conn.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        println!("Received {n} bytes from {peer:?}");
                        if let Err(e) = conn.write(&buf[..n]) {
                            eprintln!("Failed to echo: {e}");
                            break;
                        }
                    }
                    Err(e) => {
                        eprintln!("Connection error: {e}");
                        break;
                    }
                }
            }
            let _ = conn.close();
            println!("Connection closed: {peer:?}");
        });
    }
}
