//! Concurrency-limited listener scenarios.

use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use connguard::transport::{MemoryListener, TcpAcceptor, TcpConnection, memory};
use connguard::{Connection, LimitListener, LimitedConnection, Listener, OnceCloseListener};

type Accepted = LimitedConnection<connguard::transport::MemoryConnection>;

/// Run `accept` on another thread, reporting the result over a channel.
fn spawn_accept(
    listener: &Arc<LimitListener<MemoryListener>>,
) -> mpsc::Receiver<connguard::Result<Accepted>> {
    let (tx, rx) = mpsc::channel();
    let listener = listener.clone();
    thread::spawn(move || {
        let _ = tx.send(listener.accept());
    });
    rx
}

#[test]
fn accept_blocks_at_capacity_and_resumes_on_close() {
    let (inner, dialer) = memory::listener();
    let listener = Arc::new(LimitListener::new(inner, 2));
    let _clients: Vec<_> = (0..4).map(|_| dialer.dial().unwrap()).collect();

    let a = listener.accept().unwrap();
    let _b = listener.accept().unwrap();
    assert_eq!(listener.available(), 0);

    let pending_c = spawn_accept(&listener);
    assert!(pending_c.recv_timeout(Duration::from_millis(100)).is_err());

    a.close().unwrap();
    let c = pending_c
        .recv_timeout(Duration::from_secs(2))
        .unwrap()
        .unwrap();
    assert_eq!(listener.available(), 0);

    // B and C hold both permits, so a fourth accept waits.
    let pending_d = spawn_accept(&listener);
    assert!(pending_d.recv_timeout(Duration::from_millis(100)).is_err());

    listener.close().unwrap();
    drop(c);
    let result = pending_d.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(result.is_err());
}

#[test]
fn one_close_unblocks_exactly_one_accept() {
    let (inner, dialer) = memory::listener();
    let listener = Arc::new(LimitListener::new(inner, 1));
    let _clients: Vec<_> = (0..3).map(|_| dialer.dial().unwrap()).collect();

    let first = listener.accept().unwrap();
    let waiting = [spawn_accept(&listener), spawn_accept(&listener)];
    thread::sleep(Duration::from_millis(50));

    first.close().unwrap();
    thread::sleep(Duration::from_millis(100));

    let done: Vec<_> = waiting
        .iter()
        .filter_map(|rx| rx.try_recv().ok())
        .collect();
    assert_eq!(done.len(), 1);
    assert!(done[0].is_ok());
    assert_eq!(listener.available(), 0);

    // Unblock the remaining waiter so its thread can finish.
    drop(done);
    let finished = waiting
        .iter()
        .find_map(|rx| rx.recv_timeout(Duration::from_secs(2)).ok());
    assert!(finished.is_some());
}

#[test]
fn concurrent_close_releases_one_permit() {
    let (inner, dialer) = memory::listener();
    let listener = LimitListener::new(inner, 3);
    let _clients: Vec<_> = (0..3).map(|_| dialer.dial().unwrap()).collect();

    let conn = Arc::new(listener.accept().unwrap());
    let _others = [listener.accept().unwrap(), listener.accept().unwrap()];
    assert_eq!(listener.available(), 0);

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let conn = conn.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                conn.close().unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(listener.available(), 1);
    drop(conn);
    assert_eq!(listener.available(), 1);
}

#[test]
fn failed_accepts_do_not_leak_permits() {
    let (inner, _dialer) = memory::listener();
    let listener = LimitListener::new(OnceCloseListener::new(inner), 2);
    listener.close().unwrap();
    listener.close().unwrap();

    for _ in 0..5 {
        assert!(listener.accept().is_err());
    }
    assert_eq!(listener.available(), 2);
}

#[test]
fn tcp_limit_listener() {
    let listener = Arc::new(LimitListener::new(TcpAcceptor::bind("127.0.0.1:0").unwrap(), 1));
    let addr = listener.local_addr().unwrap();

    let client_a = TcpConnection::connect(addr).unwrap();
    let _client_b = TcpConnection::connect(addr).unwrap();

    let served_a = listener.accept().unwrap();
    assert_eq!(served_a.peer_addr(), client_a.local_addr());

    let (tx, rx) = mpsc::channel();
    {
        let listener = listener.clone();
        thread::spawn(move || {
            let _ = tx.send(listener.accept().map(|conn| conn.peer_addr()));
        });
    }
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    served_a.close().unwrap();
    let peer = rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();
    assert!(peer.is_some());
}
