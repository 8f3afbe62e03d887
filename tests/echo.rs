mod common;

use std::io::{Read, Write};
use std::sync::atomic::Ordering;

use common::TestServer;
use switchboard::protocols::echo::Echo;

#[test]
fn echoes_a_u64_stream_round_trip() {
    let server = TestServer::start(2, Echo::default);
    let mut stream = server.connect();

    let mut sent = Vec::new();
    for i in 0u64..16384 {
        sent.extend_from_slice(&i.to_le_bytes());
    }
    stream.write_all(&sent).unwrap();

    let mut received = vec![0u8; sent.len()];
    stream.read_exact(&mut received).unwrap();
    assert_eq!(received, sent);
    assert!(server.stats.connections_count.load(Ordering::Relaxed) >= 1);
}

#[test]
fn three_concurrent_clients_each_see_their_own_bytes_back() {
    let server = TestServer::start(4, Echo::default);

    let handles: Vec<_> = (0..3u8)
        .map(|id| {
            let mut stream = server.connect();
            std::thread::spawn(move || {
                let mut sent = Vec::new();
                for i in 0u64..4096 {
                    sent.extend_from_slice(&(i.wrapping_add(id as u64)).to_le_bytes());
                }
                stream.write_all(&sent).unwrap();
                let mut received = vec![0u8; sent.len()];
                stream.read_exact(&mut received).unwrap();
                assert_eq!(received, sent);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(server.stats.connections_count.load(Ordering::Relaxed) >= 1);
}
