//! Tests for the rendezvous transport

use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::thread;

use retguard_core::protocol::{Frame, FRAME_LEN};
use retguard_core::transport::{
    rendezvous_path, Connection, Listener, TransportError, RENDEZVOUS_DIR, RENDEZVOUS_SUFFIX_LEN,
};
use retguard_core::types::Address;

#[test]
fn test_rendezvous_paths_are_fresh_and_well_formed()
{
    let first = rendezvous_path().unwrap();
    let second = rendezvous_path().unwrap();

    assert_ne!(first, second);
    for path in [&first, &second] {
        assert!(path.starts_with(RENDEZVOUS_DIR));
        assert!(!path.exists());

        let name = path.file_name().unwrap().to_str().unwrap();
        let suffix = name.strip_prefix("retguard-").unwrap();
        assert_eq!(suffix.len(), RENDEZVOUS_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}

#[test]
fn test_bind_accept_and_exchange_frames()
{
    let path = rendezvous_path().unwrap();
    let listener = Listener::bind(&path).unwrap();

    let client_path = path.clone();
    let client = thread::spawn(move || {
        let mut stream = UnixStream::connect(&client_path).unwrap();
        stream.write_all(&Frame::call(Address::from(0xAB)).encode()).unwrap();

        let mut reply = [0u8; FRAME_LEN];
        stream.read_exact(&mut reply).unwrap();
        reply
    });

    let mut conn = listener.accept().unwrap();
    let bytes = conn.recv().unwrap().expect("expected a frame, not EOF");
    assert_eq!(Frame::decode(&bytes).unwrap(), Frame::call(Address::from(0xAB)));

    conn.send(&Frame::continue_reply()).unwrap();
    let reply = client.join().unwrap();
    assert_eq!(Frame::decode(&reply).unwrap(), Frame::continue_reply());
}

#[test]
fn test_clean_disconnect_yields_none()
{
    let (client, server) = UnixStream::pair().unwrap();
    let mut conn = Connection::from(server);

    drop(client);
    assert!(conn.recv().unwrap().is_none());
}

#[test]
fn test_disconnect_mid_frame_is_a_short_read()
{
    let (mut client, server) = UnixStream::pair().unwrap();
    let mut conn = Connection::from(server);

    client.write_all(&[1, 2, 3, 4, 5]).unwrap();
    client.shutdown(Shutdown::Write).unwrap();

    match conn.recv() {
        Err(TransportError::ShortRead { want, got }) => {
            assert_eq!(want, FRAME_LEN);
            assert_eq!(got, 5);
        }
        other => panic!("expected a short read, got {:?}", other),
    }
}

#[test]
fn test_frames_arrive_in_order()
{
    let (mut client, server) = UnixStream::pair().unwrap();
    let mut conn = Connection::from(server);

    for addr in [0x1u64, 0x2, 0x3] {
        client.write_all(&Frame::call(Address::from(addr)).encode()).unwrap();
    }

    for addr in [0x1u64, 0x2, 0x3] {
        let bytes = conn.recv().unwrap().unwrap();
        assert_eq!(Frame::decode(&bytes).unwrap(), Frame::call(Address::from(addr)));
    }
}

#[test]
fn test_listener_removes_socket_file_on_drop()
{
    let path = rendezvous_path().unwrap();
    let listener = Listener::bind(&path).unwrap();
    assert!(path.exists());

    drop(listener);
    assert!(!path.exists());
}
