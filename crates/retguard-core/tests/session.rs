//! End-to-end session scenarios over a socket pair
//!
//! Each test plays the driver side of the wire protocol against a real
//! session running in its own thread. Tests are serialized because the
//! live-connection count is process-wide.

use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::Mutex;
use std::thread;

use retguard_core::group::TracedProcesses;
use retguard_core::protocol::{Frame, MessageKind, ProtocolError, FRAME_LEN};
use retguard_core::session::Session;
use retguard_core::stack::Violation;
use retguard_core::transport::{Connection, TransportError};
use retguard_core::types::Address;
use retguard_core::RetguardError;

static LOCK: Mutex<()> = Mutex::new(());

fn spawn_session(server: UnixStream) -> thread::JoinHandle<retguard_core::Result<()>>
{
    thread::spawn(move || Session::new(Connection::from(server)).run())
}

fn read_continue(client: &mut UnixStream)
{
    let mut reply = [0u8; FRAME_LEN];
    client.read_exact(&mut reply).unwrap();
    assert_eq!(Frame::decode(&reply).unwrap(), Frame::continue_reply());
}

/// After the session thread has exited, nothing further may arrive.
fn assert_no_more_replies(client: &mut UnixStream)
{
    let mut rest = [0u8; FRAME_LEN];
    assert_eq!(client.read(&mut rest).unwrap(), 0);
}

#[test]
fn test_matched_call_ret_grants_one_continue()
{
    let _guard = LOCK.lock().unwrap();
    let (mut client, server) = UnixStream::pair().unwrap();
    let handle = spawn_session(server);

    client.write_all(&Frame::call(Address::from(0x1000)).encode()).unwrap();
    client.write_all(&Frame::ret(Address::from(0x1000)).encode()).unwrap();
    read_continue(&mut client);

    client.shutdown(Shutdown::Write).unwrap();
    assert!(handle.join().unwrap().is_ok());
    assert_no_more_replies(&mut client);
}

#[test]
fn test_nested_calls_grant_one_continue_per_ret()
{
    let _guard = LOCK.lock().unwrap();
    let (mut client, server) = UnixStream::pair().unwrap();
    let handle = spawn_session(server);

    client.write_all(&Frame::call(Address::from(0x1000)).encode()).unwrap();
    client.write_all(&Frame::call(Address::from(0x2000)).encode()).unwrap();
    client.write_all(&Frame::ret(Address::from(0x2000)).encode()).unwrap();
    read_continue(&mut client);
    client.write_all(&Frame::ret(Address::from(0x1000)).encode()).unwrap();
    read_continue(&mut client);

    client.shutdown(Shutdown::Write).unwrap();
    assert!(handle.join().unwrap().is_ok());
    assert_no_more_replies(&mut client);
}

#[test]
fn test_mismatched_ret_is_a_violation_with_no_continue()
{
    let _guard = LOCK.lock().unwrap();
    let (mut client, server) = UnixStream::pair().unwrap();
    let handle = spawn_session(server);

    client.write_all(&Frame::call(Address::from(0x1000)).encode()).unwrap();
    client.write_all(&Frame::call(Address::from(0x2000)).encode()).unwrap();
    client.write_all(&Frame::ret(Address::from(0x1000)).encode()).unwrap();

    match handle.join().unwrap() {
        Err(RetguardError::Violation(Violation::Mismatch { expected, actual })) => {
            assert_eq!(expected, Address::from(0x2000));
            assert_eq!(actual, Address::from(0x1000));
        }
        other => panic!("expected a mismatch violation, got {:?}", other),
    }
    assert_no_more_replies(&mut client);
}

#[test]
fn test_signal_wildcard_absorbs_any_return()
{
    let _guard = LOCK.lock().unwrap();
    let (mut client, server) = UnixStream::pair().unwrap();
    let handle = spawn_session(server);

    client.write_all(&Frame::new_signal().encode()).unwrap();
    client.write_all(&Frame::ret(Address::from(0xDEAD)).encode()).unwrap();
    read_continue(&mut client);

    client.shutdown(Shutdown::Write).unwrap();
    assert!(handle.join().unwrap().is_ok());
}

#[test]
fn test_bare_ret_underflows_with_no_continue()
{
    let _guard = LOCK.lock().unwrap();
    let (mut client, server) = UnixStream::pair().unwrap();
    let handle = spawn_session(server);

    client.write_all(&Frame::ret(Address::from(0x1)).encode()).unwrap();

    match handle.join().unwrap() {
        Err(RetguardError::Violation(Violation::StackUnderflow(target))) => {
            assert_eq!(target, Address::from(0x1));
        }
        other => panic!("expected a stack underflow, got {:?}", other),
    }
    assert_no_more_replies(&mut client);
}

#[test]
fn test_clean_disconnect_ends_session_and_decrements_count()
{
    let _guard = LOCK.lock().unwrap();
    let before = TracedProcesses::live();

    let (client, server) = UnixStream::pair().unwrap();
    let handle = spawn_session(server);
    drop(client);

    assert!(handle.join().unwrap().is_ok());
    assert_eq!(TracedProcesses::live(), before);
}

#[test]
fn test_count_decrements_even_on_violation()
{
    let _guard = LOCK.lock().unwrap();
    let before = TracedProcesses::live();

    let (mut client, server) = UnixStream::pair().unwrap();
    let handle = spawn_session(server);
    client.write_all(&Frame::ret(Address::from(0x1)).encode()).unwrap();

    assert!(handle.join().unwrap().is_err());
    assert_eq!(TracedProcesses::live(), before);
}

#[test]
fn test_short_read_mid_frame_is_fatal()
{
    let _guard = LOCK.lock().unwrap();
    let (mut client, server) = UnixStream::pair().unwrap();
    let handle = spawn_session(server);

    client.write_all(&Frame::call(Address::from(0x1000)).encode()[..5]).unwrap();
    client.shutdown(Shutdown::Write).unwrap();

    match handle.join().unwrap() {
        Err(RetguardError::Transport(TransportError::ShortRead { want, got })) => {
            assert_eq!(want, FRAME_LEN);
            assert_eq!(got, 5);
        }
        other => panic!("expected a short read, got {:?}", other),
    }
}

#[test]
fn test_unknown_header_is_fatal()
{
    let _guard = LOCK.lock().unwrap();
    let (mut client, server) = UnixStream::pair().unwrap();
    let handle = spawn_session(server);

    let mut bytes = Frame::call(Address::from(0x1000)).encode();
    bytes[..4].copy_from_slice(b"JUNK");
    client.write_all(&bytes).unwrap();

    match handle.join().unwrap() {
        Err(RetguardError::Protocol(ProtocolError::UnknownHeader(tag))) => {
            assert_eq!(&tag, b"JUNK");
        }
        other => panic!("expected an unknown header error, got {:?}", other),
    }
}

#[test]
fn test_continue_from_the_driver_is_fatal()
{
    let _guard = LOCK.lock().unwrap();
    let (mut client, server) = UnixStream::pair().unwrap();
    let handle = spawn_session(server);

    client.write_all(&Frame::continue_reply().encode()).unwrap();

    match handle.join().unwrap() {
        Err(RetguardError::Protocol(ProtocolError::UnexpectedKind(kind))) => {
            assert_eq!(kind, MessageKind::Continue);
        }
        other => panic!("expected an unexpected-kind error, got {:?}", other),
    }
}
