//! Tests for platform-agnostic types

use retguard_core::types::{Address, ProcessId};

#[test]
fn test_process_id_from_u32()
{
    let pid = ProcessId::from(12345);
    assert_eq!(pid.0, 12345);
}

#[test]
fn test_process_id_to_u32()
{
    let pid = ProcessId::from(54321);
    let value: u32 = pid.into();
    assert_eq!(value, 54321);
}

#[test]
fn test_process_id_equality()
{
    let pid1 = ProcessId::from(12345);
    let pid2 = ProcessId::from(12345);
    let pid3 = ProcessId::from(54321);

    assert_eq!(pid1, pid2);
    assert_ne!(pid1, pid3);
}

#[test]
fn test_process_id_display()
{
    let pid = ProcessId::from(4242);
    assert_eq!(pid.to_string(), "4242");
}

#[test]
fn test_address_from_u64()
{
    let addr = Address::from(0x1000);
    assert_eq!(addr.value(), 0x1000);
}

#[test]
fn test_address_to_u64()
{
    let addr = Address::new(0xDEAD_BEEF);
    let value: u64 = addr.into();
    assert_eq!(value, 0xDEAD_BEEF);
}

#[test]
fn test_address_equality()
{
    let addr1 = Address::from(0x1000);
    let addr2 = Address::from(0x1000);
    let addr3 = Address::from(0x2000);

    assert_eq!(addr1, addr2);
    assert_ne!(addr1, addr3);
}

#[test]
fn test_address_display_is_fixed_width_hex()
{
    assert_eq!(Address::from(0x1000).to_string(), "0x0000000000001000");
    assert_eq!(Address::ZERO.to_string(), "0x0000000000000000");
    assert_eq!(Address::from(u64::MAX).to_string(), "0xffffffffffffffff");
}

#[test]
fn test_address_extreme_values_are_ordinary()
{
    // No bit pattern is reserved; zero and all-ones are plain addresses
    let zero = Address::ZERO;
    let max = Address::from(u64::MAX);
    assert_eq!(zero.value(), 0);
    assert_eq!(max.value(), u64::MAX);
    assert_ne!(zero, max);
}
