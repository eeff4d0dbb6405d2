//! I2C bus and endpoint behaviour against a simulated kernel interface.
//!
//! These tests verify address caching, framing checks and error mapping
//! without requiring hardware.

mod common;

use common::{sim_bus, Event};
use singleboard_hw::i2c::{I2cAddress, SmbusDirection, SmbusKind};
use singleboard_hw::{Error, I2cWritable};

#[test]
fn test_bus_opens_lazily_and_once() {
    let (mut bus, state) = sim_bus(1);
    state.lock().unwrap().add_device(0x40);
    assert!(!bus.is_open());
    assert_eq!(state.lock().unwrap().opens(), 0);

    let mut dev = bus.endpoint(0x40).unwrap();
    dev.write_byte(0x01, 0xAA).unwrap();
    dev.write_byte(0x02, 0xBB).unwrap();
    assert!(bus.is_open());

    let state = state.lock().unwrap();
    assert_eq!(state.opens(), 1);
    assert_eq!(state.events[0], Event::Open("/dev/i2c-1".to_string()));
}

#[test]
fn test_open_failure_reports_path() {
    let (mut bus, state) = sim_bus(3);
    state.lock().unwrap().fail_open = true;
    let err = bus.endpoint(0x40).unwrap().read_byte(0).unwrap_err();
    match err {
        Error::DeviceOpenFailed { path, .. } => assert_eq!(path, "/dev/i2c-3"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!bus.is_open());
}

#[test]
fn test_address_selected_only_on_change() {
    let (mut bus, state) = sim_bus(1);
    {
        let mut s = state.lock().unwrap();
        s.add_device(0x40);
        s.add_device(0x41);
    }

    bus.endpoint(0x40).unwrap().write_byte(0x00, 1).unwrap();
    bus.endpoint(0x40).unwrap().write_byte(0x01, 2).unwrap();
    bus.endpoint(0x41).unwrap().read_byte(0x00).unwrap();
    bus.endpoint(0x41).unwrap().read_word(0x00).unwrap();
    bus.endpoint(0x40).unwrap().read_byte(0x01).unwrap();

    assert_eq!(state.lock().unwrap().selects(), vec![0x40, 0x41, 0x40]);
    assert_eq!(bus.current_address(), Some(I2cAddress::new(0x40).unwrap()));
    let endpoints: Vec<u8> = bus.endpoints().map(|a| a.value()).collect();
    assert_eq!(endpoints, vec![0x40, 0x41]);
}

#[test]
fn test_select_failure_clears_cached_address() {
    let (mut bus, state) = sim_bus(1);
    state.lock().unwrap().add_device(0x50);
    bus.endpoint(0x50).unwrap().read_byte(0).unwrap();

    state.lock().unwrap().fail_select = true;
    let err = bus.endpoint(0x51).unwrap().read_byte(0).unwrap_err();
    assert!(matches!(err, Error::AddressSelectFailed { bus: 1, .. }));
    assert_eq!(bus.current_address(), None);

    // Even the previously selected address must be selected again
    state.lock().unwrap().fail_select = false;
    bus.endpoint(0x50).unwrap().read_byte(0).unwrap();
    assert_eq!(state.lock().unwrap().selects(), vec![0x50, 0x51, 0x50]);
}

#[test]
fn test_raw_transfers_do_not_select() {
    let (mut bus, state) = sim_bus(1);
    state
        .lock()
        .unwrap()
        .add_device(0x62)
        .raw_reads
        .push_back(vec![0x34, 0x12]);

    let mut dev = bus.endpoint(0x62).unwrap();
    dev.write(&[1, 2, 3]).unwrap();
    dev.send_word(0xBEEF).unwrap();
    assert_eq!(dev.receive_word().unwrap(), 0x1234);

    let state = state.lock().unwrap();
    assert!(state.selects().is_empty());
    assert_eq!(state.raw_writes(), vec![vec![1, 2, 3], vec![0xEF, 0xBE]]);
    assert!(state.events.contains(&Event::RawRead { address: 0x62, len: 2 }));
}

#[test]
fn test_word_is_little_endian() {
    let (mut bus, state) = sim_bus(1);
    state.lock().unwrap().add_device(0x40);

    let mut dev = bus.endpoint(0x40).unwrap();
    dev.write_word(0x06, 0x1234).unwrap();
    assert_eq!(dev.read_word(0x06).unwrap(), 0x1234);
    assert_eq!(
        state.lock().unwrap().smbus_writes(),
        vec![(0x06, vec![0x34, 0x12])]
    );
}

#[test]
fn test_block_round_trip() {
    let (mut bus, state) = sim_bus(1);
    state.lock().unwrap().add_device(0x20);
    let data: Vec<u8> = (1..=32).collect();

    let mut dev = bus.endpoint(0x20).unwrap();
    dev.write_block(0x10, &data).unwrap();
    assert_eq!(dev.read_block(0x10).unwrap(), data);
    dev.write_block(0x11, &[]).unwrap();
    assert!(dev.read_block(0x11).unwrap().is_empty());
}

#[test]
fn test_oversized_block_write_never_reaches_kernel() {
    let (mut bus, state) = sim_bus(1);
    state.lock().unwrap().add_device(0x20);

    let err = bus
        .endpoint(0x20)
        .unwrap()
        .write_block(0x10, &[0u8; 33])
        .unwrap_err();
    assert!(matches!(err, Error::ProtocolViolation { .. }));
    let state = state.lock().unwrap();
    assert_eq!(state.smbus_count(), 0);
    assert!(state.selects().is_empty());
}

#[test]
fn test_block_read_with_bad_length_byte() {
    let (mut bus, state) = sim_bus(1);
    {
        let mut s = state.lock().unwrap();
        let dev = s.add_device(0x20);
        dev.registers.insert(0x10, vec![0xAA; 4]);
        dev.block_length = Some(33);
    }
    let err = bus.endpoint(0x20).unwrap().read_block(0x10).unwrap_err();
    assert!(matches!(err, Error::ProtocolViolation { .. }));
}

#[test]
fn test_typed_block_length_must_match() {
    let (mut bus, state) = sim_bus(1);
    state
        .lock()
        .unwrap()
        .add_device(0x20)
        .registers
        .insert(0x10, vec![1, 2, 3]);

    let mut dev = bus.endpoint(0x20).unwrap();
    assert_eq!(dev.decode_block::<[u8; 3]>(0x10).unwrap(), [1, 2, 3]);
    assert!(matches!(
        dev.decode_block::<[u8; 4]>(0x10),
        Err(Error::ProtocolViolation { .. })
    ));
    dev.encode_block(0x11, &[9u8, 8]).unwrap();
    assert_eq!(dev.read_block(0x11).unwrap(), vec![9, 8]);
}

struct Truncating;

impl I2cWritable for Truncating {
    const DATA_LENGTH: usize = 3;
    fn to_bytes(&self) -> Vec<u8> {
        vec![1, 2]
    }
}

#[test]
fn test_encode_rejects_wrong_length() {
    let (mut bus, state) = sim_bus(1);
    state.lock().unwrap().add_device(0x30);

    let mut dev = bus.endpoint(0x30).unwrap();
    assert!(matches!(
        dev.encode(&Truncating),
        Err(Error::ProtocolViolation { .. })
    ));
    assert!(matches!(
        dev.encode_block(0x01, &Truncating),
        Err(Error::ProtocolViolation { .. })
    ));
    assert!(state.lock().unwrap().raw_writes().is_empty());
    assert_eq!(state.lock().unwrap().smbus_count(), 0);
}

#[test]
fn test_ioctl_failure_names_operation() {
    let (mut bus, _state) = sim_bus(2);
    let err = bus.endpoint(0x77).unwrap().read_word(0x05).unwrap_err();
    match err {
        Error::IoFailure {
            bus,
            address,
            operation,
            ..
        } => {
            assert_eq!(bus, 2);
            assert_eq!(address.value(), 0x77);
            assert_eq!(operation, "SMBus read word");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_reachability_and_probe() {
    let (mut bus, state) = sim_bus(1);
    state.lock().unwrap().add_device(0x48);

    assert!(bus.endpoint(0x48).unwrap().reachable());
    assert!(bus.endpoint(0x48).unwrap().probe().is_ok());
    assert!(!bus.endpoint(0x49).unwrap().reachable());
    assert!(matches!(
        bus.endpoint(0x49).unwrap().probe(),
        Err(Error::UnreachableDevice { bus: 1, .. })
    ));

    // A probe is an SMBus byte read of command 0
    let state = state.lock().unwrap();
    assert!(state.events.contains(&Event::Smbus {
        address: Some(0x48),
        direction: SmbusDirection::Read,
        command: 0,
        kind: SmbusKind::ByteData,
        payload: vec![],
    }));
}

#[test]
fn test_scan_finds_present_devices() {
    let (mut bus, state) = sim_bus(1);
    {
        let mut s = state.lock().unwrap();
        s.add_device(0x40);
        s.add_device(0x62);
        s.add_device(0x03);
    }
    let found: Vec<u8> = bus
        .scan_default()
        .unwrap()
        .into_iter()
        .map(|a| a.value())
        .collect();
    assert_eq!(found, vec![0x40, 0x62]);
}

#[test]
fn test_scan_rejects_range_before_touching_bus() {
    let (mut bus, state) = sim_bus(1);
    state.lock().unwrap().add_device(0x7E);

    assert!(matches!(bus.scan(0x7E..=0x80), Err(Error::InvalidArgument(_))));
    assert!(!bus.is_open());
    let state = state.lock().unwrap();
    assert_eq!(state.opens(), 0);
    assert!(state.selects().is_empty());
    assert_eq!(state.smbus_count(), 0);
}

#[test]
fn test_scan_reports_open_failure() {
    let (mut bus, state) = sim_bus(0);
    state.lock().unwrap().fail_open = true;
    assert!(matches!(
        bus.scan_default(),
        Err(Error::DeviceOpenFailed { .. })
    ));
}

#[test]
fn test_quick_and_byte_commands() {
    let (mut bus, state) = sim_bus(1);
    state.lock().unwrap().add_device(0x10);

    let mut dev = bus.endpoint(0x10).unwrap();
    dev.write_quick(SmbusDirection::Write).unwrap();
    dev.smbus_send_byte(0x5A).unwrap();
    dev.smbus_receive_byte().unwrap();

    let state = state.lock().unwrap();
    let kinds: Vec<(SmbusKind, u8)> = state
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Smbus { kind, command, .. } => Some((*kind, *command)),
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            (SmbusKind::Quick, 0),
            (SmbusKind::Byte, 0x5A),
            (SmbusKind::Byte, 0)
        ]
    );
}

#[test]
fn test_bus_close_forgets_address() {
    let (mut bus, state) = sim_bus(1);
    state.lock().unwrap().add_device(0x40);
    bus.endpoint(0x40).unwrap().read_byte(0).unwrap();
    bus.close();
    assert!(!bus.is_open());
    bus.endpoint(0x40).unwrap().read_byte(0).unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.opens(), 2);
    assert_eq!(state.selects(), vec![0x40, 0x40]);
}
