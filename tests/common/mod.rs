//! Simulated I2C bus shared by the integration tests.
//!
//! Devices are plain register maps keyed by SMBus command. Every call that
//! reaches the transport is appended to an event log so tests can check
//! exactly what would have gone to the kernel.

#![allow(dead_code)]

use singleboard_hw::i2c::{
    I2cAddress, I2cBus, I2cTransport, SmbusBuffer, SmbusDirection, SmbusKind,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open(String),
    Select(u8),
    RawRead { address: u8, len: usize },
    RawWrite { address: u8, data: Vec<u8> },
    Smbus {
        address: Option<u8>,
        direction: SmbusDirection,
        command: u8,
        kind: SmbusKind,
        payload: Vec<u8>,
    },
}

#[derive(Debug, Default, Clone)]
pub struct SimDevice {
    /// Last bytes written per SMBus command.
    pub registers: HashMap<u8, Vec<u8>>,
    /// Responses for raw reads, oldest first. Zeros once exhausted.
    pub raw_reads: VecDeque<Vec<u8>>,
    /// Length byte to report on block reads instead of the real length.
    pub block_length: Option<u8>,
}

#[derive(Debug, Default)]
pub struct SimState {
    pub events: Vec<Event>,
    pub devices: BTreeMap<u8, SimDevice>,
    pub fail_open: bool,
    pub fail_select: bool,
}

impl SimState {
    pub fn add_device(&mut self, address: u8) -> &mut SimDevice {
        self.devices.entry(address).or_default()
    }

    pub fn selects(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Select(a) => Some(*a),
                _ => None,
            })
            .collect()
    }

    pub fn opens(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Open(_)))
            .count()
    }

    pub fn smbus_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Smbus { .. }))
            .count()
    }

    /// (command, payload) of every SMBus write, in order.
    pub fn smbus_writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Smbus {
                    direction: SmbusDirection::Write,
                    command,
                    payload,
                    ..
                } => Some((*command, payload.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn raw_writes(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::RawWrite { data, .. } => Some(data.clone()),
                _ => None,
            })
            .collect()
    }
}

pub type Shared = Arc<Mutex<SimState>>;

pub struct SimTransport {
    state: Shared,
    selected: Option<u8>,
}

fn nack() -> io::Error {
    io::Error::other("no acknowledge")
}

impl I2cTransport for SimTransport {
    fn select_address(&mut self, address: I2cAddress) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::Select(address.value()));
        if state.fail_select {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.selected = Some(address.value());
        Ok(())
    }

    fn read(&mut self, address: I2cAddress, buf: &mut [u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::RawRead {
            address: address.value(),
            len: buf.len(),
        });
        let device = state.devices.get_mut(&address.value()).ok_or_else(nack)?;
        let response = device.raw_reads.pop_front().unwrap_or_default();
        buf.fill(0);
        let n = response.len().min(buf.len());
        buf[..n].copy_from_slice(&response[..n]);
        Ok(())
    }

    fn write(&mut self, address: I2cAddress, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::RawWrite {
            address: address.value(),
            data: data.to_vec(),
        });
        if state.devices.contains_key(&address.value()) {
            Ok(())
        } else {
            Err(nack())
        }
    }

    fn smbus(
        &mut self,
        direction: SmbusDirection,
        command: u8,
        kind: SmbusKind,
        data: Option<&mut SmbusBuffer>,
    ) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        let payload = match (direction, kind, data.as_deref()) {
            (SmbusDirection::Write, SmbusKind::ByteData, Some(buf)) => vec![buf[0]],
            (SmbusDirection::Write, SmbusKind::WordData, Some(buf)) => buf[..2].to_vec(),
            (SmbusDirection::Write, SmbusKind::BlockData, Some(buf)) => {
                buf[1..=buf[0] as usize].to_vec()
            }
            _ => Vec::new(),
        };
        state.events.push(Event::Smbus {
            address: self.selected,
            direction,
            command,
            kind,
            payload: payload.clone(),
        });

        let address = self.selected.ok_or_else(nack)?;
        let device = state.devices.get_mut(&address).ok_or_else(nack)?;
        match direction {
            SmbusDirection::Write => {
                if !payload.is_empty() {
                    device.registers.insert(command, payload);
                }
            }
            SmbusDirection::Read => {
                if let Some(buf) = data {
                    let stored = device.registers.get(&command).cloned().unwrap_or_default();
                    buf.fill(0);
                    match kind {
                        SmbusKind::BlockData => {
                            let n = stored.len().min(buf.len() - 1);
                            buf[0] = device.block_length.unwrap_or(n as u8);
                            buf[1..=n].copy_from_slice(&stored[..n]);
                        }
                        _ => {
                            let n = stored.len().min(2);
                            buf[..n].copy_from_slice(&stored[..n]);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// A bus backed by a fresh simulation, plus a handle on its state.
pub fn sim_bus(bus_id: u8) -> (I2cBus<SimTransport>, Shared) {
    let state: Shared = Arc::new(Mutex::new(SimState::default()));
    let opener_state = state.clone();
    let bus = I2cBus::with_opener(bus_id, move |path: &str| {
        let mut guard = opener_state.lock().unwrap();
        guard.events.push(Event::Open(path.to_string()));
        if guard.fail_open {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        Ok(SimTransport {
            state: opener_state.clone(),
            selected: None,
        })
    });
    (bus, state)
}
