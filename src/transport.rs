//! MIDI transport
//!
//! The surface writes through a [`MidiSink`]. Hardware ports are opened with
//! midir; incoming bytes are pushed from the midir driver thread into a
//! bounded tokio channel with `try_send` so the driver thread never blocks.

use crate::error::TransportError;
use crate::midi::format_hex;
use midir::{MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection, MidiOutputPort};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Capacity of the input channel between the driver thread and the runtime
pub const INPUT_QUEUE_CAPACITY: usize = 1000;

/// Destination for encoded device messages
pub trait MidiSink: Send + Sync {
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError>;
}

/// Output half of a hardware connection
pub struct MidiOutputSink {
    port_name: String,
    conn: Mutex<MidiOutputConnection>,
}

impl MidiOutputSink {
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiSink for MidiOutputSink {
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        trace!("-> {}", format_hex(bytes));
        self.conn.lock().send(bytes).map_err(|e| TransportError::Send {
            len: bytes.len(),
            reason: e.to_string(),
        })
    }
}

/// Open input and output ports of one device
pub struct MidiConnection {
    input_name: String,
    /// Dropping it closes the input port
    _input: MidiInputConnection<()>,
    output: Arc<MidiOutputSink>,
}

impl MidiConnection {
    /// Open the first ports whose names contain the patterns (case-insensitive)
    pub fn open(
        input_pattern: &str,
        output_pattern: &str,
        input_tx: mpsc::Sender<Vec<u8>>,
    ) -> Result<Self, TransportError> {
        info!(
            "Connecting to MIDI ports - Input: '{}', Output: '{}'",
            input_pattern, output_pattern
        );

        let midi_in = MidiInput::new("surface-rt-input")
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!("Found {} MIDI input ports", midi_in.port_count());
        let (in_port, input_name) = find_input_port(&midi_in, input_pattern)
            .ok_or_else(|| TransportError::PortNotFound(input_pattern.to_string()))?;

        info!("Connecting to input port: {}", input_name);
        let input = midi_in
            .connect(
                &in_port,
                "surface-rt",
                move |_timestamp, data, _| {
                    if let Err(e) = input_tx.try_send(data.to_vec()) {
                        debug!("Dropping MIDI input {}: {}", format_hex(data), e);
                    }
                },
                (),
            )
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let midi_out = MidiOutput::new("surface-rt-output")
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!("Found {} MIDI output ports", midi_out.port_count());
        let (out_port, output_name) = find_output_port(&midi_out, output_pattern)
            .ok_or_else(|| TransportError::PortNotFound(output_pattern.to_string()))?;

        info!("Connecting to output port: {}", output_name);
        let conn = midi_out
            .connect(&out_port, "surface-rt")
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Self {
            input_name,
            _input: input,
            output: Arc::new(MidiOutputSink {
                port_name: output_name,
                conn: Mutex::new(conn),
            }),
        })
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn sink(&self) -> Arc<MidiOutputSink> {
        Arc::clone(&self.output)
    }
}

fn matches(name: &str, pattern: &str) -> bool {
    name.to_lowercase().contains(&pattern.to_lowercase())
}

fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(MidiInputPort, String)> {
    midi_in.ports().into_iter().find_map(|port| {
        let name = midi_in.port_name(&port).ok()?;
        matches(&name, pattern).then(|| {
            debug!("Found port '{}' matching pattern '{}'", name, pattern);
            (port, name)
        })
    })
}

fn find_output_port(midi_out: &MidiOutput, pattern: &str) -> Option<(MidiOutputPort, String)> {
    midi_out.ports().into_iter().find_map(|port| {
        let name = midi_out.port_name(&port).ok()?;
        matches(&name, pattern).then(|| {
            debug!("Found port '{}' matching pattern '{}'", name, pattern);
            (port, name)
        })
    })
}

/// Sink for `--dry-run`: logs what would be sent
#[derive(Debug, Default)]
pub struct LogSink;

impl MidiSink for LogSink {
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        debug!("[dry-run] -> {}", format_hex(bytes));
        Ok(())
    }
}

/// Records every message; can be switched to fail
#[derive(Debug, Default)]
pub struct MemorySink {
    sent: Mutex<Vec<Vec<u8>>>,
    failing: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Drain the recorded messages
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl MidiSink for MemorySink {
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().push(bytes.to_vec());
        Ok(())
    }
}

/// MIDI port discovery
pub mod discovery {
    use super::*;

    #[derive(Debug, Clone)]
    pub struct PortInfo {
        pub index: usize,
        pub name: String,
        pub is_virtual: bool,
    }

    fn is_virtual(name: &str) -> bool {
        name.contains("Virtual") || name.contains("loopMIDI") || name.contains("IAC")
    }

    pub fn discover_input_ports() -> Result<Vec<PortInfo>, TransportError> {
        let midi_in = MidiInput::new("surface-rt-discovery")
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(midi_in
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                let name = midi_in.port_name(port).ok()?;
                Some(PortInfo { index, is_virtual: is_virtual(&name), name })
            })
            .collect())
    }

    pub fn discover_output_ports() -> Result<Vec<PortInfo>, TransportError> {
        let midi_out = MidiOutput::new("surface-rt-discovery")
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(midi_out
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                let name = midi_out.port_name(port).ok()?;
                Some(PortInfo { index, is_virtual: is_virtual(&name), name })
            })
            .collect())
    }

    /// First non-virtual input/output pair whose names contain `pattern`
    pub fn find_ports(pattern: &str) -> Option<(String, String)> {
        let find = |ports: Vec<PortInfo>| {
            ports
                .into_iter()
                .find(|p| !p.is_virtual && matches(&p.name, pattern))
                .map(|p| p.name)
        };
        let input = find(discover_input_ports().ok()?)?;
        let output = find(discover_output_ports().ok()?)?;
        Some((input, output))
    }

    pub fn print_ports() {
        let print = |ports: Result<Vec<PortInfo>, TransportError>| match ports {
            Ok(ports) => {
                for port in ports {
                    let virtual_tag = if port.is_virtual { " [VIRTUAL]" } else { "" };
                    println!("  {}: {}{}", port.index, port.name, virtual_tag);
                }
            }
            Err(e) => println!("  unavailable: {}", e),
        };

        println!("\n=== MIDI Input Ports ===");
        print(discover_input_ports());
        println!("\n=== MIDI Output Ports ===");
        print(discover_output_ports());
        println!();
    }
}
