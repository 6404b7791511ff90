//! Input monitor for debugging device profiles
//!
//! Prints every message from the device port together with what the active
//! profile makes of it: the decoded control event, a recognised SysEx reply,
//! or nothing when the surface would drop it.

use anyhow::{Context, Result};
use colored::*;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::control::{ControlRegistry, InputEvent};
use crate::devices::DeviceProtocol;
use crate::midi::{format_hex, MidiMessage};
use crate::transport::{discovery, MidiConnection, INPUT_QUEUE_CAPACITY};

/// What the surface would do with one incoming message
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Event(InputEvent),
    SysEx(String),
    /// Parsed, but no control answers to it
    Unassigned(MidiMessage),
    Invalid,
}

/// Decodes raw input against one device profile
pub struct Monitor {
    protocol: Arc<dyn DeviceProtocol>,
    registry: ControlRegistry,
}

impl Monitor {
    pub fn new(protocol: Arc<dyn DeviceProtocol>) -> Self {
        let registry = ControlRegistry::new(&protocol.controls(), 0);
        Self { protocol, registry }
    }

    pub fn decode(&self, data: &[u8]) -> Decoded {
        let Some(msg) = MidiMessage::parse(data) else {
            return Decoded::Invalid;
        };
        if let MidiMessage::SysEx { data } = &msg {
            return match self.protocol.describe_sysex(data) {
                Some(what) => Decoded::SysEx(what),
                None => Decoded::Unassigned(msg),
            };
        }
        match self.registry.decode(&msg) {
            Some(event) => Decoded::Event(event),
            None => Decoded::Unassigned(msg),
        }
    }

    /// One colored output line
    pub fn format_line(&self, timestamp: &str, data: &[u8]) -> String {
        let hex = format_hex(data);
        let (hex, decoded) = match self.decode(data) {
            Decoded::Event(event) => (hex.bright_green(), format!("{:?}", event).bright_blue()),
            Decoded::SysEx(what) => (hex.bright_magenta(), what.bright_blue()),
            Decoded::Unassigned(msg) => (hex.bright_yellow(), format!("{} (unassigned)", msg).dimmed()),
            Decoded::Invalid => (hex.bright_black(), "invalid".red()),
        };
        format!("[{}] {} => {}", timestamp.dimmed(), hex, decoded)
    }
}

/// Print decoded input from the device until Ctrl+C
pub async fn run_monitor(protocol: Arc<dyn DeviceProtocol>, input_pattern: &str) -> Result<()> {
    println!("{}", format!("=== {} Monitor ===", protocol.name()).bold().cyan());
    println!("Press Ctrl+C to exit\n");

    let (tx, mut rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
    let connection = MidiConnection::open(input_pattern, input_pattern, tx)
        .with_context(|| format!("Failed to open ports matching '{}'", input_pattern))?;
    println!("Listening on {}\n", connection.input_name().bright_white());

    let monitor = Monitor::new(protocol);
    loop {
        tokio::select! {
            Some(data) = rx.recv() => {
                let timestamp = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
                println!("{}", monitor.format_line(&timestamp, &data));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("\n{}", "Monitor stopped".yellow());
    Ok(())
}

/// List all ports in a formatted way
pub fn list_ports_formatted(device_pattern: &str) {
    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());

    let print = |title: &str, ports: Vec<discovery::PortInfo>| {
        println!("\n{}", title.bold());
        if ports.is_empty() {
            println!("  {}", "No ports found".dimmed());
        }
        for port in ports {
            let marker = if port.is_virtual {
                "[VIRTUAL]".yellow()
            } else {
                "[PHYSICAL]".green()
            };
            println!("  {} {}", marker, port.name);
        }
    };

    if let Ok(inputs) = discovery::discover_input_ports() {
        print("Input Ports:", inputs);
    }
    if let Ok(outputs) = discovery::discover_output_ports() {
        print("Output Ports:", outputs);
    }

    if let Some((input, output)) = discovery::find_ports(device_pattern) {
        println!("\n{}", format!("Auto-detected '{}':", device_pattern).bold().bright_green());
        println!("  Input:  {}", input.bright_white());
        println!("  Output: {}", output.bright_white());
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlId;
    use crate::devices::{mcu, DeviceKind};

    #[test]
    fn test_decodes_controls_and_sysex() {
        let monitor = Monitor::new(DeviceKind::Mcu.protocol());

        assert_eq!(
            monitor.decode(&[0x90, mcu::buttons::PLAY, 0x7F]),
            Decoded::Event(InputEvent::ButtonDown(ControlId::button(mcu::buttons::PLAY)))
        );
        assert_eq!(
            monitor.decode(&[0xB0, 0x10, 0x41]),
            Decoded::Event(InputEvent::KnobDelta(ControlId::knob(0), -1))
        );
        assert!(matches!(
            monitor.decode(&[0xF0, 0x00, 0x00, 0x66, 0x14, 0x01, 0x10, 0x11, 0xF7]),
            Decoded::SysEx(_)
        ));
        assert!(matches!(monitor.decode(&[0xB5, 0x7F, 0x01]), Decoded::Unassigned(_)));
        assert_eq!(monitor.decode(&[0x42]), Decoded::Invalid);
    }

    #[test]
    fn test_format_line_contains_hex() {
        colored::control::set_override(false);
        let monitor = Monitor::new(DeviceKind::Fire.protocol());
        let line = monitor.format_line("12:00:00.000", &[0x42]);
        assert_eq!(line, "[12:00:00.000] 42 => invalid");
    }
}
