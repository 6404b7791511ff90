//! Control registry
//!
//! Decodes incoming MIDI into [`InputEvent`]s and keeps the last successfully
//! transmitted light and value of every control.

use super::cache::SentCache;
use super::{Capability, ControlId, ControlSpec, InputEvent, MidiAddress};
use crate::midi::{convert, MidiMessage};
use crate::protocol::{DeviceNote, LightInfo};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Main,
    Touch,
}

#[derive(Debug)]
pub struct ControlRegistry {
    specs: HashMap<ControlId, ControlSpec>,
    by_address: HashMap<MidiAddress, (ControlId, Role)>,
    lights: HashMap<ControlId, SentCache<LightInfo>>,
    values: HashMap<ControlId, SentCache<u16>>,
    keep_alive_ms: u64,
}

impl ControlRegistry {
    pub fn new(specs: &[ControlSpec], keep_alive_ms: u64) -> Self {
        let mut registry = Self {
            specs: HashMap::new(),
            by_address: HashMap::new(),
            lights: HashMap::new(),
            values: HashMap::new(),
            keep_alive_ms,
        };
        for spec in specs {
            registry.register(*spec);
        }
        registry
    }

    fn register(&mut self, spec: ControlSpec) {
        if let Some((other, _)) = self.by_address.insert(spec.address, (spec.id, Role::Main)) {
            warn!("MIDI address {:?} of {} already used by {}", spec.address, spec.id, other);
        }
        if let Some(touch) = spec.touch {
            self.by_address.insert(touch, (spec.id, Role::Touch));
        }
        self.specs.insert(spec.id, spec);
    }

    pub fn spec(&self, id: ControlId) -> Option<&ControlSpec> {
        self.specs.get(&id)
    }

    pub fn specs(&self) -> impl Iterator<Item = &ControlSpec> {
        self.specs.values()
    }

    /// Decode one message. Unassigned notes become pad events.
    pub fn decode(&self, msg: &MidiMessage) -> Option<InputEvent> {
        match *msg {
            MidiMessage::NoteOn { channel, note, velocity } => {
                self.decode_note(channel, note, Some(velocity))
            }
            MidiMessage::NoteOff { channel, note, .. } => self.decode_note(channel, note, None),
            MidiMessage::ControlChange { channel, cc, value } => {
                let address = MidiAddress::Cc { channel, cc };
                let Some((spec, _)) = self.lookup(address) else {
                    trace!("Unassigned CC ch:{} cc:{}", channel + 1, cc);
                    return None;
                };
                match spec.capability {
                    Capability::RelativeEncoder(encoding) => match encoding.decode(value) {
                        0 => None,
                        delta => Some(InputEvent::KnobDelta(spec.id, delta)),
                    },
                    Capability::AbsoluteEncoder => {
                        Some(InputEvent::KnobAbsolute(spec.id, value as f64 / 127.0))
                    }
                    Capability::Button if value > 0 => Some(InputEvent::ButtonDown(spec.id)),
                    Capability::Button => Some(InputEvent::ButtonUp(spec.id)),
                    Capability::Fader14Bit => None,
                }
            }
            MidiMessage::PitchBend { channel, value } => {
                let (spec, _) = self.lookup(MidiAddress::PitchBend { channel })?;
                (spec.capability == Capability::Fader14Bit)
                    .then(|| InputEvent::Fader(spec.id, convert::to_unit(value)))
            }
            MidiMessage::PolyPressure { channel, note, pressure } => {
                Some(InputEvent::PadPressure(DeviceNote::new(channel, note), pressure))
            }
            MidiMessage::SysEx { .. } | MidiMessage::System { .. } => None,
            MidiMessage::ChannelPressure { .. } => {
                debug!("Ignoring channel pressure: {}", msg);
                None
            }
        }
    }

    fn lookup(&self, address: MidiAddress) -> Option<(&ControlSpec, Role)> {
        let (id, role) = self.by_address.get(&address)?;
        self.specs.get(id).map(|spec| (spec, *role))
    }

    fn decode_note(&self, channel: u8, note: u8, velocity: Option<u8>) -> Option<InputEvent> {
        let down = velocity.is_some();
        match self.lookup(MidiAddress::Note { channel, note }) {
            Some((spec, Role::Touch)) => Some(InputEvent::Touch(spec.id, down)),
            Some((spec, Role::Main)) => match spec.capability {
                Capability::Button if down => Some(InputEvent::ButtonDown(spec.id)),
                Capability::Button => Some(InputEvent::ButtonUp(spec.id)),
                _ => None,
            },
            None => {
                let device = DeviceNote::new(channel, note);
                Some(match velocity {
                    Some(v) => InputEvent::PadDown(device, v),
                    None => InputEvent::PadUp(device),
                })
            }
        }
    }

    /// Whether a light must be (re)sent
    pub fn light_needs_update(&self, id: ControlId, light: &LightInfo, now_ms: u64) -> bool {
        self.lights
            .get(&id)
            .map(|cache| cache.needs_update(light, now_ms))
            .unwrap_or(true)
    }

    pub fn mark_light_sent(&mut self, id: ControlId, light: LightInfo, now_ms: u64) {
        let keep_alive = self.keep_alive_ms;
        self.lights
            .entry(id)
            .or_insert_with(|| SentCache::new(keep_alive))
            .mark_sent(light, now_ms);
    }

    /// Whether a ring/fader value must be (re)sent
    pub fn value_needs_update(&self, id: ControlId, value: u16, now_ms: u64) -> bool {
        self.values
            .get(&id)
            .map(|cache| cache.needs_update(&value, now_ms))
            .unwrap_or(true)
    }

    pub fn mark_value_sent(&mut self, id: ControlId, value: u16, now_ms: u64) {
        let keep_alive = self.keep_alive_ms;
        self.values
            .entry(id)
            .or_insert_with(|| SentCache::new(keep_alive))
            .mark_sent(value, now_ms);
    }

    pub fn last_light(&self, id: ControlId) -> Option<LightInfo> {
        self.lights.get(&id).and_then(|cache| cache.last().copied())
    }

    /// Forget everything sent; the next flush repaints the surface
    pub fn invalidate(&mut self) {
        self.lights.values_mut().for_each(SentCache::invalidate);
        self.values.values_mut().for_each(SentCache::invalidate);
    }

    pub fn set_keep_alive(&mut self, keep_alive_ms: u64) {
        self.keep_alive_ms = keep_alive_ms;
        for cache in self.lights.values_mut() {
            cache.set_keep_alive(keep_alive_ms);
        }
        for cache in self.values.values_mut() {
            cache.set_keep_alive(keep_alive_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Trigger;
    use crate::midi::RelativeEncoding;
    use crate::protocol::ColorIndex;

    fn registry() -> ControlRegistry {
        ControlRegistry::new(
            &[
                ControlSpec::button(0, MidiAddress::Note { channel: 0, note: 0x5E }, Trigger::OnPress),
                ControlSpec::button(1, MidiAddress::Cc { channel: 0, cc: 91 }, Trigger::OnPress),
                ControlSpec::relative_knob(
                    0,
                    MidiAddress::Cc { channel: 0, cc: 0x10 },
                    RelativeEncoding::SignMagnitude,
                ),
                ControlSpec::fader(0, 0).with_touch(MidiAddress::Note { channel: 0, note: 0x68 }),
            ],
            3000,
        )
    }

    #[test]
    fn test_decode_buttons_knobs_faders() {
        let reg = registry();
        assert_eq!(
            reg.decode(&MidiMessage::NoteOn { channel: 0, note: 0x5E, velocity: 127 }),
            Some(InputEvent::ButtonDown(ControlId::button(0)))
        );
        assert_eq!(
            reg.decode(&MidiMessage::NoteOff { channel: 0, note: 0x5E, velocity: 0 }),
            Some(InputEvent::ButtonUp(ControlId::button(0)))
        );
        assert_eq!(
            reg.decode(&MidiMessage::ControlChange { channel: 0, cc: 91, value: 127 }),
            Some(InputEvent::ButtonDown(ControlId::button(1)))
        );
        assert_eq!(
            reg.decode(&MidiMessage::ControlChange { channel: 0, cc: 0x10, value: 0x43 }),
            Some(InputEvent::KnobDelta(ControlId::knob(0), -3))
        );
        assert_eq!(
            reg.decode(&MidiMessage::PitchBend { channel: 0, value: 16383 }),
            Some(InputEvent::Fader(ControlId::fader(0), 1.0))
        );
        assert_eq!(
            reg.decode(&MidiMessage::NoteOn { channel: 0, note: 0x68, velocity: 127 }),
            Some(InputEvent::Touch(ControlId::fader(0), true))
        );
    }

    #[test]
    fn test_unassigned_notes_become_pads() {
        let reg = registry();
        assert_eq!(
            reg.decode(&MidiMessage::NoteOn { channel: 9, note: 40, velocity: 90 }),
            Some(InputEvent::PadDown(DeviceNote::new(9, 40), 90))
        );
        assert_eq!(
            reg.decode(&MidiMessage::ControlChange { channel: 3, cc: 7, value: 1 }),
            None
        );
    }

    #[test]
    fn test_light_cache() {
        let mut reg = registry();
        let id = ControlId::button(0);
        let on = LightInfo::solid(ColorIndex(1));

        assert!(reg.light_needs_update(id, &on, 0));
        reg.mark_light_sent(id, on, 0);
        assert!(!reg.light_needs_update(id, &on, 2999));
        assert!(reg.light_needs_update(id, &LightInfo::OFF, 10));
        assert!(reg.light_needs_update(id, &on, 3000));

        reg.invalidate();
        assert!(reg.light_needs_update(id, &on, 1));
    }
}
