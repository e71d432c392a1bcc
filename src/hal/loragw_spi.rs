use tracing::{debug, error, trace};

use super::error::ComError;
use super::loragw_com::{BusConnection, DigitalPin, Edge, Level, Pull, SpiMuxTarget};

/// Register address as it goes on the wire: shifted left by one, 7-bit wide, write bit clear.
pub fn encode_address(address: u8) -> u8 {
    (address << 1) & 0x7E
}

pub fn encode_write_frame(address: u8, data: u8) -> [u8; 2] {
    [encode_address(address), data]
}

/// Control pins owned by a link: reset is mandatory once the link is built, IRQ is optional.
#[derive(Debug)]
pub struct LinkPins<G> {
    pub reset: Option<G>,
    pub irq: Option<G>,
}

impl<G> LinkPins<G> {
    pub fn new(reset: G, irq: Option<G>) -> Self {
        Self { reset: Some(reset), irq }
    }
}

/// Returned when a link could not be built. The pins go back to the caller untouched in ownership.
#[derive(Debug)]
pub struct LinkSetupFailure<G> {
    pub error: ComError,
    pub pins: LinkPins<G>,
}

/// Write-only register link to one physical target on the bus.
///
/// Mux selection is implicit: a link is built per chip-select / bus handle, the
/// target is only recorded for logging.
#[derive(Debug)]
pub struct LowLevelLink<C, G> {
    target: SpiMuxTarget,
    conn: C,
    reset_pin: G,
    irq_pin: Option<G>,
}

impl<C: BusConnection, G: DigitalPin> LowLevelLink<C, G> {
    /// Takes the connection, drives reset high and arms the IRQ pin on a falling edge.
    pub fn new(target: SpiMuxTarget, conn: C, mut pins: LinkPins<G>) -> Result<Self, LinkSetupFailure<G>> {
        let Some(mut reset_pin) = pins.reset.take() else {
            error!("ERROR: reset pin is not set");
            return Err(LinkSetupFailure { error: ComError::MissingResetPin, pins });
        };

        if let Err(e) = reset_pin.configure_output(Level::High) {
            error!(e=%e, "ERROR: failed to drive reset pin");
            pins.reset = Some(reset_pin);
            return Err(LinkSetupFailure { error: e, pins });
        }

        if let Some(irq) = pins.irq.as_mut() {
            if let Err(e) = irq.configure_input(Pull::Up, Edge::Falling) {
                error!(e=%e, "ERROR: failed to arm interrupt pin");
                pins.reset = Some(reset_pin);
                return Err(LinkSetupFailure { error: e, pins });
            }
        }

        Ok(Self {
            target,
            conn,
            reset_pin,
            irq_pin: pins.irq,
        })
    }

    pub fn target(&self) -> SpiMuxTarget {
        self.target
    }

    pub fn has_irq_pin(&self) -> bool {
        self.irq_pin.is_some()
    }

    /// Single register write, one transaction. Nothing is read back.
    pub fn write(&mut self, address: u8, data: u8) -> Result<(), ComError> {
        let frame = encode_write_frame(address, data);
        trace!(target_chip=%self.target, "WR: {:02X?}", frame);
        self.conn.transact(&frame, None)
    }

    /// Applies each write in order and stops at the first failure.
    ///
    /// Writes already on the wire are not undone: after an error the device
    /// state is unknown and the caller has to re-initialize it.
    pub fn write_sequence(&mut self, entries: &[(u8, u8)]) -> Result<(), ComError> {
        for (i, &(address, data)) in entries.iter().enumerate() {
            if let Err(e) = self.write(address, data) {
                error!(e=%e, "ERROR: write {} of {} failed (0x{:02X})", i + 1, entries.len(), address);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Consecutive bytes starting at `address`, sent as a single frame.
    pub fn write_burst(&mut self, address: u8, data: &[u8]) -> Result<(), ComError> {
        let mut frame = Vec::with_capacity(data.len() + 1);
        frame.push(encode_address(address));
        frame.extend_from_slice(data);
        trace!(target_chip=%self.target, size=%data.len(), "WR burst: {:02X?}", frame);
        self.conn.transact(&frame, None)
    }

    /// Reset pulse: low, then back high.
    pub fn reset(&mut self) -> Result<(), ComError> {
        debug!("INFO: resetting {}", self.target);
        self.reset_pin.set_level(Level::Low)?;
        self.reset_pin.set_level(Level::High)
    }

    /// Closes the connection and hands the pins back.
    pub fn release(self) -> LinkPins<G> {
        debug!("INFO: releasing link to {}", self.target);
        drop(self.conn);
        LinkPins {
            reset: Some(self.reset_pin),
            irq: self.irq_pin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Wire {
        frames: Vec<Vec<u8>>,
        fail_at: Option<usize>,
    }

    #[derive(Debug)]
    struct Conn(Rc<RefCell<Wire>>);

    impl BusConnection for Conn {
        fn transact(&mut self, write: &[u8], _read: Option<&mut [u8]>) -> Result<(), ComError> {
            let mut wire = self.0.borrow_mut();
            wire.frames.push(write.to_vec());
            if wire.fail_at == Some(wire.frames.len()) {
                return Err(ComError::Transaction(std::io::Error::other("bus fault")));
            }
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Pin {
        levels: Vec<Level>,
        input: Option<(Pull, Edge)>,
        broken: bool,
    }

    impl DigitalPin for Pin {
        fn configure_output(&mut self, initial: Level) -> Result<(), ComError> {
            if self.broken {
                return Err(ComError::Pin(std::io::Error::other("busy")));
            }
            self.levels.push(initial);
            Ok(())
        }

        fn configure_input(&mut self, pull: Pull, edge: Edge) -> Result<(), ComError> {
            if self.broken {
                return Err(ComError::Pin(std::io::Error::other("busy")));
            }
            self.input = Some((pull, edge));
            Ok(())
        }

        fn set_level(&mut self, level: Level) -> Result<(), ComError> {
            self.levels.push(level);
            Ok(())
        }
    }

    fn link(wire: &Rc<RefCell<Wire>>) -> LowLevelLink<Conn, Pin> {
        LowLevelLink::new(
            SpiMuxTarget::Sx1302,
            Conn(wire.clone()),
            LinkPins::new(Pin::default(), Some(Pin::default())),
        )
        .unwrap()
    }

    #[test]
    fn address_is_shifted_and_masked() {
        assert_eq!(encode_write_frame(0x10, 0xAA), [0x20, 0xAA]);
        assert_eq!(encode_write_frame(0x3F, 0x01), [0x7E, 0x01]);
        // bit 6 is shifted into the masked-off MSB
        assert_eq!(encode_address(0x40), 0x00);
        assert_eq!(encode_address(0x7F), 0x7E);
    }

    #[test]
    fn write_is_one_two_byte_transaction() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let mut l = link(&wire);
        l.write(0x01, 0x55).unwrap();
        assert_eq!(wire.borrow().frames, vec![vec![0x02, 0x55]]);
    }

    #[test]
    fn sequence_stops_at_first_failure() {
        let wire = Rc::new(RefCell::new(Wire { fail_at: Some(2), ..Default::default() }));
        let mut l = link(&wire);
        let err = l.write_sequence(&[(0x10, 0xAA), (0x20, 0xBB), (0x30, 0xCC)]).unwrap_err();
        assert!(matches!(err, ComError::Transaction(_)));
        assert_eq!(wire.borrow().frames, vec![vec![0x20, 0xAA], vec![0x40, 0xBB]]);
    }

    #[test]
    fn burst_goes_out_in_one_frame() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let mut l = link(&wire);
        l.write_burst(0x08, &[1, 2, 3]).unwrap();
        assert_eq!(wire.borrow().frames, vec![vec![0x10, 1, 2, 3]]);
    }

    #[test]
    fn construction_drives_reset_high_and_arms_irq() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let l = link(&wire);
        assert!(l.has_irq_pin());
        let pins = l.release();
        assert_eq!(pins.reset.unwrap().levels, vec![Level::High]);
        assert_eq!(pins.irq.unwrap().input, Some((Pull::Up, Edge::Falling)));
    }

    #[test]
    fn irq_pin_is_optional() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let l = LowLevelLink::new(SpiMuxTarget::RadioA, Conn(wire), LinkPins::new(Pin::default(), None)).unwrap();
        assert!(!l.has_irq_pin());
        assert_eq!(l.target(), SpiMuxTarget::RadioA);
    }

    #[test]
    fn missing_reset_pin_is_rejected() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let pins: LinkPins<Pin> = LinkPins { reset: None, irq: Some(Pin::default()) };
        let failure = LowLevelLink::new(SpiMuxTarget::Sx1302, Conn(wire), pins).unwrap_err();
        assert!(matches!(failure.error, ComError::MissingResetPin));
        assert!(failure.pins.irq.is_some());
    }

    #[test]
    fn pin_failure_returns_pins() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let pins = LinkPins::new(Pin { broken: true, ..Default::default() }, None);
        let failure = LowLevelLink::new(SpiMuxTarget::Sx1302, Conn(wire), pins).unwrap_err();
        assert!(matches!(failure.error, ComError::Pin(_)));
        assert!(failure.pins.reset.is_some());
    }

    #[test]
    fn irq_failure_returns_both_pins() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let pins = LinkPins::new(Pin::default(), Some(Pin { broken: true, ..Default::default() }));
        let failure = LowLevelLink::new(SpiMuxTarget::Sx1302, Conn(wire), pins).unwrap_err();
        assert!(matches!(failure.error, ComError::Pin(_)));
        assert_eq!(failure.pins.reset.unwrap().levels, vec![Level::High]);
        assert!(failure.pins.irq.is_some());
    }

    #[test]
    fn reset_pulses_low_then_high() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let mut l = link(&wire);
        l.reset().unwrap();
        let pins = l.release();
        assert_eq!(pins.reset.unwrap().levels, vec![Level::High, Level::Low, Level::High]);
    }
}
