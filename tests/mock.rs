#![allow(dead_code)]

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use loragw_core::{BusConnection, BusPort, ComError, DigitalPin, Edge, Level, LinkPins, Pull};

/// Everything that went over the mock bus
#[derive(Debug, Default)]
pub struct BusLog {
    /// Paths passed to `open`, in order
    pub opened: Vec<String>,
    /// Write side of every transaction
    pub frames: Vec<Vec<u8>>,
    /// Connections currently alive
    pub open_connections: usize,
    /// Make the next `open` calls fail
    pub fail_open: bool,
    /// Fail the n-th transaction (1-based, counted over the whole log)
    pub fail_at: Option<usize>,
}

/// State of one control pin
#[derive(Debug, Default)]
pub struct PinLog {
    pub output: bool,
    pub levels: Vec<Level>,
    pub input: Option<(Pull, Edge)>,
    /// Reject any configuration
    pub broken: bool,
}

pub struct MockPort {
    bus: Rc<RefCell<BusLog>>,
}

impl BusPort for MockPort {
    type Connection = MockConnection;

    fn open(&mut self, path: &str) -> Result<MockConnection, ComError> {
        let mut bus = self.bus.borrow_mut();
        if bus.fail_open {
            return Err(ComError::Open {
                path: path.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such device"),
            });
        }
        bus.opened.push(path.to_string());
        bus.open_connections += 1;
        Ok(MockConnection { bus: self.bus.clone() })
    }
}

pub struct MockConnection {
    bus: Rc<RefCell<BusLog>>,
}

impl BusConnection for MockConnection {
    fn transact(&mut self, write: &[u8], read: Option<&mut [u8]>) -> Result<(), ComError> {
        let mut bus = self.bus.borrow_mut();
        bus.frames.push(write.to_vec());
        if bus.fail_at == Some(bus.frames.len()) {
            return Err(ComError::Transaction(io::Error::new(io::ErrorKind::TimedOut, "bus timeout")));
        }
        if let Some(read) = read {
            read.fill(0);
        }
        Ok(())
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.bus.borrow_mut().open_connections -= 1;
    }
}

pub struct MockPin {
    state: Rc<RefCell<PinLog>>,
}

impl DigitalPin for MockPin {
    fn configure_output(&mut self, initial: Level) -> Result<(), ComError> {
        let mut pin = self.state.borrow_mut();
        if pin.broken {
            return Err(ComError::Pin(io::Error::new(io::ErrorKind::PermissionDenied, "pin busy")));
        }
        pin.output = true;
        pin.levels.push(initial);
        Ok(())
    }

    fn configure_input(&mut self, pull: Pull, edge: Edge) -> Result<(), ComError> {
        let mut pin = self.state.borrow_mut();
        if pin.broken {
            return Err(ComError::Pin(io::Error::new(io::ErrorKind::PermissionDenied, "pin busy")));
        }
        pin.input = Some((pull, edge));
        Ok(())
    }

    fn set_level(&mut self, level: Level) -> Result<(), ComError> {
        self.state.borrow_mut().levels.push(level);
        Ok(())
    }
}

/// Mock concentrator board: one bus and two control pins, with shared logs
pub struct MockBoard {
    pub bus: Rc<RefCell<BusLog>>,
    pub reset: Rc<RefCell<PinLog>>,
    pub irq: Rc<RefCell<PinLog>>,
}

impl MockBoard {
    pub fn new() -> Self {
        Self {
            bus: Rc::new(RefCell::new(BusLog::default())),
            reset: Rc::new(RefCell::new(PinLog::default())),
            irq: Rc::new(RefCell::new(PinLog::default())),
        }
    }

    pub fn port(&self) -> MockPort {
        MockPort { bus: self.bus.clone() }
    }

    /// Reset and IRQ pins
    pub fn pins(&self) -> LinkPins<MockPin> {
        LinkPins::new(
            MockPin { state: self.reset.clone() },
            Some(MockPin { state: self.irq.clone() }),
        )
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.bus.borrow().frames.clone()
    }
}
