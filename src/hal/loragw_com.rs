use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::ComError;

/// COMmunication interface used to reach the concentrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComType {
    Spi,
    /// Defined for configuration files, no transport exists for it.
    Usb,
    Unknown,
}

impl fmt::Display for ComType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComType::Spi => "SPI",
            ComType::Usb => "USB",
            ComType::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

impl Serialize for ComType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ComType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.to_ascii_uppercase().as_str() {
            "SPI" => ComType::Spi,
            "USB" => ComType::Usb,
            _ => ComType::Unknown,
        })
    }
}

/// Logical target behind the shared SPI bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SpiMuxTarget {
    Sx1302 = 0x00,
    RadioA = 0x01,
    RadioB = 0x02,
}

impl fmt::Display for SpiMuxTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpiMuxTarget::Sx1302 => "SX1302",
            SpiMuxTarget::RadioA => "RADIO_A",
            SpiMuxTarget::RadioB => "RADIO_B",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Float,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    None,
    Rising,
    Falling,
    Both,
}

/// Opens connections on a named bus device (e.g. `/dev/spidev0.0`).
pub trait BusPort {
    type Connection: BusConnection;

    fn open(&mut self, path: &str) -> Result<Self::Connection, ComError>;
}

/// One open, half-duplex bus connection.
pub trait BusConnection {
    /// Clocks `write` out; when `read` is given it receives the bytes clocked in.
    fn transact(&mut self, write: &[u8], read: Option<&mut [u8]>) -> Result<(), ComError>;
}

pub trait DigitalPin {
    fn configure_output(&mut self, initial: Level) -> Result<(), ComError>;
    fn configure_input(&mut self, pull: Pull, edge: Edge) -> Result<(), ComError>;
    fn set_level(&mut self, level: Level) -> Result<(), ComError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn com_type_from_config_strings() {
        let t: ComType = serde_json::from_str("\"SPI\"").unwrap();
        assert_eq!(t, ComType::Spi);
        let t: ComType = serde_json::from_str("\"usb\"").unwrap();
        assert_eq!(t, ComType::Usb);
        let t: ComType = serde_json::from_str("\"I2C\"").unwrap();
        assert_eq!(t, ComType::Unknown);
        assert_eq!(serde_json::to_string(&ComType::Spi).unwrap(), "\"SPI\"");
    }

    #[test]
    fn mux_target_codes() {
        assert_eq!(SpiMuxTarget::Sx1302 as u8, 0x00);
        assert_eq!(SpiMuxTarget::RadioA as u8, 0x01);
        assert_eq!(SpiMuxTarget::RadioB as u8, 0x02);
        assert_eq!(SpiMuxTarget::RadioB.to_string(), "RADIO_B");
    }
}
