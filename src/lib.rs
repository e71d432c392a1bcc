pub mod hal;

pub use hal::error::{ComError, ConfigError, GatewayError};
pub use hal::loragw_com::{BusConnection, BusPort, ComType, DigitalPin, Edge, Level, Pull, SpiMuxTarget};
pub use hal::loragw_conf::GatewayConf;
pub use hal::loragw_spi::{LinkPins, LowLevelLink};
pub use hal::GatewayContext;
