use super::loragw_com::ComType;
use super::loragw_conf::RadioType;

/// Rejection of a configuration block. The stored configuration is left untouched.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("rf_chain {chain} is not a valid rf_chain number")]
    ChainIndexOutOfRange { chain: u8 },

    #[error("{0} is not a valid radio type")]
    InvalidRadioType(RadioType),

    #[error("radio center frequency {0} Hz is out of range, check that it has been given in Hz")]
    FrequencyOutOfRange(u32),

    #[error("unknown COM type")]
    UnknownComType,

    #[error("COM path must not be empty for SPI")]
    EmptyComPath,

    #[error("COM path is {0} bytes long, maximum is 64")]
    ComPathTooLong(usize),

    #[error("clock source {0} is not a valid rf_chain number")]
    ClockSourceOutOfRange(u8),

    #[error("if_chain {chain} is not a valid if_chain number")]
    IfChainIndexOutOfRange { chain: u8 },

    #[error("bandwidth {bandwidth} not supported by if_chain {chain}")]
    InvalidBandwidth { chain: u8, bandwidth: u32 },

    #[error("datarate {datarate} not supported by if_chain {chain}")]
    InvalidDatarate { chain: u8, datarate: u32 },

    #[error("IF frequency {freq_hz} Hz does not fit the radio bandwidth")]
    IfFrequencyOutOfRange { freq_hz: i32 },

    #[error("TX gain LUT must have between 1 and 16 entries, got {0}")]
    TxGainLutSize(usize),

    #[error("TX gain LUT: {field} = {value} is out of range")]
    TxGainOutOfRange { field: &'static str, value: u8 },

    #[error("{0} LBT channels configured, maximum is 16")]
    TooManyLbtChannels(usize),

    #[error("listen-before-talk requires the SX1261 to be enabled")]
    LbtRequiresSx1261,

    #[error("{0} reference payloads configured, maximum is 16")]
    TooManyRefPayloads(usize),
}

/// Failure reported by the bus or pin collaborators.
#[derive(thiserror::Error, Debug)]
pub enum ComError {
    #[error("failed to open bus device {path}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bus transaction failed")]
    Transaction(#[source] std::io::Error),

    #[error("pin access failed")]
    Pin(#[source] std::io::Error),

    #[error("reset pin is not set")]
    MissingResetPin,
}

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("concentrator is running, stop it before touching configuration")]
    AlreadyStarted,

    #[error("{0} transport is not supported")]
    UnsupportedTransport(ComType),

    #[error("transport error")]
    Transport(#[from] ComError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
