pub mod error;
pub mod loragw_com;
pub mod loragw_conf;
pub mod loragw_json;
pub mod loragw_spi;

use error::{ComError, ConfigError, GatewayError};
use loragw_com::{BusPort, ComType, DigitalPin, SpiMuxTarget};
use loragw_conf::{
    BoardConf, DebugConf, DemodConf, FineTimestampConf, GatewayConf, IfChainConf, RfChainConf, Sx1261Conf, TxGain,
};
use loragw_spi::{LinkPins, LinkSetupFailure, LowLevelLink};
use tracing::{debug, error, info};

/* radio-specific parameters */
pub const LGW_RF_CHAIN_NB: u8 = 2; /* number of RF chains */
pub const LGW_RF_RX_FREQ_MIN: u32 = 100_000_000;
pub const LGW_RF_RX_FREQ_MAX: u32 = 1_000_000_000;
pub const LGW_RF_RX_BANDWIDTH: u32 = 1_600_000; /* bandwidth of the radios */

/* concentrator chipset-specific parameters */
pub const LGW_IF_CHAIN_NB: u8 = 10; /* number of IF+modem RX chains */
pub const LGW_REF_BW: u32 = 125_000; /* typical bandwidth of data channel */
pub const LGW_MULTI_NB: u8 = 8; /* number of LoRa 'multi SF' chains */
pub const LGW_MULTI_SF_EN: u8 = 0xFF; /* bitmask to enable/disable SF for multi-sf correlators (12 11 10 9 8 7 6 5) */

pub const DR_FSK_MIN: u32 = 500;
pub const DR_FSK_MAX: u32 = 250_000;

pub const TX_GAIN_LUT_SIZE_MAX: usize = 16;
pub const LGW_LBT_CHANNEL_NB_MAX: usize = 16;
pub const LGW_REF_PAYLOAD_NB_MAX: usize = 16;
pub const COM_PATH_LEN_MAX: usize = 64;

/// Configuration and bus ownership of one concentrator.
///
/// Configuration can only change while stopped. Once started the context holds
/// the link to the SX1302 until [`GatewayContext::stop`] or drop.
pub struct GatewayContext<P: BusPort, G: DigitalPin> {
    conf: GatewayConf,
    is_started: bool,
    port: P,
    pins: Option<LinkPins<G>>,
    link: Option<LowLevelLink<P::Connection, G>>,
}

impl<P: BusPort, G: DigitalPin> GatewayContext<P, G> {
    pub fn new(port: P, pins: LinkPins<G>) -> Self {
        Self {
            conf: GatewayConf::default(),
            is_started: false,
            port,
            pins: Some(pins),
            link: None,
        }
    }

    /// Builds a context from a complete configuration, rejecting the first invalid block.
    pub fn with_conf(conf: GatewayConf, port: P, pins: LinkPins<G>) -> Result<Self, ConfigError> {
        let conf = conf.validated()?;
        Ok(Self {
            conf,
            is_started: false,
            port,
            pins: Some(pins),
            link: None,
        })
    }

    pub fn conf(&self) -> &GatewayConf {
        &self.conf
    }

    pub fn board_conf(&self) -> &BoardConf {
        &self.conf.board
    }

    pub fn rf_chain_conf(&self, rf_chain: u8) -> Option<&RfChainConf> {
        self.conf.rf_chains.get(rf_chain as usize)
    }

    pub fn if_chain_conf(&self, if_chain: u8) -> Option<&IfChainConf> {
        self.conf.if_chains.get(if_chain as usize)
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }

    /// Register link to the SX1302, only while started.
    pub fn link_mut(&mut self) -> Option<&mut LowLevelLink<P::Connection, G>> {
        self.link.as_mut()
    }

    fn ensure_stopped(&self) -> Result<(), GatewayError> {
        if self.is_started {
            error!("ERROR: CONCENTRATOR IS RUNNING, STOP IT BEFORE TOUCHING CONFIGURATION");
            return Err(GatewayError::AlreadyStarted);
        }
        Ok(())
    }

    pub fn set_board_conf(&mut self, conf: BoardConf) -> Result<(), GatewayError> {
        self.ensure_stopped()?;
        self.conf.set_board(conf)?;
        Ok(())
    }

    pub fn set_rf_chain_conf(&mut self, rf_chain: u8, conf: RfChainConf) -> Result<(), GatewayError> {
        self.ensure_stopped()?;
        self.conf.set_rf_chain(rf_chain, conf)?;
        Ok(())
    }

    pub fn set_if_chain_conf(&mut self, if_chain: u8, conf: IfChainConf) -> Result<(), GatewayError> {
        self.ensure_stopped()?;
        self.conf.set_if_chain(if_chain, &conf)?;
        Ok(())
    }

    pub fn set_demod_conf(&mut self, conf: DemodConf) -> Result<(), GatewayError> {
        self.ensure_stopped()?;
        self.conf.set_demod(conf);
        Ok(())
    }

    pub fn set_tx_gain_lut(&mut self, rf_chain: u8, lut: &[TxGain]) -> Result<(), GatewayError> {
        self.ensure_stopped()?;
        self.conf.set_tx_gain_lut(rf_chain, lut)?;
        Ok(())
    }

    pub fn set_ftime_conf(&mut self, conf: FineTimestampConf) -> Result<(), GatewayError> {
        self.ensure_stopped()?;
        self.conf.set_ftime(conf);
        Ok(())
    }

    pub fn set_sx1261_conf(&mut self, conf: Sx1261Conf) -> Result<(), GatewayError> {
        self.ensure_stopped()?;
        self.conf.set_sx1261(conf)?;
        Ok(())
    }

    pub fn set_debug_conf(&mut self, conf: DebugConf) -> Result<(), GatewayError> {
        self.ensure_stopped()?;
        self.conf.set_debug(conf)?;
        Ok(())
    }

    /// Opens the bus at the board COM path and takes control of the reset and IRQ pins.
    ///
    /// On failure nothing is kept open and the context stays stopped.
    pub fn start(&mut self) -> Result<(), GatewayError> {
        if self.is_started {
            error!("ERROR: CONCENTRATOR IS ALREADY RUNNING");
            return Err(GatewayError::AlreadyStarted);
        }

        if self.conf.board.com_type != ComType::Spi {
            error!("ERROR: {} COM TYPE IS NOT SUPPORTED", self.conf.board.com_type);
            return Err(GatewayError::UnsupportedTransport(self.conf.board.com_type));
        }

        let Some(pins) = self.pins.take() else {
            error!("ERROR: control pins are not available");
            return Err(GatewayError::Transport(ComError::MissingResetPin));
        };

        info!("INFO: Connecting to {}", self.conf.board.com_path);
        let conn = match self.port.open(&self.conf.board.com_path) {
            Ok(conn) => conn,
            Err(e) => {
                error!(e=%e, "ERROR: FAILED TO OPEN {}", self.conf.board.com_path);
                self.pins = Some(pins);
                return Err(e.into());
            }
        };

        match LowLevelLink::new(SpiMuxTarget::Sx1302, conn, pins) {
            Ok(link) => {
                self.link = Some(link);
            }
            Err(LinkSetupFailure { error: e, pins }) => {
                error!(e=%e, "ERROR: FAILED TO SETUP CONTROL PINS");
                self.pins = Some(pins);
                return Err(e.into());
            }
        }

        self.is_started = true;
        info!(com_path = %self.conf.board.com_path, "INFO: concentrator started");
        Ok(())
    }

    /// Releases the link. Configuration is kept for the next start.
    pub fn stop(&mut self) {
        if !self.is_started {
            info!("Note: LoRa concentrator was not started...");
            return;
        }

        info!("INFO: Disconnecting");
        if let Some(link) = self.link.take() {
            self.pins = Some(link.release());
        }
        self.is_started = false;
    }
}

impl<P: BusPort, G: DigitalPin> Drop for GatewayContext<P, G> {
    fn drop(&mut self) {
        if self.is_started {
            debug!("Note: releasing concentrator on drop");
            self.stop();
        }
    }
}
