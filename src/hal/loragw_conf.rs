use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, error, info};

use super::error::ConfigError;
use super::loragw_com::ComType;
use super::{
    COM_PATH_LEN_MAX, DR_FSK_MAX, DR_FSK_MIN, LGW_IF_CHAIN_NB, LGW_LBT_CHANNEL_NB_MAX, LGW_MULTI_SF_EN,
    LGW_REF_BW, LGW_REF_PAYLOAD_NB_MAX, LGW_RF_CHAIN_NB, LGW_RF_RX_BANDWIDTH, LGW_RF_RX_FREQ_MAX,
    LGW_RF_RX_FREQ_MIN, TX_GAIN_LUT_SIZE_MAX,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadioType {
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "SX1255")]
    Sx1255,
    #[serde(rename = "SX1257")]
    Sx1257,
    #[serde(rename = "SX1272")]
    Sx1272,
    #[serde(rename = "SX1276")]
    Sx1276,
    #[serde(rename = "SX1250")]
    Sx1250,
}

impl fmt::Display for RadioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioType::None => write!(f, "None"),
            RadioType::Sx1255 => write!(f, "SX1255"),
            RadioType::Sx1257 => write!(f, "SX1257"),
            RadioType::Sx1272 => write!(f, "SX1272"),
            RadioType::Sx1276 => write!(f, "SX1276"),
            RadioType::Sx1250 => write!(f, "SX1250"),
        }
    }
}

/* values encode the FSK RX bandwidth register directly */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Bandwidth {
    #[default]
    Undefined = 0,
    Khz125 = 0x04,
    Khz250 = 0x05,
    Khz500 = 0x06,
}

impl Bandwidth {
    pub fn hz(self) -> Option<u32> {
        match self {
            Bandwidth::Khz125 => Some(125_000),
            Bandwidth::Khz250 => Some(250_000),
            Bandwidth::Khz500 => Some(500_000),
            Bandwidth::Undefined => None,
        }
    }

    pub fn from_hz(hz: u32) -> Option<Self> {
        match hz {
            0 => Some(Bandwidth::Undefined),
            125_000 => Some(Bandwidth::Khz125),
            250_000 => Some(Bandwidth::Khz250),
            500_000 => Some(Bandwidth::Khz500),
            _ => None,
        }
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hz() {
            Some(hz) => write!(f, "{}kHz", hz / 1000),
            None => write!(f, "Undefined"),
        }
    }
}

impl Serialize for Bandwidth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.hz().unwrap_or(0))
    }
}

impl<'de> Deserialize<'de> for Bandwidth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hz = Option::<u32>::deserialize(deserializer)?.unwrap_or(0);
        Bandwidth::from_hz(hz).ok_or_else(|| de::Error::custom(format!("Invalid bandwidth value: {}", hz)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SpreadingFactor {
    Sf5 = 5,
    Sf6 = 6,
    Sf7 = 7,
    Sf8 = 8,
    Sf9 = 9,
    Sf10 = 10,
    Sf11 = 11,
    Sf12 = 12,
}

impl SpreadingFactor {
    pub const ALL: [SpreadingFactor; 8] = [
        SpreadingFactor::Sf5,
        SpreadingFactor::Sf6,
        SpreadingFactor::Sf7,
        SpreadingFactor::Sf8,
        SpreadingFactor::Sf9,
        SpreadingFactor::Sf10,
        SpreadingFactor::Sf11,
        SpreadingFactor::Sf12,
    ];

    pub fn from_u32(sf: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| *s as u32 == sf)
    }

    /// Bit of this SF in the multi-SF correlator mask (bit 0 = SF5).
    pub fn mask_bit(self) -> u8 {
        1 << (self as u8 - 5)
    }
}

/// LoRa spreading factor or FSK baudrate, encoded as a single number in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Datarate {
    #[default]
    Undefined,
    Lora(SpreadingFactor),
    Fsk(u32),
}

impl Datarate {
    pub fn from_raw(raw: u32) -> Self {
        if raw == 0 {
            return Datarate::Undefined;
        }
        match SpreadingFactor::from_u32(raw) {
            Some(sf) => Datarate::Lora(sf),
            None => Datarate::Fsk(raw),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            Datarate::Undefined => 0,
            Datarate::Lora(sf) => sf as u32,
            Datarate::Fsk(baud) => baud,
        }
    }

    pub fn is_lora(self) -> bool {
        matches!(self, Datarate::Lora(_))
    }

    pub fn is_fsk(self) -> bool {
        matches!(self, Datarate::Fsk(baud) if (DR_FSK_MIN..=DR_FSK_MAX).contains(&baud))
    }
}

impl fmt::Display for Datarate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datarate::Undefined => write!(f, "Undefined"),
            Datarate::Lora(sf) => write!(f, "SF{}", *sf as u8),
            Datarate::Fsk(baud) => write!(f, "{} Bd", baud),
        }
    }
}

impl Serialize for Datarate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.raw())
    }
}

impl<'de> Deserialize<'de> for Datarate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Datarate::from_raw(u32::deserialize(deserializer)?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConf {
    pub lorawan_public: bool,     /* Enable ONLY for *public* networks using the LoRa MAC protocol */
    pub clksrc: u8,               /* Index of RF chain which provides clock to concentrator */
    pub full_duplex: bool,        /* Indicates if the gateway operates in full duplex mode or not */
    pub com_type: ComType,        /* The COMmunication interface (SPI/USB) to connect to the SX1302 */
    pub com_path: String,         /* Path to access the COM device to connect to the SX1302 */
}

pub fn default_board_conf() -> BoardConf {
    BoardConf {
        lorawan_public: true,
        clksrc: 0,
        full_duplex: false,
        com_type: ComType::Spi,
        com_path: String::from("/dev/spidev0.0"),
    }
}

impl Default for BoardConf {
    fn default() -> Self {
        default_board_conf()
    }
}

/// Board-specific RSSI temperature compensation coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RssiTempComp {
    pub coeff_a: f32,
    pub coeff_b: f32,
    pub coeff_c: f32,
    pub coeff_d: f32,
    pub coeff_e: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfChainConf {
    pub enable: bool,             /* enable or disable that RF chain */
    #[serde(rename = "freq")]
    pub freq_hz: u32,             /* center frequency of the radio in Hz */
    pub rssi_offset: f32,         /* Board-specific RSSI correction factor */
    pub rssi_tcomp: RssiTempComp, /* Board-specific RSSI temperature compensation coefficients */
    #[serde(rename = "type")]
    pub radio_type: RadioType,    /* Radio type for that RF chain (SX1255, SX1257....) */
    pub tx_enable: bool,          /* enable or disable TX on that RF chain */
    pub single_input_mode: bool,  /* Configure the radio in single or differential input mode (SX1250 only) */
}

impl RfChainConf {
    pub fn disabled() -> Self {
        Self {
            enable: false,
            freq_hz: 0,
            rssi_offset: 0.0,
            rssi_tcomp: RssiTempComp::default(),
            radio_type: RadioType::None,
            tx_enable: false,
            single_input_mode: false,
        }
    }
}

impl Default for RfChainConf {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Chain 0 is enabled so the companion radio provides a clock for calibration.
pub fn default_rf_chain_conf() -> RfChainConf {
    RfChainConf {
        enable: true,
        freq_hz: 868_500_000,
        radio_type: RadioType::Sx1250,
        tx_enable: false,
        single_input_mode: false,
        ..RfChainConf::disabled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IfChainConf {
    pub enable: bool,                 /* enable or disable that IF chain */
    #[serde(rename = "radio")]
    pub rf_chain: u8,                 /* to which RF chain is that IF chain associated */
    #[serde(rename = "if")]
    pub freq_hz: i32,                 /* center frequ of the IF chain, relative to RF chain frequency */
    pub bandwidth: Bandwidth,         /* RX bandwidth, 0 for default */
    #[serde(alias = "spread_factor")]
    pub datarate: Datarate,           /* RX datarate, 0 for default */
    pub sync_word_size: u8,           /* size of FSK sync word (number of bytes, 0 for default) */
    pub sync_word: u64,               /* FSK sync word (ALIGN RIGHT, eg. 0xC194C1) */
    pub implicit_hdr: bool,           /* LoRa Service implicit header */
    pub implicit_payload_length: u8,  /* LoRa Service implicit header payload length (number of bytes, 0 for default) */
    pub implicit_crc_en: bool,        /* LoRa Service implicit header CRC enable */
    pub implicit_coderate: u8,        /* LoRa Service implicit header coding rate */
}

impl fmt::Display for IfChainConf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IfChainConf {{ enable: {}, rf_chain: {}, freq_hz: {}, bandwidth: {}, datarate: {}, sync_word_size: {}, sync_word: 0x{:X} }}",
            self.enable, self.rf_chain, self.freq_hz, self.bandwidth, self.datarate, self.sync_word_size, self.sync_word
        )
    }
}

pub fn default_lora_service_conf() -> IfChainConf {
    IfChainConf {
        bandwidth: Bandwidth::Khz250,
        datarate: Datarate::Lora(SpreadingFactor::Sf7),
        ..Default::default()
    }
}

pub fn default_fsk_conf() -> IfChainConf {
    IfChainConf {
        bandwidth: Bandwidth::Khz250,
        datarate: Datarate::Fsk(50_000),
        sync_word_size: 3,
        sync_word: 0xC194C1,
        ..Default::default()
    }
}

/// Modem behind each IF chain of the SX1302.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfModemType {
    LoraMulti,
    LoraStd,
    FskStd,
}

pub fn if_modem_type(if_chain: u8) -> Option<IfModemType> {
    match if_chain {
        0..=7 => Some(IfModemType::LoraMulti),
        8 => Some(IfModemType::LoraStd),
        9 => Some(IfModemType::FskStd),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemodConf {
    /// Spreading factors enabled on the multi-SF correlators (SF12 - SF5).
    pub multisf_datarate: u8,
}

impl DemodConf {
    pub fn is_sf_enabled(&self, sf: SpreadingFactor) -> bool {
        self.multisf_datarate & sf.mask_bit() != 0
    }
}

pub fn default_demod_conf() -> DemodConf {
    DemodConf { multisf_datarate: LGW_MULTI_SF_EN }
}

impl Default for DemodConf {
    fn default() -> Self {
        default_demod_conf()
    }
}

/// One point of the TX power calibration curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxGain {
    pub rf_power: i8, /* measured TX power at the board connector, in dBm */
    #[serde(default)]
    pub dig_gain: u8, /* (sx125x) 2 bits */
    #[serde(default)]
    pub pa_gain: u8, /* (sx125x) 2 bits, (sx1250) 1 bit */
    #[serde(default)]
    pub dac_gain: u8, /* (sx125x) 2 bits */
    #[serde(default = "default_mix_gain")]
    pub mix_gain: u8, /* (sx125x) 4 bits */
    #[serde(default)]
    pub offset_i: i8,
    #[serde(default)]
    pub offset_q: i8,
    #[serde(default)]
    pub pwr_idx: u8, /* (sx1250) 6 bits */
}

fn default_mix_gain() -> u8 {
    8
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxGainLut {
    pub lut: Vec<TxGain>,
}

pub fn default_tx_gain_lut() -> TxGainLut {
    TxGainLut {
        lut: vec![TxGain {
            rf_power: 14,
            dig_gain: 0,
            pa_gain: 2,
            dac_gain: 3,
            mix_gain: 10,
            offset_i: 0,
            offset_q: 0,
            pwr_idx: 0,
        }],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FineTimestampMode {
    #[serde(rename = "high_capacity")]
    HighCapacity, /* SF5 -> SF10 */
    #[serde(rename = "all_sf")]
    AllSf, /* SF5 -> SF12 */
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FineTimestampConf {
    pub enable: bool,            /* Enable / Disable fine timestamping */
    pub mode: FineTimestampMode, /* Fine timestamping mode */
}

pub fn default_ftime_conf() -> FineTimestampConf {
    FineTimestampConf { enable: false, mode: FineTimestampMode::AllSf }
}

impl Default for FineTimestampConf {
    fn default() -> Self {
        default_ftime_conf()
    }
}

/// LBT carrier sense time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum ScanTime {
    #[default]
    Us128 = 128,
    Us5000 = 5000,
}

impl Serialize for ScanTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(*self as u16)
    }
}

impl<'de> Deserialize<'de> for ScanTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u16::deserialize(deserializer)? {
            128 => Ok(ScanTime::Us128),
            5000 => Ok(ScanTime::Us5000),
            v => Err(de::Error::custom(format!("Invalid scan time: {} us", v))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LbtChannelConf {
    pub freq_hz: u32,           /* LBT channel frequency */
    pub bandwidth: Bandwidth,   /* LBT channel bandwidth */
    pub scan_time_us: ScanTime, /* LBT channel carrier sense time */
    pub transmit_time_ms: u16,  /* LBT channel transmission duration when allowed */
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LbtConf {
    pub enable: bool,                  /* enable or disable LBT */
    pub rssi_target: i8,               /* RSSI threshold to detect if channel is busy or not (dBm) */
    pub channels: Vec<LbtChannelConf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sx1261Conf {
    pub enable: bool,     /* enable or disable SX1261 radio */
    pub spi_path: String, /* Path to access the SPI device to connect to the SX1261 (not used for USB com type) */
    pub rssi_offset: i8,  /* value to be applied to the sx1261 RSSI value (dBm) */
    #[serde(rename = "lbt")]
    pub lbt_conf: LbtConf, /* listen-before-talk configuration */
}

pub fn default_sx1261_conf() -> Sx1261Conf {
    Sx1261Conf {
        enable: false,
        spi_path: String::from("/dev/spidev0.1"),
        rssi_offset: 0,
        lbt_conf: LbtConf {
            enable: false,
            rssi_target: 0,
            channels: vec![LbtChannelConf::default()],
        },
    }
}

impl Default for Sx1261Conf {
    fn default() -> Self {
        default_sx1261_conf()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefPayload {
    pub id: u32,            /* counter ID embedded in the payload */
    pub payload: [u8; 255],
    pub prev_cnt: u32,      /* last counter value seen */
}

impl Default for RefPayload {
    fn default() -> Self {
        Self { id: 0, payload: [0; 255], prev_cnt: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugConf {
    pub ref_payloads: Vec<RefPayload>, /* reference payloads to check received counters against */
    pub log_file_name: String,
}

pub fn default_debug_conf() -> DebugConf {
    DebugConf {
        ref_payloads: Vec::new(),
        log_file_name: String::from("loragw.log"),
    }
}

impl Default for DebugConf {
    fn default() -> Self {
        default_debug_conf()
    }
}

pub fn validate_board_conf(conf: &BoardConf) -> Result<(), ConfigError> {
    match conf.com_type {
        ComType::Spi => {
            if conf.com_path.is_empty() {
                error!("ERROR: COM PATH IS EMPTY");
                return Err(ConfigError::EmptyComPath);
            }
        }
        ComType::Usb => {}
        ComType::Unknown => {
            error!("ERROR: WRONG COM TYPE");
            return Err(ConfigError::UnknownComType);
        }
    }

    if conf.com_path.len() > COM_PATH_LEN_MAX {
        error!("ERROR: COM PATH TOO LONG ({} bytes)", conf.com_path.len());
        return Err(ConfigError::ComPathTooLong(conf.com_path.len()));
    }

    if conf.clksrc >= LGW_RF_CHAIN_NB {
        error!("ERROR: {} NOT A VALID CLOCK SOURCE", conf.clksrc);
        return Err(ConfigError::ClockSourceOutOfRange(conf.clksrc));
    }

    Ok(())
}

/// Disabled chains are accepted as-is, only the index is checked.
pub fn validate_rf_chain_conf(rf_chain: u8, conf: &RfChainConf) -> Result<(), ConfigError> {
    if rf_chain >= LGW_RF_CHAIN_NB {
        error!("ERROR: {} NOT A VALID RF_CHAIN NUMBER", rf_chain);
        return Err(ConfigError::ChainIndexOutOfRange { chain: rf_chain });
    }

    if !conf.enable {
        return Ok(());
    }

    if conf.radio_type == RadioType::None {
        error!("ERROR: NOT A VALID RADIO TYPE {}", conf.radio_type);
        return Err(ConfigError::InvalidRadioType(conf.radio_type));
    }

    if !(LGW_RF_RX_FREQ_MIN..=LGW_RF_RX_FREQ_MAX).contains(&conf.freq_hz) {
        error!(
            "ERROR: NOT A VALID RADIO CENTER FREQUENCY, PLEASE CHECK IF IT HAS BEEN GIVEN IN HZ ({})",
            conf.freq_hz
        );
        return Err(ConfigError::FrequencyOutOfRange(conf.freq_hz));
    }

    Ok(())
}

/// Checks an IF chain against its modem and returns it with defaults filled in.
pub fn validate_if_chain_conf(if_chain: u8, conf: &IfChainConf) -> Result<IfChainConf, ConfigError> {
    let Some(modem) = if_modem_type(if_chain) else {
        error!("ERROR: {} NOT A VALID IF_CHAIN NUMBER", if_chain);
        return Err(ConfigError::IfChainIndexOutOfRange { chain: if_chain });
    };

    /* if chain is disabled, don't care about most parameters */
    if !conf.enable {
        return Ok(IfChainConf::default());
    }

    if conf.rf_chain >= LGW_RF_CHAIN_NB {
        error!("ERROR: INVALID RF_CHAIN {} TO ASSOCIATE WITH IF CHAIN {}", conf.rf_chain, if_chain);
        return Err(ConfigError::ChainIndexOutOfRange { chain: conf.rf_chain });
    }

    /* channel must fit in the radio bandwidth */
    let half_bw = i64::from(conf.bandwidth.hz().unwrap_or(LGW_REF_BW)) / 2;
    let half_rf_bw = i64::from(LGW_RF_RX_BANDWIDTH) / 2;
    let offset = i64::from(conf.freq_hz);
    if offset + half_bw > half_rf_bw || offset - half_bw < -half_rf_bw {
        error!("ERROR: IF FREQUENCY {} OUT OF RADIO BANDWIDTH", conf.freq_hz);
        return Err(ConfigError::IfFrequencyOutOfRange { freq_hz: conf.freq_hz });
    }

    let mut resolved = *conf;
    match modem {
        IfModemType::LoraMulti => {
            if resolved.bandwidth == Bandwidth::Undefined {
                resolved.bandwidth = Bandwidth::Khz125;
            }
            if resolved.datarate == Datarate::Undefined {
                resolved.datarate = Datarate::Lora(SpreadingFactor::Sf7);
            }
            if resolved.bandwidth != Bandwidth::Khz125 {
                error!("ERROR: BANDWIDTH NOT SUPPORTED BY LORA_MULTI IF CHAIN");
                return Err(invalid_bandwidth(if_chain, resolved.bandwidth));
            }
            if !resolved.datarate.is_lora() {
                error!("ERROR: DATARATE(S) NOT SUPPORTED BY LORA_MULTI IF CHAIN");
                return Err(ConfigError::InvalidDatarate { chain: if_chain, datarate: resolved.datarate.raw() });
            }
        }
        IfModemType::LoraStd => {
            if resolved.bandwidth == Bandwidth::Undefined {
                resolved.bandwidth = Bandwidth::Khz250;
            }
            if resolved.datarate == Datarate::Undefined {
                resolved.datarate = Datarate::Lora(SpreadingFactor::Sf7);
            }
            if !resolved.datarate.is_lora() {
                error!("ERROR: DATARATE NOT SUPPORTED BY LORA_STD IF CHAIN: {}", resolved.datarate);
                return Err(ConfigError::InvalidDatarate { chain: if_chain, datarate: resolved.datarate.raw() });
            }
        }
        IfModemType::FskStd => {
            if resolved.bandwidth == Bandwidth::Undefined {
                resolved.bandwidth = Bandwidth::Khz250;
            }
            if resolved.datarate == Datarate::Undefined {
                resolved.datarate = Datarate::Fsk(64_000);
            }
            if !resolved.datarate.is_fsk() {
                error!("ERROR: DATARATE NOT SUPPORTED BY FSK IF CHAIN: {}", resolved.datarate);
                return Err(ConfigError::InvalidDatarate { chain: if_chain, datarate: resolved.datarate.raw() });
            }
        }
    }

    Ok(resolved)
}

fn invalid_bandwidth(chain: u8, bandwidth: Bandwidth) -> ConfigError {
    ConfigError::InvalidBandwidth { chain, bandwidth: bandwidth.hz().unwrap_or(0) }
}

pub fn validate_tx_gain_lut(rf_chain: u8, lut: &[TxGain]) -> Result<(), ConfigError> {
    if rf_chain >= LGW_RF_CHAIN_NB {
        error!("ERROR: {} NOT A VALID RF_CHAIN NUMBER", rf_chain);
        return Err(ConfigError::ChainIndexOutOfRange { chain: rf_chain });
    }

    if lut.is_empty() || lut.len() > TX_GAIN_LUT_SIZE_MAX {
        error!("ERROR: TX gain LUT must have at least one entry and maximum {} entries", TX_GAIN_LUT_SIZE_MAX);
        return Err(ConfigError::TxGainLutSize(lut.len()));
    }

    for gain in lut {
        let checks: [(&'static str, u8, bool); 5] = [
            ("dig_gain", gain.dig_gain, gain.dig_gain <= 3),
            ("dac_gain", gain.dac_gain, gain.dac_gain <= 3),
            ("mix_gain", gain.mix_gain, (5..=15).contains(&gain.mix_gain)),
            ("pa_gain", gain.pa_gain, gain.pa_gain <= 3),
            ("pwr_idx", gain.pwr_idx, gain.pwr_idx <= 22),
        ];
        if let Some(&(field, value, _)) = checks.iter().find(|(_, _, ok)| !ok) {
            error!("ERROR: TX gain LUT: {} = {} out of range", field, value);
            return Err(ConfigError::TxGainOutOfRange { field, value });
        }
    }

    Ok(())
}

pub fn validate_sx1261_conf(conf: &Sx1261Conf) -> Result<(), ConfigError> {
    let nb_channel = conf.lbt_conf.channels.len();
    if nb_channel > LGW_LBT_CHANNEL_NB_MAX {
        error!("ERROR: TOO MANY LBT CHANNELS ({})", nb_channel);
        return Err(ConfigError::TooManyLbtChannels(nb_channel));
    }

    if conf.lbt_conf.enable && !conf.enable {
        error!("ERROR: LBT REQUIRES SX1261 TO BE ENABLED");
        return Err(ConfigError::LbtRequiresSx1261);
    }

    Ok(())
}

pub fn validate_debug_conf(conf: &DebugConf) -> Result<(), ConfigError> {
    if conf.ref_payloads.len() > LGW_REF_PAYLOAD_NB_MAX {
        return Err(ConfigError::TooManyRefPayloads(conf.ref_payloads.len()));
    }
    Ok(())
}

/// Every configuration block of one concentrator board.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConf {
    pub board: BoardConf,
    pub rf_chains: [RfChainConf; LGW_RF_CHAIN_NB as usize],
    pub if_chains: [IfChainConf; LGW_IF_CHAIN_NB as usize],
    pub demod: DemodConf,
    pub lora_service: IfChainConf, /* LoRa service channel parameters */
    pub fsk: IfChainConf,          /* FSK channel parameters */
    pub tx_gain_luts: [TxGainLut; LGW_RF_CHAIN_NB as usize],
    pub ftime: FineTimestampConf,
    pub sx1261: Sx1261Conf,
    pub debug: DebugConf,
}

impl Default for GatewayConf {
    fn default() -> Self {
        Self {
            board: default_board_conf(),
            rf_chains: [default_rf_chain_conf(), RfChainConf::disabled()],
            if_chains: [IfChainConf::default(); LGW_IF_CHAIN_NB as usize],
            demod: default_demod_conf(),
            lora_service: default_lora_service_conf(),
            fsk: default_fsk_conf(),
            tx_gain_luts: [default_tx_gain_lut(), default_tx_gain_lut()],
            ftime: default_ftime_conf(),
            sx1261: default_sx1261_conf(),
            debug: default_debug_conf(),
        }
    }
}

impl GatewayConf {
    /// Replays every block through the setters, starting from defaults.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let mut conf = GatewayConf {
            lora_service: self.lora_service,
            fsk: self.fsk,
            ..Default::default()
        };

        conf.set_board(self.board)?;
        for (i, rf) in self.rf_chains.into_iter().enumerate() {
            conf.set_rf_chain(i as u8, rf)?;
        }
        for (i, if_conf) in self.if_chains.iter().enumerate() {
            conf.set_if_chain(i as u8, if_conf)?;
        }
        conf.set_demod(self.demod);
        for (i, lut) in self.tx_gain_luts.iter().enumerate() {
            conf.set_tx_gain_lut(i as u8, &lut.lut)?;
        }
        conf.set_ftime(self.ftime);
        conf.set_sx1261(self.sx1261)?;
        conf.set_debug(self.debug)?;

        Ok(conf)
    }

    pub fn set_board(&mut self, conf: BoardConf) -> Result<(), ConfigError> {
        validate_board_conf(&conf)?;

        info!(
            com_type = %conf.com_type,
            com_path = %conf.com_path,
            lorawan_public = conf.lorawan_public,
            clksrc = conf.clksrc,
            full_duplex = conf.full_duplex,
            "Board configuration loaded"
        );
        self.board = conf;
        Ok(())
    }

    pub fn set_rf_chain(&mut self, rf_chain: u8, conf: RfChainConf) -> Result<(), ConfigError> {
        validate_rf_chain_conf(rf_chain, &conf)?;

        if !conf.enable {
            debug!("Note: rf_chain {} disabled", rf_chain);
        } else {
            info!(
                rf_chain,
                freq_hz = conf.freq_hz,
                rssi_offset = conf.rssi_offset,
                radio_type = %conf.radio_type,
                tx_enable = conf.tx_enable,
                single_input_mode = conf.single_input_mode,
                "RF configuration loaded"
            );
        }
        self.rf_chains[rf_chain as usize] = conf;
        Ok(())
    }

    pub fn set_if_chain(&mut self, if_chain: u8, conf: &IfChainConf) -> Result<(), ConfigError> {
        let resolved = validate_if_chain_conf(if_chain, conf)?;

        if !resolved.enable {
            debug!("Note: if_chain {} disabled", if_chain);
            let ctx_if_chain = &mut self.if_chains[if_chain as usize];
            ctx_if_chain.enable = false;
            ctx_if_chain.freq_hz = 0;
            return Ok(());
        }

        match if_modem_type(if_chain) {
            Some(IfModemType::LoraStd) => {
                self.lora_service.bandwidth = resolved.bandwidth;
                self.lora_service.datarate = resolved.datarate;
                self.lora_service.implicit_hdr = resolved.implicit_hdr;
                self.lora_service.implicit_payload_length = resolved.implicit_payload_length;
                self.lora_service.implicit_crc_en = resolved.implicit_crc_en;
                self.lora_service.implicit_coderate = resolved.implicit_coderate;
            }
            Some(IfModemType::FskStd) => {
                self.fsk.bandwidth = resolved.bandwidth;
                self.fsk.datarate = resolved.datarate;
                if resolved.sync_word > 0 {
                    self.fsk.sync_word_size = resolved.sync_word_size;
                    self.fsk.sync_word = resolved.sync_word;
                }
            }
            _ => {}
        }

        info!(if_chain, conf = %resolved, "IF configuration loaded");
        self.if_chains[if_chain as usize] = resolved;
        Ok(())
    }

    pub fn set_demod(&mut self, conf: DemodConf) {
        let enabled_sf = SpreadingFactor::ALL
            .iter()
            .filter(|sf| conf.is_sf_enabled(**sf))
            .map(|sf| *sf as u8)
            .collect::<Vec<_>>();
        info!(mask = conf.multisf_datarate, "Multi-SF demodulators enabled for SF {:?}", enabled_sf);
        self.demod = conf;
    }

    pub fn set_tx_gain_lut(&mut self, rf_chain: u8, lut: &[TxGain]) -> Result<(), ConfigError> {
        validate_tx_gain_lut(rf_chain, lut)?;

        /* offsets are calibrated at start-up */
        let lut = lut
            .iter()
            .map(|gain| TxGain { offset_i: 0, offset_q: 0, ..*gain })
            .collect::<Vec<_>>();
        info!(rf_chain, size = lut.len(), "TX gain LUT loaded");
        self.tx_gain_luts[rf_chain as usize] = TxGainLut { lut };
        Ok(())
    }

    pub fn set_ftime(&mut self, conf: FineTimestampConf) {
        info!(enable = conf.enable, mode = ?conf.mode, "Fine timestamp configuration loaded");
        self.ftime = conf;
    }

    pub fn set_sx1261(&mut self, conf: Sx1261Conf) -> Result<(), ConfigError> {
        validate_sx1261_conf(&conf)?;

        info!(
            enable = conf.enable,
            spi_path = %conf.spi_path,
            rssi_offset = conf.rssi_offset,
            lbt_enable = conf.lbt_conf.enable,
            lbt_channels = conf.lbt_conf.channels.len(),
            "SX1261 configuration loaded"
        );
        self.sx1261 = conf;
        Ok(())
    }

    pub fn set_debug(&mut self, conf: DebugConf) -> Result<(), ConfigError> {
        validate_debug_conf(&conf)?;
        self.debug = conf;
        Ok(())
    }
}
