use std::{fs::read_to_string, path::Path};

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::loragw_com::ComType;
use super::loragw_conf::{
    DemodConf, FineTimestampConf, GatewayConf, IfChainConf, RfChainConf, SpreadingFactor, Sx1261Conf, TxGain,
    TxGainLut,
};
use super::{LGW_MULTI_NB, LGW_RF_CHAIN_NB};

/// `radio_N` section: RF chain fields plus the TX gain table of that chain.
#[derive(Deserialize, Debug, Clone)]
struct RadioSerde {
    #[serde(flatten)]
    rf: RfChainConf,
    tx_gain_lut: Option<Vec<TxGain>>,
}

#[derive(Deserialize, Debug, Clone)]
struct MultiSfAllSerde {
    spreading_factor_enable: Vec<u32>,
}

impl MultiSfAllSerde {
    fn mask(&self) -> Result<u8> {
        self.spreading_factor_enable.iter().try_fold(0u8, |mask, sf| {
            SpreadingFactor::from_u32(*sf)
                .map(|sf| mask | sf.mask_bit())
                .ok_or_else(|| anyhow!("invalid spreading factor {} in chan_multiSF_All", sf))
        })
    }
}

fn section<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Result<Option<T>> {
    obj.get(key)
        .map(|v| serde_json::from_value(v.clone()).with_context(|| format!("invalid `{}` section", key)))
        .transpose()
}

impl GatewayConf {
    /// Reads the `SX130x_conf` object of a packet forwarder configuration.
    ///
    /// Keys that are absent keep their default value. Nothing is validated here.
    pub fn from_json_str(json: &str) -> Result<GatewayConf> {
        let root: Value = serde_json::from_str(json).context("configuration is not valid JSON")?;
        let obj = root
            .get("SX130x_conf")
            .and_then(Value::as_object)
            .ok_or_else(|| anyhow!("missing `SX130x_conf` object"))?;

        let mut conf = GatewayConf::default();

        if let Some(com_type) = section::<ComType>(obj, "com_type")? {
            conf.board.com_type = com_type;
        }
        if let Some(com_path) = section::<String>(obj, "com_path")? {
            conf.board.com_path = com_path;
        }
        if let Some(lorawan_public) = section::<bool>(obj, "lorawan_public")? {
            conf.board.lorawan_public = lorawan_public;
        }
        if let Some(clksrc) = section::<u8>(obj, "clksrc")? {
            conf.board.clksrc = clksrc;
        }
        if let Some(full_duplex) = section::<bool>(obj, "full_duplex")? {
            conf.board.full_duplex = full_duplex;
        }

        for i in 0..LGW_RF_CHAIN_NB as usize {
            if let Some(radio) = section::<RadioSerde>(obj, &format!("radio_{}", i))? {
                conf.rf_chains[i] = radio.rf;
                if let Some(lut) = radio.tx_gain_lut {
                    conf.tx_gain_luts[i] = TxGainLut { lut };
                }
            }
        }

        if let Some(all) = section::<MultiSfAllSerde>(obj, "chan_multiSF_All")? {
            conf.demod = DemodConf { multisf_datarate: all.mask()? };
        }

        for i in 0..LGW_MULTI_NB as usize {
            if let Some(chan) = section::<IfChainConf>(obj, &format!("chan_multiSF_{}", i))? {
                conf.if_chains[i] = chan;
            }
        }
        if let Some(chan) = section::<IfChainConf>(obj, "chan_Lora_std")? {
            conf.if_chains[LGW_MULTI_NB as usize] = chan;
        }
        if let Some(chan) = section::<IfChainConf>(obj, "chan_FSK")? {
            conf.if_chains[LGW_MULTI_NB as usize + 1] = chan;
        }

        if let Some(ftime) = section::<FineTimestampConf>(obj, "fine_timestamp")? {
            conf.ftime = ftime;
        }

        if let Some(sx1261) = obj.get("sx1261_conf") {
            let mut sx1261_conf: Sx1261Conf =
                serde_json::from_value(sx1261.clone()).context("invalid `sx1261_conf` section")?;
            /* a present section without an explicit flag means the radio is fitted */
            if sx1261.get("enable").is_none() {
                sx1261_conf.enable = true;
            }
            conf.sx1261 = sx1261_conf;
        }

        debug!("Note: configuration parsed, com_path {}", conf.board.com_path);
        Ok(conf)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<GatewayConf> {
        let path = path.as_ref();
        let json = read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("failed to parse {}", path.display()))
    }
}
