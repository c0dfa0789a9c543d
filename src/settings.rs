//! FG custom settings service
//!
//! Seven characteristics, all 2 bytes big-endian on read and write,
//! except gas type which reads as u16 big-endian but writes a single
//! byte — a firmware asymmetry, preserved as observed.

use std::fmt;

use log::warn;
use serde::Serialize;

use crate::accessor;
use crate::link::CharacteristicAddress;
use crate::session::Session;
use crate::types::WriteMode;
use crate::uuids;

const FULL_SCALE: CharacteristicAddress =
    CharacteristicAddress::new(uuids::FG_SETTINGS_SERVICE, uuids::FULL_SCALE);
const ALARM_LEVEL: CharacteristicAddress =
    CharacteristicAddress::new(uuids::FG_SETTINGS_SERVICE, uuids::ALARM_LEVEL);
const WARN_LEVEL: CharacteristicAddress =
    CharacteristicAddress::new(uuids::FG_SETTINGS_SERVICE, uuids::WARN_LEVEL);
const LOWEST_LEVEL: CharacteristicAddress =
    CharacteristicAddress::new(uuids::FG_SETTINGS_SERVICE, uuids::LOWEST_LEVEL);
const RESPONSE_TIME: CharacteristicAddress =
    CharacteristicAddress::new(uuids::FG_SETTINGS_SERVICE, uuids::RESPONSE_TIME);
const BLOCK_DELAY: CharacteristicAddress =
    CharacteristicAddress::new(uuids::FG_SETTINGS_SERVICE, uuids::BLOCK_DELAY);
const SELECT_GAS_TYPE: CharacteristicAddress =
    CharacteristicAddress::new(uuids::FG_SETTINGS_SERVICE, uuids::SELECT_GAS_TYPE);

/// Target gas selection (firmware enum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum GasType {
    Methane = 0,
    Propane = 1,
    Butane = 2,
}

impl GasType {
    pub fn from_raw(value: u16) -> Option<Self> {
        match value {
            0 => Some(GasType::Methane),
            1 => Some(GasType::Propane),
            2 => Some(GasType::Butane),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for GasType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GasType::Methane => write!(f, "Methane"),
            GasType::Propane => write!(f, "Propane"),
            GasType::Butane => write!(f, "Butane"),
        }
    }
}

pub async fn read_full_scale(session: &Session) -> Option<u16> {
    accessor::read_u16_be(session, FULL_SCALE).await
}

pub async fn write_full_scale(session: &Session, value: u16) -> bool {
    accessor::write_u16_be(session, FULL_SCALE, value, WriteMode::WithResponse).await
}

pub async fn read_alarm_level(session: &Session) -> Option<u16> {
    accessor::read_u16_be(session, ALARM_LEVEL).await
}

pub async fn write_alarm_level(session: &Session, value: u16) -> bool {
    accessor::write_u16_be(session, ALARM_LEVEL, value, WriteMode::WithResponse).await
}

pub async fn read_warn_level(session: &Session) -> Option<u16> {
    accessor::read_u16_be(session, WARN_LEVEL).await
}

pub async fn write_warn_level(session: &Session, value: u16) -> bool {
    accessor::write_u16_be(session, WARN_LEVEL, value, WriteMode::WithResponse).await
}

pub async fn read_lowest_level(session: &Session) -> Option<u16> {
    accessor::read_u16_be(session, LOWEST_LEVEL).await
}

pub async fn write_lowest_level(session: &Session, value: u16) -> bool {
    accessor::write_u16_be(session, LOWEST_LEVEL, value, WriteMode::WithResponse).await
}

pub async fn read_response_time(session: &Session) -> Option<u16> {
    accessor::read_u16_be(session, RESPONSE_TIME).await
}

pub async fn write_response_time(session: &Session, value: u16) -> bool {
    accessor::write_u16_be(session, RESPONSE_TIME, value, WriteMode::WithResponse).await
}

pub async fn read_block_delay(session: &Session) -> Option<u16> {
    accessor::read_u16_be(session, BLOCK_DELAY).await
}

pub async fn write_block_delay(session: &Session, value: u16) -> bool {
    accessor::write_u16_be(session, BLOCK_DELAY, value, WriteMode::WithResponse).await
}

/// Read the selected gas type (u16 big-endian on the wire)
pub async fn read_gas_type(session: &Session) -> Option<GasType> {
    let raw = accessor::read_u16_be(session, SELECT_GAS_TYPE).await?;
    match GasType::from_raw(raw) {
        Some(gas) => Some(gas),
        None => {
            warn!("Unknown gas type value from device: {}", raw);
            None
        }
    }
}

/// Write the selected gas type (single byte on the wire, unlike the read)
pub async fn write_gas_type(session: &Session, gas: GasType) -> bool {
    accessor::write_u8(session, SELECT_GAS_TYPE, gas.to_u8(), WriteMode::WithResponse).await
}

/// All settings characteristics in one snapshot; failed reads stay `None`
#[derive(Debug, Clone, Default, Serialize)]
pub struct SettingsSnapshot {
    pub full_scale: Option<u16>,
    pub alarm_level: Option<u16>,
    pub warn_level: Option<u16>,
    pub lowest_level: Option<u16>,
    pub response_time: Option<u16>,
    pub block_delay: Option<u16>,
    pub gas_type: Option<GasType>,
}

pub async fn read_settings_snapshot(session: &Session) -> SettingsSnapshot {
    SettingsSnapshot {
        full_scale: read_full_scale(session).await,
        alarm_level: read_alarm_level(session).await,
        warn_level: read_warn_level(session).await,
        lowest_level: read_lowest_level(session).await,
        response_time: read_response_time(session).await,
        block_delay: read_block_delay(session).await,
        gas_type: read_gas_type(session).await,
    }
}
