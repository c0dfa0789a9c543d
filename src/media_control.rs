//! Media Control service (0x1848): operating-mode enum, single byte

use std::fmt;

use log::warn;

use crate::accessor;
use crate::link::CharacteristicAddress;
use crate::session::Session;
use crate::types::WriteMode;
use crate::uuids;

const CONTROL_POINT: CharacteristicAddress =
    CharacteristicAddress::new(uuids::MEDIA_CONTROL_SERVICE, uuids::MEDIA_CONTROL_POINT);

/// Operating mode of the detector head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MediaControlState {
    Normal = 0,
    Alignment = 1,
    ZeroCalibration = 2,
}

impl MediaControlState {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(MediaControlState::Normal),
            1 => Some(MediaControlState::Alignment),
            2 => Some(MediaControlState::ZeroCalibration),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for MediaControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaControlState::Normal => write!(f, "Normal"),
            MediaControlState::Alignment => write!(f, "Alignment"),
            MediaControlState::ZeroCalibration => write!(f, "Zero Calibration"),
        }
    }
}

pub async fn read_media_control_state(session: &Session) -> Option<MediaControlState> {
    let raw = accessor::read_u8(session, CONTROL_POINT).await?;
    match MediaControlState::from_u8(raw) {
        Some(state) => Some(state),
        None => {
            warn!("Unknown media control state from device: {}", raw);
            None
        }
    }
}

pub async fn write_media_control_state(session: &Session, state: MediaControlState) -> bool {
    accessor::write_u8(session, CONTROL_POINT, state.to_u8(), WriteMode::WithResponse).await
}
