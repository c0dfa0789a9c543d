//! Alert status decoding and prioritization
//!
//! The detector reports its alert conditions as a 16-bit status word,
//! one independent condition per bit. Each bit maps through a static
//! priority table to a name and an urgency rank (1 = most urgent).
//! A zero word is a first-class "all clear", distinct from "not yet
//! read" at the caller.
//!
//! Wire note: the firmware sends the status word big-endian on reads
//! but little-endian in notifications. Both paths are preserved exactly
//! as observed; do not unify them without firmware-side confirmation.

use std::sync::Arc;

use crate::accessor;
use crate::link::CharacteristicAddress;
use crate::notify::{self, Subscription};
use crate::session::Session;
use crate::types::{TypedValue, ValueShape};
use crate::uuids;

const ALERT_STATUS: CharacteristicAddress =
    CharacteristicAddress::new(uuids::ALERT_NOTIFICATION_SERVICE, uuids::ALERT_STATUS);

/// Bit mask -> (alert name, priority rank), 1 = most urgent
pub const ALERT_PRIORITY: [(u16, &str, u16); 16] = [
    (0x0001, "power_up", 1),
    (0x0002, "alignment", 2),
    (0x0004, "calib_mode", 3),
    (0x0008, "misAlignment", 8),
    (0x0010, "HW_Fault", 4),
    (0x0020, "param_fault", 5),
    (0x0040, "calib_fault", 6),
    (0x0080, "power_fault", 7),
    (0x0100, "warn_level", 10),
    (0x0200, "alarm_level", 9),
    (0x0400, "gas_mixture", 11),
    (0x0800, "safety_delay", 14),
    (0x1000, "no_sync", 13),
    (0x2000, "beam_blocked", 12),
    (0x4000, "peak_detect", 15),
    (0x8000, "fake_peak_detect", 16),
];

/// Rank assigned to bits with no table entry, below every named alert
const UNKNOWN_ALERT_RANK: u16 = 17;

/// One set bit of the status word, resolved through the priority table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAlert {
    pub bit: u8,
    pub name: String,
    pub rank: u16,
}

/// Decoded view of one status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertStatus {
    pub active: Vec<ActiveAlert>,
    /// The most urgent active alert; `None` means all clear
    pub top: Option<ActiveAlert>,
}

impl AlertStatus {
    pub fn all_clear(&self) -> bool {
        self.active.is_empty()
    }
}

fn lookup(mask: u16) -> Option<(&'static str, u16)> {
    ALERT_PRIORITY
        .iter()
        .find(|(m, _, _)| *m == mask)
        .map(|(_, name, rank)| (*name, *rank))
}

/// Decode a 16-bit status word into its active alerts and the single
/// highest-priority one. Bits are scanned ascending, so rank ties
/// (only possible among unknown bits) resolve to the lowest bit.
pub fn decode_alert_status(word: u16) -> AlertStatus {
    let mut active = Vec::new();
    for bit in 0..16u8 {
        let mask = 1u16 << bit;
        if word & mask == 0 {
            continue;
        }
        let (name, rank) = match lookup(mask) {
            Some((name, rank)) => (name.to_string(), rank),
            None => (format!("unknown bit {}", bit), UNKNOWN_ALERT_RANK),
        };
        active.push(ActiveAlert { bit, name, rank });
    }
    let top = active.iter().min_by_key(|a| (a.rank, a.bit)).cloned();
    AlertStatus { active, top }
}

/// Read the current alert status word (big-endian on the read path)
pub async fn read_alert_status(session: &Session) -> Option<u16> {
    accessor::read_u16_be(session, ALERT_STATUS).await
}

/// Subscribe to alert status notifications (little-endian on the notify
/// path — the firmware's asymmetry, preserved as observed)
pub async fn subscribe_alert_status<F>(
    session: &Arc<Session>,
    consumer: &str,
    on_word: F,
) -> Option<Subscription>
where
    F: Fn(u16) + Send + 'static,
{
    notify::subscribe(
        session,
        ALERT_STATUS,
        ValueShape::U16Le,
        consumer,
        move |value| {
            if let TypedValue::U16(word) = value {
                on_word(word);
            }
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_word_is_all_clear() {
        let status = decode_alert_status(0);
        assert!(status.active.is_empty());
        assert!(status.top.is_none());
        assert!(status.all_clear());
    }

    #[test]
    fn test_single_bit() {
        let status = decode_alert_status(0x0001);
        assert_eq!(status.active.len(), 1);
        let top = status.top.unwrap();
        assert_eq!(top.name, "power_up");
        assert_eq!(top.rank, 1);
        assert_eq!(top.bit, 0);
    }

    #[test]
    fn test_top_alert_is_lowest_rank_not_lowest_bit() {
        // alignment (bit 1, rank 2) beats alarm_level (bit 9, rank 9)
        let status = decode_alert_status(0x0202);
        assert_eq!(status.active.len(), 2);
        assert_eq!(status.top.unwrap().name, "alignment");

        // HW_Fault (bit 4, rank 4) beats misAlignment (bit 3, rank 8)
        let status = decode_alert_status(0x0018);
        assert_eq!(status.top.unwrap().name, "HW_Fault");
    }

    #[test]
    fn test_every_set_bit_maps_and_no_others() {
        for word in [0x0001u16, 0x8000, 0x0202, 0x5555, 0xaaaa, 0xffff] {
            let status = decode_alert_status(word);
            assert_eq!(status.active.len(), word.count_ones() as usize);
            for alert in &status.active {
                assert_ne!(word & (1 << alert.bit), 0);
            }
            let mut bits: Vec<u8> = status.active.iter().map(|a| a.bit).collect();
            bits.dedup();
            assert_eq!(bits.len(), word.count_ones() as usize);
        }
    }

    #[test]
    fn test_full_word_names_match_table() {
        let status = decode_alert_status(0xffff);
        for (mask, name, rank) in ALERT_PRIORITY {
            let alert = status
                .active
                .iter()
                .find(|a| 1u16 << a.bit == mask)
                .expect("every table bit active");
            assert_eq!(alert.name, name);
            assert_eq!(alert.rank, rank);
        }
        // power_up holds rank 1 over the whole word
        assert_eq!(status.top.unwrap().name, "power_up");
    }

    #[test]
    fn test_table_is_complete_and_ranks_unique() {
        let mut masks: Vec<u16> = ALERT_PRIORITY.iter().map(|(m, _, _)| *m).collect();
        masks.sort_unstable();
        let expected: Vec<u16> = (0..16).map(|b| 1u16 << b).collect();
        assert_eq!(masks, expected);

        let mut ranks: Vec<u16> = ALERT_PRIORITY.iter().map(|(_, _, r)| *r).collect();
        ranks.sort_unstable();
        let expected: Vec<u16> = (1..=16).collect();
        assert_eq!(ranks, expected);
    }

    #[test]
    fn test_unknown_rank_sits_below_named_alerts() {
        assert!(ALERT_PRIORITY.iter().all(|(_, _, r)| *r < UNKNOWN_ALERT_RANK));
    }
}
