use core::{fmt, ops::RangeInclusive};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::icons::IconId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoistureZone {
    Overload,
    VeryDry,
    Dry,
    Optimal,
    Wet,
    VeryWet,
    Underload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoistureStatus {
    #[serde(rename = "OL")]
    Overload,
    #[serde(rename = "sDRY")]
    VeryDry,
    #[serde(rename = "DRY")]
    Dry,
    #[serde(rename = "OK")]
    Optimal,
    #[serde(rename = "WET")]
    Wet,
    #[serde(rename = "sWET")]
    VeryWet,
    #[serde(rename = "UL")]
    Underload,
    #[serde(rename = "ERR")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub zone: MoistureZone,
    pub icon: IconId,
    pub status: MoistureStatus,
}

impl MoistureZone {
    pub const ALL: [MoistureZone; 7] = [
        MoistureZone::Overload,
        MoistureZone::VeryDry,
        MoistureZone::Dry,
        MoistureZone::Optimal,
        MoistureZone::Wet,
        MoistureZone::VeryWet,
        MoistureZone::Underload,
    ];

    pub const fn range(self) -> RangeInclusive<i32> {
        match self {
            Self::Overload => 851..=i32::MAX,
            Self::VeryDry => 767..=850,
            Self::Dry => 684..=766,
            Self::Optimal => 587..=683,
            Self::Wet => 504..=586,
            Self::VeryWet => 420..=503,
            Self::Underload => i32::MIN..=419,
        }
    }

    pub const fn status(self) -> MoistureStatus {
        match self {
            Self::Overload => MoistureStatus::Overload,
            Self::VeryDry => MoistureStatus::VeryDry,
            Self::Dry => MoistureStatus::Dry,
            Self::Optimal => MoistureStatus::Optimal,
            Self::Wet => MoistureStatus::Wet,
            Self::VeryWet => MoistureStatus::VeryWet,
            Self::Underload => MoistureStatus::Underload,
        }
    }

    pub const fn icon(self) -> IconId {
        match self {
            Self::Overload | Self::Underload => IconId::Warning,
            Self::VeryDry => IconId::WateringCan,
            Self::Dry => IconId::FlowerLeafRight,
            Self::Optimal => IconId::FlowerTwoLeaves,
            Self::Wet => IconId::FlowerLeafLeft,
            Self::VeryWet => IconId::Waves,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overload => "Overload",
            Self::VeryDry => "VeryDry",
            Self::Dry => "Dry",
            Self::Optimal => "Optimal",
            Self::Wet => "Wet",
            Self::VeryWet => "VeryWet",
            Self::Underload => "Underload",
        }
    }

    fn classification(self) -> Classification {
        Classification {
            zone: self,
            icon: self.icon(),
            status: self.status(),
        }
    }

    fn distance_to(self, adc: i32) -> u32 {
        let range = self.range();
        if adc < *range.start() {
            range.start().abs_diff(adc)
        } else {
            adc.abs_diff(*range.end())
        }
    }
}

impl MoistureStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overload => "OL",
            Self::VeryDry => "sDRY",
            Self::Dry => "DRY",
            Self::Optimal => "OK",
            Self::Wet => "WET",
            Self::VeryWet => "sWET",
            Self::Underload => "UL",
            Self::Error => "ERR",
        }
    }
}

impl fmt::Display for MoistureZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MoistureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(adc: i32) -> Classification {
    classify_with_table(&MoistureZone::ALL, adc)
}

/// Status code for a possibly missing sample. A missing sample never
/// consults the zone table.
pub fn classify_reading(adc: Option<i32>) -> MoistureStatus {
    match adc {
        Some(adc) => classify(adc).status,
        None => MoistureStatus::Error,
    }
}

fn classify_with_table(table: &[MoistureZone], adc: i32) -> Classification {
    if let Some(zone) = table.iter().find(|zone| zone.range().contains(&adc)) {
        return zone.classification();
    }

    // Only reachable with a table that does not cover the whole domain.
    let nearest = table
        .iter()
        .copied()
        .min_by_key(|zone| zone.distance_to(adc))
        .unwrap_or(MoistureZone::Underload);
    warn!("adc sample {adc} matched no moisture zone; nearest is {nearest}");

    Classification {
        status: MoistureStatus::Error,
        ..nearest.classification()
    }
}

pub fn zone_table_summary() -> Vec<String> {
    MoistureZone::ALL
        .iter()
        .map(|zone| {
            let range = zone.range();
            format!(
                "{:<10} {:>11}..={:<11} icon #{} {}",
                zone.as_str(),
                range.start(),
                range.end(),
                zone.icon().as_u8(),
                zone.status()
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn zones_partition_the_adc_domain() {
        for adc in 0..=4095 {
            let matching: Vec<_> = MoistureZone::ALL
                .iter()
                .filter(|zone| zone.range().contains(&adc))
                .collect();
            assert_eq!(matching.len(), 1, "adc {adc} matched {matching:?}");
            assert_eq!(classify(adc).zone, *matching[0]);
            assert_ne!(classify(adc).status, MoistureStatus::Error);
        }
    }

    #[test]
    fn zones_are_contiguous_over_i32() {
        let mut ranges: Vec<_> = MoistureZone::ALL.iter().map(|zone| zone.range()).collect();
        ranges.sort_by_key(|range| *range.start());

        assert_eq!(*ranges[0].start(), i32::MIN);
        assert_eq!(*ranges[ranges.len() - 1].end(), i32::MAX);
        for pair in ranges.windows(2) {
            assert_eq!(*pair[0].end() + 1, *pair[1].start());
        }
    }

    #[test]
    fn boundaries_are_exact() {
        assert_eq!(classify(419).zone, MoistureZone::Underload);
        assert_eq!(classify(420).zone, MoistureZone::VeryWet);
        assert_eq!(classify(850).zone, MoistureZone::VeryDry);
        assert_eq!(classify(851).zone, MoistureZone::Overload);
    }

    #[test]
    fn extremes_are_first_class_zones() {
        assert_eq!(classify(i32::MIN).status, MoistureStatus::Underload);
        assert_eq!(classify(-1).status, MoistureStatus::Underload);
        assert_eq!(classify(i32::MAX).status, MoistureStatus::Overload);
    }

    #[test]
    fn missing_reading_reports_error() {
        assert_eq!(classify_reading(None), MoistureStatus::Error);
        assert_eq!(classify_reading(Some(600)), MoistureStatus::Optimal);
    }

    #[test]
    fn optimal_sample_maps_to_flower_icon() {
        let classification = classify(600);

        assert_eq!(classification.zone, MoistureZone::Optimal);
        assert_eq!(classification.icon.as_u8(), 3);
        assert_eq!(classification.status.as_str(), "OK");
    }

    #[test]
    fn overload_shares_warning_icon_with_underload() {
        let over = classify(900);
        let under = classify(100);

        assert_eq!(over.zone, MoistureZone::Overload);
        assert_eq!(over.icon.as_u8(), 6);
        assert_eq!(over.status.as_str(), "OL");
        assert_eq!(under.icon, over.icon);
        assert_eq!(under.status.as_str(), "UL");
    }

    #[test]
    fn gap_in_table_falls_back_to_nearest_zone_with_error_status() {
        let table = [MoistureZone::Dry, MoistureZone::Wet];

        let in_gap = classify_with_table(&table, 600);
        assert_eq!(in_gap.zone, MoistureZone::Wet);
        assert_eq!(in_gap.status, MoistureStatus::Error);

        let near_dry = classify_with_table(&table, 680);
        assert_eq!(near_dry.zone, MoistureZone::Dry);
        assert_eq!(near_dry.status, MoistureStatus::Error);

        let empty = classify_with_table(&[], 600);
        assert_eq!(empty.zone, MoistureZone::Underload);
        assert_eq!(empty.status, MoistureStatus::Error);
    }

    #[test]
    fn status_serializes_as_wire_code() {
        let codes: Vec<String> = [
            MoistureStatus::Overload,
            MoistureStatus::VeryDry,
            MoistureStatus::Dry,
            MoistureStatus::Optimal,
            MoistureStatus::Wet,
            MoistureStatus::VeryWet,
            MoistureStatus::Underload,
            MoistureStatus::Error,
        ]
        .iter()
        .map(|status| serde_json::to_string(status).unwrap())
        .collect();

        assert_eq!(
            codes,
            vec![
                "\"OL\"", "\"sDRY\"", "\"DRY\"", "\"OK\"", "\"WET\"", "\"sWET\"", "\"UL\"",
                "\"ERR\""
            ]
        );
    }

    #[test]
    fn summary_lists_every_zone_in_scan_order() {
        let summary = zone_table_summary();

        assert_eq!(summary.len(), 7);
        assert!(summary[0].starts_with("Overload"));
        assert!(summary[3].contains("587..=683"));
        assert!(summary[6].ends_with("UL"));
    }
}
