/*
Copyright 2021 Jakub Lewandowski

This file is part of METplus Data Staging (metstage).

METplus Data Staging (metstage) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

METplus Data Staging (metstage) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with METplus Data Staging (metstage). If not, see https://www.gnu.org/licenses/.
*/

//! Expansion of a date range, an hour window and forecast leads
//! into verification cases.
//!
//! Every case is a [`TimeSlot`] that fixes the valid time, the init
//! time and the forecast lead, so that `valid == init + lead` always.
//! Slots are produced anchor-by-anchor and lead-by-lead, in the order
//! in which the downstream file lists are written.

use super::configuration::HourWindow;
use crate::constants::SKIPPED_INIT_HOURS;
use crate::errors::ConfigError;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use rustc_hash::FxHashSet;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;

/// Whether window anchors are valid times or init times.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
pub enum TimeAxis {
    #[serde(rename = "VALID")]
    Valid,
    #[serde(rename = "INIT")]
    Init,
}

/// Forecast lead in whole hours together with its textual label.
///
/// The label is kept as configured (eg. `06` or `120`) because
/// it is used verbatim in the staged file names.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Lead {
    pub hours: u32,
    pub label: String,
}

impl Lead {
    pub fn new(hours: u32) -> Self {
        Lead {
            hours,
            label: format!("{:02}", hours),
        }
    }

    pub fn zero() -> Self {
        Lead::new(0)
    }

    pub fn duration(&self) -> Duration {
        Duration::hours(i64::from(self.hours))
    }

    /// Label left-padded with zeros to the given width.
    pub fn padded(&self, width: usize) -> String {
        zero_fill(&self.label, width)
    }
}

/// Lead offset as listed in configuration, `anl` stands for
/// the analysis which is a lead of zero hours.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum LeadOffset {
    Analysis,
    Forecast(Lead),
}

impl LeadOffset {
    pub fn lead(&self) -> Lead {
        match self {
            LeadOffset::Analysis => Lead::zero(),
            LeadOffset::Forecast(lead) => lead.clone(),
        }
    }

    pub fn is_analysis(&self) -> bool {
        matches!(self, LeadOffset::Analysis)
    }

    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();

        if text == "anl" {
            return Some(LeadOffset::Analysis);
        }

        let hours = text.parse::<u32>().ok()?;
        Some(LeadOffset::Forecast(Lead {
            hours,
            label: text.to_string(),
        }))
    }
}

impl<'de> Deserialize<'de> for LeadOffset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LeadVisitor;

        impl<'de> Visitor<'de> for LeadVisitor {
            type Value = LeadOffset;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a forecast hour or anl")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<LeadOffset, E> {
                let hours = u32::try_from(value)
                    .map_err(|_| E::custom(format!("forecast hour {} is too large", value)))?;
                Ok(LeadOffset::Forecast(Lead::new(hours)))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<LeadOffset, E> {
                let hours = u32::try_from(value)
                    .map_err(|_| E::custom(format!("{} is not a valid forecast hour", value)))?;
                Ok(LeadOffset::Forecast(Lead::new(hours)))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<LeadOffset, E> {
                LeadOffset::parse(value)
                    .ok_or_else(|| E::custom(format!("{} is not a valid forecast hour", value)))
            }
        }

        deserializer.deserialize_any(LeadVisitor)
    }
}

/// One verification case.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TimeSlot {
    pub valid: NaiveDateTime,
    pub init: NaiveDateTime,
    pub lead: Lead,
}

impl TimeSlot {
    pub fn from_init(init: NaiveDateTime, lead: Lead) -> Self {
        TimeSlot {
            valid: init + lead.duration(),
            init,
            lead,
        }
    }

    pub fn from_valid(valid: NaiveDateTime, lead: Lead) -> Self {
        TimeSlot {
            valid,
            init: valid - lead.duration(),
            lead,
        }
    }

    /// Slot describing an analysis, valid at its own init time.
    pub fn analysis(valid: NaiveDateTime) -> Self {
        TimeSlot::from_valid(valid, Lead::zero())
    }

    /// Off-synoptic cycles are not verified.
    pub fn is_skipped_cycle(&self) -> bool {
        SKIPPED_INIT_HOURS.contains(&self.init.hour())
    }
}

/// Range of anchors walked with a fixed stride.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub increment: Duration,
}

impl TimeWindow {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        hours: &HourWindow,
    ) -> Result<Self, ConfigError> {
        let start = start_date
            .and_hms_opt(hours.beg, 0, 0)
            .ok_or(ConfigError::OutOfBounds("Window start hour is not valid"))?;
        let end = end_date
            .and_hms_opt(hours.end, 0, 0)
            .ok_or(ConfigError::OutOfBounds("Window end hour is not valid"))?;

        Ok(TimeWindow {
            start,
            end,
            increment: Duration::seconds(i64::from(hours.inc)),
        })
    }

    /// All anchors from start to end (both inclusive).
    pub fn anchors(&self) -> Vec<NaiveDateTime> {
        let mut anchors = vec![];

        if self.increment <= Duration::zero() {
            return anchors;
        }

        let mut anchor = self.start;
        while anchor <= self.end {
            anchors.push(anchor);
            anchor = anchor + self.increment;
        }

        anchors
    }
}

/// Expands the window and leads into slots. Duplicates are kept.
pub fn generate(window: &TimeWindow, leads: &[LeadOffset], axis: TimeAxis) -> Vec<TimeSlot> {
    let mut slots = Vec::with_capacity(leads.len() * 4);

    for anchor in window.anchors() {
        for offset in leads {
            let lead = offset.lead();
            let slot = match axis {
                TimeAxis::Valid => TimeSlot::from_valid(anchor, lead),
                TimeAxis::Init => TimeSlot::from_init(anchor, lead),
            };
            slots.push(slot);
        }
    }

    slots
}

/// Valid times of slots without repetitions, in order of first appearance.
pub fn unique_valid_times(slots: &[TimeSlot]) -> Vec<NaiveDateTime> {
    let mut seen = FxHashSet::default();

    slots
        .iter()
        .filter(|slot| seen.insert(slot.valid))
        .map(|slot| slot.valid)
        .collect()
}

/// Compact stamp used in staged file names.
pub fn ymdh(time: &NaiveDateTime) -> String {
    time.format("%Y%m%d%H").to_string()
}

pub fn ymd(time: &NaiveDateTime) -> String {
    time.format("%Y%m%d").to_string()
}

pub fn zero_fill(text: &str, width: usize) -> String {
    format!("{:0>width$}", text, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn leads(hours: &[u32]) -> Vec<LeadOffset> {
        hours
            .iter()
            .map(|&h| LeadOffset::Forecast(Lead::new(h)))
            .collect()
    }

    #[test]
    fn anchor_count() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 1, 3).unwrap();

        let window = TimeWindow::new(start, end, &HourWindow { beg: 0, end: 18, inc: 21600 }).unwrap();
        assert_eq!(window.anchors().len(), 12);

        let window = TimeWindow::new(start, end, &HourWindow { beg: 0, end: 12, inc: 43200 }).unwrap();
        assert_eq!(window.anchors().len(), 6);

        let window = TimeWindow::new(start, start, &HourWindow { beg: 0, end: 0, inc: 86400 }).unwrap();
        assert_eq!(window.anchors(), vec![at(2021, 1, 1, 0)]);
    }

    #[test]
    fn zero_increment_has_no_anchors() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let hours = HourWindow { beg: 0, end: 18, inc: 0 };

        assert!(hours.check_bounds().is_err());
        let window = TimeWindow::new(start, start, &hours).unwrap();
        assert!(window.anchors().is_empty());
    }

    #[test]
    fn slots_keep_lead_difference() {
        let start = NaiveDate::from_ymd_opt(2021, 2, 27).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 3, 2).unwrap();
        let window = TimeWindow::new(start, end, &HourWindow { beg: 6, end: 18, inc: 21600 }).unwrap();

        for axis in [TimeAxis::Valid, TimeAxis::Init] {
            let slots = generate(&window, &leads(&[0, 24, 120]), axis);

            assert_eq!(slots.len(), window.anchors().len() * 3);
            for slot in &slots {
                assert_eq!(slot.valid - slot.init, slot.lead.duration());
            }
        }
    }

    #[test]
    fn anchor_then_lead_order() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let window = TimeWindow::new(start, start, &HourWindow { beg: 0, end: 6, inc: 21600 }).unwrap();
        let slots = generate(&window, &leads(&[0, 6]), TimeAxis::Valid);

        let inits: Vec<_> = slots.iter().map(|s| ymdh(&s.init)).collect();
        assert_eq!(inits, ["2021010100", "2020123118", "2021010106", "2021010100"]);

        let valids = unique_valid_times(&slots);
        assert_eq!(valids, vec![at(2021, 1, 1, 0), at(2021, 1, 1, 6)]);
    }

    #[test]
    fn analysis_is_lead_zero() {
        let offset: Vec<LeadOffset> = serde_yaml::from_str("[anl, 6, \"120\"]").unwrap();

        assert!(offset[0].is_analysis());
        assert_eq!(offset[0].lead(), Lead::zero());
        assert_eq!(offset[1].lead().label, "06");
        assert_eq!(offset[2].lead().hours, 120);
        assert_eq!(offset[2].lead().label, "120");
    }

    #[test]
    fn skipped_cycles() {
        assert!(TimeSlot::from_init(at(2021, 1, 1, 3), Lead::new(6)).is_skipped_cycle());
        assert!(TimeSlot::from_valid(at(2021, 1, 1, 3), Lead::new(6)).is_skipped_cycle());
        assert!(!TimeSlot::from_valid(at(2021, 1, 1, 6), Lead::new(6)).is_skipped_cycle());
        assert!(!TimeSlot::from_init(at(2021, 1, 1, 12), Lead::zero()).is_skipped_cycle());
    }
}
