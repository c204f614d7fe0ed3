//! Wall clock and per-location times.

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;
use dashpanel_core::Location;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationTime {
    pub id_prefix: String,
    /// e.g. `Wed, Oct 15, 3:04 PM`
    pub formatted: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockSnapshot {
    /// Twelve-hour `HH:MM`, zero padded
    pub time: String,
    /// `AM` or `PM`
    pub meridiem: String,
    /// e.g. `Wed, Oct 15`
    pub date: String,
    pub locations: Vec<LocationTime>,
}

pub struct Clock {
    zones: Vec<(String, Tz)>,
}

impl Clock {
    /// Locations with an unknown time zone are left out of snapshots.
    pub fn new(locations: &[Location]) -> Self {
        let zones = locations
            .iter()
            .filter_map(|location| match location.time_zone.parse::<Tz>() {
                Ok(tz) => Some((location.id_prefix.clone(), tz)),
                Err(e) => {
                    tracing::warn!(
                        "Unknown time zone '{}' for {}: {}",
                        location.time_zone,
                        location.id_prefix,
                        e
                    );
                    None
                }
            })
            .collect();

        Self { zones }
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        self.snapshot_at(Utc::now(), &Local)
    }

    /// Snapshot for instant `now`, with `local` as the viewer's zone.
    pub fn snapshot_at<Z>(&self, now: DateTime<Utc>, local: &Z) -> ClockSnapshot
    where
        Z: TimeZone,
        Z::Offset: Display,
    {
        let here = now.with_timezone(local);

        let locations = self
            .zones
            .iter()
            .map(|(id_prefix, tz)| LocationTime {
                id_prefix: id_prefix.clone(),
                formatted: now
                    .with_timezone(tz)
                    .format("%a, %b %-d, %-I:%M %p")
                    .to_string(),
            })
            .collect();

        ClockSnapshot {
            time: here.format("%I:%M").to_string(),
            meridiem: here.format("%p").to_string(),
            date: here.format("%a, %b %-d").to_string(),
            locations,
        }
    }
}
