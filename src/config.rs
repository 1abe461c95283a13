use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use chrono::{FixedOffset, Offset, Utc};

use crate::calendar::filter::WindowPolicy;
use crate::calendar::time_grid::{SlotSpec, WeekStart};

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub store_url: String,
    pub calendar: CalendarConfig,
}

/// Display settings shared by every calendar view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarConfig {
    pub week_start: WeekStart,
    pub slots: SlotSpec,
    pub utc_offset: FixedOffset,
    pub filter_policy: WindowPolicy,
    pub click_delay_ms: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            week_start: WeekStart::Monday,
            slots: SlotSpec::default(),
            utc_offset: Utc.fix(),
            filter_policy: WindowPolicy::StartWithin,
            click_delay_ms: 250,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8787".to_string());
        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));
        let store_url = lookup("STORE_URL").unwrap_or_else(|| "http://127.0.0.1:8787".to_string());

        let defaults = CalendarConfig::default();

        let week_start = match lookup("CALENDAR_WEEK_START") {
            Some(v) => v.parse::<WeekStart>().map_err(|e| anyhow!("CALENDAR_WEEK_START: {e}"))?,
            None => defaults.week_start,
        };
        let filter_policy = match lookup("CALENDAR_FILTER_POLICY") {
            Some(v) => v
                .parse::<WindowPolicy>()
                .map_err(|e| anyhow!("CALENDAR_FILTER_POLICY: {e}"))?,
            None => defaults.filter_policy,
        };

        let step_minutes = parse_or(&lookup, "CALENDAR_SLOT_MINUTES", defaults.slots.step_minutes())?;
        let sub_step_minutes =
            parse_or(&lookup, "CALENDAR_SUB_STEP_MINUTES", defaults.slots.sub_step_minutes())?;
        let slots = SlotSpec::new(step_minutes, sub_step_minutes)
            .context("CALENDAR_SLOT_MINUTES / CALENDAR_SUB_STEP_MINUTES")?;

        let offset_minutes: i32 = parse_or(&lookup, "CALENDAR_UTC_OFFSET_MINUTES", 0)?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| anyhow!("CALENDAR_UTC_OFFSET_MINUTES out of range: {offset_minutes}"))?;

        let click_delay_ms = parse_or(&lookup, "CALENDAR_CLICK_DELAY_MS", defaults.click_delay_ms)?;

        Ok(Self {
            bind_addr,
            data_dir,
            store_url,
            calendar: CalendarConfig {
                week_start,
                slots,
                utc_offset,
                filter_policy,
                click_delay_ms,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{key}: invalid value {raw:?}: {e}")),
        None => Ok(default),
    }
}
