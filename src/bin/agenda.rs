//! Prints the agenda for a day, week or month from a running store service.
//!
//! Usage: agenda [day|week|month] [YYYY-MM-DD] [--practitioner ID] [--type ID]
//!               [--policy start_within|start_and_end_within]

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use chrono::{NaiveDate, Utc};
use tracing_subscriber::EnvFilter;

use clinic_calendar::calendar::filter::{self, Facet, WindowPolicy};
use clinic_calendar::calendar::time_grid::{TimeSlot, ViewGranularity};
use clinic_calendar::calendar::CalendarSession;
use clinic_calendar::config::Config;
use clinic_calendar::models::{AppointmentEvent, AppointmentType, Practitioner};
use clinic_calendar::store::HttpStore;

#[derive(Debug, Default)]
struct Args {
    granularity: Option<ViewGranularity>,
    date: Option<NaiveDate>,
    practitioner: Option<String>,
    appointment_type: Option<String>,
    policy: Option<WindowPolicy>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut out = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--practitioner" => {
                out.practitioner = Some(args.next().ok_or_else(|| anyhow!("--practitioner needs a value"))?);
            }
            "--type" => {
                out.appointment_type = Some(args.next().ok_or_else(|| anyhow!("--type needs a value"))?);
            }
            "--policy" => {
                let value = args.next().ok_or_else(|| anyhow!("--policy needs a value"))?;
                out.policy = Some(value.parse().map_err(|e| anyhow!("--policy: {e}"))?);
            }
            other if out.granularity.is_none() && other.parse::<ViewGranularity>().is_ok() => {
                out.granularity = other.parse().ok();
            }
            other if out.date.is_none() => {
                let date = NaiveDate::parse_from_str(other, "%Y-%m-%d")
                    .with_context(|| format!("not a date (YYYY-MM-DD): {other}"))?;
                out.date = Some(date);
            }
            other => bail!("unexpected argument: {other}"),
        }
    }
    Ok(out)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cfg = Config::from_env()?;
    let args = parse_args(std::env::args().skip(1))?;

    let store = HttpStore::new(&cfg.store_url);
    let mut session = CalendarSession::new(Arc::new(store), &cfg.calendar, Utc::now());

    session.set_granularity(args.granularity.unwrap_or(ViewGranularity::Week));
    if let Some(policy) = args.policy {
        session.set_policy(policy);
    }
    if let Some(date) = args.date {
        session.go_to(date);
    }
    if let Some(p) = &args.practitioner {
        session.set_practitioner_filter(p.parse::<Facet<Practitioner>>().map_err(|e| anyhow!("--practitioner: {e}"))?);
    }
    if let Some(t) = &args.appointment_type {
        session.set_type_filter(t.parse::<Facet<AppointmentType>>().map_err(|e| anyhow!("--type: {e}"))?);
    }

    if !session.load().await {
        bail!("could not reach the store at {}", cfg.store_url);
    }

    let offset = cfg.calendar.utc_offset;
    let window = session.window()?;
    println!("{window}");

    let visible = session.visible_events()?;
    for day in session.view().days()? {
        let slots = session.slots(day);
        let mut printed_day = false;
        for slot in &slots {
            let starting = filter::starting_in(&visible, slot);
            if starting.is_empty() {
                continue;
            }
            if !printed_day {
                println!();
                println!("{}", day.format("%A %e %B %Y"));
                printed_day = true;
            }

            let ticks = session.ticks(slot);
            println!(
                "  {} {}",
                slot.start.with_timezone(&offset).format("%I:%M %p"),
                ruler(&ticks, &visible)
            );
            for e in starting {
                let start = e.start.with_timezone(&offset);
                let end = e.end.with_timezone(&offset);
                println!(
                    "    {}–{}  {:<10} {}",
                    start.format("%I:%M %p"),
                    end.format("%I:%M %p"),
                    e.practitioner.display_name(),
                    e.title
                );
            }
        }
    }

    Ok(())
}

/// One mark per sub-step: `#` where an appointment overlaps it, `.` where free.
fn ruler(ticks: &[TimeSlot], events: &[&AppointmentEvent]) -> String {
    let marks: String = ticks
        .iter()
        .map(|tick| {
            if events.iter().any(|e| e.start < tick.end && e.end > tick.start) {
                '#'
            } else {
                '.'
            }
        })
        .collect();
    format!("[{marks}]")
}
