// monitoring/traffic_monitoring_system.rs
// Admin console and CSV tick trace.

use crate::control_system::commands::{Command, ViolationType};
use crate::control_system::update_loop::{lock_store, SharedStore, TickObserver};
use crate::error::{Result, TrafficError};
use crate::flow_analyzer::traffic_analyzer::{CongestionLevel, ParkingLevel, TrendDirection};
use crate::monitoring::notifications::Notification;
use crate::shared_data::TickReport;
use crate::simulation_engine::intersections::IntersectionId;
use crate::simulation_engine::state::{IntersectionState, WorkingSet};
use crate::simulation_engine::viewport::Bounds;
use crate::store::TrafficStore;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Operator console request.
#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    Noop,
    Show,
    Notifications,
    Profile(IntersectionId),
    Trends,
    Status,
    Route(bool),
    Dispatch(Command),
    Help,
    Quit,
}

const HELP: &str = "\
Commands:
  show                          working set
  status                        system summary
  notifications                 recent events, newest first
  profile <id>                  hourly demand profile
  trends                        hour-over-hour demand trends
  timer <id> <seconds>          set countdown (clamped to 5..60)
  timer <id> +N | -N            adjust countdown by N seconds
  emergency <id> on|off         report or clear an emergency vehicle
  route on|off                  show the emergency route line
  park <id> <delta>             change free parking spots
  violation <id> <type>         red-light, speeding, wrong-way, no-parking
  viewport <n> <s> <e> <w>      move the viewport
  help | quit";

fn parse_error(input: &str, reason: impl Into<String>) -> TrafficError {
    TrafficError::Parse {
        input: input.to_string(),
        reason: reason.into(),
    }
}

fn parse_id(input: &str, token: &str) -> Result<IntersectionId> {
    token
        .parse::<u32>()
        .map(IntersectionId)
        .map_err(|_| parse_error(input, format!("`{}` is not an intersection id", token)))
}

fn parse_number<T: std::str::FromStr>(input: &str, token: &str) -> Result<T> {
    token
        .trim_start_matches('+')
        .parse::<T>()
        .map_err(|_| parse_error(input, format!("`{}` is not a number", token)))
}

fn parse_switch(input: &str, token: &str) -> Result<bool> {
    match token.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(parse_error(input, "expected on or off")),
    }
}

pub fn parse_cli_command(input: &str) -> Result<CliAction> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let action = match tokens.as_slice() {
        [] => CliAction::Noop,
        ["show"] => CliAction::Show,
        ["status"] => CliAction::Status,
        ["notifications"] => CliAction::Notifications,
        ["trends"] => CliAction::Trends,
        ["help"] => CliAction::Help,
        ["quit"] | ["exit"] => CliAction::Quit,
        ["profile", id] => CliAction::Profile(parse_id(input, id)?),
        ["route", switch] => CliAction::Route(parse_switch(input, switch)?),
        ["timer", id, seconds] => {
            let id = parse_id(input, id)?;
            let value: i64 = parse_number(input, seconds)?;
            if seconds.starts_with('+') || seconds.starts_with('-') {
                CliAction::Dispatch(Command::adjust_manual_timer(id, value))
            } else {
                CliAction::Dispatch(Command::set_manual_timer(id, value))
            }
        }
        ["emergency", id, switch] => CliAction::Dispatch(Command::report_emergency_vehicle(
            parse_id(input, id)?,
            parse_switch(input, switch)?,
        )),
        ["park", id, delta] => {
            CliAction::Dispatch(Command::adjust_parking(parse_id(input, id)?, parse_number(input, delta)?))
        }
        ["violation", id, kind @ ..] if !kind.is_empty() => {
            let violation: ViolationType = kind.join(" ").parse()?;
            CliAction::Dispatch(Command::record_violation(parse_id(input, id)?, violation))
        }
        ["viewport", north, south, east, west] => {
            let bounds = Bounds::new(
                parse_number(input, north)?,
                parse_number(input, south)?,
                parse_number(input, east)?,
                parse_number(input, west)?,
            );
            CliAction::Dispatch(Command::update_viewport(Some(bounds)))
        }
        _ => return Err(parse_error(input, "unknown command, type `help`")),
    };
    Ok(action)
}

fn congestion_label(level: CongestionLevel) -> &'static str {
    match level {
        CongestionLevel::Light => "light",
        CongestionLevel::Moderate => "moderate",
        CongestionLevel::Heavy => "heavy",
    }
}

fn parking_label(member: &IntersectionState) -> &'static str {
    match ParkingLevel::from_availability(member.parking_available, member.parking_spots) {
        ParkingLevel::Ample => "ample",
        ParkingLevel::Limited => "limited",
        ParkingLevel::Critical => "critical",
    }
}

pub fn render_working_set(set: &WorkingSet) -> String {
    if set.is_empty() {
        return "No intersections in the current viewport.".to_string();
    }
    let mut out = format!(
        "{:>3}  {:<24} {:<6} {:>5} {:>5}  {:<9} {:<14} {:>4}  {:<9} {:>7}\n",
        "ID", "NAME", "PHASE", "TIMER", "QUEUE", "CONGEST", "PARKING", "VIOL", "EMERGENCY", "NEXT-HR"
    );
    for m in set.iter() {
        let _ = writeln!(
            out,
            "{:>3}  {:<24} {:<6} {:>5} {:>5}  {:<9} {:<14} {:>4}  {:<9} {:>7}",
            m.id,
            m.name,
            m.light_state,
            if m.is_green() { format!("{}s", m.countdown) } else { "-".to_string() },
            m.queue_count,
            congestion_label(CongestionLevel::from_queue(m.queue_count)),
            format!("{}/{} {}", m.parking_available, m.parking_spots, parking_label(m)),
            m.violation_count,
            if m.has_emergency_vehicle { "YES" } else { "no" },
            m.predicted_next_hour_count,
        );
    }
    out
}

pub fn render_notifications(notifications: &[Notification]) -> String {
    if notifications.is_empty() {
        return "No notifications.".to_string();
    }
    notifications
        .iter()
        .map(|n| format!("[{}] #{} {}", n.timestamp.format("%H:%M:%S"), n.id, n.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs one console action against the shared store and renders the reply.
pub fn execute(action: &CliAction, store: &SharedStore) -> String {
    let mut store = lock_store(store);
    match action {
        CliAction::Noop | CliAction::Quit => String::new(),
        CliAction::Help => HELP.to_string(),
        CliAction::Show => render_working_set(store.working_set()),
        CliAction::Notifications => render_notifications(&store.notifications()),
        CliAction::Profile(id) => match store.hourly_profile(*id) {
            Some(profile) => profile
                .iter()
                .enumerate()
                .map(|(hour, count)| format!("{:02}:00 {:>3}", hour, count))
                .collect::<Vec<_>>()
                .join("\n"),
            None => format!("Intersection {} is not in the catalog.", id),
        },
        CliAction::Trends => store
            .trends()
            .iter()
            .map(|t| {
                let arrow = match t.direction {
                    TrendDirection::Increasing => "up",
                    TrendDirection::Decreasing => "down",
                    TrendDirection::Stable => "flat",
                };
                format!("{:<24} {:>4} {:+.1}% {}", t.name, t.current_count, t.percentage_change, arrow)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        CliAction::Status => render_status(&store),
        CliAction::Route(active) => {
            store.set_emergency_route_active(*active);
            match store.emergency_route() {
                Some(route) => format!(
                    "Emergency route {} -> {}: ({:.4}, {:.4}) to ({:.4}, {:.4})",
                    route.from,
                    route.to,
                    route.path[0].lat,
                    route.path[0].lng,
                    route.path[1].lat,
                    route.path[1].lng
                ),
                None if *active => "Route display on; no emergency vehicle reported.".to_string(),
                None => "Route display off.".to_string(),
            }
        }
        CliAction::Dispatch(command) => match store.dispatch(*command) {
            Some(notification) => notification.message,
            None => "OK".to_string(),
        },
    }
}

fn render_status(store: &TrafficStore) -> String {
    let status = store.status();
    let mode = if status.emergencies.is_empty() { "Auto" } else { "Emergency" };
    let mut out = format!("Mode: {}\nTick: {}\nMembers: {}\n", mode, store.tick_count(), status.members);
    match (status.green, status.green_countdown) {
        (Some(id), Some(countdown)) => {
            let _ = writeln!(out, "Green: {} ({}s left)", id, countdown);
        }
        _ => out.push_str("Green: none\n"),
    }
    let _ = writeln!(out, "Queued vehicles: {}", status.total_queued);
    let _ = writeln!(out, "Violations: {}", status.total_violations);
    if let Some((id, level)) = status.most_congested {
        let _ = writeln!(out, "Most congested: {} ({})", id, congestion_label(level));
    }
    out
}

/// Line-oriented admin console. Returns when the input ends or on `quit`.
pub async fn run_cli<R, W>(store: SharedStore, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output
        .write_all(b"Traffic Signal Network console. Type `help` for commands.\n> ")
        .await?;
    output.flush().await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let reply = match parse_cli_command(&line) {
            Ok(CliAction::Quit) => {
                output.write_all(b"Exiting console.\n").await?;
                break;
            }
            Ok(action) => execute(&action, &store),
            Err(e) => {
                log::warn!("{}", e);
                e.to_string()
            }
        };
        if !reply.is_empty() {
            output.write_all(reply.trim_end().as_bytes()).await?;
            output.write_all(b"\n").await?;
        }
        output.write_all(b"> ").await?;
        output.flush().await?;
    }
    output.flush().await?;
    Ok(())
}

/// One CSV row of the tick trace.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRecord {
    pub tick: u64,
    pub timestamp: String,
    pub id: u32,
    pub name: String,
    pub phase: String,
    pub countdown: u32,
    pub queue_count: u32,
    pub parking_available: u32,
    pub parking_spots: u32,
    pub violation_count: u32,
    pub has_emergency_vehicle: bool,
    pub predicted_next_hour_count: u32,
}

impl TraceRecord {
    pub fn new(report: &TickReport, member: &IntersectionState) -> Self {
        Self {
            tick: report.tick,
            timestamp: report.timestamp.to_rfc3339(),
            id: member.id.0,
            name: member.name.clone(),
            phase: member.light_state.to_string(),
            countdown: member.countdown,
            queue_count: member.queue_count,
            parking_available: member.parking_available,
            parking_spots: member.parking_spots,
            violation_count: member.violation_count,
            has_emergency_vehicle: member.has_emergency_vehicle,
            predicted_next_hour_count: member.predicted_next_hour_count,
        }
    }
}

/// Appends the working set to a CSV file after every tick. Headers are written
/// only when the file is new.
pub struct TraceWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl TraceWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file_exists = path.exists();
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|source| TrafficError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let writer = csv::WriterBuilder::new()
            .has_headers(!file_exists)
            .from_writer(file);
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn write_tick(&mut self, report: &TickReport, set: &WorkingSet) -> Result<()> {
        for member in set.iter() {
            self.writer.serialize(TraceRecord::new(report, member))?;
        }
        self.writer.flush().map_err(|source| TrafficError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl TickObserver for TraceWriter {
    fn on_tick(&mut self, store: &TrafficStore, report: &TickReport) {
        if let Err(e) = self.write_tick(report, store.working_set()) {
            log::error!("Error writing tick trace: {}", e);
        }
    }
}
