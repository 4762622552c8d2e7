use std::fmt::Write;

use anyhow::Result;
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};
use ride_common::GeoPolyline;
use ride_matching_engine::status_types::{
    ActiveRideStatus,
    PendingRideState,
    PendingRideStatus,
    RideRelatedRequestStatus,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

pub fn format_request(request: &RideRelatedRequestStatus) -> Result<String> {
    let state = if request.is_canceled {
        "Canceled"
    } else if request.is_expired {
        "Expired"
    } else if request.pending_ride_id.is_some() {
        "Matched"
    } else {
        "Waiting for a match"
    };
    let mut f = String::new();
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Request {} (v{})  {}", request.id, request.version, request.details.role)?;
    writeln!(f, "User: {}", request.user_id)?;
    writeln!(f, "From {} to {}", request.details.origin, request.details.destination)?;
    writeln!(f, "[{state:^21}]  Posted {}", request.post_time)?;
    writeln!(f, "Expires after {} minutes", request.time_till_expire.num_minutes())?;
    if let Some(id) = &request.pending_ride_id {
        writeln!(f, "Pending ride: {id}")?;
    }
    writeln!(f, "===============================================================================")?;
    Ok(f)
}

pub fn format_pending_ride(ride: &PendingRideStatus) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Pending ride {} (v{})  [{}]", ride.id, ride.version, ride.state)?;
    writeln!(f, "Posted {}. Expires after {} minutes", ride.post_time, ride.time_till_expire.num_minutes())?;
    writeln!(f, "From {} to {}", ride.ride_info.origin, ride.ride_info.destination)?;
    if let Some(id) = &ride.active_ride_id {
        writeln!(f, "Active ride: {id}")?;
    }
    let mut table = Table::new();
    table.set_titles(row!["Role", "User", "Request", "Confirmed"]);
    let driver = &ride.ride_info.driver;
    let driver_confirmed = ride.state != PendingRideState::WaitingOnDriver;
    table.add_row(row!["Driver", driver.user_id, driver.request_id, yes_no(driver_confirmed)]);
    for rider in &ride.ride_info.riders {
        let confirmed = ride.confirmed_riders.contains(&rider.user_id);
        table.add_row(row!["Rider", rider.user_id, rider.request_id, yes_no(confirmed)]);
    }
    markdown_style(&mut table);
    writeln!(f, "{table}")?;
    if !ride.ride_info.waypoints.is_empty() {
        let stops = ride.ride_info.waypoints.iter().map(|w| w.to_string()).collect::<Vec<_>>().join(" -> ");
        writeln!(f, "Stops: {stops}")?;
    }
    Ok(f)
}

pub fn format_active_ride(ride: &ActiveRideStatus) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Active ride {} (v{})  [{}]", ride.id, ride.version, ride.ride_state)?;
    writeln!(f, "Driver: {}. Pending ride: {}", ride.driver_id, ride.pending_ride_id)?;
    let mut table = Table::new();
    table.set_titles(row!["Rider", "State", "Game elements"]);
    for (rider, state) in &ride.riders_state {
        let elements = ride.riders_game_elements.get(rider).map(|v| v.to_string()).unwrap_or_default();
        table.add_row(row![rider, state, elements]);
    }
    markdown_style(&mut table);
    writeln!(f, "{table}")?;
    Ok(f)
}

pub fn format_route(legs: &[GeoPolyline]) -> String {
    let mut table = Table::new();
    table.set_titles(row!["Leg", "From", "To", "Points"]);
    for (i, leg) in legs.iter().enumerate() {
        let from = leg.first().map(|p| p.to_string()).unwrap_or_default();
        let to = leg.last().map(|p| p.to_string()).unwrap_or_default();
        table.add_row(row![i + 1, from, to, leg.len()]);
    }
    markdown_style(&mut table);
    format!("{table}")
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
