use std::net::SocketAddr;

use crate::command::Command;

/// Counter: total commands executed. Labels: command, status.
pub const COMMANDS_TOTAL: &str = "agora_commands_total";

/// Histogram: command latency in seconds. Labels: command.
pub const COMMAND_DURATION_SECONDS: &str = "agora_command_duration_seconds";

/// Gauge: reservations currently held in the store.
pub const RESERVATIONS_ACTIVE: &str = "agora_reservations_active";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::ListRooms => "list_rooms",
        Command::Book { .. } => "book",
        Command::Cancel { .. } => "cancel",
        Command::FreeSlots { .. } => "free_slots",
        Command::Timeline { .. } => "timeline",
        Command::Reservations { .. } => "reservations",
        Command::MyReservations { .. } => "my_reservations",
    }
}
