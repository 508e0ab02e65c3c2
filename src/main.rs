use std::{path::PathBuf, sync::mpsc, thread};

use clap::{Parser, Subcommand};
use log::{error, info};

use lapmeter::config::AppConfig;
use lapmeter::engine::{self, ControlCommand, MonitorOutput, SessionEvent, SessionSummary, Snapshot};
use lapmeter::errors::MonitorError;
use lapmeter::replay::{ReplayReport, replay_recording};
use lapmeter::transport::client::{ClientOptions, run_client};
use lapmeter::transport::mock::send_mock_pulses;
use lapmeter::transport::relay::{RelayOptions, run_relay};
use lapmeter::writer;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to a relay and monitor pulses live
    Live {
        /// Relay WebSocket URL, overrides the config file
        #[arg(short, long)]
        url: Option<String>,

        /// Record the raw session to a JSON Lines file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Best-combination window size in laps
        #[arg(short, long)]
        window: Option<usize>,
    },
    /// Forward sensor UDP pulses to WebSocket dashboards
    Relay {
        /// UDP bind address for sensor datagrams
        #[arg(long)]
        udp: Option<String>,

        /// TCP bind address for dashboard connections
        #[arg(long)]
        ws: Option<String>,
    },
    /// Re-run the engine over a recorded session file
    Replay {
        #[arg(short, long)]
        input: PathBuf,

        /// Best-combination window size in laps
        #[arg(short, long)]
        window: Option<usize>,
    },
    /// Send deterministic test pulses to a relay
    Mock {
        /// Relay UDP address to send to
        #[arg(short, long)]
        target: Option<String>,

        #[arg(short, long, default_value_t = 20)]
        count: usize,

        #[arg(short, long, default_value_t = 1000)]
        interval: u64,
    },
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("could not start async runtime")
}

fn live(
    app_config: AppConfig,
    url: Option<String>,
    output: Option<PathBuf>,
    window: Option<usize>,
) -> Result<(), MonitorError> {
    let mut monitor_config = app_config.monitor_config();
    if let Some(window_laps) = window {
        if window_laps < 1 {
            return Err(MonitorError::InvalidWindowSize { value: window_laps });
        }
        monitor_config.window_laps = window_laps;
    }

    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>();
    let (output_tx, output_rx) = mpsc::channel::<MonitorOutput>();
    let (command_tx, command_rx) = tokio::sync::mpsc::unbounded_channel::<ControlCommand>();

    // if we record the session we create a new channel and have the collector
    // tee raw frames to the recording writer
    let recorder_tx = if let Some(output_file) = output {
        let (recorder_tx, recorder_rx) = mpsc::channel();
        thread::spawn(move || {
            if let Err(e) = writer::write_recording(&output_file, recorder_rx) {
                error!("session recording failed: {}", e);
            }
        });
        Some(recorder_tx)
    } else {
        None
    };

    // the collector thread owns the engine
    let collector = thread::spawn(move || {
        engine::run_session(event_rx, output_tx, recorder_tx, monitor_config)
    });

    // the transport runs on its own tokio runtime and only sends into the
    // session channel
    let client_options = ClientOptions {
        url: url.unwrap_or(app_config.relay_url),
        ..Default::default()
    };
    let transport_events = event_tx.clone();
    thread::spawn(move || {
        if let Err(e) = runtime().block_on(run_client(client_options, transport_events, command_rx))
        {
            error!("transport stopped: {}", e);
        }
    });

    // kick the session off locally and tell the relay counterpart
    if event_tx
        .send(SessionEvent::Command(ControlCommand::Start))
        .is_err()
    {
        error!("session loop unavailable at startup");
    }
    let _ = command_tx.send(ControlCommand::Start);
    // the collector ends once the transport drops its sender
    drop(event_tx);

    for monitor_output in &output_rx {
        present_output(&monitor_output);
    }

    match collector.join() {
        Ok(Ok(Some(summary))) => print_summary(&summary),
        Ok(Ok(None)) => info!("session ended before any lap was recorded"),
        Ok(Err(e)) => error!("session loop failed: {}", e),
        Err(_) => error!("session loop panicked"),
    }
    Ok(())
}

fn present_output(output: &MonitorOutput) {
    match output {
        MonitorOutput::Baseline { timestamp_ms } => {
            info!("baseline established at {} ms, recording laps", timestamp_ms);
        }
        MonitorOutput::Lap(snapshot) => print_lap_line(snapshot),
        MonitorOutput::SessionReset => info!("session reset"),
    }
}

fn print_lap_line(snapshot: &Snapshot) {
    let speed = snapshot
        .latest_velocity
        .as_ref()
        .map(|sample| format!("{:8.2} m/s", sample.v2_mps))
        .unwrap_or_else(|| "      --".to_string());
    let best = match snapshot.window.best_duration_ms {
        Some(best) => format!(
            "best {} laps {:.3} ms",
            snapshot.window.size, best
        ),
        None => format!("waiting for {} laps", snapshot.window.size),
    };
    let duration = snapshot
        .latest_lap
        .as_ref()
        .map(|lap| lap.duration_ms)
        .unwrap_or(0.0);
    println!(
        "lap {:>4}  {:>12.3} ms  {}  {}",
        snapshot.lap_count, duration, speed, best
    );
}

fn print_summary(summary: &SessionSummary) {
    println!("--- session summary ---");
    println!("laps:          {}", summary.total_laps);
    println!("total:         {:.3} ms", summary.total_duration_ms);
    println!("average lap:   {:.3} ms", summary.avg_lap_ms);
    println!("fastest lap:   {:.3} ms", summary.fastest_lap_ms);
    println!("slowest lap:   {:.3} ms", summary.slowest_lap_ms);
    println!("chart samples: {}", summary.velocity_points);
}

fn relay(app_config: AppConfig, udp: Option<String>, ws: Option<String>) -> Result<(), MonitorError> {
    let options = RelayOptions {
        udp_addr: udp.unwrap_or(app_config.udp_bind_addr),
        ws_addr: ws.unwrap_or(app_config.ws_bind_addr),
    };
    runtime().block_on(run_relay(options))
}

fn replay(
    app_config: AppConfig,
    input: &PathBuf,
    window: Option<usize>,
) -> Result<(), MonitorError> {
    let mut monitor_config = app_config.monitor_config();
    if let Some(window_laps) = window {
        if window_laps < 1 {
            return Err(MonitorError::InvalidWindowSize { value: window_laps });
        }
        monitor_config.window_laps = window_laps;
    }
    let report = replay_recording(input, monitor_config)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &ReplayReport) {
    match &report.summary {
        Some(summary) => print_summary(summary),
        None => println!("no laps in this recording"),
    }
    let window = &report.snapshot.window;
    if window.has_enough_data {
        for combo in &window.combinations {
            println!(
                "laps {:>4}-{:<4} {:>12.3} ms{}",
                combo.start_lap,
                combo.end_lap,
                combo.total_duration_ms,
                if combo.is_best { "  <- best" } else { "" }
            );
        }
    } else {
        println!("not enough laps for a {}-lap window", window.size);
    }
    if report.dropped_pulses > 0 {
        println!("{} invalid pulses dropped", report.dropped_pulses);
    }
}

fn main() {
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    let app_config = AppConfig::from_local_file().unwrap_or_default();
    match cli.command {
        Commands::Live {
            url,
            output,
            window,
        } => live(app_config, url, output, window).expect("Error while monitoring live pulses"),
        Commands::Relay { udp, ws } => {
            relay(app_config, udp, ws).expect("Error while running the relay")
        }
        Commands::Replay { input, window } => {
            replay(app_config, &input, window).expect("Error while replaying recording")
        }
        Commands::Mock {
            target,
            count,
            interval,
        } => {
            let target = target.unwrap_or_else(|| "127.0.0.1:8888".to_string());
            runtime()
                .block_on(send_mock_pulses(&target, count, interval))
                .expect("Error while sending mock pulses")
        }
    };
}
