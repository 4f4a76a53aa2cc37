//! `console` command implementation.
//!
//! Line-oriented stand-in for a control panel: each line on stdin is one
//! button press.

use std::str::FromStr;

use anyhow::Result;
use publisher::BrokerClient;
use simulator::SimulatorClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::bridge::{self, Controller, Driver};
use crate::cli::RunArgs;

/// Execute the `console` command
pub async fn run_console(args: &RunArgs) -> Result<()> {
    let blueprint = bridge::load_blueprint(args)?;
    bridge::init_metrics(args.metrics_port)?;
    bridge::with_controller(args, &blueprint, bridge::print_status(), Console).await
}

/// Console input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Stop,
    /// Start when stopped, stop when running
    ToggleSimulation,
    ToggleAutopilot,
    Reset,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "sim" => Ok(Self::ToggleSimulation),
            "ai" => Ok(Self::ToggleAutopilot),
            "reset" => Ok(Self::Reset),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command '{other}'")),
        }
    }
}

const HELP: &str = "commands: start | stop | sim | ai | reset | status | help | quit";

struct Console;

impl Driver for Console {
    async fn drive<S, B>(self, controller: Controller<S, B>) -> Result<()>
    where
        S: SimulatorClient + 'static,
        B: BrokerClient + Send + Sync + 'static,
    {
        println!("{}", controller::ControllerStatus::Idle);
        println!("{HELP}");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = bridge::shutdown_signal() => None,
            };
            let Some(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(command) => handle(&controller, command).await,
                Err(e) => println!("{e}; {HELP}"),
            }
        }

        info!("Console closing");
        controller.shutdown().await;
        Ok(())
    }
}

async fn handle<S, B>(controller: &Controller<S, B>, command: Command)
where
    S: SimulatorClient + 'static,
    B: BrokerClient + Send + Sync + 'static,
{
    match command {
        Command::Start => spawn_start(controller),
        Command::Stop => controller.stop().await,
        Command::ToggleSimulation => {
            if controller.session().simulation_running() {
                controller.stop().await;
            } else {
                spawn_start(controller);
            }
        }
        Command::ToggleAutopilot => {
            if let Err(e) = controller.toggle_autopilot().await {
                println!("{e}");
            }
        }
        Command::Reset => {
            if let Err(e) = controller.reset().await {
                println!("{e}");
            }
        }
        Command::Status => {
            let report = controller.status().await;
            println!(
                "simulation: {}, autopilot: {}, publishing: {}, trip: {:.3} km",
                on_off(report.session.simulation_running),
                on_off(report.session.autopilot_running),
                on_off(report.publishing),
                report.session.trip_distance_km
            );
            println!("{}", report.metrics);
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

/// Loading can take minutes; keep reading commands meanwhile
fn spawn_start<S, B>(controller: &Controller<S, B>)
where
    S: SimulatorClient + 'static,
    B: BrokerClient + Send + Sync + 'static,
{
    let controller = controller.clone();
    tokio::spawn(async move {
        if let Err(e) = controller.start().await {
            error!(error = %e, "Failed to start simulation");
        }
    });
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
