//! CLI argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use stpsim_core::{NetworkConfig, QueueDiscipline};

use crate::demo::Scenario;

#[derive(Parser, Debug)]
#[command(name = "stpsim")]
#[command(version, about = "Layer-2 network simulator with 802.1D spanning tree", long_about = None)]
pub struct Cli {
    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a JSON topology and simulate it
    Run {
        /// Topology file
        #[arg(value_name = "FILE")]
        topology: PathBuf,

        #[command(flatten)]
        sim: SimArgs,
    },

    /// Simulate a built-in scenario
    Demo {
        #[arg(value_enum)]
        scenario: Scenario,

        #[command(flatten)]
        sim: SimArgs,
    },

    /// Write a built-in scenario as a JSON topology
    SaveDemo {
        #[arg(value_enum)]
        scenario: Scenario,

        /// Output file
        #[arg(value_name = "FILE")]
        out: PathBuf,
    },
}

/// Simulation length and network options
#[derive(Args, Debug, Clone)]
pub struct SimArgs {
    /// Simulated time to stop at
    #[arg(long, value_name = "TIME", default_value = "60")]
    pub until: f64,

    /// Clock increment between ticks
    #[arg(long, value_name = "DT", default_value = "1")]
    pub step: f64,

    /// Drain receive queues oldest-first instead of newest-first
    #[arg(long)]
    pub fifo: bool,

    /// Save the topology after the run
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,
}

impl SimArgs {
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            queue_discipline: if self.fifo {
                QueueDiscipline::Fifo
            } else {
                QueueDiscipline::Lifo
            },
            ..NetworkConfig::default()
        }
    }
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default log filter for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
