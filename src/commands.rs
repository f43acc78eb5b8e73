use audiocd_splitter::burning::BurnOptions;
use audiocd_splitter::core::AppSettings;
use audiocd_splitter::planner::SplitMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Split an audio collection across CDs, convert it to CD audio and burn it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print events as JSON lines instead of text
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Show debug output in the terminal
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    /// Store the given options as the new defaults
    #[arg(long, global = true, default_value_t = false)]
    pub save: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Plan(PlanCommand),
    Convert(ConvertCommand),
    Burn(BurnCommand),
    Drives(DrivesCommand),
    Status(StatusCommand),
}

/// Source selection and disc-splitting options
#[derive(Args, Debug, Clone, PartialEq)]
pub struct PlanArgs {
    /// Audio files or directories, in play order
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,

    /// Usable minutes per disc
    #[arg(long, short = 'c', value_name = "MINUTES")]
    pub capacity: Option<f64>,

    /// Fill earlier discs with later tracks instead of keeping the order
    #[arg(long, conflicts_with = "sequential")]
    pub fill_gaps: bool,

    /// Keep tracks in their original order
    #[arg(long)]
    pub sequential: bool,
}

impl PlanArgs {
    pub fn apply(&self, settings: &mut AppSettings) {
        if let Some(capacity) = self.capacity {
            settings.capacity_minutes = capacity;
        }
        if self.fill_gaps {
            settings.split_mode = SplitMode::FillGaps;
        } else if self.sequential {
            settings.split_mode = SplitMode::Sequential;
        }
    }
}

/// Where converted discs live
#[derive(Args, Debug, Clone, PartialEq)]
pub struct OutputArgs {
    /// Root folder for the CD_<NN> folders
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output: Option<PathBuf>,
}

impl OutputArgs {
    pub fn apply(&self, settings: &mut AppSettings) {
        if let Some(output) = &self.output {
            settings.output_dir = Some(output.clone());
        }
    }
}

/// Drive and write options
#[derive(Args, Debug, Clone, PartialEq)]
pub struct BurnArgs {
    /// CD writer device
    #[arg(long, short = 'd', value_name = "DEVICE")]
    pub device: Option<String>,

    /// Write speed
    #[arg(long, short = 's', value_name = "SPEED")]
    pub speed: Option<u32>,

    /// Leave the disc in the drive when done
    #[arg(long, conflicts_with = "eject")]
    pub no_eject: bool,

    /// Eject the disc when done
    #[arg(long)]
    pub eject: bool,

    /// Path to the wodim binary
    #[arg(long, value_name = "PATH")]
    pub wodim: Option<PathBuf>,
}

impl BurnArgs {
    pub fn apply(&self, settings: &mut AppSettings) {
        let burn: &mut BurnOptions = &mut settings.burn;
        if let Some(device) = &self.device {
            burn.device = device.clone();
        }
        if let Some(speed) = self.speed {
            burn.speed = speed;
        }
        if self.no_eject {
            burn.eject = false;
        } else if self.eject {
            burn.eject = true;
        }
        if let Some(wodim) = &self.wodim {
            settings.wodim_path = Some(wodim.clone());
        }
    }
}

/// Shows how the sources would be split across discs.
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct PlanCommand {
    #[command(flatten)]
    pub plan: PlanArgs,
}

/// Converts every planned disc to a folder of CD-ready WAV files.
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ConvertCommand {
    #[command(flatten)]
    pub plan: PlanArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Path to the ffmpeg binary
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,
}

/// Burns one converted disc to an audio CD.
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct BurnCommand {
    #[command(flatten)]
    pub plan: PlanArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub burn: BurnArgs,

    /// Disc number from the plan (1-based)
    #[arg(long, value_name = "N")]
    pub disc: usize,
}

/// Lists CD writers.
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct DrivesCommand {
    /// Path to the wodim binary
    #[arg(long, value_name = "PATH")]
    pub wodim: Option<PathBuf>,
}

/// Reports the disc in a drive.
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct StatusCommand {
    #[command(flatten)]
    pub burn: BurnArgs,
}
