mod acquisition;
mod app;
mod commands;
mod dimensions;
mod render;

use app::ViewerApp;
use clap::{Parser, Subcommand};
use morphview::{
    DeviceSelector, Directory, NativeLibrary, ScanConfig, SensorLibrary, SimulatedLibrary,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "morphview", about = "Sensel pressure sensor tools")]
struct Cli {
    /// Use simulated sensors instead of LibSensel
    #[arg(long, global = true)]
    simulate: bool,

    /// Number of simulated sensors
    #[arg(long, global = true, default_value_t = 2)]
    sim_devices: u8,

    /// Path to the LibSensel shared library
    #[arg(long, global = true, value_name = "PATH")]
    library: Option<PathBuf>,

    /// Device index to open (default: first device found)
    #[arg(short, long, global = true, conflicts_with_all = ["serial", "port"])]
    device: Option<u8>,

    /// Open the device with this serial number
    #[arg(long, global = true, conflicts_with = "port")]
    serial: Option<String>,

    /// Open the device on this serial port
    #[arg(long, global = true)]
    port: Option<String>,

    /// Stop after this many frames instead of waiting for Enter
    #[arg(long, global = true)]
    frames: Option<u64>,

    /// Enable debug logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List attached sensors
    List,
    /// Print geometry, firmware and LED details of a sensor
    Info,
    /// Print contacts, lighting the LED under each touch
    Contacts,
    /// Print the total force of every frame
    Forces,
    /// Print contacts from every attached sensor
    Multi,
    /// Show the force map and contacts in a window
    View {
        /// Number of trail frames to show (max 20)
        #[arg(short, long, default_value_t = 20)]
        trails: usize,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Sensor(#[from] morphview::Error),

    #[error("viewer: {0}")]
    Viewer(#[from] eframe::Error),
}

impl Cli {
    fn selector(&self) -> Option<DeviceSelector> {
        if let Some(serial) = &self.serial {
            return Some(DeviceSelector::Serial(serial.clone()));
        }
        if let Some(port) = &self.port {
            return Some(DeviceSelector::ComPort(port.clone()));
        }
        self.device.map(DeviceSelector::Index)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_native(cli: &Cli) -> morphview::Result<NativeLibrary> {
    let lib = match &cli.library {
        Some(path) => NativeLibrary::load_from(path)?,
        None => NativeLibrary::load()?,
    };
    tracing::info!("loaded {}", lib.path().display());
    Ok(lib)
}

fn run<L: SensorLibrary>(lib: Arc<L>, cli: &Cli) -> Result<(), CliError> {
    let directory = Directory::new(lib);
    let device = cli.selector();
    match &cli.command {
        Command::List => commands::list(&directory)?,
        Command::Info => commands::info(&directory, device)?,
        Command::Contacts => commands::contacts(&directory, device, cli.frames)?,
        Command::Forces => commands::forces(&directory, device, cli.frames)?,
        Command::Multi => commands::multi(&directory, cli.frames)?,
        Command::View { trails } => view(&directory, device, *trails)?,
    }
    Ok(())
}

fn view<L: SensorLibrary>(
    directory: &Directory<L>,
    device: Option<DeviceSelector>,
    trails: usize,
) -> Result<(), CliError> {
    let session = commands::open(directory, device)?;
    let geometry = session.geometry()?;
    let config = ScanConfig::everything();
    let frame_rx = acquisition::spawn_acquisition_thread(session, config);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 600.0])
            .with_min_inner_size([320.0, 240.0])
            .with_title("Morphview - Pressure Visualizer"),
        ..Default::default()
    };

    eframe::run_native(
        "Morphview",
        options,
        Box::new(move |_cc| Ok(Box::new(ViewerApp::new(frame_rx, &geometry, trails)))),
    )?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = if cli.simulate {
        run(Arc::new(SimulatedLibrary::demo(cli.sim_devices)), &cli)
    } else {
        load_native(&cli)
            .map_err(CliError::from)
            .and_then(|lib| run(Arc::new(lib), &cli))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
