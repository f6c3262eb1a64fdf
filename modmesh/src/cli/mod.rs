use clap::{Parser, Subcommand};
use owo_colors::{OwoColorize, Style};

use render::render_row;

mod command;
mod render;

#[derive(Parser)]
#[cfg_attr(target_os = "windows", command(name = ".\\modmesh.exe"))]
#[cfg_attr(not(target_os = "windows"), command(name = "./modmesh"))]
#[command(version)]
#[command(long_about = long_about())]
#[command(author = "modmesh contributors")]
struct Cli {
    #[clap(subcommand)]
    command: Option<MmCommand>,
}

#[derive(Subcommand)]
enum MmCommand {
    #[clap(subcommand)]
    #[command(about = "Scan, list and toggle mods in the internal mod directory")]
    Mods(ModsCmd),
    #[clap(subcommand)]
    #[command(about = "Manage the external (out-of-tree) mod registry")]
    Registry(RegistryCmd),
    #[clap(subcommand)]
    #[command(about = "Scan, generate and launch quick-launch presets")]
    Presets(PresetsCmd),
    #[command(about = "Launches the game with the currently configured mod set")]
    Launch {
        #[arg(help = "Path to the game executable")]
        game_exe: String,
    },
    #[clap(subcommand)]
    #[command(about = "Start, stop and inspect the overlay LAN network")]
    Overlay(OverlayCmd),
    #[clap(subcommand)]
    #[command(about = "Manage saved overlay rooms and share codes")]
    Rooms(RoomsCmd),
    #[clap(subcommand)]
    #[command(about = "Inspect and apply the local network optimizer")]
    Optimizer(OptimizerCmd),
    #[command(about = "Ensures the auxiliary overlay tools are extracted and verified")]
    Tools,
}

#[derive(Subcommand)]
pub(super) enum ModsCmd {
    #[command(about = "Scans the mod directory and prints every entry with its classification")]
    Scan,
    #[command(about = "Lists every package/native currently in the active profile")]
    List,
    #[command(about = "Enables a package or native by id/path")]
    Enable { id: String },
    #[command(about = "Disables a package or native by id/path")]
    Disable { id: String },
    #[command(about = "Forces a package to load after every other enabled package")]
    ForceLast { id: String },
    #[command(about = "Forces a native to load before every other enabled native")]
    ForceFirst { path: String },
    #[command(about = "Sets or clears the nrsc.dll preload hint")]
    Preload {
        path: String,
        #[arg(long)]
        off: bool,
    },
}

#[derive(Subcommand)]
pub(super) enum RegistryCmd {
    #[command(about = "Registers an out-of-tree mod folder")]
    AddPackage { path: String },
    #[command(about = "Registers an out-of-tree native DLL")]
    AddNative { path: String },
    #[command(about = "Unregisters an external package by name")]
    RemovePackage { name: String },
    #[command(about = "Unregisters an external native by name")]
    RemoveNative { name: String },
    #[command(about = "Lists registry entries whose target no longer exists on disk")]
    Missing,
    #[command(about = "Removes every missing registry entry")]
    Cleanup,
}

#[derive(Subcommand)]
pub(super) enum PresetsCmd {
    #[command(about = "Lists every preset with its resolved dependency status")]
    List,
    #[command(about = "Generates a preset from the currently active profile")]
    Generate {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    #[command(about = "Launches the game directly from a preset, without touching the active profile")]
    Launch { name: String, game_exe: String },
}

#[derive(Subcommand)]
pub(super) enum OverlayCmd {
    #[command(about = "Starts the overlay daemon for the named room")]
    Start { room: String },
    #[command(about = "Stops the overlay daemon")]
    Stop,
    #[command(about = "Prints the current overlay state")]
    Status,
}

#[derive(Subcommand)]
pub(super) enum RoomsCmd {
    #[command(about = "Lists every saved room")]
    List,
    #[command(about = "Saves a room with a static IP, or DHCP if no IP is given")]
    Save {
        network_name: String,
        network_secret: String,
        #[arg(long)]
        ipv4: Option<String>,
    },
    #[command(about = "Deletes a saved room")]
    Delete { network_name: String },
    #[command(about = "Encodes a saved room as a share code")]
    ShareEncode { network_name: String },
    #[command(about = "Decodes a share code and prints the resulting room config")]
    ShareDecode { code: String },
    #[command(about = "Pings every curated public peer and prints each one's latency")]
    Ping,
}

#[derive(Subcommand)]
pub(super) enum OptimizerCmd {
    #[command(about = "Reads and prints every network interface's current state")]
    Status,
    #[command(about = "Finds the overlay adapter and sets its metric, with verify-then-rollback")]
    Optimize,
    #[command(about = "Restores every metric this process has changed")]
    Rollback,
}

fn long_about() -> String {
    r"
modmesh: composes external mod loadouts and a peer-to-peer overlay
network for a modded game launch.

Run without a subcommand to see this banner again."
        .to_string()
}

const LOGO_WIDTH: u16 = 52;

fn print_intro() {
    const LOGO: &str = r"
  _ __ ___   ___   __| |_ __ ___   ___  ___| |__
 | '_ ` _ \ / _ \ / _` | '_ ` _ \ / _ \/ __| '_ \
 | | | | | | (_) | (_| | | | | | |  __/\__ \ | | |
 |_| |_| |_|\___/ \__,_|_| |_| |_|\___||___/_| |_|";

    let text = get_right_text();

    let Some((terminal_size::Width(width), _)) = terminal_size::terminal_size() else {
        println!("{}\n {}\n", LOGO.purple().bold(), text);
        return;
    };

    let draw_contents = &[(LOGO.to_owned(), Some(Style::new().purple().bold())), (text.clone(), None)];

    if let Some(res) = render_row(width, draw_contents, false) {
        println!("{res}");
    } else {
        if width >= LOGO_WIDTH {
            println!("{}", LOGO.purple().bold());
        }
        println!(" {text}\n");
    }
}

fn get_right_text() -> String {
    format!(
        "{}\n For a list of commands type\n {}",
        "mod composition + overlay LAN orchestrator".green().bold(),
        "./modmesh --help".yellow()
    )
}

pub fn start_cli() {
    let cli = Cli::parse();
    if let Some(command) = cli.command {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        quit(runtime.block_on(dispatch(command)));
    } else {
        print_intro();
    }
}

async fn dispatch(command: MmCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        MmCommand::Mods(cmd) => command::mods(cmd).await,
        MmCommand::Registry(cmd) => command::registry(cmd).await,
        MmCommand::Presets(cmd) => command::presets(cmd).await,
        MmCommand::Launch { game_exe } => command::launch(game_exe).await,
        MmCommand::Overlay(cmd) => command::overlay(cmd).await,
        MmCommand::Rooms(cmd) => command::rooms(cmd).await,
        MmCommand::Optimizer(cmd) => command::optimizer(cmd).await,
        MmCommand::Tools => command::tools().await,
    }
}

fn quit(res: Result<(), Box<dyn std::error::Error>>) {
    std::process::exit(if let Err(e) = res {
        mm_core::err!("{e}");
        1
    } else {
        0
    });
}
