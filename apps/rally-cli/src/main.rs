mod script;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rally_assets::{AssetStore, JsonVehicleSource, MemoryVehicleSource, VehicleSource};
use rally_input::{InputEvent, InputRouter, KeyBindings};
use rally_persist::RecordStore;
use rally_render::{RecordedFrame, RecordingRenderer};
use rally_scene::{GameState, SceneLoop, SimConfig, Tick, format_clock};
use tracing_subscriber::EnvFilter;

use crate::script::Step;

#[derive(Parser)]
#[command(name = "rally-cli", about = "Headless tooling for the rally scene")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, default configuration and key bindings
    Info,
    /// Drive a vehicle with scripted input and print its pose
    Drive(DriveArgs),
    /// Validate a vehicle catalog and every descriptor it lists
    Catalog {
        /// Catalog JSON file
        path: PathBuf,
        /// Write the resulting mesh registry to this JSON file
        #[arg(long)]
        dump_meshes: Option<PathBuf>,
    },
    /// Show or clear the stored best time
    Record {
        /// Record file
        #[arg(default_value = "rally_record.json")]
        path: PathBuf,
        /// Delete the record
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Args)]
struct DriveArgs {
    /// Vehicle catalog JSON; the built-in demo car is used without one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Scene configuration JSON overriding the defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Best-time record file; none is written without it
    #[arg(long)]
    record_file: Option<PathBuf>,

    /// Vehicle to drive, counting from 1
    #[arg(long, default_value_t = 1)]
    vehicle: usize,

    /// Steps: press:KEY, release:KEY, wait:SECONDS
    #[arg(short, long, default_value = "press:w wait:1 release:w wait:3")]
    script: String,

    /// Host callbacks per simulated second
    #[arg(long, default_value_t = 60.0)]
    tick_rate: f64,

    /// Coin placement seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Print the draw calls of the last rendered frame
    #[arg(long)]
    show_frame: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => info(),
        Commands::Drive(args) => drive(&args)?,
        Commands::Catalog { path, dump_meshes } => catalog(&path, dump_meshes.as_deref())?,
        Commands::Record { path, clear } => record(&path, clear)?,
    }

    Ok(())
}

fn info() {
    let config = SimConfig::default();
    println!("rally-cli v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "scene: {} fps target, {} coins to win, arena +/-{}",
        config.target_fps, config.coins.target, config.coins.bound
    );
    println!(
        "camera: fov {} deg, eye d={} theta={} phi={}",
        config.fov_deg, config.camera_distance, config.camera_theta_deg, config.camera_phi_deg
    );
    println!("bindings:");
    for (key, binding) in KeyBindings::default().iter() {
        println!("  {:<6} {binding:?}", key.to_string());
    }
}

fn drive(args: &DriveArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    config.seed = Some(args.seed);
    anyhow::ensure!(
        args.tick_rate.is_finite() && args.tick_rate > 0.0,
        "tick rate must be positive"
    );
    let steps = script::parse(&args.script)?;

    let source: Box<dyn VehicleSource> = match &args.catalog {
        Some(path) => Box::new(JsonVehicleSource::open(path)?),
        None => Box::new(MemoryVehicleSource::demo()),
    };
    let records = args.record_file.as_ref().map(RecordStore::new);
    let mut game = GameState::new(config, source, records)?;
    if args.vehicle > 1 {
        game.select_vehicle(args.vehicle - 1)?;
    }

    let mut scene = SceneLoop::new(game);
    let mut router = InputRouter::default();
    let mut renderer = RecordingRenderer::new();
    let mut last_frame: Option<RecordedFrame> = None;
    let dt = 1.0 / args.tick_rate;
    let mut now = 0.0;

    println!(
        "driving {} for {:.2}s at {} ticks/s",
        scene.game().vehicle().name(),
        script::duration(&steps),
        args.tick_rate
    );
    if let Tick::Rendered(frame) = scene.tick(now, &mut renderer) {
        last_frame = Some(frame);
    }
    for step in &steps {
        tracing::debug!(%step, at = now, "script step");
        let event = match *step {
            Step::Press(key) => InputEvent::KeyDown(key),
            Step::Release(key) => InputEvent::KeyUp(key),
            Step::Wait(secs) => {
                let end = now + secs;
                while now + dt <= end + 1e-9 {
                    now += dt;
                    if let Tick::Rendered(frame) = scene.tick(now, &mut renderer) {
                        last_frame = Some(frame);
                    }
                }
                print_pose(now, scene.game());
                continue;
            }
        };
        if let Some(command) = router.route(event) {
            scene.game_mut().handle_command(command);
        }
    }

    let stats = scene.stats();
    let game = scene.game();
    println!(
        "ticks={} updates={} renders={} coins={}/{} race_time={}",
        stats.ticks,
        stats.updates,
        stats.renders,
        game.coins().collected(),
        game.config().coins.target,
        format_clock(game.race_time())
    );
    if args.show_frame {
        if let Some(frame) = last_frame {
            print!("{frame}");
        }
    }
    Ok(())
}

fn print_pose(now: f64, game: &GameState) {
    let v = game.vehicle();
    let p = v.position();
    println!(
        "t={now:6.2}s pos=({:8.3}, {:8.3}, {:8.3}) facing={:7.2} speed={:6.3} steering={:6.3} moving={}",
        p.x,
        p.y,
        p.z,
        v.facing(),
        v.velocity().length(),
        v.steering(),
        v.is_moving()
    );
}

fn catalog(path: &std::path::Path, dump_meshes: Option<&std::path::Path>) -> Result<()> {
    let mut source = JsonVehicleSource::open(path)?;
    let mut store = AssetStore::new();
    println!(
        "catalog {} lists {} vehicles",
        path.display(),
        source.len()
    );
    for index in 0..source.len() {
        let vehicle = source
            .load(index, &mut store)
            .with_context(|| format!("vehicle {}", index + 1))?;
        println!(
            "  {}: {} ({} parts)",
            index + 1,
            vehicle.name(),
            vehicle.parts().len()
        );
    }
    println!("meshes: {} unique", store.len());
    if let Some(out) = dump_meshes {
        store.save(out)?;
        println!("mesh registry written to {}", out.display());
    }
    Ok(())
}

fn record(path: &std::path::Path, clear: bool) -> Result<()> {
    let records = RecordStore::new(path);
    if clear {
        records.clear()?;
        println!("record cleared");
        return Ok(());
    }
    match records.load()? {
        Some(best) => println!("best time: {} ({best:.2}s)", format_clock(best)),
        None => println!("no record yet"),
    }
    Ok(())
}
