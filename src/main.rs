use std::env;
use std::process;

use tracing::{error, info, Level};

use rusty_parts::console::{run_console, ConsoleConfig};
use rusty_parts::draw::CanvasCmd;
use rusty_parts::system_config::{PartFactory, WorkbenchConfig};
use rusty_parts::systems::Workbench;

const DEFAULT_FRAMES: u64 = 100;

struct Options {
    config_path: String,
    frames: u64,
    console: bool,
    log_level: Level,
    save_path: Option<String>,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} <config.json> [--frames N] [--console] [--log-level LEVEL] [--save PATH]",
        program
    )
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let program = args.first().map(String::as_str).unwrap_or("rusty_parts");
    let mut config_path = None;
    let mut options = Options {
        config_path: String::new(),
        frames: DEFAULT_FRAMES,
        console: false,
        log_level: Level::INFO,
        save_path: None,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--frames" => {
                let value = iter.next().ok_or("--frames needs a value")?;
                options.frames = value
                    .parse()
                    .map_err(|_| format!("invalid frame count '{}'", value))?;
            }
            "--console" => options.console = true,
            "--log-level" => {
                let value = iter.next().ok_or("--log-level needs a value")?;
                options.log_level = value
                    .parse()
                    .map_err(|_| format!("invalid log level '{}'", value))?;
            }
            "--save" => {
                let value = iter.next().ok_or("--save needs a path")?;
                options.save_path = Some(value.clone());
            }
            "-h" | "--help" => return Err(usage(program)),
            other if other.starts_with("--") => {
                return Err(format!("unknown option '{}'\n{}", other, usage(program)))
            }
            other => config_path = Some(other.to_string()),
        }
    }

    options.config_path = config_path.ok_or_else(|| usage(program))?;
    Ok(options)
}

fn run_headless(bench: &mut Workbench, frames: u64) {
    let mut canvas: Vec<CanvasCmd> = Vec::new();
    let mut drawn = 0;
    for _ in 0..frames {
        canvas.clear();
        drawn += bench.run_frame(&mut canvas, |_bus| {}).outputs_drawn;
    }

    println!("Bench: {} ({} parts)", bench.name(), bench.part_count());
    println!("Frames: {}  outputs drawn: {}", bench.frames(), drawn);
    for part in bench.parts() {
        println!("  {:<12} {:<24} {}", part.name(), part.kind().title(), part.write_preferences());
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{}", message);
            process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(options.log_level)
        .init();

    let factory = PartFactory::new();
    let mut bench = match factory.create_from_json(&options.config_path) {
        Ok(bench) => bench,
        Err(e) => {
            error!("Failed to load bench '{}': {}", options.config_path, e);
            process::exit(1);
        }
    };
    info!("Bench '{}' ready with {} parts", bench.name(), bench.part_count());

    if options.console {
        bench = match run_console(bench, ConsoleConfig::default()) {
            Ok(bench) => bench,
            Err(e) => {
                error!("Console failed: {}", e);
                process::exit(1);
            }
        };
    } else {
        run_headless(&mut bench, options.frames);
    }

    if let Some(path) = options.save_path {
        match WorkbenchConfig::from_workbench(&bench).save(&path) {
            Ok(()) => info!("Saved bench to {}", path),
            Err(e) => {
                error!("Failed to save bench to {}: {}", path, e);
                process::exit(1);
            }
        }
    }
}
