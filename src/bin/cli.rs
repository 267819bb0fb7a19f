//! Unstable Courier CLI - generate levels, run headless simulations, manage the ranking

use clap::{Parser, Subcommand};
use nalgebra::Vector3;
use std::path::PathBuf;

use unstable_courier::config::GameConfig;
use unstable_courier::game::input::HeldKeys;
use unstable_courier::game::level_generator::LevelGenerator;
use unstable_courier::game::ranking::RankingSystem;
use unstable_courier::game::scene::HeadlessScene;
use unstable_courier::game::{GameSession, SessionState};
use unstable_courier::storage::FileStore;

#[derive(Parser)]
#[command(name = "unstable-courier")]
#[command(about = "Unstable Courier simulation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a level layout and print it
    Generate {
        /// Level number (difficulty grows with it)
        #[arg(short, long, default_value = "1")]
        level: u32,
        /// Seed for a reproducible layout
        #[arg(long)]
        seed: Option<u64>,
        /// Print the full level as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a level headless with a fixed set of held keys
    Simulate {
        #[arg(short, long, default_value = "1")]
        level: u32,
        /// Simulated seconds
        #[arg(long, default_value = "10")]
        seconds: f32,
        /// Key codes held for the whole run (e.g. KeyW,ShiftLeft)
        #[arg(long, value_delimiter = ',')]
        keys: Vec<String>,
        #[arg(long)]
        seed: Option<u64>,
        /// Frames per second of the simulated display
        #[arg(long, default_value = "60")]
        fps: u32,
        /// Path to courier.toml
        #[arg(long, env = "COURIER_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Inspect or update the local ranking
    Ranking {
        /// Directory holding the ranking file
        #[arg(long, env = "COURIER_DATA_DIR", default_value = ".courier")]
        dir: PathBuf,
        #[command(subcommand)]
        action: RankingAction,
    },
}

#[derive(Subcommand)]
enum RankingAction {
    /// Print the top scores and the record time
    Show,
    /// Check whether a score would enter the top 5
    Check { score: u32 },
    /// Save a result
    Save {
        /// Three uppercase letters
        name: String,
        score: u32,
        /// Remaining parcel integrity in percent
        #[arg(long, default_value = "100")]
        integrity: f32,
        /// Elapsed time in seconds
        #[arg(long)]
        time: f32,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { level, seed, json } => generate(level, seed, json),
        Commands::Simulate {
            level,
            seconds,
            keys,
            seed,
            fps,
            config,
        } => simulate(level, seconds, keys, seed, fps, config),
        Commands::Ranking { dir, action } => ranking(dir, action),
    }
}

fn generate(level: u32, seed: Option<u64>, json: bool) {
    let generator = LevelGenerator::new();
    let data = match seed {
        Some(seed) => generator.generate_with_seed(level, seed),
        None => generator.generate(level),
    };

    if json {
        match serde_json::to_string_pretty(&data) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error: Failed to serialize level: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!(
        "Level {} ({:?}), seed {}, {} modules",
        data.level_number,
        data.difficulty,
        data.seed,
        data.modules.len()
    );
    for (i, module) in data.modules.iter().enumerate() {
        let p = module.start_position;
        println!(
            "  {:>2}. {:<13} at ({:>6.1}, {:>4.1}, {:>6.1}){}",
            i,
            format!("{:?}", module.module_type),
            p.x,
            p.y,
            p.z,
            if module.is_start {
                "  [start]"
            } else if module.is_delivery {
                "  [delivery]"
            } else {
                ""
            }
        );
    }
}

fn simulate(level: u32, seconds: f32, keys: Vec<String>, seed: Option<u64>, fps: u32, config: Option<PathBuf>) {
    let config = match GameConfig::load_or_default(config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if fps == 0 {
        eprintln!("Error: --fps must be positive");
        std::process::exit(1);
    }

    let held = HeldKeys::from_codes(keys.iter().map(String::as_str));
    let dt = 1.0 / fps as f32;
    let frames = (seconds.max(0.0) * fps as f32).round() as u64;

    let mut scene = HeadlessScene::new();
    let mut session = GameSession::new(config);
    session.start_level(level, seed, &mut scene);

    let mut snapshot = session.snapshot();
    for _ in 0..frames {
        snapshot = session.tick(held, Vector3::z(), dt, &mut scene);
        for event in session.drain_events() {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => log::warn!("[Session] Unprintable event {:?}: {}", event, e),
            }
        }
        if snapshot.state != SessionState::Playing {
            break;
        }
    }

    match serde_json::to_string_pretty(&snapshot) {
        Ok(out) => println!("{}", out),
        Err(e) => {
            eprintln!("Error: Failed to serialize snapshot: {}", e);
            std::process::exit(1);
        }
    }
    session.shutdown(&mut scene);
}

fn ranking(dir: PathBuf, action: RankingAction) {
    let mut ranking = RankingSystem::new(FileStore::new(dir));

    match action {
        RankingAction::Show => {
            if ranking.top_scores().is_empty() {
                println!("No scores yet");
            }
            for (i, entry) in ranking.top_scores().iter().enumerate() {
                println!(
                    "  {}. {} {:>6}  {:>5.1}%  {:>6.1}s  {}",
                    i + 1,
                    entry.name,
                    entry.score,
                    entry.integrity_percent,
                    entry.elapsed_time,
                    entry.timestamp.format("%Y-%m-%d %H:%M")
                );
            }
            match ranking.record_time() {
                Some(time) => println!("Record: {:.1}s by {}", time, ranking.record_holder()),
                None => println!("Record: --"),
            }
        }
        RankingAction::Check { score } => {
            if ranking.is_top_score(score) {
                println!("{} makes the top 5", score);
            } else {
                println!(
                    "{} does not make the top 5 (need {})",
                    score,
                    ranking.score_needed_for_top5()
                );
            }
        }
        RankingAction::Save {
            name,
            score,
            integrity,
            time,
        } => {
            if !ranking.save_score(&name, score, integrity, time) {
                eprintln!("Error: Could not save score (name must be three uppercase letters)");
                std::process::exit(1);
            }
            println!("Saved {} with {} points", name, score);
        }
    }
}
