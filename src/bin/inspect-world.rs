use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use zonemeet::models::types::ZoneId;
use zonemeet::models::world::{World, WorldData};
use zonemeet::services::movement::{PLAYER_RADIUS, can_occupy};

// cargo run --bin inspect-world -- office.json

#[derive(Debug, Parser)]
#[command(name = "inspect-world", version, about = "Validate a world file and summarize its zones")]
struct Args {
    /// JSON file in the same shape as a `submitWorld` payload ({"map": [[..]], "zoneColors": [..]})
    file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let raw = std::fs::read_to_string(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let data: WorldData = serde_json::from_str(&raw).context("parsing world data")?;
    let world = World::new(data)?;

    println!("grid:   {} rows x {} cols", world.rows(), world.cols());

    let spawn = world.spawn_point();
    let spawn_zone = world
        .lookup_zone(spawn)
        .map(|z| z.to_string())
        .unwrap_or_else(|| "outside".into());
    println!(
        "spawn:  {spawn} in zone {spawn_zone}{}",
        if can_occupy(&world, spawn, PLAYER_RADIUS) { "" } else { " (blocked)" }
    );

    for (zone, cells) in world.zone_counts() {
        let label = match zone {
            ZoneId::WALL => "wall".to_string(),
            ZoneId::COMMON => "common".to_string(),
            z => format!("restricted {z}"),
        };
        let color = world
            .data()
            .zone_colors
            .get(zone.0 as usize)
            .map(String::as_str)
            .unwrap_or("-");
        println!("zone {zone:>3}: {cells:>5} cells  {label:<14} {color}");
    }

    Ok(())
}
