// src/main.rs

//! `simd-abi`: prints how lane counts of an element type decompose into
//! native register chunks on a target.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use log::{debug, info};
use serde::Serialize;

use simd_abi::config::Config;
use simd_abi::decompose::StorageLayout;
use simd_abi::{Decomposer, ElementType, Recipe};

#[derive(Parser, Debug)]
#[command(name = "simd-abi", about = "Deduce native SIMD chunk layouts for N-lane values")]
struct Cli {
    /// Plan for a named target instead of the build target
    /// (scalar, x86-64, x86-64-v2, x86-64-v3, x86-64-v4, aarch64, armv7-neon)
    #[arg(long)]
    preset: Option<String>,

    /// JSON configuration file (defaults to $SIMD_ABI_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,

    /// Print the register catalog and exit
    #[arg(long)]
    catalog: bool,

    /// Element type, e.g. f32, i16, c64
    #[arg(required_unless_present = "catalog")]
    element: Option<String>,

    /// Lane counts to decompose
    #[arg(required_unless_present = "catalog")]
    lanes: Vec<usize>,
}

#[derive(Serialize)]
struct Report<'a> {
    element: ElementType,
    lanes: usize,
    recipe: &'a Recipe,
    layout: StorageLayout,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let cli = Cli::parse();
    debug!("{:?}", cli);

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    if let Some(preset) = &cli.preset {
        info!("Planning for preset '{}'", preset);
        config.target.registers = None;
        config.target.features = None;
        config.target.preset = Some(preset.clone());
    }

    let catalog = config.catalog()?;

    if cli.catalog {
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        } else {
            print!("{}", catalog);
        }
        return Ok(());
    }

    let Some(element) = cli.element.as_deref() else {
        bail!("missing element type");
    };
    let element: ElementType = element
        .parse()
        .with_context(|| format!("Invalid element type '{}'", element))?;

    let decomposer = Decomposer::new(&catalog, config.policy.clone())
        .context("Invalid decomposition policy")?;

    let mut reports = Vec::with_capacity(cli.lanes.len());
    for &lanes in &cli.lanes {
        let recipe = decomposer
            .decompose(element, lanes)
            .with_context(|| format!("Failed to decompose {} x {}", element, lanes))?;
        reports.push((lanes, recipe));
    }

    if cli.json {
        let out: Vec<Report<'_>> = reports
            .iter()
            .map(|(lanes, recipe)| Report {
                element,
                lanes: *lanes,
                recipe,
                layout: recipe.layout(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (lanes, recipe) in &reports {
        let layout = recipe.layout();
        println!(
            "{} x {}: {}  ({} bytes, align {})",
            element, lanes, recipe, layout.size_bytes, layout.alignment
        );
        for placement in &layout.chunks {
            let chunk = &placement.chunk;
            println!(
                "  chunk {:>2}  lanes {:>3}..{:<3}  byte {:>4}  {}",
                chunk.index,
                chunk.offset,
                chunk.offset + chunk.lanes(),
                placement.byte_offset,
                chunk.shape
            );
        }
    }
    Ok(())
}
