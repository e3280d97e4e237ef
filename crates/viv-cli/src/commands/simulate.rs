use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use viv_simulation::pipeline::{
    Census, LifecycleStep, PairingStep, Presentation, SnapshotPresenter,
};
use viv_simulation::{Scheduler, SimEventKind, Simulation};

use crate::ecosystem::{self, Creature, PredationStep};

/// Host callbacks allowed per executed tick before `--frame-ms` is refused.
const MAX_CALLBACKS_PER_TICK: f64 = 1000.0;

/// Options of `viv simulate`.
#[derive(Debug, Default)]
pub struct SimulateOptions<'a> {
    pub ticks: u64,
    pub seed: Option<u64>,
    pub tick_rate: Option<f64>,
    /// Synthetic wall time between host callbacks. Defaults to the frame
    /// interval, so every callback executes a tick.
    pub frame_ms: Option<f64>,
    pub species: Option<&'a Path>,
    pub config: Option<&'a Path>,
    pub json: bool,
    pub verbose: bool,
}

pub fn run(opts: &SimulateOptions<'_>) -> Result<(), String> {
    let mut config = super::load_config(opts.config)?;
    if let Some(seed) = opts.seed {
        config = config.with_seed(seed);
    }
    if let Some(rate) = opts.tick_rate {
        config = config.with_tick_rate(rate);
    }
    config.validate().map_err(|e| e.to_string())?;
    let species = super::load_species(opts.species)?;

    let mut scheduler = Scheduler::from_config(&config).map_err(|e| e.to_string())?;
    let interval_ms = scheduler.interval_ms();
    let frame_ms = opts.frame_ms.unwrap_or(interval_ms);
    if !(frame_ms.is_finite() && frame_ms > 0.0) {
        return Err(format!("--frame-ms must be positive, got {frame_ms}"));
    }
    let min_frame_ms = interval_ms / MAX_CALLBACKS_PER_TICK;
    if frame_ms < min_frame_ms {
        return Err(format!(
            "--frame-ms must be at least {min_frame_ms} ({MAX_CALLBACKS_PER_TICK} callbacks per {interval_ms}ms frame), got {frame_ms}"
        ));
    }

    let sim = ecosystem::build(config.clone(), species)
        .map_err(|e| format!("cannot build ecosystem: {e}"))?;
    scheduler.add(sim);

    // Drive the scheduler from a synthetic clock until enough ticks ran.
    scheduler.start(0.0);
    let mut callbacks: u64 = 0;
    while scheduler.frames() < opts.ticks {
        callbacks += 1;
        scheduler
            .frame(callbacks as f64 * frame_ms)
            .map_err(|e| format!("simulation error: {e}"))?;
    }
    scheduler.stop();

    let sim = scheduler
        .get::<Simulation<Creature>>()
        .ok_or("simulation missing from scheduler")?;

    if opts.json {
        let snapshot = sim
            .get_system::<Presentation<SnapshotPresenter>>()
            .and_then(|p| p.presenter().latest());
        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())?;
        println!("{json}");
        return Ok(());
    }

    print_report(sim, opts, callbacks);
    Ok(())
}

fn print_report(sim: &Simulation<Creature>, opts: &SimulateOptions<'_>, callbacks: u64) {
    let config = sim.config();
    let clock = sim.clock();

    // Header
    println!(
        "  {} {}",
        "Simulation".bold(),
        format!(
            "({} ticks, seed={}, {} Hz, {callbacks} frames)",
            clock.tick(),
            config.seed,
            config.tick_rate
        )
        .dimmed()
    );
    println!(
        "  {:.1}s simulated, day {} ({}), {} events logged",
        clock.elapsed(),
        clock.day() + 1,
        clock.phase(),
        sim.events().len()
    );
    println!("  Environment {}", format_level(sim.environment().level()));
    println!();

    if opts.verbose {
        println!("  {}", "Event Log".bold().underline());
        println!();
        for event in sim.events().events() {
            let tick_label = format!("[tick {:>4}]", event.tick).dimmed();
            println!("  {tick_label} {}", colorize_event(&event.kind, &event.description));
        }
        if sim.events().is_empty() {
            println!("  {}", "(no events)".dimmed());
        }
        println!();
    }

    // Census
    println!("  {}", "Census".bold().underline());
    println!();

    let census = Census::of(sim.world());
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Species", "Pool", "Live", "Cap"]);
    for descriptor in sim.world().species_table().iter() {
        let live = census.get(&descriptor.name);
        let live_label = if live == 0 {
            live.to_string().red().to_string()
        } else if live >= descriptor.cap {
            live.to_string().yellow().to_string()
        } else {
            live.to_string()
        };
        table.add_row(vec![
            descriptor.name.clone(),
            descriptor.pool.clone(),
            live_label,
            descriptor.cap.to_string(),
        ]);
    }
    println!("{table}");
    println!();

    let kills = sim.get_system::<PredationStep>().map_or(0, PredationStep::kills);
    let deaths = sim.get_system::<LifecycleStep>().map_or(0, LifecycleStep::deaths);
    let pairs = sim.get_system::<PairingStep>().map_or(0, PairingStep::pairs);
    println!(
        "  {} born ({} refused at cap), {} died, {} caught, {} pairings",
        sim.spawned(),
        sim.rejected_spawns(),
        deaths,
        kills,
        pairs
    );
    if sim.dispatch_failures() > 0 {
        println!(
            "  {} {} subscriber failures",
            "WARN".yellow().bold(),
            sim.dispatch_failures()
        );
    }
}

fn colorize_event(kind: &SimEventKind, description: &str) -> colored::ColoredString {
    match kind {
        SimEventKind::Spawned { .. } => description.green(),
        SimEventKind::Removed { .. } => description.red(),
        SimEventKind::SpawnRequested(_) => description.dimmed(),
        SimEventKind::PhaseChanged { .. } => description.cyan(),
        SimEventKind::Custom { .. } => description.yellow(),
    }
}

fn format_level(level: f64) -> String {
    let pct = (level * 100.0).round() as u32;
    let filled = (level * 10.0).round() as usize;
    let empty = 10_usize.saturating_sub(filled);
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(empty));

    if level <= 0.15 {
        format!("[{}] {:>3}%", bar.red(), pct)
    } else if level <= 0.4 {
        format!("[{}] {:>3}%", bar.yellow(), pct)
    } else {
        format!("[{}] {:>3}%", bar.green(), pct)
    }
}
