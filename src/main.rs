use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pricepulse::engine::Engine;
use pricepulse::latency::LatencyTracker;
use pricepulse::stress;
use pricepulse::tui;
use pricepulse::web;

#[derive(Parser)]
#[command(name = "pricepulse", about = "Dynamic pricing engine with sales simulation")]
struct Cli {
    /// Run mode: tui, web, headless, or stress
    #[arg(long, default_value = "tui")]
    mode: String,

    /// Web server port (web mode only)
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Simulation speed: virtual minutes per tick
    #[arg(long, default_value = "1")]
    speed: u32,

    /// Products sampled per tick
    #[arg(long, default_value = "8")]
    sample_size: usize,

    /// Run duration in seconds (0 = infinite; stress: seconds per level)
    #[arg(long, default_value = "0")]
    duration: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.mode != "tui" {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    match cli.mode.as_str() {
        "tui" => tui::run(cli.speed, cli.sample_size, cli.duration).await?,
        "web" => web::run(cli.port, cli.speed, cli.sample_size).await?,
        "headless" => run_headless(cli.speed, cli.sample_size, cli.duration).await?,
        "stress" => stress::run(if cli.duration == 0 { 10 } else { cli.duration }).await?,
        other => eprintln!("Unknown mode: {other}. Use --mode tui|web|headless|stress"),
    }

    Ok(())
}

async fn run_headless(
    speed: u32,
    sample_size: usize,
    duration_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== pricepulse (headless) ===");
    println!(
        "Speed: x{speed}, Sample: {sample_size}, Duration: {}",
        if duration_secs == 0 { "infinite".to_string() } else { format!("{duration_secs}s") }
    );
    println!();

    let engine = Engine::new();
    engine.seed_demo();
    engine.set_speed(speed);
    engine.with_state(|st| st.simulator.sample_size = sample_size);
    engine.start_simulation()?;

    let mut latency = LatencyTracker::new();
    let mut total_sales = 0u64;
    let mut total_suggestions = 0u64;

    let run_duration = if duration_secs == 0 {
        Duration::from_secs(3600)
    } else {
        Duration::from_secs(duration_secs)
    };
    let start = Instant::now();

    while start.elapsed() < run_duration {
        let report = engine.run_cycle();
        total_sales += report.sales.len() as u64;
        latency.record_cycle(report.generation_us, report.evaluation_us);

        for sale in &report.sales {
            println!(
                "  SALE      | {} | qty {} @ {:.2} | {}",
                sale.ean,
                sale.quantity,
                sale.unit_price,
                sale.timestamp.format("%Y-%m-%d %H:%M")
            );
        }
        for suggestion in &report.suggestions {
            total_suggestions += 1;
            println!(
                "  SUGGEST   | {} | {:.2} -> {:.2} ({:+.1}%) | {}",
                suggestion.ean,
                suggestion.current_price,
                suggestion.suggested_price,
                suggestion.percentage_change,
                suggestion.reason
            );
        }

        tokio::time::sleep(engine.tick_period()).await;
    }

    engine.stop_simulation();

    let snapshot = engine.snapshot();
    let (pending, accepted, rejected) = snapshot.suggestion_counts;

    println!();
    println!("=== Results ===");
    println!("  Sales generated:       {}", total_sales);
    println!("  Suggestions raised:    {}", total_suggestions);
    println!("  Pending/Accepted/Rejected: {}/{}/{}", pending, accepted, rejected);
    println!("  Virtual clock:         {}", snapshot.virtual_clock.format("%Y-%m-%d %H:%M"));
    println!();
    let gen = latency.generation_stats();
    let eval = latency.evaluation_stats();
    let cycle = latency.cycle_stats();
    println!("  Latency (microseconds):");
    println!("    Generation: p50={} p95={} p99={} min={} max={}", gen.p50_us, gen.p95_us, gen.p99_us, gen.min_us, gen.max_us);
    println!("    Evaluation: p50={} p95={} p99={} min={} max={}", eval.p50_us, eval.p95_us, eval.p99_us, eval.min_us, eval.max_us);
    println!("    Cycle:      p50={} p95={} p99={} min={} max={}", cycle.p50_us, cycle.p95_us, cycle.p99_us, cycle.min_us, cycle.max_us);

    Ok(())
}
