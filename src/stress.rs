use std::time::{Duration, Instant};

use crate::engine::Engine;
use crate::latency::LatencyTracker;

struct StressLevel {
    sample_size: usize,
    speed_multiplier: u32,
    sleep_ms: u64,
    target_sps: u64,
}

const LEVELS: &[StressLevel] = &[
    StressLevel { sample_size: 4,   speed_multiplier: 1,    sleep_ms: 100, target_sps: 10 },
    StressLevel { sample_size: 8,   speed_multiplier: 10,   sleep_ms: 100, target_sps: 25 },
    StressLevel { sample_size: 12,  speed_multiplier: 60,   sleep_ms: 50,  target_sps: 80 },
    StressLevel { sample_size: 12,  speed_multiplier: 240,  sleep_ms: 20,  target_sps: 200 },
    StressLevel { sample_size: 12,  speed_multiplier: 720,  sleep_ms: 5,   target_sps: 800 },
    StressLevel { sample_size: 12,  speed_multiplier: 1440, sleep_ms: 1,   target_sps: 3_000 },
];

struct LevelResult {
    level: usize,
    target_sps: u64,
    actual_sps: u64,
    total_sales: u64,
    total_suggestions: u64,
    total_skipped: u64,
    gen_p50: u64,
    gen_p95: u64,
    gen_p99: u64,
    eval_p50: u64,
    eval_p95: u64,
    eval_p99: u64,
    duration_secs: f64,
}

pub async fn run(level_duration: u64) -> Result<(), Box<dyn std::error::Error>> {
    let total_time = LEVELS.len() as u64 * level_duration;
    println!("=== STRESS TEST ===");
    println!("Levels: {}, Duration per level: {}s, Total estimated: {}s",
        LEVELS.len(), level_duration, total_time);
    println!();

    let engine = Engine::new();
    engine.seed_demo();
    engine.start_simulation()?;

    let mut latency = LatencyTracker::new();
    let mut results: Vec<LevelResult> = Vec::new();

    let level_dur = Duration::from_secs(level_duration);

    for (idx, level) in LEVELS.iter().enumerate() {
        let level_num = idx + 1;
        print!("Level {}/{}: target ~{} sales/sec, sample {}, x{} speed, {}ms sleep ... ",
            level_num, LEVELS.len(), level.target_sps, level.sample_size,
            level.speed_multiplier, level.sleep_ms);

        latency.reset();
        engine.set_speed(level.speed_multiplier);
        engine.with_state(|st| st.simulator.sample_size = level.sample_size);

        let mut total_sales = 0u64;
        let mut total_suggestions = 0u64;
        let mut total_skipped = 0u64;

        let level_start = Instant::now();

        while level_start.elapsed() < level_dur {
            let report = engine.run_cycle();
            total_sales += report.sales.len() as u64;
            total_suggestions += report.suggestions.len() as u64;
            total_skipped += report.skipped_products as u64;
            latency.record_cycle(report.generation_us, report.evaluation_us);

            // Suggestions gate at one pending per product; clear them so
            // later levels keep producing.
            let pending: Vec<u64> = engine
                .fetch_pending_suggestions()
                .iter()
                .map(|s| s.id)
                .collect();
            if !pending.is_empty() {
                engine.reject_all_suggestions(&pending)?;
            }

            tokio::time::sleep(Duration::from_millis(level.sleep_ms)).await;
        }

        let elapsed = level_start.elapsed().as_secs_f64();
        let actual_sps = (total_sales as f64 / elapsed) as u64;

        let gen = latency.generation_stats();
        let eval = latency.evaluation_stats();

        println!("{} sales/sec (eval p99={}us)", actual_sps, eval.p99_us);

        results.push(LevelResult {
            level: level_num,
            target_sps: level.target_sps,
            actual_sps,
            total_sales,
            total_suggestions,
            total_skipped,
            gen_p50: gen.p50_us,
            gen_p95: gen.p95_us,
            gen_p99: gen.p99_us,
            eval_p50: eval.p50_us,
            eval_p95: eval.p95_us,
            eval_p99: eval.p99_us,
            duration_secs: elapsed,
        });
    }

    engine.stop_simulation();

    println!();
    print_results_table(&results);

    print_saturation_analysis(&results);

    println!();
    print_latency_detail(&results);

    Ok(())
}

fn format_latency(us: u64) -> String {
    if us >= 1_000_000 {
        format!("{:.1}s", us as f64 / 1_000_000.0)
    } else if us >= 1_000 {
        format!("{:.1}ms", us as f64 / 1_000.0)
    } else {
        format!("{}us", us)
    }
}

fn print_results_table(results: &[LevelResult]) {
    println!("{}", "=".repeat(92));
    println!("{:^92}", "STRESS TEST RESULTS");
    println!("{}", "=".repeat(92));
    println!(
        " {:<5} {:>10} {:>10} {:>10} {:>10} {:>10} {:>9} {:>8}",
        "Level", "Target/s", "Actual/s", "Gen p50", "Gen p99", "Eval p99", "Suggests", "Time"
    );
    println!("{}", "-".repeat(92));

    for r in results {
        println!(
            " {:<5} {:>10} {:>10} {:>10} {:>10} {:>10} {:>9} {:>7.1}s",
            r.level,
            r.target_sps,
            r.actual_sps,
            format_latency(r.gen_p50),
            format_latency(r.gen_p99),
            format_latency(r.eval_p99),
            r.total_suggestions,
            r.duration_secs,
        );
    }

    println!("{}", "=".repeat(92));

    let total_sales: u64 = results.iter().map(|r| r.total_sales).sum();
    let total_suggestions: u64 = results.iter().map(|r| r.total_suggestions).sum();
    let total_skipped: u64 = results.iter().map(|r| r.total_skipped).sum();
    let total_time: f64 = results.iter().map(|r| r.duration_secs).sum();
    println!(
        "Totals: {} sales, {} suggestions, {} skipped products in {:.1}s",
        total_sales, total_suggestions, total_skipped, total_time
    );
}

fn print_latency_detail(results: &[LevelResult]) {
    println!("Latency detail (microseconds):");
    println!(
        " {:<5} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Level", "Gen p50", "Gen p95", "Gen p99", "Eval p50", "Eval p95", "Eval p99"
    );
    println!("{}", "-".repeat(75));
    for r in results {
        println!(
            " {:<5} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            r.level,
            format_latency(r.gen_p50),
            format_latency(r.gen_p95),
            format_latency(r.gen_p99),
            format_latency(r.eval_p50),
            format_latency(r.eval_p95),
            format_latency(r.eval_p99),
        );
    }
}

fn print_saturation_analysis(results: &[LevelResult]) {
    println!();

    // Saturation: actual below 90% of target
    let saturation = results.iter().find(|r| {
        r.actual_sps < (r.target_sps * 90 / 100)
    });

    if let Some(sat) = saturation {
        let pct = (sat.actual_sps as f64 / sat.target_sps as f64) * 100.0;
        println!(
            "Saturation point: Level {} (~{} sales/sec target)",
            sat.level, sat.target_sps
        );
        println!(
            "  Actual throughput: {}/sec ({:.0}% of target)",
            sat.actual_sps, pct
        );
        println!("  Eval p99: {}", format_latency(sat.eval_p99));
    } else {
        println!("No saturation detected - engine handled all load levels!");
    }

    let peak = results.iter().max_by_key(|r| r.actual_sps);
    if let Some(p) = peak {
        println!(
            "Peak sustained throughput: ~{} sales/sec (Level {})",
            p.actual_sps, p.level
        );
    }
}
