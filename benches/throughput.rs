use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use pricepulse::deviation::{self, Observation};
use pricepulse::engine::Engine;
use pricepulse::evaluator::{self, EvalContext};
use pricepulse::types::{Direction, HourlyBaseline, Product};

fn flat_baseline(mean: f64) -> HourlyBaseline {
    HourlyBaseline {
        ean: "7894900011517".to_string(),
        hour_period: 12,
        total_median_quantity: mean,
        total_mean_quantity: mean,
        monthly_medians: vec![mean; 12],
        monthly_means: vec![mean; 12],
        daily_medians: vec![mean; 31],
        daily_means: vec![mean; 31],
        dow_medians: vec![mean; 7],
        dow_means: vec![mean; 7],
    }
}

fn deviation_compute(c: &mut Criterion) {
    let baseline = flat_baseline(2.5);
    let obs = Observation {
        quantity: 4.0,
        hour_period: 12,
        day: 20,
        day_of_week: 6,
        month: 8,
    };

    c.bench_function("deviation_compute", |b| {
        b.iter(|| deviation::compute(&obs, &baseline).unwrap());
    });
}

fn evaluation_pass(c: &mut Criterion) {
    let engine = Engine::new();
    engine.seed_demo();
    for i in 0..20 {
        engine
            .create_sales_volume_trigger(
                &format!("Rule {i:02}"),
                Direction::Increase,
                200.0,
                24,
                5.0,
            )
            .unwrap();
    }

    let baseline = flat_baseline(2.5);
    let obs = Observation {
        quantity: 4.0,
        hour_period: 12,
        day: 20,
        day_of_week: 6,
        month: 8,
    };
    let deviation = deviation::compute(&obs, &baseline).unwrap();
    let product = Product {
        ean: "7894900011517".to_string(),
        name: "Bench".to_string(),
        brand: "Bench".to_string(),
        category: "Bench".to_string(),
        current_price: 8.99,
    };
    let triggers = engine.list_triggers(true);
    let trigger_refs: Vec<_> = triggers.iter().collect();
    let book = pricepulse::catalog::CompetitorBook::new();

    c.bench_function("evaluation_pass_22_triggers", |b| {
        b.iter(|| {
            let ctx = EvalContext {
                product: &product,
                deviation: Some(&deviation),
                now: chrono::Utc::now(),
                competitors: &book,
            };
            evaluator::evaluate_all(&trigger_refs, &ctx)
        });
    });
}

fn tick_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_cycle");
    for sample_size in [4usize, 8, 12] {
        group.throughput(Throughput::Elements(sample_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(sample_size),
            &sample_size,
            |b, &sample_size| {
                let engine = Engine::new();
                engine.seed_demo();
                engine.with_state(|st| st.simulator.sample_size = sample_size);
                engine.start_simulation().unwrap();

                b.iter(|| {
                    let report = engine.run_cycle();
                    // keep the pending gate from starving later iterations
                    if !report.suggestions.is_empty() {
                        let ids: Vec<u64> = report.suggestions.iter().map(|s| s.id).collect();
                        engine.reject_all_suggestions(&ids).unwrap();
                    }
                    report
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, deviation_compute, evaluation_pass, tick_cycle);
criterion_main!(benches);
