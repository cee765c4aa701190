use almetrics::{
    Currency, InstInfo, Instrument, InstrumentType, RiskParameters, ScenarioCalculator,
    ScenarioParameters,
};
use almetrics::instruments::deposit::Deposit;
use almetrics::instruments::loan::Loan;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use time::macros::date;
use time::{Date, Duration};

const CDATE: Date = date!(2025 - 01 - 15);

fn synthetic_portfolio(size: usize) -> Vec<Instrument> {
    let mut instruments = Vec::with_capacity(size);
    for i in 0..size {
        let maturity = CDATE + Duration::days(30 + (i as i64 * 37) % 1800);
        if i % 2 == 0 {
            instruments.push(Instrument::Loan(Loan {
                info: InstInfo {
                    instrument_id: format!("L-{}", i),
                    instrument_type: InstrumentType::Loan,
                    balance_account: "45502".to_string(),
                    amount: 1000.0 + i as f64,
                    currency: Currency::RUB,
                    start_date: date!(2024 - 01 - 15),
                    as_of_date: CDATE,
                    maturity_date: Some(maturity),
                    interest_rate: Some(0.08 + (i % 10) as f64 * 0.005),
                    ..InstInfo::default()
                },
                ..Loan::default()
            }));
        } else {
            instruments.push(Instrument::Deposit(Deposit {
                info: InstInfo {
                    instrument_id: format!("D-{}", i),
                    instrument_type: InstrumentType::Deposit,
                    balance_account: "42301".to_string(),
                    amount: -(800.0 + i as f64),
                    currency: Currency::RUB,
                    start_date: date!(2024 - 06 - 01),
                    as_of_date: CDATE,
                    maturity_date: Some(maturity),
                    interest_rate: Some(0.05),
                    ..InstInfo::default()
                },
                ..Deposit::default()
            }));
        }
    }
    instruments
}

fn bench_scenario_calculation(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenario_calculation");
    for size in [1_000usize, 10_000] {
        let instruments = synthetic_portfolio(size);
        let scenario = ScenarioParameters::combined_stress(CDATE);

        let sequential =
            ScenarioCalculator::new(instruments.clone(), RiskParameters::default()).unwrap();
        group.bench_with_input(BenchmarkId::new("sequential", size), &size, |b, _| {
            b.iter(|| sequential.calculate_scenario(&scenario, None).unwrap())
        });

        let parallel = ScenarioCalculator::new(
            instruments.clone(),
            RiskParameters {
                parallel: true,
                ..RiskParameters::default()
            },
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::new("parallel", size), &size, |b, _| {
            b.iter(|| parallel.calculate_scenario(&scenario, None).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scenario_calculation);
criterion_main!(benches);
