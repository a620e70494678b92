//! Performance benchmarks for ranking calculations

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ranking_engine::canonical::MatchTable;
use ranking_engine::config::{EngineConfig, MapRatingConfig};
use ranking_engine::rating::RatingSuite;
use ranking_engine::types::{Match, Team};
use ranking_engine::{MapRatingCalculator, RankingEngine};

const MAPS: [&str; 3] = ["ascent", "bind", "haven"];

/// Round-robin league where lower indices are stronger
fn synthetic_league(team_count: usize, rounds: usize) -> (Vec<Team>, Vec<Match>) {
    let teams: Vec<Team> = (0..team_count)
        .map(|i| Team::new(i as i64 + 1, format!("team-{:03}", i), format!("Team {}", i)))
        .collect();
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

    let mut matches = Vec::new();
    let mut minute = 0;
    for round in 0..rounds {
        for a in 0..team_count {
            for b in (a + 1)..team_count {
                let loser = ((b - a + round) % 12) as u32;
                let (si, sj) = if (a + b + round) % 9 == 0 {
                    (loser, 13)
                } else {
                    (13, loser)
                };
                minute += 1;
                matches.push(
                    Match::new(
                        teams[a].slug.clone(),
                        teams[b].slug.clone(),
                        si,
                        sj,
                        start + Duration::minutes(minute),
                    )
                    .on_map(MAPS[(a + b) % MAPS.len()]),
                );
            }
        }
    }
    (teams, matches)
}

fn bench_full_pipeline(c: &mut Criterion) {
    let engine = RankingEngine::new(EngineConfig::default()).unwrap();
    let mut group = c.benchmark_group("full_pipeline");
    group.sample_size(20);

    for team_count in [8, 24, 48] {
        let (teams, matches) = synthetic_league(team_count, 2);
        group.bench_with_input(
            BenchmarkId::from_parameter(team_count),
            &(teams, matches),
            |b, (teams, matches)| b.iter(|| black_box(engine.compute(teams, matches))),
        );
    }
    group.finish();
}

fn bench_rating_suite(c: &mut Criterion) {
    let config = EngineConfig::default();
    let suite = RatingSuite::new(&config);
    let (_, matches) = synthetic_league(24, 2);
    let table = MatchTable::build(&matches, &config.decay).unwrap();

    c.bench_function("rating_suite_24_teams", |b| {
        b.iter(|| black_box(suite.run(&table)))
    });
}

fn bench_anomaly_pass(c: &mut Criterion) {
    let mut config = EngineConfig::default();
    config.anomaly.enabled = true;
    let engine = RankingEngine::new(config).unwrap();
    let (teams, matches) = synthetic_league(24, 2);

    c.bench_function("pipeline_with_anomaly_pass_24_teams", |b| {
        b.iter(|| black_box(engine.compute(&teams, &matches)))
    });
}

fn bench_map_rating(c: &mut Criterion) {
    let calculator = MapRatingCalculator::new(MapRatingConfig::default()).unwrap();
    let (_, matches) = synthetic_league(24, 2);

    c.bench_function("map_rating_single_team", |b| {
        b.iter(|| black_box(calculator.rate(&matches, "team-000", "ascent")))
    });
}

criterion_group!(
    benches,
    bench_full_pipeline,
    bench_rating_suite,
    bench_anomaly_pass,
    bench_map_rating
);
criterion_main!(benches);
