//! Test fixtures: fixed timestamps and dataset builders for integration testing

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use ranking_engine::config::AppConfig;
use ranking_engine::history::{HistoryManager, InMemorySnapshotStore};
use ranking_engine::types::{Match, Team};
use std::sync::Arc;

pub const ADMIN_KEY: &str = "integration-admin-key";

/// Fixed reference time so decay weights are reproducible
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 18, 0, 0).unwrap()
}

pub fn teams(slugs: &[&str]) -> Vec<Team> {
    slugs
        .iter()
        .enumerate()
        .map(|(idx, slug)| {
            let mut name = slug.to_string();
            name[..1].make_ascii_uppercase();
            Team::new(idx as i64 + 1, *slug, name)
        })
        .collect()
}

/// Two teams, X wins three times 13-0 on the same date
pub fn sweep() -> (Vec<Team>, Vec<Match>) {
    let at = base_time();
    (
        teams(&["xenon", "yak"]),
        (0..3)
            .map(|k| Match::new("xenon", "yak", 13, 0, at + Duration::minutes(k * 50)))
            .collect(),
    )
}

/// One match between the same two teams with the given score
pub fn single(score_x: u32, score_y: u32) -> (Vec<Team>, Vec<Match>) {
    (
        teams(&["xenon", "yak"]),
        vec![Match::new("xenon", "yak", score_x, score_y, base_time())],
    )
}

/// Deterministic round-robin league. The team listed first is the strongest;
/// stronger teams win with a margin proportional to the strength gap, with a
/// sprinkle of upsets driven by `seed`.
pub fn league(slugs: &[&str], rounds: u32, seed: u64) -> (Vec<Team>, Vec<Match>) {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as u32
    };

    let mut matches = Vec::new();
    let mut minute = 0i64;
    for round in 0..rounds {
        for (a, home) in slugs.iter().enumerate() {
            for (b, away) in slugs.iter().enumerate().skip(a + 1) {
                let gap = (b - a) as u32;
                let upset = next() % 10 == 0;
                let loser_score = (next() % 12).saturating_sub(gap);
                let (score_a, score_b) = if upset {
                    (loser_score, 13)
                } else {
                    (13, loser_score)
                };
                let at = base_time() + Duration::days(i64::from(round) * 7) + Duration::minutes(minute);
                minute += 1;
                let (first, second, s1, s2) = if next() % 2 == 0 {
                    (home, away, score_a, score_b)
                } else {
                    (away, home, score_b, score_a)
                };
                matches.push(Match::new(*first, *second, s1, s2, at));
            }
        }
    }
    (teams(slugs), matches)
}

pub fn app_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.service.admin_key = Some(ADMIN_KEY.to_string());
    config
}

pub fn memory_history() -> HistoryManager {
    HistoryManager::new(Arc::new(InMemorySnapshotStore::new()), 3)
}
