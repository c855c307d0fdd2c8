use crm_core::User;
use crm_search::{derive_users, UserFilter};
use std::time::Instant;

const FIRST: [&str; 8] = ["Juan", "María", "Carlos", "Ana", "Luis", "Laura", "Pedro", "Sofía"];
const LAST: [&str; 8] = ["García", "Rodríguez", "González", "Fernández", "López", "Martínez", "Sánchez", "Pérez"];

fn gen_user(i: usize) -> User {
    User {
        id: i as i64 + 1,
        first_name: FIRST[i % FIRST.len()].to_string(),
        last_name: LAST[(i / FIRST.len()) % LAST.len()].to_string(),
        age: 18 + (i % 63) as u32,
        created_at: chrono::DateTime::from_timestamp(1_700_000_000 + (i as i64 * 37) % 86_400, 0),
    }
}

fn percentile_us(xs: &mut [u128], p: f64) -> u128 {
    if xs.is_empty() {
        return 0;
    }
    xs.sort_unstable();
    let idx = ((xs.len() as f64 - 1.0) * p).round() as usize;
    xs[idx]
}

/// At least one round, so there is always a sample to rank.
fn rounds_from(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.parse().ok()).unwrap_or(50).max(1)
}

fn main() {
    let n: usize = std::env::var("CRM_BENCH_USERS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10_000);
    let rounds = rounds_from(std::env::var("CRM_BENCH_ROUNDS").ok().as_deref());

    let t0 = Instant::now();
    let users: Vec<User> = (0..n).map(gen_user).collect();
    let build_ms = t0.elapsed().as_secs_f64() * 1_000.0;

    let cases: Vec<(&str, UserFilter)> = vec![
        ("unfiltered/newest", UserFilter::from_controls("", "", "newest")),
        ("search/name_asc", UserFilter::from_controls("an", "", "name_asc")),
        ("bracket/age_desc", UserFilter::from_controls("", "26-35", "age_desc")),
        ("search+bracket/none", UserFilter::from_controls("gar", "51+", "none")),
    ];

    println!("snapshot: {:.1}ms users={}", build_ms, n);
    for (label, filter) in cases.iter() {
        let mut times: Vec<u128> = Vec::with_capacity(rounds);
        let mut shown = 0usize;
        for _ in 0..rounds {
            let t = Instant::now();
            shown = derive_users(&users, filter).len();
            times.push(t.elapsed().as_micros());
        }
        let p50 = percentile_us(&mut times.clone(), 0.50) as f64 / 1000.0;
        let p99 = percentile_us(&mut times, 0.99) as f64 / 1000.0;
        println!("{}: p50={:.3}ms p99={:.3}ms shown={} ({} rounds)", label, p50, p99, shown, rounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rounds_still_measures_once() {
        assert_eq!(rounds_from(Some("0")), 1);
        assert_eq!(rounds_from(Some("7")), 7);
        assert_eq!(rounds_from(Some("many")), 50);
        assert_eq!(rounds_from(None), 50);
    }

    #[test]
    fn percentile_of_no_samples_is_zero() {
        assert_eq!(percentile_us(&mut [], 0.99), 0);
        assert_eq!(percentile_us(&mut [30, 10, 20], 0.50), 20);
    }
}
