use rayon::prelude::*;

/// Upper bound on worker threads when the caller does not pick one.
/// Registry lookups are short network calls, so a modest fan-out is
/// enough to hide latency without hammering the endpoint.
pub const DEFAULT_JOBS: usize = 20;

pub fn run_in_parallel<T, R, F>(items: Vec<T>, jobs: Option<usize>, func: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Send + Sync,
{
    let count = jobs.unwrap_or(DEFAULT_JOBS).min(items.len());
    if count > 1 {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(count).build();
        if let Ok(pool) = pool {
            return pool.install(|| items.into_par_iter().map(func).collect());
        }
    }
    items.into_iter().map(func).collect()
}

#[cfg(test)]
mod tests {
    use super::run_in_parallel;

    #[test]
    fn preserves_input_order() {
        let doubled = run_in_parallel((0..100).collect(), Some(8), |n: i32| n * 2);
        assert_eq!(doubled, (0..100).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn runs_sequentially_for_single_job() {
        let results = run_in_parallel(vec![1, 2, 3], Some(1), |n: i32| n + 1);
        assert_eq!(results, vec![2, 3, 4]);
    }
}
