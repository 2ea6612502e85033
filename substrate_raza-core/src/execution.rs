//! Execution policies on which every solver stage is built.
use std::sync::Arc;

use substrate_raza_concepts::ExecutionPolicy;

/// Executes all loops on the calling thread in ascending order.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sequential;

impl ExecutionPolicy for Sequential {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn n_threads(&self) -> usize {
        1
    }

    #[inline]
    fn parallel_for<F>(&self, n: usize, f: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        (0..n).for_each(f)
    }
}

/// Distributes loops over a dedicated [rayon::ThreadPool].
#[derive(Clone, Debug)]
pub struct Rayon {
    pool: Arc<rayon::ThreadPool>,
}

impl Rayon {
    /// Builds a new thread pool with the given number of threads.
    pub fn new(n_threads: core::num::NonZeroUsize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads.get())
            .thread_name(|n| format!("substrate_worker_{:03.0}", n))
            .build()?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

impl ExecutionPolicy for Rayon {
    fn name(&self) -> &'static str {
        "rayon"
    }

    fn n_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    #[inline]
    fn parallel_for<F>(&self, n: usize, f: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        use rayon::prelude::*;
        self.pool
            .install(|| (0..n).into_par_iter().with_min_len(64).for_each(f))
    }
}

#[cfg(test)]
mod test_execution {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    fn visits_every_index<P: ExecutionPolicy>(policy: &P) {
        let counts: Vec<_> = (0..1000).map(|_| AtomicUsize::new(0)).collect();
        policy.parallel_for(counts.len(), |i| {
            counts[i].fetch_add(1, Ordering::Relaxed);
        });
        assert!(counts.iter().all(|c| c.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn sequential_visits_every_index() {
        visits_every_index(&Sequential);
    }

    #[test]
    fn rayon_visits_every_index() {
        let policy = Rayon::new(4.try_into().unwrap()).unwrap();
        assert_eq!(policy.n_threads(), 4);
        visits_every_index(&policy);
    }
}
