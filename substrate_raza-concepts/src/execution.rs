/// Executes independent loop iterations, possibly in parallel.
///
/// Every stage of the solver is expressed in terms of this single capability.
/// Iterations may run in any order and on any thread and are only allowed to communicate through
/// atomics.
/// A call to [parallel_for](ExecutionPolicy::parallel_for) returns only after all iterations
/// have completed.
/// Successive calls are therefore separated by a full barrier.
pub trait ExecutionPolicy: Send + Sync {
    /// Name under which this policy is reported
    fn name(&self) -> &'static str;

    /// Number of threads which are used to execute loops
    fn n_threads(&self) -> usize;

    /// Calls `f(i)` for every `i` in `0..n`.
    fn parallel_for<F>(&self, n: usize, f: F)
    where
        F: Fn(usize) + Send + Sync;
}
