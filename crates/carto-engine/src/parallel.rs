//! Worker pool
//!
//! Scoped worker threads pulling items from a shared index, so slow layers
//! do not hold up a whole pre-assigned chunk.

use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Bounded pool of scoped worker threads.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    threads: usize,
}

impl WorkerPool {
    /// Pool with `threads` workers, at least one.
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Map `f` over `items`, keeping the input order in the result.
    ///
    /// A panic in `f` is re-raised on the calling thread once every worker
    /// has stopped.
    pub fn map<T, U, F>(&self, items: &[T], f: F) -> Vec<U>
    where
        T: Sync,
        U: Send,
        F: Fn(usize, &T) -> U + Sync,
    {
        let num_threads = self.threads.min(items.len());
        if num_threads <= 1 {
            return items.iter().enumerate().map(|(i, item)| f(i, item)).collect();
        }

        let next = AtomicUsize::new(0);
        let mut results: Vec<(usize, U)> = Vec::with_capacity(items.len());
        thread::scope(|s| {
            let handles: Vec<_> = (0..num_threads)
                .map(|_| {
                    s.spawn(|| {
                        let mut local = Vec::new();
                        loop {
                            let i = next.fetch_add(1, Ordering::Relaxed);
                            let Some(item) = items.get(i) else {
                                break;
                            };
                            local.push((i, f(i, item)));
                        }
                        local
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(local) => results.extend(local),
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
        });

        results.sort_by_key(|(i, _)| *i);
        results.into_iter().map(|(_, u)| u).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_map_keeps_order() {
        let pool = WorkerPool::new(4);
        let items: Vec<u32> = (0..100).collect();
        let out = pool.map(&items, |_, x| x * 2);
        assert_eq!(out, (0..100).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_thread_and_empty() {
        let pool = WorkerPool::new(1);
        assert_eq!(pool.map(&[1, 2, 3], |i, x| i + x), vec![1, 3, 5]);
        let empty: [u8; 0] = [];
        assert!(WorkerPool::new(8).map(&empty, |_, x| *x).is_empty());
    }

    #[test]
    fn test_every_item_visited_once() {
        let pool = WorkerPool::new(3);
        let seen = Mutex::new(HashSet::new());
        let items: Vec<usize> = (0..50).collect();
        pool.map(&items, |i, _| {
            assert!(seen.lock().unwrap().insert(i));
        });
        assert_eq!(seen.lock().unwrap().len(), 50);
    }

    #[test]
    fn test_zero_threads_runs_on_caller() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.threads(), 1);
        let caller = thread::current().id();
        let ids = pool.map(&[1, 2], |_, _| thread::current().id());
        assert!(ids.iter().all(|id| *id == caller));
    }
}
