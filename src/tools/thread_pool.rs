//! Fixed-size worker pool with a wait-all barrier

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct State {
    tasks: VecDeque<Job>,
    running: usize,
    stop: bool,
}

struct Shared {
    state: Mutex<State>,
    task_ready: Condvar,
    all_done: Condvar,
}

/// A pool of worker threads consuming a FIFO task queue.
///
/// `wait_all` blocks until the queue is drained and every picked-up task
/// has returned; it is the only suspension point of the macro-element
/// driver, used between coloring classes.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                tasks: VecDeque::new(),
                running: 0,
                stop: false,
            }),
            task_ready: Condvar::new(),
            all_done: Condvar::new(),
        });

        let workers = (0..threads)
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || worker_loop(&shared))
            })
            .collect();

        Self { shared, workers }
    }

    /// Enqueue a task for execution
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.shared.state.lock().unwrap();
            assert!(!state.stop, "execute on a stopped pool");
            state.tasks.push_back(Box::new(job));
        }
        self.shared.task_ready.notify_one();
    }

    /// Block until the queue is empty and no task is running
    pub fn wait_all(&self) {
        let mut state = self.shared.state.lock().unwrap();
        while state.running > 0 || !state.tasks.is_empty() {
            state = self.shared.all_done.wait(state).unwrap();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shared.state.lock().unwrap().stop = true;
        self.shared.task_ready.notify_all();
        for w in self.workers.drain(..) {
            let _ = w.join();
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let mut state = shared.state.lock().unwrap();
            loop {
                if let Some(job) = state.tasks.pop_front() {
                    // count the task as running before the lock drops, so
                    // wait_all cannot observe an empty idle pool mid-handoff
                    state.running += 1;
                    break job;
                }
                if state.stop {
                    return;
                }
                state = shared.task_ready.wait(state).unwrap();
            }
        };
        job();
        let mut state = shared.state.lock().unwrap();
        state.running -= 1;
        if state.running == 0 && state.tasks.is_empty() {
            shared.all_done.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_all_tasks() {
        let pool = ThreadPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.wait_all();
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn wait_all_is_a_barrier_between_batches() {
        let pool = ThreadPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        for round in 1..=3 {
            for _ in 0..10 {
                let counter = Arc::clone(&counter);
                pool.execute(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
            pool.wait_all();
            assert_eq!(counter.load(Ordering::SeqCst), round * 10);
        }
    }

    #[test]
    fn wait_all_on_idle_pool_returns() {
        let pool = ThreadPool::new(1);
        pool.wait_all();
    }
}
