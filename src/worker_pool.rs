use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// A task run by the pool: no arguments, no return value — it must capture
/// its inputs and write to disjoint outputs (spec §4.4 invariant (b)).
pub type Task<'a> = dyn FnMut() + Send + 'a;

struct RawTaskPtr(*mut (dyn FnMut() + Send + 'static));
unsafe impl Send for RawTaskPtr {}

struct SharedState {
    /// One slot per helper thread (`parallelism - 1`); `None` when idle.
    slots: Mutex<Vec<Option<RawTaskPtr>>>,
    /// Bumped once per `run()` call; helper threads park until it changes so
    /// a thread with no task this round (`queued_count < helper_count`)
    /// doesn't spin or steal another thread's completion signal.
    generation: Mutex<u64>,
    new_tasks_available: Condvar,
    tasks_completed: Condvar,
    tasks_to_complete: Mutex<usize>,
    stop: AtomicBool,
}

/// A fixed-parallelism fork-join executor.
///
/// `P - 1` helper threads are pre-spawned at construction; the caller thread
/// counts as the `P`-th worker and participates in every [`WorkerPool::run`].
/// Task index 0 of the slice passed to `run` is guaranteed to execute on the
/// caller thread. There is no per-task cancellation: a panicking task aborts
/// the process rather than being caught, matching the original engine's
/// deliberate choice to leave exception handling out of the hot path.
pub struct WorkerPool {
    shared: Arc<SharedState>,
    threads: Vec<JoinHandle<()>>,
    parallelism: usize,
}

impl WorkerPool {
    pub fn new(parallelism: usize) -> Self {
        assert!(parallelism > 0);

        let helper_count = parallelism - 1;
        let shared = Arc::new(SharedState {
            slots: Mutex::new((0..helper_count).map(|_| None).collect()),
            generation: Mutex::new(0),
            new_tasks_available: Condvar::new(),
            tasks_completed: Condvar::new(),
            tasks_to_complete: Mutex::new(0),
            stop: AtomicBool::new(false),
        });

        let threads = (0..helper_count)
            .map(|t| {
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("springlab-worker-{t}"))
                    .spawn(move || Self::thread_loop(shared, t))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        WorkerPool {
            shared,
            threads,
            parallelism,
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Runs every task in `tasks`, blocking until all have completed.
    /// `tasks[0]` is guaranteed to run on the calling thread.
    pub fn run(&self, tasks: &mut [Box<Task<'_>>]) {
        assert!(!tasks.is_empty());

        let helper_count = self.threads.len();
        let queued_count = helper_count.min(tasks.len() - 1);
        let inline_count = tasks.len() - queued_count;

        // Split so the *excess* tasks (beyond what helpers can take) run
        // inline, and task 0 is always among them.
        let (inline_tasks, queued_tasks) = tasks.split_at_mut(inline_count);

        {
            let mut slots = self.shared.slots.lock().unwrap();
            for (t, slot) in slots.iter_mut().enumerate() {
                *slot = if t < queued_count {
                    let task_ref: &mut Task<'_> = &mut *queued_tasks[t];
                    // Safety: the raw pointer is only dereferenced by a
                    // helper thread before `run` returns, and `run` does not
                    // return until every task has completed (the
                    // `tasks_completed` wait below), so the borrow never
                    // outlives the data it points to despite the lifetime
                    // erasure.
                    let erased: *mut (dyn FnMut() + Send + 'static) =
                        unsafe { std::mem::transmute(task_ref as *mut Task<'_>) };
                    Some(RawTaskPtr(erased))
                } else {
                    None
                };
            }
        }

        {
            let mut to_complete = self.shared.tasks_to_complete.lock().unwrap();
            *to_complete = queued_count;
        }
        {
            let mut generation = self.shared.generation.lock().unwrap();
            *generation = generation.wrapping_add(1);
        }
        self.shared.new_tasks_available.notify_all();

        for task in inline_tasks.iter_mut() {
            task();
        }

        if queued_count > 0 {
            let guard = self.shared.tasks_to_complete.lock().unwrap();
            let _guard = self
                .shared
                .tasks_completed
                .wait_while(guard, |n| *n > 0)
                .unwrap();
        }
    }

    fn thread_loop(shared: Arc<SharedState>, t: usize) {
        enable_flush_to_zero();

        let mut last_generation = 0u64;
        loop {
            let generation = {
                let mut generation = shared.generation.lock().unwrap();
                while *generation == last_generation && !shared.stop.load(Ordering::Acquire) {
                    generation = shared.new_tasks_available.wait(generation).unwrap();
                }
                if shared.stop.load(Ordering::Acquire) {
                    return;
                }
                *generation
            };
            last_generation = generation;

            let task_ptr = {
                let mut slots = shared.slots.lock().unwrap();
                slots[t].take()
            };

            // A thread with no task this round (queued_count < helper_count)
            // never touches `tasks_to_complete`: only threads that actually
            // ran a task may signal completion, so the barrier can't fire
            // early while a genuinely busy thread is still working.
            if let Some(RawTaskPtr(ptr)) = task_ptr {
                let task: &mut (dyn FnMut() + Send + 'static) = unsafe { &mut *ptr };
                task();

                let mut to_complete = shared.tasks_to_complete.lock().unwrap();
                *to_complete -= 1;
                if *to_complete == 0 {
                    shared.tasks_completed.notify_all();
                }
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.new_tasks_available.notify_all();
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}

/// Sets flush-to-zero / denormals-are-zero on the calling thread's SIMD
/// control word. Denormal floats can cost up to 100x the nominal cycle
/// count in the spring-relaxation inner loop, so every worker thread (and
/// the caller, via [`enable_flush_to_zero_on_current_thread`]) sets this
/// once at start-up. A no-op on targets without the relevant control
/// register.
#[allow(deprecated)]
pub fn enable_flush_to_zero() {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        use std::arch::x86_64::{_mm_getcsr, _mm_setcsr};
        // MXCSR bit 15 (FTZ) and bit 6 (DAZ); no stable `core::arch` wrapper
        // exists for DAZ, so the control word is set directly.
        const FLUSH_TO_ZERO: u32 = 1 << 15;
        const DENORMALS_ARE_ZERO: u32 = 1 << 6;
        _mm_setcsr(_mm_getcsr() | FLUSH_TO_ZERO | DENORMALS_ARE_ZERO);
    }
}
