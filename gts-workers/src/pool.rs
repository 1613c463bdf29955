/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! A work-stealing thread pool: one OS thread per worker,
//! a `crossbeam_deque::Worker`/`Stealer` pair per thread for intra-pool
//! stealing, and a shared `Injector` for tasks submitted from outside the
//! pool (node workloads fanning out a `ParallelFor`, or the idle worker
//! itself pulling the next ready node through the registered
//! [`MicroSchedulerResource`]).
//!
//! Each worker's idle loop tries, in order: its own local deque, the
//! shared injector, a random-ish scan of its siblings' deques, and
//! finally the attached bridge (`MicroSchedulerResource::pull`) for the
//! next DAG node. Running a node's workload can itself call
//! [`WorkerPool::spawn`] (a `ParallelFor` body fanning out), so the pool
//! doubles as both the node-level and the within-node work-stealing
//! substrate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use crossbeam_deque::{Injector, Steal, Stealer, Worker as Deque};
use gts_core::sync::Backoff;
use gts_core::task::{Node, NodeId, WorkloadContext};
use gts_core::MicroSchedulerResource;

type PoolTask = Box<dyn FnOnce() + Send + 'static>;

/// A running pool of worker threads plus the shared node arena they run
/// workloads out of.
pub struct WorkerPool {
    injector: Arc<Injector<PoolTask>>,
    stealers: Arc<Vec<Stealer<PoolTask>>>,
    shutdown: Arc<AtomicBool>,
    idle_workers: Arc<AtomicUsize>,
    threads: Mutex<Vec<thread::JoinHandle<()>>>,
    worker_count: usize,
}

impl WorkerPool {
    /// Start `worker_count` threads driving `resource_index` on `bridge`,
    /// running node workloads looked up from `nodes`. Workers run until
    /// [`WorkerPool::shutdown`] is called.
    pub fn start(
        worker_count: usize,
        resource_index: u32,
        bridge: Arc<MicroSchedulerResource>,
        nodes: Arc<[Node]>,
    ) -> Arc<Self> {
        let injector = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let idle_workers = Arc::new(AtomicUsize::new(0));

        let decks: Vec<Deque<PoolTask>> = (0..worker_count).map(|_| Deque::new_fifo()).collect();
        let stealers = Arc::new(decks.iter().map(Deque::stealer).collect::<Vec<_>>());

        let pool = Arc::new(Self {
            injector: injector.clone(),
            stealers: stealers.clone(),
            shutdown: shutdown.clone(),
            idle_workers: idle_workers.clone(),
            threads: Mutex::new(Vec::with_capacity(worker_count)),
            worker_count,
        });

        let mut threads = Vec::with_capacity(worker_count);
        for (id, deck) in decks.into_iter().enumerate() {
            let injector = injector.clone();
            let stealers = stealers.clone();
            let shutdown = shutdown.clone();
            let idle_workers = idle_workers.clone();
            let bridge = bridge.clone();
            let nodes = nodes.clone();
            let pool_for_workload = pool.clone();
            let handle = thread::Builder::new()
                .name(format!("gts-worker-{resource_index}-{id}"))
                .spawn(move || {
                    run_worker_loop(deck, injector, stealers, shutdown, idle_workers, bridge, nodes, pool_for_workload);
                })
                .expect("failed to spawn gts-workers worker thread");
            threads.push(handle);
        }
        *pool.threads.lock().unwrap() = threads;
        pool
    }

    /// Submit a closure to run on any idle worker in this pool. Used for
    /// `ParallelFor` fan-out from inside a node's workload.
    pub fn spawn(&self, task: impl FnOnce() + Send + 'static) {
        self.injector.push(Box::new(task));
    }

    /// Fan `count` iterations of `body` out across this pool and block
    /// the calling thread until every iteration has run. The calling
    /// thread helps drain the pool's own queues while it waits, rather
    /// than only blocking, so a `ParallelFor` called from inside an
    /// already-running worker still makes progress even when every other
    /// worker is itself busy.
    pub fn run_parallel_for(&self, count: u32, body: Arc<dyn Fn(u32, &WorkloadContext<'_>) + Send + Sync>, ctx_node: NodeId, ctx_name: Arc<str>) {
        if count == 0 {
            return;
        }
        let remaining = Arc::new(AtomicUsize::new(count as usize));
        for i in 0..count {
            let body = body.clone();
            let remaining = remaining.clone();
            let ctx_name = ctx_name.clone();
            self.spawn(move || {
                let ctx = WorkloadContext::new(ctx_node, &ctx_name);
                body(i, &ctx);
                remaining.fetch_sub(1, Ordering::AcqRel);
            });
        }

        let mut backoff = Backoff::new();
        while remaining.load(Ordering::Acquire) != 0 {
            if !self.help_once() {
                backoff.spin();
            } else {
                backoff.reset();
            }
        }
    }

    /// Try to run one task from the injector or a sibling's deque,
    /// without touching the `CheckForTask` bridge. Returns whether a task
    /// was actually run.
    fn help_once(&self) -> bool {
        loop {
            match self.injector.steal() {
                Steal::Success(task) => {
                    task();
                    return true;
                }
                Steal::Retry => continue,
                Steal::Empty => break,
            }
        }
        for stealer in self.stealers.iter() {
            loop {
                match stealer.steal() {
                    Steal::Success(task) => {
                        task();
                        return true;
                    }
                    Steal::Retry => continue,
                    Steal::Empty => break,
                }
            }
        }
        false
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn idle_worker_count(&self) -> usize {
        self.idle_workers.load(Ordering::Relaxed)
    }

    /// Signal every worker thread to stop after its current task and join
    /// them. Blocks until every thread has exited.
    ///
    /// Each worker thread holds its own `Arc<WorkerPool>` clone for the
    /// life of its loop, so the pool cannot be reclaimed by `Drop` alone —
    /// callers that want a clean shutdown must call this explicitly.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let mut threads = self.threads.lock().unwrap();
        for handle in threads.drain(..) {
            let _ = handle.join();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_worker_loop(
    deck: Deque<PoolTask>,
    injector: Arc<Injector<PoolTask>>,
    stealers: Arc<Vec<Stealer<PoolTask>>>,
    shutdown: Arc<AtomicBool>,
    idle_workers: Arc<AtomicUsize>,
    bridge: Arc<MicroSchedulerResource>,
    nodes: Arc<[Node]>,
    pool: Arc<WorkerPool>,
) {
    let mut backoff = Backoff::new();
    while !shutdown.load(Ordering::Relaxed) {
        if let Some(task) = deck.pop() {
            task();
            backoff.reset();
            continue;
        }

        match injector.steal_batch_and_pop(&deck) {
            Steal::Success(task) => {
                task();
                backoff.reset();
                continue;
            }
            Steal::Retry => continue,
            Steal::Empty => {}
        }

        let stole = stealers.iter().find_map(|s| match s.steal_batch_and_pop(&deck) {
            Steal::Success(task) => Some(task),
            _ => None,
        });
        if let Some(task) = stole {
            task();
            backoff.reset();
            continue;
        }

        if let Some(node_id) = bridge.pull() {
            let node = &nodes[node_id.index()];
            let ctx = WorkloadContext::new(node_id, &node.debug_name);
            if gts_core::is_enabled(gts_core::CaptureMask::WORKER_POOL_DEBUG) {
                tracing::debug!(target: "gts::worker_pool", node = %node.debug_name, "drained node from bridge");
            }
            // The sole synchronization point between a node going ready
            // (queued by its predecessor's first pass) and it being safe
            // to run (that predecessor's second pass, published after
            // every sibling successor was queued).
            node.wait_until_safe_to_run();
            let started = Instant::now();
            run_workload(node, &ctx, &pool);
            bridge.report_execution_cost(node_id, started.elapsed().as_nanos() as u64);
            bridge.complete(node_id);
            backoff.reset();
            continue;
        }

        idle_workers.fetch_add(1, Ordering::Relaxed);
        backoff.spin();
        idle_workers.fetch_sub(1, Ordering::Relaxed);
    }
}

fn run_workload(node: &Node, ctx: &WorkloadContext<'_>, pool: &Arc<WorkerPool>) {
    use gts_core::task::Workload;
    match &node.workload {
        Workload::ParallelFor { count, body } => {
            pool.run_parallel_for(*count, body.clone(), ctx.node_id(), Arc::from(ctx.debug_name()));
        }
        _ => node.workload.run(ctx),
    }
}
