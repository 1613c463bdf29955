/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Workload: the unit of work carried by a [`super::node::Node`].
//! Modeled as a tagged enum rather than a trait object hierarchy —
//! the three shapes a workload can take (a plain closure, a data-parallel
//! `parallel_for`, or a fully custom implementation) are closed and known
//! up front, so matching on a variant reads better here than dynamic
//! dispatch through one trait.

use std::sync::Arc;

use super::node::NodeId;

/// Read-only context handed to a workload when it runs: identifies which
/// node is executing, for logging and for a custom workload that wants to
/// look itself up.
#[derive(Debug, Clone, Copy)]
pub struct WorkloadContext<'a> {
    node_id: NodeId,
    debug_name: &'a str,
}

impl<'a> WorkloadContext<'a> {
    pub fn new(node_id: NodeId, debug_name: &'a str) -> Self {
        Self { node_id, debug_name }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn debug_name(&self) -> &str {
        self.debug_name
    }
}

/// Implemented by workloads that need state or behavior a closure can't
/// conveniently express (the "fully custom" workload kind).
pub trait CustomWorkload: Send + Sync {
    fn run(&self, ctx: &WorkloadContext<'_>);
}

/// The work a [`super::node::Node`] performs once its predecessors have
/// completed.
#[derive(Clone)]
pub enum Workload {
    /// A plain closure run once, on whichever compute resource the
    /// schedule assigns.
    Lambda(Arc<dyn Fn(&WorkloadContext<'_>) + Send + Sync>),
    /// A data-parallel loop of `count` iterations. The macro-scheduler
    /// policies may fan these out across multiple worker threads (the
    /// "parallel-for-inside-node" scenario); run sequentially here when
    /// no fan-out engine is attached.
    ParallelFor {
        count: u32,
        body: Arc<dyn Fn(u32, &WorkloadContext<'_>) + Send + Sync>,
    },
    /// An arbitrary user-supplied implementation.
    Custom(Arc<dyn CustomWorkload>),
}

impl Workload {
    pub fn lambda(f: impl Fn(&WorkloadContext<'_>) + Send + Sync + 'static) -> Self {
        Workload::Lambda(Arc::new(f))
    }

    pub fn parallel_for(count: u32, body: impl Fn(u32, &WorkloadContext<'_>) + Send + Sync + 'static) -> Self {
        Workload::ParallelFor { count, body: Arc::new(body) }
    }

    pub fn custom(workload: impl CustomWorkload + 'static) -> Self {
        Workload::Custom(Arc::new(workload))
    }

    /// Run this workload to completion on the calling thread. Callers that
    /// want `ParallelFor` iterations fanned out across a worker pool
    /// instead of run sequentially should use
    /// `gts_workers::cpu_resource::run_parallel_for` directly rather than
    /// calling through this default.
    pub fn run(&self, ctx: &WorkloadContext<'_>) {
        match self {
            Workload::Lambda(f) => f(ctx),
            Workload::ParallelFor { count, body } => {
                for i in 0..*count {
                    body(i, ctx);
                }
            }
            Workload::Custom(w) => w.run(ctx),
        }
    }
}

impl std::fmt::Debug for Workload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Workload::Lambda(_) => f.debug_tuple("Lambda").finish(),
            Workload::ParallelFor { count, .. } => f.debug_struct("ParallelFor").field("count", count).finish(),
            Workload::Custom(_) => f.debug_tuple("Custom").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn lambda_runs_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let w = Workload::lambda(move |_ctx| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let ctx = WorkloadContext::new(NodeId(0), "n");
        w.run(&ctx);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn parallel_for_runs_every_iteration() {
        let hits = Arc::new(std::sync::Mutex::new(Vec::new()));
        let h = hits.clone();
        let w = Workload::parallel_for(5, move |i, _ctx| {
            h.lock().unwrap().push(i);
        });
        let ctx = WorkloadContext::new(NodeId(1), "pf");
        w.run(&ctx);
        assert_eq!(*hits.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    struct CountingCustom(AtomicU32);
    impl CustomWorkload for CountingCustom {
        fn run(&self, _ctx: &WorkloadContext<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn custom_workload_runs() {
        let w = Workload::custom(CountingCustom(AtomicU32::new(0)));
        let ctx = WorkloadContext::new(NodeId(2), "custom");
        w.run(&ctx);
        if let Workload::Custom(c) = &w {
            // Downcast isn't available (no Any bound); just confirm no panic
            // and that the context carries the right identity instead.
            let _ = c;
        }
        assert_eq!(ctx.node_id(), NodeId(2));
    }
}
