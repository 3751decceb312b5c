// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A fixed pool of worker threads for batches of independent work.
//!
//! Every item handed to a batch is borrowed mutably and exclusively by the
//! worker that processes it, so items of one batch always write disjoint
//! outputs. The only synchronization is the barrier at the end of the batch.


use std::num::NonZero;
use std::sync::OnceLock;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::Result;

const MIN_PARALLEL_ITEMS_DEFAULT: usize = 128;

pub struct WorkGroup {
    pool: Option<ThreadPool>,
    worker_count: usize,
    min_parallel_items: usize,
}

static GLOBAL: OnceLock<WorkGroup> = OnceLock::new();

impl WorkGroup {
    /// Starts `worker_count` persistent worker threads.
    pub fn new(worker_count: usize) -> Result<Self> {
        let worker_count = worker_count.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|index| format!("gf2mat-worker-{index}"))
            .build()?;
        Ok(Self {
            pool: Some(pool),
            worker_count,
            min_parallel_items: MIN_PARALLEL_ITEMS_DEFAULT,
        })
    }

    /// Starts one worker per available hardware thread.
    pub fn with_available_parallelism() -> Result<Self> {
        Self::new(available_parallelism())
    }

    /// The process-wide group, backed by the rayon global pool.
    #[must_use]
    pub fn global() -> &'static WorkGroup {
        GLOBAL.get_or_init(|| WorkGroup {
            pool: None,
            worker_count: rayon::current_num_threads().max(1),
            min_parallel_items: MIN_PARALLEL_ITEMS_DEFAULT,
        })
    }

    /// Batches with fewer items than this run inline on the calling thread.
    #[must_use]
    pub fn with_min_parallel_items(mut self, min_parallel_items: usize) -> Self {
        self.min_parallel_items = min_parallel_items;
        self
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn process_batch<Item, Work>(&self, items: &mut [Item], work: Work)
    where
        Item: Send,
        Work: Fn(&mut Item) + Sync,
    {
        self.map_batch(items, work);
    }

    /// Applies `work` to every item, one contiguous chunk per worker, and
    /// returns the outputs in item order once every worker is done.
    pub fn map_batch<Item, Output, Work>(&self, items: &mut [Item], work: Work) -> Vec<Output>
    where
        Item: Send,
        Output: Send,
        Work: Fn(&mut Item) -> Output + Sync,
    {
        if self.worker_count == 1 || items.len() < self.min_parallel_items.max(2) {
            return items.iter_mut().map(work).collect();
        }
        let chunk_size = items.len().div_ceil(self.worker_count);
        let mut outputs = Vec::<Vec<Output>>::new();
        outputs.resize_with(items.len().div_ceil(chunk_size), Vec::new);
        let work = &work;
        self.scope(|scope| {
            for (chunk, output) in items.chunks_mut(chunk_size).zip(outputs.iter_mut()) {
                scope.spawn(move |_| {
                    output.extend(chunk.iter_mut().map(work));
                });
            }
        });
        outputs.into_iter().flatten().collect()
    }

    fn scope<'scope, Body>(&self, body: Body)
    where
        Body: FnOnce(&rayon::Scope<'scope>) + Send,
    {
        match &self.pool {
            Some(pool) => pool.scope(body),
            None => rayon::scope(body),
        }
    }
}

impl std::fmt::Debug for WorkGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkGroup")
            .field("worker_count", &self.worker_count)
            .field("min_parallel_items", &self.min_parallel_items)
            .field("global", &self.pool.is_none())
            .finish()
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZero::get)
        .unwrap_or(1)
}
