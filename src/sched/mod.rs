use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use crate::core::{loader::InputParams, rng::Rng};

/// Task index granularity for progress-bar updates; per-task `inc`
/// would serialize the workers on the bar's internal state.
const PROGRESS_BATCH: u64 = 1024;

/// Parallel sample scheduler.
///
/// Tasks are independent Monte Carlo samples claimed from a shared
/// atomic counter, so work may be claimed in any order. Each worker
/// owns one RNG stream seeded with `seed + threadid` (or entropy).
/// Cancellation is cooperative: the flag is polled between tasks and
/// in-flight samples run to completion.
pub enum Scheduler {
    Spp(SppScheduler),
    Spi(SpiScheduler),
}

/// Samples-per-pixel scheduling: `width * height * spp` tasks, task `i`
/// mapping to pixel `(i mod W, (i / W) mod H)`.
pub struct SppScheduler {
    pub width: u32,
    pub height: u32,
    pub spp: u64,
    workers: usize,
    cancel: Arc<AtomicBool>,
}

/// Samples-per-image scheduling: `spi` tasks, each one image sample at
/// a random raster position.
pub struct SpiScheduler {
    pub spi: u64,
    workers: usize,
    cancel: Arc<AtomicBool>,
}

impl SppScheduler {
    pub fn new(width: u32, height: u32, spp: u64, workers: usize) -> Self {
        Self {
            width,
            height,
            spp,
            workers,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SpiScheduler {
    pub fn new(spi: u64, workers: usize) -> Self {
        Self {
            spi,
            workers,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Scheduler {
    pub fn total_tasks(&self) -> u64 {
        match self {
            Scheduler::Spp(s) => s.width as u64 * s.height as u64 * s.spp,
            Scheduler::Spi(s) => s.spi,
        }
    }

    fn workers(&self) -> usize {
        match self {
            Scheduler::Spp(s) => s.workers,
            Scheduler::Spi(s) => s.workers,
        }
    }

    /// Cooperative cancellation handle; setting it stops workers at the
    /// next task boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        match self {
            Scheduler::Spp(s) => s.cancel.clone(),
            Scheduler::Spi(s) => s.cancel.clone(),
        }
    }

    /// Run `task(rng, task_index, threadid)` over all tasks and return
    /// the processed count (the advertised total barring cancellation).
    pub fn run<F>(&self, seed: Option<u32>, task: F) -> u64
    where
        F: Fn(&mut Rng, u64, usize) + Sync,
    {
        let total = self.total_tasks();
        let workers = self.workers().max(1);
        let cancel = self.cancel_flag();
        let next = AtomicU64::new(0);
        let processed = AtomicU64::new(0);

        let progress = indicatif::ProgressBar::new(total);
        progress.set_style(
            indicatif::ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );

        crossbeam::scope(|scope| {
            for threadid in 0..workers {
                let task = &task;
                let next = &next;
                let processed = &processed;
                let cancel = &cancel;
                let progress = progress.clone();
                scope.spawn(move |_| {
                    let mut rng = match seed {
                        Some(seed) => Rng::seeded(seed as u64 + threadid as u64),
                        None => Rng::from_entropy(),
                    };
                    let mut done_since_tick = 0;
                    loop {
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        if index >= total {
                            break;
                        }
                        task(&mut rng, index, threadid);
                        processed.fetch_add(1, Ordering::Relaxed);
                        done_since_tick += 1;
                        if done_since_tick == PROGRESS_BATCH {
                            progress.inc(PROGRESS_BATCH);
                            done_since_tick = 0;
                        }
                    }
                    progress.inc(done_since_tick);
                });
            }
        })
        .expect("render worker panicked");

        progress.finish_and_clear();
        processed.load(Ordering::Relaxed)
    }
}

pub fn create_scheduler_from_params(
    params: &mut InputParams,
    film_size: (u32, u32),
    per_pixel: bool,
) -> anyhow::Result<Scheduler> {
    let workers = params.get_int_or("workers", num_cpus::get() as i64) as usize;
    let res = if per_pixel {
        let spp = params.get_int_or("spp", 16) as u64;
        Scheduler::Spp(SppScheduler::new(film_size.0, film_size.1, spp, workers))
    } else {
        let spi = params.get_int_or("spi", (film_size.0 * film_size.1 * 16) as i64) as u64;
        Scheduler::Spi(SpiScheduler::new(spi, workers))
    };
    Ok(res)
}
