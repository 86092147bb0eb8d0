//! Parallel driver (C7, §4.7): partitions the enumeration into batches,
//! dispatches them to a thread pool via a shared `crossbeam-queue` work
//! queue, merges local aggregators into the global one, and checkpoints
//! the contiguous-prefix watermark.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_queue::SegQueue;
use ctm_core::aggregate::Aggregator;
use ctm_core::codec;
use ctm_core::enumerate::{EnumerationMode as CoreMode, Enumerator};
use ctm_core::machine::Symbol;
use ctm_core::simulate::{self, FilterConfig};
use log::{info, warn};

use crate::checkpoint::{CheckpointFile, CHECKPOINT_FORMAT_VERSION};
use crate::config::RunConfig;
use crate::error::CliError;

#[derive(Debug, Clone, Copy)]
struct Batch {
    index: u128,
    start: u128,
    end: u128,
}

type TaskResult = (Batch, Aggregator);

/// Calling this function is a hint to the compiler that this code path is unlikely to be executed.
#[cold]
fn cold() {}

pub struct RunOutcome {
    pub aggregator: Aggregator,
    pub enumeration_size: u128,
}

/// Run (or resume) a full computation to completion, honoring Ctrl-C by
/// finishing in-flight batches, writing a final checkpoint, and returning
/// early with whatever watermark was reached.
pub fn run(config: &RunConfig, resume: bool) -> Result<RunOutcome, CliError> {
    let mode = if config.use_reduced_enumeration {
        CoreMode::Reduced
    } else {
        CoreMode::Raw
    };
    let enumerator = Enumerator::new(config.n_states, mode);
    let enumeration_size = config
        .num_machines_to_run
        .map(|n| n.min(enumerator.size()))
        .unwrap_or_else(|| enumerator.size());

    let checkpoint_path = std::path::Path::new(&config.checkpoint_path);
    let (mut global, mut watermark, mut completion_applied) = if resume && checkpoint_path.exists()
    {
        let checkpoint = CheckpointFile::load(checkpoint_path)?;
        checkpoint.verify_compatible(
            checkpoint_path,
            config.n_states,
            config.use_reduced_enumeration,
        )?;
        info!(
            "resuming from checkpoint at batch watermark {}",
            checkpoint.watermark
        );
        (
            checkpoint.aggregator,
            checkpoint.watermark,
            checkpoint.completion_applied,
        )
    } else {
        (Aggregator::new(), 0u128, false)
    };

    if completion_applied {
        info!("checkpoint was already finalised; nothing further to run");
        return Ok(RunOutcome {
            aggregator: global,
            enumeration_size,
        });
    }

    let batch_size = config.batch_size;
    let batches: Vec<Batch> = {
        let mut batches = Vec::new();
        let mut start = watermark * batch_size;
        let mut index = watermark;
        while start < enumeration_size {
            let end = (start + batch_size).min(enumeration_size);
            batches.push(Batch { index, start, end });
            start = end;
            index += 1;
        }
        batches
    };
    let total_batches = watermark + batches.len() as u128;

    let keep_running = Arc::new(AtomicBool::new(true));
    // A process can only ever install one global Ctrl-C handler; a run
    // invoked a second time in the same process (as in the resume test
    // below) finds one already set. That leaves Ctrl-C wired to the first
    // run's `keep_running` flag, not fatal for this run, so we only log it.
    let handler_result = ctrlc::set_handler({
        let keep_running = keep_running.clone();
        let mut first_invocation = true;
        move || {
            if first_invocation {
                warn!("received interrupt; finishing in-flight batches and checkpointing");
                keep_running.store(false, Ordering::Relaxed);
                first_invocation = false;
            } else {
                std::process::exit(130);
            }
        }
    });
    if let Err(e) = handler_result {
        warn!("could not install Ctrl-C handler: {e}");
    }

    let num_processes = config.resolved_num_processes().max(1);
    info!("starting run: n_states={}, {} batches, {} threads", config.n_states, batches.len(), num_processes);

    let tasks = Arc::new(SegQueue::new());
    for batch in &batches {
        tasks.push(*batch);
    }
    let results = Arc::new(SegQueue::<TaskResult>::new());
    let active_threads = Arc::new(AtomicUsize::new(num_processes));
    let retry_counts: Arc<Mutex<HashMap<u128, u32>>> = Arc::new(Mutex::new(HashMap::new()));
    let crashed: Arc<Mutex<Option<Batch>>> = Arc::new(Mutex::new(None));

    let n_states = config.n_states;
    let max_runtime_steps = config.max_runtime_steps;
    let blank = Symbol::new(config.blank_symbol)
        .ok_or_else(|| CliError::Configuration("blank_symbol must be 0 or 1".into()))?;
    let enumerator = Arc::new(enumerator);

    let handles: Vec<_> = (0..num_processes)
        .map(|_| {
            let keep_running = keep_running.clone();
            let tasks = tasks.clone();
            let results = results.clone();
            let active_threads = active_threads.clone();
            let enumerator = enumerator.clone();
            let retry_counts = retry_counts.clone();
            let crashed = crashed.clone();
            std::thread::spawn(move || {
                worker_loop(
                    keep_running,
                    active_threads,
                    tasks,
                    results,
                    retry_counts,
                    crashed,
                    enumerator,
                    n_states,
                    max_runtime_steps,
                    blank,
                )
            })
        })
        .collect();

    let mut pending: HashMap<u128, Aggregator> = HashMap::new();
    let mut batches_since_checkpoint: u64 = 0;

    loop {
        while let Some((batch, local)) = results.pop() {
            pending.insert(batch.index, local);
        }
        while let Some(local) = pending.remove(&watermark) {
            global.merge(&local);
            watermark += 1;
            batches_since_checkpoint += 1;
        }

        if config.checkpoint_interval > 0
            && batches_since_checkpoint >= config.checkpoint_interval
        {
            write_checkpoint(config, checkpoint_path, &global, watermark, false)?;
            batches_since_checkpoint = 0;
        }

        if watermark >= total_batches || active_threads.load(Ordering::Relaxed) == 0 {
            break;
        }
        if !keep_running.load(Ordering::Relaxed) {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    for handle in handles {
        let _ = handle.join();
    }
    while let Some((batch, local)) = results.pop() {
        pending.insert(batch.index, local);
    }
    while let Some(local) = pending.remove(&watermark) {
        global.merge(&local);
        watermark += 1;
    }

    if let Some(batch) = crashed.lock().unwrap().take() {
        write_checkpoint(config, checkpoint_path, &global, watermark, false)?;
        return Err(CliError::WorkerCrash {
            start: batch.start,
            end: batch.end,
        });
    }

    let finished = watermark >= total_batches;
    if finished && !config.use_reduced_enumeration {
        completion_applied = true;
    } else if finished {
        global.apply_completion(config.n_states);
        completion_applied = true;
    }

    write_checkpoint(config, checkpoint_path, &global, watermark, completion_applied)?;

    if !finished {
        cold();
        info!("run interrupted at watermark {watermark}/{total_batches}; resume with --resume");
    } else {
        info!("run complete");
    }

    Ok(RunOutcome {
        aggregator: global,
        enumeration_size,
    })
}

fn write_checkpoint(
    config: &RunConfig,
    path: &std::path::Path,
    aggregator: &Aggregator,
    watermark: u128,
    completion_applied: bool,
) -> Result<(), CliError> {
    let checkpoint = CheckpointFile {
        version: CHECKPOINT_FORMAT_VERSION,
        n_states: config.n_states,
        max_runtime_steps: config.max_runtime_steps,
        use_reduced_enumeration: config.use_reduced_enumeration,
        blank_symbol: config.blank_symbol,
        batch_size: config.batch_size,
        watermark,
        completion_applied,
        aggregator: aggregator.clone(),
    };
    checkpoint.save(path)
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    keep_running: Arc<AtomicBool>,
    active_threads: Arc<AtomicUsize>,
    tasks: Arc<SegQueue<Batch>>,
    results: Arc<SegQueue<TaskResult>>,
    retry_counts: Arc<Mutex<HashMap<u128, u32>>>,
    crashed: Arc<Mutex<Option<Batch>>>,
    enumerator: Arc<Enumerator>,
    n_states: u32,
    max_runtime_steps: u64,
    blank: Symbol,
) {
    'outer: while keep_running.load(Ordering::Relaxed) {
        let Some(batch) = tasks.pop() else {
            cold();
            active_threads.fetch_sub(1, Ordering::Relaxed);
            while tasks.is_empty() {
                std::thread::sleep(Duration::from_millis(50));
                if !keep_running.load(Ordering::Relaxed) {
                    break 'outer;
                }
            }
            active_threads.fetch_add(1, Ordering::Relaxed);
            continue;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut local = Aggregator::new();
            for position in batch.start..batch.end {
                let code = enumerator.code_at(position);
                // A code in-range for the enumerator always decodes; a
                // `CodecOutOfRange` here means the enumerator and codec have
                // drifted out of sync, which is fatal for the run rather than
                // a machine to skip silently - panicking lets the
                // catch_unwind/record_worker_failure path above treat it as a
                // crashed batch instead of quietly under-counting the space.
                let table = codec::decode(code, n_states)
                    .unwrap_or_else(|err| panic!("enumerator produced an undecodable code: {err}"));
                let outcome = simulate::simulate(
                    &table,
                    max_runtime_steps,
                    blank,
                    FilterConfig::default(),
                );
                local.record(&outcome);
            }
            local
        }));

        match outcome {
            Ok(local) => results.push((batch, local)),
            Err(_) => {
                cold();
                if record_worker_failure(batch, &retry_counts, &crashed, &tasks, &keep_running) {
                    break 'outer;
                }
            }
        }
    }
    cold();
}

/// Books a worker panic against `batch`. The first failure re-enqueues the
/// batch for another attempt; a second failure for the same batch index
/// marks the run as crashed and signals every worker to stop. Returns
/// whether the caller's loop should stop.
fn record_worker_failure(
    batch: Batch,
    retry_counts: &Mutex<HashMap<u128, u32>>,
    crashed: &Mutex<Option<Batch>>,
    tasks: &SegQueue<Batch>,
    keep_running: &AtomicBool,
) -> bool {
    let mut counts = retry_counts.lock().unwrap();
    let attempts = counts.entry(batch.index).or_insert(0);
    *attempts += 1;
    if *attempts >= 2 {
        *crashed.lock().unwrap() = Some(batch);
        keep_running.store(false, Ordering::Relaxed);
        true
    } else {
        tasks.push(batch);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(tmp: &std::path::Path, n_states: u32) -> RunConfig {
        RunConfig {
            n_states,
            max_runtime_steps: 200,
            use_reduced_enumeration: false,
            blank_symbol: 0,
            checkpoint_interval: 1,
            checkpoint_path: tmp.join("ctm.checkpoint").display().to_string(),
            num_machines_to_run: None,
            save_raw_counts: false,
            num_processes: 1,
            batch_size: 3,
            output_path: tmp.join("distribution.json").display().to_string(),
            log_level: "error".to_string(),
        }
    }

    #[test]
    fn uninterrupted_run_accounts_for_the_whole_raw_space() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 1);
        let outcome = run(&cfg, false).unwrap();
        assert_eq!(
            outcome.aggregator.total_seen(),
            codec::space_size(1) as u64
        );
    }

    #[test]
    fn checkpoint_resume_produces_the_same_final_distribution_as_uninterrupted() {
        let dir_a = tempfile::tempdir().unwrap();
        let cfg_a = config(dir_a.path(), 1);
        let uninterrupted = run(&cfg_a, false).unwrap();

        // Manufacture a checkpoint as if the first batch (codes 0..batch_size)
        // had already been processed, then resume and confirm the remaining
        // batches plus this seeded partial aggregate reconstruct the same
        // final distribution as a single uninterrupted run.
        let dir_b = tempfile::tempdir().unwrap();
        let cfg_b = config(dir_b.path(), 1);
        let blank = Symbol::new(cfg_b.blank_symbol).unwrap();
        let mut seeded = Aggregator::new();
        for code in 0..cfg_b.batch_size {
            let table = codec::decode(code, cfg_b.n_states).unwrap();
            let outcome = simulate::simulate(
                &table,
                cfg_b.max_runtime_steps,
                blank,
                FilterConfig::default(),
            );
            seeded.record(&outcome);
        }
        let checkpoint = CheckpointFile {
            version: CHECKPOINT_FORMAT_VERSION,
            n_states: cfg_b.n_states,
            max_runtime_steps: cfg_b.max_runtime_steps,
            use_reduced_enumeration: cfg_b.use_reduced_enumeration,
            blank_symbol: cfg_b.blank_symbol,
            batch_size: cfg_b.batch_size,
            watermark: 1,
            completion_applied: false,
            aggregator: seeded,
        };
        checkpoint
            .save(std::path::Path::new(&cfg_b.checkpoint_path))
            .unwrap();

        let resumed = run(&cfg_b, true).unwrap();

        assert_eq!(uninterrupted.aggregator.counts(), resumed.aggregator.counts());
        assert_eq!(
            uninterrupted.aggregator.non_halt(),
            resumed.aggregator.non_halt()
        );
    }

    #[test]
    fn first_worker_failure_requeues_the_batch_without_crashing_the_run() {
        let batch = Batch { index: 7, start: 21, end: 24 };
        let retry_counts = Mutex::new(HashMap::new());
        let crashed = Mutex::new(None);
        let tasks = SegQueue::new();
        let keep_running = AtomicBool::new(true);

        let should_stop =
            record_worker_failure(batch, &retry_counts, &crashed, &tasks, &keep_running);

        assert!(!should_stop);
        assert!(crashed.lock().unwrap().is_none());
        assert!(keep_running.load(Ordering::Relaxed));
        assert_eq!(tasks.pop().map(|b| b.index), Some(7));
    }

    #[test]
    fn second_worker_failure_for_the_same_batch_crashes_the_run() {
        let batch = Batch { index: 7, start: 21, end: 24 };
        let retry_counts = Mutex::new(HashMap::new());
        let crashed = Mutex::new(None);
        let tasks = SegQueue::new();
        let keep_running = AtomicBool::new(true);

        record_worker_failure(batch, &retry_counts, &crashed, &tasks, &keep_running);
        let _ = tasks.pop(); // the retry attempt's requeue, consumed as a worker would
        let should_stop =
            record_worker_failure(batch, &retry_counts, &crashed, &tasks, &keep_running);

        assert!(should_stop);
        assert_eq!(crashed.lock().unwrap().map(|b| b.index), Some(7));
        assert!(!keep_running.load(Ordering::Relaxed));
    }
}
