//! End-to-end harness tests over the host reference backend
//!
//! The kernel under test is a BFS wavefront step over an edge list:
//! out[dst] = in[src] + 1 for every edge whose source is discovered and
//! whose destination is not. Repeated launches converge to BFS levels,
//! which exercises the full executor state machine: binding, ping-pong
//! role swaps, temp zeroing, download, termination, and aggregation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use medir::{
    decode_slice, encode_slice, ArgContainer, Correctness, Harness, HarnessConfig, HostBackend,
    LaunchContext, MedirError, RecordKind, Run,
};

const SLOT_MATRIX_IDXS: u32 = 0;
const SLOT_INPUT: u32 = 2;
const SLOT_OUTPUT: u32 = 6;
const SLOT_TEMP: u32 = 7;
const SLOT_NODE_COUNT: u32 = 8;

/// One BFS wavefront step over a (src, dst) edge list.
///
/// Also verifies the temporary-global zeroing contract from inside the
/// launch: the temp buffer must be all zeros on entry, and the kernel
/// deliberately dirties it so only the harness can be responsible for
/// the zeros seen on the next launch.
fn bfs_kernel(saw_dirty_temp: Arc<AtomicBool>) -> impl FnMut(&mut LaunchContext<'_>) -> medir::Result<()> + Send {
    move |ctx: &mut LaunchContext<'_>| {
        let temp = ctx.read_global(SLOT_TEMP)?;
        if temp.iter().any(|&b| b != 0) {
            saw_dirty_temp.store(true, Ordering::SeqCst);
        }

        let edges = ctx.read_global(SLOT_MATRIX_IDXS)?;
        let input: Vec<i32> = decode_slice(&ctx.read_global(SLOT_INPUT)?);
        let n_bytes = ctx.scalar(SLOT_NODE_COUNT)?;
        let n = u32::from_le_bytes([n_bytes[0], n_bytes[1], n_bytes[2], n_bytes[3]]) as usize;
        assert_eq!(input.len(), n);

        let mut levels = input.clone();
        for edge in edges.chunks_exact(8) {
            let src = u32::from_le_bytes([edge[0], edge[1], edge[2], edge[3]]) as usize;
            let dst = u32::from_le_bytes([edge[4], edge[5], edge[6], edge[7]]) as usize;
            if input[src] != 0 && levels[dst] == 0 {
                levels[dst] = input[src] + 1;
            }
        }

        let out_bytes = encode_slice(&levels);
        ctx.global_mut(SLOT_OUTPUT)?.copy_from_slice(&out_bytes);
        ctx.global_mut(SLOT_TEMP)?.fill(0xEE);
        Ok(())
    }
}

fn edge_list(edges: &[(u32, u32)]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(edges.len() * 8);
    for &(src, dst) in edges {
        bytes.extend_from_slice(&src.to_le_bytes());
        bytes.extend_from_slice(&dst.to_le_bytes());
    }
    bytes
}

fn path_graph_args() -> ArgContainer<i32> {
    // 0 -> 1 -> 2 -> 3, source 0 at level 1
    ArgContainer::new(edge_list(&[(0, 1), (1, 2), (2, 3)]), Vec::new())
        .with_vectors(&[1i32, 0, 0, 0], &[0i32, 0, 0, 0])
        .with_scalars(1, 0)
        .with_temp_globals(vec![16])
        .with_size_args(vec![4])
}

#[test]
fn test_bfs_converges_with_exact_record_count() {
    let saw_dirty = Arc::new(AtomicBool::new(false));
    let backend = HostBackend::new(bfs_kernel(saw_dirty.clone()));
    let config = HarnessConfig::default().with_trials(2);
    let mut harness = Harness::new(backend, path_graph_args(), config).expect("harness");

    let run = Run::linear(4, 1);
    let gold = [1i32, 2, 3, 4];
    let trials = harness.benchmark(&run, &gold).expect("benchmark");

    assert_eq!(trials.len(), 2);
    for (trial_idx, records) in trials.iter().enumerate() {
        // 4 launches to the fixed point, then median and sum
        assert_eq!(records.len(), 6, "trial {trial_idx}");
        let raws: Vec<_> = records
            .iter()
            .filter(|r| r.kind == RecordKind::Raw)
            .collect();
        assert_eq!(raws.len(), 4);
        for (i, record) in raws.iter().enumerate() {
            assert_eq!(record.iteration, Some(i as u32));
            assert_eq!(record.trial, trial_idx as u32);
            assert_eq!(record.verdict, Correctness::NotChecked);
            assert_eq!(record.global, [4, 1, 1]);
        }
        let median = &records[4];
        let sum = &records[5];
        assert_eq!(median.kind, RecordKind::Median);
        assert_eq!(sum.kind, RecordKind::TrialSum);
        assert_eq!(median.verdict, Correctness::Correct);
        assert_eq!(sum.verdict, Correctness::Correct);
        let raw_total: Duration = raws.iter().map(|r| r.duration).sum();
        assert_eq!(sum.duration, raw_total);
    }

    // Temps were dirtied by every launch yet never observed dirty.
    assert!(!saw_dirty.load(Ordering::SeqCst));
}

#[test]
fn test_bad_gold_reported_as_data_not_error() {
    let saw_dirty = Arc::new(AtomicBool::new(false));
    let backend = HostBackend::new(bfs_kernel(saw_dirty));
    let config = HarnessConfig::default().with_trials(1);
    let mut harness = Harness::new(backend, path_graph_args(), config).expect("harness");

    let trials = harness
        .benchmark(&Run::linear(4, 1), &[1i32, 2, 99, 4])
        .expect("benchmark");
    let median = &trials[0][trials[0].len() - 2];
    assert_eq!(median.verdict, Correctness::BadValues);
}

#[test]
fn test_short_gold_not_checked_and_long_gold_bad_length() {
    let saw_dirty = Arc::new(AtomicBool::new(false));
    let backend = HostBackend::new(bfs_kernel(saw_dirty));
    let config = HarnessConfig::default().with_trials(1);
    let mut harness = Harness::new(backend, path_graph_args(), config).expect("harness");

    let trials = harness.benchmark(&Run::linear(4, 1), &[]).expect("benchmark");
    let median = &trials[0][trials[0].len() - 2];
    assert_eq!(median.verdict, Correctness::NotChecked);

    let trials = harness
        .benchmark(&Run::linear(4, 1), &[1i32, 2, 3, 4, 5])
        .expect("benchmark");
    let median = &trials[0][trials[0].len() - 2];
    assert_eq!(median.verdict, Correctness::BadLength);
}

#[test]
fn test_non_converging_kernel_hits_iteration_ceiling() {
    // Every launch increments element 0, so no fixed point exists.
    let kernel = |ctx: &mut LaunchContext<'_>| {
        let mut values: Vec<i32> = decode_slice(&ctx.read_global(SLOT_INPUT)?);
        values[0] += 1;
        let bytes = encode_slice(&values);
        ctx.global_mut(SLOT_OUTPUT)?.copy_from_slice(&bytes);
        Ok(())
    };
    let args = ArgContainer::new(Vec::new(), Vec::new())
        .with_vectors(&[0i32, 0], &[0i32, 0]);
    let config = HarnessConfig::default().with_trials(1).with_max_iterations(8);
    let mut harness = Harness::new(HostBackend::new(kernel), args, config).expect("harness");

    let err = harness.benchmark(&Run::linear(2, 1), &[]).unwrap_err();
    assert!(matches!(err, MedirError::DidNotConverge { iterations: 8 }));
}

#[test]
fn test_tolerance_mode_terminates_on_small_residual() {
    // Geometric decay toward zero; exact equality would take ~150
    // launches to reach denormal extinction, delta terminates early.
    let kernel = |ctx: &mut LaunchContext<'_>| {
        let values: Vec<f32> = decode_slice(&ctx.read_global(SLOT_INPUT)?);
        let halved: Vec<f32> = values.iter().map(|v| v * 0.5).collect();
        let bytes = encode_slice(&halved);
        ctx.global_mut(SLOT_OUTPUT)?.copy_from_slice(&bytes);
        Ok(())
    };
    let args = ArgContainer::new(Vec::new(), Vec::new())
        .with_vectors(&[1.0f32, 0.5], &[0.0f32, 0.0]);
    let config = HarnessConfig::default().with_trials(1).with_delta(1e-3);
    let mut harness = Harness::new(HostBackend::new(kernel), args, config).expect("harness");

    let trials = harness.benchmark(&Run::linear(2, 1), &[]).expect("benchmark");
    let raw_count = trials[0]
        .iter()
        .filter(|r| r.kind == RecordKind::Raw)
        .count();
    assert!(raw_count < 20, "tolerance mode ran {raw_count} launches");
}

#[test]
fn test_timeout_only_lowered() {
    let saw_dirty = Arc::new(AtomicBool::new(false));
    let backend = HostBackend::new(bfs_kernel(saw_dirty));
    let initial = Duration::from_secs(60);
    let config = HarnessConfig::default()
        .with_trials(3)
        .with_timeout(initial);
    let mut harness = Harness::new(backend, path_graph_args(), config).expect("harness");

    harness.benchmark(&Run::linear(4, 1), &[]).expect("benchmark");
    // Host launches take microseconds; the budget must have shrunk.
    assert!(harness.timeout() < initial);
}

#[test]
fn test_device_name_reported() {
    let backend =
        HostBackend::new(|_ctx: &mut LaunchContext<'_>| Ok(())).with_name("medir test device");
    let args = ArgContainer::new(Vec::new(), Vec::new())
        .with_vectors(&[0i32], &[0i32]);
    let harness =
        Harness::new(backend, args, HarnessConfig::default()).expect("harness");
    assert_eq!(harness.device_name(), "medir test device");
}

#[test]
fn test_rejects_zero_trials() {
    let backend = HostBackend::new(|_ctx: &mut LaunchContext<'_>| Ok(()));
    let args = ArgContainer::new(Vec::new(), Vec::new())
        .with_vectors(&[0i32], &[0i32]);
    let err = Harness::new(backend, args, HarnessConfig::default().with_trials(0)).unwrap_err();
    assert!(matches!(err, MedirError::InvalidConfiguration { .. }));
}
