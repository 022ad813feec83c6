//! BFS benchmark demo over the host reference backend
//!
//! Wires a breadth-first-search wavefront kernel through the harness:
//! levels propagate from a source vertex over an edge list until the
//! level vector reaches its fixed point. Prints the per-trial timing
//! records as JSON lines for downstream formatting.
//!
//! ```bash
//! cargo run --example bfs
//! ```

use medir::{
    decode_slice, encode_slice, ArgContainer, Harness, HarnessConfig, HostBackend, LaunchContext,
    Run,
};

const SLOT_MATRIX_IDXS: u32 = 0;
const SLOT_INPUT: u32 = 2;
const SLOT_OUTPUT: u32 = 6;

fn edge_list(edges: &[(u32, u32)]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(edges.len() * 8);
    for &(src, dst) in edges {
        bytes.extend_from_slice(&src.to_le_bytes());
        bytes.extend_from_slice(&dst.to_le_bytes());
    }
    bytes
}

fn bfs_step(ctx: &mut LaunchContext<'_>) -> medir::Result<()> {
    let edges = ctx.read_global(SLOT_MATRIX_IDXS)?;
    let input: Vec<i32> = decode_slice(&ctx.read_global(SLOT_INPUT)?);

    let mut levels = input.clone();
    for edge in edges.chunks_exact(8) {
        let src = u32::from_le_bytes([edge[0], edge[1], edge[2], edge[3]]) as usize;
        let dst = u32::from_le_bytes([edge[4], edge[5], edge[6], edge[7]]) as usize;
        if input[src] != 0 && levels[dst] == 0 {
            levels[dst] = input[src] + 1;
        }
    }

    let bytes = encode_slice(&levels);
    ctx.global_mut(SLOT_OUTPUT)?.copy_from_slice(&bytes);
    Ok(())
}

fn main() -> medir::Result<()> {
    // A small graph: two chains joined at vertex 4.
    let edges = [(0, 1), (1, 2), (2, 3), (0, 4), (4, 5), (3, 5)];
    let n = 6usize;

    // Source vertex 0 starts at level 1; everything else undiscovered.
    let mut initial = vec![0i32; n];
    initial[0] = 1;
    let gold = vec![1i32, 2, 3, 4, 2, 3];

    let args = ArgContainer::new(edge_list(&edges), Vec::new())
        .with_vectors(&initial, &vec![0i32; n])
        .with_scalars(1, 0)
        .with_size_args(vec![n as u32]);

    let config = HarnessConfig::default().with_trials(3);
    let mut harness = Harness::new(HostBackend::new(bfs_step), args, config)?;

    println!("device: {}", harness.device_name());
    let run = Run::linear(n, 1);
    let trials = harness.benchmark(&run, &gold)?;

    for records in &trials {
        for record in records {
            let line = serde_json::to_string(record).map_err(|e| medir::MedirError::Device {
                reason: e.to_string(),
            })?;
            println!("{line}");
        }
    }
    println!("timeout budget after benchmarking: {:?}", harness.timeout());
    Ok(())
}
