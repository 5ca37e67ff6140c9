//! A small standalone demonstration of the `segfit` engine, exercised
//! against an in-memory host rather than a real trace file. This stands in
//! for a trace-driver harness without attempting to replicate one: no trace
//! file parsing, no cycle-accurate timing, no Makefile-driven benchmark
//! suite. It just replays a short allocation script and reports the
//! resulting space utilization, the same sanity check a trace-driver run
//! would perform at a much larger scale.

mod logger;

use log::LevelFilter;
use segfit::{Allocator, VecHost};

/// One step of the inline allocation script.
enum Step {
    Alloc { name: &'static str, size: u32 },
    Free { name: &'static str },
    Realloc { name: &'static str, size: u32 },
}

use Step::{Alloc, Free, Realloc};

fn main() {
    logger::init(LevelFilter::Trace).expect("logger installs exactly once");

    let mut alloc = Allocator::new(VecHost::new());
    alloc.init().expect("the in-memory host never refuses to grow");

    // A small, hand-written workload: allocate a handful of blocks of
    // varying size, free some out of order to force coalescing, grow one
    // block past its neighbor, and grow another block past the end of the
    // arena (exercising the realloc-of-the-last-block fast path).
    let script = [
        Alloc { name: "a", size: 24 },
        Alloc { name: "b", size: 512 },
        Alloc { name: "c", size: 16 },
        Alloc { name: "d", size: 4096 },
        Free { name: "b" },
        Realloc { name: "a", size: 400 },
        Alloc { name: "e", size: 8192 },
        Free { name: "c" },
        Free { name: "d" },
        Realloc { name: "e", size: 16_384 },
        Free { name: "a" },
        Free { name: "e" },
    ];

    let mut live: Vec<(&'static str, segfit::BlockPtr)> = Vec::new();
    let mut requested_total: u64 = 0;

    for step in script {
        match step {
            Alloc { name, size } => {
                let bp = alloc
                    .allocate(size)
                    .expect("the in-memory host never refuses to grow")
                    .expect("a non-zero size request never returns null");
                requested_total += u64::from(size);
                live.push((name, bp));
                println!("allocate({name}, {size}) -> {:#x}", bp.0);
            }
            Free { name } => {
                let idx = live.iter().position(|(n, _)| *n == name).expect("double free in script");
                let (_, bp) = live.remove(idx);
                alloc.free(Some(bp));
                println!("free({name})");
            }
            Realloc { name, size } => {
                let idx = live.iter().position(|(n, _)| *n == name).expect("realloc of unknown block");
                let (_, old) = live[idx];
                let new_bp = alloc
                    .realloc(Some(old), size)
                    .expect("the in-memory host never refuses to grow")
                    .expect("a non-zero size request never returns null");
                requested_total += u64::from(size);
                live[idx].1 = new_bp;
                println!("realloc({name}, {size}) -> {:#x}", new_bp.0);
            }
        }
    }

    for (name, bp) in &live {
        alloc.free(Some(*bp));
        println!("free({name}) [final cleanup]");
    }

    let (lo, hi) = alloc.arena_bounds();
    let arena_bytes = u64::from(hi - lo);
    let utilization_pct = requested_total * 100 / arena_bytes;
    println!("arena grew to {arena_bytes} bytes for {requested_total} requested payload bytes ({utilization_pct}% utilization)");

    let ok = alloc.check();
    println!("consistency check: {}", if ok { "PASS" } else { "FAIL" });
    assert!(ok, "the allocator must be internally consistent after the script runs");
}
