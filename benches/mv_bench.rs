use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Mutex;

use common::comm;
use common::icrs::triple2icrs;
use common::mv::{mv, mv_init};
use common::randdp::randlc;

const N: usize = 1000;
const NNZ_PER_ROW: usize = 8;
const P: usize = 4;
const ROUNDS: usize = 10;

struct System {
    triples: Vec<(usize, usize, f64)>,
    part: Vec<usize>,
    vdist: Vec<usize>,
    udist: Vec<usize>,
}

fn random_system() -> System {
    let mut seed = 314159265.0;
    let a = 1220703125.0;

    let mut triples = Vec::new();
    let mut part = Vec::new();
    let mut taken = std::collections::HashSet::new();
    for i in 0..N {
        // the diagonal plus a handful of random off-diagonal entries per row
        taken.insert((i, i));
        triples.push((i, i, 1.0));
        part.push(i % P);
        for _ in 0..NNZ_PER_ROW - 1 {
            let j = (randlc(&mut seed, a) * N as f64) as usize % N;
            if taken.insert((i, j)) {
                triples.push((i, j, randlc(&mut seed, a) - 0.5));
                part.push((randlc(&mut seed, a) * P as f64) as usize % P);
            }
        }
    }
    let vdist = (0..N).map(|g| g % P).collect();
    let udist = (0..N).map(|g| g % P).collect();
    System {
        triples,
        part,
        vdist,
        udist,
    }
}

// The pool, channel mesh, and plan are built once per worker before timing
// starts; rank 0 drives the criterion loop and broadcasts a go flag so every
// worker runs the same kernel batches, while the barrier inside mv keeps the
// measured time on rank 0 covering the whole distributed product.
fn bench_mv(c: &mut Criterion) {
    let sys = random_system();

    c.bench_function("mv 1000x1000 p=4, 10 kernel calls", |b| {
        let b = Mutex::new(b);
        comm::run_spmd(P, |comm| {
            let s = comm.rank();
            let mut ia = Vec::new();
            let mut ja = Vec::new();
            let mut a = Vec::new();
            for (k, &(i, j, v)) in sys.triples.iter().enumerate() {
                if sys.part[k] == s {
                    ia.push(i);
                    ja.push(j);
                    a.push(v);
                }
            }
            let mat = triple2icrs(N, ia, ja, a);
            let vindex: Vec<usize> = (0..N).filter(|&g| sys.vdist[g] == s).collect();
            let uindex: Vec<usize> = (0..N).filter(|&g| sys.udist[g] == s).collect();
            let v = vec![1.0f64; vindex.len()];
            let mut u = vec![0.0f64; uindex.len()];
            let plan = mv_init(comm, N, &mat, &vindex, &uindex);

            if comm.rank() == 0 {
                let mut b = b.lock().unwrap();
                b.iter(|| {
                    comm.broadcast_ints(0, Some(vec![1]));
                    for _ in 0..ROUNDS {
                        mv(comm, &mat, &plan, &v, &mut u);
                    }
                });
                comm.broadcast_ints(0, Some(vec![0]));
            } else {
                while comm.broadcast_ints(0, None)[0] == 1 {
                    for _ in 0..ROUNDS {
                        mv(comm, &mat, &plan, &v, &mut u);
                    }
                }
            }
        });
    });
}

criterion_group!(benches, bench_mv);
criterion_main!(benches);
