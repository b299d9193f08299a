//! Message-passing runtime for SPMD execution: p identical workers, one per
//! thread, exchanging typed packets over per-pair channels.

use crossbeam::channel::{unbounded, Receiver, Sender};
use std::process;
use std::sync::{Arc, Barrier};
use std::time::Instant;

const TAG_BCAST: u32 = 1;
const TAG_SCATTER: u32 = 2;
const TAG_GATHER: u32 = 3;
const TAG_A2A: u32 = 4;

enum Payload {
    Ints(Vec<i64>),
    Reals(Vec<f64>),
    Text(String),
}

struct Packet {
    tag: u32,
    payload: Payload,
}

pub struct Comm {
    rank: usize,
    size: usize,
    to: Vec<Sender<Packet>>,
    from: Vec<Receiver<Packet>>,
    fence: Arc<Barrier>,
    epoch: Instant,
}

// One endpoint per rank. The (src, dst) channel mesh gives FIFO ordering per
// directed pair, which is the only cross-worker ordering the algorithms rely on.
pub fn network(p: usize) -> Vec<Comm> {
    assert!(p > 0, "need at least one process");

    let fence = Arc::new(Barrier::new(p));
    let epoch = Instant::now();

    let mut tx: Vec<Vec<Sender<Packet>>> = Vec::with_capacity(p);
    let mut rx: Vec<Vec<Option<Receiver<Packet>>>> = Vec::with_capacity(p);
    for _src in 0..p {
        let mut trow = Vec::with_capacity(p);
        let mut rrow = Vec::with_capacity(p);
        for _dst in 0..p {
            let (t, r) = unbounded();
            trow.push(t);
            rrow.push(Some(r));
        }
        tx.push(trow);
        rx.push(rrow);
    }

    (0..p)
        .map(|r| Comm {
            rank: r,
            size: p,
            to: tx[r].clone(),
            from: rx.iter_mut().map(|row| row[r].take().unwrap()).collect(),
            fence: Arc::clone(&fence),
            epoch,
        })
        .collect()
}

// Runs f once on each of p pool threads, rank = thread index. The pool is
// sized exactly p so every worker owns a thread for the whole run and may
// block in recv without starving anybody.
pub fn run_spmd<R, F>(p: usize, f: F) -> Vec<R>
where
    F: Fn(&Comm) -> R + Sync,
    R: Send,
{
    let comms = network(p);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(p)
        .build()
        .unwrap();
    pool.broadcast(|ctx| f(&comms[ctx.index()]))
}

impl Comm {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn wall_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    pub fn barrier(&self) {
        self.fence.wait();
    }

    pub fn abort(&self, code: i32) -> ! {
        eprintln!(" rank {}: aborting with code {}", self.rank, code);
        process::exit(code);
    }

    fn send(&self, dst: usize, tag: u32, payload: Payload) {
        self.to[dst]
            .send(Packet { tag, payload })
            .expect("peer disconnected");
    }

    fn recv(&self, src: usize, tag: u32) -> Payload {
        let pkt = self.from[src].recv().expect("peer disconnected");
        assert_eq!(pkt.tag, tag, "tag mismatch on message from rank {}", src);
        pkt.payload
    }

    pub fn send_ints(&self, dst: usize, tag: u32, data: Vec<i64>) {
        self.send(dst, tag, Payload::Ints(data));
    }

    pub fn send_reals(&self, dst: usize, tag: u32, data: Vec<f64>) {
        self.send(dst, tag, Payload::Reals(data));
    }

    pub fn recv_ints(&self, src: usize, tag: u32) -> Vec<i64> {
        match self.recv(src, tag) {
            Payload::Ints(v) => v,
            _ => panic!("expected integer payload from rank {}", src),
        }
    }

    pub fn recv_reals(&self, src: usize, tag: u32) -> Vec<f64> {
        match self.recv(src, tag) {
            Payload::Reals(v) => v,
            _ => panic!("expected real payload from rank {}", src),
        }
    }

    pub fn broadcast_ints(&self, root: usize, data: Option<Vec<i64>>) -> Vec<i64> {
        if self.rank == root {
            let data = data.expect("root must supply broadcast data");
            for dst in 0..self.size {
                if dst != root {
                    self.send_ints(dst, TAG_BCAST, data.clone());
                }
            }
            data
        } else {
            self.recv_ints(root, TAG_BCAST)
        }
    }

    pub fn broadcast_text(&self, root: usize, data: Option<String>) -> String {
        if self.rank == root {
            let data = data.expect("root must supply broadcast data");
            for dst in 0..self.size {
                if dst != root {
                    self.send(dst, TAG_BCAST, Payload::Text(data.clone()));
                }
            }
            data
        } else {
            match self.recv(root, TAG_BCAST) {
                Payload::Text(s) => s,
                _ => panic!("expected text payload from rank {}", root),
            }
        }
    }

    pub fn scatter_ints(&self, root: usize, parts: Option<Vec<Vec<i64>>>) -> Vec<i64> {
        if self.rank == root {
            let mut parts = parts.expect("root must supply scatter data");
            assert_eq!(parts.len(), self.size);
            let mine = std::mem::take(&mut parts[root]);
            for (dst, part) in parts.into_iter().enumerate() {
                if dst != root {
                    self.send_ints(dst, TAG_SCATTER, part);
                }
            }
            mine
        } else {
            self.recv_ints(root, TAG_SCATTER)
        }
    }

    pub fn scatter_reals(&self, root: usize, parts: Option<Vec<Vec<f64>>>) -> Vec<f64> {
        if self.rank == root {
            let mut parts = parts.expect("root must supply scatter data");
            assert_eq!(parts.len(), self.size);
            let mine = std::mem::take(&mut parts[root]);
            for (dst, part) in parts.into_iter().enumerate() {
                if dst != root {
                    self.send_reals(dst, TAG_SCATTER, part);
                }
            }
            mine
        } else {
            self.recv_reals(root, TAG_SCATTER)
        }
    }

    pub fn gather_reals(&self, root: usize, data: Vec<f64>) -> Option<Vec<Vec<f64>>> {
        if self.rank == root {
            let mut all = Vec::with_capacity(self.size);
            for src in 0..self.size {
                if src == root {
                    all.push(data.clone());
                } else {
                    all.push(self.recv_reals(src, TAG_GATHER));
                }
            }
            Some(all)
        } else {
            self.send_reals(root, TAG_GATHER, data);
            None
        }
    }

    // Sends are non-blocking on unbounded channels, so every worker can post
    // all p outgoing parts before draining its inbox. Received parts come back
    // indexed by source rank.
    pub fn all_to_all_ints(&self, parts: Vec<Vec<i64>>) -> Vec<Vec<i64>> {
        assert_eq!(parts.len(), self.size);
        for (dst, part) in parts.into_iter().enumerate() {
            self.send_ints(dst, TAG_A2A, part);
        }
        (0..self.size).map(|src| self.recv_ints(src, TAG_A2A)).collect()
    }

    pub fn all_to_all_reals(&self, parts: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
        assert_eq!(parts.len(), self.size);
        for (dst, part) in parts.into_iter().enumerate() {
            self.send_reals(dst, TAG_A2A, part);
        }
        (0..self.size).map(|src| self.recv_reals(src, TAG_A2A)).collect()
    }

    // Variable-size personalized exchange: send holds the outgoing elements
    // grouped by destination rank, counts the group lengths. Returns the
    // incoming elements grouped by source rank plus the incoming counts.
    pub fn all_to_all_v_ints(&self, send: &[i64], counts: &[usize]) -> (Vec<i64>, Vec<usize>) {
        let parts = split_by_counts(send, counts, self.size);
        let got = self.all_to_all_ints(parts);
        let recv_counts: Vec<usize> = got.iter().map(|m| m.len()).collect();
        (got.concat(), recv_counts)
    }

    pub fn all_to_all_v_reals(&self, send: &[f64], counts: &[usize]) -> (Vec<f64>, Vec<usize>) {
        let parts = split_by_counts(send, counts, self.size);
        let got = self.all_to_all_reals(parts);
        let recv_counts: Vec<usize> = got.iter().map(|m| m.len()).collect();
        (got.concat(), recv_counts)
    }
}

fn split_by_counts<T: Clone>(flat: &[T], counts: &[usize], p: usize) -> Vec<Vec<T>> {
    assert_eq!(counts.len(), p);
    let mut parts = Vec::with_capacity(p);
    let mut offset = 0;
    for &c in counts {
        parts.push(flat[offset..offset + c].to_vec());
        offset += c;
    }
    assert_eq!(offset, flat.len(), "counts do not cover the send buffer");
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_reaches_every_rank() {
        let got = run_spmd(4, |comm| {
            let data = if comm.rank() == 0 { Some(vec![7, 11, 13]) } else { None };
            comm.broadcast_ints(0, data)
        });
        for part in got {
            assert_eq!(part, vec![7, 11, 13]);
        }
    }

    #[test]
    fn scatter_delivers_own_slice() {
        let got = run_spmd(3, |comm| {
            let parts = if comm.rank() == 0 {
                Some(vec![vec![0], vec![1, 1], vec![2, 2, 2]])
            } else {
                None
            };
            comm.scatter_ints(0, parts)
        });
        assert_eq!(got[0], vec![0]);
        assert_eq!(got[1], vec![1, 1]);
        assert_eq!(got[2], vec![2, 2, 2]);
    }

    #[test]
    fn gather_collects_in_rank_order() {
        let got = run_spmd(3, |comm| comm.gather_reals(0, vec![comm.rank() as f64]));
        let all = got[0].as_ref().unwrap();
        assert_eq!(all, &vec![vec![0.0], vec![1.0], vec![2.0]]);
        assert!(got[1].is_none() && got[2].is_none());
    }

    #[test]
    fn all_to_all_v_transposes() {
        // rank s sends the single value s*10 + d to every rank d
        let got = run_spmd(3, |comm| {
            let s = comm.rank() as i64;
            let send: Vec<i64> = (0..3).map(|d| s * 10 + d).collect();
            comm.all_to_all_v_ints(&send, &[1, 1, 1])
        });
        for (d, (recv, counts)) in got.iter().enumerate() {
            assert_eq!(counts, &vec![1, 1, 1]);
            let expect: Vec<i64> = (0..3).map(|s| s * 10 + d as i64).collect();
            assert_eq!(recv, &expect);
        }
    }

    #[test]
    fn barrier_and_wall_time_advance() {
        let times = run_spmd(2, |comm| {
            comm.barrier();
            comm.wall_time()
        });
        assert!(times.iter().all(|&t| t >= 0.0));
    }
}
