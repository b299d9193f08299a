// Input distribution: rank 0 reads the text files and hands every rank its
// share. Matrix files carry the nonzero partitioning, vector-distribution
// files the component ownership.

use crate::comm::Comm;
use std::fs;

pub struct LocalTriples {
    pub n: usize,
    pub nz_global: usize,
    pub ia: Vec<usize>,
    pub ja: Vec<usize>,
    pub a: Vec<f64>,
}

struct Tokens<'a> {
    it: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Tokens {
            it: text.split_whitespace(),
        }
    }

    fn int(&mut self, comm: &Comm, what: &str) -> i64 {
        match self.it.next().map(str::parse::<i64>) {
            Some(Ok(v)) => v,
            _ => {
                eprintln!(" bad or missing {} in input file", what);
                comm.abort(1);
            }
        }
    }

    fn real(&mut self, comm: &Comm, what: &str) -> f64 {
        match self.it.next().map(str::parse::<f64>) {
            Some(Ok(v)) => v,
            _ => {
                eprintln!(" bad or missing {} in input file", what);
                comm.abort(1);
            }
        }
    }
}

fn read_file(comm: &Comm, path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!(" cannot open {}: {}", path, e);
        comm.abort(1);
    })
}

// Matrix-distribution file: header `m n nz p`, then p+1 Pstart offsets giving
// each rank a contiguous slice of the nonzero list, then nz 1-based triples.
pub fn load_matrix(comm: &Comm, path: &str) -> LocalTriples {
    let p = comm.size();

    let mut header = None;
    let mut rows = None;
    let mut cols = None;
    let mut vals = None;
    if comm.rank() == 0 {
        let text = read_file(comm, path);
        let mut t = Tokens::new(&text);

        let m = t.int(comm, "row count");
        let n = t.int(comm, "column count");
        let nz = t.int(comm, "nonzero count") as usize;
        let pfile = t.int(comm, "processor count");
        if pfile as usize != p {
            eprintln!(" matrix file declares {} processors, runtime has {}", pfile, p);
            comm.abort(-8);
        }
        if m != n || n <= 0 {
            eprintln!(" matrix is not square: {} x {}", m, n);
            comm.abort(-9);
        }

        let pstart: Vec<usize> = (0..=p)
            .map(|_| t.int(comm, "partition offset") as usize)
            .collect();
        if pstart[0] != 0 || pstart[p] != nz || pstart.windows(2).any(|w| w[0] > w[1]) {
            eprintln!(" matrix file partition table does not cover the {} nonzeros", nz);
            comm.abort(1);
        }

        let mut ia = Vec::with_capacity(nz);
        let mut ja = Vec::with_capacity(nz);
        let mut a = Vec::with_capacity(nz);
        for _ in 0..nz {
            // indices are 1-based on disk
            ia.push(t.int(comm, "row index") - 1);
            ja.push(t.int(comm, "column index") - 1);
            a.push(t.real(comm, "nonzero value"));
        }

        let chunk = |src: &Vec<i64>| -> Vec<Vec<i64>> {
            (0..p).map(|s| src[pstart[s]..pstart[s + 1]].to_vec()).collect()
        };
        header = Some(vec![n, nz as i64]);
        rows = Some(chunk(&ia));
        cols = Some(chunk(&ja));
        vals = Some(
            (0..p)
                .map(|s| a[pstart[s]..pstart[s + 1]].to_vec())
                .collect::<Vec<Vec<f64>>>(),
        );
    }

    let header = comm.broadcast_ints(0, header);
    let ia = comm.scatter_ints(0, rows);
    let ja = comm.scatter_ints(0, cols);
    let a = comm.scatter_reals(0, vals);

    LocalTriples {
        n: header[0] as usize,
        nz_global: header[1] as usize,
        ia: ia.into_iter().map(|x| x as usize).collect(),
        ja: ja.into_iter().map(|x| x as usize).collect(),
        a,
    }
}

// Vector-distribution file: header `n p`, then n lines `i proc` assigning
// global component i-1 to rank proc-1. Components reach their owner in file
// order, so local indices follow ascending global index.
pub fn load_vector_distribution(comm: &Comm, path: &str) -> (usize, Vec<usize>) {
    let p = comm.size();

    let mut header = None;
    let mut chunks = None;
    if comm.rank() == 0 {
        let text = read_file(comm, path);
        let mut t = Tokens::new(&text);

        let n = t.int(comm, "vector length");
        let pfile = t.int(comm, "processor count");
        if pfile as usize != p {
            eprintln!(" vector file declares {} processors, runtime has {}", pfile, p);
            comm.abort(-10);
        }

        let mut per_owner: Vec<Vec<i64>> = vec![Vec::new(); p];
        for i in 1..=n {
            let idx = t.int(comm, "component index");
            if idx != i {
                eprintln!(" vector file component {} out of order (read {})", i, idx);
                comm.abort(-11);
            }
            let q = t.int(comm, "owner processor");
            if q < 1 || q > p as i64 {
                eprintln!(" component {} assigned to invalid processor {}", i, q);
                comm.abort(-10);
            }
            per_owner[(q - 1) as usize].push(i - 1);
        }
        header = Some(vec![n]);
        chunks = Some(per_owner);
    }

    let header = comm.broadcast_ints(0, header);
    let mine = comm.scatter_ints(0, chunks);
    (
        header[0] as usize,
        mine.into_iter().map(|g| g as usize).collect(),
    )
}
