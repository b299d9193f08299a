use std::env;
use std::io::{self, BufRead, Write};

use common::comm::{self, Comm};
use common::distribute;
use common::icrs::triple2icrs;
use common::mv::{mv, mv_init};
use common::print_results;

const NITERS: usize = 1000;

const VERSION: &str = "1.0";
const COMPILERVERSION: &str = "rustc 1.70.0-nightly";

fn main() {
    let args: Vec<String> = env::args().collect();
    let nprocs = if args.len() > 1 {
        args[1].parse::<usize>().unwrap_or(1)
    } else {
        1
    };
    let niters = if args.len() > 2 {
        args[2].parse::<usize>().unwrap_or(NITERS)
    } else {
        NITERS
    };

    println!("\n\n Sparse matrix-vector multiplication - Rust SPMD version\n");
    println!(" Using {} processes", nprocs);
    println!(" Iterations: {}", niters);

    comm::run_spmd(nprocs, |comm| run(comm, niters));
}

fn prompt_path(comm: &Comm, what: &str) -> String {
    let mut path = None;
    if comm.rank() == 0 {
        print!(" Please enter the name of the {}: ", what);
        io::stdout().flush().unwrap();
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line).unwrap_or_else(|e| {
            eprintln!(" cannot read from standard input: {}", e);
            comm.abort(1);
        });
        let line = line.trim();
        if read == 0 || line.is_empty() {
            eprintln!(" no {} given", what);
            comm.abort(1);
        }
        println!();
        path = Some(line.to_string());
    }
    comm.broadcast_text(0, path)
}

fn run(comm: &Comm, niters: usize) {
    let t0 = comm.wall_time();

    let mpath = prompt_path(comm, "matrix distribution file");
    let triples = distribute::load_matrix(comm, &mpath);
    let n = triples.n;
    let nz_global = triples.nz_global;
    let mat = triple2icrs(n, triples.ia, triples.ja, triples.a);

    let vpath = prompt_path(comm, "v distribution file");
    let (nv_file, vindex) = distribute::load_vector_distribution(comm, &vpath);
    let upath = prompt_path(comm, "u distribution file");
    let (nu_file, uindex) = distribute::load_vector_distribution(comm, &upath);
    if nv_file != n || nu_file != n {
        if comm.rank() == 0 {
            eprintln!(
                " vector length disagrees with matrix size: {} / {} vs {}",
                nv_file, nu_file, n
            );
        }
        comm.abort(-9);
    }

    // all-ones input: the checksum of u then equals the sum of all nonzeros
    let v: Vec<f64> = vec![1.0; vindex.len()];
    let mut u: Vec<f64> = vec![0.0; uindex.len()];

    let plan = mv_init(comm, n, &mat, &vindex, &uindex);

    comm.barrier();
    let t1 = comm.wall_time();

    for _ in 0..niters {
        mv(comm, &mat, &plan, &v, &mut u);
    }

    let t2 = comm.wall_time();

    let local_sum: f64 = u.iter().sum();
    let sums = comm.gather_reals(0, vec![local_sum]);

    if comm.rank() == 0 {
        let checksum: f64 = sums.unwrap().into_iter().flatten().sum();
        let total = t2 - t1;

        println!(" Initialization time = {:.6} seconds", t1 - t0);
        println!(" Average matvec time = {:.6} seconds", total / niters as f64);
        println!(" Total time for {} matvecs = {:.6} seconds", niters, total);
        println!(" Checksum of u = {:.6}", checksum);

        let mops = if total > 0.0 {
            2.0 * nz_global as f64 * niters as f64 / total / 1000000.0
        } else {
            0.0
        };
        print_results::rust_print_results(
            "MV",
            n,
            nz_global,
            comm.size(),
            niters,
            total,
            mops,
            "sparse matrix-vector product",
            VERSION,
            COMPILERVERSION,
        );
    }
}
