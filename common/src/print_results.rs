use chrono::Local;

pub fn rust_print_results(
    name: &str,
    n: usize,
    nz: usize,
    nprocs: usize,
    niters: usize,
    t: f64,
    mops: f64,
    optype: &str,
    version: &str,
    compilerversion: &str,
) {
    println!("\n\n {} Benchmark Completed", name);
    println!(" Size             = {:>24}", n);
    println!(" Nonzeros         = {:>24}", nz);
    println!(" Iterations       = {:>24}", niters);
    println!(" Time in seconds  = {:>24.6}", t);
    println!(" Total processes  = {:>24}", nprocs);
    println!(" Mop/s total      = {:>24.2}", mops);
    println!(" Operation type   = {:>24}", optype);
    println!(" Version          = {:>24}", version);
    println!(" Compiler ver     = {:>24}", compilerversion);
    println!(
        " Execution date   = {:>24}",
        Local::now().format("%d %b %Y").to_string()
    );
}
