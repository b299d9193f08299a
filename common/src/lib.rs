pub mod comm;
pub mod distribute;
pub mod icrs;
pub mod mv;
pub mod print_results;
pub mod randdp;
pub mod sort;
