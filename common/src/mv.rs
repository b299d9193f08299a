// Communication plan and kernel for the distributed matrix-vector product.
//
// mv_init resolves, for every local column and row slot, which rank owns the
// matching vector component and at which local index, using a directory
// partition of the global index space (index g is registered at rank g mod p).
// It then inverts the plans once so that per invocation the kernel only packs,
// exchanges, and unpacks along precomputed index lists.

use crate::comm::Comm;
use crate::icrs::IcrsMatrix;

pub struct MvPlan {
    // per local column slot: owning rank of the source component and its
    // local index on that rank
    pub src_proc: Vec<usize>,
    pub src_ind: Vec<usize>,
    // per local row slot: owning rank of the destination component and its
    // local index on that rank
    pub dst_proc: Vec<usize>,
    pub dst_ind: Vec<usize>,
    // fan-out: indices into the local v segment to pack, grouped by
    // destination rank, and the matching group sizes
    pub vsend_ind: Vec<usize>,
    pub vsend_counts: Vec<usize>,
    // fan-out: local column slots to fill from the incoming stream, grouped
    // by source rank
    pub vrecv_slots: Vec<usize>,
    pub vrecv_counts: Vec<usize>,
    // fan-in: local row slots to pack, grouped by destination rank
    pub usend_rows: Vec<usize>,
    pub usend_counts: Vec<usize>,
    // fan-in: indices into the local u segment to accumulate into, grouped by
    // source rank
    pub urecv_ind: Vec<usize>,
    pub urecv_counts: Vec<usize>,
}

// Number of global indices g < n with g mod p == s, i.e. the directory table
// length on rank s.
fn directory_len(n: usize, p: usize, s: usize) -> usize {
    if s >= n {
        0
    } else {
        (n - s + p - 1) / p
    }
}

// Distributed ownership lookup. owned maps this rank's local indices to the
// global indices it owns; wanted lists the global indices to resolve. Returns
// the (owner rank, owner-local index) pair for each wanted entry, in order.
//
// Phase 1 publishes every owned (global, local) pair to the directory rank
// g mod p; phase 2 routes each query through the same directory and carries
// the answers back in request order.
fn resolve_owners(
    comm: &Comm,
    n: usize,
    owned: &[usize],
    wanted: &[usize],
) -> (Vec<usize>, Vec<usize>) {
    let p = comm.size();
    let s = comm.rank();

    // publish
    let mut pubs: Vec<Vec<i64>> = vec![Vec::new(); p];
    for (l, &g) in owned.iter().enumerate() {
        debug_assert!(g < n);
        pubs[g % p].push(g as i64);
        pubs[g % p].push(l as i64);
    }
    let published = comm.all_to_all_ints(pubs);

    let mut dir_owner = vec![-1i64; directory_len(n, p, s)];
    let mut dir_ind = vec![-1i64; directory_len(n, p, s)];
    for (owner, msg) in published.iter().enumerate() {
        for pair in msg.chunks(2) {
            let g = pair[0] as usize;
            debug_assert!(g % p == s && g < n);
            let slot = g / p;
            debug_assert!(dir_owner[slot] == -1, "global index {} owned twice", g);
            dir_owner[slot] = owner as i64;
            dir_ind[slot] = pair[1];
        }
    }

    // resolve
    let mut queries: Vec<Vec<i64>> = vec![Vec::new(); p];
    for &g in wanted {
        queries[g % p].push(g as i64);
    }
    let asked = comm.all_to_all_ints(queries);

    let mut answers: Vec<Vec<i64>> = Vec::with_capacity(p);
    for msg in &asked {
        let mut reply = Vec::with_capacity(2 * msg.len());
        for &gi in msg {
            let g = gi as usize;
            debug_assert!(g % p == s);
            let slot = g / p;
            if slot >= dir_owner.len() || dir_owner[slot] < 0 {
                eprintln!(" global index {} has no registered owner", g);
                comm.abort(-12);
            }
            reply.push(dir_owner[slot]);
            reply.push(dir_ind[slot]);
        }
        answers.push(reply);
    }
    let got = comm.all_to_all_ints(answers);

    // answers from each directory rank arrive in the order we queried it
    let mut next = vec![0usize; p];
    let mut owner_of = vec![0usize; wanted.len()];
    let mut ind_of = vec![0usize; wanted.len()];
    for (c, &g) in wanted.iter().enumerate() {
        let t = g % p;
        let k = next[t];
        next[t] = k + 2;
        owner_of[c] = got[t][k] as usize;
        ind_of[c] = got[t][k + 1] as usize;
    }
    (owner_of, ind_of)
}

// Orders the slots 0..len by owning rank, keeping slot order within a rank.
// Returns the concatenated slot order plus the per-rank group sizes.
fn group_by_proc(p: usize, proc_of: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut counts = vec![0usize; p];
    for &q in proc_of {
        counts[q] += 1;
    }
    let mut cursor = vec![0usize; p];
    let mut total = 0;
    for t in 0..p {
        cursor[t] = total;
        total += counts[t];
    }
    let mut order = vec![0usize; proc_of.len()];
    for (slot, &q) in proc_of.iter().enumerate() {
        order[cursor[q]] = slot;
        cursor[q] += 1;
    }
    (order, counts)
}

pub fn mv_init(
    comm: &Comm,
    n: usize,
    mat: &IcrsMatrix,
    vindex: &[usize],
    uindex: &[usize],
) -> MvPlan {
    // colindex and rowindex were built for the same global size the vectors use
    debug_assert_eq!(mat.n, n);

    let (src_proc, src_ind) = resolve_owners(comm, n, vindex, &mat.colindex);
    let (dst_proc, dst_ind) = resolve_owners(comm, n, uindex, &mat.rowindex);

    // Invert the v plan: every consumer tells each owner which of its local
    // components it needs, in the order it will unpack them. The owner keeps
    // that order as its pack list, so one value flows per (owner, consumer,
    // component) triple and never more.
    let (vrecv_slots, vrecv_counts) = group_by_proc(comm.size(), &src_proc);
    let requests: Vec<i64> = vrecv_slots.iter().map(|&c| src_ind[c] as i64).collect();
    let (flat, vsend_counts) = comm.all_to_all_v_ints(&requests, &vrecv_counts);
    let vsend_ind: Vec<usize> = flat.iter().map(|&x| x as usize).collect();
    debug_assert!(vsend_ind.iter().all(|&l| l < vindex.len()));

    // Invert the u plan: every producer tells each owner where its partial
    // sums land, in the order it will pack them.
    let (usend_rows, usend_counts) = group_by_proc(comm.size(), &dst_proc);
    let deliveries: Vec<i64> = usend_rows.iter().map(|&r| dst_ind[r] as i64).collect();
    let (flat, urecv_counts) = comm.all_to_all_v_ints(&deliveries, &usend_counts);
    let urecv_ind: Vec<usize> = flat.iter().map(|&x| x as usize).collect();
    debug_assert!(urecv_ind.iter().all(|&l| l < uindex.len()));

    MvPlan {
        src_proc,
        src_ind,
        dst_proc,
        dst_ind,
        vsend_ind,
        vsend_counts,
        vrecv_slots,
        vrecv_counts,
        usend_rows,
        usend_counts,
        urecv_ind,
        urecv_counts,
    }
}

// One distributed matvec: fan-out the needed v components, run the local ICRS
// product, fan-in the partial u sums to their owners. u is fully overwritten.
pub fn mv(comm: &Comm, mat: &IcrsMatrix, plan: &MvPlan, v: &[f64], u: &mut [f64]) {
    debug_assert!(mat.nz > 0 || (mat.nrows == 0 && mat.ncols == 0));

    // fan-out
    let packed: Vec<f64> = plan.vsend_ind.iter().map(|&l| v[l]).collect();
    let (arrived, _) = comm.all_to_all_v_reals(&packed, &plan.vsend_counts);
    let mut vloc = vec![0.0f64; mat.ncols];
    for (x, &c) in arrived.iter().zip(&plan.vrecv_slots) {
        vloc[c] = *x;
    }

    // local ICRS product
    let mut uloc = vec![0.0f64; mat.nrows];
    mat.multiply_add(&vloc, &mut uloc);

    // fan-in; owners accumulate, so the owned segment is zeroed first
    let packed: Vec<f64> = plan.usend_rows.iter().map(|&r| uloc[r]).collect();
    let (arrived, _) = comm.all_to_all_v_reals(&packed, &plan.usend_counts);
    for x in u.iter_mut() {
        *x = 0.0;
    }
    for (x, &l) in arrived.iter().zip(&plan.urecv_ind) {
        u[l] += *x;
    }

    // contributions for this invocation must be in before u is read or reused
    comm.barrier();
}
