// Incremental Compressed Row Storage: nonzeros in row-major order, successive
// local column indices stored as deltas, a delta >= ncols signaling a row change.

use crate::sort::{sort, KeyKind};

pub struct IcrsMatrix {
    pub n: usize,
    pub nz: usize,
    pub nrows: usize,
    pub ncols: usize,
    pub rowindex: Vec<usize>,
    pub colindex: Vec<usize>,
    pub a: Vec<f64>,     // nz + 1 entries, value sentinel 0.0
    pub inc: Vec<usize>, // nz + 1 entries, end-of-last-row sentinel
}

fn radix_for(n: usize) -> usize {
    // smallest power of two >= sqrt(n); two counting-sort passes then cover
    // the whole index range with O(sqrt(n)) bins per pass
    let target = libm::sqrt(n as f64);
    let mut radix = 1usize;
    while (radix as f64) < target {
        radix *= 2;
    }
    radix
}

// Consumes nz unordered local triples with global 0-based indices and builds
// the ICRS stream together with the local-to-global row and column maps.
pub fn triple2icrs(n: usize, mut ia: Vec<usize>, mut ja: Vec<usize>, mut a: Vec<f64>) -> IcrsMatrix {
    let nz = a.len();
    assert_eq!(ia.len(), nz);
    assert_eq!(ja.len(), nz);

    let radix = radix_for(n);

    // ascending global column order, stable
    sort(n, &mut ja, &mut ia, &mut a, radix, KeyKind::Mod);
    sort(n, &mut ja, &mut ia, &mut a, radix, KeyKind::Div);

    // register each distinct column once and rewrite ja to local indices
    let mut colindex: Vec<usize> = Vec::new();
    for k in 0..nz {
        if k == 0 || ja[k] != *colindex.last().unwrap() {
            colindex.push(ja[k]);
        }
        ja[k] = colindex.len() - 1;
    }
    let ncols = colindex.len();

    // ascending global row order; stability keeps columns ascending per row
    sort(n, &mut ia, &mut ja, &mut a, radix, KeyKind::Mod);
    sort(n, &mut ia, &mut ja, &mut a, radix, KeyKind::Div);

    let mut rowindex: Vec<usize> = Vec::new();
    let mut inc = vec![0usize; nz + 1];
    let mut prevcol = 0usize;
    for k in 0..nz {
        let new_row = k == 0 || ia[k] != *rowindex.last().unwrap();
        if new_row {
            rowindex.push(ia[k]);
        }
        if k == 0 {
            inc[0] = ja[0];
        } else if new_row {
            inc[k] = ja[k] + ncols - prevcol;
        } else {
            inc[k] = ja[k] - prevcol;
        }
        prevcol = ja[k];
    }
    inc[nz] = if nz == 0 { 0 } else { ncols - prevcol };
    a.push(0.0);

    let nrows = rowindex.len();
    IcrsMatrix {
        n,
        nz,
        nrows,
        ncols,
        rowindex,
        colindex,
        a,
        inc,
    }
}

impl IcrsMatrix {
    // One pass over the ICRS stream: uloc[i] += sum_j a_ij * vloc[j], with the
    // column cursor wrapping past ncols to signal a row change.
    pub fn multiply_add(&self, vloc: &[f64], uloc: &mut [f64]) {
        if self.nz == 0 {
            return;
        }
        let mut i = 0usize;
        let mut j = self.inc[0];
        for k in 0..self.nz {
            uloc[i] += self.a[k] * vloc[j];
            j += self.inc[k + 1];
            if j >= self.ncols {
                j -= self.ncols;
                i += 1;
            }
        }
    }

    // Reconstructs the (global row, global column, value) triples by walking
    // the increment stream.
    pub fn triples(&self) -> Vec<(usize, usize, f64)> {
        let mut out = Vec::with_capacity(self.nz);
        if self.nz == 0 {
            return out;
        }
        let mut i = 0usize;
        let mut j = self.inc[0];
        for k in 0..self.nz {
            out.push((self.rowindex[i], self.colindex[j], self.a[k]));
            j += self.inc[k + 1];
            if j >= self.ncols {
                j -= self.ncols;
                i += 1;
            }
        }
        out
    }
}
