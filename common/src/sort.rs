// Stable counting sort of nonzero triples by a radix key on the first array.
// Two passes, Mod then Div, give a full ascending sort on keys below n.

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Div,
    Mod,
}

pub fn key(v: usize, radix: usize, kind: KeyKind) -> usize {
    match kind {
        KeyKind::Div => v / radix,
        KeyKind::Mod => v % radix,
    }
}

pub fn sort(
    n: usize,
    keys: &mut [usize],
    other: &mut [usize],
    vals: &mut [f64],
    radix: usize,
    kind: KeyKind,
) {
    let nz = keys.len();
    assert_eq!(other.len(), nz);
    assert_eq!(vals.len(), nz);

    let nbins = match kind {
        KeyKind::Mod => radix,
        KeyKind::Div => (n + radix - 1) / radix,
    };

    let mut count = vec![0usize; nbins];
    for k in 0..nz {
        count[key(keys[k], radix, kind)] += 1;
    }

    // exclusive prefix sum turns counts into advancing bin cursors
    let mut cursor = vec![0usize; nbins];
    let mut total = 0;
    for b in 0..nbins {
        cursor[b] = total;
        total += count[b];
    }

    let mut tmp_keys = vec![0usize; nz];
    let mut tmp_other = vec![0usize; nz];
    let mut tmp_vals = vec![0.0f64; nz];
    for k in 0..nz {
        let b = key(keys[k], radix, kind);
        let pos = cursor[b];
        cursor[b] += 1;
        tmp_keys[pos] = keys[k];
        tmp_other[pos] = other[k];
        tmp_vals[pos] = vals[k];
    }

    keys.copy_from_slice(&tmp_keys);
    other.copy_from_slice(&tmp_other);
    vals.copy_from_slice(&tmp_vals);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_pass_is_stable() {
        // keys 5 and 1 share the bin for radix 4; original order must survive
        let mut keys = vec![5, 2, 1, 6, 2];
        let mut other = vec![0, 1, 2, 3, 4];
        let mut vals = vec![0.5, 1.5, 2.5, 3.5, 4.5];
        sort(8, &mut keys, &mut other, &mut vals, 4, KeyKind::Mod);

        assert_eq!(keys, vec![5, 1, 2, 6, 2]);
        assert_eq!(other, vec![0, 2, 1, 3, 4]);
        assert_eq!(vals, vec![0.5, 2.5, 1.5, 3.5, 4.5]);
    }

    #[test]
    fn two_passes_sort_ascending() {
        let n = 16;
        let radix = 4;
        let mut keys = vec![9, 0, 15, 3, 7, 3, 12, 1];
        let mut other: Vec<usize> = (0..keys.len()).collect();
        let mut vals: Vec<f64> = (0..keys.len()).map(|k| k as f64).collect();

        sort(n, &mut keys, &mut other, &mut vals, radix, KeyKind::Mod);
        sort(n, &mut keys, &mut other, &mut vals, radix, KeyKind::Div);

        assert_eq!(keys, vec![0, 1, 3, 3, 7, 9, 12, 15]);
        // equal keys keep input order: original positions 3 then 5
        assert_eq!(&other[2..4], &[3, 5]);
        // companion arrays moved with their keys
        for k in 0..keys.len() {
            assert_eq!(vals[k], other[k] as f64);
        }
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let mut keys: Vec<usize> = vec![];
        let mut other: Vec<usize> = vec![];
        let mut vals: Vec<f64> = vec![];
        sort(4, &mut keys, &mut other, &mut vals, 2, KeyKind::Div);
        assert!(keys.is_empty());
    }
}
