//! Flat/multi-index arithmetic for tensor-product index spaces

/// Stride table of a multi-index space with direction 0 fastest
#[derive(Debug, Clone)]
pub struct MultiIndex {
    strides: Vec<usize>,
}

impl MultiIndex {
    pub fn new(dims: &[usize]) -> Self {
        let mut strides = Vec::with_capacity(dims.len());
        let mut s = 1;
        for &d in dims {
            strides.push(s);
            s *= d;
        }
        Self { strides }
    }

    pub fn flat(&self, multi: &[usize]) -> usize {
        multi
            .iter()
            .zip(&self.strides)
            .map(|(&m, &s)| m * s)
            .sum()
    }

    pub fn to_multi(&self, mut flat: usize) -> Vec<usize> {
        let mut res = vec![0; self.strides.len()];
        for r in (0..self.strides.len()).rev() {
            res[r] = flat / self.strides[r];
            flat %= self.strides[r];
        }
        res
    }
}

/// A rectangular sub-block of a tensor-product index space, translating
/// flat local indices to flat global ones.
///
/// The block covers `ranges[i] = (start, end)` along direction `i` of a
/// global space with extents `global_dims`.
#[derive(Debug, Clone)]
pub struct SubIndex {
    shift: usize,
    global_strides: Vec<usize>,
    local_strides: Vec<usize>,
}

impl SubIndex {
    pub fn new(global_dims: &[usize], ranges: &[(usize, usize)]) -> Self {
        debug_assert_eq!(global_dims.len(), ranges.len());
        let global = MultiIndex::new(global_dims);
        let local_dims: Vec<usize> = ranges.iter().map(|&(s, e)| e - s).collect();
        let local = MultiIndex::new(&local_dims);
        let starts: Vec<usize> = ranges.iter().map(|&(s, _)| s).collect();
        Self {
            shift: global.flat(&starts),
            global_strides: global.strides,
            local_strides: local.strides,
        }
    }

    pub fn local_to_global(&self, mut flat: usize) -> usize {
        let mut res = self.shift;
        for r in (0..self.local_strides.len()).rev() {
            res += (flat / self.local_strides[r]) * self.global_strides[r];
            flat %= self.local_strides[r];
        }
        res
    }
}
