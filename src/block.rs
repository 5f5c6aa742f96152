/// Axis-aligned, half-open box `[begin, end)` in volume coordinates.
///
/// Produced by [`crate::blocking::Blocking`]; the id is the block's dense
/// position in the grid and never changes for the same grid inputs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Block {
    pub id: u64,
    pub begin: [usize; 3],
    pub end: [usize; 3],
}

impl Block {
    pub fn new(id: u64, begin: [usize; 3], end: [usize; 3]) -> Self {
        debug_assert!((0..3).all(|d| begin[d] <= end[d]));
        Self { id, begin, end }
    }

    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        [
            self.end[0] - self.begin[0],
            self.end[1] - self.begin[1],
            self.end[2] - self.begin[2],
        ]
    }

    #[inline]
    pub fn nvoxels(&self) -> usize {
        let s = self.shape();
        s[0] * s[1] * s[2]
    }

    /// True when `other` lies completely inside this block.
    pub fn encloses(&self, other: &Block) -> bool {
        (0..3).all(|d| other.begin[d] >= self.begin[d] && other.end[d] <= self.end[d])
    }

    /// Intersection with another box, `None` when they do not overlap.
    pub fn intersect(&self, begin: [usize; 3], end: [usize; 3]) -> Option<([usize; 3], [usize; 3])> {
        let mut b = [0usize; 3];
        let mut e = [0usize; 3];
        for d in 0..3 {
            b[d] = self.begin[d].max(begin[d]);
            e[d] = self.end[d].min(end[d]);
            if b[d] >= e[d] {
                return None;
            }
        }
        Some((b, e))
    }
}
