/// A payload storable in an [`IntervalList`].
///
/// `adjust` narrows the payload to a sub-range of its current extent; the
/// list uses it to trim partial overlaps and to split containing intervals.
pub trait Interval {
    fn start(&self) -> u64;
    fn end(&self) -> u64;
    fn adjust(&mut self, start: u64, end: u64);
}

/// Ordered, non-overlapping `[start, end)` intervals.
///
/// Intervals are kept sorted by `start`. Because they never overlap, their
/// ends are sorted as well, which keeps both lookups to a pair of binary
/// searches plus work linear in the overlap count.
#[derive(Debug, Default)]
pub struct IntervalList<P> {
    items: Vec<P>,
}

impl<P: Interval> IntervalList<P> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, P> {
        self.items.iter()
    }

    /// Index of the first interval overlapping `[lo, ..)`.
    fn first_overlap(&self, lo: u64) -> usize {
        self.items.partition_point(|p| p.end() <= lo)
    }

    /// Index one past the last interval overlapping `[.., hi)`.
    fn last_overlap(&self, hi: u64) -> usize {
        self.items.partition_point(|p| p.start() < hi)
    }

    /// All stored intervals overlapping `[lo, hi)`, ascending by start.
    ///
    /// Touching intervals (`end == lo` or `start == hi`) do not overlap.
    pub fn intersect(&self, lo: u64, hi: u64) -> &[P] {
        if lo >= hi {
            return &[];
        }
        let i = self.first_overlap(lo);
        let j = self.last_overlap(hi);
        &self.items[i..j.max(i)]
    }

    /// Inserts `p`, making it authoritative for its full extent.
    ///
    /// Existing intervals fully covered by `p` are removed; partial overlaps
    /// are trimmed via [`Interval::adjust`]; an interval strictly containing
    /// `p` is split into two surviving fragments. Post-condition: no two
    /// stored intervals overlap.
    pub fn replace(&mut self, p: P)
    where
        P: Clone,
    {
        let (lo, hi) = (p.start(), p.end());
        if lo >= hi {
            return;
        }

        let mut i = self.first_overlap(lo);
        let mut j = self.last_overlap(hi);

        if i < j {
            let first_start = self.items[i].start();
            let first_end = self.items[i].end();

            if first_start < lo && first_end > hi {
                // Strict containment: split into fragments either side of p.
                let mut right = self.items[i].clone();
                right.adjust(hi, first_end);
                self.items[i].adjust(first_start, lo);
                self.items.splice(i + 1..i + 1, [p, right]);
                return;
            }

            if first_start < lo {
                self.items[i].adjust(first_start, lo);
                i += 1;
            }

            if i < j {
                let last_start = self.items[j - 1].start();
                let last_end = self.items[j - 1].end();
                debug_assert!(last_start < hi);
                if last_end > hi {
                    self.items[j - 1].adjust(hi, last_end);
                    j -= 1;
                }
            }
        }

        self.items.splice(i..j.max(i), [p]);
    }
}
