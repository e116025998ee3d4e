/// Range where lower bound is inclusive, upper bound is exclusive or unbounded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Range<T>(T, Option<T>);

impl<T> Range<T>
where
    T: Ord,
{
    pub fn contains(&self, val: &T) -> bool {
        if let Some(end) = &self.1 {
            val >= &self.0 && val < end
        } else {
            val >= &self.0
        }
    }

    /// Like `contains`, but a missing value is never in the range.
    pub fn contains_opt(&self, val: Option<&T>) -> bool {
        val.map_or(false, |val| self.contains(val))
    }
}

impl Range<u64> {
    /// The range `0..=max`, unbounded above when `max` is `u64::MAX`.
    pub fn up_to_inclusive(max: u64) -> Self {
        Range(0, max.checked_add(1))
    }
}
