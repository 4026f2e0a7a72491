/// Determines whether `m * n` can be calculated without the result exceeding `max`.
///
/// The multiplication itself is never performed, so this is safe to call with any inputs. `max`
/// will typically be `usize::MAX`.
///
/// An `m` of zero always reports `false`. This is a conservative gate for size calculations, not
/// a mathematical predicate: a zero-sized factor never describes a valid allocation, so callers
/// must not proceed with it.
///
/// # Example
///
/// ```
/// use entry_pool::can_multiply;
///
/// assert!(can_multiply(usize::MAX, 1, usize::MAX));
/// assert!(!can_multiply(usize::MAX, 2, usize::MAX));
/// assert!(!can_multiply(usize::MAX, 0, 1));
/// ```
#[must_use]
#[inline]
pub fn can_multiply(max: usize, m: usize, n: usize) -> bool {
    max.checked_div(m).is_some_and(|limit| n <= limit)
}
