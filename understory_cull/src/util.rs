// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Returns the square root of the number, rounded up.
#[inline]
pub(crate) const fn isqrt_ceil(num: usize) -> usize {
    let s = num.isqrt();

    // This multiplication cannot overflow because `s` is the rounded-down square root of `num`,
    // i.e., `s * s` is guaranteed to be less than or equal to `num`.
    if s * s < num { s + 1 } else { s }
}

/// Grid shape `(cols, rows)` used to split a rectangle into `count` equal cells.
///
/// `cols` is the smallest divisor of `count` that is at least `ceil(sqrt(count))`, so square
/// counts give square grids and primes degrade to a single row.
#[inline]
pub(crate) const fn grid_shape(count: usize) -> (usize, usize) {
    if count == 0 {
        return (0, 0);
    }
    let mut cols = isqrt_ceil(count);
    while count % cols != 0 {
        cols += 1;
    }
    (cols, count / cols)
}
