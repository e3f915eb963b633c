//! Decimal digit helpers shared by every rank
//!
//! Both functions are pure. Every rank calls [`pass_count`] on the same
//! initial array and so agrees on the number of passes without exchanging a
//! message.

/// Number of decimal digits a `u64` can carry
pub const MAX_PLACES: u32 = 20;

/// Return the decimal digit of `value` at the 1-based `place`
///
/// `place == 1` is the units digit. Places beyond the magnitude of `value`
/// (or beyond [`MAX_PLACES`]) yield 0, which is the implicit leading zero of
/// shorter numbers.
pub fn digit_at(value: u64, place: u32) -> u8 {
    debug_assert!(place >= 1, "digit places are 1-based");
    match 10u64.checked_pow(place.saturating_sub(1)) {
        Some(divisor) => ((value / divisor) % 10) as u8,
        None => 0,
    }
}

/// Count the decimal digits of the largest element
///
/// An empty array or one holding only zeros needs no passes.
pub fn pass_count(array: &[u64]) -> u32 {
    let mut max = array.iter().copied().max().unwrap_or(0);
    let mut places = 0;
    while max > 0 {
        places += 1;
        max /= 10;
    }
    places
}
