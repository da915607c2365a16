macro_rules! try_match {
    ($scrutinee:expr, $pattern:pat => $arm:expr) => {
        match $scrutinee {
            $pattern => Some($arm),
            _ => None,
        }
    };
}

pub(crate) use try_match;

/// Rounds `value` up to the nearest multiple of `align` (which must be non-zero).
pub(crate) fn align_to(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}
