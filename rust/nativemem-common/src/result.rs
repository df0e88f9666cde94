pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Succeeds if `alignment` is 0 (natural alignment) or a power of two.
#[inline]
pub fn verify_alignment(alignment: usize, element_size: usize) -> Result<()> {
    if alignment == 0 || alignment.is_power_of_two() {
        Ok(())
    } else {
        invalid_alignment(alignment, element_size)
    }
}

#[cold]
fn invalid_alignment(alignment: usize, element_size: usize) -> Result<()> {
    Err(crate::error::Error::invalid_alignment(
        alignment,
        element_size,
        "alignment must be a power of two",
    ))
}

#[cfg(test)]
mod tests {
    use super::verify_alignment;
    use crate::error::ErrorKind;

    #[test]
    fn test_verify_alignment() {
        for alignment in [0, 1, 2, 8, 64, 4096] {
            assert!(verify_alignment(alignment, 4).is_ok());
        }
        let err = verify_alignment(24, 8).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidAlignment {
                alignment,
                element_size,
                reason,
            } => {
                assert_eq!(*alignment, 24);
                assert_eq!(*element_size, 8);
                assert_eq!(reason, "alignment must be a power of two");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }
}
