use super::{Transform, TransformError};

/// Identity stage: copies its input through unchanged.
///
/// Reports `skipped = false` on every block — unlike a stage that chooses
/// to bypass itself based on the data, this one's entire job *is* to pass
/// data through, so there is nothing to flag as skipped.
pub struct NullTransform;

impl Transform for NullTransform {
    fn code(&self) -> u16 {
        0
    }

    fn name(&self) -> &'static str {
        "NONE"
    }

    fn max_encoded_len(&self, input_len: usize) -> usize {
        input_len
    }

    fn forward(&self, input: &[u8], output: &mut Vec<u8>) -> Result<bool, TransformError> {
        output.extend_from_slice(input);
        Ok(false)
    }

    fn inverse(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        _skipped: bool,
    ) -> Result<(), TransformError> {
        output.extend_from_slice(input);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips() {
        let t = NullTransform;
        let data = b"whatever goes in comes back out";
        let mut encoded = Vec::new();
        t.forward(data, &mut encoded).unwrap();
        assert_eq!(encoded, data);

        let mut decoded = Vec::new();
        t.inverse(&encoded, &mut decoded, false).unwrap();
        assert_eq!(decoded, data);
    }
}
