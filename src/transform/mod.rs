//! Reversible byte-to-byte mappings applied to a block before entropy coding.
//!
//! A [`Transform`] is one stage; a [`TransformPipeline`] chains up to four of
//! them and tracks, per block, which stages were skipped (passed the data
//! through verbatim) via a 4-bit mask — the same mask that ends up folded
//! into the block's mode byte.

mod error;
mod lz;
mod null;
mod rle;

pub use error::TransformError;
pub use lz::LzTransform;
pub use null::NullTransform;
pub use rle::RleTransform;

/// Pipelines never exceed this many stages; the mode byte only has four skip
/// bits to spend.
pub const MAX_STAGES: usize = 4;

/// One stage of a transform pipeline.
///
/// Implementations must be an exact left-inverse: `inverse(forward(x)) == x`
/// for every `x` the stage accepts, given the same skip decision on both
/// sides.
pub trait Transform: Send + Sync {
    /// The stream-format code identifying this transform (up to 16 bits).
    fn code(&self) -> u16;

    /// The registry name used by [`Config::with_transform`](crate::stream::Config::with_transform).
    fn name(&self) -> &'static str;

    /// Upper bound on the encoded length of an `input_len`-byte block. Must
    /// never be exceeded by [`Transform::forward`]'s actual output.
    fn max_encoded_len(&self, input_len: usize) -> usize;

    /// Encodes `input` into `output` (appended, not cleared). Returns `true`
    /// if the stage chose to pass the data through unchanged (the caller is
    /// then expected to have appended `input` verbatim and record the stage
    /// as skipped).
    fn forward(&self, input: &[u8], output: &mut Vec<u8>) -> Result<bool, TransformError>;

    /// Decodes `input` into `output` (appended, not cleared). `skipped` must
    /// match the value [`Transform::forward`] returned for this block.
    fn inverse(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        skipped: bool,
    ) -> Result<(), TransformError>;
}

/// Looks up a single named transform stage from the built-in catalogue.
///
/// The catalogue itself (beyond these reference stages) is a plug-in point;
/// callers with their own transforms construct a [`TransformPipeline`]
/// directly instead of going through this registry.
pub fn by_name(name: &str) -> Result<Box<dyn Transform>, TransformError> {
    match name {
        "NONE" => Ok(Box::new(NullTransform)),
        "RLE" => Ok(Box::new(RleTransform)),
        "LZ" => Ok(Box::new(LzTransform)),
        other => Err(TransformError::UnknownTransform(other.to_string())),
    }
}

/// Looks up a single transform stage by its stream-format code (the
/// counterpart to [`by_name`], used when decoding a header).
pub fn by_code(code: u16) -> Result<Box<dyn Transform>, TransformError> {
    match code {
        0 => Ok(Box::new(NullTransform)),
        1 => Ok(Box::new(RleTransform)),
        2 => Ok(Box::new(LzTransform)),
        other => Err(TransformError::UnknownTransformCode(other)),
    }
}

/// A sequence of up to [`MAX_STAGES`] transform stages applied in order.
pub struct TransformPipeline {
    stages: Vec<Box<dyn Transform>>,
}

impl TransformPipeline {
    pub fn new(stages: Vec<Box<dyn Transform>>) -> Result<Self, TransformError> {
        if stages.is_empty() || stages.len() > MAX_STAGES {
            return Err(TransformError::InvalidArgument(
                "a transform pipeline holds between 1 and 4 stages",
            ));
        }
        Ok(TransformPipeline { stages })
    }

    pub fn single(stage: Box<dyn Transform>) -> Self {
        TransformPipeline { stages: vec![stage] }
    }

    /// Worst-case length after every stage has run.
    pub fn max_encoded_len(&self, input_len: usize) -> usize {
        self.stages
            .iter()
            .fold(input_len, |len, stage| stage.max_encoded_len(len))
    }

    /// Runs every stage in order, returning the 4-bit skip mask (bit `i` set
    /// iff stage `i` passed its input through unchanged).
    pub fn forward(&self, input: &[u8], output: &mut Vec<u8>) -> Result<u8, TransformError> {
        let mut mask = 0u8;
        let mut current = input.to_vec();

        for (i, stage) in self.stages.iter().enumerate() {
            let mut staged = Vec::with_capacity(stage.max_encoded_len(current.len()));
            let skipped = stage.forward(&current, &mut staged)?;
            if skipped {
                mask |= 1 << i;
            }
            current = staged;
        }

        output.extend_from_slice(&current);
        Ok(mask)
    }

    /// Runs every stage in reverse order, honouring `mask`.
    pub fn inverse(&self, input: &[u8], output: &mut Vec<u8>, mask: u8) -> Result<(), TransformError> {
        let mut current = input.to_vec();

        for (i, stage) in self.stages.iter().enumerate().rev() {
            let skipped = mask & (1 << i) != 0;
            let mut staged = Vec::new();
            stage.inverse(&current, &mut staged, skipped)?;
            current = staged;
        }

        output.extend_from_slice(&current);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_stage_pipeline_round_trips() {
        let pipeline = TransformPipeline::single(Box::new(RleTransform));
        let data = b"aaaaaaaaaaabbbbbbbbbbbccccccccccc".to_vec();

        let mut encoded = Vec::new();
        let mask = pipeline.forward(&data, &mut encoded).unwrap();

        let mut decoded = Vec::new();
        pipeline.inverse(&encoded, &mut decoded, mask).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn two_stage_pipeline_round_trips() {
        let pipeline =
            TransformPipeline::new(vec![Box::new(RleTransform), Box::new(LzTransform)]).unwrap();
        let data = b"abababababababab ABCABCABCABCABC abababababababab".repeat(3);

        let mut encoded = Vec::new();
        let mask = pipeline.forward(&data, &mut encoded).unwrap();

        let mut decoded = Vec::new();
        pipeline.inverse(&encoded, &mut decoded, mask).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn unknown_transform_name_rejected() {
        assert!(matches!(
            by_name("BWT"),
            Err(TransformError::UnknownTransform(_))
        ));
    }
}
