//! A hash-chained LZ77 stage, adapted from a from-scratch LZ4 block coder:
//! same dictionary, same match finder, same literal/match group encoding,
//! generalized to the [`Transform`] contract instead of an LZ4 container
//! format. There's no dependent-block or container compatibility to
//! preserve here, so only the parts of the original algorithm relevant to a
//! single self-contained block survive.

use std::cmp;
use std::convert::{TryFrom, TryInto};
use std::io::Write;
use std::mem;

use byteorder::{ByteOrder, NativeEndian, WriteBytesExt, LE};

use super::{Transform, TransformError};

const HASHLOG: usize = 12;
const DICTIONARY_SIZE: usize = 1 << HASHLOG;
const MINMATCH: usize = 4;
const ACCELERATION: usize = 1;
const SKIP_TRIGGER: usize = 6;

struct U32Table {
    dict: [u32; DICTIONARY_SIZE],
}

impl Default for U32Table {
    fn default() -> Self {
        U32Table { dict: [0; DICTIONARY_SIZE] }
    }
}

#[cfg(target_pointer_width = "64")]
fn hash_for_u32(input: &[u8]) -> usize {
    let v = input.get(..8).map(NativeEndian::read_u64).unwrap_or(0);
    #[cfg(target_endian = "little")]
    fn checksum_u64(v: u64) -> u64 {
        (v << 24).wrapping_mul(889_523_592_379)
    }
    #[cfg(target_endian = "big")]
    fn checksum_u64(v: u64) -> u64 {
        (v >> 24).wrapping_mul(11_400_714_785_074_694_791)
    }
    (checksum_u64(v) >> (64 - HASHLOG)) as usize
}

#[cfg(not(target_pointer_width = "64"))]
fn hash_for_u32(input: &[u8]) -> usize {
    let v = NativeEndian::read_u32(input);
    ((v.wrapping_mul(2654435761) >> (32 - HASHLOG - 1)) as usize) >> 1
}

impl U32Table {
    /// Replaces the dictionary entry for the 4/5-byte sequence starting at
    /// `offset` with `offset` itself, returning the previous occupant.
    fn replace(&mut self, input: &[u8], offset: usize) -> usize {
        let mut value: u32 = offset.try_into().expect("block larger than 4 GiB");
        mem::swap(&mut self.dict[hash_for_u32(&input[offset..])], &mut value);
        usize::try_from(value).expect("not supported on 16-bit archs")
    }
}

#[derive(Copy, Clone)]
struct Duplicate {
    offset: u16,
    extra_bytes: usize,
}

fn count_matching_bytes(a: &[u8], b: &[u8]) -> usize {
    const REGSIZE: usize = mem::size_of::<usize>();
    fn read_usize(b: &[u8]) -> usize {
        let mut buf = [0u8; REGSIZE];
        buf.copy_from_slice(&b[..REGSIZE]);
        usize::from_le_bytes(buf)
    }
    #[cfg(target_endian = "little")]
    fn archdep_zeros(i: usize) -> u32 {
        i.trailing_zeros()
    }
    #[cfg(target_endian = "big")]
    fn archdep_zeros(i: usize) -> u32 {
        i.leading_zeros()
    }

    let mut matching_bytes = 0;
    for (a, b) in a.chunks_exact(REGSIZE).zip(b.chunks_exact(REGSIZE)) {
        let xor = read_usize(a) ^ read_usize(b);
        if xor == 0 {
            matching_bytes += REGSIZE;
        } else {
            matching_bytes += (archdep_zeros(xor) / 8) as usize;
            return matching_bytes;
        }
    }

    let trailing = a
        .iter()
        .zip(b)
        .skip(matching_bytes)
        .take_while(|&(a, b)| a == b)
        .count();
    matching_bytes + trailing
}

fn write_lsic_head(token: &mut u8, shift: usize, value: usize) {
    let i = cmp::min(value, 0xF) as u8;
    *token |= i << shift;
}

fn write_lsic_tail<W: Write>(writer: &mut W, mut value: usize) -> std::io::Result<()> {
    if value < 0xF {
        return Ok(());
    }
    value -= 0xF;
    while value >= 4 * 0xFF {
        writer.write_u32::<NativeEndian>(u32::MAX)?;
        value -= 4 * 0xFF;
    }
    while value >= 0xFF {
        writer.write_u8(0xFF)?;
        value -= 0xFF;
    }
    writer.write_u8(value as u8)
}

fn write_group<W: Write>(writer: &mut W, literal: &[u8], duplicate: Duplicate) -> std::io::Result<()> {
    let literal_len = literal.len();
    let mut token = 0;
    write_lsic_head(&mut token, 4, literal_len);
    write_lsic_head(&mut token, 0, duplicate.extra_bytes);

    writer.write_u8(token)?;
    write_lsic_tail(writer, literal_len)?;
    writer.write_all(literal)?;
    writer.write_u16::<LE>(duplicate.offset)?;
    write_lsic_tail(writer, duplicate.extra_bytes)
}

fn compress_into(input: &[u8], writer: &mut Vec<u8>) -> std::io::Result<()> {
    let mut table = U32Table::default();
    let mut cursor = 0usize;

    while cursor < input.len() {
        let literal_start = cursor;
        let mut step_counter = ACCELERATION << SKIP_TRIGGER;
        let mut step = 1;

        let duplicate = loop {
            if input.len().saturating_sub(cursor) < 12 {
                let literal_len = input.len() - literal_start;
                let mut token = 0;
                write_lsic_head(&mut token, 4, literal_len);
                writer.write_u8(token)?;
                write_lsic_tail(writer, literal_len)?;
                writer.write_all(&input[literal_start..][..literal_len])?;
                return Ok(());
            }

            let current_batch = &input[cursor..(input.len() - 5)];
            let candidate = table.replace(input, cursor);

            if cursor != 0 && cursor - candidate <= 0xFFFF {
                let candidate_batch = &input[candidate..];
                let matching_bytes = count_matching_bytes(current_batch, candidate_batch);

                if let Some(mut extra_bytes) = matching_bytes.checked_sub(MINMATCH) {
                    let offset = (cursor - candidate) as u16;
                    let max_backtrack = cursor - literal_start;
                    let backtrack = input[..cursor]
                        .iter()
                        .rev()
                        .zip(input[..candidate].iter().rev())
                        .take(max_backtrack)
                        .take_while(|&(a, b)| a == b)
                        .count();
                    extra_bytes += backtrack;
                    cursor += matching_bytes;
                    table.replace(input, cursor - 2);
                    break Duplicate { offset, extra_bytes };
                }
            }

            cursor += step;
            step = step_counter >> SKIP_TRIGGER;
            if literal_start + 1 != cursor {
                step_counter += 1;
            }
        };

        let literal_end = cursor - duplicate.extra_bytes - MINMATCH;
        write_group(writer, &input[literal_start..literal_end], duplicate)?;
    }

    Ok(())
}

/// This is how LZ4-style blocks encode varints: keep reading and adding
/// while the byte is all-ones.
fn read_lsic(initial: u8, input: &[u8], pos: &mut usize) -> Result<usize, TransformError> {
    let mut value: usize = initial.into();
    if value == 0xF {
        loop {
            let more = *input.get(*pos).ok_or(TransformError::UnexpectedEnd)?;
            *pos += 1;
            value += usize::from(more);
            if more != 0xFF {
                break;
            }
        }
    }
    Ok(value)
}

fn copy_overlapping(
    offset: usize,
    match_len: usize,
    output: &mut Vec<u8>,
) -> Result<(), TransformError> {
    let old_len = output.len();
    match offset {
        0 => return Err(TransformError::ZeroDeduplicationOffset),
        i if i > old_len => return Err(TransformError::InvalidDeduplicationOffset),
        1 => output.resize(old_len + match_len, output[old_len - 1]),
        o if match_len <= o => {
            output.resize(old_len + match_len, 0);
            let (head, tail) = output.split_at_mut(old_len);
            tail.copy_from_slice(&head[old_len - offset..][..match_len]);
        }
        2 | 4 | 8 => {
            let mut buf = [0u8; 16];
            for chunk in buf.chunks_mut(offset) {
                chunk.copy_from_slice(&output[old_len - offset..][..offset]);
            }
            output.resize(old_len + match_len, 0);
            for target in output[old_len..].chunks_mut(buf.len()) {
                target.copy_from_slice(&buf[..target.len()]);
            }
        }
        _ => {
            output.reserve(match_len);
            for i in 0..match_len {
                let b = output[old_len - offset + i];
                output.push(b);
            }
        }
    }
    Ok(())
}

fn decompress_into(input: &[u8], output: &mut Vec<u8>) -> Result<(), TransformError> {
    let mut pos = 0usize;
    while pos < input.len() {
        let token = input[pos];
        pos += 1;

        let literal_length = read_lsic(token >> 4, input, &mut pos)?;
        let start = output.len();
        output.resize(start + literal_length, 0);
        let src = input.get(pos..pos + literal_length).ok_or(TransformError::UnexpectedEnd)?;
        output[start..].copy_from_slice(src);
        pos += literal_length;

        if pos >= input.len() {
            break;
        }
        let offset = u16::from_le_bytes(
            input
                .get(pos..pos + 2)
                .ok_or(TransformError::UnexpectedEnd)?
                .try_into()
                .unwrap(),
        );
        pos += 2;
        let match_len = 4 + read_lsic(token & 0xF, input, &mut pos)?;
        copy_overlapping(offset.into(), match_len, output)?;
    }
    Ok(())
}

pub struct LzTransform;

impl Transform for LzTransform {
    fn code(&self) -> u16 {
        2
    }

    fn name(&self) -> &'static str {
        "LZ"
    }

    fn max_encoded_len(&self, input_len: usize) -> usize {
        input_len + input_len / 255 + 16
    }

    fn forward(&self, input: &[u8], output: &mut Vec<u8>) -> Result<bool, TransformError> {
        compress_into(input, output)?;
        Ok(false)
    }

    fn inverse(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        skipped: bool,
    ) -> Result<(), TransformError> {
        if skipped {
            output.extend_from_slice(input);
            return Ok(());
        }
        decompress_into(input, output)
    }
}
