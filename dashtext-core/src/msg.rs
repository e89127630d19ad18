use crate::text;
use crate::{DashTextError, Result};

/// Byte length of the fixed header region preceding the pointer table.
pub const HEADER_SIZE: usize = 0x800;
/// Header offset of the little-endian u32 length field counting every
/// table and payload byte after the header.
pub const LENGTH_FIELD_OFFSET: usize = 4;

/// Absolute byte range of one dialog block inside an MSG entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockSpan {
    pub start: usize,
    pub end: usize,
}

/// Parsed view of an MSG entry: the declared payload length, the raw
/// pointer table and the absolute block ranges it describes.
pub(crate) struct MsgLayout {
    pub payload_len: usize,
    pub table: Vec<u16>,
    pub spans: Vec<BlockSpan>,
}

pub(crate) fn parse_msg_layout(raw: &[u8]) -> Result<MsgLayout> {
    if raw.len() < HEADER_SIZE + 2 {
        return Err(DashTextError::Format(format!(
            "MSG entry is {} bytes, too small for a header and pointer table",
            raw.len()
        )));
    }

    let payload_len = u32::from_le_bytes([
        raw[LENGTH_FIELD_OFFSET],
        raw[LENGTH_FIELD_OFFSET + 1],
        raw[LENGTH_FIELD_OFFSET + 2],
        raw[LENGTH_FIELD_OFFSET + 3],
    ]) as usize;
    if HEADER_SIZE + payload_len > raw.len() {
        return Err(DashTextError::Format(format!(
            "MSG header declares {} payload bytes but the entry holds {}",
            payload_len,
            raw.len() - HEADER_SIZE
        )));
    }

    let table_size = u16::from_le_bytes([raw[HEADER_SIZE], raw[HEADER_SIZE + 1]]) as usize;
    if table_size < 2 || table_size % 2 != 0 {
        return Err(DashTextError::Format(format!(
            "MSG pointer table size {table_size} is invalid"
        )));
    }
    if table_size > payload_len {
        return Err(DashTextError::Format(format!(
            "MSG pointer table ({table_size} bytes) exceeds the declared payload ({payload_len} bytes)"
        )));
    }

    // The first entry doubles as the table byte size and the offset of the
    // first block, which sits directly behind the table.
    let count = table_size / 2;
    let mut table = Vec::with_capacity(count);
    for i in 0..count {
        let pos = HEADER_SIZE + i * 2;
        table.push(u16::from_le_bytes([raw[pos], raw[pos + 1]]));
    }

    let mut spans = Vec::with_capacity(count);
    for i in 0..count {
        let start = table[i] as usize;
        // Walking past the last entry means "up to the declared payload end".
        let end = if i + 1 < count {
            table[i + 1] as usize
        } else {
            payload_len
        };
        if end < start || end > payload_len {
            return Err(DashTextError::Format(format!(
                "MSG pointer table is not monotonic at block {}",
                i + 1
            )));
        }
        spans.push(BlockSpan {
            start: HEADER_SIZE + start,
            end: HEADER_SIZE + end,
        });
    }

    Ok(MsgLayout {
        payload_len,
        table,
        spans,
    })
}

/// Decode a whole MSG entry into its annotated text artifact: one labeled
/// section per block, offsets in absolute 4-digit uppercase hex. Labels are
/// for human navigation only and are never parsed back.
pub fn extract_to_string(raw: &[u8]) -> Result<String> {
    let layout = parse_msg_layout(raw)?;

    let mut out = String::new();
    for (i, span) in layout.spans.iter().enumerate() {
        out.push_str(&format!(
            "[Block {}, String: {:04X}-{:04X}]\n",
            i + 1,
            span.start,
            span.end
        ));
        out.push_str(&text::decode_block(&raw[span.start..span.end]));
        out.push_str("\n\n");
    }
    Ok(out)
}

/// Split an annotated text artifact into per-block text spans, in file
/// order. Decoded dialog can never contain `[`, so every occurrence opens
/// a block label.
pub(crate) fn split_blocks(artifact: &str) -> Result<Vec<&str>> {
    let starts: Vec<usize> = artifact.match_indices('[').map(|(pos, _)| pos).collect();

    let mut blocks = Vec::with_capacity(starts.len());
    for (i, &label_start) in starts.iter().enumerate() {
        let close = match artifact[label_start..].find(']') {
            Some(off) => label_start + off,
            None => {
                return Err(DashTextError::Format(format!(
                    "block label {} is never closed",
                    i + 1
                )))
            }
        };
        if !artifact[close + 1..].starts_with('\n') {
            return Err(DashTextError::Format(format!(
                "block label {} is not on its own line",
                i + 1
            )));
        }

        // Content runs from just past the label line to just before the
        // blank line separating it from the next label (or end of file).
        let content_start = close + 2;
        let content_end = match starts.get(i + 1) {
            Some(&next_start) => next_start,
            None => artifact.len(),
        };
        if content_end < content_start + 2
            || &artifact.as_bytes()[content_end - 2..content_end] != b"\n\n"
        {
            return Err(DashTextError::Format(format!(
                "block {} is not terminated by a blank line",
                i + 1
            )));
        }
        blocks.push(&artifact[content_start..content_end - 2]);
    }
    Ok(blocks)
}

/// Re-encode an edited text artifact into a byte-exact MSG entry.
///
/// The block count is fixed by the original pointer table; the table is
/// rebuilt from the cumulative encoded block lengths, the header length
/// field is updated and the remainder is zero filled. The result always has
/// the same length as `raw`, and nothing is produced at all if the encoded
/// payload would not fit that allocation.
pub fn insert_from_str(raw: &[u8], artifact: &str) -> Result<Vec<u8>> {
    let layout = parse_msg_layout(raw)?;

    let blocks = split_blocks(artifact)?;
    if blocks.len() != layout.spans.len() {
        return Err(DashTextError::BlockCountMismatch {
            expected: layout.spans.len(),
            found: blocks.len(),
        });
    }

    let mut encoded_blocks = Vec::with_capacity(blocks.len());
    for block in &blocks {
        encoded_blocks.push(text::encode_block(block)?);
    }

    // The table's own size never changes on edit, so its first entry is
    // carried over; the rest are cumulative sums of the new block lengths.
    let table_size = layout.table[0] as usize;
    let mut table: Vec<u16> = Vec::with_capacity(encoded_blocks.len());
    table.push(layout.table[0]);
    let mut offset = table_size;
    for encoded in &encoded_blocks[..encoded_blocks.len() - 1] {
        offset += encoded.len();
        let entry = u16::try_from(offset).map_err(|_| {
            DashTextError::Format(format!(
                "MSG pointer entry {offset} does not fit in 16 bits"
            ))
        })?;
        table.push(entry);
    }

    let payload_bytes: usize = encoded_blocks.iter().map(|b| b.len()).sum();
    let new_total = HEADER_SIZE + table_size + payload_bytes;
    if new_total > raw.len() {
        return Err(DashTextError::EntryOverflow {
            new_size: new_total,
            limit: raw.len(),
        });
    }

    let mut out = Vec::with_capacity(raw.len());
    out.extend_from_slice(&raw[..HEADER_SIZE]);
    let new_len = (table_size + payload_bytes) as u32;
    out[LENGTH_FIELD_OFFSET..LENGTH_FIELD_OFFSET + 4].copy_from_slice(&new_len.to_le_bytes());
    for entry in &table {
        out.extend_from_slice(&entry.to_le_bytes());
    }
    for encoded in &encoded_blocks {
        out.extend_from_slice(encoded);
    }
    out.extend(std::iter::repeat(0u8).take(raw.len() - out.len()));
    Ok(out)
}
