use thiserror::Error;

use crate::charset;
use crate::opcodes::{self, ArgLayout, FieldWidth, OpcodeDef};

/// Errors that can occur while converting dialog text to and from script
/// bytes.
#[derive(Debug, Error)]
pub enum TextCodecError {
    #[error("byte 0x{byte:02X} has no glyph in the character table")]
    UnmappedByte { byte: u8 },

    #[error("glyph {glyph:?} has no byte in the character table")]
    UnknownGlyph { glyph: String },

    #[error("tag <{tag}...> is never closed")]
    UnterminatedTag { tag: String },

    #[error("tag <{tag}> matches no opcode and is not a raw hex byte")]
    MalformedTag { tag: String },

    #[error("wrong argument count for <{tag}>: expected {expected} bytes, got {got}")]
    WrongArgCount {
        tag: String,
        expected: usize,
        got: usize,
    },

    #[error("failed to parse hex field '{token}' in <{tag}>")]
    BadHexField {
        tag: String,
        token: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Decode a single glyph byte. Fails on opcode leads and font-sheet holes.
pub fn decode_char(byte: u8) -> Result<&'static str, TextCodecError> {
    charset::glyph_for_byte(byte).ok_or(TextCodecError::UnmappedByte { byte })
}

/// Encode a single glyph (plain character or bracketed token like
/// `<CIRCLE>`) back to its byte value.
pub fn encode_glyph(glyph: &str) -> Result<u8, TextCodecError> {
    charset::byte_for_glyph(glyph).ok_or_else(|| TextCodecError::UnknownGlyph {
        glyph: glyph.to_string(),
    })
}

/// Decode one block of script bytes into annotated text.
///
/// Total over arbitrary input: plain bytes come from the character table,
/// catalog opcodes render as `<TAG ...>` markers, and anything else renders
/// as a raw `<XX>` marker consuming one byte. Decoding then re-encoding is
/// the identity on any byte sequence.
pub fn decode_block(data: &[u8]) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        if let Some(glyph) = charset::glyph_for_byte(byte) {
            out.push_str(glyph);
            i += 1;
            continue;
        }
        i += render_opcode(byte, &data[i + 1..], &mut out);
    }
    out
}

/// Decode one opcode (or raw byte) given its lead byte and the payload
/// behind it. Returns the rendered tag text and the total number of bytes
/// consumed, lead byte included; always at least 1.
pub fn decode_opcode(lead: u8, payload: &[u8]) -> (String, usize) {
    let mut out = String::new();
    let consumed = render_opcode(lead, payload, &mut out);
    (out, consumed)
}

fn render_opcode(lead: u8, payload: &[u8], out: &mut String) -> usize {
    let def = match opcodes::entry_for_payload(lead, payload) {
        Some(def) => def,
        None => {
            out.push_str(&format!("<{lead:02X}>"));
            return 1;
        }
    };

    out.push('<');
    out.push_str(def.name);
    match def.layout {
        ArgLayout::Seq { count, reversed } => {
            out.push(' ');
            if reversed {
                for byte in payload[..count].iter().rev() {
                    out.push_str(&format!("{byte:02X}"));
                }
            } else {
                for byte in &payload[..count] {
                    out.push_str(&format!("{byte:02X}"));
                }
            }
        }
        ArgLayout::Named { fields } => {
            let mut pos = 0;
            for field in fields {
                out.push(' ');
                out.push_str(field.name);
                out.push('=');
                match field.width {
                    FieldWidth::Byte => {
                        out.push_str(&format!("{:02X}", payload[pos]));
                    }
                    FieldWidth::Word => {
                        let value = u16::from_le_bytes([payload[pos], payload[pos + 1]]);
                        out.push_str(&format!("{value:04X}"));
                    }
                }
                pos += field.width.byte_len();
            }
        }
        ArgLayout::Fixed { .. } => {}
    }
    out.push('>');
    if def.breaks_line {
        out.push('\n');
    }
    1 + def.payload_len()
}

/// Encode one block of annotated text back into script bytes.
///
/// Plain characters go through the character table; `<...>` tags go through
/// the fixed-token table first, then the opcode catalog by longest matching
/// prefix, and finally the raw 2-hex-digit byte fallback. A line feed
/// directly after a line-breaking tag is presentation injected by the
/// decoder and is swallowed, not encoded.
pub fn encode_block(text: &str) -> Result<Vec<u8>, TextCodecError> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        let c = match rest.chars().next() {
            Some(c) => c,
            None => break,
        };
        if c != '<' {
            match charset::byte_for_char(c) {
                Some(byte) => out.push(byte),
                None => {
                    return Err(TextCodecError::UnknownGlyph {
                        glyph: c.to_string(),
                    })
                }
            }
            i += c.len_utf8();
            continue;
        }

        let close = match rest.find('>') {
            Some(off) => off,
            None => {
                return Err(TextCodecError::UnterminatedTag {
                    tag: rest.chars().skip(1).take(16).collect(),
                })
            }
        };
        let tag = &rest[1..close];
        let breaks_line = encode_tag_into(tag, &mut out)?;
        i += close + 1;
        if breaks_line && text[i..].starts_with('\n') {
            i += 1;
        }
    }
    Ok(out)
}

/// Encode one tag (the text between angle brackets) to bytes.
pub fn encode_tag(tag: &str) -> Result<Vec<u8>, TextCodecError> {
    let mut out = Vec::new();
    encode_tag_into(tag, &mut out)?;
    Ok(out)
}

/// Append the encoding of one tag to `out`. Returns whether the tag's
/// textual form is followed by a presentation line feed that the caller
/// must swallow.
fn encode_tag_into(tag: &str, out: &mut Vec<u8>) -> Result<bool, TextCodecError> {
    // Fixed character-table tokens come first: <CIRCLE>, <ZAIRE>, <...> and
    // friends are glyphs, not opcodes.
    if let Some(byte) = charset::byte_for_glyph(&format!("<{tag}>")) {
        out.push(byte);
        return Ok(false);
    }

    let def = match opcodes::entry_for_tag(tag) {
        Some(def) => def,
        None => {
            // Universal fallback: the whole tag is one raw hex byte.
            if tag.len() == 2 && tag.bytes().all(|b| b.is_ascii_hexdigit()) {
                if let Ok(byte) = u8::from_str_radix(tag, 16) {
                    out.push(byte);
                    return Ok(false);
                }
            }
            return Err(TextCodecError::MalformedTag {
                tag: tag.to_string(),
            });
        }
    };

    out.push(def.lead);
    match def.layout {
        ArgLayout::Seq { count, reversed } => {
            let group = parse_seq_args(tag, def, count)?;
            if reversed {
                out.extend(group.iter().rev());
            } else {
                out.extend(&group);
            }
        }
        ArgLayout::Named { fields } => parse_named_args(tag, def, fields, out)?,
        ArgLayout::Fixed { tail } => out.extend_from_slice(tail),
    }

    // An entry selected by prefix can still carry a payload that belongs to
    // a different entry of the same lead (a UNK1 whose sixth byte was edited
    // away from FF would decode as UNK2 next time around). Refuse it.
    if let Some((offset, value)) = def.discriminator {
        let payload = &out[out.len() - def.payload_len()..];
        if payload[offset] != value {
            return Err(TextCodecError::MalformedTag {
                tag: tag.to_string(),
            });
        }
    }

    Ok(def.breaks_line)
}

/// Parse the single concatenated hex group of a sequence-layout tag, in
/// text order.
fn parse_seq_args(tag: &str, def: &OpcodeDef, count: usize) -> Result<Vec<u8>, TextCodecError> {
    let mut tokens = tag[def.match_prefix.len()..].split_whitespace();
    let token = match (tokens.next(), tokens.next()) {
        (Some(token), None) => token,
        _ => {
            return Err(TextCodecError::MalformedTag {
                tag: tag.to_string(),
            })
        }
    };

    let digits: Vec<char> = token.chars().collect();
    if digits.len() % 2 != 0 {
        return Err(TextCodecError::MalformedTag {
            tag: tag.to_string(),
        });
    }
    if digits.len() / 2 != count {
        return Err(TextCodecError::WrongArgCount {
            tag: tag.to_string(),
            expected: count,
            got: digits.len() / 2,
        });
    }

    let mut bytes = Vec::with_capacity(count);
    for pair in digits.chunks(2) {
        let group: String = pair.iter().collect();
        bytes.push(parse_hex_u8(tag, &group)?);
    }
    Ok(bytes)
}

/// Parse the `KEY=VALUE` fields of a named-layout tag. Fields are matched
/// by position, not by key, mirroring how the decoder renders them.
fn parse_named_args(
    tag: &str,
    def: &OpcodeDef,
    fields: &[opcodes::Field],
    out: &mut Vec<u8>,
) -> Result<(), TextCodecError> {
    let tokens: Vec<&str> = tag[def.name.len()..].split_whitespace().collect();
    if tokens.len() != fields.len() {
        return Err(TextCodecError::WrongArgCount {
            tag: tag.to_string(),
            expected: fields.len(),
            got: tokens.len(),
        });
    }

    for (field, token) in fields.iter().zip(&tokens) {
        let value = match token.split_once('=') {
            Some((_, value)) => value,
            None => {
                return Err(TextCodecError::MalformedTag {
                    tag: tag.to_string(),
                })
            }
        };
        if value.chars().count() != field.width.hex_digits() {
            return Err(TextCodecError::MalformedTag {
                tag: tag.to_string(),
            });
        }
        match field.width {
            FieldWidth::Byte => out.push(parse_hex_u8(tag, value)?),
            FieldWidth::Word => {
                let [lo, hi] = parse_hex_u16(tag, value)?.to_le_bytes();
                out.push(lo);
                out.push(hi);
            }
        }
    }
    Ok(())
}

fn parse_hex_u8(tag: &str, token: &str) -> Result<u8, TextCodecError> {
    u8::from_str_radix(token, 16).map_err(|e| TextCodecError::BadHexField {
        tag: tag.to_string(),
        token: token.to_string(),
        source: e,
    })
}

fn parse_hex_u16(tag: &str, token: &str) -> Result<u16, TextCodecError> {
    u16::from_str_radix(token, 16).map_err(|e| TextCodecError::BadHexField {
        tag: tag.to_string(),
        token: token.to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn decodes_plain_text() {
        assert_eq!(decode_block(&[0x15, 0x43, 0x43]), "Ass");
        assert_eq!(
            decode_block(&[0x1C, 0x34, 0x3B, 0x40, 0x0D, 0x86, 0x02, 0x09]),
            "Help!\n29"
        );
    }

    #[test]
    fn encodes_plain_text() {
        assert_eq!(encode_block("Ass").unwrap(), vec![0x15, 0x43, 0x43]);
        assert_eq!(
            encode_block("Help!\n29").unwrap(),
            vec![0x1C, 0x34, 0x3B, 0x40, 0x0D, 0x86, 0x02, 0x09]
        );
    }

    #[test]
    fn color_tag_round_trips() {
        assert_eq!(decode_block(&[0x89, 0x02]), "<COLOR 02>");
        assert_eq!(encode_block("<COLOR 02>").unwrap(), vec![0x89, 0x02]);
        assert_eq!(encode_tag("COLOR 02").unwrap(), vec![0x89, 0x02]);
    }

    #[test]
    fn reversed_sequence_args() {
        // PAUSE stores its argument low byte first but renders it high
        // byte first.
        assert_eq!(decode_block(&[0x8B, 0x34, 0x12]), "<PAUSE 1234>\n");
        assert_eq!(encode_block("<PAUSE 1234>\n").unwrap(), vec![0x8B, 0x34, 0x12]);
        assert_eq!(
            encode_block("<CLOSE 0102030405>").unwrap(),
            vec![0xA9, 0x05, 0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn named_fields_split_words_little_endian() {
        let bytes = [0x8C, 0x50, 0x00, 0x20, 0x00, 0x10, 0x02, 0x00, 0xFF, 0x01];
        let text = "<MENU PX=0050 PY=0020 SX=10 SY=02 ?=00 WAT=FF BORDER=01>\n";
        assert_eq!(decode_block(&bytes), text);
        assert_eq!(encode_block(text).unwrap(), bytes.to_vec());
    }

    #[test]
    fn window_variants_round_trip() {
        let t8c = [
            0xA1, 0x8C, 0x50, 0x00, 0x20, 0x00, 0x10, 0x02, 0x00, 0xFF, 0x01,
        ];
        let t8c_text = "<WIN_MAIN_1 T=8C PX=0050 PY=0020 SX=10 SY=02 ?=00 WAT=FF BORDER=01>\n";
        assert_eq!(decode_block(&t8c), t8c_text);
        assert_eq!(encode_block(t8c_text).unwrap(), t8c.to_vec());

        let t94 = [
            0xA1, 0x94, 0x01, 0x50, 0x00, 0x20, 0x00, 0x10, 0x02, 0x00, 0xFF, 0x01,
        ];
        let t94_text =
            "<WIN_MAIN_1 T=94 ?=01 PX=0050 PY=0020 SX=10 SY=02 ?=00 WAT=FF BORDER=01>\n";
        assert_eq!(decode_block(&t94), t94_text);
        assert_eq!(encode_block(t94_text).unwrap(), t94.to_vec());

        let main2 = [
            0xA2, 0x94, 0x50, 0x00, 0x20, 0x00, 0x10, 0x02, 0x00, 0xFF, 0x01,
        ];
        let main2_text = "<WIN_MAIN_2 T=94 PX=0050 PY=0020 SX=10 SY=02 ?=00 WAT=FF BORDER=01>\n";
        assert_eq!(decode_block(&main2), main2_text);
        assert_eq!(encode_block(main2_text).unwrap(), main2.to_vec());
    }

    #[test]
    fn unk1_requires_ff_marker() {
        assert_eq!(
            decode_block(&[0x8A, 0x01, 0x02, 0x03, 0x04, 0x05, 0xFF]),
            "<UNK1 0102030405FF>\n"
        );
        assert_eq!(decode_block(&[0x8A, 0xAB, 0xCD]), "<UNK2 ABCD>");
        assert_eq!(
            encode_block("<UNK1 0102030405FF>\n").unwrap(),
            vec![0x8A, 0x01, 0x02, 0x03, 0x04, 0x05, 0xFF]
        );
        // Sixth byte not FF would decode as UNK2 plus leftovers; refuse it.
        assert!(matches!(
            encode_block("<UNK1 010203040506>"),
            Err(TextCodecError::MalformedTag { .. })
        ));
    }

    #[test]
    fn price_sequences_render_bare() {
        let zaire = [0xBA, 0x4F, 0x4F, 0x4F, 0x4F, 0x4F, 0x4F];
        assert_eq!(decode_block(&zaire), "<PRICE_ZAIRE>");
        assert_eq!(encode_block("<PRICE_ZAIRE>").unwrap(), zaire.to_vec());
        assert_eq!(
            encode_block("<PRICE_ZENNY>").unwrap(),
            vec![0xD3, 0x4F, 0x4F, 0x4F, 0x4F, 0x4F, 0x4F]
        );
        // A 0xBA without the full blank run is not a price placeholder.
        assert_eq!(
            decode_block(&[0xBA, 0x4F, 0x4F, 0x00]),
            "<BA>  0"
        );
    }

    #[test]
    fn raw_fallback_keeps_unknown_bytes() {
        assert_eq!(decode_block(&[0x92]), "<92>");
        assert_eq!(decode_block(&[0x14]), "<14>");
        assert_eq!(encode_block("<92>").unwrap(), vec![0x92]);
        assert_eq!(encode_block("<14>").unwrap(), vec![0x14]);
    }

    #[test]
    fn truncated_opcodes_fall_back_to_raw() {
        // 0x8B wants two payload bytes; at the end of a block it degrades
        // to a raw byte instead of running off the buffer.
        assert_eq!(decode_block(&[0x8B]), "<8B>");
        assert_eq!(decode_block(&[0x8B, 0x12]), "<8B>)");
        assert_eq!(decode_block(&[0xA1, 0x8C]), "<A1><8C>");
    }

    #[test]
    fn decode_opcode_is_total() {
        for lead in 0..=0xFFu16 {
            let lead = lead as u8;
            let (tag, consumed) = decode_opcode(lead, &[]);
            assert!(consumed >= 1);
            assert!(!tag.is_empty());
            let (_, consumed) = decode_opcode(lead, &[0x4F; 16]);
            assert!(consumed >= 1);
        }
    }

    #[test]
    fn line_feed_swallowed_only_after_breaking_tags() {
        // WAIT injects a line feed on decode, so one following line feed is
        // presentation and disappears.
        assert_eq!(encode_block("<WAIT 0102>\n").unwrap(), vec![0xA4, 0x02, 0x01]);
        assert_eq!(encode_block("<WAIT 0102>").unwrap(), vec![0xA4, 0x02, 0x01]);
        // A second line feed is real payload again.
        assert_eq!(
            encode_block("<WAIT 0102>\n\n").unwrap(),
            vec![0xA4, 0x02, 0x01, 0x86]
        );
        // UNK5 does not break the line; its line feed is payload.
        assert_eq!(
            encode_block("<UNK5 ABCD>\n").unwrap(),
            vec![0x9A, 0xCD, 0xAB, 0x86]
        );
    }

    #[test]
    fn char_tokens_win_over_opcode_prefixes() {
        assert_eq!(encode_block("<CIRCLE>").unwrap(), vec![0x54]);
        assert_eq!(encode_block("<...>").unwrap(), vec![0x5F]);
        assert_eq!(
            encode_block("Press <CROSS>!").unwrap(),
            vec![0x24, 0x42, 0x34, 0x43, 0x43, 0x4F, 0x56, 0x0D]
        );
    }

    #[test]
    fn single_glyph_contract() {
        assert_eq!(decode_char(0x15).unwrap(), "A");
        assert_eq!(decode_char(0x86).unwrap(), "\n");
        assert!(matches!(
            decode_char(0x89),
            Err(TextCodecError::UnmappedByte { byte: 0x89 })
        ));
        assert_eq!(encode_glyph("A").unwrap(), 0x15);
        assert_eq!(encode_glyph("<CIRCLE>").unwrap(), 0x54);
        assert!(matches!(
            encode_glyph("@"),
            Err(TextCodecError::UnknownGlyph { .. })
        ));
    }

    #[test]
    fn every_byte_is_glyph_or_opcode_ground() {
        // The glyph domain and the opcode/raw domain partition the byte
        // space: decode_block never fails and never skips input.
        for byte in 0..=0xFFu16 {
            let byte = byte as u8;
            let text = decode_block(&[byte]);
            assert!(!text.is_empty());
            if decode_char(byte).is_err() {
                assert!(text.starts_with('<'));
            }
        }
    }

    #[test]
    fn encode_rejects_bad_input() {
        assert!(matches!(
            encode_block("caf@"),
            Err(TextCodecError::UnknownGlyph { .. })
        ));
        assert!(matches!(
            encode_block("<WIBBLE>"),
            Err(TextCodecError::MalformedTag { .. })
        ));
        assert!(matches!(
            encode_block("<PAUSE 12"),
            Err(TextCodecError::UnterminatedTag { .. })
        ));
        assert!(matches!(
            encode_block("<PAUSE 12>"),
            Err(TextCodecError::WrongArgCount {
                expected: 2,
                got: 1,
                ..
            })
        ));
        assert!(matches!(
            encode_block("<PAUSE XYZW>"),
            Err(TextCodecError::BadHexField { .. })
        ));
        assert!(matches!(
            encode_block("<MENU PX=0050>"),
            Err(TextCodecError::WrongArgCount { .. })
        ));
        // Window type byte outside the two known variants.
        assert!(matches!(
            encode_block("<WIN_MAIN_1 T=77 PX=0050 PY=0020 SX=10 SY=02 ?=00 WAT=FF BORDER=01>"),
            Err(TextCodecError::MalformedTag { .. })
        ));
    }

    #[test]
    fn accented_text_round_trips() {
        let bytes = [0x71, 0x30, 0x0A, 0x30, 0x4F, 0x77, 0x44, 0x77];
        let text = decode_block(&bytes);
        assert_eq!(text, "Çaça été");
        assert_eq!(encode_block(&text).unwrap(), bytes.to_vec());
    }

    #[test]
    fn opcode_classes_round_trip_byte_exact() {
        let samples: &[&[u8]] = &[
            &[0x89, 0x00],
            &[0x8A, 0x01, 0x02, 0x03, 0x04, 0x05, 0xFF],
            &[0x8A, 0x10, 0x20],
            &[0x8B, 0x34, 0x12],
            &[0x8C, 0x50, 0x00, 0x20, 0x00, 0x10, 0x02, 0x00, 0xFF, 0x01],
            &[0x8E, 0x01, 0x02],
            &[0x8F, 0x04, 0x03, 0x02, 0x01],
            &[0x93, 0xAA, 0xBB],
            &[0x96, 0x00, 0x01],
            &[0x99, 0x12, 0x34],
            &[0x9A, 0x12, 0x34],
            &[0x9B, 0x56, 0x78],
            &[0x9C, 0x9A, 0xBC],
            &[0x9F, 0x03, 0x02, 0x01],
            &[0xA0, 0x00, 0x00],
            &[0xA1, 0x8C, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08],
            &[0xA1, 0x94, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09],
            &[0xA2, 0x94, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08],
            &[0xA4, 0x10, 0x00],
            &[0xA9, 0x05, 0x04, 0x03, 0x02, 0x01],
            &[0xBA, 0x4F, 0x4F, 0x4F, 0x4F, 0x4F, 0x4F],
            &[0xD0, 0x44, 0x33, 0x22, 0x11],
            &[0xD3, 0x4F, 0x4F, 0x4F, 0x4F, 0x4F, 0x4F],
        ];
        for &bytes in samples {
            let text = decode_block(bytes);
            let back = encode_block(&text).unwrap();
            assert_eq!(back, bytes.to_vec(), "round trip failed for {text:?}");
        }
    }

    #[test]
    fn random_soup_round_trips() {
        let mut rng = StdRng::seed_from_u64(0xDA5);
        for _ in 0..256 {
            let len = rng.gen_range(0..48);
            let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let text = decode_block(&bytes);
            let back = encode_block(&text).unwrap();
            assert_eq!(back, bytes, "round trip failed for {text:?}");
        }
    }
}
