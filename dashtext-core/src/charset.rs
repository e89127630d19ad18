use std::collections::HashMap;
use std::sync::OnceLock;

// Font mapping used by the MML dialog scripts. Single characters map 1:1 to
// the in-game font sheet; bracketed tokens stand in for glyphs that have no
// text equivalent (buttons, currency marks, corner brackets).
//
// Bytes 0x14, 0x29, 0x3E, 0x53, 0x68, 0x7D, 0x84 and 0x85 are holes in the
// font sheet and deliberately absent. 0x86 is not a printable glyph at all
// but a line break control that travels with the text.
pub(crate) const CHAR_TABLE: &[(u8, &str)] = &[
    // Numbers
    (0x00, "0"),
    (0x01, "1"),
    (0x02, "2"),
    (0x03, "3"),
    (0x04, "4"),
    (0x05, "5"),
    (0x06, "6"),
    (0x07, "7"),
    (0x08, "8"),
    (0x09, "9"),
    // Symbols
    (0x0A, "ç"),
    (0x0B, "ß"),
    (0x0C, "'"),
    (0x0D, "!"),
    (0x0E, "?"),
    (0x0F, "<LCORNER>"),
    (0x10, "<DOT>"),
    (0x11, "("),
    (0x12, ")"),
    (0x13, ":"),
    // Letters
    (0x15, "A"),
    (0x16, "B"),
    (0x17, "C"),
    (0x18, "D"),
    (0x19, "E"),
    (0x1A, "F"),
    (0x1B, "G"),
    (0x1C, "H"),
    (0x1D, "I"),
    (0x1E, "J"),
    (0x1F, "K"),
    (0x20, "L"),
    (0x21, "M"),
    (0x22, "N"),
    (0x23, "O"),
    (0x24, "P"),
    (0x25, "Q"),
    (0x26, "R"),
    (0x27, "S"),
    (0x28, "T"),
    (0x2A, "U"),
    (0x2B, "V"),
    (0x2C, "W"),
    (0x2D, "X"),
    (0x2E, "Y"),
    (0x2F, "Z"),
    (0x30, "a"),
    (0x31, "b"),
    (0x32, "c"),
    (0x33, "d"),
    (0x34, "e"),
    (0x35, "f"),
    (0x36, "g"),
    (0x37, "h"),
    (0x38, "i"),
    (0x39, "j"),
    (0x3A, "k"),
    (0x3B, "l"),
    (0x3C, "m"),
    (0x3D, "n"),
    (0x3F, "o"),
    (0x40, "p"),
    (0x41, "q"),
    (0x42, "r"),
    (0x43, "s"),
    (0x44, "t"),
    (0x45, "u"),
    (0x46, "v"),
    (0x47, "w"),
    (0x48, "x"),
    (0x49, "y"),
    (0x4A, "z"),
    // Symbols
    (0x4B, "&"),
    (0x4C, "<ZAIRE>"),
    (0x4D, "<YEN>"),
    (0x4E, "/"),
    (0x4F, " "),
    (0x50, "<RCORNER>"),
    (0x51, "~"),
    (0x52, "-"),
    // Buttons
    (0x54, "<CIRCLE>"),
    (0x55, "<TRIANGLE>"),
    (0x56, "<CROSS>"),
    (0x57, "<SQUARE>"),
    (0x58, "<L1>"),
    (0x59, "<L2>"),
    (0x5A, "<R1>"),
    (0x5B, "<R2>"),
    // Other symbols
    (0x5C, ","),
    (0x5D, "\\"),
    (0x5E, "."),
    (0x5F, "<...>"),
    (0x60, "<HAND>"),
    (0x61, "+"),
    (0x62, "%"),
    // Accented letters
    (0x63, "Ä"),
    (0x64, "À"),
    (0x65, "Â"),
    (0x66, "È"),
    (0x67, "Ê"),
    (0x69, "É"),
    (0x6A, "Ï"),
    (0x6B, "Ì"),
    (0x6C, "Ö"),
    (0x6D, "Ô"),
    (0x6E, "Ü"),
    (0x6F, "Ù"),
    (0x70, "Û"),
    (0x71, "Ç"),
    (0x72, "ä"),
    (0x73, "à"),
    (0x74, "â"),
    (0x75, "è"),
    (0x76, "ê"),
    (0x77, "é"),
    (0x78, "ï"),
    (0x79, "î"),
    (0x7A, "ö"),
    (0x7B, "ô"),
    (0x7C, "ü"),
    (0x7E, "ù"),
    (0x7F, "û"),
    (0x80, "<ALPHA>"),
    (0x81, "<OMEGA>"),
    (0x82, ";"),
    (0x83, "="),
    // Line break control
    (0x86, "\n"),
];

static BYTE_TO_GLYPH: OnceLock<[Option<&'static str>; 256]> = OnceLock::new();
static GLYPH_TO_BYTE: OnceLock<HashMap<&'static str, u8>> = OnceLock::new();

/// Glyph for a byte value, or `None` when the byte opens an opcode (or is a
/// hole in the font sheet).
pub(crate) fn glyph_for_byte(byte: u8) -> Option<&'static str> {
    let table = BYTE_TO_GLYPH.get_or_init(|| {
        let mut table = [None; 256];
        for &(byte, glyph) in CHAR_TABLE {
            table[byte as usize] = Some(glyph);
        }
        table
    });
    table[byte as usize]
}

/// Byte value for a glyph string (single character or bracketed token).
pub(crate) fn byte_for_glyph(glyph: &str) -> Option<u8> {
    let map = GLYPH_TO_BYTE.get_or_init(|| CHAR_TABLE.iter().map(|&(b, g)| (g, b)).collect());
    map.get(glyph).copied()
}

/// Byte value for a single character.
pub(crate) fn byte_for_char(c: char) -> Option<u8> {
    let mut buf = [0u8; 4];
    byte_for_glyph(c.encode_utf8(&mut buf))
}
