/// Width of one named argument field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldWidth {
    /// One byte, rendered as 2 hex digits.
    Byte,
    /// Two bytes little-endian, rendered as 4 hex digits.
    Word,
}

impl FieldWidth {
    pub(crate) fn byte_len(self) -> usize {
        match self {
            FieldWidth::Byte => 1,
            FieldWidth::Word => 2,
        }
    }

    pub(crate) fn hex_digits(self) -> usize {
        self.byte_len() * 2
    }
}

/// One `KEY=VALUE` field of a named-layout opcode.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Field {
    pub name: &'static str,
    pub width: FieldWidth,
}

/// How an opcode's payload bytes are rendered and parsed.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ArgLayout {
    /// Run of single bytes rendered as one concatenated hex group.
    /// `reversed` swaps stream order against text order.
    Seq { count: usize, reversed: bool },
    /// `KEY=VALUE` fields in text order; `Word` fields are stored split
    /// little-endian across two payload bytes.
    Named { fields: &'static [Field] },
    /// Constant payload, rendered with no arguments at all.
    Fixed { tail: &'static [u8] },
}

/// One control opcode of the dialog script format.
///
/// The catalog below is the single source of truth for opcode shapes: the
/// block decoder and the tag codec only ever consult it, they never carry
/// opcode byte values of their own.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OpcodeDef {
    pub lead: u8,
    /// Tag name as rendered inside the angle brackets.
    pub name: &'static str,
    /// Prefix that selects this entry when encoding. Longer than `name`
    /// where several entries share it (the two WIN_MAIN_1 variants).
    pub match_prefix: &'static str,
    /// Extra payload byte that must hold a fixed value for this entry to
    /// apply, as `(payload offset, value)`.
    pub discriminator: Option<(usize, u8)>,
    pub layout: ArgLayout,
    /// Tag is followed by a presentation line feed on decode; the same
    /// line feed is swallowed again on encode.
    pub breaks_line: bool,
}

impl OpcodeDef {
    /// Payload bytes consumed after the lead byte.
    pub(crate) fn payload_len(&self) -> usize {
        match self.layout {
            ArgLayout::Seq { count, .. } => count,
            ArgLayout::Named { fields } => fields.iter().map(|f| f.width.byte_len()).sum(),
            ArgLayout::Fixed { tail } => tail.len(),
        }
    }

    /// Whether this entry applies to the payload following its lead byte.
    /// A payload too short for the full argument run never matches; the
    /// caller falls back to raw single-byte rendering.
    pub(crate) fn matches_payload(&self, payload: &[u8]) -> bool {
        if payload.len() < self.payload_len() {
            return false;
        }
        if let Some((offset, value)) = self.discriminator {
            if payload.get(offset).copied() != Some(value) {
                return false;
            }
        }
        if let ArgLayout::Fixed { tail } = self.layout {
            if &payload[..tail.len()] != tail {
                return false;
            }
        }
        true
    }
}

const MENU_FIELDS: &[Field] = &[
    Field { name: "PX", width: FieldWidth::Word },
    Field { name: "PY", width: FieldWidth::Word },
    Field { name: "SX", width: FieldWidth::Byte },
    Field { name: "SY", width: FieldWidth::Byte },
    Field { name: "?", width: FieldWidth::Byte },
    Field { name: "WAT", width: FieldWidth::Byte },
    Field { name: "BORDER", width: FieldWidth::Byte },
];

// Window opcodes carry the window type byte as their first field, so the
// discriminator value reappears in the rendered tag (T=8C / T=94).
const WIN_FIELDS: &[Field] = &[
    Field { name: "T", width: FieldWidth::Byte },
    Field { name: "PX", width: FieldWidth::Word },
    Field { name: "PY", width: FieldWidth::Word },
    Field { name: "SX", width: FieldWidth::Byte },
    Field { name: "SY", width: FieldWidth::Byte },
    Field { name: "?", width: FieldWidth::Byte },
    Field { name: "WAT", width: FieldWidth::Byte },
    Field { name: "BORDER", width: FieldWidth::Byte },
];

const WIN_T94_FIELDS: &[Field] = &[
    Field { name: "T", width: FieldWidth::Byte },
    Field { name: "?", width: FieldWidth::Byte },
    Field { name: "PX", width: FieldWidth::Word },
    Field { name: "PY", width: FieldWidth::Word },
    Field { name: "SX", width: FieldWidth::Byte },
    Field { name: "SY", width: FieldWidth::Byte },
    Field { name: "?", width: FieldWidth::Byte },
    Field { name: "WAT", width: FieldWidth::Byte },
    Field { name: "BORDER", width: FieldWidth::Byte },
];

const PRICE_TAIL: &[u8] = &[0x4F, 0x4F, 0x4F, 0x4F, 0x4F, 0x4F];

// Every control opcode of the script format. Order matters for leads shared
// by several entries: the first whose discriminator matches wins (UNK1
// before UNK2 on 0x8A, the T=8C window before the T=94 one on 0xA1).
//
// The UNK* opcodes and the "?" fields are decoded by position only; their
// in-game meaning is unconfirmed and nothing here depends on it.
pub(crate) const OPCODES: &[OpcodeDef] = &[
    OpcodeDef {
        lead: 0x89,
        name: "COLOR",
        match_prefix: "COLOR",
        discriminator: None,
        layout: ArgLayout::Seq { count: 1, reversed: false },
        breaks_line: false,
        // 00 white, 02 red, 04 blue, 05 purple
    },
    OpcodeDef {
        lead: 0x8A,
        name: "UNK1",
        match_prefix: "UNK1",
        discriminator: Some((5, 0xFF)),
        layout: ArgLayout::Seq { count: 6, reversed: false },
        breaks_line: true,
    },
    OpcodeDef {
        lead: 0x8A,
        name: "UNK2",
        match_prefix: "UNK2",
        discriminator: None,
        layout: ArgLayout::Seq { count: 2, reversed: false },
        breaks_line: false,
    },
    OpcodeDef {
        lead: 0x8B,
        name: "PAUSE",
        match_prefix: "PAUSE",
        discriminator: None,
        layout: ArgLayout::Seq { count: 2, reversed: true },
        breaks_line: true,
    },
    OpcodeDef {
        lead: 0x8C,
        name: "MENU",
        match_prefix: "MENU",
        discriminator: None,
        layout: ArgLayout::Named { fields: MENU_FIELDS },
        breaks_line: true,
    },
    OpcodeDef {
        lead: 0x8E,
        name: "UNK3",
        match_prefix: "UNK3",
        discriminator: None,
        layout: ArgLayout::Seq { count: 2, reversed: false },
        breaks_line: false,
    },
    OpcodeDef {
        lead: 0x8F,
        name: "AUDIO",
        match_prefix: "AUDIO",
        discriminator: None,
        layout: ArgLayout::Seq { count: 4, reversed: true },
        breaks_line: true,
    },
    OpcodeDef {
        lead: 0x93,
        name: "UNK4",
        match_prefix: "UNK4",
        discriminator: None,
        layout: ArgLayout::Seq { count: 2, reversed: false },
        breaks_line: false,
    },
    OpcodeDef {
        lead: 0x96,
        name: "SEL",
        match_prefix: "SEL",
        discriminator: None,
        layout: ArgLayout::Seq { count: 2, reversed: false },
        breaks_line: false,
    },
    OpcodeDef {
        lead: 0x99,
        name: "JMP",
        match_prefix: "JMP",
        discriminator: None,
        layout: ArgLayout::Seq { count: 2, reversed: false },
        breaks_line: false,
    },
    OpcodeDef {
        lead: 0x9A,
        name: "UNK5",
        match_prefix: "UNK5",
        discriminator: None,
        layout: ArgLayout::Seq { count: 2, reversed: true },
        breaks_line: false,
    },
    OpcodeDef {
        lead: 0x9B,
        name: "UNK6",
        match_prefix: "UNK6",
        discriminator: None,
        layout: ArgLayout::Seq { count: 2, reversed: true },
        breaks_line: false,
    },
    OpcodeDef {
        lead: 0x9C,
        name: "MSG_ID",
        match_prefix: "MSG_ID",
        discriminator: None,
        layout: ArgLayout::Seq { count: 2, reversed: true },
        breaks_line: false,
    },
    OpcodeDef {
        lead: 0x9F,
        name: "WIN_SUB",
        match_prefix: "WIN_SUB",
        discriminator: None,
        layout: ArgLayout::Seq { count: 3, reversed: true },
        breaks_line: true,
    },
    OpcodeDef {
        lead: 0xA0,
        name: "PAD",
        match_prefix: "PAD",
        discriminator: None,
        layout: ArgLayout::Seq { count: 2, reversed: true },
        breaks_line: false,
    },
    OpcodeDef {
        lead: 0xA1,
        name: "WIN_MAIN_1",
        match_prefix: "WIN_MAIN_1 T=8C",
        discriminator: Some((0, 0x8C)),
        layout: ArgLayout::Named { fields: WIN_FIELDS },
        breaks_line: true,
    },
    OpcodeDef {
        lead: 0xA1,
        name: "WIN_MAIN_1",
        match_prefix: "WIN_MAIN_1 T=94",
        discriminator: Some((0, 0x94)),
        layout: ArgLayout::Named { fields: WIN_T94_FIELDS },
        breaks_line: true,
    },
    OpcodeDef {
        lead: 0xA2,
        name: "WIN_MAIN_2",
        match_prefix: "WIN_MAIN_2",
        discriminator: Some((0, 0x94)),
        layout: ArgLayout::Named { fields: WIN_FIELDS },
        breaks_line: true,
    },
    OpcodeDef {
        lead: 0xA4,
        name: "WAIT",
        match_prefix: "WAIT",
        discriminator: None,
        layout: ArgLayout::Seq { count: 2, reversed: true },
        breaks_line: true,
    },
    OpcodeDef {
        lead: 0xA9,
        name: "CLOSE",
        match_prefix: "CLOSE",
        discriminator: None,
        layout: ArgLayout::Seq { count: 5, reversed: true },
        breaks_line: false,
    },
    OpcodeDef {
        lead: 0xBA,
        name: "PRICE_ZAIRE",
        match_prefix: "PRICE_ZAIRE",
        discriminator: None,
        layout: ArgLayout::Fixed { tail: PRICE_TAIL },
        breaks_line: false,
    },
    OpcodeDef {
        lead: 0xD0,
        name: "ITEM",
        match_prefix: "ITEM",
        discriminator: None,
        layout: ArgLayout::Seq { count: 4, reversed: true },
        breaks_line: false,
    },
    OpcodeDef {
        lead: 0xD3,
        name: "PRICE_ZENNY",
        match_prefix: "PRICE_ZENNY",
        discriminator: None,
        layout: ArgLayout::Fixed { tail: PRICE_TAIL },
        breaks_line: false,
    },
];

/// Catalog entry for a lead byte and the payload behind it, honoring
/// discriminators and catalog order. `None` means raw-byte fallback.
pub(crate) fn entry_for_payload(lead: u8, payload: &[u8]) -> Option<&'static OpcodeDef> {
    OPCODES
        .iter()
        .filter(|def| def.lead == lead)
        .find(|def| def.matches_payload(payload))
}

/// Catalog entry whose match prefix starts the given tag text, preferring
/// the most specific prefix. `None` means raw hex-byte fallback.
pub(crate) fn entry_for_tag(tag: &str) -> Option<&'static OpcodeDef> {
    OPCODES
        .iter()
        .filter(|def| tag.starts_with(def.match_prefix))
        .max_by_key(|def| def.match_prefix.len())
}
