//! Deterministic SMS segmentation.
//!
//! Text that fits the GSM 03.38 default alphabet is measured in septets
//! (extension characters cost two). Anything else is sent as UCS-2 and
//! measured in UTF-16 code units. A character is never split across parts,
//! so surrogate pairs and escape sequences stay intact.

/// GSM 03.38 basic character set.
const GSM_BASIC: &str = "@£$¥èéùìòÇ\nØø\rÅåΔ_ΦΓΛΩΠΨΣΘΞÆæßÉ !\"#¤%&'()*+,-./0123456789:;<=>?\
¡ABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§¿abcdefghijklmnopqrstuvwxyzäöñüà";

/// GSM 03.38 extension table, each costing an escape plus the character.
const GSM_EXTENSION: &str = "\u{000C}^{}\\[~]|€";

/// Septets in a single-part GSM message.
pub const GSM_SINGLE_LIMIT: usize = 160;
/// Septets per part of a concatenated GSM message.
pub const GSM_MULTIPART_LIMIT: usize = 153;
/// UTF-16 units in a single-part UCS-2 message.
pub const UCS2_SINGLE_LIMIT: usize = 70;
/// UTF-16 units per part of a concatenated UCS-2 message.
pub const UCS2_MULTIPART_LIMIT: usize = 67;

/// Character encoding chosen for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// GSM 7-bit default alphabet.
    Gsm7,
    /// UCS-2 (UTF-16 code units).
    Ucs2,
}

impl Encoding {
    /// Pick GSM-7 when every character is representable, else UCS-2.
    pub fn detect(text: &str) -> Self {
        if text.chars().all(|c| gsm_cost(c).is_some()) {
            Self::Gsm7
        } else {
            Self::Ucs2
        }
    }

    /// `(single_part_limit, per_part_limit)` in encoding units.
    pub fn limits(self) -> (usize, usize) {
        match self {
            Self::Gsm7 => (GSM_SINGLE_LIMIT, GSM_MULTIPART_LIMIT),
            Self::Ucs2 => (UCS2_SINGLE_LIMIT, UCS2_MULTIPART_LIMIT),
        }
    }

    fn cost(self, c: char) -> usize {
        match self {
            Self::Gsm7 => gsm_cost(c).unwrap_or(2),
            Self::Ucs2 => c.len_utf16(),
        }
    }
}

fn gsm_cost(c: char) -> Option<usize> {
    if GSM_BASIC.contains(c) {
        Some(1)
    } else if GSM_EXTENSION.contains(c) {
        Some(2)
    } else {
        None
    }
}

/// Split `text` into transport-sized parts, preserving order.
///
/// Concatenating the parts always yields the original text. Text that fits
/// one unit comes back as a single part (an empty body is one empty part).
pub fn divide(text: &str) -> Vec<String> {
    let encoding = Encoding::detect(text);
    let (single, per_part) = encoding.limits();
    let total = text
        .chars()
        .map(|c| encoding.cost(c))
        .fold(0usize, usize::saturating_add);
    if total <= single {
        return vec![text.to_owned()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut used = 0usize;
    for c in text.chars() {
        let cost = encoding.cost(c);
        if used.saturating_add(cost) > per_part && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(c);
        used = used.saturating_add(cost);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
