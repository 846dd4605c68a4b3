use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Punctuation removed for the stripped (`nnp`) comparison form.
pub const STRIPPED_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '\'', '"', '(', ')', '[', ']', '{', '}', '-', '\u{2010}',
    '\u{2013}', '\u{2014}', '\u{00B7}', '\u{0387}', '\u{037E}', '\u{2018}', '\u{2019}',
    '\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}', '*', '/', '\\',
];

pub fn normalize_nfc(s: &str) -> String { s.nfc().collect() }

/// Decompose, drop combining marks, recompose. Punctuation is kept.
pub fn strip_diacritics(s: &str) -> String {
    let bare: String = s.nfd().filter(|c| !is_combining_mark(*c)).collect();
    bare.nfc().collect()
}

/// Decompose, drop combining marks and the fixed punctuation set, recompose.
pub fn strip_diacritics_and_punctuation(s: &str) -> String {
    let bare: String = s
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();
    bare.nfc().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nfc_composes() {
        let decomposed = "e\u{0301}";
        assert_eq!(normalize_nfc(decomposed), "\u{00E9}");
    }

    #[test]
    fn strips_accents_and_punctuation() {
        assert_eq!(strip_diacritics_and_punctuation("Πάσχα."), "Πασχα");
        assert_eq!(strip_diacritics_and_punctuation("Χριστὸς ἀνέστη!"), "Χριστος ανεστη");
        assert_eq!(strip_diacritics_and_punctuation("café, s'il"), "cafe sil");
    }

    #[test]
    fn diacritics_only_keeps_punctuation() {
        assert_eq!(strip_diacritics("Πάσχα.*"), "Πασχα.*");
        assert_eq!(strip_diacritics("(ἀν|ἐν)έστη"), "(αν|εν)εστη");
    }
}
