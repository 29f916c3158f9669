// Text primitives shared by the matcher and the report ordering.

use std::cmp::Ordering;

/// Folds Arabic orthographic variants that are routinely mixed in names.
/// Returns None for characters that should be dropped (diacritics, tatweel).
fn fold_char(c: char) -> Option<char> {
    match c {
        // tashkeel, superscript alef, tatweel
        '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0640}' => None,
        'أ' | 'إ' | 'آ' | 'ٱ' => Some('ا'),
        'ة' => Some('ه'),
        'ى' | 'ئ' => Some('ي'),
        'ؤ' => Some('و'),
        _ => Some(c),
    }
}

/// Lower-cases, folds Arabic variants, turns punctuation into spaces and
/// collapses whitespace.
pub fn normalize_name(s: &str) -> String {
    let folded: String = s
        .to_lowercase()
        .chars()
        .filter_map(fold_char)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<&str>>().join(" ")
}

pub fn tokens(s: &str) -> Vec<String> {
    normalize_name(s)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Honorifics and professional titles, in normalized form.
pub const DEFAULT_TITLES: &[&str] = &[
    "dr", "doctor", "pharmacist", "pharm", "ph", "mr", "mrs", "ms", "miss", "eng", "prof", "د",
    "دكتور", "الدكتور", "دكتوره", "الدكتوره", "ص", "صيدلي", "الصيدلي", "صيدلانيه", "الصيدلانيه",
    "م", "مهندس", "المهندس", "ا", "استاذ", "الاستاذ",
];

/// Removes title tokens, unless nothing would be left.
pub fn strip_titles(tokens: &[String], titles: &[String]) -> Vec<String> {
    let res: Vec<String> = tokens
        .iter()
        .filter(|t| !titles.iter().any(|title| title == *t))
        .cloned()
        .collect();
    if res.is_empty() {
        tokens.to_vec()
    } else {
        res
    }
}

/// Whether the token is written with Arabic letters.
pub fn is_arabic(token: &str) -> bool {
    token
        .chars()
        .any(|c| ('\u{0600}'..='\u{06FF}').contains(&c))
}

/// A rough consonant skeleton shared by Arabic and Latin spellings of a name.
///
/// "Mohamed", "Mohammed" and "محمد" all give "mhmd".
pub fn skeleton(token: &str) -> String {
    let lower = token.to_lowercase();
    let s = lower
        .replace("kh", "x")
        .replace("sh", "$")
        .replace("gh", "G")
        .replace("th", "t")
        .replace("dh", "d");
    let mut out = String::new();
    for c in s.chars() {
        let mapped: Option<char> = match c {
            'c' | 'q' => Some('k'),
            'g' => Some('j'),
            'p' => Some('b'),
            'v' => Some('f'),
            'b' | 'd' | 'f' | 'h' | 'j' | 'k' | 'l' | 'm' | 'n' | 'r' | 's' | 't' | 'x' | 'z'
            | '$' | 'G' => Some(c),
            'ب' => Some('b'),
            'ت' | 'ث' | 'ط' => Some('t'),
            'ج' => Some('j'),
            'ح' | 'ه' | 'ة' => Some('h'),
            'خ' => Some('x'),
            'د' | 'ذ' | 'ض' => Some('d'),
            'ر' => Some('r'),
            'ز' | 'ظ' => Some('z'),
            'س' | 'ص' => Some('s'),
            'ش' => Some('$'),
            'غ' => Some('G'),
            'ف' => Some('f'),
            'ق' | 'ك' => Some('k'),
            'ل' => Some('l'),
            'م' => Some('m'),
            'ن' => Some('n'),
            // vowels, semi-vowels, hamza and ain carry no reliable consonant
            _ => None,
        };
        if let Some(m) = mapped {
            if !out.ends_with(m) {
                out.push(m);
            }
        }
    }
    // "Sarah" / "Sara" / "سارة"
    if out.len() > 1 && out.ends_with('h') {
        out.pop();
    }
    out
}

/// Edit distance between two strings, counted in characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur: Vec<usize> = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// 1.0 for identical strings, 0.0 for completely different ones.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64) / (max_len as f64)
}

pub fn collation_key(s: &str) -> String {
    normalize_name(s)
}

/// Display order of names: case-insensitive, with Arabic variants folded.
/// Falls back to the raw strings so that the order is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}
