//! Text folding helpers for keyword matching on statement labels

/// Upper-case and strip French diacritics ("Prélèvement" -> "PRELEVEMENT").
pub fn fold_upper(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'œ' | 'Œ' => out.push_str("OE"),
            'æ' | 'Æ' => out.push_str("AE"),
            other => out.extend(fold_char(other).to_uppercase()),
        }
    }
    out
}

/// `fold_upper` keeping only alphanumerics ("PRLV SEPA-URSSAF" -> "PRLVSEPAURSSAF").
pub fn alnum_key(s: &str) -> String {
    fold_upper(s).chars().filter(|c| c.is_alphanumeric()).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' | 'ã' => 'a',
        'À' | 'Á' | 'Â' | 'Ä' | 'Ã' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'î' | 'ï' | 'í' => 'i',
        'Î' | 'Ï' | 'Í' => 'I',
        'ô' | 'ö' | 'ó' => 'o',
        'Ô' | 'Ö' | 'Ó' => 'O',
        'ù' | 'û' | 'ü' | 'ú' => 'u',
        'Ù' | 'Û' | 'Ü' | 'Ú' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ÿ' => 'y',
        other => other,
    }
}

/// True when `needle` occurs in `haystack` delimited by non-alphanumerics.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// True when `line` starts with `prefix` followed by a word boundary.
pub fn starts_with_word(line: &str, prefix: &str) -> bool {
    match line.strip_prefix(prefix) {
        Some(rest) => {
            let last_is_alnum = prefix.chars().next_back().is_some_and(char::is_alphanumeric);
            !last_is_alnum || !rest.chars().next().is_some_and(char::is_alphanumeric)
        }
        None => false,
    }
}
