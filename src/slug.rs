//! URL-safe slugs

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Derive a lower-case, hyphenated slug from a display name.
///
/// Accents are folded to their base letter and Latin letters without a
/// decomposition are spelled out (`ß` -> `ss`, `ø` -> `o`). Letters of other
/// scripts are kept lower-cased. Apostrophes are dropped and every other run of
/// non-alphanumeric characters becomes a single `-`. The result never starts or
/// ends with `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            for lower in c.to_lowercase() {
                match fold_latin(lower) {
                    Some(folded) => slug.push_str(folded),
                    None => slug.push(lower),
                }
            }
        } else if c != '\'' && c != '\u{2019}' {
            pending_separator = true;
        }
    }

    slug
}

/// ASCII spelling of lower-case Latin letters NFD leaves untouched
fn fold_latin(c: char) -> Option<&'static str> {
    Some(match c {
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'ø' => "o",
        'ł' => "l",
        'đ' | 'ð' => "d",
        'þ' => "th",
        'ħ' => "h",
        'ı' => "i",
        _ => return None,
    })
}
