#![forbid(unsafe_code)]

use std::cmp::Ordering;

/// Locale-style string comparison for display ordering.
///
/// Primary strength ignores case and Latin diacritics ("álvaro" sorts with
/// "alvaro", "Ñ" with "n"). Ties are broken by accents, then by case with
/// lowercase first, then by code points, so the order is total.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    primary_chars(a)
        .cmp(primary_chars(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| case_key(a).cmp(case_key(b)))
        .then_with(|| a.cmp(b))
}

fn primary_chars(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase).map(fold_accent)
}

// Lowercase before uppercase at equal letters.
fn case_key(s: &str) -> impl Iterator<Item = u8> + '_ {
    s.chars().map(|c| u8::from(c.is_uppercase()))
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ě' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' => 'i',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' => 'u',
        'ý' | 'ÿ' => 'y',
        'š' | 'ś' => 's',
        'ž' | 'ź' | 'ż' => 'z',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accents_do_not_jump_past_z() {
        // Plain code point order would put "Álvaro" after "Zoe".
        assert_eq!(locale_cmp("Álvaro", "Zoe"), Ordering::Less);
        assert_eq!(locale_cmp("Ñandú", "Oscar"), Ordering::Less);
        assert_eq!(locale_cmp("Núñez", "Nunez"), Ordering::Greater);
    }

    #[test]
    fn case_insensitive_primary_with_lowercase_first() {
        assert_eq!(locale_cmp("ana", "Bea"), Ordering::Less);
        assert_eq!(locale_cmp("ana", "Ana"), Ordering::Less);
        assert_eq!(locale_cmp("Ana", "Ana"), Ordering::Equal);
    }

    #[test]
    fn ordering_is_antisymmetric() {
        let words = ["gmail", "Gmail", "hotmail", "empresa", "custom1", "custom2", "Émile", "emile"];
        for a in words {
            for b in words {
                assert_eq!(locale_cmp(a, b), locale_cmp(b, a).reverse(), "{a} vs {b}");
            }
        }
    }
}
