//! Number parsing, including German number words and compounds
//! like "dreihundertvierundsiebzig".

fn ones(word: &str) -> Option<i64> {
    Some(match word {
        "null" => 0,
        "ein" | "eins" => 1,
        "zwei" => 2,
        "drei" => 3,
        "vier" => 4,
        "fünf" => 5,
        "sechs" => 6,
        "sieben" => 7,
        "acht" => 8,
        "neun" => 9,
        _ => return None,
    })
}

fn teens(word: &str) -> Option<i64> {
    Some(match word {
        "zehn" => 10,
        "elf" => 11,
        "zwölf" => 12,
        "dreizehn" => 13,
        "vierzehn" => 14,
        "fünfzehn" => 15,
        "sechzehn" => 16,
        "siebzehn" => 17,
        "achtzehn" => 18,
        "neunzehn" => 19,
        _ => return None,
    })
}

fn tens(word: &str) -> Option<i64> {
    Some(match word {
        "zwanzig" => 20,
        "dreißig" | "dreissig" => 30,
        "vierzig" => 40,
        "fünfzig" => 50,
        "sechzig" => 60,
        "siebzig" => 70,
        "achtzig" => 80,
        "neunzig" => 90,
        _ => return None,
    })
}

// "vierundsiebzig" → 74
fn compound_under_100(word: &str) -> Option<i64> {
    if let Some(n) = ones(word).or_else(|| teens(word)).or_else(|| tens(word)) {
        return Some(n);
    }
    let (ones_part, tens_part) = word.split_once("und")?;
    Some(ones(ones_part.trim())? + tens(tens_part.trim())?)
}

/// Parse a German number word, including compounds with "hundert"
/// and "tausend". Returns `None` for anything unrecognized.
pub fn parse_german_number(input: &str) -> Option<i64> {
    let text = input.trim().to_lowercase();

    if text == "hundert" {
        return Some(100);
    }
    if text == "tausend" {
        return Some(1000);
    }
    if let Some(n) = compound_under_100(&text) {
        return Some(n);
    }

    let mut result = 0i64;
    let mut remaining = text.as_str();
    let mut consumed = false;

    if let Some((prefix, rest)) = remaining.split_once("tausend") {
        let prefix = prefix.trim();
        let factor = if prefix.is_empty() {
            1
        } else {
            compound_under_100(prefix)?
        };
        result += factor * 1000;
        remaining = rest.trim_start();
        consumed = true;
    }

    if let Some((prefix, rest)) = remaining.split_once("hundert") {
        let prefix = prefix.trim();
        let factor = if prefix.is_empty() { 1 } else { ones(prefix)? };
        result += factor * 100;
        remaining = rest.trim_start();
        consumed = true;
    }

    if !remaining.is_empty() {
        result += compound_under_100(remaining)?;
        consumed = true;
    }

    consumed.then_some(result)
}

/// Parse a numeric string, tolerating decimal commas and embedded
/// spaces, falling back to German number words.
pub fn parse_number(input: &str) -> Option<f64> {
    let text = input.trim().to_lowercase();

    if let Some(n) = parse_german_number(&text) {
        return Some(n as f64);
    }

    text.replace(',', ".").replace(' ', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_words() {
        assert_eq!(parse_german_number("drei"), Some(3));
        assert_eq!(parse_german_number("zwölf"), Some(12));
        assert_eq!(parse_german_number("vierzig"), Some(40));
        assert_eq!(parse_german_number("null"), Some(0));
    }

    #[test]
    fn test_compounds() {
        assert_eq!(parse_german_number("vierundsiebzig"), Some(74));
        assert_eq!(parse_german_number("dreihundert"), Some(300));
        assert_eq!(parse_german_number("dreihundertvierundsiebzig"), Some(374));
        assert_eq!(parse_german_number("zweitausend"), Some(2000));
        assert_eq!(parse_german_number("eintausendfünfhundert"), Some(1500));
        assert_eq!(parse_german_number("einundzwanzigtausend"), Some(21000));
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(parse_german_number("viele"), None);
        assert_eq!(parse_german_number(""), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("3,5"), Some(3.5));
        assert_eq!(parse_number("1 000"), Some(1000.0));
        assert_eq!(parse_number("dreihundertfünfzig"), Some(350.0));
        assert_eq!(parse_number("keine Zahl"), None);
    }
}
