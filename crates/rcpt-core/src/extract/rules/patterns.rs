//! Common regex patterns for receipt extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Numeric tokens considered as total candidates: 1234, 1,234, 12.50, 1,234.50
    pub static ref AMOUNT_TOKEN: Regex = Regex::new(
        r"\d{1,4}(?:,\d{3})*(?:\.\d{2})?"
    ).unwrap();

    // Amounts written with cents, trusted enough to seed the known set
    pub static ref KNOWN_AMOUNT: Regex = Regex::new(
        r"\d{1,3}(?:,\d{3})*\.\d{2}"
    ).unwrap();

    // 05/08/2019, 5-10-19, O5/O8/2O19, 05/08/19 21:15, 5/10/2019 1:46:00 PM
    pub static ref DATE_NUMERIC: Regex = Regex::new(
        r"\b[0-9Oo]{1,2}[/-][0-9Oo]{1,2}[/-][0-9Oo]{2,4}(?: \d{1,2}:\d{2}(?::\d{2})?(?: [APMapm]{2})?)?\b"
    ).unwrap();

    // 2019-05-08 or 2019/05/08
    pub static ref DATE_ISO: Regex = Regex::new(
        r"\b\d{4}[/-]\d{2}[/-]\d{2}\b"
    ).unwrap();

    // Nov 25, 2018 or 25 Nov 2018
    pub static ref DATE_ABBREVIATED_MONTH: Regex = Regex::new(
        r"(?i)\b(?:(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{1,2},?\s+\d{4}|\d{1,2}\s+(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{4})\b"
    ).unwrap();

    // November 25, 2018 or 25 November 2018
    pub static ref DATE_FULL_MONTH: Regex = Regex::new(
        r"(?i)\b(?:(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},?\s+\d{4}|\d{1,2}\s+(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{4})\b"
    ).unwrap();

    // Money entities: $12.50, $ 1,200, 12.50 USD, €4.00
    pub static ref MONEY_ENTITY: Regex = Regex::new(
        r"(?i)(?:[$€£]\s?\d{1,3}(?:,\d{3})*(?:\.\d{2})?|\d{1,3}(?:,\d{3})*(?:\.\d{2})?\s?(?:USD|EUR|GBP|dollars)\b)"
    ).unwrap();

    // Lines that name a document field rather than the merchant
    pub static ref HEADER_NOISE: Regex = Regex::new(
        r"(?i)(date|ref|invoice|total|amount|number|bill|receipt)"
    ).unwrap();

    // First numeric date used by the layout strategy
    pub static ref DATE_SIMPLE: Regex = Regex::new(
        r"(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})"
    ).unwrap();
}

/// Date patterns applied over raw text, in order.
pub fn date_patterns() -> [&'static Regex; 4] {
    [
        &DATE_NUMERIC,
        &DATE_ISO,
        &DATE_ABBREVIATED_MONTH,
        &DATE_FULL_MONTH,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all<'a>(re: &Regex, text: &'a str) -> Vec<&'a str> {
        re.find_iter(text).map(|m| m.as_str()).collect()
    }

    #[test]
    fn test_amount_token_keeps_thousands() {
        assert_eq!(
            all(&AMOUNT_TOKEN, "Total 1,234.56 qty 3"),
            vec!["1,234.56", "3"]
        );
    }

    #[test]
    fn test_numeric_date_with_time_and_noise() {
        assert_eq!(
            all(&DATE_NUMERIC, "Date: 05/08/2019 21:15 Store 0042"),
            vec!["05/08/2019 21:15"]
        );
        assert_eq!(all(&DATE_NUMERIC, "O5/O8/2O19"), vec!["O5/O8/2O19"]);
        assert_eq!(
            all(&DATE_NUMERIC, "5/10/2019 1:46:00 PM"),
            vec!["5/10/2019 1:46:00 PM"]
        );
    }

    #[test]
    fn test_iso_date_not_split_by_numeric_pattern() {
        assert!(all(&DATE_NUMERIC, "2019-05-08").is_empty());
        assert_eq!(all(&DATE_ISO, "on 2019-05-08."), vec!["2019-05-08"]);
    }

    #[test]
    fn test_month_name_orders() {
        assert_eq!(
            all(&DATE_ABBREVIATED_MONTH, "Nov 25, 2018 and 3 DEC 2018"),
            vec!["Nov 25, 2018", "3 DEC 2018"]
        );
        assert!(all(&DATE_ABBREVIATED_MONTH, "November 25, 2018").is_empty());
        assert_eq!(
            all(&DATE_FULL_MONTH, "25 November 2018 / November 25, 2018"),
            vec!["25 November 2018", "November 25, 2018"]
        );
    }

    #[test]
    fn test_money_entity() {
        assert_eq!(
            all(&MONEY_ENTITY, "Paid $1,200.00 plus 12.50 USD"),
            vec!["$1,200.00", "12.50 USD"]
        );
    }
}
