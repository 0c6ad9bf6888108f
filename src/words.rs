use chrono::{Datelike, NaiveDate};

const ONES: [&str; 20] = [
    "Zero",
    "One",
    "Two",
    "Three",
    "Four",
    "Five",
    "Six",
    "Seven",
    "Eight",
    "Nine",
    "Ten",
    "Eleven",
    "Twelve",
    "Thirteen",
    "Fourteen",
    "Fifteen",
    "Sixteen",
    "Seventeen",
    "Eighteen",
    "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

const ORDINALS: [&str; 20] = [
    "Zeroth",
    "First",
    "Second",
    "Third",
    "Fourth",
    "Fifth",
    "Sixth",
    "Seventh",
    "Eighth",
    "Ninth",
    "Tenth",
    "Eleventh",
    "Twelfth",
    "Thirteenth",
    "Fourteenth",
    "Fifteenth",
    "Sixteenth",
    "Seventeenth",
    "Eighteenth",
    "Nineteenth",
];

/// Spells a calendar date the way the General Register writes it:
/// `2024-06-05` becomes "Fifth June Two Thousand Twenty Four".
pub fn date_in_words(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        ordinal_in_words(date.day()),
        date.format("%B"),
        number_in_words(date.year().unsigned_abs())
    )
}

fn ordinal_in_words(n: u32) -> String {
    if n < 20 {
        return ORDINALS[n as usize].to_string();
    }
    let tens = TENS[(n / 10) as usize % 10];
    match n % 10 {
        // Twenty -> Twentieth, Thirty -> Thirtieth
        0 => format!("{}ieth", tens.trim_end_matches('y')),
        unit => format!("{} {}", tens, ORDINALS[unit as usize]),
    }
}

pub fn number_in_words(n: u32) -> String {
    if n < 20 {
        return ONES[n as usize].to_string();
    }
    let mut parts: Vec<String> = Vec::new();
    let mut rest = n;
    if rest >= 1_000_000 {
        parts.push(format!("{} Million", number_in_words(rest / 1_000_000)));
        rest %= 1_000_000;
    }
    if rest >= 1000 {
        parts.push(format!("{} Thousand", number_in_words(rest / 1000)));
        rest %= 1000;
    }
    if rest >= 100 {
        parts.push(format!("{} Hundred", ONES[(rest / 100) as usize]));
        rest %= 100;
    }
    if rest >= 20 {
        parts.push(TENS[(rest / 10) as usize].to_string());
        rest %= 10;
    }
    if rest > 0 {
        parts.push(ONES[rest as usize].to_string());
    }
    parts.join(" ")
}
