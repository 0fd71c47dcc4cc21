//! Precompiled pattern tables for payment-comment screening
//!
//! Two rule sets drive the quick filter: phrases that definitely carry no
//! person name, and phrases that likely do. Both are compiled once and held
//! read-only for the process lifetime. The tables also own the greeting
//! suppression set, the standard payment purpose vocabulary, and the
//! stop-word scanner used to validate verifier output.

use aho_corasick::{AhoCorasick, MatchKind};
use nameguard_core::{Error, Result};
use regex::{Regex, RegexBuilder};

/// Phrases that indicate no person name is present
const NO_NAME_PATTERNS: &[&str] = &[
    // Salary and payments
    r"^(зарплата|зп|з/п|заробітна плата)(\s|$|\.)",
    r"^(аванс|премія|премия|виплата|выплата)(\s|$|\.)",
    r"^(відпускні|отпускные|лікарняні|больничные)(\s|$|\.)",
    r"^(компенсація|компенсация|допомога|помощь)(\s|$|\.)",
    // Taxes and fees
    r"^(податки|податок|налоги|налог)(\s|$|\.)",
    r"^(єсв|ндфл|пдв|ндс|єдиний внесок)(\s|$|\.)",
    r"^(військовий збір|военный сбор)(\s|$|\.)",
    // Transfers without names
    r"^(поповнення|пополнение)(\s|$|\.)",
    r"^(переказ коштів|перевод средств)$",
    r"^(переказ|перевод)$",
    r"^(оплата послуг|оплата услуг)(\s|$|\.)",
    r"^(комунальні|коммунальные)(\s|$|\.)",
    // Numbers only
    r"^\d+[\s\.]*(грн|uah|₴|usd|\$|eur|€)?$",
    r"^[\d\s\.,]+$",
    // Document references
    r"^(рахунок|счет|invoice|інвойс)(\s|#|№|\d)",
    r"^(замовлення|заказ|order)(\s|#|№|\d)",
    r"^(договір|договор|contract)(\s|#|№|\d)",
    r"^(акт|рахунок-фактура)(\s|#|№|\d)",
    // Service payments
    r"^(за (послуги|товари|роботи|services))(\s|$|\.)",
    r"^(оренда|аренда|rent)(\s|$|\.)",
    r"^(кредит|позика|займ|loan)(\s|$|\.)",
    r"^(повернення|возврат|refund)(\s|$|\.)",
    // Utilities
    r"^(електроенергія|электроэнергия|gas|газ|вода|water)(\s|$|\.)",
    r"^(інтернет|internet|телефон|phone)(\s|$|\.)",
    // Business terms
    r"^(прибуток|прибыль|дохід|доход)(\s|$|\.)",
    r"^(витрати|расходы|costs)(\s|$|\.)",
    r"^(бюджет|budget)(\s|$|\.)",
    // Period markers
    r"^за\s+(січень|лютий|березень|квітень|травень|червень)",
    r"^за\s+(липень|серпень|вересень|жовтень|листопад|грудень)",
    r"^за\s+(январь|февраль|март|апрель|май|июнь)",
    r"^за\s+(июль|август|сентябрь|октябрь|ноябрь|декабрь)",
    r"^за\s+\d+\s*(місяць|месяц|квартал|рік|год)",
    r"^за\s+\d{1,2}[\./]\d{2,4}",
    // Greetings and slogans
    r"^слава україні$",
    r"^зі святим миколаєм$",
    r"^з новим роком$",
    r"^вітаю з різдвом$",
    r"^з днем народження$",
    r"^з 8 березня$",
];

/// Phrases that indicate a person name is likely present
const NAME_INDICATOR_PATTERNS: &[&str] = &[
    // Transfer to person
    r"(переказ|перевод|на карту|на картку)\s+[А-ЯІЇЄҐА-яіїєґ]+",
    r"(від|от|from)\s+[А-ЯІЇЄҐ][а-яіїєґ]+",
    r"(для|кому|to)\s+[А-ЯІЇЄҐ][а-яіїєґ]+",
    // Surname + name + patronymic
    r"[А-ЯІЇЄҐ][а-яіїєґ]+\s+[А-ЯІЇЄҐ][а-яіїєґ]+\s+[А-ЯІЇЄҐ][а-яіїєґ]+ович",
    r"[А-ЯІЇЄҐ][а-яіїєґ]+\s+[А-ЯІЇЄҐ][а-яіїєґ]+\s+[А-ЯІЇЄҐ][а-яіїєґ]+івна",
    r"[А-ЯІЇЄҐ][а-яіїєґ]+\s+[А-ЯІЇЄҐ][а-яіїєґ]+\s+[А-ЯІЇЄҐ][а-яіїєґ]+овна",
    // Initials, e.g. "Іванов І.І."
    r"[А-ЯІЇЄҐ][а-яіїєґ]+\s+[А-ЯІЇЄҐ]\.\s*[А-ЯІЇЄҐ]\.",
];

/// Greeting phrases that must never survive as detected names
const GREETING_PHRASES: &[&str] = &[
    "слава україні",
    "зі святим миколаєм",
    "з новим роком",
    "вітаю з різдвом",
    "з днем народження",
    "з 8 березня",
];

/// Standard payment purpose vocabulary used by the comment-splitting heuristic
const PURPOSE_WORDS: &[&str] = &[
    "зарплата",
    "зп",
    "премія",
    "премия",
    "аванс",
    "виплата",
    "выплата",
    "переказ",
    "перевод",
    "оплата",
    "платіж",
    "платеж",
];

/// Payment-domain vocabulary the verifier must never return as a name
const STOP_WORDS: &[&str] = &[
    "зарплата",
    "премія",
    "аванс",
    "виплата",
    "переказ",
    "податки",
    "поповнення",
    "рахунок",
    "оплата",
    "послуги",
    "товари",
];

/// Compiled pattern tables, built once per process
pub struct PatternMatcher {
    no_name: Vec<Regex>,
    name_indicator: Vec<Regex>,
    stop_words: AhoCorasick,
}

impl PatternMatcher {
    /// Compile all pattern tables
    pub fn new() -> Result<Self> {
        Ok(Self {
            no_name: compile_all(NO_NAME_PATTERNS)?,
            name_indicator: compile_all(NAME_INDICATOR_PATTERNS)?,
            stop_words: AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostLongest)
                .build(STOP_WORDS)
                .map_err(|e| Error::internal(format!("failed to build stop-word scanner: {}", e)))?,
        })
    }

    /// True if any no-name pattern matches anywhere in the text
    pub fn matches_no_name(&self, text: &str) -> bool {
        let text = text.trim();
        self.no_name.iter().any(|p| p.is_match(text))
    }

    /// True if any name-indicator pattern matches anywhere in the text
    pub fn matches_name_indicator(&self, text: &str) -> bool {
        let text = text.trim();
        self.name_indicator.iter().any(|p| p.is_match(text))
    }

    /// True if the token is payment-domain vocabulary, not a name
    pub fn is_stop_word(&self, token: &str) -> bool {
        let token = token.trim().to_lowercase();
        self.stop_words
            .find(&token)
            .map(|m| m.start() == 0 && m.end() == token.len())
            .unwrap_or(false)
    }

    /// True if the whole text is a known greeting phrase
    pub fn is_greeting(&self, text: &str) -> bool {
        let normalized = normalize_phrase(text);
        GREETING_PHRASES.contains(&normalized.as_str())
    }

    /// True if the word belongs to the standard payment purpose vocabulary
    pub fn is_purpose_word(&self, word: &str) -> bool {
        let word = word.trim().to_lowercase();
        PURPOSE_WORDS.contains(&word.as_str())
    }
}

fn compile_all(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::internal(format!("failed to compile pattern '{}': {}", p, e)))
        })
        .collect()
}

fn normalize_phrase(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
