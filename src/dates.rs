// pest carries the date-expression grammar; see date.pest
use pest::Parser;
use pest_derive::Parser;

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::error::{GedtreeError, Result};
use crate::udn::{Udn, UdnCalendar};

#[derive(Parser)]
#[grammar = "date.pest"]
struct DateExprParser;

// ------------- Calendar -------------
pub const MONTHS_GREGORIAN: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
// Civil order starting at Tishri, with Adar Sheni as the 7th entry.
pub const MONTHS_HEBREW: [&str; 13] = [
    "TSH", "CSH", "KSL", "TVT", "SHV", "ADR", "ADS", "NSN", "IYR", "SVN", "TMZ", "AAV", "ELL",
];
// COMP covers the complementary days at the end of the republican year.
pub const MONTHS_FRENCH: [&str; 13] = [
    "VEND", "BRUM", "FRIM", "NIVO", "PLUV", "VENT", "GERM", "FLOR", "PRAI", "MESS", "THER",
    "FRUC", "COMP",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Calendar {
    #[default]
    Gregorian,
    Julian,
    Hebrew,
    French,
    Roman,
    Unknown,
}

impl Calendar {
    pub fn escape(&self) -> &'static str {
        match self {
            Calendar::Gregorian => "@#DGREGORIAN@",
            Calendar::Julian => "@#DJULIAN@",
            Calendar::Hebrew => "@#DHEBREW@",
            Calendar::French => "@#DFRENCH R@",
            Calendar::Roman => "@#DROMAN@",
            Calendar::Unknown => "@#DUNKNOWN@",
        }
    }
    pub fn from_escape(text: &str) -> Result<Calendar> {
        match text.to_ascii_uppercase().as_str() {
            "@#DGREGORIAN@" => Ok(Calendar::Gregorian),
            "@#DJULIAN@" => Ok(Calendar::Julian),
            "@#DHEBREW@" => Ok(Calendar::Hebrew),
            "@#DFRENCH R@" => Ok(Calendar::French),
            "@#DROMAN@" => Ok(Calendar::Roman),
            "@#DUNKNOWN@" => Ok(Calendar::Unknown),
            _ => Err(GedtreeError::Date {
                message: format!("unknown calendar escape {text:?}"),
            }),
        }
    }
    // Short calendar mark used by the list display forms.
    pub fn sign(&self) -> &'static str {
        match self {
            Calendar::Gregorian => "G",
            Calendar::Julian => "J",
            Calendar::Hebrew => "H",
            Calendar::French => "FR",
            Calendar::Roman => "R",
            Calendar::Unknown => "?",
        }
    }
    pub fn months(&self) -> &'static [&'static str] {
        match self {
            Calendar::Hebrew => &MONTHS_HEBREW,
            Calendar::French => &MONTHS_FRENCH,
            // Roman and Unknown have no vocabulary of their own.
            _ => &MONTHS_GREGORIAN,
        }
    }
    pub fn month_word(&self, month: u8) -> Option<&'static str> {
        if month == 0 {
            return None;
        }
        self.months().get(month as usize - 1).copied()
    }
    pub fn month_index(&self, token: &str) -> Result<u8> {
        let upper = token.trim().to_ascii_uppercase();
        if let Some(pos) = self.months().iter().position(|m| *m == upper) {
            return Ok(pos as u8 + 1);
        }
        // Roman and Unknown also take bare month numbers.
        if matches!(self, Calendar::Roman | Calendar::Unknown) {
            if let Ok(n) = upper.parse::<u8>() {
                if n >= 1 && n as usize <= self.months().len() {
                    return Ok(n);
                }
            }
        }
        Err(GedtreeError::Month {
            calendar: *self,
            token: token.to_owned(),
        })
    }
    pub(crate) fn udn_calendar(&self) -> UdnCalendar {
        match self {
            Calendar::Julian => UdnCalendar::Julian,
            Calendar::Hebrew => UdnCalendar::Hebrew,
            Calendar::French => UdnCalendar::French,
            // Roman and Unknown dates are numbered as if Gregorian.
            _ => UdnCalendar::Gregorian,
        }
    }
}

// ------------- Approximated -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Approximated {
    #[default]
    Exact,
    About,
    Calculated,
    Estimated,
}

impl Approximated {
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Approximated::Exact => None,
            Approximated::About => Some("ABT"),
            Approximated::Calculated => Some("CAL"),
            Approximated::Estimated => Some("EST"),
        }
    }
    fn from_keyword(token: &str) -> Approximated {
        match token.to_ascii_uppercase().as_str() {
            "ABT" => Approximated::About,
            "CAL" => Approximated::Calculated,
            "EST" => Approximated::Estimated,
            _ => Approximated::Exact,
        }
    }
}

// ------------- Date -------------
pub const UNKNOWN_YEAR: i16 = -1;

// One calendar day, possibly partial, in one of the six calendars.
// Day and month use 0 for "not recorded"; the year uses UNKNOWN_YEAR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Date {
    calendar: Calendar,
    approximated: Approximated,
    day: u8,
    month: u8,
    year: i16,
    year_bc: bool,
    year_modifier: String,
}

impl Date {
    pub fn new() -> Self {
        Self {
            calendar: Calendar::Gregorian,
            approximated: Approximated::Exact,
            day: 0,
            month: 0,
            year: UNKNOWN_YEAR,
            year_bc: false,
            year_modifier: String::new(),
        }
    }
    pub fn calendar(&self) -> Calendar {
        self.calendar
    }
    pub fn approximated(&self) -> Approximated {
        self.approximated
    }
    pub fn set_approximated(&mut self, approximated: Approximated) {
        self.approximated = approximated;
    }
    pub fn day(&self) -> u8 {
        self.day
    }
    pub fn month(&self) -> u8 {
        self.month
    }
    pub fn year(&self) -> i16 {
        self.year
    }
    pub fn year_bc(&self) -> bool {
        self.year_bc
    }
    pub fn year_modifier(&self) -> &str {
        &self.year_modifier
    }
    pub fn is_empty(&self) -> bool {
        self.day == 0 && self.month == 0 && self.year == UNKNOWN_YEAR
    }

    pub fn set_date(&mut self, calendar: Calendar, day: u8, month: u8, year: i16) -> Result<()> {
        if month as usize > calendar.months().len() {
            return Err(GedtreeError::Month {
                calendar,
                token: month.to_string(),
            });
        }
        self.calendar = calendar;
        self.day = day;
        self.month = month;
        self.year = year;
        self.year_bc = false;
        self.year_modifier.clear();
        Ok(())
    }
    // Token form of the setter; the month is resolved against the
    // calendar's vocabulary and rejected when it does not belong.
    pub fn set_date_tokens(
        &mut self,
        calendar: Calendar,
        day: u8,
        month: &str,
        year: i16,
        year_bc: bool,
    ) -> Result<()> {
        let month = calendar.month_index(month)?;
        self.set_date(calendar, day, month, year)?;
        self.year_bc = year_bc;
        Ok(())
    }
    pub fn set_gregorian(&mut self, day: u8, month: u8, year: i16) -> Result<()> {
        self.set_date(Calendar::Gregorian, day, month, year)
    }
    pub fn set_julian(&mut self, day: u8, month: u8, year: i16) -> Result<()> {
        self.set_date(Calendar::Julian, day, month, year)
    }
    pub fn set_hebrew(&mut self, day: u8, month: u8, year: i16) -> Result<()> {
        self.set_date(Calendar::Hebrew, day, month, year)
    }
    pub fn set_french(&mut self, day: u8, month: u8, year: i16) -> Result<()> {
        self.set_date(Calendar::French, day, month, year)
    }
    pub fn set_roman(&mut self, day: u8, month: u8, year: i16) -> Result<()> {
        self.set_date(Calendar::Roman, day, month, year)
    }
    pub fn set_unknown(&mut self, day: u8, month: u8, year: i16) -> Result<()> {
        self.set_date(Calendar::Unknown, day, month, year)
    }
    pub fn set_naive(&mut self, date: NaiveDate) {
        self.calendar = Calendar::Gregorian;
        self.day = date.day() as u8;
        self.month = date.month() as u8;
        self.year = date.year() as i16;
        self.year_bc = false;
        self.year_modifier.clear();
    }

    pub fn parse(text: &str) -> Result<Date> {
        match DateValue::parse(text)? {
            DateValue::Empty => Ok(Date::new()),
            DateValue::Simple(date) => Ok(date),
            _ => Err(GedtreeError::Date {
                message: format!("not a simple date: {text:?}"),
            }),
        }
    }

    pub fn udn(&self) -> Udn {
        if self.is_empty() {
            return Udn::empty();
        }
        let year = if self.year == UNKNOWN_YEAR {
            None
        } else if self.year_bc {
            Some(-(self.year as i32))
        } else {
            Some(self.year as i32)
        };
        let udn = Udn::new(self.calendar.udn_calendar(), year, self.month, self.day);
        if self.approximated == Approximated::Exact {
            udn
        } else {
            udn.approximate()
        }
    }

    // Short list form, e.g. "2013.01.20 [G]".
    pub fn display_short(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!(
            "{:04}.{:02}.{:02} [{}]",
            self.year.max(0),
            self.month,
            self.day,
            self.calendar.sign()
        )
    }
}

impl Default for Date {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if let Some(keyword) = self.approximated.keyword() {
            out.push_str(keyword);
            out.push(' ');
        }
        if self.calendar != Calendar::Gregorian {
            out.push_str(self.calendar.escape());
            out.push(' ');
        }
        if self.day > 0 {
            out.push_str(&format!("{:02} ", self.day));
        }
        if let Some(word) = self.calendar.month_word(self.month) {
            out.push_str(word);
            out.push(' ');
        }
        if self.year != UNKNOWN_YEAR {
            out.push_str(&self.year.to_string());
            if !self.year_modifier.is_empty() {
                out.push('/');
                out.push_str(&self.year_modifier);
            }
            if self.year_bc {
                out.push_str("B.C.");
            }
        }
        write!(f, "{}", out.trim_end())
    }
}

// ------------- DateValue -------------
// The full value of a DATE node: one of the five shapes, or empty.
// Range and Period keep empty placeholder dates for absent bounds.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DateValue {
    #[default]
    Empty,
    Simple(Date),
    Interpreted {
        date: Date,
        phrase: String,
    },
    Range {
        after: Date,
        before: Date,
    },
    Period {
        from: Date,
        to: Date,
    },
}

impl DateValue {
    pub fn parse(text: &str) -> Result<DateValue> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(DateValue::Empty);
        }
        let mut pairs = DateExprParser::parse(Rule::date_value, text).map_err(|e| {
            GedtreeError::Date {
                message: e.to_string(),
            }
        })?;
        let root = match pairs.next() {
            Some(root) => root,
            None => return Ok(DateValue::Empty),
        };
        let mut value = DateValue::Empty;
        for pair in root.into_inner() {
            match pair.as_rule() {
                Rule::simple => value = DateValue::Simple(build_simple(pair)?),
                Rule::between => {
                    let (first, second) = build_pair(pair)?;
                    value = DateValue::Range {
                        after: first,
                        before: second,
                    };
                }
                Rule::before => {
                    value = DateValue::Range {
                        after: Date::new(),
                        before: build_first(pair)?,
                    }
                }
                Rule::after => {
                    value = DateValue::Range {
                        after: build_first(pair)?,
                        before: Date::new(),
                    }
                }
                Rule::interpreted => value = build_interpreted(pair)?,
                Rule::period => value = build_period(pair)?,
                _ => {}
            }
        }
        Ok(value)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DateValue::Empty => true,
            DateValue::Simple(date) => date.is_empty(),
            DateValue::Interpreted { date, .. } => date.is_empty(),
            DateValue::Range { after, before } => after.is_empty() && before.is_empty(),
            DateValue::Period { from, to } => from.is_empty() && to.is_empty(),
        }
    }

    pub fn phrase(&self) -> Option<&str> {
        match self {
            DateValue::Interpreted { phrase, .. } => Some(phrase),
            _ => None,
        }
    }
    // Stores the interpretation phrase, unwrapping one layer of
    // parentheses so printed output is never double-wrapped.
    pub fn set_phrase(&mut self, text: &str) {
        if let DateValue::Interpreted { phrase, .. } = self {
            let trimmed = text.trim();
            let inner = trimmed
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
                .unwrap_or(trimmed);
            *phrase = inner.to_owned();
        }
    }

    pub fn udn(&self) -> Udn {
        match self {
            DateValue::Empty => Udn::empty(),
            DateValue::Simple(date) => date.udn(),
            DateValue::Interpreted { date, .. } => date.udn(),
            DateValue::Range { after, before } => {
                match (after.is_empty(), before.is_empty()) {
                    (true, false) => before.udn().before(),
                    (false, true) => after.udn().after(),
                    (false, false) => Udn::between(after.udn(), before.udn()),
                    (true, true) => Udn::empty(),
                }
            }
            DateValue::Period { from, to } => match (from.is_empty(), to.is_empty()) {
                // A from-only period counts as the start date itself; a
                // to-only period counts as "before the end date".
                (false, true) => from.udn(),
                (true, false) => to.udn().before(),
                (false, false) => Udn::between(from.udn(), to.udn()),
                (true, true) => Udn::empty(),
            },
        }
    }

    pub fn compare(&self, other: &DateValue) -> Ordering {
        self.udn().cmp(&other.udn())
    }

    // Short list form with range markers, e.g. "< 2013.01.20 [G]".
    pub fn display_short(&self) -> String {
        match self {
            DateValue::Empty => String::new(),
            DateValue::Simple(date) => {
                if date.approximated == Approximated::Exact {
                    date.display_short()
                } else {
                    format!("~ {}", date.display_short())
                }
            }
            DateValue::Interpreted { date, .. } => date.display_short(),
            DateValue::Range { after, before } => {
                match (after.is_empty(), before.is_empty()) {
                    (true, false) => format!("< {}", before.display_short()),
                    (false, true) => format!("{} >", after.display_short()),
                    (false, false) => {
                        format!("{} - {}", after.display_short(), before.display_short())
                    }
                    (true, true) => String::new(),
                }
            }
            DateValue::Period { from, to } => match (from.is_empty(), to.is_empty()) {
                (false, true) => format!("{} >", from.display_short()),
                (true, false) => format!("< {}", to.display_short()),
                (false, false) => format!("{} - {}", from.display_short(), to.display_short()),
                (true, true) => String::new(),
            },
        }
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Empty => Ok(()),
            DateValue::Simple(date) => write!(f, "{date}"),
            DateValue::Interpreted { date, phrase } => write!(f, "INT {date} ({phrase})"),
            DateValue::Range { after, before } => match (after.is_empty(), before.is_empty()) {
                (true, false) => write!(f, "BEF {before}"),
                (false, true) => write!(f, "AFT {after}"),
                (false, false) => write!(f, "BET {after} AND {before}"),
                (true, true) => Ok(()),
            },
            DateValue::Period { from, to } => match (from.is_empty(), to.is_empty()) {
                (false, true) => write!(f, "FROM {from}"),
                (true, false) => write!(f, "TO {to}"),
                (false, false) => write!(f, "FROM {from} TO {to}"),
                (true, true) => Ok(()),
            },
        }
    }
}

// ------------- grammar assembly -------------
type Pair<'a> = pest::iterators::Pair<'a, Rule>;

fn build_date(pair: Pair) -> Result<Date> {
    let mut date = Date::new();
    let mut month_token: Option<String> = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::escape => date.calendar = Calendar::from_escape(part.as_str())?,
            Rule::day => date.day = part.as_str().parse().unwrap_or(0),
            Rule::month_word => month_token = Some(part.as_str().to_owned()),
            Rule::year_full => {
                for y in part.into_inner() {
                    match y.as_rule() {
                        Rule::year => date.year = y.as_str().parse().unwrap_or(UNKNOWN_YEAR),
                        Rule::year_modifier => {
                            date.year_modifier = y.as_str()[1..].to_owned();
                        }
                        Rule::bc => date.year_bc = true,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    if let Some(token) = month_token {
        date.month = date.calendar.month_index(&token)?;
    }
    Ok(date)
}

fn build_simple(pair: Pair) -> Result<Date> {
    let mut date = Date::new();
    let mut approximated = Approximated::Exact;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::approx => approximated = Approximated::from_keyword(part.as_str()),
            Rule::date => date = build_date(part)?,
            _ => {}
        }
    }
    date.approximated = approximated;
    Ok(date)
}

// First embedded date of a single-bound rule (before, after, from, to).
fn build_first(pair: Pair) -> Result<Date> {
    for part in pair.into_inner() {
        if part.as_rule() == Rule::date {
            return build_date(part);
        }
    }
    Ok(Date::new())
}

fn build_pair(pair: Pair) -> Result<(Date, Date)> {
    let mut first = Date::new();
    let mut second = Date::new();
    let mut seen = 0;
    for part in pair.into_inner() {
        if part.as_rule() == Rule::date {
            if seen == 0 {
                first = build_date(part)?;
            } else {
                second = build_date(part)?;
            }
            seen += 1;
        }
    }
    Ok((first, second))
}

fn build_interpreted(pair: Pair) -> Result<DateValue> {
    let mut date = Date::new();
    let mut phrase = String::new();
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::date => date = build_date(part)?,
            Rule::phrase => {
                let raw = part.as_str();
                phrase = raw[1..raw.len() - 1].to_owned();
            }
            _ => {}
        }
    }
    Ok(DateValue::Interpreted { date, phrase })
}

fn build_period(pair: Pair) -> Result<DateValue> {
    let mut from = Date::new();
    let mut to = Date::new();
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::from => from = build_first(part)?,
            Rule::to => to = build_first(part)?,
            _ => {}
        }
    }
    Ok(DateValue::Period { from, to })
}
