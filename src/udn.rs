// The unified date number: every date value collapses to one comparable
// day count plus a qualifier, so dates from different calendars sort and
// match against each other. Day numbers are Julian day numbers at noon;
// unknown components are substituted before conversion and flagged so
// they can be blanked out again when printing.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UdnCalendar {
    Gregorian,
    Julian,
    Hebrew,
    French,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UdnQualifier {
    #[default]
    Exact,
    Approximate,
    Before,
    After,
}

// Substituted when the year is not recorded; early enough that every
// real date sorts after it.
const UNKNOWN_YEAR_SUBSTITUTE: i64 = -4713;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Udn {
    qualifier: UdnQualifier,
    day_number: i64,
    year_known: bool,
    month_known: bool,
    day_known: bool,
}

impl Udn {
    pub fn new(calendar: UdnCalendar, year: Option<i32>, month: u8, day: u8) -> Self {
        let y = year.map_or(UNKNOWN_YEAR_SUBSTITUTE, |y| y as i64);
        let m = if month == 0 { 1 } else { month as i64 };
        let d = if day == 0 { 1 } else { day as i64 };
        let day_number = match calendar {
            UdnCalendar::Gregorian => gregorian_to_jd(y, m, d),
            UdnCalendar::Julian => julian_to_jd(y, m, d),
            UdnCalendar::Hebrew => hebrew_to_jd(y, m, d),
            UdnCalendar::French => french_to_jd(y, m, d),
        };
        Self {
            qualifier: UdnQualifier::Exact,
            day_number,
            year_known: year.is_some(),
            month_known: month != 0,
            day_known: day != 0,
        }
    }
    pub fn empty() -> Self {
        Self::default()
    }
    pub fn is_empty(&self) -> bool {
        !self.year_known && !self.month_known && !self.day_known
    }
    pub fn qualifier(&self) -> UdnQualifier {
        self.qualifier
    }
    pub fn day_number(&self) -> i64 {
        self.day_number
    }

    pub fn approximate(self) -> Self {
        self.with_qualifier(UdnQualifier::Approximate)
    }
    pub fn before(self) -> Self {
        self.with_qualifier(UdnQualifier::Before)
    }
    pub fn after(self) -> Self {
        self.with_qualifier(UdnQualifier::After)
    }
    fn with_qualifier(self, qualifier: UdnQualifier) -> Self {
        if self.is_empty() {
            self
        } else {
            Self { qualifier, ..self }
        }
    }
    // The floor midpoint of two bounds; the result is an exact date.
    pub fn between(a: Udn, b: Udn) -> Self {
        if a.is_empty() {
            return b;
        }
        if b.is_empty() {
            return a;
        }
        Self {
            qualifier: UdnQualifier::Exact,
            day_number: (a.day_number + b.day_number).div_euclid(2),
            year_known: a.year_known && b.year_known,
            month_known: a.month_known && b.month_known,
            day_known: a.day_known && b.day_known,
        }
    }

    pub fn gregorian_parts(&self) -> (i32, u8, u8) {
        jd_to_gregorian(self.day_number)
    }
    pub fn gregorian_year(&self) -> i32 {
        self.gregorian_parts().0
    }

    // Unknown components and the qualifier dominate the day number, so
    // fully-known exact dates order chronologically while vague ones
    // drift towards the end.
    fn sort_key(&self) -> (bool, bool, bool, u8, i64) {
        let weight = match self.qualifier {
            UdnQualifier::Exact => 0,
            UdnQualifier::Approximate => 1,
            UdnQualifier::After => 2,
            UdnQualifier::Before => 4,
        };
        (
            !self.year_known,
            !self.month_known,
            !self.day_known,
            weight,
            self.day_number,
        )
    }
}

impl Ord for Udn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Udn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Udn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let (year, month, day) = self.gregorian_parts();
        match self.qualifier {
            UdnQualifier::Exact => {}
            UdnQualifier::Approximate => write!(f, "~")?,
            UdnQualifier::Before => write!(f, "<")?,
            UdnQualifier::After => write!(f, ">")?,
        }
        if self.year_known {
            write!(f, "{year:04}")?;
        } else {
            write!(f, "????")?;
        }
        if self.month_known {
            write!(f, "/{month:02}")?;
        } else {
            write!(f, "/??")?;
        }
        if self.day_known {
            write!(f, "/{day:02}")
        } else {
            write!(f, "/??")
        }
    }
}

// ------------- calendar conversions -------------
// Integer Julian day numbers at noon; floor division keeps the
// arithmetic valid for years before the common era.

fn gregorian_to_jd(year: i64, month: i64, day: i64) -> i64 {
    let a = (14 - month).div_euclid(12);
    let y = year + 4800 - a;
    let m = month + 12 * a - 3;
    day + (153 * m + 2).div_euclid(5) + 365 * y + y.div_euclid(4) - y.div_euclid(100)
        + y.div_euclid(400)
        - 32045
}

fn julian_to_jd(year: i64, month: i64, day: i64) -> i64 {
    let a = (14 - month).div_euclid(12);
    let y = year + 4800 - a;
    let m = month + 12 * a - 3;
    day + (153 * m + 2).div_euclid(5) + 365 * y + y.div_euclid(4) - 32083
}

fn jd_to_gregorian(jd: i64) -> (i32, u8, u8) {
    let f = jd + 1401 + (((4 * jd + 274277).div_euclid(146097)) * 3).div_euclid(4) - 38;
    let e = 4 * f + 3;
    let g = e.rem_euclid(1461).div_euclid(4);
    let h = 5 * g + 2;
    let day = h.rem_euclid(153).div_euclid(5) + 1;
    let month = (h.div_euclid(153) + 2).rem_euclid(12) + 1;
    let year = e.div_euclid(1461) - 4716 + (14 - month).div_euclid(12);
    (year as i32, month as u8, day as u8)
}

// ------------- Hebrew calendar -------------
// Arithmetic (molad-based) calendar. The GEDCOM month index is civil
// order starting at Tishri; the conversion works in ecclesiastical
// order starting at Nisan.

const HEBREW_EPOCH: i64 = 347996;

fn hebrew_leap(year: i64) -> bool {
    (7 * year + 1).rem_euclid(19) < 7
}

fn hebrew_year_months(year: i64) -> i64 {
    if hebrew_leap(year) { 13 } else { 12 }
}

// Tishri postponement: days from the epoch to the mean conjunction of
// the given year, adjusted when it falls badly in the week.
fn hebrew_delay_1(year: i64) -> i64 {
    let months = (235 * year - 234).div_euclid(19);
    let parts = 12084 + 13753 * months;
    let mut day = months * 29 + parts.div_euclid(25920);
    if (3 * (day + 1)).rem_euclid(7) < 3 {
        day += 1;
    }
    day
}

// Further postponement to keep year lengths legal.
fn hebrew_delay_2(year: i64) -> i64 {
    let last = hebrew_delay_1(year - 1);
    let present = hebrew_delay_1(year);
    let next = hebrew_delay_1(year + 1);
    if next - present == 356 {
        2
    } else if present - last == 382 {
        1
    } else {
        0
    }
}

fn hebrew_year_days(year: i64) -> i64 {
    hebrew_to_jd_ecclesiastical(year + 1, 7, 1) - hebrew_to_jd_ecclesiastical(year, 7, 1)
}

fn hebrew_month_days(year: i64, month: i64) -> i64 {
    if month == 2 || month == 4 || month == 6 || month == 10 || month == 13 {
        return 29;
    }
    if month == 12 && !hebrew_leap(year) {
        return 29;
    }
    if month == 8 && hebrew_year_days(year).rem_euclid(10) != 5 {
        return 29;
    }
    if month == 9 && hebrew_year_days(year).rem_euclid(10) == 3 {
        return 29;
    }
    30
}

fn hebrew_to_jd_ecclesiastical(year: i64, month: i64, day: i64) -> i64 {
    let mut jd = HEBREW_EPOCH + hebrew_delay_1(year) + hebrew_delay_2(year) + day + 1;
    if month < 7 {
        for m in 7..=hebrew_year_months(year) {
            jd += hebrew_month_days(year, m);
        }
        for m in 1..month {
            jd += hebrew_month_days(year, m);
        }
    } else {
        for m in 7..month {
            jd += hebrew_month_days(year, m);
        }
    }
    jd
}

fn hebrew_to_jd(year: i64, civil_month: i64, day: i64) -> i64 {
    let month = if civil_month <= 7 {
        civil_month + 6
    } else {
        civil_month - 7
    };
    hebrew_to_jd_ecclesiastical(year, month, day)
}

// ------------- French Republican calendar -------------
// Arithmetic (Romme) rule: sextile years III, VII, XI, XV, then every
// fourth year with the Gregorian century exception.

const FRENCH_EPOCH: i64 = 2375840; // 1 Vendémiaire I = 22 SEP 1792

fn french_leap(year: i64) -> bool {
    matches!(year, 3 | 7 | 11 | 15)
        || (year >= 20 && year % 4 == 0 && (year % 100 != 0 || year % 400 == 0))
}

fn french_to_jd(year: i64, month: i64, day: i64) -> i64 {
    let mut days = 365 * (year - 1);
    for y in 1..year {
        if french_leap(y) {
            days += 1;
        }
    }
    FRENCH_EPOCH + days + 30 * (month - 1) + (day - 1)
}
