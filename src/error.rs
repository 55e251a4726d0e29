use thiserror::Error;

use crate::dates::Calendar;

#[derive(Error, Debug)]
pub enum GedtreeError {
    #[error("Date parse error: {message}")]
    Date { message: String },
    #[error("Invalid month {token:?} in the {calendar:?} calendar")]
    Month { calendar: Calendar, token: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Structure error at line {line}: {message}")]
    Structure { message: String, line: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GedtreeError>;
