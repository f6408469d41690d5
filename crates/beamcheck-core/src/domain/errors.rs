use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CheckResult<T> = Result<T, CheckError>;
pub type ParserResult<T> = CheckResult<T>;

/// Failure classes of the secondary check. Every variant is terminal for the
/// operation that raised it and none is fatal to the process: a failed beam or
/// report leaves other beams and reports processable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckErrorCategory {
    /// Required field missing or malformed in report text.
    ParseError,
    /// Caller-supplied input missing or semantically invalid.
    InputError,
    /// Non-positive dose, depth, or field size.
    RangeError,
    /// Interpolation landed outside the calibrated table domain.
    TableDomainError,
    /// Table or report file could not be read.
    IoError,
}

impl CheckErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::ParseError => 2,
            Self::InputError => 3,
            Self::RangeError => 4,
            Self::TableDomainError => 5,
            Self::IoError => 6,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ParseError => "ParseError",
            Self::InputError => "InputError",
            Self::RangeError => "RangeError",
            Self::TableDomainError => "TableDomainError",
            Self::IoError => "IoError",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckError {
    category: CheckErrorCategory,
    code: &'static str,
    message: String,
}

impl CheckError {
    pub fn new(
        category: CheckErrorCategory,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
        }
    }

    pub fn parse(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(CheckErrorCategory::ParseError, code, message)
    }

    pub fn input(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(CheckErrorCategory::InputError, code, message)
    }

    pub fn range(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(CheckErrorCategory::RangeError, code, message)
    }

    pub fn table_domain(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(CheckErrorCategory::TableDomainError, code, message)
    }

    pub fn io_system(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(CheckErrorCategory::IoError, code, message)
    }

    pub const fn category(&self) -> CheckErrorCategory {
        self.category
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.code, self.message)
    }
}

impl Display for CheckError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.label(),
            self.code,
            self.message
        )
    }
}

impl Error for CheckError {}
