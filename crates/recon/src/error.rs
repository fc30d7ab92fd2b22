use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum WellsecError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad period, missing table, etc.).
    ConfigValidation(String),
    /// Required column absent from an input table.
    MissingColumn { table: String, column: String },
    /// Rows failing a structural precondition. Lists every offender.
    Validation { context: String, offenders: Vec<String> },
    /// A cell that cannot be parsed into its typed field.
    ValueParse {
        table: String,
        line: u64,
        column: String,
        value: String,
    },
    /// IO error (file read, CSV framing, etc.).
    Io(String),
}

impl WellsecError {
    pub fn validation(context: impl Into<String>, offenders: Vec<String>) -> Self {
        Self::Validation {
            context: context.into(),
            offenders,
        }
    }

    /// Schema errors are the missing-column case.
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::MissingColumn { .. })
    }
}

impl fmt::Display for WellsecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::Validation { context, offenders } => {
                write!(f, "{context}: {}", offenders.join(", "))
            }
            Self::ValueParse {
                table,
                line,
                column,
                value,
            } => write!(
                f,
                "table '{table}', line {line}: cannot parse {column} '{value}'"
            ),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for WellsecError {}

impl From<csv::Error> for WellsecError {
    fn from(err: csv::Error) -> Self {
        Self::Io(err.to_string())
    }
}
