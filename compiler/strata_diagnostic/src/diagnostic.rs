use std::fmt;
use std::time::Duration;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// What kind of check produced a diagnostic.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum Category {
    Syntax,
    Type,
    Test,
    Lint,
    /// The external decoder did not return in time.
    DecodeTimeout,
    /// A validator did not report in time.
    ValidationTimeout,
    /// A validator panicked instead of reporting.
    ValidatorCrash,
    /// Constraint tiers could not be composed into a grammar.
    Conflict,
}

impl Category {
    /// Soft categories never fail an attempt on their own.
    #[inline]
    pub fn is_soft(self) -> bool {
        matches!(self, Category::Lint)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Syntax => "syntax",
            Category::Type => "type",
            Category::Test => "test",
            Category::Lint => "lint",
            Category::DecodeTimeout => "decode-timeout",
            Category::ValidationTimeout => "validation-timeout",
            Category::ValidatorCrash => "validator-crash",
            Category::Conflict => "conflict",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A behavioral test example.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TestCase {
    pub name: String,
    pub input: String,
    pub expected: String,
    /// What the generated code produced, when it ran.
    pub actual: Option<String>,
}

impl TestCase {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        TestCase {
            name: name.into(),
            input: input.into(),
            expected: expected.into(),
            actual: None,
        }
    }

    #[must_use]
    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }
}

/// One finding about generated code.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[must_use = "diagnostics should be reported or returned, not silently dropped"]
pub struct Diagnostic {
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    /// Grammar hole the finding implicates, if known.
    pub hole: Option<String>,
    /// Type the hole should have produced (rendered), for type findings.
    pub expected_type: Option<String>,
    /// The failing example, for test findings.
    pub test_case: Option<TestCase>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    fn new_with_severity(category: Category, severity: Severity) -> Self {
        Diagnostic {
            category,
            severity,
            message: String::new(),
            hole: None,
            expected_type: None,
            test_case: None,
            notes: Vec::new(),
        }
    }

    pub fn error(category: Category) -> Self {
        Self::new_with_severity(category, Severity::Error)
    }

    pub fn warning(category: Category) -> Self {
        Self::new_with_severity(category, Severity::Warning)
    }

    pub fn note(category: Category) -> Self {
        Self::new_with_severity(category, Severity::Note)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_hole(mut self, hole: impl Into<String>) -> Self {
        self.hole = Some(hole.into());
        self
    }

    pub fn with_expected_type(mut self, ty: impl Into<String>) -> Self {
        self.expected_type = Some(ty.into());
        self
    }

    pub fn with_test_case(mut self, case: TestCase) -> Self {
        self.test_case = Some(case);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Check if this is an error (vs warning/note).
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    /// Hard diagnostics fail the attempt that produced them.
    pub fn is_hard(&self) -> bool {
        self.is_error() && !self.category.is_soft()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.category, self.message)?;
        if let Some(hole) = &self.hole {
            write!(f, "\n  --> hole `{hole}`")?;
            if let Some(ty) = &self.expected_type {
                write!(f, " (expected {ty})")?;
            }
        }
        if let Some(case) = &self.test_case {
            write!(
                f,
                "\n  = test `{}`: input {} expected {}",
                case.name, case.input, case.expected
            )?;
            if let Some(actual) = &case.actual {
                write!(f, ", got {actual}")?;
            }
        }
        for note in &self.notes {
            write!(f, "\n  = note: {note}")?;
        }
        Ok(())
    }
}

// === Common diagnostics ===

pub fn syntax_error(message: impl Into<String>) -> Diagnostic {
    Diagnostic::error(Category::Syntax).with_message(message)
}

pub fn type_mismatch(
    hole: impl Into<String>,
    expected: impl Into<String>,
    found: impl fmt::Display,
) -> Diagnostic {
    let expected = expected.into();
    Diagnostic::error(Category::Type)
        .with_message(format!("expected `{expected}`, found `{found}`"))
        .with_hole(hole)
        .with_expected_type(expected)
}

pub fn test_failure(case: TestCase) -> Diagnostic {
    Diagnostic::error(Category::Test)
        .with_message(format!("test `{}` failed", case.name))
        .with_test_case(case)
}

pub fn lint(message: impl Into<String>) -> Diagnostic {
    Diagnostic::warning(Category::Lint).with_message(message)
}

pub fn decode_timeout(after: Duration) -> Diagnostic {
    Diagnostic::error(Category::DecodeTimeout)
        .with_message(format!("decoder did not respond within {}ms", after.as_millis()))
}

pub fn validation_timeout(validator: &str, after: Duration) -> Diagnostic {
    Diagnostic::error(Category::ValidationTimeout).with_message(format!(
        "validator `{validator}` did not report within {}ms",
        after.as_millis()
    ))
}

pub fn validator_crash(validator: &str, message: &str) -> Diagnostic {
    Diagnostic::error(Category::ValidatorCrash)
        .with_message(format!("validator `{validator}` panicked: {message}"))
}

pub fn conflict(tiers: impl fmt::Display, detail: impl fmt::Display) -> Diagnostic {
    Diagnostic::error(Category::Conflict)
        .with_message(format!("constraint conflict between {tiers}: {detail}"))
}
