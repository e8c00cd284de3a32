use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSeverity {
    Info,
    Error,
}

impl ReportSeverity {
    pub fn label(self) -> &'static str {
        match self {
            ReportSeverity::Info => "info",
            ReportSeverity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub severity: ReportSeverity,
    pub source: String,
    pub message: String,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity.label(), self.source, self.message)
    }
}

/// User-facing message channel. Entries are kept for the UI and echoed to stderr.
#[derive(Debug, Default)]
pub struct ReportLog {
    entries: Vec<Report>,
}

impl ReportLog {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn report(&mut self, severity: ReportSeverity, source: &str, message: impl Into<String>) {
        let message = message.into();
        eprintln!("[report:{source}] {}: {message}", severity.label());
        self.entries.push(Report { severity, source: source.to_string(), message });
    }

    pub fn info(&mut self, source: &str, message: impl Into<String>) {
        self.report(ReportSeverity::Info, source, message);
    }

    pub fn error(&mut self, source: &str, message: impl Into<String>) {
        self.report(ReportSeverity::Error, source, message);
    }

    pub fn entries(&self) -> &[Report] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Report> {
        self.entries.last()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Report> {
        self.entries.iter().filter(|report| report.severity == ReportSeverity::Error)
    }

    pub fn drain(&mut self) -> Vec<Report> {
        std::mem::take(&mut self.entries)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
