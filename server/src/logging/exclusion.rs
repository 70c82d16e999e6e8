//! Declarative log exclusion rules.
//!
//! An exclusion rule set is a list of message templates. An event whose raw
//! template matches an entry is dropped. The rule sets are data: they can be
//! inspected and tested without building a subscriber.

use std::collections::HashSet;

/// Request, static-file and ORM noise. Applied before every sink.
pub const REQUEST_NOISE: &[&str] = &[
    "{HostingRequestStartingLog:l}",
    "{HostingRequestFinishedLog:l}",
    "Sending file. Request path: '{VirtualPath}'. Physical path: '{PhysicalPath}'",
    "Executed DbCommand ({elapsed}ms) [Parameters=[{parameters}], CommandType='{commandType}', CommandTimeout='{commandTimeout}']{newLine}{commandText}",
    "Entity Framework Core {version} initialized '{contextType}' using provider '{provider}' with options: {options}",
];

/// Authorization, session, job-scheduler and query-translation noise.
/// Applied to the secondary sink only.
pub const SECONDARY_SINK_NOISE: &[&str] = &[
    "Authorization was successful for user: {UserName}.",
    "Executing ObjectResult, writing value {Value}.",
    "Executing FileResult, sending file as {FileDownloadName}",
    "Accessing expired session, Key:{sessionKey}",
    "The Include operation for navigation '{include}' is unnecessary and was ignored because the navigation is not reachable in the final query results. See https://go.microsoft.com/fwlink/?linkid=850303 for more information.",
    "The LINQ expression '{expression}' could not be translated and will be evaluated locally.",
    "Committing the session was canceled.",
    "Executing ChallengeResult with authentication schemes ({Schemes}).",
    "User profile is available. Using '{FullName}' as key repository and Windows DPAPI to encrypt keys at rest.",
    "The file {Path} was not modified",
    "Listening queues: 'default'",
    "Using job storage: 'Hangfire.MemoryStorage.MemoryStorage'",
    "Shutdown timeout: 00:00:15",
    "Using the following options for Hangfire Server:",
    "Starting Hangfire Server",
    "Worker count: 20",
    "Schedule polling interval: 00:00:15",
    "Executing HttpStatusCodeResult, setting HTTP status code {StatusCode}",
    "Query: '{queryModel}' uses a row limiting operation (Skip/Take) without OrderBy which may lead to unpredictable results.",
    "Session started; Key:{sessionKey}, Id:{sessionId}",
    "{State:l}",
];

/// How a candidate template is compared against the rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The template must equal an entry byte for byte.
    Exact,
    /// Leading and trailing whitespace of the template is ignored.
    Trimmed,
}

/// A set of message templates to drop.
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    mode: MatchMode,
    templates: HashSet<String>,
}

impl ExclusionRules {
    /// Rules that match templates exactly.
    #[must_use]
    pub fn exact<I, T>(templates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::new(MatchMode::Exact, templates)
    }

    /// Rules that match templates after trimming surrounding whitespace.
    #[must_use]
    pub fn trimmed<I, T>(templates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::new(MatchMode::Trimmed, templates)
    }

    fn new<I, T>(mode: MatchMode, templates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            mode,
            templates: templates.into_iter().map(Into::into).collect(),
        }
    }

    /// The global rule set applied before every sink.
    #[must_use]
    pub fn request_noise() -> Self {
        Self::exact(REQUEST_NOISE.iter().copied())
    }

    /// The rule set of the secondary sink.
    #[must_use]
    pub fn secondary_sink_noise() -> Self {
        Self::trimmed(SECONDARY_SINK_NOISE.iter().copied())
    }

    /// Whether an event with this template is dropped.
    #[must_use]
    pub fn excludes(&self, template: &str) -> bool {
        let candidate = match self.mode {
            MatchMode::Exact => template,
            MatchMode::Trimmed => template.trim(),
        };
        self.templates.contains(candidate)
    }

    #[must_use]
    pub const fn mode(&self) -> MatchMode {
        self.mode
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
