//! Message templates emitted by this crate.
//!
//! Templates are logged verbatim as the event message with the values as
//! structured fields, so the exclusion rules can match on them.

pub const AUTHORIZATION_SUCCEEDED: &str = "Authorization was successful for user: {UserName}.";

pub const AUTHORIZATION_FAILED: &str =
    "Authorization failed for scheme {AuthenticationScheme}: {FailureMessage}";

pub const CHALLENGE_RESULT: &str =
    "Executing ChallengeResult with authentication schemes ({Schemes}).";

pub const SCHEME_CHALLENGED: &str = "AuthenticationScheme: {AuthenticationScheme} was challenged.";

pub const STATUS_CODE_RESULT: &str =
    "Executing HttpStatusCodeResult, setting HTTP status code {StatusCode}";

pub const SIGNED_IN: &str = "AuthenticationScheme: {AuthenticationScheme} signed in.";

pub const SIGNED_OUT: &str = "AuthenticationScheme: {AuthenticationScheme} signed out.";

pub const HTTPS_PORT_UNKNOWN: &str = "Failed to determine the https port for redirect.";

pub const REDIRECTING_TO_HTTPS: &str = "Redirecting to '{redirect}'.";

pub const UNHANDLED_EXCEPTION: &str =
    "An unhandled exception has occurred while executing the request.";
