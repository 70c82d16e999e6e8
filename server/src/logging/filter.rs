//! Per-sink event filter.
//!
//! Drops events below the minimum level, then drops events whose message
//! template is excluded by any of the sink's rule sets.

use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Metadata};
use tracing_subscriber::layer::{Context, Filter};

use super::ExclusionRules;

/// Name of the field holding an event's message.
const MESSAGE_FIELD: &str = "message";

/// Filter attached to a single sink layer.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    minimum_level: Level,
    rules: Vec<ExclusionRules>,
}

impl ExclusionFilter {
    #[must_use]
    pub const fn new(minimum_level: Level, rules: Vec<ExclusionRules>) -> Self {
        Self {
            minimum_level,
            rules,
        }
    }

    /// Whether an event at `level` with `template` reaches the sink.
    #[must_use]
    pub fn accepts(&self, level: &Level, template: Option<&str>) -> bool {
        if *level > self.minimum_level {
            return false;
        }
        template.is_none_or(|template| !self.rules.iter().any(|rules| rules.excludes(template)))
    }
}

impl<S> Filter<S> for ExclusionFilter {
    fn enabled(&self, meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        *meta.level() <= self.minimum_level
    }

    fn event_enabled(&self, event: &Event<'_>, _cx: &Context<'_, S>) -> bool {
        let template = message_template(event);
        self.accepts(event.metadata().level(), template.as_deref())
    }

    fn max_level_hint(&self) -> Option<LevelFilter> {
        Some(LevelFilter::from_level(self.minimum_level))
    }
}

/// Extract the raw message text of an event.
#[must_use]
pub fn message_template(event: &Event<'_>) -> Option<String> {
    let mut visitor = MessageVisitor::default();
    event.record(&mut visitor);
    visitor.message
}

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == MESSAGE_FIELD {
            self.message = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == MESSAGE_FIELD {
            self.message = Some(format!("{value:?}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ExclusionFilter {
        ExclusionFilter::new(
            Level::INFO,
            vec![
                ExclusionRules::request_noise(),
                ExclusionRules::secondary_sink_noise(),
            ],
        )
    }

    #[test]
    fn test_levels_below_minimum_are_rejected() {
        let filter = filter();

        assert!(!filter.accepts(&Level::DEBUG, Some("hello")));
        assert!(!filter.accepts(&Level::TRACE, None));
        assert!(filter.accepts(&Level::INFO, Some("hello")));
        assert!(filter.accepts(&Level::WARN, Some("hello")));
        assert!(filter.accepts(&Level::ERROR, None));
    }

    #[test]
    fn test_any_rule_set_excludes() {
        let filter = filter();

        assert!(!filter.accepts(&Level::INFO, Some("{HostingRequestStartingLog:l}")));
        assert!(!filter.accepts(&Level::WARN, Some(" Starting Hangfire Server ")));
    }

    #[test]
    fn test_max_level_hint_matches_minimum() {
        let filter = filter();
        let hint = <ExclusionFilter as Filter<tracing_subscriber::Registry>>::max_level_hint(
            &filter,
        );
        assert_eq!(hint, Some(LevelFilter::INFO));
    }
}
