//! Runs the shortcodes in a reply and cleans the text.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::handler::{HandlerContext, HandlerOutcome};
use crate::parser::{parse, ParsedShortcode};
use crate::registry::ShortcodeRegistry;

/// Result for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedShortcode {
    pub key: String,
    pub params: String,
    pub outcome: HandlerOutcome,
}

/// Result of one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Reply with handled tokens removed and failed ones kept.
    pub cleaned: String,
    /// Ids to flush from the deferred buffer, in dispatch order.
    pub deferred_ids: Vec<String>,
    pub results: Vec<DispatchedShortcode>,
}

impl DispatchReport {
    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == HandlerOutcome::Failed)
            .count()
    }
}

/// Dispatches shortcodes against a shared registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ShortcodeRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ShortcodeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ShortcodeRegistry> {
        &self.registry
    }

    /// Runs every token in `reply` in textual order, one handler at a time.
    ///
    /// Unknown keys and `Failed` outcomes leave the token in place and log a
    /// warning.
    pub async fn dispatch(&self, reply: &str, ctx: &HandlerContext) -> DispatchReport {
        let tokens = parse(reply, ctx.message.id);
        let mut report = DispatchReport::default();
        let mut strip = Vec::with_capacity(tokens.len());

        for token in &tokens {
            let outcome = self.run(token, ctx).await;
            if let Some(id) = outcome.deferred_id() {
                report.deferred_ids.push(id.to_string());
            }
            strip.push(outcome.strips_token());
            report.results.push(DispatchedShortcode {
                key: token.key.to_string(),
                params: token.params.clone(),
                outcome,
            });
        }

        report.cleaned = clean_reply(reply, &tokens, &strip);
        report
    }

    async fn run(&self, token: &ParsedShortcode, ctx: &HandlerContext) -> HandlerOutcome {
        let Some(handler) = self.registry.get(&token.key) else {
            warn!(key = %token.key, chat_id = %ctx.chat(), "Unknown shortcode");
            return HandlerOutcome::Failed;
        };
        let outcome = handler.handle(ctx, &token.params).await;
        match &outcome {
            HandlerOutcome::Failed => {
                warn!(key = %token.key, params = %token.params, chat_id = %ctx.chat(), "Shortcode handler failed");
            }
            other => debug!(key = %token.key, outcome = ?other, "Shortcode handled"),
        }
        outcome
    }
}

/// Removes stripped tokens, then trims line ends, collapses runs of blank
/// lines and trims the whole text.
fn clean_reply(reply: &str, tokens: &[ParsedShortcode], strip: &[bool]) -> String {
    let mut out = String::with_capacity(reply.len());
    let mut cursor = 0;

    for (token, &remove) in tokens.iter().zip(strip) {
        if !remove {
            continue;
        }
        out.push_str(&reply[cursor..token.span.start]);
        cursor = token.span.end;
        // avoid a double space where the token sat between two words
        if out.is_empty() || out.ends_with([' ', '\t', '\n']) {
            let rest = &reply[cursor..];
            cursor += rest.len() - rest.trim_start_matches([' ', '\t']).len();
        }
    }
    out.push_str(&reply[cursor..]);

    let mut lines: Vec<&str> = Vec::new();
    for line in out.lines().map(str::trim_end) {
        if line.is_empty() && lines.last().is_some_and(|l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::DeferredBuffer;
    use crate::handler::ShortcodeHandler;
    use async_trait::async_trait;
    use chrono::Utc;
    use syncara_core::SystemClock;
    use syncara_models::{Assistant, SideEffectPayload};
    use syncara_test_utils::{fixtures, MockTransport};
    use tokio::sync::Mutex;

    /// Records the order of calls and answers with a fixed outcome.
    struct Probe {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        outcome: HandlerOutcome,
    }

    #[async_trait]
    impl ShortcodeHandler for Probe {
        async fn handle(&self, _ctx: &HandlerContext, params: &str) -> HandlerOutcome {
            self.log.lock().await.push(format!("{}:start:{}", self.name, params));
            tokio::task::yield_now().await;
            self.log.lock().await.push(format!("{}:end", self.name));
            self.outcome.clone()
        }
    }

    struct Defer;

    #[async_trait]
    impl ShortcodeHandler for Defer {
        async fn handle(&self, ctx: &HandlerContext, params: &str) -> HandlerOutcome {
            ctx.defer(SideEffectPayload::Text {
                text: params.to_string(),
            })
            .await
        }
    }

    fn context() -> HandlerContext {
        let sender = fixtures::sender(7, "Rina");
        HandlerContext {
            transport: Arc::new(MockTransport::new(1, "Aeris", "Aeris_sync")),
            assistant: Assistant::new("aeris", "cred"),
            message: fixtures::private_message(321, sender, "hai"),
            deferred: Arc::new(DeferredBuffer::new(Arc::new(SystemClock))),
            is_owner: false,
            now: Utc::now(),
        }
    }

    fn dispatcher(log: &Arc<Mutex<Vec<String>>>) -> Dispatcher {
        let mut registry = ShortcodeRegistry::new();
        for (key, name, outcome) in [
            ("OK:ONE", "one", HandlerOutcome::Handled),
            ("OK:TWO", "two", HandlerOutcome::Handled),
            ("BAD:ONE", "bad", HandlerOutcome::Failed),
        ] {
            registry
                .register(
                    key,
                    key,
                    "probe",
                    Arc::new(Probe {
                        name,
                        log: log.clone(),
                        outcome,
                    }),
                )
                .unwrap();
        }
        registry.register("LATER:SEND", "LATER:SEND:text", "defer", Arc::new(Defer)).unwrap();
        registry.seal();
        Dispatcher::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_handlers_run_sequentially_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let report = dispatcher(&log)
            .dispatch("[OK:TWO:b] lalu [OK:ONE:a]", &context())
            .await;

        assert_eq!(
            *log.lock().await,
            vec!["two:start:b", "two:end", "one:start:a", "one:end"]
        );
        assert_eq!(report.cleaned, "lalu");
    }

    #[tokio::test]
    async fn test_failed_and_unknown_tokens_preserved() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let report = dispatcher(&log)
            .dispatch("Oke [FOO:BAR:baz] dan [BAD:ONE:x] [OK:ONE]", &context())
            .await;

        assert_eq!(report.cleaned, "Oke [FOO:BAR:baz] dan [BAD:ONE:x]");
        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.results[0].key, "FOO:BAR");
        assert_eq!(report.results[0].outcome, HandlerOutcome::Failed);
    }

    #[tokio::test]
    async fn test_unknown_only_reply_is_unchanged() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let report = dispatcher(&log).dispatch("Oke [FOO:BAR:baz]", &context()).await;
        assert_eq!(report.cleaned, "Oke [FOO:BAR:baz]");
    }

    #[tokio::test]
    async fn test_deferred_ids_collected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let ctx = context();
        let report = dispatcher(&log)
            .dispatch("Berikut! [LATER:SEND:satu] [LATER:SEND:dua]", &ctx)
            .await;

        assert_eq!(report.cleaned, "Berikut!");
        assert_eq!(report.deferred_ids.len(), 2);
        assert_eq!(ctx.deferred.pending().await, report.deferred_ids);
    }

    #[tokio::test]
    async fn test_all_tokens_succeed_leaves_empty_reply() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let report = dispatcher(&log)
            .dispatch("[OK:ONE]\n\n[OK:TWO]", &context())
            .await;
        assert_eq!(report.cleaned, "");
    }

    #[tokio::test]
    async fn test_current_message_id_reaches_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        dispatcher(&log)
            .dispatch("[OK:ONE:current_message_id]", &context())
            .await;
        assert_eq!(log.lock().await[0], "one:start:321");
    }

    #[tokio::test]
    async fn test_torn_down_registry_keeps_tokens() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let d = dispatcher(&log);
        d.registry().teardown();
        let report = d.dispatch("Hai [OK:ONE]", &context()).await;
        assert_eq!(report.cleaned, "Hai [OK:ONE]");
        assert!(log.lock().await.is_empty());
    }

    #[test]
    fn test_clean_collapses_blank_lines() {
        let reply = "Satu\n[OK:ONE]\n\n\nDua  [OK:TWO]\n";
        let tokens = parse(reply, syncara_models::MessageId(1));
        let cleaned = clean_reply(reply, &tokens, &[true, true]);
        assert_eq!(cleaned, "Satu\n\nDua");
    }

    #[test]
    fn test_clean_joins_words_with_single_space() {
        let reply = "Aku [OK:ONE] sudah simpan.";
        let tokens = parse(reply, syncara_models::MessageId(1));
        assert_eq!(clean_reply(reply, &tokens, &[true]), "Aku sudah simpan.");
    }
}
