#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{error::Error, io::Write};

use crate::{extract::MessagePattern, message::Message};

/// Receiver of everything a build reports while it runs.
pub trait MessageSink {
    /// A regular output line.
    fn message(&mut self, text: &str);
    /// A warning, e.g. a line written to stderr.
    fn warning(&mut self, text: &str);
    /// A build error.
    fn error(&mut self, text: &str);
    /// A failure of the build runner itself rather than of the build.
    fn internal_error(&mut self, kind: &str, text: &str, cause: Option<&(dyn Error + 'static)>);
}

impl<S: MessageSink + ?Sized> MessageSink for &mut S {
    fn message(&mut self, text: &str) {
        (**self).message(text)
    }

    fn warning(&mut self, text: &str) {
        (**self).warning(text)
    }

    fn error(&mut self, text: &str) {
        (**self).error(text)
    }

    fn internal_error(&mut self, kind: &str, text: &str, cause: Option<&(dyn Error + 'static)>) {
        (**self).internal_error(kind, text, cause)
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Sink that reports build output through `tracing`.
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn message(&mut self, text: &str) {
        tracing::debug!(target: "build", "{text}");
    }

    fn warning(&mut self, text: &str) {
        tracing::warn!(target: "build", "{text}");
    }

    fn error(&mut self, text: &str) {
        tracing::error!(target: "build", "{text}");
    }

    fn internal_error(&mut self, kind: &str, text: &str, cause: Option<&(dyn Error + 'static)>) {
        match cause {
            Some(cause) => tracing::error!(target: "build", "[{kind}] {text}: {cause}"),
            None => tracing::error!(target: "build", "[{kind}] {text}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One call received by a [`RecordingSink`].
pub enum SinkCall {
    /// [`MessageSink::message`]
    Message(String),
    /// [`MessageSink::warning`]
    Warning(String),
    /// [`MessageSink::error`]
    Error(String),
    /// [`MessageSink::internal_error`], with the cause rendered
    InternalError {
        /// Error category.
        kind:  String,
        /// Error description.
        text:  String,
        /// Rendered cause, if any.
        cause: Option<String>,
    },
}

#[derive(Debug, Clone, Default)]
/// Sink that remembers every call, for tests.
pub struct RecordingSink {
    /// Calls in arrival order.
    calls: Vec<SinkCall>,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the calls received so far.
    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }
}

impl MessageSink for RecordingSink {
    fn message(&mut self, text: &str) {
        self.calls.push(SinkCall::Message(text.to_string()));
    }

    fn warning(&mut self, text: &str) {
        self.calls.push(SinkCall::Warning(text.to_string()));
    }

    fn error(&mut self, text: &str) {
        self.calls.push(SinkCall::Error(text.to_string()));
    }

    fn internal_error(&mut self, kind: &str, text: &str, cause: Option<&(dyn Error + 'static)>) {
        self.calls.push(SinkCall::InternalError {
            kind:  kind.to_string(),
            text:  text.to_string(),
            cause: cause.map(ToString::to_string),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which callbacks a [`MessageCollector`] scans for service messages.
pub enum CollectMode {
    /// Only regular output is scanned; warnings and errors are just reported.
    /// Internal errors are remembered so the run can fail on them.
    Compare,
    /// Every callback and every parameter is scanned.
    Record,
}

#[derive(Debug)]
/// Sink that extracts service messages from what it receives and forwards
/// every call to an inner sink.
pub struct MessageCollector<S> {
    /// Sink every call is forwarded to.
    inner:           S,
    /// Pattern used to find messages.
    pattern:         MessagePattern,
    /// Which callbacks are scanned.
    mode:            CollectMode,
    /// Messages found so far, in arrival order.
    messages:        Vec<Message>,
    /// Internal errors seen in compare mode.
    internal_errors: Vec<String>,
}

impl<S: MessageSink> MessageCollector<S> {
    /// Creates a collector forwarding to `inner`.
    pub fn new(inner: S, pattern: MessagePattern, mode: CollectMode) -> Self {
        Self {
            inner,
            pattern,
            mode,
            messages: Vec::new(),
            internal_errors: Vec::new(),
        }
    }

    /// Returns the collection mode.
    pub fn mode(&self) -> CollectMode {
        self.mode
    }

    /// Returns the messages collected so far.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Consumes the collector, returning the collected messages.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Returns internal errors reported while comparing.
    pub fn internal_errors(&self) -> &[String] {
        &self.internal_errors
    }

    /// Returns the inner sink.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Writes the collected messages, one per line.
    pub fn print_trace(&self, out: &mut impl Write) -> std::io::Result<()> {
        for message in &self.messages {
            writeln!(out, "{message}")?;
        }
        Ok(())
    }

    /// Scans `text` and stores every message found.
    fn gather(&mut self, text: &str) {
        let found = self.pattern.extract(text);
        self.messages.extend(found);
    }
}

impl<S: MessageSink> MessageSink for MessageCollector<S> {
    fn message(&mut self, text: &str) {
        self.inner.message(text);
        self.gather(text);
    }

    fn warning(&mut self, text: &str) {
        self.inner.warning(text);
        if self.mode == CollectMode::Record {
            self.gather(text);
        }
    }

    fn error(&mut self, text: &str) {
        self.inner.error(text);
        if self.mode == CollectMode::Record {
            self.gather(text);
        }
    }

    fn internal_error(&mut self, kind: &str, text: &str, cause: Option<&(dyn Error + 'static)>) {
        self.inner.internal_error(kind, text, cause);
        match self.mode {
            CollectMode::Record => {
                self.gather(kind);
                self.gather(text);
                if let Some(cause) = cause {
                    self.gather(&cause.to_string());
                }
            }
            CollectMode::Compare => self.internal_errors.push(format!("[{kind}] {text}")),
        }
    }
}
