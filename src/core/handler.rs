//! Hook interface implemented by state-owning code.
//!
//! A [`StateHandler`] is the behavior attached to one state: enter/exit
//! hooks that may suspend the running transition, optional lifecycle
//! notifications, and an event handler consulted during dispatch.
//!
//! Hooks never call back into the statechart directly. Instead they
//! record requests in the [`RequestSink`] they are handed; the engine
//! drains the sink through its normal admission path after the hook
//! returns, so reentrant requests queue exactly like external ones.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Result of an enter or exit hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookOutcome {
    /// The hook completed synchronously; the transition proceeds.
    Done,
    /// The hook started asynchronous work. The transition halts with its
    /// remaining exit/enter steps preserved and continues only when
    /// [`crate::Statechart::resume`] is called.
    Suspend,
}

/// Internal fault raised by an event handler.
///
/// Faults during dispatch are isolated per branch: the engine logs them
/// and applies the chart's [`crate::FaultPolicy`] instead of aborting
/// the remaining current states.
#[derive(Debug, Error)]
#[error("state hook fault: {0}")]
pub struct HookFault(pub String);

impl HookFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// An event routed to the chart's current states.
///
/// Events are matched by name; `sender` and `context` are opaque
/// payloads forwarded to handlers untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub sender: Option<String>,
    pub context: Option<Value>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sender: None,
            context: None,
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// A request recorded by a hook for the engine to perform once the hook
/// has returned.
#[derive(Clone, Debug)]
pub(crate) enum Request {
    Goto {
        target: String,
        from: Option<String>,
        use_history: bool,
        context: Option<Value>,
    },
    GotoHistory {
        target: String,
        from: Option<String>,
        recursive: bool,
    },
    Send(Event),
    Resume,
}

/// Buffer through which hooks ask the engine for transitions, events,
/// or resumption.
///
/// Requests are applied in recording order after the hook returns and
/// are subject to the same single-flight admission as external calls: a
/// `goto_state` recorded inside an enter hook queues behind the active
/// transition, an event recorded during dispatch queues behind the
/// active dispatch.
#[derive(Default)]
pub struct RequestSink {
    requests: Vec<Request>,
}

impl RequestSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Request a transition to `target` from the default anchor.
    pub fn goto_state(&mut self, target: impl Into<String>) {
        self.requests.push(Request::Goto {
            target: target.into(),
            from: None,
            use_history: false,
            context: None,
        });
    }

    /// Request a transition to `target` anchored at the current state
    /// `from`.
    pub fn goto_state_from(&mut self, target: impl Into<String>, from: impl Into<String>) {
        self.requests.push(Request::Goto {
            target: target.into(),
            from: Some(from.into()),
            use_history: false,
            context: None,
        });
    }

    /// Request a transition to `target` delivering `context` to every
    /// entered state's hook.
    pub fn goto_state_with_context(&mut self, target: impl Into<String>, context: Value) {
        self.requests.push(Request::Goto {
            target: target.into(),
            from: None,
            use_history: false,
            context: Some(context),
        });
    }

    /// Request a transition to `target`'s history state.
    pub fn goto_history_state(&mut self, target: impl Into<String>, recursive: bool) {
        self.requests.push(Request::GotoHistory {
            target: target.into(),
            from: None,
            recursive,
        });
    }

    /// Request a transition to `target`'s history state anchored at the
    /// current state `from`.
    pub fn goto_history_state_from(
        &mut self,
        target: impl Into<String>,
        from: impl Into<String>,
        recursive: bool,
    ) {
        self.requests.push(Request::GotoHistory {
            target: target.into(),
            from: Some(from.into()),
            recursive,
        });
    }

    /// Request an event send.
    pub fn send_event(&mut self, event: Event) {
        self.requests.push(Request::Send(event));
    }

    /// Request resumption of a suspended transition.
    pub fn resume(&mut self) {
        self.requests.push(Request::Resume);
    }

    pub(crate) fn drain(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    /// Number of requests recorded so far.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// True iff no requests have been recorded.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Behavior attached to one state of the chart.
///
/// Every method has a no-op default, so implementations override only
/// what they need. `enter` and `exit` run exactly once per actual
/// entry/exit of the state during a transition; returning
/// [`HookOutcome::Suspend`] halts the transition until an explicit
/// resume.
///
/// # Example
///
/// ```rust
/// use statechart::{Event, HookFault, HookOutcome, RequestSink, StateHandler};
///
/// struct Recorder {
///     entries: usize,
/// }
///
/// impl StateHandler for Recorder {
///     fn enter(&mut self, _context: Option<&serde_json::Value>, _requests: &mut RequestSink) -> HookOutcome {
///         self.entries += 1;
///         HookOutcome::Done
///     }
///
///     fn handle_event(
///         &mut self,
///         event: &Event,
///         requests: &mut RequestSink,
///     ) -> Result<bool, HookFault> {
///         if event.name == "stop" {
///             requests.goto_state("idle");
///             return Ok(true);
///         }
///         Ok(false)
///     }
/// }
/// ```
pub trait StateHandler: Send {
    /// Called when the state is entered. `context` is the transition
    /// context supplied via
    /// [`crate::Statechart::goto_state_with_context`], if any.
    fn enter(&mut self, context: Option<&Value>, requests: &mut RequestSink) -> HookOutcome {
        let _ = (context, requests);
        HookOutcome::Done
    }

    /// Called when the state is exited.
    fn exit(&mut self, requests: &mut RequestSink) -> HookOutcome {
        let _ = requests;
        HookOutcome::Done
    }

    /// Notification fired immediately before `enter`.
    fn will_enter(&mut self) {}

    /// Notification fired immediately after `enter` returns.
    fn did_enter(&mut self) {}

    /// Notification fired immediately before `exit`.
    fn will_exit(&mut self) {}

    /// Notification fired immediately after `exit` returns.
    fn did_exit(&mut self) {}

    /// Attempt to handle an event dispatched to this state. Return
    /// `Ok(true)` to consume it, `Ok(false)` to let it bubble to the
    /// parent state, or `Err` to report an internal fault.
    fn handle_event(&mut self, event: &Event, requests: &mut RequestSink) -> Result<bool, HookFault> {
        let _ = (event, requests);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hooks_complete_synchronously() {
        struct Plain;
        impl StateHandler for Plain {}

        let mut handler = Plain;
        let mut sink = RequestSink::new();
        assert_eq!(handler.enter(None, &mut sink), HookOutcome::Done);
        assert_eq!(handler.exit(&mut sink), HookOutcome::Done);
        assert!(matches!(
            handler.handle_event(&Event::new("ping"), &mut sink),
            Ok(false)
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn sink_preserves_recording_order() {
        let mut sink = RequestSink::new();
        sink.goto_state("a");
        sink.send_event(Event::new("ping"));
        sink.resume();

        let requests = sink.drain();
        assert_eq!(requests.len(), 3);
        assert!(matches!(&requests[0], Request::Goto { target, .. } if target == "a"));
        assert!(matches!(&requests[1], Request::Send(e) if e.name == "ping"));
        assert!(matches!(&requests[2], Request::Resume));
        assert!(sink.is_empty());
    }

    #[test]
    fn history_requests_carry_their_anchor() {
        let mut sink = RequestSink::new();
        sink.goto_history_state("on", true);
        sink.goto_history_state_from("on", "off", false);

        let requests = sink.drain();
        assert!(matches!(
            &requests[0],
            Request::GotoHistory { from: None, recursive: true, .. }
        ));
        assert!(matches!(
            &requests[1],
            Request::GotoHistory { target, from: Some(f), recursive: false } if target == "on" && f == "off"
        ));
    }

    #[test]
    fn event_builder_attaches_payloads() {
        let event = Event::new("save")
            .with_sender("toolbar")
            .with_context(serde_json::json!({"doc": 7}));

        assert_eq!(event.name, "save");
        assert_eq!(event.sender.as_deref(), Some("toolbar"));
        assert_eq!(event.context, Some(serde_json::json!({"doc": 7})));
    }

    #[test]
    fn event_serializes_round_trip() {
        let event = Event::new("save").with_context(serde_json::json!([1, 2]));
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "save");
        assert_eq!(back.context, Some(serde_json::json!([1, 2])));
    }
}
