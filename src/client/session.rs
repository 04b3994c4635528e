//! Client-side recording session as an explicit state machine.
//!
//! [`transition`] is pure: it consumes the current state and one event and
//! returns the next state plus the side effects the driver must perform.
//! Nothing here touches timers, sockets or the clock.

use serde::Serialize;

use crate::config::ClientConfig;
use crate::models::{ClassificationResult, Point, ResultStatus};
use crate::settings::Settings;

use super::capture::PointCapture;
use super::recenter::RecenterCoordinator;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    /// Waiting for the server to confirm the pointer was recentered.
    AwaitingCursor { attempt: u32 },
    Recording { capture: PointCapture },
    /// `resume` decides whether a result re-arms recording (auto mode)
    /// or ends the session. A stop request clears it.
    Classifying { resume: bool },
    Finished(ClassificationResult),
    Error { message: String },
}

/// Coarse status for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    AwaitingCursor,
    Recording,
    Classifying,
    Finished,
    Error,
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::Idle => SessionStatus::Idle,
            SessionState::AwaitingCursor { .. } => SessionStatus::AwaitingCursor,
            SessionState::Recording { .. } => SessionStatus::Recording,
            SessionState::Classifying { .. } => SessionStatus::Classifying,
            SessionState::Finished(_) => SessionStatus::Finished,
            SessionState::Error { .. } => SessionStatus::Error,
        }
    }

    /// States in which a toggle starts a new session.
    pub fn is_resting(&self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Finished(_) | SessionState::Error { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Toggle,
    /// Server confirmed the recenter; `at_ms` becomes the capture origin.
    CursorReset { at_ms: f64 },
    PointerMoved { x: f64, y: f64, at_ms: f64 },
    Click,
    PauseElapsed,
    AckTimeout,
    ServerFinished(ClassificationResult),
    ServerError { message: String },
    ServerIdle { message: String },
    Disconnected,
    Dismiss,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    RequestRecenter { x: f64, y: f64 },
    ArmAckTimer,
    CancelAckTimer,
    RestartPauseTimer,
    CancelPauseTimer,
    SendClassify { points: Vec<Point> },
    Deliver(ClassificationResult),
    SurfaceError(String),
}

/// Inputs to [`transition`] that are fixed for the duration of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub auto_mode: bool,
    pub click_symbol: String,
    pub jitter_threshold_px: f64,
    pub recenter: RecenterCoordinator,
}

impl SessionContext {
    pub fn new(config: &ClientConfig, settings: &Settings) -> Self {
        Self {
            auto_mode: settings.auto_mode,
            click_symbol: config.click_symbol.clone(),
            jitter_threshold_px: config.jitter_threshold_px,
            recenter: RecenterCoordinator::new(config.anchor, config.max_recenter_attempts),
        }
    }
}

pub fn transition(
    state: SessionState,
    ctx: &SessionContext,
    event: SessionEvent,
) -> (SessionState, Vec<Effect>) {
    use SessionEvent as E;
    use SessionState as S;

    match (state, event) {
        (state, E::Toggle) if state.is_resting() => start(ctx),
        // already starting or already stopping
        (state @ S::AwaitingCursor { .. }, E::Toggle) => (state, Vec::new()),
        (S::Classifying { .. }, E::Toggle) => (S::Classifying { resume: false }, Vec::new()),
        (S::Recording { capture }, E::Toggle) => stop(capture, false),

        (S::AwaitingCursor { .. }, E::CursorReset { at_ms }) => (
            S::Recording {
                capture: PointCapture::new(at_ms, ctx.jitter_threshold_px),
            },
            vec![Effect::CancelAckTimer],
        ),
        (S::AwaitingCursor { attempt }, E::AckTimeout) => match ctx.recenter.next_attempt(attempt) {
            Some(next) => (
                S::AwaitingCursor { attempt: next },
                ctx.recenter.request(),
            ),
            None => fail(ctx.recenter.exhausted_message(), Vec::new()),
        },

        (S::Recording { mut capture }, E::PointerMoved { x, y, at_ms }) => {
            capture.record(x, y, at_ms);
            let effects = if ctx.auto_mode {
                vec![Effect::RestartPauseTimer]
            } else {
                Vec::new()
            };
            (S::Recording { capture }, effects)
        }
        (S::Recording { capture }, E::PauseElapsed) => {
            if capture.is_empty() || !ctx.auto_mode {
                (S::Recording { capture }, Vec::new())
            } else {
                stop(capture, true)
            }
        }
        (S::Recording { .. }, E::Click) => {
            let mut effects = vec![Effect::CancelPauseTimer];
            let (next, more) = finish(
                ClassificationResult::synthetic(&ctx.click_symbol),
                ctx.auto_mode,
                ctx,
            );
            effects.extend(more);
            (next, effects)
        }

        (S::Classifying { resume }, E::ServerFinished(result)) => {
            if result.status == ResultStatus::Error {
                let message = result
                    .message
                    .unwrap_or_else(|| "Classification failed".to_string());
                fail(message, Vec::new())
            } else {
                finish(result, resume, ctx)
            }
        }
        (S::Classifying { .. }, E::ServerIdle { .. }) => (S::Idle, Vec::new()),

        (state, E::ServerError { message }) if !state.is_resting() => {
            fail(message, cancel_timers(&state))
        }
        (state, E::Disconnected) if !state.is_resting() => {
            fail("Connection lost".to_string(), cancel_timers(&state))
        }

        (S::Finished(_) | S::Error { .. }, E::Dismiss) => (S::Idle, Vec::new()),

        // stale or irrelevant in this state
        (state, _) => (state, Vec::new()),
    }
}

fn start(ctx: &SessionContext) -> (SessionState, Vec<Effect>) {
    (
        SessionState::AwaitingCursor { attempt: 1 },
        ctx.recenter.request(),
    )
}

/// Hand the buffer off for classification. The capture is consumed here,
/// so no later session can see these points.
fn stop(capture: PointCapture, resume: bool) -> (SessionState, Vec<Effect>) {
    if capture.is_empty() {
        return (SessionState::Idle, vec![Effect::CancelPauseTimer]);
    }
    (
        SessionState::Classifying { resume },
        vec![
            Effect::CancelPauseTimer,
            Effect::SendClassify {
                points: capture.into_points(),
            },
        ],
    )
}

fn finish(
    result: ClassificationResult,
    resume: bool,
    ctx: &SessionContext,
) -> (SessionState, Vec<Effect>) {
    if resume {
        let mut effects = vec![Effect::Deliver(result)];
        effects.extend(ctx.recenter.request());
        (SessionState::AwaitingCursor { attempt: 1 }, effects)
    } else {
        (
            SessionState::Finished(result.clone()),
            vec![Effect::Deliver(result)],
        )
    }
}

fn fail(message: String, mut effects: Vec<Effect>) -> (SessionState, Vec<Effect>) {
    effects.push(Effect::SurfaceError(message.clone()));
    (SessionState::Error { message }, effects)
}

fn cancel_timers(state: &SessionState) -> Vec<Effect> {
    match state {
        SessionState::AwaitingCursor { .. } => vec![Effect::CancelAckTimer],
        SessionState::Recording { .. } => vec![Effect::CancelPauseTimer],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candidate;

    fn ctx(auto_mode: bool) -> SessionContext {
        SessionContext {
            auto_mode,
            click_symbol: ".".to_string(),
            jitter_threshold_px: 0.0,
            recenter: RecenterCoordinator::new((640.0, 400.0), 3),
        }
    }

    fn run(
        ctx: &SessionContext,
        mut state: SessionState,
        events: Vec<SessionEvent>,
    ) -> (SessionState, Vec<Effect>) {
        let mut all = Vec::new();
        for event in events {
            let (next, effects) = transition(state, ctx, event);
            state = next;
            all.extend(effects);
        }
        (state, all)
    }

    fn moves(n: usize) -> Vec<SessionEvent> {
        (0..n)
            .map(|i| SessionEvent::PointerMoved {
                x: i as f64 * 10.0,
                y: 0.0,
                at_ms: 100.0 + i as f64 * 16.0,
            })
            .collect()
    }

    fn recording(ctx: &SessionContext) -> SessionState {
        run(
            ctx,
            SessionState::Idle,
            vec![SessionEvent::Toggle, SessionEvent::CursorReset { at_ms: 100.0 }],
        )
        .0
    }

    fn classify_count(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::SendClassify { .. }))
            .count()
    }

    fn recenter_count(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::RequestRecenter { .. }))
            .count()
    }

    fn result(symbol: &str) -> ClassificationResult {
        ClassificationResult::finished(vec![Candidate {
            symbol: symbol.to_string(),
            confidence: 0.9,
        }])
    }

    #[test]
    fn toggle_from_idle_requests_recenter() {
        let (state, effects) = transition(SessionState::Idle, &ctx(false), SessionEvent::Toggle);
        assert_eq!(state, SessionState::AwaitingCursor { attempt: 1 });
        assert_eq!(
            effects,
            vec![
                Effect::RequestRecenter { x: 640.0, y: 400.0 },
                Effect::ArmAckTimer
            ]
        );
    }

    #[test]
    fn moves_before_ack_are_not_captured() {
        let ctx = ctx(false);
        let mut events = vec![SessionEvent::Toggle];
        events.extend(moves(3));
        events.push(SessionEvent::CursorReset { at_ms: 500.0 });
        let (state, effects) = run(&ctx, SessionState::Idle, events);

        match state {
            SessionState::Recording { capture } => assert!(capture.is_empty()),
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(effects.last(), Some(&Effect::CancelAckTimer));
    }

    #[test]
    fn manual_stop_dispatches_exactly_one_classify() {
        let ctx = ctx(false);
        let mut events = moves(5);
        events.push(SessionEvent::Toggle);
        events.push(SessionEvent::Toggle);
        events.push(SessionEvent::Toggle);
        let (state, effects) = run(&ctx, recording(&ctx), events);

        assert_eq!(state, SessionState::Classifying { resume: false });
        assert_eq!(classify_count(&effects), 1);
        match effects.iter().find(|e| matches!(e, Effect::SendClassify { .. })) {
            Some(Effect::SendClassify { points }) => {
                assert_eq!(points.len(), 5);
                assert_eq!(points[0].t, 0.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn toggle_while_awaiting_cursor_is_a_no_op() {
        let ctx = ctx(false);
        let (state, effects) = run(
            &ctx,
            SessionState::Idle,
            vec![SessionEvent::Toggle, SessionEvent::Toggle, SessionEvent::Toggle],
        );
        assert_eq!(state, SessionState::AwaitingCursor { attempt: 1 });
        assert_eq!(recenter_count(&effects), 1);
    }

    #[test]
    fn stopping_with_empty_buffer_returns_to_idle() {
        let ctx = ctx(false);
        let (state, effects) = transition(recording(&ctx), &ctx, SessionEvent::Toggle);
        assert_eq!(state, SessionState::Idle);
        assert_eq!(classify_count(&effects), 0);
    }

    #[test]
    fn pause_with_empty_buffer_keeps_recording() {
        let ctx = ctx(true);
        let (state, effects) = transition(recording(&ctx), &ctx, SessionEvent::PauseElapsed);
        assert_eq!(state.status(), SessionStatus::Recording);
        assert!(effects.is_empty());
    }

    #[test]
    fn auto_mode_pause_classifies_once_then_recenters_once() {
        let ctx = ctx(true);
        let mut events = moves(12);
        events.push(SessionEvent::PauseElapsed);
        let (state, effects) = run(&ctx, recording(&ctx), events);

        assert_eq!(state, SessionState::Classifying { resume: true });
        assert_eq!(classify_count(&effects), 1);
        assert_eq!(recenter_count(&effects), 0);
        assert_eq!(
            effects
                .iter()
                .filter(|e| **e == Effect::RestartPauseTimer)
                .count(),
            12
        );

        let (state, effects) = transition(state, &ctx, SessionEvent::ServerFinished(result("x")));
        assert_eq!(state, SessionState::AwaitingCursor { attempt: 1 });
        assert_eq!(effects[0], Effect::Deliver(result("x")));
        assert_eq!(recenter_count(&effects), 1);
    }

    #[test]
    fn stop_during_auto_classification_ends_the_session() {
        let ctx = ctx(true);
        let mut events = moves(4);
        events.push(SessionEvent::PauseElapsed);
        events.push(SessionEvent::Toggle);
        events.push(SessionEvent::ServerFinished(result("y")));
        let (state, effects) = run(&ctx, recording(&ctx), events);

        assert_eq!(state, SessionState::Finished(result("y")));
        assert_eq!(classify_count(&effects), 1);
        assert_eq!(recenter_count(&effects), 0);
    }

    #[test]
    fn manual_mode_ignores_pause() {
        let ctx = ctx(false);
        let mut events = moves(3);
        events.push(SessionEvent::PauseElapsed);
        let (state, effects) = run(&ctx, recording(&ctx), events);
        assert_eq!(state.status(), SessionStatus::Recording);
        assert!(effects.is_empty());
    }

    #[test]
    fn ack_timeouts_retry_then_fail() {
        let ctx = ctx(false);
        let (state, effects) = run(
            &ctx,
            SessionState::Idle,
            vec![
                SessionEvent::Toggle,
                SessionEvent::AckTimeout,
                SessionEvent::AckTimeout,
            ],
        );
        assert_eq!(state, SessionState::AwaitingCursor { attempt: 3 });
        assert_eq!(recenter_count(&effects), 3);

        let (state, effects) = transition(state, &ctx, SessionEvent::AckTimeout);
        assert_eq!(state.status(), SessionStatus::Error);
        assert!(matches!(effects.last(), Some(Effect::SurfaceError(_))));

        let (state, _) = transition(state, &ctx, SessionEvent::Dismiss);
        assert_eq!(state, SessionState::Idle);
    }

    #[test]
    fn click_while_recording_yields_synthetic_result() {
        let ctx = ctx(false);
        let mut events = moves(2);
        events.push(SessionEvent::Click);
        let (state, effects) = run(&ctx, recording(&ctx), events);

        let expected = ClassificationResult::synthetic(".");
        assert_eq!(state, SessionState::Finished(expected.clone()));
        assert!(effects.contains(&Effect::Deliver(expected)));
        assert_eq!(classify_count(&effects), 0);
    }

    #[test]
    fn server_error_result_surfaces_message() {
        let ctx = ctx(false);
        let (state, effects) = transition(
            SessionState::Classifying { resume: false },
            &ctx,
            SessionEvent::ServerFinished(ClassificationResult::error("No trained symbols")),
        );
        assert_eq!(
            state,
            SessionState::Error {
                message: "No trained symbols".to_string()
            }
        );
        assert_eq!(
            effects,
            vec![Effect::SurfaceError("No trained symbols".to_string())]
        );
    }

    #[test]
    fn disconnect_while_recording_cancels_pause_timer() {
        let ctx = ctx(true);
        let (state, effects) = transition(recording(&ctx), &ctx, SessionEvent::Disconnected);
        assert_eq!(state.status(), SessionStatus::Error);
        assert_eq!(effects[0], Effect::CancelPauseTimer);

        let (idle, effects) = transition(SessionState::Idle, &ctx, SessionEvent::Disconnected);
        assert_eq!(idle, SessionState::Idle);
        assert!(effects.is_empty());
    }

    #[test]
    fn stale_results_are_ignored() {
        let ctx = ctx(false);
        let (state, effects) = transition(
            SessionState::Idle,
            &ctx,
            SessionEvent::ServerFinished(result("x")),
        );
        assert_eq!(state, SessionState::Idle);
        assert!(effects.is_empty());

        let (state, _) = transition(
            recording(&ctx),
            &ctx,
            SessionEvent::CursorReset { at_ms: 1.0 },
        );
        assert_eq!(state.status(), SessionStatus::Recording);
    }

    #[test]
    fn server_idle_during_classification_returns_to_idle() {
        let (state, effects) = transition(
            SessionState::Classifying { resume: true },
            &ctx(true),
            SessionEvent::ServerIdle {
                message: "No points recorded".into(),
            },
        );
        assert_eq!(state, SessionState::Idle);
        assert!(effects.is_empty());
    }
}
