//! A media player modeled as a statechart.
//!
//! The player is either `stopped` or `playing`; while playing it is
//! also, in parallel, tracking playback speed and display mode. Events
//! from an imagined remote control drive the chart, and stopping then
//! pressing play again returns to the remembered speed via history.
//!
//! Run with `cargo run --example media_player`.

use serde_json::json;
use statechart::{
    ChartBuilder, Event, HookFault, HookOutcome, RequestSink, Sequence, StateHandler,
    StateTemplate,
};

struct Player;

impl StateHandler for Player {
    fn handle_event(&mut self, event: &Event, requests: &mut RequestSink) -> Result<bool, HookFault> {
        match event.name.as_str() {
            "play" => {
                // Recursive history so each parallel region returns to
                // its own remembered substate.
                requests.goto_history_state("playing", true);
                Ok(true)
            }
            "stop" => {
                requests.goto_state("stopped");
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

struct Speed {
    name: &'static str,
}

impl StateHandler for Speed {
    fn enter(&mut self, context: Option<&serde_json::Value>, _requests: &mut RequestSink) -> HookOutcome {
        match context {
            Some(ctx) => println!("  speed -> {} (context: {ctx})", self.name),
            None => println!("  speed -> {}", self.name),
        }
        HookOutcome::Done
    }

    fn handle_event(&mut self, event: &Event, requests: &mut RequestSink) -> Result<bool, HookFault> {
        if event.name == "faster" && self.name == "normal" {
            requests.goto_state_with_context("fast_forward", json!({"factor": 2}));
            return Ok(true);
        }
        if event.name == "slower" && self.name == "fast_forward" {
            requests.goto_state("normal");
            return Ok(true);
        }
        Ok(false)
    }
}

fn template() -> StateTemplate {
    StateTemplate::new("player")
        .initial("stopped")
        .substate(StateTemplate::new("stopped"))
        .substate(
            StateTemplate::new("playing")
                .parallel()
                .substate(
                    StateTemplate::new("speed")
                        .initial("normal")
                        .substate(StateTemplate::new("normal"))
                        .substate(StateTemplate::new("fast_forward")),
                )
                .substate(
                    StateTemplate::new("display")
                        .initial("minimal")
                        .substate(StateTemplate::new("minimal"))
                        .substate(StateTemplate::new("full")),
                ),
        )
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let mut chart = ChartBuilder::new()
        .initial("player")
        .substate(template())
        .handler("player", Player)
        .handler("normal", Speed { name: "normal" })
        .handler("fast_forward", Speed { name: "fast_forward" })
        .with_monitor()
        .build()
        .expect("chart builds");

    chart.initialize().expect("chart initializes");
    println!("initialized: {:?}", chart.current_states());

    println!("press play");
    chart.send_event(Event::new("play")).expect("dispatch");
    println!("current: {:?}", chart.current_states());

    println!("press faster");
    chart.send_event(Event::new("faster")).expect("dispatch");
    println!("current: {:?}", chart.current_states());

    println!("press stop, then play again");
    chart.send_event(Event::new("stop")).expect("dispatch");
    if let Some(monitor) = chart.monitor_mut() {
        monitor.reset();
    }
    chart.send_event(Event::new("play")).expect("dispatch");
    println!("current after history replay: {:?}", chart.current_states());

    let replay = Sequence::new()
        .exited(&["stopped"])
        .entered(&["playing", "speed", "fast_forward", "display", "minimal"]);
    let matched = chart
        .monitor()
        .map(|m| m.matches(&replay))
        .unwrap_or(false);
    println!("history restored fast_forward: {matched}");
}
