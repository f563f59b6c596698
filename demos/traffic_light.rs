//! Traffic Light Statechart
//!
//! A cyclic machine driven entirely by delayed transitions.
//!
//! Key concepts:
//! - `after` transitions instead of explicit events
//! - A manual clock so the demo runs instantly
//! - Subscribing to every snapshot
//!
//! Run with: cargo run --example traffic_light

use statecraft::builder::{MachineBuilder, StateBuilder};
use statecraft::interpreter::Interpreter;
use statecraft::timer::{ManualScheduler, TimerCoordinator};
use std::rc::Rc;

fn main() {
    println!("=== Traffic Light Statechart ===\n");

    let machine = MachineBuilder::new("traffic_light")
        .initial("red")
        .state("red", StateBuilder::new().after_ms(4_000, "green"))
        .state("green", StateBuilder::new().after_ms(3_000, "yellow"))
        .state("yellow", StateBuilder::new().after_ms(1_000, "red"))
        .build()
        .unwrap();

    let scheduler = Rc::new(ManualScheduler::new());
    let light = Interpreter::new(machine, TimerCoordinator::new(scheduler.clone()));

    let _subscription = light.subscribe(|snapshot| {
        if snapshot.changed {
            println!("  -> {}", snapshot.value);
        }
    });

    light.start();
    println!("Initial state: {}\n", light.state().value);

    println!("Two full cycles (16 simulated seconds):");
    for _ in 0..16 {
        scheduler.advance_ms(1_000);
    }

    println!("\nTransitions recorded: {}", light.history().transitions().len());
    println!("Final state: {}", light.state().value);

    light.stop();
    println!("\n=== Example Complete ===");
}
