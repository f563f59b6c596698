//! Ad Experience
//!
//! A JSON-described ad player: a parent machine plays a video child, then an
//! endcard child, while the host can hide and show the whole experience.
//!
//! Key concepts:
//! - Machines loaded from JSON descriptors
//! - Child services built from templates with `with_context`
//! - `onDone` forwarding an event to the parent
//! - `standbyTimers` / `wakeTimers` freezing every timer in the session
//!
//! Run with: RUST_LOG=statecraft=debug cargo run --example ad_experience

use serde_json::json;
use statecraft::builder::{Implementations, ServiceRegistry};
use statecraft::config::MachineConfig;
use statecraft::core::Properties;
use statecraft::interpreter::MachineRegistry;
use statecraft::machine::Machine;
use statecraft::timer::{ManualScheduler, TimerCoordinator};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

const AD: &str = r#"{
    "id": "ad",
    "initial": "loading",
    "context": {"creative": "summer-sale", "impressions": 0},
    "states": {
        "loading": {"on": {"LOADED": "video"}},
        "video": {
            "entry": "countImpression",
            "invoke": {
                "id": "video",
                "src": "videoChild",
                "data": {"clipMs": 10000},
                "onDone": "VIDEO_DONE"
            },
            "on": {
                "VIDEO_DONE": "endcard",
                "HIDE": {"actions": "standbyTimers"},
                "SHOW": {"actions": "wakeTimers"}
            }
        },
        "endcard": {
            "invoke": {
                "id": "endcard",
                "src": "endcardChild",
                "data": {"cta": "Shop now"},
                "onDone": {"target": "complete"}
            },
            "on": {
                "HIDE": {"actions": "standbyTimers"},
                "SHOW": {"actions": "wakeTimers"}
            }
        },
        "complete": {"type": "final"}
    }
}"#;

const VIDEO: &str = r#"{
    "id": "video",
    "initial": "playing",
    "states": {
        "playing": {"after": {"clipLength": "ended"}},
        "ended": {"type": "final"}
    }
}"#;

const ENDCARD: &str = r#"{
    "id": "endcard",
    "initial": "shown",
    "states": {
        "shown": {"after": {"5000": "closed"}},
        "closed": {"type": "final"}
    }
}"#;

fn services() -> Result<ServiceRegistry, serde_json::Error> {
    let video = MachineConfig::from_json(VIDEO)?;
    let endcard = MachineConfig::from_json(ENDCARD)?;

    let mut services = ServiceRegistry::new();
    services.register("videoChild", move |context, _| {
        let implementations = Implementations::new().delay("clipLength", |ctx, _, _| {
            ctx.get("clipMs").and_then(|ms| ms.as_u64()).unwrap_or(15_000)
        });
        Ok(Machine::compile(video.clone().with_context(context), implementations)?)
    });
    services.register("endcardChild", move |context, _| {
        Ok(Machine::compile(
            endcard.clone().with_context(context),
            Implementations::new(),
        )?)
    });
    Ok(services)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Ad Experience ===\n");

    let scheduler = Rc::new(ManualScheduler::new());
    let coordinator = TimerCoordinator::new(scheduler.clone());
    let mut registry = MachineRegistry::new(coordinator.clone());

    let implementations = Implementations::new()
        .with_timer_actions(&coordinator)
        .assign_properties(
            "countImpression",
            Properties::new().compute("impressions", |ctx, _, _| {
                json!(ctx["impressions"].as_u64().unwrap_or(0) + 1)
            }),
        )
        .services(services()?);

    let config = MachineConfig::from_json(AD)?;
    let machine = registry.create_machine(config, implementations)?;
    let ad = registry.interpret(&machine)?;

    let _subscription = ad.subscribe(|snapshot| {
        if snapshot.changed {
            println!("  ad -> {}", snapshot.value);
        }
    });

    ad.start();
    ad.send("LOADED")?;
    println!("Impressions: {}", ad.state().context["impressions"]);

    scheduler.advance_ms(4_000);
    println!("\n4s into the clip, the host hides the ad");
    ad.send("HIDE")?;
    println!("  stashed timers: {}", coordinator.stashed());

    scheduler.advance_ms(60_000);
    println!("A minute later the ad is still in: {}", ad.state().value);

    ad.send("SHOW")?;
    println!("\nShown again, the clip resumes");
    scheduler.advance_ms(6_000);
    println!("Endcard child: {:?}", ad.child("endcard").map(|c| c.state().value));

    scheduler.advance_ms(5_000);
    println!("\nFinal state: {}", ad.state().value);
    println!("Path: {:?}", ad.history().get_path());

    registry.clear(None);
    ad.stop();
    println!("\n=== Example Complete ===");
    Ok(())
}
