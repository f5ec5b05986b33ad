//! Script host integration tests: the message bus, request-reply, publish
//! depth and budget limits, and multi-actor coordination.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use doodadengine::components::mapposition::MapPosition;
use doodadengine::components::timer::TimerId;
use doodadengine::error::ScriptResult;
use doodadengine::events::collision::Verdict;
use doodadengine::geometry::Vec2;
use doodadengine::level::{ActorSpec, Level};
use doodadengine::resources::simconfig::SimConfig;
use doodadengine::scripting::{Api, Doodad, Payload, Script};

fn spec(x: f32, y: f32, w: f32, h: f32) -> ActorSpec {
    ActorSpec {
        position: Vec2::new(x, y),
        size: Vec2::new(w, h),
        ..ActorSpec::default()
    }
}

/// Solid button that powers `"power"` while pressed and turns it off a
/// while after it was released.
#[derive(Default)]
struct Button {
    powered: bool,
    off_timer: Option<TimerId>,
}

impl Doodad for Button {
    fn main(&mut self, api: &mut Api<'_, Self>) -> ScriptResult<()> {
        api.on_collide(|button, api, _| {
            if let Some(timer) = button.off_timer.take() {
                api.clear_timer(timer);
            }
            if !button.powered {
                button.powered = true;
                api.publish("power", true);
            }
            Ok(Verdict::Solid)
        });
        api.on_leave(|button, api, _| {
            let timer = api.set_timeout(200.0, |button, api| {
                button.powered = false;
                button.off_timer = None;
                api.publish("power", false);
                Ok(())
            });
            button.off_timer = Some(timer);
            Ok(())
        });
        Ok(())
    }
}

#[test]
fn button_powers_door_on_then_off_after_release() {
    let mut level = Level::new(SimConfig::default());
    let seen: Rc<RefCell<Vec<(bool, f64)>>> = Rc::new(RefCell::new(Vec::new()));

    level
        .spawn(&spec(0.0, 100.0, 32.0, 16.0), Some(Script::new(Button::default()).boxed()))
        .unwrap();
    let s = seen.clone();
    let door = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.subscribe("power", move |_, api, payload| {
            if let Some(on) = payload.as_bool() {
                s.borrow_mut().push((on, api.now_ms()));
            }
            Ok(Payload::Nil)
        });
        Ok(())
    });
    level
        .spawn(&spec(200.0, 52.0, 32.0, 64.0), Some(door.boxed()))
        .unwrap();
    let walker = level
        .spawn(
            &ActorSpec {
                mobile: true,
                ..spec(0.0, 20.0, 32.0, 32.0)
            },
            None,
        )
        .unwrap();
    level.start();
    level.run_ticks(2);

    // Step onto the button for three ticks (50ms), then off again.
    level
        .world_mut()
        .get_mut::<MapPosition>(walker)
        .unwrap()
        .teleport(Vec2::new(0.0, 68.0));
    level.run_ticks(3);
    level
        .world_mut()
        .get_mut::<MapPosition>(walker)
        .unwrap()
        .teleport(Vec2::new(0.0, 0.0));
    level.run_ticks(60);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2, "{:?}", seen);
    assert!(seen[0].0);
    assert!(!seen[1].0);
    assert!(seen[1].1 - seen[0].1 >= 150.0);
}

#[test]
fn self_publish_is_bounded_by_depth() {
    let mut level = Level::new(SimConfig::default());
    let runs = Rc::new(Cell::new(0u32));
    let r = runs.clone();
    let echo = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.subscribe("echo", move |_, api, payload| {
            r.set(r.get() + 1);
            api.publish("echo", payload.clone());
            Ok(Payload::Nil)
        });
        Ok(())
    });
    level
        .spawn(&spec(0.0, 0.0, 8.0, 8.0), Some(echo.boxed()))
        .unwrap();
    level.start();

    level.publish("echo", 1.0);
    assert_eq!(runs.get(), 100);

    // The next tick starts fresh.
    level.step();
    level.publish("echo", 2.0);
    assert_eq!(runs.get(), 200);
}

#[test]
fn delivery_budget_ends_ping_pong() {
    let config = SimConfig {
        max_publish_depth: 10_000,
        max_deliveries_per_tick: 50,
        ..SimConfig::default()
    };
    let mut level = Level::new(config);
    let deliveries = Rc::new(Cell::new(0u32));

    for (listen, answer) in [("ping", "pong"), ("pong", "ping")] {
        let d = deliveries.clone();
        let player = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
            api.subscribe(listen, move |_, api, _| {
                d.set(d.get() + 1);
                api.publish(answer, ());
                Ok(Payload::Nil)
            });
            Ok(())
        });
        level
            .spawn(&spec(0.0, 0.0, 8.0, 8.0), Some(player.boxed()))
            .unwrap();
    }
    level.start();

    level.publish("ping", ());
    assert_eq!(deliveries.get(), 50);
    level.publish("ping", ());
    assert_eq!(deliveries.get(), 50);

    level.step();
    level.publish("ping", ());
    assert_eq!(deliveries.get(), 100);
}

#[test]
fn crowd_of_republishers_stays_within_one_tick_budget() {
    let mut level = Level::new(SimConfig::default());
    let budget = level.world().resource::<SimConfig>().max_deliveries_per_tick;
    let runs = Rc::new(Cell::new(0usize));
    for _ in 0..1000 {
        let r = runs.clone();
        let relay = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
            api.subscribe("t", move |_, api, _| {
                r.set(r.get() + 1);
                api.publish("t", ());
                Ok(Payload::Nil)
            });
            Ok(())
        });
        level
            .spawn(&spec(0.0, 0.0, 8.0, 8.0), Some(relay.boxed()))
            .unwrap();
    }
    level.start();

    level.publish("t", ());
    let first = runs.get();
    assert!(first > 100, "only {} runs", first);
    assert!(first <= budget, "{} runs over a budget of {}", first, budget);

    // Nothing is left queued for the next tick.
    level.step();
    assert_eq!(level.tick(), 1);
    assert_eq!(runs.get(), first);

    level.publish("t", ());
    assert!(runs.get() > first);
    assert!(runs.get() - first <= budget);
}

#[test]
fn request_collects_non_nil_replies_in_subscription_order() {
    let mut level = Level::new(SimConfig::default());
    for reply in [Payload::from("lever"), Payload::Nil, Payload::from(3.0)] {
        let responder = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
            api.subscribe("who", move |_, _, _| Ok(reply.clone()));
            Ok(())
        });
        level
            .spawn(&spec(0.0, 0.0, 8.0, 8.0), Some(responder.boxed()))
            .unwrap();
    }
    let replies = Rc::new(RefCell::new(Vec::new()));
    let r = replies.clone();
    let asker = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        *r.borrow_mut() = api.request("who", ());
        Ok(())
    });
    level
        .spawn(&spec(0.0, 0.0, 8.0, 8.0), Some(asker.boxed()))
        .unwrap();
    level.start();

    assert_eq!(
        *replies.borrow(),
        vec![Payload::from("lever"), Payload::Number(3.0)]
    );
}

#[test]
fn message_to_busy_actor_is_delivered_after_its_handler() {
    let mut level = Level::new(SimConfig::default());
    let order = Rc::new(RefCell::new(Vec::new()));

    let o = order.clone();
    let totem = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        let o2 = o.clone();
        api.subscribe("color", move |_, api, payload| {
            o2.borrow_mut().push(format!("totem got {}", payload.as_str().unwrap_or_default()));
            if payload.as_str() == Some("red") {
                api.publish("color", "blue");
                o2.borrow_mut().push("totem done".to_string());
            }
            Ok(Payload::Nil)
        });
        Ok(())
    });
    let o = order.clone();
    let lamp = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.subscribe("color", move |_, _, payload| {
            o.borrow_mut().push(format!("lamp got {}", payload.as_str().unwrap_or_default()));
            Ok(Payload::Nil)
        });
        Ok(())
    });
    level
        .spawn(&spec(0.0, 0.0, 8.0, 8.0), Some(totem.boxed()))
        .unwrap();
    level
        .spawn(&spec(0.0, 0.0, 8.0, 8.0), Some(lamp.boxed()))
        .unwrap();
    level.start();

    level.publish("color", "red");
    assert_eq!(
        *order.borrow(),
        vec![
            "totem got red",
            "lamp got blue",
            "totem done",
            "totem got blue",
            "lamp got red",
        ]
    );
}

#[test]
fn first_explicit_verdict_wins() {
    let mut level = Level::new(SimConfig::default());
    let platform = Script::with_main((), |_, api: &mut Api<'_, ()>| {
        api.on_collide(|_, _, _| Ok(Verdict::Unspecified));
        api.on_collide(|_, _, _| Ok(Verdict::NotSolid));
        api.on_collide(|_, _, _| Ok(Verdict::Solid));
        Ok(())
    });
    level
        .spawn(&spec(0.0, 100.0, 32.0, 32.0), Some(platform.boxed()))
        .unwrap();
    let faller = level
        .spawn(
            &ActorSpec {
                mobile: true,
                gravity: true,
                ..spec(0.0, 60.0, 32.0, 32.0)
            },
            None,
        )
        .unwrap();
    level.start();
    level.run_ticks(120);
    assert!(level.position(faller).unwrap().y > 132.0);
}

#[test]
fn actor_can_destroy_itself_from_a_handler() {
    let mut level = Level::new(SimConfig::default());
    let pops = Rc::new(Cell::new(0u32));
    let p = pops.clone();
    let balloon = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.subscribe("pin", move |_, api, _| {
            p.set(p.get() + 1);
            let me = api.me();
            api.destroy(me);
            Ok(Payload::Nil)
        });
        api.set_interval(10.0, |_, _| Ok(()));
        Ok(())
    });
    let actor = level
        .spawn(&spec(0.0, 0.0, 8.0, 8.0), Some(balloon.boxed()))
        .unwrap();
    level.start();

    level.publish("pin", ());
    level.publish("pin", ());
    level.run_ticks(5);
    assert_eq!(pops.get(), 1);
    assert!(!level.is_alive(actor));
    assert!(!level.host().has_script(actor));
}
