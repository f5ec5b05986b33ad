//! Level tick integration tests for physics, collision, animation and timers.
//!
//! Each test builds a small [`Level`], attaches Rust scripts and steps it
//! tick by tick, checking the observable state afterwards.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use doodadengine::components::actor::ActorId;
use doodadengine::components::animation::FrameId;
use doodadengine::components::timer::{ActorTimers, TimerId};
use doodadengine::error::SimError;
use doodadengine::events::collision::{CollideEvent, Verdict};
use doodadengine::events::host::HostCmd;
use doodadengine::geometry::{Rect, Vec2};
use doodadengine::level::{ActorSpec, Level};
use doodadengine::resources::input::Buttons;
use doodadengine::resources::messagebus::MessageBus;
use doodadengine::resources::simconfig::SimConfig;
use doodadengine::scripting::{ActorScript, Api, Payload, Script};

const EPSILON: f32 = 1e-4;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn spec(x: f32, y: f32, w: f32, h: f32) -> ActorSpec {
    ActorSpec {
        position: Vec2::new(x, y),
        size: Vec2::new(w, h),
        ..ActorSpec::default()
    }
}

fn mobile(x: f32, y: f32, w: f32, h: f32, gravity: bool) -> ActorSpec {
    ActorSpec {
        mobile: true,
        gravity,
        ..spec(x, y, w, h)
    }
}

/// A fixed block whose `OnCollide` always answers `verdict`.
fn block(verdict: Verdict) -> Box<dyn ActorScript> {
    Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.on_collide(move |_, _, _| Ok(verdict));
        Ok(())
    })
    .boxed()
}

#[test]
fn gravity_accelerates_up_to_terminal_velocity() {
    let mut level = Level::new(SimConfig::default());
    let faller = level.spawn(&mobile(0.0, 0.0, 16.0, 16.0, true), None).unwrap();
    level.start();

    let mut last = 0.0;
    for _ in 0..29 {
        level.step();
        let vy = level.body(faller).unwrap().velocity.y;
        assert!(vy > last, "vy {} did not grow past {}", vy, last);
        last = vy;
    }
    level.run_ticks(20);
    assert!(approx_eq(level.body(faller).unwrap().velocity.y, 6.0));
    assert!(!level.body(faller).unwrap().grounded);
}

#[test]
fn falling_actor_lands_on_solid_block() {
    let mut level = Level::new(SimConfig::default());
    let floor = level
        .spawn(&spec(100.0, 100.0, 32.0, 32.0), Some(block(Verdict::Solid)))
        .unwrap();
    let faller = level
        .spawn(
            &ActorSpec {
                velocity: Vec2::new(0.0, 5.0),
                hitbox: Some(Rect::new(0.0, 0.0, 32.0, 32.0).unwrap()),
                ..mobile(100.0, 68.0, 32.0, 32.0, true)
            },
            None,
        )
        .unwrap();
    level.start();

    for _ in 0..10 {
        level.step();
        let floor_y = level.position(floor).unwrap().y;
        let pos = level.position(faller).unwrap();
        let body = level.body(faller).unwrap();
        assert!(approx_eq(pos.y, floor_y - 32.0), "y = {}", pos.y);
        assert!(body.grounded);
        assert!(approx_eq(body.velocity.y, 0.0));
    }
}

#[test]
fn solid_push_leaves_no_overlap_along_entry_axis() {
    let mut level = Level::new(SimConfig::default());
    let wall = level
        .spawn(&spec(64.0, 0.0, 32.0, 64.0), Some(block(Verdict::Unspecified)))
        .unwrap();
    let runner = level
        .spawn(
            &ActorSpec {
                velocity: Vec2::new(3.0, 0.0),
                ..mobile(20.0, 16.0, 32.0, 32.0, false)
            },
            None,
        )
        .unwrap();
    level.start();
    level.run_ticks(30);

    let wall_x = level.position(wall).unwrap().x;
    let pos = level.position(runner).unwrap();
    assert!(approx_eq(pos.x + 32.0, wall_x));
    assert!(approx_eq(level.body(runner).unwrap().velocity.x, 0.0));
    assert!(!level.body(runner).unwrap().grounded);
}

/// A fixed block that answers `verdict` and keeps every event it receives.
fn recording_block(verdict: Verdict) -> (Box<dyn ActorScript>, Rc<RefCell<Vec<CollideEvent>>>) {
    let events = Rc::new(RefCell::new(Vec::new()));
    let e = events.clone();
    let script = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        let e = e.clone();
        api.on_collide(move |_, _, ev| {
            e.borrow_mut().push(*ev);
            Ok(verdict)
        });
        Ok(())
    });
    (script.boxed(), events)
}

#[test]
fn landing_is_unsettled_and_resting_is_settled() {
    let mut level = Level::new(SimConfig::default());
    let (floor, events) = recording_block(Verdict::Solid);
    level.spawn(&spec(0.0, 100.0, 32.0, 32.0), Some(floor)).unwrap();
    let faller = level
        .spawn(
            &ActorSpec {
                velocity: Vec2::new(0.0, 5.0),
                ..mobile(0.0, 60.0, 32.0, 32.0, true)
            },
            None,
        )
        .unwrap();
    level.start();
    level.run_ticks(60);

    let events = events.borrow();
    let first = events.first().unwrap();
    assert_eq!(first.actor, faller);
    assert!(!first.settled);
    assert!(first.overlap.h > 0.0, "{:?}", first.overlap);
    assert!(approx_eq(first.overlap.y, 0.0));

    let last = events.last().unwrap();
    assert!(last.settled);
    assert!(last.overlap.h.abs() < 1e-2, "{:?}", last.overlap);
    assert!(approx_eq(level.position(faller).unwrap().y, 68.0));
}

#[test]
fn overlap_is_local_and_in_hitbox_uses_the_hitbox() {
    let mut level = Level::new(SimConfig::default());
    let (receiver, events) = recording_block(Verdict::NotSolid);
    level
        .spawn(
            &ActorSpec {
                hitbox: Some(Rect::new(0.0, 0.0, 10.0, 10.0).unwrap()),
                ..spec(100.0, 100.0, 32.0, 32.0)
            },
            Some(receiver),
        )
        .unwrap();
    let outside = level.spawn(&spec(110.0, 120.0, 10.0, 20.0), None).unwrap();
    let inside = level.spawn(&spec(102.0, 102.0, 4.0, 4.0), None).unwrap();
    level.start();
    level.step();

    let events = events.borrow();
    let of = |actor: bevy_ecs::entity::Entity| *events.iter().find(|ev| ev.actor == actor).unwrap();

    let ev = of(outside);
    let o = ev.overlap;
    assert!(
        approx_eq(o.x, 10.0) && approx_eq(o.y, 20.0) && approx_eq(o.w, 10.0) && approx_eq(o.h, 12.0),
        "{:?}",
        o
    );
    assert!(!ev.in_hitbox);
    assert!(ev.settled);

    let ev = of(inside);
    assert!(approx_eq(ev.overlap.x, 2.0) && approx_eq(ev.overlap.y, 2.0));
    assert!(ev.in_hitbox);
}

#[test]
fn actors_without_collide_handlers_never_block() {
    let mut level = Level::new(SimConfig::default());
    level.spawn(&spec(0.0, 100.0, 32.0, 32.0), None).unwrap();
    level
        .spawn(&spec(0.0, 200.0, 32.0, 32.0), Some(block(Verdict::NotSolid)))
        .unwrap();
    let faller = level
        .spawn(
            &ActorSpec {
                velocity: Vec2::new(0.0, 4.0),
                ..mobile(0.0, 40.0, 32.0, 32.0, false)
            },
            None,
        )
        .unwrap();
    level.start();
    level.run_ticks(60);
    assert!(level.position(faller).unwrap().y > 250.0);
}

#[test]
fn leave_fires_once_per_contact_episode() {
    let mut level = Level::new(SimConfig::default());
    let collides = Rc::new(Cell::new(0u32));
    let leaves = Rc::new(RefCell::new(Vec::new()));
    let (c, l) = (collides.clone(), leaves.clone());
    let gate = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.on_collide(move |_, _, _| {
            c.set(c.get() + 1);
            Ok(Verdict::NotSolid)
        });
        api.on_leave(move |_, _, ev| {
            l.borrow_mut().push(ev.id);
            Ok(())
        });
        Ok(())
    });
    level
        .spawn(&spec(0.0, 100.0, 32.0, 32.0), Some(gate.boxed()))
        .unwrap();
    let ghost = level
        .spawn(
            &ActorSpec {
                velocity: Vec2::new(0.0, 4.0),
                ..mobile(0.0, 40.0, 32.0, 32.0, false)
            },
            None,
        )
        .unwrap();
    level.start();
    let ghost_id = *level.world().get::<ActorId>(ghost).unwrap();

    level.run_ticks(60);
    assert!(collides.get() > 1);
    assert_eq!(*leaves.borrow(), vec![ghost_id]);
}

#[test]
fn leave_fires_after_partner_is_destroyed() {
    let mut level = Level::new(SimConfig::default());
    let leaves = Rc::new(Cell::new(0u32));
    let l = leaves.clone();
    let pad = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.on_collide(|_, _, _| Ok(Verdict::Solid));
        api.on_leave(move |_, _, _| {
            l.set(l.get() + 1);
            Ok(())
        });
        Ok(())
    });
    level
        .spawn(&spec(0.0, 32.0, 32.0, 32.0), Some(pad.boxed()))
        .unwrap();
    let cargo_box = level.spawn(&mobile(0.0, 0.0, 32.0, 32.0, true), None).unwrap();
    level.start();
    level.run_ticks(3);
    assert!(level.body(cargo_box).unwrap().grounded);
    assert_eq!(leaves.get(), 0);

    level.destroy(cargo_box);
    assert!(!level.is_alive(cargo_box));
    level.run_ticks(5);
    assert_eq!(leaves.get(), 1);
}

#[test]
fn stopped_animation_never_completes() {
    let mut level = Level::new(SimConfig::default());
    let done = Rc::new(Cell::new(0u32));

    let d = done.clone();
    let finishes = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.add_animation("open", 100.0, vec![FrameId::Index(0), FrameId::Index(1), FrameId::Index(2)])?;
        assert!(api.play_animation_then("open", move |_, _| {
            d.set(d.get() + 1);
            Ok(())
        }));
        Ok(())
    });
    let opener = level
        .spawn(&spec(0.0, 0.0, 32.0, 32.0), Some(finishes.boxed()))
        .unwrap();

    let d = done.clone();
    let stops = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.add_animation("open", 100.0, vec![FrameId::Index(0), FrameId::Index(1)])?;
        api.play_animation_then("open", move |_, _| {
            d.set(d.get() + 100);
            Ok(())
        });
        api.stop_animation();
        Ok(())
    });
    level
        .spawn(&spec(100.0, 0.0, 32.0, 32.0), Some(stops.boxed()))
        .unwrap();

    level.start();
    level.run_ticks(60);
    assert_eq!(done.get(), 1);

    let frames: Vec<FrameId> = level
        .drain_host_commands()
        .into_iter()
        .filter_map(|cmd| match cmd {
            HostCmd::ShowFrame { actor, frame } if actor == opener => Some(frame),
            _ => None,
        })
        .collect();
    assert_eq!(
        frames,
        vec![FrameId::Index(0), FrameId::Index(1), FrameId::Index(2)]
    );
}

#[test]
fn malformed_animation_is_rejected_and_missing_one_is_a_no_op() {
    let mut level = Level::new(SimConfig::default());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    let script = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        let empty = api.add_animation("empty", 100.0, Vec::new());
        let zero = api.add_animation("zero", 0.0, vec![FrameId::Index(1)]);
        s.borrow_mut().push(empty.is_err());
        s.borrow_mut().push(zero.is_err());
        s.borrow_mut().push(api.play_animation("empty"));
        s.borrow_mut().push(api.is_animating());
        Ok(())
    });
    level
        .spawn(&spec(0.0, 0.0, 8.0, 8.0), Some(script.boxed()))
        .unwrap();
    level.start();
    assert_eq!(*seen.borrow(), vec![true, true, false, false]);
}

#[derive(Default)]
struct TimerLog {
    fired: Vec<&'static str>,
    ticks: Vec<u64>,
}

#[test]
fn timers_fire_in_due_order_and_cancelled_ones_never_fire() {
    let mut level = Level::new(SimConfig::default());
    let log = Rc::new(RefCell::new(TimerLog::default()));
    let l = log.clone();
    let script = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        for (delay, name) in [(40.0, "a"), (40.0, "b"), (20.0, "c")] {
            let l = l.clone();
            api.set_timeout(delay, move |_, api| {
                let mut log = l.borrow_mut();
                log.fired.push(name);
                log.ticks.push(api.tick());
                Ok(())
            });
        }
        let l = l.clone();
        let cancelled = api.set_timeout(30.0, move |_, _| {
            l.borrow_mut().fired.push("cancelled");
            Ok(())
        });
        api.clear_timer(cancelled);
        Ok(())
    });
    level
        .spawn(&spec(0.0, 0.0, 8.0, 8.0), Some(script.boxed()))
        .unwrap();
    level.start();
    level.run_ticks(10);

    let log = log.borrow();
    assert_eq!(log.fired, vec!["c", "a", "b"]);
    // 40ms is due on the third 16.7ms tick.
    assert_eq!(log.ticks, vec![2, 3, 3]);
}

#[derive(Default)]
struct Blinker {
    count: u32,
    interval: Option<TimerId>,
}

#[test]
fn interval_repeats_until_it_clears_itself() {
    let mut level = Level::new(SimConfig::default());
    let count = Rc::new(Cell::new(0u32));
    let c = count.clone();
    let script = Script::with_main(Blinker::default(), move |_, api: &mut Api<'_, Blinker>| {
        let id = api.set_interval(100.0, move |state, api| {
            state.count += 1;
            c.set(state.count);
            if state.count == 3
                && let Some(id) = state.interval
            {
                api.clear_timer(id);
            }
            Ok(())
        });
        api.set_timeout(0.0, move |state, _| {
            state.interval = Some(id);
            Ok(())
        });
        Ok(())
    });
    let actor = level
        .spawn(&spec(0.0, 0.0, 8.0, 8.0), Some(script.boxed()))
        .unwrap();
    level.start();
    level.run_ticks(120);
    assert_eq!(count.get(), 3);
    let timers = level
        .world()
        .get::<ActorTimers>(actor)
        .unwrap();
    assert!(timers.is_empty());
}

#[test]
fn destroyed_actor_gets_no_timers_or_messages() {
    let mut level = Level::new(SimConfig::default());
    let hits = Rc::new(Cell::new(0u32));
    let h = hits.clone();
    let script = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        let (h1, h2, h3) = (h.clone(), h.clone(), h.clone());
        api.set_interval(20.0, move |_, _| {
            h1.set(h1.get() + 1);
            Ok(())
        });
        api.set_timeout(200.0, move |_, _| {
            h2.set(h2.get() + 1);
            Ok(())
        });
        api.subscribe("power", move |_, _, _| {
            h3.set(h3.get() + 1);
            Ok(Payload::Nil)
        });
        Ok(())
    });
    let doomed = level
        .spawn(&spec(0.0, 0.0, 8.0, 8.0), Some(script.boxed()))
        .unwrap();
    level.start();
    level.run_ticks(2);
    assert!(hits.get() >= 1);
    assert_eq!(level.world().resource::<MessageBus>().subscriptions_of(doomed), 1);

    level.destroy(doomed);
    let before = hits.get();
    for _ in 0..30 {
        level.publish("power", true);
        level.step();
    }
    assert_eq!(hits.get(), before);
    assert_eq!(level.world().resource::<MessageBus>().subscriber_count("power"), 0);
    assert!(!level.host().has_script(doomed));
    assert!(
        level
            .drain_host_commands()
            .contains(&HostCmd::Despawned { actor: doomed })
    );
}

#[test]
fn faulting_handler_is_contained_to_its_actor() {
    let mut level = Level::new(SimConfig::default());
    let faults = Rc::new(Cell::new(0u32));
    let heard = Rc::new(Cell::new(0u32));

    let f = faults.clone();
    let broken = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.subscribe("ping", move |_, _, _| {
            f.set(f.get() + 1);
            Err(SimError::fault("boom"))
        });
        Ok(())
    });
    let h = heard.clone();
    let healthy = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.subscribe("ping", move |_, _, _| {
            h.set(h.get() + 1);
            Ok(Payload::Nil)
        });
        Ok(())
    });
    let bad = level
        .spawn(&spec(0.0, 0.0, 8.0, 8.0), Some(broken.boxed()))
        .unwrap();
    level
        .spawn(&spec(20.0, 0.0, 8.0, 8.0), Some(healthy.boxed()))
        .unwrap();
    level.start();

    level.publish("ping", ());
    level.publish("ping", ());
    assert_eq!(faults.get(), 1);
    assert_eq!(heard.get(), 2);
    assert!(level.host().is_faulted(bad));

    level.step();
    assert!(!level.host().is_faulted(bad));
    level.publish("ping", ());
    assert_eq!(faults.get(), 2);
    assert_eq!(heard.get(), 3);
}

#[test]
fn invalid_hitboxes_are_rejected() {
    let mut level = Level::new(SimConfig::default());
    let bad = ActorSpec {
        hitbox: Some(Rect {
            x: 0.0,
            y: 0.0,
            w: -4.0,
            h: 8.0,
        }),
        ..spec(0.0, 0.0, 16.0, 16.0)
    };
    assert!(matches!(
        level.spawn(&bad, None),
        Err(SimError::InvalidHitbox { .. })
    ));
    assert!(level.spawn(&spec(0.0, 0.0, -1.0, 16.0), None).is_err());

    let kept = Rc::new(RefCell::new(None));
    let k = kept.clone();
    let script = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.this().set_hitbox(2.0, 2.0, 12.0, 12.0)?;
        let rejected = api.this().set_hitbox(0.0, 0.0, 5.0, -5.0).is_err();
        *k.borrow_mut() = Some((rejected, api.this().hitbox()));
        Ok(())
    });
    level
        .spawn(&spec(0.0, 0.0, 16.0, 16.0), Some(script.boxed()))
        .unwrap();
    level.start();
    let (rejected, hitbox) = kept.borrow().unwrap();
    assert!(rejected);
    assert_eq!(hitbox, Rect::new(2.0, 2.0, 12.0, 12.0).unwrap());
}

#[test]
fn use_fires_on_press_edge_for_touched_actors() {
    let mut level = Level::new(SimConfig::default());
    let uses = Rc::new(Cell::new(0u32));
    let keys = Rc::new(Cell::new(0u32));

    let u = uses.clone();
    let lever = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.on_use(move |_, _, _| {
            u.set(u.get() + 1);
            Ok(())
        });
        Ok(())
    });
    let k = keys.clone();
    let player = Script::with_main((), move |_, api: &mut Api<'_, ()>| {
        api.on_keypress(move |_, _, ev| {
            if ev.input.right.active {
                k.set(k.get() + 1);
            }
            Ok(())
        });
        Ok(())
    });
    level
        .spawn(&spec(10.0, 0.0, 16.0, 16.0), Some(lever.boxed()))
        .unwrap();
    level
        .spawn(&spec(100.0, 0.0, 16.0, 16.0), Some(block(Verdict::Solid)))
        .unwrap();
    level
        .spawn(
            &ActorSpec {
                is_player: true,
                ..spec(0.0, 0.0, 16.0, 16.0)
            },
            Some(player.boxed()),
        )
        .unwrap();
    level.start();

    let press = Buttons {
        use_action: true,
        right: true,
        ..Buttons::default()
    };
    level.set_input(press);
    level.run_ticks(3);
    assert_eq!(uses.get(), 1);
    assert_eq!(keys.get(), 3);

    level.set_input(Buttons::default());
    level.step();
    level.set_input(press);
    level.step();
    assert_eq!(uses.get(), 2);
    assert_eq!(keys.get(), 4);
}
