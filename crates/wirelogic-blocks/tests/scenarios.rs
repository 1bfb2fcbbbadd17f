//! End-to-end behavior of the reference blocks under a runner and scheduler

use std::cell::RefCell;
use std::rc::Rc;
use wirelogic_blocks::register_builtin;
use wirelogic_core::{
    AttrValue, AttributeBag, BlockContext, BlockId, BlockLogic, BlockLogicRunner, BlockRegistry,
    Component, KindId, Lifecycle, ObservableValue, PortValue, SimulatedScheduler, Tick, Tickable,
};

struct World {
    registry: BlockRegistry,
    runner: Rc<BlockLogicRunner>,
    scheduler: Rc<SimulatedScheduler>,
    context: BlockContext,
}

impl World {
    fn new() -> Self {
        let mut registry = BlockRegistry::new();
        register_builtin(&mut registry).expect("built-in kinds register");
        let scheduler = Rc::new(SimulatedScheduler::new());
        Self {
            registry,
            runner: Rc::new(BlockLogicRunner::new()),
            context: BlockContext::new(scheduler.clone()),
            scheduler,
        }
    }

    fn spawn(&self, id: u64, kind: &str, attributes: &[(&str, AttrValue)]) -> Rc<dyn BlockLogic> {
        let attributes: AttributeBag = attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.runner
            .spawn(
                &self.registry,
                &KindId::new(kind),
                BlockId::new(id),
                &attributes,
                &self.context,
            )
            .expect("built-in kind spawns")
    }

    fn step(&self, dt: f64) -> Tick {
        let tick = self.runner.tick(Some(dt)).expect("valid dt");
        self.scheduler.advance(dt);
        tick
    }
}

/// A bare block that runs a closure on every tick
struct TickHook {
    id: BlockId,
    kind: KindId,
    component: Component,
    hook: Box<dyn Fn(Tick)>,
}

impl TickHook {
    fn spawn(world: &World, id: u64, hook: impl Fn(Tick) + 'static) {
        let block: Rc<dyn BlockLogic> = Rc::new(Self {
            id: BlockId::new(id),
            kind: KindId::new("tick_hook"),
            component: Component::new(format!("tick hook {}", id)),
            hook: Box::new(hook),
        });
        world.runner.add(block);
    }
}

impl Lifecycle for TickHook {
    fn component(&self) -> &Component {
        &self.component
    }
}

impl Tickable for TickHook {
    fn tick(&self, tick: Tick, _dt: f64) {
        (self.hook)(tick);
    }
}

impl BlockLogic for TickHook {
    fn block(&self) -> BlockId {
        self.id
    }

    fn kind(&self) -> &KindId {
        &self.kind
    }
}

fn output(block: &Rc<dyn BlockLogic>, port: &str) -> ObservableValue<PortValue> {
    block
        .as_port_owner()
        .and_then(|owner| owner.output().get(port))
        .expect("output port exists")
        .clone()
}

fn wire(source: &ObservableValue<PortValue>, target: &Rc<dyn BlockLogic>, port: &str) {
    target
        .as_port_owner()
        .expect("target has ports")
        .wire_input(port, source)
        .expect("wire types match");
}

#[test]
fn test_single_pulse_lasts_one_tick() {
    let world = World::new();
    let switch = ObservableValue::new(PortValue::Bool(false));
    let pulse = world.spawn(1, "single_pulse", &[]);
    wire(&switch, &pulse, "signal");

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let runner = world.runner.clone();
    let _conn = output(&pulse, "result").subscribe(
        move |value, _| sink.borrow_mut().push((runner.get_tick(), value.clone())),
        false,
    );

    for _ in 0..5 {
        world.step(0.1);
    }
    assert_eq!(world.runner.get_tick(), 5);
    switch.set(PortValue::Bool(true));
    assert_eq!(
        *seen.borrow(),
        vec![(5, PortValue::Bool(true))],
        "pulse rises within tick 5's cascade"
    );

    world.step(0.1);
    world.step(0.1);
    assert_eq!(
        *seen.borrow(),
        vec![(5, PortValue::Bool(true)), (6, PortValue::Bool(false))],
        "reset at the start of tick 6 and nothing after"
    );
}

#[test]
fn test_pulse_raised_mid_tick_reaches_later_blocks() {
    let world = World::new();
    let switch = ObservableValue::new(PortValue::Bool(false));

    let before = Rc::new(RefCell::new(Vec::new()));
    let after = Rc::new(RefCell::new(Vec::new()));

    let trigger = switch.clone();
    let early = before.clone();
    let early_result = Rc::new(RefCell::new(None::<ObservableValue<PortValue>>));
    let early_view = early_result.clone();
    TickHook::spawn(&world, 1, move |tick| {
        if let Some(result) = &*early_view.borrow() {
            early.borrow_mut().push((tick, result.get()));
        }
        if tick == 3 {
            trigger.set(PortValue::Bool(true));
        }
    });

    let pulse = world.spawn(2, "single_pulse", &[]);
    wire(&switch, &pulse, "signal");
    let result = output(&pulse, "result");
    *early_result.borrow_mut() = Some(result.clone());

    let late = after.clone();
    TickHook::spawn(&world, 3, move |tick| late.borrow_mut().push((tick, result.get())));

    for _ in 0..5 {
        world.step(0.1);
    }

    let on = PortValue::Bool(true);
    let off = PortValue::Bool(false);
    assert_eq!(
        *after.borrow(),
        vec![
            (1, off.clone()),
            (2, off.clone()),
            (3, on.clone()),
            (4, off.clone()),
            (5, off.clone()),
        ],
        "a block ticked after the pulse sees it in the tick it was raised"
    );
    assert_eq!(
        *before.borrow(),
        vec![(1, off.clone()), (2, off.clone()), (3, off.clone()), (4, on), (5, off)],
        "a block ticked before the pulse sees it on the next tick, before the reset"
    );
}

#[test]
fn test_delay_delivers_each_change_once() {
    let world = World::new();
    let source = ObservableValue::new(PortValue::Number(0.0));
    let delay = world.spawn(1, "delay", &[("duration", AttrValue::Float(2.0))]);
    wire(&source, &delay, "value");

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let clock = world.scheduler.clone();
    let _conn = output(&delay, "result").subscribe(
        move |value, _| sink.borrow_mut().push((clock.now(), value.clone())),
        false,
    );

    world.step(0.5);
    world.step(0.5);
    source.set(PortValue::Number(5.0));
    world.step(0.5);
    world.step(0.5);
    source.set(PortValue::Number(7.0));
    for _ in 0..16 {
        world.step(0.5);
    }

    assert_eq!(
        *seen.borrow(),
        vec![
            (3.0, PortValue::Number(5.0)),
            (4.0, PortValue::Number(7.0)),
        ],
        "second change does not cancel the first"
    );
    assert_eq!(world.scheduler.pending(), 0);
}

#[test]
fn test_destroy_mid_cascade_stops_all_callbacks() {
    let world = World::new();
    let source = ObservableValue::new(PortValue::Number(0.0));
    let relay = world.spawn(1, "relay", &[("state", AttrValue::Bool(true))]);
    let delay = world.spawn(2, "delay", &[("duration", AttrValue::Float(2.0))]);
    wire(&source, &relay, "value");
    wire(&source, &delay, "value");

    let runner = world.runner.clone();
    let victim = delay.clone();
    let _kill = output(&relay, "result").subscribe(
        move |value, _| {
            if value.as_number().unwrap_or_default() >= 2.0 {
                runner.remove(&victim);
            }
        },
        false,
    );

    let delivered = Rc::new(RefCell::new(Vec::new()));
    let sink = delivered.clone();
    let _conn = output(&delay, "result").subscribe(
        move |value, _| sink.borrow_mut().push(value.clone()),
        false,
    );

    source.set(PortValue::Number(1.0));
    assert_eq!(world.scheduler.pending(), 1, "first change is scheduled");

    source.set(PortValue::Number(2.0));
    assert!(delay.is_destroyed());
    assert_eq!(world.runner.len(), 1);
    assert_eq!(
        world.scheduler.pending(),
        0,
        "pending delivery cancelled and no new one scheduled"
    );

    for _ in 0..10 {
        world.step(0.5);
    }
    assert!(delivered.borrow().is_empty(), "destroyed delay never fires");
    assert_eq!(source.subscriber_count(), 1, "only the relay wire remains");
}

#[test]
fn test_memory_and_relay_chain() {
    let world = World::new();
    let source = ObservableValue::new(PortValue::Number(0.0));
    let gate = ObservableValue::new(PortValue::Bool(false));
    let relay = world.spawn(1, "relay", &[("state", AttrValue::Bool(true))]);
    let memory = world.spawn(2, "memory", &[]);
    wire(&source, &relay, "value");
    wire(&output(&relay, "result"), &memory, "value");
    wire(&gate, &memory, "set");
    let stored = output(&memory, "result");

    source.set(PortValue::Number(3.0));
    assert_eq!(stored.get(), PortValue::Number(0.0));

    gate.set(PortValue::Bool(true));
    assert_eq!(stored.get(), PortValue::Number(3.0));

    gate.set(PortValue::Bool(false));
    source.set(PortValue::Number(8.0));
    assert_eq!(stored.get(), PortValue::Number(3.0), "memory holds");
}

fn recorded_run() -> Vec<(Tick, f64, PortValue)> {
    let world = World::new();
    let switch = ObservableValue::new(PortValue::Bool(false));
    let pulse = world.spawn(1, "single_pulse", &[]);
    let delay = world.spawn(2, "delay", &[("duration", AttrValue::Float(0.3))]);
    let relay = world.spawn(3, "relay", &[("state", AttrValue::Bool(true))]);
    wire(&switch, &pulse, "signal");
    wire(&output(&delay, "result"), &relay, "value");

    let counter = ObservableValue::new(PortValue::Number(0.0));
    wire(&counter, &delay, "value");

    let log = Rc::new(RefCell::new(Vec::new()));
    for (block, port) in [(&pulse, "result"), (&relay, "result")] {
        let sink = log.clone();
        let runner = world.runner.clone();
        let clock = world.scheduler.clone();
        let _ = output(block, port).subscribe(
            move |value, _| sink.borrow_mut().push((runner.get_tick(), clock.now(), value.clone())),
            false,
        );
    }

    for i in 0..20u32 {
        if i % 4 == 0 {
            switch.set(PortValue::Bool(true));
            counter.set(PortValue::Number(f64::from(i)));
        } else {
            switch.set(PortValue::Bool(false));
        }
        world.step(0.125);
    }

    let log = log.borrow().clone();
    log
}

#[test]
fn test_identical_runs_produce_identical_outputs() {
    let first = recorded_run();
    let second = recorded_run();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}
