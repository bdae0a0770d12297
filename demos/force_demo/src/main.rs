// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A force-directed graph driven through the trellis engine.
//!
//! A toy spring/repulsion simulation plays the physics adapter. The demo runs
//! 180 simulated frames: a node joins at frame 40, a hover is coordinated at
//! frame 70 and cleared at frame 100, and from frame 110 the graph animates
//! into a ring layout. Events go to a
//! [`PrettyPrintSink`](trellis_debug::pretty::PrettyPrintSink) on stdout and a
//! [`RecorderSink`](trellis_debug::recorder::RecorderSink), which is exported
//! as `force_demo_trace.json` at the end.

use std::error::Error;
use std::f64::consts::TAU;
use std::fs::File;
use std::io::BufWriter;

use kurbo::{Point, Vec2};

use trellis_core::easing::Easing;
use trellis_core::engine::{Engine, EngineConfig};
use trellis_core::interaction::{InteractionBus, StateStyle, Trigger, VisualState};
use trellis_core::key::SimId;
use trellis_core::physics::{
    LayoutTransition, NodeState, PhysicsAdapter, PositionMap, lerp_positions,
};
use trellis_core::surface::{MemorySurface, SurfaceHandle};
use trellis_core::tick::{FrameTick, TickOrigin, TickSource};
use trellis_core::time::HostTime;
use trellis_core::trace::{
    AdapterMissEvent, CommitSummary, InteractionEvent, PhaseBeginEvent, PhaseEndEvent,
    ReconcileSummary, RemovalEvent, TickEvent, TraceSink, Tracer, TransitionEvent,
};
use trellis_core::transition::Timing;
use trellis_core::tree::{
    Attr, Behavior, DerivedAttr, Elem, Phases, PositionBinding, Repeat, Tree,
};
use trellis_core::value::Value;

use trellis_debug::pretty::PrettyPrintSink;
use trellis_debug::recorder::RecorderSink;

const FRAME_COUNT: u64 = 180;
const GROUP: &str = "graph";
const ALPHA_MIN: f64 = 0.001;

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Graph {
    nodes: Vec<String>,
    links: Vec<(String, String)>,
}

impl Graph {
    fn star(hub: &str, spokes: &[&str]) -> Self {
        let mut nodes = vec![hub.to_owned()];
        nodes.extend(spokes.iter().map(|s| (*s).to_owned()));
        let links = spokes
            .iter()
            .map(|s| (hub.to_owned(), (*s).to_owned()))
            .collect();
        Self { nodes, links }
    }

    fn add(&mut self, node: &str, link_to: &str) {
        self.nodes.push(node.to_owned());
        self.links.push((link_to.to_owned(), node.to_owned()));
    }
}

fn scene(graph: &Graph) -> trellis_core::Result<Tree> {
    let links = Repeat::new(
        graph.links.clone(),
        |(s, t)| format!("{s}-{t}"),
        |(s, t), _| {
            Elem::new("line")
                .attr(Attr::fixed("stroke-width", 1.5))
                .bind_position(PositionBinding::new(s.as_str(), "x1", "y1"))
                .bind_position(PositionBinding::new(t.as_str(), "x2", "y2"))
                .into()
        },
    )?;
    let nodes = Repeat::new(graph.nodes.clone(), String::clone, |id, scope| {
        let label = id.clone();
        Elem::new("circle")
            .attr(Attr::fixed("r", 6.0))
            .attr(Attr::fixed("opacity", 1.0))
            .attr(scope.thunked("label", move || Value::from(label.as_str())))
            .bind_position(PositionBinding::new(id.as_str(), "cx", "cy"))
            .derive(DerivedAttr::new("transform", |a| {
                let p = a.point("cx", "cy");
                Value::Text(format!("translate({:.1},{:.1})", p.x, p.y))
            }))
            .on(Behavior::on("hover", || {}).coordinated(id.as_str(), GROUP))
            .into()
    })?
    .with_phases(
        Phases::new()
            .enter_from("opacity", 0.0)?
            .enter_from("r", 0.0)?
            .enter(Timing::millis(300).with_easing(Easing::BackOut)),
    );
    Ok(Elem::new("svg")
        .child(Elem::new("g").child(links))
        .child(Elem::new("g").child(nodes))
        .into())
}

fn ring(graph: &Graph, radius: f64) -> PositionMap {
    let n = graph.nodes.len() as f64;
    graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let angle = TAU * i as f64 / n;
            (SimId::from(id.as_str()), Point::new(radius * angle.cos(), radius * angle.sin()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Physics adapter
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
enum Rule {
    Link { length: f64, strength: f64 },
    Charge(f64),
    Center(Point),
}

#[derive(Debug)]
struct Springs {
    ids: Vec<SimId>,
    positions: Vec<Point>,
    velocities: Vec<Vec2>,
    links: Vec<(usize, usize)>,
    rules: Vec<Rule>,
    alpha: f64,
    link: (f64, f64),
    charge: f64,
    center: Point,
}

impl Springs {
    fn new(graph: &Graph, rules: &[Rule]) -> Self {
        let mut springs = Self {
            ids: Vec::new(),
            positions: Vec::new(),
            velocities: Vec::new(),
            links: Vec::new(),
            rules: rules.to_vec(),
            alpha: 1.0,
            link: (30.0, 1.0),
            charge: 0.0,
            center: Point::ORIGIN,
        };
        springs.reinitialize_forces();
        for id in &graph.nodes {
            springs.insert(id);
        }
        springs.relink(graph);
        springs
    }

    fn index(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|s| s.as_str() == id)
    }

    fn insert(&mut self, id: &str) {
        // Phyllotaxis placement keeps initial positions distinct.
        let i = self.ids.len() as f64;
        let radius = 10.0 * (0.5 + i).sqrt();
        let angle = i * 2.399_963;
        self.ids.push(SimId::from(id));
        self.positions
            .push(self.center + Vec2::new(radius * angle.cos(), radius * angle.sin()));
        self.velocities.push(Vec2::ZERO);
    }

    fn relink(&mut self, graph: &Graph) {
        self.links = graph
            .links
            .iter()
            .filter_map(|(s, t)| Some((self.index(s)?, self.index(t)?)))
            .collect();
    }

    fn step(&mut self) {
        if self.alpha < ALPHA_MIN {
            return;
        }
        let n = self.positions.len();
        let mut forces = vec![Vec2::ZERO; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = self.positions[j] - self.positions[i];
                let f = d * (self.charge / d.hypot2().max(1.0));
                forces[i] -= f;
                forces[j] += f;
            }
        }
        let (length, strength) = self.link;
        for &(s, t) in &self.links {
            let d = self.positions[t] - self.positions[s];
            let len = d.hypot().max(1e-6);
            let f = d * ((len - length) / len * strength * 0.5);
            forces[s] += f;
            forces[t] -= f;
        }
        for (i, force) in forces.iter_mut().enumerate() {
            *force += (self.center - self.positions[i]) * 0.02;
        }
        for ((p, v), f) in self
            .positions
            .iter_mut()
            .zip(&mut self.velocities)
            .zip(&forces)
        {
            *v = (*v + *f * self.alpha) * 0.6;
            *p += *v;
        }
        self.alpha *= 0.97;
    }
}

impl PhysicsAdapter for Springs {
    type Rule = Rule;

    fn nodes(&self) -> Vec<NodeState> {
        self.ids
            .iter()
            .zip(&self.positions)
            .zip(&self.velocities)
            .map(|((id, p), v)| NodeState {
                id: id.clone(),
                position: *p,
                velocity: *v,
                fixed: false,
            })
            .collect()
    }

    fn interpolate_positions(&mut self, from: &PositionMap, to: &PositionMap, t: f64) {
        self.update_positions(&lerp_positions(from, to, t));
    }

    fn update_positions(&mut self, positions: &PositionMap) {
        for (id, p) in positions {
            if let Some(i) = self.index(id.as_str()) {
                self.positions[i] = *p;
                self.velocities[i] = Vec2::ZERO;
            }
        }
    }

    fn apply_rules_in_place(&mut self, rules: &[Rule]) {
        self.rules = rules.to_vec();
        for rule in &self.rules {
            match *rule {
                Rule::Link { length, strength } => self.link = (length, strength),
                Rule::Charge(c) => self.charge = c,
                Rule::Center(p) => self.center = p,
            }
        }
    }

    fn reinitialize_forces(&mut self) {
        let rules = self.rules.clone();
        self.apply_rules_in_place(&rules);
        self.velocities.fill(Vec2::ZERO);
    }

    fn reheat(&mut self) {
        self.alpha = 1.0;
    }
}

// ---------------------------------------------------------------------------
// Tracing fan-out
// ---------------------------------------------------------------------------

/// Forwards every event to two sinks.
struct Tee<'a> {
    first: &'a mut dyn TraceSink,
    second: &'a mut dyn TraceSink,
}

impl TraceSink for Tee<'_> {
    fn on_tick(&mut self, e: &TickEvent) {
        self.first.on_tick(e);
        self.second.on_tick(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.first.on_phase_begin(e);
        self.second.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.first.on_phase_end(e);
        self.second.on_phase_end(e);
    }

    fn on_reconcile(&mut self, s: &ReconcileSummary) {
        self.first.on_reconcile(s);
        self.second.on_reconcile(s);
    }

    fn on_transition(&mut self, e: &TransitionEvent) {
        self.first.on_transition(e);
        self.second.on_transition(e);
    }

    fn on_removal(&mut self, e: &RemovalEvent) {
        self.first.on_removal(e);
        self.second.on_removal(e);
    }

    fn on_adapter_miss(&mut self, e: &AdapterMissEvent) {
        self.first.on_adapter_miss(e);
        self.second.on_adapter_miss(e);
    }

    fn on_interaction(&mut self, e: &InteractionEvent) {
        self.first.on_interaction(e);
        self.second.on_interaction(e);
    }

    fn on_commit(&mut self, s: &CommitSummary) {
        self.first.on_commit(s);
        self.second.on_commit(s);
    }
}

// ---------------------------------------------------------------------------
// Main loop
// ---------------------------------------------------------------------------

fn find(surface: &MemorySurface, label: &str) -> Option<SurfaceHandle> {
    let svg = *surface.children(surface.root()).first()?;
    let nodes = *surface.children(svg).get(1)?;
    surface
        .children(nodes)
        .iter()
        .copied()
        .find(|&h| surface.attr(h, "label") == Some(&Value::from(label)))
}

fn main() -> Result<(), Box<dyn Error>> {
    let force_rules = [
        Rule::Link {
            length: 40.0,
            strength: 0.8,
        },
        Rule::Charge(250.0),
        Rule::Center(Point::ORIGIN),
    ];
    let ring_rules = [Rule::Charge(20.0), Rule::Center(Point::ORIGIN)];

    let mut graph = Graph::star("hub", &["a", "b", "c", "d"]);
    let mut springs = Springs::new(&graph, &force_rules);
    let mut surface = MemorySurface::new();
    let mut engine = Engine::new(EngineConfig::physics_driven(), surface.root());
    let mut bus = InteractionBus::new();
    let style = StateStyle::new()
        .with(VisualState::Primary, "r", 9.0)
        .with(VisualState::Dimmed, "opacity", 0.3)
        .with(VisualState::Neutral, "r", 6.0)
        .with(VisualState::Neutral, "opacity", 1.0)
        .animated(Timing::millis(150));

    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout())).without_transitions();
    let mut recorder = RecorderSink::new();
    {
        let mut sink = Tee {
            first: &mut pretty,
            second: &mut recorder,
        };
        let mut tracer = Tracer::new(&mut sink);

        engine.render(&scene(&graph)?, HostTime::ZERO, &mut tracer);
        engine.commit(&mut surface, &mut tracer);

        let mut ticker = engine.ticker(HostTime::ZERO);
        let mut layout: Option<LayoutTransition> = None;
        for _ in 0..FRAME_COUNT {
            ticker.request_tick();
            let Some(tick) = ticker.next_tick() else {
                break;
            };
            let tick = FrameTick {
                origin: TickOrigin::Physics,
                ..tick
            };

            match tick.frame_index {
                40 => {
                    graph.add("e", "c");
                    springs.insert("e");
                    springs.relink(&graph);
                    springs.reinitialize_forces();
                    springs.reheat();
                    engine.render(&scene(&graph)?, tick.now, &mut tracer);
                }
                70 => {
                    if let Some(a) = find(&surface, "a") {
                        engine.dispatch(a, "hover");
                    }
                    engine.sync_interactions(&mut bus);
                    let changes = bus.broadcast(&GROUP.into(), &Trigger::Hover("a".into()));
                    engine.apply_states(&changes, &style, tick.now, &mut tracer);
                }
                100 => {
                    let changes = bus.broadcast(&GROUP.into(), &Trigger::Clear);
                    engine.apply_states(&changes, &style, tick.now, &mut tracer);
                }
                110 => {
                    springs.apply_rules_in_place(&ring_rules);
                    let timing = Timing::millis(600).with_easing(Easing::CubicInOut);
                    layout = Some(LayoutTransition::begin(
                        &springs,
                        ring(&graph, 80.0),
                        tick.now,
                        timing,
                    ));
                }
                _ => {}
            }

            match layout.as_mut() {
                Some(transition) if !transition.is_done() => {
                    transition.advance(&mut springs, tick.now);
                }
                _ => springs.step(),
            }
            engine.step_physics(&springs, &tick, &mut surface, &mut tracer);
        }
    }

    println!();
    for id in &graph.nodes {
        if let Some(h) = find(&surface, id) {
            let number = |name: &str| surface.number(h, name).unwrap_or(f64::NAN);
            println!(
                "{id:>4}: ({:>7.2}, {:>7.2}) r={:.1} opacity={:.2}",
                number("cx"),
                number("cy"),
                number("r"),
                number("opacity"),
            );
        }
    }

    let path = "force_demo_trace.json";
    let mut out = BufWriter::new(File::create(path)?);
    trellis_debug::chrome::export(recorder.as_bytes(), &mut out)?;
    println!("wrote {path}");
    Ok(())
}
