use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use overlay_keys::{
    Document, KeyboardDispatcher, KeyboardEvent, NodeId, OverlayHandle, Route,
};

#[derive(Parser, Debug)]
#[command(
    name = "dispatch-bench",
    version = env!("CARGO_PKG_VERSION"),
    about = "Routing benchmark for the overlay keyboard dispatcher"
)]
struct BenchCli {
    /// Number of overlays registered with the dispatcher.
    #[arg(short = 'o', long = "overlays", value_name = "COUNT", default_value_t = 16)]
    overlays: usize,

    /// Number of keydowns routed per pass.
    #[arg(short = 'e', long = "events", value_name = "COUNT", default_value_t = 1_000_000)]
    events: u64,

    /// Depth of the node chain under each overlay root.
    #[arg(short = 'd', long = "depth", value_name = "DEPTH", default_value_t = 4)]
    depth: usize,

    /// Seed for target selection. Defaults to the clock.
    #[arg(long = "seed", value_name = "SEED")]
    seed: Option<u64>,
}

struct BenchConfig {
    overlays: usize,
    events: u64,
    depth: usize,
    seed: u64,
}

impl TryFrom<&BenchCli> for BenchConfig {
    type Error = String;

    fn try_from(cli: &BenchCli) -> Result<Self, Self::Error> {
        if !(1..=1024).contains(&cli.overlays) {
            return Err("overlays must be between 1 and 1024".to_string());
        }
        if !(1..=100_000_000).contains(&cli.events) {
            return Err("events must be between 1 and 100000000".to_string());
        }
        if cli.depth > 64 {
            return Err("depth must be at most 64".to_string());
        }
        Ok(Self {
            overlays: cli.overlays,
            events: cli.events,
            depth: cli.depth,
            seed: cli.seed.unwrap_or_else(seed_from_clock),
        })
    }
}

fn main() -> io::Result<()> {
    let args = BenchCli::parse();
    let config = BenchConfig::try_from(&args)
        .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;

    let scene = Scene::build(&config).map_err(io::Error::other)?;
    let stats = run_benchmark(&scene, &config);
    println!("{}", stats.final_report(&config));
    Ok(())
}

struct Counter {
    root: NodeId,
    hits: Cell<u64>,
}

impl OverlayHandle<NodeId> for Counter {
    fn root(&self) -> NodeId {
        self.root
    }

    fn emit_keydown(&self, _event: &KeyboardEvent<NodeId>) {
        self.hits.set(self.hits.get() + 1);
    }
}

struct Scene {
    document: Rc<Document>,
    dispatcher: KeyboardDispatcher<NodeId>,
    overlays: Vec<Rc<Counter>>,
    targets: Vec<NodeId>,
}

impl Scene {
    /// Body holds a workspace subtree (never inside an overlay) and a layer of
    /// overlays, each with a chain of `depth` nodes under its root.
    fn build(config: &BenchConfig) -> Result<Self, overlay_keys::DomError> {
        let document = Rc::new(Document::new());
        let dispatcher = KeyboardDispatcher::for_document(&document);
        let body = document.body();
        let mut targets = vec![body];

        let workspace = document.create_labeled(body, "workspace")?;
        targets.push(workspace);
        for _ in 0..config.overlays {
            targets.push(document.create_node(workspace)?);
        }

        let layer = document.create_labeled(body, "overlay-layer")?;
        let mut overlays = Vec::with_capacity(config.overlays);
        for _ in 0..config.overlays {
            let root = document.create_node(layer)?;
            targets.push(root);
            let mut tip = root;
            for _ in 0..config.depth {
                tip = document.create_node(tip)?;
                targets.push(tip);
            }
            let counter = Rc::new(Counter {
                root,
                hits: Cell::new(0),
            });
            dispatcher.register(counter.clone());
            overlays.push(counter);
        }

        Ok(Self {
            document,
            dispatcher,
            overlays,
            targets,
        })
    }

    fn delivered(&self) -> u64 {
        self.overlays.iter().map(|o| o.hits.get()).sum()
    }
}

fn run_benchmark(scene: &Scene, config: &BenchConfig) -> BenchStats {
    let key = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::NONE);
    let mut stats = BenchStats::default();

    let mut rng = XorShift::new(config.seed);
    let start = Instant::now();
    for _ in 0..config.events {
        let target = scene.targets[rng.below(scene.targets.len())];
        match scene
            .dispatcher
            .dispatch(&KeyboardEvent::new(target, key))
            .map(|r| r.route)
        {
            Some(Route::Contained) => stats.contained += 1,
            Some(Route::Fallback) => stats.fallback += 1,
            None => stats.dropped += 1,
        }
    }
    stats.direct = start.elapsed();

    let mut rng = XorShift::new(config.seed);
    let start = Instant::now();
    for _ in 0..config.events {
        let target = scene.targets[rng.below(scene.targets.len())];
        scene.document.dispatch_key(target, key);
    }
    stats.hosted = start.elapsed();
    stats.delivered = scene.delivered();
    stats
}

#[derive(Default)]
struct BenchStats {
    contained: u64,
    fallback: u64,
    dropped: u64,
    delivered: u64,
    direct: Duration,
    hosted: Duration,
}

impl BenchStats {
    fn per_second(events: u64, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 { events as f64 / secs } else { 0.0 }
    }

    fn final_report(&self, config: &BenchConfig) -> String {
        indoc::formatdoc!(
            r#"
            Dispatch bench (seed {seed}).
            Overlays: {overlays} | depth {depth} | events per pass {events}
            Routes: {contained} contained, {fallback} fallback, {dropped} dropped
            Direct dispatch: {direct:.2?} (~{direct_rate:.0}/s)
            Through document: {hosted:.2?} (~{hosted_rate:.0}/s)
            Deliveries: {delivered} (expected {expected})
            "#,
            seed = config.seed,
            overlays = config.overlays,
            depth = config.depth,
            events = config.events,
            contained = self.contained,
            fallback = self.fallback,
            dropped = self.dropped,
            direct = self.direct,
            direct_rate = Self::per_second(config.events, self.direct),
            hosted = self.hosted,
            hosted_rate = Self::per_second(config.events, self.hosted),
            delivered = self.delivered,
            expected = config.events * 2 - self.dropped,
        )
    }
}

fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
        ^ 0xA5A5_A5A5_1234_5678
}

struct XorShift {
    state: u64,
}

impl XorShift {
    fn new(seed: u64) -> Self {
        // xorshift never leaves the all-zero state
        Self {
            state: seed.max(1),
        }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next() % bound as u64) as usize
    }
}
