//! Loads a plot and drives it with a counter and a periodic switch.

mod logging;

use clap::Parser;
use log::{debug, info};
use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;
use wirelogic_core::{
    BlockContext, BlockId, BlockLogicRunner, BlockRegistry, PortValue, RunnerConfig,
    SimulatedScheduler,
};
use wirelogic_script::{Loader, PortRef};

/// Tick a plot of logic blocks at a fixed rate
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Plot file to load
    #[arg(default_value = "demos/pulse_chain/plots/pulse_chain.ron")]
    plot: PathBuf,

    /// Number of ticks to run
    #[arg(long, default_value_t = 120)]
    ticks: u64,

    /// Seconds per tick
    #[arg(long, default_value_t = 0.1)]
    dt: f64,

    /// Pulse the switch every this many ticks
    #[arg(long, default_value_t = 20)]
    period: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn port(block: u64, port: &str) -> PortRef {
    PortRef {
        block: BlockId::new(block),
        port: port.to_string(),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    let mut loader = Loader::new();
    loader.load_plot_file(&args.plot)?;
    let defs = loader.finish();
    let plot = defs
        .plots
        .values()
        .next()
        .ok_or("plot file defines no plot")?;

    let mut registry = BlockRegistry::new();
    wirelogic_blocks::register_builtin(&mut registry)?;

    let scheduler = Rc::new(SimulatedScheduler::new());
    let context = BlockContext::new(scheduler.clone());
    let runner = BlockLogicRunner::with_config(RunnerConfig::default().with_default_dt(args.dt));
    let instance = plot.instantiate(&registry, &runner, &context)?;
    info!("loaded plot '{}' with {} blocks", plot.name, instance.len());

    let switch = instance.input(&port(1, "signal"))?;
    let counter = instance.input(&port(2, "value"))?;
    let _latched = instance.output(&port(4, "result"))?.subscribe(
        |value, previous| info!("memory: {:?} -> {:?}", previous, value),
        false,
    );

    let period = args.period.max(1);
    for i in 0..args.ticks {
        counter.set(PortValue::Number(i as f64));
        switch.set(PortValue::Bool(i % period == period - 1));

        let tick = runner.tick(None)?;
        let fired = scheduler.advance(args.dt);
        debug!("tick {} t={:.2} tasks={}", tick, runner.elapsed(), fired);
    }

    info!(
        "finished at tick {} ({:.2}s), {} tasks pending",
        runner.get_tick(),
        runner.elapsed(),
        scheduler.pending()
    );
    instance.unload(&runner);
    Ok(())
}
