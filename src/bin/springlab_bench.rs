//! Command-line front door for the simulation core: loads an object,
//! selects a simulator, runs a fixed number of iterations, and logs the
//! published measurements. The Rust-native replacement for the original
//! engine's GUI shell, scoped to what spec §1 keeps in-core.

use springlab::controller::{LayoutOptimizerKind, SimulationController};
use springlab::simulator::SimulatorKind;

struct Args {
    object_path: String,
    material_path: String,
    simulator: SimulatorKind,
    steps: u32,
    structural_layout: bool,
    parallelism: usize,
    parameters: Vec<(String, f32)>,
}

fn usage() -> ! {
    eprintln!(
        "usage: springlab-bench --object <png> --materials <json> [--simulator <name>] \
         [--steps <n>] [--structural-layout] [--parallelism <n>] [key=value ...]\n\n\
         simulator names: {}",
        SimulatorKind::ALL.iter().map(|k| k.name()).collect::<Vec<_>>().join(", ")
    );
    std::process::exit(2);
}

fn parse_args() -> Args {
    let mut object_path = None;
    let mut material_path = None;
    let mut simulator = SimulatorKind::FsBase;
    let mut steps = 100u32;
    let mut structural_layout = false;
    let mut parallelism = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let mut parameters = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--object" => object_path = Some(args.next().unwrap_or_else(|| usage())),
            "--materials" => material_path = Some(args.next().unwrap_or_else(|| usage())),
            "--simulator" => {
                let name = args.next().unwrap_or_else(|| usage());
                simulator = SimulatorKind::from_name(&name).unwrap_or_else(|| {
                    eprintln!("unknown simulator: {name}");
                    usage()
                });
            }
            "--steps" => {
                steps = args
                    .next()
                    .unwrap_or_else(|| usage())
                    .parse()
                    .unwrap_or_else(|_| usage())
            }
            "--structural-layout" => structural_layout = true,
            "--parallelism" => {
                parallelism = args
                    .next()
                    .unwrap_or_else(|| usage())
                    .parse()
                    .unwrap_or_else(|_| usage())
            }
            "--help" | "-h" => usage(),
            other => match other.split_once('=') {
                Some((key, value)) => match value.parse::<f32>() {
                    Ok(v) => parameters.push((key.to_string(), v)),
                    Err(_) => {
                        eprintln!("invalid parameter value: {other}");
                        usage()
                    }
                },
                None => {
                    eprintln!("unrecognized argument: {other}");
                    usage()
                }
            },
        }
    }

    Args {
        object_path: object_path.unwrap_or_else(|| usage()),
        material_path: material_path.unwrap_or_else(|| usage()),
        simulator,
        steps,
        structural_layout,
        parallelism,
        parameters,
    }
}

fn main() {
    env_logger::init();

    let args = parse_args();
    let layout = if args.structural_layout {
        LayoutOptimizerKind::Structural
    } else {
        LayoutOptimizerKind::Identity
    };

    let mut controller = match SimulationController::new(
        &args.object_path,
        &args.material_path,
        layout,
        args.simulator,
        args.parallelism.max(1),
    ) {
        Ok(controller) => controller,
        Err(err) => {
            log::error!("failed to load object: {err}");
            std::process::exit(1);
        }
    };

    for (key, value) in &args.parameters {
        if let Err(err) = controller.set_parameter(key, *value) {
            log::error!("failed to set parameter {key}: {err}");
            std::process::exit(1);
        }
    }

    log::info!(
        "running {} steps of {} with {} points, {} springs",
        args.steps,
        controller.simulator_kind().name(),
        controller.object().points().count(),
        controller.object().springs().count(),
    );

    controller.register_event_handler(Box::new(|stats| {
        print!(
            "step_duration={:?} avg_step_duration={:?} kinetic_energy={:.6} potential_energy={:.6}",
            stats.step_duration, stats.avg_step_duration, stats.kinetic_energy, stats.potential_energy,
        );
        if let Some(offset) = stats.bending_probe_offset {
            println!(" bending_probe_offset={offset:.6}");
        } else {
            println!();
        }
    }));

    for _ in 0..args.steps {
        controller.run_iteration();
    }
}
