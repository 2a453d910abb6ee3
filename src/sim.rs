use std::error::Error;
use std::fs::File;

use sim_lib::flags::PipeSimArgs;
use sim_lib::run_wrapper;

fn main() -> Result<(), Box<dyn Error>> {
    let args = PipeSimArgs::from_env_or_exit();
    let policy = args.policy();

    let default_filter = if policy.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter),
    )
    .init();

    let report = run_wrapper::run(&args.program, policy)?;

    println!("{}", report.history);
    println!(
        "Delay-slot utilization: {:.1}%",
        report.history.delay_slot_utilization(policy.delay_slot.window)
    );
    println!("$t0..$t7: {:?}", &report.registers.values()[8..16]);

    if let Some(path) = &args.trace {
        report.log.write_csv(File::create(path)?)?;
        eprintln!("Cycle log written to {}", path.display());
    }

    Ok(())
}
