use std::fs;
use std::path::Path;
use std::process;

use sim_lib::cpu::CPUPolicy;
use sim_lib::error::SimulatorResult;
use sim_lib::memory::latency::MemoryLatency;
use sim_lib::pipelined::delay_slot::DelaySlotMode;
use sim_lib::pipelined::delay_slot::DelaySlotPolicy;
use sim_lib::pipelined::hazard::HazardPolicy;
use sim_lib::run_wrapper::run;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .init();

    if let Err(e) = run_eval() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Configurations compared for every program
fn configurations() -> Vec<(&'static str, CPUPolicy)> {
    let base = CPUPolicy { seed: Some(42), ..Default::default() };
    let bubbles = DelaySlotPolicy { mode: DelaySlotMode::Bubbles, window: 1 };
    vec![
        ("ideal", CPUPolicy { latency: MemoryLatency::Fixed(1), ..base }),
        ("default", base),
        ("stall-only", CPUPolicy { hazard: HazardPolicy::StallOnly, ..base }),
        ("bubble-slots", CPUPolicy { delay_slot: bubbles, ..base }),
        ("slow-memory", CPUPolicy { latency: MemoryLatency::Fixed(4), ..base }),
    ]
}

fn run_eval() -> SimulatorResult<()> {
    let output_path = "eval/sim_eval.csv";
    fs::create_dir_all("eval")?;
    let mut writer = csv::Writer::from_path(output_path)?;

    writer.write_record([
        "Program",
        "Configuration",
        "Cycles",
        "Instructions",
        "CPI",
        "Memory stalls",
        "Hazard stalls",
        "Bubbles",
        "Delay-slot utilization",
    ])?;

    let programs = vec!["sum", "load-use", "branches", "function", "memcpy"];

    for program in programs {
        let program_path = format!("programs/{}.s", program);
        eprintln!("Running program: {}", program_path);

        for (name, policy) in configurations() {
            match run(Path::new(&program_path), policy) {
                Ok(report) => {
                    let h = report.history;
                    writer.write_record([
                        program,
                        name,
                        &h.cycle_count.to_string(),
                        &h.inst_count.to_string(),
                        &format!("{:.3}", h.cpi()),
                        &h.mem_stall_count.to_string(),
                        &h.hazard_stall_count.to_string(),
                        &h.bubble_count.to_string(),
                        &format!("{:.1}", h.delay_slot_utilization(policy.delay_slot.window)),
                    ])?;
                }
                Err(e) => {
                    eprintln!(
                        "Warning: Failed to run program '{}' ({}): {}",
                        program, name, e
                    );
                    let mut record = vec![program, name];
                    record.extend(["Error"; 7]);
                    writer.write_record(&record)?;
                }
            }
        }
    }

    writer.flush()?;
    eprintln!("Results written to {}", output_path);
    Ok(())
}
