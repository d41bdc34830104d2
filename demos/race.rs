use std::time::Duration;

use anyhow::anyhow;
use clap::{Parser, ValueEnum};
use log::{debug, info};
use pledge::{
    combinators::{all, all_settled, any, race},
    futures::{promise::Outcome, timer::Timer},
    task::Executor,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Combinator {
    All,
    AllSettled,
    Any,
    Race,
}

/// Run a combinator over delayed promises on the virtual clock.
///
/// Each job is written `NAME=MILLIS` to fulfill with NAME after MILLIS, or
/// `!NAME=MILLIS` to reject with NAME instead.
#[derive(Parser, Debug)]
struct Args {
    /// Which combinator to apply to the jobs.
    #[arg(short, long, value_enum, default_value_t = Combinator::Race)]
    combinator: Combinator,

    /// Reject the aggregate if it has not settled after this many
    /// milliseconds.
    #[arg(short, long)]
    deadline: Option<u64>,

    #[arg(default_values = ["fast=100", "slow=500"])]
    jobs: Vec<String>,
}

struct Job {
    name: String,
    delay: Duration,
    fails: bool,
}

fn parse_job(spec: &str) -> anyhow::Result<Job> {
    let (name, millis) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("job `{spec}` is not of the form NAME=MILLIS"))?;

    let (name, fails) = match name.strip_prefix('!') {
        Some(name) => (name, true),
        None => (name, false),
    };

    Ok(Job {
        name: name.to_string(),
        delay: Duration::from_millis(millis.parse()?),
        fails,
    })
}

fn show(outcome: Option<Outcome<String, String>>) -> String {
    match outcome {
        None => "still pending".to_string(),
        Some(Outcome::Fulfilled(v)) => format!("fulfilled with {v}"),
        Some(Outcome::Rejected(e)) => format!("rejected with {e}"),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let jobs = args
        .jobs
        .iter()
        .map(|s| parse_job(s))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let inputs: Vec<_> = jobs
        .into_iter()
        .map(|job| {
            debug!("{} settles after {:?}", job.name, job.delay);
            if job.fails {
                Timer::reject_after(job.delay, job.name)
            } else {
                Timer::resolve_after(job.delay, job.name)
            }
        })
        .collect();

    let aggregate = match args.combinator {
        Combinator::All => all(inputs).and_then(|values| Ok(values.join(", "))),
        Combinator::AllSettled => all_settled(inputs).continue_with(
            |outcomes| {
                Ok(outcomes
                    .into_iter()
                    .map(|o| show(Some(o)))
                    .collect::<Vec<_>>()
                    .join("; "))
            },
            |never| match never {},
        ),
        Combinator::Any => any(inputs).recover_with(|e| Err(format!("{e}: {:?}", e.reasons()))),
        Combinator::Race => race(inputs),
    };

    let aggregate = match args.deadline {
        Some(ms) => race([
            aggregate,
            Timer::reject_after(Duration::from_millis(ms), "deadline exceeded".to_string()),
        ]),
        None => aggregate,
    };

    let combinator = args.combinator;
    aggregate.finally_run(move || {
        info!("{combinator:?} settled at {:?}", Timer::now());
    });

    Executor::run();

    println!("{}", show(aggregate.outcome()));

    Ok(())
}
