mod clients;
mod harness;

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use clap::Parser;

use vigil::{AuthorityMode, SessionConfig};

#[derive(Parser)]
#[command(name = "vigil-sim")]
#[command(about = "Scripted-session harness for the vigil validation core")]
struct Args {
    #[arg(short, long, default_value = "all", help = "Scenario name, or 'all'")]
    scenario: String,

    #[arg(short, long, default_value_t = 200)]
    ticks: u64,

    #[arg(long, help = "Run without real-time pacing")]
    fast: bool,

    #[arg(long, default_value = "semi", help = "Movement authority: client, semi or full")]
    movement: String,

    #[arg(long, default_value = "semi", help = "Combat authority: client, semi or full")]
    combat: String,

    #[arg(long, help = "List scenarios and exit")]
    list: bool,
}

fn parse_authority(value: &str) -> Result<AuthorityMode> {
    match value.to_ascii_lowercase().as_str() {
        "client" => Ok(AuthorityMode::Client),
        "semi" => Ok(AuthorityMode::Semi),
        "full" => Ok(AuthorityMode::Full),
        other => bail!("unknown authority mode '{}'", other),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut roster = clients::roster();
    if args.list {
        for client in &roster {
            println!("{:<14} {}", client.name(), client.description());
        }
        return Ok(());
    }

    let movement = parse_authority(&args.movement)?;
    let combat = parse_authority(&args.combat)?;

    if args.scenario != "all" {
        roster.retain(|client| client.name() == args.scenario);
        if roster.is_empty() {
            bail!("unknown scenario '{}', try --list", args.scenario);
        }
    }

    for client in &mut roster {
        log::info!("Running scenario {}", client.name());
        let config = SessionConfig {
            identifier: client.name().to_string(),
            movement_authority: movement,
            combat_authority: combat,
            ..SessionConfig::default()
        };
        let outcome = harness::run(client.as_mut(), config, args.ticks, args.fast);
        print_outcome(&outcome);
    }

    Ok(())
}

fn print_outcome(outcome: &harness::Outcome) {
    println!();
    println!("== {} - {}", outcome.scenario, outcome.description);
    println!("   ticks run     {}", outcome.ticks_run);
    println!("   corrections   {}", outcome.corrections);
    match &outcome.disconnect {
        Some(message) => println!("   disconnected  {}", message),
        None => println!("   disconnected  no"),
    }

    let mut by_detector: BTreeMap<&str, (usize, f32)> = BTreeMap::new();
    for flag in &outcome.flags {
        let entry = by_detector.entry(flag.detector.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 = entry.1.max(flag.score);
    }
    if by_detector.is_empty() {
        println!("   verdict       clean");
    } else {
        for (detector, (count, peak)) in &by_detector {
            println!("   flagged       {:<14} x{} (peak score {:.2})", detector, count, peak);
        }
    }
    // scores still standing once the run ended, after any trust decay
    for (id, score) in outcome.scores.iter().filter(|(_, score)| *score > 0.0) {
        println!("   open score    {:<14} {:.2}", id, score);
    }
    for message in &outcome.punishes {
        println!("   punished      {}", message);
    }
    println!();
}
