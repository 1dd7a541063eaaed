use anyhow::{Context, Result};
use clap::Parser;

use garmin_sleep::config::Config;
use garmin_sleep::{DailySleepScore, GarminClient, SleepData};

#[derive(Parser)]
#[command(name = "garmin-sleep")]
#[command(about = "Garmin Connect sleep data in the terminal")]
#[command(version)]
struct Cli {
    /// End date (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    date: Option<String>,

    /// Number of days to fetch, ending at the end date
    #[arg(short = 'n', long, default_value_t = 1)]
    days: u32,

    /// Print raw JSON instead of the summary
    #[arg(long)]
    json: bool,

    /// Show daily sleep scores instead of full records
    #[arg(long)]
    scores: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load();
    let username = config
        .username
        .clone()
        .context("GARMIN_USERNAME is not set")?;
    let token = config.bearer_token()?;
    let client = GarminClient::new(username, token)?;

    let end = cli.date.map(Into::into);

    if cli.scores {
        let scores = DailySleepScore::list(end, cli.days, &client).await?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&scores)?);
        } else {
            for score in &scores {
                println!("{}  score {:>3}", score.calendar_date, score.value);
            }
        }
        return Ok(());
    }

    let nights = SleepData::list(end, cli.days, &client).await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&nights)?);
        return Ok(());
    }

    for night in &nights {
        print_night(night);
    }
    Ok(())
}

fn print_night(night: &SleepData) {
    let dto = &night.daily_sleep_dto;
    let overall = dto
        .sleep_scores
        .as_ref()
        .and_then(|scores| scores.overall.value)
        .map(|value| format!("  score {value:>3}"))
        .unwrap_or_default();

    println!(
        "{}  {}  deep {}  light {}  rem {}  awake {}{}",
        dto.calendar_date,
        format_duration(dto.sleep_time_seconds / 60),
        format_duration_short(dto.deep_sleep_seconds / 60),
        format_duration_short(dto.light_sleep_seconds / 60),
        format_duration_short(dto.rem_sleep_seconds / 60),
        format_duration_short(dto.awake_sleep_seconds / 60),
        overall,
    );
}

fn format_duration(minutes: i32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("{}h{:02}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

fn format_duration_short(minutes: i32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    format!("{}:{:02}", hours, mins)
}
