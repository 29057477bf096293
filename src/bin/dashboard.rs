use std::io::{self, Write};

use clap::Parser;
use serde::Serialize;

use inbox_insights::dashboard::client::{API_URL_VAR, DEFAULT_API_URL};
use inbox_insights::dashboard::{
    CategoryCounts, Dashboard, DailyVolume, DashboardClient, DashboardStats, LoadState,
    render_text,
};

#[derive(Parser, Debug)]
#[command(
    name = "dashboard",
    about = "Fetch recent classified emails once and summarize them"
)]
struct Args {
    /// Base URL of the inbox insights API.
    #[arg(long, env = API_URL_VAR, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Only list records whose subject or sender contains this text.
    #[arg(long, short = 'f', default_value = "")]
    filter: String,

    /// Print derived statistics as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary<'a> {
    stats: DashboardStats,
    category_counts: &'a CategoryCounts,
    trend: &'a [DailyVolume],
    visible: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let client = DashboardClient::new(args.api_url)?;

    let mut dashboard = Dashboard::load(&client).await;
    dashboard.set_query(args.filter);

    let mut stdout = io::stdout().lock();
    if args.json {
        let summary = Summary {
            stats: dashboard.stats(),
            category_counts: dashboard.category_counts(),
            trend: dashboard.trend(),
            visible: dashboard.visible().len(),
        };
        serde_json::to_writer_pretty(&mut stdout, &summary)?;
        writeln!(stdout)?;
    } else {
        write!(stdout, "{}", render_text(&dashboard))?;
    }

    stdout.flush()?;

    if dashboard.state() == LoadState::LoadFailed {
        std::process::exit(1);
    }
    Ok(())
}
