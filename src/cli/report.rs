use std::{collections::HashMap, path::PathBuf, sync::Arc};

use ansi_term::Colour;
use anyhow::Result;
use chrono::Duration;
use clap::Parser;
use serde::Serialize;
use tracing::debug;

use crate::{
    daemon::storage::{
        entities::TabRecordEntity,
        state_storage::{StateStorage, StateStorageImpl},
    },
    utils::{
        percentage::{duration_percentage, Percentage},
        time::{as_seconds, format_duration},
    },
};

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[arg(long, help = "Application directory the host saves into")]
    pub dir: Option<PathBuf>,
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
    #[arg(short = 'p', long = "percentage", help = "Filter sites to have at least specified percentage", default_value_t = Percentage::new_opt(1.).unwrap_or_else(Percentage::zero))]
    min_percentage: Percentage,
    #[arg(
        long = "target-minutes",
        help = "Show progress of each site towards a daily target, like the extension popup"
    )]
    target_minutes: Option<u32>,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostUsage {
    pub hostname: Arc<str>,
    #[serde(serialize_with = "serialize_seconds", rename = "activeSeconds")]
    pub duration: Duration,
    pub tabs: usize,
    pub open_tabs: usize,
}

impl HostUsage {
    fn new(hostname: Arc<str>) -> Self {
        Self {
            hostname,
            duration: Duration::zero(),
            tabs: 0,
            open_tabs: 0,
        }
    }
}

fn serialize_seconds<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(as_seconds(*duration))
}

/// Groups saved tabs by hostname. Returns the sites above `min_percentage`, longest first, and
/// the total time over every tab.
pub fn analyze_hosts(
    tabs: impl IntoIterator<Item = TabRecordEntity>,
    min_percentage: Percentage,
) -> (Vec<HostUsage>, Duration) {
    let mut map = HashMap::<Arc<str>, HostUsage>::new();
    let mut total = Duration::zero();

    for tab in tabs {
        total += tab.accumulated;
        let usage = map
            .entry(tab.hostname.clone())
            .or_insert_with(|| HostUsage::new(tab.hostname));
        usage.duration += tab.accumulated;
        usage.tabs += 1;
        if tab.is_open {
            usage.open_tabs += 1;
        }
    }

    let mut usages = map
        .into_values()
        .filter(|v| *duration_percentage(v.duration, total) >= *min_percentage)
        .collect::<Vec<_>>();
    usages.sort_by(|a, b| {
        b.duration
            .cmp(&a.duration)
            .then_with(|| a.hostname.cmp(&b.hostname))
    });
    (usages, total)
}

/// Progress towards `target`, capped at 100%.
fn target_progress(duration: Duration, target: Duration) -> Percentage {
    let progress = duration_percentage(duration, target);
    Percentage::new_opt(progress.min(100.)).unwrap_or_else(Percentage::zero)
}

/// Command to process `report`. Prints per-site totals of the last saved table.
pub async fn process_report_command(
    ReportCommand {
        json,
        min_percentage,
        target_minutes,
        ..
    }: ReportCommand,
    app_dir: PathBuf,
) -> Result<()> {
    let storage = StateStorageImpl::new(app_dir)?;
    let Some(state) = storage.load().await? else {
        println!("Nothing saved in {} yet", storage.path().display());
        return Ok(());
    };
    debug!("Loaded {} tabs saved at {}", state.tabs.len(), state.saved_at);

    let (usages, total) = analyze_hosts(state.tabs.into_values(), min_percentage);

    if json {
        println!("{}", serde_json::to_string_pretty(&usages)?);
        return Ok(());
    }

    let target = target_minutes.map(|v| Duration::minutes(v.into()));
    for usage in usages {
        let share = *duration_percentage(usage.duration, total) as i32;
        let open = format!("{}/{}", usage.open_tabs, usage.tabs);
        let open = if usage.open_tabs > 0 {
            Colour::Green.paint(open)
        } else {
            Colour::Fixed(244).paint(open)
        };
        match target {
            Some(target) => println!(
                "{}%\t{}\t{}\t{}\t{}",
                share,
                format_duration(usage.duration),
                Colour::Cyan.paint(format!(
                    "{}%",
                    *target_progress(usage.duration, target) as i32
                )),
                usage.hostname,
                open
            ),
            None => println!(
                "{}%\t{}\t{}\t{}",
                share,
                format_duration(usage.duration),
                usage.hostname,
                open
            ),
        }
    }
    println!(
        "{}",
        Colour::White
            .bold()
            .paint(format!("Total\t{}", format_duration(total)))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::{daemon::storage::entities::TabRecordEntity, utils::percentage::Percentage};

    use super::{analyze_hosts, target_progress};

    fn tab(tab_id: i64, hostname: &str, seconds: i64, is_open: bool) -> TabRecordEntity {
        TabRecordEntity {
            tab_id,
            window_id: Some(1),
            url: format!("https://{hostname}/").into(),
            hostname: hostname.into(),
            accumulated: Duration::seconds(seconds),
            is_open,
            closed_at: None,
        }
    }

    #[test]
    fn test_hosts_are_grouped_and_sorted() {
        let (usages, total) = analyze_hosts(
            [
                tab(1, "github.com", 30, true),
                tab(2, "example.com", 50, false),
                tab(3, "github.com", 40, false),
            ],
            Percentage::zero(),
        );
        assert_eq!(total, Duration::seconds(120));
        assert_eq!(usages.len(), 2);
        assert_eq!(&*usages[0].hostname, "github.com");
        assert_eq!(usages[0].duration, Duration::seconds(70));
        assert_eq!(usages[0].tabs, 2);
        assert_eq!(usages[0].open_tabs, 1);
        assert_eq!(&*usages[1].hostname, "example.com");
        assert_eq!(usages[1].open_tabs, 0);
    }

    #[test]
    fn test_small_hosts_are_filtered() {
        let (usages, total) = analyze_hosts(
            [tab(1, "github.com", 990, true), tab(2, "unknown", 10, true)],
            Percentage::new_opt(5.).unwrap(),
        );
        assert_eq!(total, Duration::seconds(1000));
        assert_eq!(usages.len(), 1);
        assert_eq!(&*usages[0].hostname, "github.com");
    }

    #[test]
    fn test_empty_table_keeps_zero_time_hosts() {
        let (usages, total) = analyze_hosts([tab(1, "github.com", 0, true)], Percentage::zero());
        assert!(total.is_zero());
        assert_eq!(usages.len(), 1);
    }

    #[test]
    fn test_json_shape() {
        let (usages, _) = analyze_hosts([tab(1, "github.com", 3, true)], Percentage::zero());
        let value = serde_json::to_value(&usages).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{
                "hostname": "github.com",
                "activeSeconds": 3.0,
                "tabs": 1,
                "openTabs": 1,
            }])
        );
    }

    #[test]
    fn test_target_progress_is_capped() {
        assert_eq!(
            *target_progress(Duration::minutes(30), Duration::minutes(60)),
            50.
        );
        assert_eq!(
            *target_progress(Duration::minutes(90), Duration::minutes(60)),
            100.
        );
    }
}
