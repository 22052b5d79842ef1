use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use focus_tracker::client::{ClientConfig, DailyMetrics, FocusTimeClient, MonthlyMetrics};
use focus_tracker::init_tracing;
use focus_tracker::timer::{CompletedSession, DriverError, FocusTimer, SessionSink, TimerDriver, TimerPhase};
use std::io::Write;
use std::time::Duration;

fn print_usage(bin_name: &str) {
    eprintln!("Usage:");
    eprintln!("  {bin_name} run <focus-minutes> <rest-minutes>");
    eprintln!("  {bin_name} day [YYYY-MM-DD]");
    eprintln!("  {bin_name} month [YYYY-MM-DD]");
}

enum Command {
    Run { focus_minutes: u32, rest_minutes: u32 },
    Day(Option<NaiveDate>),
    Month(Option<NaiveDate>),
}

fn parse_command(args: &[String]) -> Option<Command> {
    let parse_date = |raw: &String| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok();

    match args {
        [command, focus, rest] if command == "run" => Some(Command::Run {
            focus_minutes: focus.parse().ok()?,
            rest_minutes: rest.parse().ok()?,
        }),
        [command] if command == "day" => Some(Command::Day(None)),
        [command, date] if command == "day" => Some(Command::Day(Some(parse_date(date)?))),
        [command] if command == "month" => Some(Command::Month(None)),
        [command, date] if command == "month" => Some(Command::Month(Some(parse_date(date)?))),
        _ => None,
    }
}

fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing("warn", false);

    let mut args = std::env::args();
    let bin_name = args.next().unwrap_or_else(|| "focus".to_string());
    let rest: Vec<String> = args.collect();

    let Some(command) = parse_command(&rest) else {
        print_usage(&bin_name);
        std::process::exit(2);
    };

    let client = match ClientConfig::load().and_then(FocusTimeClient::new) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Failed to configure client: {err}");
            std::process::exit(1);
        }
    };

    let tz = match client.config().parse_time_zone() {
        Ok(tz) => tz,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let outcome = match command {
        Command::Run { focus_minutes, rest_minutes } => run_cycle(client, focus_minutes, rest_minutes).await,
        Command::Day(date) => show_day(&client, date.unwrap_or_else(|| today(tz)), tz).await,
        Command::Month(date) => show_month(&client, date.unwrap_or_else(|| today(tz))).await,
    };

    if let Err(message) = outcome {
        eprintln!("{message}");
        std::process::exit(1);
    }
}

async fn show_day(client: &FocusTimeClient, date: NaiveDate, tz: Tz) -> Result<(), String> {
    let sessions = client.list_focus_times(date).await.map_err(|e| e.to_string())?;
    print!("{}", DailyMetrics::from_sessions(date, &sessions, tz).render());
    Ok(())
}

async fn show_month(client: &FocusTimeClient, date: NaiveDate) -> Result<(), String> {
    let days = client.focus_time_metrics(date).await.map_err(|e| e.to_string())?;
    print!("{}", MonthlyMetrics::from_counts(date, &days).render_grid());
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Done,
}

/// Keeps a failed submission for a later retry; any other driver error ends the cycle.
fn record(result: Result<Option<CompletedSession>, DriverError>, unsent: &mut Vec<CompletedSession>) -> Result<(), String> {
    match result {
        Ok(Some(session)) => {
            println!("\nRecorded {} min of focus.", session.duration_minutes());
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(DriverError::Submit { session, source }) => {
            eprintln!("\nCould not record session: {source}");
            unsent.push(session);
            Ok(())
        }
        Err(err) => Err(err.to_string()),
    }
}

/// One tick of the cycle: reports an expired focus interval, then switches to rest.
async fn advance<S: SessionSink + Sync>(
    driver: &mut TimerDriver<S>,
    now: DateTime<Utc>,
    unsent: &mut Vec<CompletedSession>,
) -> Result<Step, String> {
    match driver.timer().phase() {
        TimerPhase::Focus => {
            let ticked = driver.tick(now).await;
            record(ticked, unsent)?;
            if driver.timer().remaining(now).is_zero() {
                let rested = driver.begin_rest(now).await;
                record(rested, unsent)?;
            }
            Ok(Step::Continue)
        }
        TimerPhase::Rest if driver.timer().is_rest_over(now) => Ok(Step::Done),
        TimerPhase::Rest => Ok(Step::Continue),
        TimerPhase::Paused => Ok(Step::Done),
    }
}

/// Re-sends sessions whose first submission failed. Returns the ones that failed again.
async fn flush_unsent<S: SessionSink + Sync>(driver: &TimerDriver<S>, unsent: Vec<CompletedSession>) -> Vec<CompletedSession> {
    let mut lost = Vec::new();
    for session in unsent {
        if let Err(err) = driver.retry(session).await {
            eprintln!("Giving up on session {} - {}: {err}", session.time_from, session.time_to);
            lost.push(session);
        }
    }
    lost
}

/// One focus interval followed by its rest. Ctrl-C abandons the running interval; intervals that
/// already completed are still sent.
async fn run_cycle(client: FocusTimeClient, focus_minutes: u32, rest_minutes: u32) -> Result<(), String> {
    let mut driver = TimerDriver::new(FocusTimer::new(focus_minutes, rest_minutes), client);
    driver.start(Utc::now()).map_err(|e| e.to_string())?;

    let mut unsent: Vec<CompletedSession> = Vec::new();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let cancelled = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                driver.cancel();
                println!("\nCancelled.");
                break true;
            }
            _ = ticker.tick() => {
                let now = Utc::now();
                if advance(&mut driver, now, &mut unsent).await? == Step::Done {
                    break false;
                }

                print!("\r{}   ", driver.timer().display(now));
                let _ = std::io::stdout().flush();
            }
        }
    };

    flush_unsent(&driver, unsent).await;

    if !cancelled {
        println!("\nCycle complete.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use focus_tracker::client::ClientError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct FlakySink {
        down: AtomicBool,
        stored: Mutex<Vec<CompletedSession>>,
    }

    #[async_trait::async_trait]
    impl SessionSink for FlakySink {
        async fn submit(&self, session: &CompletedSession) -> Result<(), ClientError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(ClientError::Api {
                    status: 503,
                    message: "Service Unavailable".to_string(),
                });
            }
            self.stored.lock().unwrap().push(*session);
            Ok(())
        }
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap() + TimeDelta::minutes(minutes)
    }

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_run_with_durations() {
        assert!(matches!(
            parse_command(&args(&["run", "25", "5"])),
            Some(Command::Run {
                focus_minutes: 25,
                rest_minutes: 5
            })
        ));
    }

    #[test]
    fn parses_optional_dates() {
        assert!(matches!(parse_command(&args(&["day"])), Some(Command::Day(None))));
        assert!(matches!(parse_command(&args(&["month", "2024-02-10"])), Some(Command::Month(Some(_)))));
    }

    #[test]
    fn rejects_malformed_arguments() {
        assert!(parse_command(&args(&[])).is_none());
        assert!(parse_command(&args(&["run", "25"])).is_none());
        assert!(parse_command(&args(&["run", "-5", "5"])).is_none());
        assert!(parse_command(&args(&["day", "15/01/2024"])).is_none());
        assert!(parse_command(&args(&["week"])).is_none());
    }

    #[tokio::test]
    async fn expiry_with_failed_submission_moves_to_rest_and_keeps_the_session() {
        let sink = FlakySink::default();
        sink.down.store(true, Ordering::SeqCst);
        let mut driver = TimerDriver::new(FocusTimer::new(25, 5), sink);
        driver.start(at(0)).unwrap();
        let mut unsent = Vec::new();

        assert_eq!(advance(&mut driver, at(10), &mut unsent).await, Ok(Step::Continue));
        assert!(unsent.is_empty());

        assert_eq!(advance(&mut driver, at(25), &mut unsent).await, Ok(Step::Continue));
        assert_eq!(driver.timer().phase(), TimerPhase::Rest);
        assert_eq!(unsent.len(), 1);
        assert_eq!(unsent[0].duration_minutes(), 25);
    }

    #[tokio::test]
    async fn cancelled_cycle_still_sends_completed_sessions() {
        let sink = FlakySink::default();
        sink.down.store(true, Ordering::SeqCst);
        let mut driver = TimerDriver::new(FocusTimer::new(25, 5), sink);
        driver.start(at(0)).unwrap();
        let mut unsent = Vec::new();
        advance(&mut driver, at(25), &mut unsent).await.unwrap();

        driver.cancel();
        driver.sink().down.store(false, Ordering::SeqCst);
        let lost = flush_unsent(&driver, unsent).await;

        assert!(lost.is_empty());
        let stored = driver.sink().stored.lock().unwrap().clone();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].time_from, at(0));
        assert_eq!(stored[0].time_to, at(25));
    }

    #[tokio::test]
    async fn sessions_failing_again_are_returned() {
        let sink = FlakySink::default();
        sink.down.store(true, Ordering::SeqCst);
        let mut driver = TimerDriver::new(FocusTimer::new(25, 5), sink);
        driver.start(at(0)).unwrap();
        let mut unsent = Vec::new();
        advance(&mut driver, at(25), &mut unsent).await.unwrap();

        let lost = flush_unsent(&driver, unsent.clone()).await;
        assert_eq!(lost, unsent);
    }

    #[tokio::test]
    async fn cycle_is_done_once_rest_is_over() {
        let mut driver = TimerDriver::new(FocusTimer::new(25, 5), FlakySink::default());
        driver.start(at(0)).unwrap();
        let mut unsent = Vec::new();

        advance(&mut driver, at(25), &mut unsent).await.unwrap();
        assert_eq!(advance(&mut driver, at(28), &mut unsent).await, Ok(Step::Continue));
        assert_eq!(advance(&mut driver, at(30), &mut unsent).await, Ok(Step::Done));
        assert!(unsent.is_empty());
        assert_eq!(driver.sink().stored.lock().unwrap().len(), 1);
    }
}
