// Console handlers - stdin commands standing in for the dashboard controls
use crate::application::actions::MonitorActions;
use crate::application::backend::DownloadKind;
use crate::domain::telemetry::MonitorMode;
use crate::infrastructure::wire::parse_timestamp;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

pub const HELP: &str = "\
commands:
  ack                      acknowledge the current alert
  live | replay            switch backend mode and restart polling
  start | stop             resume or pause polling
  step [n] | back [n]      move the replay cursor by n strides
  reset                    rewind replay to the beginning
  seek <ts>                jump replay to an ISO-8601 UTC instant
  window <seconds>         view window length
  scores <n>               scoring window size
  model <name>             detector model
  contamination <c>        expected anomaly fraction
  stride <n>               replay stride
  table                    reload the anomaly table
  export [<from> <to>]     save history CSV
  report [<from> <to>]     save PDF report
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Acknowledge,
    Mode(MonitorMode),
    Start,
    Stop,
    Step(i64),
    Reset,
    Seek(DateTime<Utc>),
    Window(u32),
    Scores(u32),
    Model(String),
    Contamination(f64),
    Stride(i64),
    Table,
    Download(DownloadKind, Option<(DateTime<Utc>, DateTime<Utc>)>),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let name = words.next().ok_or_else(|| "empty command".to_string())?;
    let args: Vec<&str> = words.collect();

    let number = |label: &str| -> Result<&str, String> {
        args.first().copied().ok_or_else(|| format!("{} needs a value", label))
    };

    let command = match name.to_lowercase().as_str() {
        "ack" => Command::Acknowledge,
        "live" => Command::Mode(MonitorMode::Live),
        "replay" => Command::Mode(MonitorMode::Replay),
        "start" => Command::Start,
        "stop" => Command::Stop,
        "step" => Command::Step(optional_count(&args)?),
        "back" => Command::Step(-optional_count(&args)?.abs()),
        "reset" => Command::Reset,
        "seek" => Command::Seek(parse_timestamp(number("seek")?)?),
        "window" => Command::Window(parse_arg(number("window")?)?),
        "scores" => Command::Scores(parse_arg(number("scores")?)?),
        "model" => Command::Model(number("model")?.to_string()),
        "contamination" => Command::Contamination(parse_arg(number("contamination")?)?),
        "stride" => Command::Stride(parse_arg(number("stride")?)?),
        "table" => Command::Table,
        "export" => Command::Download(DownloadKind::Export, parse_range(&args)?),
        "report" => Command::Download(DownloadKind::Report, parse_range(&args)?),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(command)
}

fn parse_arg<T: std::str::FromStr>(raw: &str) -> Result<T, String> {
    raw.parse().map_err(|_| format!("invalid value '{}'", raw))
}

fn optional_count(args: &[&str]) -> Result<i64, String> {
    args.first().map_or(Ok(1), |raw| parse_arg(raw))
}

fn parse_range(args: &[&str]) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, String> {
    match args {
        [] => Ok(None),
        [from, to] => Ok(Some((parse_timestamp(from)?, parse_timestamp(to)?))),
        _ => Err("select both from and to".to_string()),
    }
}

/// Applies one command; returns false when the console should exit.
pub async fn execute(command: Command, actions: &MonitorActions) -> bool {
    let result = match command {
        Command::Acknowledge => {
            actions.acknowledge();
            Ok(())
        }
        Command::Mode(mode) => actions.set_mode(mode).await,
        Command::Start => {
            actions.start();
            Ok(())
        }
        Command::Stop => {
            actions.stop();
            Ok(())
        }
        Command::Step(n) => {
            actions.replay_step(n).await;
            Ok(())
        }
        Command::Reset => {
            actions.replay_reset().await;
            Ok(())
        }
        Command::Seek(ts) => {
            actions.replay_seek(ts).await;
            Ok(())
        }
        Command::Window(seconds) => actions.set_view_seconds(seconds).await,
        Command::Scores(n) => actions.set_score_window(n).await,
        Command::Model(model) => actions.set_model(&model).await,
        Command::Contamination(c) => actions.set_contamination(c).await,
        Command::Stride(n) => actions.set_replay_stride(n),
        Command::Table => {
            actions.refresh_table().await;
            Ok(())
        }
        Command::Download(kind, range) => actions.download(kind, range).await.map(|path| {
            tracing::info!("Saved {}", path.display());
        }),
        Command::Help => {
            println!("{}", HELP);
            Ok(())
        }
        Command::Quit => return false,
    };

    if let Err(e) = result {
        actions.report(&format!("{:#}", e));
    }
    true
}

/// Reads commands from stdin until EOF or `quit`.
pub async fn run(actions: &MonitorActions) -> anyhow::Result<()> {
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    while let Some(line) = lines.next().await {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(command) => {
                if !execute(command, actions).await {
                    break;
                }
            }
            Err(e) => eprintln!("{} (type 'help')", e),
        }
    }
    Ok(())
}
