use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use gifcover_contracts::envelope::{PluginInput, PluginOutput};
use gifcover_engine::{plugin_log, Dispatcher, EngineConfig};
use log::{error, LevelFilter};

const ENV_LOG_LEVEL: &str = "GIFCOVER_LOG_LEVEL";

#[derive(Debug, Parser)]
#[command(
    name = "gifcover",
    version,
    about = "Stash plugin that sets GIF covers on scenes, performers, tags and groups"
)]
struct Cli {
    /// Read the plugin request from a file instead of stdin.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    cdn_url: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long)]
    request_timeout: Option<f64>,
    /// Pause between tags during autofill.
    #[arg(long)]
    tag_delay_ms: Option<u64>,
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    match run(Cli::parse()) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("gifcover error: {err:#}");
            let _ = write_output(
                &mut io::stdout().lock(),
                &PluginOutput::failure(format!("{err:#}")),
            );
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    plugin_log::init(log_level(cli.log_level.as_deref()))?;
    let raw = read_request(cli.input.as_deref())?;
    let dispatcher = Dispatcher::new(resolve_config(&cli));

    let output = respond(&dispatcher, &raw);
    write_output(&mut io::stdout().lock(), &output).context("failed writing plugin output")?;
    Ok(if output.error.is_some() { 1 } else { 0 })
}

fn read_request(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))
        }
        None => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("failed reading plugin input from stdin")?;
            Ok(raw)
        }
    }
}

fn resolve_config(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url);
    }
    if let Some(cdn_url) = &cli.cdn_url {
        config = config.with_cdn_url(cdn_url);
    }
    if let Some(seconds) = cli.request_timeout {
        config = config.with_request_timeout_seconds(seconds);
    }
    if let Some(millis) = cli.tag_delay_ms {
        config = config.with_tag_delay_millis(millis);
    }
    config
}

fn log_level(flag: Option<&str>) -> LevelFilter {
    flag.map(str::to_string)
        .or_else(|| env::var(ENV_LOG_LEVEL).ok())
        .and_then(|raw| LevelFilter::from_str(raw.trim()).ok())
        .unwrap_or(LevelFilter::Debug)
}

/// Every failure, including malformed input, ends up in the envelope.
fn respond(dispatcher: &Dispatcher, raw: &str) -> PluginOutput {
    let result = PluginInput::from_json(raw).and_then(|input| dispatcher.dispatch(&input));
    match result {
        Ok(output) => PluginOutput::ok(output),
        Err(err) => {
            error!("{err}");
            PluginOutput::failure(err.to_string())
        }
    }
}

/// One JSON line followed by a blank line.
fn write_output(out: &mut impl Write, output: &PluginOutput) -> io::Result<()> {
    writeln!(out, "{}\n", output.to_json())?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use gifcover_contracts::envelope::PluginOutput;
    use gifcover_engine::{Dispatcher, EngineConfig};
    use log::LevelFilter;
    use serde_json::{json, Value};

    use super::{log_level, read_request, resolve_config, respond, write_output, Cli};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(EngineConfig::default())
    }

    #[test]
    fn output_is_one_line_then_blank_line() -> anyhow::Result<()> {
        let mut buffer = Vec::new();
        write_output(&mut buffer, &PluginOutput::ok(json!({"images": []})))?;
        assert_eq!(String::from_utf8(buffer)?, "{\"Output\":{\"images\":[]}}\n\n");
        Ok(())
    }

    #[test]
    fn unknown_mode_is_reported_in_envelope() {
        let output = respond(&dispatcher(), r#"{"args": {"mode": "reindex"}}"#);
        assert_eq!(output.output, Value::Null);
        assert_eq!(output.error.as_deref(), Some("unsupported mode 'reindex'"));
    }

    #[test]
    fn malformed_input_is_reported_in_envelope() {
        let output = respond(&dispatcher(), "not json");
        assert!(output
            .error
            .as_deref()
            .unwrap_or_default()
            .starts_with("invalid plugin input"));
    }

    #[test]
    fn get_galleries_answers_without_network() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("request.json");
        fs::write(
            &path,
            r#"{"server_connection": {"Scheme": "http", "Host": "localhost", "Port": 9999},
                "args": {"mode": "getGalleries", "query": "rain", "offset": 0}}"#,
        )?;

        let raw = read_request(Some(&path))?;
        let output = respond(&dispatcher(), &raw);
        assert_eq!(output.error, None);
        assert_eq!(output.output["images"][0]["set_url"], "rain");
        assert_eq!(output.output["images"][0]["aspect_ratio"], json!(1.0));
        Ok(())
    }

    #[test]
    fn missing_input_file_is_an_error() {
        let temp = tempfile::tempdir().ok();
        let missing = temp
            .as_ref()
            .map(|dir| dir.path().join("absent.json"))
            .unwrap_or_default();
        assert!(read_request(Some(&missing)).is_err());
    }

    #[test]
    fn flags_override_configuration() {
        let cli = Cli::parse_from([
            "gifcover",
            "--api-url",
            "http://localhost:1234/search/",
            "--tag-delay-ms",
            "0",
        ]);
        let config = resolve_config(&cli);
        assert_eq!(config.api_url, "http://localhost:1234/search");
        assert!(config.tag_delay.is_zero());
    }

    #[test]
    fn log_level_flag_wins_and_bad_values_fall_back() {
        assert_eq!(log_level(Some("warn")), LevelFilter::Warn);
        assert_eq!(log_level(Some("INFO")), LevelFilter::Info);
        assert_eq!(log_level(Some("chatty")), LevelFilter::Debug);
    }
}
