use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use gcpipe_wire::{ids, Frame};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    schema_id: &'a str,
    id: u8,
    id_name: &'a str,
    params_len: usize,
    params: &'a [u8],
    timestamp: String,
}

pub fn print_response(frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ResponseOutput {
                schema_id: "https://schemas.gcpipe.dev/cli/v1/response.schema.json",
                id: frame.id,
                id_name: ids::id_name(frame.id),
                params_len: frame.params.len(),
                params: frame.params.as_ref(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "NAME", "SIZE", "PARAMS"])
                .add_row(vec![
                    frame.id.to_string(),
                    ids::id_name(frame.id).to_string(),
                    frame.params.len().to_string(),
                    params_preview(frame.params.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            // The prototype harness rendered responses as `Message=<id> [p p ...]`.
            println!("Message={} [{}]", frame.id, params_preview(frame.params.as_ref()));
        }
        OutputFormat::Raw => {
            print_raw(frame.params.as_ref());
        }
    }
}

#[derive(Serialize)]
struct PointsOutput<'a> {
    schema_id: &'a str,
    channel: u8,
    count: usize,
    points: &'a [i32],
    timestamp: String,
}

pub fn print_points(channel: u8, points: &[i32], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PointsOutput {
                schema_id: "https://schemas.gcpipe.dev/cli/v1/data-points.schema.json",
                channel,
                count: points.len(),
                points,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "COUNT", "POINTS"])
                .add_row(vec![
                    channel.to_string(),
                    points.len().to_string(),
                    points_preview(points),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("channel={} count={} points=[{}]", channel, points.len(), points_preview(points));
        }
        OutputFormat::Raw => {
            // One value per line so the output pipes straight into plotting tools.
            let mut out = std::io::stdout();
            for point in points {
                let _ = writeln!(out, "{point}");
            }
            let _ = out.flush();
        }
    }
}

#[derive(Serialize)]
struct RunStateOutput<'a> {
    schema_id: &'a str,
    channel: u8,
    running: bool,
    timestamp: String,
}

pub fn print_run_state(channel: u8, running: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = RunStateOutput {
                schema_id: "https://schemas.gcpipe.dev/cli/v1/run-state.schema.json",
                channel,
                running,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "RUNNING"])
                .add_row(vec![channel.to_string(), running.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("channel={channel} running={running}");
        }
        OutputFormat::Raw => {
            println!("{}", u8::from(running));
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn params_preview(params: &[u8]) -> String {
    params
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn points_preview(points: &[i32]) -> String {
    points
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_render_space_separated() {
        assert_eq!(params_preview(&[29, 30]), "29 30");
        assert_eq!(params_preview(&[]), "");
    }

    #[test]
    fn points_render_space_separated() {
        assert_eq!(points_preview(&[100, -200, 300]), "100 -200 300");
    }
}
