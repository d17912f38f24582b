#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use mesh_client_ui::app_state::{Reply, ShellState};
use mesh_client_ui::command::Command;
use mesh_client_ui::directory::{DelayedDirectory, demo_directory};
use mesh_client_ui::settings;
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader};
use tracing::{info, warn};

fn usage_and_exit() -> ! {
	eprintln!(
		"Usage: mesh_shell [--settings path] [--layout path] [--latency ms]\n\
\n\
Options:\n\
	--settings  Settings file (default: <config dir>/mesh/client-settings.toml)\n\
	--layout    Save/restore the layout at this path (implies persist_layout)\n\
	--latency   Simulated room directory latency in milliseconds (default: 0)\n\
	--help      Show this help\n\
\n\
Commands are read from stdin; type `help` once running.\n"
	);
	std::process::exit(2)
}

fn init_tracing() {
	let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,mesh_dock=debug".to_string());
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.with_writer(std::io::stderr)
		.init();
}

struct Args {
	settings: Option<PathBuf>,
	layout: Option<PathBuf>,
	latency: Duration,
}

fn parse_args() -> Args {
	let mut args = Args {
		settings: None,
		layout: None,
		latency: Duration::ZERO,
	};

	let mut it = std::env::args().skip(1);
	while let Some(arg) = it.next() {
		match arg.as_str() {
			"--help" | "-h" => usage_and_exit(),
			"--settings" => args.settings = Some(PathBuf::from(it.next().unwrap_or_else(|| usage_and_exit()))),
			"--layout" => args.layout = Some(PathBuf::from(it.next().unwrap_or_else(|| usage_and_exit()))),
			"--latency" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				let ms: u64 = v.parse().unwrap_or_else(|_| {
					eprintln!("Invalid --latency value: {v}");
					usage_and_exit()
				});
				args.latency = Duration::from_millis(ms);
			}
			other => {
				eprintln!("Unknown argument: {other}");
				usage_and_exit();
			}
		}
	}
	args
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	init_tracing();
	let args = parse_args();

	let mut cfg = match &args.settings {
		Some(path) => settings::load_from(path).with_context(|| format!("load settings from {}", path.display()))?,
		None => settings::get_cloned(),
	};
	if args.layout.is_some() {
		cfg.persist_layout = true;
	}
	let layout = args
		.layout
		.clone()
		.or_else(|| cfg.persist_layout.then(settings::layout_path));

	let rooms = demo_directory();
	let directory = Arc::new(DelayedDirectory::new(rooms.clone(), args.latency));
	let mut shell = ShellState::new(cfg, directory).with_known_rooms(rooms);
	if let Some(path) = layout {
		shell = shell.with_layout_file(path);
	}
	info!(persist = shell.layout_path().is_some(), "mesh shell ready");

	let mut stdout = tokio::io::stdout();
	let mut lines = BufReader::new(tokio::io::stdin()).lines();

	loop {
		stdout.write_all(b"> ").await?;
		stdout.flush().await?;

		// Wake for a pending hover-clear even when no input arrives.
		let line = loop {
			let deadline = shell.drag.next_deadline();
			tokio::select! {
				line = lines.next_line() => break line?,
				_ = sleep_until(deadline) => {
					if shell.drag.poll_timer(Instant::now()) {
						info!("hover target cleared");
					}
				}
			}
		};

		let Some(line) = line else {
			break;
		};
		if line.trim().is_empty() {
			continue;
		}

		let cmd = match line.parse::<Command>() {
			Ok(cmd) => cmd,
			Err(e) => {
				stdout.write_all(format!("{e}\n").as_bytes()).await?;
				continue;
			}
		};

		match shell.execute(cmd, Instant::now()).await {
			Reply::Text(text) => {
				stdout.write_all(text.as_bytes()).await?;
				if !text.ends_with('\n') {
					stdout.write_all(b"\n").await?;
				}
			}
			Reply::Quit => break,
		}
	}

	if let Err(e) = shell.save() {
		warn!(error = %e, "failed to save layout on exit");
	}
	Ok(())
}

async fn sleep_until(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
		None => std::future::pending::<()>().await,
	}
}
