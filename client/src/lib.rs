// MegaMail client core
// Campaign send wizard, recipient counting and contact import, plus the command-line driver.

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod ui;
pub mod utils;
pub mod wizard;

use log::{error, info};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::{HttpMailApi, MailApi};
use crate::config::Settings;
use crate::ui::{AllowAll, EnglishTranslator};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Initialize logging system with dual format (JSON + human-readable)
pub fn init_logging(
    with_console: bool,
    log_dir: Option<&str>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let log_dir = utils::path_resolver::resolve_log_folder(log_dir)?;
    std::fs::create_dir_all(&log_dir)?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");

    // JSON log file for structured parsing
    let json_log_file = log_dir.join(format!("megamail-{}.log", timestamp));

    // Human-readable log file (.txt)
    let txt_log_file = log_dir.join(format!("megamail-{}.txt", timestamp));

    let mut dispatch = fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .level_for("hyper", log::LevelFilter::Info)
        .level_for("reqwest", log::LevelFilter::Info);

    // Console output goes to stderr; stdout carries command results.
    if with_console {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(log::LevelFilter::Info)
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}", txt_line));
                })
                .chain(std::io::stderr()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let json_line = utils::logging::format_json_log(
                        &timestamp_utc,
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", json_line));
                })
                .chain(fern::log_file(json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", txt_line));
                })
                .chain(fern::log_file(txt_log_file)?),
        );

    dispatch.apply()?;

    log::info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(log_dir)
}

/// Shared startup for every command: settings, logging, HTTP client.
fn bootstrap(
    config_file: Option<&Path>,
    verbose: bool,
) -> anyhow::Result<(Settings, Arc<dyn MailApi>)> {
    // Logging needs the configured folder, so settings are read before it is up.
    let settings = Settings::load(config_file)?;
    if let Err(e) = init_logging(verbose, settings.log_dir.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    info!(
        "[PHASE: initialization] MegaMail CLI starting at {}",
        chrono::Utc::now()
    );
    info!(
        "[PHASE: initialization] [STEP: settings] {}",
        settings.summary()
    );

    let api: Arc<dyn MailApi> = Arc::new(HttpMailApi::new(&settings)?);
    Ok((settings, api))
}

/// Run one command to completion on a current-thread runtime and map the result to an exit code.
fn run_command<F, Fut>(name: &str, config_file: Option<&Path>, verbose: bool, command: F) -> i32
where
    F: FnOnce(Settings, Arc<dyn MailApi>) -> Fut,
    Fut: Future<Output = anyhow::Result<String>>,
{
    let (settings, api) = match bootstrap(config_file, verbose) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("megamail: {:#}", e);
            return EXIT_FAILURE;
        }
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build();
    let result = match rt {
        Ok(rt) => rt.block_on(command(settings, api)),
        Err(e) => Err(anyhow::anyhow!(
            "Failed to create async runtime for {}: {}",
            name,
            e
        )),
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            EXIT_OK
        }
        Err(e) => {
            error!(
                "[PHASE: cli] [STEP: {}] Command exited with error: {:?}",
                name, e
            );
            eprintln!("megamail: {}", e);
            EXIT_FAILURE
        }
    }
}

/// `--preview <draft.toml>`: print the campaign body without writing it.
pub fn run_preview(draft_file: &Path, config_file: Option<&Path>, verbose: bool) -> i32 {
    run_command("preview", config_file, verbose, |_settings, api| async move {
        let draft = commands::load_draft(draft_file)?;
        commands::preview(api, Arc::new(AllowAll), draft).await
    })
}

/// `--send <draft.toml> [--campaign <name>]`
pub fn run_send(
    draft_file: &Path,
    campaign: Option<String>,
    config_file: Option<&Path>,
    verbose: bool,
) -> i32 {
    run_command("send", config_file, verbose, |settings, api| async move {
        let draft = commands::load_draft(draft_file)?;
        let outcome = commands::send(
            api,
            Arc::new(AllowAll),
            &EnglishTranslator,
            settings.recount_debounce(),
            draft,
            campaign,
        )
        .await?;
        Ok(outcome.notice.render(&EnglishTranslator))
    })
}

/// `--count all|lists:<a,b>|segments:<a,b>`
pub fn run_count(target: &str, config_file: Option<&Path>, verbose: bool) -> i32 {
    run_command("count", config_file, verbose, |_settings, api| async move {
        Ok(commands::count(api, target).await?.to_string())
    })
}

/// `--import <file.csv> --consent [--list <name>] [--allow-update]`
pub fn run_import(args: commands::ImportArgs, config_file: Option<&Path>, verbose: bool) -> i32 {
    run_command("import", config_file, verbose, |_settings, api| async move {
        let outcome =
            commands::import_contacts(api, Arc::new(AllowAll), &EnglishTranslator, args).await?;
        Ok(outcome.notice.render(&EnglishTranslator))
    })
}
