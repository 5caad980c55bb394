use std::path::{Path, PathBuf};

use megamail_client::commands::ImportArgs;
use megamail_client::EXIT_USAGE;

const USAGE: &str = "\
Usage:
  megamail --preview <draft.toml>
  megamail --send <draft.toml> [--campaign <name>]
  megamail --count all|lists:<a,b>|segments:<a,b>
  megamail --import <file.csv> --consent [--list <name>] [--allow-update]

Options:
  --config <file>   settings file (default: <config dir>/megamail/config.toml)
  --verbose         also log to the console";

/// Value following `flag`, if the flag is present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .filter(|v| !v.starts_with("--"))
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn usage_error(message: &str) -> i32 {
    eprintln!("megamail: {}\n\n{}", message, USAGE);
    EXIT_USAGE
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return;
    }

    let config_file = flag_value(&args, "--config").map(PathBuf::from);
    let config_file = config_file.as_deref();
    let verbose = has_flag(&args, "--verbose");

    // Render the campaign body for a draft file without writing anything.
    if has_flag(&args, "--preview") {
        let code = match flag_value(&args, "--preview") {
            Some(draft) => megamail_client::run_preview(Path::new(draft), config_file, verbose),
            None => usage_error("--preview needs a draft file"),
        };
        std::process::exit(code);
    }

    // Create (or, with --campaign, update) a campaign from a draft file.
    if has_flag(&args, "--send") {
        let code = match flag_value(&args, "--send") {
            Some(draft) => {
                let campaign = flag_value(&args, "--campaign").map(str::to_string);
                megamail_client::run_send(Path::new(draft), campaign, config_file, verbose)
            }
            None => usage_error("--send needs a draft file"),
        };
        std::process::exit(code);
    }

    if has_flag(&args, "--count") {
        let code = match flag_value(&args, "--count") {
            Some(target) => megamail_client::run_count(target, config_file, verbose),
            None => usage_error("--count needs a target"),
        };
        std::process::exit(code);
    }

    if has_flag(&args, "--import") {
        let code = match flag_value(&args, "--import") {
            Some(file) => megamail_client::run_import(
                ImportArgs {
                    file: PathBuf::from(file),
                    consent: has_flag(&args, "--consent"),
                    list_name: flag_value(&args, "--list").map(str::to_string),
                    allow_update: has_flag(&args, "--allow-update"),
                },
                config_file,
                verbose,
            ),
            None => usage_error("--import needs a CSV file"),
        };
        std::process::exit(code);
    }

    std::process::exit(usage_error("no command given"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(a: &[&str]) -> Vec<String> {
        a.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flag_value_reads_next_argument() {
        let a = args(&["megamail", "--send", "d.toml", "--campaign", "Spring"]);
        assert_eq!(flag_value(&a, "--send"), Some("d.toml"));
        assert_eq!(flag_value(&a, "--campaign"), Some("Spring"));
        assert_eq!(flag_value(&a, "--list"), None);
    }

    #[test]
    fn flag_value_ignores_following_flag() {
        let a = args(&["megamail", "--import", "--consent"]);
        assert_eq!(flag_value(&a, "--import"), None);
        assert!(has_flag(&a, "--consent"));
    }
}
