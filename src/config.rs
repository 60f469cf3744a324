//! Command-line argument parsing, via `argh` -- the CLI crate the
//! teacher's `Cargo.toml` actually declares (one retrieved snapshot of
//! this file used `clap` instead; that's a stale fragment, not this
//! manifest's crate).

use argh::FromArgs;

use crate::messages::DebugLevel;

#[derive(FromArgs)]
/// ncvm: a small concatenative virtual machine in the Forth family.
struct Args {
    /// diagnostic verbosity: error, warning, info, debug (default: error)
    #[argh(option, default = "String::from(\"error\")")]
    debug_level: String,

    /// skip loading bootstrap.ncvm at startup
    #[argh(switch)]
    no_bootstrap: bool,

    /// run this script non-interactively, then enter the REPL
    #[argh(positional)]
    script: Option<String>,
}

pub struct Config {
    pub debug_level: DebugLevel,
    pub no_bootstrap: bool,
    pub script: Option<String>,
}

impl Config {
    pub fn from_env() -> Config {
        let args: Args = argh::from_env();
        Config::from_args(args)
    }

    fn from_args(args: Args) -> Config {
        let debug_level = match args.debug_level.as_str() {
            "debug" => DebugLevel::Debug,
            "info" => DebugLevel::Info,
            "warning" => DebugLevel::Warning,
            _ => DebugLevel::Error,
        };
        Config {
            debug_level,
            no_bootstrap: args.no_bootstrap,
            script: args.script,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_debug_level_falls_back_to_error() {
        let args = Args {
            debug_level: "bogus".to_string(),
            no_bootstrap: false,
            script: None,
        };
        let config = Config::from_args(args);
        assert_eq!(config.debug_level, DebugLevel::Error);
    }

    #[test]
    fn recognizes_each_debug_level() {
        for (text, expected) in [
            ("debug", DebugLevel::Debug),
            ("info", DebugLevel::Info),
            ("warning", DebugLevel::Warning),
            ("error", DebugLevel::Error),
        ] {
            let args = Args {
                debug_level: text.to_string(),
                no_bootstrap: false,
                script: None,
            };
            assert_eq!(Config::from_args(args).debug_level, expected);
        }
    }
}
