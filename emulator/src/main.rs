mod session;

use std::env;
use std::io;
use std::process;

use session::{Session, SessionOptions};

const USAGE: &str = "Usage: jiggler-emulator [--cycles <n>] [--time-scale <x>] [--suspended]";

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let mut stdout = io::stdout().lock();
    let mut session = Session::new(options);
    session.run(&mut stdout)
}

fn parse_options<I>(args: I) -> Result<SessionOptions, String>
where
    I: IntoIterator<Item = String>,
{
    let mut options = SessionOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };

        match flag.as_str() {
            "--cycles" => {
                let value = flag_value(&flag, inline, &mut args)?;
                options.cycles = value
                    .parse()
                    .map_err(|_| format!("Invalid cycle count `{value}`"))?;
            }
            "--time-scale" => {
                let value = flag_value(&flag, inline, &mut args)?;
                options.time_scale = value
                    .parse()
                    .ok()
                    .filter(|scale: &u32| *scale > 0)
                    .ok_or_else(|| format!("Invalid time scale `{value}`"))?;
            }
            "--suspended" => options.start_suspended = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                process::exit(0);
            }
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }

    Ok(options)
}

fn flag_value<I>(flag: &str, inline: Option<String>, args: &mut I) -> Result<String, String>
where
    I: Iterator<Item = String>,
{
    inline
        .or_else(|| args.next())
        .ok_or_else(|| format!("Expected value after {flag}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| (*arg).to_string()).collect()
    }

    #[test]
    fn defaults_apply_without_flags() {
        let options = parse_options(Vec::new()).expect("defaults");
        assert_eq!(options, SessionOptions::default());
    }

    #[test]
    fn flags_accept_separate_and_inline_values() {
        let options =
            parse_options(args(&["--cycles", "5", "--time-scale=120", "--suspended"])).expect("parse");
        assert_eq!(options.cycles, 5);
        assert_eq!(options.time_scale, 120);
        assert!(options.start_suspended);
    }

    #[test]
    fn zero_time_scale_is_rejected() {
        assert!(parse_options(args(&["--time-scale", "0"])).is_err());
        assert!(parse_options(args(&["--cycles"])).is_err());
        assert!(parse_options(args(&["--bogus"])).is_err());
    }
}
