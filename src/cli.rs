use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use getopts::Options;

pub struct Args {
    pub config: PathBuf,
    pub address: SocketAddr,
    pub debug: bool,
    pub json: bool,
    pub validate: bool,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optflag("V", "version", "Print version and exit");
    opts.optopt(
        "c",
        "config",
        "Configuration file, YAML or TOML [Default: config.yaml]",
        "FILE",
    );
    opts.optopt(
        "a",
        "address",
        "Socket address (IP and port) to listen on [Default: 0.0.0.0:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optopt(
        "p",
        "port",
        "Port to listen on, overrides the port of --address",
        "PORT",
    );
    opts.optflag("d", "debug", "Enable debug logging");
    opts.optflag("j", "json", "Output logs in JSON format");
    opts.optflag("", "validate", "Validate the configuration and exit");
    opts
}

pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    let matches = match opts.parse(args) {
        Ok(matches) => matches,
        Err(fail) => {
            eprintln!("{fail}");
            process::exit(1);
        }
    };

    if matches.opt_present("help") {
        println!("{}", opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME"))));
        process::exit(0);
    }

    if matches.opt_present("version") {
        println!("version: {}", env!("CARGO_PKG_VERSION"));
        process::exit(0);
    }

    let config = matches
        .opt_str("config")
        .map_or_else(|| PathBuf::from("config.yaml"), PathBuf::from);

    let mut address = match matches.opt_get_default("address", SocketAddr::from(([0, 0, 0, 0], 8080)))
    {
        Ok(address) => address,
        Err(err) => {
            eprintln!("Provided value for option 'address' is invalid: {err}");
            process::exit(1);
        }
    };

    match matches.opt_get::<u16>("port") {
        Ok(Some(port)) => address.set_port(port),
        Ok(None) => {}
        Err(err) => {
            eprintln!("Provided value for option 'port' is invalid: {err}");
            process::exit(1);
        }
    }

    Args {
        config,
        address,
        debug: matches.opt_present("debug"),
        json: matches.opt_present("json"),
        validate: matches.opt_present("validate"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn defaults() {
        let parsed = parse(Vec::new());

        assert_eq!(parsed.config, PathBuf::from("config.yaml"));
        assert_eq!(parsed.address, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert!(!parsed.debug);
        assert!(!parsed.json);
        assert!(!parsed.validate);
    }

    #[test]
    fn port_overrides_address() {
        let parsed = parse(args(&["-a", "127.0.0.1:9000", "--port", "9999", "-c", "calendars.toml"]));

        assert_eq!(parsed.address, SocketAddr::from(([127, 0, 0, 1], 9999)));
        assert_eq!(parsed.config, PathBuf::from("calendars.toml"));
    }

    #[test]
    fn flags() {
        let parsed = parse(args(&["--debug", "--json", "--validate"]));

        assert!(parsed.debug);
        assert!(parsed.json);
        assert!(parsed.validate);
    }
}
