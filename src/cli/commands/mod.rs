use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("pordego")
        .about("Role-aware authentication gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("PORDEGO_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("upstream-url")
                .short('u')
                .long("upstream-url")
                .help("Upstream identity service base URL, example: http://identity.internal:5000")
                .env("PORDEGO_UPSTREAM_URL")
                .required(true),
        )
        .arg(
            Arg::new("cookie-name")
                .long("cookie-name")
                .help("Name of the session cookie issued by the upstream service")
                .default_value("session")
                .env("PORDEGO_COOKIE_NAME"),
        )
        .arg(
            Arg::new("frontend-origin")
                .long("frontend-origin")
                .help("Browser origin allowed to call the gateway with credentials")
                .default_value("http://localhost:5173")
                .env("PORDEGO_FRONTEND_ORIGIN"),
        )
        .arg(
            Arg::new("federation-client-id")
                .long("federation-client-id")
                .help("Third-party identity client id; federated sign-in is disabled when unset")
                .env("PORDEGO_FEDERATION_CLIENT_ID"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("PORDEGO_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
