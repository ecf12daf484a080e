use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::Result;

pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let upstream_url = matches
        .get_one("upstream-url")
        .map(|s: &String| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --upstream-url"))?;

    let mut globals = GlobalArgs::new(upstream_url);

    if let Some(cookie_name) = matches.get_one::<String>("cookie-name") {
        globals.cookie_name = cookie_name.to_string();
    }

    if let Some(origin) = matches.get_one::<String>("frontend-origin") {
        globals.frontend_origin = origin.to_string();
    }

    globals.federation_client_id = matches
        .get_one::<String>("federation-client-id")
        .map(ToString::to_string);

    let action = Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
    };

    Ok((action, globals))
}
