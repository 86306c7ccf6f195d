use crate::CLAP_STYLING;
use chartgate_core::config::DEFAULT_CONFIG_PATH;
use clap::{arg, command};
use std::path::PathBuf;

fn config_arg() -> clap::Arg {
    arg!(-c --"config" <PATH>)
        .required(false)
        .help("Mediator configuration file")
        .default_value(DEFAULT_CONFIG_PATH)
}

fn domain_arg() -> clap::Arg {
    arg!(-d --"domain" <HOST>)
        .required(false)
        .help("Host used for URLs without one (the wiki rendering the chart)")
        .default_value("en.wikipedia.org")
}

fn lang_arg() -> clap::Arg {
    arg!(-l --"lang" <CODE>)
        .required(false)
        .help("Site language for tabular: and map: requests")
}

fn urls_arg() -> clap::Arg {
    arg!([URL] ...)
        .required_unless_present("urls-file")
        .help("Chart-spec URLs, e.g. wikiraw:///Main_Page")
}

fn urls_file_arg() -> clap::Arg {
    arg!(-f --"urls-file" <PATH>)
        .required(false)
        .help("Path to a newline-delimited file of chart-spec URLs")
        .value_parser(clap::value_parser!(PathBuf))
}

fn trusted_arg() -> clap::Arg {
    arg!(--"trusted")
        .required(false)
        .help("Treat the chart as trusted and allow raw http/https URLs")
        .action(clap::ArgAction::SetTrue)
}

fn json_arg() -> clap::Arg {
    arg!(--"json")
        .required(false)
        .help("Print results as JSON")
        .action(clap::ArgAction::SetTrue)
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("chartgate")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("chartgate")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" ... "Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Writes a starter mediator configuration")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Where to write the configuration")
                        .default_value(DEFAULT_CONFIG_PATH),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite an existing configuration without asking")
                        .required(false),
                ),
        )
        .subcommand(
            command!("translate")
                .about(
                    "Translates chart-spec URLs into the concrete requests they would make, \
                without touching the network.",
                )
                .arg(urls_arg())
                .arg(urls_file_arg())
                .arg(config_arg())
                .arg(domain_arg())
                .arg(lang_arg())
                .arg(trusted_arg())
                .arg(json_arg())
                .arg(
                    arg!(-n --"navigate")
                        .required(false)
                        .help("Translate as link targets instead of data loads")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("check-host")
                .about("Shows how hosts are remapped and which transport they are allowed over")
                .arg(arg!(<HOST> ...).required(true).help("Host names or aliases"))
                .arg(config_arg()),
        )
        .subcommand(
            command!("fetch")
                .about("Loads chart data through the mediator and prints the normalized result")
                .arg(urls_arg())
                .arg(urls_file_arg())
                .arg(config_arg())
                .arg(domain_arg())
                .arg(lang_arg())
                .arg(trusted_arg())
                .arg(json_arg())
                .arg(
                    arg!(--"origin" <ORIGIN>)
                        .required(false)
                        .help("CORS origin sent with wiki API calls"),
                )
                .arg(
                    arg!(-t --"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_is_consistent() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn translate_accepts_file_instead_of_urls() {
        let matches = command_argument_builder()
            .try_get_matches_from(["chartgate", "translate", "-f", "urls.txt", "--navigate"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "translate");
        assert!(sub.get_flag("navigate"));
        assert_eq!(sub.get_one::<String>("domain").unwrap(), "en.wikipedia.org");
    }

    #[test]
    fn translate_requires_input() {
        let result = command_argument_builder().try_get_matches_from(["chartgate", "translate"]);
        assert!(result.is_err());
    }

    #[test]
    fn fetch_parses_timeout() {
        let matches = command_argument_builder()
            .try_get_matches_from(["chartgate", "-vv", "fetch", "wikiraw:///A", "-t", "3"])
            .unwrap();
        assert_eq!(matches.get_count("verbose"), 2);
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(*sub.get_one::<u64>("timeout").unwrap(), 3);
        let urls: Vec<&String> = sub.get_many::<String>("URL").unwrap().collect();
        assert_eq!(urls, vec!["wikiraw:///A"]);
    }
}
