use chartgate::handlers::{
    handle_check_host, handle_fetch, handle_init, handle_translate, init_tracing, print_banner,
};
use colored::Colorize;
use commands::command_argument_builder;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    init_tracing(chosen_command.get_count("verbose"));

    // Show banner unless --quiet flag is set
    if !chosen_command.get_flag("quiet") {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("translate", primary_command)) => handle_translate(primary_command),
        Some(("check-host", primary_command)) => handle_check_host(primary_command),
        Some(("fetch", primary_command)) => handle_fetch(primary_command).await,
        None => return,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
