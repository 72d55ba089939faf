use clap::{crate_version, Arg, ArgMatches, Command};

use super::{LogFormat, LogLevel};

/// Low-level `clap` object which provides with `value_source` which
/// indicates whether an option was set by the user (cli/env) or by the
/// default value.
pub(super) fn get_matches() -> ArgMatches {
    command().get_matches()
}

pub(super) fn command() -> Command {
    Command::new("mutate")
        .about("Runs mutations against schema-governed collections")
        .version(crate_version!()) // pick the version from `Cargo.toml`
        .propagate_version(true)
        .subcommand(
            Command::new("run")
                .about("Run a JSON-lines mutation script")
                .arg(
                    Arg::new("script")
                        .help("Path to the script, - for stdin")
                        .value_name("SCRIPT")
                        .required(true)
                        .value_parser(clap::value_parser!(String)),
                ),
        )
        .subcommand(
            Command::new("form")
                .about("Print the composed form of a collection")
                .arg(
                    Arg::new("collection")
                        .help("Collection name")
                        .value_name("COLLECTION")
                        .required(true)
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    Arg::new("document-id")
                        .help("Document to edit, a new document form is printed otherwise")
                        .long("document-id")
                        .value_name("DOCUMENT_ID")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    Arg::new("fields")
                        .help("Restrict the form to these fields")
                        .long("fields")
                        .value_name("FIELDS")
                        .value_parser(clap::value_parser!(String))
                        .value_delimiter(','),
                )
                .arg(
                    Arg::new("added-fields")
                        .help("Extra fields to request")
                        .long("added-fields")
                        .value_name("ADDED_FIELDS")
                        .value_parser(clap::value_parser!(String))
                        .value_delimiter(','),
                ),
        )
        .arg(
            Arg::new("root-dir")
                .help("Root directory holding the config file and collection definitions")
                .short('r')
                .long("root-dir")
                .value_name("ROOT_DIR")
                .env("MUTATE_ROOT_DIR")
                .value_parser(clap::value_parser!(String))
                .default_value("~/.mutate"),
        )
        .arg(
            Arg::new("collections-dir")
                .help("Directory of collection definitions")
                .long("collections-dir")
                .value_name("COLLECTIONS_DIR")
                .env("MUTATE_COLLECTIONS_DIR")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("log-level")
                .help("Log level")
                .long("log-level")
                .value_name("LOG_LEVEL")
                .env("MUTATE_LOG_LEVEL")
                .value_parser(clap::builder::EnumValueParser::<LogLevel>::new())
                .default_value("INFO"),
        )
        .arg(
            Arg::new("log-format")
                .help("Log format")
                .long("log-format")
                .value_name("LOG_FORMAT")
                .env("MUTATE_LOG_FORMAT")
                .value_parser(clap::builder::EnumValueParser::<LogFormat>::new())
                .default_value("PRETTY"),
        )
}
