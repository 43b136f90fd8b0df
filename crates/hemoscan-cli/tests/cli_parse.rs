//! Argument parsing

use clap::Parser;
use hemoscan_cli::{Cli, Commands, GenderArg, OutputFormat};
use hemoscan_resilience::Gender;
use pretty_assertions::assert_eq;

#[test]
fn submit_parses_patient_attributes() {
    let cli = Cli::try_parse_from([
        "hemoscan", "submit", "hemograma.pdf", "--gender", "feminino", "--age", "41",
    ])
    .unwrap();

    let Commands::Submit(args) = cli.command else {
        panic!("expected submit");
    };
    assert_eq!(args.file.to_str(), Some("hemograma.pdf"));
    assert_eq!(args.gender, GenderArg::Feminino);
    assert_eq!(Gender::from(args.gender), Gender::Female);
    assert_eq!(args.age, 41);
}

#[test]
fn english_gender_aliases_are_accepted() {
    let cli = Cli::try_parse_from(["hemoscan", "submit", "a.pdf", "-g", "male", "-a", "60"]).unwrap();
    let Commands::Submit(args) = cli.command else {
        panic!("expected submit");
    };
    assert_eq!(Gender::from(args.gender), Gender::Male);
}

#[test]
fn implausible_age_is_rejected() {
    let result = Cli::try_parse_from([
        "hemoscan", "submit", "a.pdf", "--gender", "feminino", "--age", "400",
    ]);
    assert!(result.is_err());
}

#[test]
fn submit_requires_gender() {
    let result = Cli::try_parse_from(["hemoscan", "submit", "a.pdf", "--age", "30"]);
    assert!(result.is_err());
}

#[test]
fn global_flags_work_after_the_subcommand() {
    let cli = Cli::try_parse_from([
        "hemoscan",
        "status",
        "--url",
        "http://lab.example:8000",
        "--format",
        "json",
        "--no-color",
        "-v",
    ])
    .unwrap();

    assert!(matches!(cli.command, Commands::Status));
    assert_eq!(cli.url.as_deref(), Some("http://lab.example:8000"));
    assert_eq!(cli.format, OutputFormat::Json);
    assert!(cli.no_color);
    assert!(cli.verbose);
}

#[test]
fn watch_defaults_to_reachability_polling() {
    let cli = Cli::try_parse_from(["hemoscan", "watch"]).unwrap();
    let Commands::Watch(args) = cli.command else {
        panic!("expected watch");
    };
    assert!(!args.no_reachability);
    assert_eq!(cli.format, OutputFormat::Human);
}
