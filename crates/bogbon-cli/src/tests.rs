use super::*;

#[test]
fn parses_ping_command() {
    let cli = Cli::try_parse_from(["bogbon-cli", "ping"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Ping)));
}

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["bogbon-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Migrate)));
}

#[test]
fn seed_path_defaults_to_none() {
    let cli = Cli::try_parse_from(["bogbon-cli", "seed"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Seed { path: None })));
}

#[test]
fn seed_accepts_explicit_path() {
    let cli = Cli::try_parse_from(["bogbon-cli", "seed", "--path", "/tmp/catalog.yaml"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Seed { path: Some(ref p) }) if p == &PathBuf::from("/tmp/catalog.yaml")
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["bogbon-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["bogbon-cli", "collect"]).is_err());
}
