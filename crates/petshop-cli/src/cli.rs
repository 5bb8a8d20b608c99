use std::path::PathBuf;

use petshop::{Locale, NewReservation, PetFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Pets,
    Like,
    Reserve,
    Notifications,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help(HelpTopic),
    Pets(PetFilter),
    Like(LikeArgs),
    Reserve(NewReservation),
    Notifications(NotificationsCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeArgs {
    pub user: String,
    pub pet: String,
    pub unlike: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationsCommand {
    List { id: Option<String> },
    Unread,
    MarkRead,
}

/// Parsed command line: global options plus one command.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub config: Option<PathBuf>,
    pub locale: Locale,
    pub command: Command,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Invocation> {
    let mut config = None;
    let mut locale = Locale::default();
    let mut rest: Vec<&str> = Vec::new();

    // Global options may appear anywhere.
    let mut it = args.iter().skip(1).map(|s| s.as_str());
    while let Some(token) = it.next() {
        match token {
            "--config" => config = Some(PathBuf::from(value(&mut it, token)?)),
            _ if token.starts_with("--config=") => {
                config = Some(PathBuf::from(token.trim_start_matches("--config=")));
            }
            "--lang" => locale = Locale::parse(value(&mut it, token)?),
            _ if token.starts_with("--lang=") => {
                locale = Locale::parse(token.trim_start_matches("--lang="));
            }
            _ => rest.push(token),
        }
    }

    let mut it = rest.into_iter();
    let command = match it.next() {
        None | Some("-h" | "--help" | "help") => Command::Help(HelpTopic::Root),
        Some("pets") => parse_pets(it)?,
        Some("like") => parse_like(it)?,
        Some("reserve") => parse_reserve(it)?,
        Some("notifications") => parse_notifications(it)?,
        Some(other) => anyhow::bail!("unknown command: {other}"),
    };

    Ok(Invocation {
        config,
        locale,
        command,
    })
}

fn value<'a>(it: &mut impl Iterator<Item = &'a str>, flag: &str) -> anyhow::Result<&'a str> {
    match it.next() {
        Some(v) if !v.starts_with("--") => Ok(v),
        _ => anyhow::bail!("{flag} requires a value"),
    }
}

fn parse_pets<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut filter = PetFilter::default();
    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Pets)),
            "--id" => filter.id = value(&mut it, token)?.to_string(),
            "--name" => filter.name = value(&mut it, token)?.to_string(),
            "--breed" => filter.breed = value(&mut it, token)?.to_string(),
            "--gender" => filter.gender = value(&mut it, token)?.to_string(),
            "--reference-number" => filter.reference_number = value(&mut it, token)?.to_string(),
            "--price" => {
                let raw = value(&mut it, token)?;
                filter.price = raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("--price expects a number, got {raw:?}"))?;
            }
            other => anyhow::bail!("unknown argument for pets: {other}"),
        }
    }
    Ok(Command::Pets(filter))
}

fn parse_like<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut user = None;
    let mut pet = None;
    let mut unlike = false;
    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Like)),
            "--user" => user = Some(value(&mut it, token)?.to_string()),
            "--pet" => pet = Some(value(&mut it, token)?.to_string()),
            "--unlike" => unlike = true,
            other => anyhow::bail!("unknown argument for like: {other}"),
        }
    }
    let Some(user) = user else {
        anyhow::bail!("like requires --user");
    };
    let Some(pet) = pet else {
        anyhow::bail!("like requires --pet");
    };
    Ok(Command::Like(LikeArgs { user, pet, unlike }))
}

fn parse_reserve<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut input = NewReservation::default();
    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Reserve)),
            "--user" => input.user_id = value(&mut it, token)?.to_string(),
            "--pet" => input.pet_id = value(&mut it, token)?.to_string(),
            "--email" => input.email = value(&mut it, token)?.to_string(),
            "--name" => input.full_name = value(&mut it, token)?.to_string(),
            "--date" => input.reservation_date = value(&mut it, token)?.to_string(),
            other => anyhow::bail!("unknown argument for reserve: {other}"),
        }
    }
    for (flag, v) in [
        ("--user", &input.user_id),
        ("--pet", &input.pet_id),
        ("--email", &input.email),
        ("--name", &input.full_name),
        ("--date", &input.reservation_date),
    ] {
        if v.is_empty() {
            anyhow::bail!("reserve requires {flag}");
        }
    }
    Ok(Command::Reserve(input))
}

fn parse_notifications<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut subcmd: Option<&str> = None;
    let mut id = None;
    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Notifications)),
            "unread" | "mark-read" if subcmd.is_none() => subcmd = Some(token),
            "--id" => id = Some(value(&mut it, token)?.to_string()),
            other => anyhow::bail!("unknown argument for notifications: {other}"),
        }
    }
    let cmd = match (subcmd, id) {
        (None, id) => NotificationsCommand::List { id },
        (Some(sub), Some(_)) => anyhow::bail!("--id cannot be combined with {sub}"),
        (Some("unread"), None) => NotificationsCommand::Unread,
        (Some(_), None) => NotificationsCommand::MarkRead,
    };
    Ok(Command::Notifications(cmd))
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
petshop - pet listings, likes, reservations and notifications

USAGE:
  petshop <COMMAND> [OPTIONS]

COMMANDS:
  pets            List pets, optionally filtered
  like            Like or unlike a pet for a user
  reserve         Create a reservation
  notifications   List notifications, count unread, or mark all read

GLOBAL OPTIONS:
  --config <FILE>   TOML config file (default: environment variables)
  --lang <en|ja>    Language of business messages (default: en)
  -h, --help        Print help

Run `petshop <command> --help` for more."
            );
        }
        HelpTopic::Pets => {
            println!(
                "\
USAGE:
  petshop pets [OPTIONS]

OPTIONS:
  --id <ID>
  --name <NAME>
  --breed <BREED>
  --gender <male|female>
  --price <PRICE>
  --reference-number <REF>

Empty values and a price of 0 are ignored."
            );
        }
        HelpTopic::Like => {
            println!(
                "\
USAGE:
  petshop like --user <USER> --pet <PET> [--unlike]"
            );
        }
        HelpTopic::Reserve => {
            println!(
                "\
USAGE:
  petshop reserve --user <USER> --pet <PET> --email <EMAIL> --name <FULL NAME> --date <YYYYMMDD>"
            );
        }
        HelpTopic::Notifications => {
            println!(
                "\
USAGE:
  petshop notifications [--id <ID>]
  petshop notifications unread
  petshop notifications mark-read"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("petshop")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn no_arguments_prints_help() {
        let inv = parse_args(&args(&[])).unwrap();
        assert_eq!(inv.command, Command::Help(HelpTopic::Root));
        assert_eq!(inv.config, None);
    }

    #[test]
    fn parse_pets_filter() {
        let inv = parse_args(&args(&[
            "pets", "--gender", "female", "--price", "1200.5", "--breed", "Corgi",
        ]))
        .unwrap();
        let Command::Pets(filter) = inv.command else {
            panic!("expected pets");
        };
        assert_eq!(filter.gender, "female");
        assert_eq!(filter.price, 1200.5);
        assert_eq!(filter.breed, "Corgi");
        assert!(filter.name.is_empty());
    }

    #[test]
    fn global_options_anywhere() {
        let inv = parse_args(&args(&[
            "like", "--user", "u1", "--config", "petshop.toml", "--pet", "p1", "--lang=ja",
            "--unlike",
        ]))
        .unwrap();
        assert_eq!(inv.config, Some(PathBuf::from("petshop.toml")));
        assert_eq!(inv.locale, Locale::Ja);
        assert_eq!(
            inv.command,
            Command::Like(LikeArgs {
                user: "u1".into(),
                pet: "p1".into(),
                unlike: true,
            })
        );
    }

    #[test]
    fn like_requires_user_and_pet() {
        let err = parse_args(&args(&["like", "--pet", "p1"])).unwrap_err();
        assert!(err.to_string().contains("--user"));
        let err = parse_args(&args(&["like", "--user"])).unwrap_err();
        assert!(err.to_string().contains("requires a value"));
    }

    #[test]
    fn reserve_requires_every_field() {
        let err = parse_args(&args(&[
            "reserve", "--user", "u1", "--pet", "p1", "--email", "a@example.com", "--name", "A",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("--date"));
    }

    #[test]
    fn parse_notification_subcommands() {
        let cmd = |list: &[&str]| parse_args(&args(list)).unwrap().command;
        assert_eq!(
            cmd(&["notifications"]),
            Command::Notifications(NotificationsCommand::List { id: None })
        );
        assert_eq!(
            cmd(&["notifications", "--id", "7"]),
            Command::Notifications(NotificationsCommand::List {
                id: Some("7".into())
            })
        );
        assert_eq!(
            cmd(&["notifications", "unread"]),
            Command::Notifications(NotificationsCommand::Unread)
        );
        assert_eq!(
            cmd(&["notifications", "mark-read"]),
            Command::Notifications(NotificationsCommand::MarkRead)
        );
        assert!(parse_args(&args(&["notifications", "unread", "--id", "7"])).is_err());
    }

    #[test]
    fn unknown_command_is_an_error() {
        let err = parse_args(&args(&["adopt"])).unwrap_err();
        assert_eq!(err.to_string(), "unknown command: adopt");
    }
}
