//! Generates an Icinga2 `CheckCommand` object from a clap command definition, so the
//! monitoring side never drifts from the plugin's real options.

use clap::ArgAction;

/// Set this variable to make a plugin print its Icinga2 command definition instead of running.
pub const GENERATE_ENV: &str = "GENERATE_ICINGA_COMMAND";

pub struct CommandDescription {
    prefix: String,
    arguments: Vec<ArgumentDescription>,
}

pub struct ArgumentDescription {
    flag: String,
    var: String,
    description: Option<String>,
    is_switch: bool,
    required: bool,
    default_value: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ToIcingaCommandError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid executable path")]
    InvalidExecutablePath,
    #[error("argument '{0}' has no long option")]
    MissingLongArgument(String),
}

impl CommandDescription {
    /// Collects every option of `cmd`; help and version flags are left out. Variables are
    /// named `<prefix>_<long option>`.
    pub fn from_command(prefix: &str, cmd: &clap::Command) -> Result<Self, ToIcingaCommandError> {
        let mut arguments = Vec::new();

        for arg in cmd.get_arguments() {
            if matches!(
                arg.get_action(),
                ArgAction::Help | ArgAction::HelpShort | ArgAction::HelpLong | ArgAction::Version
            ) {
                continue;
            }

            let long = arg
                .get_long()
                .ok_or_else(|| ToIcingaCommandError::MissingLongArgument(arg.get_id().to_string()))?;

            let default_value = arg
                .get_default_values()
                .first()
                .and_then(|v| v.to_str())
                .map(|s| s.to_owned());

            arguments.push(ArgumentDescription {
                flag: format!("--{long}"),
                var: format!("{}_{}", prefix, long.replace('-', "_")),
                description: arg.get_help().map(|s| s.to_string()),
                is_switch: matches!(arg.get_action(), ArgAction::SetTrue | ArgAction::Count),
                required: arg.is_required_set(),
                default_value,
            });
        }

        Ok(CommandDescription {
            prefix: prefix.to_owned(),
            arguments,
        })
    }

    /// Renders the `CheckCommand` object for the plugin at `executable`.
    pub fn to_icinga_command(&self, executable: &str) -> String {
        let mut out = format!("object CheckCommand \"{}\" {{\n", self.prefix);
        out.push_str(&format!("  command = [ \"{}\" ]\n", escape_string(executable)));
        out.push_str("  arguments = {\n");

        for arg in &self.arguments {
            out.push_str(&format!("    \"{}\" = {{\n", arg.flag));

            if arg.is_switch {
                out.push_str(&format!("      set_if = \"${}$\"\n", arg.var));
            } else {
                out.push_str(&format!("      value = \"${}$\"\n", arg.var));
            }

            if arg.required {
                out.push_str("      required = true\n");
            }

            if let Some(description) = &arg.description {
                out.push_str(&format!(
                    "      description = \"{}\"\n",
                    escape_string(description)
                ));
            }

            out.push_str("    }\n");
        }
        out.push_str("  }\n");

        let defaults: Vec<_> = self
            .arguments
            .iter()
            .filter_map(|a| a.default_value.as_ref().map(|d| (&a.var, d)))
            .collect();
        if !defaults.is_empty() {
            out.push('\n');
            for (var, default_value) in defaults {
                out.push_str(&format!("  vars.{} = \"{}\"\n", var, escape_string(default_value)));
            }
        }

        out.push_str("}\n");
        out
    }
}

fn escape_string(s: &str) -> String {
    ["\\", "\"", "$"]
        .iter()
        .fold(s.to_string(), |acc, c| acc.replace(c, &format!("\\{}", c)))
}

/// Prints the Icinga2 command configuration and exits if [GENERATE_ENV] is set, returns
/// otherwise.
pub fn print_icinga_command_config_if_env_and_exit(
    prefix: &str,
    cmd: &clap::Command,
) -> Result<(), ToIcingaCommandError> {
    if std::env::var_os(GENERATE_ENV).is_none() {
        return Ok(());
    }

    let executable = std::env::current_exe()?
        .to_str()
        .ok_or(ToIcingaCommandError::InvalidExecutablePath)?
        .to_owned();

    let description = CommandDescription::from_command(prefix, cmd)?;
    println!("{}", description.to_icinga_command(&executable).trim());
    std::process::exit(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, Command};

    fn command() -> Command {
        Command::new("check_demo")
            .version("1.0")
            .arg(
                Arg::new("host")
                    .short('H')
                    .long("host")
                    .required(true)
                    .help("Host \"name\""),
            )
            .arg(Arg::new("timeout").long("timeout").default_value("10"))
            .arg(Arg::new("verify-ssl").long("verify-ssl").action(ArgAction::SetTrue))
            .arg(Arg::new("verbose").short('v').long("verbose").action(ArgAction::Count))
    }

    #[test]
    fn test_to_icinga_command() {
        let description = CommandDescription::from_command("demo", &command()).unwrap();
        let out = description.to_icinga_command("/usr/lib/nagios/plugins/check_demo");

        assert!(out.starts_with("object CheckCommand \"demo\" {\n"));
        assert!(out.contains("  command = [ \"/usr/lib/nagios/plugins/check_demo\" ]\n"));
        assert!(out.contains(
            "    \"--host\" = {\n      value = \"$demo_host$\"\n      required = true\n      description = \"Host \\\"name\\\"\"\n    }\n"
        ));
        assert!(out.contains("    \"--verify-ssl\" = {\n      set_if = \"$demo_verify_ssl$\"\n"));
        assert!(out.contains("      set_if = \"$demo_verbose$\"\n"));
        assert!(out.contains("  vars.demo_timeout = \"10\"\n"));
        assert!(!out.contains("--help"));
        assert!(!out.contains("--version"));
    }

    #[test]
    fn test_positional_arguments_are_rejected() {
        let cmd = Command::new("demo").arg(Arg::new("file"));
        assert!(matches!(
            CommandDescription::from_command("demo", &cmd),
            Err(ToIcingaCommandError::MissingLongArgument(_))
        ));
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("a\"b$c"), "a\\\"b\\$c");
    }
}
