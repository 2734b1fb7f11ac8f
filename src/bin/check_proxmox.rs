use std::process;
use std::time::Duration;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{ArgGroup, CommandFactory, Parser};

use pvemon::cluster::{ConnectOptions, PveClient};
use pvemon::logging;
use pvemon::probe::{self, Check, CheckRequest, VmSelector};
use pvemon::{Range, Resource, Runner, State, Thresholds};

/// Checks the state of a Proxmox VE node, one of its services or VMs, its memory usage or its
/// subscription.
#[derive(Debug, Parser)]
#[clap(version, about)]
#[clap(group(
    ArgGroup::new("check")
        .args(["service", "mem_usage", "sub_status", "vm_name", "vm_id"])
        .multiple(false)
))]
struct Cli {
    /// Proxmox VE host, optionally with a port
    #[clap(short = 'H', long)]
    host: String,

    /// Node to check
    #[clap(short = 'N', long, value_parser = probe::parse_node_name)]
    node: String,

    /// API user including the realm
    #[clap(short, long, default_value = "root@pam")]
    username: String,

    /// API password
    #[clap(short, long)]
    password: String,

    /// Seconds to wait for the API
    #[clap(short, long, default_value = "10")]
    timeout: u64,

    /// Verify the TLS certificate of the API
    #[clap(short = 'S', long)]
    verify_ssl: bool,

    /// Warning range for the memory usage rate
    #[clap(short, long, requires = "mem_usage")]
    warning: Option<Range>,

    /// Critical range for the memory usage rate
    #[clap(short, long, requires = "mem_usage")]
    critical: Option<Range>,

    /// Check a service on the node
    #[clap(short, long)]
    service: Option<String>,

    /// Check the memory usage of the node
    #[clap(short, long)]
    mem_usage: bool,

    /// Check the subscription status of the node
    #[clap(short = 'b', long)]
    sub_status: bool,

    /// Check a VM by name
    #[clap(long)]
    vm_name: Option<String>,

    /// Check a VM by id
    #[clap(long)]
    vm_id: Option<u32>,

    /// List the nodes of the cluster
    #[clap(short, long)]
    list_nodes: bool,

    /// List the services of the node
    #[clap(short = 'z', long)]
    list_services: bool,

    /// List the VMs of the node
    #[clap(long)]
    list_vms: bool,

    /// More diagnostics on stderr, repeat for more
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            host: self.host.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            verify_ssl: self.verify_ssl,
            timeout: Duration::from_secs(self.timeout),
        }
    }

    fn check(&self) -> Check {
        if let Some(name) = &self.service {
            Check::Service { name: name.clone() }
        } else if self.mem_usage {
            Check::Memory(Thresholds::new(
                self.warning.clone().unwrap_or_default(),
                self.critical.clone().unwrap_or_default(),
            ))
        } else if self.sub_status {
            Check::Subscription
        } else if let Some(name) = &self.vm_name {
            Check::Vm(VmSelector::Name(name.clone()))
        } else if let Some(id) = self.vm_id {
            Check::Vm(VmSelector::Id(id))
        } else {
            Check::Node
        }
    }

    fn listing(&self) -> bool {
        self.list_nodes || self.list_services || self.list_vms
    }
}

fn main() {
    if let Err(err) =
        pvemon::config_generator::print_icinga_command_config_if_env_and_exit("proxmox", &Cli::command())
    {
        println!("UNKNOWN: {}", err);
        process::exit(State::Unknown.exit_code());
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => err.exit(),
            _ => {
                println!("{}", usage_error_line(&err));
                process::exit(State::Unknown.exit_code());
            }
        },
    };
    logging::init(logging::level_for(cli.verbose), None);

    if cli.listing() {
        match list(&cli) {
            Ok(items) => {
                for item in items {
                    println!("* {}", item);
                }
                process::exit(State::Ok.exit_code());
            }
            Err(err) => {
                println!("UNKNOWN: {:#}", err);
                process::exit(State::Unknown.exit_code());
            }
        }
    }

    Runner::new()
        .on_error(|_: &anyhow::Error| State::Unknown)
        .safe_run(|| check(&cli))
        .print_and_exit()
}

/// Squeezes a clap error into the single line a plugin may print.
fn usage_error_line(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default().trim();
    let message = first.strip_prefix("error: ").unwrap_or(first);
    format!("{}: {}", State::Unknown, message)
}

fn list(cli: &Cli) -> anyhow::Result<Vec<String>> {
    let client = PveClient::connect(&cli.connect_options())?;

    let items = if cli.list_nodes {
        probe::list_nodes(&client).context("cannot list nodes")?
    } else if cli.list_services {
        probe::list_services(&client, &cli.node).context("cannot list services")?
    } else {
        probe::list_vms(&client, &cli.node).context("cannot list VMs")?
    };

    Ok(items)
}

fn check(cli: &Cli) -> anyhow::Result<Resource> {
    let client = PveClient::connect(&cli.connect_options())?;
    let request = CheckRequest {
        node: cli.node.clone(),
        check: cli.check(),
    };

    Ok(probe::run_check(&client, &request)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let base = ["check_proxmox", "-H", "pve.lan", "-N", "pve", "-p", "secret"];
        Cli::try_parse_from(base.iter().chain(args))
    }

    #[test]
    fn test_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_selection() {
        assert_eq!(parse(&[]).unwrap().check(), Check::Node);
        assert_eq!(parse(&["-b"]).unwrap().check(), Check::Subscription);
        assert_eq!(
            parse(&["--vm-id", "101"]).unwrap().check(),
            Check::Vm(VmSelector::Id(101))
        );

        let cli = parse(&["-m", "-w", "80", "-c", "90"]).unwrap();
        assert_eq!(
            cli.check(),
            Check::Memory(Thresholds::new(
                "80".parse().unwrap(),
                "90".parse().unwrap()
            ))
        );
    }

    #[test]
    fn test_usage_errors_are_one_unknown_line() {
        let err = parse(&["-s", "pveproxy", "-m"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        let line = usage_error_line(&err);
        assert!(line.starts_with("UNKNOWN: "), "{line}");
        assert!(line.contains("--mem-usage"), "{line}");
        assert!(!line.contains('\n'));

        let err = parse(&["-m", "-w", "abc"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert!(usage_error_line(&err).starts_with("UNKNOWN: "));
    }

    #[test]
    fn test_thresholds_require_memory_check() {
        let err = parse(&["-w", "80"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = parse(&["-s", "pveproxy", "-c", "90"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_node_name_is_validated() {
        let args = ["check_proxmox", "-H", "pve.lan", "-N", "pve/../x", "-p", "secret"];
        let err = Cli::try_parse_from(args).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }
}
