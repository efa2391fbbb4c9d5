// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: catalog manifest
fn catalog_arg() -> Arg {
    Arg::new("catalog")
        .short('c')
        .long("catalog")
        .value_name("FILE")
        .required(true)
        .help("Catalog manifest (JSON)")
}

fn switch(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue).help(help)
}

/// Flags shared by install, uninstall and verify
fn resolve_args(cmd: Command) -> Command {
    cmd.arg(catalog_arg())
        .arg(switch("force", "Turn conflicts and ordering loops into warnings"))
        .arg(switch("nodeps", "Do not resolve dependencies"))
        .arg(switch("greedy", "Upgrade installed packages to resolve conflicts and orphans"))
        .arg(switch("no-follow", "Do not pull in providers of requirements"))
        .arg(
            Arg::new("greedy-depth")
                .long("greedy-depth")
                .value_name("N")
                .help("Bound on greedy actions"),
        )
        .arg(switch("allow-duplicates", "Allow several versions of one package"))
        .arg(switch("multilib", "Let packages of different arch coexist"))
        .arg(switch("promote-epoch", "Match missing epochs against the other side's epoch"))
        .arg(switch("caplookup", "Look up unmatched arguments as capabilities"))
        .arg(switch("suggests", "Offer suggested packages"))
        .arg(switch("interactive", "Ask on the terminal instead of taking defaults").short('i'))
        .arg(
            Arg::new("hold")
                .long("hold")
                .value_name("PAT")
                .action(ArgAction::Append)
                .help("Hold packages matching a mask"),
        )
        .arg(
            Arg::new("ignore")
                .long("ignore")
                .value_name("PAT")
                .action(ArgAction::Append)
                .help("Ignore packages matching a mask"),
        )
        .arg(
            Arg::new("priority-file")
                .long("priority-file")
                .value_name("FILE")
                .help("Install priority file"),
        )
        .arg(switch("json", "Print the result as JSON"))
}

fn build_cli() -> Command {
    Command::new("depmark")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Depmark Contributors")
        .about("Resolve package transactions against a catalog")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("More logging (-v info, -vv debug, -vvv trace)"),
        )
        .arg(Arg::new("config").long("config").value_name("PATH").help("Configuration file"))
        .subcommand(resolve_args(
            Command::new("install")
                .about("Resolve the installation of packages")
                .arg(Arg::new("tokens").required(true).num_args(1..).help("Packages, masks or capabilities")),
        ))
        .subcommand(resolve_args(
            Command::new("uninstall")
                .about("Resolve the removal of installed packages")
                .arg(Arg::new("tokens").required(true).num_args(1..).help("Installed packages or masks")),
        ))
        .subcommand(resolve_args(
            Command::new("verify")
                .about("Check installed packages for unsatisfied requirements and conflicts")
                .arg(Arg::new("tokens").num_args(0..).help("Installed packages to check")),
        ))
        .subcommand(
            Command::new("whatprovides")
                .about("List packages providing a capability, best first")
                .arg(Arg::new("capability").required(true).help("Capability expression"))
                .arg(catalog_arg()),
        )
        .subcommand(
            Command::new("vercmp")
                .about("Compare two versions")
                .arg(Arg::new("first").required(true).help("First version"))
                .arg(Arg::new("second").required(true).help("Second version")),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Write into OUT_DIR so builds never touch the source tree
    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=OUT_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = out_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("depmark.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
