use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

pub const APPNIX_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const APPNIX_BEFORE_HELP: &str = concat!(
    "appnix ",
    env!("CARGO_PKG_VERSION"),
    " – Turn websites into Linux desktop apps\n\n",
    "\x1b[1;36mBuild\x1b[0m\n",
    "  build              Build AppImages for every app in config.yml.\n",
    "  install <name>     Build and install a single app.\n",
    "  reinstall <name>   Stop a running app, then rebuild and install it.\n",
    "  all                Build every app, then write desktop entries.\n\n",
    "\x1b[1;36mManage\x1b[0m\n",
    "  list               Show installed apps.\n",
    "  uninstall <name>   Remove an installed app.\n",
    "  desktop            Write desktop entries for every configured app.\n",
);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = APPNIX_BEFORE_HELP,
    help_template = APPNIX_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct AppnixCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still set the exit code)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[arg(
        long,
        value_name = "PATH",
        env = "APPNIX_CONFIG",
        help = "Read apps from this config.yml instead of ~/.config/appnix/config.yml",
        global = true
    )]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(about = "Build AppImages for every configured app")]
    Build(BuildArgs),
    #[command(about = "Build and install a single app by name")]
    Install(InstallArgs),
    #[command(about = "Stop, rebuild, and reinstall an app")]
    Reinstall(AppNameArgs),
    #[command(about = "Remove an installed app and its files")]
    Uninstall(AppNameArgs),
    #[command(about = "List installed apps")]
    List,
    #[command(about = "Write desktop entries for every configured app")]
    Desktop,
    #[command(about = "Build every app, then write desktop entries")]
    All(BuildArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[arg(
        long,
        help = "Keep the downloaded AppImage toolchain after a successful build"
    )]
    pub keep_cache: bool,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[arg(value_name = "NAME", help = "app_name from config.yml (case-insensitive)")]
    pub name: String,
    #[arg(
        long,
        help = "Keep the downloaded AppImage toolchain after a successful build"
    )]
    pub keep_cache: bool,
}

#[derive(Args, Debug)]
pub struct AppNameArgs {
    #[arg(value_name = "NAME", help = "app_name of the app")]
    pub name: String,
}
