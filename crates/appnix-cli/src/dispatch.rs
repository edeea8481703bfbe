use appnix_core::{
    build_all, build_everything, error_outcome, generate_desktop_entries, install_app,
    list_installed, reinstall_app, uninstall_app, BuildRequest, CommandContext, CommandGroup,
    CommandInfo, ExecutionOutcome, InstallRequest, ReinstallRequest, UninstallRequest,
};

use crate::cli::CommandGroupCli;

pub fn command_info(group: &CommandGroupCli) -> CommandInfo {
    match group {
        CommandGroupCli::Build(_) => CommandInfo::new(CommandGroup::Build, "build"),
        CommandGroupCli::Install(_) => CommandInfo::new(CommandGroup::Install, "install"),
        CommandGroupCli::Reinstall(_) => CommandInfo::new(CommandGroup::Reinstall, "reinstall"),
        CommandGroupCli::Uninstall(_) => CommandInfo::new(CommandGroup::Uninstall, "uninstall"),
        CommandGroupCli::List => CommandInfo::new(CommandGroup::List, "list"),
        CommandGroupCli::Desktop => CommandInfo::new(CommandGroup::Desktop, "desktop"),
        CommandGroupCli::All(_) => CommandInfo::new(CommandGroup::All, "all"),
    }
}

pub fn dispatch_command(ctx: &CommandContext<'_>, group: &CommandGroupCli) -> ExecutionOutcome {
    match group {
        CommandGroupCli::Build(args) => {
            let request = BuildRequest {
                keep_cache: args.keep_cache,
            };
            core_call(|| build_all(ctx, &request))
        }
        CommandGroupCli::Install(args) => {
            let request = InstallRequest {
                name: args.name.clone(),
                keep_cache: args.keep_cache,
            };
            core_call(|| install_app(ctx, &request))
        }
        CommandGroupCli::Reinstall(args) => {
            let request = ReinstallRequest {
                name: args.name.clone(),
            };
            core_call(|| reinstall_app(ctx, &request))
        }
        CommandGroupCli::Uninstall(args) => {
            let request = UninstallRequest {
                name: args.name.clone(),
            };
            core_call(|| uninstall_app(ctx, &request))
        }
        CommandGroupCli::List => core_call(|| list_installed(ctx)),
        CommandGroupCli::Desktop => core_call(|| generate_desktop_entries(ctx)),
        CommandGroupCli::All(args) => {
            let request = BuildRequest {
                keep_cache: args.keep_cache,
            };
            core_call(|| build_everything(ctx, &request))
        }
    }
}

fn core_call<F>(action: F) -> ExecutionOutcome
where
    F: FnOnce() -> anyhow::Result<ExecutionOutcome>,
{
    match action() {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            error_outcome(&err)
        }
    }
}
