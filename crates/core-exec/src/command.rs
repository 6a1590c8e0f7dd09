//! Child command assembly: direct exec or `$SHELL -c` wrapping.

use std::env;
use std::process::Stdio;

use tokio::process::Command;

use crate::ExecOptions;

const DEFAULT_SHELL: &str = "/bin/sh";

/// Build the child command for one rendered argv. Stdout/stderr wiring is
/// left to the caller; stdin is always closed so children never compete for
/// the launcher's own input.
pub(crate) fn build(argv: &[String], options: &ExecOptions) -> Command {
    let mut command = if options.shell {
        let shell = env::var("SHELL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SHELL.to_string());
        let mut command = Command::new(shell);
        command.arg("-c").arg(argv.join(" "));
        command
    } else {
        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]);
        command
    };

    command.env_clear();
    if options.env {
        command.envs(env::vars());
    }
    if let Some(dir) = &options.working_dir {
        command.current_dir(dir);
    }
    command.stdin(Stdio::null());
    command.kill_on_drop(true);
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn direct_exec_uses_the_first_element_as_program() {
        let command = build(&argv(&["echo", "a", "b"]), &ExecOptions::default());
        let std = command.as_std();
        assert_eq!(std.get_program(), "echo");
        let args: Vec<_> = std.get_args().collect();
        assert_eq!(args, ["a", "b"]);
    }

    #[test]
    fn shell_mode_wraps_the_joined_argv() {
        let options = ExecOptions {
            shell: true,
            ..Default::default()
        };
        let command = build(&argv(&["echo", "a", "b"]), &options);
        let std = command.as_std();
        let args: Vec<_> = std.get_args().collect();
        assert_eq!(args, ["-c", "echo a b"]);
    }

    #[test]
    fn environment_is_clean_unless_requested() {
        let bare = build(&argv(&["true"]), &ExecOptions::default());
        assert!(bare.as_std().get_envs().next().is_none());

        let options = ExecOptions {
            env: true,
            ..Default::default()
        };
        let copied = build(&argv(&["true"]), &options);
        assert!(copied.as_std().get_envs().next().is_some());
    }
}
